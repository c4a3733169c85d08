//! Move ledger: the committed moves of the current game and their SAN.
//!
//! Append-only except for undo, which takes moves off the tail.

use crate::domain::{EncodedMove, PieceColor, RulesEngine, RulesError};

/// Placeholder display entry when Black moves first
const BLACK_START_MARKER: &str = "..";

#[derive(Clone, Debug)]
pub struct MoveLedger {
    moves: Vec<EncodedMove>,
    /// SAN per move, prefixed with a placeholder when Black started
    display: Vec<String>,
    /// FEN the game started from, if not the standard position
    initial_fen: Option<String>,
    starting_color: PieceColor,
}

impl MoveLedger {
    pub fn new() -> Self {
        Self::starting_from(None, PieceColor::White)
    }

    /// A ledger for a game starting from `initial_fen` with `starting_color` to move
    pub fn starting_from(initial_fen: Option<String>, starting_color: PieceColor) -> Self {
        let display = match starting_color {
            PieceColor::White => Vec::new(),
            PieceColor::Black => vec![BLACK_START_MARKER.to_string()],
        };
        Self {
            moves: Vec::new(),
            display,
            initial_fen,
            starting_color,
        }
    }

    pub fn commit(&mut self, mv: EncodedMove, san: String) {
        self.moves.push(mv);
        self.display.push(san);
    }

    /// Take back the last move, plus one more if that leaves the engine to move.
    /// Returns how many moves were undone.
    pub fn undo<R: RulesEngine>(
        &mut self,
        rules: &mut R,
        human: PieceColor,
    ) -> Result<usize, RulesError> {
        if !self.pop_into(rules)? {
            return Ok(0);
        }
        if rules.turn() != human && self.pop_into(rules)? {
            return Ok(2);
        }
        Ok(1)
    }

    fn pop_into<R: RulesEngine>(&mut self, rules: &mut R) -> Result<bool, RulesError> {
        let Some(&last) = self.moves.last() else {
            return Ok(false);
        };
        rules.unmake_move(last)?;
        self.moves.pop();
        self.display.pop();
        Ok(true)
    }

    pub fn moves(&self) -> &[EncodedMove] {
        &self.moves
    }

    /// SAN of every committed move, in order
    pub fn san_moves(&self) -> &[String] {
        match self.starting_color {
            PieceColor::White => &self.display,
            PieceColor::Black => &self.display[1..],
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn last(&self) -> Option<EncodedMove> {
        self.moves.last().copied()
    }

    pub fn initial_fen(&self) -> Option<&str> {
        self.initial_fen.as_deref()
    }

    pub fn starting_color(&self) -> PieceColor {
        self.starting_color
    }

    /// Numbered move pairs, one pair per line, with a FEN tag when the
    /// game did not start from the standard position
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        if let Some(fen) = &self.initial_fen {
            out.push_str(&format!("[FEN \"{fen}\"]\n\n"));
        }

        for (i, entry) in self.display.iter().enumerate() {
            let move_num = i / 2 + 1;
            if i % 2 == 0 {
                if entry == BLACK_START_MARKER {
                    out.push_str(&format!("{move_num}..."));
                } else {
                    out.push_str(&format!("{move_num}. {entry}"));
                }
            } else {
                out.push_str(&format!(" {entry}\n"));
            }
        }
        if self.display.len() % 2 == 1 {
            out.push('\n');
        }
        out
    }
}

impl Default for MoveLedger {
    fn default() -> Self {
        Self::new()
    }
}
