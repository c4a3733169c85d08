//! Rules engine contract and the shakmaty-backed implementation.
//!
//! The core never computes chess legality itself. Everything it needs from
//! the rules (legal moves, make/unmake, FEN, SAN, check detection, piece
//! locations) goes through [`RulesEngine`].

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{
    CastlingMode, Chess, EnPassantMode, File, Move, Position, Rank, Square as SSquare,
};
use thiserror::Error;

use super::chess::{
    Piece, PieceColor, PieceKind, color_from_shakmaty, color_to_shakmaty, kind_to_role,
    role_to_kind, shakmaty_to_piece,
};
use super::encoded::{
    EncodedMove, FLAG_CAPTURE, FLAG_CASTLE_KING, FLAG_CASTLE_QUEEN, FLAG_EN_PASSANT,
};
use super::square::Square;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("invalid FEN {fen:?}: {reason}")]
    InvalidFen { fen: String, reason: String },
    #[error("move {0} is not legal in the current position")]
    IllegalMove(String),
    #[error("no move to take back")]
    NothingToUnmake,
    #[error("cannot take back {requested}: last move played was {last}")]
    UnmakeMismatch { requested: String, last: String },
}

/// What the core needs from a chess rules engine
pub trait RulesEngine: Clone {
    /// Full legal move set for the side to move, in generation order
    fn legal_moves(&self) -> Vec<EncodedMove>;

    fn make_move(&mut self, mv: EncodedMove) -> Result<(), RulesError>;

    /// Take back `mv`, which must be the last move made
    fn unmake_move(&mut self, mv: EncodedMove) -> Result<(), RulesError>;

    fn fen(&self) -> String;

    /// Replace the position. Clears the make/unmake history.
    fn load_fen(&mut self, fen: &str) -> Result<(), RulesError>;

    /// Back to the standard starting position
    fn reset(&mut self);

    /// SAN for a legal move in the current position, with check/mate suffix
    fn san(&self, mv: EncodedMove) -> Option<String>;

    /// Coordinate text ("e2e4", "e7e8q") or SAN to one of the legal moves
    fn parse_move(&self, text: &str) -> Option<EncodedMove>;

    fn is_check(&self) -> bool;

    fn turn(&self) -> PieceColor;

    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// Squares holding a piece of this color and kind
    fn piece_squares(&self, color: PieceColor, kind: PieceKind) -> Vec<Square>;

    fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_moves().is_empty()
    }

    fn is_stalemate(&self) -> bool {
        !self.is_check() && self.legal_moves().is_empty()
    }
}

/// Convert a domain square to a shakmaty square
pub fn to_shakmaty_square(square: Square) -> SSquare {
    let file = File::new(square.x() as u32);
    let rank = Rank::new(7 - square.y() as u32); // y 0 = rank 8, y 7 = rank 1
    SSquare::from_coords(file, rank)
}

/// Convert a shakmaty square to a domain square
pub fn from_shakmaty_square(square: SSquare) -> Square {
    let x = u32::from(square.file());
    let y = 7 - u32::from(square.rank());
    Square::from_masked_index(x + y * 8)
}

/// Encode a shakmaty move. Castling becomes the king's two-square move.
pub fn encode_move(m: &Move) -> Option<EncodedMove> {
    let encoded = match m {
        Move::Normal {
            from,
            to,
            capture,
            promotion,
            ..
        } => {
            let mut flags = 0;
            if capture.is_some() {
                flags |= FLAG_CAPTURE;
            }
            if let Some(role) = promotion {
                flags |= EncodedMove::promotion_flags(role_to_kind(*role));
            }
            EncodedMove::new(from_shakmaty_square(*from), from_shakmaty_square(*to), flags)
        }
        Move::EnPassant { from, to } => EncodedMove::new(
            from_shakmaty_square(*from),
            from_shakmaty_square(*to),
            FLAG_CAPTURE | FLAG_EN_PASSANT,
        ),
        Move::Castle { king, rook } => {
            let (file, flag) = if rook.file() == File::H {
                (File::G, FLAG_CASTLE_KING)
            } else {
                (File::C, FLAG_CASTLE_QUEEN)
            };
            let king_dest = SSquare::from_coords(file, rook.rank());
            EncodedMove::new(
                from_shakmaty_square(*king),
                from_shakmaty_square(king_dest),
                flag,
            )
        }
        Move::Put { .. } => return None,
    };
    Some(encoded)
}

/// [`RulesEngine`] over a shakmaty position, with a history stack for unmake
#[derive(Clone, Debug, Default)]
pub struct ShakmatyRules {
    position: Chess,
    history: Vec<(Chess, EncodedMove)>,
}

impl ShakmatyRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let mut rules = Self::new();
        rules.load_fen(fen)?;
        Ok(rules)
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    /// Number of moves that can be taken back
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn find(&self, mv: EncodedMove) -> Option<Move> {
        self.position
            .legal_moves()
            .into_iter()
            .find(|m| encode_move(m) == Some(mv))
    }
}

impl RulesEngine for ShakmatyRules {
    fn legal_moves(&self) -> Vec<EncodedMove> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(encode_move)
            .collect()
    }

    fn make_move(&mut self, mv: EncodedMove) -> Result<(), RulesError> {
        let m = self
            .find(mv)
            .ok_or_else(|| RulesError::IllegalMove(mv.to_string()))?;
        let next = self
            .position
            .clone()
            .play(m)
            .map_err(|_| RulesError::IllegalMove(mv.to_string()))?;
        let previous = std::mem::replace(&mut self.position, next);
        self.history.push((previous, mv));
        Ok(())
    }

    fn unmake_move(&mut self, mv: EncodedMove) -> Result<(), RulesError> {
        let Some((_, last)) = self.history.last() else {
            return Err(RulesError::NothingToUnmake);
        };
        if *last != mv {
            return Err(RulesError::UnmakeMismatch {
                requested: mv.to_string(),
                last: last.to_string(),
            });
        }
        if let Some((previous, _)) = self.history.pop() {
            self.position = previous;
        }
        Ok(())
    }

    fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    fn load_fen(&mut self, fen: &str) -> Result<(), RulesError> {
        let invalid = |reason: String| RulesError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        self.position = position;
        self.history.clear();
        Ok(())
    }

    fn reset(&mut self) {
        self.position = Chess::default();
        self.history.clear();
    }

    fn san(&self, mv: EncodedMove) -> Option<String> {
        let m = self.find(mv)?;
        let mut san = San::from_move(&self.position, m.clone()).to_string();
        let after = self.position.clone().play(m).ok()?;
        if after.is_checkmate() {
            san.push('#');
        } else if after.is_check() {
            san.push('+');
        }
        Some(san)
    }

    fn parse_move(&self, text: &str) -> Option<EncodedMove> {
        let text = text.trim();
        let legal = self.legal_moves();
        if let Some(mv) = legal.iter().find(|mv| mv.to_string() == text) {
            return Some(*mv);
        }
        let san: San = text.trim_end_matches(['+', '#']).parse().ok()?;
        let m = san.to_move(&self.position).ok()?;
        encode_move(&m).filter(|mv| legal.contains(mv))
    }

    fn is_check(&self) -> bool {
        self.position.is_check()
    }

    fn turn(&self) -> PieceColor {
        color_from_shakmaty(self.position.turn())
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position
            .board()
            .piece_at(to_shakmaty_square(square))
            .map(shakmaty_to_piece)
    }

    fn piece_squares(&self, color: PieceColor, kind: PieceKind) -> Vec<Square> {
        let piece = shakmaty::Piece {
            color: color_to_shakmaty(color),
            role: kind_to_role(kind),
        };
        self.position
            .board()
            .by_piece(piece)
            .into_iter()
            .map(from_shakmaty_square)
            .collect()
    }

    fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_square_conversion_roundtrip() {
        for index in 0..64 {
            let square = Square::from_index(index).unwrap();
            let converted = to_shakmaty_square(square);
            assert_eq!(converted.to_string(), square.notation());
            assert_eq!(from_shakmaty_square(converted), square);
        }
    }

    #[test]
    fn test_shakmaty_corners() {
        assert_eq!(from_shakmaty_square(SSquare::A8).index(), 0);
        assert_eq!(from_shakmaty_square(SSquare::H8).index(), 7);
        assert_eq!(from_shakmaty_square(SSquare::A1).index(), 56);
        assert_eq!(from_shakmaty_square(SSquare::H1).index(), 63);
    }

    #[test]
    fn test_startpos_legal_moves() {
        let rules = ShakmatyRules::new();
        let moves = rules.legal_moves();
        assert_eq!(moves.len(), 20);
        assert!(moves.iter().any(|m| m.connects(sq("e2"), sq("e4"))));
        assert!(moves.iter().any(|m| m.connects(sq("g1"), sq("f3"))));
    }

    #[test]
    fn test_make_and_unmake() {
        let mut rules = ShakmatyRules::new();
        let start = rules.fen();
        let mv = rules.parse_move("e2e4").unwrap();
        rules.make_move(mv).unwrap();
        assert_eq!(rules.turn(), PieceColor::Black);
        assert_ne!(rules.fen(), start);

        rules.unmake_move(mv).unwrap();
        assert_eq!(rules.fen(), start);
        assert_eq!(rules.unmake_move(mv), Err(RulesError::NothingToUnmake));
    }

    #[test]
    fn test_unmake_must_match_last_move() {
        let mut rules = ShakmatyRules::new();
        let e4 = rules.parse_move("e2e4").unwrap();
        rules.make_move(e4).unwrap();
        let other = EncodedMove::new(sq("d2"), sq("d4"), 0);
        assert!(matches!(
            rules.unmake_move(other),
            Err(RulesError::UnmakeMismatch { .. })
        ));
    }

    #[test]
    fn test_illegal_move_rejected() {
        let mut rules = ShakmatyRules::new();
        let bogus = EncodedMove::new(sq("e2"), sq("e5"), 0);
        assert!(matches!(rules.make_move(bogus), Err(RulesError::IllegalMove(_))));
        assert_eq!(rules.history_len(), 0);
    }

    #[test]
    fn test_castling_encoded_as_king_move() {
        let rules =
            ShakmatyRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castles: Vec<_> = rules.legal_moves().into_iter().filter(|m| m.is_castle()).collect();
        assert_eq!(castles.len(), 2);
        assert!(castles.iter().any(|m| m.connects(sq("e1"), sq("g1"))));
        assert!(castles.iter().any(|m| m.connects(sq("e1"), sq("c1"))));
    }

    #[test]
    fn test_promotion_moves() {
        let rules = ShakmatyRules::from_fen("8/P7/8/8/8/8/8/k1K5 w - - 0 1").unwrap();
        let promos: Vec<_> = rules
            .legal_moves()
            .into_iter()
            .filter(|m| m.connects(sq("a7"), sq("a8")))
            .collect();
        assert_eq!(promos.len(), 4);
        assert!(promos.iter().all(|m| m.promotion().is_some()));
        let queen = rules.parse_move("a7a8q").unwrap();
        assert_eq!(queen.promotion(), Some(PieceKind::Queen));
    }

    #[test]
    fn test_san_with_suffix() {
        let mut rules = ShakmatyRules::new();
        for text in ["f2f3", "e7e5", "g2g4"] {
            let mv = rules.parse_move(text).unwrap();
            rules.make_move(mv).unwrap();
        }
        let mate = rules.parse_move("d8h4").unwrap();
        assert_eq!(rules.san(mate).as_deref(), Some("Qh4#"));
        rules.make_move(mate).unwrap();
        assert!(rules.is_checkmate());
    }

    #[test]
    fn test_parse_move_accepts_san() {
        let rules = ShakmatyRules::new();
        let mv = rules.parse_move("Nf3").unwrap();
        assert!(mv.connects(sq("g1"), sq("f3")));
        assert_eq!(rules.parse_move("Nf4"), None);
    }

    #[test]
    fn test_piece_squares() {
        let rules = ShakmatyRules::new();
        let mut knights = rules.piece_squares(PieceColor::White, PieceKind::Knight);
        knights.sort_by_key(|s| s.index());
        assert_eq!(knights, vec![sq("b1"), sq("g1")]);
        assert_eq!(
            rules.piece_at(sq("e8")),
            Some(Piece {
                kind: PieceKind::King,
                color: PieceColor::Black
            })
        );
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            ShakmatyRules::from_fen("not a fen"),
            Err(RulesError::InvalidFen { .. })
        ));
    }
}
