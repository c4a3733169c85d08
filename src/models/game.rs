//! Game session - the application layer tying rules, ledger and engine together.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{EngineBackend, SessionConfig, level_budget};
use crate::domain::movetext;
use crate::domain::resolver::{self, resolve_pointer, resolve_token};
use crate::domain::search::{MaterialSearcher, Searcher};
use crate::domain::{
    EncodedMove, PieceColor, PieceKind, RulesEngine, RulesError, ShakmatyRules, Square,
};
use crate::error::{GameError, GameResult};

use super::engine::{EngineSession, SearchRequest};
use super::ledger::MoveLedger;
use super::worker::{BackgroundSpawner, InlineSpawner, ThreadSpawner, UciProcessSpawner};

/// Result of a pointer pick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerOutcome {
    Moved(EncodedMove),
    /// Nothing matched; the board is unchanged
    NoMove,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Checkmate | GameStatus::Stalemate)
    }
}

/// The game being played: position, committed moves, engine and settings
pub struct GameSession<R: RulesEngine = ShakmatyRules> {
    rules: R,
    ledger: MoveLedger,
    engine: EngineSession,
    human: PieceColor,
    default_promotion: PieceKind,
}

impl GameSession<ShakmatyRules> {
    /// Standard starting position, with the engine backend the config names
    pub fn from_config(config: &SessionConfig) -> Self {
        let searcher: Arc<dyn Searcher> = Arc::new(MaterialSearcher);
        let spawner: Box<dyn BackgroundSpawner> = match &config.engine {
            EngineBackend::Builtin => Box::new(ThreadSpawner::new(Arc::clone(&searcher))),
            EngineBackend::Uci { path } => Box::new(UciProcessSpawner::new(path.clone())),
            EngineBackend::Inline => Box::new(InlineSpawner),
        };
        let engine = EngineSession::new(spawner, config.budget(), searcher);
        Self::new(ShakmatyRules::new(), engine, config)
    }
}

impl<R: RulesEngine> GameSession<R> {
    pub fn new(rules: R, engine: EngineSession, config: &SessionConfig) -> Self {
        Self {
            rules,
            ledger: MoveLedger::new(),
            engine,
            human: config.human_color,
            default_promotion: config.default_promotion,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn ledger(&self) -> &MoveLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &EngineSession {
        &self.engine
    }

    pub fn human_color(&self) -> PieceColor {
        self.human
    }

    pub fn default_promotion(&self) -> PieceKind {
        self.default_promotion
    }

    /// Whether an engine answer is still on its way
    pub fn is_engine_thinking(&self) -> bool {
        self.engine.is_searching()
    }

    /// Start over from the standard position. The engine opens if the human plays Black.
    pub fn new_game(&mut self, color: PieceColor, level: Option<usize>) -> GameResult<()> {
        if let Some(level) = level {
            self.set_level(level)?;
        }
        self.engine.cancel();
        self.rules.reset();
        self.ledger = MoveLedger::new();
        self.human = color;
        info!(human = ?color, "new game");

        if self.rules.turn() != self.human {
            self.request_engine_move()?;
        }
        Ok(())
    }

    /// Set up a position. The human takes the side to move.
    pub fn load_fen(&mut self, fen: &str) -> GameResult<()> {
        let mut rules = self.rules.clone();
        rules.load_fen(fen)?;
        self.engine.cancel();
        self.ledger = MoveLedger::starting_from(self.non_standard_fen(&rules), rules.turn());
        self.human = rules.turn();
        self.rules = rules;
        info!(fen, "position loaded");
        Ok(())
    }

    /// Replay a transcript. Every move is resolved before any is committed;
    /// on error the game is untouched. Returns the number of moves loaded.
    pub fn load_movetext(&mut self, text: &str) -> GameResult<usize> {
        let parsed = movetext::parse(text);

        let mut rules = self.rules.clone();
        match &parsed.initial_fen {
            Some(fen) => rules.load_fen(fen)?,
            None => rules.reset(),
        }
        let mut ledger = MoveLedger::starting_from(self.non_standard_fen(&rules), rules.turn());

        for (i, token) in parsed.sequence.iter().enumerate() {
            let mv = resolve_token(&rules, token).map_err(|source| GameError::Replay {
                ply: i + 1,
                source,
            })?;
            let san = rules.san(mv).unwrap_or_else(|| mv.to_string());
            rules.make_move(mv)?;
            ledger.commit(mv, san);
        }

        self.engine.cancel();
        self.human = rules.turn();
        self.rules = rules;
        self.ledger = ledger;
        info!(moves = self.ledger.len(), "transcript loaded");
        Ok(self.ledger.len())
    }

    fn non_standard_fen(&self, rules: &R) -> Option<String> {
        let mut standard = self.rules.clone();
        standard.reset();
        let fen = rules.fen();
        (fen != standard.fen()).then_some(fen)
    }

    /// Play the human's move from a pointer pick, then ask the engine to reply
    pub fn play_pointer_move(&mut self, from: Square, to: Square) -> GameResult<PointerOutcome> {
        if self.engine.is_searching() || self.rules.turn() != self.human || self.status().is_over() {
            return Ok(PointerOutcome::NoMove);
        }
        let Some(mv) = resolve_pointer(&self.rules, from, to, self.default_promotion) else {
            debug!(%from, %to, "no legal move for pick");
            return Ok(PointerOutcome::NoMove);
        };

        let fen_before = self.rules.fen();
        self.commit(mv)?;
        self.engine.sync_move(&fen_before, &mv.to_string());
        self.request_engine_move()?;
        Ok(PointerOutcome::Moved(mv))
    }

    /// Ask the engine for a move. Returns the move when it was found
    /// synchronously; otherwise it arrives through [`Self::poll_engine`].
    pub fn request_engine_move(&mut self) -> GameResult<Option<EncodedMove>> {
        if self.status().is_over() {
            return Ok(None);
        }
        match self.engine.request_search(&self.rules.fen()) {
            SearchRequest::Pending(_) | SearchRequest::NoMove => Ok(None),
            SearchRequest::Completed(done) => self.finish_engine_move(&done.move_text).map(Some),
        }
    }

    /// Commit any engine answers that arrived. Returns true if the board changed.
    pub fn poll_engine(&mut self) -> GameResult<bool> {
        let completed = self.engine.poll();
        for done in &completed {
            self.finish_engine_move(&done.move_text)?;
        }
        Ok(!completed.is_empty())
    }

    fn finish_engine_move(&mut self, move_text: &str) -> GameResult<EncodedMove> {
        let mv = self
            .rules
            .parse_move(move_text)
            .ok_or_else(|| RulesError::IllegalMove(move_text.to_string()))?;
        self.commit(mv)?;
        Ok(mv)
    }

    fn commit(&mut self, mv: EncodedMove) -> GameResult<()> {
        let san = self.rules.san(mv).unwrap_or_else(|| mv.to_string());
        self.rules.make_move(mv)?;
        debug!(%mv, %san, "move committed");
        self.ledger.commit(mv, san);
        Ok(())
    }

    /// Abandon any outstanding engine search
    pub fn cancel_search(&mut self) {
        self.engine.cancel();
    }

    /// Take back moves until the human is to move. Any search is cancelled first.
    ///
    /// When the ledger runs out with the engine still to move (it opened the
    /// game), the engine is asked to move again so the turn comes back.
    pub fn undo(&mut self) -> GameResult<usize> {
        self.engine.cancel();
        let undone = self.ledger.undo(&mut self.rules, self.human)?;
        if self.rules.turn() != self.human {
            debug!(undone, "engine to move after undo, requesting its move");
            self.request_engine_move()?;
        }
        Ok(undone)
    }

    /// Piece used for pointer promotions. Returns false for pawn or king.
    pub fn set_default_promotion(&mut self, kind: PieceKind) -> bool {
        if !kind.is_promotion_target() {
            return false;
        }
        self.default_promotion = kind;
        true
    }

    pub fn set_level(&mut self, level: usize) -> GameResult<()> {
        self.engine.set_budget(level_budget(level)?);
        Ok(())
    }

    /// Ledger transcript, followed by the result once the game has ended
    pub fn transcript(&self) -> String {
        let mut out = self.ledger.transcript();
        let result = match self.status() {
            GameStatus::Checkmate => match self.rules.turn() {
                PieceColor::White => Some("0-1"),
                PieceColor::Black => Some("1-0"),
            },
            GameStatus::Stalemate => Some("1/2-1/2"),
            GameStatus::Ongoing | GameStatus::Check => None,
        };
        if let Some(result) = result {
            out.push_str(result);
            out.push('\n');
        }
        out
    }

    pub fn status(&self) -> GameStatus {
        if self.rules.is_checkmate() {
            GameStatus::Checkmate
        } else if self.rules.is_stalemate() {
            GameStatus::Stalemate
        } else if self.rules.is_check() {
            GameStatus::Check
        } else {
            GameStatus::Ongoing
        }
    }

    /// Destination squares of the legal moves starting on `from`
    pub fn legal_targets(&self, from: Square) -> Vec<Square> {
        resolver::legal_targets(&self.rules, from)
    }
}
