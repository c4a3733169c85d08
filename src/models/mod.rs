//! Stateful layer: the game session and the engine plumbing behind it.

pub mod engine;
pub mod game;
pub mod ledger;
pub mod worker;

pub use engine::{EngineSession, SearchCompletion, SearchRequest, SessionState};
pub use game::{GameSession, GameStatus, PointerOutcome};
pub use ledger::MoveLedger;
