//! Pure chess domain layer: coordinates, notation, move resolution and the
//! protocols spoken with search engines. No threads or I/O live here.

pub mod chess;
pub mod encoded;
pub mod movetext;
pub mod protocol;
pub mod resolver;
pub mod rules;
pub mod search;
pub mod square;
pub mod uci;

pub use chess::{Piece, PieceColor, PieceKind};
pub use encoded::EncodedMove;
pub use movetext::{MoveToken, ParsedMovetext};
pub use protocol::SearchBudget;
pub use resolver::ResolveError;
pub use rules::{RulesEngine, RulesError, ShakmatyRules};
pub use square::{Square, SquareError};
