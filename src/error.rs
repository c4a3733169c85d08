//! Error types for the game session and its configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{PieceKind, ResolveError, RulesError, SquareError};

/// Errors surfaced by [`GameSession`](crate::models::game::GameSession)
#[derive(Error, Debug)]
pub enum GameError {
    #[error(transparent)]
    Square(#[from] SquareError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    /// A transcript move could not be matched; nothing was committed
    #[error("transcript move {ply}: {source}")]
    Replay { ply: usize, source: ResolveError },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown level {level} (levels are 0 to {max})")]
    UnknownLevel { level: usize, max: usize },

    #[error("{0:?} is not a promotion piece")]
    InvalidPromotion(PieceKind),
}

pub type GameResult<T> = Result<T, GameError>;
