//! Session settings, read from a JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{PieceColor, PieceKind, SearchBudget};
use crate::error::ConfigError;

/// Search budget per difficulty level, weakest first
pub const LEVELS: [SearchBudget; 10] = [
    budget(0, 1),
    budget(12, 20),
    budget(25, 40),
    budget(50, 60),
    budget(100, 80),
    budget(200, 100),
    budget(400, 120),
    budget(800, 140),
    budget(1600, 160),
    budget(3200, 180),
];

/// Budget used until a level is picked
pub const DEFAULT_BUDGET: SearchBudget = budget(1600, 49);

const fn budget(timeout_ms: u64, max_ply: u32) -> SearchBudget {
    SearchBudget {
        timeout_ms,
        max_ply,
    }
}

/// Budget for a level index
pub fn level_budget(level: usize) -> Result<SearchBudget, ConfigError> {
    LEVELS
        .get(level)
        .copied()
        .ok_or(ConfigError::UnknownLevel {
            level,
            max: LEVELS.len() - 1,
        })
}

/// Where searches run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum EngineBackend {
    /// Built-in searcher on a background thread
    #[default]
    Builtin,
    /// External UCI engine process
    Uci { path: PathBuf },
    /// No background context; every search blocks the caller
    Inline,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Color the human plays
    pub human_color: PieceColor,
    /// Index into the level table; the default budget applies when unset
    pub level: Option<usize>,
    /// Piece a pawn promotes to when moved by pointer
    pub default_promotion: PieceKind,
    pub engine: EngineBackend,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            human_color: PieceColor::White,
            level: None,
            default_promotion: PieceKind::Queen,
            engine: EngineBackend::default(),
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(level) = self.level {
            level_budget(level)?;
        }
        if !self.default_promotion.is_promotion_target() {
            return Err(ConfigError::InvalidPromotion(self.default_promotion));
        }
        Ok(())
    }

    pub fn budget(&self) -> SearchBudget {
        self.level
            .and_then(|level| LEVELS.get(level).copied())
            .unwrap_or(DEFAULT_BUDGET)
    }

    /// JSON schema of the configuration file
    pub fn schema_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(SessionConfig))
    }
}
