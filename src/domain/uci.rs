//! UCI (Universal Chess Interface) protocol types.
//!
//! Used when the background context is an external engine process. The
//! bridge in the models layer translates between these and the worker
//! protocol; this module only knows the UCI text.

use super::protocol::SearchBudget;

/// Commands the bridge sends to an external engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    /// Switch the engine to UCI mode
    Uci,
    /// Synchronize; answered with `readyok`
    IsReady,
    /// Clear engine state between games
    UciNewGame,
    /// Set position from a FEN, with moves played since
    Position { fen: String, moves: Vec<String> },
    /// Search within a time and depth budget
    Go(SearchBudget),
    /// Abandon the current search
    Stop,
    Quit,
}

impl UciCommand {
    /// Wire text, without the trailing newline
    pub fn to_uci_string(&self) -> String {
        match self {
            UciCommand::Uci => "uci".to_string(),
            UciCommand::IsReady => "isready".to_string(),
            UciCommand::UciNewGame => "ucinewgame".to_string(),
            UciCommand::Position { fen, moves } => {
                let mut cmd = format!("position fen {fen}");
                if !moves.is_empty() {
                    cmd.push_str(" moves ");
                    cmd.push_str(&moves.join(" "));
                }
                cmd
            }
            UciCommand::Go(budget) => {
                // a zero timeout means depth-limited only
                let mut cmd = String::from("go");
                if budget.timeout_ms > 0 {
                    cmd.push_str(&format!(" movetime {}", budget.timeout_ms));
                }
                if budget.max_ply > 0 {
                    cmd.push_str(&format!(" depth {}", budget.max_ply));
                }
                cmd
            }
            UciCommand::Stop => "stop".to_string(),
            UciCommand::Quit => "quit".to_string(),
        }
    }
}

/// Engine output, classified by its first word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciOutputKind {
    UciOk,
    ReadyOk,
    /// Search progress, without the `info` keyword
    Info(String),
    /// "bestmove <move> [ponder <move>]", holding just the move
    BestMove(String),
    /// Anything else, such as `id` and `option` lines
    Other(String),
}

impl UciOutputKind {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line == "uciok" {
            UciOutputKind::UciOk
        } else if line == "readyok" {
            UciOutputKind::ReadyOk
        } else if let Some(rest) = line.strip_prefix("info ") {
            UciOutputKind::Info(rest.to_string())
        } else if let Some(rest) = line.strip_prefix("bestmove ") {
            let mv = rest.split_whitespace().next().unwrap_or_default();
            UciOutputKind::BestMove(mv.to_string())
        } else {
            UciOutputKind::Other(line.to_string())
        }
    }
}
