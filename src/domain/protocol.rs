//! Text protocol spoken with the background search context.
//!
//! Outbound: `position <fen>`, `search <timeoutMs>,<maxPly>`, or a literal
//! move for informational sync. Inbound: a literal move (the chosen move),
//! `console: <text>` diagnostics, and two legacy prefixes (`pv`, ignored,
//! and `message`, which stops analysis).

/// Prefix of inbound diagnostic lines
pub const CONSOLE_PREFIX: &str = "console: ";

/// Time and depth allowance for one search
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SearchBudget {
    pub timeout_ms: u64,
    pub max_ply: u32,
}

/// Messages sent to the background context
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WorkerCommand {
    /// Replace the context's position
    Position(String),
    /// Find a move for the side to move
    Search(SearchBudget),
    /// A move that was just played, in coordinate text
    Move(String),
}

impl WorkerCommand {
    pub fn to_wire(&self) -> String {
        match self {
            WorkerCommand::Position(fen) => format!("position {fen}"),
            WorkerCommand::Search(budget) => {
                format!("search {},{}", budget.timeout_ms, budget.max_ply)
            }
            WorkerCommand::Move(text) => text.clone(),
        }
    }

    /// Parse an outbound line (used on the worker side)
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(fen) = line.strip_prefix("position ") {
            return Some(WorkerCommand::Position(fen.trim().to_string()));
        }
        if let Some(args) = line.strip_prefix("search ") {
            let (timeout, ply) = args.split_once(',')?;
            return Some(WorkerCommand::Search(SearchBudget {
                timeout_ms: timeout.trim().parse().ok()?,
                max_ply: ply.trim().parse().ok()?,
            }));
        }
        if line.is_empty() || line.contains(char::is_whitespace) {
            return None;
        }
        Some(WorkerCommand::Move(line.to_string()))
    }
}

/// Categorised inbound line
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WorkerOutput {
    /// The move chosen for the outstanding search
    BestMove(String),
    /// Diagnostic text to log
    Console(String),
    /// Legacy principal-variation line, ignored
    Pv(String),
    /// Legacy message, stops analysis
    Message(String),
}

impl WorkerOutput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(CONSOLE_PREFIX) {
            WorkerOutput::Console(rest.to_string())
        } else if line.starts_with("pv") {
            WorkerOutput::Pv(line.to_string())
        } else if let Some(rest) = line.strip_prefix("message") {
            WorkerOutput::Message(rest.trim().to_string())
        } else {
            WorkerOutput::BestMove(line.to_string())
        }
    }

    pub fn console(text: impl AsRef<str>) -> String {
        format!("{CONSOLE_PREFIX}{}", text.as_ref())
    }
}
