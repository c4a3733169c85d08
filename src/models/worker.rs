//! Background execution contexts for the engine session.
//!
//! A context is reachable only through two text channels: commands in,
//! events out. Nothing else is shared with the UI side. Three spawners
//! exist:
//! - [`ThreadSpawner`]: an OS thread running the fallback searcher
//! - [`UciProcessSpawner`]: an external UCI engine, with reader/writer threads
//!   translating between UCI and the worker protocol
//! - [`InlineSpawner`]: always fails, forcing synchronous search

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::{debug, warn};

use crate::domain::protocol::{WorkerCommand, WorkerOutput};
use crate::domain::search::Searcher;
use crate::domain::uci::{UciCommand, UciOutputKind};
use crate::domain::{RulesEngine, ShakmatyRules};

/// Messages sent from a context's reader side to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// A line in the worker protocol
    Output(String),
    /// The context exited
    Exited,
    /// Error occurred
    Error(String),
}

/// Creates background contexts
pub trait BackgroundSpawner: Send {
    fn spawn(&self) -> io::Result<BackgroundContext>;
}

/// A live background context, owned by exactly one engine session
pub struct BackgroundContext {
    commands: Sender<String>,
    events: Receiver<WorkerEvent>,
    process: Option<Child>,
}

impl BackgroundContext {
    pub fn new(commands: Sender<String>, events: Receiver<WorkerEvent>) -> Self {
        Self {
            commands,
            events,
            process: None,
        }
    }

    fn with_process(mut self, child: Child) -> Self {
        self.process = Some(child);
        self
    }

    fn take_pipes(&mut self) -> io::Result<(ChildStdin, ChildStdout)> {
        let child = self
            .process
            .as_mut()
            .ok_or_else(|| io::Error::other("context has no engine process"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("failed to open engine stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("failed to open engine stdout"))?;
        Ok((stdin, stdout))
    }

    /// Send one protocol line. Returns false if the context is gone.
    pub fn send(&self, line: String) -> bool {
        self.commands.send(line).is_ok()
    }

    /// All events available right now
    pub fn drain(&self) -> Vec<WorkerEvent> {
        let mut collected = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            collected.push(event);
        }
        collected
    }

    /// Tear the context down. Outstanding requests are dropped.
    pub fn terminate(mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        // dropping the channels stops any worker thread after its current step
    }
}

impl Drop for BackgroundContext {
    fn drop(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Runs the fallback searcher on its own OS thread
pub struct ThreadSpawner {
    searcher: Arc<dyn Searcher>,
}

impl ThreadSpawner {
    pub fn new(searcher: Arc<dyn Searcher>) -> Self {
        Self { searcher }
    }
}

impl BackgroundSpawner for ThreadSpawner {
    fn spawn(&self) -> io::Result<BackgroundContext> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<String>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();
        let searcher = Arc::clone(&self.searcher);

        thread::Builder::new()
            .name("search-worker".to_string())
            .spawn(move || run_search_worker(cmd_rx, event_tx, searcher))?;

        Ok(BackgroundContext::new(cmd_tx, event_rx))
    }
}

/// Worker loop: keeps its own copy of the position and answers each
/// search with exactly one move, or a `message` when there is none
fn run_search_worker(
    commands: Receiver<String>,
    events: Sender<WorkerEvent>,
    searcher: Arc<dyn Searcher>,
) {
    let mut rules = ShakmatyRules::new();
    let reply = |line: String| events.send(WorkerEvent::Output(line)).is_ok();

    while let Ok(line) = commands.recv() {
        let Some(command) = WorkerCommand::parse(&line) else {
            if !reply(WorkerOutput::console(format!("unknown command {line:?}"))) {
                break;
            }
            continue;
        };

        let delivered = match command {
            WorkerCommand::Position(fen) => match ShakmatyRules::from_fen(&fen) {
                Ok(loaded) => {
                    rules = loaded;
                    true
                }
                Err(e) => reply(WorkerOutput::console(e.to_string())),
            },
            WorkerCommand::Move(text) => match rules.parse_move(&text) {
                Some(mv) => match rules.make_move(mv) {
                    Ok(()) => true,
                    Err(e) => reply(WorkerOutput::console(e.to_string())),
                },
                None => reply(WorkerOutput::console(format!("ignoring illegal move {text}"))),
            },
            WorkerCommand::Search(budget) => match searcher.search(&rules.fen(), budget) {
                Some(text) => {
                    if let Some(mv) = rules.parse_move(&text) {
                        let _ = rules.make_move(mv);
                    }
                    reply(text)
                }
                None => reply("message no legal moves".to_string()),
            },
        };
        if !delivered {
            break;
        }
    }
    let _ = events.send(WorkerEvent::Exited);
}

/// Spawns an external UCI engine
pub struct UciProcessSpawner {
    path: PathBuf,
}

impl UciProcessSpawner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BackgroundSpawner for UciProcessSpawner {
    fn spawn(&self) -> io::Result<BackgroundContext> {
        let child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();
        let (cmd_tx, cmd_rx) = mpsc::channel::<String>();
        let echo_tx = cmd_tx.clone();

        // dropping the context from here on kills the engine process
        let mut context = BackgroundContext::new(cmd_tx, event_rx).with_process(child);
        let (stdin, stdout) = context.take_pipes()?;

        thread::Builder::new()
            .name("uci-reader".to_string())
            .spawn(move || run_uci_reader(BufReader::new(stdout), event_tx, echo_tx))?;

        thread::Builder::new()
            .name("uci-writer".to_string())
            .spawn(move || run_uci_writer(stdin, cmd_rx))?;

        for cmd in [UciCommand::Uci, UciCommand::IsReady, UciCommand::UciNewGame] {
            context.send(cmd.to_uci_string());
        }
        Ok(context)
    }
}

/// Reader: UCI output -> worker protocol. Best moves are also echoed to
/// the writer so its move list stays in step with the engine.
fn run_uci_reader<R: BufRead>(reader: R, events: Sender<WorkerEvent>, echo: Sender<String>) {
    for line in reader.lines() {
        let text = match line {
            Ok(text) => text,
            Err(e) => {
                let _ = events.send(WorkerEvent::Error(e.to_string()));
                break;
            }
        };
        let translated = match UciOutputKind::parse(&text) {
            UciOutputKind::BestMove(mv) if mv.is_empty() || mv == "(none)" => {
                "message no legal moves".to_string()
            }
            UciOutputKind::BestMove(mv) => {
                let _ = echo.send(mv.clone());
                mv
            }
            UciOutputKind::Info(info) => WorkerOutput::console(format!("info {info}")),
            UciOutputKind::UciOk | UciOutputKind::ReadyOk => continue,
            UciOutputKind::Other(other) => WorkerOutput::console(other),
        };
        if events.send(WorkerEvent::Output(translated)).is_err() {
            break;
        }
    }
    let _ = events.send(WorkerEvent::Exited);
}

/// Writer: worker protocol -> UCI. Raw UCI lines pass through unchanged.
fn run_uci_writer<W: Write>(mut stdin: W, commands: Receiver<String>) {
    let mut fen: Option<String> = None;
    let mut moves: Vec<String> = Vec::new();

    while let Ok(line) = commands.recv() {
        let outgoing = match WorkerCommand::parse(&line) {
            Some(WorkerCommand::Position(new_fen)) => {
                fen = Some(new_fen);
                moves.clear();
                continue;
            }
            Some(WorkerCommand::Move(mv)) if is_coordinate_move(&mv) => {
                moves.push(mv);
                continue;
            }
            Some(WorkerCommand::Search(budget)) => {
                let Some(fen) = fen.clone() else {
                    warn!("search requested before any position was sent");
                    continue;
                };
                let position = UciCommand::Position {
                    fen,
                    moves: moves.clone(),
                };
                vec![position.to_uci_string(), UciCommand::Go(budget).to_uci_string()]
            }
            _ => vec![line],
        };

        for cmd in outgoing {
            debug!(command = %cmd, "to engine");
            if writeln!(stdin, "{cmd}").is_err() || stdin.flush().is_err() {
                return;
            }
        }
    }
    for cmd in [UciCommand::Stop, UciCommand::Quit] {
        let _ = writeln!(stdin, "{}", cmd.to_uci_string());
    }
    let _ = stdin.flush();
}

/// "e2e4" / "e7e8q" shaped text, as opposed to a UCI keyword
fn is_coordinate_move(text: &str) -> bool {
    let bytes = text.as_bytes();
    let square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
    match bytes {
        [f1, r1, f2, r2] => square(*f1, *r1) && square(*f2, *r2),
        [f1, r1, f2, r2, p] => square(*f1, *r1) && square(*f2, *r2) && b"nbrq".contains(p),
        _ => false,
    }
}

/// Never creates a context; every search runs synchronously
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineSpawner;

impl BackgroundSpawner for InlineSpawner {
    fn spawn(&self) -> io::Result<BackgroundContext> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "background search disabled",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::MaterialSearcher;
    use std::time::{Duration, Instant};

    fn wait_for_output(context: &BackgroundContext) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut lines = Vec::new();
        while lines.is_empty() && Instant::now() < deadline {
            for event in context.drain() {
                if let WorkerEvent::Output(line) = event {
                    lines.push(line);
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        lines
    }

    #[test]
    fn test_thread_worker_answers_search() {
        let context = ThreadSpawner::new(Arc::new(MaterialSearcher)).spawn().unwrap();
        context.send("position 4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1".to_string());
        context.send("search 100,1".to_string());
        assert_eq!(wait_for_output(&context), vec!["d1d5".to_string()]);
        context.terminate();
    }

    #[test]
    fn test_thread_worker_follows_played_moves() {
        let context = ThreadSpawner::new(Arc::new(MaterialSearcher)).spawn().unwrap();
        // after 1. f3 e5 2. g4, black mates with Qh4
        context.send("position rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1".into());
        for mv in ["f2f3", "e7e5", "g2g4"] {
            context.send(mv.to_string());
        }
        context.send("search 500,1".to_string());
        assert_eq!(wait_for_output(&context), vec!["d8h4".to_string()]);
    }

    #[test]
    fn test_thread_worker_reports_no_moves() {
        let context = ThreadSpawner::new(Arc::new(MaterialSearcher)).spawn().unwrap();
        context.send("position R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1".to_string());
        context.send("search 10,1".to_string());
        let lines = wait_for_output(&context);
        assert!(matches!(
            WorkerOutput::parse(&lines[0]),
            WorkerOutput::Message(_)
        ));
    }

    #[test]
    fn test_inline_spawner_fails() {
        assert!(InlineSpawner.spawn().is_err());
    }

    #[test]
    fn test_missing_engine_binary_fails() {
        let spawner = UciProcessSpawner::new("/nonexistent/engine/binary");
        assert!(spawner.spawn().is_err());
    }

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Feed `lines` through the UCI writer and return what reached the engine
    fn written(lines: &[&str]) -> Vec<String> {
        let (tx, rx) = mpsc::channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        drop(tx);
        let mut out = Vec::new();
        run_uci_writer(&mut out, rx);
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_uci_writer_builds_position_and_go() {
        let lines = written(&[
            format!("position {START}").as_str(),
            "e2e4",
            "e7e5",
            "search 1600,160",
        ]);
        assert_eq!(
            lines,
            vec![
                format!("position fen {START} moves e2e4 e7e5"),
                "go movetime 1600 depth 160".to_string(),
                "stop".to_string(),
                "quit".to_string(),
            ]
        );
    }

    #[test]
    fn test_uci_writer_new_position_clears_moves() {
        let after_e4 = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let lines = written(&[
            format!("position {START}").as_str(),
            "e2e4",
            format!("position {after_e4}").as_str(),
            "search 100,1",
        ]);
        assert_eq!(lines[0], format!("position fen {after_e4}"));
        assert_eq!(lines[1], "go movetime 100 depth 1");
    }

    #[test]
    fn test_uci_writer_passes_uci_lines_through() {
        let lines = written(&["uci", "isready", "ucinewgame"]);
        assert_eq!(lines, ["uci", "isready", "ucinewgame", "stop", "quit"]);
    }

    #[test]
    fn test_uci_writer_skips_search_without_position() {
        assert_eq!(written(&["search 100,1"]), ["stop", "quit"]);
    }

    #[test]
    fn test_uci_reader_translates_output() {
        let engine_output = "id name Example\n\
                             uciok\n\
                             readyok\n\
                             info depth 1 pv e2e4\n\
                             bestmove e2e4 ponder e7e5\n\
                             bestmove (none)\n";
        let (event_tx, event_rx) = mpsc::channel();
        let (echo_tx, echo_rx) = mpsc::channel();
        run_uci_reader(io::Cursor::new(engine_output), event_tx, echo_tx);

        let output = |s: &str| WorkerEvent::Output(s.to_string());
        let events: Vec<WorkerEvent> = event_rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                output("console: id name Example"),
                output("console: info depth 1 pv e2e4"),
                output("e2e4"),
                output("message no legal moves"),
                WorkerEvent::Exited,
            ]
        );
        // only real moves are echoed to the writer
        assert_eq!(echo_rx.try_iter().collect::<Vec<_>>(), ["e2e4"]);
    }

    #[test]
    fn test_coordinate_move_shape() {
        assert!(is_coordinate_move("e2e4"));
        assert!(is_coordinate_move("a7a8q"));
        assert!(!is_coordinate_move("isready"));
        assert!(!is_coordinate_move("stop"));
        assert!(!is_coordinate_move("e2e4k"));
    }
}
