//! Terminal driver: reads commands, feeds them to the game session and
//! prints the board.
//!
//! This loop is the single execution context that mutates the session.
//! After every command it polls the engine until no answer is outstanding.

use std::fs;
use std::io::{BufRead, Write};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::warn;

use crate::domain::{PieceColor, PieceKind, RulesEngine, Square};
use crate::models::{GameSession, GameStatus, PointerOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Extra time an engine gets past its budget before the search is abandoned
const ENGINE_GRACE: Duration = Duration::from_secs(10);

const HELP: &str = "\
commands:
  <from> <to> | move <from> <to>   play a move, e.g. `e2 e4`
  undo                             take back to your last move
  new <white|black> [level]        start a new game
  fen <FEN>                        set up a position
  load <file> | save <file>        read or write a transcript
  pgn                              print the transcript
  board                            print the board
  moves <square>                   list destinations from a square
  promote <q|r|b|n>                piece for pawn promotions
  level <0-9>                      engine strength
  quit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Driver<W: Write> {
    game: GameSession,
    out: W,
}

impl<W: Write> Driver<W> {
    pub fn new(game: GameSession, out: W) -> Self {
        Self { game, out }
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    /// Read commands until `quit` or end of input
    pub fn run(&mut self, input: impl BufRead) -> Result<()> {
        self.settle()?;
        self.print_board()?;
        writeln!(self.out, "type `help` for commands")?;

        for line in input.lines() {
            let line = line.context("failed to read command")?;
            match self.execute(&line) {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(self.out, "error: {e:#}")?,
            }
            self.out.flush()?;
        }
        Ok(())
    }

    pub fn execute(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            return Ok(Flow::Continue);
        };

        match command.to_lowercase().as_str() {
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => writeln!(self.out, "{HELP}")?,
            "move" => self.play(args)?,
            "undo" => {
                let undone = self.game.undo()?;
                writeln!(self.out, "took back {undone} move(s)")?;
                self.print_board()?;
            }
            "new" => {
                let color = match args.first().copied() {
                    None | Some("white") | Some("w") => PieceColor::White,
                    Some("black") | Some("b") => PieceColor::Black,
                    Some(other) => bail!("unknown color {other:?}"),
                };
                let level = args
                    .get(1)
                    .map(|l| l.parse::<usize>())
                    .transpose()
                    .context("level must be a number")?;
                self.game.new_game(color, level)?;
                self.settle()?;
                self.print_board()?;
            }
            "fen" => {
                let fen = line[command.len()..].trim();
                self.game.load_fen(fen)?;
                self.print_board()?;
            }
            "load" => {
                let path = args.first().ok_or_else(|| anyhow!("usage: load <file>"))?;
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {path}"))?;
                let loaded = self.game.load_movetext(&text)?;
                writeln!(self.out, "loaded {loaded} move(s)")?;
                self.print_board()?;
            }
            "save" => {
                let path = args.first().ok_or_else(|| anyhow!("usage: save <file>"))?;
                fs::write(path, self.game.transcript())
                    .with_context(|| format!("failed to write {path}"))?;
                writeln!(self.out, "saved to {path}")?;
            }
            "pgn" => write!(self.out, "{}", self.game.transcript())?,
            "board" => self.print_board()?,
            "moves" => {
                let square: Square = args
                    .first()
                    .ok_or_else(|| anyhow!("usage: moves <square>"))?
                    .parse()?;
                let targets: Vec<String> = self
                    .game
                    .legal_targets(square)
                    .into_iter()
                    .map(Square::notation)
                    .collect();
                writeln!(self.out, "{square}: {}", targets.join(" "))?;
            }
            "promote" => {
                let kind = args
                    .first()
                    .and_then(|a| a.chars().next())
                    .and_then(|c| PieceKind::from_letter(c.to_ascii_uppercase()))
                    .ok_or_else(|| anyhow!("usage: promote <q|r|b|n>"))?;
                if !self.game.set_default_promotion(kind) {
                    bail!("cannot promote to {kind:?}");
                }
                writeln!(self.out, "promoting to {kind:?}")?;
            }
            "level" => {
                let level: usize = args
                    .first()
                    .ok_or_else(|| anyhow!("usage: level <0-9>"))?
                    .parse()
                    .context("level must be a number")?;
                self.game.set_level(level)?;
                writeln!(self.out, "level {level}")?;
            }
            _ => self.play(&parts)?,
        }
        Ok(Flow::Continue)
    }

    fn play(&mut self, args: &[&str]) -> Result<()> {
        let [from, to] = args else {
            bail!("unknown command, type `help`");
        };
        let from: Square = from.parse()?;
        let to: Square = to.parse()?;

        match self.game.play_pointer_move(from, to)? {
            PointerOutcome::Moved(_) => {
                self.settle()?;
                self.print_board()
            }
            PointerOutcome::NoMove => {
                writeln!(self.out, "no move from {from} to {to}")?;
                Ok(())
            }
        }
    }

    /// Poll the engine until its answer is in
    fn settle(&mut self) -> Result<()> {
        let budget = Duration::from_millis(self.game.engine().budget().timeout_ms);
        let deadline = Instant::now() + budget + ENGINE_GRACE;

        self.game.poll_engine()?;
        while self.game.is_engine_thinking() {
            if Instant::now() >= deadline {
                warn!("engine did not answer in time, abandoning search");
                self.game.cancel_search();
                break;
            }
            thread::sleep(POLL_INTERVAL);
            self.game.poll_engine()?;
        }
        Ok(())
    }

    fn print_board(&mut self) -> Result<()> {
        let board = render_board(&self.game);
        write!(self.out, "{board}")?;
        Ok(())
    }
}

/// Text board, rank 8 at the top, White pieces in upper case
pub fn render_board(game: &GameSession) -> String {
    let rules = game.rules();
    let mut out = String::new();

    for y in 0..8 {
        out.push_str(&format!("{} ", 8 - y));
        for x in 0..8 {
            let cell = Square::from_coords(x, y)
                .ok()
                .and_then(|square| rules.piece_at(square))
                .map(|piece| match piece.color {
                    PieceColor::White => piece.kind.letter(),
                    PieceColor::Black => piece.kind.letter().to_ascii_lowercase(),
                })
                .unwrap_or('.');
            out.push(' ');
            out.push(cell);
        }
        out.push('\n');
    }
    out.push_str("   a b c d e f g h\n");

    let status = match game.status() {
        GameStatus::Ongoing => format!("{:?} to move", rules.turn()),
        GameStatus::Check => format!("{:?} to move, check", rules.turn()),
        GameStatus::Checkmate => format!("checkmate, {:?} wins", rules.turn().opposite()),
        GameStatus::Stalemate => "stalemate".to_string(),
    };
    out.push_str(&status);
    out.push('\n');
    out
}
