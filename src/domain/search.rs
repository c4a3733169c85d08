//! Fallback move search.
//!
//! A small material searcher used by the built-in background worker and by
//! the synchronous fallback when no background context can be created. It
//! works on FEN text in and coordinate move text out, so it can run on
//! either side of the worker channel.

use std::time::{Duration, Instant};

use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Role};

use super::protocol::SearchBudget;
use super::rules::encode_move;

/// Deepest the fallback searcher will look, whatever the budget says
pub const MAX_FALLBACK_DEPTH: u32 = 2;

const MATE_SCORE: i32 = 100_000;

/// Anything that can pick a move for a position
pub trait Searcher: Send + Sync {
    /// Best move in coordinate text, or `None` if the side to move has no moves
    fn search(&self, fen: &str, budget: SearchBudget) -> Option<String>;
}

/// Shallow material search with mate detection
#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialSearcher;

impl Searcher for MaterialSearcher {
    fn search(&self, fen: &str, budget: SearchBudget) -> Option<String> {
        let parsed: Fen = fen.parse().ok()?;
        let position: Chess = parsed.into_position(CastlingMode::Standard).ok()?;
        let depth = budget.max_ply.clamp(1, MAX_FALLBACK_DEPTH);
        let deadline = Instant::now() + Duration::from_millis(budget.timeout_ms);

        let moves = position.legal_moves();
        let mut best: Option<(&Move, i32)> = None;
        for (i, m) in moves.iter().enumerate() {
            // always score at least one move, then respect the deadline
            if i > 0 && Instant::now() >= deadline {
                break;
            }
            let Ok(after) = position.clone().play(m.clone()) else {
                continue;
            };
            let score = -negamax(&after, depth - 1);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((m, score));
            }
        }

        best.and_then(|(m, _)| encode_move(m)).map(|mv| mv.to_string())
    }
}

fn negamax(position: &Chess, depth: u32) -> i32 {
    let moves = position.legal_moves();
    if moves.is_empty() {
        return if position.is_check() { -MATE_SCORE } else { 0 };
    }
    if depth == 0 {
        return material(position);
    }
    moves
        .iter()
        .filter_map(|m| position.clone().play(m.clone()).ok())
        .map(|after| -negamax(&after, depth - 1))
        .max()
        .unwrap_or(0)
}

/// Material balance from the side to move's point of view
fn material(position: &Chess) -> i32 {
    let board = position.board();
    let mut score = 0;
    for square in board.occupied() {
        if let Some(piece) = board.piece_at(square) {
            let value = role_value(piece.role);
            score += if piece.color == Color::White { value } else { -value };
        }
    }
    if position.turn() == Color::White { score } else { -score }
}

fn role_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 300,
        Role::Bishop => 320,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max_ply: u32) -> SearchBudget {
        SearchBudget {
            timeout_ms: 1000,
            max_ply,
        }
    }

    #[test]
    fn test_finds_mate_in_one() {
        // back rank mate: Ra8#
        let fen = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
        assert_eq!(
            MaterialSearcher.search(fen, budget(1)).as_deref(),
            Some("a1a8")
        );
    }

    #[test]
    fn test_takes_hanging_queen() {
        let fen = "4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1";
        assert_eq!(
            MaterialSearcher.search(fen, budget(1)).as_deref(),
            Some("d1d5")
        );
    }

    #[test]
    fn test_avoids_defended_queen_at_depth_two() {
        // the rook is defended by a pawn, taking loses the queen
        let fen = "4k3/2p5/3r4/8/8/8/8/3QK3 w - - 0 1";
        assert_ne!(
            MaterialSearcher.search(fen, budget(2)).as_deref(),
            Some("d1d6")
        );
    }

    #[test]
    fn test_no_moves() {
        // black is checkmated
        let fen = "R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1";
        assert_eq!(MaterialSearcher.search(fen, budget(2)), None);
        assert_eq!(MaterialSearcher.search("garbage", budget(2)), None);
    }

    #[test]
    fn test_zero_timeout_still_answers() {
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        let budget = SearchBudget {
            timeout_ms: 0,
            max_ply: 1,
        };
        assert!(MaterialSearcher.search(fen, budget).is_some());
    }
}
