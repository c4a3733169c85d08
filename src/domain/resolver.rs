//! Move resolution: from a parsed token or a pointer pick to one legal move.
//!
//! Both entry points only ever return a move taken from the legal move set
//! the rules engine generated for the current position.
//!
//! Resolution takes the first matching move and does not check that the
//! match is unique. Ambiguous notation in a hand-edited transcript can
//! therefore pick the wrong piece.

use thiserror::Error;

use super::chess::{PieceColor, PieceKind};
use super::encoded::EncodedMove;
use super::movetext::MoveToken;
use super::rules::RulesEngine;
use super::square::Square;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no legal move matches {raw:?} ({color:?} {piece:?} to {to})")]
    NoLegalMove {
        raw: String,
        piece: PieceKind,
        color: PieceColor,
        to: Square,
    },
}

/// First legal move from `from` to `to`, with the given promotion if one is requested
pub fn find_move(
    legal: &[EncodedMove],
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
) -> Option<EncodedMove> {
    legal.iter().copied().find(|mv| {
        mv.connects(from, to) && promotion.is_none_or(|kind| mv.promotion() == Some(kind))
    })
}

/// Resolve a movetext token against the current position
pub fn resolve_token<R: RulesEngine>(
    rules: &R,
    token: &MoveToken,
) -> Result<EncodedMove, ResolveError> {
    let legal = rules.legal_moves();

    rules
        .piece_squares(token.color, token.piece)
        .into_iter()
        .filter(|start| token.hint.admits(*start))
        .find_map(|start| find_move(&legal, start, token.to, token.promotion))
        .ok_or_else(|| ResolveError::NoLegalMove {
            raw: token.raw.clone(),
            piece: token.piece,
            color: token.color,
            to: token.to,
        })
}

/// Resolve a pointer pick (start and end square) for the side to move.
///
/// A pawn on its penultimate rank promotes to `promotion`. Returns `None`
/// when no legal move connects the two squares.
pub fn resolve_pointer<R: RulesEngine>(
    rules: &R,
    from: Square,
    to: Square,
    promotion: PieceKind,
) -> Option<EncodedMove> {
    if from == to {
        return None;
    }

    let side = rules.turn();
    let promoting = rules.piece_at(from).is_some_and(|piece| {
        piece.kind == PieceKind::Pawn && piece.color == side && from.y() == side.penultimate_y()
    });

    let legal = rules.legal_moves();
    if promoting {
        find_move(&legal, from, to, Some(promotion))
    } else {
        find_move(&legal, from, to, None)
    }
}

/// Destination squares reachable from `from`, for highlighting
pub fn legal_targets<R: RulesEngine>(rules: &R, from: Square) -> Vec<Square> {
    let mut targets: Vec<Square> = rules
        .legal_moves()
        .into_iter()
        .filter(|mv| mv.from() == from)
        .map(EncodedMove::to)
        .collect();
    targets.dedup();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::movetext::{self, Hint};
    use crate::domain::rules::ShakmatyRules;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn token(text: &str, color: PieceColor) -> MoveToken {
        let mut parsed = movetext::parse(text).sequence;
        let mut token = parsed.remove(0);
        token.color = color;
        token
    }

    #[test]
    fn test_resolve_pawn_and_knight() {
        let rules = ShakmatyRules::new();
        let mv = resolve_token(&rules, &token("e4", PieceColor::White)).unwrap();
        assert!(mv.connects(sq("e2"), sq("e4")));

        let mv = resolve_token(&rules, &token("Nf3", PieceColor::White)).unwrap();
        assert!(mv.connects(sq("g1"), sq("f3")));
        assert!(rules.legal_moves().contains(&mv));
    }

    #[test]
    fn test_unresolvable_token() {
        let rules = ShakmatyRules::new();
        let err = resolve_token(&rules, &token("Nf4", PieceColor::White)).unwrap_err();
        assert!(matches!(err, ResolveError::NoLegalMove { ref raw, .. } if raw == "Nf4"));
    }

    #[test]
    fn test_file_hint_disambiguates() {
        // knights on b1 and f1 (no bishop) can both reach d2
        let rules = ShakmatyRules::from_fen("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1").unwrap();
        let from_b = resolve_token(&rules, &token("Nbd2", PieceColor::White)).unwrap();
        assert!(from_b.connects(sq("b1"), sq("d2")));
        let from_f = resolve_token(&rules, &token("Nfd2", PieceColor::White)).unwrap();
        assert!(from_f.connects(sq("f1"), sq("d2")));
    }

    #[test]
    fn test_rank_hint_disambiguates() {
        let rules = ShakmatyRules::from_fen("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1").unwrap();
        let mv = resolve_token(&rules, &token("R1a3", PieceColor::White)).unwrap();
        assert!(mv.connects(sq("a1"), sq("a3")));
        let mv = resolve_token(&rules, &token("R5a3", PieceColor::White)).unwrap();
        assert!(mv.connects(sq("a5"), sq("a3")));
    }

    #[test]
    fn test_square_hint_must_match_exactly() {
        let rules = ShakmatyRules::from_fen("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1").unwrap();
        let mut tok = token("Ra3", PieceColor::White);
        tok.hint = Hint::Square(sq("b1"));
        assert!(resolve_token(&rules, &tok).is_err());
    }

    #[test]
    fn test_promotion_flag_must_match() {
        let rules = ShakmatyRules::from_fen("8/P7/8/8/8/8/8/k1K5 w - - 0 1").unwrap();
        for (text, kind) in [
            ("a8=Q", PieceKind::Queen),
            ("a8=R", PieceKind::Rook),
            ("a8=B", PieceKind::Bishop),
            ("a8=N", PieceKind::Knight),
        ] {
            let mv = resolve_token(&rules, &token(text, PieceColor::White)).unwrap();
            assert_eq!(mv.promotion(), Some(kind));
            assert!(rules.legal_moves().contains(&mv));
        }
        assert!(resolve_token(&rules, &token("a8=K", PieceColor::White)).is_err());
    }

    #[test]
    fn test_castling_and_en_passant_resolve_by_squares() {
        let rules =
            ShakmatyRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1").unwrap();
        let mv = resolve_token(&rules, &token("O-O-O", PieceColor::Black)).unwrap();
        assert!(mv.is_castle());
        assert!(mv.connects(sq("e8"), sq("c8")));

        let rules =
            ShakmatyRules::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let mv = resolve_token(&rules, &token("exd6", PieceColor::White)).unwrap();
        assert!(mv.is_en_passant());
    }

    #[test]
    fn test_pointer_plain_move() {
        let rules = ShakmatyRules::new();
        let mv = resolve_pointer(&rules, sq("g1"), sq("f3"), PieceKind::Queen).unwrap();
        assert!(mv.connects(sq("g1"), sq("f3")));
        assert_eq!(resolve_pointer(&rules, sq("g1"), sq("g3"), PieceKind::Queen), None);
        assert_eq!(resolve_pointer(&rules, sq("e2"), sq("e2"), PieceKind::Queen), None);
    }

    #[test]
    fn test_pointer_promotion_uses_default_piece() {
        let rules = ShakmatyRules::from_fen("8/P7/8/8/8/8/8/k1K5 w - - 0 1").unwrap();
        let mv = resolve_pointer(&rules, sq("a7"), sq("a8"), PieceKind::Knight).unwrap();
        assert_eq!(mv.promotion(), Some(PieceKind::Knight));

        let black = ShakmatyRules::from_fen("K1k5/8/8/8/8/8/p7/8 b - - 0 1").unwrap();
        let mv = resolve_pointer(&black, sq("a2"), sq("a1"), PieceKind::Rook).unwrap();
        assert_eq!(mv.promotion(), Some(PieceKind::Rook));
    }

    #[test]
    fn test_pointer_castling() {
        let rules = ShakmatyRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = resolve_pointer(&rules, sq("e1"), sq("g1"), PieceKind::Queen).unwrap();
        assert!(mv.is_castle());
    }

    #[test]
    fn test_legal_targets() {
        let rules = ShakmatyRules::new();
        let mut targets = legal_targets(&rules, sq("b1"));
        targets.sort_by_key(|s| s.index());
        assert_eq!(targets, vec![sq("a3"), sq("c3")]);
        assert!(legal_targets(&rules, sq("e4")).is_empty());
    }
}
