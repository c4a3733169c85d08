//! Legal move encoding.
//!
//! Bits 0-7 hold the start square index, bits 8-15 the end square index
//! and the remaining bits the move kind flags. Castling is encoded as the
//! king's own move (e1g1, e8c8, ...).

use std::fmt;

use super::chess::PieceKind;
use super::square::Square;

pub const FLAG_CAPTURE: u32 = 1 << 16;
pub const FLAG_CASTLE_KING: u32 = 1 << 17;
pub const FLAG_CASTLE_QUEEN: u32 = 1 << 18;
pub const FLAG_EN_PASSANT: u32 = 1 << 19;
pub const FLAG_PROMOTION: u32 = 1 << 20;

const PROMOTION_SHIFT: u32 = 21;
const PROMOTION_MASK: u32 = 0b11 << PROMOTION_SHIFT;

/// A legal move as handed out by the rules engine
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EncodedMove(u32);

impl EncodedMove {
    /// Pack a move. Only the rules adapter should need this.
    pub fn new(from: Square, to: Square, flags: u32) -> Self {
        Self(from.index() as u32 | (to.index() as u32) << 8 | flags)
    }

    /// Promotion flags for the given kind; empty for kinds that cannot be promoted to
    pub fn promotion_flags(kind: PieceKind) -> u32 {
        match kind.promotion_flag() {
            Some(flag) => FLAG_PROMOTION | flag << PROMOTION_SHIFT,
            None => 0,
        }
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from(self) -> Square {
        square_at(self.0 & 0xFF)
    }

    pub fn to(self) -> Square {
        square_at((self.0 >> 8) & 0xFF)
    }

    pub fn is_capture(self) -> bool {
        self.0 & FLAG_CAPTURE != 0
    }

    pub fn is_castle(self) -> bool {
        self.0 & (FLAG_CASTLE_KING | FLAG_CASTLE_QUEEN) != 0
    }

    pub fn is_en_passant(self) -> bool {
        self.0 & FLAG_EN_PASSANT != 0
    }

    pub fn promotion(self) -> Option<PieceKind> {
        if self.0 & FLAG_PROMOTION == 0 {
            return None;
        }
        PieceKind::from_promotion_flag((self.0 & PROMOTION_MASK) >> PROMOTION_SHIFT)
    }

    /// Same start and end squares
    pub fn connects(self, from: Square, to: Square) -> bool {
        self.from() == from && self.to() == to
    }
}

fn square_at(index: u32) -> Square {
    Square::from_masked_index(index)
}

/// Coordinate notation, e.g. "e2e4" or "e7e8q"
impl fmt::Display for EncodedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(kind) = self.promotion() {
            write!(f, "{}", kind.letter().to_ascii_lowercase())?;
        }
        Ok(())
    }
}
