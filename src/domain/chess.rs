//! Piece kinds and colors, and their letter/promotion mapping.
//! The shakmaty conversions live here too so the rest of the crate
//! speaks in these types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shakmaty::{Color as SColor, Role};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: PieceColor,
}

/// One row of the piece mapping table
#[derive(Clone, Copy, Debug)]
pub struct PieceEntry {
    pub kind: PieceKind,
    /// SAN letter (pawns have no letter in SAN, 'P' is used in tables)
    pub letter: char,
    /// Promotion flag value in the move encoding, if this kind can be promoted to
    pub promotion: Option<u32>,
}

/// Total mapping letter <-> kind <-> promotion flag
pub const PIECE_TABLE: [PieceEntry; 6] = [
    PieceEntry {
        kind: PieceKind::Pawn,
        letter: 'P',
        promotion: None,
    },
    PieceEntry {
        kind: PieceKind::Knight,
        letter: 'N',
        promotion: Some(0),
    },
    PieceEntry {
        kind: PieceKind::Bishop,
        letter: 'B',
        promotion: Some(1),
    },
    PieceEntry {
        kind: PieceKind::Rook,
        letter: 'R',
        promotion: Some(2),
    },
    PieceEntry {
        kind: PieceKind::Queen,
        letter: 'Q',
        promotion: Some(3),
    },
    PieceEntry {
        kind: PieceKind::King,
        letter: 'K',
        promotion: None,
    },
];

impl PieceKind {
    fn entry(self) -> &'static PieceEntry {
        // every kind has exactly one row
        PIECE_TABLE
            .iter()
            .find(|e| e.kind == self)
            .unwrap_or(&PIECE_TABLE[0])
    }

    /// Look up a kind by its upper-case SAN letter
    pub fn from_letter(letter: char) -> Option<Self> {
        PIECE_TABLE.iter().find(|e| e.letter == letter).map(|e| e.kind)
    }

    pub fn letter(self) -> char {
        self.entry().letter
    }

    /// Promotion flag value, `None` for pawn and king
    pub fn promotion_flag(self) -> Option<u32> {
        self.entry().promotion
    }

    pub fn from_promotion_flag(flag: u32) -> Option<Self> {
        PIECE_TABLE
            .iter()
            .find(|e| e.promotion == Some(flag))
            .map(|e| e.kind)
    }

    pub fn is_promotion_target(self) -> bool {
        self.promotion_flag().is_some()
    }
}

impl PieceColor {
    pub fn opposite(self) -> Self {
        match self {
            PieceColor::White => PieceColor::Black,
            PieceColor::Black => PieceColor::White,
        }
    }

    /// Board y of this color's penultimate rank (rank 7 for White, rank 2 for Black)
    pub fn penultimate_y(self) -> i32 {
        match self {
            PieceColor::White => 1,
            PieceColor::Black => 6,
        }
    }
}

pub fn role_to_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

pub fn kind_to_role(kind: PieceKind) -> Role {
    match kind {
        PieceKind::Pawn => Role::Pawn,
        PieceKind::Knight => Role::Knight,
        PieceKind::Bishop => Role::Bishop,
        PieceKind::Rook => Role::Rook,
        PieceKind::Queen => Role::Queen,
        PieceKind::King => Role::King,
    }
}

pub fn color_from_shakmaty(color: SColor) -> PieceColor {
    match color {
        SColor::White => PieceColor::White,
        SColor::Black => PieceColor::Black,
    }
}

pub fn color_to_shakmaty(color: PieceColor) -> SColor {
    match color {
        PieceColor::White => SColor::White,
        PieceColor::Black => SColor::Black,
    }
}

/// Convert shakmaty piece to our domain Piece
pub fn shakmaty_to_piece(piece: shakmaty::Piece) -> Piece {
    Piece {
        kind: role_to_kind(piece.role),
        color: color_from_shakmaty(piece.color),
    }
}
