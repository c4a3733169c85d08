//! Board coordinates.
//!
//! A square can be named three ways: by notation ("e4"), by linear index
//! (0..64, `x + y * 8`) and by `(x, y)` coordinates. The y axis runs from
//! rank 8 (y = 0) down to rank 1 (y = 7), matching the bottom-left origin
//! of the render space.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of files (and ranks) on the board
pub const BOARD_SIDE: i32 = 8;

/// Errors raised when building a square from bad input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SquareError {
    #[error("invalid square notation: {0:?}")]
    InvalidNotation(String),
    #[error("square index {0} is outside 0..64")]
    IndexOutOfRange(usize),
    #[error("coordinates ({x}, {y}) are outside the board")]
    CoordinatesOutOfRange { x: i32, y: i32 },
}

/// A single board square. Immutable once built.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Square {
    x: u8,
    y: u8,
}

impl Square {
    /// Whether `(x, y)` lies on the board
    pub fn is_valid(x: i32, y: i32) -> bool {
        (0..BOARD_SIDE).contains(&x) && (0..BOARD_SIDE).contains(&y)
    }

    /// Build from notation like "a1" or "h8"
    pub fn from_notation(notation: &str) -> Result<Self, SquareError> {
        let invalid = || SquareError::InvalidNotation(notation.to_string());
        let bytes = notation.as_bytes();
        if bytes.len() != 2 {
            return Err(invalid());
        }
        let (file, rank) = (bytes[0], bytes[1]);
        if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
            return Err(invalid());
        }
        Ok(Self {
            x: file - b'a',
            y: 7 - (rank - b'1'),
        })
    }

    /// Build from a linear index (`x + y * 8`)
    pub fn from_index(index: usize) -> Result<Self, SquareError> {
        if index >= 64 {
            return Err(SquareError::IndexOutOfRange(index));
        }
        Ok(Self {
            x: (index % 8) as u8,
            y: (index / 8) as u8,
        })
    }

    /// Index bytes written by the move encoding are always in range
    pub(crate) fn from_masked_index(index: u32) -> Self {
        let index = (index & 63) as u8;
        Self {
            x: index % 8,
            y: index / 8,
        }
    }

    /// Build from 0-based `(x, y)` coordinates
    pub fn from_coords(x: i32, y: i32) -> Result<Self, SquareError> {
        if !Self::is_valid(x, y) {
            return Err(SquareError::CoordinatesOutOfRange { x, y });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    pub fn x(self) -> i32 {
        i32::from(self.x)
    }

    pub fn y(self) -> i32 {
        i32::from(self.y)
    }

    pub fn index(self) -> usize {
        usize::from(self.x) + usize::from(self.y) * 8
    }

    /// File letter, 'a'..='h'
    pub fn file_char(self) -> char {
        char::from(b'a' + self.x)
    }

    /// Rank digit, '1'..='8'
    pub fn rank_char(self) -> char {
        char::from(b'1' + (7 - self.y))
    }

    /// Notation string, e.g. "e4"
    pub fn notation(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_char(), self.rank_char())
    }
}

impl FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_notation(s)
    }
}

impl TryFrom<&str> for Square {
    type Error = SquareError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_notation(value)
    }
}

impl TryFrom<usize> for Square {
    type Error = SquareError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::from_index(value)
    }
}

impl TryFrom<(i32, i32)> for Square {
    type Error = SquareError;

    fn try_from((x, y): (i32, i32)) -> Result<Self, Self::Error> {
        Self::from_coords(x, y)
    }
}

impl PartialEq<str> for Square {
    fn eq(&self, other: &str) -> bool {
        let bytes = other.as_bytes();
        bytes.len() == 2
            && char::from(bytes[0]) == self.file_char()
            && char::from(bytes[1]) == self.rank_char()
    }
}

impl PartialEq<&str> for Square {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl PartialEq<(i32, i32)> for Square {
    fn eq(&self, &(x, y): &(i32, i32)) -> bool {
        self.x() == x && self.y() == y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_e4_coordinates() {
        let sq = Square::from_notation("e4").unwrap();
        assert_eq!(sq.x(), 4);
        assert_eq!(sq.y(), 4);
        assert_eq!(sq.index(), 36);
    }

    #[test]
    fn test_index_to_notation() {
        assert_eq!(Square::from_index(36).unwrap().notation(), "e4");
        assert_eq!(Square::from_index(0).unwrap().notation(), "a8");
        assert_eq!(Square::from_index(63).unwrap().notation(), "h1");
    }

    #[test]
    fn test_all_representations_agree() {
        for index in 0..64 {
            let by_index = Square::from_index(index).unwrap();
            let by_notation = Square::from_notation(&by_index.notation()).unwrap();
            let by_coords = Square::from_coords(by_index.x(), by_index.y()).unwrap();

            assert_eq!(by_index, by_notation);
            assert_eq!(by_index, by_coords);
            assert_eq!(by_notation.index(), index);
            assert_eq!(by_coords.notation(), by_index.notation());
        }
    }

    #[test]
    fn test_rank_axis_is_inverted() {
        assert_eq!(Square::from_notation("a8").unwrap(), (0, 0));
        assert_eq!(Square::from_notation("a1").unwrap(), (0, 7));
        assert_eq!(Square::from_notation("h1").unwrap(), (7, 7));
    }

    #[test]
    fn test_equality_by_notation_and_coords() {
        let sq = Square::from_coords(6, 7).unwrap();
        assert!(sq == "g1");
        assert!(sq != "g2");
        assert!(sq == (6, 7));
        assert!(sq != (7, 6));
    }

    #[test]
    fn test_invalid_input() {
        assert!(matches!(
            Square::from_notation("i4"),
            Err(SquareError::InvalidNotation(_))
        ));
        assert!(Square::from_notation("e9").is_err());
        assert!(Square::from_notation("e").is_err());
        assert!(Square::from_notation("e44").is_err());
        assert_eq!(Square::from_index(64), Err(SquareError::IndexOutOfRange(64)));
        assert_eq!(
            Square::from_coords(-1, 3),
            Err(SquareError::CoordinatesOutOfRange { x: -1, y: 3 })
        );
        assert!(Square::try_from((8, 0)).is_err());
    }

    #[test]
    fn test_validity_predicate() {
        assert!(Square::is_valid(0, 0));
        assert!(Square::is_valid(7, 7));
        assert!(!Square::is_valid(8, 0));
        assert!(!Square::is_valid(0, -1));
    }

    #[test]
    fn test_parse_via_from_str() {
        let sq: Square = "c6".parse().unwrap();
        assert_eq!(sq.file_char(), 'c');
        assert_eq!(sq.rank_char(), '6');
    }
}
