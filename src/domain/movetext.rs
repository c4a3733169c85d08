//! Movetext (PGN-style transcript) parsing.
//!
//! Turns an annotated transcript into an ordered list of move tokens.
//! Tags, comments and variations are dropped, move numbers and result
//! markers are stripped, and each remaining word is matched against the
//! standard-move and castling grammars. No chess validation happens here;
//! that is the resolver's job.

use tracing::debug;

use super::chess::{PieceColor, PieceKind};
use super::square::Square;

/// Result markers, one of which may end a transcript
pub const RESULT_MARKERS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Disambiguation fragment of a standard move
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hint {
    None,
    File(char),
    Rank(char),
    Square(Square),
}

impl Hint {
    /// Whether a start square is compatible with this hint
    pub fn admits(self, square: Square) -> bool {
        match self {
            Hint::None => true,
            Hint::File(file) => square.file_char() == file,
            Hint::Rank(rank) => square.rank_char() == rank,
            Hint::Square(exact) => square == exact,
        }
    }

    /// The hint as written in the token ("", "b", "1", "e2")
    pub fn text(self) -> String {
        match self {
            Hint::None => String::new(),
            Hint::File(c) | Hint::Rank(c) => c.to_string(),
            Hint::Square(sq) => sq.notation(),
        }
    }
}

/// Check or mate suffix
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CheckMarker {
    Check,
    Mate,
}

/// One parsed move, not yet checked against the position
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MoveToken {
    pub piece: PieceKind,
    pub color: PieceColor,
    pub hint: Hint,
    pub to: Square,
    pub promotion: Option<PieceKind>,
    pub marker: Option<CheckMarker>,
    /// The token exactly as it appeared in the transcript
    pub raw: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParsedMovetext {
    /// Full FEN from a `[FEN "..."]` tag, if any
    pub initial_fen: Option<String>,
    pub starting_color: PieceColor,
    pub sequence: Vec<MoveToken>,
}

/// Parse a transcript
pub fn parse(text: &str) -> ParsedMovetext {
    let (initial_fen, starting_color) = match find_fen_tag(text) {
        Some((fen, color)) => (Some(fen), color),
        None => (None, PieceColor::White),
    };

    let mut color = starting_color;
    let mut sequence = Vec::new();
    for word in clean_movetext(text).split_whitespace() {
        match parse_standard(word, color).or_else(|| parse_castling(word, color)) {
            Some(token) => {
                sequence.push(token);
                color = color.opposite();
            }
            None => debug!(token = word, "skipping unrecognised movetext token"),
        }
    }

    ParsedMovetext {
        initial_fen,
        starting_color,
        sequence,
    }
}

/// Strip brackets, glyphs, move numbers and the trailing result
fn clean_movetext(text: &str) -> String {
    let text = remove_brackets(text, '[', ']');
    let text = remove_brackets(&text, '{', '}');
    let text = remove_brackets(&text, '(', ')');
    let text = remove_numbering(&text);

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut trimmed = collapsed.as_str();
    for marker in RESULT_MARKERS {
        if let Some(rest) = trimmed.strip_suffix(marker) {
            trimmed = rest;
            break;
        }
    }
    trimmed.trim().to_string()
}

/// Drop everything between `open` and `close`, honouring nesting
fn remove_brackets(text: &str, open: char, close: char) -> String {
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(c);
        }
    }
    out
}

/// Drop `$n` annotation glyphs and `12.` / `12...` move numbers
fn remove_numbering(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '$' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()) {
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            continue;
        }
        if c.is_ascii_digit() {
            let mut end = i;
            while end < chars.len() && chars[end].is_ascii_digit() {
                end += 1;
            }
            let mut dots = 0;
            while dots < 3 && chars.get(end + dots) == Some(&'.') {
                dots += 1;
            }
            if dots > 0 {
                i = end + dots;
                continue;
            }
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// `[NBRQK]? ([a-h]?[1-8]?) x? [a-h][1-8] (=[NBRQK])? [+#]?`, matched as a prefix
fn parse_standard(word: &str, color: PieceColor) -> Option<MoveToken> {
    let bytes = word.as_bytes();
    let (piece, rest) = match bytes.first().copied().map(char::from) {
        Some(c @ ('N' | 'B' | 'R' | 'Q' | 'K')) => (PieceKind::from_letter(c)?, &bytes[1..]),
        _ => (PieceKind::Pawn, bytes),
    };

    for hint_len in hint_lengths(rest) {
        let after_hint = &rest[hint_len..];
        let after_capture = after_hint.strip_prefix(b"x").unwrap_or(after_hint);
        let Some(to) = square_prefix(after_capture) else {
            continue;
        };
        let mut tail = &after_capture[2..];

        let mut promotion = None;
        if let [b'=', letter @ (b'N' | b'B' | b'R' | b'Q' | b'K'), remaining @ ..] = tail {
            promotion = PieceKind::from_letter(char::from(*letter));
            tail = remaining;
        }
        let marker = match tail.first() {
            Some(b'+') => Some(CheckMarker::Check),
            Some(b'#') => Some(CheckMarker::Mate),
            _ => None,
        };

        return Some(MoveToken {
            piece,
            color,
            hint: hint_from(&rest[..hint_len]),
            to,
            promotion,
            marker,
            raw: word.to_string(),
        });
    }
    None
}

/// Candidate disambiguation lengths, longest first
fn hint_lengths(rest: &[u8]) -> Vec<usize> {
    let is_file = |b: Option<&u8>| b.is_some_and(|b| (b'a'..=b'h').contains(b));
    let is_rank = |b: Option<&u8>| b.is_some_and(|b| (b'1'..=b'8').contains(b));

    let mut lengths = Vec::with_capacity(3);
    if is_file(rest.first()) {
        if is_rank(rest.get(1)) {
            lengths.push(2);
        }
        lengths.push(1);
    } else if is_rank(rest.first()) {
        lengths.push(1);
    }
    lengths.push(0);
    lengths
}

fn hint_from(text: &[u8]) -> Hint {
    match text {
        [] => Hint::None,
        [c] if c.is_ascii_digit() => Hint::Rank(char::from(*c)),
        [c] => Hint::File(char::from(*c)),
        _ => std::str::from_utf8(text)
            .ok()
            .and_then(|s| Square::from_notation(s).ok())
            .map_or(Hint::None, Hint::Square),
    }
}

fn square_prefix(bytes: &[u8]) -> Option<Square> {
    let head = bytes.get(..2)?;
    Square::from_notation(std::str::from_utf8(head).ok()?).ok()
}

/// `O-O` / `O-O-O` (or with zeros) and an optional `+`/`#`
fn parse_castling(word: &str, color: PieceColor) -> Option<MoveToken> {
    let normalized = word.replace('0', "O");
    let (queenside, tail) = if let Some(tail) = normalized.strip_prefix("O-O-O") {
        (true, tail)
    } else if let Some(tail) = normalized.strip_prefix("O-O") {
        (false, tail)
    } else {
        return None;
    };

    let marker = match tail.chars().next() {
        Some('+') => Some(CheckMarker::Check),
        Some('#') => Some(CheckMarker::Mate),
        _ => None,
    };
    let (from, to) = match (color, queenside) {
        (PieceColor::White, false) => ("e1", "g1"),
        (PieceColor::White, true) => ("e1", "c1"),
        (PieceColor::Black, false) => ("e8", "g8"),
        (PieceColor::Black, true) => ("e8", "c8"),
    };

    Some(MoveToken {
        piece: PieceKind::King,
        color,
        hint: Hint::Square(from.parse().ok()?),
        to: to.parse().ok()?,
        promotion: None,
        marker,
        raw: word.to_string(),
    })
}

/// Look for `[FEN "..."]` with a FEN-shaped value; returns the FEN and side to move
fn find_fen_tag(text: &str) -> Option<(String, PieceColor)> {
    let mut search = text;
    while let Some(start) = search.find('[') {
        let after = &search[start + 1..];
        let end = after.find(']')?;
        let tag = after[..end].trim();
        if let Some(value) = tag.strip_prefix("FEN") {
            let value = value.trim();
            if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
                let fen = inner.trim();
                if let Some(color) = fen_side_to_move(fen) {
                    return Some((fen.to_string(), color));
                }
            }
        }
        search = &after[end + 1..];
    }
    None
}

/// Validate the FEN shape and return its side to move
fn fen_side_to_move(fen: &str) -> Option<PieceColor> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let (board, side, castling, numbers) = match fields.as_slice() {
        [board, side, castling, _ep, half, full] => (*board, *side, *castling, [*half, *full]),
        [board, side, castling, half, full] => (*board, *side, *castling, [*half, *full]),
        _ => return None,
    };

    let ranks: Vec<&str> = board.split('/').collect();
    let board_ok = ranks.len() == 8
        && ranks
            .iter()
            .all(|r| !r.is_empty() && r.chars().all(|c| "pnbrqkPNBRQK12345678".contains(c)));
    let castling_ok = castling == "-" || castling.chars().all(|c| "KQkq".contains(c));
    let numbers_ok = numbers
        .iter()
        .all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));
    if fields.len() == 6 {
        let ep = fields[3];
        if ep != "-" && Square::from_notation(ep).is_err() {
            return None;
        }
    }
    if !(board_ok && castling_ok && numbers_ok) {
        return None;
    }

    match side {
        "w" => Some(PieceColor::White),
        "b" => Some(PieceColor::Black),
        _ => None,
    }
}
