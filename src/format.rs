// format.rs — the printf-style format descriptor: `%[-=][0][MIN][.MAX][_]X`

use crate::parser::{ParseError, ParseErrorKind};

/// Justification of a formatted field, default right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Center,
    Right,
}

impl Justify {
    /// Name used by the tree dump.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Justify::Left => "LEFT",
            Justify::Center => "CENTER",
            Justify::Right => "RIGHT",
        }
    }
}

/// Per-node formatting parsed from the `%-12.20_` prefix.
///
/// A node with no descriptor renders at natural width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Minimum field width in screen columns.
    pub min_cols: usize,
    /// Maximum field width in screen columns; `None` means unbounded.
    pub max_cols: Option<usize>,
    pub justify: Justify,
    /// Fill character, a space or `'0'`.
    pub leader: char,
    /// Lowercase the produced text.
    pub lower: bool,
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        FormatDescriptor {
            min_cols: 0,
            max_cols: None,
            justify: Justify::Right,
            leader: ' ',
            lower: false,
        }
    }
}

/// Parse a digit run as a column count.
///
/// Counts are bounded well below memory-hurting sizes; anything that does
/// not fit in a `u16` is rejected the same way as a malformed number.
pub(crate) fn parse_number(src: &str, pos: usize) -> Result<(usize, usize), ParseError> {
    let bytes = src.as_bytes();
    let mut end = pos;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let digits = &src[pos..end];
    match digits.parse::<u16>() {
        Ok(n) if n != u16::MAX => Ok((n as usize, end)),
        _ => Err(ParseError {
            position: pos,
            kind: ParseErrorKind::InvalidNumber(digits.to_string()),
        }),
    }
}

/// Parse an optional format descriptor starting at `pos` (just after `%`).
///
/// Returns `None` when no characters were consumed. A leading `-`/`=` picks
/// left/centre justification, `0` picks a zero leader (ignored when
/// left-justified), digits set the minimum width, `.digits` the maximum, and
/// a trailing `_` forces lowercase. `.` with no digits means "truncate to
/// empty"; `.N` with N > 0 also switches the leader to `'0'`.
pub(crate) fn parse_format(
    src: &str,
    pos: usize,
) -> Result<(Option<FormatDescriptor>, usize), ParseError> {
    let bytes = src.as_bytes();
    let start = pos;
    let mut pos = pos;
    let mut fmt = FormatDescriptor::default();

    match bytes.get(pos) {
        Some(b'-') => {
            fmt.justify = Justify::Left;
            pos += 1;
        }
        Some(b'=') => {
            fmt.justify = Justify::Center;
            pos += 1;
        }
        _ => {}
    }

    if bytes.get(pos) == Some(&b'0') {
        // '0' is meaningless with left justification
        if fmt.justify != Justify::Left {
            fmt.leader = '0';
        }
        pos += 1;
    }

    if bytes.get(pos).is_some_and(|b| b.is_ascii_digit()) {
        let (n, next) = parse_number(src, pos)?;
        fmt.min_cols = n;
        pos = next;
    }

    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let n = if bytes.get(pos).is_some_and(|b| b.is_ascii_digit()) {
            let (n, next) = parse_number(src, pos)?;
            pos = next;
            n
        } else {
            0
        };
        fmt.leader = if n == 0 { ' ' } else { '0' };
        fmt.max_cols = Some(n);
    }

    if bytes.get(pos) == Some(&b'_') {
        fmt.lower = true;
        pos += 1;
    }

    if pos == start {
        return Ok((None, pos));
    }
    Ok((Some(fmt), pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt_of(s: &str) -> Option<FormatDescriptor> {
        let (fmt, end) = parse_format(s, 0).unwrap();
        assert_eq!(end, s.len());
        fmt
    }

    #[test]
    fn empty_descriptor_is_none() {
        let (fmt, end) = parse_format("X", 0).unwrap();
        assert!(fmt.is_none());
        assert_eq!(end, 0);
    }

    #[test]
    fn min_width() {
        let f = fmt_of("5").unwrap();
        assert_eq!(f.min_cols, 5);
        assert_eq!(f.max_cols, None);
        assert_eq!(f.justify, Justify::Right);
        assert_eq!(f.leader, ' ');
    }

    #[test]
    fn max_width_switches_leader() {
        let f = fmt_of(".7").unwrap();
        assert_eq!(f.min_cols, 0);
        assert_eq!(f.max_cols, Some(7));
        assert_eq!(f.leader, '0');
    }

    #[test]
    fn bare_dot_truncates_to_empty() {
        let f = fmt_of(".").unwrap();
        assert_eq!(f.max_cols, Some(0));
        assert_eq!(f.leader, ' ');
    }

    #[test]
    fn left_justify_ignores_zero_leader() {
        let f = fmt_of("-05").unwrap();
        assert_eq!(f.justify, Justify::Left);
        assert_eq!(f.leader, ' ');
        assert_eq!(f.min_cols, 5);
    }

    #[test]
    fn zero_leader_right_justify() {
        let f = fmt_of("05").unwrap();
        assert_eq!(f.leader, '0');
        assert_eq!(f.min_cols, 5);
    }

    #[test]
    fn centre_and_lowercase() {
        let f = fmt_of("=30_").unwrap();
        assert_eq!(f.justify, Justify::Center);
        assert_eq!(f.min_cols, 30);
        assert!(f.lower);
    }

    #[test]
    fn full_descriptor() {
        let f = fmt_of("-12.20_").unwrap();
        assert_eq!(f.justify, Justify::Left);
        assert_eq!(f.min_cols, 12);
        assert_eq!(f.max_cols, Some(20));
        assert!(f.lower);
    }

    #[test]
    fn oversized_number_is_rejected() {
        let err = parse_format("99999", 0).unwrap_err();
        assert_eq!(err.position, 0);
        assert!(matches!(err.kind, ParseErrorKind::InvalidNumber(_)));
    }

    #[test]
    fn oversized_precision_is_rejected() {
        let err = parse_format("4.99999", 0).unwrap_err();
        assert_eq!(err.position, 2);
    }
}
