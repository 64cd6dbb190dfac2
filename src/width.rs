//! Screen-column measurement and the width/justify/truncate formatter.
//!
//! Rendered output is plain UTF-8 interspersed with two kinds of in-band
//! control characters: colour-switch pairs (`SPECIAL_INDEX` followed by a
//! colour id) and tree-drawing characters in a low reserved range. Both are
//! invisible to the width rules here — colour pairs are zero columns, tree
//! characters are one column when the arboreal flag is set.

use unicode_width::UnicodeWidthChar;

use crate::format::Justify;

/// Reserved escape character introducing a colour id. Guaranteed not to
/// occur in valid text.
pub const SPECIAL_INDEX: char = '\u{0E}';

/// Colour id emitted after an expando's coloured output to switch back.
pub const COLOR_RESET: u8 = 0;

/// Reserved range rendered as one-column tree-drawing characters when the
/// arboreal flag is set.
pub const TREE_MIN: char = '\u{01}';
pub const TREE_MAX: char = '\u{0C}';

/// Display width of one character.
///
/// Zero for control characters and known corruption-prone zero-width code
/// points, one for whitespace, otherwise whatever the width tables report.
fn char_cols(c: char, arboreal: bool) -> usize {
    if arboreal && (TREE_MIN..=TREE_MAX).contains(&c) {
        return 1;
    }
    if c == '\u{200B}' || c == '\u{FEFF}' {
        return 0;
    }
    if c.is_whitespace() {
        return 1;
    }
    if c.is_control() {
        return 0;
    }
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Measure a string in screen columns, colour pairs excluded.
pub fn display_width(s: &str) -> usize {
    let mut cols = 0;
    let mut in_color = false;
    for c in s.chars() {
        if in_color {
            in_color = false;
            continue;
        }
        if c == SPECIAL_INDEX {
            in_color = true;
            continue;
        }
        cols += char_cols(c, false);
    }
    cols
}

/// Copy `src` into `buf`, truncated to `max_cols` and padded to `min_cols`
/// with `fill`. Returns the number of screen columns written.
///
/// Characters that would overflow `max_cols` are skipped; a narrower
/// character later in the string may still fit. Right justification pads on
/// the left, centre splits the padding with the excess on the right.
pub fn format_string(
    buf: &mut String,
    min_cols: usize,
    max_cols: usize,
    justify: Justify,
    fill: char,
    src: &str,
    arboreal: bool,
) -> usize {
    let mut body = String::with_capacity(src.len());
    let mut cols = 0;
    let mut in_color = false;

    for c in src.chars() {
        if in_color {
            body.push(c);
            in_color = false;
            continue;
        }
        if c == SPECIAL_INDEX {
            body.push(c);
            in_color = true;
            continue;
        }
        let w = char_cols(c, arboreal);
        if cols + w > max_cols {
            continue;
        }
        body.push(c);
        cols += w;
    }

    let pad = min_cols.saturating_sub(cols);
    let (pad_left, pad_right) = match justify {
        Justify::Right => (pad, 0),
        Justify::Left => (0, pad),
        Justify::Center => (pad / 2, pad - pad / 2),
    };

    for _ in 0..pad_left {
        buf.push(fill);
    }
    buf.push_str(&body);
    for _ in 0..pad_right {
        buf.push(fill);
    }

    cols + pad
}

/// Fill `buf` with repeats of `fill` up to `max_cols` columns, space-filling
/// any remainder the fill string cannot cover evenly.
pub(crate) fn pad_string(fill: &str, buf: &mut String, mut max_cols: usize) -> usize {
    let pad_cols = display_width(fill);
    let mut total = 0;

    if pad_cols > 0 {
        while pad_cols <= max_cols {
            buf.push_str(fill);
            max_cols -= pad_cols;
            total += pad_cols;
        }
    }

    if max_cols > 0 {
        for _ in 0..max_cols {
            buf.push(' ');
        }
        total += max_cols;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(min: usize, max: usize, justify: Justify, fill: char, s: &str) -> (String, usize) {
        let mut buf = String::new();
        let cols = format_string(&mut buf, min, max, justify, fill, s, false);
        (buf, cols)
    }

    #[test]
    fn natural_width() {
        let (s, cols) = fmt(0, 80, Justify::Left, ' ', "hello");
        assert_eq!(s, "hello");
        assert_eq!(cols, 5);
    }

    #[test]
    fn right_justify_pads_left() {
        let (s, cols) = fmt(5, 80, Justify::Right, ' ', "hi");
        assert_eq!(s, "   hi");
        assert_eq!(cols, 5);
    }

    #[test]
    fn left_justify_pads_right() {
        let (s, _) = fmt(5, 80, Justify::Left, ' ', "hi");
        assert_eq!(s, "hi   ");
    }

    #[test]
    fn centre_excess_goes_right() {
        let (s, _) = fmt(5, 80, Justify::Center, ' ', "hi");
        assert_eq!(s, " hi  ");
    }

    #[test]
    fn zero_fill() {
        let (s, _) = fmt(5, 80, Justify::Right, '0', "hi");
        assert_eq!(s, "000hi");
    }

    #[test]
    fn truncates_to_max() {
        let (s, cols) = fmt(0, 3, Justify::Left, ' ', "HELLO");
        assert_eq!(s, "HEL");
        assert_eq!(cols, 3);
    }

    #[test]
    fn min_equals_max_is_exact() {
        for input in ["x", "hello", "a much longer string"] {
            let (_, cols) = fmt(8, 8, Justify::Left, ' ', input);
            assert_eq!(cols, 8);
        }
    }

    #[test]
    fn wide_chars_measure_two() {
        assert_eq!(display_width("日本"), 4);
        // A double-width char that would straddle the limit is skipped,
        // but a later narrow char still fits.
        let (s, cols) = fmt(0, 3, Justify::Left, ' ', "日本x");
        assert_eq!(s, "日x");
        assert_eq!(cols, 3);
    }

    #[test]
    fn color_pairs_are_zero_width() {
        let src = format!("{}{}ab{}{}", SPECIAL_INDEX, '\u{2}', SPECIAL_INDEX, '\u{0}');
        assert_eq!(display_width(&src), 2);
        let (out, cols) = fmt(0, 80, Justify::Left, ' ', &src);
        assert_eq!(out, src);
        assert_eq!(cols, 2);
    }

    #[test]
    fn tree_chars_are_one_col_in_arboreal_mode() {
        let src = "\u{1}\u{2}x";
        let mut buf = String::new();
        let cols = format_string(&mut buf, 0, 80, Justify::Left, ' ', src, true);
        assert_eq!(cols, 3);
        // Without the flag they are invisible control characters.
        let mut buf = String::new();
        let cols = format_string(&mut buf, 0, 80, Justify::Left, ' ', src, false);
        assert_eq!(cols, 1);
    }

    #[test]
    fn whitespace_counts_one_column() {
        assert_eq!(display_width("a\tb"), 3);
    }

    #[test]
    fn pad_string_repeats_fill() {
        let mut buf = String::new();
        assert_eq!(pad_string("-", &mut buf, 4), 4);
        assert_eq!(buf, "----");
    }

    #[test]
    fn pad_string_space_fills_remainder() {
        let mut buf = String::new();
        // Double-width fill cannot cover the odd column.
        assert_eq!(pad_string("日", &mut buf, 5), 5);
        assert_eq!(buf, "日日 ");
    }

    #[test]
    fn pad_string_zero_width_fill_uses_spaces() {
        let mut buf = String::new();
        assert_eq!(pad_string("\u{200B}", &mut buf, 3), 3);
        assert_eq!(buf, "   ");
    }
}
