//! Tree rendering: the per-node renderers and the getter-callback protocol.
//!
//! Rendering is a pure function of (tree, callbacks, data, flags, budget,
//! clock). Every renderer returns the number of screen columns it wrote and
//! never exceeds the budget it was given.

use chrono::{DateTime, Local};

use crate::conddate::cutoff;
use crate::definition::{Did, Uid};
use crate::format::{FormatDescriptor, Justify};
use crate::node::{Node, PadType};
use crate::width::{format_string, pad_string, COLOR_RESET, SPECIAL_INDEX};

/// Caller flags, forwarded unmodified to every getter.
pub type RenderFlags = u32;

/// Fills `buf` with the string value of a data slot.
pub type StringGetter<T> = fn(&Node, &T, RenderFlags, &mut String);
/// Returns the numeric value of a data slot.
pub type NumberGetter<T> = fn(&Node, &T, RenderFlags) -> i64;

/// Render-time getter for one `(did, uid)` data slot.
///
/// Both getters may be present; the string getter wins. That lets a
/// timestamp be stored as a number but displayed as a formatted date.
pub struct RenderCallback<T> {
    pub did: Did,
    pub uid: Uid,
    pub get_string: Option<StringGetter<T>>,
    pub get_number: Option<NumberGetter<T>>,
}

impl<T> RenderCallback<T> {
    pub const fn string(did: Did, uid: Uid, get: StringGetter<T>) -> Self {
        RenderCallback {
            did,
            uid,
            get_string: Some(get),
            get_number: None,
        }
    }

    pub const fn number(did: Did, uid: Uid, get: NumberGetter<T>) -> Self {
        RenderCallback {
            did,
            uid,
            get_string: None,
            get_number: Some(get),
        }
    }

    pub const fn with_number(mut self, get: NumberGetter<T>) -> Self {
        self.get_number = Some(get);
        self
    }
}

impl<T> Clone for RenderCallback<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RenderCallback<T> {}

/// Everything a render pass needs: the getter table, the caller's object,
/// the caller's flags, and the clock used by date conditions.
pub struct RenderData<'a, T> {
    callbacks: &'a [RenderCallback<T>],
    data: &'a T,
    flags: RenderFlags,
    now: DateTime<Local>,
}

impl<'a, T> RenderData<'a, T> {
    pub fn new(callbacks: &'a [RenderCallback<T>], data: &'a T) -> Self {
        RenderData {
            callbacks,
            data,
            flags: 0,
            now: Local::now(),
        }
    }

    pub fn with_flags(mut self, flags: RenderFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Pin the clock used by date conditions.
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    fn find(&self, did: Did, uid: Uid) -> &RenderCallback<T> {
        self.callbacks
            .iter()
            .find(|cb| cb.did == did && cb.uid == uid)
            .unwrap_or_else(|| panic!("no getter registered for ({did},{uid})"))
    }
}

/// Render one node within a column budget, appending to `buf`.
pub(crate) fn node_render<T>(
    node: &Node,
    rdata: &RenderData<'_, T>,
    max_cols: usize,
    buf: &mut String,
) -> usize {
    match node {
        Node::Text(text) => format_string(buf, 0, max_cols, Justify::Left, ' ', text, false),
        Node::Expando { .. } => render_expando(node, rdata, max_cols, buf),
        Node::CondBool { did, uid } => {
            let cb = rdata.find(*did, *uid);
            let truthy = if let Some(get_string) = cb.get_string {
                let mut value = String::new();
                get_string(node, rdata.data, rdata.flags, &mut value);
                !value.is_empty()
            } else if let Some(get_number) = cb.get_number {
                get_number(node, rdata.data, rdata.flags) != 0
            } else {
                panic!("no getter registered for ({did},{uid})");
            };
            usize::from(truthy)
        }
        Node::CondDate {
            did,
            uid,
            count,
            period,
        } => {
            let cb = rdata.find(*did, *uid);
            let Some(get_number) = cb.get_number else {
                panic!("no number getter registered for ({did},{uid})");
            };
            let stamp = get_number(node, rdata.data, rdata.flags);
            let threshold = cutoff(rdata.now, *count, *period).timestamp();
            usize::from(stamp > threshold)
        }
        Node::Condition {
            fmt,
            cond,
            if_true,
            if_false,
        } => {
            let mut scratch = String::new();
            let truthy = node_render(cond, rdata, max_cols, &mut scratch) >= 1;
            let branch = if truthy { if_true } else { if_false };
            render_formatted(fmt.as_ref(), branch, rdata, max_cols, buf)
        }
        Node::Padding {
            kind,
            fill,
            left,
            right,
        } => {
            let (Some(left), Some(right)) = (left, right) else {
                panic!("padding node was not rebalanced");
            };
            render_padding(*kind, fill, left, right, rdata, max_cols, buf)
        }
        Node::Container { fmt, children } => match fmt {
            None => render_children(children, rdata, max_cols, buf),
            Some(fmt) => {
                let mut scratch = String::new();
                let budget = clamp_max(Some(fmt), max_cols);
                render_children(children, rdata, budget, &mut scratch);
                apply_format(fmt, max_cols, &scratch, buf)
            }
        },
    }
}

fn clamp_max(fmt: Option<&FormatDescriptor>, max_cols: usize) -> usize {
    match fmt.and_then(|f| f.max_cols) {
        Some(m) => m.min(max_cols),
        None => max_cols,
    }
}

/// Justify and pad an already rendered string per a format descriptor.
fn apply_format(
    fmt: &FormatDescriptor,
    max_cols: usize,
    rendered: &str,
    buf: &mut String,
) -> usize {
    let max = clamp_max(Some(fmt), max_cols);
    let min = fmt.min_cols.min(max);
    let folded;
    let body = if fmt.lower {
        folded = rendered.to_lowercase();
        &folded
    } else {
        rendered
    };
    format_string(buf, min, max, fmt.justify, fmt.leader, body, false)
}

/// Render a node and apply an optional descriptor over its whole output.
fn render_formatted<T>(
    fmt: Option<&FormatDescriptor>,
    node: &Node,
    rdata: &RenderData<'_, T>,
    max_cols: usize,
    buf: &mut String,
) -> usize {
    match fmt {
        None => node_render(node, rdata, max_cols, buf),
        Some(fmt) => {
            let mut scratch = String::new();
            node_render(node, rdata, clamp_max(Some(fmt), max_cols), &mut scratch);
            apply_format(fmt, max_cols, &scratch, buf)
        }
    }
}

fn render_children<T>(
    children: &[Node],
    rdata: &RenderData<'_, T>,
    max_cols: usize,
    buf: &mut String,
) -> usize {
    let mut used = 0;
    for child in children {
        used += node_render(child, rdata, max_cols - used, buf);
        if used >= max_cols {
            break;
        }
    }
    used
}

fn render_expando<T>(
    node: &Node,
    rdata: &RenderData<'_, T>,
    max_cols: usize,
    buf: &mut String,
) -> usize {
    let Node::Expando {
        did,
        uid,
        fmt,
        color,
        arboreal,
        ..
    } = node
    else {
        return 0;
    };
    let fmt = fmt.as_ref();
    let cb = rdata.find(*did, *uid);

    let mut value = String::new();
    if let Some(get_string) = cb.get_string {
        get_string(node, rdata.data, rdata.flags, &mut value);
        if fmt.is_some_and(|f| f.lower) {
            value = value.to_lowercase();
        }
    } else if let Some(get_number) = cb.get_number {
        let num = get_number(node, rdata.data, rdata.flags);
        value = format_number(num, number_precision(fmt));
    } else {
        panic!("no getter registered for ({did},{uid})");
    }

    let max = clamp_max(fmt, max_cols);
    let min = fmt.map(|f| f.min_cols).unwrap_or(0).min(max);
    let justify = fmt.map(|f| f.justify).unwrap_or(Justify::Left);
    let fill = fmt.map(|f| f.leader).unwrap_or(' ');

    let mut formatted = String::new();
    let cols = format_string(&mut formatted, min, max, justify, fill, &value, *arboreal);

    if formatted.is_empty() {
        return cols;
    }
    if let Some(color) = color {
        buf.push(SPECIAL_INDEX);
        buf.push(char::from(*color));
        buf.push_str(&formatted);
        buf.push(SPECIAL_INDEX);
        buf.push(char::from(COLOR_RESET));
    } else {
        buf.push_str(&formatted);
    }
    cols
}

/// Minimum digit count for a numeric expando: the descriptor's precision,
/// or its width when zero-padded, or one digit with no descriptor at all.
fn number_precision(fmt: Option<&FormatDescriptor>) -> Option<usize> {
    match fmt {
        None => Some(1),
        Some(f) => match f.max_cols {
            Some(max) => Some(max),
            None if f.leader == '0' => Some(f.min_cols),
            None => None,
        },
    }
}

fn format_number(num: i64, precision: Option<usize>) -> String {
    let Some(p) = precision else {
        return num.to_string();
    };
    if num == 0 && p == 0 {
        // a zero precision suppresses a zero value entirely
        return String::new();
    }
    // for negatives the sign takes one of the precision columns
    format!("{num:0p$}")
}

fn render_padding<T>(
    kind: PadType,
    fill: &str,
    left: &Node,
    right: &Node,
    rdata: &RenderData<'_, T>,
    max_cols: usize,
    buf: &mut String,
) -> usize {
    match kind {
        PadType::FillEol => {
            // everything after the padding is discarded
            let mut used = node_render(left, rdata, max_cols, buf);
            used += pad_string(fill, buf, max_cols - used);
            used
        }
        PadType::HardFill => {
            // left side has priority, right side truncates
            let mut buf_left = String::new();
            let mut buf_right = String::new();
            let mut used = node_render(left, rdata, max_cols, &mut buf_left);
            used += node_render(right, rdata, max_cols - used, &mut buf_right);
            let mut pad = String::new();
            used += pad_string(fill, &mut pad, max_cols - used);
            buf.push_str(&buf_left);
            buf.push_str(&pad);
            buf.push_str(&buf_right);
            used
        }
        PadType::SoftFill => {
            // right side is anchored, left side truncates
            let mut buf_left = String::new();
            let mut buf_right = String::new();
            let mut used = node_render(right, rdata, max_cols, &mut buf_right);
            used += node_render(left, rdata, max_cols - used, &mut buf_left);
            let mut pad = String::new();
            used += pad_string(fill, &mut pad, max_cols - used);
            buf.push_str(&buf_left);
            buf.push_str(&pad);
            buf.push_str(&buf_right);
            used
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DataKind, Definition};
    use crate::parser::parse_tree;

    struct Item {
        name: &'static str,
        count: i64,
    }

    const DEFS: &[Definition] = &[
        Definition::new(">", 0, 1, DataKind::String).with_parser(crate::parser::parse_padding),
        Definition::new("|", 0, 2, DataKind::String).with_parser(crate::parser::parse_padding),
        Definition::new("*", 0, 3, DataKind::String).with_parser(crate::parser::parse_padding),
        Definition::new("a", 1, 1, DataKind::String),
        Definition::new("n", 1, 2, DataKind::Number),
        Definition::new("c", 1, 3, DataKind::String).with_color(3),
    ];

    fn get_name(_: &Node, item: &Item, _: RenderFlags, buf: &mut String) {
        buf.push_str(item.name);
    }

    fn get_count(_: &Node, item: &Item, _: RenderFlags) -> i64 {
        item.count
    }

    const CALLBACKS: &[RenderCallback<Item>] = &[
        RenderCallback::string(1, 1, get_name),
        RenderCallback::number(1, 2, get_count),
        RenderCallback::string(1, 3, get_name),
    ];

    fn render_item(src: &str, item: &Item, max_cols: usize) -> String {
        let tree = parse_tree(src, DEFS).unwrap();
        let rdata = RenderData::new(CALLBACKS, item);
        let mut buf = String::new();
        let cols = node_render(&tree, &rdata, max_cols, &mut buf);
        assert!(cols <= max_cols, "{src:?} used {cols} of {max_cols} columns");
        buf
    }

    fn render(src: &str, max_cols: usize) -> String {
        render_item(src, &Item { name: "hello", count: 5 }, max_cols)
    }

    #[test]
    fn plain_expansion() {
        assert_eq!(render("%a", 80), "hello");
    }

    #[test]
    fn justify_and_fill() {
        let hi = Item { name: "hi", count: 0 };
        assert_eq!(render_item("%5a", &hi, 80), "   hi");
        assert_eq!(render_item("%-5a", &hi, 80), "hi   ");
        assert_eq!(render_item("%05a", &hi, 80), "000hi");
        assert_eq!(render_item("%=6a", &hi, 80), "  hi  ");
    }

    #[test]
    fn truncation_with_lowercase() {
        let loud = Item { name: "HELLO", count: 0 };
        assert_eq!(render_item("%.3_a", &loud, 80), "hel");
    }

    #[test]
    fn numbers() {
        assert_eq!(render("%n", 80), "5");
        assert_eq!(render("%3n", 80), "  5");
        assert_eq!(render("%03n", 80), "005");
        assert_eq!(render("%.3n", 80), "005");
        let neg = Item { name: "", count: -42 };
        assert_eq!(render_item("%.5n", &neg, 80), "-0042");
        // a zero count with zero precision renders nothing
        let zero = Item { name: "", count: 0 };
        assert_eq!(render_item("%.0n", &zero, 80), "");
    }

    #[test]
    fn conditional_branches() {
        let yes = Item { name: "x", count: 5 };
        let no = Item { name: "x", count: 0 };
        assert_eq!(render_item("%?n?yes&no?", &yes, 80), "yes");
        assert_eq!(render_item("%?n?yes&no?", &no, 80), "no");
        assert_eq!(render_item("%<n?yes&no>", &yes, 80), "yes");
        assert_eq!(render_item("%<n?yes>", &no, 80), "");
    }

    #[test]
    fn string_truthiness() {
        let empty = Item { name: "", count: 0 };
        let full = Item { name: "x", count: 0 };
        assert_eq!(render_item("%<a?yes&no>", &empty, 80), "no");
        assert_eq!(render_item("%<a?yes&no>", &full, 80), "yes");
    }

    #[test]
    fn condition_format_applies_to_branch() {
        let yes = Item { name: "x", count: 1 };
        assert_eq!(render_item("%=9<n?AAA&BBB>", &yes, 80), "   AAA   ");
    }

    #[test]
    fn hard_fill() {
        assert_eq!(render("L%>-R", 6), "L----R");
        assert_eq!(render("L%>-R", 2), "LR");
        // the right side takes whatever the left leaves over
        assert_eq!(render("LEFT%>-LONGTAIL", 8), "LEFTLONG");
    }

    #[test]
    fn soft_fill_keeps_right() {
        assert_eq!(render("L%*-R", 6), "L----R");
        assert_eq!(render("LONGTAIL%*-END", 6), "LONEND");
    }

    #[test]
    fn fill_eol_discards_right() {
        assert_eq!(render("AB%|-", 6), "AB----");
        // empty left subtree renders a full line of fill
        assert_eq!(render("%|-", 4), "----");
    }

    #[test]
    fn color_markers_wrap_output() {
        let out = render("%c", 80);
        let expected = format!(
            "{}{}hello{}{}",
            SPECIAL_INDEX,
            char::from(3u8),
            SPECIAL_INDEX,
            char::from(COLOR_RESET)
        );
        assert_eq!(out, expected);
        // and the markers measure zero columns
        let tree = parse_tree("%c", DEFS).unwrap();
        let item = Item { name: "hello", count: 0 };
        let rdata = RenderData::new(CALLBACKS, &item);
        let mut buf = String::new();
        assert_eq!(node_render(&tree, &rdata, 80, &mut buf), 5);
    }

    #[test]
    fn empty_colored_output_has_no_markers() {
        let empty = Item { name: "", count: 0 };
        assert_eq!(render_item("%c", &empty, 80), "");
    }

    #[test]
    fn budget_is_respected() {
        assert_eq!(render("%a world", 3), "hel");
        assert_eq!(render("%10a", 4), "hell");
    }

    #[test]
    fn date_condition_uses_pinned_clock() {
        use chrono::TimeZone;
        let now = Local.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap();
        let defs: &[Definition] =
            &[Definition::new("[", 1, 2, DataKind::Number).with_parser(crate::parser::parse_date)];
        let tree = parse_tree("%<[1d?new&old>", defs).unwrap();

        let recent = Item { name: "", count: now.timestamp() - 3600 };
        let rdata = RenderData::new(CALLBACKS, &recent).with_now(now);
        let mut buf = String::new();
        node_render(&tree, &rdata, 80, &mut buf);
        assert_eq!(buf, "new");

        let stale = Item { name: "", count: now.timestamp() - 86400 * 2 };
        let rdata = RenderData::new(CALLBACKS, &stale).with_now(now);
        let mut buf = String::new();
        node_render(&tree, &rdata, 80, &mut buf);
        assert_eq!(buf, "old");
    }
}
