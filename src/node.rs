//! The parsed expando tree: node kinds, the padding rebalancer, and the
//! debug serialisation used by the parser tests.

use std::fmt::Write;

use crate::definition::{ColorId, Did, Uid};
use crate::format::FormatDescriptor;

/// How a padding node fills the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadType {
    /// `%|X` — render the left side, then fill to the end of the line.
    FillEol,
    /// `%>X` — left side has priority, right side truncates.
    HardFill,
    /// `%*X` — right side has priority, left side truncates.
    SoftFill,
}

impl PadType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            PadType::FillEol => "FILL_EOL",
            PadType::HardFill => "HARD_FILL",
            PadType::SoftFill => "SOFT_FILL",
        }
    }
}

/// Time unit of a `%[Nperiod]` date condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePeriod {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
}

impl DatePeriod {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'y' => Some(DatePeriod::Year),
            'm' => Some(DatePeriod::Month),
            'w' => Some(DatePeriod::Week),
            'd' => Some(DatePeriod::Day),
            'H' => Some(DatePeriod::Hour),
            'M' => Some(DatePeriod::Minute),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            DatePeriod::Year => 'y',
            DatePeriod::Month => 'm',
            DatePeriod::Week => 'w',
            DatePeriod::Day => 'd',
            DatePeriod::Hour => 'H',
            DatePeriod::Minute => 'M',
        }
    }
}

/// One node of a parsed expando tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A literal run of text. Never contains an unescaped `%`.
    Text(String),
    /// A data substitution, resolved through the getter table at render time.
    Expando {
        did: Did,
        uid: Uid,
        fmt: Option<FormatDescriptor>,
        /// Enclosure content, e.g. the strftime format of `%[%Y-%m-%d]`.
        text: Option<String>,
        color: Option<ColorId>,
        arboreal: bool,
    },
    /// Truthiness test over a single data slot.
    CondBool { did: Did, uid: Uid },
    /// "Newer than `count` × `period`" test over a timestamp slot.
    CondDate {
        did: Did,
        uid: Uid,
        count: usize,
        period: DatePeriod,
    },
    /// If/then/else. Branches are always present; an omitted branch is an
    /// empty container.
    Condition {
        fmt: Option<FormatDescriptor>,
        cond: Box<Node>,
        if_true: Box<Node>,
        if_false: Box<Node>,
    },
    /// Fill/align directive. `left`/`right` are `None` until the rebalancer
    /// runs, exactly-two subtrees afterwards.
    Padding {
        kind: PadType,
        fill: String,
        left: Option<Box<Node>>,
        right: Option<Box<Node>>,
    },
    /// Ordered group of children, optionally formatted as a whole.
    Container {
        fmt: Option<FormatDescriptor>,
        children: Vec<Node>,
    },
}

impl Node {
    pub(crate) fn container(children: Vec<Node>) -> Node {
        Node::Container {
            fmt: None,
            children,
        }
    }

    /// Wrap a sibling list, unwrapping a lone child so simple trees stay
    /// simple (a branch of `AAA` is a text node, not a one-item container).
    pub(crate) fn collapse(mut children: Vec<Node>) -> Node {
        if children.len() == 1 {
            children.remove(0)
        } else {
            Node::container(children)
        }
    }
}

/// Rebalance padding in a tree of nodes.
///
/// A padding directive is parsed as a plain sibling, e.g. `[A, B, PAD, C]`.
/// Rendering needs left and right anchors, so the first childless padding in
/// every sibling list adopts its siblings: `[PAD(left=[A, B], right=[C])]`.
/// A second padding at the same level ends up inside the right subtree and
/// is rebalanced when that subtree is visited. Already-balanced padding is
/// left alone, which makes the pass idempotent.
pub(crate) fn repad(node: &mut Node) {
    match node {
        Node::Container { children, .. } => {
            let unbalanced = |n: &Node| matches!(n, Node::Padding { left: None, .. });
            if let Some(idx) = children.iter().position(unbalanced) {
                let right_nodes = children.split_off(idx + 1);
                let mut pad = match children.pop() {
                    Some(p) => p,
                    None => return,
                };
                let left_nodes = std::mem::take(children);
                if let Node::Padding { left, right, .. } = &mut pad {
                    *left = Some(Box::new(Node::collapse(left_nodes)));
                    *right = Some(Box::new(Node::collapse(right_nodes)));
                }
                children.push(pad);
            }
            for child in children.iter_mut() {
                repad(child);
            }
        }
        Node::Condition {
            cond,
            if_true,
            if_false,
            ..
        } => {
            repad(cond);
            repad(if_true);
            repad(if_false);
        }
        Node::Padding { left, right, .. } => {
            // A padding subtree root with no siblings to adopt.
            match left {
                Some(l) => repad(l),
                None => *left = Some(Box::new(Node::container(Vec::new()))),
            }
            match right {
                Some(r) => repad(r),
                None => *right = Some(Box::new(Node::container(Vec::new()))),
            }
        }
        _ => {}
    }
}

/// Unwrap unformatted containers left holding a single child, e.g. after
/// [`repad`] turned a sibling list into one padding node. Containers with a
/// format descriptor are kept, their formatting applies to the group.
pub(crate) fn collapse_singletons(node: &mut Node) {
    match node {
        Node::Container { children, .. } => {
            for child in children.iter_mut() {
                collapse_singletons(child);
            }
        }
        Node::Condition {
            cond,
            if_true,
            if_false,
            ..
        } => {
            collapse_singletons(cond);
            collapse_singletons(if_true);
            collapse_singletons(if_false);
        }
        Node::Padding { left, right, .. } => {
            if let Some(left) = left {
                collapse_singletons(left);
            }
            if let Some(right) = right {
                collapse_singletons(right);
            }
        }
        _ => {}
    }
    let lone_child = match node {
        Node::Container {
            fmt: None,
            children,
        } if children.len() == 1 => children.pop(),
        _ => None,
    };
    if let Some(child) = lone_child {
        *node = child;
    }
}

// ── tree dump ──────────────────────────────────────────────────────────

fn dump_fmt(fmt: &FormatDescriptor, buf: &mut String) {
    let max = fmt.max_cols.map(|m| m as i64).unwrap_or(-1);
    let _ = write!(
        buf,
        ":{{{},{},{},'{}'}}",
        fmt.min_cols,
        max,
        fmt.justify.name(),
        fmt.leader
    );
}

impl Node {
    /// Serialise the tree into a compact human-readable dump, e.g.
    /// `<COND:<BOOL(1,2)>|<TEXT:'yes'>|<TEXT:'no'>>`. Empty containers
    /// produce no output.
    pub fn serialise(&self, buf: &mut String) {
        match self {
            Node::Text(text) => {
                let _ = write!(buf, "<TEXT:'{}'>", text);
            }
            Node::Expando {
                did,
                uid,
                fmt,
                text,
                ..
            } => {
                buf.push_str("<EXP:");
                if let Some(text) = text {
                    let _ = write!(buf, "'{}'", text);
                }
                let _ = write!(buf, "({},{})", did, uid);
                if let Some(fmt) = fmt {
                    dump_fmt(fmt, buf);
                }
                buf.push('>');
            }
            Node::CondBool { did, uid } => {
                let _ = write!(buf, "<BOOL({},{})>", did, uid);
            }
            Node::CondDate {
                did,
                uid,
                count,
                period,
            } => {
                let _ = write!(buf, "<DATE:({},{}):{}:{}>", did, uid, count, period.as_char());
            }
            Node::Condition {
                fmt,
                cond,
                if_true,
                if_false,
            } => {
                buf.push_str("<COND:");
                cond.serialise(buf);
                buf.push('|');
                if_true.serialise(buf);
                buf.push('|');
                if_false.serialise(buf);
                if let Some(fmt) = fmt {
                    dump_fmt(fmt, buf);
                }
                buf.push('>');
            }
            Node::Padding {
                kind,
                fill,
                left,
                right,
            } => {
                let _ = write!(buf, "<PAD:{}:'{}':", kind.name(), fill);
                if let Some(left) = left {
                    left.serialise(buf);
                }
                buf.push('|');
                if let Some(right) = right {
                    right.serialise(buf);
                }
                buf.push('>');
            }
            Node::Container { children, .. } => {
                if children.is_empty() {
                    return;
                }
                buf.push_str("<CONT:");
                for child in children {
                    child.serialise(buf);
                }
                buf.push('>');
            }
        }
    }
}
