//! Expando definition registry.
//!
//! Each format (an index line, a status bar, an attachment list, ...)
//! publishes a table of `Definition`s describing the expandos it accepts.
//! The `(did, uid)` pair on a definition is the join key between the parser,
//! the parsed tree, and the render-time getter table.

use crate::format::FormatDescriptor;
use crate::node::Node;
use crate::parser::ParseError;

/// Domain id — the namespace an expando belongs to (email, mailbox, ...).
pub type Did = u16;
/// Unique id of a data slot within its domain.
pub type Uid = u16;
/// In-band colour id, emitted as the byte after [`crate::width::SPECIAL_INDEX`].
pub type ColorId = u8;

/// Whether a data slot is naturally a string or a number.
///
/// Render-time dispatch does not depend on this — the getter table decides —
/// but a definition records it so format authors can see what they registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    String,
    Number,
}

/// Flags threaded through the parser and into custom parsers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserFlags {
    /// Parsing a condition predicate (`%<X?...>`), where expandos become
    /// boolean tests and date expandos become date cutoffs.
    pub conditional: bool,
    /// Skip custom parsers and treat every match as a plain expando.
    pub no_custom_parse: bool,
}

/// A custom parse function attached to a definition.
///
/// Called with the full source string and the byte position of the matched
/// short name. On success returns the new node and the position of the first
/// unparsed byte.
pub type CustomParser = fn(
    src: &str,
    pos: usize,
    fmt: Option<FormatDescriptor>,
    did: Did,
    uid: Uid,
    flags: ParserFlags,
) -> Result<(Node, usize), ParseError>;

/// One recognised expando within a format.
#[derive(Clone, Copy)]
pub struct Definition {
    /// Short name, one or two characters, e.g. `"a"` or `"cr"`.
    /// Matched by prefix in table order, so longer names must come first.
    pub short_name: &'static str,
    /// Optional long name, matched by `%{long_name}`.
    pub long_name: Option<&'static str>,
    pub did: Did,
    pub uid: Uid,
    pub kind: DataKind,
    /// Custom parser, e.g. [`crate::parser::parse_padding`] or
    /// [`crate::parser::parse_date`].
    pub parse: Option<CustomParser>,
    /// Colour applied to every expando parsed from this definition.
    pub color: Option<ColorId>,
    /// Render reserved control bytes as one-column tree-drawing characters.
    pub arboreal: bool,
}

impl Definition {
    /// A plain definition with no custom parser.
    pub const fn new(short_name: &'static str, did: Did, uid: Uid, kind: DataKind) -> Self {
        Definition {
            short_name,
            long_name: None,
            did,
            uid,
            kind,
            parse: None,
            color: None,
            arboreal: false,
        }
    }

    pub const fn with_long_name(mut self, long_name: &'static str) -> Self {
        self.long_name = Some(long_name);
        self
    }

    pub const fn with_parser(mut self, parse: CustomParser) -> Self {
        self.parse = Some(parse);
        self
    }

    pub const fn with_color(mut self, color: ColorId) -> Self {
        self.color = Some(color);
        self
    }

    pub const fn with_arboreal(mut self) -> Self {
        self.arboreal = true;
        self
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("short_name", &self.short_name)
            .field("long_name", &self.long_name)
            .field("did", &self.did)
            .field("uid", &self.uid)
            .field("kind", &self.kind)
            .field("custom", &self.parse.is_some())
            .finish()
    }
}
