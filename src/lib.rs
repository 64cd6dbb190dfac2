//! Format-string expansion engine.
//!
//! An *expando* is a `%`-style token that expands at render time to data
//! drawn from a caller-supplied object: `"%4n %-20.20a %<d?today>"` might
//! render a counter, a left-justified name and a conditional marker. Each
//! caller publishes a table of [`Definition`]s naming the expandos it
//! accepts and a table of [`RenderCallback`]s producing their values.
//!
//! The pipeline is definition → parse → rebalance → render, with an
//! optional shell filter stage for formats ending in `|`:
//!
//! ```
//! use expando::{DataKind, Definition, Expando, Node, RenderCallback, RenderData, RenderFlags};
//!
//! struct Message { subject: String }
//!
//! fn get_subject(_: &Node, msg: &Message, _: RenderFlags, buf: &mut String) {
//!     buf.push_str(&msg.subject);
//! }
//!
//! const DEFS: &[Definition] = &[Definition::new("s", 1, 1, DataKind::String)];
//! const CALLBACKS: &[RenderCallback<Message>] = &[RenderCallback::string(1, 1, get_subject)];
//!
//! let exp = Expando::parse("Subject: %-10s!", DEFS).unwrap();
//! let msg = Message { subject: "hello".into() };
//! let mut out = String::new();
//! exp.render(&RenderData::new(CALLBACKS, &msg), 80, &mut out);
//! assert_eq!(out, "Subject: hello     !");
//! ```

mod conddate;
pub mod definition;
mod filter;
pub mod format;
pub mod node;
pub mod parser;
pub mod render;
pub mod width;

pub use definition::{ColorId, CustomParser, DataKind, Definition, Did, ParserFlags, Uid};
pub use format::{FormatDescriptor, Justify};
pub use node::{DatePeriod, Node, PadType};
pub use parser::{parse_date, parse_enclosure, parse_padding, ParseError, ParseErrorKind};
pub use render::{NumberGetter, RenderCallback, RenderData, RenderFlags, StringGetter};

use serde::{Serialize, Serializer};

/// A parsed format string: the original source plus the node tree.
///
/// Trees are immutable after parsing; rendering never mutates them. Two
/// expandos compare equal iff their source strings do, since parsing is
/// deterministic for a given definition table.
#[derive(Debug, Clone)]
pub struct Expando {
    source: String,
    root: Node,
}

impl Expando {
    /// Parse a format string against a definition table.
    pub fn parse(source: &str, defs: &[Definition]) -> Result<Self, ParseError> {
        let root = parser::parse_tree(source, defs)?;
        Ok(Expando {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Dump the tree in a compact debugging form.
    pub fn serialise(&self) -> String {
        let mut buf = String::new();
        self.root.serialise(&mut buf);
        buf
    }

    /// Render into `buf`, writing at most `max_cols` screen columns.
    /// Returns the number of columns written.
    pub fn render<T>(&self, rdata: &RenderData<'_, T>, max_cols: usize, buf: &mut String) -> usize {
        render::node_render(&self.root, rdata, max_cols, buf)
    }

    /// Render, then pipe through a shell command if the format ends in an
    /// unescaped `|`. The buffer receives the first line of the command's
    /// output, truncated to `max_cols`, or nothing if the command fails.
    pub fn filter_render<T>(
        &self,
        rdata: &RenderData<'_, T>,
        max_cols: usize,
        buf: &mut String,
    ) -> usize {
        filter::filter_render(&self.root, &self.source, rdata, max_cols, buf)
    }
}

impl PartialEq for Expando {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Expando {}

impl std::fmt::Display for Expando {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Expando {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFS: &[Definition] = &[
        Definition::new("a", 1, 1, DataKind::String),
        Definition::new("n", 1, 2, DataKind::Number),
    ];

    #[test]
    fn equality_is_by_source() {
        let a = Expando::parse("%a %n", DEFS).unwrap();
        let b = Expando::parse("%a %n", DEFS).unwrap();
        let c = Expando::parse("%n %a", DEFS).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parse_is_deterministic() {
        let a = Expando::parse("%<n?%a&none>", DEFS).unwrap();
        let b = Expando::parse("%<n?%a&none>", DEFS).unwrap();
        assert_eq!(a.serialise(), b.serialise());
    }

    #[test]
    fn display_round_trips_the_source() {
        let src = "%-5a: %03n";
        let exp = Expando::parse(src, DEFS).unwrap();
        assert_eq!(exp.to_string(), src);
    }

    #[test]
    fn serialises_as_the_source_string() {
        let exp = Expando::parse("%a|", DEFS).unwrap();
        assert_eq!(serde_json::to_string(&exp).unwrap(), "\"%a|\"");
    }
}
