//! Recursive-descent parser for the expando format-string grammar.
//!
//! `%` introduces every control: a format descriptor (`%-12.20_`), a named
//! expando (`%a`, `%{apple}`), a condition (`%<X?yes&no>` or the old form
//! `%?X?yes&no?`), or a padding directive (`%|`, `%>`, `%*`). `&`, `>` and
//! `?` terminate runs only inside a condition; at the top level they are
//! ordinary text.

use thiserror::Error;

use crate::definition::{Definition, ParserFlags};
use crate::format::{parse_format, parse_number, FormatDescriptor};
use crate::node::{collapse_singletons, repad, DatePeriod, Node, PadType};

/// Why parsing failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unknown expando: '%{0}'")]
    UnknownExpando(String),
    #[error("expando is missing terminator: '{0}'")]
    MissingTerminator(char),
    #[error("invalid number: '{0}'")]
    InvalidNumber(String),
    #[error("invalid time period: '{0}', must be one of 'ymwdHM'")]
    InvalidTimePeriod(char),
    #[error("padding cannot be used as a condition")]
    PaddingAsCondition,
    #[error("padding cannot be formatted")]
    PaddingWithFormat,
    #[error("premature end of string after '\\'")]
    TrailingBackslash,
}

/// First failure encountered while parsing a format string.
///
/// `position` is a byte offset into the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}, near position {position}")]
pub struct ParseError {
    pub position: usize,
    pub kind: ParseErrorKind,
}

/// Which characters end the current text run. Only set inside conditions.
#[derive(Debug, Clone, Copy, Default)]
struct TermChars {
    question: bool,
    ampersand: bool,
    greater: bool,
}

impl TermChars {
    const NONE: TermChars = TermChars {
        question: false,
        ampersand: false,
        greater: false,
    };

    fn for_closer(closer: char, ampersand: bool) -> TermChars {
        TermChars {
            question: closer == '?',
            greater: closer == '>',
            ampersand,
        }
    }

    fn matches(self, c: char) -> bool {
        (self.question && c == '?') || (self.ampersand && c == '&') || (self.greater && c == '>')
    }
}

/// Parse a whole format string into a rebalanced tree.
pub(crate) fn parse_tree(src: &str, defs: &[Definition]) -> Result<Node, ParseError> {
    let (children, _) = parse_many(src, 0, TermChars::NONE, defs)?;
    let mut root = Node::container(children);
    repad(&mut root);
    collapse_singletons(&mut root);
    Ok(root)
}

/// Parse sibling nodes until the end of input or an active terminator.
fn parse_many(
    src: &str,
    mut pos: usize,
    term: TermChars,
    defs: &[Definition],
) -> Result<(Vec<Node>, usize), ParseError> {
    let mut nodes = Vec::new();
    while let Some(c) = src[pos..].chars().next() {
        if term.matches(c) {
            break;
        }
        let (node, next) = if c == '%' && !src[pos..].starts_with("%%") {
            parse_one(src, pos, defs)?
        } else {
            parse_text(src, pos, term)?
        };
        nodes.push(node);
        pos = next;
    }
    Ok((nodes, pos))
}

/// Parse a literal text run, resolving `\x` and `%%` escapes.
fn parse_text(src: &str, mut pos: usize, term: TermChars) -> Result<(Node, usize), ParseError> {
    let bytes = src.as_bytes();
    let mut text = String::new();
    while let Some(c) = src[pos..].chars().next() {
        if term.matches(c) {
            break;
        }
        match c {
            '%' => {
                if bytes.get(pos + 1) == Some(&b'%') {
                    text.push('%');
                    pos += 2;
                } else {
                    break;
                }
            }
            '\\' => {
                let Some(esc) = src[pos + 1..].chars().next() else {
                    return Err(ParseError {
                        position: pos,
                        kind: ParseErrorKind::TrailingBackslash,
                    });
                };
                text.push(esc);
                pos += 1 + esc.len_utf8();
            }
            _ => {
                text.push(c);
                pos += c.len_utf8();
            }
        }
    }
    Ok((Node::Text(text), pos))
}

/// Parse one `%`-introduced control starting at the `%`.
fn parse_one(src: &str, pos: usize, defs: &[Definition]) -> Result<(Node, usize), ParseError> {
    let percent = pos;
    let (fmt, pos) = parse_format(src, pos + 1)?;
    match src[pos..].chars().next() {
        Some('<') => parse_condition(src, pos + 1, fmt, '>', defs),
        Some('?') => parse_condition(src, pos + 1, fmt, '?', defs),
        Some(_) => parse_expando_name(src, pos, fmt, defs, ParserFlags::default()),
        None => Err(ParseError {
            position: percent,
            kind: ParseErrorKind::UnknownExpando(String::new()),
        }),
    }
}

/// Parse the body of a condition. `pos` is just past the opener; `closer`
/// is `'>'` for the new form and `'?'` for the old form.
fn parse_condition(
    src: &str,
    pos: usize,
    fmt: Option<FormatDescriptor>,
    closer: char,
    defs: &[Definition],
) -> Result<(Node, usize), ParseError> {
    let (cond, pos) = parse_cond_predicate(src, pos, defs)?;
    if src[pos..].chars().next() != Some('?') {
        return Err(ParseError {
            position: pos,
            kind: ParseErrorKind::MissingTerminator('?'),
        });
    }

    let (true_nodes, mut pos) =
        parse_many(src, pos + 1, TermChars::for_closer(closer, true), defs)?;
    let mut false_nodes = Vec::new();
    if src[pos..].starts_with('&') {
        let (nodes, next) =
            parse_many(src, pos + 1, TermChars::for_closer(closer, false), defs)?;
        false_nodes = nodes;
        pos = next;
    }

    if src[pos..].chars().next() != Some(closer) {
        return Err(ParseError {
            position: pos,
            kind: ParseErrorKind::MissingTerminator(closer),
        });
    }
    Ok((
        Node::Condition {
            fmt,
            cond: Box::new(cond),
            if_true: Box::new(Node::collapse(true_nodes)),
            if_false: Box::new(Node::collapse(false_nodes)),
        },
        pos + closer.len_utf8(),
    ))
}

/// Parse a condition predicate: a bare expando name (no `%`). A plain
/// expando becomes a truthiness test; a date expando becomes a date cutoff.
fn parse_cond_predicate(
    src: &str,
    pos: usize,
    defs: &[Definition],
) -> Result<(Node, usize), ParseError> {
    let flags = ParserFlags {
        conditional: true,
        no_custom_parse: false,
    };
    let (node, next) = parse_expando_name(src, pos, None, defs, flags)?;
    let node = match node {
        Node::Expando { did, uid, .. } => Node::CondBool { did, uid },
        other => other,
    };
    Ok((node, next))
}

/// Resolve an expando name against the definition table.
///
/// Short names match by prefix in table order; `%{long_name}` matches the
/// long-name column. A definition with a custom parser hands off to it.
fn parse_expando_name(
    src: &str,
    pos: usize,
    fmt: Option<FormatDescriptor>,
    defs: &[Definition],
    flags: ParserFlags,
) -> Result<(Node, usize), ParseError> {
    if src[pos..].starts_with('{') {
        let Some(end) = src[pos + 1..].find('}').map(|i| pos + 1 + i) else {
            return Err(ParseError {
                position: pos,
                kind: ParseErrorKind::MissingTerminator('}'),
            });
        };
        let name = &src[pos + 1..end];
        let Some(def) = defs.iter().find(|d| d.long_name == Some(name)) else {
            return Err(ParseError {
                position: pos,
                kind: ParseErrorKind::UnknownExpando(name.to_string()),
            });
        };
        return Ok((expando_node(def, fmt), end + 1));
    }

    for def in defs {
        if !src[pos..].starts_with(def.short_name) {
            continue;
        }
        if let Some(parse) = def.parse {
            if !flags.no_custom_parse {
                return parse(src, pos, fmt, def.did, def.uid, flags);
            }
        }
        return Ok((expando_node(def, fmt), pos + def.short_name.len()));
    }

    let unknown = match src[pos..].chars().next() {
        Some(c) => c.to_string(),
        None => String::new(),
    };
    Err(ParseError {
        position: pos,
        kind: ParseErrorKind::UnknownExpando(unknown),
    })
}

fn expando_node(def: &Definition, fmt: Option<FormatDescriptor>) -> Node {
    Node::Expando {
        did: def.did,
        uid: def.uid,
        fmt,
        text: None,
        color: def.color,
        arboreal: def.arboreal,
    }
}

// ── custom parsers ─────────────────────────────────────────────────────

/// Custom parser for the padding directives `%|X`, `%>X`, `%*X`.
///
/// `pos` is at the directive character; the fill character follows it and
/// defaults to a space. Padding rejects a format descriptor and cannot be a
/// condition predicate.
pub fn parse_padding(
    src: &str,
    pos: usize,
    fmt: Option<FormatDescriptor>,
    _did: crate::definition::Did,
    _uid: crate::definition::Uid,
    flags: ParserFlags,
) -> Result<(Node, usize), ParseError> {
    if fmt.is_some() {
        return Err(ParseError {
            position: pos,
            kind: ParseErrorKind::PaddingWithFormat,
        });
    }
    if flags.conditional {
        return Err(ParseError {
            position: pos,
            kind: ParseErrorKind::PaddingAsCondition,
        });
    }

    let kind = match src[pos..].chars().next() {
        Some('|') => PadType::FillEol,
        Some('>') => PadType::HardFill,
        Some('*') => PadType::SoftFill,
        other => {
            return Err(ParseError {
                position: pos,
                kind: ParseErrorKind::UnknownExpando(
                    other.map(|c| c.to_string()).unwrap_or_default(),
                ),
            })
        }
    };

    let mut pos = pos + 1;
    let fill = match src[pos..].chars().next() {
        Some(c) => {
            pos += c.len_utf8();
            c.to_string()
        }
        None => " ".to_string(),
    };

    Ok((
        Node::Padding {
            kind,
            fill,
            left: None,
            right: None,
        },
        pos,
    ))
}

/// Custom parser for `%[...]` date expandos.
///
/// Outside a condition the bracketed text is an opaque strftime format. As
/// a condition predicate, `%<[NP?...>` parses an optional count and a time
/// period from `ymwdHM` into a date cutoff.
pub fn parse_date(
    src: &str,
    pos: usize,
    fmt: Option<FormatDescriptor>,
    did: crate::definition::Did,
    uid: crate::definition::Uid,
    flags: ParserFlags,
) -> Result<(Node, usize), ParseError> {
    let mut pos = pos + 1; // consume '['

    if !flags.conditional {
        let (text, next) = parse_enclosure(src, pos, ']')?;
        return Ok((
            Node::Expando {
                did,
                uid,
                fmt,
                text: Some(text),
                color: None,
                arboreal: false,
            },
            next,
        ));
    }

    let mut count = 0;
    if src.as_bytes().get(pos).is_some_and(|b| b.is_ascii_digit()) {
        let (n, next) = parse_number(src, pos)?;
        count = n;
        pos = next;
    }
    let Some(period_char) = src[pos..].chars().next() else {
        return Err(ParseError {
            position: pos,
            kind: ParseErrorKind::MissingTerminator(']'),
        });
    };
    let Some(period) = DatePeriod::from_char(period_char) else {
        return Err(ParseError {
            position: pos,
            kind: ParseErrorKind::InvalidTimePeriod(period_char),
        });
    };
    pos += 1;
    // the closing bracket is optional before the condition's '?'
    if src[pos..].starts_with(']') {
        pos += 1;
    }
    Ok((Node::CondDate { did, uid, count, period }, pos))
}

/// Copy text up to an unescaped `terminator`, resolving `\x` escapes.
pub fn parse_enclosure(
    src: &str,
    pos: usize,
    terminator: char,
) -> Result<(String, usize), ParseError> {
    let start = pos;
    let mut pos = pos;
    let mut text = String::new();
    while let Some(c) = src[pos..].chars().next() {
        if c == terminator {
            return Ok((text, pos + c.len_utf8()));
        }
        if c == '\\' {
            let Some(esc) = src[pos + 1..].chars().next() else {
                break;
            };
            text.push(esc);
            pos += 1 + esc.len_utf8();
        } else {
            text.push(c);
            pos += c.len_utf8();
        }
    }
    Err(ParseError {
        position: start,
        kind: ParseErrorKind::MissingTerminator(terminator),
    })
}
