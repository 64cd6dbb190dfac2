//! Filter-pipe post-processing.
//!
//! A format string ending in an unescaped `|` is rendered at full width,
//! executed as a shell command, and replaced by the first line of its
//! output.

use std::process::Command;

use tracing::{debug, warn};

use crate::format::Justify;
use crate::node::Node;
use crate::render::{node_render, RenderData};
use crate::width::{format_string, SPECIAL_INDEX};

/// Column budget used when rendering a command line for the shell. The
/// command needs the full text, but a runaway format should still stop
/// somewhere.
const FILTER_MAX_COLS: usize = 8192;

/// Does this tree end in a text node whose final character is an unescaped
/// `|`? The parser strips escapes from text nodes, so the escape check
/// counts trailing backslashes in the original source.
pub(crate) fn check_for_pipe(root: &Node, source: &str) -> bool {
    fn last_text(node: &Node) -> Option<&str> {
        match node {
            Node::Text(text) => Some(text),
            Node::Container { children, .. } => children.last().and_then(last_text),
            _ => None,
        }
    }

    let Some(text) = last_text(root) else {
        return false;
    };
    if !text.ends_with('|') {
        return false;
    }
    let Some(prefix) = source.strip_suffix('|') else {
        return false;
    };
    let backslashes = prefix.chars().rev().take_while(|&c| c == '\\').count();
    backslashes % 2 == 0
}

/// Render a tree, piping the output through a shell command when the format
/// ends in an unescaped `|`. Without a pipe this is a plain bounded render.
pub(crate) fn filter_render<T>(
    root: &Node,
    source: &str,
    rdata: &RenderData<'_, T>,
    max_cols: usize,
    buf: &mut String,
) -> usize {
    if !check_for_pipe(root, source) {
        return node_render(root, rdata, max_cols, buf);
    }

    let mut rendered = String::new();
    node_render(root, rdata, FILTER_MAX_COLS, &mut rendered);
    let mut command = strip_color_markers(&rendered);
    if command.ends_with('|') {
        command.pop();
    }

    debug!(command = %command, "running expando filter");
    let output = match Command::new("sh").arg("-c").arg(&command).output() {
        Ok(output) => output,
        Err(err) => {
            warn!(command = %command, %err, "expando filter failed to run");
            return 0;
        }
    };
    if !output.status.success() {
        debug!(command = %command, status = %output.status, "expando filter exited non-zero");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next().unwrap_or_default();
    format_string(buf, 0, max_cols, Justify::Left, ' ', first_line, false)
}

/// Drop in-band colour pairs so the shell never sees control bytes.
fn strip_color_markers(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == SPECIAL_INDEX {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}
