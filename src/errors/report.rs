//! Renders diagnostics against the source text they point into.
//!
//! ```text
//! Error: Cannot use moved value 'p' (share `p` with `#p` instead of moving it)
//! -> main.own:6:10
//!   |
//! 6 |     take(p);
//!   |          ^
//! Moved here:
//! -> main.own:5:10
//! ```

use std::{collections::HashMap, fmt::Write};

use crate::{Position, Span};

use super::errors::{Error, ErrorTip, Warning};

/// Source texts by file name, used to turn byte offsets into lines.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    files: HashMap<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap::default()
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }

    /// Returns the 1-based line and column of `position` together with the
    /// byte offset at which that line starts.
    pub fn line_col(&self, position: &Position) -> Option<(usize, usize, usize)> {
        let text = self.files.get(position.1.as_str())?;
        let offset = (position.0 as usize).min(text.len());

        let mut line = 1;
        let mut line_start = 0;
        for (i, byte) in text.bytes().enumerate() {
            if i >= offset {
                break;
            }
            if byte == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }

        Some((line, offset - line_start + 1, line_start))
    }

    fn line_text(&self, file: &str, line_start: usize) -> &str {
        match self.files.get(file) {
            Some(text) => {
                let rest = &text[line_start..];
                rest.split('\n').next().unwrap_or("")
            }
            None => "",
        }
    }
}

pub fn render_error(error: &Error, sources: &SourceMap) -> String {
    let mut out = String::new();
    match error.get_tip() {
        ErrorTip::None => {
            let _ = writeln!(out, "Error: {}", error.message());
        }
        tip => {
            let _ = writeln!(out, "Error: {} ({})", error.message(), tip);
        }
    }
    render_span(&mut out, error.get_span(), sources);

    if let Some(related) = error.get_related() {
        let _ = writeln!(out, "{}:", related.label);
        render_span(&mut out, &related.span, sources);
    }

    out
}

pub fn render_warning(warning: &Warning, sources: &SourceMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Warning: {}", warning.message());
    render_span(&mut out, &warning.span, sources);
    out
}

fn render_span(out: &mut String, span: &Span, sources: &SourceMap) {
    let file = span.start.1.as_str();
    let (start_line, start_col, _) = match sources.line_col(&span.start) {
        Some(found) => found,
        None => {
            let _ = writeln!(out, "-> {}", file);
            return;
        }
    };
    let (end_line, end_col, _) = sources
        .line_col(&span.end)
        .unwrap_or((start_line, start_col, 0));

    let _ = writeln!(out, "-> {}:{}:{}", file, start_line, start_col);

    let gutter = end_line.to_string().len() + 1;
    let _ = writeln!(out, "{:>gutter$}|", "");

    let mut line_start = match sources.line_col(&span.start) {
        Some((_, _, start)) => start,
        None => return,
    };
    for line in start_line..=end_line {
        let text = sources.line_text(file, line_start);
        let _ = writeln!(out, "{:<gutter$}| {}", line, text);

        let from = if line == start_line { start_col } else { 1 };
        let to = if line == end_line {
            end_col.max(from + 1)
        } else {
            text.len() + 1
        };
        let _ = writeln!(
            out,
            "{:>gutter$}| {}{}",
            "",
            " ".repeat(from - 1),
            "^".repeat(to - from)
        );

        line_start += text.len() + 1;
    }
}
