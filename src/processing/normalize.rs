//! Whitespace normalization and repeated-header removal for a single page.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use super::types::PipelineError;

static LINE_ENDINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n?").expect("line ending pattern compiles"));
static INLINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("inline whitespace pattern compiles"));
static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line pattern compiles"));

/// Canonicalize line endings and whitespace of raw page text.
///
/// Carriage returns become line feeds, runs of spaces/tabs collapse to a single space, runs of
/// three or more line feeds collapse to one blank line, and the result is trimmed.
pub fn normalize_text(text: &str) -> String {
    let text = LINE_ENDINGS.replace_all(text, "\n");
    let text = INLINE_WHITESPACE.replace_all(&text, " ");
    let text = BLANK_LINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Removes lines that fully match one of a set of header patterns.
///
/// Patterns are compiled once, case-insensitively, and anchored to the whole line. Lines are
/// compared with surrounding whitespace trimmed but kept verbatim when they survive.
#[derive(Debug, Clone, Default)]
pub struct HeaderStripper {
    patterns: Vec<Regex>,
}

impl HeaderStripper {
    /// Compile the given patterns, preserving their order.
    pub fn new<I, S>(patterns: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                RegexBuilder::new(&format!("^(?:{pattern})$"))
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| PipelineError::InvalidHeaderPattern {
                        pattern: pattern.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether no patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Drop every header line and rejoin the remaining lines with `\n`.
    pub fn strip(&self, text: &str) -> String {
        if self.patterns.is_empty() {
            return text.to_string();
        }

        text.lines()
            .filter(|line| !self.is_header(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_header(&self, line: &str) -> bool {
        let candidate = line.trim();
        self.patterns
            .iter()
            .any(|pattern| pattern.is_match(candidate))
    }
}
