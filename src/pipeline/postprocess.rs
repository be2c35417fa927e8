//! Post-processing: deterministic cleanup of OCR text and LLM output.
//!
//! OCR.space returns text with `\r\n` line endings, trailing blanks on every
//! line and the occasional zero-width character. LLMs asked for "a single
//! JSON object" still wrap it in a ```` ```json ```` fence more often than not.
//! Both are fixed here with small pure functions so the remote-call wrappers
//! stay focused on transport.

use crate::error::AnalyzerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise one page of OCR output.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Trim the page
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Decode the summariser's answer into JSON, tolerating an outer code fence.
pub fn parse_summary(raw: &str) -> Result<serde_json::Value, AnalyzerError> {
    let body = strip_json_fence(raw);
    serde_json::from_str(&body).map_err(|e| AnalyzerError::InvalidSummary {
        detail: format!("{e}"),
    })
}

// ── LLM output: strip outer fences ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\n?(.*?)\n?```$").unwrap());

/// Remove a surrounding ```` ```json ... ``` ```` (or bare ```` ``` ````) fence.
pub fn strip_json_fence(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

// ── OCR text rules ───────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}
