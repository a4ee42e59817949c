//! ANSI escape stripping and whitespace normalization.
//!
//! The project CLI colorizes both its tables and its error output; every text
//! path (table parsing, line-splitting fallbacks, stderr sanitization) strips
//! escapes before looking at the content.

use regex::Regex;
use std::sync::OnceLock;

/// CSI sequences (`ESC [ ... final`) and OSC sequences (`ESC ] ... BEL`).
fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\x1B\[[0-9;:?]*[ -/]*[@-~]|\x1B\][^\x07\x1B]*(?:\x07|\x1B\\)?")
            .expect("ANSI escape pattern is valid")
    })
}

/// Remove ANSI escape sequences, leaving printable text untouched.
pub fn strip_ansi(text: &str) -> String {
    ansi_pattern().replace_all(text, "").into_owned()
}

/// Collapse all internal whitespace runs (including newlines) to single
/// spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full sanitization used for user-facing CLI error text.
pub fn sanitize_cli_text(text: &str) -> String {
    collapse_whitespace(&strip_ansi(text))
}
