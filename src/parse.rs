//! CLI output parsers.
//!
//! All parsers in this module share one failure policy: malformed or
//! unexpected input yields an empty result, never an error. The project CLI's
//! output shape is outside our control, and partial information beats a hard
//! failure.

pub mod ansi;
pub mod json;
pub mod table;

pub use ansi::{collapse_whitespace, sanitize_cli_text, strip_ansi};
pub use json::{extract_object, extract_records};
pub use table::{is_default_marker, is_rule_line, parse_key_value, parse_table, TableRow};
