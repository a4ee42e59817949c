//! Column-aligned text table parser.
//!
//! Older project CLI versions have no machine-readable flag and emit
//! human-formatted tables. Column boundaries are recovered from the header
//! line's token offsets; a cell's span is `[thisToken, nextToken)` and the
//! last column runs to end of line. Wrapped description text shows up as a
//! line whose non-final columns are all empty; those lines are folded back
//! into the previous row's final column.

use super::ansi::{collapse_whitespace, strip_ansi};
use std::collections::HashMap;

/// One parsed row: column name to trimmed cell text.
pub type TableRow = HashMap<String, String>;

/// Parse a column-aligned table out of raw CLI text.
///
/// `headers` is the required set of column header tokens. If no line contains
/// all of them, the result is empty; malformed rows are skipped silently.
pub fn parse_table(raw: &str, headers: &[&str]) -> Vec<TableRow> {
    if headers.is_empty() {
        return Vec::new();
    }
    let text = strip_ansi(raw);
    let lines: Vec<&str> = text.lines().collect();

    let (header_idx, spans) = match locate_header(&lines, headers) {
        Some(found) => found,
        None => return Vec::new(),
    };

    // Skip a single separator rule immediately after the header, if present.
    let mut body_start = header_idx + 1;
    if body_start < lines.len() && is_rule_line(lines[body_start]) {
        body_start += 1;
    }

    let final_column = spans
        .last()
        .map(|(name, _, _)| name.to_string())
        .unwrap_or_default();
    let mut rows: Vec<TableRow> = Vec::new();

    for line in lines[body_start..].iter().copied() {
        if line.trim().is_empty() {
            continue;
        }
        let cells = slice_columns(line, &spans);
        if cells.iter().all(|(_, text)| text.is_empty()) {
            continue;
        }

        let continuation = cells[..cells.len() - 1]
            .iter()
            .all(|(_, text)| text.is_empty())
            && !cells[cells.len() - 1].1.is_empty();
        if continuation {
            if let Some(previous) = rows.last_mut() {
                let fragment = collapse_whitespace(&cells[cells.len() - 1].1);
                let merged = match previous.get(&final_column) {
                    Some(existing) if !existing.is_empty() => {
                        format!("{} {}", existing, fragment)
                    }
                    _ => fragment,
                };
                previous.insert(final_column.clone(), merged);
                continue;
            }
            // A continuation with nothing to continue falls through as a row.
        }

        let mut row = TableRow::new();
        for (name, text) in cells {
            row.insert(name.to_string(), collapse_whitespace(&text));
        }
        rows.push(row);
    }

    rows
}

/// Key/value variant for detail output (`org info`, `service info`): a
/// two-column table whose rows become ordered `(key, value)` pairs. Wrapped
/// value text uses the same continuation-line folding as `parse_table`.
pub fn parse_key_value(raw: &str, key_header: &str, value_header: &str) -> Vec<(String, String)> {
    parse_table(raw, &[key_header, value_header])
        .into_iter()
        .filter_map(|mut row| {
            let key = row.remove(key_header).unwrap_or_default();
            let value = row.remove(value_header).unwrap_or_default();
            if key.is_empty() {
                None
            } else {
                Some((key, value))
            }
        })
        .collect()
}

/// A separator rule: dashes, box-drawing characters, and the like.
pub fn is_rule_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| {
            c.is_whitespace()
                || matches!(c, '-' | '=' | '_' | '+' | '|')
                || ('\u{2500}'..='\u{257F}').contains(&c)
        })
}

/// Marker glyphs the CLI uses in a leading column to flag the default row.
pub fn is_default_marker(cell: &str) -> bool {
    matches!(cell.trim(), "*" | "\u{2713}" | "\u{2714}" | "\u{2022}")
}

/// Find the first line containing every header token and compute column
/// spans, ordered by character offset.
fn locate_header<'h>(
    lines: &[&str],
    headers: &[&'h str],
) -> Option<(usize, Vec<(&'h str, usize, usize)>)> {
    for (idx, line) in lines.iter().enumerate() {
        if let Some(spans) = header_spans(line, headers) {
            return Some((idx, spans));
        }
    }
    None
}

/// Character offsets of each header token on a candidate header line, or
/// `None` if any token is missing.
fn header_spans<'h>(line: &str, headers: &[&'h str]) -> Option<Vec<(&'h str, usize, usize)>> {
    let chars: Vec<char> = line.chars().collect();
    let mut offsets: Vec<(usize, &'h str)> = Vec::with_capacity(headers.len());
    for token in headers {
        offsets.push((char_find(&chars, token)?, token));
    }
    offsets.sort_by_key(|(offset, _)| *offset);

    let mut spans = Vec::with_capacity(offsets.len());
    for (i, (start, token)) in offsets.iter().enumerate() {
        let end = offsets
            .get(i + 1)
            .map(|(next, _)| *next)
            .unwrap_or(usize::MAX);
        spans.push((*token, *start, end));
    }
    Some(spans)
}

/// First character-offset occurrence of `needle` in `haystack`, anchored to
/// whitespace-delimited token boundaries so that one header word cannot match
/// inside another (`Name` inside `Username`).
fn char_find(haystack: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| {
        haystack[i..i + needle.len()] == needle[..]
            && (i == 0 || haystack[i - 1].is_whitespace())
            && haystack
                .get(i + needle.len())
                .map_or(true, |c| c.is_whitespace())
    })
}

/// Slice a data line into per-column trimmed cells using header spans.
fn slice_columns<'h>(line: &str, spans: &[(&'h str, usize, usize)]) -> Vec<(&'h str, String)> {
    let chars: Vec<char> = line.chars().collect();
    spans
        .iter()
        .map(|(name, start, end)| {
            let from = (*start).min(chars.len());
            let to = (*end).min(chars.len());
            let cell: String = chars[from..to].iter().collect();
            (*name, cell.trim().to_string())
        })
        .collect()
}
