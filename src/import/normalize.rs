//! Cell text normalization

/// Normalize a CSV cell
///
/// Whitespace runs collapse to a single space, the ends are trimmed, and a
/// string wrapped in double quotes loses the wrapping. Quote stripping
/// repeats (with re-trimming) until the text is no longer wrapped, so the
/// result never starts or ends with whitespace and `normalize` is
/// idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");

    while out.len() >= 2 && out.starts_with('"') && out.ends_with('"') {
        out = out[1..out.len() - 1].trim().to_string();
    }
    if out == "\"" {
        out.clear();
    }

    out
}

/// True if the cell is empty after trimming
pub fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}
