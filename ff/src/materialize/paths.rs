//! Separator-agnostic path string helpers
//!
//! Templates carry paths authored on either platform, so `/` and `\`
//! both count as separators when splitting. When a path is extended,
//! the new segments adopt the separator style of the string being
//! extended, keeping each rewritten path internally consistent.

/// Position of the last separator, if any
fn last_separator(path: &str) -> Option<usize> {
    path.rfind(['/', '\\'])
}

/// Final path segment
pub(crate) fn file_name(path: &str) -> &str {
    match last_separator(path) {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Directory portion, empty when the path is flat
pub(crate) fn dir_portion(path: &str) -> &str {
    match last_separator(path) {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Split a file name into (stem, dot-extension); the extension is
/// empty when there is none. A leading dot does not start an extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    }
}

/// Upper-case the first character, rest unchanged
pub(crate) fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Separator style of an existing path string
pub(crate) fn separator_style(path: &str) -> char {
    if path.contains('\\') { '\\' } else { '/' }
}

/// Rewrite every separator in `path` to `sep`
pub(crate) fn restyle(path: &str, sep: char) -> String {
    path.chars().map(|c| if c == '/' || c == '\\' { sep } else { c }).collect()
}

/// Join `rest` onto `base` using `sep`, restyling `rest` to match
pub(crate) fn join(base: &str, rest: &str, sep: char) -> String {
    let rest = restyle(rest, sep);
    if base.is_empty() {
        return rest;
    }
    let trimmed = base.trim_end_matches(['/', '\\']);
    format!("{}{}{}", trimmed, sep, rest)
}

/// Separator-insensitive containment check
pub(crate) fn contains_path(haystack: &str, needle: &str) -> bool {
    restyle(haystack, '/').contains(&restyle(needle, '/'))
}
