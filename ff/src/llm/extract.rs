//! Fenced-code extraction
//!
//! Model replies wrap generated code in a markdown fence, usually with
//! a language tag and surrounding prose. Only the first fenced block is
//! kept; a reply without a closed fence is used whole.

const FENCE: &str = "```";

/// Return the contents of the first triple-backtick fence, trimmed.
/// Falls back to the whole text, trimmed, when no closed fence exists.
pub fn extract_fenced_code(text: &str) -> String {
    let Some(open) = text.find(FENCE) else {
        return text.trim().to_string();
    };

    // Skip the optional language tag: everything to the end of the
    // opening fence line belongs to the fence marker.
    let after_marker = &text[open + FENCE.len()..];
    let body_start = match after_marker.find('\n') {
        Some(nl) => nl + 1,
        None => return text.trim().to_string(),
    };
    let body = &after_marker[body_start..];

    match body.find(FENCE) {
        Some(close) => body[..close].trim().to_string(),
        None => text.trim().to_string(),
    }
}
