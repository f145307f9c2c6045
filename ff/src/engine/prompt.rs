//! Prompt rendering
//!
//! Prompt contents reference file inputs as `{{name}}`. Rendering turns
//! each prompt input into an ordered sequence of segments, preserving
//! the interleaving of text and file references; the LLM observes that
//! order in the final payload.

use std::collections::HashMap;

use crate::domain::PromptInput;
use crate::error::EngineError;

/// One element of the rendered input sequence
#[derive(Debug, Clone, PartialEq)]
pub enum PromptSegment {
    /// Trimmed literal prompt text
    Prompt(String),
    /// Resolved path of a referenced file input
    File(String),
}

/// Render prompt inputs against resolved file paths.
///
/// Tokens are scanned left to right; text between tokens is trimmed
/// and dropped when empty. Segments concatenate across prompt inputs
/// in the given order. Unknown names fail with `ConfigInvalid`.
pub fn render_segments(
    inputs: &[PromptInput],
    paths: &HashMap<String, String>,
) -> Result<Vec<PromptSegment>, EngineError> {
    let mut segments = Vec::new();
    for input in inputs {
        render_content(&input.content, paths, &mut segments)?;
    }
    Ok(segments)
}

fn render_content(
    content: &str,
    paths: &HashMap<String, String>,
    out: &mut Vec<PromptSegment>,
) -> Result<(), EngineError> {
    let mut rest = content;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };

        push_text(&rest[..open], out);

        let name = rest[open + 2..open + 2 + close].trim();
        let path = paths.get(name).ok_or_else(|| {
            EngineError::ConfigInvalid(format!("prompt references unknown file input '{}'", name))
        })?;
        out.push(PromptSegment::File(path.clone()));

        rest = &rest[open + 2 + close + 2..];
    }

    push_text(rest, out);
    Ok(())
}

fn push_text(text: &str, out: &mut Vec<PromptSegment>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(PromptSegment::Prompt(trimmed.to_string()));
    }
}
