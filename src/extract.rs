//! Pulls the code out of a model reply.

use std::sync::LazyLock;

use regex::Regex;

/// Opening fence with an optional language tag, then a lazy capture up to the
/// next closing fence.
static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```[A-Za-z0-9_+\-]*\r?\n([\s\S]*?)```").unwrap()
});

/// Return the trimmed interior of the first fenced block in `text`, or the
/// whole of `text` trimmed when there is no complete fenced block.
pub fn extract_code_block(text: &str) -> String {
    match FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(body) => body.as_str().trim().to_string(),
        None => text.trim().to_string(),
    }
}
