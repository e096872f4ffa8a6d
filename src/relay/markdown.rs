//! Telegram MarkdownV2 escaping.
//!
//! MarkdownV2 aborts the whole send when it meets an unescaped reserved
//! character, so every outgoing formatted message goes through [`escape`].

/// Every character MarkdownV2 treats as markup, plus the escape character.
pub const RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

pub fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Render `code` as a fenced MarkdownV2 block tagged with `lang`.
pub fn code_block(code: &str, lang: &str) -> String {
    let tag: String = lang
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    format!("```{tag}\n{}\n```", escape(code))
}
