//! Delivers generated code back to the chat.

use std::fmt;
use std::str::FromStr;

use teloxide::types::ParseMode;
use tracing::info;

use crate::error::{report, ErrorKind, RelayError};
use crate::relay::markdown;
use crate::relay::telegram::ChatApi;

/// Telegram's per-message character limit.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Sent instead of an empty code block, which Telegram would reject.
pub const EMPTY_REPLY_TEXT: &str = "The model returned an empty response. Try rephrasing your request.";

/// What to do when the formatted reply cannot be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackMode {
    /// Upload the code as a file attachment.
    Document,
    /// Resend the code without markup.
    PlainText,
}

impl FromStr for FallbackMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "document" | "file" => Ok(Self::Document),
            "plain" | "text" => Ok(Self::PlainText),
            other => Err(format!("expected 'document' or 'plain', got '{other}'")),
        }
    }
}

impl fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::PlainText => write!(f, "plain"),
        }
    }
}

/// How the reply actually reached the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Formatted,
    Document,
    PlainText,
    Failed,
}

/// Where a reply goes.
#[derive(Debug, Clone, Copy)]
pub struct Target {
    pub chat_id: i64,
    pub reply_to: Option<i32>,
}

/// File extension for a language name, used for document uploads.
pub fn file_extension(lang: &str) -> &'static str {
    match lang.to_lowercase().as_str() {
        "python" | "py" => "py",
        "rust" | "rs" => "rs",
        "javascript" | "js" | "node" => "js",
        "typescript" | "ts" => "ts",
        "go" | "golang" => "go",
        "java" => "java",
        "kotlin" | "kt" => "kt",
        "c" => "c",
        "c++" | "cpp" => "cpp",
        "c#" | "csharp" | "cs" => "cs",
        "ruby" | "rb" => "rb",
        "php" => "php",
        "swift" => "swift",
        "bash" | "sh" | "shell" => "sh",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        _ => "txt",
    }
}

/// Send `code` as a formatted block, falling back per `fallback` when
/// Telegram refuses it. Failures are reported, never returned.
pub async fn send_code(
    api: &dyn ChatApi,
    target: Target,
    code: &str,
    lang: &str,
    fallback: FallbackMode,
) -> Delivery {
    if code.trim().is_empty() {
        info!("Generated code for chat {} is empty", target.chat_id);
        return match api.send_text(target.chat_id, EMPTY_REPLY_TEXT, None, target.reply_to).await {
            Ok(_) => Delivery::PlainText,
            Err(e) => {
                report(&RelayError::new(
                    ErrorKind::DeliveryTransport,
                    format!("empty reply notice failed: {e}"),
                ));
                Delivery::Failed
            }
        };
    }

    let formatted = markdown::code_block(code, lang);

    if formatted.chars().count() <= MAX_MESSAGE_CHARS {
        match api
            .send_text(target.chat_id, &formatted, Some(ParseMode::MarkdownV2), target.reply_to)
            .await
        {
            Ok(_) => {
                info!("📤 Sent {} chars of code to chat {}", code.len(), target.chat_id);
                return Delivery::Formatted;
            }
            Err(e) => {
                report(&RelayError::from(e));
            }
        }
    } else {
        info!(
            "Reply for chat {} is over {MAX_MESSAGE_CHARS} chars, skipping formatted send",
            target.chat_id
        );
    }

    let sent = match fallback {
        FallbackMode::Document => {
            let file_name = format!("generated.{}", file_extension(lang));
            api.send_document(
                target.chat_id,
                &file_name,
                code.as_bytes().to_vec(),
                None,
                target.reply_to,
            )
            .await
            .map(|_| Delivery::Document)
        }
        FallbackMode::PlainText => api
            .send_text(target.chat_id, code, None, target.reply_to)
            .await
            .map(|_| Delivery::PlainText),
    };

    match sent {
        Ok(delivery) => {
            info!("📤 Sent code to chat {} as {fallback}", target.chat_id);
            delivery
        }
        Err(e) => {
            report(&RelayError::new(
                ErrorKind::DeliveryTransport,
                format!("{fallback} fallback failed: {e}"),
            ));
            Delivery::Failed
        }
    }
}
