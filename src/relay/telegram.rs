//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode, ReplyParameters};
use teloxide::{ApiError, RequestError};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// Telegram could not parse the message entities.
    Format,
    Transport,
}

#[derive(Debug, Clone)]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
}

impl SendError {
    pub fn format(message: impl Into<String>) -> Self {
        Self { kind: SendErrorKind::Format, message: message.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self { kind: SendErrorKind::Transport, message: message.into() }
    }
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SendError {}

impl From<RequestError> for SendError {
    fn from(e: RequestError) -> Self {
        let message = e.to_string();
        match e {
            RequestError::Api(ApiError::CantParseEntities(_)) => Self::format(message),
            RequestError::Api(ApiError::Unknown(ref description))
                if is_markup_rejection(description) =>
            {
                Self::format(message)
            }
            _ => Self::transport(message),
        }
    }
}

/// Markup errors teloxide does not recognise arrive as `ApiError::Unknown`.
fn is_markup_rejection(description: &str) -> bool {
    let lower = description.to_lowercase();
    lower.contains("can't parse entities") || lower.contains("can't find end of")
}

/// The subset of the Bot API the relay needs.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to_message_id: Option<i32>,
    ) -> Result<i32, SendError>;

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        contents: Vec<u8>,
        caption: Option<&str>,
        reply_to_message_id: Option<i32>,
    ) -> Result<i32, SendError>;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to_message_id: Option<i32>,
    ) -> Result<i32, SendError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id)));
        }

        request.await.map(|msg| msg.id.0).map_err(|e| {
            warn!("Failed to send to chat {chat_id}: {e}");
            SendError::from(e)
        })
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        contents: Vec<u8>,
        caption: Option<&str>,
        reply_to_message_id: Option<i32>,
    ) -> Result<i32, SendError> {
        let input_file = InputFile::memory(contents).file_name(file_name.to_string());

        let mut request = self.bot.send_document(ChatId(chat_id), input_file);

        if let Some(cap) = caption {
            request = request.caption(cap);
        }

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id)));
        }

        request.await.map(|msg| msg.id.0).map_err(|e| {
            warn!("Failed to send document to chat {chat_id}: {e}");
            SendError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_rejection_detection() {
        assert!(is_markup_rejection(
            "Bad Request: can't parse entities: Character '.' is reserved and must be escaped"
        ));
        assert!(is_markup_rejection("Bad Request: Can't find end of Pre entity at byte offset 12"));
        assert!(!is_markup_rejection("Forbidden: bot was blocked by the user"));
    }

    #[test]
    fn test_request_error_classification() {
        let parse = RequestError::Api(ApiError::CantParseEntities(
            "Bad Request: can't parse entities: Character '.' is reserved".into(),
        ));
        assert_eq!(SendError::from(parse).kind, SendErrorKind::Format);

        let unknown = RequestError::Api(ApiError::Unknown(
            "Bad Request: can't find end of Pre entity at byte offset 12".into(),
        ));
        assert_eq!(SendError::from(unknown).kind, SendErrorKind::Format);

        let blocked = RequestError::Api(ApiError::BotBlocked);
        assert_eq!(SendError::from(blocked).kind, SendErrorKind::Transport);

        let other = RequestError::Api(ApiError::Unknown("Bad Request: chat not found".into()));
        assert_eq!(SendError::from(other).kind, SendErrorKind::Transport);
    }
}
