//! Command and message handlers.

use std::sync::Arc;

use teloxide::types::{Update, UpdateKind};
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info};

use crate::error::{report, RelayError};
use crate::generate::Generator;
use crate::relay::reply::{self, Delivery, FallbackMode, Target};
use crate::relay::telegram::ChatApi;

pub const INTERIM_TEXT: &str = "⏳ Generating code for your request... This may take a while.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "introduce the bot.")]
    Start,
    #[command(description = "show this text.")]
    Help,
}

/// The parts of a text message the handlers look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat_id: i64,
    pub message_id: i32,
    pub user_id: Option<u64>,
    pub username: Option<String>,
    pub first_name: String,
    pub text: String,
}

impl Inbound {
    /// Extract a text message from an update. Anything else yields `None`.
    pub fn from_update(update: &Update) -> Option<Self> {
        let UpdateKind::Message(msg) = &update.kind else {
            return None;
        };
        let text = msg.text()?;
        let user = msg.from.as_ref();

        Some(Self {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
            user_id: user.map(|u| u.id.0),
            username: user.and_then(|u| u.username.clone()),
            first_name: user.map(|u| u.first_name.clone()).unwrap_or_else(|| "there".to_string()),
            text: text.to_string(),
        })
    }

    fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.first_name)
    }

    /// Sender as it appears in logs: name plus Telegram user id when known.
    fn sender(&self) -> String {
        match self.user_id {
            Some(id) => format!("{} [{id}]", self.display_name()),
            None => self.display_name().to_string(),
        }
    }

    fn target(&self) -> Target {
        Target { chat_id: self.chat_id, reply_to: Some(self.message_id) }
    }
}

pub fn welcome_message(first_name: &str, lang: &str, model: &str) -> String {
    format!(
        "Hi, {first_name}!\n\n\
         I'm a code generation bot. Send me a plain-text description (a prompt) \
         and I'll write {lang} code for it using the {model} model.\n\n\
         For example: a Flask web server with a single page that prints 'Hello, World!'"
    )
}

/// Everything a handler needs, shared by every update.
pub struct Relay {
    telegram: Arc<dyn ChatApi>,
    generator: Generator,
    fallback: FallbackMode,
    bot_username: String,
}

impl Relay {
    pub fn new(
        telegram: Arc<dyn ChatApi>,
        generator: Generator,
        fallback: FallbackMode,
        bot_username: String,
    ) -> Self {
        Self { telegram, generator, fallback, bot_username }
    }

    /// Route one update to its handler.
    pub async fn dispatch(&self, update: Update) {
        let Some(inbound) = Inbound::from_update(&update) else {
            debug!("Skipping update {} (not a text message)", update.id.0);
            return;
        };

        let result = if inbound.text.starts_with('/') {
            match Command::parse(&inbound.text, &self.bot_username) {
                Ok(Command::Start) => self.start(&inbound).await,
                Ok(Command::Help) => self.help(&inbound).await,
                Err(e) => {
                    debug!("Ignoring command {:?}: {e}", inbound.text);
                    Ok(())
                }
            }
        } else {
            self.generate(&inbound).await.map(|_| ())
        };

        if let Err(e) = result {
            self.on_error(&inbound, e).await;
        }
    }

    pub async fn start(&self, inbound: &Inbound) -> Result<(), RelayError> {
        info!("👋 /start from {} in chat {}", inbound.sender(), inbound.chat_id);
        let text = welcome_message(
            &inbound.first_name,
            self.generator.lang_hint(),
            self.generator.model(),
        );
        self.telegram
            .send_text(inbound.chat_id, &text, None, None)
            .await?;
        Ok(())
    }

    pub async fn help(&self, inbound: &Inbound) -> Result<(), RelayError> {
        let text = format!(
            "{}\n\nAny other text is treated as a prompt for code generation.",
            Command::descriptions()
        );
        self.telegram
            .send_text(inbound.chat_id, &text, None, None)
            .await?;
        Ok(())
    }

    /// Acknowledge, generate, reply.
    pub async fn generate(&self, inbound: &Inbound) -> Result<Delivery, RelayError> {
        self.telegram
            .send_text(inbound.chat_id, INTERIM_TEXT, None, None)
            .await?;

        let preview: String = inbound.text.chars().take(100).collect();
        info!("📨 Prompt from {}: \"{preview}\"", inbound.sender());

        let code = self.generator.generate(&inbound.text).await;

        Ok(reply::send_code(
            self.telegram.as_ref(),
            inbound.target(),
            &code,
            self.generator.lang_hint(),
            self.fallback,
        )
        .await)
    }

    /// Log a handler failure and try to tell the user. Never fails.
    pub async fn on_error(&self, inbound: &Inbound, err: RelayError) {
        error!("Exception while handling message {} in chat {}", inbound.message_id, inbound.chat_id);
        let text = report(&err).unwrap_or_else(|| crate::error::INTERNAL_ERROR_TEXT.to_string());

        if let Err(e) = self
            .telegram
            .send_text(inbound.chat_id, &text, None, Some(inbound.message_id))
            .await
        {
            error!("Failed to notify chat {} of the error: {e}", inbound.chat_id);
        }
    }
}
