//! Relay module - turns Telegram messages into generated code.

pub mod handlers;
pub mod markdown;
pub mod reply;
pub mod telegram;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use handlers::{Command, Inbound, Relay};
pub use reply::FallbackMode;
pub use telegram::{ChatApi, TelegramClient};
pub use worker::{queue, Enqueuer};
