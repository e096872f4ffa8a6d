//! Error taxonomy and the single place that decides how each failure is
//! logged and what, if anything, the user gets to see.

use std::fmt;

use tracing::{error, warn};

use crate::config::ConfigError;
use crate::llm;
use crate::relay::telegram::{SendError, SendErrorKind};

pub const INTERNAL_ERROR_TEXT: &str = "An internal error occurred. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed startup settings.
    Configuration,
    /// The completion service failed or timed out.
    UpstreamGeneration,
    /// Telegram rejected our markup.
    DeliveryFormat,
    /// Telegram could not be reached or refused the request.
    DeliveryTransport,
    Internal,
}

#[derive(Debug)]
pub struct RelayError {
    kind: ErrorKind,
    detail: String,
}

impl RelayError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, detail)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::UpstreamGeneration => "generation failed",
            ErrorKind::DeliveryFormat => "markup rejected",
            ErrorKind::DeliveryTransport => "delivery failed",
            ErrorKind::Internal => "internal error",
        };
        write!(f, "{label}: {}", self.detail)
    }
}

impl std::error::Error for RelayError {}

impl From<ConfigError> for RelayError {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorKind::Configuration, e.to_string())
    }
}

impl From<llm::Error> for RelayError {
    fn from(e: llm::Error) -> Self {
        Self::new(ErrorKind::UpstreamGeneration, e.to_string())
    }
}

impl From<SendError> for RelayError {
    fn from(e: SendError) -> Self {
        let kind = match e.kind {
            SendErrorKind::Format => ErrorKind::DeliveryFormat,
            SendErrorKind::Transport => ErrorKind::DeliveryTransport,
        };
        Self::new(kind, e.message)
    }
}

/// Log `err` at the level its kind calls for and return the text to show
/// the user, if any.
pub fn report(err: &RelayError) -> Option<String> {
    match err.kind {
        ErrorKind::DeliveryFormat => {
            warn!("⚠️ {err}");
            None
        }
        ErrorKind::Configuration | ErrorKind::DeliveryTransport => {
            error!("❌ {err}");
            None
        }
        ErrorKind::UpstreamGeneration => {
            error!("❌ {err}");
            Some(format!("An error occurred while generating code: {}", err.detail))
        }
        ErrorKind::Internal => {
            error!("❌ {err}");
            Some(INTERNAL_ERROR_TEXT.to_string())
        }
    }
}
