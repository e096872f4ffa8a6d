//! In-memory stand-ins for Telegram and the completion service.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use teloxide::types::{ParseMode, Update};

use crate::llm::{self, Completion, Message, Params};
use crate::relay::telegram::{ChatApi, SendError};

/// Parse an update the way the webhook does, from raw JSON text.
///
/// `serde_json::from_value` takes a different path through teloxide's
/// `UpdateKind` deserializer and yields `UpdateKind::Error` for messages.
pub fn parse_update(json: serde_json::Value) -> Update {
    serde_json::from_str(&json.to_string()).expect("valid update")
}

/// A private-chat text message from Ada.
pub fn text_update(update_id: u32, chat_id: i64, message_id: i32, text: &str) -> Update {
    parse_update(serde_json::json!({
        "update_id": update_id,
        "message": {
            "message_id": message_id,
            "date": 1700000000,
            "chat": { "id": chat_id, "type": "private", "first_name": "Ada" },
            "from": { "id": chat_id, "is_bot": false, "first_name": "Ada", "username": "ada_l" },
            "text": text
        }
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        chat_id: i64,
        text: String,
        parse_mode: Option<ParseMode>,
        reply_to: Option<i32>,
    },
    Document {
        chat_id: i64,
        file_name: String,
        contents: Vec<u8>,
        reply_to: Option<i32>,
    },
}

/// Records everything sent; individual paths can be made to fail.
#[derive(Default)]
pub struct FakeChat {
    sent: Mutex<Vec<Sent>>,
    markdown_error: Mutex<Option<SendError>>,
    plain_error: Mutex<Option<SendError>>,
    document_error: Mutex<Option<SendError>>,
    markdown_attempts: Mutex<usize>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_markdown_with(&self, err: SendError) {
        *self.markdown_error.lock().unwrap() = Some(err);
    }

    pub fn fail_plain_with(&self, err: SendError) {
        *self.plain_error.lock().unwrap() = Some(err);
    }

    pub fn fail_documents_with(&self, err: SendError) {
        *self.document_error.lock().unwrap() = Some(err);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts sent, in order, regardless of parse mode.
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } => Some(text),
                Sent::Document { .. } => None,
            })
            .collect()
    }

    pub fn markdown_attempts(&self) -> usize {
        *self.markdown_attempts.lock().unwrap()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
        reply_to_message_id: Option<i32>,
    ) -> Result<i32, SendError> {
        let failure = if parse_mode.is_some() {
            *self.markdown_attempts.lock().unwrap() += 1;
            self.markdown_error.lock().unwrap().clone()
        } else {
            self.plain_error.lock().unwrap().clone()
        };
        if let Some(err) = failure {
            return Err(err);
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Text {
            chat_id,
            text: text.to_string(),
            parse_mode,
            reply_to: reply_to_message_id,
        });
        Ok(sent.len() as i32)
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        contents: Vec<u8>,
        _caption: Option<&str>,
        reply_to_message_id: Option<i32>,
    ) -> Result<i32, SendError> {
        if let Some(err) = self.document_error.lock().unwrap().clone() {
            return Err(err);
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(Sent::Document {
            chat_id,
            file_name: file_name.to_string(),
            contents,
            reply_to: reply_to_message_id,
        });
        Ok(sent.len() as i32)
    }
}

enum Behaviour {
    Reply(String),
    Fail(Box<dyn Fn() -> llm::Error + Send + Sync>),
    Stall(Duration),
    /// Panic on the first call, then reply normally.
    PanicOnce { reply: String, panicked: AtomicBool },
}

/// Completion service with a fixed behaviour that logs each request.
pub struct FakeCompletion {
    behaviour: Behaviour,
    calls: Mutex<Vec<(String, Vec<Message>)>>,
}

impl FakeCompletion {
    pub fn reply(text: &str) -> Self {
        Self::with(Behaviour::Reply(text.to_string()))
    }

    pub fn fail<F>(make_error: F) -> Self
    where
        F: Fn() -> llm::Error + Send + Sync + 'static,
    {
        Self::with(Behaviour::Fail(Box::new(make_error)))
    }

    pub fn stall(delay: Duration) -> Self {
        Self::with(Behaviour::Stall(delay))
    }

    pub fn panic_once(text: &str) -> Self {
        Self::with(Behaviour::PanicOnce {
            reply: text.to_string(),
            panicked: AtomicBool::new(false),
        })
    }

    fn with(behaviour: Behaviour) -> Self {
        Self { behaviour, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for FakeCompletion {
    async fn complete(
        &self,
        model: &str,
        messages: &[Message],
        _params: Params,
    ) -> Result<String, llm::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));

        match &self.behaviour {
            Behaviour::Reply(text) => Ok(text.clone()),
            Behaviour::Fail(make_error) => Err(make_error()),
            Behaviour::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(String::new())
            }
            Behaviour::PanicOnce { reply, panicked } => {
                if !panicked.swap(true, Ordering::SeqCst) {
                    panic!("completion backend blew up");
                }
                Ok(reply.clone())
            }
        }
    }
}
