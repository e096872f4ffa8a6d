//! Prompt construction and the generation call.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::{report, RelayError};
use crate::extract::extract_code_block;
use crate::llm::{self, Completion, Message, Params};

pub const SYSTEM_PROMPT: &str = "You are a strict, production-grade code generator. \
Return only the code in a single fenced block. No explanations or any other text.";

/// Build the user half of the prompt around a free-text task description.
pub fn user_prompt(spec: &str, lang: &str) -> String {
    let header = format!("Language: {lang}");
    [
        header.as_str(),
        "Task: Generate a complete, production-ready single code file strictly matching the spec below.",
        "Rules:",
        "- Return ONLY code in a single fenced block. No comments, no prose.",
        "- The code must be deterministic, self-contained, and require no external secrets.",
        "- If the spec omits details, pick sensible production defaults.",
        "Spec:",
        spec,
    ]
    .join("\n")
}

pub struct Generator {
    completion: Arc<dyn Completion>,
    model: String,
    lang_hint: String,
    params: Params,
    timeout: Duration,
}

impl Generator {
    pub fn new(
        completion: Arc<dyn Completion>,
        model: String,
        lang_hint: String,
        params: Params,
        timeout: Duration,
    ) -> Self {
        Self { completion, model, lang_hint, params, timeout }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn lang_hint(&self) -> &str {
        &self.lang_hint
    }

    /// Generate code for `spec`. Never fails: on error the returned text is a
    /// description of the failure.
    pub async fn generate(&self, spec: &str) -> String {
        match self.try_generate(spec).await {
            Ok(code) => code,
            Err(e) => report(&RelayError::from(e)).unwrap_or_default(),
        }
    }

    async fn try_generate(&self, spec: &str) -> Result<String, llm::Error> {
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(spec, &self.lang_hint)),
        ];

        let reply = tokio::time::timeout(
            self.timeout,
            self.completion.complete(&self.model, &messages, self.params),
        )
        .await
        .map_err(|_| llm::Error::Timeout(self.timeout))??;

        info!("🤖 {} replied with {} chars", self.model, reply.len());
        Ok(extract_code_block(&reply))
    }
}
