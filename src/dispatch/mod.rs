pub mod http;

use serde::Serialize;

/// One probe as sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProbeRequest {
    pub model_id: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    messages: [ChatMessage<'a>; 1],
    model: &'a str,
    max_tokens: u32,
}

impl ModelProbeRequest {
    pub fn new(model_id: impl Into<String>, prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model_id: model_id.into(),
            prompt: prompt.into(),
            max_tokens,
        }
    }

    /// JSON body for `POST /chat/completions`.
    pub fn body(&self) -> serde_json::Value {
        let body = ChatCompletionBody {
            messages: [ChatMessage {
                role: "user",
                content: &self.prompt,
            }],
            model: &self.model_id,
            max_tokens: self.max_tokens,
        };
        // Plain strings and integers; cannot fail.
        serde_json::to_value(body).unwrap_or(serde_json::Value::Null)
    }
}

/// A response that made it back with a status line.
#[derive(Debug, Clone)]
pub struct RawExchange {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A probe that never produced a complete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout(String),
    Other(String),
}
