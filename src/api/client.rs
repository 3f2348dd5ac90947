use futures_util::TryStreamExt;

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::core::chat_stream::{format_api_error, ChatStream};
use crate::core::error::MatrixError;
use crate::utils::url;

/// HTTP client bound to one provider's base URL and API key.
///
/// The remote endpoint is treated as an opaque request/response (or
/// request/stream) boundary; both paths post the same chat-completion
/// payload and differ only in the `stream` flag.
#[derive(Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, MatrixError> {
        let chat_url = url::endpoint(&self.base_url, "chat/completions");
        tracing::debug!(url = %chat_url, model = %request.model, stream = request.stream, "chat completion request");
        let response = self
            .http
            .post(chat_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(MatrixError::Transport(format_api_error(&body)));
        }
        Ok(response)
    }

    /// Issues a non-streaming completion and returns the trimmed reply
    /// text from the chat-completion message content field.
    pub async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, MatrixError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature,
            stream: false,
        };
        let response = self.post(&request).await?;
        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(content.trim().to_string())
    }

    /// Issues a streaming completion and returns the lazy fragment
    /// sequence the session pulls from.
    pub async fn complete_streaming(
        &self,
        model: &str,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<ChatStream, MatrixError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature,
            stream: true,
        };
        let response = self.post(&request).await?;
        Ok(ChatStream::new(
            response.bytes_stream().map_err(MatrixError::from),
        ))
    }
}
