use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use std::pin::Pin;

use crate::api::ChatStreamResponse;
use crate::core::error::MatrixError;

/// One parsed server-sent-events line from a streaming completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseEvent {
    /// Incremental reply text (may be empty for keep-alive deltas).
    Chunk(String),
    /// `data: [DONE]` terminator.
    Done,
    /// Comments, blank lines, and event fields we do not consume.
    Ignore,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Parses a single SSE line. Error payloads from the endpoint become
/// `Transport` errors carrying the formatted body.
pub fn parse_sse_line(line: &str) -> Result<SseEvent, MatrixError> {
    let Some(payload) = extract_data_payload(line) else {
        return Ok(SseEvent::Ignore);
    };

    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    match serde_json::from_str::<ChatStreamResponse>(payload) {
        Ok(response) => {
            let content = response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .unwrap_or_default();
            Ok(SseEvent::Chunk(content))
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return Ok(SseEvent::Ignore);
            }
            Err(MatrixError::Transport(format_api_error(payload)))
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Formats an endpoint error body for the user, pulling out the message
/// field when the body is the usual `{"error": {"message": ...}}` shape.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "API error: <empty response body>".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&json_value) {
            if !summary.is_empty() {
                return format!("API error: {summary}");
            }
        }
    }

    format!("API error: {trimmed}")
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, MatrixError>> + Send>>;

/// A finite, non-restartable sequence of reply fragments pulled from a
/// streaming completion response.
///
/// The consumer calls [`ChatStream::next_chunk`] until it yields `None`
/// (end-of-stream or `[DONE]`) or an error. Fragments arrive in order and
/// empty deltas are skipped.
pub struct ChatStream {
    inner: ByteStream,
    buffer: Vec<u8>,
    done: bool,
}

impl ChatStream {
    pub fn new(inner: impl Stream<Item = Result<Bytes, MatrixError>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(inner),
            buffer: Vec::new(),
            done: false,
        }
    }

    /// Pulls the next non-empty text fragment, or `None` when the stream
    /// has finished.
    pub async fn next_chunk(&mut self) -> Result<Option<String>, MatrixError> {
        loop {
            if self.done {
                return Ok(None);
            }

            while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
                let line = String::from_utf8_lossy(&self.buffer[..newline_pos])
                    .trim()
                    .to_string();
                self.buffer.drain(..=newline_pos);

                match parse_sse_line(&line)? {
                    SseEvent::Chunk(text) => {
                        if !text.is_empty() {
                            return Ok(Some(text));
                        }
                    }
                    SseEvent::Done => {
                        self.done = true;
                        return Ok(None);
                    }
                    SseEvent::Ignore => {}
                }
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                Some(Err(err)) => {
                    self.done = true;
                    return Err(err);
                }
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }

    /// Drains the stream, invoking `on_chunk` for every fragment in
    /// arrival order, and returns the accumulated reply.
    pub async fn collect_with<F>(&mut self, mut on_chunk: F) -> Result<String, MatrixError>
    where
        F: FnMut(&str) -> Result<(), MatrixError>,
    {
        let mut reply = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            on_chunk(&chunk)?;
            reply.push_str(&chunk);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scripted_stream(lines: &[&str]) -> ChatStream {
        let chunks: Vec<Result<Bytes, MatrixError>> = lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{line}\n"))))
            .collect();
        ChatStream::new(futures_util::stream::iter(chunks))
    }

    #[test]
    fn parse_sse_line_handles_spacing_variants() {
        let spaced = parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(spaced.unwrap(), SseEvent::Chunk("Hello".to_string()));

        let tight = parse_sse_line(r#"data:{"choices":[{"delta":{"content":"World"}}]}"#);
        assert_eq!(tight.unwrap(), SseEvent::Chunk("World".to_string()));

        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseEvent::Done);
        assert_eq!(parse_sse_line("data:[DONE]").unwrap(), SseEvent::Done);
    }

    #[test]
    fn parse_sse_line_ignores_non_data_lines() {
        assert_eq!(parse_sse_line("").unwrap(), SseEvent::Ignore);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseEvent::Ignore);
        assert_eq!(parse_sse_line("event: ping").unwrap(), SseEvent::Ignore);
    }

    #[test]
    fn parse_sse_line_surfaces_error_payloads() {
        let err = parse_sse_line(r#"data: {"error":{"message":"internal server error"}}"#)
            .unwrap_err();
        match err {
            MatrixError::Transport(text) => {
                assert_eq!(text, "API error: internal server error");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn format_api_error_extracts_message_shapes() {
        assert_eq!(
            format_api_error(r#"{"error":{"message":"model overloaded"}}"#),
            "API error: model overloaded"
        );
        assert_eq!(
            format_api_error(r#"{"error":"bad key"}"#),
            "API error: bad key"
        );
        assert_eq!(
            format_api_error(r#"{"message":"quota\n exceeded"}"#),
            "API error: quota exceeded"
        );
        assert_eq!(format_api_error("plain failure"), "API error: plain failure");
        assert_eq!(format_api_error("  "), "API error: <empty response body>");
    }

    #[tokio::test]
    async fn fragments_accumulate_in_arrival_order() {
        let mut stream = scripted_stream(&[
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "data: [DONE]",
        ]);

        let mut seen = Vec::new();
        let reply = stream
            .collect_with(|chunk| {
                seen.push(chunk.to_string());
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(reply, "Hello");
        assert_eq!(seen, ["Hel", "lo"]);
    }

    #[tokio::test]
    async fn empty_deltas_are_skipped() {
        let mut stream = scripted_stream(&[
            r#"data: {"choices":[{"delta":{}}]}"#,
            r#"data: {"choices":[{"delta":{"content":""}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#,
            "data: [DONE]",
        ]);

        assert_eq!(stream.next_chunk().await.unwrap(), Some("hi".to_string()));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stream_ends_cleanly_without_done_marker() {
        let mut stream = scripted_stream(&[r#"data: {"choices":[{"delta":{"content":"x"}}]}"#]);
        assert_eq!(stream.next_chunk().await.unwrap(), Some("x".to_string()));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
        // Finished streams stay finished.
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn lines_split_across_byte_chunks_reassemble() {
        let chunks: Vec<Result<Bytes, MatrixError>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"co")),
            Ok(Bytes::from_static(b"ntent\":\"Hello\"}}]}\ndata: [DONE]\n")),
        ];
        let mut stream = ChatStream::new(futures_util::stream::iter(chunks));
        assert_eq!(stream.next_chunk().await.unwrap(), Some("Hello".to_string()));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }
}
