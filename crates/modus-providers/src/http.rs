//! Transport helpers shared by the HTTP backends.

use async_stream::try_stream;
use futures::stream::{BoxStream, Stream, StreamExt};
use modus_core::error::ModusError;
use reqwest::StatusCode;

/// Classify a reqwest failure.
pub(crate) fn transport_error(provider: &str, e: reqwest::Error) -> ModusError {
    let provider = provider.to_string();
    let message = e.to_string();
    if e.is_timeout() {
        ModusError::Timeout { provider, message }
    } else if e.is_connect() {
        ModusError::Connection { provider, message }
    } else {
        ModusError::Api {
            provider,
            status: e.status().map(|s| s.as_u16()),
            message,
        }
    }
}

/// Classify a non-success HTTP response.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> ModusError {
    let provider = provider.to_string();
    let message = error_summary(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ModusError::Authentication { provider, message }
        }
        StatusCode::TOO_MANY_REQUESTS => ModusError::RateLimited { provider, message },
        _ => ModusError::Api {
            provider,
            status: Some(status.as_u16()),
            message,
        },
    }
}

/// Fail with a classified error unless the response succeeded.
pub(crate) async fn ensure_success(
    provider: &str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, ModusError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(provider, status, &body))
}

/// Human-readable message out of an error body. Understands both
/// `{"error":{"message":..}}` and `{"error":".."}`; falls back to the raw text.
pub(crate) fn error_summary(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return trimmed.to_string();
    };
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|| trimmed.to_string())
}

/// Re-frame a byte stream as trimmed, non-empty lines.
///
/// A trailing line without a newline is still emitted when the source ends.
pub(crate) fn split_lines<S, B>(source: S) -> BoxStream<'static, Result<String, ModusError>>
where
    S: Stream<Item = Result<B, ModusError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = try_stream! {
        let mut source = Box::pin(source);
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = source.next().await {
            let chunk = chunk?;
            buffer.extend_from_slice(chunk.as_ref());
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() {
                    yield line;
                }
            }
        }
        let rest = String::from_utf8_lossy(&buffer).trim().to_string();
        if !rest.is_empty() {
            yield rest;
        }
    };
    stream.boxed()
}

/// Lines of a streaming HTTP response body.
pub(crate) fn response_lines(
    provider: &'static str,
    resp: reqwest::Response,
) -> BoxStream<'static, Result<String, ModusError>> {
    split_lines(
        resp.bytes_stream()
            .map(move |chunk| chunk.map_err(|e| transport_error(provider, e))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error("openai", StatusCode::UNAUTHORIZED, ""),
            ModusError::Authentication { .. }
        ));
        assert!(matches!(
            status_error("openai", StatusCode::TOO_MANY_REQUESTS, ""),
            ModusError::RateLimited { .. }
        ));
        assert!(matches!(
            status_error("ollama", StatusCode::NOT_FOUND, ""),
            ModusError::Api {
                status: Some(404),
                ..
            }
        ));
    }

    #[test]
    fn test_error_summary_shapes() {
        assert_eq!(
            error_summary(r#"{"error":{"message":"Incorrect API key\n provided"}}"#),
            "Incorrect API key provided"
        );
        assert_eq!(
            error_summary(r#"{"error":"model 'x' not found"}"#),
            "model 'x' not found"
        );
        assert_eq!(error_summary("  plain failure \n"), "plain failure");
        assert_eq!(error_summary(r#"{"detail":1}"#), r#"{"detail":1}"#);
    }

    #[tokio::test]
    async fn test_split_lines_across_chunks() {
        let chunks: Vec<Result<Vec<u8>, ModusError>> = vec![
            Ok(b"{\"a\":".to_vec()),
            Ok(b"1}\n\n{\"b\"".to_vec()),
            Ok(b":2}\n{\"c\":3}".to_vec()),
        ];
        let lines: Vec<String> = split_lines(futures::stream::iter(chunks))
            .map(|l| l.unwrap())
            .collect()
            .await;
        assert_eq!(lines, vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]);
    }

    #[tokio::test]
    async fn test_split_lines_propagates_error() {
        let chunks: Vec<Result<Vec<u8>, ModusError>> = vec![
            Ok(b"one\n".to_vec()),
            Err(ModusError::Cancelled),
        ];
        let out: Vec<_> = split_lines(futures::stream::iter(chunks)).collect().await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_deref().unwrap(), "one");
        assert!(matches!(out[1], Err(ModusError::Cancelled)));
    }
}
