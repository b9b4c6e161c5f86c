use crate::{
    error::ModusError,
    message::{GenerationRequest, Readiness},
};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

/// Incremental answer fragments, in order. Finite and not restartable;
/// dropping it releases the underlying connection.
pub type TextStream = BoxStream<'static, Result<String, ModusError>>;

/// Fragment appended to a stream when generation fails mid-flight.
pub fn error_fragment(err: &ModusError) -> String {
    format!("\n[Error] {err}")
}

/// Turn a fallible stream into plain text, ending with an error fragment
/// at the first failure.
pub fn inline_errors(stream: TextStream) -> BoxStream<'static, String> {
    futures::stream::unfold(Some(stream), |state| async move {
        let mut stream = state?;
        match stream.next().await {
            Some(Ok(chunk)) => Some((chunk, Some(stream))),
            Some(Err(e)) => Some((error_fragment(&e), None)),
            None => None,
        }
    })
    .boxed()
}

/// AI Provider trait, one implementation per backend.
///
/// The provider is chosen once at startup and shared by every request.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Configured model name.
    fn model(&self) -> &str;

    /// Verify the backend is reachable and configured. Never retries.
    async fn check_ready(&self) -> Readiness;

    /// Produce one complete answer, retrying transient failures.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ModusError>;

    /// Open an incremental answer. No retries once a stream is requested.
    async fn complete_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModusError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inline_errors_terminates_after_error() {
        let source: TextStream = futures::stream::iter(vec![
            Ok("a".to_string()),
            Err(ModusError::Cancelled),
            Ok("never".to_string()),
        ])
        .boxed();

        let out: Vec<String> = inline_errors(source).collect().await;
        assert_eq!(out, vec!["a".to_string(), "\n[Error] request cancelled".to_string()]);
    }

    #[tokio::test]
    async fn test_inline_errors_passes_clean_stream() {
        let source: TextStream =
            futures::stream::iter(vec![Ok("x".to_string()), Ok("y".to_string())]).boxed();
        let out: Vec<String> = inline_errors(source).collect().await;
        assert_eq!(out.concat(), "xy");
    }
}
