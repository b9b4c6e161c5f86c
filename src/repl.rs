//! Interactive prompt session.

use modus_core::{config::Config, error::ModusError, mode::ModeSelector};
use modus_providers::Dispatcher;
use std::io::{BufRead, Write};
use tokio::sync::mpsc;

type Input = mpsc::UnboundedReceiver<String>;

/// Lines typed by the operator.
///
/// Reads happen on a plain thread so a closed session never waits on a
/// pending stdin read; the thread dies with the process.
fn stdin_lines() -> Input {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Print `prompt` and read one trimmed line. `None` when the operator
/// pressed Ctrl+C or stdin closed.
async fn read_line(input: &mut Input, prompt: &str) -> anyhow::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    tokio::select! {
        line = input.recv() => Ok(line.map(|l| l.trim().to_string())),
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}

enum ModeAnswer {
    Chosen(ModeSelector),
    Invalid,
    Closed,
}

/// Ask for a mode. An empty answer means `auto`.
async fn select_mode(input: &mut Input) -> anyhow::Result<ModeAnswer> {
    let Some(answer) = read_line(input, "Select mode: ").await? else {
        return Ok(ModeAnswer::Closed);
    };
    match ModeSelector::parse(&answer) {
        Ok(sel) => Ok(ModeAnswer::Chosen(sel)),
        Err(e) => {
            println!("\nInput error: {e}");
            Ok(ModeAnswer::Invalid)
        }
    }
}

/// Run the session on stdin until `/exit`, `/quit`, Ctrl+C or end of input.
pub async fn run(dispatcher: &Dispatcher, cfg: &Config) -> anyhow::Result<()> {
    let mut input = stdin_lines();
    session(dispatcher, cfg, &mut input).await
}

async fn session(dispatcher: &Dispatcher, cfg: &Config, input: &mut Input) -> anyhow::Result<()> {
    println!("Modus: Multi-Mode Response Engine");
    println!("Provider: {}", dispatcher.provider_name());
    println!("Available modes: {}", ModeSelector::choices().join(", "));

    let mut mode = match select_mode(input).await? {
        ModeAnswer::Chosen(sel) => sel,
        ModeAnswer::Invalid => return Ok(()),
        ModeAnswer::Closed => {
            println!("\nSession closed.");
            return Ok(());
        }
    };

    println!("\nType your prompt and press Enter.");
    println!("Commands: /exit or /quit to stop, /clear to clear screen, /mode to change mode.\n");

    loop {
        let Some(line) = read_line(input, "Enter your prompt: ").await? else {
            println!("\nSession closed.");
            break;
        };

        if line.is_empty() {
            println!("Please enter a prompt.");
            continue;
        }

        match line.to_lowercase().as_str() {
            "/exit" | "/quit" => {
                println!("Goodbye.");
                break;
            }
            "/clear" => {
                print!("\x1b[2J\x1b[H");
                std::io::stdout().flush()?;
                continue;
            }
            "/mode" => {
                match select_mode(input).await? {
                    ModeAnswer::Chosen(sel) => {
                        mode = sel;
                        println!("Mode updated to: {mode}");
                    }
                    ModeAnswer::Invalid => {}
                    ModeAnswer::Closed => {
                        println!("\nSession closed.");
                        break;
                    }
                }
                continue;
            }
            _ => {}
        }

        handle_prompt(dispatcher, cfg, &line, &mode.to_string()).await;
    }

    Ok(())
}

/// Generate and print one answer. Ctrl+C cancels only this request.
pub async fn handle_prompt(dispatcher: &Dispatcher, cfg: &Config, prompt: &str, mode: &str) {
    println!("\nGenerating response... (press Ctrl+C to cancel)");

    let result = tokio::select! {
        r = dispatcher.generate(prompt, mode) => r,
        _ = tokio::signal::ctrl_c() => Err(ModusError::Cancelled),
    };

    match result {
        Ok(g) => {
            println!("\nMode used: {}", g.mode);
            println!("\nResponse:\n");
            println!("{}", g.text);
        }
        Err(e) => println!("\n{}", describe_failure(&e, cfg)),
    }
}

/// Operator-facing sentence for a failed request.
pub fn describe_failure(err: &ModusError, cfg: &Config) -> String {
    let ollama_url = &cfg.provider.ollama.base_url;
    match err {
        ModusError::MissingCredential(_)
        | ModusError::MisconfiguredProvider(_)
        | ModusError::Config(_) => format!("Configuration error: {err}"),
        ModusError::InvalidMode(_) | ModusError::UnsupportedMode(_) => {
            format!("Input error: {err}")
        }
        ModusError::Authentication { provider, message } => {
            if provider == "openai" {
                "Authentication failed: your OPENAI_API_KEY is invalid. \
                 Set a valid key and run again."
                    .to_string()
            } else {
                format!("Authentication failed: {message}")
            }
        }
        ModusError::RateLimited { .. } => {
            "Rate limit reached. Please wait and try again.".to_string()
        }
        ModusError::Connection { provider, .. } if provider == "ollama" => format!(
            "Could not connect to Ollama. Start Ollama app/service and ensure \
             it is reachable at {ollama_url}."
        ),
        ModusError::Connection { .. } => "Network error: could not reach OpenAI after \
             multiple retries. Check VPN/proxy/firewall and try again."
            .to_string(),
        ModusError::Timeout { provider, .. } if provider == "ollama" => {
            "Ollama request timed out. Try again or use a smaller model.".to_string()
        }
        ModusError::Timeout { message, .. } => format!("OpenAI request timed out: {message}"),
        ModusError::Api { provider, .. } if provider == "ollama" => {
            format!("Ollama HTTP error: {err}")
        }
        ModusError::Api { .. } => format!("OpenAI API error: {err}"),
        ModusError::Cancelled => "Request cancelled.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::StreamExt;
    use modus_core::{
        message::{GenerationRequest, Readiness},
        traits::{Provider, TextStream},
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Provider that records the prompts it was asked to answer.
    #[derive(Default)]
    struct RecordingProvider {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-1"
        }

        async fn check_ready(&self) -> Readiness {
            Readiness::ready()
        }

        async fn complete(&self, request: &GenerationRequest) -> Result<String, ModusError> {
            self.prompts
                .lock()
                .unwrap()
                .push((request.mode.to_string(), request.prompt.clone()));
            Ok("ok".to_string())
        }

        async fn complete_stream(
            &self,
            _request: &GenerationRequest,
        ) -> Result<TextStream, ModusError> {
            Ok(futures::stream::empty().boxed())
        }
    }

    /// Run a session over scripted lines; the sender is dropped afterwards,
    /// like stdin reaching end of input.
    async fn run_scripted(lines: &[&str]) -> Arc<RecordingProvider> {
        let provider = Arc::new(RecordingProvider::default());
        let dispatcher = Dispatcher::new(provider.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        for line in lines {
            tx.send(line.to_string()).unwrap();
        }
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(5),
            session(&dispatcher, &Config::default(), &mut rx),
        )
        .await
        .expect("session did not return")
        .unwrap();
        provider
    }

    #[tokio::test]
    async fn test_session_returns_when_input_closes() {
        let provider = run_scripted(&["concise", "hello there"]).await;
        assert_eq!(
            *provider.prompts.lock().unwrap(),
            vec![("concise".to_string(), "hello there".to_string())]
        );
    }

    #[tokio::test]
    async fn test_session_commands() {
        let provider = run_scripted(&[
            "",
            "",
            "write a poem",
            "/mode",
            "technical",
            "anything",
            "/exit",
            "never sent",
        ])
        .await;
        assert_eq!(
            *provider.prompts.lock().unwrap(),
            vec![
                ("creative".to_string(), "write a poem".to_string()),
                ("technical".to_string(), "anything".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_session_ends_on_invalid_first_mode() {
        let provider = run_scripted(&["loud", "hello"]).await;
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    fn err(kind: &str, provider: &str) -> ModusError {
        let provider = provider.to_string();
        let message = "detail".to_string();
        match kind {
            "conn" => ModusError::Connection { provider, message },
            "timeout" => ModusError::Timeout { provider, message },
            "auth" => ModusError::Authentication { provider, message },
            "rate" => ModusError::RateLimited { provider, message },
            _ => ModusError::Api {
                provider,
                status: Some(500),
                message,
            },
        }
    }

    #[test]
    fn test_describe_ollama_failures() {
        let cfg = Config::default();
        assert_eq!(
            describe_failure(&err("conn", "ollama"), &cfg),
            "Could not connect to Ollama. Start Ollama app/service and ensure it is \
             reachable at http://localhost:11434."
        );
        assert!(describe_failure(&err("timeout", "ollama"), &cfg).contains("smaller model"));
        assert!(describe_failure(&err("api", "ollama"), &cfg).starts_with("Ollama HTTP error"));
    }

    #[test]
    fn test_describe_openai_failures() {
        let cfg = Config::default();
        assert!(describe_failure(&err("conn", "openai"), &cfg).starts_with("Network error"));
        assert!(describe_failure(&err("auth", "openai"), &cfg).contains("OPENAI_API_KEY"));
        assert_eq!(
            describe_failure(&err("rate", "openai"), &cfg),
            "Rate limit reached. Please wait and try again."
        );
        assert!(describe_failure(&err("api", "openai"), &cfg).starts_with("OpenAI API error"));
    }

    #[test]
    fn test_describe_local_failures() {
        let cfg = Config::default();
        assert_eq!(
            describe_failure(&ModusError::Cancelled, &cfg),
            "Request cancelled."
        );
        assert!(
            describe_failure(&ModusError::InvalidMode("x".into()), &cfg)
                .starts_with("Input error: Invalid mode: x")
        );
        assert!(
            describe_failure(&ModusError::MissingCredential("no key".into()), &cfg)
                .starts_with("Configuration error")
        );
    }
}
