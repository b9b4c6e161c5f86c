use super::*;
use async_trait::async_trait;
use std::sync::Mutex;

/// Provider that records requests and replays scripted answers.
struct MockProvider {
    requests: Mutex<Vec<GenerationRequest>>,
    answer: Result<String, fn() -> ModusError>,
    fragments: Vec<&'static str>,
}

impl MockProvider {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            answer: Ok(text.to_string()),
            fragments: vec!["Hel", "lo"],
        })
    }

    fn failing(err: fn() -> ModusError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            answer: Err(err),
            fragments: Vec::new(),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-1"
    }

    async fn check_ready(&self) -> Readiness {
        Readiness::ready()
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, ModusError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(make) => Err(make()),
        }
    }

    async fn complete_stream(&self, request: &GenerationRequest) -> Result<TextStream, ModusError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Err(make) = &self.answer {
            return Err(make());
        }
        let items: Vec<Result<String, ModusError>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        Ok(futures::stream::iter(items).boxed())
    }
}

fn refused() -> ModusError {
    ModusError::Connection {
        provider: "mock".into(),
        message: "connection refused".into(),
    }
}

#[tokio::test]
async fn test_invalid_mode_never_reaches_provider() {
    let mock = MockProvider::answering("unused");
    let d = Dispatcher::new(mock.clone());

    let err = d.generate("hello", "invalid_token").await.unwrap_err();
    assert!(matches!(err, ModusError::InvalidMode(ref t) if t == "invalid_token"));
    assert!(d.generate_stream("hello", "loud").is_err());
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_fixed_mode_derives_parameters() {
    let mock = MockProvider::answering("Once upon a time");
    let d = Dispatcher::new(mock.clone());

    let g = d.generate("anything", "creative").await.unwrap();
    assert_eq!(g.mode, Mode::Creative);
    assert_eq!(g.text, "Once upon a time");
    assert_eq!(g.metadata.provider_used, "mock");
    assert_eq!(g.metadata.model.as_deref(), Some("mock-1"));

    let req = mock.last();
    assert_eq!(req.system, Mode::Creative.instruction());
    assert_eq!(req.temperature, 0.7);
    assert_eq!(req.max_tokens, 512);
    assert_eq!(req.prompt, "anything");
}

#[tokio::test]
async fn test_auto_uses_classifier_with_detailed_fallback() {
    let mock = MockProvider::answering("ok");
    let d = Dispatcher::new(mock.clone());

    let g = d.generate("fix the bug in my code", "auto").await.unwrap();
    assert_eq!(g.mode, Mode::Technical);
    assert_eq!(mock.last().max_tokens, 400);

    let g = d.generate("good morning", "").await.unwrap();
    assert_eq!(g.mode, Mode::Detailed);
}

#[tokio::test]
async fn test_auto_tie_is_stable() {
    let mock = MockProvider::answering("ok");
    let d = Dispatcher::new(mock);
    let input = "explain the architecture of this database in detail";

    for _ in 0..5 {
        let g = d.generate(input, "auto").await.unwrap();
        assert_eq!(g.mode, Mode::Detailed);
    }
}

#[tokio::test]
async fn test_provider_error_propagates() {
    let mock = MockProvider::failing(|| ModusError::Authentication {
        provider: "mock".into(),
        message: "bad key".into(),
    });
    let d = Dispatcher::new(mock.clone());

    let err = d.generate("hi", "concise").await.unwrap_err();
    assert!(matches!(err, ModusError::Authentication { .. }));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_stream_mode_known_before_polling() {
    let mock = MockProvider::answering("unused");
    let d = Dispatcher::new(mock.clone());

    let sg = d.generate_stream("write a poem", "auto").unwrap();
    assert_eq!(sg.mode, Mode::Creative);
    assert_eq!(mock.calls(), 0, "stream must be lazy");

    let text: Vec<String> = sg.into_text().collect().await;
    assert_eq!(text.concat(), "Hello");
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_stream_open_failure_becomes_marker() {
    let mock = MockProvider::failing(refused);
    let d = Dispatcher::new(mock);

    let sg = d.generate_stream("hi", "concise").unwrap();
    let text: Vec<String> = sg.into_text().collect().await;
    assert_eq!(
        text,
        vec!["\n[Error] mock connection failed: connection refused".to_string()]
    );
}

#[tokio::test]
async fn test_check_ready_fails_closed_on_unknown_provider() {
    let cfg = ProviderConfig {
        default: "bedrock".into(),
        ..Default::default()
    };
    let ready = check_ready(&cfg).await;
    assert!(!ready.ok);
    assert!(ready.message.contains("Invalid AI_PROVIDER"));
    assert!(matches!(
        Dispatcher::from_config(&cfg),
        Err(ModusError::MisconfiguredProvider(_))
    ));
}

#[test]
fn test_build_provider_by_kind() {
    let mut cfg = ProviderConfig::default();
    assert_eq!(build_provider(&cfg).unwrap().name(), "ollama");
    cfg.default = "openai".into();
    assert_eq!(build_provider(&cfg).unwrap().name(), "openai");
}
