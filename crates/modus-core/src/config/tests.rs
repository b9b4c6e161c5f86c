use super::*;

#[test]
fn test_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.provider.default, "ollama");
    assert_eq!(cfg.provider.openai.model, "gpt-4o-mini");
    assert_eq!(cfg.provider.openai.timeout_secs, 600);
    assert_eq!(cfg.provider.ollama.base_url, "http://localhost:11434");
    assert_eq!(cfg.provider.ollama.model, "llama3.2");
    assert_eq!(cfg.provider.ollama.timeout_secs, 180);
    assert_eq!(cfg.provider.ollama.probe_timeout_secs, 8);
    assert_eq!(cfg.provider.retry.max_attempts, 3);
    assert_eq!(cfg.web.port, 5000);
    assert!(!cfg.web.auth_enabled);
    assert_eq!(cfg.web.session_ttl_secs, 43_200);
    assert_eq!(cfg.web.max_sessions, 1024);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let toml_str = r#"
        [provider]
        default = "openai"

        [provider.openai]
        api_key = "sk-test"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.provider.kind().unwrap(), ProviderKind::OpenAi);
    assert_eq!(cfg.provider.openai.api_key, "sk-test");
    assert_eq!(cfg.provider.openai.model, "gpt-4o-mini");
    assert_eq!(cfg.provider.ollama.model, "llama3.2");
    assert_eq!(cfg.modus.log_level, "warn");
}

#[test]
fn test_provider_kind_parse() {
    assert_eq!(" OpenAI ".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
    assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
    let err = "anthropic".parse::<ProviderKind>().unwrap_err();
    assert!(matches!(err, ModusError::MisconfiguredProvider(_)));
    assert!(err.to_string().contains("'ollama' or 'openai'"));
}

#[test]
fn test_overrides_are_trimmed() {
    let mut cfg = Config::default();
    cfg.apply(Overrides {
        provider: Some(" OPENAI ".into()),
        openai_api_key: Some("  sk-abc \n".into()),
        openai_model: Some("   ".into()),
        ollama_model: Some(" mistral ".into()),
        ..Default::default()
    });
    assert_eq!(cfg.provider.default, "openai");
    assert_eq!(cfg.provider.openai.api_key, "sk-abc");
    assert_eq!(cfg.provider.openai.model, "gpt-4o-mini");
    assert_eq!(cfg.provider.ollama.model, "mistral");
}

#[test]
fn test_web_auth_flag() {
    for on in ["1", "true", "YES", " on "] {
        assert!(parse_flag(on), "{on} should enable");
    }
    for off in ["0", "false", "", "enabled"] {
        assert!(!parse_flag(off), "{off} should not enable");
    }

    let mut cfg = Config::default();
    cfg.apply(Overrides {
        web_auth_enabled: Some("true".into()),
        web_username: Some("ops".into()),
        ..Default::default()
    });
    assert!(cfg.web.auth_enabled);
    assert_eq!(cfg.web.username, "ops");
    assert_eq!(cfg.web.password, "admin123");
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let cfg = load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.provider.default, "ollama");
}

#[test]
fn test_load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[provider.ollama]\nmodel = \"phi3\"\ntimeout_secs = 30\n",
    )
    .unwrap();
    let cfg = load(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.provider.ollama.model, "phi3");
    assert_eq!(cfg.provider.ollama.timeout(), Duration::from_secs(30));
}

#[test]
fn test_load_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[provider\n").unwrap();
    let err = load(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ModusError::Config(_)));
}
