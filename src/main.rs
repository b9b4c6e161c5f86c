mod api;
mod pages;
mod repl;

use clap::{Parser, Subcommand};
use modus_core::config::{self, Overrides};
use modus_providers::Dispatcher;

#[derive(Parser)]
#[command(
    name = "modus",
    version,
    about = "Modus: mode-aware prompts for cloud or local models"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Backend to use: "openai" or "ollama".
    #[arg(long, env = "AI_PROVIDER", global = true)]
    provider: Option<String>,

    /// OpenAI API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    openai_api_key: Option<String>,

    /// OpenAI model name.
    #[arg(long, env = "OPENAI_MODEL", global = true)]
    openai_model: Option<String>,

    /// Base URL of the local Ollama server.
    #[arg(long, env = "OLLAMA_BASE_URL", global = true)]
    ollama_base_url: Option<String>,

    /// Ollama model name.
    #[arg(long, env = "OLLAMA_MODEL", global = true)]
    ollama_model: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive prompt session (default).
    Chat,
    /// Send a one-shot prompt.
    Ask {
        /// Response mode: auto, concise, detailed, creative, technical.
        #[arg(short, long, default_value = "auto")]
        mode: String,
        /// The prompt to send.
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Check that the configured backend is ready.
    Status,
    /// Serve the web interface.
    Serve {
        /// Require a login before chatting (1/true/yes/on).
        #[arg(long, env = "WEB_AUTH_ENABLED")]
        auth_enabled: Option<String>,
        #[arg(long, env = "WEB_USERNAME")]
        username: Option<String>,
        #[arg(long, env = "WEB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Listen address (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides config).
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(&cli.config)?;
    let mut overrides = Overrides {
        provider: cli.provider,
        openai_api_key: cli.openai_api_key,
        openai_model: cli.openai_model,
        ollama_base_url: cli.ollama_base_url,
        ollama_model: cli.ollama_model,
        ..Default::default()
    };
    if let Some(Commands::Serve {
        auth_enabled,
        username,
        password,
        host,
        port,
    }) = &cli.command
    {
        overrides.web_auth_enabled = auth_enabled.clone();
        overrides.web_username = username.clone();
        overrides.web_password = password.clone();
        if let Some(h) = host {
            cfg.web.host = h.clone();
        }
        if let Some(p) = port {
            cfg.web.port = *p;
        }
    }
    cfg.apply(overrides);

    // Logs go to stderr so they never interleave with answers on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.modus.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let Some(dispatcher) = ready_dispatcher(&cfg).await else {
                return Ok(());
            };
            repl::run(&dispatcher, &cfg).await?;
        }
        Commands::Ask { mode, prompt } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("no prompt provided. Usage: modus ask [--mode MODE] <prompt>");
            }
            let Some(dispatcher) = ready_dispatcher(&cfg).await else {
                return Ok(());
            };
            repl::handle_prompt(&dispatcher, &cfg, prompt.trim(), &mode).await;
        }
        Commands::Status => {
            println!("Modus status check\n");
            println!("Config: {}", cli.config);
            println!("Provider: {}", cfg.provider.default);
            let ready = modus_providers::check_ready(&cfg.provider).await;
            if ready.ok {
                println!("  backend: ready");
            } else {
                println!("  backend: not ready: {}", ready.message);
            }
        }
        Commands::Serve { .. } => {
            let dispatcher = Dispatcher::from_config(&cfg.provider)?;
            api::serve(dispatcher, cfg.web.clone()).await?;
        }
    }

    Ok(())
}

/// Build the dispatcher and run the readiness check, printing why it failed.
async fn ready_dispatcher(cfg: &config::Config) -> Option<Dispatcher> {
    let dispatcher = match Dispatcher::from_config(&cfg.provider) {
        Ok(d) => d,
        Err(e) => {
            println!("Startup check failed: {e}");
            return None;
        }
    };
    let ready = dispatcher.check_ready().await;
    if !ready.ok {
        println!("Startup check failed: {}", ready.message);
        return None;
    }
    Some(dispatcher)
}
