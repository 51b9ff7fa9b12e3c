use anyhow::{Context, Result};
use docent::{Config, HttpBackend, SessionController, repl};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

/// Defaults used when neither `.env` nor the environment sets a key.
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn run(config: Config, resume: Option<String>) -> Result<()> {
    let backend = HttpBackend::new(&config.api_url, config.timeout)
        .with_context(|| format!("configuring client for {}", config.api_url))?;
    let controller = SessionController::new(Arc::new(backend));

    match resume {
        Some(session_id) => controller
            .resume(&session_id)
            .await
            .with_context(|| format!("resuming session {session_id}"))?,
        None => {
            controller
                .start()
                .await
                .with_context(|| format!("starting a session at {}", config.api_url))?;
        }
    }

    repl::run(&controller, &config).await
}

fn main() -> Result<()> {
    // A local .env file wins over the bundled defaults
    let _ = dotenvy::dotenv();
    let config = Config::from_env_with_defaults(BUNDLED_CONFIG)?;
    init_logging(&config.log_level);

    let resume = std::env::args().nth(1);

    // One logical actor: a current-thread runtime is all the client needs.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(config, resume))
}
