use anyhow::{Context, Result};
use std::sync::Arc;

use seer_tarot::TarotService;
use seer_tarot::config::Config;
use seer_tarot::logging;
use seer_tarot::server::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // A broken config file stops startup; the error is printed by anyhow.
    let config = Config::load().context("Failed to load configuration")?;
    logging::init_logger(&config.logging);

    // Missing credentials stop the process here, before anything is bound.
    config.validate().context("Invalid configuration")?;
    let config = Arc::new(config);

    let service = Arc::new(
        TarotService::new(&config).context("Failed to initialise the OpenAI client")?,
    );
    tracing::info!(
        model = %config.openai.model,
        origins = ?config.server.allowed_origins,
        "main: Service created"
    );

    server::serve(AppState::new(config, service)).await?;
    Ok(())
}
