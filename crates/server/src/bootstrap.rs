use std::fs;
use std::io;
use std::sync::Arc;

use shiptrack_agent::{AgentRuntime, LlmError, OllamaClient, SummaryError};
use shiptrack_core::config::{AppConfig, ConfigError};
use shiptrack_store::{
    default_shipments, load_seed_file, CsvRatingLog, InMemoryShipmentRepository, SeedError,
    ShipmentRepository,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub shipments: Arc<dyn ShipmentRepository>,
    pub ratings: Arc<CsvRatingLog>,
    pub agent_runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("shipment seed failed: {0}")]
    Seed(#[from] SeedError),
    #[error("could not prepare rating log directory: {0}")]
    RatingLogDir(#[source] io::Error),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("action runtime setup failed: {0}")]
    Runtime(#[from] SummaryError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let records = match &config.store.seed_path {
        Some(path) => load_seed_file(path)?,
        None => default_shipments(),
    };
    info!(
        event_name = "system.bootstrap.store_seeded",
        correlation_id = "bootstrap",
        shipments = records.len(),
        seed_source = config
            .store
            .seed_path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        "shipment store seeded"
    );
    let shipments: Arc<dyn ShipmentRepository> = Arc::new(InMemoryShipmentRepository::seeded(records));

    if let Some(parent) = config.ratings.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(BootstrapError::RatingLogDir)?;
    }
    let ratings = Arc::new(CsvRatingLog::new(&config.ratings.path));

    let llm = Arc::new(OllamaClient::from_config(&config.llm)?);
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        base_url = %llm.base_url(),
        model = %config.llm.model,
        timeout_secs = config.llm.timeout_secs,
        max_retries = config.llm.max_retries,
        "summarization endpoint configured"
    );

    let agent_runtime =
        Arc::new(AgentRuntime::shipment_assistant(shipments.clone(), ratings.clone(), llm)?);

    Ok(Application { config, shipments, ratings, agent_runtime })
}
