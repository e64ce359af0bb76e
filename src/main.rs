use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use clinic_core::config::{
    paused_stale_after_from_env_value, paused_visit_policy_from_env_value,
    specialty_profiles_from_env_value,
};
use clinic_core::{ClinicStore, CoreConfig, DEFAULT_DATA_DIR, InMemoryStore, YamlFileStore};

/// Main entry point for the clinic visit records service
///
/// Resolves configuration from the environment once, opens the record store and serves the
/// REST API.
///
/// # Environment Variables
/// - `CLINIC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINIC_DATA_DIR`: Directory for the YAML record store (default: "clinic_data")
/// - `CLINIC_STORE`: `files` or `memory` (default: "files")
/// - `CLINIC_SPECIALTY_PROFILES`: Comma-separated specialty profiles (default: generic only)
/// - `CLINIC_PAUSED_VISIT_POLICY`: `surface` or `auto-resume` (default: "auto-resume")
/// - `CLINIC_PAUSED_STALE_HOURS`: Hours before a paused visit is flagged stale (default: 24)
/// - `CLINIC_API_KEY`: API key required on every route except `/health` (default: unset)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid, the store cannot be opened, or the
///   server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinic=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLINIC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("CLINIC_DATA_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let cfg = Arc::new(CoreConfig::new(
        data_dir,
        specialty_profiles_from_env_value(std::env::var("CLINIC_SPECIALTY_PROFILES").ok())?,
        paused_visit_policy_from_env_value(std::env::var("CLINIC_PAUSED_VISIT_POLICY").ok())?,
        paused_stale_after_from_env_value(std::env::var("CLINIC_PAUSED_STALE_HOURS").ok())?,
    )?);

    let store_kind = std::env::var("CLINIC_STORE").unwrap_or_else(|_| "files".into());
    let store: Arc<dyn ClinicStore> = match store_kind.trim().to_ascii_lowercase().as_str() {
        "files" => Arc::new(YamlFileStore::open(cfg.data_dir())?),
        "memory" => {
            tracing::warn!("using in-memory store; records are lost on shutdown");
            Arc::new(InMemoryStore::new())
        }
        other => anyhow::bail!("unknown CLINIC_STORE value: {other} (expected 'files' or 'memory')"),
    };

    let api_key = std::env::var("CLINIC_API_KEY")
        .ok()
        .filter(|v| !v.trim().is_empty());
    if api_key.is_none() {
        tracing::warn!("CLINIC_API_KEY is not set; REST API authentication is disabled");
    }

    tracing::info!(
        "++ Starting Clinic REST on {} (profiles: {:?}, paused visit policy: {:?})",
        rest_addr,
        cfg.specialty_profiles(),
        cfg.paused_visit_policy()
    );

    api_rest::serve(&rest_addr, AppState::new(cfg, store, api_key)).await
}
