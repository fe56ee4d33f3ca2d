//! Phone Sentry CLI
//!
//! Runs every investigation module against one number and prints the bundle.
//!
//! Usage:
//!   phone_sentry <phone_number> [--json]

use phone_sentry::{AppConfig, ModuleManager, PhoneNumber, TelemetryCollector};

use eyre::{eyre, Result};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut args = std::env::args().skip(1);
    let raw = args
        .next()
        .ok_or_else(|| eyre!("usage: phone_sentry <phone_number> [--json]"))?;
    let json_only = args.any(|a| a == "--json");

    let phone = PhoneNumber::new(&raw)?;
    let config = AppConfig::from_env()?;
    let telemetry = Arc::new(TelemetryCollector::new());
    let manager = ModuleManager::from_config(&config, telemetry.clone())?;

    let bundle = manager.execute_all(&phone).await;

    if json_only {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
        return Ok(());
    }

    println!("📞 {}", bundle.summary());
    println!();
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    println!();
    println!("📊 {}", telemetry.get_stats(None).summary());

    Ok(())
}
