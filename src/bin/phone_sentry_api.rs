//! Phone Sentry API Server
//!
//! Usage:
//!   cargo run --bin phone_sentry_api
//!
//! Environment:
//!   PORT / SENTRY_PORT - Server port (default: 3000)
//!   SENTRY_HOST        - Server host (default: 0.0.0.0)
//!   RUST_LOG           - Log filter (default: info)
//!
//! See `models::config` for the full list of tunables.

use phone_sentry::api::{create_router, AppState};
use phone_sentry::AppConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = AppConfig::from_env()?;
    let addr: SocketAddr = config.bind_addr().parse()?;
    let stats_dir = config.stats_dir.clone();

    let state = Arc::new(AppState::new(config)?);
    let telemetry = state.telemetry.clone();

    state.spawn_cache_cleanup();
    info!("🧹 Background cache cleanup task started");

    let app = create_router(state.clone());

    info!("🚀 Phone Sentry API starting on http://{}", addr);
    info!("📖 Health: http://{}/v1/health", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST /v1/investigations         - Start a background investigation");
    info!("  GET  /v1/investigations/status  - Poll an investigation");
    info!("  GET  /v1/investigations         - List recorded investigations");
    info!("  GET  /v1/modules                - List modules");
    info!("  POST /v1/modules/:name          - Run one module");
    info!("  POST /v1/investigate            - Run modules synchronously");
    info!("  GET  /v1/stats                  - Telemetry and cache statistics");
    info!("  GET  /v1/cache/keys             - Inspect cache keys");
    info!("");
    info!("Modules: {}", state.orchestrator.manager().module_names().join(", "));
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("");
    info!("🛑 Shutdown signal received, cleaning up...");

    info!("📊 Exporting final telemetry...");
    info!("   {}", telemetry.get_stats(None).summary());

    match telemetry.export_stats_json(&stats_dir) {
        Ok(path) => info!("   ✅ Stats exported to: {}", path.display()),
        Err(e) => warn!("   ⚠️ Failed to export stats: {}", e),
    }

    info!("👋 Phone Sentry API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║              P H O N E   S E N T R Y                         ║
    ║                                                              ║
    ║                 A P I   v{:<8}                            ║
    ║         Phone Number Investigation Engine                    ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
