use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use fitflow::config::{AppConfig, GeneratorBackend};
use fitflow::onboarding::{
    CompletionHandler, FlowController, OnboardingRouteState, onboarding_routes,
};
use fitflow::plans::{HttpPlanGenerator, PlanGenerator, TemplatePlanGenerator};
use fitflow::store::{LibSqlStore, MemoryStore, PersistenceAdapter};

/// Console logging always; a daily rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fitflow.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    guard
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🏋️ fitflow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding/status", config.port);

    // ── Storage ─────────────────────────────────────────────────────────
    let (store, completion): (Arc<dyn PersistenceAdapter>, Arc<dyn CompletionHandler>) =
        match config.db_path {
            Some(ref path) => {
                let db = Arc::new(
                    LibSqlStore::new_local(path, config.user_id.clone())
                        .await
                        .with_context(|| format!("Failed to open database at {}", path.display()))?,
                );
                eprintln!("   Database: {}", path.display());
                let store: Arc<dyn PersistenceAdapter> = db.clone();
                (store, db as Arc<dyn CompletionHandler>)
            }
            None => {
                let memory = Arc::new(MemoryStore::new());
                eprintln!("   Database: in-memory (progress is lost on restart)");
                let store: Arc<dyn PersistenceAdapter> = memory.clone();
                (store, memory as Arc<dyn CompletionHandler>)
            }
        };

    // ── Plan generator ──────────────────────────────────────────────────
    let generator: Arc<dyn PlanGenerator> = match config.generator {
        GeneratorBackend::Http(ref http) => {
            let generator = HttpPlanGenerator::new(http.clone())
                .context("Failed to create HTTP plan generator")?;
            eprintln!("   Plans: {}", generator.endpoint());
            Arc::new(generator)
        }
        GeneratorBackend::Template => {
            eprintln!("   Plans: built-in templates");
            Arc::new(TemplatePlanGenerator::new())
        }
    };

    // ── Flow ────────────────────────────────────────────────────────────
    let controller = Arc::new(
        FlowController::resume(store, generator)
            .await
            .with_autosave(config.autosave.clone()),
    );
    let status = controller.status().await;
    tracing::info!(
        session_id = %status.session_id,
        step = %status.step,
        position = status.position,
        "Onboarding flow ready"
    );

    let app = onboarding_routes(OnboardingRouteState {
        controller: Arc::clone(&controller),
        completion,
    })
    .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "HTTP server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Flush the last pending snapshot
    match Arc::try_unwrap(controller) {
        Ok(controller) => controller.shutdown().await,
        Err(_) => tracing::warn!("Flow still shared at shutdown, pending auto-save skipped"),
    }
    tracing::info!("Shut down");
    Ok(())
}
