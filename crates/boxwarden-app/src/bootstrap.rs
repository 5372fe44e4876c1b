//! Ordered startup and shutdown sequence for the transfer-orchestration
//! pipeline (§4.H): configuration, telemetry, repository, backend client,
//! downloader, ingress server, then the main loop; shutdown runs the same
//! components down in roughly reverse order, bounded by `shutdown_timeout`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use boxwarden_api::{BasicAuthCredentials, IngressServer, IngressState};
use boxwarden_backend::{DelugeBackend, DiscoverBackend, Instrumented, MutationBackend, PutioBackend};
use boxwarden_config::{BackendConfig, Config};
use boxwarden_data::{InstanceId, PoolConfig, Repository};
use boxwarden_events::{EventBus, work_queue};
use boxwarden_media_probe::{MediaManagerProbe, ProbeSet};
use boxwarden_pipeline::{Downloader, NotificationSink, Orchestrator, TransferCatalog};
use boxwarden_telemetry::{GlobalContextGuard, LoggingConfig, Metrics, init_logging};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Sized to the expected enumeration size of a single `get_tagged_transfers`
/// call so the orchestrator never blocks mid-tick (§4.D "Queue semantics").
const WORK_QUEUE_CAPACITY: usize = 64;

/// Entry point for the application boot sequence.
///
/// # Errors
///
/// Returns an error if any startup step fails. §6's exit-code contract maps
/// every variant to a non-zero process exit at the binary boundary.
pub async fn run_app() -> AppResult<()> {
    let config = boxwarden_config::load(cli_config_path().as_deref())
        .map_err(|err| AppError::config("config.load", err))?;

    let logging = LoggingConfig::default();
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init_logging", err))?;
    let _context = GlobalContextGuard::new("active");
    info!("configuration loaded");

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    info!("telemetry ready");

    run_with(config, metrics).await
}

/// Boot sequence given an already-resolved configuration and metrics
/// registry, separated from [`run_app`] so the remainder of the sequence can
/// be exercised without re-parsing the environment.
pub(crate) async fn run_with(config: Config, metrics: Metrics) -> AppResult<()> {
    let shutdown = CancellationToken::new();

    // 3. Repository (validated connection).
    let pool_config = PoolConfig {
        db_path: config.database.path.to_string_lossy().into_owned(),
        max_open_conns: config.database.max_open_conns,
        max_idle_conns: config.database.max_idle_conns,
    };
    let repository = Arc::new(
        Repository::connect(&pool_config, InstanceId::generate(), metrics.clone())
            .await
            .map_err(|err| AppError::repository("repository.connect", err))?,
    );
    info!("repository ready");

    // 4. Backend client (authenticated).
    let (discover, mutation) = build_backend(&config.backend, &metrics)?;
    discover
        .authenticate()
        .await
        .map_err(|err| AppError::backend("backend.authenticate", err))?;
    info!(backend = config.backend.kind(), "backend client ready");

    let events = EventBus::new();
    let catalog = Arc::new(TransferCatalog::new());
    let (work_tx, work_rx) = work_queue(WORK_QUEUE_CAPACITY);

    let probe_http = reqwest::Client::new();
    let probes = config
        .media_managers
        .iter()
        .cloned()
        .map(|manager_config| MediaManagerProbe::new(probe_http.clone(), manager_config))
        .collect();
    let probes = Arc::new(ProbeSet::new(probes));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&repository),
        Arc::clone(&discover),
        work_tx,
        config.target_label.clone(),
        config.polling_interval,
        metrics.clone(),
    ));

    // 5. Downloader.
    let downloader = Arc::new(Downloader::new(
        Arc::clone(&repository),
        Arc::clone(&discover),
        mutation.clone(),
        probes,
        events.clone(),
        Arc::clone(&catalog),
        config.download_dir.clone(),
        config.max_parallel,
        config.polling_interval,
        metrics.clone(),
    ));
    info!("downloader ready");

    let notifier = Arc::new(NotificationSink::new(
        Arc::clone(&repository),
        Arc::clone(&downloader),
        Arc::clone(&catalog),
        events.clone(),
        reqwest::Client::new(),
        config.webhook_url.clone(),
    ));

    let orchestrator_task = tokio::spawn(Arc::clone(&orchestrator).run(shutdown.clone()));
    let downloader_task = tokio::spawn(Arc::clone(&downloader).run(work_rx, shutdown.clone()));
    let notifier_task = tokio::spawn(Arc::clone(&notifier).run(shutdown.clone()));

    // 6. Ingress server — only mounted when the backend supports mutation
    // (§4.F "available only when... supports mutation").
    let ingress_task = match mutation.clone() {
        Some(mutation_backend) => {
            let auth = BasicAuthCredentials::new(config.ingress.username.clone(), config.ingress.password.clone());
            let state = IngressState::new(
                Arc::clone(&discover),
                mutation_backend,
                config.target_label.clone(),
                config.download_dir.to_string_lossy().into_owned(),
                metrics.clone(),
                auth,
            );
            let server = IngressServer::new(state, config.ingress.request_timeout);
            let bind_addr = config.ingress.bind_addr;
            let ingress_shutdown = shutdown.clone();
            info!(addr = %bind_addr, "Transmission-RPC ingress ready");
            Some(tokio::spawn(async move { server.serve(bind_addr, ingress_shutdown).await }))
        }
        None => {
            info!("configured backend does not support mutation; Transmission-RPC ingress disabled");
            None
        }
    };

    // Metrics scrape endpoint (ambient, §4.J): absent bind address disables
    // the endpoint but not in-process counter collection.
    let metrics_task = match config.metrics_bind_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|err| AppError::metrics("metrics.bind", err))?;
            let metrics_shutdown = shutdown.clone();
            let router = metrics_router(metrics.clone());
            info!(%addr, "metrics scrape endpoint ready");
            Some(tokio::spawn(async move {
                axum::serve(listener, router.into_make_service())
                    .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
                    .await
            }))
        }
        None => {
            info!("no metrics bind address configured; scrape endpoint not bound");
            None
        }
    };

    // 7. Main loop.
    info!("boot sequence complete");
    wait_for_shutdown_signal().await;
    shutdown.cancel();
    info!("shutdown signal received; draining components");

    let shutdown_outcome = tokio::time::timeout(config.shutdown_timeout, async {
        if let Some(task) = ingress_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "ingress server exited with an error"),
                Err(err) => warn!(error = %err, "ingress task join failed"),
            }
        }
        if let Some(task) = metrics_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(error = %err, "metrics server exited with an error"),
                Err(err) => warn!(error = %err, "metrics task join failed"),
            }
        }
        if let Err(err) = downloader_task.await {
            warn!(error = %err, "downloader task join failed");
        }
        if let Err(err) = orchestrator_task.await {
            warn!(error = %err, "orchestrator task join failed");
        }
        if let Err(err) = notifier_task.await {
            warn!(error = %err, "notification sink task join failed");
        }
    })
    .await;

    if shutdown_outcome.is_err() {
        warn!(timeout = ?config.shutdown_timeout, "graceful shutdown exceeded the configured timeout");
    }

    drop(notifier);
    drop(downloader);
    drop(orchestrator);
    drop(discover);
    drop(mutation);

    match Arc::try_unwrap(repository) {
        Ok(repo) => repo.close().await,
        Err(_) => warn!("repository still had outstanding references; skipped explicit close"),
    }

    info!("graceful shutdown complete");
    Ok(())
}

/// Construct the concrete backend behind its trait objects, wrapped in the
/// tracing/metrics instrumentation decorator (§4.B). Deluge is discovery-only;
/// Put.io implements both capabilities.
fn build_backend(
    backend_config: &BackendConfig,
    metrics: &Metrics,
) -> AppResult<(Arc<dyn DiscoverBackend>, Option<Arc<dyn MutationBackend>>)> {
    match backend_config {
        BackendConfig::Deluge(deluge_config) => {
            let backend = DelugeBackend::new(deluge_config.clone())
                .map_err(|err| AppError::backend("deluge.new", err))?;
            let instrumented = Arc::new(Instrumented::new(backend, "deluge", metrics.clone()));
            let discover: Arc<dyn DiscoverBackend> = instrumented;
            Ok((discover, None))
        }
        BackendConfig::Putio(putio_config) => {
            let backend = PutioBackend::new(putio_config.clone())
                .map_err(|err| AppError::backend("putio.new", err))?;
            let instrumented = Arc::new(Instrumented::new(backend, "putio", metrics.clone()));
            let mutation: Arc<dyn MutationBackend> = instrumented.clone();
            let discover: Arc<dyn DiscoverBackend> = instrumented;
            Ok((discover, Some(mutation)))
        }
    }
}

fn metrics_router(metrics: Metrics) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let metrics = metrics.clone();
            async move { render_metrics(&metrics) }
        }),
    )
}

fn render_metrics(metrics: &Metrics) -> impl IntoResponse {
    match metrics.render() {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => {
            tracing::error!(error = %err, "failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}

/// Parse a `--config <path>` (or `--config=<path>`) argument from the process
/// argument list, if present; `boxwarden_config::load` falls back to
/// `BOXWARDEN_CONFIG` when this returns `None`.
fn cli_config_path() -> Option<PathBuf> {
    parse_config_arg(std::env::args().skip(1))
}

fn parse_config_arg(args: impl Iterator<Item = String>) -> Option<PathBuf> {
    let mut args = args;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Wait for either Ctrl-C or (on Unix) `SIGTERM`, matching the scenario in
/// §8 ("SIGTERM during active download").
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(error = %err, "failed to install SIGTERM handler; Ctrl-C still works");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_config_path_parses_space_and_equals_forms() {
        let args = ["--config", "/etc/boxwarden.toml"].map(String::from);
        assert_eq!(
            parse_config_arg(args.into_iter()),
            Some(PathBuf::from("/etc/boxwarden.toml"))
        );

        let args = ["--config=/etc/boxwarden.toml"].map(String::from);
        assert_eq!(
            parse_config_arg(args.into_iter()),
            Some(PathBuf::from("/etc/boxwarden.toml"))
        );

        assert_eq!(parse_config_arg(std::iter::empty()), None);
    }
}
