use anyhow::{Context, Result};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::graphql::{self, NodewatchSchema};
use crate::api::rest::{self, AppState};
use crate::config::Config;
use crate::monitor::{PollingMonitor, ReportReceiver};
use crate::source::HttpNodeSource;

pub async fn run(config: Config) -> Result<()> {
    // Init tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.daemon.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "nodewatch daemon starting");

    let source = HttpNodeSource::new(&config.source).context("configuring node source")?;
    info!(url = %source.nodes_url(), "polling cluster node info");

    let mut monitor =
        PollingMonitor::new(&config.monitor, source).context("configuring version monitor")?;

    let app_state = AppState {
        reports: monitor.subscribe(),
        started_at: Utc::now(),
        application_version: config.monitor.application_version.trim().to_string(),
        source_url: config.source.url.clone(),
    };

    // Build GraphQL schema
    let schema = graphql::build_schema(app_state.clone());

    // Build GraphQL sub-router with its own state
    let graphql_router = Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .with_state(schema);

    // Build Axum router: REST (with AppState) + GraphQL (with schema state)
    let app = rest::router(app_state)
        .merge(graphql_router)
        .layer(TraceLayer::new_for_http());

    // Bind HTTP listener
    let http_addr = &config.daemon.http_addr;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding to {}", http_addr))?;

    info!(addr = %http_addr, "HTTP server listening");

    // Track verdict transitions for operators tailing the daemon log
    let transitions = tokio::spawn(log_transitions(monitor.subscribe()));

    monitor.start()?;

    // Run HTTP server with graceful shutdown
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error");

    monitor.stop().await;
    if let Some(report) = monitor.latest() {
        info!(is_compatible = report.is_compatible, "last delivered verdict");
    }
    if let Err(e) = transitions.await {
        warn!(error = %e, "transition logger ended abnormally");
    }

    served?;
    info!("nodewatch daemon stopped");
    Ok(())
}

/// Log each delivered verdict relative to the previous one until the monitor stops.
async fn log_transitions(mut reports: ReportReceiver) {
    let mut previous: Option<bool> = None;
    while reports.changed().await.is_ok() {
        let Some(report) = reports.borrow_and_update().clone() else {
            continue;
        };
        match (previous, report.is_compatible) {
            (Some(false), true) => info!("cluster became compatible"),
            (Some(true), false) => warn!(
                incompatible_nodes = report.incompatible_nodes.len(),
                no_data = report.is_no_data(),
                "cluster became incompatible"
            ),
            _ => {}
        }
        previous = Some(report.is_compatible);
    }
}

async fn graphql_playground() -> Html<String> {
    Html(
        async_graphql::http::playground_source(
            async_graphql::http::GraphQLPlaygroundConfig::new("/graphql"),
        ),
    )
}

async fn graphql_handler(
    State(schema): State<NodewatchSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down"); },
        _ = terminate => { info!("Received SIGTERM, shutting down"); },
    }
}
