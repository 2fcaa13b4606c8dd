use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atcsim::config::{Config, LogFormat, ReportFormat};
use atcsim::services::notification::TracingSink;
use atcsim::services::report::Report;
use atcsim::services::traffic::TrafficControl;
use atcsim::Airport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        runways = config.runways,
        gates = config.gates,
        tower_slots = config.tower_slots,
        window_secs = config.simulation_window.as_secs(),
        "air traffic simulation starting, priority order: critical > international > domestic"
    );

    let report_format = config.report_format;
    let airport = Arc::new(Airport::new(config, Arc::new(TracingSink))?);
    let mut traffic = TrafficControl::new(airport.clone());

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    traffic.run_arrivals(&shutdown).await;
    tracing::info!(in_flight = traffic.in_flight(), "waiting for remaining flights to finish");
    let flights = traffic.await_all_flights().await?;
    let stats = traffic.read_statistics()?;

    let report = Report::new(stats, airport.snapshots(), &flights);
    let leaked = report.leaked();
    if !leaked.is_empty() {
        tracing::error!(?leaked, "resource pools did not return to capacity");
    }
    match report_format {
        ReportFormat::Text => println!("{report}"),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Stops new arrivals on Ctrl-C or SIGTERM. Flights already airborne drain normally.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, closing arrivals");
    token.cancel();
}
