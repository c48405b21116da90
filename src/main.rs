mod args;
mod config;
mod writer;

use args::Command;
use cwl::store::CsvStore;
use cwl::Result;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;

fn main() -> Result<ExitCode> {
    let args = args::parse_input_args();

    config::configure_app()?;

    log::debug!("Application configured with {args:?}");

    match args.command {
        Command::Serve { bind, data_dir } => serve(bind, data_dir),
        Command::Reconcile { data_dir } => reconcile_to_std_out(&data_dir),
    }
}

/// Serves the wallet API until interrupted
fn serve(bind: String, data_dir: Option<PathBuf>) -> Result<ExitCode> {
    let service = cwl::build_wallet_service(data_dir.as_deref())?;
    let app = cwl::http::router(service);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind to {bind}"))?;

        log::info!("Listening on http://{bind}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server error")?;

        log::info!("Server stopped");

        Ok::<_, anyhow::Error>(ExitCode::SUCCESS)
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

/// Compare stored balances against the transaction log, and write mismatches to stdout
fn reconcile_to_std_out(data_dir: &Path) -> Result<ExitCode> {
    let (wallets, transactions) = CsvStore::read_snapshot(data_dir)?;

    log::debug!(
        "Reconciling {} wallets against {} transactions",
        wallets.len(),
        transactions.len()
    );

    let mismatches = cwl::reconcile::reconcile(&wallets, &transactions);

    let report = writer::render_report(&mismatches)?;
    print!("{report}");

    if mismatches.is_empty() {
        log::info!("All {} wallets match the transaction log", wallets.len());
        return Ok(ExitCode::SUCCESS);
    }

    log::warn!("{} wallets diverge from the transaction log", mismatches.len());

    Ok(ExitCode::FAILURE)
}
