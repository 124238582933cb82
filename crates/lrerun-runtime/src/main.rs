//! lrerun: run a load test on a remote execution service from CI.
//! Starts the run, monitors it until its post-run processing is done and
//! aborts it when the error budget is exhausted.
//!
//! Exit codes: 0 completed, 1 setup error, 2 threshold abort, 3 run failure
//! state, 4 monitoring timeout, 130 cancelled (before or after the run
//! started).

use clap::Parser;
use lrerun_gateway::RestGateway;
use tokio_util::sync::CancellationToken;

mod cli;
mod guard;
mod launcher;
mod monitor;
mod orchestrator;
mod resolver;
mod session;
mod status_line;
#[cfg(test)]
mod test_support;
mod timeslot;

use orchestrator::{RunOrchestrator, RunReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("LRERUN_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "lrerun starting");

    let request = args.run_request()?;
    let gateway = RestGateway::new(&args.rest_config())?;
    let credentials = args.credentials();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let result = RunOrchestrator::new(&gateway, &credentials, cancel)
        .execute(&request)
        .await;

    let exit_code = match result {
        Ok(report) => {
            print_report(&report, args.json)?;
            report.outcome.exit_code()
        }
        Err(e) => {
            tracing::error!(error = %e, "run setup failed");
            e.exit_code()
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// Ctrl-C (and SIGTERM on unix) stop monitoring; the run itself is left alone.
async fn cancel_on_shutdown(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("received ctrl-c, stopping"),
                    _ = term.recv() => tracing::info!("received SIGTERM, stopping"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("received ctrl-c, stopping");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, stopping");
        }
    }
    cancel.cancel();
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("run {}: {:?} (state: {})", report.run_id, report.outcome, report.final_state);
    println!(
        "errors: {}  failed transactions: {}",
        report.total_errors, report.total_failed_transactions
    );
    if let Some(reason) = &report.failure_reason {
        println!("reason: {reason}");
    }
    println!("dashboard: {}", report.dashboard_url);
    Ok(())
}
