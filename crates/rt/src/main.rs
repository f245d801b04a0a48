//! rt: vRouter route table utility
//!
//! Adds and deletes routes in the vrouter forwarding tables and dumps a
//! table to stdout. Logs go to stderr, filtered by `RUST_LOG`.

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufWriter};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vrouter_rt::cli::Cli;
use vrouter_rt::{
    NetlinkTransport, Operation, RequestBuilder, RouteClient, RtConfig, RtError, TablePrinter,
};

/// Exit status of a dump stopped by SIGINT.
const EXIT_CANCELLED: u8 = 130;

enum Outcome {
    Done,
    Cancelled,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("rt: {e:#}");
        return ExitCode::FAILURE;
    }

    let cancel = setup_signal_handlers();
    let outcome = tokio::task::spawn_blocking(move || run(cli, cancel)).await;

    match outcome {
        Ok(Ok(Outcome::Done)) => ExitCode::SUCCESS,
        Ok(Ok(Outcome::Cancelled)) => ExitCode::from(EXIT_CANCELLED),
        Ok(Err(e)) => {
            debug!(error = ?e, "rt failed");
            eprintln!("rt: {e}");
            ExitCode::from(e.exit_code())
        }
        Err(e) => {
            error!(error = %e, "worker task failed");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr; stdout carries only the table
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set logger")?;
    Ok(())
}

fn run(cli: Cli, cancel: Arc<AtomicBool>) -> Result<Outcome, RtError> {
    let config = RtConfig::load_or_default(&cli.config)?;
    let operation = cli.operation();
    let family = cli.family_or(config.defaults.family);
    let params = cli.params();

    // Fail on bad parameters before touching the socket.
    RequestBuilder::new().build(operation, family, &params)?;

    let transport = NetlinkTransport::connect(&config.transport)?;
    let mut client = RouteClient::new(transport).with_cancel_flag(cancel);

    if operation != Operation::Dump {
        client.execute(operation, family, &params)?;
        return Ok(Outcome::Done);
    }

    let vrf_id = params.vrf_id.unwrap_or_default();
    let mut printer = TablePrinter::new(BufWriter::new(io::stdout().lock()), family, vrf_id);
    printer.header()?;

    let summary = client
        .dump(family, vrf_id, params.marker)?
        .run(|record| printer.row(&record).map_err(RtError::from))?;
    printer.flush()?;

    info!(
        records = summary.records,
        rounds = summary.rounds,
        "Dump complete"
    );

    if summary.cancelled {
        match summary.last_key {
            Some(key) => warn!(resume_after = %key, "Dump interrupted"),
            None => warn!("Dump interrupted before the first record"),
        }
        return Ok(Outcome::Cancelled);
    }
    Ok(Outcome::Done)
}

/// Setup signal handlers for graceful cancellation
fn setup_signal_handlers() -> Arc<AtomicBool> {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let cancel_flag_clone = cancel_flag.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT, stopping after the current round");
            cancel_flag_clone.store(true, Ordering::SeqCst);
        }
    });

    cancel_flag
}
