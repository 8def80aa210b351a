//!
//! src/main.rs  Oct 18th, 2026
//!
//! Entry point of the scout: loads config, wires the clients to the
//! batch scanner and runs one scan over [START_ID, END_ID)
//!
//!

mod config;
mod errors;
mod logging;

mod artists;
mod fetch;
mod notify;
mod scanner;
mod sink;
mod tags;
mod types;

use std::process::ExitCode;

use tracing::{Instrument, error, info, warn};

use crate::errors::ScoutError;
use crate::scanner::ScanOutcome;

const BANNER: &str = r"
 _   _ _   _ ____  _____ _     _____    _    ____  _____ ____
| | | | \ | |  _ \| ____| |   | ____|  / \  / ___|| ____|  _ \
| | | |  \| | |_) |  _| | |   |  _|   / _ \ \___ \|  _| | | | |
| |_| | |\  |  _ <| |___| |___| |___ / ___ \ ___) | |___| |_| |
 \___/|_| \_|_| \_\_____|_____|_____/_/   \_\____/|_____|____/
                         s c o u t
";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, ScoutError> {
    let cfgs = config::load_config()?;

    println!("{BANNER}");
    let _logger = logging::init_logging(&cfgs.logging)?;

    tracing::info!(
        service = "unreleased-scout",
        version = %env!("CARGO_PKG_VERSION"),
        config = ?cfgs,
        "starting"
    );

    let artists = artists::ArtistSet::load(&cfgs.scan.artists_path);
    let mut log = sink::ScanLog::open(&cfgs.scan.log_path)?;

    let http    = fetch::scan_client(&cfgs.http)?;
    let catalog = fetch::CatalogClient::new(http.clone(), &cfgs.catalog);
    let status  = fetch::StatusClient::new(http, &cfgs.status)?;
    let notify  = notify::TelegramNotifier::new(&cfgs.http, &cfgs.telegram);

    let scanner = scanner::BatchScanner::new(
        catalog,
        status,
        notify,
        artists,
        cfgs.telegram.chat_id.clone(),
        cfgs.scan.batch_size,
    ).with_error_limit(cfgs.scan.error_limit);

    let shutdown = scanner.shutdown();
    let trigger = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!(msg = "stopping scan", "scout.signal");
            shutdown.cancel();
        }
    });

    let run = tracing::info_span!("scan", run_id = %uuid::Uuid::new_v4());
    let outcome = scanner
        .scan(cfgs.scan.start_id, cfgs.scan.end_id, &mut log)
        .instrument(run)
        .await;

    trigger.abort();
    log.close()?;

    match outcome? {
        ScanOutcome::Completed | ScanOutcome::Cancelled => {
            info!("scout.exit");
            Ok(ExitCode::SUCCESS)
        }
        ScanOutcome::Aborted { consecutive_failures } => {
            error!(consecutive_failures, "scout.exit.error_limit");
            Ok(ExitCode::FAILURE)
        }
    }
}
