//! SanketIO - Mini-program bridge daemon
//!
//! Runs one navigation page against the mock scan driver and an in-process
//! broker, pulling its own session the way the web page would. Useful for
//! checking session wiring and the adapter watchdog without a phone.
//!
//! The synthetic adapter is switched off for a stretch every minute so the
//! "bluetooth disabled" toast can be observed in the log.

use clap::Parser;
use rand::Rng;
use sanket_io::beacon::{BeaconBatch, BeaconReading};
use sanket_io::broker::{Broker, PullEvent};
use sanket_io::config::AppConfig;
use sanket_io::error::{Error, Result};
use sanket_io::mock::MockScanner;
use sanket_io::page::{LogNotifier, MiniProgramPage};
use sanket_io::scanner::ScannerEvent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Scan callback period
const SCAN_INTERVAL: Duration = Duration::from_millis(1000);

/// Mini-program bridge daemon
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (default: sanket.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many scan callbacks (default: run until Ctrl-C)
    #[arg(short = 'n', long)]
    batches: Option<u64>,
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let fallback = Path::new("sanket.toml");
    match path {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            AppConfig::load(path)
        }
        None if fallback.exists() => {
            log::info!("Using config: {}", fallback.display());
            AppConfig::load(fallback)
        }
        None => {
            log::info!("No config file, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One synthetic scan callback over the configured UUIDs.
fn synthetic_batch<R: Rng>(rng: &mut R, uuids: &[String]) -> BeaconBatch {
    let mut beacons = Vec::with_capacity(uuids.len() * 3);
    for uuid in uuids {
        for minor in 1..=3u16 {
            let mut reading = BeaconReading::new(uuid.clone(), 10, minor, rng.gen_range(-95..-45));
            reading.accuracy = Some(rng.gen_range(0.5..12.0));
            beacons.push(reading);
        }
    }
    BeaconBatch::new(now_millis(), beacons)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("SanketIO v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let uuids = config.scanner.uuids.clone();

    let broker = Broker::new();
    let mut page = MiniProgramPage::activate(config, &broker, MockScanner::new(), LogNotifier)?;
    let mut puller = broker.puller(page.session());

    log::info!("WebView URI: {}", page.web_app_uri());
    log::info!("Broker pull: {}", page.endpoints().pull);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    page.on_show()?;
    log::info!("SanketIO running. Press Ctrl-C to stop.");

    let mut rng = rand::thread_rng();
    let started = Instant::now();
    let mut adapter_enabled = true;
    let mut pulled: u64 = 0;
    let mut ticks: u64 = 0;

    while running.load(Ordering::Relaxed) {
        if args.batches.is_some_and(|limit| ticks >= limit) {
            log::info!("Scan limit of {} callbacks reached", ticks);
            break;
        }
        ticks += 1;

        let now = Instant::now();

        // Adapter off from second 20 to 35 of every minute
        let second = now.duration_since(started).as_secs() % 60;
        let enabled = !(20..35).contains(&second);
        if enabled != adapter_enabled {
            adapter_enabled = enabled;
            page.handle_scanner_event(ScannerEvent::AdapterStateChange(enabled), now);
        }

        if adapter_enabled {
            let batch = synthetic_batch(&mut rng, &uuids);
            page.handle_scanner_event(ScannerEvent::Beacon(batch), now);
        }
        page.tick(now);

        for event in puller.drain() {
            match event {
                PullEvent::Beacon(batch) => {
                    pulled += 1;
                    if let Some(strongest) = batch.strongest() {
                        log::debug!(
                            "Pulled {} beacons, strongest {}/{} at {} dBm",
                            batch.len(),
                            strongest.major,
                            strongest.minor,
                            strongest.rssi
                        );
                    }
                }
                PullEvent::Disconnected => {
                    log::warn!("Pull side disconnected, reconnecting");
                    puller.reconnect();
                }
                PullEvent::Reconnected => {}
            }
        }

        std::thread::sleep(SCAN_INTERVAL);
    }

    log::info!("Shutting down...");
    page.on_hide()?;
    page.on_unload();
    log::info!(
        "SanketIO stopped: {} batches pushed, {} pulled",
        page.stats().batches_pushed,
        pulled
    );
    Ok(())
}
