//! Mini-program navigation page: the push half of the telemetry bridge.
//!
//! Owns the scan driver, the push client and the adapter watchdog for one
//! page instance. Lifecycle maps onto the driver:
//!
//! | Page hook   | Driver      | Push client |
//! |-------------|-------------|-------------|
//! | `on_show`   | `start()`   | -           |
//! | `on_hide`   | `stop()`    | -           |
//! | `on_unload` | `destroy()` | `close()`   |
//!
//! Dropping the page runs `on_unload` if the shell never did, so no scan
//! outlives the page.

use crate::beacon::BeaconBatch;
use crate::broker::{BeaconPusher, Broker};
use crate::config::AppConfig;
use crate::error::Result;
use crate::scanner::{BeaconScanner, ScannerEvent};
use crate::session::{BrokerEndpoints, SessionToken, web_app_uri};
use crate::share::{ShareMessage, SharedLocation, share_message};
use crate::watchdog::{AdapterWatchdog, WatchdogAction};
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use url::Url;

/// Toast text shown while the adapter is off
pub const BLUETOOTH_DISABLED_TEXT: &str = "蓝牙服务未开启";

/// Transient toast request.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub title: String,
    pub duration: Duration,
}

/// Toast surface of the mini-program shell.
pub trait PageNotifier {
    fn show_toast(&mut self, toast: &Toast);
    fn hide_toast(&mut self);
}

/// Notifier that only logs; used when no shell is attached.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl PageNotifier for LogNotifier {
    fn show_toast(&mut self, toast: &Toast) {
        warn!("[toast {:?}] {}", toast.duration, toast.title);
    }

    fn hide_toast(&mut self) {
        info!("[toast] hidden");
    }
}

/// Page lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Created,
    Visible,
    Hidden,
    Unloaded,
}

/// Counters for periodic status logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageStats {
    pub batches_pushed: u64,
    pub push_failures: u64,
    pub scanner_errors: u64,
}

/// One activation of the mini-program navigation page.
pub struct MiniProgramPage<S: BeaconScanner, N: PageNotifier> {
    config: AppConfig,
    session: SessionToken,
    web_app_uri: Url,
    endpoints: BrokerEndpoints,
    scanner: S,
    pusher: BeaconPusher,
    notifier: N,
    watchdog: AdapterWatchdog,
    state: PageState,
    latest_location: Option<SharedLocation>,
    stats: PageStats,
}

impl<S: BeaconScanner, N: PageNotifier> MiniProgramPage<S, N> {
    /// Activate a page with a freshly generated session.
    pub fn activate(config: AppConfig, broker: &Broker, scanner: S, notifier: N) -> Result<Self> {
        Self::activate_with_session(config, broker, SessionToken::generate(), scanner, notifier)
    }

    /// Activate a page with a caller-chosen session.
    pub fn activate_with_session(
        config: AppConfig,
        broker: &Broker,
        session: SessionToken,
        scanner: S,
        notifier: N,
    ) -> Result<Self> {
        let web_app_uri = web_app_uri(&config.web_app.base_uri, &session, &[])?;
        let endpoints = BrokerEndpoints::derive(&config.broker.base_uri, &session)?;
        let watchdog =
            AdapterWatchdog::with_repeat(config.radio.grace_period(), config.radio.toast_duration());

        info!("Page activated with session {}", session);
        debug!("Web app: {}", web_app_uri);
        debug!("Broker push: {}", endpoints.websocket_push);

        Ok(Self {
            pusher: broker.pusher(&session),
            config,
            session,
            web_app_uri,
            endpoints,
            scanner,
            notifier,
            watchdog,
            state: PageState::Created,
            latest_location: None,
            stats: PageStats::default(),
        })
    }

    pub fn session(&self) -> &SessionToken {
        &self.session
    }

    /// URI the WebView loads.
    pub fn web_app_uri(&self) -> &Url {
        &self.web_app_uri
    }

    pub fn endpoints(&self) -> &BrokerEndpoints {
        &self.endpoints
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn stats(&self) -> PageStats {
        self.stats
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Page became visible: start scanning.
    pub fn on_show(&mut self) -> Result<()> {
        if self.state == PageState::Unloaded {
            warn!("on_show after unload ignored");
            return Ok(());
        }
        self.scanner.start()?;
        self.state = PageState::Visible;
        info!("Page shown, scanning started");
        Ok(())
    }

    /// Page hidden: stop scanning.
    pub fn on_hide(&mut self) -> Result<()> {
        if self.state == PageState::Unloaded {
            return Ok(());
        }
        self.scanner.stop()?;
        self.state = PageState::Hidden;
        info!("Page hidden, scanning stopped");
        Ok(())
    }

    /// Page torn down: destroy the driver and close the push client.
    pub fn on_unload(&mut self) {
        if self.state == PageState::Unloaded {
            return;
        }
        self.scanner.destroy();
        self.pusher.close();
        self.state = PageState::Unloaded;
        info!(
            "Page unloaded: {} batches pushed, {} scanner errors",
            self.stats.batches_pushed, self.stats.scanner_errors
        );
    }

    /// Dispatch one scanner event observed at `now`.
    pub fn handle_scanner_event(&mut self, event: ScannerEvent, now: Instant) {
        if self.state == PageState::Unloaded {
            debug!("Scanner event after unload dropped");
            return;
        }
        match event {
            ScannerEvent::Beacon(batch) => self.forward_batch(&batch),
            ScannerEvent::AdapterStateChange(enabled) => {
                let action = self.watchdog.on_adapter_state(enabled, now);
                self.apply(action);
            }
            ScannerEvent::Error(message) => {
                self.stats.scanner_errors += 1;
                error!("Beacon scanner error: {}", message);
            }
        }
    }

    /// Timer tick: raise the adapter warning once its grace period lapses,
    /// and again each time the previous toast runs out.
    pub fn tick(&mut self, now: Instant) {
        if self.state == PageState::Unloaded {
            return;
        }
        let action = self.watchdog.poll(now);
        self.apply(action);
    }

    /// Next instant at which `tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watchdog.deadline()
    }

    /// Location batch posted by the web page.
    pub fn on_page_message(&mut self, locations: &[SharedLocation]) {
        if let Some(last) = locations.last() {
            self.latest_location = Some(last.clone());
        }
    }

    pub fn latest_location(&self) -> Option<&SharedLocation> {
        self.latest_location.as_ref()
    }

    /// Share hook: link to the navigation page at the last echoed location.
    pub fn share(&self) -> ShareMessage {
        share_message(&self.config.share.path, self.latest_location.as_ref())
    }

    fn forward_batch(&mut self, batch: &BeaconBatch) {
        match self.pusher.push(batch) {
            Ok(_) => self.stats.batches_pushed += 1,
            Err(e) => {
                self.stats.push_failures += 1;
                warn!("Failed to push beacon batch: {}", e);
            }
        }
    }

    fn apply(&mut self, action: Option<WatchdogAction>) {
        match action {
            Some(WatchdogAction::ShowWarning) => self.notifier.show_toast(&Toast {
                title: BLUETOOTH_DISABLED_TEXT.to_string(),
                duration: self.config.radio.toast_duration(),
            }),
            Some(WatchdogAction::HideWarning) => self.notifier.hide_toast(),
            None => {}
        }
    }
}

impl<S: BeaconScanner, N: PageNotifier> Drop for MiniProgramPage<S, N> {
    fn drop(&mut self) {
        self.on_unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::BeaconReading;
    use crate::mock::{MockScanner, RecordingNotifier};
    use crate::scanner::ScannerState;

    fn page(broker: &Broker) -> MiniProgramPage<MockScanner, RecordingNotifier> {
        MiniProgramPage::activate_with_session(
            AppConfig::default(),
            broker,
            SessionToken::parse("pagetest").unwrap(),
            MockScanner::new(),
            RecordingNotifier::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_lifecycle_drives_scanner() {
        let broker = Broker::new();
        let mut page = page(&broker);
        let scanner = page.scanner().clone();

        page.on_show().unwrap();
        assert_eq!(scanner.state(), ScannerState::Scanning);
        page.on_hide().unwrap();
        assert_eq!(scanner.state(), ScannerState::Stopped);
        page.on_unload();
        assert_eq!(scanner.state(), ScannerState::Destroyed);

        // No restart after teardown
        page.on_show().unwrap();
        assert_eq!(scanner.state(), ScannerState::Destroyed);
    }

    #[test]
    fn test_drop_destroys_scanner() {
        let broker = Broker::new();
        let page = page(&broker);
        let scanner = page.scanner().clone();
        drop(page);
        assert_eq!(scanner.state(), ScannerState::Destroyed);
    }

    #[test]
    fn test_batches_reach_puller() {
        let broker = Broker::new();
        let mut page = page(&broker);
        let mut puller = broker.puller(page.session());

        page.on_show().unwrap();
        let batch = BeaconBatch::new(5, vec![BeaconReading::new("U", 1, 1, -55)]);
        page.handle_scanner_event(ScannerEvent::Beacon(batch.clone()), Instant::now());

        assert_eq!(page.stats().batches_pushed, 1);
        assert_eq!(
            puller.try_next(),
            Some(crate::broker::PullEvent::Beacon(batch))
        );
    }

    #[test]
    fn test_events_after_unload_are_dropped() {
        let broker = Broker::new();
        let mut page = page(&broker);
        page.on_unload();
        page.handle_scanner_event(
            ScannerEvent::Beacon(BeaconBatch::default()),
            Instant::now(),
        );
        assert_eq!(page.stats().batches_pushed, 0);
        assert_eq!(page.stats().push_failures, 0);
    }

    #[test]
    fn test_share_uses_last_echoed_location() {
        let broker = Broker::new();
        let mut page = page(&broker);
        assert_eq!(page.share().path, "/pages/mapa/mapa");

        page.on_page_message(&[
            SharedLocation {
                floor_id: "A".into(),
                lng: 1.0,
                lat: 2.0,
            },
            SharedLocation {
                floor_id: "B".into(),
                lng: 3.0,
                lat: 4.0,
            },
        ]);
        assert_eq!(page.share().path, "/pages/mapa/mapa?fcid=B&flat=4&flng=3");
    }

    #[test]
    fn test_scanner_error_is_counted_not_fatal() {
        let broker = Broker::new();
        let mut page = page(&broker);
        page.on_show().unwrap();
        page.handle_scanner_event(ScannerEvent::Error("adapter busy".into()), Instant::now());
        assert_eq!(page.stats().scanner_errors, 1);
        assert_eq!(page.state(), PageState::Visible);
    }
}
