//! Mock scan driver and notifier for hardware-free runs and tests

use crate::error::{Error, Result};
use crate::page::{PageNotifier, Toast};
use crate::scanner::{BeaconScanner, ScannerState};
use parking_lot::Mutex;
use std::sync::Arc;

/// Lifecycle call recorded by [`MockScanner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerCall {
    Start,
    Stop,
    Destroy,
}

/// Mock scan driver. Clones share state, so a test can keep a handle
/// after moving the driver into a page.
#[derive(Clone, Default)]
pub struct MockScanner {
    inner: Arc<Mutex<MockScannerInner>>,
}

#[derive(Default)]
struct MockScannerInner {
    state: ScannerState,
    calls: Vec<ScannerCall>,
    fail_next_start: Option<String>,
}

impl MockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle calls in order
    pub fn calls(&self) -> Vec<ScannerCall> {
        self.inner.lock().calls.clone()
    }

    /// Make the next `start()` fail with `message`
    pub fn fail_next_start(&self, message: &str) {
        self.inner.lock().fail_next_start = Some(message.to_string());
    }
}

impl BeaconScanner for MockScanner {
    fn start(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScannerCall::Start);
        if inner.state == ScannerState::Destroyed {
            return Err(Error::Scanner("start after destroy".into()));
        }
        if let Some(message) = inner.fail_next_start.take() {
            return Err(Error::Scanner(message));
        }
        inner.state = ScannerState::Scanning;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(ScannerCall::Stop);
        if inner.state != ScannerState::Destroyed {
            inner.state = ScannerState::Stopped;
        }
        Ok(())
    }

    fn destroy(&mut self) {
        let mut inner = self.inner.lock();
        inner.calls.push(ScannerCall::Destroy);
        inner.state = ScannerState::Destroyed;
    }

    fn state(&self) -> ScannerState {
        self.inner.lock().state
    }
}

/// Notifier that records toasts instead of displaying them.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<NotifierLog>>,
}

#[derive(Default)]
struct NotifierLog {
    shown: Vec<Toast>,
    hidden: usize,
    visible: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Toast> {
        self.inner.lock().shown.clone()
    }

    pub fn hide_count(&self) -> usize {
        self.inner.lock().hidden
    }

    pub fn is_visible(&self) -> bool {
        self.inner.lock().visible
    }
}

impl PageNotifier for RecordingNotifier {
    fn show_toast(&mut self, toast: &Toast) {
        let mut log = self.inner.lock();
        log.shown.push(toast.clone());
        log.visible = true;
    }

    fn hide_toast(&mut self) {
        let mut log = self.inner.lock();
        log.hidden += 1;
        log.visible = false;
    }
}
