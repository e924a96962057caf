//! Beacon scan driver abstraction.
//!
//! The platform driver is external; this module fixes its contract:
//! lifecycle calls go down through [`BeaconScanner`], events come back up
//! as [`ScannerEvent`]s dispatched by the page shell.

use crate::beacon::BeaconBatch;
use crate::error::Result;

/// Event emitted by the scan driver.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerEvent {
    /// `beacon`: one batch of readings
    Beacon(BeaconBatch),
    /// `bluetooth-adapter-state-change`: radio enabled/disabled
    AdapterStateChange(bool),
    /// `error`: driver-level failure, the driver retries on its own
    Error(String),
}

/// Driver lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScannerState {
    /// Constructed, never started
    #[default]
    Idle,
    Scanning,
    Stopped,
    /// Torn down; cannot be restarted
    Destroyed,
}

/// Beacon scan driver.
pub trait BeaconScanner {
    /// Start (or resume) scanning.
    fn start(&mut self) -> Result<()>;

    /// Pause scanning; may be restarted.
    fn stop(&mut self) -> Result<()>;

    /// Release the radio for good. Must be safe to call more than once.
    fn destroy(&mut self);

    fn state(&self) -> ScannerState;
}
