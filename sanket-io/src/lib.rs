//! SanketIO - Beacon telemetry bridge for IndoorGo
//!
//! The mini-program half of the navigation system: it owns the beacon scan
//! driver, generates the session token that pairs it with the navigation
//! web page, and pushes raw beacon batches to a session-keyed broker that
//! the web page pulls from.
//!
//! ```text
//!  BeaconScanner ──▶ MiniProgramPage ──push──▶ Broker ──pull──▶ web page
//!                     │                          ▲
//!                     └── session token ─────────┘ (in the WebView URI)
//! ```
//!
//! ## Modules
//!
//! - [`session`]: token generation, web app URI, broker endpoints
//! - [`broker`] / [`wire`]: session-keyed push/pull with length-prefixed frames
//! - [`page`]: page lifecycle, adapter watchdog toast, share hook
//! - [`mock`]: hardware-free scan driver and notifier

pub mod beacon;
pub mod broker;
pub mod config;
pub mod error;
pub mod mock;
pub mod page;
pub mod scanner;
pub mod session;
pub mod share;
pub mod watchdog;
pub mod wire;

// Re-export commonly used types
pub use beacon::{BeaconBatch, BeaconReading};
pub use broker::{BeaconPuller, BeaconPusher, Broker, PullEvent};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use session::SessionToken;
