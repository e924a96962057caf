//! DishaNav - Indoor navigation session orchestrator for IndoorGo
//!
//! Turns map picks into a start/finish pair, runs one route-following task
//! at a time against an external routing engine, and keeps the map view in
//! step with the selection, the task and the user's position.
//!
//! ## Architecture
//!
//! Everything runs on one cooperative event queue:
//!
//! - **Selection** ([`selection`]): start/finish state machine
//! - **Coordinator** ([`coordinator`], [`arrival`], [`feed`]): task lifecycle,
//!   location forwarding, edge-triggered arrival notice
//! - **View sync** ([`view`]): view model diffed into renderer commands
//! - **Bridge** ([`bridge`]): beacon batches pulled from the session broker
//!   and fused into positions
//!
//! The mini-program half of the bridge lives in `sanket-io`.

pub mod arrival;
pub mod bridge;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod feed;
pub mod geometry;
pub mod map_data;
pub mod mock;
pub mod notice;
pub mod orchestrator;
pub mod queue;
pub mod selection;
pub mod types;
pub mod view;

pub use config::DishaConfig;
pub use error::{NavError, Result};
pub use orchestrator::{Event, Intent, Orchestrator};
pub use queue::{EventQueue, EventSender};
