//! Routing engine interface.
//!
//! The engine computes routes and follows the user along them. It is driven
//! by the coordinator through [`RoutingEngine`] and reports back
//! asynchronously with [`RouteEvent`]s tagged by [`TaskId`], which arrive on
//! the orchestrator's event queue like every other input.

use crate::error::Result;
use crate::types::{LngLat, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned task identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Travel mode passed to the engine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    /// Step-free routing (lifts instead of stairs)
    Accessible,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Accessible => "accessible",
        }
    }
}

/// Turn-by-turn instruction for the navigation banner.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NavigationStatus {
    pub instruction: String,
    /// Floor of the current path segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<String>,
}

/// Progress report while a task is running.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RouteProgress {
    /// Position snapped onto the route
    pub current_location: Position,
    /// Remaining path from the current location to the destination
    pub path: Vec<LngLat>,
    pub status: NavigationStatus,
    /// Remaining length in meters, when the engine computes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_length: Option<f64>,
}

/// Asynchronous task callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteEvent {
    /// Route computed; the task now follows the user
    Started,
    /// The engine ended the task on its own
    Stopped,
    Info(RouteProgress),
    /// No route between the pair
    Unreachable,
}

impl RouteEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteEvent::Started => "started",
            RouteEvent::Stopped => "stopped",
            RouteEvent::Info(_) => "info",
            RouteEvent::Unreachable => "unreachable",
        }
    }
}

/// Route computation and following.
pub trait RoutingEngine {
    /// Request a route. May fail synchronously with `NavError::Unreachable`;
    /// otherwise `Started` or `Unreachable` follows as a [`RouteEvent`].
    fn start_task(&mut self, mode: TravelMode, start: &Position, finish: &Position)
    -> Result<TaskId>;

    /// Feed the user's latest position to a running task.
    fn set_current_location(&mut self, task: TaskId, position: &Position);

    /// Stop a task. Not called for tasks the engine stopped itself.
    fn stop_task(&mut self, task: TaskId);
}
