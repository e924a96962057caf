//! Navigation task lifecycle.
//!
//! At most one task exists. Its life:
//!
//! ```text
//! start() ──▶ Starting ──RouteEvent::Started──▶ Active ──stop()──▶ Stopped
//!                │                                 │
//!                └──── Unreachable / stop() ───────┴──▶ (task destroyed)
//! ```
//!
//! A task only receives positions while `Active`, through its location
//! feed subscription. Stopping disposes the subscription before anything
//! else, so no position published afterwards reaches the task.

use crate::arrival::ArrivalDetector;
use crate::engine::{RouteProgress, RoutingEngine, TaskId, TravelMode};
use crate::error::{NavError, Result};
use crate::feed::{FeedSubscription, LocationFeed};
use crate::geometry::path_length_m;
use crate::types::Position;
use tracing::{debug, error, info, warn};

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Route requested, waiting for the engine
    Starting,
    /// Following the user
    Active,
    Stopped,
}

impl TaskStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Starting => "Starting",
            TaskStatus::Active => "Active",
            TaskStatus::Stopped => "Stopped",
        }
    }
}

/// Why a task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stop pressed on the navigation banner
    UserCancelled,
    /// "End navigation" on the arrival notice
    Arrived,
    /// The engine stopped the task itself
    EngineStopped,
    /// The engine found no route
    Unreachable,
}

impl StopReason {
    /// The engine already knows the task is over
    fn engine_initiated(&self) -> bool {
        matches!(self, StopReason::EngineStopped | StopReason::Unreachable)
    }
}

/// The running navigation.
#[derive(Debug)]
pub struct NavigationTask {
    id: TaskId,
    mode: TravelMode,
    start: Position,
    finish: Position,
    status: TaskStatus,
    subscription: Option<FeedSubscription>,
    progress: Option<RouteProgress>,
}

impl NavigationTask {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn mode(&self) -> TravelMode {
        self.mode
    }

    /// Start snapshot taken at creation
    pub fn start(&self) -> &Position {
        &self.start
    }

    /// Finish snapshot taken at creation
    pub fn finish(&self) -> &Position {
        &self.finish
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn progress(&self) -> Option<&RouteProgress> {
        self.progress.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

/// Result of applying one progress report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Remaining length in meters
    pub remaining: f64,
    /// Downward crossing of the arrival threshold
    pub arrived: bool,
}

/// Owns the single navigation task.
#[derive(Debug)]
pub struct TaskCoordinator {
    task: Option<NavigationTask>,
    arrival: ArrivalDetector,
    last_stop: Option<(TaskId, StopReason)>,
}

impl TaskCoordinator {
    pub fn new(arrival_threshold: f64) -> Self {
        Self {
            task: None,
            arrival: ArrivalDetector::new(arrival_threshold),
            last_stop: None,
        }
    }

    pub fn task(&self) -> Option<&NavigationTask> {
        self.task.as_ref()
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// Identity and reason of the most recently ended task.
    pub fn last_stop(&self) -> Option<(TaskId, StopReason)> {
        self.last_stop
    }

    /// Create a task in `Starting` and request its route.
    ///
    /// Refused with `TaskAlreadyActive` while a task exists; the running
    /// task is left untouched.
    pub fn start<E: RoutingEngine>(
        &mut self,
        engine: &mut E,
        mode: TravelMode,
        start: Position,
        finish: Position,
    ) -> Result<TaskId> {
        if let Some(task) = &self.task {
            error!("Navigation task {} already running, start refused", task.id);
            return Err(NavError::TaskAlreadyActive { active: task.id });
        }

        let id = engine.start_task(mode, &start, &finish)?;
        info!(
            "Task {} starting ({}): {} -> {}",
            id,
            mode.as_str(),
            start.floor_id,
            finish.floor_id
        );
        self.arrival.reset();
        self.task = Some(NavigationTask {
            id,
            mode,
            start,
            finish,
            status: TaskStatus::Starting,
            subscription: None,
            progress: None,
        });
        Ok(id)
    }

    /// Engine acknowledged `task`: subscribe it to the feed.
    pub fn on_started(&mut self, task_id: TaskId, feed: &mut LocationFeed) -> bool {
        let Some(task) = self.current_mut(task_id) else {
            return false;
        };
        if task.status != TaskStatus::Starting {
            warn!("Duplicate start for task {} ignored", task_id);
            return false;
        }
        task.subscription = Some(feed.subscribe(task_id));
        task.status = TaskStatus::Active;
        info!("Task {} active", task_id);
        true
    }

    /// Apply a progress report for `task`.
    ///
    /// Uses the engine's remaining length when given, else the length of
    /// the remaining path.
    pub fn on_progress(&mut self, task_id: TaskId, progress: RouteProgress) -> Option<ProgressUpdate> {
        let task = self.current_mut(task_id)?;
        if task.status != TaskStatus::Active {
            debug!("Progress for task {} before start acknowledged, ignored", task_id);
            return None;
        }
        let remaining = progress
            .remaining_length
            .unwrap_or_else(|| path_length_m(&progress.path));
        debug!("Task {} remaining {:.1} m", task_id, remaining);
        task.progress = Some(progress);

        let arrived = self.arrival.observe(remaining);
        if arrived {
            info!("Task {} within {:.1} m of destination", task_id, self.arrival.threshold());
        }
        Some(ProgressUpdate { remaining, arrived })
    }

    /// End the current task. Idempotent: `None` when no task exists.
    ///
    /// The feed subscription is disposed first; the engine is told to stop
    /// unless it ended the task itself.
    pub fn stop<E: RoutingEngine>(
        &mut self,
        reason: StopReason,
        engine: &mut E,
        feed: &mut LocationFeed,
    ) -> Option<NavigationTask> {
        let mut task = self.task.take()?;
        if let Some(subscription) = task.subscription.take() {
            feed.unsubscribe(subscription);
        }
        if !reason.engine_initiated() {
            engine.stop_task(task.id);
        }
        task.status = TaskStatus::Stopped;
        self.last_stop = Some((task.id, reason));
        info!("Task {} stopped: {:?}", task.id, reason);
        Some(task)
    }

    /// The task if its id matches; stale events are dropped here.
    fn current_mut(&mut self, task_id: TaskId) -> Option<&mut NavigationTask> {
        match self.task.as_mut() {
            Some(task) if task.id == task_id => Some(task),
            _ => {
                debug!("Event for stale task {} ignored", task_id);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NavigationStatus;
    use crate::mock::{EngineCall, ScriptedEngine};

    fn pos(lng: f64) -> Position {
        Position::new(lng, 23.0, "F1")
    }

    fn progress(remaining: Option<f64>, path: Vec<[f64; 2]>) -> RouteProgress {
        RouteProgress {
            current_location: pos(0.0),
            path,
            status: NavigationStatus::default(),
            remaining_length: remaining,
        }
    }

    #[test]
    fn test_start_refused_while_active() {
        let mut engine = ScriptedEngine::new();
        let mut feed = LocationFeed::new();
        let mut coord = TaskCoordinator::new(5.0);

        let first = coord
            .start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0))
            .unwrap();
        coord.on_started(first, &mut feed);

        let err = coord
            .start(&mut engine, TravelMode::Walking, pos(2.0), pos(3.0))
            .unwrap_err();
        assert!(matches!(err, NavError::TaskAlreadyActive { active } if active == first));

        let task = coord.task().unwrap();
        assert_eq!(task.id(), first);
        assert!(task.is_subscribed());
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(engine.started_tasks().len(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut engine = ScriptedEngine::new();
        let mut feed = LocationFeed::new();
        let mut coord = TaskCoordinator::new(5.0);

        let id = coord
            .start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0))
            .unwrap();
        coord.on_started(id, &mut feed);

        let stopped = coord
            .stop(StopReason::UserCancelled, &mut engine, &mut feed)
            .unwrap();
        assert_eq!(stopped.status(), TaskStatus::Stopped);
        assert!(coord.stop(StopReason::UserCancelled, &mut engine, &mut feed).is_none());
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(
            engine.calls().iter().filter(|c| matches!(c, EngineCall::StopTask(_))).count(),
            1
        );
    }

    #[test]
    fn test_engine_stop_not_echoed() {
        let mut engine = ScriptedEngine::new();
        let mut feed = LocationFeed::new();
        let mut coord = TaskCoordinator::new(5.0);

        coord
            .start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0))
            .unwrap();
        coord.stop(StopReason::EngineStopped, &mut engine, &mut feed);
        assert!(!engine.calls().iter().any(|c| matches!(c, EngineCall::StopTask(_))));
    }

    #[test]
    fn test_unreachable_creates_no_task() {
        let mut engine = ScriptedEngine::new();
        engine.set_unreachable(true);
        let mut coord = TaskCoordinator::new(5.0);

        let result = coord.start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0));
        assert!(matches!(result, Err(NavError::Unreachable)));
        assert!(!coord.has_task());
    }

    #[test]
    fn test_progress_uses_path_length_fallback() {
        let mut engine = ScriptedEngine::new();
        let mut feed = LocationFeed::new();
        let mut coord = TaskCoordinator::new(5.0);
        let id = coord
            .start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0))
            .unwrap();
        coord.on_started(id, &mut feed);

        // ~3.3 m along a meridian
        let update = coord
            .on_progress(id, progress(None, vec![[113.0, 23.0], [113.0, 23.00003]]))
            .unwrap();
        approx::assert_relative_eq!(update.remaining, 3.336, epsilon = 0.01);
        assert!(update.arrived);

        let update = coord.on_progress(id, progress(Some(12.0), vec![])).unwrap();
        assert_eq!(update.remaining, 12.0);
        assert!(!update.arrived);
    }

    #[test]
    fn test_progress_waits_for_start_ack() {
        let mut engine = ScriptedEngine::new();
        let mut feed = LocationFeed::new();
        let mut coord = TaskCoordinator::new(5.0);
        let id = coord
            .start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0))
            .unwrap();

        // Inside the threshold, but the engine has not acknowledged yet
        assert!(coord.on_progress(id, progress(Some(1.0), vec![])).is_none());
        assert!(coord.task().unwrap().progress().is_none());

        coord.on_started(id, &mut feed);
        let update = coord.on_progress(id, progress(Some(1.0), vec![])).unwrap();
        assert!(update.arrived);
    }

    #[test]
    fn test_stale_events_ignored() {
        let mut engine = ScriptedEngine::new();
        let mut feed = LocationFeed::new();
        let mut coord = TaskCoordinator::new(5.0);
        let id = coord
            .start(&mut engine, TravelMode::Walking, pos(0.0), pos(1.0))
            .unwrap();

        let stale = TaskId(id.0 + 100);
        assert!(!coord.on_started(stale, &mut feed));
        assert!(coord.on_progress(stale, progress(Some(1.0), vec![])).is_none());
        assert_eq!(coord.task().unwrap().status(), TaskStatus::Starting);
    }
}
