//! Test doubles for the external collaborators.
//!
//! Like the recording scanner in `sanket-io`, each double is a cheap clone
//! over shared state, so a test keeps a handle after moving the double
//! into the orchestrator.

use crate::bridge::FusionPipeline;
use crate::engine::{NavigationStatus, RouteEvent, RouteProgress, RoutingEngine, TaskId, TravelMode};
use crate::error::{NavError, Result};
use crate::notice::Notice;
use crate::orchestrator::Event;
use crate::queue::EventSender;
use crate::types::{Feature, Position};
use crate::view::{ElementUpdate, Renderer};
use parking_lot::Mutex;
use sanket_io::beacon::BeaconBatch;
use std::collections::HashMap;
use std::sync::Arc;

/// Command received by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RendererCommand {
    SetFloor(String),
    FitFloor(String),
    /// Feature id
    FocusFeature(String),
    Update(ElementUpdate),
    Notice(Notice),
    DismissNotice,
}

/// Renderer that records every command.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    commands: Arc<Mutex<Vec<RendererCommand>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<RendererCommand> {
        self.commands.lock().clone()
    }

    /// Element updates only, in order
    pub fn updates(&self) -> Vec<ElementUpdate> {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                RendererCommand::Update(u) => Some(u.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                RendererCommand::Notice(n) => Some(n.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl Renderer for RecordingRenderer {
    fn set_floor(&mut self, floor_id: &str) {
        self.commands
            .lock()
            .push(RendererCommand::SetFloor(floor_id.to_string()));
    }

    fn fit_floor(&mut self, floor_id: &str) {
        self.commands
            .lock()
            .push(RendererCommand::FitFloor(floor_id.to_string()));
    }

    fn focus_feature(&mut self, feature: &Feature) {
        self.commands
            .lock()
            .push(RendererCommand::FocusFeature(feature.id.clone()));
    }

    fn update_element(&mut self, update: &ElementUpdate) {
        self.commands
            .lock()
            .push(RendererCommand::Update(update.clone()));
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.commands
            .lock()
            .push(RendererCommand::Notice(notice.clone()));
    }

    fn dismiss_notice(&mut self) {
        self.commands.lock().push(RendererCommand::DismissNotice);
    }
}

/// Call received by [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    StartTask {
        task: TaskId,
        mode: TravelMode,
        start: Position,
        finish: Position,
    },
    SetCurrentLocation {
        task: TaskId,
        position: Position,
    },
    StopTask(TaskId),
}

#[derive(Default)]
struct EngineState {
    calls: Vec<EngineCall>,
    next_task: u64,
    unreachable: bool,
    events: Option<EventSender>,
    auto_progress: bool,
    finishes: HashMap<TaskId, Position>,
}

/// Routing engine double.
///
/// Records calls. With an event sender attached it acknowledges starts
/// with `Started` and, when auto progress is on, answers every location
/// with an `Info` whose path runs straight to the finish.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    state: Arc<Mutex<EngineState>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that queues its callbacks on `events`.
    pub fn with_events(events: EventSender) -> Self {
        let engine = Self::default();
        engine.state.lock().events = Some(events);
        engine
    }

    /// Refuse every route synchronously.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn set_auto_progress(&self, enabled: bool) {
        self.state.lock().auto_progress = enabled;
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().calls.clone()
    }

    pub fn started_tasks(&self) -> Vec<TaskId> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::StartTask { task, .. } => Some(*task),
                _ => None,
            })
            .collect()
    }

    /// Positions forwarded to `task`, in order.
    pub fn locations_for(&self, task: TaskId) -> Vec<Position> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::SetCurrentLocation { task: t, position } if *t == task => {
                    Some(position.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl RoutingEngine for ScriptedEngine {
    fn start_task(&mut self, mode: TravelMode, start: &Position, finish: &Position) -> Result<TaskId> {
        let mut state = self.state.lock();
        if state.unreachable {
            return Err(NavError::Unreachable);
        }
        state.next_task += 1;
        let task = TaskId(state.next_task);
        state.calls.push(EngineCall::StartTask {
            task,
            mode,
            start: start.clone(),
            finish: finish.clone(),
        });
        state.finishes.insert(task, finish.clone());
        if let Some(events) = &state.events {
            events.send(Event::Route {
                task,
                event: RouteEvent::Started,
            });
        }
        Ok(task)
    }

    fn set_current_location(&mut self, task: TaskId, position: &Position) {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::SetCurrentLocation {
            task,
            position: position.clone(),
        });
        if !state.auto_progress {
            return;
        }
        if let (Some(events), Some(finish)) = (&state.events, state.finishes.get(&task)) {
            events.send(Event::Route {
                task,
                event: RouteEvent::Info(RouteProgress {
                    current_location: position.clone(),
                    path: vec![position.lng_lat(), finish.lng_lat()],
                    status: NavigationStatus {
                        instruction: format!("Head to {}", finish.feature_id.as_deref().unwrap_or("destination")),
                        floor_id: Some(position.floor_id.clone()),
                    },
                    remaining_length: None,
                }),
            });
        }
    }

    fn stop_task(&mut self, task: TaskId) {
        let mut state = self.state.lock();
        state.calls.push(EngineCall::StopTask(task));
        state.finishes.remove(&task);
    }
}

/// Fusion double: places the user at the anchor of the strongest known
/// beacon in each batch.
#[derive(Debug, Clone, Default)]
pub struct NearestBeaconFusion {
    anchors: HashMap<(u16, u16), Position>,
}

impl NearestBeaconFusion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_anchor(&mut self, major: u16, minor: u16, position: Position) {
        self.anchors.insert((major, minor), position);
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

impl FusionPipeline for NearestBeaconFusion {
    fn locate(&mut self, batch: &BeaconBatch) -> Vec<Position> {
        batch
            .beacons
            .iter()
            .filter(|b| self.anchors.contains_key(&(b.major, b.minor)))
            .max_by_key(|b| b.rssi)
            .and_then(|b| self.anchors.get(&(b.major, b.minor)))
            .cloned()
            .into_iter()
            .collect()
    }
}
