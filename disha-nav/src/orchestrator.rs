//! Navigation session orchestrator.
//!
//! One dispatch entry, [`Orchestrator::handle`], for every input. The
//! orchestrator owns the selection, the task coordinator and the location
//! feed; after each event it recomputes the view model and lets
//! [`MapViewSync`] push the difference to the renderer.
//!
//! ```text
//!  Intent ───┐
//!  Location ─┼─▶ handle() ──▶ Selection / Coordinator / Feed ──▶ ViewModel ──▶ Renderer
//!  Route ────┘                       │
//!                                    └──▶ RoutingEngine (start / location / stop)
//! ```
//!
//! Failures never escape `handle`: misuse is logged and refused, and
//! user-recoverable failures become notices.

use crate::config::NavigationConfig;
use crate::coordinator::{NavigationTask, StopReason, TaskCoordinator};
use crate::engine::{RouteEvent, RoutingEngine, TaskId};
use crate::error::{NavError, Result};
use crate::feed::LocationFeed;
use crate::notice::Notice;
use crate::selection::SelectionMachine;
use crate::types::{CartogramCollection, Feature, Position};
use crate::view::{MapViewSync, Renderer, ViewModel};
use sanket_io::share::{DEFAULT_SHARE_PATH, SharedLocation, share_path};
use tracing::{debug, error, info, warn};

/// User intent emitted by a map control.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Feature tapped on the map
    PickFeature(Feature),
    /// Feature chosen from search results
    SearchSelect(Feature),
    /// Popup confirm
    Confirm,
    /// Popup cancel
    CancelPrompt,
    /// Preview swap button
    Swap,
    /// Preview cancel button
    CancelPreview,
    /// Preview start button
    StartNavigation,
    /// Banner stop button
    StopNavigation,
    LocateMyself,
    SwitchFloor(String),
    /// Arrival notice "End navigation" button
    EndNavigationFromNotice,
}

/// Orchestrator input.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Intent(Intent),
    /// Fused position
    Location(Position),
    /// Routing engine callback
    Route { task: TaskId, event: RouteEvent },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Intent(_) => "intent",
            Event::Location(_) => "location",
            Event::Route { event, .. } => event.as_str(),
        }
    }
}

pub struct Orchestrator<R: Renderer, E: RoutingEngine> {
    config: NavigationConfig,
    map: CartogramCollection,
    current_floor: String,
    selection: SelectionMachine,
    coordinator: TaskCoordinator,
    feed: LocationFeed,
    view: MapViewSync,
    /// The arrival notice for the current task is on screen
    arrival_notice_up: bool,
    renderer: R,
    engine: E,
}

impl<R: Renderer, E: RoutingEngine> Orchestrator<R, E> {
    /// Build the orchestrator and show the default floor.
    pub fn new(config: NavigationConfig, map: CartogramCollection, renderer: R, engine: E) -> Result<Self> {
        let current_floor = map
            .default_floor()
            .map(|f| f.id.clone())
            .ok_or_else(|| NavError::MapData("map data has no floors".into()))?;
        info!("Default floor {}", current_floor);

        let mut orchestrator = Self {
            coordinator: TaskCoordinator::new(config.arrival_threshold),
            config,
            map,
            current_floor,
            selection: SelectionMachine::new(),
            feed: LocationFeed::new(),
            view: MapViewSync::new(),
            arrival_notice_up: false,
            renderer,
            engine,
        };
        orchestrator.sync_view();
        orchestrator.renderer.fit_floor(&orchestrator.current_floor);
        Ok(orchestrator)
    }

    /// Dispatch one event and bring the view up to date.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Intent(intent) => self.on_intent(intent),
            Event::Location(position) => self.on_location(position),
            Event::Route { task, event } => self.on_route_event(task, event),
        }
        self.sync_view();
    }

    fn on_intent(&mut self, intent: Intent) {
        debug!("Intent {:?}", intent_name(&intent));
        match intent {
            Intent::PickFeature(feature) => {
                self.selection.pick_feature(feature);
            }
            Intent::SearchSelect(feature) => self.search_select(feature),
            Intent::Confirm => {
                self.selection.confirm(self.feed.latest());
            }
            Intent::CancelPrompt => {
                self.selection.cancel();
            }
            Intent::Swap => {
                self.selection.swap();
            }
            Intent::CancelPreview => {
                if self.coordinator.has_task() {
                    warn!("Preview cancel ignored while navigating");
                } else {
                    self.selection.reset();
                }
            }
            Intent::StartNavigation => {
                if let Err(e) = self.start_navigation() {
                    warn!("Navigation not started: {}", e);
                }
            }
            Intent::StopNavigation => {
                self.stop_navigation(StopReason::UserCancelled);
            }
            Intent::EndNavigationFromNotice => {
                self.stop_navigation(StopReason::Arrived);
            }
            Intent::LocateMyself => {
                self.locate_myself();
            }
            Intent::SwitchFloor(floor_id) => {
                self.switch_floor(&floor_id);
            }
        }
    }

    fn on_location(&mut self, position: Position) {
        let targets = self.feed.publish(position.clone());
        for task in targets {
            self.engine.set_current_location(task, &position);
        }
    }

    fn on_route_event(&mut self, task: TaskId, event: RouteEvent) {
        match event {
            RouteEvent::Started => {
                self.coordinator.on_started(task, &mut self.feed);
            }
            RouteEvent::Info(progress) => {
                if let Some(update) = self.coordinator.on_progress(task, progress)
                    && update.arrived
                {
                    self.renderer
                        .show_notice(&Notice::arrival(self.config.arrival_notice()));
                    self.arrival_notice_up = true;
                }
            }
            RouteEvent::Stopped => {
                if self.is_current(task) {
                    self.stop_navigation(StopReason::EngineStopped);
                }
            }
            RouteEvent::Unreachable => {
                if self.is_current(task) {
                    self.abandon_unreachable();
                }
            }
        }
    }

    /// Start navigating the selected pair.
    ///
    /// A missing start falls back to the latest located position.
    pub fn start_navigation(&mut self) -> Result<TaskId> {
        if let Some(task) = self.coordinator.task() {
            error!("Navigation task {} already running", task.id());
            return Err(NavError::TaskAlreadyActive { active: task.id() });
        }
        let finish = self
            .selection
            .finishing_point()
            .cloned()
            .ok_or(NavError::IncompletePair)?;
        let start = self
            .selection
            .starting_point()
            .or(self.feed.latest())
            .cloned()
            .ok_or(NavError::IncompletePair)?;

        match self
            .coordinator
            .start(&mut self.engine, self.config.mode, start, finish)
        {
            Ok(id) => {
                self.selection.lock();
                Ok(id)
            }
            Err(NavError::Unreachable) => {
                self.renderer
                    .show_notice(&Notice::unreachable(self.config.unreachable_notice()));
                Err(NavError::Unreachable)
            }
            Err(e) => Err(e),
        }
    }

    /// Stop the running task and clear the selection. Idempotent.
    pub fn stop_navigation(&mut self, reason: StopReason) -> bool {
        if self
            .coordinator
            .stop(reason, &mut self.engine, &mut self.feed)
            .is_none()
        {
            debug!("Stop ({:?}) with no running task", reason);
            return false;
        }
        self.dismiss_arrival_notice();
        self.selection.reset();
        self.selection.unlock();
        true
    }

    /// The engine found no route after accepting the task: drop the task
    /// but keep the pair so the user can adjust it.
    fn abandon_unreachable(&mut self) {
        self.coordinator
            .stop(StopReason::Unreachable, &mut self.engine, &mut self.feed);
        self.dismiss_arrival_notice();
        self.selection.unlock();
        self.renderer
            .show_notice(&Notice::unreachable(self.config.unreachable_notice()));
    }

    /// The arrival notice and its "End navigation" action belong to the
    /// task; retract it once the task is gone.
    fn dismiss_arrival_notice(&mut self) {
        if std::mem::take(&mut self.arrival_notice_up) {
            self.renderer.dismiss_notice();
        }
    }

    fn search_select(&mut self, feature: Feature) {
        if self.coordinator.has_task() {
            debug!("Search pick ignored while navigating");
            return;
        }
        if let Some(floor_id) = feature.floor_id()
            && self.map.has_floor(floor_id)
        {
            self.current_floor = floor_id.to_string();
            self.sync_view();
        }
        self.renderer.focus_feature(&feature);
        self.selection.pick_feature(feature);
    }

    /// Show the floor of the latest position. Returns whether the floor
    /// changed.
    pub fn locate_myself(&mut self) -> bool {
        let Some(latest) = self.feed.latest() else {
            info!("Locate requested before any location");
            return false;
        };
        if latest.floor_id == self.current_floor {
            return false;
        }
        if !self.map.has_floor(&latest.floor_id) {
            warn!("Location on unknown floor {}", latest.floor_id);
            return false;
        }
        self.current_floor = latest.floor_id.clone();
        true
    }

    /// Show and fit `floor_id`; unknown floors are ignored.
    pub fn switch_floor(&mut self, floor_id: &str) -> bool {
        if !self.map.has_floor(floor_id) {
            warn!("Unknown floor {} ignored", floor_id);
            return false;
        }
        self.current_floor = floor_id.to_string();
        self.sync_view();
        self.renderer.fit_floor(floor_id);
        true
    }

    fn is_current(&self, task: TaskId) -> bool {
        let current = self.coordinator.task().map(|t| t.id()) == Some(task);
        if !current {
            debug!("Event for stale task {} ignored", task);
        }
        current
    }

    fn sync_view(&mut self) {
        let model = ViewModel::compute(
            &self.current_floor,
            &self.selection,
            self.coordinator.task(),
            self.feed.latest(),
        );
        self.view.apply(model, &mut self.renderer);
    }

    /// Location the web page echoes to the mini-program.
    pub fn shared_location(&self) -> Option<SharedLocation> {
        self.feed.latest().map(|p| SharedLocation {
            floor_id: p.floor_id.clone(),
            lng: p.lng,
            lat: p.lat,
        })
    }

    /// Share path for the latest position.
    pub fn share_link(&self) -> String {
        share_path(DEFAULT_SHARE_PATH, self.shared_location().as_ref())
    }

    pub fn selection(&self) -> &SelectionMachine {
        &self.selection
    }

    pub fn task(&self) -> Option<&NavigationTask> {
        self.coordinator.task()
    }

    pub fn last_stop(&self) -> Option<(TaskId, StopReason)> {
        self.coordinator.last_stop()
    }

    pub fn latest_position(&self) -> Option<&Position> {
        self.feed.latest()
    }

    pub fn feed(&self) -> &LocationFeed {
        &self.feed
    }

    pub fn current_floor(&self) -> &str {
        &self.current_floor
    }

    pub fn map(&self) -> &CartogramCollection {
        &self.map
    }

    pub fn view(&self) -> &MapViewSync {
        &self.view
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

fn intent_name(intent: &Intent) -> &'static str {
    match intent {
        Intent::PickFeature(_) => "pick_feature",
        Intent::SearchSelect(_) => "search_select",
        Intent::Confirm => "confirm",
        Intent::CancelPrompt => "cancel_prompt",
        Intent::Swap => "swap",
        Intent::CancelPreview => "cancel_preview",
        Intent::StartNavigation => "start_navigation",
        Intent::StopNavigation => "stop_navigation",
        Intent::LocateMyself => "locate_myself",
        Intent::SwitchFloor(_) => "switch_floor",
        Intent::EndNavigationFromNotice => "end_navigation_from_notice",
    }
}
