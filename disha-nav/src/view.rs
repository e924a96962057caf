//! Map view synchronization.
//!
//! The view never owns state. A [`ViewModel`] is computed from the
//! selection, the task and the latest position, and [`MapViewSync`] diffs
//! it against the last one applied, sending the renderer only what changed:
//!
//! ```text
//! (Selection, Task, Position) ──compute──▶ ViewModel ──diff──▶ Renderer
//!                                              │
//!                                     last applied model
//! ```
//!
//! Applying the same model twice sends nothing the second time.

use crate::coordinator::NavigationTask;
use crate::engine::NavigationStatus;
use crate::notice::Notice;
use crate::selection::SelectionMachine;
use crate::types::{Feature, LngLat, Position};
use serde::Serialize;
use tracing::{debug, info};

/// Marker element state.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct MarkerView {
    #[serde(rename = "visiable")]
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl MarkerView {
    fn at(position: Option<&Position>) -> Self {
        Self {
            visible: position.is_some(),
            position: position.cloned(),
        }
    }
}

/// Confirmation popup for the pending pick.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct PopupView {
    #[serde(rename = "visiable")]
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_text: Option<String>,
}

/// Route preview line between the two points.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct PreviewView {
    #[serde(rename = "visiable")]
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_point: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finishing_point: Option<Position>,
}

/// Turn-by-turn banner.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct BannerView {
    #[serde(rename = "visiable")]
    pub visible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub navigation_chain: Vec<LngLat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_status: Option<NavigationStatus>,
}

/// Element with no content besides visibility.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ToggleView {
    #[serde(rename = "visiable")]
    pub visible: bool,
}

/// Single element update sent to the renderer.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum ElementUpdate {
    LocationMarker(MarkerView),
    DroppingMarker(MarkerView),
    StartingMarker(MarkerView),
    FinishingMarker(MarkerView),
    FeaturePopup(PopupView),
    PreviewLine(PreviewView),
    NavigationBanner(BannerView),
    FeatureSearch(ToggleView),
}

impl ElementUpdate {
    pub fn name(&self) -> &'static str {
        match self {
            ElementUpdate::LocationMarker(_) => "location_marker",
            ElementUpdate::DroppingMarker(_) => "dropping_marker",
            ElementUpdate::StartingMarker(_) => "starting_marker",
            ElementUpdate::FinishingMarker(_) => "finishing_marker",
            ElementUpdate::FeaturePopup(_) => "feature_popup",
            ElementUpdate::PreviewLine(_) => "preview_line",
            ElementUpdate::NavigationBanner(_) => "navigation_banner",
            ElementUpdate::FeatureSearch(_) => "feature_search",
        }
    }

    pub fn is_visible(&self) -> bool {
        match self {
            ElementUpdate::LocationMarker(m)
            | ElementUpdate::DroppingMarker(m)
            | ElementUpdate::StartingMarker(m)
            | ElementUpdate::FinishingMarker(m) => m.visible,
            ElementUpdate::FeaturePopup(p) => p.visible,
            ElementUpdate::PreviewLine(p) => p.visible,
            ElementUpdate::NavigationBanner(b) => b.visible,
            ElementUpdate::FeatureSearch(t) => t.visible,
        }
    }
}

/// Map rendering engine.
pub trait Renderer {
    fn set_floor(&mut self, floor_id: &str);
    fn fit_floor(&mut self, floor_id: &str);
    fn focus_feature(&mut self, feature: &Feature);
    fn update_element(&mut self, update: &ElementUpdate);
    fn show_notice(&mut self, notice: &Notice);
    /// Retract the notice on screen, if any.
    fn dismiss_notice(&mut self);
}

/// Renderer that only logs; used by the command-line walkthrough.
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn set_floor(&mut self, floor_id: &str) {
        info!("[map] floor {}", floor_id);
    }

    fn fit_floor(&mut self, floor_id: &str) {
        debug!("[map] fit {}", floor_id);
    }

    fn focus_feature(&mut self, feature: &Feature) {
        info!("[map] focus {}", feature.name().unwrap_or(&feature.id));
    }

    fn update_element(&mut self, update: &ElementUpdate) {
        match serde_json::to_string(update) {
            Ok(json) => debug!("[map] {}", json),
            Err(_) => debug!("[map] {} visible={}", update.name(), update.is_visible()),
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        info!("[notice {:?}] {}", notice.timeout, notice.text);
    }

    fn dismiss_notice(&mut self) {
        debug!("[notice] dismissed");
    }
}

/// Full view snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewModel {
    /// Floor shown by the renderer
    pub floor: Option<String>,
    pub location_marker: MarkerView,
    pub dropping_marker: MarkerView,
    pub starting_marker: MarkerView,
    pub finishing_marker: MarkerView,
    pub popup: PopupView,
    pub preview_line: PreviewView,
    pub banner: BannerView,
    pub search: ToggleView,
}

impl ViewModel {
    /// Derive the view from domain state.
    pub fn compute(
        floor: &str,
        selection: &SelectionMachine,
        task: Option<&NavigationTask>,
        latest: Option<&Position>,
    ) -> Self {
        let pending = selection.pending();
        let progress = task.and_then(|t| t.progress());

        // While navigating the engine's snapped position wins
        let location = progress.map(|p| &p.current_location).or(latest);

        let (start, finish) = match task {
            Some(t) => (None, Some(t.finish())),
            None => (selection.starting_point(), selection.finishing_point()),
        };
        let preview_visible = task.is_none() && start.is_some() && finish.is_some();

        Self {
            floor: Some(floor.to_string()),
            location_marker: MarkerView::at(location),
            dropping_marker: MarkerView::at(pending.map(|p| &p.position)),
            starting_marker: MarkerView::at(start),
            finishing_marker: MarkerView::at(finish),
            popup: match pending {
                Some(p) => PopupView {
                    visible: true,
                    feature_id: Some(p.feature.id.clone()),
                    confirm_text: Some(p.slot.prompt_label().to_string()),
                },
                None => PopupView::default(),
            },
            preview_line: if preview_visible {
                PreviewView {
                    visible: true,
                    starting_point: start.cloned(),
                    finishing_point: finish.cloned(),
                }
            } else {
                PreviewView::default()
            },
            banner: match progress {
                Some(p) => BannerView {
                    visible: true,
                    navigation_chain: p.path.clone(),
                    navigation_status: Some(p.status.clone()),
                },
                None => BannerView::default(),
            },
            search: ToggleView {
                visible: task.is_none(),
            },
        }
    }

    fn elements(&self) -> [ElementUpdate; 8] {
        [
            ElementUpdate::LocationMarker(self.location_marker.clone()),
            ElementUpdate::DroppingMarker(self.dropping_marker.clone()),
            ElementUpdate::StartingMarker(self.starting_marker.clone()),
            ElementUpdate::FinishingMarker(self.finishing_marker.clone()),
            ElementUpdate::FeaturePopup(self.popup.clone()),
            ElementUpdate::PreviewLine(self.preview_line.clone()),
            ElementUpdate::NavigationBanner(self.banner.clone()),
            ElementUpdate::FeatureSearch(self.search.clone()),
        ]
    }
}

/// Applies view models to a renderer, sending only differences.
#[derive(Debug, Default)]
pub struct MapViewSync {
    applied: Option<ViewModel>,
}

impl MapViewSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send what changed since the last applied model; returns the number
    /// of renderer commands issued.
    pub fn apply<R: Renderer>(&mut self, model: ViewModel, renderer: &mut R) -> usize {
        let mut sent = 0;
        let previous = self.applied.take().unwrap_or_default();

        if model.floor != previous.floor
            && let Some(floor) = &model.floor
        {
            renderer.set_floor(floor);
            sent += 1;
        }

        // The first apply sends every element so the renderer starts in sync
        let first = previous.floor.is_none();
        for (old, new) in previous.elements().iter().zip(model.elements().iter()) {
            if first || old != new {
                renderer.update_element(new);
                sent += 1;
            }
        }

        if sent > 0 {
            debug!("View sync sent {} commands", sent);
        }
        self.applied = Some(model);
        sent
    }

    /// Floor currently shown, as far as the renderer was told.
    pub fn shown_floor(&self) -> Option<&str> {
        self.applied.as_ref().and_then(|m| m.floor.as_deref())
    }

    pub fn applied(&self) -> Option<&ViewModel> {
        self.applied.as_ref()
    }
}
