//! Start/finish selection state machine.
//!
//! Turns feature picks into a validated start/finish pair. The state is
//! derived from the stored points, never stored separately:
//!
//! ```text
//!                pick (no finish)              confirm
//!   Idle ───────────────────────────▶ AwaitingFinishConfirm ──────┐
//!    ▲  pick (finish, no start)                                   │
//!    │ ─────────────────────────────▶ AwaitingStartConfirm ───────┤
//!    │                                                            ▼
//!    └──────────── reset ◀──────── ReadyToPreview ◀── both points set
//!
//!   lock(): any ──▶ Locked (picks, confirm, cancel, swap ignored)
//! ```
//!
//! The slot a pick fills is decided when the pick happens and travels with
//! the pending pick, so a candidate can never land in the other slot.

use crate::geometry::feature_position;
use crate::types::{Feature, Position};
use tracing::{debug, info, warn};

/// Selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    AwaitingStartConfirm,
    AwaitingFinishConfirm,
    ReadyToPreview,
    Locked,
}

impl SelectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionState::Idle => "Idle",
            SelectionState::AwaitingStartConfirm => "AwaitingStartConfirm",
            SelectionState::AwaitingFinishConfirm => "AwaitingFinishConfirm",
            SelectionState::ReadyToPreview => "ReadyToPreview",
            SelectionState::Locked => "Locked",
        }
    }

    /// A confirmation prompt is pending.
    pub fn is_prompting(&self) -> bool {
        matches!(
            self,
            SelectionState::AwaitingStartConfirm | SelectionState::AwaitingFinishConfirm
        )
    }
}

/// Which point a pick will fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Start,
    Finish,
}

impl Slot {
    /// Confirm button label of the prompt
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Slot::Start => "Set as start",
            Slot::Finish => "Go here",
        }
    }
}

/// Feature awaiting confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPick {
    pub feature: Feature,
    pub slot: Slot,
    /// Centre of the feature
    pub position: Position,
}

/// Start/finish selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionMachine {
    starting_point: Option<Position>,
    finishing_point: Option<Position>,
    pending: Option<PendingPick>,
    locked: bool,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        if self.locked {
            return SelectionState::Locked;
        }
        match (&self.pending, &self.starting_point, &self.finishing_point) {
            (Some(p), _, _) if p.slot == Slot::Start => SelectionState::AwaitingStartConfirm,
            (Some(_), _, _) => SelectionState::AwaitingFinishConfirm,
            (None, Some(_), Some(_)) => SelectionState::ReadyToPreview,
            _ => SelectionState::Idle,
        }
    }

    pub fn starting_point(&self) -> Option<&Position> {
        self.starting_point.as_ref()
    }

    pub fn finishing_point(&self) -> Option<&Position> {
        self.finishing_point.as_ref()
    }

    pub fn pending(&self) -> Option<&PendingPick> {
        self.pending.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Slot the next pick would fill.
    pub fn next_slot(&self) -> Slot {
        if self.finishing_point.is_some() && self.starting_point.is_none() {
            Slot::Start
        } else {
            Slot::Finish
        }
    }

    /// Offer `feature` for confirmation, replacing any pending pick.
    ///
    /// Returns the slot the pick will fill, or `None` when locked or the
    /// feature cannot be placed.
    pub fn pick_feature(&mut self, feature: Feature) -> Option<Slot> {
        if self.locked {
            debug!("Pick of {} ignored while locked", feature.id);
            return None;
        }
        let Some(position) = feature_position(&feature) else {
            warn!("Feature {} has no floor or geometry, pick ignored", feature.id);
            return None;
        };
        let slot = self.next_slot();
        if let Some(previous) = &self.pending {
            debug!("Pick of {} replaces pending {}", feature.id, previous.feature.id);
        }
        debug!("Picked {} as {:?} candidate", feature.id, slot);
        self.pending = Some(PendingPick {
            feature,
            slot,
            position,
        });
        Some(slot)
    }

    /// Commit the pending pick to its slot.
    ///
    /// When the start slot is still empty afterwards it is seeded from
    /// `live`, the latest located position.
    pub fn confirm(&mut self, live: Option<&Position>) -> Option<Slot> {
        if self.locked {
            debug!("Confirm ignored while locked");
            return None;
        }
        let pick = self.pending.take()?;
        match pick.slot {
            Slot::Start => self.starting_point = Some(pick.position),
            Slot::Finish => self.finishing_point = Some(pick.position),
        }
        if self.starting_point.is_none()
            && let Some(live) = live
        {
            debug!("Start seeded from live location on {}", live.floor_id);
            self.starting_point = Some(live.clone());
        }
        info!("Confirmed {} as {:?}, state {}", pick.feature.id, pick.slot, self.state().as_str());
        Some(pick.slot)
    }

    /// Drop the pending pick; resolved points are kept.
    pub fn cancel(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.pending.take().is_some()
    }

    /// Exchange start and finish. Only valid in `ReadyToPreview`.
    pub fn swap(&mut self) -> bool {
        if self.state() != SelectionState::ReadyToPreview {
            warn!("Swap refused in state {}", self.state().as_str());
            return false;
        }
        std::mem::swap(&mut self.starting_point, &mut self.finishing_point);
        debug!("Start and finish swapped");
        true
    }

    /// Clear both points and any pending pick.
    pub fn reset(&mut self) {
        self.starting_point = None;
        self.finishing_point = None;
        self.pending = None;
    }

    pub fn lock(&mut self) {
        self.pending = None;
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Geometry;

    fn feature(id: &str, lng: f64) -> Feature {
        let mut f = Feature::new(id, Geometry::Point([lng, 23.0]));
        f.set_floor("F1");
        f
    }

    fn live() -> Position {
        Position::new(100.0, 23.0, "F1")
    }

    #[test]
    fn test_first_pick_is_finish() {
        let mut sel = SelectionMachine::new();
        assert_eq!(sel.pick_feature(feature("A", 1.0)), Some(Slot::Finish));
        assert_eq!(sel.state(), SelectionState::AwaitingFinishConfirm);
        assert_eq!(sel.pending().unwrap().slot.prompt_label(), "Go here");
    }

    #[test]
    fn test_two_picks_without_live_location() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.confirm(None);
        assert_eq!(sel.state(), SelectionState::Idle);
        assert!(sel.starting_point().is_none());

        assert_eq!(sel.pick_feature(feature("B", 2.0)), Some(Slot::Start));
        assert_eq!(sel.state(), SelectionState::AwaitingStartConfirm);
        assert_eq!(sel.pending().unwrap().slot.prompt_label(), "Set as start");
        sel.confirm(None);

        assert_eq!(sel.state(), SelectionState::ReadyToPreview);
        assert_eq!(sel.starting_point().unwrap().lng, 2.0);
        assert_eq!(sel.finishing_point().unwrap().lng, 1.0);
    }

    #[test]
    fn test_live_location_seeds_start() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.confirm(Some(&live()));
        assert_eq!(sel.state(), SelectionState::ReadyToPreview);
        assert_eq!(sel.starting_point(), Some(&live()));
        assert_eq!(sel.finishing_point().unwrap().feature_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_last_pick_wins() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.pick_feature(feature("B", 2.0));
        sel.confirm(None);
        assert_eq!(sel.finishing_point().unwrap().feature_id.as_deref(), Some("B"));
    }

    #[test]
    fn test_cancel_keeps_points() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.confirm(Some(&live()));
        sel.pick_feature(feature("B", 2.0));
        assert!(sel.cancel());
        assert!(!sel.cancel());
        assert_eq!(sel.state(), SelectionState::ReadyToPreview);
        assert_eq!(sel.finishing_point().unwrap().feature_id.as_deref(), Some("A"));
    }

    #[test]
    fn test_pick_with_full_pair_replaces_finish() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.confirm(Some(&live()));
        assert_eq!(sel.pick_feature(feature("C", 3.0)), Some(Slot::Finish));
        sel.confirm(Some(&live()));
        assert_eq!(sel.finishing_point().unwrap().feature_id.as_deref(), Some("C"));
        assert_eq!(sel.starting_point(), Some(&live()));
    }

    #[test]
    fn test_swap() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.confirm(None);
        assert!(!sel.swap());
        assert_eq!(sel.finishing_point().unwrap().lng, 1.0);

        sel.pick_feature(feature("B", 2.0));
        sel.confirm(None);
        assert!(sel.swap());
        assert_eq!(sel.starting_point().unwrap().lng, 1.0);
        assert_eq!(sel.finishing_point().unwrap().lng, 2.0);
    }

    #[test]
    fn test_locked_ignores_input() {
        let mut sel = SelectionMachine::new();
        sel.pick_feature(feature("A", 1.0));
        sel.confirm(Some(&live()));
        sel.lock();

        assert_eq!(sel.state(), SelectionState::Locked);
        assert_eq!(sel.pick_feature(feature("B", 2.0)), None);
        assert_eq!(sel.confirm(None), None);
        assert!(!sel.cancel());
        assert!(!sel.swap());
        assert_eq!(sel.finishing_point().unwrap().feature_id.as_deref(), Some("A"));

        sel.unlock();
        assert_eq!(sel.state(), SelectionState::ReadyToPreview);
        sel.reset();
        assert_eq!(sel.state(), SelectionState::Idle);
    }

    #[test]
    fn test_unplaceable_feature_ignored() {
        let mut sel = SelectionMachine::new();
        let orphan = Feature::new("X", Geometry::Point([0.0, 0.0]));
        assert_eq!(sel.pick_feature(orphan), None);
        assert_eq!(sel.state(), SelectionState::Idle);
    }

    #[test]
    fn test_no_cross_assignment() {
        // Every interleaving of picks, confirms and cancels keeps each
        // feature in the slot it was offered for.
        let ops = ["pA", "pB", "c", "x", "pC", "c", "pD", "x", "pE", "c", "pF", "c"];
        for len in 1..=ops.len() {
            for rotation in 0..ops.len() {
                let mut sel = SelectionMachine::new();
                let mut offered: Vec<(String, Slot)> = Vec::new();
                for (i, op) in ops.iter().cycle().skip(rotation).take(len).enumerate() {
                    match *op {
                        "c" => {
                            sel.confirm(None);
                        }
                        "x" => {
                            sel.cancel();
                        }
                        pick => {
                            let id = format!("{}{}", &pick[1..], i);
                            if let Some(slot) = sel.pick_feature(feature(&id, i as f64)) {
                                offered.push((id, slot));
                            }
                        }
                    }
                    let slot_of = |p: Option<&Position>| {
                        p.and_then(|p| p.feature_id.clone()).map(|id| {
                            offered.iter().find(|(o, _)| *o == id).map(|(_, s)| *s)
                        })
                    };
                    if let Some(found) = slot_of(sel.starting_point()) {
                        assert_eq!(found, Some(Slot::Start));
                    }
                    if let Some(found) = slot_of(sel.finishing_point()) {
                        assert_eq!(found, Some(Slot::Finish));
                    }
                }
            }
        }
    }
}
