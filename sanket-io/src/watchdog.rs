//! Bluetooth adapter watchdog.
//!
//! Adapter state flickers while the user toggles the radio. The warning is
//! only raised once the adapter has stayed disabled for the whole grace
//! period, raised again every repeat period while it stays disabled, and
//! cleared as soon as it comes back:
//!
//! ```text
//! false ──┬─────────── grace ───────────┐
//!         │                             ▼
//!         │ (more false: ignored)   ShowWarning ── repeat ──▶ ShowWarning ...
//!         │
//!         └── true before deadline ──▶ nothing shown
//! ```
//!
//! Time is passed in explicitly so the event loop owns the clock.

use std::time::{Duration, Instant};

/// Default grace period before warning (10 seconds)
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Action the page must apply to its notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    ShowWarning,
    HideWarning,
}

/// Throttle-with-grace-period tracker for adapter state.
#[derive(Debug, Clone)]
pub struct AdapterWatchdog {
    grace: Duration,
    repeat: Duration,
    disabled_since: Option<Instant>,
    /// When the warning was last raised; `Some` while it is up
    last_shown: Option<Instant>,
}

impl AdapterWatchdog {
    /// Watchdog re-raising the warning every `grace` while disabled.
    pub fn new(grace: Duration) -> Self {
        Self::with_repeat(grace, grace)
    }

    /// `repeat` is how long one warning stays on screen; it is raised
    /// again once that runs out. Clamped to at least one millisecond.
    pub fn with_repeat(grace: Duration, repeat: Duration) -> Self {
        Self {
            grace,
            repeat: repeat.max(Duration::from_millis(1)),
            disabled_since: None,
            last_shown: None,
        }
    }

    /// Feed an adapter state change observed at `now`.
    pub fn on_adapter_state(&mut self, enabled: bool, now: Instant) -> Option<WatchdogAction> {
        if enabled {
            self.disabled_since = None;
            if self.last_shown.take().is_some() {
                return Some(WatchdogAction::HideWarning);
            }
            return None;
        }

        // Repeated `false` keeps the first deadline
        if self.disabled_since.is_none() {
            log::debug!("Bluetooth adapter disabled, grace period {:?}", self.grace);
            self.disabled_since = Some(now);
        }
        self.poll(now)
    }

    /// Check the deadline at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<WatchdogAction> {
        let since = self.disabled_since?;
        if now < self.deadline()? {
            return None;
        }
        if self.last_shown.is_none() {
            log::warn!("Bluetooth adapter disabled for {:?}", now.saturating_duration_since(since));
        } else {
            log::debug!("Bluetooth adapter still disabled, warning raised again");
        }
        self.last_shown = Some(now);
        Some(WatchdogAction::ShowWarning)
    }

    /// Instant at which the warning is (re)raised if nothing changes.
    pub fn deadline(&self) -> Option<Instant> {
        let since = self.disabled_since?;
        Some(match self.last_shown {
            Some(shown) => shown + self.repeat,
            None => since + self.grace,
        })
    }

    pub fn is_warning_visible(&self) -> bool {
        self.last_shown.is_some()
    }
}

impl Default for AdapterWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_after_grace() {
        let t0 = Instant::now();
        let mut dog = AdapterWatchdog::default();

        assert_eq!(dog.on_adapter_state(false, t0), None);
        assert_eq!(dog.poll(t0 + Duration::from_millis(9_999)), None);
        assert_eq!(
            dog.poll(t0 + Duration::from_secs(10)),
            Some(WatchdogAction::ShowWarning)
        );
        // Not again while the first warning is up
        assert_eq!(dog.poll(t0 + Duration::from_secs(15)), None);
        assert!(dog.is_warning_visible());
    }

    #[test]
    fn test_warning_repeats_while_disabled() {
        let t0 = Instant::now();
        let mut dog = AdapterWatchdog::with_repeat(Duration::from_secs(10), Duration::from_secs(10));
        dog.on_adapter_state(false, t0);

        let shown: Vec<u64> = [10, 15, 20, 25, 30, 45, 60]
            .into_iter()
            .filter(|s| dog.poll(t0 + Duration::from_secs(*s)) == Some(WatchdogAction::ShowWarning))
            .collect();
        assert_eq!(shown, vec![10, 20, 30, 45, 60]);
        assert_eq!(dog.deadline(), Some(t0 + Duration::from_secs(70)));
    }

    #[test]
    fn test_reenable_inside_grace_never_warns() {
        let t0 = Instant::now();
        let mut dog = AdapterWatchdog::default();

        dog.on_adapter_state(false, t0);
        assert_eq!(
            dog.on_adapter_state(true, t0 + Duration::from_millis(9_900)),
            None
        );
        assert_eq!(dog.poll(t0 + Duration::from_secs(10)), None);
        assert_eq!(dog.poll(t0 + Duration::from_secs(60)), None);
        assert!(!dog.is_warning_visible());
    }

    #[test]
    fn test_flicker_keeps_first_deadline() {
        let t0 = Instant::now();
        let mut dog = AdapterWatchdog::default();

        dog.on_adapter_state(false, t0);
        dog.on_adapter_state(false, t0 + Duration::from_secs(5));
        assert_eq!(dog.deadline(), Some(t0 + Duration::from_secs(10)));
        assert_eq!(
            dog.on_adapter_state(false, t0 + Duration::from_secs(10)),
            Some(WatchdogAction::ShowWarning)
        );
    }

    #[test]
    fn test_reenable_hides_immediately() {
        let t0 = Instant::now();
        let mut dog = AdapterWatchdog::default();

        dog.on_adapter_state(false, t0);
        dog.poll(t0 + Duration::from_secs(11));
        assert_eq!(
            dog.on_adapter_state(true, t0 + Duration::from_secs(12)),
            Some(WatchdogAction::HideWarning)
        );
        assert_eq!(dog.deadline(), None);
    }
}
