//! Edge-triggered arrival detection.
//!
//! Fires once when the remaining length crosses below the threshold and
//! re-arms only after it climbs back to or above it:
//!
//! ```text
//! remaining: 20  10   4   3   3   6   4
//! fires:      -   -   ✓   -   -   -   ✓
//! ```

/// Default arrival threshold (meters)
pub const DEFAULT_ARRIVAL_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct ArrivalDetector {
    threshold: f64,
    inside: bool,
}

impl ArrivalDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            inside: false,
        }
    }

    /// Feed the latest remaining length; `true` on a downward crossing.
    pub fn observe(&mut self, remaining: f64) -> bool {
        // NaN compares false and counts as outside
        let inside = remaining < self.threshold;
        let fired = inside && !self.inside;
        self.inside = inside;
        fired
    }

    pub fn is_inside(&self) -> bool {
        self.inside
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.inside = false;
    }
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        Self::new(DEFAULT_ARRIVAL_THRESHOLD)
    }
}
