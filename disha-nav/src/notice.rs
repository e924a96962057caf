//! Transient notices (snackbars).
//!
//! Every notice auto-dismisses; its timeout is clamped into
//! [`MIN_NOTICE_TIMEOUT`]..=[`MAX_NOTICE_TIMEOUT`].

use serde::Serialize;
use std::time::Duration;

pub const MIN_NOTICE_TIMEOUT: Duration = Duration::from_millis(500);
pub const MAX_NOTICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Intent a notice button emits.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeAction {
    EndNavigation,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NoticeButton {
    pub text: String,
    pub action: NoticeAction,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Notice {
    pub text: String,
    pub timeout: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button: Option<NoticeButton>,
}

impl Notice {
    pub fn new(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            timeout: timeout.clamp(MIN_NOTICE_TIMEOUT, MAX_NOTICE_TIMEOUT),
            button: None,
        }
    }

    pub fn with_button(mut self, text: impl Into<String>, action: NoticeAction) -> Self {
        self.button = Some(NoticeButton {
            text: text.into(),
            action,
        });
        self
    }

    /// Destination nearby, with an "End navigation" button
    pub fn arrival(timeout: Duration) -> Self {
        Self::new("Destination is nearby", timeout)
            .with_button("End navigation", NoticeAction::EndNavigation)
    }

    pub fn unreachable(timeout: Duration) -> Self {
        Self::new("No route to this place", timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_bounds() {
        assert_eq!(Notice::new("x", Duration::ZERO).timeout, MIN_NOTICE_TIMEOUT);
        assert_eq!(
            Notice::new("x", Duration::from_secs(3600)).timeout,
            MAX_NOTICE_TIMEOUT
        );
        assert_eq!(
            Notice::arrival(Duration::from_secs(5)).timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_arrival_has_end_action() {
        let notice = Notice::arrival(Duration::from_secs(5));
        assert_eq!(notice.button.unwrap().action, NoticeAction::EndNavigation);
        assert!(Notice::unreachable(Duration::from_secs(3)).button.is_none());
    }
}
