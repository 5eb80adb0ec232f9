//! Trailing-edge throttling of configuration updates
//!
//! Rapid option changes from the host arrive faster than a scene rebuild is
//! worth doing. The throttle coalesces them: at most one apply per window,
//! and the value applied is always the most recent one submitted — never a
//! stale intermediate.

use std::time::{Duration, Instant};

use crate::config::ProductConfiguration;

/// Minimum spacing between applied updates
pub const THROTTLE_WINDOW: Duration = Duration::from_millis(100);

/// Trailing-edge update throttle
///
/// Time is injected so behavior is testable without sleeping.
pub struct UpdateThrottle {
    window: Duration,
    last_applied_at: Option<Instant>,
    pending: Option<ProductConfiguration>,
}

impl UpdateThrottle {
    pub fn new() -> Self {
        Self::with_window(THROTTLE_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            last_applied_at: None,
            pending: None,
        }
    }

    /// Record a new configuration; later submissions in the same window
    /// overwrite earlier ones
    pub fn submit(&mut self, config: ProductConfiguration) {
        self.pending = Some(config);
    }

    /// Take the configuration to apply now, if the window has elapsed
    ///
    /// Returns `None` while throttled or when nothing is pending. The first
    /// submission ever is applied immediately.
    pub fn poll(&mut self, now: Instant) -> Option<ProductConfiguration> {
        self.pending.as_ref()?;

        let ready = match self.last_applied_at {
            None => true,
            Some(last) => now.duration_since(last) >= self.window,
        };
        if !ready {
            return None;
        }

        self.last_applied_at = Some(now);
        self.pending.take()
    }

    /// Whether an update is waiting for the window to elapse
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for UpdateThrottle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialColor, StrapColor};

    fn config_with_dial(color: DialColor) -> ProductConfiguration {
        ProductConfiguration { dial_color: color, ..Default::default() }
    }

    #[test]
    fn test_first_submission_applies_immediately() {
        let mut throttle = UpdateThrottle::new();
        let now = Instant::now();

        throttle.submit(config_with_dial(DialColor::Blue));
        assert_eq!(throttle.poll(now), Some(config_with_dial(DialColor::Blue)));
        assert!(!throttle.has_pending());
    }

    #[test]
    fn test_burst_collapses_to_last_value() {
        let mut throttle = UpdateThrottle::new();
        let start = Instant::now();

        throttle.submit(config_with_dial(DialColor::Blue));
        assert!(throttle.poll(start).is_some());

        // Burst inside the window: three submissions, zero applies
        throttle.submit(config_with_dial(DialColor::Green));
        throttle.submit(config_with_dial(DialColor::White));
        throttle.submit(config_with_dial(DialColor::Champagne));
        assert_eq!(throttle.poll(start + Duration::from_millis(30)), None);
        assert_eq!(throttle.poll(start + Duration::from_millis(60)), None);

        // Window elapses: exactly one apply, with the last value
        let applied = throttle.poll(start + Duration::from_millis(120));
        assert_eq!(applied, Some(config_with_dial(DialColor::Champagne)));

        // Nothing left over
        assert_eq!(throttle.poll(start + Duration::from_millis(300)), None);
    }

    #[test]
    fn test_spaced_updates_all_apply_in_order() {
        let mut throttle = UpdateThrottle::new();
        let start = Instant::now();

        throttle.submit(config_with_dial(DialColor::Blue));
        assert_eq!(
            throttle.poll(start).map(|c| c.dial_color),
            Some(DialColor::Blue)
        );

        throttle.submit(config_with_dial(DialColor::Green));
        assert_eq!(
            throttle.poll(start + Duration::from_millis(150)).map(|c| c.dial_color),
            Some(DialColor::Green)
        );

        throttle.submit(config_with_dial(DialColor::White));
        assert_eq!(
            throttle.poll(start + Duration::from_millis(300)).map(|c| c.dial_color),
            Some(DialColor::White)
        );
    }

    #[test]
    fn test_poll_without_submission_is_none() {
        let mut throttle = UpdateThrottle::new();
        assert_eq!(throttle.poll(Instant::now()), None);
    }

    #[test]
    fn test_pending_survives_throttled_polls() {
        let mut throttle = UpdateThrottle::new();
        let start = Instant::now();

        throttle.submit(ProductConfiguration::default());
        throttle.poll(start);

        throttle.submit(ProductConfiguration {
            strap_color: StrapColor::Navy,
            ..Default::default()
        });
        assert_eq!(throttle.poll(start + Duration::from_millis(10)), None);
        assert!(throttle.has_pending());
    }
}
