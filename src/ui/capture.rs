//! Recapture throttling.
//!
//! Capturing a window is an offscreen render pass, so only a few are allowed
//! per frame. Every frame each proxy is classified into a tier whose
//! staleness threshold decides whether it wants a new capture; the candidates
//! are then ordered on-screen first and oldest first, and the head of that
//! list up to the budget is captured.

use std::time::{Duration, Instant};

use crate::common::config::CaptureSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CaptureTier {
    /// The selected entry.
    Active,
    OnScreen,
    OffScreen,
}

impl CaptureTier {
    pub fn classify(is_active: bool, on_screen: bool) -> Self {
        if is_active {
            CaptureTier::Active
        } else if on_screen {
            CaptureTier::OnScreen
        } else {
            CaptureTier::OffScreen
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePolicy {
    pub active: Duration,
    pub on_screen: Duration,
    pub off_screen: Duration,
    pub budget: usize,
}

impl Default for CapturePolicy {
    fn default() -> Self { CapturePolicy::from_settings(&CaptureSettings::default()) }
}

impl CapturePolicy {
    pub fn from_settings(settings: &CaptureSettings) -> Self {
        Self {
            active: settings.active,
            on_screen: settings.on_screen,
            off_screen: settings.off_screen,
            budget: settings.budget,
        }
    }

    pub fn threshold(&self, tier: CaptureTier) -> Duration {
        match tier {
            CaptureTier::Active => self.active,
            CaptureTier::OnScreen => self.on_screen,
            CaptureTier::OffScreen => self.off_screen,
        }
    }

    /// Never-captured snapshots are always stale.
    pub fn is_stale(&self, tier: CaptureTier, last_captured: Option<Instant>, now: Instant) -> bool {
        match last_captured {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.threshold(tier),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTask<K> {
    pub key: K,
    pub on_screen: bool,
    pub last_captured: Option<Instant>,
}

/// Picks which stale entries get captured this frame: on-screen before
/// off-screen, then least recently captured first, truncated to `budget`.
pub fn schedule<K>(mut tasks: Vec<CaptureTask<K>>, budget: usize) -> Vec<K> {
    tasks.sort_by(|a, b| b.on_screen.cmp(&a.on_screen).then_with(|| a.last_captured.cmp(&b.last_captured)));
    tasks.into_iter().take(budget).map(|t| t.key).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn task(key: u32, on_screen: bool, last: Option<Instant>) -> CaptureTask<u32> {
        CaptureTask { key, on_screen, last_captured: last }
    }

    #[test]
    fn thresholds_follow_tier() {
        let policy = CapturePolicy::default();
        let now = Instant::now();
        let at = now - Duration::from_millis(100);
        assert!(policy.is_stale(CaptureTier::Active, Some(at), now));
        assert!(!policy.is_stale(CaptureTier::OnScreen, Some(at), now));
        assert!(!policy.is_stale(CaptureTier::OffScreen, Some(at), now));
        assert!(policy.is_stale(CaptureTier::OffScreen, None, now));
        let old = now - Duration::from_millis(1500);
        assert!(policy.is_stale(CaptureTier::OffScreen, Some(old), now));
    }

    #[test]
    fn classify_prefers_active() {
        assert_eq!(CaptureTier::classify(true, false), CaptureTier::Active);
        assert_eq!(CaptureTier::classify(false, true), CaptureTier::OnScreen);
        assert_eq!(CaptureTier::classify(false, false), CaptureTier::OffScreen);
    }

    #[test]
    fn schedule_orders_on_screen_then_oldest() {
        let now = Instant::now();
        let older = now - Duration::from_secs(2);
        let newer = now - Duration::from_secs(1);
        let tasks = vec![
            task(1, false, None),
            task(2, true, Some(newer)),
            task(3, true, Some(older)),
            task(4, true, None),
            task(5, false, Some(older)),
        ];
        assert_eq!(schedule(tasks.clone(), 10), vec![4, 3, 2, 1, 5]);
        assert_eq!(schedule(tasks, 2), vec![4, 3]);
    }

    #[test]
    fn schedule_respects_budget() {
        let tasks: Vec<_> = (0..7).map(|k| task(k, k % 2 == 0, None)).collect();
        for budget in 0..10 {
            assert_eq!(schedule(tasks.clone(), budget).len(), budget.min(7));
        }
    }
}
