use tokio::time::Instant;

/// Active-duration clock.
///
/// Time accumulated from earlier running windows lives in `baseline_ms`; while
/// running it combines with `running_anchor` to give the true active duration.
/// Uses tokio's `Instant` so paused-time tests can drive it.
#[derive(Debug, Clone, Default)]
pub struct ActiveClock {
    baseline_ms: u64,
    running_anchor: Option<Instant>,
}

impl ActiveClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running_anchor.is_some()
    }

    pub fn start(&mut self, now: Instant) {
        *self = Self {
            baseline_ms: 0,
            running_anchor: Some(now),
        };
    }

    /// Folds the running window into the baseline. No-op when already frozen.
    pub fn freeze(&mut self, now: Instant) {
        if let Some(anchor) = self.running_anchor.take() {
            self.baseline_ms = self.baseline_ms.saturating_add(elapsed_ms(anchor, now));
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.running_anchor.is_none() {
            self.running_anchor = Some(now);
        }
    }

    pub fn active_ms(&self, now: Instant) -> u64 {
        match self.running_anchor {
            Some(anchor) => self.baseline_ms.saturating_add(elapsed_ms(anchor, now)),
            None => self.baseline_ms,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn elapsed_ms(anchor: Instant, now: Instant) -> u64 {
    now.saturating_duration_since(anchor).as_millis() as u64
}
