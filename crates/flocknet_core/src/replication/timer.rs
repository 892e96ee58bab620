/// Most intervals a single [`UpdateTimer::advance`] reports. Older backlog is dropped.
pub const MAX_TICKS_PER_ADVANCE: u32 = 4;

/// Whether the update timer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed,
}

/// Fixed-interval counter driven by the owning simulation loop.
///
/// The loop feeds elapsed time through [`UpdateTimer::advance`] and runs one
/// scheduler tick per interval returned.
#[derive(Debug, Clone)]
pub struct UpdateTimer {
    interval: f32,
    accumulated: f32,
    state: TimerState,
}

impl UpdateTimer {
    /// Creates an idle timer. `interval` must be positive.
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulated: 0.0,
            state: TimerState::Idle,
        }
    }

    #[inline]
    pub fn interval(&self) -> f32 {
        self.interval
    }

    #[inline]
    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn start(&mut self) {
        self.state = TimerState::Armed;
        self.accumulated = 0.0;
    }

    pub fn stop(&mut self) {
        self.state = TimerState::Idle;
        self.accumulated = 0.0;
    }

    /// Accumulates `dt` seconds and returns how many intervals elapsed,
    /// capped at [`MAX_TICKS_PER_ADVANCE`].
    pub fn advance(&mut self, dt: f32) -> u32 {
        if self.state == TimerState::Idle || !(dt > 0.0) {
            return 0;
        }
        self.accumulated += dt;
        let elapsed = (self.accumulated / self.interval).floor();
        self.accumulated = (self.accumulated - elapsed * self.interval).max(0.0);

        let cap = MAX_TICKS_PER_ADVANCE as f32;
        if elapsed > cap {
            tracing::debug!(elapsed, cap, "Update timer fell behind, dropping backlog");
            return MAX_TICKS_PER_ADVANCE;
        }
        elapsed as u32
    }
}
