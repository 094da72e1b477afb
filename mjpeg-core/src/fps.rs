// Rolling frame-rate estimate for one stream session
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(5000);

/// Counts frames over a sample window and recomputes the rate when it closes
#[derive(Debug, Clone)]
pub struct RollingFps {
    window: Duration,
    window_start: Option<Instant>,
    frames_in_window: u32,
    current: Option<f32>,
}

impl RollingFps {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            frames_in_window: 0,
            current: None,
        }
    }

    /// Record one sent frame at `now`.
    ///
    /// Returns the new estimate when this frame closed a window.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        // The frame that opens a window marks its start and is not counted
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };
        self.frames_in_window += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.window || elapsed.is_zero() {
            return None;
        }

        let rate = self.frames_in_window as f32 / elapsed.as_secs_f32();
        self.current = Some(rate);
        self.window_start = Some(now);
        self.frames_in_window = 0;
        Some(rate)
    }

    /// Last completed estimate
    pub fn current(&self) -> Option<f32> {
        self.current
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RollingFps {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
