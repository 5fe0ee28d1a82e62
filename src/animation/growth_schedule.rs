//! Timed growth driver
//!
//! Turns frame deltas into a count of growth steps that are due, so a host
//! can call [`crate::FractalTree::grow`] on a fixed cadence without a timer.

/// Grow once per `interval` seconds until `duration` seconds have passed
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthSchedule {
    /// Seconds between growth steps
    pub interval: f32,
    /// Total time the schedule runs
    pub duration: f32,
    /// Current elapsed time
    pub elapsed: f32,
    /// Whether the schedule is ticking
    pub playing: bool,
    /// Whether every step has been handed out
    pub complete: bool,
    steps_handed_out: u32,
}

impl Default for GrowthSchedule {
    fn default() -> Self {
        Self {
            interval: 1.0,
            duration: 10.0, // ten growth steps
            elapsed: 0.0,
            playing: false,
            complete: false,
            steps_handed_out: 0,
        }
    }
}

impl GrowthSchedule {
    pub fn new(interval: f32, duration: f32) -> Self {
        Self {
            interval,
            duration,
            ..Default::default()
        }
    }

    pub fn start(&mut self) {
        self.reset();
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn resume(&mut self) {
        if !self.complete {
            self.playing = true;
        }
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.steps_handed_out = 0;
        self.playing = false;
        self.complete = false;
    }

    /// Fraction of the schedule that has run
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Total steps the schedule hands out over its lifetime
    pub fn total_steps(&self) -> u32 {
        if self.interval <= 0.0 || self.duration < self.interval {
            return 0;
        }
        steps_within(self.duration, self.interval)
    }

    /// Advance by `dt` seconds and return how many growth steps became due
    pub fn update(&mut self, dt: f32) -> u32 {
        if !self.playing || self.complete {
            return 0;
        }

        self.elapsed += dt.max(0.0);

        let total = self.total_steps();
        let reached = if self.elapsed >= self.duration {
            self.playing = false;
            self.complete = true;
            total
        } else if self.interval > 0.0 {
            steps_within(self.elapsed, self.interval).min(total)
        } else {
            0
        };

        let due = reached.saturating_sub(self.steps_handed_out);
        self.steps_handed_out += due;
        due
    }
}

/// Whole intervals in `time`, tolerant of f32 rounding at the boundary
fn steps_within(time: f32, interval: f32) -> u32 {
    (time / interval + 1e-4).floor() as u32
}
