pub use std::time::Instant;

/// Measures the time between frames in seconds.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    started: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    pub fn restart(&mut self) {
        self.started = Instant::now();
    }

    /// Seconds since the last tick; restarts the clock.
    pub fn tick(&mut self) -> f32 {
        let dt = self.elapsed_seconds();
        self.restart();
        dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_restarts() {
        let mut clock = FrameClock::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let first = clock.tick();
        assert!(first >= 0.004);
        assert!(clock.elapsed_seconds() < first);
    }
}
