use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct FpsEstimator {
    iteration_start: Instant,
    pub iteration_duration: Duration,
    max_frame_dt: f32,
}

// A stalled frame (window drag, debugger) must not fling every particle to
// the sink in one step.
pub fn clamp_frame_dt(elapsed: Duration, max_frame_dt: f32) -> f32 {
    elapsed.as_secs_f32().min(max_frame_dt.max(0.0))
}

impl FpsEstimator {
    pub fn new(fps: f64, max_frame_dt: f32) -> FpsEstimator {
        FpsEstimator {
            iteration_start: Instant::now(),
            iteration_duration: Duration::from_secs_f64(1.0 / fps.max(1.0)),
            max_frame_dt,
        }
    }

    // Time until the current frame's budget runs out.
    pub fn remaining(&self) -> Duration {
        (self.iteration_start + self.iteration_duration).saturating_duration_since(Instant::now())
    }

    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let budget_end = self.iteration_start + self.iteration_duration;
        if now > budget_end {
            log::debug!("Over time budget by: {:?}", now - budget_end);
        }
        let delta_t = now - self.iteration_start;
        self.iteration_start = now;
        clamp_frame_dt(delta_t, self.max_frame_dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_frames_are_clamped() {
        assert_eq!(clamp_frame_dt(Duration::from_secs(2), 0.1), 0.1);
        assert!((clamp_frame_dt(Duration::from_millis(16), 0.1) - 0.016).abs() < 1e-6);
        assert_eq!(clamp_frame_dt(Duration::from_millis(16), -1.0), 0.0);
    }

    #[test]
    fn tick_reports_elapsed_time() {
        let mut estimator = FpsEstimator::new(60.0, 10.0);
        std::thread::sleep(Duration::from_millis(5));
        let dt = estimator.tick();
        assert!(dt >= 0.005 && dt < 10.0, "{}", dt);
        assert!(estimator.remaining() <= estimator.iteration_duration);
    }
}
