use std::time::Duration;

use web_time::Instant;

const MIN_FPS: f64 = 1.0;
const MAX_FPS: f64 = 60.0;

/// Frame-rate-gated clock for automatic stack playback.
///
/// The clock is driven by the host's animation loop: call [`tick`] with the
/// current instant on every frame and advance the slice index once per
/// `true` result. The first tick after starting only establishes the time
/// base, so a freshly started clock never advances immediately and a stopped
/// one never fast-forwards on restart.
///
/// [`tick`]: CineClock::tick
#[derive(Debug)]
pub struct CineClock {
    fps: f64,
    playing: bool,
    last_advance: Option<Instant>,
}

impl CineClock {
    pub fn new(fps: f64) -> Self {
        Self {
            fps: fps.clamp(MIN_FPS, MAX_FPS),
            playing: false,
            last_advance: None,
        }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Sets the playback rate, clamped to `[1, 60]`. Non-finite input keeps
    /// the current rate.
    pub fn set_fps(&mut self, fps: f64) {
        if fps.is_finite() {
            self.fps = fps.clamp(MIN_FPS, MAX_FPS);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Starts playback. Idempotent: starting an already-playing clock does
    /// not disturb its time base.
    pub fn start(&mut self) {
        if !self.playing {
            self.playing = true;
            self.last_advance = None;
        }
    }

    /// Stops playback and resets elapsed-time tracking. Idempotent.
    pub fn stop(&mut self) {
        self.playing = false;
        self.last_advance = None;
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps)
    }

    /// Reports whether the index should advance at `now`.
    ///
    /// Leftover time beyond one frame interval is dropped rather than
    /// banked, so a stalled host catches up by at most one step per tick.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.playing {
            return false;
        }
        match self.last_advance {
            None => {
                self.last_advance = Some(now);
                false
            }
            Some(last) => {
                if now.saturating_duration_since(last) >= self.frame_interval() {
                    self.last_advance = Some(now);
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instants(step_ms: u64, count: usize) -> Vec<Instant> {
        let base = Instant::now();
        (0..count)
            .map(|i| base + Duration::from_millis(step_ms * i as u64))
            .collect()
    }

    #[test]
    fn fps_is_clamped() {
        assert_eq!(CineClock::new(0.0).fps(), 1.0);
        assert_eq!(CineClock::new(240.0).fps(), 60.0);
        let mut clock = CineClock::new(12.0);
        clock.set_fps(f64::NAN);
        assert_eq!(clock.fps(), 12.0);
    }

    #[test]
    fn stopped_clock_never_advances() {
        let mut clock = CineClock::new(60.0);
        for now in instants(100, 5) {
            assert!(!clock.tick(now));
        }
    }

    #[test]
    fn first_tick_only_sets_the_time_base() {
        let mut clock = CineClock::new(10.0);
        clock.start();
        let times = instants(100, 3);
        assert!(!clock.tick(times[0]));
        assert!(clock.tick(times[1]));
        assert!(clock.tick(times[2]));
    }

    #[test]
    fn sub_interval_ticks_do_not_advance() {
        // 10 fps = 100ms interval, ticking every 40ms: advance on every
        // third tick.
        let mut clock = CineClock::new(10.0);
        clock.start();
        let advanced: Vec<bool> = instants(40, 7)
            .into_iter()
            .map(|now| clock.tick(now))
            .collect();
        assert_eq!(advanced, vec![false, false, false, true, false, false, true]);
    }

    #[test]
    fn restart_does_not_fast_forward() {
        let mut clock = CineClock::new(10.0);
        clock.start();
        let times = instants(1000, 4);
        clock.tick(times[0]);
        assert!(clock.tick(times[1]));

        clock.stop();
        clock.start();
        // A long pause passed, but the restarted clock re-bases first.
        assert!(!clock.tick(times[3]));
    }
}
