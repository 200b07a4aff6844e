//! Fixed-step frame clock.
//!
//! Level physics is tuned per tick, not per second: every tick integrates one
//! fixed step no matter how long the frame actually took. The clock only
//! decides how many ticks a wall-clock frame is worth and keeps the
//! simulated millisecond counter that timers are scheduled against.

use std::time::Instant;

pub const DEFAULT_TICK_MS: f64 = 1000.0 / 60.0;

pub struct FrameClock {
    pub tick_ms: f64,
    pub max_accumulator_ms: f64,
    accumulator_ms: f64,
    /// Simulated time, advanced by exactly `tick_ms` per tick.
    pub now_ms: f64,
    pub tick_count: u64,
    pub ticks_this_frame: u32,
    last_instant: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_tick_ms(DEFAULT_TICK_MS)
    }

    pub fn with_tick_ms(tick_ms: f64) -> Self {
        Self {
            tick_ms,
            max_accumulator_ms: 250.0,
            accumulator_ms: 0.0,
            now_ms: 0.0,
            tick_count: 0,
            ticks_this_frame: 0,
            last_instant: None,
        }
    }

    /// Feed the wall-clock time since the previous call.
    pub fn begin_frame(&mut self) {
        let now = Instant::now();
        let real_ms = match self.last_instant {
            Some(prev) => now.duration_since(prev).as_secs_f64() * 1000.0,
            None => self.tick_ms,
        };
        self.last_instant = Some(now);
        self.feed(real_ms);
    }

    /// Feed an explicit frame duration in milliseconds.
    pub fn feed(&mut self, mut real_ms: f64) {
        // Spiral-of-death cap
        if real_ms > self.max_accumulator_ms {
            log::warn!(
                "Frame took {:.1}ms, capping accumulator to {}ms",
                real_ms,
                self.max_accumulator_ms
            );
            real_ms = self.max_accumulator_ms;
        }
        self.accumulator_ms += real_ms;
        self.ticks_this_frame = 0;
    }

    pub fn should_tick(&mut self) -> bool {
        if self.accumulator_ms >= self.tick_ms {
            self.accumulator_ms -= self.tick_ms;
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advance one tick unconditionally (replays and tests drive the clock
    /// this way instead of through the accumulator).
    pub fn advance(&mut self) {
        self.now_ms += self.tick_ms;
        self.tick_count += 1;
        self.ticks_this_frame += 1;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
