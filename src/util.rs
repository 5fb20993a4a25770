//! Shared helpers for demos and tools built on the library

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Deterministic xorshift64 generator, reproducible across runs
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) } // Must be non-zero
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    #[inline]
    pub fn next_u8(&mut self) -> u8 {
        (self.next_u64() >> 56) as u8
    }

    /// Random i32 in [min, max]
    #[inline]
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        debug_assert!(min <= max, "range_i32: min ({}) must be <= max ({})", min, max);
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u64;
        min + (self.next_u64() % range) as i32
    }
}

// ============================================================================
// Frame timing
// ============================================================================

/// Rolling frame-rate average over the last `sample_count` frames
#[derive(Debug)]
pub struct FrameTimer {
    frame_times: VecDeque<Duration>,
    last_frame: Instant,
    sample_count: usize,
    frames: u64,
}

impl FrameTimer {
    pub fn new(sample_count: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(sample_count),
            last_frame: Instant::now(),
            sample_count: sample_count.max(1),
            frames: 0,
        }
    }

    /// Call once per frame. Returns the time since the previous call.
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.record(dt);
        self.last_frame = now;
        dt
    }

    fn record(&mut self, dt: Duration) {
        self.frame_times.push_back(dt);
        if self.frame_times.len() > self.sample_count {
            self.frame_times.pop_front();
        }
        self.frames += 1;
    }

    /// Average frames per second over the sample window
    pub fn average_fps(&self) -> f32 {
        let total: Duration = self.frame_times.iter().sum();
        if total.is_zero() {
            return 0.0;
        }
        self.frame_times.len() as f32 / total.as_secs_f32()
    }

    /// Frames counted since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
