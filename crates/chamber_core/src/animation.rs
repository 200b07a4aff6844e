//! Frame-set animation playback with deterministic tick logic.
//!
//! A frame set is an ordered list of sprite frames played at a fixed number
//! of frames per tick (0.15 means a new frame roughly every seven ticks).
//! Speed and cursor are held in integer milli-frames so playback advances
//! identically on every platform.
//!
//! The player is generic over the key naming a frame set so callers can use
//! their own enum. Switching to the set that is already active is a no-op:
//! callers may request the same set every tick without restarting the cycle.

use serde::Deserialize;

const MILLI: u64 = 1000;

/// A named sequence of frames, as authored in level data.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameSet {
    pub frames: Vec<String>,
    /// Frames advanced per tick.
    pub speed: f32,
    #[serde(default = "default_looping")]
    pub looping: bool,
}

impl FrameSet {
    pub fn speed_milli(&self) -> u64 {
        (self.speed.max(0.0) * MILLI as f32).round() as u64
    }
}

/// Runtime playback state for one animated node.
#[derive(Debug, Clone)]
pub struct AnimationPlayer<K> {
    active: K,
    frame_count: usize,
    speed_milli: u64,
    looping: bool,
    cursor_milli: u64,
    playing: bool,
    finished: bool,
}

impl<K: Copy + PartialEq> AnimationPlayer<K> {
    pub fn new(active: K, set: &FrameSet) -> Self {
        Self {
            active,
            frame_count: set.frames.len(),
            speed_milli: set.speed_milli(),
            looping: set.looping,
            cursor_milli: 0,
            playing: true,
            finished: false,
        }
    }

    pub fn active(&self) -> K {
        self.active
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn frame_index(&self) -> usize {
        if self.frame_count == 0 {
            return 0;
        }
        let whole = (self.cursor_milli / MILLI) as usize;
        if self.looping {
            whole % self.frame_count
        } else {
            whole.min(self.frame_count - 1)
        }
    }

    /// Make `key` the active set and start playing it. Returns `false` without
    /// touching the cursor when `key` is already active.
    pub fn switch_to(&mut self, key: K, set: &FrameSet) -> bool {
        if self.active == key {
            self.playing = true;
            return false;
        }
        self.active = key;
        self.frame_count = set.frames.len();
        self.speed_milli = set.speed_milli();
        self.looping = set.looping;
        self.cursor_milli = 0;
        self.finished = false;
        self.playing = true;
        true
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Advance one tick. Returns the current frame index.
    pub fn tick(&mut self) -> usize {
        if !self.playing || self.finished || self.frame_count == 0 {
            return self.frame_index();
        }
        self.cursor_milli += self.speed_milli;
        if self.looping {
            let cycle = self.frame_count as u64 * MILLI;
            self.cursor_milli %= cycle;
        } else {
            let last = (self.frame_count as u64 - 1) * MILLI;
            if self.cursor_milli >= last {
                self.cursor_milli = last;
                self.finished = true;
                self.playing = false;
            }
        }
        self.frame_index()
    }
}

const fn default_looping() -> bool {
    true
}
