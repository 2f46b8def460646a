//! Fixed-step playback clock
//!
//! The render loop runs at whatever rate the display allows; animation frames
//! advance on their own fixed tick, accumulated from the frame deltas.

use crate::core::config::DEFAULT_TICK_SECONDS;

/// Frame counter driven by a fixed tick interval
#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    frame: u32,
    frame_count: u32,
    tick_seconds: f32,
    accumulator: f32,
    playing: bool,
}

impl AnimationPlayer {
    /// Create a player looping over `frame_count` frames
    pub fn new(frame_count: u32, tick_seconds: f32) -> Self {
        Self {
            frame: 0,
            frame_count,
            tick_seconds,
            accumulator: 0.0,
            playing: true,
        }
    }

    /// Feed the frame delta. Returns true when the animation frame changed.
    pub fn advance(&mut self, delta_secs: f32) -> bool {
        if !self.playing || self.frame_count == 0 {
            return false;
        }

        self.accumulator += delta_secs;
        let mut changed = false;
        while self.accumulator >= self.tick_seconds {
            self.accumulator -= self.tick_seconds;
            self.frame = (self.frame + 1) % self.frame_count;
            changed = true;
        }
        changed
    }

    /// Current animation frame, always below `frame_count` when it is non-zero
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn tick_seconds(&self) -> f32 {
        self.tick_seconds
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start playing the animation
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Pause the animation (keeps current frame)
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stop the animation (reset to the first frame)
    pub fn stop(&mut self) {
        self.playing = false;
        self.frame = 0;
        self.accumulator = 0.0;
    }
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new(0, DEFAULT_TICK_SECONDS)
    }
}
