// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frame timing for the main loop.

use std::time::Instant;

/// Frame steps longer than this are treated as a stall (debugger, window drag).
pub const MAX_FRAME_STEP: f32 = 0.5;

/// The step reported in place of a stall.
pub const STALL_FRAME_STEP: f32 = 0.05;

/// How often the FPS counter refreshes, in seconds.
pub const FPS_RESOLUTION: f32 = 0.5;

/// Measures the time between consecutive frames.
#[derive(Debug, Default)]
pub struct FrameTimer {
    last: Option<Instant>,
}

impl FrameTimer {
    /// Creates a timer. The first [`tick`](Self::tick) returns `0.0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets the previous frame, so the next tick returns `0.0`.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Returns the seconds elapsed since the previous tick, with stalls clamped by
    /// [`clamp_step`].
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = self
            .last
            .map(|last| now.duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last = Some(now);
        clamp_step(elapsed)
    }
}

/// Replaces a step above [`MAX_FRAME_STEP`] by [`STALL_FRAME_STEP`].
pub fn clamp_step(elapsed: f32) -> f32 {
    if elapsed > MAX_FRAME_STEP {
        STALL_FRAME_STEP
    } else {
        elapsed.max(0.0)
    }
}

/// Counts presented frames and refreshes a frames-per-second figure every
/// [`FPS_RESOLUTION`] seconds.
#[derive(Debug, Default)]
pub struct FpsCounter {
    fps: u32,
    frames: u32,
    accumulated: f32,
}

impl FpsCounter {
    /// Records one frame that took `elapsed` seconds.
    pub fn frame(&mut self, elapsed: f32) {
        self.frames += 1;
        self.accumulated += elapsed;
        if self.accumulated >= FPS_RESOLUTION {
            self.fps = (self.frames as f32 / self.accumulated).round() as u32;
            self.frames = 0;
            self.accumulated = 0.0;
        }
    }

    /// The last computed figure.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}
