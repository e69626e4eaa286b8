//! Frame-generation rolling statistics: an 8-sample generation-time
//! average plus the counters/flags the present-injection context reads
//! (spec.md §4.7, §4.9).
//!
//! DESIGN.md Open Question 2: the denominator is the count of samples
//! actually written so far (saturating at 8), never a fixed 8 with
//! zero-holes in it — this matches spec.md §4.7 step 6's plain-English
//! "8-sample rolling average" and avoids under-reporting before the ring
//! fills.

const GEN_TIME_WINDOW: usize = 8;

/// Snapshot of generation-side statistics (spec.md §4.7).
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameGenStats {
    pub generated_frames: u64,
    pub skipped_frames: u64,
    pub avg_generation_time_us: u64,
    pub confidence: f32,
    pub scene_change_detected: bool,

    samples: [u64; GEN_TIME_WINDOW],
    cursor: usize,
    written: usize,
}

impl FrameGenStats {
    /// Folds a new generation-time sample into the rolling window and
    /// recomputes the average over the samples written so far.
    pub fn record_generation(&mut self, generation_time_us: u64) {
        self.samples[self.cursor] = generation_time_us;
        self.cursor = (self.cursor + 1) % GEN_TIME_WINDOW;
        self.written = (self.written + 1).min(GEN_TIME_WINDOW);
        self.generated_frames += 1;

        let sum: u64 = self.samples[..self.written].iter().sum();
        self.avg_generation_time_us = sum / self.written as u64;
    }
}
