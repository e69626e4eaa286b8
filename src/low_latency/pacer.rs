//! Mode configuration and the frame-pacer helper.
//!
//! Grounded on spec.md §3 "Mode configuration" and §4.2 "Frame-pacer
//! helper".

/// Driver-facing low-latency mode configuration (spec.md §3).
/// `minimum_interval_us == 0` means "uncapped".
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ModeConfig {
    pub enabled: bool,
    pub boost: bool,
    pub minimum_interval_us: u64,
}

impl ModeConfig {
    /// `{enabled: true, boost: true, minimum_interval_us: 0}`.
    pub fn uncapped() -> Self {
        Self { enabled: true, boost: true, minimum_interval_us: 0 }
    }

    /// `minimum_interval_us = 1_000_000 / fps`, `0` when `fps == 0`
    /// (spec.md invariant 2).
    pub fn target_fps(fps: u32) -> u64 {
        if fps == 0 {
            0
        } else {
            1_000_000 / fps as u64
        }
    }
}

/// Maps a target FPS to a [`ModeConfig`] and tracks wall-clock delta
/// between frames (spec.md §4.2 "Frame-pacer helper").
pub struct FramePacer {
    target_fps: u32,
    target_frame_time_us: u64,
    last_frame_time_us: Option<u64>,
    frame_count: u64,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_fps,
            target_frame_time_us: ModeConfig::target_fps(target_fps),
            last_frame_time_us: None,
            frame_count: 0,
        }
    }

    /// `{enabled: true, boost: true, minimum_interval_us: 0}`, `target_fps`
    /// reporting as `0`.
    pub fn uncapped() -> Self {
        Self::new(0)
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn target_frame_time_us(&self) -> u64 {
        self.target_frame_time_us
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn to_mode_config(&self) -> ModeConfig {
        if self.target_fps == 0 {
            ModeConfig::uncapped()
        } else {
            ModeConfig { enabled: true, boost: false, minimum_interval_us: self.target_frame_time_us }
        }
    }

    /// Records a frame's wall-clock timestamp (microseconds, caller-owned
    /// clock) and returns the delta from the previous call, or `0` on the
    /// first call.
    pub fn record_frame(&mut self, now_us: u64) -> u64 {
        self.frame_count += 1;
        let delta = match self.last_frame_time_us {
            Some(last) => now_us.saturating_sub(last),
            None => 0,
        };
        self.last_frame_time_us = Some(now_us);
        delta
    }

    /// Whether `frame_time_us` beat the target frame time by more than
    /// zero: the caller finished its frame with `frame_time_us` of margin
    /// still available before the target deadline.
    pub fn is_ahead_of_target(&self, margin_us: u64) -> bool {
        margin_us < self.target_frame_time_us
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invariant_2_target_fps_helper() {
        for fps in 1..240u32 {
            assert_eq!(ModeConfig::target_fps(fps), 1_000_000 / fps as u64);
        }
        assert_eq!(ModeConfig::target_fps(0), 0);
    }

    #[test]
    fn scenario_c_frame_pacer() {
        let mut pacer = FramePacer::new(60);
        assert_eq!(pacer.target_frame_time_us(), 16_666);

        assert_eq!(pacer.record_frame(1_000_000), 0);
        assert_eq!(pacer.record_frame(1_016_666), 16_666);

        assert!(pacer.is_ahead_of_target(10_000));
        assert!(!pacer.is_ahead_of_target(20_000));
    }

    #[test]
    fn uncapped_pacer_has_zero_target() {
        let pacer = FramePacer::uncapped();
        assert_eq!(pacer.target_frame_time_us(), 0);
        assert_eq!(pacer.to_mode_config(), ModeConfig::uncapped());
    }
}
