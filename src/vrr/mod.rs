//! VRR (variable refresh rate) adapter: pure functions of an immutable
//! per-display descriptor, plus the LFC (low-framerate-compensation)
//! state machine that tracks real-frame transitions (spec.md §4.8).
//!
//! Grounded on spec.md §4.8 and §3 "VRR configuration" / "LFC state".
//! Kept deliberately pure/stateless except for [`LfcState`] itself, in
//! the spirit of `onca_ral`'s small value-type modules (e.g.
//! `onca_ral::fence`'s plain data descriptors) rather than the heavier
//! driver-backed contexts elsewhere in this crate.

/// Where a [`VrrConfig`] was obtained; informational only — how it got
/// populated is not this crate's concern (spec.md §1).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VrrSource {
    Drm,
    Nvidia,
    Wayland,
    Manual,
    None,
}

/// Immutable per-display VRR descriptor (spec.md §3).
#[derive(Clone, Debug)]
pub struct VrrConfig {
    pub min_hz: f64,
    pub max_hz: f64,
    pub lfc_supported: bool,
    pub source: VrrSource,
    pub enabled: bool,
    pub display_name: Option<String>,
}

impl VrrConfig {
    /// A config representing "no VRR available".
    pub fn none() -> Self {
        Self { min_hz: 0.0, max_hz: 0.0, lfc_supported: false, source: VrrSource::None, enabled: false, display_name: None }
    }

    pub fn min_interval_us(&self) -> f64 {
        1_000_000.0 / self.max_hz
    }

    pub fn max_interval_us(&self) -> f64 {
        1_000_000.0 / self.min_hz
    }

    /// `min_hz ≤ fps ≤ max_hz`.
    pub fn is_in_range(&self, fps: f64) -> bool {
        fps >= self.min_hz && fps <= self.max_hz
    }

    /// `lfc_supported ? min_hz/2 : min_hz`.
    pub fn effective_min_hz(&self) -> f64 {
        if self.lfc_supported {
            self.min_hz / 2.0
        } else {
            self.min_hz
        }
    }

    /// `lfc_supported && fps < min_hz`.
    pub fn is_lfc_active(&self, fps: f64) -> bool {
        self.lfc_supported && fps < self.min_hz
    }

    /// `clamp(avg/2, min_interval_us()/2, max_interval_us()/2)` (spec.md
    /// §4.8, §8 invariant 7: monotone non-decreasing in `avg`, always
    /// within `[min_interval/2, max_interval/2]`).
    pub fn calculate_injection_interval(&self, avg_frame_time_us: f64) -> f64 {
        let lower = self.min_interval_us() / 2.0;
        let upper = self.max_interval_us() / 2.0;
        (avg_frame_time_us / 2.0).clamp(lower, upper)
    }
}

/// Low-framerate-compensation state (spec.md §3 "LFC state"): transitions
/// on each real frame based on the comparison of current FPS to
/// `min_hz`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct LfcState {
    pub active: bool,
    pub transition_frame: u64,
    pub doubled_frames: u64,
}

impl LfcState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates state for a real frame observed at `frame_number` with
    /// instantaneous `fps` (spec.md §4.8):
    /// - enters LFC and records the transition frame when it newly
    ///   becomes active;
    /// - leaves LFC and records the transition frame when it newly
    ///   becomes inactive;
    /// - increments `doubled_frames` on every frame while active.
    pub fn update(&mut self, fps: f64, config: &VrrConfig, frame_number: u64) {
        let now_active = config.is_lfc_active(fps);
        if now_active != self.active {
            self.transition_frame = frame_number;
        }
        self.active = now_active;
        if self.active {
            self.doubled_frames += 1;
        }
    }

    /// The driver is itself doubling frames while LFC is active: frame
    /// generation must pause (spec.md §4.8).
    pub fn should_pause_injection(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> VrrConfig {
        VrrConfig { min_hz: 48.0, max_hz: 144.0, lfc_supported: true, source: VrrSource::Drm, enabled: true, display_name: None }
    }

    #[test]
    fn invariant_8_lfc_active_and_effective_min_hz() {
        let cfg = config();
        assert!(cfg.is_lfc_active(47.0));
        assert!(!cfg.is_lfc_active(48.0));
        assert!(!cfg.is_lfc_active(100.0));
        assert_eq!(cfg.effective_min_hz(), 24.0);
    }

    #[test]
    fn scenario_d_vrr_lfc_transition() {
        let cfg = config();
        let mut state = LfcState::new();

        state.update(60.0, &cfg, 0);
        assert!(!state.active);

        state.update(30.0, &cfg, 1);
        assert!(state.active);
        assert!(state.should_pause_injection());
        assert_eq!(state.transition_frame, 1);

        state.update(35.0, &cfg, 2);
        assert!(state.active);

        state.update(60.0, &cfg, 3);
        assert!(!state.active);
        assert_eq!(state.transition_frame, 3);
    }

    #[test]
    fn invariant_9_transitions_exactly_when_is_lfc_active_changes() {
        let cfg = config();
        let mut state = LfcState::new();
        for (fps, frame) in [(60.0, 0), (60.0, 1), (30.0, 2), (30.0, 3), (60.0, 4)] {
            let was_active = state.active;
            state.update(fps, &cfg, frame);
            if was_active != state.active {
                assert_eq!(state.transition_frame, frame);
            }
            assert_eq!(state.should_pause_injection(), state.active);
        }
    }

    #[test]
    fn doubled_frames_only_increments_while_active() {
        let cfg = config();
        let mut state = LfcState::new();
        state.update(60.0, &cfg, 0);
        assert_eq!(state.doubled_frames, 0);
        state.update(30.0, &cfg, 1);
        state.update(30.0, &cfg, 2);
        assert_eq!(state.doubled_frames, 2);
    }

    #[test]
    fn scenario_e_vrr_injection_interval() {
        let cfg = VrrConfig { min_hz: 48.0, max_hz: 144.0, lfc_supported: false, source: VrrSource::Manual, enabled: true, display_name: None };
        assert_eq!(cfg.calculate_injection_interval(16_667.0).round(), 8_333.0);

        let upper = cfg.max_interval_us() / 2.0;
        assert!(cfg.calculate_injection_interval(33_333.0) <= upper + 1.0);

        let lower = cfg.min_interval_us() / 2.0;
        assert!(cfg.calculate_injection_interval(1_000.0) >= lower - 1.0);
    }

    #[test]
    fn invariant_7_injection_interval_is_monotone_and_bounded() {
        let cfg = config();
        let lower = cfg.min_interval_us() / 2.0;
        let upper = cfg.max_interval_us() / 2.0;
        let mut previous = 0.0;
        for t_ms in 0..200 {
            let t = t_ms as f64 * 100.0;
            let interval = cfg.calculate_injection_interval(t);
            assert!(interval >= lower - 1e-9 && interval <= upper + 1e-9);
            assert!(interval >= previous - 1e-9);
            previous = interval;
        }
    }
}
