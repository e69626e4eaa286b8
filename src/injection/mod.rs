//! Present-injection context: decides when to insert a synthesized frame
//! into the present sequence (spec.md §4.9).
//!
//! Grounded on spec.md §4.9 and §9's "weak references between injection,
//! frame-gen, low-latency contexts" note, rendered with `std::sync::Weak`
//! — the closest stdlib equivalent of the `AWeak`/non-owning-reference
//! pattern `onca_ral_vulkan` uses throughout (e.g.
//! `PhysicalDevice::instance: AWeak<Instance>`) for borrowed cross-context
//! references that must never form ownership cycles. The `Mutex` half of
//! each weak ref is `parking_lot`, matching `low_latency::threadsafe`.

use std::sync::Weak;

use parking_lot::Mutex;

use crate::frame_gen::FrameGenOrchestrator;
use crate::low_latency::LowLatencyContext;
use crate::logging::LogCategory;
use crate::log_verbose;
use crate::vrr::{LfcState, VrrConfig};

const LOG_CAT: LogCategory = LogCategory::new("Injection");

/// How many synthesized frames to inject per real frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InjectionMode {
    Disabled,
    Single,
    Double,
}

/// How the injection interval is computed (spec.md §4.9).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimingMode {
    Fixed,
    Adaptive,
    Vrr,
}

/// Present-injection configuration (spec.md §4.9).
#[derive(Clone, Debug)]
pub struct InjectionConfig {
    pub mode: InjectionMode,
    pub timing: TimingMode,
    pub target_fps: u32,
    pub min_confidence: f32,
    pub reflex_integration: bool,
    pub vrr_config: Option<VrrConfig>,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            mode: InjectionMode::Disabled,
            timing: TimingMode::Fixed,
            target_fps: 60,
            min_confidence: 0.5,
            reflex_integration: true,
            vrr_config: None,
        }
    }
}

const PRESENT_RING_SIZE: usize = 16;
/// Fallback average present interval (~120 Hz midpoint) used by the
/// adaptive timing mode before any sample has been recorded (spec.md
/// §4.9).
const ADAPTIVE_FALLBACK_US: u64 = 8_333;

/// Bundles every injection counter so hosts can read them atomically
/// (SPEC_FULL.md §10.6: a small addition implied, not spelled out, by
/// spec.md §4.9's state list).
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub real_frames: u64,
    pub generated_frames: u64,
    pub skipped_frames: u64,
    pub avg_present_interval_us: u64,
    pub effective_fps: f64,
}

/// Owns the ring of recent present intervals and decides when a
/// synthesized frame should be injected (spec.md §4.9).
pub struct PresentInjectionContext {
    config: InjectionConfig,
    enabled: bool,
    frame_gen: Weak<Mutex<FrameGenOrchestrator>>,
    low_latency: Option<Weak<Mutex<LowLatencyContext>>>,
    interval_ring: [u64; PRESENT_RING_SIZE],
    ring_cursor: usize,
    ring_written: usize,
    real_frames: u64,
    generated_frames: u64,
    skipped_frames: u64,
    last_present_time_us: Option<u64>,
    frame_number: u64,
    lfc_state: LfcState,
    avg_present_interval_us: u64,
    effective_fps: f64,
}

impl PresentInjectionContext {
    pub fn new(
        config: InjectionConfig,
        frame_gen: Weak<Mutex<FrameGenOrchestrator>>,
        low_latency: Option<Weak<Mutex<LowLatencyContext>>>,
    ) -> Self {
        let enabled = config.mode != InjectionMode::Disabled;
        Self {
            config,
            enabled,
            frame_gen,
            low_latency,
            interval_ring: [0; PRESENT_RING_SIZE],
            ring_cursor: 0,
            ring_written: 0,
            real_frames: 0,
            generated_frames: 0,
            skipped_frames: 0,
            last_present_time_us: None,
            frame_number: 0,
            lfc_state: LfcState::new(),
            avg_present_interval_us: 0,
            effective_fps: 0.0,
        }
    }

    pub fn set_enabled(&mut self, requested: bool) {
        self.enabled = requested && self.config.mode != InjectionMode::Disabled;
    }

    pub fn set_mode(&mut self, mode: InjectionMode) {
        self.config.mode = mode;
        self.enabled = self.enabled && mode != InjectionMode::Disabled;
    }

    /// Installs `vrr`; if currently in adaptive timing and `vrr.enabled`,
    /// auto-switches to VRR timing (spec.md §4.9).
    pub fn set_vrr_config(&mut self, vrr: VrrConfig) {
        let auto_switch = self.config.timing == TimingMode::Adaptive && vrr.enabled;
        self.config.vrr_config = Some(vrr);
        if auto_switch {
            self.config.timing = TimingMode::Vrr;
            log_verbose!(LOG_CAT, "auto-switched to VRR timing");
        }
    }

    /// The Vulkan entry points a layer driving this context would need to
    /// intercept to splice synthesized presents into the present sequence
    /// (spec.md §2: "exposes the layer entry-point names it would be
    /// registered under"). Informational only — registering a layer against
    /// these names is the host's concern (spec.md §1).
    pub fn intercepted_entry_points() -> &'static [&'static str] {
        &["vkQueuePresentKHR", "vkAcquireNextImageKHR", "vkAcquireNextImage2KHR"]
    }

    pub fn stats(&self) -> Stats {
        Stats {
            real_frames: self.real_frames,
            generated_frames: self.generated_frames,
            skipped_frames: self.skipped_frames,
            avg_present_interval_us: self.avg_present_interval_us,
            effective_fps: self.effective_fps,
        }
    }

    /// `enabled ∧ ¬lfc_state.should_pause_injection() ∧ (frame_gen.stats.confidence
    /// ≥ min_confidence) ∧ ¬frame_gen.stats.scene_change_detected`
    /// (spec.md §4.9, §8 invariant 10).
    pub fn should_inject(&self) -> bool {
        if !self.enabled || self.lfc_state.should_pause_injection() {
            return false;
        }
        let Some(frame_gen) = self.frame_gen.upgrade() else {
            return false;
        };
        let stats = frame_gen.lock().get_stats();
        stats.confidence >= self.config.min_confidence && !stats.scene_change_detected
    }

    fn avg_present_interval_or_fallback(&self) -> u64 {
        if self.avg_present_interval_us == 0 {
            ADAPTIVE_FALLBACK_US
        } else {
            self.avg_present_interval_us
        }
    }

    /// Microseconds between a real and the next synthesized present, per
    /// the active [`TimingMode`] (spec.md §4.9).
    pub fn calculate_injection_timing(&self) -> u64 {
        match self.config.timing {
            TimingMode::Fixed => {
                if self.config.target_fps == 0 {
                    0
                } else {
                    1_000_000 / self.config.target_fps as u64 / 2
                }
            }
            TimingMode::Adaptive => self.avg_present_interval_or_fallback() / 2,
            TimingMode::Vrr => match &self.config.vrr_config {
                Some(vrr) => vrr.calculate_injection_interval(self.avg_present_interval_or_fallback() as f64) as u64,
                None => self.avg_present_interval_or_fallback() / 2,
            },
        }
    }

    /// Records a present event at the current monotonic clock
    /// (`now_us`, caller-owned clock). Updates the interval ring,
    /// running average, effective FPS, and — for real frames — the
    /// frame number and [`LfcState`] (spec.md §4.9).
    pub fn record_present_time(&mut self, now_us: u64, is_generated: bool) {
        if let Some(last) = self.last_present_time_us {
            let delta = now_us.saturating_sub(last);
            self.interval_ring[self.ring_cursor] = delta;
            self.ring_cursor = (self.ring_cursor + 1) % PRESENT_RING_SIZE;
            self.ring_written = (self.ring_written + 1).min(PRESENT_RING_SIZE);
            self.recompute_average();
        }
        self.last_present_time_us = Some(now_us);

        if is_generated {
            self.generated_frames += 1;
        } else {
            self.real_frames += 1;
            self.frame_number += 1;
            if self.avg_present_interval_us > 0 {
                self.lfc_state.update(self.effective_fps, self.vrr_or_none(), self.frame_number);
            }
        }
    }

    /// Marks the next real frame as skipped (e.g. the orchestrator
    /// declined to generate due to a scene change).
    pub fn record_skipped_frame(&mut self) {
        self.skipped_frames += 1;
    }

    fn vrr_or_none(&self) -> &VrrConfig {
        static NONE: once_cell::sync::Lazy<VrrConfig> = once_cell::sync::Lazy::new(VrrConfig::none);
        self.config.vrr_config.as_ref().unwrap_or(&NONE)
    }

    /// Recomputes `avg_present_interval_us` as the arithmetic mean of the
    /// non-zero entries among the slots written so far (spec.md §4.9). A
    /// zero entry is a legitimate recorded interval (e.g. two presents at
    /// the same `now_us`), not an unwritten slot — `ring_written` already
    /// excludes unwritten slots from consideration, and this excludes
    /// zero-valued ones from the sum and count besides.
    fn recompute_average(&mut self) {
        let written = &self.interval_ring[..self.ring_written];
        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for &interval in written {
            if interval != 0 {
                sum += interval;
                count += 1;
            }
        }
        self.avg_present_interval_us = if count == 0 { 0 } else { sum / count };
        self.effective_fps = if self.avg_present_interval_us == 0 {
            0.0
        } else {
            1_000_000.0 / self.avg_present_interval_us as f64
        };
    }
}
