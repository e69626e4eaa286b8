//! Frame-generation orchestrator: owns the motion-vector and synthesis
//! stages and drives `push_frame` (spec.md §4.7).
//!
//! Grounded on spec.md §4.7. The swappable scene-change/confidence
//! policy (DESIGN.md Open Question 3) is modelled as `Box<dyn Fn>`
//! closures, the same "policy object behind a trait/closure seam" shape
//! `onca_ral_vulkan::utils::ToRalError` uses for its own conversion seam,
//! generalized here to a runtime-swappable strategy since spec.md §9
//! explicitly calls the default implementation "a placeholder".

mod stats;

pub use stats::FrameGenStats;

use ash::vk;

use crate::error::Result;
use crate::loader::DeviceDispatch;
use crate::logging::LogCategory;
use crate::low_latency::LowLatencyContext;
use crate::{log_info, log_verbose};
use crate::motion_vector::{FrameImage, MotionVectorOutputs, MotionVectorStage};
use crate::optical_flow::{GridSize, OpticalFlowConfig, Performance};
use crate::synthesis::{confidence_from_cost, Quality, QualityParams, SynthesisStage};

const LOG_CAT: LogCategory = LogCategory::new("FrameGen");

/// Frame-generation mode (spec.md §3). Maps to an (optical-flow
/// performance level, bidirectional flag, cost-enabled flag, synthesis
/// quality) tuple per spec.md §4.7.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Off,
    Performance,
    Balanced,
    Quality,
}

impl Mode {
    fn optical_flow_performance(self) -> Performance {
        match self {
            Mode::Off | Mode::Performance => Performance::Fast,
            Mode::Balanced => Performance::Medium,
            Mode::Quality => Performance::Slow,
        }
    }

    fn bidirectional(self) -> bool {
        matches!(self, Mode::Balanced | Mode::Quality)
    }

    fn cost_enabled(self) -> bool {
        matches!(self, Mode::Quality)
    }

    fn synthesis_quality(self) -> Quality {
        match self {
            Mode::Off | Mode::Performance => Quality::Performance,
            Mode::Balanced => Quality::Balanced,
            Mode::Quality => Quality::Quality,
        }
    }
}

/// Frame-generation configuration (spec.md §3).
#[derive(Clone, Copy, Debug)]
pub struct FrameGenConfig {
    pub width: u32,
    pub height: u32,
    pub mode: Mode,
    pub confidence_threshold: f32,
    pub scene_change_threshold: f32,
    pub latency_compensation: bool,
    pub target_frame_time_us: u64,
}

impl Default for FrameGenConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            mode: Mode::Off,
            confidence_threshold: 0.5,
            scene_change_threshold: 0.35,
            latency_compensation: true,
            target_frame_time_us: 16_666,
        }
    }
}

/// A synthesized intermediate frame (spec.md §3).
#[derive(Clone, Copy, Debug)]
pub struct GeneratedFrame {
    pub image: vk::Image,
    pub image_view: vk::ImageView,
    pub confidence: f32,
    pub generation_time_us: u64,
    pub frame_id: u64,
    pub should_present: bool,
}

/// Inputs a scene-change/confidence policy gets to examine: the average
/// cost-map entry, the motion-vector-field variance, and a
/// luminance-histogram distance — any of which spec.md §4.7 names as a
/// legitimate basis for the decision. Unused inputs may be left at `0.0`
/// by a simpler policy.
#[derive(Clone, Copy, Debug, Default)]
pub struct SceneSignal {
    pub avg_cost: f32,
    pub motion_vector_variance: f32,
    pub luminance_histogram_distance: f32,
}

pub type SceneChangeDetector = Box<dyn Fn(SceneSignal, f32) -> bool + Send>;
pub type ConfidenceEstimator = Box<dyn Fn(SceneSignal) -> f32 + Send>;

fn default_scene_change_detector() -> SceneChangeDetector {
    Box::new(|signal, threshold| signal.avg_cost > threshold)
}

fn default_confidence_estimator() -> ConfidenceEstimator {
    Box::new(|signal| confidence_from_cost(signal.avg_cost, QualityParams::default()))
}

/// Owns the motion-vector + synthesis stages and exposes `push_frame`
/// (spec.md §4.7).
pub struct FrameGenOrchestrator {
    config: FrameGenConfig,
    enabled: bool,
    motion_vector: MotionVectorStage,
    synthesis: SynthesisStage,
    frame_counter: u64,
    pub(crate) stats: FrameGenStats,
    scene_change_detector: SceneChangeDetector,
    confidence_estimator: ConfidenceEstimator,
}

impl FrameGenOrchestrator {
    /// Constructs sub-stages per the mode mapping in spec.md §4.7. The
    /// `low_latency_ctx` is accepted for latency-accounting coordination
    /// (spec.md §1) but this orchestrator does not own it.
    pub fn new(config: FrameGenConfig, _low_latency_ctx: Option<&LowLatencyContext>, _dispatch: &DeviceDispatch) -> Self {
        let synthesis = SynthesisStage::new(config.width, config.height, config.mode.synthesis_quality());
        Self {
            config,
            enabled: config.mode != Mode::Off,
            motion_vector: MotionVectorStage::new(),
            synthesis,
            frame_counter: 0,
            stats: FrameGenStats::default(),
            scene_change_detector: default_scene_change_detector(),
            confidence_estimator: default_confidence_estimator(),
        }
    }

    /// Optical-flow session configuration implied by the current mode
    /// (spec.md §4.7's mode-mapping table).
    pub fn optical_flow_config(&self) -> OpticalFlowConfig {
        let grid = match self.config.mode {
            Mode::Quality => GridSize::Two,
            _ => GridSize::Four,
        };
        OpticalFlowConfig {
            width: self.config.width,
            height: self.config.height,
            output_grid: grid,
            performance: self.config.mode.optical_flow_performance(),
            bidirectional: self.config.mode.bidirectional(),
            cost_enabled: self.config.mode.cost_enabled(),
        }
    }

    pub fn set_enabled(&mut self, requested: bool) {
        self.enabled = requested && self.config.mode != Mode::Off;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.config.mode = mode;
        self.synthesis.set_quality(mode.synthesis_quality());
        self.enabled = self.enabled && mode != Mode::Off;
    }

    pub fn set_scene_change_detector(&mut self, detector: SceneChangeDetector) {
        self.scene_change_detector = detector;
    }

    pub fn set_confidence_estimator(&mut self, estimator: ConfidenceEstimator) {
        self.confidence_estimator = estimator;
    }

    pub fn motion_vector_stage_mut(&mut self) -> &mut MotionVectorStage {
        &mut self.motion_vector
    }

    pub fn synthesis_stage_mut(&mut self) -> &mut SynthesisStage {
        &mut self.synthesis
    }

    pub fn get_current_frame_id(&self) -> u64 {
        self.frame_counter
    }

    pub fn get_stats(&self) -> FrameGenStats {
        self.stats
    }

    /// `latency_compensation ? (target_frame_time_us/2 + avg_gen_time_us) : 0`
    /// (spec.md §4.7).
    pub fn get_latency_compensation(&self) -> u64 {
        if self.config.latency_compensation {
            self.config.target_frame_time_us / 2 + self.stats.avg_generation_time_us
        } else {
            0
        }
    }

    /// Drives the pipeline for one real frame (spec.md §4.7):
    /// 1. push into motion-vector history; bail out if `<2` frames or
    ///    disabled;
    /// 2. advance the frame counter;
    /// 3. run optical flow;
    /// 4. bail out (and count a skip) on scene change;
    /// 5. synthesize and estimate confidence;
    /// 6. record generation time into the rolling average;
    /// 7. return the generated frame.
    pub fn push_frame(
        &mut self,
        dispatch: &DeviceDispatch,
        cmd: vk::CommandBuffer,
        frame_image: FrameImage,
        prev_view: vk::ImageView,
        curr_view: vk::ImageView,
        signal: SceneSignal,
        wall_clock_start_us: u64,
        wall_clock_end_us: u64,
    ) -> Option<GeneratedFrame> {
        let has_enough_history = self.motion_vector.push(frame_image);
        if !self.enabled || !has_enough_history {
            return None;
        }

        self.frame_counter += 1;

        if self.motion_vector.execute(dispatch, cmd).is_err() {
            log_verbose!(LOG_CAT, "optical flow execute failed for frame {}", self.frame_counter);
            return None;
        }

        if (self.scene_change_detector)(signal, self.config.scene_change_threshold) {
            self.stats.skipped_frames += 1;
            self.stats.scene_change_detected = true;
            log_info!(LOG_CAT, "scene change detected, skipping frame {}", self.frame_counter);
            return None;
        }
        self.stats.scene_change_detected = false;

        let motion_vectors = self.motion_vector.get_motion_vectors().unwrap_or(MotionVectorOutputs {
            forward_flow: vk::ImageView::null(),
            backward_flow: None,
            cost: None,
        });
        let output_view = match self.synthesis.synthesize(cmd, prev_view, curr_view, &motion_vectors) {
            Ok(view) => view,
            Err(_) => return None,
        };

        let confidence = (self.confidence_estimator)(signal).clamp(0.0, 1.0);
        let generation_time_us = wall_clock_end_us.saturating_sub(wall_clock_start_us);
        self.stats.record_generation(generation_time_us);
        self.stats.confidence = confidence;

        if confidence < self.config.confidence_threshold {
            log_verbose!(LOG_CAT, "confidence {confidence} below threshold, not presenting frame {}", self.frame_counter);
            return Some(GeneratedFrame {
                image: vk::Image::null(),
                image_view: output_view,
                confidence,
                generation_time_us,
                frame_id: self.frame_counter,
                should_present: false,
            });
        }

        Some(GeneratedFrame {
            image: vk::Image::null(),
            image_view: output_view,
            confidence,
            generation_time_us,
            frame_id: self.frame_counter,
            should_present: true,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn frame(w: u32) -> FrameImage {
        FrameImage { image: vk::Image::from_raw(w as u64), view: vk::ImageView::null(), memory: vk::DeviceMemory::null(), width: w, height: 1 }
    }

    fn orchestrator(mode: Mode) -> FrameGenOrchestrator {
        let config = FrameGenConfig { mode, ..FrameGenConfig::default() };
        let dispatch = DeviceDispatch::default();
        FrameGenOrchestrator::new(config, None, &dispatch)
    }

    #[test]
    fn mode_mapping_matches_spec_table() {
        assert_eq!(Mode::Off.synthesis_quality(), Quality::Performance);
        assert_eq!(Mode::Performance.synthesis_quality(), Quality::Performance);
        assert_eq!(Mode::Balanced.synthesis_quality(), Quality::Balanced);
        assert_eq!(Mode::Quality.synthesis_quality(), Quality::Quality);

        assert!(!Mode::Performance.bidirectional());
        assert!(Mode::Balanced.bidirectional());
        assert!(Mode::Quality.bidirectional());

        assert!(!Mode::Balanced.cost_enabled());
        assert!(Mode::Quality.cost_enabled());
    }

    #[test]
    fn set_enabled_is_false_when_mode_is_off() {
        let mut orch = orchestrator(Mode::Off);
        orch.set_enabled(true);
        assert!(!orch.enabled);
    }

    #[test]
    fn scenario_f_scene_change_skip() {
        let mut orch = orchestrator(Mode::Performance);
        orch.set_enabled(true);
        let dispatch = DeviceDispatch::default();

        // Frame 1: insufficient history.
        let result = orch.push_frame(
            &dispatch,
            vk::CommandBuffer::null(),
            frame(1),
            vk::ImageView::null(),
            vk::ImageView::null(),
            SceneSignal::default(),
            0,
            0,
        );
        assert!(result.is_none());

        // Frame 2: enough history, no scene change, optical flow has no
        // extension so execute() returns Err and push_frame bails before
        // synthesis; that's also a valid "None" per scenario F's note
        // that mode-dependent support may cause either outcome.
        let result = orch.push_frame(
            &dispatch,
            vk::CommandBuffer::null(),
            frame(2),
            vk::ImageView::null(),
            vk::ImageView::null(),
            SceneSignal::default(),
            0,
            1_000,
        );
        assert!(result.is_none());
        assert_eq!(orch.get_stats().skipped_frames, 0);
    }

    #[test]
    fn get_latency_compensation_is_zero_when_disabled() {
        let mut config = FrameGenConfig { mode: Mode::Balanced, latency_compensation: false, ..FrameGenConfig::default() };
        config.target_frame_time_us = 16_666;
        let dispatch = DeviceDispatch::default();
        let orch = FrameGenOrchestrator::new(config, None, &dispatch);
        assert_eq!(orch.get_latency_compensation(), 0);
    }

    #[test]
    fn get_latency_compensation_combines_half_target_and_avg_gen_time() {
        let dispatch = DeviceDispatch::default();
        let mut orch = FrameGenOrchestrator::new(
            FrameGenConfig { mode: Mode::Balanced, target_frame_time_us: 16_666, ..FrameGenConfig::default() },
            None,
            &dispatch,
        );
        orch.stats.record_generation(2_000);
        assert_eq!(orch.get_latency_compensation(), 16_666 / 2 + 2_000);
    }

    #[test]
    fn default_scene_change_detector_triggers_above_threshold() {
        let mut orch = orchestrator(Mode::Quality);
        orch.set_enabled(true);
        let dispatch = DeviceDispatch::default();
        orch.push_frame(&dispatch, vk::CommandBuffer::null(), frame(1), vk::ImageView::null(), vk::ImageView::null(), SceneSignal::default(), 0, 0);

        let high_cost_signal = SceneSignal { avg_cost: 0.9, ..Default::default() };
        // With no optical-flow extension, execute() fails before the
        // scene-change check is reached; directly exercise the detector
        // closure instead to validate the policy in isolation.
        assert!((orch.scene_change_detector)(high_cost_signal, orch.config.scene_change_threshold));
        assert!(!(orch.scene_change_detector)(SceneSignal::default(), orch.config.scene_change_threshold));
    }
}
