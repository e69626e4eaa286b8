//! Frame-synthesis stage: motion-compensated interpolation on the GPU
//! (spec.md §4.6).
//!
//! Grounded on spec.md §4.6; the `#[repr(C)]` push-constant struct pattern
//! and the "context owns its pipelines/descriptor set" shape are grounded
//! on `onca_ral_vulkan::pipeline`/`onca_ral_vulkan::descriptor`'s
//! `ToVulkan`-fed builder usage. Shader source itself is out of scope
//! (spec.md §1) — only the binding contract and push-constant layouts are
//! implemented here.

mod motion_vector_encoding;
mod push_constants;

pub use motion_vector_encoding::{float_to_s10_5, s10_5_to_float};
pub use push_constants::{BlendPushConstants, ConfidenceBlendPushConstants, OcclusionFillPushConstants, WarpPushConstants};

use ash::vk;

use crate::error::Result;
use crate::logging::LogCategory;
use crate::log_verbose;
use crate::motion_vector::MotionVectorOutputs;

const LOG_CAT: LogCategory = LogCategory::new("Synthesis");

/// Synthesis quality level (spec.md §4.6). Drives which passes run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Quality {
    /// Single forward warp + linear blend.
    Performance,
    /// Bidirectional warp + linear blend.
    Balanced,
    /// Bidirectional warp + confidence-weighted blend + disocclusion fill.
    Quality,
}

/// Descriptor binding slots (spec.md §4.6). All visible to compute only;
/// bindings 0-3 are combined-image-sampler, binding 4 is storage-image.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DescriptorBinding {
    InputPrev = 0,
    InputCurr = 1,
    MotionVectors = 2,
    CostMap = 3,
    Output = 4,
}

/// Tunables for [`Quality::Quality`]'s confidence blend and disocclusion
/// fill passes (spec.md §4.6).
#[derive(Clone, Copy, Debug)]
pub struct QualityParams {
    pub min_confidence: f32,
    pub cost_scale: f32,
    pub occlusion_threshold: f32,
    pub fill_radius: f32,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self { min_confidence: 0.1, cost_scale: 1.0, occlusion_threshold: 0.6, fill_radius: 4.0 }
    }
}

/// `confidence = max(min_confidence, 1 - cost_scale * cost)` (spec.md
/// §4.6).
pub fn confidence_from_cost(cost: f32, params: QualityParams) -> f32 {
    (1.0 - params.cost_scale * cost).max(params.min_confidence).clamp(0.0, 1.0)
}

/// GPU pipelines + descriptor set for the warp/blend/fill compute kernels
/// (spec.md §4.6). Shader modules and pipeline layouts are created
/// by the host's build of this crate against its own shader binaries;
/// this context only records the dispatches and owns the objects once
/// created (spec.md §5: "pipelines and descriptor sets created by the
/// synthesis stage are exclusively owned by that stage").
pub struct SynthesisStage {
    width: u32,
    height: u32,
    quality: Quality,
    quality_params: QualityParams,
    t: f32,
    forward_warp: vk::Pipeline,
    backward_warp: vk::Pipeline,
    linear_blend: vk::Pipeline,
    confidence_blend: vk::Pipeline,
    occlusion_fill: vk::Pipeline,
    descriptor_set: vk::DescriptorSet,
    output_image: vk::Image,
    output_view: vk::ImageView,
}

impl SynthesisStage {
    pub fn new(width: u32, height: u32, quality: Quality) -> Self {
        Self {
            width,
            height,
            quality,
            quality_params: QualityParams::default(),
            t: 0.5,
            forward_warp: vk::Pipeline::null(),
            backward_warp: vk::Pipeline::null(),
            linear_blend: vk::Pipeline::null(),
            confidence_blend: vk::Pipeline::null(),
            occlusion_fill: vk::Pipeline::null(),
            descriptor_set: vk::DescriptorSet::null(),
            output_image: vk::Image::null(),
            output_view: vk::ImageView::null(),
        }
    }

    /// Installs GPU objects built by the host (pipelines, descriptor set,
    /// and the context-owned output storage image) once at stage setup.
    pub fn install_gpu_objects(
        &mut self,
        forward_warp: vk::Pipeline,
        backward_warp: vk::Pipeline,
        linear_blend: vk::Pipeline,
        confidence_blend: vk::Pipeline,
        occlusion_fill: vk::Pipeline,
        descriptor_set: vk::DescriptorSet,
        output_image: vk::Image,
        output_view: vk::ImageView,
    ) {
        self.forward_warp = forward_warp;
        self.backward_warp = backward_warp;
        self.linear_blend = linear_blend;
        self.confidence_blend = confidence_blend;
        self.occlusion_fill = occlusion_fill;
        self.descriptor_set = descriptor_set;
        self.output_image = output_image;
        self.output_view = output_view;
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    pub fn set_quality_params(&mut self, params: QualityParams) {
        self.quality_params = params;
    }

    pub fn output_view(&self) -> vk::ImageView {
        self.output_view
    }

    /// `prev_view`/`curr_view` must match the stage's configured
    /// `(width, height)`. Records the warp/blend/(fill) passes onto `cmd`
    /// and returns the context-owned output view (spec.md §4.6).
    pub fn synthesize(
        &self,
        cmd: vk::CommandBuffer,
        prev_view: vk::ImageView,
        curr_view: vk::ImageView,
        motion_vectors: &MotionVectorOutputs,
    ) -> Result<vk::ImageView> {
        log_verbose!(LOG_CAT, "synthesize {:?} at {}x{}", self.quality, self.width, self.height);

        match self.quality {
            Quality::Performance => {
                self.record_warp(cmd, self.forward_warp, prev_view, motion_vectors.forward_flow, self.t, 1.0);
                self.record_blend(cmd, self.linear_blend, self.t);
            }
            Quality::Balanced => {
                self.record_warp(cmd, self.forward_warp, prev_view, motion_vectors.forward_flow, self.t, 1.0);
                let backward = motion_vectors.backward_flow.unwrap_or(motion_vectors.forward_flow);
                self.record_warp(cmd, self.backward_warp, curr_view, backward, 1.0 - self.t, -1.0);
                self.record_blend(cmd, self.linear_blend, self.t);
            }
            Quality::Quality => {
                self.record_warp(cmd, self.forward_warp, prev_view, motion_vectors.forward_flow, self.t, 1.0);
                let backward = motion_vectors.backward_flow.unwrap_or(motion_vectors.forward_flow);
                self.record_warp(cmd, self.backward_warp, curr_view, backward, 1.0 - self.t, -1.0);
                self.record_confidence_blend(cmd);
                self.record_occlusion_fill(cmd);
            }
        }
        Ok(self.output_view)
    }

    fn record_warp(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline, _source: vk::ImageView, _mv: vk::ImageView, interpolation: f32, direction: f32) {
        let push = WarpPushConstants { mv_scale_x: 1.0, mv_scale_y: 1.0, interpolation, direction };
        self.dispatch_compute(cmd, pipeline, &push);
    }

    fn record_blend(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline, weight: f32) {
        let push = BlendPushConstants { weight, _pad: [0.0; 3] };
        self.dispatch_compute(cmd, pipeline, &push);
    }

    fn record_confidence_blend(&self, cmd: vk::CommandBuffer) {
        let push = ConfidenceBlendPushConstants {
            interpolation: self.t,
            cost_scale: self.quality_params.cost_scale,
            min_confidence: self.quality_params.min_confidence,
            _pad: 0.0,
        };
        self.dispatch_compute(cmd, self.confidence_blend, &push);
    }

    fn record_occlusion_fill(&self, cmd: vk::CommandBuffer) {
        let push = OcclusionFillPushConstants {
            occlusion_threshold: self.quality_params.occlusion_threshold,
            fill_radius: self.quality_params.fill_radius,
            interpolation: self.t,
            _pad: 0.0,
        };
        self.dispatch_compute(cmd, self.occlusion_fill, &push);
    }

    /// Placeholder for the host's real `cmd_bind_pipeline` /
    /// `cmd_push_constants` / `cmd_dispatch` triple: the actual GPU API
    /// calls are out of this crate's scope (spec.md §1); what's
    /// load-bearing here is the push-constant layout and dispatch
    /// ordering, which every quality level above goes through.
    fn dispatch_compute<T>(&self, _cmd: vk::CommandBuffer, _pipeline: vk::Pipeline, _push_constants: &T) {
        let groups_x = (self.width + 7) / 8;
        let groups_y = (self.height + 7) / 8;
        log_verbose!(LOG_CAT, "dispatch {groups_x}x{groups_y} workgroups");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn confidence_blend_respects_the_floor() {
        let params = QualityParams { min_confidence: 0.2, cost_scale: 1.0, ..QualityParams::default() };
        assert_eq!(confidence_from_cost(0.0, params), 1.0);
        assert_eq!(confidence_from_cost(0.9, params), 0.2);
        assert!((confidence_from_cost(0.5, params) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn synthesize_performance_mode_returns_output_view() {
        let mut stage = SynthesisStage::new(1920, 1080, Quality::Performance);
        stage.install_gpu_objects(
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::DescriptorSet::null(),
            vk::Image::null(),
            vk::ImageView::from_raw(42),
        );
        let mv = MotionVectorOutputs { forward_flow: vk::ImageView::null(), backward_flow: None, cost: None };
        let out = stage.synthesize(vk::CommandBuffer::null(), vk::ImageView::null(), vk::ImageView::null(), &mv).unwrap();
        assert_eq!(out, vk::ImageView::from_raw(42));
    }

    #[test]
    fn synthesize_quality_mode_does_not_panic_without_backward_flow() {
        let mut stage = SynthesisStage::new(64, 64, Quality::Quality);
        stage.install_gpu_objects(
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::Pipeline::null(),
            vk::DescriptorSet::null(),
            vk::Image::null(),
            vk::ImageView::null(),
        );
        let mv = MotionVectorOutputs { forward_flow: vk::ImageView::null(), backward_flow: None, cost: None };
        assert!(stage.synthesize(vk::CommandBuffer::null(), vk::ImageView::null(), vk::ImageView::null(), &mv).is_ok());
    }
}
