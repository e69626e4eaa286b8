//! Markers, present IDs, and the frame-timing POD record.
//!
//! Grounded on spec.md §3 "Marker", "Present ID", "Frame timing record".

/// Phase tag stamped at a present ID. Ordering of stamped markers within
/// one present ID is the caller's responsibility (spec.md §3) — this
/// runtime imposes no ordering invariant.
///
/// Stable C-ABI values 0..11, matching spec.md §6.
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Marker {
    SimStart = 0,
    SimEnd = 1,
    RenderSubmitStart = 2,
    RenderSubmitEnd = 3,
    PresentStart = 4,
    PresentEnd = 5,
    InputSample = 6,
    TriggerFlash = 7,
    OobRenderSubmitStart = 8,
    OobRenderSubmitEnd = 9,
    OobPresentStart = 10,
    OobPresentEnd = 11,
}

impl Marker {
    /// Round-trips a raw C-ABI marker value back into a [`Marker`].
    pub fn from_u32(value: u32) -> Option<Marker> {
        use Marker::*;
        Some(match value {
            0 => SimStart,
            1 => SimEnd,
            2 => RenderSubmitStart,
            3 => RenderSubmitEnd,
            4 => PresentStart,
            5 => PresentEnd,
            6 => InputSample,
            7 => TriggerFlash,
            8 => OobRenderSubmitStart,
            9 => OobRenderSubmitEnd,
            10 => OobPresentStart,
            11 => OobPresentEnd,
            _ => return None,
        })
    }
}

/// Monotonically non-decreasing present-ID counter. Zero means "no frame
/// begun" (spec.md §3).
pub type PresentId = u64;

/// Fixed-layout timing record keyed by present ID. Any field equal to `0`
/// means "not reported"; derived-quantity helpers return `0` in that case
/// (spec.md §3, invariant 3). Byte-exact POD layout per spec.md §6: 12
/// `u64` fields, no padding, `#[repr(C)]`.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameTimings {
    pub present_id: u64,
    pub input_sample_time_us: u64,
    pub sim_start_time_us: u64,
    pub sim_end_time_us: u64,
    pub render_submit_start_time_us: u64,
    pub render_submit_end_time_us: u64,
    pub present_start_time_us: u64,
    pub present_end_time_us: u64,
    pub driver_start_time_us: u64,
    pub driver_end_time_us: u64,
    pub gpu_render_start_time_us: u64,
    pub gpu_render_end_time_us: u64,
}

impl FrameTimings {
    /// `present_end - input_sample`, or `0` if either endpoint wasn't
    /// reported.
    pub fn total_latency_us(&self) -> u64 {
        Self::saturating_span(self.input_sample_time_us, self.present_end_time_us)
    }

    pub fn sim_time_us(&self) -> u64 {
        Self::saturating_span(self.sim_start_time_us, self.sim_end_time_us)
    }

    pub fn gpu_render_time_us(&self) -> u64 {
        Self::saturating_span(self.gpu_render_start_time_us, self.gpu_render_end_time_us)
    }

    pub fn driver_time_us(&self) -> u64 {
        Self::saturating_span(self.driver_start_time_us, self.driver_end_time_us)
    }

    fn saturating_span(start: u64, end: u64) -> u64 {
        if start == 0 || end == 0 {
            0
        } else {
            end.saturating_sub(start)
        }
    }
}
