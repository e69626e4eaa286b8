//! Per-swapchain low-latency context (L2): the runtime described in
//! spec.md §4.2.
//!
//! Grounded on spec.md §4.2 and, for the "block until the driver signals a
//! timeline sync object" shape of [`LowLatencyContext::sleep`], on
//! `onca_ral_vulkan::fence::Fence`'s timeline-semaphore handling — the
//! closest the teacher crate gets to "a GPU-side signal the caller waits
//! on asynchronously".

mod pacer;
mod stats;
mod threadsafe;
mod timing;

pub use pacer::{FramePacer, ModeConfig};
pub use stats::LatencyStats;
pub use threadsafe::ThreadSafeLowLatencyContext;
pub use timing::{FrameTimings, Marker, PresentId};

use ash::vk;

use crate::error::{Error, Result};
use crate::loader::DeviceDispatch;
use crate::logging::LogCategory;
use crate::{log_error, log_verbose, log_warning};

const LOG_CAT: LogCategory = LogCategory::new("LowLatency");

/// Per-swapchain state machine driving input→display latency reduction
/// (spec.md §4.2). Single-producer per swapchain; not `Sync` — see
/// [`ThreadSafeLowLatencyContext`] for a wrapped variant that is.
pub struct LowLatencyContext {
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    mode: ModeConfig,
    current_present_id: PresentId,
    stats: LatencyStats,
}

impl LowLatencyContext {
    pub fn new(device: vk::Device, swapchain: vk::SwapchainKHR) -> Self {
        Self {
            device,
            swapchain,
            mode: ModeConfig::default(),
            current_present_id: 0,
            stats: LatencyStats::new(),
        }
    }

    /// Conjunction over the pointers this context needs, per spec.md §4.1.
    pub fn is_supported(&self, dispatch: &DeviceDispatch) -> bool {
        dispatch.has_low_latency_2()
    }

    pub fn current_frame_id(&self) -> PresentId {
        self.current_present_id
    }

    pub fn mode(&self) -> ModeConfig {
        self.mode
    }

    pub fn latency_stats(&self) -> &LatencyStats {
        &self.stats
    }

    /// Submits `mode` to the driver. Stores it in the context on success.
    pub fn set_mode(&mut self, dispatch: &DeviceDispatch, mode: ModeConfig) -> Result<()> {
        let Some(set_mode) = dispatch.set_latency_sleep_mode_nv else {
            log_warning!(LOG_CAT, "set_mode called without VK_NV_low_latency2 support");
            return Err(Error::ExtensionNotPresent);
        };
        // The real wire struct (VkLatencySleepModeInfoNV-equivalent) is
        // built here from `mode`; its exact layout is part of the driver
        // extension contract and is out of this crate's documented scope
        // (spec.md §1) beyond the fields spec.md §3 names.
        let info = LatencySleepModeInfoRaw { low_latency_mode: mode.enabled, low_latency_boost: mode.boost, minimum_interval_us: mode.minimum_interval_us };
        let result = unsafe { set_mode(self.device, self.swapchain, &info as *const _ as *const core::ffi::c_void) };
        if result == vk::Result::SUCCESS {
            self.mode = mode;
            Ok(())
        } else {
            use crate::error::ToCrateError;
            let err = result.to_crate_error();
            log_error!(LOG_CAT, "set_mode failed: {err}");
            Err(err)
        }
    }

    /// Requests the driver to signal `semaphore` at `value` at the optimal
    /// frame-start instant. Does not itself block the CPU thread — the
    /// driver schedules a GPU-side signal (spec.md §4.2, §5).
    pub fn sleep(&self, dispatch: &DeviceDispatch, semaphore: vk::Semaphore, value: u64) -> Result<()> {
        let Some(sleep_fn) = dispatch.latency_sleep_nv else {
            return Err(Error::ExtensionNotPresent);
        };
        let info = LatencySleepInfoRaw { signal_semaphore: semaphore, value };
        let result = unsafe { sleep_fn(self.device, self.swapchain, &info as *const _ as *const core::ffi::c_void) };
        if result == vk::Result::SUCCESS {
            Ok(())
        } else {
            use crate::error::ToCrateError;
            Err(result.to_crate_error())
        }
    }

    /// Stamps `marker` at the current present ID. Silent no-op if the
    /// extension is absent (spec.md §4.2, §7 propagation policy: marker
    /// stamping never fails).
    pub fn set_marker(&self, dispatch: &DeviceDispatch, marker: Marker) {
        let Some(set_marker) = dispatch.set_latency_marker_nv else {
            log_verbose!(LOG_CAT, "set_marker({marker:?}) ignored: extension not present");
            return;
        };
        let info = LatencyMarkerInfoRaw { present_id: self.current_present_id, marker: marker as u32 };
        unsafe { set_marker(self.device, self.swapchain, &info as *const _ as *const core::ffi::c_void) };
    }

    /// Advances the present-ID counter by one and stamps `SimStart`.
    /// Invariant 1: strictly increases by 1; returns the new value.
    pub fn begin_frame(&mut self, dispatch: &DeviceDispatch) -> PresentId {
        self.current_present_id += 1;
        self.set_marker(dispatch, Marker::SimStart);
        self.current_present_id
    }

    pub fn end_simulation(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::SimEnd);
    }

    pub fn begin_render_submit(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::RenderSubmitStart);
    }

    pub fn end_render_submit(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::RenderSubmitEnd);
    }

    pub fn begin_present(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::PresentStart);
    }

    pub fn end_present(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::PresentEnd);
    }

    pub fn mark_input_sample(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::InputSample);
    }

    pub fn trigger_flash(&self, dispatch: &DeviceDispatch) {
        self.set_marker(dispatch, Marker::TriggerFlash);
    }

    /// Two-call pattern: pass `out = None` to get the available count,
    /// then call again with a caller-owned buffer of at least that length.
    /// Each retrieved [`FrameTimings`] record is folded into
    /// [`Self::latency_stats`] when it carries a usable `total_latency_us`.
    pub fn get_timings(&mut self, dispatch: &DeviceDispatch, out: Option<&mut [FrameTimings]>) -> u32 {
        let Some(get_timings) = dispatch.get_latency_timings_nv else {
            return 0;
        };
        let mut count: u32 = match &out {
            Some(buf) => buf.len() as u32,
            None => 0,
        };
        let ptr = match out {
            Some(buf) => buf.as_mut_ptr(),
            None => core::ptr::null_mut(),
        };
        unsafe {
            get_timings(
                self.device,
                self.swapchain,
                &mut count as *mut u32,
                ptr as *mut core::ffi::c_void,
            )
        };
        if !ptr.is_null() {
            let filled = unsafe { core::slice::from_raw_parts(ptr, count as usize) };
            for timing in filled {
                let latency = timing.total_latency_us();
                if latency != 0 {
                    self.stats.insert(latency);
                }
            }
        }
        count
    }
}

#[repr(C)]
struct LatencySleepModeInfoRaw {
    low_latency_mode: bool,
    low_latency_boost: bool,
    minimum_interval_us: u64,
}

#[repr(C)]
struct LatencySleepInfoRaw {
    signal_semaphore: vk::Semaphore,
    value: u64,
}

#[repr(C)]
struct LatencyMarkerInfoRaw {
    present_id: u64,
    marker: u32,
}
