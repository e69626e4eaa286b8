//! Thread-safe wrapper around [`super::LowLatencyContext`].
//!
//! Grounded on spec.md §4.2 "Thread-safety" and §5: "a wrapper variant
//! takes an internal mutex and exposes exactly the same operations under
//! exclusive lock". Uses `parking_lot`, already part of the teacher's own
//! dependency stack (`onca_common`).

use ash::vk;
use parking_lot::Mutex;

use super::{FrameTimings, LatencyStats, LowLatencyContext, Marker, ModeConfig, PresentId};
use crate::error::Result;
use crate::loader::DeviceDispatch;

/// Serializes every public operation of [`LowLatencyContext`] behind a
/// mutex. The unwrapped context is not required to be safe for concurrent
/// access; this wrapper is for hosts that share one context across
/// threads.
pub struct ThreadSafeLowLatencyContext {
    inner: Mutex<LowLatencyContext>,
}

impl ThreadSafeLowLatencyContext {
    pub fn new(device: vk::Device, swapchain: vk::SwapchainKHR) -> Self {
        Self { inner: Mutex::new(LowLatencyContext::new(device, swapchain)) }
    }

    pub fn is_supported(&self, dispatch: &DeviceDispatch) -> bool {
        self.inner.lock().is_supported(dispatch)
    }

    pub fn current_frame_id(&self) -> PresentId {
        self.inner.lock().current_frame_id()
    }

    pub fn mode(&self) -> ModeConfig {
        self.inner.lock().mode()
    }

    pub fn set_mode(&self, dispatch: &DeviceDispatch, mode: ModeConfig) -> Result<()> {
        self.inner.lock().set_mode(dispatch, mode)
    }

    pub fn sleep(&self, dispatch: &DeviceDispatch, semaphore: vk::Semaphore, value: u64) -> Result<()> {
        self.inner.lock().sleep(dispatch, semaphore, value)
    }

    pub fn set_marker(&self, dispatch: &DeviceDispatch, marker: Marker) {
        self.inner.lock().set_marker(dispatch, marker)
    }

    pub fn begin_frame(&self, dispatch: &DeviceDispatch) -> PresentId {
        self.inner.lock().begin_frame(dispatch)
    }

    pub fn end_simulation(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().end_simulation(dispatch)
    }

    pub fn begin_render_submit(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().begin_render_submit(dispatch)
    }

    pub fn end_render_submit(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().end_render_submit(dispatch)
    }

    pub fn begin_present(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().begin_present(dispatch)
    }

    pub fn end_present(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().end_present(dispatch)
    }

    pub fn mark_input_sample(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().mark_input_sample(dispatch)
    }

    pub fn trigger_flash(&self, dispatch: &DeviceDispatch) {
        self.inner.lock().trigger_flash(dispatch)
    }

    pub fn get_timings(&self, dispatch: &DeviceDispatch, out: Option<&mut [FrameTimings]>) -> u32 {
        self.inner.lock().get_timings(dispatch, out)
    }

    /// Copies out the current rolling latency statistics.
    pub fn with_latency_stats<R>(&self, f: impl FnOnce(&LatencyStats) -> R) -> R {
        f(self.inner.lock().latency_stats())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loader::DeviceDispatch;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_begin_frame_calls_are_serialized_and_monotone() {
        let ctx = Arc::new(ThreadSafeLowLatencyContext::new(vk::Device::null(), vk::SwapchainKHR::null()));
        let dispatch = Arc::new(DeviceDispatch::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ctx = Arc::clone(&ctx);
            let dispatch = Arc::clone(&dispatch);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    ctx.begin_frame(&dispatch);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ctx.current_frame_id(), 8 * 50);
    }
}
