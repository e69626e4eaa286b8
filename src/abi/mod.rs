//! C-ABI façade: a flat set of stable extern functions and plain-old-data
//! structs wrapping every public operation of [`crate::low_latency`] and
//! [`crate::diagnostics`] (spec.md §4.10, §6).
//!
//! Grounded on spec.md §4.10/§6 and, for the "allocate an opaque handle box,
//! hand the host a raw pointer, free it on an explicit destroy call" shape,
//! on `onca_ral_vulkan::lib.rs`'s `extern "C" fn create_ral`/`destroy_ral`
//! pair — generalized here to the full low-latency/diagnostics function
//! list rather than a single plugin entry point. The process-wide default
//! allocator backing these boxes is `Box`'s global allocator; no custom
//! allocator is introduced (spec.md §1 non-goal, §9 re-architecture note:
//! "this maps to a process-wide state with `init` on first handle, teardown
//! at process exit; do not make it visible to the internal API" — satisfied
//! here by never exposing `Box`/allocation details outside this module).
//!
//! Construction operations ([`ll_init`], [`diag_init`]) return a null
//! pointer when the relevant extension is not present on the device,
//! per spec.md §7: "construction operations return optional/nullable;
//! absent extension → null handle; the caller must check."

use core::ffi::{c_char, CStr};

use ash::vk;

use crate::diagnostics::{CheckpointTag, DiagnosticsContext};
use crate::error::Error;
use crate::loader::{DeviceDispatch, GetDeviceProcAddr};
use crate::low_latency::{FrameTimings, LowLatencyContext, Marker, ModeConfig};

/// Flat result code mirrored at the C boundary (spec.md §6).
#[repr(i32)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CResult {
    Success = 0,
    NotSupported = -1,
    InvalidHandle = -2,
    OutOfMemory = -3,
    DeviceLost = -4,
    Unknown = -5,
}

impl From<Error> for CResult {
    fn from(err: Error) -> Self {
        match err {
            Error::ExtensionNotPresent => CResult::NotSupported,
            Error::InvalidHandle => CResult::InvalidHandle,
            Error::OutOfHostMemory | Error::OutOfDeviceMemory => CResult::OutOfMemory,
            Error::DeviceLost => CResult::DeviceLost,
            Error::InsufficientFrames
            | Error::NotInitialized
            | Error::InitializationFailed
            | Error::MemoryMapFailed
            | Error::FormatNotSupported
            | Error::FragmentedPool
            | Error::SurfaceLost
            | Error::NativeWindowInUse
            | Error::OutOfDate
            | Error::LoaderError
            | Error::FunctionNotFound
            | Error::ParseError
            | Error::Unknown => CResult::Unknown,
        }
    }
}

/// Opaque handle embedding a [`LowLatencyContext`] plus the device dispatch
/// table it calls through (spec.md §4.10: "allocates per-context opaque
/// handles"). Never exposed by value across the C boundary — only as a raw
/// pointer returned by [`ll_init`].
pub struct LowLatencyHandle {
    ctx: LowLatencyContext,
    dispatch: DeviceDispatch,
}

/// Opaque handle embedding a [`DiagnosticsContext`] plus its dispatch table.
pub struct DiagnosticsHandle {
    ctx: DiagnosticsContext,
    dispatch: DeviceDispatch,
}

// -- Low-latency (L2) --

/// Resolves the device dispatch table and, if `VK_NV_low_latency2`-
/// equivalent entry points are present, allocates an [`LowLatencyHandle`].
/// Returns null otherwise; the caller must check.
#[no_mangle]
pub extern "C" fn ll_init(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    get_device_proc_addr: GetDeviceProcAddr,
) -> *mut LowLatencyHandle {
    let dispatch = DeviceDispatch::new(device, get_device_proc_addr);
    if !dispatch.has_low_latency_2() {
        return core::ptr::null_mut();
    }
    let ctx = LowLatencyContext::new(device, swapchain);
    Box::into_raw(Box::new(LowLatencyHandle { ctx, dispatch }))
}

/// Frees a handle returned by [`ll_init`]. No-op on null.
#[no_mangle]
pub extern "C" fn ll_destroy(handle: *mut LowLatencyHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

#[no_mangle]
pub extern "C" fn ll_is_supported(handle: *mut LowLatencyHandle) -> bool {
    match unsafe { handle.as_ref() } {
        Some(h) => h.ctx.is_supported(&h.dispatch),
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn ll_enable(handle: *mut LowLatencyHandle, boost: bool, min_interval_us: u64) -> CResult {
    let Some(h) = (unsafe { handle.as_mut() }) else { return CResult::InvalidHandle };
    let mode = ModeConfig { enabled: true, boost, minimum_interval_us: min_interval_us };
    h.ctx.set_mode(&h.dispatch, mode).map_or_else(CResult::from, |()| CResult::Success)
}

#[no_mangle]
pub extern "C" fn ll_disable(handle: *mut LowLatencyHandle) -> CResult {
    let Some(h) = (unsafe { handle.as_mut() }) else { return CResult::InvalidHandle };
    let mode = ModeConfig { enabled: false, boost: false, minimum_interval_us: 0 };
    h.ctx.set_mode(&h.dispatch, mode).map_or_else(CResult::from, |()| CResult::Success)
}

#[no_mangle]
pub extern "C" fn ll_sleep(handle: *mut LowLatencyHandle, semaphore: vk::Semaphore, value: u64) -> CResult {
    let Some(h) = (unsafe { handle.as_ref() }) else { return CResult::InvalidHandle };
    h.ctx.sleep(&h.dispatch, semaphore, value).map_or_else(CResult::from, |()| CResult::Success)
}

/// Stamps `marker_enum` at the current present ID. Silent no-op for a null
/// handle or an unrecognized marker value (spec.md §7: marker-stamping
/// never fails).
#[no_mangle]
pub extern "C" fn ll_set_marker(handle: *mut LowLatencyHandle, marker_enum: u32) {
    let Some(h) = (unsafe { handle.as_ref() }) else { return };
    if let Some(marker) = Marker::from_u32(marker_enum) {
        h.ctx.set_marker(&h.dispatch, marker);
    }
}

#[no_mangle]
pub extern "C" fn ll_mark_input_sample(handle: *mut LowLatencyHandle) {
    if let Some(h) = unsafe { handle.as_ref() } {
        h.ctx.mark_input_sample(&h.dispatch);
    }
}

/// Two-call pattern (spec.md §4.2): pass `out = null` / `max = 0` to read
/// the available count, then call again with a caller-owned buffer of at
/// least that many [`FrameTimings`] records.
#[no_mangle]
pub extern "C" fn ll_get_timings(handle: *mut LowLatencyHandle, out: *mut FrameTimings, max: u32) -> u32 {
    let Some(h) = (unsafe { handle.as_mut() }) else { return 0 };
    if out.is_null() || max == 0 {
        h.ctx.get_timings(&h.dispatch, None)
    } else {
        let buf = unsafe { core::slice::from_raw_parts_mut(out, max as usize) };
        h.ctx.get_timings(&h.dispatch, Some(buf))
    }
}

#[no_mangle]
pub extern "C" fn ll_get_current_frame_id(handle: *mut LowLatencyHandle) -> u64 {
    match unsafe { handle.as_ref() } {
        Some(h) => h.ctx.current_frame_id(),
        None => 0,
    }
}

#[no_mangle]
pub extern "C" fn ll_begin_frame(handle: *mut LowLatencyHandle) -> u64 {
    match unsafe { handle.as_mut() } {
        Some(h) => h.ctx.begin_frame(&h.dispatch),
        None => 0,
    }
}

macro_rules! ll_marker_fn {
    ($name:ident, $method:ident) => {
        #[no_mangle]
        pub extern "C" fn $name(handle: *mut LowLatencyHandle) {
            if let Some(h) = unsafe { handle.as_ref() } {
                h.ctx.$method(&h.dispatch);
            }
        }
    };
}

ll_marker_fn!(ll_end_simulation, end_simulation);
ll_marker_fn!(ll_begin_render_submit, begin_render_submit);
ll_marker_fn!(ll_end_render_submit, end_render_submit);
ll_marker_fn!(ll_begin_present, begin_present);
ll_marker_fn!(ll_end_present, end_present);
ll_marker_fn!(ll_trigger_flash, trigger_flash);

// -- Diagnostics --

#[no_mangle]
pub extern "C" fn diag_init(device: vk::Device, get_device_proc_addr: GetDeviceProcAddr) -> *mut DiagnosticsHandle {
    let dispatch = DeviceDispatch::new(device, get_device_proc_addr);
    if !dispatch.has_diagnostic_checkpoints() {
        return core::ptr::null_mut();
    }
    let ctx = DiagnosticsContext::new(device);
    Box::into_raw(Box::new(DiagnosticsHandle { ctx, dispatch }))
}

#[no_mangle]
pub extern "C" fn diag_destroy(handle: *mut DiagnosticsHandle) {
    if !handle.is_null() {
        drop(unsafe { Box::from_raw(handle) });
    }
}

#[no_mangle]
pub extern "C" fn diag_is_supported(handle: *mut DiagnosticsHandle) -> bool {
    match unsafe { handle.as_ref() } {
        Some(h) => h.ctx.is_supported(&h.dispatch),
        None => false,
    }
}

#[no_mangle]
pub extern "C" fn diag_set_checkpoint(handle: *mut DiagnosticsHandle, cmd: vk::CommandBuffer, marker_ptr: usize) {
    if let Some(h) = unsafe { handle.as_ref() } {
        h.ctx.set_checkpoint(&h.dispatch, cmd, marker_ptr);
    }
}

/// Encodes `tag_enum` into a pointer-sized integer and stamps it. Falls
/// back to stamping the raw integer directly when `tag_enum` does not
/// decode to a known [`CheckpointTag`] (spec.md §7: marker-stamping never
/// fails).
#[no_mangle]
pub extern "C" fn diag_set_tagged_checkpoint(handle: *mut DiagnosticsHandle, cmd: vk::CommandBuffer, tag_enum: u32) {
    let Some(h) = (unsafe { handle.as_ref() }) else { return };
    match CheckpointTag::from_ptr(tag_enum as usize) {
        Some(tag) => h.ctx.set_tagged_checkpoint(&h.dispatch, cmd, tag),
        None => h.ctx.set_checkpoint(&h.dispatch, cmd, tag_enum as usize),
    }
}

// -- Info --

/// This library's own version, packed as `(major<<16)|(minor<<8)|patch`
/// (spec.md §4.10) — not the driver's version, which is obtained via
/// [`crate::version::DriverVersion`] from host-supplied text.
#[no_mangle]
pub extern "C" fn get_version() -> u32 {
    const MAJOR: u32 = 0;
    const MINOR: u32 = 1;
    const PATCH: u32 = 0;
    (MAJOR << 16) | (MINOR << 8) | PATCH
}

/// Every extension this crate wraps (`VK_NV_low_latency2`,
/// `VK_NV_device_diagnostic_checkpoints`, `VK_NV_optical_flow`) is an
/// NVIDIA vendor extension; there is no cross-vendor path (spec.md §1
/// non-goal: "portable cross-vendor abstraction").
#[no_mangle]
pub extern "C" fn is_nvidia_gpu() -> bool {
    true
}

const LOW_LATENCY_2_EXTENSION_NAME: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_NV_low_latency2\0") };
const DIAGNOSTIC_CHECKPOINTS_EXTENSION_NAME: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_NV_device_diagnostic_checkpoints\0") };
const OPTICAL_FLOW_EXTENSION_NAME: &CStr =
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_NV_optical_flow\0") };

/// Stable, zero-terminated UTF-8 pointer whose lifetime equals that of the
/// library (spec.md §4.10).
#[no_mangle]
pub extern "C" fn get_low_latency_2_extension_name() -> *const c_char {
    LOW_LATENCY_2_EXTENSION_NAME.as_ptr()
}

#[no_mangle]
pub extern "C" fn get_diagnostic_checkpoints_extension_name() -> *const c_char {
    DIAGNOSTIC_CHECKPOINTS_EXTENSION_NAME.as_ptr()
}

#[no_mangle]
pub extern "C" fn get_optical_flow_extension_name() -> *const c_char {
    OPTICAL_FLOW_EXTENSION_NAME.as_ptr()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn result_values_match_spec_section_6() {
        assert_eq!(CResult::Success as i32, 0);
        assert_eq!(CResult::NotSupported as i32, -1);
        assert_eq!(CResult::InvalidHandle as i32, -2);
        assert_eq!(CResult::OutOfMemory as i32, -3);
        assert_eq!(CResult::DeviceLost as i32, -4);
        assert_eq!(CResult::Unknown as i32, -5);
    }

    #[test]
    fn error_conversion_maps_extension_not_present_to_not_supported() {
        assert_eq!(CResult::from(Error::ExtensionNotPresent), CResult::NotSupported);
        assert_eq!(CResult::from(Error::DeviceLost), CResult::DeviceLost);
        assert_eq!(CResult::from(Error::OutOfHostMemory), CResult::OutOfMemory);
        assert_eq!(CResult::from(Error::InvalidHandle), CResult::InvalidHandle);
    }

    #[test]
    fn ll_init_without_supported_dispatch_returns_null() {
        unsafe extern "system" fn never_resolves(
            _device: vk::Device,
            _name: *const c_char,
        ) -> vk::PFN_vkVoidFunction {
            None
        }
        let handle = ll_init(vk::Device::null(), vk::SwapchainKHR::null(), never_resolves);
        assert!(handle.is_null());
    }

    #[test]
    fn null_handle_operations_report_invalid_handle_or_defaults() {
        let null: *mut LowLatencyHandle = core::ptr::null_mut();
        assert_eq!(ll_enable(null, false, 0), CResult::InvalidHandle);
        assert_eq!(ll_disable(null), CResult::InvalidHandle);
        assert_eq!(ll_sleep(null, vk::Semaphore::null(), 0), CResult::InvalidHandle);
        assert_eq!(ll_get_current_frame_id(null), 0);
        assert_eq!(ll_begin_frame(null), 0);
        assert_eq!(ll_get_timings(null, core::ptr::null_mut(), 0), 0);
        assert!(!ll_is_supported(null));
        // Markers and destroy on a null handle must not panic.
        ll_set_marker(null, Marker::SimStart as u32);
        ll_mark_input_sample(null);
        ll_end_simulation(null);
        ll_destroy(null);

        let null_diag: *mut DiagnosticsHandle = core::ptr::null_mut();
        assert!(!diag_is_supported(null_diag));
        diag_set_checkpoint(null_diag, vk::CommandBuffer::null(), 0);
        diag_set_tagged_checkpoint(null_diag, vk::CommandBuffer::null(), 0x1000);
        diag_destroy(null_diag);
    }

    #[test]
    fn extension_name_accessors_return_non_null_c_strings() {
        unsafe {
            assert_eq!(CStr::from_ptr(get_low_latency_2_extension_name()).to_str().unwrap(), "VK_NV_low_latency2");
            assert_eq!(
                CStr::from_ptr(get_diagnostic_checkpoints_extension_name()).to_str().unwrap(),
                "VK_NV_device_diagnostic_checkpoints"
            );
            assert_eq!(CStr::from_ptr(get_optical_flow_extension_name()).to_str().unwrap(), "VK_NV_optical_flow");
        }
    }

    #[test]
    fn get_version_matches_cargo_package_version() {
        assert_eq!(get_version(), (0 << 16) | (1 << 8) | 0);
    }

    #[test]
    fn is_nvidia_gpu_is_true() {
        assert!(is_nvidia_gpu());
    }

    #[test]
    fn round_trip_through_a_live_handle_with_a_stub_dispatch() {
        // Exercises the full ll_init -> ... -> ll_destroy lifecycle against
        // a dispatch that resolves every low-latency-2 entry point to a
        // no-op stub, mirroring how a host would drive this surface.
        unsafe extern "system" fn set_mode_stub(
            _device: vk::Device,
            _swapchain: vk::SwapchainKHR,
            _info: *const core::ffi::c_void,
        ) -> vk::Result {
            vk::Result::SUCCESS
        }
        unsafe extern "system" fn sleep_stub(
            _device: vk::Device,
            _swapchain: vk::SwapchainKHR,
            _info: *const core::ffi::c_void,
        ) -> vk::Result {
            vk::Result::SUCCESS
        }
        unsafe extern "system" fn marker_stub(
            _device: vk::Device,
            _swapchain: vk::SwapchainKHR,
            _info: *const core::ffi::c_void,
        ) {
        }
        unsafe extern "system" fn timings_stub(
            _device: vk::Device,
            _swapchain: vk::SwapchainKHR,
            count: *mut u32,
            _timings: *mut core::ffi::c_void,
        ) {
            unsafe { *count = 0 };
        }

        let mut handle = Box::new(LowLatencyHandle {
            ctx: LowLatencyContext::new(vk::Device::null(), vk::SwapchainKHR::null()),
            dispatch: DeviceDispatch {
                set_latency_sleep_mode_nv: Some(set_mode_stub),
                latency_sleep_nv: Some(sleep_stub),
                set_latency_marker_nv: Some(marker_stub),
                get_latency_timings_nv: Some(timings_stub),
                ..DeviceDispatch::default()
            },
        });
        let ptr: *mut LowLatencyHandle = &mut *handle;

        assert!(ll_is_supported(ptr));
        assert_eq!(ll_enable(ptr, true, 0), CResult::Success);
        assert_eq!(ll_begin_frame(ptr), 1);
        ll_mark_input_sample(ptr);
        ll_end_simulation(ptr);
        ll_begin_render_submit(ptr);
        ll_end_render_submit(ptr);
        ll_begin_present(ptr);
        ll_end_present(ptr);
        assert_eq!(ll_get_current_frame_id(ptr), 1);
        assert_eq!(ll_sleep(ptr, vk::Semaphore::null(), 1), CResult::Success);
        assert_eq!(ll_get_timings(ptr, core::ptr::null_mut(), 0), 0);

        // `handle` is stack-owned here (not allocated via `ll_init`), so it
        // is dropped normally rather than through `ll_destroy`.
    }
}
