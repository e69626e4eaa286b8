//! Dynamic driver loading and device-level extension dispatch table.
//!
//! Grounded on spec.md §4.1 and on `onca_ral_vulkan::instance::Instance`'s
//! entry/instance bring-up (the closest teacher analogue of "open the
//! platform GPU runtime and resolve entry points"), plus ash's own
//! `Entry::load()` (which itself wraps `libloading` to open the platform
//! Vulkan loader) for the shared-object-opening step.
//!
//! None of the platform GPU API's own object-creation (device, queue, image,
//! …) is this crate's concern (spec.md §1) — only resolving the small, fixed
//! set of vendor-extension entry points this crate calls through.

use core::ffi::{c_char, c_void, CStr};

use ash::vk;

use crate::error::{Error, Result};
use crate::logging::LogCategory;
use crate::{log_error, log_warning};

const LOG_CAT: LogCategory = LogCategory::new("Loader");

/// Function-pointer types for the vendor extension entry points this crate
/// resolves. These are declared by hand (rather than assumed to be present
/// in the `ash` version pinned in Cargo.toml) because they belong to
/// driver extensions ash may not yet wrap; the wire shapes of their
/// parameter structs are intentionally left as `*const c_void` /
/// `*mut c_void` here — building the real structs is the job of the
/// `low_latency`, `diagnostics`, and `optical_flow` modules, not the loader.
#[allow(non_camel_case_types)]
pub mod pfn {
    use super::*;

    pub type SetLatencySleepModeNv =
        unsafe extern "system" fn(device: vk::Device, swapchain: vk::SwapchainKHR, info: *const c_void) -> vk::Result;
    pub type LatencySleepNv =
        unsafe extern "system" fn(device: vk::Device, swapchain: vk::SwapchainKHR, info: *const c_void) -> vk::Result;
    pub type SetLatencyMarkerNv =
        unsafe extern "system" fn(device: vk::Device, swapchain: vk::SwapchainKHR, info: *const c_void);
    pub type GetLatencyTimingsNv = unsafe extern "system" fn(
        device: vk::Device,
        swapchain: vk::SwapchainKHR,
        timing_count: *mut u32,
        timings: *mut c_void,
    );

    pub type CmdSetCheckpointNv =
        unsafe extern "system" fn(command_buffer: vk::CommandBuffer, checkpoint_marker: *const c_void);
    pub type GetQueueCheckpointDataNv =
        unsafe extern "system" fn(queue: vk::Queue, checkpoint_data_count: *mut u32, checkpoint_data: *mut c_void);

    pub type CreateOpticalFlowSessionNv = unsafe extern "system" fn(
        device: vk::Device,
        create_info: *const c_void,
        allocator: *const c_void,
        session: *mut u64,
    ) -> vk::Result;
    pub type DestroyOpticalFlowSessionNv =
        unsafe extern "system" fn(device: vk::Device, session: u64, allocator: *const c_void);
    pub type BindOpticalFlowSessionImageNv = unsafe extern "system" fn(
        device: vk::Device,
        session: u64,
        binding_point: u32,
        view: vk::ImageView,
        layout: vk::ImageLayout,
    ) -> vk::Result;
    pub type CmdOpticalFlowExecuteNv = unsafe extern "system" fn(
        command_buffer: vk::CommandBuffer,
        session: u64,
        execute_info: *const c_void,
    );
}

/// Signature of the platform's `vkGetInstanceProcAddr`-equivalent.
pub type GetInstanceProcAddr =
    unsafe extern "system" fn(instance: vk::Instance, name: *const c_char) -> vk::PFN_vkVoidFunction;
/// Signature of the platform's `vkGetDeviceProcAddr`-equivalent.
pub type GetDeviceProcAddr =
    unsafe extern "system" fn(device: vk::Device, name: *const c_char) -> vk::PFN_vkVoidFunction;

/// Opens the platform GPU runtime shared object and resolves the base
/// `vkGetInstanceProcAddr`-equivalent symbol.
pub struct DriverLoader {
    _library: libloading::Library,
    get_instance_proc_addr: GetInstanceProcAddr,
}

impl DriverLoader {
    /// The platform shared-object names this crate knows how to try, in
    /// order. A host that already has its own loader can skip this and
    /// call [`DeviceDispatch::new`] directly with its own
    /// `get_device_proc_addr`.
    #[cfg(target_os = "windows")]
    const CANDIDATE_NAMES: &'static [&'static str] = &["vulkan-1.dll"];
    #[cfg(target_os = "macos")]
    const CANDIDATE_NAMES: &'static [&'static str] = &["libvulkan.dylib", "libMoltenVK.dylib"];
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    const CANDIDATE_NAMES: &'static [&'static str] = &["libvulkan.so.1", "libvulkan.so"];

    const ENTRY_SYMBOL: &'static [u8] = b"vkGetInstanceProcAddr\0";

    /// Opens the first candidate shared object found and resolves the base
    /// entry-point-resolution function.
    pub fn open() -> Result<Self> {
        let mut last_err = None;
        for name in Self::CANDIDATE_NAMES {
            match unsafe { libloading::Library::new(name) } {
                Ok(library) => {
                    let symbol = unsafe {
                        library.get::<GetInstanceProcAddr>(Self::ENTRY_SYMBOL)
                    };
                    match symbol {
                        Ok(sym) => {
                            let get_instance_proc_addr = *sym;
                            return Ok(Self { _library: library, get_instance_proc_addr });
                        }
                        Err(err) => {
                            log_error!(LOG_CAT, "{name} loaded but has no vkGetInstanceProcAddr: {err}");
                            return Err(Error::FunctionNotFound);
                        }
                    }
                }
                Err(err) => last_err = Some(err),
            }
        }
        if let Some(err) = last_err {
            log_error!(LOG_CAT, "could not open a GPU driver shared object: {err}");
        }
        Err(Error::LoaderError)
    }

    /// Resolves `name` against `instance`, or against the global
    /// entry-point set when `instance` is `None`.
    pub fn get_instance_proc(&self, instance: Option<vk::Instance>, name: &CStr) -> vk::PFN_vkVoidFunction {
        let instance = instance.unwrap_or(vk::Instance::null());
        unsafe { (self.get_instance_proc_addr)(instance, name.as_ptr()) }
    }
}

/// A resolved function pointer: `None` means the driver does not implement
/// that extension entry. Invariant (spec.md §3): once resolved, a `Some`
/// pointer is callable for the lifetime of the owning device.
type Slot<F> = Option<F>;

/// Device-level extension function pointers resolved once per device.
/// Created via [`DeviceDispatch::new`]; feature predicates are pure
/// conjunctions over the relevant pointer subset (spec.md §4.1).
#[derive(Default)]
pub struct DeviceDispatch {
    pub set_latency_sleep_mode_nv: Slot<pfn::SetLatencySleepModeNv>,
    pub latency_sleep_nv: Slot<pfn::LatencySleepNv>,
    pub set_latency_marker_nv: Slot<pfn::SetLatencyMarkerNv>,
    pub get_latency_timings_nv: Slot<pfn::GetLatencyTimingsNv>,

    pub cmd_set_checkpoint_nv: Slot<pfn::CmdSetCheckpointNv>,
    pub get_queue_checkpoint_data_nv: Slot<pfn::GetQueueCheckpointDataNv>,

    pub create_optical_flow_session_nv: Slot<pfn::CreateOpticalFlowSessionNv>,
    pub destroy_optical_flow_session_nv: Slot<pfn::DestroyOpticalFlowSessionNv>,
    pub bind_optical_flow_session_image_nv: Slot<pfn::BindOpticalFlowSessionImageNv>,
    pub cmd_optical_flow_execute_nv: Slot<pfn::CmdOpticalFlowExecuteNv>,
}

macro_rules! resolve {
    ($device:expr, $get_proc:expr, $name:literal, $ty:ty) => {{
        let cname = concat!($name, "\0");
        let ptr = unsafe { $get_proc($device, cname.as_ptr() as *const c_char) };
        ptr.map(|f| unsafe { core::mem::transmute::<unsafe extern "system" fn(), $ty>(f) })
    }};
}

impl DeviceDispatch {
    /// Resolves the fixed list of device-level extension entry points for
    /// `device` using the host-supplied `get_device_proc_addr`. Missing
    /// names simply resolve to `None` — this never fails (spec.md §4.1:
    /// "only construction [of the loader itself] can fail").
    pub fn new(device: vk::Device, get_device_proc_addr: GetDeviceProcAddr) -> Self {
        let mut table = Self::default();

        table.set_latency_sleep_mode_nv =
            resolve!(device, get_device_proc_addr, "vkSetLatencySleepModeNV", pfn::SetLatencySleepModeNv);
        table.latency_sleep_nv = resolve!(device, get_device_proc_addr, "vkLatencySleepNV", pfn::LatencySleepNv);
        table.set_latency_marker_nv =
            resolve!(device, get_device_proc_addr, "vkSetLatencyMarkerNV", pfn::SetLatencyMarkerNv);
        table.get_latency_timings_nv =
            resolve!(device, get_device_proc_addr, "vkGetLatencyTimingsNV", pfn::GetLatencyTimingsNv);

        table.cmd_set_checkpoint_nv =
            resolve!(device, get_device_proc_addr, "vkCmdSetCheckpointNV", pfn::CmdSetCheckpointNv);
        table.get_queue_checkpoint_data_nv = resolve!(
            device,
            get_device_proc_addr,
            "vkGetQueueCheckpointData2NV",
            pfn::GetQueueCheckpointDataNv
        );

        table.create_optical_flow_session_nv = resolve!(
            device,
            get_device_proc_addr,
            "vkCreateOpticalFlowSessionNV",
            pfn::CreateOpticalFlowSessionNv
        );
        table.destroy_optical_flow_session_nv = resolve!(
            device,
            get_device_proc_addr,
            "vkDestroyOpticalFlowSessionNV",
            pfn::DestroyOpticalFlowSessionNv
        );
        table.bind_optical_flow_session_image_nv = resolve!(
            device,
            get_device_proc_addr,
            "vkBindOpticalFlowSessionImageNV",
            pfn::BindOpticalFlowSessionImageNv
        );
        table.cmd_optical_flow_execute_nv = resolve!(
            device,
            get_device_proc_addr,
            "vkCmdOpticalFlowExecuteNV",
            pfn::CmdOpticalFlowExecuteNv
        );

        if !table.has_low_latency_2() {
            log_warning!(LOG_CAT, "VK_NV_low_latency2 entry points not fully resolved for this device");
        }
        if !table.has_optical_flow() {
            log_warning!(LOG_CAT, "VK_NV_optical_flow entry points not fully resolved for this device");
        }

        table
    }

    /// Conjunction over every pointer the low-latency context needs.
    pub fn has_low_latency_2(&self) -> bool {
        self.set_latency_sleep_mode_nv.is_some()
            && self.latency_sleep_nv.is_some()
            && self.set_latency_marker_nv.is_some()
            && self.get_latency_timings_nv.is_some()
    }

    /// Conjunction over every pointer the diagnostics context needs.
    pub fn has_diagnostic_checkpoints(&self) -> bool {
        self.cmd_set_checkpoint_nv.is_some() && self.get_queue_checkpoint_data_nv.is_some()
    }

    /// Conjunction over every pointer the optical-flow session needs.
    pub fn has_optical_flow(&self) -> bool {
        self.create_optical_flow_session_nv.is_some()
            && self.destroy_optical_flow_session_nv.is_some()
            && self.bind_optical_flow_session_image_nv.is_some()
            && self.cmd_optical_flow_execute_nv.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_dispatch_table_has_no_feature() {
        let table = DeviceDispatch::default();
        assert!(!table.has_low_latency_2());
        assert!(!table.has_diagnostic_checkpoints());
        assert!(!table.has_optical_flow());
    }

    // `DeviceDispatch::new` requires a live `vkGetDeviceProcAddr`, which
    // needs a real driver; constructing one is an integration concern for
    // the host, not something this crate's unit tests can exercise without
    // a GPU. The predicate conjunctions above are what's load-bearing here
    // and are fully exercised without a driver.
}
