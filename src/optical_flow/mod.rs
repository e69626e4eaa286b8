//! Hardware optical-flow session wrapper (spec.md §4.4).
//!
//! Grounded on spec.md §4.4 and, for its "thin session struct with a
//! `bind_*`/`execute` pair" shape, on `onca_ral_vulkan::descriptor`'s
//! descriptor-set-binding convention.

use std::collections::HashMap;

use ash::vk;

use crate::error::{Error, Result};
use crate::loader::DeviceDispatch;
use crate::logging::LogCategory;
use crate::{log_error, log_warning};

const LOG_CAT: LogCategory = LogCategory::new("OpticalFlow");

/// Binding points an optical-flow session exposes (spec.md §3).
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BindingPoint {
    Input,
    Reference,
    Hint,
    FlowVector,
    BackwardFlowVector,
    Cost,
    BackwardCost,
    GlobalFlow,
}

/// `output_grid` block size, one of 1, 2, 4, or 8 pixels per block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GridSize {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
}

/// Driver performance/quality hint for the estimation pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Performance {
    Slow,
    Medium,
    Fast,
}

/// Construction parameters for an optical-flow session (spec.md §3).
#[derive(Clone, Copy, Debug)]
pub struct OpticalFlowConfig {
    pub width: u32,
    pub height: u32,
    pub output_grid: GridSize,
    pub performance: Performance,
    pub bidirectional: bool,
    pub cost_enabled: bool,
}

impl OpticalFlowConfig {
    /// `ceil_div(width, grid) x ceil_div(height, grid)` (spec.md §4.6,
    /// §8 invariant 11).
    pub fn output_dimensions(&self) -> (u32, u32) {
        let grid = self.output_grid as u32;
        (ceil_div(self.width, grid), ceil_div(self.height, grid))
    }
}

fn ceil_div(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// A rectangular region of interest passed to [`OpticalFlowSession::execute`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// The only defined execute flag (spec.md §4.4).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ExecuteFlags {
    pub disable_temporal_hints: bool,
}

/// Thin wrapper around a driver-allocated optical-flow session (spec.md
/// §4.4, §3 "Optical-flow session").
pub struct OpticalFlowSession {
    device: vk::Device,
    handle: u64,
    config: OpticalFlowConfig,
    bindings: HashMap<BindingPoint, (vk::ImageView, vk::ImageLayout)>,
}

impl OpticalFlowSession {
    /// Creates a session for `config`. Fails with `ExtensionNotPresent`
    /// if the driver does not expose the extension.
    pub fn create(device: vk::Device, dispatch: &DeviceDispatch, config: OpticalFlowConfig) -> Result<Self> {
        let Some(create_fn) = dispatch.create_optical_flow_session_nv else {
            log_warning!(LOG_CAT, "create called without VK_NV_optical_flow support");
            return Err(Error::ExtensionNotPresent);
        };
        let info = OpticalFlowSessionCreateInfoRaw {
            width: config.width,
            height: config.height,
            output_grid: config.output_grid as u32,
            performance: config.performance as u32,
            bidirectional: config.bidirectional,
            cost_enabled: config.cost_enabled,
        };
        let mut handle: u64 = 0;
        let result = unsafe {
            create_fn(device, &info as *const _ as *const core::ffi::c_void, core::ptr::null(), &mut handle as *mut u64)
        };
        if result != vk::Result::SUCCESS {
            use crate::error::ToCrateError;
            let err = result.to_crate_error();
            log_error!(LOG_CAT, "session creation failed: {err}");
            return Err(err);
        }
        Ok(Self { device, handle, config, bindings: HashMap::new() })
    }

    pub fn config(&self) -> OpticalFlowConfig {
        self.config
    }

    /// Associates `view` with `binding_point` for the next [`Self::execute`]
    /// call (spec.md §4.4). Forwards the binding to the driver immediately
    /// when the entry point is resolved; always recorded locally so
    /// [`Self::execute`] can check required bindings regardless.
    pub fn bind_image(&mut self, dispatch: &DeviceDispatch, binding_point: BindingPoint, view: vk::ImageView, layout: vk::ImageLayout) {
        if let Some(bind_fn) = dispatch.bind_optical_flow_session_image_nv {
            let result = unsafe { bind_fn(self.device, self.handle, binding_point as u32, view, layout) };
            if result != vk::Result::SUCCESS {
                use crate::error::ToCrateError;
                log_error!(LOG_CAT, "bind_image({binding_point:?}) failed: {}", result.to_crate_error());
            }
        }
        self.bindings.insert(binding_point, (view, layout));
    }

    fn required_bindings(&self) -> Vec<BindingPoint> {
        let mut required = vec![BindingPoint::Input, BindingPoint::Reference, BindingPoint::FlowVector];
        if self.config.bidirectional {
            required.push(BindingPoint::BackwardFlowVector);
        }
        if self.config.cost_enabled {
            required.push(BindingPoint::Cost);
            if self.config.bidirectional {
                required.push(BindingPoint::BackwardCost);
            }
        }
        required
    }

    /// Records the estimation onto `cmd`. `regions == None` means "whole
    /// frame"; fails with `NotInitialized` if a required binding is unset
    /// (spec.md §3: "an unbound required binding → execute fails").
    pub fn execute(
        &self,
        dispatch: &DeviceDispatch,
        cmd: vk::CommandBuffer,
        regions: Option<&[Region]>,
        flags: ExecuteFlags,
    ) -> Result<()> {
        let Some(execute_fn) = dispatch.cmd_optical_flow_execute_nv else {
            return Err(Error::ExtensionNotPresent);
        };
        for required in self.required_bindings() {
            if !self.bindings.contains_key(&required) {
                log_error!(LOG_CAT, "execute called without binding {required:?}");
                return Err(Error::NotInitialized);
            }
        }
        let region_count = regions.map(|r| r.len()).unwrap_or(0) as u32;
        let region_ptr = regions.map(|r| r.as_ptr()).unwrap_or(core::ptr::null());
        let info = OpticalFlowExecuteInfoRaw {
            region_count,
            regions: region_ptr as *const core::ffi::c_void,
            disable_temporal_hints: flags.disable_temporal_hints,
        };
        unsafe { execute_fn(cmd, self.handle, &info as *const _ as *const core::ffi::c_void) };
        Ok(())
    }

    /// Releases the driver-allocated session.
    pub fn destroy(self, dispatch: &DeviceDispatch) {
        if let Some(destroy_fn) = dispatch.destroy_optical_flow_session_nv {
            unsafe { destroy_fn(self.device, self.handle, core::ptr::null()) };
        }
    }
}

#[repr(C)]
struct OpticalFlowSessionCreateInfoRaw {
    width: u32,
    height: u32,
    output_grid: u32,
    performance: u32,
    bidirectional: bool,
    cost_enabled: bool,
}

#[repr(C)]
struct OpticalFlowExecuteInfoRaw {
    region_count: u32,
    regions: *const core::ffi::c_void,
    disable_temporal_hints: bool,
}

#[cfg(test)]
mod test {
    use super::*;

    fn config() -> OpticalFlowConfig {
        OpticalFlowConfig {
            width: 1920,
            height: 1080,
            output_grid: GridSize::Four,
            performance: Performance::Fast,
            bidirectional: false,
            cost_enabled: false,
        }
    }

    #[test]
    fn invariant_11_output_dimensions_by_grid_size() {
        let mut cfg = config();
        cfg.output_grid = GridSize::Four;
        assert_eq!(cfg.output_dimensions(), (480, 270));
        cfg.output_grid = GridSize::Two;
        assert_eq!(cfg.output_dimensions(), (960, 540));
        cfg.output_grid = GridSize::Eight;
        assert_eq!(cfg.output_dimensions(), (240, 135));
    }

    #[test]
    fn create_without_extension_fails() {
        let dispatch = DeviceDispatch::default();
        let result = OpticalFlowSession::create(vk::Device::null(), &dispatch, config());
        assert_eq!(result.err(), Some(Error::ExtensionNotPresent));
    }

    #[test]
    fn bind_image_forwards_to_the_driver_when_resolved() {
        use core::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        unsafe extern "system" fn bind_stub(
            _device: vk::Device,
            _session: u64,
            _binding_point: u32,
            _view: vk::ImageView,
            _layout: vk::ImageLayout,
        ) -> vk::Result {
            CALLS.fetch_add(1, Ordering::SeqCst);
            vk::Result::SUCCESS
        }
        let dispatch = DeviceDispatch { bind_optical_flow_session_image_nv: Some(bind_stub), ..DeviceDispatch::default() };
        let mut session = OpticalFlowSession { device: vk::Device::null(), handle: 1, config: config(), bindings: HashMap::new() };

        session.bind_image(&dispatch, BindingPoint::Input, vk::ImageView::from_raw(7), vk::ImageLayout::GENERAL);

        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert_eq!(session.bindings.get(&BindingPoint::Input), Some(&(vk::ImageView::from_raw(7), vk::ImageLayout::GENERAL)));
    }

    #[test]
    fn bind_image_without_driver_entry_point_still_records_locally() {
        let dispatch = DeviceDispatch::default();
        let mut session = OpticalFlowSession { device: vk::Device::null(), handle: 1, config: config(), bindings: HashMap::new() };
        session.bind_image(&dispatch, BindingPoint::Reference, vk::ImageView::from_raw(9), vk::ImageLayout::GENERAL);
        assert!(session.bindings.contains_key(&BindingPoint::Reference));
    }
}
