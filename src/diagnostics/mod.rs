//! Per-device diagnostics context: command-buffer checkpoints and
//! post-device-lost crash dumps (spec.md §4.3).
//!
//! Grounded on spec.md §4.3 and §9's explicit re-architecture note on the
//! opaque-pointer-as-tag pattern; the checkpoint/queue shape otherwise
//! mirrors `onca_ral_vulkan::fence::Fence`'s "borrow the device, never own
//! its handle" convention.

mod tag;

pub use tag::{CheckpointTag, PipelineStage};

use core::ffi::c_void;
use std::path::Path;
use std::time::SystemTime;

use ash::vk;

use crate::error::Result;
use crate::loader::DeviceDispatch;
use crate::logging::LogCategory;
use crate::{log_error, log_verbose};

const LOG_CAT: LogCategory = LogCategory::new("Diagnostics");

/// A single checkpoint recovered after device loss (spec.md §3
/// "Checkpoint data").
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CheckpointData {
    pub pipeline_stage: PipelineStage,
    pub marker_pointer: usize,
    pub tag: Option<CheckpointTag>,
}

impl CheckpointData {
    fn from_raw(stage_flags: u32, marker_pointer: usize) -> Self {
        Self {
            pipeline_stage: PipelineStage::from_flags(stage_flags),
            marker_pointer,
            tag: CheckpointTag::from_ptr(marker_pointer),
        }
    }
}

#[repr(C)]
struct CheckpointDataRaw {
    stage_flags: u32,
    marker_pointer: *const c_void,
}

/// Per-device wrapper that inserts GPU-visible checkpoints and retrieves
/// them after a device-lost event (spec.md §4.3).
pub struct DiagnosticsContext {
    device: vk::Device,
}

impl DiagnosticsContext {
    pub fn new(device: vk::Device) -> Self {
        Self { device }
    }

    pub fn is_supported(&self, dispatch: &DeviceDispatch) -> bool {
        dispatch.has_diagnostic_checkpoints()
    }

    /// Stamps a direct opaque-pointer marker. Silent no-op if the
    /// extension is absent (spec.md §7: marker-stamping never fails).
    pub fn set_checkpoint(&self, dispatch: &DeviceDispatch, cmd: vk::CommandBuffer, marker: usize) {
        let Some(set_checkpoint) = dispatch.cmd_set_checkpoint_nv else {
            log_verbose!(LOG_CAT, "set_checkpoint ignored: extension not present");
            return;
        };
        unsafe { set_checkpoint(cmd, marker as *const c_void) };
    }

    /// Encodes `tag` into a pointer-sized integer and stamps it (spec.md
    /// §3 "Checkpoint tag", §9 re-architecture note: never treat a raw
    /// pointer and a tag interchangeably at the API surface — the wire
    /// representation is still a machine word).
    pub fn set_tagged_checkpoint(&self, dispatch: &DeviceDispatch, cmd: vk::CommandBuffer, tag: CheckpointTag) {
        self.set_checkpoint(dispatch, cmd, tag.to_ptr());
    }

    /// Two-call pattern: retrieves every checkpoint last reached by each
    /// queue subresource the driver tracked. Expected to be invoked only
    /// after a device-lost event (spec.md §4.3, §5).
    pub fn get_checkpoints(&self, dispatch: &DeviceDispatch, queue: vk::Queue) -> Vec<CheckpointData> {
        let Some(get_checkpoints) = dispatch.get_queue_checkpoint_data_nv else {
            return Vec::new();
        };
        let mut count: u32 = 0;
        unsafe { get_checkpoints(queue, &mut count as *mut u32, core::ptr::null_mut()) };
        if count == 0 {
            return Vec::new();
        }
        let mut raw = vec![CheckpointDataRaw { stage_flags: 0, marker_pointer: core::ptr::null() }; count as usize];
        unsafe { get_checkpoints(queue, &mut count as *mut u32, raw.as_mut_ptr() as *mut c_void) };
        raw.into_iter()
            .take(count as usize)
            .map(|r| CheckpointData::from_raw(r.stage_flags, r.marker_pointer as usize))
            .collect()
    }
}

impl Clone for CheckpointDataRaw {
    fn clone(&self) -> Self {
        Self { stage_flags: self.stage_flags, marker_pointer: self.marker_pointer }
    }
}

/// A formatted snapshot of the checkpoints reached by a queue at the
/// moment of a device-lost event (spec.md §4.3).
#[derive(Clone, Debug)]
pub struct CrashDump {
    pub checkpoints: Vec<CheckpointData>,
    pub captured_at: SystemTime,
}

impl CrashDump {
    /// Captures the current checkpoint list for `queue` plus a wall-clock
    /// timestamp.
    pub fn generate(ctx: &DiagnosticsContext, dispatch: &DeviceDispatch, queue: vk::Queue) -> Self {
        let checkpoints = ctx.get_checkpoints(dispatch, queue);
        log_error!(LOG_CAT, "crash dump captured with {} checkpoint(s)", checkpoints.len());
        Self { checkpoints, captured_at: SystemTime::now() }
    }

    /// The chronologically last (highest-index) checkpoint's pipeline
    /// stage, or `None` when empty.
    pub fn last_stage(&self) -> Option<PipelineStage> {
        self.checkpoints.last().map(|c| c.pipeline_stage)
    }

    /// The chronologically last checkpoint's decoded tag, if any.
    pub fn last_tag(&self) -> Option<CheckpointTag> {
        self.checkpoints.last().and_then(|c| c.tag)
    }

    /// A human-readable UTF-8 crash report.
    pub fn format(&self) -> String {
        let mut out = String::new();
        out.push_str("=== GPU crash dump ===\n");
        let elapsed = self.captured_at.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
        out.push_str(&format!("captured at: {}.{:03}s (unix epoch)\n", elapsed.as_secs(), elapsed.subsec_millis()));
        out.push_str(&format!("checkpoints: {}\n", self.checkpoints.len()));
        match self.last_stage() {
            Some(stage) => out.push_str(&format!("last stage: {stage:?}\n")),
            None => out.push_str("last stage: unknown\n"),
        }
        match self.last_tag() {
            Some(tag) => out.push_str(&format!("last tag: {tag:?}\n")),
            None => out.push_str("last tag: none\n"),
        }
        for (i, cp) in self.checkpoints.iter().enumerate() {
            out.push_str(&format!(
                "  [{i}] stage={:?} marker=0x{:x} tag={:?}\n",
                cp.pipeline_stage, cp.marker_pointer, cp.tag
            ));
        }
        out
    }

    /// Writes [`Self::format`]'s output to `path`.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.format()).map_err(|err| {
            log_error!(LOG_CAT, "failed to write crash dump: {err}");
            crate::error::Error::Unknown
        })
    }
}

/// Booleans composed into the flags value device creation consumes
/// (spec.md §4.3: "exposed as a plain integer to the host").
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct DiagnosticsConfig {
    pub enable_automatic_checkpoints: bool,
    pub enable_vendor_diagnostic_checkpoints: bool,
}

impl DiagnosticsConfig {
    /// Packs the booleans into the integer device creation consumes.
    pub fn to_flags(self) -> u32 {
        let mut flags = 0u32;
        if self.enable_automatic_checkpoints {
            flags |= 1 << 0;
        }
        if self.enable_vendor_diagnostic_checkpoints {
            flags |= 1 << 1;
        }
        flags
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_extension_yields_empty_checkpoint_list() {
        let ctx = DiagnosticsContext::new(vk::Device::null());
        let dispatch = DeviceDispatch::default();
        assert!(ctx.get_checkpoints(&dispatch, vk::Queue::null()).is_empty());
    }

    #[test]
    fn crash_dump_of_empty_list_reports_unknown() {
        let dump = CrashDump { checkpoints: Vec::new(), captured_at: SystemTime::now() };
        assert!(dump.last_stage().is_none());
        assert!(dump.last_tag().is_none());
        assert!(dump.format().contains("last stage: unknown"));
        assert!(dump.format().contains("last tag: none"));
    }

    #[test]
    fn crash_dump_uses_the_last_entry() {
        let dump = CrashDump {
            checkpoints: vec![
                CheckpointData::from_raw(vk::PipelineStageFlags::TOP_OF_PIPE.as_raw(), 0x1000),
                CheckpointData::from_raw(
                    vk::PipelineStageFlags::COMPUTE_SHADER.as_raw(),
                    CheckpointTag::ComputeShaderStart.to_ptr(),
                ),
            ],
            captured_at: SystemTime::now(),
        };
        assert_eq!(dump.last_stage(), Some(PipelineStage::ComputeShader));
        assert_eq!(dump.last_tag(), Some(CheckpointTag::ComputeShaderStart));
    }

    #[test]
    fn diagnostics_config_packs_flags() {
        let cfg = DiagnosticsConfig { enable_automatic_checkpoints: true, enable_vendor_diagnostic_checkpoints: false };
        assert_eq!(cfg.to_flags(), 0b01);
        let cfg = DiagnosticsConfig { enable_automatic_checkpoints: true, enable_vendor_diagnostic_checkpoints: true };
        assert_eq!(cfg.to_flags(), 0b11);
    }
}
