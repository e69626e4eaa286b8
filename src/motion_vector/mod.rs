//! The motion-vector stage: a 2-slot frame-history ring feeding the
//! optical-flow session (spec.md §4.5).
//!
//! Grounded on spec.md §4.5 and §9's "2-slot ring with parity cursor"
//! re-architecture note. See `DESIGN.md` Open Question 1 for the
//! "previous vs current" convention chosen here.

use ash::vk;

use crate::error::{Error, Result};
use crate::loader::DeviceDispatch;
use crate::logging::LogCategory;
use crate::log_verbose;
use crate::optical_flow::{BindingPoint, ExecuteFlags, OpticalFlowSession};

const LOG_CAT: LogCategory = LogCategory::new("MotionVector");

/// A single frame's image descriptor (spec.md §3 "Motion-vector context").
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub memory: vk::DeviceMemory,
    pub width: u32,
    pub height: u32,
}

impl FrameImage {
    fn is_empty(&self) -> bool {
        self.image == vk::Image::null()
    }
}

/// The owned motion-vector output buffer set (spec.md §3).
#[derive(Clone, Copy, Default)]
pub struct MotionVectorOutputs {
    pub forward_flow: vk::ImageView,
    pub backward_flow: Option<vk::ImageView>,
    pub cost: Option<vk::ImageView>,
}

/// 2-slot frame-history ring plus the optical-flow session it drives
/// (spec.md §4.5, §3 "Motion-vector context").
///
/// Convention (DESIGN.md Open Question 1): `cursor` always points at the
/// slot the *next* `push` will overwrite. After a push, "current" is
/// `(cursor - 1) mod 2` (the slot just written) and "previous" is
/// `cursor` itself (the slot that will be overwritten by the push after
/// next, i.e. the one written before the current one).
pub struct MotionVectorStage {
    session: Option<OpticalFlowSession>,
    history: [FrameImage; 2],
    cursor: usize,
    push_count: u64,
    outputs: Option<MotionVectorOutputs>,
}

impl MotionVectorStage {
    pub fn new() -> Self {
        Self { session: None, history: Default::default(), cursor: 0, push_count: 0, outputs: None }
    }

    pub fn set_session(&mut self, session: OpticalFlowSession) {
        self.session = Some(session);
    }

    pub fn set_outputs(&mut self, outputs: MotionVectorOutputs) {
        self.outputs = Some(outputs);
    }

    /// Writes `frame` into the slot `cursor` points at, advances the
    /// cursor, and returns whether at least 2 frames have ever been
    /// pushed (spec.md §4.5).
    pub fn push(&mut self, frame: FrameImage) -> bool {
        self.history[self.cursor] = frame;
        self.cursor = 1 - self.cursor;
        self.push_count += 1;
        log_verbose!(LOG_CAT, "pushed frame {}x{} (push_count={})", frame.width, frame.height, self.push_count);
        self.push_count >= 2
    }

    /// The most recently pushed frame, or an empty [`FrameImage`] if none
    /// has been pushed yet.
    pub fn get_current_frame(&self) -> FrameImage {
        self.history[(self.cursor + 1) % 2]
    }

    /// The frame pushed immediately before the current one.
    pub fn get_previous_frame(&self) -> FrameImage {
        self.history[self.cursor]
    }

    pub fn get_motion_vectors(&self) -> Option<MotionVectorOutputs> {
        self.outputs
    }

    pub fn push_count(&self) -> u64 {
        self.push_count
    }

    fn has_two_frames(&self) -> bool {
        self.push_count >= 2 && !self.get_current_frame().is_empty() && !self.get_previous_frame().is_empty()
    }

    /// Binds current -> input, previous -> reference, and the owned
    /// motion-vector outputs, then runs the session. `NotInitialized` if
    /// no session was ever created; `InsufficientFrames` if fewer than 2
    /// frames have been pushed (spec.md §4.5).
    pub fn execute(&mut self, dispatch: &DeviceDispatch, cmd: vk::CommandBuffer) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::NotInitialized);
        }
        if !self.has_two_frames() {
            return Err(Error::InsufficientFrames);
        }
        let current = self.get_current_frame();
        let previous = self.get_previous_frame();
        let outputs = self.outputs.ok_or(Error::NotInitialized)?;

        let session = self.session.as_mut().unwrap();
        session.bind_image(dispatch, BindingPoint::Input, current.view, vk::ImageLayout::GENERAL);
        session.bind_image(dispatch, BindingPoint::Reference, previous.view, vk::ImageLayout::GENERAL);
        session.bind_image(dispatch, BindingPoint::FlowVector, outputs.forward_flow, vk::ImageLayout::GENERAL);
        if let Some(backward) = outputs.backward_flow {
            session.bind_image(dispatch, BindingPoint::BackwardFlowVector, backward, vk::ImageLayout::GENERAL);
        }
        if let Some(cost) = outputs.cost {
            session.bind_image(dispatch, BindingPoint::Cost, cost, vk::ImageLayout::GENERAL);
        }

        session.execute(dispatch, cmd, None, ExecuteFlags::default())
    }
}

impl Default for MotionVectorStage {
    fn default() -> Self {
        Self::new()
    }
}
