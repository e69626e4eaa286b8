//! The checkpoint-tag enumeration and pipeline-stage decoding.
//!
//! Grounded on spec.md §3 "Checkpoint tag" / "Checkpoint data" and §9's
//! re-architecture note: "reproduce with an explicit tag-pointer newtype
//! whose constructor takes the enum and whose decoder returns an optional
//! enum". `CheckpointTag::to_ptr`/`from_ptr` are that newtype's
//! constructor/decoder pair; the wire representation crossing into the
//! driver is still a bare machine-word integer (spec.md §6: 0x1000..0x9001).

use ash::vk;

/// 16-bit enumerated checkpoint tag, encoded into the opaque marker
/// pointer by reinterpreting the integer value (spec.md §3).
#[repr(u32)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CheckpointTag {
    FrameStart = 0x1000,
    FrameEnd = 0x1100,
    DrawStart = 0x1200,
    DrawEnd = 0x1300,
    ComputeShaderStart = 0x1400,
    ComputeShaderEnd = 0x1500,
    TransferStart = 0x1600,
    TransferEnd = 0x1700,
    RenderPassBegin = 0x1800,
    RenderPassEnd = 0x1900,
    PipelineBind = 0x1a00,
    DescriptorBind = 0x1b00,
    VertexBufferBind = 0x1c00,
    IndexBufferBind = 0x1d00,
    PushConstantBind = 0x1e00,
    Barrier = 0x1f00,
    Clear = 0x2000,
    Copy = 0x2100,
    Blit = 0x2200,
    Resolve = 0x2300,
    QueryBegin = 0x2400,
    QueryEnd = 0x2500,
    Timestamp = 0x2600,
    DebugMarkerBegin = 0x2700,
    DebugMarkerEnd = 0x2800,
}

impl CheckpointTag {
    const ALL: [CheckpointTag; 25] = [
        CheckpointTag::FrameStart,
        CheckpointTag::FrameEnd,
        CheckpointTag::DrawStart,
        CheckpointTag::DrawEnd,
        CheckpointTag::ComputeShaderStart,
        CheckpointTag::ComputeShaderEnd,
        CheckpointTag::TransferStart,
        CheckpointTag::TransferEnd,
        CheckpointTag::RenderPassBegin,
        CheckpointTag::RenderPassEnd,
        CheckpointTag::PipelineBind,
        CheckpointTag::DescriptorBind,
        CheckpointTag::VertexBufferBind,
        CheckpointTag::IndexBufferBind,
        CheckpointTag::PushConstantBind,
        CheckpointTag::Barrier,
        CheckpointTag::Clear,
        CheckpointTag::Copy,
        CheckpointTag::Blit,
        CheckpointTag::Resolve,
        CheckpointTag::QueryBegin,
        CheckpointTag::QueryEnd,
        CheckpointTag::Timestamp,
        CheckpointTag::DebugMarkerBegin,
        CheckpointTag::DebugMarkerEnd,
    ];

    /// Encodes this tag as the pointer-sized integer stamped into a
    /// command buffer (spec.md §3: "encoded into the opaque marker
    /// pointer by reinterpreting the integer value").
    pub fn to_ptr(self) -> usize {
        self as u32 as usize
    }

    /// Decodes a marker-pointer integer back into a tag, if `ptr` falls
    /// within the known tag range; `None` otherwise (spec.md §3
    /// "Checkpoint data": tag is populated only when recoverable).
    pub fn from_ptr(ptr: usize) -> Option<CheckpointTag> {
        Self::ALL.into_iter().find(|tag| tag.to_ptr() == ptr)
    }
}

/// Coarse enumerated pipeline position a checkpoint was reached at
/// (spec.md §3 "Checkpoint data"). Decoding priority order (lowest index
/// wins when multiple stage bits are set) per spec.md §8 invariant 6.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PipelineStage {
    ComputeShader,
    FragmentShader,
    VertexShader,
    VertexInput,
    DrawIndirect,
    TopOfPipe,
    AllGraphics,
    AllCommands,
    Unknown,
}

impl PipelineStage {
    /// Maps a bitmask of `VkPipelineStageFlagBits`-equivalent values to
    /// the lowest-index enumerated stage that is set (spec.md §3, §8
    /// invariant 6); `Unknown` if none of the known bits are set.
    pub fn from_flags(flags: u32) -> PipelineStage {
        let flags = vk::PipelineStageFlags::from_raw(flags);
        if flags.contains(vk::PipelineStageFlags::COMPUTE_SHADER) {
            PipelineStage::ComputeShader
        } else if flags.contains(vk::PipelineStageFlags::FRAGMENT_SHADER) {
            PipelineStage::FragmentShader
        } else if flags.contains(vk::PipelineStageFlags::VERTEX_SHADER) {
            PipelineStage::VertexShader
        } else if flags.contains(vk::PipelineStageFlags::VERTEX_INPUT) {
            PipelineStage::VertexInput
        } else if flags.contains(vk::PipelineStageFlags::DRAW_INDIRECT) {
            PipelineStage::DrawIndirect
        } else if flags.contains(vk::PipelineStageFlags::TOP_OF_PIPE) {
            PipelineStage::TopOfPipe
        } else if flags.contains(vk::PipelineStageFlags::ALL_GRAPHICS) {
            PipelineStage::AllGraphics
        } else if flags.contains(vk::PipelineStageFlags::ALL_COMMANDS) {
            PipelineStage::AllCommands
        } else {
            PipelineStage::Unknown
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn invariant_5_every_tag_round_trips_through_a_pointer() {
        for tag in CheckpointTag::ALL {
            assert_eq!(CheckpointTag::from_ptr(tag.to_ptr()), Some(tag));
        }
    }

    #[test]
    fn unknown_pointer_values_decode_to_none() {
        assert!(CheckpointTag::from_ptr(0).is_none());
        assert!(CheckpointTag::from_ptr(0xdead_beef).is_none());
    }

    #[test]
    fn invariant_6_pipeline_stage_decoding_priority() {
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::COMPUTE_SHADER.as_raw()),
            PipelineStage::ComputeShader
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::FRAGMENT_SHADER.as_raw()),
            PipelineStage::FragmentShader
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::VERTEX_SHADER.as_raw()),
            PipelineStage::VertexShader
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::VERTEX_INPUT.as_raw()),
            PipelineStage::VertexInput
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::DRAW_INDIRECT.as_raw()),
            PipelineStage::DrawIndirect
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::TOP_OF_PIPE.as_raw()),
            PipelineStage::TopOfPipe
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::ALL_GRAPHICS.as_raw()),
            PipelineStage::AllGraphics
        );
        assert_eq!(
            PipelineStage::from_flags(vk::PipelineStageFlags::ALL_COMMANDS.as_raw()),
            PipelineStage::AllCommands
        );
        assert_eq!(PipelineStage::from_flags(0), PipelineStage::Unknown);
    }

    #[test]
    fn priority_picks_lowest_index_stage_when_multiple_bits_set() {
        let combined = vk::PipelineStageFlags::COMPUTE_SHADER | vk::PipelineStageFlags::ALL_COMMANDS;
        assert_eq!(PipelineStage::from_flags(combined.as_raw()), PipelineStage::ComputeShader);
    }
}
