//! Byte-exact push-constant layouts for the warp/blend/fill compute
//! kernels (spec.md §4.6, §6 "POD layout — push constants").

/// 16 bytes. `direction`: `1.0` for forward warp, `-1.0` for backward.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct WarpPushConstants {
    pub mv_scale_x: f32,
    pub mv_scale_y: f32,
    pub interpolation: f32,
    pub direction: f32,
}

/// 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct BlendPushConstants {
    pub weight: f32,
    pub _pad: [f32; 3],
}

/// 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ConfidenceBlendPushConstants {
    pub interpolation: f32,
    pub cost_scale: f32,
    pub min_confidence: f32,
    pub _pad: f32,
}

/// 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct OcclusionFillPushConstants {
    pub occlusion_threshold: f32,
    pub fill_radius: f32,
    pub interpolation: f32,
    pub _pad: f32,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_push_constant_struct_is_sixteen_bytes() {
        assert_eq!(core::mem::size_of::<WarpPushConstants>(), 16);
        assert_eq!(core::mem::size_of::<BlendPushConstants>(), 16);
        assert_eq!(core::mem::size_of::<ConfidenceBlendPushConstants>(), 16);
        assert_eq!(core::mem::size_of::<OcclusionFillPushConstants>(), 16);
    }
}
