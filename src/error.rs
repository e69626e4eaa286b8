//! Crate-wide error taxonomy.
//!
//! Mirrors `onca_ral::result`: one flat `Error` enum with a hand-written
//! `Display` impl and a `Result<T>` alias, rather than pulling in
//! `thiserror`. Conversions from `ash::vk::Result` live in `ToCrateError`,
//! the analogue of `onca_ral_vulkan::utils::ToRalError`.

use core::fmt;

/// Every way an operation in this crate can fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Error {
    // -- Availability --
    /// The required driver extension entry points are not resolved.
    ExtensionNotPresent,

    // -- Handle / parameter --
    /// A null or otherwise invalid opaque handle was passed in.
    InvalidHandle,
    /// A motion-vector/optical-flow operation needs 2 frames of history.
    InsufficientFrames,
    /// The sub-stage this call needs was never configured.
    NotInitialized,

    // -- Driver --
    DeviceLost,
    OutOfHostMemory,
    OutOfDeviceMemory,
    InitializationFailed,
    MemoryMapFailed,
    FormatNotSupported,
    FragmentedPool,
    SurfaceLost,
    NativeWindowInUse,
    OutOfDate,
    Unknown,

    // -- Loader --
    /// The driver's shared object could not be opened.
    LoaderError,
    /// A required entry point could not be resolved.
    FunctionNotFound,

    // -- Parse --
    /// The driver-identity string did not contain a recognizable version.
    ParseError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ExtensionNotPresent => f.write_str("required extension is not present"),
            Error::InvalidHandle => f.write_str("invalid (null) handle"),
            Error::InsufficientFrames => f.write_str("not enough frame history (need 2)"),
            Error::NotInitialized => f.write_str("sub-stage was not initialized"),
            Error::DeviceLost => f.write_str("device lost"),
            Error::OutOfHostMemory => f.write_str("out of host memory"),
            Error::OutOfDeviceMemory => f.write_str("out of device memory"),
            Error::InitializationFailed => f.write_str("driver initialization failed"),
            Error::MemoryMapFailed => f.write_str("memory map failed"),
            Error::FormatNotSupported => f.write_str("format not supported"),
            Error::FragmentedPool => f.write_str("descriptor/command pool is fragmented"),
            Error::SurfaceLost => f.write_str("surface lost"),
            Error::NativeWindowInUse => f.write_str("native window already in use"),
            Error::OutOfDate => f.write_str("swapchain out of date"),
            Error::Unknown => f.write_str("unknown driver error"),
            Error::LoaderError => f.write_str("failed to open driver shared object"),
            Error::FunctionNotFound => f.write_str("required entry point was not found"),
            Error::ParseError => f.write_str("driver-identity string is malformed"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

/// Analogue of `onca_ral_vulkan::utils::ToRalError`.
pub(crate) trait ToCrateError {
    fn to_crate_error(self) -> Error;
}

impl ToCrateError for ash::vk::Result {
    fn to_crate_error(self) -> Error {
        use ash::vk::Result as VkResult;
        match self {
            VkResult::ERROR_OUT_OF_HOST_MEMORY => Error::OutOfHostMemory,
            VkResult::ERROR_OUT_OF_DEVICE_MEMORY => Error::OutOfDeviceMemory,
            VkResult::ERROR_DEVICE_LOST => Error::DeviceLost,
            VkResult::ERROR_INITIALIZATION_FAILED => Error::InitializationFailed,
            VkResult::ERROR_MEMORY_MAP_FAILED => Error::MemoryMapFailed,
            VkResult::ERROR_FORMAT_NOT_SUPPORTED => Error::FormatNotSupported,
            VkResult::ERROR_FRAGMENTED_POOL => Error::FragmentedPool,
            VkResult::ERROR_SURFACE_LOST_KHR => Error::SurfaceLost,
            VkResult::ERROR_NATIVE_WINDOW_IN_USE_KHR => Error::NativeWindowInUse,
            VkResult::ERROR_OUT_OF_DATE_KHR => Error::OutOfDate,
            VkResult::ERROR_EXTENSION_NOT_PRESENT => Error::ExtensionNotPresent,
            VkResult::ERROR_FEATURE_NOT_PRESENT => Error::ExtensionNotPresent,
            _ => Error::Unknown,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_is_non_empty_for_every_variant() {
        let variants = [
            Error::ExtensionNotPresent,
            Error::InvalidHandle,
            Error::InsufficientFrames,
            Error::NotInitialized,
            Error::DeviceLost,
            Error::OutOfHostMemory,
            Error::OutOfDeviceMemory,
            Error::InitializationFailed,
            Error::MemoryMapFailed,
            Error::FormatNotSupported,
            Error::FragmentedPool,
            Error::SurfaceLost,
            Error::NativeWindowInUse,
            Error::OutOfDate,
            Error::Unknown,
            Error::LoaderError,
            Error::FunctionNotFound,
            Error::ParseError,
        ];
        for v in variants {
            assert!(!v.to_string().is_empty());
        }
    }

    #[test]
    fn vk_result_conversion_maps_device_lost() {
        assert_eq!(ash::vk::Result::ERROR_DEVICE_LOST.to_crate_error(), Error::DeviceLost);
    }

    #[test]
    fn vk_result_conversion_defaults_to_unknown() {
        assert_eq!(ash::vk::Result::ERROR_TOO_MANY_OBJECTS.to_crate_error(), Error::Unknown);
    }
}
