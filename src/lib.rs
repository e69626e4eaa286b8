//! Low-latency frame pacing (L2) and optical-flow frame generation (FG) on
//! top of vendor GPU driver extensions.
//!
//! Two hard subsystems, grounded on spec.md §1-§2 and expanded in
//! `SPEC_FULL.md`:
//!
//! - [`low_latency`]: per-swapchain input→display latency reduction —
//!   mode configuration, present-ID/marker stamping, optimal-sleep,
//!   rolling latency statistics.
//! - [`frame_gen`]: the orchestrator that drives [`motion_vector`] +
//!   [`synthesis`] to interpolate a frame between two real ones, gated by
//!   [`vrr`]'s LFC tracking and reported to [`injection`]'s present-sequence
//!   bookkeeping.
//!
//! Plus the reused [`diagnostics`] checkpoint wrapper and the [`loader`]/
//! [`optical_flow`] thin layers everything above is built on. [`abi`]
//! exposes the whole surface as a stable, language-agnostic C ABI.
//!
//! This crate consumes GPU handles and dispatch-table function pointers the
//! host already obtained; it never creates a device, queue, image, or
//! command buffer itself (spec.md §1).

pub mod abi;
pub mod diagnostics;
pub mod error;
pub mod frame_gen;
pub mod injection;
pub mod loader;
pub mod logging;
pub mod low_latency;
pub mod motion_vector;
pub mod optical_flow;
pub mod synthesis;
pub mod version;
pub mod vrr;

pub use error::{Error, Result};
