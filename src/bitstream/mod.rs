//! H.264 parameter-set surgery on finished containers.

pub(crate) mod bits;
pub mod color_patch;
pub(crate) mod sps;
