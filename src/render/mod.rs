//! Frame composition: slide visuals, overlays, text and transitions on the CPU.

pub mod backend;
pub mod compositor;
pub(crate) mod cpu;
pub mod overlay;
pub(crate) mod text;
