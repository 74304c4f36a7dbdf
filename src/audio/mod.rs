//! Soundtrack mixing.
//!
//! Music and narration are decoded to 44.1 kHz stereo, shaped by gain automation (fades and
//! ducking under narration) and summed into one buffer that spans the whole slideshow.

pub mod automation;
pub mod ducking;
pub mod mix;
