//! In-memory MP4/MOV container writer.

pub(crate) mod boxes;
pub mod mp4;
