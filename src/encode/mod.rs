//! Frame sinks, the `ffmpeg`-backed H.264/AAC encoders and their packet types.

pub mod audio;
pub mod ffmpeg;
pub mod packet;
pub mod sink;
pub mod video;
