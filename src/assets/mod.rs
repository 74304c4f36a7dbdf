//! Asset decoding: colours, images (still and animated), fonts and audio.

pub mod color;
pub mod decode;
pub mod fonts;
pub mod media;
