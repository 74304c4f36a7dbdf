/// A rendered frame as RGBA8 pixels.
///
/// Frames produced by the compositor are premultiplied and opaque wherever the background is.
/// The `premultiplied` flag keeps that explicit at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`; out-of-range coordinates read as transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        crate::render::cpu::sample_px(&self.data, self.width, self.height, x as i32, y as i32)
    }
}
