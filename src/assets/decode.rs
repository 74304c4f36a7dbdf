use std::io::Cursor;
use std::sync::Arc;

use anyhow::Context;
use image::AnimationDecoder;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Frames shorter than this are shown for [`ZERO_DELAY_FALLBACK_SECS`] instead.
const MIN_FRAME_DELAY_SECS: f64 = 0.011;
const ZERO_DELAY_FALLBACK_SECS: f64 = 0.1;

#[derive(Clone, Debug)]
/// Raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Multi-frame image with a per-frame start-time table.
#[derive(Clone, Debug)]
pub struct AnimatedImage {
    pub width: u32,
    pub height: u32,
    /// Full-canvas frames, already composed by the decoder.
    pub frames: Vec<PreparedImage>,
    /// Start time of each frame in seconds; `start_times[0] == 0`.
    pub start_times: Vec<f64>,
    /// Length of one loop in seconds.
    pub total_secs: f64,
}

impl AnimatedImage {
    /// Frame shown at `t` seconds, looping over [`AnimatedImage::total_secs`].
    pub fn frame_index_at(&self, t: f64) -> usize {
        if self.frames.len() <= 1 || self.total_secs <= 0.0 || !t.is_finite() {
            return 0;
        }
        let local = t.rem_euclid(self.total_secs);
        let idx = self.start_times.partition_point(|&s| s <= local);
        idx.saturating_sub(1).min(self.frames.len() - 1)
    }
}

/// A decoded still or animated image.
#[derive(Clone, Debug)]
pub enum DecodedImage {
    Still(PreparedImage),
    Animated(AnimatedImage),
}

impl DecodedImage {
    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Still(img) => (img.width, img.height),
            Self::Animated(anim) => (anim.width, anim.height),
        }
    }

    /// Frame to show at `t` seconds; stills ignore `t`.
    pub fn frame_at(&self, t: f64) -> &PreparedImage {
        match self {
            Self::Still(img) => img,
            Self::Animated(anim) => &anim.frames[anim.frame_index_at(t)],
        }
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> SlidecastResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    Ok(prepare_rgba(dyn_img.to_rgba8()))
}

/// Decode image bytes, keeping every frame of animated GIF, WebP and APNG payloads.
///
/// Single-frame animations decode as [`DecodedImage::Still`].
pub fn decode_image_frames(bytes: &[u8]) -> SlidecastResult<DecodedImage> {
    let format = image::guess_format(bytes).context("detect image format")?;
    let frames = match format {
        image::ImageFormat::Gif => {
            let dec = image::codecs::gif::GifDecoder::new(Cursor::new(bytes))
                .context("open gif decoder")?;
            Some(dec.into_frames().collect_frames().context("decode gif frames")?)
        }
        image::ImageFormat::WebP => {
            let dec = image::codecs::webp::WebPDecoder::new(Cursor::new(bytes))
                .context("open webp decoder")?;
            if dec.has_animation() {
                Some(dec.into_frames().collect_frames().context("decode webp frames")?)
            } else {
                None
            }
        }
        image::ImageFormat::Png => {
            let dec = image::codecs::png::PngDecoder::new(Cursor::new(bytes))
                .context("open png decoder")?;
            if dec.is_apng().context("inspect png animation")? {
                Some(
                    dec.apng()
                        .context("open apng decoder")?
                        .into_frames()
                        .collect_frames()
                        .context("decode apng frames")?,
                )
            } else {
                None
            }
        }
        _ => None,
    };

    let Some(frames) = frames.filter(|f| f.len() > 1) else {
        return decode_image(bytes).map(DecodedImage::Still);
    };

    let mut out = Vec::with_capacity(frames.len());
    let mut start_times = Vec::with_capacity(frames.len());
    let mut cursor = 0.0f64;
    for frame in frames {
        let (num, den) = frame.delay().numer_denom_ms();
        let mut delay = if den == 0 {
            0.0
        } else {
            f64::from(num) / f64::from(den) / 1000.0
        };
        if delay < MIN_FRAME_DELAY_SECS {
            delay = ZERO_DELAY_FALLBACK_SECS;
        }
        start_times.push(cursor);
        cursor += delay;
        out.push(prepare_rgba(frame.into_buffer()));
    }

    let (width, height) = (out[0].width, out[0].height);
    if out.iter().any(|f| f.width != width || f.height != height) {
        return Err(SlidecastError::asset(
            "animated image frames have inconsistent sizes",
        ));
    }

    Ok(DecodedImage::Animated(AnimatedImage {
        width,
        height,
        frames: out,
        start_times,
        total_secs: cursor,
    }))
}

fn prepare_rgba(rgba: image::RgbaImage) -> PreparedImage {
    let (width, height) = rgba.dimensions();
    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);
    PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
