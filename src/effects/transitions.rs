use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::cpu::{
    crossfade_px, expected_len, premul_over_in_place_opacity, premul_over_px, sample_px,
    scaled_over_in_place,
};

/// Blend between the outgoing slide scene (A) and the incoming one (B).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    #[default]
    Fade,
    Slide,
    Wipe,
    Zoom,
    Flip,
    CrossZoom,
}

impl TransitionKind {
    /// Parse an authored transition name; anything unknown plays as [`TransitionKind::Fade`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "slide" => Self::Slide,
            "wipe" => Self::Wipe,
            "zoom" => Self::Zoom,
            "flip" => Self::Flip,
            "cross-zoom" | "crosszoom" | "cross_zoom" => Self::CrossZoom,
            "fade" => Self::Fade,
            other => {
                tracing::debug!(name = other, "unknown transition, using fade");
                Self::Fade
            }
        }
    }
}

/// Composite scene layers `a` and `b` over `dst` (which already holds the background) at linear
/// progress `p`.
///
/// At `p = 0` the result equals `a` over the background, at `p = 1` it equals `b` over the
/// background.
pub fn composite_transition(
    kind: TransitionKind,
    dst: &mut [u8],
    a: &[u8],
    b: &[u8],
    width: u32,
    height: u32,
    p: f64,
) -> SlidecastResult<()> {
    let expected = expected_len(width, height)?;
    if dst.len() != expected || a.len() != expected || b.len() != expected {
        return Err(SlidecastError::render(
            "transition expects buffers matching width*height*4",
        ));
    }
    let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };

    match kind {
        TransitionKind::Fade => {
            for ((d, a), b) in dst
                .chunks_exact_mut(4)
                .zip(a.chunks_exact(4))
                .zip(b.chunks_exact(4))
            {
                let layer = crossfade_px(
                    [a[0], a[1], a[2], a[3]],
                    [b[0], b[1], b[2], b[3]],
                    p as f32,
                );
                let out = premul_over_px([d[0], d[1], d[2], d[3]], layer);
                d.copy_from_slice(&out);
            }
            Ok(())
        }
        TransitionKind::Slide => {
            composite_slide(dst, a, b, width, height, p);
            Ok(())
        }
        TransitionKind::Wipe => {
            let edge = p * f64::from(width);
            for y in 0..height {
                for x in 0..width {
                    let src = if f64::from(x) < edge { b } else { a };
                    let px = sample_px(src, width, height, x as i32, y as i32);
                    let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
                    let d = &mut dst[idx..idx + 4];
                    let out = premul_over_px([d[0], d[1], d[2], d[3]], px);
                    d.copy_from_slice(&out);
                }
            }
            Ok(())
        }
        TransitionKind::Zoom => {
            premul_over_in_place_opacity(dst, a, (1.0 - p) as f32)?;
            let s = 0.5 + 0.5 * p;
            scaled_over_in_place(dst, b, width, height, s, s, p as f32)
        }
        TransitionKind::Flip => {
            if p < 0.5 {
                scaled_over_in_place(dst, a, width, height, 1.0 - 2.0 * p, 1.0, 1.0)
            } else {
                scaled_over_in_place(dst, b, width, height, 2.0 * p - 1.0, 1.0, 1.0)
            }
        }
        TransitionKind::CrossZoom => {
            let sa = 1.0 + 0.5 * p;
            scaled_over_in_place(dst, a, width, height, sa, sa, (1.0 - p) as f32)?;
            let sb = 1.5 - 0.5 * p;
            scaled_over_in_place(dst, b, width, height, sb, sb, p as f32)
        }
    }
}

/// A exits to the left while B enters from the right.
fn composite_slide(dst: &mut [u8], a: &[u8], b: &[u8], width: u32, height: u32, p: f64) {
    let shift = (p * f64::from(width)).round() as i32;
    let w = width as i32;
    for y in 0..height {
        for x in 0..width {
            let sx = x as i32 + shift;
            let px = if sx < w {
                sample_px(a, width, height, sx, y as i32)
            } else {
                sample_px(b, width, height, sx - w, y as i32)
            };
            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            let d = &mut dst[idx..idx + 4];
            let out = premul_over_px([d[0], d[1], d[2], d[3]], px);
            d.copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
