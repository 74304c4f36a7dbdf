//! Premultiplied RGBA8 buffer kernels and `vello_cpu` glue shared by the compositor.
//!
//! Every buffer here is tightly packed `width * height * 4` premultiplied RGBA8.

use std::sync::Arc;

use crate::assets::decode::PreparedImage;
use crate::foundation::core::{Affine, BezPath};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::{mul_div255_u8, unit_to_u8_weight};

pub(crate) fn dims_u16(width: u32, height: u32) -> SlidecastResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SlidecastError::render("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SlidecastError::render("surface height exceeds u16"))?;
    Ok((w, h))
}

pub(crate) fn expected_len(width: u32, height: u32) -> SlidecastResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| SlidecastError::render("rgba8 buffer size overflow"))
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: crate::foundation::core::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

pub(crate) fn pixmap_from_premul_bytes(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> SlidecastResult<vello_cpu::Pixmap> {
    let (w, h) = dims_u16(width, height)?;
    if rgba8_premul.len() != expected_len(width, height)? {
        return Err(SlidecastError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

/// Image paint for a decoded bitmap, drawn by filling `(0, 0, width, height)` in image space.
pub(crate) fn image_paint(img: &PreparedImage) -> SlidecastResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(img.rgba8_premul.as_slice(), img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Rasterize `path` into an 8-bit coverage mask.
pub(crate) fn path_coverage(width: u32, height: u32, path: &BezPath) -> SlidecastResult<Vec<u8>> {
    let (w, h) = dims_u16(width, height)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
    ctx.fill_path(&bezpath_to_cpu(path));
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    Ok(pixmap
        .data_as_u8_slice()
        .chunks_exact(4)
        .map(|px| px[3])
        .collect())
}

/// Scale every pixel by its coverage value.
pub(crate) fn apply_coverage_in_place(buf: &mut [u8], coverage: &[u8]) {
    debug_assert_eq!(buf.len(), coverage.len() * 4);
    for (px, &m) in buf.chunks_exact_mut(4).zip(coverage) {
        match m {
            255 => {}
            0 => px.fill(0),
            m => {
                let w = u16::from(m);
                for c in px.iter_mut() {
                    *c = mul_div255_u8(u16::from(*c), w);
                }
            }
        }
    }
}

/// Replace color by `tint` (premultiplied) while keeping each pixel's alpha as coverage.
pub(crate) fn tint_alpha_in_place(buf: &mut [u8], tint: [u8; 4]) {
    for px in buf.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in 0..4 {
            px[c] = mul_div255_u8(u16::from(tint[c]), a);
        }
    }
}

/// Shift a buffer by whole pixels; uncovered pixels become transparent.
pub(crate) fn translate(src: &[u8], width: u32, height: u32, dx: i32, dy: i32) -> Vec<u8> {
    if dx == 0 && dy == 0 {
        return src.to_vec();
    }
    let mut out = vec![0u8; src.len()];
    for y in 0..height as i32 {
        let sy = y - dy;
        if sy < 0 || sy >= height as i32 {
            continue;
        }
        for x in 0..width as i32 {
            let px = sample_px(src, width, height, x - dx, sy);
            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            out[idx..idx + 4].copy_from_slice(&px);
        }
    }
    out
}

pub(crate) fn premul_over_px(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as u16;
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - sa;
    let mut out = [0u8; 4];
    out[3] = add_sat_u8(src[3], mul_div255_u8(u16::from(dst[3]), inv));
    for c in 0..3 {
        let dc = mul_div255_u8(u16::from(dst[c]), inv);
        out[c] = add_sat_u8(src[c], dc);
    }
    out
}

/// Scale a premultiplied pixel by an 8-bit weight.
pub(crate) fn scale_px(px: [u8; 4], weight: u16) -> [u8; 4] {
    if weight >= 255 {
        return px;
    }
    [
        mul_div255_u8(u16::from(px[0]), weight),
        mul_div255_u8(u16::from(px[1]), weight),
        mul_div255_u8(u16::from(px[2]), weight),
        mul_div255_u8(u16::from(px[3]), weight),
    ]
}

pub(crate) fn crossfade_px(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let tt = unit_to_u8_weight(t);
    let it = 255u16 - tt;
    let mut out = [0u8; 4];
    for c in 0..4 {
        let av = mul_div255_u8(u16::from(a[c]), it);
        let bv = mul_div255_u8(u16::from(b[c]), tt);
        out[c] = add_sat_u8(av, bv);
    }
    out
}

pub(crate) fn sample_px(src: &[u8], width: u32, height: u32, x: i32, y: i32) -> [u8; 4] {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return [0, 0, 0, 0];
    }
    let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
    [src[idx], src[idx + 1], src[idx + 2], src[idx + 3]]
}

pub(crate) fn premul_over_in_place_opacity(
    dst: &mut [u8],
    src: &[u8],
    opacity: f32,
) -> SlidecastResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(SlidecastError::render(
            "premul_over_in_place_opacity expects equal-length rgba8 buffers",
        ));
    }
    let op = unit_to_u8_weight(opacity);
    if op == 0 {
        return Ok(());
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let layer = scale_px([s[0], s[1], s[2], s[3]], op);
        let out = premul_over_px([d[0], d[1], d[2], d[3]], layer);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Draw `src` scaled by `(sx, sy)` about the buffer center over `dst`, nearest-neighbour sampled
/// at pixel centers.
#[allow(clippy::too_many_arguments)]
pub(crate) fn scaled_over_in_place(
    dst: &mut [u8],
    src: &[u8],
    width: u32,
    height: u32,
    sx: f64,
    sy: f64,
    opacity: f32,
) -> SlidecastResult<()> {
    let expected = expected_len(width, height)?;
    if dst.len() != expected || src.len() != expected {
        return Err(SlidecastError::render(
            "scaled_over_in_place expects buffers matching width*height*4",
        ));
    }
    let op = unit_to_u8_weight(opacity);
    if op == 0 || sx <= 1e-6 || sy <= 1e-6 {
        return Ok(());
    }
    if sx == 1.0 && sy == 1.0 {
        return premul_over_in_place_opacity(dst, src, opacity);
    }

    let cx = f64::from(width) / 2.0;
    let cy = f64::from(height) / 2.0;
    for y in 0..height {
        let src_y = (cy + (f64::from(y) + 0.5 - cy) / sy - 0.5).round() as i32;
        if src_y < 0 || src_y >= height as i32 {
            continue;
        }
        for x in 0..width {
            let src_x = (cx + (f64::from(x) + 0.5 - cx) / sx - 0.5).round() as i32;
            let px = sample_px(src, width, height, src_x, src_y);
            if px[3] == 0 {
                continue;
            }
            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            let d = &mut dst[idx..idx + 4];
            let out = premul_over_px([d[0], d[1], d[2], d[3]], scale_px(px, op));
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

/// Normalized gaussian weights in Q16; the weights always sum to exactly `1 << 16`.
pub(crate) fn gaussian_kernel_q16(radius: u32, sigma: f32) -> SlidecastResult<Vec<u32>> {
    const ONE: i64 = 1 << 16;
    if radius == 0 {
        return Ok(vec![ONE as u32]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(SlidecastError::validation("blur sigma must be > 0"));
    }

    let two_sigma_sq = 2.0 * f64::from(sigma).powi(2);
    let r = i64::from(radius);
    let raw: Vec<f64> = (-r..=r)
        .map(|i| (-((i * i) as f64) / two_sigma_sq).exp())
        .collect();
    let total: f64 = raw.iter().sum();

    let mut weights: Vec<u32> = raw
        .iter()
        .map(|w| ((w / total) * ONE as f64).round().clamp(0.0, ONE as f64) as u32)
        .collect();
    let drift = ONE - weights.iter().map(|&w| i64::from(w)).sum::<i64>();
    let mid = weights.len() / 2;
    weights[mid] = (i64::from(weights[mid]) + drift).clamp(0, ONE) as u32;
    Ok(weights)
}

/// Separable gaussian blur with clamped edges; `radius` in pixels, sigma `radius / 2`.
pub(crate) fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
) -> SlidecastResult<Vec<u8>> {
    let len = expected_len(width, height)?;
    if src.len() != len {
        return Err(SlidecastError::render(format!(
            "blur source is {} bytes, expected {len} for {width}x{height}",
            src.len()
        )));
    }
    if radius == 0 {
        return Ok(src.to_vec());
    }
    let kernel = gaussian_kernel_q16(radius, (radius as f32 / 2.0).max(0.5))?;
    let (w, h) = (width as usize, height as usize);
    let mut rows = vec![0u8; len];
    let mut out = vec![0u8; len];
    blur_pass(src, &mut rows, &kernel, h, w, (w * 4, 4));
    blur_pass(&rows, &mut out, &kernel, w, h, (4, w * 4));
    Ok(out)
}

/// Convolve `lines` runs of `run` pixels each. `stride` is `(between lines, between pixels
/// along a line)` in bytes.
fn blur_pass(
    src: &[u8],
    dst: &mut [u8],
    kernel: &[u32],
    lines: usize,
    run: usize,
    stride: (usize, usize),
) {
    let (line_stride, px_stride) = stride;
    let reach = kernel.len() / 2;
    for line in 0..lines {
        let base = line * line_stride;
        for i in 0..run {
            let mut acc = [0u64; 4];
            for (k, &weight) in kernel.iter().enumerate() {
                let j = (i + k).saturating_sub(reach).min(run - 1);
                let at = base + j * px_stride;
                for (sum, &v) in acc.iter_mut().zip(&src[at..at + 4]) {
                    *sum += u64::from(weight) * u64::from(v);
                }
            }
            let at = base + i * px_stride;
            for (d, sum) in dst[at..at + 4].iter_mut().zip(acc) {
                *d = ((sum + (1 << 15)) >> 16).min(255) as u8;
            }
        }
    }
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
