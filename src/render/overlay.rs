use std::collections::HashMap;
use std::sync::Arc;

use kurbo::Shape;

use crate::assets::color::ColorDef;
use crate::assets::decode::{DecodedImage, decode_image_frames};
use crate::assets::fonts::FontRegistry;
use crate::composition::model::{LineCap, OverlayDef, OverlayKind, OverlaySpace, OverlayStyle};
use crate::effects::overlay_anim::{OverlayAnimState, WipeAxis, animate, revealed_chars};
use crate::foundation::core::{Affine, BezPath, Canvas, Point, Rect, Vec2};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::cpu::{
    affine_to_cpu, apply_coverage_in_place, bezpath_to_cpu, blur_rgba8_premul, dims_u16,
    image_paint, path_coverage, premul_over_in_place_opacity, tint_alpha_in_place, translate,
};
use crate::render::text::{TextDraw, draw_text};

const PATH_TOLERANCE: f64 = 0.1;

/// Encoded overlay image payloads, decoded on first use.
#[derive(Debug, Default)]
pub struct OverlayImages {
    encoded: HashMap<String, Arc<Vec<u8>>>,
    decoded: HashMap<String, Arc<DecodedImage>>,
}

impl OverlayImages {
    pub fn new(encoded: HashMap<String, Arc<Vec<u8>>>) -> Self {
        Self {
            encoded,
            decoded: HashMap::new(),
        }
    }

    pub(crate) fn get(&mut self, asset: &str) -> SlidecastResult<Arc<DecodedImage>> {
        if let Some(img) = self.decoded.get(asset) {
            return Ok(img.clone());
        }
        let bytes = self
            .encoded
            .get(asset)
            .ok_or_else(|| SlidecastError::asset(format!("unknown image asset '{asset}'")))?;
        let img = Arc::new(decode_image_frames(bytes)?);
        tracing::debug!(asset, "decoded overlay image");
        self.decoded.insert(asset.to_owned(), img.clone());
        Ok(img)
    }

    pub fn is_decoded(&self, asset: &str) -> bool {
        self.decoded.contains_key(asset)
    }
}

/// Per-frame geometry an overlay is placed against.
#[derive(Clone, Copy, Debug)]
pub(crate) struct OverlayFrame<'a> {
    pub(crate) canvas: Canvas,
    pub(crate) slide_rect: Rect,
    /// Coverage of the (rounded) slide rectangle, for slide-space clipping.
    pub(crate) slide_clip: &'a [u8],
    pub(crate) slide_local_t: f64,
    pub(crate) slide_duration: f64,
}

/// Draw one overlay over `scene` if it is visible at the frame's slide-local time.
pub(crate) fn render_overlay(
    overlay: &OverlayDef,
    frame: &OverlayFrame<'_>,
    fonts: &mut FontRegistry,
    images: &mut OverlayImages,
    scene: &mut [u8],
) -> SlidecastResult<()> {
    let t = frame.slide_local_t;
    if !overlay.is_visible_at(t, frame.slide_duration) {
        return Ok(());
    }
    let (start, end) = overlay.visible_window(frame.slide_duration);
    let state = animate(
        overlay.animation_in,
        overlay.animation_out,
        t - start,
        end - start,
        matches!(overlay.kind, OverlayKind::Text(_)),
    );
    let opacity = overlay.style.opacity.clamp(0.0, 1.0) * state.opacity;
    if state.is_invisible() || opacity <= 0.0 {
        return Ok(());
    }

    let space = match overlay.space {
        OverlaySpace::Slide => frame.slide_rect,
        OverlaySpace::Canvas => frame.canvas.rect(),
    };
    let p0 = Point::new(
        space.x0 + overlay.x * space.width(),
        space.y0 + overlay.y * space.height(),
    );
    let p1 = Point::new(
        p0.x + overlay.width * space.width(),
        p0.y + overlay.height * space.height(),
    );
    let bbox = Rect::from_points(p0, p1);
    let scale = frame.canvas.style_scale();
    let transform = overlay_transform(&overlay.style, &state, bbox.center(), scale);

    let (w, h) = (frame.canvas.width, frame.canvas.height);
    let (w16, h16) = dims_u16(w, h)?;
    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    let style = &overlay.style;
    match &overlay.kind {
        OverlayKind::Text(text) => {
            let shown: String = match state.reveal {
                Some(f) => {
                    let n = revealed_chars(text.text.chars().count(), f);
                    text.text.chars().take(n).collect()
                }
                None => text.text.clone(),
            };
            let draw = TextDraw {
                text: &shown,
                family: text.font_family.as_deref(),
                size_px: (text.font_size * scale) as f32,
                color: style.color,
                align: text.align,
                max_width: (text.wrap && bbox.width() > 0.0).then_some(bbox.width() as f32),
                stroke: style.text_stroke.map(|s| (s.color, s.width * scale)),
                background: style
                    .background
                    .map(|b| (b.color, b.padding * scale, b.radius * scale)),
            };
            draw_text(&mut ctx, fonts, transform, bbox.origin(), bbox.width(), &draw)?;
        }
        OverlayKind::Line => {
            let mut path = BezPath::new();
            path.move_to(p0);
            path.line_to(p1);
            stroke_into(&mut ctx, transform, &path, style, scale);
        }
        OverlayKind::Arrow { head_size } => {
            let stroke_px = style.stroke_width * scale;
            let head_len = head_size.map_or(stroke_px * 4.0, |s| s * scale).max(0.0);
            let (shaft, head) = arrow_geometry(p0, p1, head_len);
            stroke_into(&mut ctx, transform, &shaft, style, scale);
            if let Some(head) = head {
                fill_into(&mut ctx, transform, &head, style.color);
            }
        }
        OverlayKind::Rect => {
            let path = bbox.to_rounded_rect(style.radius.max(0.0) * scale).to_path(PATH_TOLERANCE);
            if let Some(fill) = style.fill {
                fill_into(&mut ctx, transform, &path, fill);
            }
            stroke_into(&mut ctx, transform, &path, style, scale);
        }
        OverlayKind::Circle => {
            let path = kurbo::Ellipse::from_rect(bbox).to_path(PATH_TOLERANCE);
            if let Some(fill) = style.fill {
                fill_into(&mut ctx, transform, &path, fill);
            }
            stroke_into(&mut ctx, transform, &path, style, scale);
        }
        OverlayKind::Image { asset } => {
            let decoded = images.get(asset)?;
            let img = decoded.frame_at(t);
            let (iw, ih) = (f64::from(img.width), f64::from(img.height));
            if iw <= 0.0 || ih <= 0.0 || bbox.width() <= 0.0 || bbox.height() <= 0.0 {
                return Ok(());
            }
            let fit = (bbox.width() / iw).min(bbox.height() / ih);
            let dest_origin = Point::new(
                bbox.center().x - iw * fit / 2.0,
                bbox.center().y - ih * fit / 2.0,
            );
            let image_to_canvas =
                transform * Affine::translate(dest_origin.to_vec2()) * Affine::scale(fit);
            let radius = style.radius.max(0.0) * scale / fit;
            let path = Rect::new(0.0, 0.0, iw, ih)
                .to_rounded_rect(radius)
                .to_path(PATH_TOLERANCE);
            ctx.set_transform(affine_to_cpu(image_to_canvas));
            ctx.set_paint(image_paint(img)?);
            ctx.fill_path(&bezpath_to_cpu(&path));
        }
    }

    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    let mut layer = pixmap.data_as_u8_slice().to_vec();

    if let Some((axis, fraction)) = state.wipe {
        let clip = match axis {
            WipeAxis::X => Rect::new(bbox.x0, bbox.y0, bbox.x0 + bbox.width() * fraction, bbox.y1),
            WipeAxis::Y => Rect::new(bbox.x0, bbox.y0, bbox.x1, bbox.y0 + bbox.height() * fraction),
        };
        // Inflate across the other axis so strokes on the box edge survive.
        let pad = style.stroke_width * scale + 1.0;
        let clip = match axis {
            WipeAxis::X => Rect::new(clip.x0 - pad, clip.y0 - pad, clip.x1, clip.y1 + pad),
            WipeAxis::Y => Rect::new(clip.x0 - pad, clip.y0 - pad, clip.x1 + pad, clip.y1),
        };
        let mut path = clip.to_path(PATH_TOLERANCE);
        path.apply_affine(transform);
        apply_coverage_in_place(&mut layer, &path_coverage(w, h, &path)?);
    }

    if let Some(shadow) = &style.shadow {
        let mut shadow_layer = layer.clone();
        tint_alpha_in_place(&mut shadow_layer, shadow.color.to_rgba8_premul().to_array());
        let radius = (shadow.blur.max(0.0) * scale).round() as u32;
        let mut shadow_layer = blur_rgba8_premul(&shadow_layer, w, h, radius)?;
        let dx = (shadow.offset_x * scale).round() as i32;
        let dy = (shadow.offset_y * scale).round() as i32;
        shadow_layer = translate(&shadow_layer, w, h, dx, dy);
        if overlay.space == OverlaySpace::Slide {
            apply_coverage_in_place(&mut shadow_layer, frame.slide_clip);
        }
        premul_over_in_place_opacity(scene, &shadow_layer, opacity as f32)?;
    }

    if overlay.space == OverlaySpace::Slide {
        apply_coverage_in_place(&mut layer, frame.slide_clip);
    }
    premul_over_in_place_opacity(scene, &layer, opacity as f32)
}

/// Rotation, flip and animation transform about the overlay center, in canvas pixels.
pub(crate) fn overlay_transform(
    style: &OverlayStyle,
    state: &OverlayAnimState,
    center: Point,
    scale: f64,
) -> Affine {
    let sx = if style.flip_h { -1.0 } else { 1.0 } * state.scale;
    let sy = if style.flip_v { -1.0 } else { 1.0 } * state.scale;
    let rotation = (style.rotation + state.rotation_deg).to_radians();
    Affine::translate(center.to_vec2() + state.offset * scale)
        * Affine::rotate(rotation)
        * Affine::scale_non_uniform(sx, sy)
        * Affine::translate(-center.to_vec2())
}

/// Shaft path plus optional filled head triangle for an arrow from `from` to `to`.
///
/// The shaft stops at the head's base so wide strokes do not poke through the tip.
pub(crate) fn arrow_geometry(from: Point, to: Point, head_len: f64) -> (BezPath, Option<BezPath>) {
    let d = to - from;
    let len = d.hypot();
    let mut shaft = BezPath::new();
    shaft.move_to(from);
    if len <= f64::EPSILON || head_len <= 0.0 {
        shaft.line_to(to);
        return (shaft, None);
    }
    let head_len = head_len.min(len);
    let dir = d / len;
    let perp = Vec2::new(-dir.y, dir.x);
    let base = to - dir * head_len;
    shaft.line_to(base);

    let mut head = BezPath::new();
    head.move_to(to);
    head.line_to(base + perp * (head_len / 2.0));
    head.line_to(base - perp * (head_len / 2.0));
    head.close_path();
    (shaft, Some(head))
}

fn fill_into(
    ctx: &mut vello_cpu::RenderContext,
    transform: Affine,
    path: &BezPath,
    color: ColorDef,
) {
    let [r, g, b, a] = color.to_rgba8_straight();
    if a == 0 {
        return;
    }
    ctx.set_transform(affine_to_cpu(transform));
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    ctx.fill_path(&bezpath_to_cpu(path));
}

fn stroke_into(
    ctx: &mut vello_cpu::RenderContext,
    transform: Affine,
    path: &BezPath,
    style: &OverlayStyle,
    scale: f64,
) {
    let width = style.stroke_width * scale;
    if !width.is_finite() || width <= 0.0 {
        return;
    }
    let outline = stroke_outline(path, width, style.line_cap, &style.dash, scale);
    fill_into(ctx, transform, &outline, style.color);
}

/// Outline of `path` stroked at `width`, with the dash pattern authored in 500px-frame pixels.
pub(crate) fn stroke_outline(
    path: &BezPath,
    width: f64,
    cap: LineCap,
    dash: &[f64],
    scale: f64,
) -> BezPath {
    let cap = match cap {
        LineCap::Butt => kurbo::Cap::Butt,
        LineCap::Round => kurbo::Cap::Round,
        LineCap::Square => kurbo::Cap::Square,
    };
    let mut stroke = kurbo::Stroke::new(width).with_caps(cap);
    if dash.iter().any(|d| d.is_finite() && *d > 0.0) {
        stroke = stroke.with_dashes(0.0, dash.iter().map(|d| d.max(0.0) * scale));
    }
    kurbo::stroke(
        path.iter(),
        &stroke,
        &kurbo::StrokeOpts::default(),
        PATH_TOLERANCE,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/render/overlay.rs"]
mod tests;
