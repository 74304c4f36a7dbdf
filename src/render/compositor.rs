use std::collections::HashSet;

use crate::assets::color::ColorDef;
use crate::assets::decode::{AnimatedImage, PreparedImage};
use crate::assets::fonts::FontRegistry;
use crate::composition::layers::Layer;
use crate::composition::model::{EffectType, SlideDef, SlideLayout};
use crate::composition::settings::VideoSettings;
use crate::effects::ken_burns::KenBurns;
use crate::effects::transitions::{TransitionKind, composite_transition};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, Rect, Vec2};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;
use crate::render::cpu::{
    affine_to_cpu, apply_coverage_in_place, dims_u16, expected_len, image_paint, path_coverage,
    premul_over_in_place_opacity,
};
use crate::render::overlay::{OverlayFrame, OverlayImages, render_overlay};

/// Decoded visual of one slide.
#[derive(Clone, Debug)]
pub enum SlideVisual {
    Bitmap(PreparedImage),
    Animated(AnimatedImage),
    Solid(ColorDef),
}

impl SlideVisual {
    fn size(&self) -> Option<(u32, u32)> {
        match self {
            Self::Bitmap(img) => Some((img.width, img.height)),
            Self::Animated(anim) => Some((anim.width, anim.height)),
            Self::Solid(_) => None,
        }
    }
}

/// A slide with its visual decoded and its layer order validated.
#[derive(Clone, Debug)]
pub struct PreparedSlide {
    pub def: SlideDef,
    pub visual: SlideVisual,
    pub layers: Vec<Layer>,
}

/// What sits behind the slides.
#[derive(Clone, Debug)]
pub enum BackgroundFill {
    Solid(ColorDef),
    /// Cover-fit and centered.
    Image(PreparedImage),
}

/// Everything the compositor owns for one job.
#[derive(Debug)]
pub struct CompositorParts {
    pub settings: VideoSettings,
    pub slides: Vec<PreparedSlide>,
    pub background: BackgroundFill,
    pub fonts: FontRegistry,
    pub images: OverlayImages,
}

/// Where a timeline instant falls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelinePos {
    pub slide_index: usize,
    /// Seconds into the slide.
    pub local: f64,
    /// Linear transition progress when inside the slide's outgoing transition window.
    pub transition: Option<f64>,
}

struct SlideState {
    slide: PreparedSlide,
    rect: Rect,
    clip: Vec<u8>,
    transition: TransitionKind,
    transition_secs: f64,
    ken_burns: Option<KenBurns>,
    /// One paint per visual frame; empty for solid fills.
    paints: Vec<vello_cpu::Image>,
}

/// Per-frame compositor for a slideshow: background, slides with Ken Burns motion, transitions
/// and overlays, producing premultiplied RGBA8 frames at a fixed rate.
pub struct Compositor {
    canvas: Canvas,
    fps: Fps,
    background: Vec<u8>,
    slides: Vec<SlideState>,
    starts: Vec<f64>,
    total_secs: f64,
    fonts: FontRegistry,
    images: OverlayImages,
    next_start_scene: Option<(usize, Vec<u8>)>,
    failed_overlays: HashSet<(usize, usize)>,
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("canvas", &self.canvas)
            .field("slides", &self.slides.len())
            .field("total_secs", &self.total_secs)
            .finish()
    }
}

impl Compositor {
    pub fn new(parts: CompositorParts) -> SlidecastResult<Self> {
        let CompositorParts {
            settings,
            slides,
            background,
            fonts,
            images,
        } = parts;
        settings.validate()?;
        if slides.is_empty() {
            return Err(SlidecastError::validation("slideshow has no slides"));
        }

        let canvas = settings.canvas();
        let radius = settings.slide_radius * canvas.style_scale();
        let mut states = Vec::with_capacity(slides.len());
        let mut starts = Vec::with_capacity(slides.len());
        let mut cursor = 0.0f64;
        for slide in slides {
            let def = &slide.def;
            if !def.duration.is_finite() || def.duration <= 0.0 {
                return Err(SlidecastError::validation(format!(
                    "slide '{}' duration must be finite and > 0",
                    def.id
                )));
            }
            if let Some(crop) = def.crop
                && !(crop.width > 0.0 && crop.height > 0.0)
            {
                return Err(SlidecastError::validation(format!(
                    "slide '{}' crop must have a positive size",
                    def.id
                )));
            }

            let aspect = match (def.crop, slide.visual.size()) {
                (Some(crop), _) => crop.width / crop.height,
                (None, Some((w, h))) if w > 0 && h > 0 => f64::from(w) / f64::from(h),
                _ => f64::from(canvas.width) / f64::from(canvas.height),
            };
            let rect = slide_rect(canvas, settings.slide_scale, aspect, def.layout);
            let clip_path = kurbo::Shape::to_path(&rect.to_rounded_rect(radius), 0.1);
            let clip = path_coverage(canvas.width, canvas.height, &clip_path)?;

            let paints = match &slide.visual {
                SlideVisual::Bitmap(img) => vec![image_paint(img)?],
                SlideVisual::Animated(anim) => anim
                    .frames
                    .iter()
                    .map(image_paint)
                    .collect::<SlidecastResult<Vec<_>>>()?,
                SlideVisual::Solid(_) => Vec::new(),
            };

            let transition_secs = def
                .transition_duration
                .unwrap_or(settings.transition_duration);
            let transition_secs = if transition_secs.is_finite() {
                transition_secs.clamp(0.0, def.duration)
            } else {
                0.0
            };

            let transition = TransitionKind::parse(&def.transition);
            let ken_burns =
                (def.effect == EffectType::KenBurns).then(|| KenBurns::for_slide(&def.id));

            starts.push(cursor);
            cursor += def.duration;
            states.push(SlideState {
                transition,
                transition_secs,
                ken_burns,
                rect,
                clip,
                paints,
                slide,
            });
        }

        let background = render_background(canvas, &background)?;
        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            slides = states.len(),
            total_secs = cursor,
            "compositor ready"
        );
        Ok(Self {
            canvas,
            fps: settings.fps(),
            background,
            slides: states,
            starts,
            total_secs: cursor,
            fonts,
            images,
            next_start_scene: None,
            failed_overlays: HashSet::new(),
        })
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn fps(&self) -> Fps {
        self.fps
    }

    pub fn total_secs(&self) -> f64 {
        self.total_secs
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Destination rectangle of slide `index` in canvas pixels.
    pub fn slide_rect(&self, index: usize) -> Option<Rect> {
        self.slides.get(index).map(|s| s.rect)
    }

    /// Number of output frames: the timeline length rounded to whole frames.
    pub fn frame_count(&self) -> u64 {
        self.fps.secs_to_frames_round(self.total_secs)
    }

    pub fn frame_time(&self, idx: FrameIndex) -> f64 {
        idx.0 as f64 / self.fps.as_f64()
    }

    /// Locate timeline time `t` (clamped to the timeline).
    pub fn locate(&self, t: f64) -> TimelinePos {
        let t = if t.is_finite() {
            t.clamp(0.0, self.total_secs)
        } else {
            0.0
        };
        let last = self.slides.len() - 1;
        let slide_index = self
            .starts
            .partition_point(|&s| s <= t)
            .saturating_sub(1)
            .min(last);
        let local = t - self.starts[slide_index];
        let state = &self.slides[slide_index];
        let duration = state.slide.def.duration;
        let td = state.transition_secs;

        let transition = if slide_index < last && td > 0.0 && local >= duration - td {
            Some(((local - (duration - td)) / td).clamp(0.0, 1.0))
        } else {
            None
        };
        TimelinePos {
            slide_index,
            local,
            transition,
        }
    }

    /// Compose output frame `idx`.
    pub fn render_frame(&mut self, idx: FrameIndex) -> SlidecastResult<FrameRGBA> {
        let t = self.frame_time(idx);
        self.render_still(t)
    }

    /// Compose the frame at timeline time `t`, transitions included.
    pub fn render_still(&mut self, t: f64) -> SlidecastResult<FrameRGBA> {
        let pos = self.locate(t);
        let mut data = self.background.clone();
        let a = self.scene(pos.slide_index, pos.local)?;
        match pos.transition {
            Some(p) => {
                let next = pos.slide_index + 1;
                let b = self.next_start_scene(next)?;
                let kind = self.slides[pos.slide_index].transition;
                composite_transition(
                    kind,
                    &mut data,
                    &a,
                    &b,
                    self.canvas.width,
                    self.canvas.height,
                    p,
                )?;
                self.next_start_scene = Some((next, b));
            }
            None => premul_over_in_place_opacity(&mut data, &a, 1.0)?,
        }
        Ok(self.frame(data))
    }

    /// Compose slide `index` alone at `local` seconds, with no transition blending.
    pub fn render_slide(&mut self, index: usize, local: f64) -> SlidecastResult<FrameRGBA> {
        if index >= self.slides.len() {
            return Err(SlidecastError::validation(format!(
                "slide index {index} out of range"
            )));
        }
        let mut data = self.background.clone();
        let scene = self.scene(index, local)?;
        premul_over_in_place_opacity(&mut data, &scene, 1.0)?;
        Ok(self.frame(data))
    }

    /// Drive `sink` through every frame of the timeline.
    ///
    /// `on_frame` runs after each frame is accepted by the sink, with the frame index and the
    /// index of the slide it belongs to; an error from it aborts the render.
    pub fn render_to_sink(
        &mut self,
        sink: &mut dyn FrameSink,
        on_frame: &mut dyn FnMut(FrameIndex, usize) -> SlidecastResult<()>,
    ) -> SlidecastResult<()> {
        let frame_count = self.frame_count();
        sink.begin(SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.fps,
            frame_count,
        })?;
        for f in 0..frame_count {
            let idx = FrameIndex(f);
            let frame = self.render_frame(idx)?;
            sink.push_frame(idx, &frame)?;
            let slide_index = self.locate(self.frame_time(idx)).slide_index;
            on_frame(idx, slide_index)?;
        }
        sink.end()
    }

    fn frame(&self, data: Vec<u8>) -> FrameRGBA {
        FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data,
            premultiplied: true,
        }
    }

    fn next_start_scene(&mut self, index: usize) -> SlidecastResult<Vec<u8>> {
        match self.next_start_scene.take() {
            Some((cached, scene)) if cached == index => Ok(scene),
            _ => self.scene(index, 0.0),
        }
    }

    /// Slide visual plus overlays in layer order over a transparent buffer.
    fn scene(&mut self, index: usize, local: f64) -> SlidecastResult<Vec<u8>> {
        let Self {
            canvas,
            slides,
            fonts,
            images,
            failed_overlays,
            ..
        } = self;
        let canvas = *canvas;
        let state = &slides[index];
        let mut scene = vec![0u8; expected_len(canvas.width, canvas.height)?];

        for layer in &state.slide.layers {
            match *layer {
                Layer::Slide => draw_visual(canvas, state, local, &mut scene)?,
                Layer::Overlay(i) => {
                    let Some(overlay) = state.slide.def.overlays.get(i) else {
                        continue;
                    };
                    let frame = OverlayFrame {
                        canvas,
                        slide_rect: state.rect,
                        slide_clip: &state.clip,
                        slide_local_t: local,
                        slide_duration: state.slide.def.duration,
                    };
                    if let Err(err) = render_overlay(overlay, &frame, fonts, images, &mut scene)
                        && failed_overlays.insert((index, i))
                    {
                        tracing::warn!(
                            slide = %state.slide.def.id,
                            overlay = %overlay.id,
                            error = %err,
                            "skipping overlay that failed to draw"
                        );
                    }
                }
            }
        }
        Ok(scene)
    }
}

/// Slide destination rectangle: a `scale_pct` box centered on the canvas with the visual
/// aspect-fit inside, unless an explicit normalized layout places it.
pub(crate) fn slide_rect(
    canvas: Canvas,
    scale_pct: f64,
    aspect: f64,
    layout: Option<SlideLayout>,
) -> Rect {
    let cw = f64::from(canvas.width);
    let ch = f64::from(canvas.height);
    let aspect = if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        cw / ch
    };

    if let Some(layout) = layout {
        let x0 = layout.x * cw;
        let y0 = layout.y * ch;
        let w = layout.width * cw;
        return Rect::new(x0, y0, x0 + w, y0 + w / aspect);
    }

    let s = (scale_pct / 100.0).clamp(0.0, 1.0);
    let (box_w, box_h) = (cw * s, ch * s);
    let (w, h) = if aspect > box_w / box_h {
        (box_w, box_w / aspect)
    } else {
        (box_h * aspect, box_h)
    };
    let x0 = (cw - w) / 2.0;
    let y0 = (ch - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

fn draw_visual(
    canvas: Canvas,
    state: &SlideState,
    local: f64,
    scene: &mut [u8],
) -> SlidecastResult<()> {
    let def = &state.slide.def;
    let draw = match state.ken_burns {
        Some(kb) => kb.draw_rect(state.rect, local / def.duration),
        None => state.rect,
    };

    let (w16, h16) = dims_u16(canvas.width, canvas.height)?;
    let mut ctx = vello_cpu::RenderContext::new(w16, h16);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

    match &state.slide.visual {
        SlideVisual::Solid(color) => {
            let [r, g, b, a] = color.to_rgba8_straight();
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(draw.x0, draw.y0, draw.x1, draw.y1));
        }
        visual => {
            let frame_index = match visual {
                SlideVisual::Animated(anim) => anim.frame_index_at(local),
                _ => 0,
            };
            let paint = state.paints.get(frame_index).cloned().ok_or_else(|| {
                SlidecastError::render(format!("slide '{}' has no visual frame", def.id))
            })?;
            let (iw, ih) = visual.size().unwrap_or((1, 1));
            let crop = def.crop.map_or(
                Rect::new(0.0, 0.0, f64::from(iw), f64::from(ih)),
                |c| Rect::new(c.x, c.y, c.x + c.width, c.y + c.height),
            );
            let transform = Affine::translate(Vec2::new(draw.x0, draw.y0))
                * Affine::scale_non_uniform(
                    draw.width() / crop.width(),
                    draw.height() / crop.height(),
                )
                * Affine::translate(Vec2::new(-crop.x0, -crop.y0));
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(crop.x0, crop.y0, crop.x1, crop.y1));
        }
    }

    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    let mut layer = pixmap.data_as_u8_slice().to_vec();
    apply_coverage_in_place(&mut layer, &state.clip);
    premul_over_in_place_opacity(scene, &layer, 1.0)
}

fn render_background(canvas: Canvas, fill: &BackgroundFill) -> SlidecastResult<Vec<u8>> {
    let len = expected_len(canvas.width, canvas.height)?;
    match fill {
        BackgroundFill::Solid(color) => {
            let px = color.to_rgba8_premul().to_array();
            let mut out = Vec::with_capacity(len);
            for _ in 0..len / 4 {
                out.extend_from_slice(&px);
            }
            Ok(out)
        }
        BackgroundFill::Image(img) => {
            if img.width == 0 || img.height == 0 {
                return Err(SlidecastError::asset("background image is empty"));
            }
            let (w16, h16) = dims_u16(canvas.width, canvas.height)?;
            let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));
            let (iw, ih) = (f64::from(img.width), f64::from(img.height));
            let s = (cw / iw).max(ch / ih);
            let transform = Affine::translate(Vec2::new((cw - iw * s) / 2.0, (ch - ih * s) / 2.0))
                * Affine::scale(s);

            let mut ctx = vello_cpu::RenderContext::new(w16, h16);
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 255));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, cw, ch));
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(image_paint(img)?);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
            let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(pixmap.data_as_u8_slice().to_vec())
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
