use crate::assets::color::ColorDef;
use crate::assets::fonts::{FontRegistry, TextBrushRgba8};
use crate::composition::model::TextAlign;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::cpu::{affine_to_cpu, bezpath_to_cpu};

/// Fully resolved text draw, in canvas pixels.
#[derive(Clone, Debug)]
pub(crate) struct TextDraw<'a> {
    pub(crate) text: &'a str,
    pub(crate) family: Option<&'a str>,
    pub(crate) size_px: f32,
    pub(crate) color: ColorDef,
    pub(crate) align: TextAlign,
    /// Wrap width; `None` keeps each paragraph on one line.
    pub(crate) max_width: Option<f32>,
    pub(crate) stroke: Option<(ColorDef, f64)>,
    /// Background color, padding and corner radius.
    pub(crate) background: Option<(ColorDef, f64, f64)>,
}

/// Lay out `draw` with its top-left corner at `origin` inside a box `box_width` wide, then fill
/// (and stroke) its glyphs through `transform`.
///
/// Returns the untransformed bounds of the drawn text block, background included.
pub(crate) fn draw_text(
    ctx: &mut vello_cpu::RenderContext,
    fonts: &mut FontRegistry,
    transform: Affine,
    origin: kurbo::Point,
    box_width: f64,
    draw: &TextDraw<'_>,
) -> SlidecastResult<Rect> {
    let family = fonts
        .resolve(draw.family)
        .map(str::to_owned)
        .ok_or_else(|| SlidecastError::asset("no font registered for text overlay"))?;
    let face = fonts
        .face(&family)
        .cloned()
        .ok_or_else(|| SlidecastError::asset(format!("font family '{family}' has no face")))?;

    let [r, g, b, a] = draw.color.to_rgba8_straight();
    let brush = TextBrushRgba8 { r, g, b, a };
    let layout = fonts.layout_plain(draw.text, &family, draw.size_px, brush, draw.max_width)?;

    let container = if box_width > 0.0 {
        box_width
    } else {
        f64::from(layout.width())
    };
    let line_dx: Vec<f64> = layout
        .lines()
        .map(|line| {
            let advance = f64::from(line.metrics().advance);
            match draw.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (container - advance) / 2.0,
                TextAlign::Right => container - advance,
            }
        })
        .collect();

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    for (line, dx) in layout.lines().zip(&line_dx) {
        x_min = x_min.min(*dx);
        x_max = x_max.max(dx + f64::from(line.metrics().advance));
    }
    if !x_min.is_finite() {
        x_min = 0.0;
        x_max = 0.0;
    }
    let mut bounds = Rect::new(
        origin.x + x_min,
        origin.y,
        origin.x + x_max,
        origin.y + f64::from(layout.height()),
    );

    ctx.set_transform(affine_to_cpu(transform));
    if let Some((color, padding, radius)) = draw.background {
        bounds = bounds.inflate(padding, padding);
        let path = kurbo::Shape::to_path(&bounds.to_rounded_rect(radius.max(0.0)), 0.1);
        let [r, g, b, a] = color.to_rgba8_straight();
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_path(&bezpath_to_cpu(&path));
    }

    for (line, dx) in layout.lines().zip(&line_dx) {
        let ox = (origin.x + dx) as f32;
        let oy = origin.y as f32;
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = || {
                run.positioned_glyphs().map(move |g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x + ox,
                    y: g.y + oy,
                })
            };

            if let Some((color, width)) = draw.stroke
                && width > 0.0
            {
                let [r, g, b, a] = color.to_rgba8_straight();
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
                ctx.glyph_run(&face)
                    .font_size(run.run().font_size())
                    .stroke_glyphs(glyphs());
            }

            let brush = run.style().brush;
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            ctx.glyph_run(&face)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs());
        }
    }

    Ok(bounds)
}
