use crate::assets::color::ColorDef;
use serde::{Deserialize, Serialize};

/// Id that stands for the slide's own visual inside [`SlideDef::layer_order`].
pub const SLIDE_LAYER_ID: &str = "__slide__";

/// One slide of the slideshow, as handed over by the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideDef {
    pub id: String,
    pub visual: VisualDef,
    /// Seconds on screen, including the outgoing transition.
    pub duration: f64,
    /// Transition into the next slide; unknown names play as `fade`.
    #[serde(default = "default_transition")]
    pub transition: String,
    /// Overrides the job-wide transition duration.
    #[serde(default)]
    pub transition_duration: Option<f64>,
    #[serde(default)]
    pub effect: EffectType,
    /// Source-pixel crop of the visual; the whole visual when absent.
    #[serde(default)]
    pub crop: Option<CropRect>,
    #[serde(default)]
    pub layout: Option<SlideLayout>,
    #[serde(default)]
    pub overlays: Vec<OverlayDef>,
    /// Bottom-to-top ids; [`SLIDE_LAYER_ID`] marks the slide visual.
    #[serde(default)]
    pub layer_order: Vec<String>,
    #[serde(default)]
    pub narration: Option<NarrationDef>,
}

fn default_transition() -> String {
    "fade".to_owned()
}

/// What a slide shows underneath its overlays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VisualDef {
    /// A still bitmap from the asset bundle.
    Image { asset: String },
    /// An animated image (GIF, WebP, APNG) from the asset bundle.
    Animated { asset: String },
    /// A solid fill.
    Color { color: ColorDef },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectType {
    #[default]
    None,
    KenBurns,
}

/// Crop rectangle in source pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Explicit slide placement in normalized canvas units. Height follows the visual's aspect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlideLayout {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

/// Per-slide narration clip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NarrationDef {
    pub asset: String,
    /// Seconds into the slide at which the narration starts.
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "one")]
    pub volume: f32,
}

fn one() -> f32 {
    1.0
}

/// A decorative element drawn on top of (or under) the slide visual.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDef {
    pub id: String,
    #[serde(flatten)]
    pub kind: OverlayKind,
    /// Normalized box inside the containment space. For lines and arrows the segment runs from
    /// `(x, y)` to `(x + width, y + height)`.
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub space: OverlaySpace,
    #[serde(default)]
    pub start_time: f64,
    /// Wins over `end_time` when both are set.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub end_time: Option<f64>,
    #[serde(default)]
    pub animation_in: OverlayAnimation,
    #[serde(default)]
    pub animation_out: OverlayAnimation,
    #[serde(default)]
    pub style: OverlayStyle,
    #[serde(default)]
    pub hidden: bool,
}

impl OverlayDef {
    /// Inclusive visibility window in slide seconds, clamped to the slide duration.
    pub fn visible_window(&self, slide_duration: f64) -> (f64, f64) {
        let start = self.start_time.max(0.0);
        let end = match (self.duration, self.end_time) {
            (Some(d), _) => start + d.max(0.0),
            (None, Some(e)) => e,
            (None, None) => slide_duration,
        };
        (start, end.min(slide_duration))
    }

    /// Whether the overlay is drawn at slide-local time `t`.
    pub fn is_visible_at(&self, t: f64, slide_duration: f64) -> bool {
        if self.hidden {
            return false;
        }
        let (start, end) = self.visible_window(slide_duration);
        end >= start && t >= start && t <= end
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlayKind {
    Text(TextOverlay),
    Line,
    Arrow {
        /// Head length in 500px-frame pixels; derived from the stroke width when absent.
        #[serde(default, rename = "headSize")]
        head_size: Option<f64>,
    },
    Rect,
    Circle,
    Image { asset: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub text: String,
    /// Font size in 500px-frame pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub align: TextAlign,
    /// Wrap at the overlay box width.
    #[serde(default = "yes")]
    pub wrap: bool,
}

fn default_font_size() -> f64 {
    24.0
}

fn yes() -> bool {
    true
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlaySpace {
    /// Normalized to the slide's destination rectangle and clipped to it.
    #[default]
    Slide,
    /// Normalized to the full frame, unclipped.
    Canvas,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayAnimation {
    #[default]
    None,
    Fade,
    Pop,
    SlideUp,
    SlideDown,
    SlideLeft,
    SlideRight,
    Zoom,
    RotateCw,
    RotateCcw,
    WipeRight,
    WipeDown,
    /// Text only; other overlays ignore it.
    Typewriter,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowDef {
    pub color: ColorDef,
    #[serde(default)]
    pub blur: f64,
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStrokeDef {
    pub color: ColorDef,
    pub width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBackgroundDef {
    pub color: ColorDef,
    #[serde(default)]
    pub padding: f64,
    #[serde(default)]
    pub radius: f64,
}

/// Visual style shared by every overlay kind. Pixel values are authored against a 500px-tall
/// frame and scaled to the output height.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlayStyle {
    /// Text fill, or shape stroke color.
    pub color: ColorDef,
    pub stroke_width: f64,
    pub fill: Option<ColorDef>,
    pub dash: Vec<f64>,
    pub line_cap: LineCap,
    pub text_stroke: Option<TextStrokeDef>,
    pub background: Option<TextBackgroundDef>,
    pub shadow: Option<ShadowDef>,
    /// Degrees, clockwise, about the overlay center.
    pub rotation: f64,
    pub flip_h: bool,
    pub flip_v: bool,
    /// Corner radius for rects and images.
    pub radius: f64,
    pub opacity: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: ColorDef::WHITE,
            stroke_width: 3.0,
            fill: None,
            dash: Vec::new(),
            line_cap: LineCap::Butt,
            text_stroke: None,
            background: None,
            shadow: None,
            rotation: 0.0,
            flip_h: false,
            flip_v: false,
            radius: 0.0,
            opacity: 1.0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/model.rs"]
mod tests;
