use crate::animation::ease::entry_exit_progress;
use crate::composition::model::OverlayAnimation;
use crate::foundation::core::Vec2;

/// Slide-in distance in 500px-frame pixels.
const SLIDE_DISTANCE: f64 = 50.0;
const POP_FROM_SCALE: f64 = 0.6;
const ROTATE_FROM_DEG: f64 = 90.0;

/// Axis a wipe reveals along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WipeAxis {
    /// Left to right.
    X,
    /// Top to bottom.
    Y,
}

/// Animated state of one overlay at one instant, applied on top of its authored style.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayAnimState {
    pub opacity: f64,
    /// Uniform scale about the overlay center.
    pub scale: f64,
    /// Translation in 500px-frame pixels.
    pub offset: Vec2,
    /// Extra rotation in degrees, clockwise.
    pub rotation_deg: f64,
    /// Visible fraction of the overlay box along the axis.
    pub wipe: Option<(WipeAxis, f64)>,
    /// Fraction of text characters revealed.
    pub reveal: Option<f64>,
}

impl Default for OverlayAnimState {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            scale: 1.0,
            offset: Vec2::ZERO,
            rotation_deg: 0.0,
            wipe: None,
            reveal: None,
        }
    }
}

impl OverlayAnimState {
    /// Whether drawing in this state produces no pixels.
    pub fn is_invisible(&self) -> bool {
        self.opacity <= 0.0
            || self.scale <= 0.0
            || self.wipe.is_some_and(|(_, f)| f <= 0.0)
            || self.reveal.is_some_and(|f| f <= 0.0)
    }
}

/// Combine the entry and exit animations of an overlay at `local` seconds into its visible
/// window of `visible_secs`.
///
/// `is_text` gates the typewriter animation; other overlay kinds ignore it.
pub fn animate(
    animation_in: OverlayAnimation,
    animation_out: OverlayAnimation,
    local: f64,
    visible_secs: f64,
    is_text: bool,
) -> OverlayAnimState {
    let (entry, exit) = entry_exit_progress(local, visible_secs);
    let mut state = OverlayAnimState::default();
    apply(&mut state, animation_in, entry, is_text);
    apply(&mut state, animation_out, exit, is_text);
    state
}

/// Fold one animation at presence `e` (0 hidden, 1 settled) into `state`.
fn apply(state: &mut OverlayAnimState, anim: OverlayAnimation, e: f64, is_text: bool) {
    let e = e.clamp(0.0, 1.0);
    if e >= 1.0 {
        return;
    }
    let away = 1.0 - e;
    match anim {
        OverlayAnimation::None => {}
        OverlayAnimation::Fade => state.opacity *= e,
        OverlayAnimation::Pop => {
            state.scale *= POP_FROM_SCALE + (1.0 - POP_FROM_SCALE) * e;
            state.opacity *= e;
        }
        OverlayAnimation::SlideUp => {
            state.offset.y += away * SLIDE_DISTANCE;
            state.opacity *= e;
        }
        OverlayAnimation::SlideDown => {
            state.offset.y -= away * SLIDE_DISTANCE;
            state.opacity *= e;
        }
        OverlayAnimation::SlideLeft => {
            state.offset.x += away * SLIDE_DISTANCE;
            state.opacity *= e;
        }
        OverlayAnimation::SlideRight => {
            state.offset.x -= away * SLIDE_DISTANCE;
            state.opacity *= e;
        }
        OverlayAnimation::Zoom => state.scale *= e,
        OverlayAnimation::RotateCw => {
            state.rotation_deg -= away * ROTATE_FROM_DEG;
            state.opacity *= e;
        }
        OverlayAnimation::RotateCcw => {
            state.rotation_deg += away * ROTATE_FROM_DEG;
            state.opacity *= e;
        }
        OverlayAnimation::WipeRight => state.wipe = Some(narrow(state.wipe, WipeAxis::X, e)),
        OverlayAnimation::WipeDown => state.wipe = Some(narrow(state.wipe, WipeAxis::Y, e)),
        OverlayAnimation::Typewriter => {
            if is_text {
                state.reveal = Some(state.reveal.map_or(e, |r| r.min(e)));
            }
        }
    }
}

fn narrow(current: Option<(WipeAxis, f64)>, axis: WipeAxis, e: f64) -> (WipeAxis, f64) {
    match current {
        Some((a, f)) if a == axis => (axis, f.min(e)),
        _ => (axis, e),
    }
}

/// Number of characters shown for a reveal fraction: `ceil(n * fraction)`.
pub fn revealed_chars(total_chars: usize, fraction: f64) -> usize {
    let f = fraction.clamp(0.0, 1.0);
    ((total_chars as f64) * f).ceil().min(total_chars as f64) as usize
}

#[cfg(test)]
#[path = "../../tests/unit/effects/overlay_anim.rs"]
mod tests;
