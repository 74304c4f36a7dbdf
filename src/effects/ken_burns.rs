use crate::foundation::core::Rect;
use crate::foundation::math::lerp;

/// Largest pan offset as a fraction of the destination size.
const PAN_EXTENT: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KenBurnsMotion {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    PanUp,
    PanDown,
}

const MOTIONS: [KenBurnsMotion; 6] = [
    KenBurnsMotion::ZoomIn,
    KenBurnsMotion::ZoomOut,
    KenBurnsMotion::PanLeft,
    KenBurnsMotion::PanRight,
    KenBurnsMotion::PanUp,
    KenBurnsMotion::PanDown,
];

/// Slow zoom or pan of a slide visual, derived purely from the slide id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KenBurns {
    pub motion: KenBurnsMotion,
    /// Extra scale on top of 1.0 at the zoomed end of the motion.
    pub intensity: f64,
}

impl KenBurns {
    pub fn for_slide(id: &str) -> Self {
        let hash = id.chars().fold(0u32, |acc, c| acc.wrapping_add(c as u32));
        Self {
            motion: MOTIONS[(hash % MOTIONS.len() as u32) as usize],
            intensity: 0.10 + f64::from(hash % 5) * 0.02,
        }
    }

    /// Rectangle to draw the visual into at slide progress `progress` (`t / duration`).
    ///
    /// The caller clips the result to `dest`.
    pub fn draw_rect(&self, dest: Rect, progress: f64) -> Rect {
        let p = if progress.is_finite() {
            progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let i = self.intensity;
        let scale = match self.motion {
            KenBurnsMotion::ZoomIn => 1.0 + i * p,
            KenBurnsMotion::ZoomOut => 1.0 + i * (1.0 - p),
            _ => 1.0 + i,
        };
        let (dx, dy) = match self.motion {
            KenBurnsMotion::PanRight => (lerp(-PAN_EXTENT, PAN_EXTENT, p) * dest.width(), 0.0),
            KenBurnsMotion::PanLeft => (lerp(PAN_EXTENT, -PAN_EXTENT, p) * dest.width(), 0.0),
            KenBurnsMotion::PanDown => (0.0, lerp(-PAN_EXTENT, PAN_EXTENT, p) * dest.height()),
            KenBurnsMotion::PanUp => (0.0, lerp(PAN_EXTENT, -PAN_EXTENT, p) * dest.height()),
            KenBurnsMotion::ZoomIn | KenBurnsMotion::ZoomOut => (0.0, 0.0),
        };

        let c = dest.center();
        let half_w = dest.width() * scale / 2.0;
        let half_h = dest.height() * scale / 2.0;
        Rect::new(
            c.x - half_w + dx,
            c.y - half_h + dy,
            c.x + half_w + dx,
            c.y + half_h + dy,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/ken_burns.rs"]
mod tests;
