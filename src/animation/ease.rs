/// Easing functions used to map normalized animation progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ease {
    /// Linear interpolation.
    Linear,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
}

impl Ease {
    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
        }
    }
}

/// Length of the entry (and exit) phase of an overlay visible for `visible_secs`.
pub(crate) fn phase_len(visible_secs: f64) -> f64 {
    (visible_secs / 2.0).clamp(0.0, 1.0)
}

/// Eased presence of an overlay at `local` seconds into a visible window of `visible_secs`.
///
/// Returns `(entry, exit)`: `entry` rises 0 -> 1 over the entry phase with [`Ease::OutCubic`],
/// `exit` falls 1 -> 0 over the exit phase with [`Ease::InCubic`]. Both are `1.0` outside their
/// phase.
pub(crate) fn entry_exit_progress(local: f64, visible_secs: f64) -> (f64, f64) {
    let phase = phase_len(visible_secs);
    if phase <= 0.0 {
        return (1.0, 1.0);
    }
    let entry = Ease::OutCubic.apply(local / phase);
    let into_exit = local - (visible_secs - phase);
    let exit = if into_exit > 0.0 {
        1.0 - Ease::InCubic.apply(into_exit / phase)
    } else {
        1.0
    };
    (entry, exit)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
