use crate::foundation::core::TimeSpan;

/// Piecewise-linear gain curve over timeline seconds.
///
/// Before the first point the first value holds, after the last point the last value holds.
#[derive(Clone, Debug, PartialEq)]
pub struct GainAutomation {
    points: Vec<(f64, f32)>,
}

impl GainAutomation {
    /// A flat curve at `gain`.
    pub fn constant(gain: f32) -> Self {
        Self {
            points: vec![(0.0, gain)],
        }
    }

    /// Append a breakpoint. Points must be added in non-decreasing time order; an earlier time
    /// is moved up to the last point's time.
    pub fn push(&mut self, t: f64, gain: f32) {
        let t = match self.points.last() {
            Some(&(last, _)) if t < last => last,
            _ => t,
        };
        self.points.push((t, gain));
    }

    pub fn points(&self) -> &[(f64, f32)] {
        &self.points
    }

    /// Gain at time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let Some(&(first_t, first_v)) = self.points.first() else {
            return 1.0;
        };
        if t < first_t {
            return first_v;
        }
        // Last point whose time is <= t; on coincident times the later point wins.
        let idx = self.points.partition_point(|&(pt, _)| pt <= t);
        let (t0, v0) = self.points[idx - 1];
        let Some(&(t1, v1)) = self.points.get(idx) else {
            return v0;
        };
        let span = t1 - t0;
        if span <= 0.0 {
            return v1;
        }
        let f = ((t - t0) / span) as f32;
        v0 + (v1 - v0) * f
    }
}

/// Music volume ramp: `0 -> volume` over the first `min(2, T/2)` seconds when `fade_in`, and
/// `volume -> 0` over the last `min(2, T/2)` seconds when `fade_out`.
pub fn fade_automation(
    total_duration: f64,
    volume: f32,
    fade_in: bool,
    fade_out: bool,
) -> GainAutomation {
    let fade = (total_duration / 2.0).clamp(0.0, 2.0);
    if fade <= 0.0 || (!fade_in && !fade_out) {
        return GainAutomation::constant(volume);
    }
    let mut curve = GainAutomation::constant(if fade_in { 0.0 } else { volume });
    if fade_in {
        curve.push(fade, volume);
    }
    if fade_out {
        curve.push(total_duration - fade, volume);
        curve.push(total_duration, 0.0);
    }
    curve
}

/// Ducking envelope for the music bus.
///
/// Per interval: unity until `attack` before its start, linear down to `duck_volume` at the
/// start, hold to the end, linear back to unity over `release`.
pub fn ducking_automation(
    intervals: &[TimeSpan],
    duck_volume: f32,
    attack: f64,
    release: f64,
) -> GainAutomation {
    let mut curve = GainAutomation::constant(1.0);
    let mut last_t = 0.0f64;
    for iv in intervals {
        let ramp_start = (iv.start - attack).max(last_t);
        if ramp_start > last_t {
            curve.push(ramp_start, 1.0);
        }
        curve.push(iv.start.max(last_t), duck_volume);
        curve.push(iv.end.max(last_t), duck_volume);
        let back = iv.end + release;
        curve.push(back, 1.0);
        last_t = back;
    }
    curve
}

#[cfg(test)]
#[path = "../../tests/unit/audio/automation.rs"]
mod tests;
