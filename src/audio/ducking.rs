use crate::foundation::core::TimeSpan;
use crate::foundation::math::sanitize_non_negative;

/// Padding and merge options for [`build_ducking_intervals`].
///
/// Non-finite or negative values are treated as `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DuckingIntervalOpts {
    /// Seconds added before each segment start.
    pub lead: f64,
    /// Seconds added after each segment end.
    pub tail: f64,
    /// Intervals separated by a gap of at most this many seconds are merged.
    pub merge_gap: f64,
}

/// Turn narration segments into the minimal start-ascending list of "music should be lowered"
/// windows.
///
/// Segments with non-finite bounds or `end <= start` are dropped. Each segment is padded by
/// `lead`/`tail` and clamped to `[0, total_duration]`; a non-finite or non-positive
/// `total_duration` leaves the upper bound open.
pub fn build_ducking_intervals(
    segments: &[TimeSpan],
    total_duration: f64,
    opts: DuckingIntervalOpts,
) -> Vec<TimeSpan> {
    let lead = sanitize_non_negative(opts.lead);
    let tail = sanitize_non_negative(opts.tail);
    let merge_gap = sanitize_non_negative(opts.merge_gap);
    let upper = if total_duration.is_finite() && total_duration > 0.0 {
        total_duration
    } else {
        f64::INFINITY
    };

    let mut padded: Vec<TimeSpan> = segments
        .iter()
        .filter(|s| s.start.is_finite() && s.end.is_finite() && s.end > s.start)
        .map(|s| TimeSpan::new((s.start - lead).max(0.0), (s.end + tail).min(upper)))
        .filter(|s| s.end > s.start)
        .collect();
    padded.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut out: Vec<TimeSpan> = Vec::with_capacity(padded.len());
    for span in padded {
        match out.last_mut() {
            Some(prev) if span.start - prev.end <= merge_gap => {
                prev.end = prev.end.max(span.end);
            }
            _ => out.push(span),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/audio/ducking.rs"]
mod tests;
