use std::sync::Arc;

use crate::assets::media::{AudioPcm, AudioSource, MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::audio::automation::{GainAutomation, ducking_automation, fade_automation};
use crate::audio::ducking::{DuckingIntervalOpts, build_ducking_intervals};
use crate::foundation::core::TimeSpan;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Seconds of silence rendered past the last slide so release tails are not cut.
pub const MIX_TAIL_SECS: f64 = 1.0;

pub(crate) const DUCK_LEAD_SECS: f64 = 0.05;
pub(crate) const DUCK_TAIL_SECS: f64 = 0.15;
pub(crate) const DUCK_ATTACK_SECS: f64 = 0.25;
pub(crate) const DUCK_RELEASE_SECS: f64 = 0.6;

/// Loop window in source seconds, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopRange {
    pub start: f64,
    pub end: f64,
}

/// Background music bed.
#[derive(Clone, Debug)]
pub struct MusicTrack {
    pub source: AudioSource,
    pub loop_range: Option<LoopRange>,
    pub volume: f32,
}

/// A narration track starting at a fixed point of the timeline.
#[derive(Clone, Debug)]
pub struct NarrationTrack {
    pub source: AudioSource,
    pub volume: f32,
}

/// Narration attached to one slide, starting `offset` seconds into it.
#[derive(Clone, Debug)]
pub struct SlideNarration {
    pub slide_index: usize,
    pub offset: f64,
    pub track: NarrationTrack,
}

/// Lower the music while any narration plays.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DuckingSettings {
    pub enabled: bool,
    /// Music gain while ducked.
    pub volume: f32,
}

impl Default for DuckingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.2,
        }
    }
}

/// Everything needed to render the soundtrack of one job.
#[derive(Clone, Debug, Default)]
pub struct AudioMixPlan {
    pub music: Option<MusicTrack>,
    /// Narration covering the whole slideshow; starts at `0`.
    pub narration: Option<NarrationTrack>,
    pub slide_narrations: Vec<SlideNarration>,
    pub fade_in: bool,
    pub fade_out: bool,
    pub ducking: DuckingSettings,
}

impl AudioMixPlan {
    /// Whether the plan produces any sound at all.
    pub fn has_sources(&self) -> bool {
        self.music.is_some() || self.narration.is_some() || !self.slide_narrations.is_empty()
    }
}

struct ScheduledVoice {
    start: f64,
    volume: f32,
    pcm: Arc<AudioPcm>,
}

/// Render the mixed soundtrack: interleaved stereo at [`MIX_SAMPLE_RATE`] covering the sum of
/// `slide_durations` plus [`MIX_TAIL_SECS`].
///
/// Any source that fails to decode fails the whole mix.
#[tracing::instrument(
    level = "debug",
    skip(plan, slide_durations),
    fields(slides = slide_durations.len())
)]
pub fn render_mix(plan: &AudioMixPlan, slide_durations: &[f64]) -> SlidecastResult<AudioPcm> {
    if slide_durations.iter().any(|d| !d.is_finite() || *d < 0.0) {
        return Err(SlidecastError::validation(
            "slide durations must be finite and >= 0",
        ));
    }
    let total: f64 = slide_durations.iter().sum();
    let rate = MIX_SAMPLE_RATE;
    let out_frames = ((total + MIX_TAIL_SECS) * f64::from(rate)).ceil() as usize;
    let mut bus = AudioPcm::silence(rate, MIX_CHANNELS, out_frames);

    let mut slide_starts = Vec::with_capacity(slide_durations.len());
    let mut cursor = 0.0;
    for d in slide_durations {
        slide_starts.push(cursor);
        cursor += d;
    }

    let mut voices = Vec::new();
    if let Some(n) = &plan.narration {
        voices.push(ScheduledVoice {
            start: 0.0,
            volume: n.volume,
            pcm: n.source.decode()?,
        });
    }
    for sn in &plan.slide_narrations {
        let slide_start = slide_starts.get(sn.slide_index).copied().ok_or_else(|| {
            SlidecastError::validation(format!(
                "narration references slide {} but the job has {} slides",
                sn.slide_index,
                slide_durations.len()
            ))
        })?;
        voices.push(ScheduledVoice {
            start: slide_start + sn.offset.max(0.0),
            volume: sn.track.volume,
            pcm: sn.track.source.decode()?,
        });
    }

    if let Some(music) = &plan.music {
        let pcm = music.source.decode()?;
        let fade = fade_automation(total, music.volume, plan.fade_in, plan.fade_out);
        let duck = if plan.ducking.enabled && !voices.is_empty() {
            let spans: Vec<TimeSpan> = voices
                .iter()
                .map(|v| TimeSpan::new(v.start, v.start + v.pcm.duration_secs()))
                .collect();
            let intervals = build_ducking_intervals(
                &spans,
                total,
                DuckingIntervalOpts {
                    lead: DUCK_LEAD_SECS,
                    tail: DUCK_TAIL_SECS,
                    merge_gap: DUCK_RELEASE_SECS,
                },
            );
            tracing::debug!(intervals = intervals.len(), "music ducking envelope");
            ducking_automation(
                &intervals,
                plan.ducking.volume,
                DUCK_ATTACK_SECS,
                DUCK_RELEASE_SECS,
            )
        } else {
            GainAutomation::constant(1.0)
        };
        mix_music(&mut bus, &pcm, music.loop_range, total, &fade, &duck);
    }

    for v in &voices {
        mix_voice(&mut bus, v);
    }

    for s in &mut bus.interleaved_f32 {
        *s = s.clamp(-1.0, 1.0);
    }
    Ok(bus)
}

fn mix_music(
    bus: &mut AudioPcm,
    src: &AudioPcm,
    loop_range: Option<LoopRange>,
    total: f64,
    fade: &GainAutomation,
    duck: &GainAutomation,
) {
    let src_dur = src.duration_secs();
    if src_dur <= 0.0 {
        return;
    }
    let (loop_start, loop_end) = match loop_range {
        Some(r)
            if r.start.is_finite() && r.end.is_finite() && r.start >= 0.0 && r.start < src_dur =>
        {
            let end = r.end.min(src_dur);
            if end > r.start { (r.start, end) } else { (0.0, src_dur) }
        }
        _ => (0.0, src_dur),
    };
    let loop_len = loop_end - loop_start;

    let rate = f64::from(bus.sample_rate);
    let end_frame = ((total * rate).ceil() as usize).min(bus.frames());
    for i in 0..end_frame {
        let t = i as f64 / rate;
        if t >= total {
            break;
        }
        let src_t = loop_start + t.rem_euclid(loop_len);
        let (l, r) = sample_stereo(src, src_t * f64::from(src.sample_rate));
        let gain = fade.value_at(t) * duck.value_at(t);
        bus.interleaved_f32[i * 2] += l * gain;
        bus.interleaved_f32[i * 2 + 1] += r * gain;
    }
}

fn mix_voice(bus: &mut AudioPcm, voice: &ScheduledVoice) {
    let src = voice.pcm.as_ref();
    let src_frames = src.frames();
    if src_frames == 0 || src.sample_rate == 0 {
        return;
    }
    let rate = f64::from(bus.sample_rate);
    let first = (voice.start * rate).round().max(0.0) as usize;
    let len = (src.duration_secs() * rate).ceil() as usize;
    let last = first.saturating_add(len).min(bus.frames());
    let step = f64::from(src.sample_rate) / rate;

    for dst in first..last {
        let pos = (dst - first) as f64 * step;
        if pos >= src_frames as f64 {
            break;
        }
        let (l, r) = sample_stereo(src, pos);
        bus.interleaved_f32[dst * 2] += l * voice.volume;
        bus.interleaved_f32[dst * 2 + 1] += r * voice.volume;
    }
}

/// Linearly interpolated stereo sample at fractional source frame `pos`. Mono is duplicated;
/// channels past the second are ignored.
fn sample_stereo(src: &AudioPcm, pos: f64) -> (f32, f32) {
    let frames = src.frames();
    let ch = usize::from(src.channels);
    if frames == 0 || !pos.is_finite() || pos < 0.0 {
        return (0.0, 0.0);
    }
    let f0 = (pos.floor() as usize).min(frames - 1);
    let f1 = (f0 + 1).min(frames - 1);
    let frac = (pos - f0 as f64).clamp(0.0, 1.0) as f32;
    let data = &src.interleaved_f32;

    let at = |frame: usize, c: usize| data[frame * ch + c.min(ch - 1)];
    let l = at(f0, 0) + (at(f1, 0) - at(f0, 0)) * frac;
    let r = at(f0, 1) + (at(f1, 1) - at(f0, 1)) * frac;
    (l, r)
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
