use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::assets::media::AudioSource;
use crate::audio::mix::{AudioMixPlan, DuckingSettings, LoopRange, MusicTrack, NarrationTrack};
use crate::composition::model::SlideDef;
use crate::composition::settings::VideoSettings;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::job::intake::{JobAudio, RenderJob};

/// A render job as written by hand or by a host: JSON with asset paths relative to the
/// manifest's directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobSpec {
    pub settings: VideoSettings,
    /// Asset id to file path.
    pub assets: BTreeMap<String, PathBuf>,
    /// Font files, in registration order.
    pub fonts: Vec<PathBuf>,
    pub audio: Option<AudioSpec>,
    pub slides: Vec<SlideDef>,
}

/// Soundtrack section of a [`JobSpec`]. Sources name entries of [`JobSpec::assets`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioSpec {
    pub music: Option<MusicSpec>,
    pub narration: Option<NarrationSpec>,
    pub fade_in: bool,
    pub fade_out: bool,
    pub ducking: DuckingSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicSpec {
    pub asset: String,
    #[serde(default, rename = "loop")]
    pub loop_range: Option<LoopRange>,
    #[serde(default = "full_volume")]
    pub volume: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NarrationSpec {
    pub asset: String,
    #[serde(default = "full_volume")]
    pub volume: f32,
}

fn full_volume() -> f32 {
    1.0
}

impl JobSpec {
    pub fn from_json_str(s: &str) -> SlidecastResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a manifest from disk.
    pub fn load(path: &Path) -> SlidecastResult<Self> {
        let f = File::open(path)
            .with_context(|| format!("open job manifest '{}'", path.display()))?;
        let spec = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse job manifest '{}'", path.display()))?;
        Ok(spec)
    }

    /// Read a manifest and every asset it names into a [`RenderJob`].
    pub fn load_job(path: &Path) -> SlidecastResult<RenderJob> {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::load(path)?.into_render_job(base)
    }

    /// Resolve asset paths against `base_dir` and read them.
    ///
    /// Music and global narration are decoded from their files during intake; every other
    /// asset is read into memory here.
    #[tracing::instrument(level = "debug", skip(self), fields(assets = self.assets.len()))]
    pub fn into_render_job(self, base_dir: &Path) -> SlidecastResult<RenderJob> {
        let resolve = |id: &str| -> SlidecastResult<PathBuf> {
            let rel = self
                .assets
                .get(id)
                .ok_or_else(|| SlidecastError::asset(format!("unknown asset '{id}'")))?;
            Ok(base_dir.join(rel))
        };

        let audio = match &self.audio {
            None => JobAudio::None,
            Some(a) => {
                let music = match &a.music {
                    Some(m) => Some(MusicTrack {
                        source: AudioSource::File(resolve(&m.asset)?),
                        loop_range: m.loop_range,
                        volume: m.volume,
                    }),
                    None => None,
                };
                let narration = match &a.narration {
                    Some(n) => Some(NarrationTrack {
                        source: AudioSource::File(resolve(&n.asset)?),
                        volume: n.volume,
                    }),
                    None => None,
                };
                JobAudio::Plan(AudioMixPlan {
                    music,
                    narration,
                    slide_narrations: Vec::new(),
                    fade_in: a.fade_in,
                    fade_out: a.fade_out,
                    ducking: a.ducking,
                })
            }
        };

        let mut job = RenderJob::new(self.settings.clone(), self.slides.clone());
        job.audio = audio;
        for (id, rel) in &self.assets {
            let path = base_dir.join(rel);
            let bytes = std::fs::read(&path).map_err(|e| {
                SlidecastError::asset(format!("read asset '{id}' from '{}': {e}", path.display()))
            })?;
            job.assets.insert(id.clone(), Arc::new(bytes));
        }
        for rel in &self.fonts {
            let path = base_dir.join(rel);
            let bytes = std::fs::read(&path).map_err(|e| {
                SlidecastError::asset(format!("read font '{}': {e}", path.display()))
            })?;
            job.fonts.push(bytes);
        }
        tracing::debug!(slides = job.slides.len(), "job manifest loaded");
        Ok(job)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/manifest.rs"]
mod tests;
