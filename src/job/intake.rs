use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::color::ColorDef;
use crate::assets::decode::{DecodedImage, decode_image, decode_image_frames};
use crate::assets::fonts::FontRegistry;
use crate::assets::media::{AudioPcm, AudioSource, MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::audio::mix::{AudioMixPlan, NarrationTrack, SlideNarration, render_mix};
use crate::composition::layers::normalize_layer_order;
use crate::composition::model::{OverlayKind, SlideDef, VisualDef};
use crate::composition::settings::{BackgroundDef, VideoSettings};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::compositor::{
    BackgroundFill, Compositor, CompositorParts, PreparedSlide, SlideVisual,
};
use crate::render::overlay::OverlayImages;

/// Soundtrack of a job.
#[derive(Clone, Debug, Default)]
pub enum JobAudio {
    /// Silent unless slides carry narration.
    #[default]
    None,
    /// Mixed during intake; per-slide narration from the slides is added to it.
    Plan(AudioMixPlan),
    /// Already mixed by the host: interleaved stereo at the mix rate. Slide narration is ignored.
    Mixed(AudioPcm),
}

/// Everything one render needs, handed over by the host and owned by the worker for the job
/// lifetime.
#[derive(Clone, Debug)]
pub struct RenderJob {
    pub settings: VideoSettings,
    pub slides: Vec<SlideDef>,
    /// Encoded payloads by asset id: slide visuals, overlay images, the background image and
    /// narration audio.
    pub assets: HashMap<String, Arc<Vec<u8>>>,
    /// Raw font files; the first registered family is the default for text overlays.
    pub fonts: Vec<Vec<u8>>,
    pub audio: JobAudio,
}

/// A job after intake: decoded visuals and the mixed soundtrack.
#[derive(Debug)]
pub(crate) struct PreparedJob {
    pub(crate) parts: CompositorParts,
    pub(crate) audio: Option<AudioPcm>,
}

impl RenderJob {
    pub fn new(settings: VideoSettings, slides: Vec<SlideDef>) -> Self {
        Self {
            settings,
            slides,
            assets: HashMap::new(),
            fonts: Vec::new(),
            audio: JobAudio::None,
        }
    }

    pub fn with_asset(mut self, id: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.assets.insert(id.into(), Arc::new(bytes));
        self
    }

    pub fn slide_durations(&self) -> Vec<f64> {
        self.slides.iter().map(|s| s.duration).collect()
    }

    fn asset(&self, id: &str) -> SlidecastResult<&Arc<Vec<u8>>> {
        self.assets
            .get(id)
            .ok_or_else(|| SlidecastError::asset(format!("unknown asset '{id}'")))
    }

    /// Ids of the first visible text overlay and its slide.
    fn first_text_overlay(&self) -> Option<(&str, &str)> {
        self.slides.iter().find_map(|slide| {
            slide
                .overlays
                .iter()
                .find(|o| !o.hidden && matches!(o.kind, OverlayKind::Text(_)))
                .map(|o| (slide.id.as_str(), o.id.as_str()))
        })
    }

    /// Decode visuals, register fonts, validate layer orders and mix the soundtrack.
    ///
    /// Slide visuals, the background, fonts and audio sources that fail to load are fatal.
    /// Overlay images stay encoded until an overlay first needs them.
    #[tracing::instrument(level = "debug", skip_all, fields(slides = self.slides.len()))]
    pub(crate) fn prepare(mut self) -> SlidecastResult<PreparedJob> {
        self.settings.validate()?;
        if self.slides.is_empty() {
            return Err(SlidecastError::validation("slideshow has no slides"));
        }

        let mut fonts = FontRegistry::new();
        let font_files = std::mem::take(&mut self.fonts);
        let font_count = font_files.len();
        for bytes in font_files {
            fonts.register(bytes)?;
        }
        if fonts.is_empty()
            && let Some((slide, overlay)) = self.first_text_overlay()
        {
            return Err(SlidecastError::asset(format!(
                "text overlay '{overlay}' on slide '{slide}' needs a registered font"
            )));
        }

        let background = match &self.settings.background {
            BackgroundDef::Black => BackgroundFill::Solid(ColorDef::BLACK),
            BackgroundDef::White => BackgroundFill::Solid(ColorDef::WHITE),
            BackgroundDef::Image { asset } => {
                let img = decode_image(self.asset(asset)?).map_err(|e| {
                    SlidecastError::asset(format!("background image '{asset}': {e}"))
                })?;
                BackgroundFill::Image(img)
            }
        };

        let mut slides = Vec::with_capacity(self.slides.len());
        let mut overlay_assets = HashMap::new();
        for def in &self.slides {
            let visual = self.decode_visual(def)?;
            for overlay in &def.overlays {
                if let OverlayKind::Image { asset } = &overlay.kind {
                    overlay_assets.insert(asset.clone(), Arc::clone(self.asset(asset)?));
                }
            }
            let layers = normalize_layer_order(&def.layer_order, &def.overlays);
            slides.push(PreparedSlide {
                def: def.clone(),
                visual,
                layers,
            });
        }
        tracing::debug!(
            slides = slides.len(),
            overlay_images = overlay_assets.len(),
            fonts = font_count,
            "visuals decoded"
        );

        let audio = self.mix_audio()?;
        Ok(PreparedJob {
            parts: CompositorParts {
                settings: self.settings,
                slides,
                background,
                fonts,
                images: OverlayImages::new(overlay_assets),
            },
            audio,
        })
    }

    /// Decode the job's visuals into a ready [`Compositor`] without touching its audio.
    pub fn into_compositor(mut self) -> SlidecastResult<Compositor> {
        self.audio = JobAudio::None;
        for slide in &mut self.slides {
            slide.narration = None;
        }
        Compositor::new(self.prepare()?.parts)
    }

    fn decode_visual(&self, def: &SlideDef) -> SlidecastResult<SlideVisual> {
        let fail = |asset: &str, e: SlidecastError| {
            SlidecastError::asset(format!("slide '{}' visual '{asset}': {e}", def.id))
        };
        Ok(match &def.visual {
            VisualDef::Color { color } => SlideVisual::Solid(*color),
            VisualDef::Image { asset } => {
                SlideVisual::Bitmap(decode_image(self.asset(asset)?).map_err(|e| fail(asset, e))?)
            }
            VisualDef::Animated { asset } => {
                match decode_image_frames(self.asset(asset)?).map_err(|e| fail(asset, e))? {
                    DecodedImage::Still(img) => SlideVisual::Bitmap(img),
                    DecodedImage::Animated(anim) => SlideVisual::Animated(anim),
                }
            }
        })
    }

    fn slide_narrations(&self) -> SlidecastResult<Vec<SlideNarration>> {
        let mut out = Vec::new();
        for (slide_index, def) in self.slides.iter().enumerate() {
            if let Some(n) = &def.narration {
                out.push(SlideNarration {
                    slide_index,
                    offset: n.offset,
                    track: NarrationTrack {
                        source: AudioSource::Encoded(Arc::clone(self.asset(&n.asset)?)),
                        volume: n.volume,
                    },
                });
            }
        }
        Ok(out)
    }

    fn mix_audio(&self) -> SlidecastResult<Option<AudioPcm>> {
        let mut plan = match &self.audio {
            JobAudio::Mixed(pcm) => {
                if pcm.sample_rate != MIX_SAMPLE_RATE || pcm.channels != MIX_CHANNELS {
                    return Err(SlidecastError::validation(format!(
                        "pre-mixed audio must be {MIX_CHANNELS} channels at {MIX_SAMPLE_RATE} Hz, \
                         got {} at {} Hz",
                        pcm.channels, pcm.sample_rate
                    )));
                }
                return Ok((pcm.frames() > 0).then(|| pcm.clone()));
            }
            JobAudio::Plan(plan) => plan.clone(),
            JobAudio::None => AudioMixPlan::default(),
        };
        plan.slide_narrations.extend(self.slide_narrations()?);
        if !plan.has_sources() {
            return Ok(None);
        }
        render_mix(&plan, &self.slide_durations()).map(Some)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/job/intake.rs"]
mod tests;
