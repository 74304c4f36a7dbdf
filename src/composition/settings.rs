use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{SlidecastError, SlidecastResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
}

impl AspectRatio {
    /// `(width, height)` ratio terms.
    pub fn terms(self) -> (u32, u32) {
        match self {
            Self::Landscape16x9 => (16, 9),
            Self::Portrait9x16 => (9, 16),
            Self::Square => (1, 1),
            Self::Landscape4x3 => (4, 3),
            Self::Portrait3x4 => (3, 4),
        }
    }
}

/// Output resolution tier, named after the short side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "720p")]
    P720,
    #[default]
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "2160p")]
    P2160,
}

impl ResolutionTier {
    pub fn short_side(self) -> u32 {
        match self {
            Self::P720 => 720,
            Self::P1080 => 1080,
            Self::P2160 => 2160,
        }
    }

    /// H.264 target bitrate in bits per second.
    pub fn video_bitrate(self) -> u32 {
        match self {
            Self::P720 => 5_000_000,
            Self::P1080 => 8_000_000,
            Self::P2160 => 20_000_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mov,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }
}

/// Frame background behind the slides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackgroundDef {
    #[default]
    Black,
    White,
    /// Cover-fit image from the asset bundle.
    Image { asset: String },
}

/// Output settings of one job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoSettings {
    pub aspect_ratio: AspectRatio,
    pub resolution: ResolutionTier,
    pub format: OutputFormat,
    pub background: BackgroundDef,
    /// Slide box size as a percentage of the canvas.
    pub slide_scale: f64,
    /// Slide corner radius in 500px-frame pixels.
    pub slide_radius: f64,
    /// Default transition length in seconds.
    pub transition_duration: f64,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::default(),
            resolution: ResolutionTier::default(),
            format: OutputFormat::default(),
            background: BackgroundDef::default(),
            slide_scale: 100.0,
            slide_radius: 0.0,
            transition_duration: 0.5,
        }
    }
}

impl VideoSettings {
    pub fn fps(&self) -> Fps {
        Fps::SLIDESHOW
    }

    /// Output frame size: the tier sets the short side, the long side follows the aspect ratio
    /// rounded to an even number (yuv420p needs even dimensions).
    pub fn canvas(&self) -> Canvas {
        let (aw, ah) = self.aspect_ratio.terms();
        let short = self.resolution.short_side();
        let long_for = |num: u32, den: u32| {
            let exact = f64::from(short) * f64::from(num) / f64::from(den);
            ((exact / 2.0).round() as u32) * 2
        };
        if aw >= ah {
            Canvas {
                width: long_for(aw, ah),
                height: short,
            }
        } else {
            Canvas {
                width: short,
                height: long_for(ah, aw),
            }
        }
    }

    pub fn validate(&self) -> SlidecastResult<()> {
        if !self.slide_scale.is_finite() || self.slide_scale <= 0.0 || self.slide_scale > 100.0 {
            return Err(SlidecastError::validation(
                "slideScale must be in (0, 100]",
            ));
        }
        if !self.slide_radius.is_finite() || self.slide_radius < 0.0 {
            return Err(SlidecastError::validation(
                "slideRadius must be finite and >= 0",
            ));
        }
        if !self.transition_duration.is_finite() || self.transition_duration < 0.0 {
            return Err(SlidecastError::validation(
                "transitionDuration must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/settings.rs"]
mod tests;
