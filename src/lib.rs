//! Slidecast turns a slideshow description into a finished MP4 or MOV file.
//!
//! A [`RenderJob`] carries the output settings, the slides with their overlays and every
//! encoded asset they reference. A job runs either inline with [`run_job`] or on a worker
//! thread with [`spawn_job`], which reports progress as [`JobEvent`]s:
//!
//! - Intake decodes visuals and fonts and mixes the soundtrack
//! - The [`Compositor`] renders every frame on the CPU
//! - `ffmpeg` encodes H.264 video and AAC audio
//! - An in-process muxer writes the container, whose SPS colour signalling is then normalized
//!   to limited-range BT.709
#![forbid(unsafe_code)]

pub mod animation;
pub mod assets;
pub mod audio;
pub mod bitstream;
pub mod composition;
pub mod effects;
pub mod encode;
pub mod foundation;
pub mod job;
pub mod mux;
pub mod render;

pub use crate::animation::ease::Ease;
pub use crate::assets::color::ColorDef;
pub use crate::assets::media::{AudioPcm, AudioSource, MIX_CHANNELS, MIX_SAMPLE_RATE};
pub use crate::audio::ducking::{DuckingIntervalOpts, build_ducking_intervals};
pub use crate::audio::mix::{
    AudioMixPlan, DuckingSettings, LoopRange, MusicTrack, NarrationTrack, render_mix,
};
pub use crate::bitstream::color_patch::patch_avc_color_info;
pub use crate::composition::model::{OverlayDef, OverlayKind, SlideDef, VisualDef};
pub use crate::composition::settings::{
    AspectRatio, BackgroundDef, OutputFormat, ResolutionTier, VideoSettings,
};
pub use crate::encode::audio::{AudioEncoder, build_audio_specific_config};
pub use crate::encode::ffmpeg::is_ffmpeg_on_path;
pub use crate::encode::packet::{DecoderConfig, EncodedPacket};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::encode::video::{VideoEncoder, VideoEncoderConfig};
pub use crate::foundation::core::{Canvas, Fps, FrameIndex};
pub use crate::foundation::error::{SlidecastError, SlidecastResult};
pub use crate::job::intake::{JobAudio, RenderJob};
pub use crate::job::manifest::JobSpec;
pub use crate::job::pipeline::{EncoderFactory, FfmpegEncoders, JobOutput, run_job, run_job_with};
pub use crate::job::worker::{JobEvent, JobHandle, spawn_job, spawn_job_with};
pub use crate::mux::mp4::Mp4Muxer;
pub use crate::render::backend::FrameRGBA;
pub use crate::render::compositor::Compositor;
