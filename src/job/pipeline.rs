use crate::assets::media::AudioPcm;
use crate::bitstream::color_patch::patch_avc_color_info;
use crate::encode::audio::{AudioEncoder, FfmpegAacEncoder, encode_pcm};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::encode::video::{FfmpegH264Encoder, VideoEncoder, VideoEncoderConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::job::intake::RenderJob;
use crate::mux::mp4::Mp4Muxer;
use crate::render::backend::FrameRGBA;
use crate::render::compositor::Compositor;

/// Progress is reported after every frame whose index is a multiple of this.
pub const PROGRESS_EVERY_FRAMES: u64 = 15;

/// Finished container bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutput {
    pub buffer: Vec<u8>,
    /// `"mp4"` or `"mov"`.
    pub extension: &'static str,
}

/// Creates the encoders for one job.
pub trait EncoderFactory {
    fn video(&self, cfg: VideoEncoderConfig) -> SlidecastResult<Box<dyn VideoEncoder>>;
    fn audio(&self, sample_rate: u32, channels: u16) -> SlidecastResult<Box<dyn AudioEncoder>>;
}

/// Encoders backed by the system `ffmpeg`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegEncoders;

impl EncoderFactory for FfmpegEncoders {
    fn video(&self, cfg: VideoEncoderConfig) -> SlidecastResult<Box<dyn VideoEncoder>> {
        Ok(Box::new(FfmpegH264Encoder::new(cfg)?))
    }

    fn audio(&self, sample_rate: u32, channels: u16) -> SlidecastResult<Box<dyn AudioEncoder>> {
        Ok(Box::new(FfmpegAacEncoder::new(sample_rate, channels)?))
    }
}

/// Render `job` with the `ffmpeg` encoders.
///
/// `on_progress(current_slide, total_slides)` runs every [`PROGRESS_EVERY_FRAMES`] frames
/// with a 1-based slide number; returning an error aborts the job.
pub fn run_job(
    job: RenderJob,
    on_progress: &mut dyn FnMut(usize, usize) -> SlidecastResult<()>,
) -> SlidecastResult<JobOutput> {
    run_job_with(job, &FfmpegEncoders, on_progress)
}

/// Render `job` with caller-provided encoders.
///
/// Order: intake, audio encoded and fully drained, frames composed and encoded, container
/// finalized, SPS colour info patched. On failure the muxer is cancelled and nothing is
/// returned.
#[tracing::instrument(level = "debug", skip_all, fields(slides = job.slides.len()))]
pub fn run_job_with(
    job: RenderJob,
    encoders: &dyn EncoderFactory,
    on_progress: &mut dyn FnMut(usize, usize) -> SlidecastResult<()>,
) -> SlidecastResult<JobOutput> {
    let format = job.settings.format;
    let tier = job.settings.resolution;
    let prepared = job.prepare()?;
    let mut compositor = Compositor::new(prepared.parts)?;
    let canvas = compositor.canvas();
    let mut muxer = Mp4Muxer::new(format, compositor.fps());

    let video_config = VideoEncoderConfig::for_tier(canvas.width, canvas.height, compositor.fps(), tier);
    let encoded = encode_streams(
        &mut compositor,
        &mut muxer,
        prepared.audio.as_ref(),
        encoders,
        video_config,
        on_progress,
    );
    if let Err(err) = encoded {
        muxer.cancel();
        tracing::debug!(%err, "job failed; muxer cancelled");
        return Err(err);
    }

    let mut buffer = muxer.finalize()?;
    let patched = patch_avc_color_info(&mut buffer);
    tracing::info!(
        bytes = buffer.len(),
        frames = compositor.frame_count(),
        patched,
        format = format.extension(),
        "job finished"
    );
    Ok(JobOutput {
        buffer,
        extension: format.extension(),
    })
}

fn encode_streams(
    compositor: &mut Compositor,
    muxer: &mut Mp4Muxer,
    audio: Option<&AudioPcm>,
    encoders: &dyn EncoderFactory,
    video_cfg: VideoEncoderConfig,
    on_progress: &mut dyn FnMut(usize, usize) -> SlidecastResult<()>,
) -> SlidecastResult<()> {
    if let Some(pcm) = audio {
        let mut encoder = encoders.audio(pcm.sample_rate, pcm.channels)?;
        let packets = encode_pcm(encoder.as_mut(), pcm)?;
        tracing::debug!(packets = packets.len(), "audio drained");
        for p in packets {
            muxer.add_audio(p)?;
        }
    }

    let total = compositor.slide_count();
    let mut sink = EncoderSink {
        cfg: video_cfg,
        encoder: encoders.video(video_cfg)?,
        muxer,
        frames: 0,
    };
    compositor.render_to_sink(&mut sink, &mut |idx, slide_index| {
        if idx.0 % PROGRESS_EVERY_FRAMES == 0 {
            on_progress(slide_index + 1, total)?;
        }
        Ok(())
    })?;
    tracing::debug!(frames = sink.frames, "video drained");
    Ok(())
}

/// Feeds composed frames to a video encoder and its packets to the muxer.
struct EncoderSink<'a> {
    cfg: VideoEncoderConfig,
    encoder: Box<dyn VideoEncoder>,
    muxer: &'a mut Mp4Muxer,
    frames: u64,
}

impl FrameSink for EncoderSink<'_> {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        if cfg.width != self.cfg.width || cfg.height != self.cfg.height {
            return Err(SlidecastError::validation(format!(
                "sink expects {}x{} frames, compositor produces {}x{}",
                self.cfg.width, self.cfg.height, cfg.width, cfg.height
            )));
        }
        tracing::debug!(frames = cfg.frame_count, "encoding video");
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        for p in self.encoder.encode(frame)? {
            self.muxer.add_video(p)?;
        }
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<()> {
        for p in self.encoder.finish()? {
            self.muxer.add_video(p)?;
        }
        Ok(())
    }
}
