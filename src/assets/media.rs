use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Sample rate of the audio mix bus and of the encoded AAC track.
pub const MIX_SAMPLE_RATE: u32 = 44_100;

/// Channel count of the audio mix bus and of the encoded AAC track.
pub const MIX_CHANNELS: u16 = 2;

#[derive(Clone, Debug, PartialEq)]
/// Decoded interleaved floating-point PCM.
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Silent buffer of `frames` frames.
    pub fn silence(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Build a stereo buffer from two planar channels, truncated to the shorter one.
    pub fn from_planar_stereo(sample_rate: u32, left: &[f32], right: &[f32]) -> Self {
        let n = left.len().min(right.len());
        let mut interleaved_f32 = Vec::with_capacity(n * 2);
        for (l, r) in left.iter().zip(right.iter()) {
            interleaved_f32.push(*l);
            interleaved_f32.push(*r);
        }
        Self {
            sample_rate,
            channels: 2,
            interleaved_f32,
        }
    }
}

/// Where an audio track's samples come from.
#[derive(Clone, Debug)]
pub enum AudioSource {
    /// A media file on disk, decoded through `ffmpeg`.
    File(PathBuf),
    /// An encoded media payload held in memory, decoded through `ffmpeg`.
    Encoded(Arc<Vec<u8>>),
    /// Already decoded samples.
    Pcm(Arc<AudioPcm>),
}

impl AudioSource {
    /// Decode to PCM. `File`/`Encoded` come back as stereo at [`MIX_SAMPLE_RATE`]; `Pcm` is
    /// returned as-is.
    pub fn decode(&self) -> SlidecastResult<Arc<AudioPcm>> {
        match self {
            Self::File(path) => decode_audio_f32_stereo(path, MIX_SAMPLE_RATE).map(Arc::new),
            Self::Encoded(bytes) => {
                decode_audio_bytes_f32_stereo(bytes, MIX_SAMPLE_RATE).map(Arc::new)
            }
            Self::Pcm(pcm) => Ok(Arc::clone(pcm)),
        }
    }
}

/// Decode audio from a media file to stereo interleaved `f32` PCM.
pub fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> SlidecastResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(pcm_output_args(sample_rate).iter())
        .output()
        .map_err(|e| SlidecastError::asset(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(SlidecastError::asset(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    pcm_from_f32le(&out.stdout, sample_rate)
}

/// Decode an in-memory encoded audio payload to stereo interleaved `f32` PCM.
pub fn decode_audio_bytes_f32_stereo(bytes: &[u8], sample_rate: u32) -> SlidecastResult<AudioPcm> {
    let mut child = Command::new("ffmpeg")
        .args(["-v", "error", "-i", "pipe:0"])
        .args(pcm_output_args(sample_rate).iter())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SlidecastError::asset(format!("failed to run ffmpeg for audio decode: {e}")))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| SlidecastError::asset("failed to open ffmpeg stdin (unexpected)"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| SlidecastError::asset("failed to open ffmpeg stdout (unexpected)"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| SlidecastError::asset("failed to open ffmpeg stderr (unexpected)"))?;

    let stdout_drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });
    let stderr_drain = std::thread::spawn(move || {
        let mut buf = Vec::new();
        stderr.read_to_end(&mut buf).map(|_| buf)
    });

    // ffmpeg may stop reading early (e.g. on a bad header); the exit status reports that.
    let _ = stdin.write_all(bytes);
    drop(stdin);

    let status = child
        .wait()
        .map_err(|e| SlidecastError::asset(format!("failed to wait for ffmpeg: {e}")))?;
    let stdout_bytes = stdout_drain
        .join()
        .map_err(|_| SlidecastError::asset("ffmpeg stdout drain thread panicked"))?
        .map_err(|e| SlidecastError::asset(format!("ffmpeg stdout read failed: {e}")))?;
    let stderr_bytes = stderr_drain
        .join()
        .map_err(|_| SlidecastError::asset("ffmpeg stderr drain thread panicked"))?
        .unwrap_or_default();

    if !status.success() {
        return Err(SlidecastError::asset(format!(
            "ffmpeg audio decode failed for in-memory payload ({} bytes): {}",
            bytes.len(),
            String::from_utf8_lossy(&stderr_bytes).trim()
        )));
    }
    pcm_from_f32le(&stdout_bytes, sample_rate)
}

fn pcm_output_args(sample_rate: u32) -> [String; 10] {
    [
        "-vn".to_owned(),
        "-f".to_owned(),
        "f32le".to_owned(),
        "-acodec".to_owned(),
        "pcm_f32le".to_owned(),
        "-ac".to_owned(),
        "2".to_owned(),
        "-ar".to_owned(),
        sample_rate.to_string(),
        "pipe:1".to_owned(),
    ]
}

fn pcm_from_f32le(bytes: &[u8], sample_rate: u32) -> SlidecastResult<AudioPcm> {
    if !bytes.len().is_multiple_of(4) {
        return Err(SlidecastError::asset(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}
