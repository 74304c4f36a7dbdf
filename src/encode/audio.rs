use crate::assets::media::AudioPcm;
use crate::encode::ffmpeg::FfmpegProcess;
use crate::encode::packet::{DecoderConfig, EncodedPacket};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// PCM is handed to the encoder in chunks of this many frames.
pub const AUDIO_CHUNK_FRAMES: usize = 4096;

/// Samples per AAC-LC frame.
pub const AAC_FRAME_SAMPLES: u32 = 1024;

const AAC_BITRATE: &str = "128k";

const SAMPLE_RATES: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000,
    7_350,
];

/// Two-byte AAC-LC `AudioSpecificConfig` for `sample_rate` and `channels`.
pub fn build_audio_specific_config(sample_rate: u32, channels: u16) -> SlidecastResult<[u8; 2]> {
    let index = SAMPLE_RATES
        .iter()
        .position(|&r| r == sample_rate)
        .ok_or_else(|| {
            SlidecastError::encode(format!("unsupported AAC sample rate {sample_rate}"))
        })?;
    if !(1..=6).contains(&channels) {
        return Err(SlidecastError::encode(format!(
            "unsupported AAC channel count {channels}"
        )));
    }
    // object type 2 (5 bits), frequency index (4 bits), channel config (4 bits), 3 zero bits
    let bits = (2u16 << 11) | ((index as u16) << 7) | (channels << 3);
    Ok(bits.to_be_bytes())
}

/// Turns interleaved `f32` PCM into AAC samples.
///
/// The first packet carries [`DecoderConfig::Aac`].
pub trait AudioEncoder {
    fn encode(&mut self, interleaved: &[f32]) -> SlidecastResult<Vec<EncodedPacket>>;
    fn finish(&mut self) -> SlidecastResult<Vec<EncodedPacket>>;
}

/// Encode a whole buffer in [`AUDIO_CHUNK_FRAMES`] chunks and drain the encoder.
#[tracing::instrument(level = "debug", skip_all, fields(frames = pcm.frames()))]
pub fn encode_pcm(
    encoder: &mut dyn AudioEncoder,
    pcm: &AudioPcm,
) -> SlidecastResult<Vec<EncodedPacket>> {
    let chunk = AUDIO_CHUNK_FRAMES * usize::from(pcm.channels.max(1));
    let mut packets = Vec::new();
    for samples in pcm.interleaved_f32.chunks(chunk) {
        packets.extend(encoder.encode(samples)?);
    }
    packets.extend(encoder.finish()?);
    tracing::debug!(packets = packets.len(), "audio encoded");
    Ok(packets)
}

/// AAC-LC through the system `ffmpeg`, read back as ADTS.
pub struct FfmpegAacEncoder {
    process: FfmpegProcess,
    splitter: AdtsSplitter,
    scratch: Vec<u8>,
}

impl FfmpegAacEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> SlidecastResult<Self> {
        let asc = build_audio_specific_config(sample_rate, channels)?;
        let rate = sample_rate.to_string();
        let layout = channels.to_string();
        let args: Vec<String> = [
            "-f",
            "s16le",
            "-ar",
            rate.as_str(),
            "-ac",
            layout.as_str(),
            "-i",
            "pipe:0",
            "-vn",
            "-c:a",
            "aac",
            "-b:a",
            AAC_BITRATE,
            "-f",
            "adts",
            "pipe:1",
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
        Ok(Self {
            process: FfmpegProcess::spawn("aac", &args)?,
            splitter: AdtsSplitter::new(sample_rate, channels, asc),
            scratch: Vec::new(),
        })
    }
}

impl AudioEncoder for FfmpegAacEncoder {
    fn encode(&mut self, interleaved: &[f32]) -> SlidecastResult<Vec<EncodedPacket>> {
        self.scratch.clear();
        self.scratch.reserve(interleaved.len() * 2);
        for &s in interleaved {
            self.scratch.extend_from_slice(&f32_to_s16(s).to_le_bytes());
        }
        self.process.write(&self.scratch)?;
        let bytes = self.process.read_available()?;
        self.splitter.push(&bytes)
    }

    fn finish(&mut self) -> SlidecastResult<Vec<EncodedPacket>> {
        let bytes = self.process.finish()?;
        let packets = self.splitter.push(&bytes)?;
        self.splitter.ensure_drained()?;
        Ok(packets)
    }
}

pub(crate) fn f32_to_s16(s: f32) -> i16 {
    if s.is_nan() {
        return 0;
    }
    (s.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Incremental ADTS reader yielding raw AAC frames.
#[derive(Debug)]
pub(crate) struct AdtsSplitter {
    sample_rate: u32,
    channels: u16,
    asc: [u8; 2],
    pending: Vec<u8>,
    emitted: u64,
}

impl AdtsSplitter {
    pub(crate) fn new(sample_rate: u32, channels: u16, asc: [u8; 2]) -> Self {
        Self {
            sample_rate,
            channels,
            asc,
            pending: Vec::new(),
            emitted: 0,
        }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) -> SlidecastResult<Vec<EncodedPacket>> {
        self.pending.extend_from_slice(bytes);
        let mut out = Vec::new();
        let mut pos = 0;
        while self.pending.len() - pos >= 7 {
            let h = &self.pending[pos..];
            if h[0] != 0xff || h[1] & 0xf0 != 0xf0 {
                return Err(SlidecastError::encode("AAC stream lost ADTS sync"));
            }
            let protection_absent = h[1] & 0x01 != 0;
            let header_len = if protection_absent { 7 } else { 9 };
            let frame_len = (usize::from(h[3] & 0x03) << 11)
                | (usize::from(h[4]) << 3)
                | usize::from(h[5] >> 5);
            if frame_len < header_len {
                return Err(SlidecastError::encode("ADTS frame shorter than its header"));
            }
            if self.pending.len() - pos < frame_len {
                break;
            }
            let payload = self.pending[pos + header_len..pos + frame_len].to_vec();
            out.push(self.packet(payload));
            pos += frame_len;
        }
        self.pending.drain(..pos);
        Ok(out)
    }

    pub(crate) fn ensure_drained(&self) -> SlidecastResult<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(SlidecastError::encode(format!(
                "AAC stream ended inside an ADTS frame ({} bytes left)",
                self.pending.len()
            )))
        }
    }

    fn packet(&mut self, data: Vec<u8>) -> EncodedPacket {
        let rate = u64::from(self.sample_rate.max(1));
        let micros = |n: u64| (n * u64::from(AAC_FRAME_SAMPLES) * 1_000_000 / rate) as i64;
        let pts_us = micros(self.emitted);
        let duration_us = micros(self.emitted + 1) - pts_us;
        let config = (self.emitted == 0).then(|| DecoderConfig::Aac {
            asc: self.asc.to_vec(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        });
        self.emitted += 1;
        EncodedPacket {
            data,
            pts_us,
            dts_us: pts_us,
            duration_us,
            is_key: true,
            config,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/audio.rs"]
mod tests;
