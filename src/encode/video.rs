use crate::composition::settings::ResolutionTier;
use crate::encode::ffmpeg::{FfmpegProcess, flatten_to_opaque_rgba8};
use crate::encode::packet::{DecoderConfig, EncodedPacket};
use crate::foundation::core::Fps;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;

const NAL_SLICE: u8 = 1;
const NAL_IDR: u8 = 5;
const NAL_SEI: u8 = 6;
const NAL_SPS: u8 = 7;
const NAL_PPS: u8 = 8;
const NAL_AUD: u8 = 9;

/// Video encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoEncoderConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
    /// Target bitrate in bits per second.
    pub bitrate: u32,
}

impl VideoEncoderConfig {
    pub fn for_tier(width: u32, height: u32, fps: Fps, tier: ResolutionTier) -> Self {
        Self {
            width,
            height,
            fps,
            bitrate: tier.video_bitrate(),
        }
    }

    pub fn validate(&self) -> SlidecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(SlidecastError::validation(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        if self.bitrate == 0 {
            return Err(SlidecastError::validation("encode bitrate must be non-zero"));
        }
        Ok(())
    }
}

/// Turns composed frames into H.264 samples.
///
/// Packets come back in decode order, possibly lagging behind the frames pushed; `finish`
/// returns whatever is still buffered. The first packet carries [`DecoderConfig::Avc`].
pub trait VideoEncoder {
    fn encode(&mut self, frame: &FrameRGBA) -> SlidecastResult<Vec<EncodedPacket>>;
    fn finish(&mut self) -> SlidecastResult<Vec<EncodedPacket>>;
}

/// H.264 through the system `ffmpeg` (libx264, high profile, yuv420p, no B-frames).
pub struct FfmpegH264Encoder {
    cfg: VideoEncoderConfig,
    process: FfmpegProcess,
    scratch: Vec<u8>,
    packetizer: AvcPacketizer,
}

impl FfmpegH264Encoder {
    pub fn new(cfg: VideoEncoderConfig) -> SlidecastResult<Self> {
        cfg.validate()?;
        let size = format!("{}x{}", cfg.width, cfg.height);
        let rate = format!("{}/{}", cfg.fps.num, cfg.fps.den);
        let gop = (cfg.fps.num.div_ceil(cfg.fps.den.max(1)) * 2).to_string();
        let bitrate = cfg.bitrate.to_string();
        let args: Vec<String> = [
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            size.as_str(),
            "-r",
            rate.as_str(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-profile:v",
            "high",
            "-pix_fmt",
            "yuv420p",
            "-bf",
            "0",
            "-g",
            gop.as_str(),
            "-b:v",
            bitrate.as_str(),
            "-f",
            "h264",
            "pipe:1",
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();

        let process = FfmpegProcess::spawn("h264", &args)?;
        let len = crate::render::cpu::expected_len(cfg.width, cfg.height)?;
        Ok(Self {
            packetizer: AvcPacketizer::new(cfg.width, cfg.height, cfg.fps),
            cfg,
            process,
            scratch: vec![0u8; len],
        })
    }
}

impl VideoEncoder for FfmpegH264Encoder {
    fn encode(&mut self, frame: &FrameRGBA) -> SlidecastResult<Vec<EncodedPacket>> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(SlidecastError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            [0, 0, 0, 255],
        )?;
        self.process.write(&self.scratch)?;
        let bytes = self.process.read_available()?;
        self.packetizer.push(&bytes)
    }

    fn finish(&mut self) -> SlidecastResult<Vec<EncodedPacket>> {
        let bytes = self.process.finish()?;
        let mut packets = self.packetizer.push(&bytes)?;
        packets.extend(self.packetizer.flush()?);
        Ok(packets)
    }
}

/// Incremental Annex-B to length-prefixed access unit converter.
#[derive(Debug)]
pub(crate) struct AvcPacketizer {
    width: u32,
    height: u32,
    fps: Fps,
    pending: Vec<u8>,
    unit: Vec<Vec<u8>>,
    unit_has_vcl: bool,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    emitted: u64,
}

impl AvcPacketizer {
    pub(crate) fn new(width: u32, height: u32, fps: Fps) -> Self {
        Self {
            width,
            height,
            fps,
            pending: Vec::new(),
            unit: Vec::new(),
            unit_has_vcl: false,
            sps: None,
            pps: None,
            emitted: 0,
        }
    }

    /// Feed Annex-B bytes; returns the access units completed by them.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> SlidecastResult<Vec<EncodedPacket>> {
        self.pending.extend_from_slice(bytes);
        let starts = start_codes(&self.pending);
        if starts.len() < 2 {
            return Ok(Vec::new());
        }
        // Only NALs followed by another start code are known to be complete.
        let last = starts[starts.len() - 1].0;
        let mut out = Vec::new();
        for pair in starts.windows(2) {
            let (_, payload) = pair[0];
            let (next, _) = pair[1];
            let nal = trim_trailing_zeros(&self.pending[payload..next]).to_vec();
            self.accept_nal(nal, &mut out)?;
        }
        self.pending.drain(..last);
        Ok(out)
    }

    /// End of stream: the buffered tail is a complete NAL.
    pub(crate) fn flush(&mut self) -> SlidecastResult<Vec<EncodedPacket>> {
        let mut out = Vec::new();
        let pending = std::mem::take(&mut self.pending);
        if let Some(&(_, payload)) = start_codes(&pending).first() {
            let nal = trim_trailing_zeros(&pending[payload..]).to_vec();
            self.accept_nal(nal, &mut out)?;
        }
        if self.unit_has_vcl {
            let unit = std::mem::take(&mut self.unit);
            out.push(self.packet(unit)?);
        }
        self.unit.clear();
        self.unit_has_vcl = false;
        Ok(out)
    }

    fn accept_nal(&mut self, nal: Vec<u8>, out: &mut Vec<EncodedPacket>) -> SlidecastResult<()> {
        let Some(&header) = nal.first() else {
            return Ok(());
        };
        let kind = header & 0x1f;
        let is_vcl = kind == NAL_SLICE || kind == NAL_IDR;
        let starts_unit = matches!(kind, NAL_AUD | NAL_SPS | NAL_PPS | NAL_SEI)
            || (is_vcl && first_mb_is_zero(&nal));
        if self.unit_has_vcl && starts_unit {
            let unit = std::mem::take(&mut self.unit);
            self.unit_has_vcl = false;
            out.push(self.packet(unit)?);
        }
        match kind {
            NAL_SPS if self.sps.is_none() => self.sps = Some(nal.clone()),
            NAL_PPS if self.pps.is_none() => self.pps = Some(nal.clone()),
            _ => {}
        }
        self.unit_has_vcl |= is_vcl;
        self.unit.push(nal);
        Ok(())
    }

    fn packet(&mut self, unit: Vec<Vec<u8>>) -> SlidecastResult<EncodedPacket> {
        let mut data = Vec::new();
        let mut is_key = false;
        for nal in &unit {
            let kind = nal[0] & 0x1f;
            if matches!(kind, NAL_SPS | NAL_PPS | NAL_AUD) {
                continue;
            }
            is_key |= kind == NAL_IDR;
            let len = u32::try_from(nal.len())
                .map_err(|_| SlidecastError::encode("H.264 NAL unit too large"))?;
            data.extend_from_slice(&len.to_be_bytes());
            data.extend_from_slice(nal);
        }

        let config = if self.emitted == 0 {
            let (Some(sps), Some(pps)) = (&self.sps, &self.pps) else {
                return Err(SlidecastError::encode(
                    "H.264 stream did not start with SPS/PPS",
                ));
            };
            Some(DecoderConfig::Avc {
                avcc: build_avcc(sps, pps)?,
                width: self.width,
                height: self.height,
            })
        } else {
            None
        };

        let pts_us = self.fps.frames_to_micros(self.emitted);
        let duration_us = self.fps.frames_to_micros(self.emitted + 1) - pts_us;
        self.emitted += 1;
        Ok(EncodedPacket {
            data,
            pts_us,
            dts_us: pts_us,
            duration_us,
            is_key,
            config,
        })
    }
}

/// `(start code offset, payload offset)` for every Annex-B start code.
fn start_codes(data: &[u8]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            let start = if i > 0 && data[i - 1] == 0 { i - 1 } else { i };
            out.push((start, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }
    out
}

fn trim_trailing_zeros(nal: &[u8]) -> &[u8] {
    let end = nal.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &nal[..end]
}

/// `first_mb_in_slice == 0` is coded as a single `1` bit.
fn first_mb_is_zero(nal: &[u8]) -> bool {
    nal.get(1).is_some_and(|b| b & 0x80 != 0)
}

/// `AVCDecoderConfigurationRecord` with one SPS and one PPS and 4-byte NAL lengths.
pub(crate) fn build_avcc(sps: &[u8], pps: &[u8]) -> SlidecastResult<Vec<u8>> {
    if sps.len() < 4 {
        return Err(SlidecastError::encode("H.264 SPS is truncated"));
    }
    let sps_len = u16::try_from(sps.len())
        .map_err(|_| SlidecastError::encode("H.264 SPS too large"))?;
    let pps_len = u16::try_from(pps.len())
        .map_err(|_| SlidecastError::encode("H.264 PPS too large"))?;
    let profile = sps[1];

    let mut out = Vec::with_capacity(sps.len() + pps.len() + 15);
    out.extend_from_slice(&[1, profile, sps[2], sps[3], 0xff, 0xe1]);
    out.extend_from_slice(&sps_len.to_be_bytes());
    out.extend_from_slice(sps);
    out.push(1);
    out.extend_from_slice(&pps_len.to_be_bytes());
    out.extend_from_slice(pps);
    if matches!(profile, 100 | 110 | 122 | 144) {
        // 4:2:0, 8-bit luma and chroma, no SPS extensions.
        out.extend_from_slice(&[0xfd, 0xf8, 0xf8, 0x00]);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/video.rs"]
mod tests;
