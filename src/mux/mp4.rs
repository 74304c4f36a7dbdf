use std::collections::VecDeque;

use crate::composition::settings::OutputFormat;
use crate::encode::audio::AAC_FRAME_SAMPLES;
use crate::encode::packet::{DecoderConfig, EncodedPacket};
use crate::foundation::core::Fps;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::mux::boxes::BoxWriter;

const MOVIE_TIMESCALE: u32 = 1000;
const LANGUAGE_UND: u16 = 0x55c4;
const VIDEO_TRACK_ID: u32 = 1;
const AUDIO_TRACK_ID: u32 = 2;
const MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TrackKind {
    Video,
    Audio,
}

#[derive(Clone, Copy, Debug)]
struct Chunk {
    /// Offset inside the `mdat` payload.
    offset: u64,
    samples: u32,
}

#[derive(Debug)]
struct Track {
    kind: TrackKind,
    config: DecoderConfig,
    timescale: u32,
    sample_delta: u32,
    sizes: Vec<u32>,
    /// 1-based sample numbers of sync samples.
    sync: Vec<u32>,
    chunks: Vec<Chunk>,
}

impl Track {
    fn id(&self) -> u32 {
        match self.kind {
            TrackKind::Video => VIDEO_TRACK_ID,
            TrackKind::Audio => AUDIO_TRACK_ID,
        }
    }

    fn duration(&self) -> u64 {
        self.sizes.len() as u64 * u64::from(self.sample_delta)
    }

    fn movie_duration(&self) -> u64 {
        self.duration() * u64::from(MOVIE_TIMESCALE) / u64::from(self.timescale.max(1))
    }
}

/// Progressive MP4/MOV writer: `ftyp`, `mdat`, then `moov`, all in memory.
///
/// Video samples are written as they arrive; audio samples are queued and interleaved by
/// decode time in front of the video samples that follow them.
#[derive(Debug)]
pub struct Mp4Muxer {
    format: OutputFormat,
    fps: Fps,
    video: Option<Track>,
    audio: Option<Track>,
    queued_audio: VecDeque<EncodedPacket>,
    mdat: Vec<u8>,
    last_written: Option<TrackKind>,
    cancelled: bool,
}

impl Mp4Muxer {
    pub fn new(format: OutputFormat, fps: Fps) -> Self {
        Self {
            format,
            fps,
            video: None,
            audio: None,
            queued_audio: VecDeque::new(),
            mdat: Vec::new(),
            last_written: None,
            cancelled: false,
        }
    }

    pub fn add_video(&mut self, packet: EncodedPacket) -> SlidecastResult<()> {
        self.ensure_live()?;
        if self.video.is_none() {
            let Some(config @ DecoderConfig::Avc { .. }) = packet.config.clone() else {
                return Err(SlidecastError::encode(
                    "first video packet must carry an AVC decoder config",
                ));
            };
            self.video = Some(Track {
                kind: TrackKind::Video,
                config,
                timescale: self.fps.num.saturating_mul(1000),
                sample_delta: self.fps.den.saturating_mul(1000),
                sizes: Vec::new(),
                sync: Vec::new(),
                chunks: Vec::new(),
            });
        }
        while self
            .queued_audio
            .front()
            .is_some_and(|a| a.dts_us <= packet.dts_us)
        {
            if let Some(a) = self.queued_audio.pop_front() {
                self.write_sample(TrackKind::Audio, &a)?;
            }
        }
        self.write_sample(TrackKind::Video, &packet)
    }

    pub fn add_audio(&mut self, packet: EncodedPacket) -> SlidecastResult<()> {
        self.ensure_live()?;
        if self.audio.is_none() {
            let Some(config @ DecoderConfig::Aac { sample_rate, .. }) = packet.config.clone()
            else {
                return Err(SlidecastError::encode(
                    "first audio packet must carry an AAC decoder config",
                ));
            };
            self.audio = Some(Track {
                kind: TrackKind::Audio,
                config,
                timescale: sample_rate,
                sample_delta: AAC_FRAME_SAMPLES,
                sizes: Vec::new(),
                sync: Vec::new(),
                chunks: Vec::new(),
            });
        }
        self.queued_audio.push_back(packet);
        Ok(())
    }

    /// Drop everything written so far; later calls fail.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.queued_audio.clear();
        self.mdat = Vec::new();
        tracing::debug!("muxer cancelled");
    }

    /// Write the finished container.
    #[tracing::instrument(level = "debug", skip_all, fields(mdat = self.mdat.len()))]
    pub fn finalize(mut self) -> SlidecastResult<Vec<u8>> {
        self.ensure_live()?;
        while let Some(a) = self.queued_audio.pop_front() {
            self.write_sample(TrackKind::Audio, &a)?;
        }
        if self.video.as_ref().is_none_or(|v| v.sizes.is_empty()) {
            return Err(SlidecastError::encode("no video samples to mux"));
        }

        let ftyp = self.ftyp()?;
        let payload_len = self.mdat.len() as u64;
        let large = payload_len + 8 > u64::from(u32::MAX);
        let header_len: u64 = if large { 16 } else { 8 };
        let base = ftyp.len() as u64 + header_len;
        let moov = self.moov(base)?;

        let mut out =
            Vec::with_capacity(ftyp.len() + header_len as usize + self.mdat.len() + moov.len());
        out.extend_from_slice(&ftyp);
        if large {
            out.extend_from_slice(&1u32.to_be_bytes());
            out.extend_from_slice(b"mdat");
            out.extend_from_slice(&(payload_len + 16).to_be_bytes());
        } else {
            out.extend_from_slice(&((payload_len + 8) as u32).to_be_bytes());
            out.extend_from_slice(b"mdat");
        }
        out.extend_from_slice(&self.mdat);
        out.extend_from_slice(&moov);
        tracing::debug!(bytes = out.len(), "container written");
        Ok(out)
    }

    fn ensure_live(&self) -> SlidecastResult<()> {
        if self.cancelled {
            Err(SlidecastError::encode("muxer was cancelled"))
        } else {
            Ok(())
        }
    }

    fn write_sample(&mut self, kind: TrackKind, packet: &EncodedPacket) -> SlidecastResult<()> {
        let offset = self.mdat.len() as u64;
        let size = u32::try_from(packet.data.len())
            .map_err(|_| SlidecastError::encode("sample larger than 4 GiB"))?;
        let contiguous = self.last_written == Some(kind);
        let track = match kind {
            TrackKind::Video => self.video.as_mut(),
            TrackKind::Audio => self.audio.as_mut(),
        }
        .ok_or_else(|| SlidecastError::encode("sample for a track that was never opened"))?;

        track.sizes.push(size);
        if packet.is_key {
            track.sync.push(track.sizes.len() as u32);
        }
        match track.chunks.last_mut() {
            Some(chunk) if contiguous => chunk.samples += 1,
            _ => track.chunks.push(Chunk { offset, samples: 1 }),
        }
        self.mdat.extend_from_slice(&packet.data);
        self.last_written = Some(kind);
        Ok(())
    }

    fn ftyp(&self) -> SlidecastResult<Vec<u8>> {
        let mut w = BoxWriter::new();
        w.begin(b"ftyp");
        match self.format {
            OutputFormat::Mp4 => {
                w.bytes(b"isom");
                w.u32(0x200);
                for brand in [b"isom", b"iso2", b"avc1", b"mp41"] {
                    w.bytes(brand);
                }
            }
            OutputFormat::Mov => {
                w.bytes(b"qt  ");
                w.u32(0x2005_0300);
                w.bytes(b"qt  ");
            }
        }
        w.end()?;
        w.finish()
    }

    fn moov(&self, base: u64) -> SlidecastResult<Vec<u8>> {
        let tracks: Vec<&Track> = [self.video.as_ref(), self.audio.as_ref()]
            .into_iter()
            .flatten()
            .filter(|t| !t.sizes.is_empty())
            .collect();
        let movie_duration = tracks.iter().map(|t| t.movie_duration()).max().unwrap_or(0);

        let mut w = BoxWriter::new();
        w.begin(b"moov");

        w.begin_full(b"mvhd", 0, 0);
        w.u32(0);
        w.u32(0);
        w.u32(MOVIE_TIMESCALE);
        w.u32(clamp_u32(movie_duration));
        w.u32(0x0001_0000);
        w.u16(0x0100);
        w.zeros(10);
        for m in MATRIX {
            w.u32(m);
        }
        w.zeros(24);
        w.u32(AUDIO_TRACK_ID + 1);
        w.end()?;

        for track in tracks {
            self.trak(&mut w, track, base)?;
        }

        w.end()?;
        w.finish()
    }

    fn trak(&self, w: &mut BoxWriter, track: &Track, base: u64) -> SlidecastResult<()> {
        let (width, height) = match track.config {
            DecoderConfig::Avc { width, height, .. } => (width, height),
            DecoderConfig::Aac { .. } => (0, 0),
        };
        let is_video = track.kind == TrackKind::Video;

        w.begin(b"trak");

        w.begin_full(b"tkhd", 0, 0x3);
        w.u32(0);
        w.u32(0);
        w.u32(track.id());
        w.u32(0);
        w.u32(clamp_u32(track.movie_duration()));
        w.zeros(8);
        w.u16(0);
        w.u16(0);
        w.u16(if is_video { 0 } else { 0x0100 });
        w.u16(0);
        for m in MATRIX {
            w.u32(m);
        }
        w.u32(width << 16);
        w.u32(height << 16);
        w.end()?;

        w.begin(b"mdia");
        w.begin_full(b"mdhd", 0, 0);
        w.u32(0);
        w.u32(0);
        w.u32(track.timescale);
        w.u32(clamp_u32(track.duration()));
        w.u16(LANGUAGE_UND);
        w.u16(0);
        w.end()?;

        w.begin_full(b"hdlr", 0, 0);
        match self.format {
            OutputFormat::Mp4 => w.u32(0),
            OutputFormat::Mov => w.bytes(b"mhlr"),
        }
        w.bytes(if is_video { b"vide" } else { b"soun" });
        w.zeros(12);
        w.bytes(if is_video {
            b"VideoHandler\0"
        } else {
            b"SoundHandler\0"
        });
        w.end()?;

        w.begin(b"minf");
        if is_video {
            w.begin_full(b"vmhd", 0, 1);
            w.zeros(8);
        } else {
            w.begin_full(b"smhd", 0, 0);
            w.zeros(4);
        }
        w.end()?;

        w.begin(b"dinf");
        w.begin_full(b"dref", 0, 0);
        w.u32(1);
        w.begin_full(b"url ", 0, 1);
        w.end()?;
        w.end()?;
        w.end()?;

        w.begin(b"stbl");
        w.begin_full(b"stsd", 0, 0);
        w.u32(1);
        sample_entry(w, &track.config)?;
        w.end()?;

        w.begin_full(b"stts", 0, 0);
        w.u32(1);
        w.u32(track.sizes.len() as u32);
        w.u32(track.sample_delta);
        w.end()?;

        if is_video {
            w.begin_full(b"stss", 0, 0);
            w.u32(track.sync.len() as u32);
            for s in &track.sync {
                w.u32(*s);
            }
            w.end()?;
        }

        let runs = chunk_runs(&track.chunks);
        w.begin_full(b"stsc", 0, 0);
        w.u32(runs.len() as u32);
        for (first_chunk, samples) in runs {
            w.u32(first_chunk);
            w.u32(samples);
            w.u32(1);
        }
        w.end()?;

        w.begin_full(b"stsz", 0, 0);
        w.u32(0);
        w.u32(track.sizes.len() as u32);
        for s in &track.sizes {
            w.u32(*s);
        }
        w.end()?;

        let offsets: Vec<u64> = track.chunks.iter().map(|c| base + c.offset).collect();
        if offsets.iter().any(|&o| o > u64::from(u32::MAX)) {
            w.begin_full(b"co64", 0, 0);
            w.u32(offsets.len() as u32);
            for o in offsets {
                w.u64(o);
            }
        } else {
            w.begin_full(b"stco", 0, 0);
            w.u32(offsets.len() as u32);
            for o in offsets {
                w.u32(o as u32);
            }
        }
        w.end()?;

        w.end()?; // stbl
        w.end()?; // minf
        w.end()?; // mdia
        w.end() // trak
    }
}

fn sample_entry(w: &mut BoxWriter, config: &DecoderConfig) -> SlidecastResult<()> {
    match config {
        DecoderConfig::Avc {
            avcc,
            width,
            height,
        } => {
            let w16 = u16::try_from(*width)
                .map_err(|_| SlidecastError::encode("video width exceeds 65535"))?;
            let h16 = u16::try_from(*height)
                .map_err(|_| SlidecastError::encode("video height exceeds 65535"))?;
            w.begin(b"avc1");
            w.zeros(6);
            w.u16(1);
            w.zeros(16);
            w.u16(w16);
            w.u16(h16);
            w.u32(0x0048_0000);
            w.u32(0x0048_0000);
            w.u32(0);
            w.u16(1);
            w.zeros(32);
            w.u16(0x0018);
            w.u16(0xffff);
            w.begin(b"avcC");
            w.bytes(avcc);
            w.end()?;
            w.end()
        }
        DecoderConfig::Aac {
            asc,
            sample_rate,
            channels,
        } => {
            let rate16 = u16::try_from(*sample_rate)
                .map_err(|_| SlidecastError::encode("audio sample rate exceeds 65535"))?;
            w.begin(b"mp4a");
            w.zeros(6);
            w.u16(1);
            w.zeros(8);
            w.u16(*channels);
            w.u16(16);
            w.u16(0);
            w.u16(0);
            w.u32(u32::from(rate16) << 16);
            esds(w, asc)?;
            w.end()
        }
    }
}

fn esds(w: &mut BoxWriter, asc: &[u8]) -> SlidecastResult<()> {
    let asc_len = u8::try_from(asc.len())
        .ok()
        .filter(|l| *l < 0x60)
        .ok_or_else(|| SlidecastError::encode("AudioSpecificConfig too long"))?;
    let decoder_config_len = 13 + 2 + asc_len;
    let es_len = 3 + 2 + decoder_config_len + 3;

    w.begin_full(b"esds", 0, 0);
    w.u8(0x03);
    w.u8(es_len);
    w.u16(AUDIO_TRACK_ID as u16);
    w.u8(0);

    w.u8(0x04);
    w.u8(decoder_config_len);
    w.u8(0x40); // MPEG-4 audio
    w.u8(0x15); // audio stream
    w.zeros(3);
    w.u32(128_000);
    w.u32(128_000);
    w.u8(0x05);
    w.u8(asc_len);
    w.bytes(asc);

    w.u8(0x06);
    w.u8(1);
    w.u8(0x02);
    w.end()
}

/// `stsc` runs as `(first_chunk, samples_per_chunk)`, 1-based.
fn chunk_runs(chunks: &[Chunk]) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for (i, c) in chunks.iter().enumerate() {
        if runs.last().is_none_or(|&(_, n)| n != c.samples) {
            runs.push((i as u32 + 1, c.samples));
        }
    }
    runs
}

fn clamp_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[path = "../../tests/unit/mux/mp4.rs"]
mod tests;
