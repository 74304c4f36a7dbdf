/// Codec configuration carried by the first packet of a stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecoderConfig {
    /// H.264 `AVCDecoderConfigurationRecord` (the payload of an `avcC` box).
    Avc {
        avcc: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// AAC `AudioSpecificConfig`.
    Aac {
        asc: Vec<u8>,
        sample_rate: u32,
        channels: u16,
    },
}

/// One compressed sample ready for the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Sample payload. H.264 samples are 4-byte length-prefixed NAL units; AAC samples are raw
    /// frames without ADTS headers.
    pub data: Vec<u8>,
    /// Presentation timestamp in microseconds.
    pub pts_us: i64,
    /// Decode timestamp in microseconds; equal to `pts_us` since no B-frames are produced.
    pub dts_us: i64,
    pub duration_us: i64,
    pub is_key: bool,
    pub config: Option<DecoderConfig>,
}
