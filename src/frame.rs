// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::types::VideoCodecType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    I420,
    I444,
    NV12,
    RGBA,
}

impl PixelFormat {
    /// Total buffer size in bytes for a frame of the given dimensions.
    pub fn buffer_size(&self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            PixelFormat::I420 => w * h + 2 * (w.div_ceil(2) * h.div_ceil(2)),
            PixelFormat::I444 => w * h * 3,
            PixelFormat::NV12 => w * h + w.div_ceil(2) * h.div_ceil(2) * 2,
            PixelFormat::RGBA => w * h * 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Key,
    Delta,
}

/// A raw input image. Owned by the caller for the duration of the encode call;
/// the encoder reads it synchronously and never mutates it.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    /// 90 kHz RTP timestamp. Doubles as the transport-level frame identifier
    /// when RTP carries the stream.
    pub rtp_timestamp: u32,
    pub capture_time_ms: i64,
}

impl VideoFrame {
    /// A frame filled with a single luma value, sized for `format`.
    pub fn filled(width: u32, height: u32, format: PixelFormat, value: u8, rtp_timestamp: u32) -> Self {
        Self {
            width, height, format,
            data: vec![value; format.buffer_size(width, height)],
            rtp_timestamp,
            capture_time_ms: 0,
        }
    }
}

/// One encoded output unit. Valid only for the duration of the callback it is
/// passed to; the encoder may reuse the backing buffer as soon as the callback
/// returns, so sinks must copy out anything they keep.
#[derive(Debug, Clone, Default)]
pub struct EncodedImage {
    pub payload: Vec<u8>,
    pub frame_type: Option<FrameType>,
    pub rtp_timestamp: u32,
    pub capture_time_ms: i64,
    pub encoded_width: u32,
    pub encoded_height: u32,
    /// Quantizer the frame was encoded at, or `None` when the backend doesn't report one.
    pub qp: Option<i32>,
    /// Whether the payload holds a complete frame (hardware backends can emit partial units).
    pub complete: bool,
    /// crc32 of `payload`, for downstream integrity checks.
    pub checksum: u32,
}

/// Codec-specific side information, passed through to the sink unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecSpecificInfo {
    pub codec_type: VideoCodecType,
    /// Temporal layer the frame belongs to, when the codec layers its stream.
    pub temporal_idx: Option<u8>,
}

impl Default for CodecSpecificInfo {
    fn default() -> Self {
        Self { codec_type: VideoCodecType::Generic, temporal_idx: None }
    }
}

/// Legacy packetization info. Optional; only codecs that need out-of-band
/// fragment boundaries (e.g. H.264 NAL units) fill it in.
#[derive(Debug, Clone, Default)]
pub struct FragmentationHeader {
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub offset: usize,
    pub length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sizes() {
        assert_eq!(PixelFormat::I420.buffer_size(640, 480), 640 * 480 * 3 / 2);
        assert_eq!(PixelFormat::I420.buffer_size(641, 481), 641 * 481 + 2 * 321 * 241);
        assert_eq!(PixelFormat::RGBA.buffer_size(2, 2), 16);
    }

    #[test]
    fn filled_frame_matches_format() {
        let f = VideoFrame::filled(320, 240, PixelFormat::NV12, 0x80, 3000);
        assert_eq!(f.data.len(), PixelFormat::NV12.buffer_size(320, 240));
        assert_eq!(f.rtp_timestamp, 3000);
    }
}
