// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::software::{CodecProfile, SoftwareEncoder};
use super::{EncoderInterface, EncoderStats};
use crate::callback::EncodedImageCallback;
use crate::feedback::FeedbackHandle;
use crate::frame::{CodecSpecificInfo, FrameType, VideoFrame};
use crate::settings::*;
use crate::types::{EncodeError, VideoCodecType};

// Max luma samples per frame for the levels this backend accepts (H.264 Table A-1).
const LEVEL_LIMITS: &[(u32, &str)] = &[
    (414_720, "3.0"),
    (921_600, "3.1"),
    (2_097_152, "4.0"),
    (5_652_480, "5.0"),
    (9_437_184, "5.1"),
];

fn level_for(width: u32, height: u32) -> Option<&'static str> {
    let samples = width.checked_mul(height)?;
    LEVEL_LIMITS.iter().find(|(max, _)| samples <= *max).map(|(_, level)| *level)
}

pub struct H264Encoder {
    inner: SoftwareEncoder,
}

impl H264Encoder {
    pub fn new() -> Self {
        Self {
            inner: SoftwareEncoder::new(CodecProfile {
                name: "h264_software",
                codec_type: VideoCodecType::H264,
                scaling: ScalingSettings::enabled(24, 37),
                base_qp: 26,
                fragmentation: true,
            }),
        }
    }
}

impl EncoderInterface for H264Encoder {
    fn init_encode(&mut self, settings: &CodecSettings, core_count: u32, max_payload_size: usize) -> Result<(), EncodeError> {
        self.inner.uninitialize();
        if settings.codec_type != VideoCodecType::H264 {
            return Err(EncodeError::BadParameter);
        }
        if !matches!(settings.codec_specific, CodecSpecificSettings::H264(_) | CodecSpecificSettings::None) {
            return Err(EncodeError::BadParameter);
        }
        let Some(level) = level_for(settings.width, settings.height) else {
            return Err(EncodeError::LevelExceeded);
        };
        log::debug!("h264_software: {}x{} fits level {}", settings.width, settings.height, level);
        self.inner.init_encode(settings, core_count, max_payload_size)
    }

    fn register_callback(&mut self, sink: Box<dyn EncodedImageCallback + Send>) -> Result<(), EncodeError> {
        self.inner.register_callback(sink)
    }
    fn encode(&mut self, frame: &VideoFrame, codec_specific: Option<&CodecSpecificInfo>, frame_types: Option<&[FrameType]>) -> Result<(), EncodeError> {
        self.inner.encode(frame, codec_specific, frame_types)
    }
    fn set_channel_parameters(&mut self, packet_loss: u8, rtt_ms: i64) -> Result<(), EncodeError> {
        self.inner.set_channel_parameters(packet_loss, rtt_ms)
    }
    fn set_rates(&mut self, bitrate_kbps: u32, framerate: u32) -> Result<(), EncodeError> {
        self.inner.set_rates(bitrate_kbps, framerate)
    }
    fn set_periodic_key_frames(&mut self, enable: bool) -> Result<(), EncodeError> {
        self.inner.set_periodic_key_frames(enable)
    }
    fn release(&mut self) -> Result<(), EncodeError> {
        self.inner.release()
    }
    fn scaling_settings(&self) -> ScalingSettings {
        self.inner.scaling_settings()
    }
    fn implementation_name(&self) -> &'static str {
        self.inner.implementation_name()
    }
    fn feedback_handle(&self) -> FeedbackHandle {
        self.inner.feedback_handle()
    }
    fn stats(&self) -> EncoderStats {
        self.inner.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_lookup() {
        assert_eq!(level_for(640, 480), Some("3.0"));
        assert_eq!(level_for(1280, 720), Some("3.1"));
        assert_eq!(level_for(1920, 1080), Some("4.0"));
        assert_eq!(level_for(4096, 2304), Some("5.1"));
        assert_eq!(level_for(7680, 4320), None);
    }

    #[test]
    fn oversized_resolution_exceeds_level() {
        let mut enc = H264Encoder::new();
        let settings = CodecSettings::with_defaults(VideoCodecType::H264, 7680, 4320);
        assert_eq!(enc.init_encode(&settings, 1, 1200), Err(EncodeError::LevelExceeded));
    }
}
