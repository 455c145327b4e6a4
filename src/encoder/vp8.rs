// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::software::{CodecProfile, SoftwareEncoder};
use super::{EncoderInterface, EncoderStats};
use crate::callback::EncodedImageCallback;
use crate::feedback::FeedbackHandle;
use crate::frame::{CodecSpecificInfo, FrameType, VideoFrame};
use crate::settings::*;
use crate::types::{EncodeError, VideoCodecType};

pub struct Vp8Encoder {
    inner: SoftwareEncoder,
}

impl Vp8Encoder {
    pub fn new() -> Self {
        Self {
            inner: SoftwareEncoder::new(CodecProfile {
                name: "vp8_software",
                codec_type: VideoCodecType::Vp8,
                scaling: ScalingSettings::enabled(29, 95),
                base_qp: 25,
                fragmentation: false,
            }),
        }
    }
}

impl EncoderInterface for Vp8Encoder {
    fn init_encode(&mut self, settings: &CodecSettings, core_count: u32, max_payload_size: usize) -> Result<(), EncodeError> {
        self.inner.uninitialize();
        if settings.codec_type != VideoCodecType::Vp8 {
            return Err(EncodeError::BadParameter);
        }
        match &settings.codec_specific {
            CodecSpecificSettings::Vp8(vp8) => {
                if vp8.number_of_temporal_layers == 0
                    || vp8.number_of_temporal_layers as usize > MAX_TEMPORAL_STREAMS
                    || vp8.complexity > 3
                {
                    return Err(EncodeError::BadParameter);
                }
            }
            CodecSpecificSettings::None => {}
            _ => return Err(EncodeError::BadParameter),
        }
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
    fn rejects_mismatched_codec_type() {
        let mut enc = Vp8Encoder::new();
        let settings = CodecSettings::with_defaults(VideoCodecType::H264, 640, 480);
        assert_eq!(enc.init_encode(&settings, 1, 1200), Err(EncodeError::BadParameter));
    }

    #[test]
    fn rejects_excess_temporal_layers() {
        let mut enc = Vp8Encoder::new();
        let mut settings = CodecSettings::with_defaults(VideoCodecType::Vp8, 640, 480);
        if let CodecSpecificSettings::Vp8(vp8) = &mut settings.codec_specific {
            vp8.number_of_temporal_layers = 5;
        }
        assert_eq!(enc.init_encode(&settings, 1, 1200), Err(EncodeError::BadParameter));
    }

    #[test]
    fn scaling_thresholds() {
        let enc = Vp8Encoder::new();
        let s = enc.scaling_settings();
        assert!(s.enabled);
        assert_eq!(s.thresholds, Some(QpThresholds { low: 29, high: 95 }));
    }
}
