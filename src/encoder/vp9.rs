// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use super::software::{CodecProfile, SoftwareEncoder};
use super::{EncoderInterface, EncoderStats};
use crate::callback::EncodedImageCallback;
use crate::feedback::FeedbackHandle;
use crate::frame::{CodecSpecificInfo, FrameType, VideoFrame};
use crate::settings::*;
use crate::types::{EncodeError, VideoCodecType};

pub struct Vp9Encoder {
    inner: SoftwareEncoder,
}

impl Vp9Encoder {
    pub fn new() -> Self {
        Self {
            inner: SoftwareEncoder::new(CodecProfile {
                name: "vp9_software",
                codec_type: VideoCodecType::Vp9,
                scaling: ScalingSettings::enabled(96, 185),
                base_qp: 32,
                fragmentation: false,
            }),
        }
    }
}

impl EncoderInterface for Vp9Encoder {
    fn init_encode(&mut self, settings: &CodecSettings, core_count: u32, max_payload_size: usize) -> Result<(), EncodeError> {
        self.inner.uninitialize();
        if settings.codec_type != VideoCodecType::Vp9 {
            return Err(EncodeError::BadParameter);
        }
        match &settings.codec_specific {
            CodecSpecificSettings::Vp9(vp9) => {
                if vp9.number_of_temporal_layers == 0
                    || vp9.number_of_temporal_layers as usize > MAX_TEMPORAL_STREAMS
                    || vp9.number_of_spatial_layers == 0
                    || vp9.number_of_spatial_layers as usize > MAX_SPATIAL_LAYERS
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
    // Spatial/temporal layering is native here, so per-layer targets are kept
    // instead of collapsing to the aggregate sum.
    fn set_rate_allocation(&mut self, allocation: &BitrateAllocation, framerate: u32) -> Result<(), EncodeError> {
        self.inner.set_rate_allocation(allocation, framerate)
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
    fn rejects_excess_spatial_layers() {
        let mut enc = Vp9Encoder::new();
        let mut settings = CodecSettings::with_defaults(VideoCodecType::Vp9, 640, 480);
        if let CodecSpecificSettings::Vp9(vp9) = &mut settings.codec_specific {
            vp9.number_of_spatial_layers = 6;
        }
        assert_eq!(enc.init_encode(&settings, 1, 1200), Err(EncodeError::BadParameter));
    }

    #[test]
    fn layered_allocation_accepted_after_init() {
        let mut enc = Vp9Encoder::new();
        let settings = CodecSettings::with_defaults(VideoCodecType::Vp9, 640, 480);
        enc.init_encode(&settings, 1, 1200).unwrap();

        let mut alloc = BitrateAllocation::default();
        alloc.set_bitrate(0, 0, 200_000);
        alloc.set_bitrate(1, 0, 400_000);
        enc.set_rate_allocation(&alloc, 30).unwrap();
        assert_eq!(enc.set_rate_allocation(&alloc, 0), Err(EncodeError::BadParameter));
    }
}
