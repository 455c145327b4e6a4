// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

pub(crate) mod software;
pub(crate) mod vp8;
pub(crate) mod vp9;
pub(crate) mod h264;

use crate::callback::EncodedImageCallback;
use crate::feedback::FeedbackHandle;
use crate::frame::{CodecSpecificInfo, FrameType, VideoFrame};
use crate::settings::{BitrateAllocation, CodecSettings, ScalingSettings};
use crate::types::{EncodeError, EncoderType, VideoCodecType};

/// Diagnostic counters. `last_frame_id` is the transport-level identifier the
/// sink assigned to the most recently delivered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub frames_dropped: u64,
    pub key_frames: u64,
    pub send_failures: u64,
    pub last_frame_id: Option<u32>,
}

/// The encoder lifecycle contract every backend implements.
///
/// States run `Uninitialized → Initialized → Released`, with `init_encode`
/// returning the instance to `Initialized` from any state. A failed call never
/// corrupts the state machine: the instance stays in its last well-defined
/// state and the caller decides what to do with the returned error.
#[enum_dispatch::enum_dispatch(EncoderBackend)]
pub trait EncoderInterface {
    /// Validate `settings` and allocate backend resources. Re-initializes
    /// cleanly when already initialized, discarding prior state. The settings
    /// reference is only valid for the duration of this call.
    fn init_encode(&mut self, settings: &CodecSettings, core_count: u32, max_payload_size: usize) -> Result<(), EncodeError>;

    /// Replace the registered sink. Valid in any non-released state. Until a
    /// sink is registered, encoded output is dropped silently.
    fn register_callback(&mut self, sink: Box<dyn EncodedImageCallback + Send>) -> Result<(), EncodeError>;

    /// Encode one frame. Produces zero or more ordered sink invocations before
    /// returning. At least a `Key` request in `frame_types` must be honored.
    fn encode(&mut self, frame: &VideoFrame, codec_specific: Option<&CodecSpecificInfo>, frame_types: Option<&[FrameType]>) -> Result<(), EncodeError>;

    /// Advisory network feedback (loss fraction out of 255, RTT in ms); never
    /// required to take effect synchronously and never changes state.
    fn set_channel_parameters(&mut self, packet_loss: u8, rtt_ms: i64) -> Result<(), EncodeError>;

    /// Single aggregate-rate path.
    fn set_rates(&mut self, bitrate_kbps: u32, framerate: u32) -> Result<(), EncodeError>;

    /// Preferred layered-rate path. Backends without layer support fall back to
    /// the sum of all layers through `set_rates`.
    fn set_rate_allocation(&mut self, allocation: &BitrateAllocation, framerate: u32) -> Result<(), EncodeError> {
        self.set_rates(allocation.sum_kbps(), framerate)
    }

    fn set_periodic_key_frames(&mut self, _enable: bool) -> Result<(), EncodeError> {
        Err(EncodeError::Generic)
    }

    /// Free backend resources and drop the registered sink. Only `init_encode`
    /// is valid afterwards.
    fn release(&mut self) -> Result<(), EncodeError>;

    /// Quality-scaling capability descriptor; scaling policy itself lives in
    /// the orchestrator.
    fn scaling_settings(&self) -> ScalingSettings {
        ScalingSettings::default()
    }

    fn supports_native_handle(&self) -> bool {
        false
    }

    fn implementation_name(&self) -> &'static str {
        "unknown"
    }

    /// Control-plane handle bound to this instance; see [`FeedbackHandle`].
    fn feedback_handle(&self) -> FeedbackHandle;

    fn stats(&self) -> EncoderStats {
        EncoderStats::default()
    }
}

#[enum_dispatch::enum_dispatch]
pub enum EncoderBackend {
    Unknown(NullEncoder),
    Vp8Encoder(vp8::Vp8Encoder),
    Vp9Encoder(vp9::Vp9Encoder),
    H264Encoder(h264::H264Encoder),
}

pub struct Encoder {
    inner: EncoderBackend,
}

impl Encoder {
    /// Create an encoder instance for the given backend type.
    pub fn new(encoder_type: EncoderType) -> Result<Self, EncodeError> {
        match encoder_type {
            EncoderType::Vp8 => Ok(Self { inner: EncoderBackend::Vp8Encoder(vp8::Vp8Encoder::new()) }),
            EncoderType::Vp9 => Ok(Self { inner: EncoderBackend::Vp9Encoder(vp9::Vp9Encoder::new()) }),
            EncoderType::H264 => Ok(Self { inner: EncoderBackend::H264Encoder(h264::H264Encoder::new()) }),
            EncoderType::Unsupported => Err(EncodeError::UnsupportedCodec),
        }
    }

    /// Whether `Encoder::new` can create this type without hardware support.
    pub fn is_supported_software(encoder_type: EncoderType) -> bool {
        !matches!(encoder_type, EncoderType::Unsupported)
    }

    pub fn codec_to_encoder_type(codec: VideoCodecType) -> EncoderType {
        match codec {
            VideoCodecType::Vp8 => EncoderType::Vp8,
            VideoCodecType::Vp9 => EncoderType::Vp9,
            VideoCodecType::H264 => EncoderType::H264,
            VideoCodecType::Generic | VideoCodecType::Unknown => EncoderType::Unsupported,
        }
    }

    pub fn init_encode(&mut self, settings: &CodecSettings, core_count: u32, max_payload_size: usize) -> Result<(), EncodeError> {
        self.inner.init_encode(settings, core_count, max_payload_size)
    }
    pub fn register_callback(&mut self, sink: Box<dyn EncodedImageCallback + Send>) -> Result<(), EncodeError> {
        self.inner.register_callback(sink)
    }
    pub fn encode(&mut self, frame: &VideoFrame, codec_specific: Option<&CodecSpecificInfo>, frame_types: Option<&[FrameType]>) -> Result<(), EncodeError> {
        self.inner.encode(frame, codec_specific, frame_types)
    }
    pub fn set_channel_parameters(&mut self, packet_loss: u8, rtt_ms: i64) -> Result<(), EncodeError> {
        self.inner.set_channel_parameters(packet_loss, rtt_ms)
    }
    pub fn set_rates(&mut self, bitrate_kbps: u32, framerate: u32) -> Result<(), EncodeError> {
        self.inner.set_rates(bitrate_kbps, framerate)
    }
    pub fn set_rate_allocation(&mut self, allocation: &BitrateAllocation, framerate: u32) -> Result<(), EncodeError> {
        self.inner.set_rate_allocation(allocation, framerate)
    }
    pub fn set_periodic_key_frames(&mut self, enable: bool) -> Result<(), EncodeError> {
        self.inner.set_periodic_key_frames(enable)
    }
    pub fn release(&mut self) -> Result<(), EncodeError> {
        self.inner.release()
    }
    pub fn scaling_settings(&self) -> ScalingSettings {
        self.inner.scaling_settings()
    }
    pub fn supports_native_handle(&self) -> bool {
        self.inner.supports_native_handle()
    }
    pub fn implementation_name(&self) -> &'static str {
        self.inner.implementation_name()
    }
    pub fn feedback_handle(&self) -> FeedbackHandle {
        self.inner.feedback_handle()
    }
    pub fn stats(&self) -> EncoderStats {
        self.inner.stats()
    }
}

/// Placeholder backend for codec types no factory can service.
pub struct NullEncoder {
    feedback: FeedbackHandle,
}

impl Default for NullEncoder {
    fn default() -> Self {
        Self { feedback: FeedbackHandle::new(crate::feedback::ChannelState::new(0, 30)) }
    }
}

impl EncoderInterface for NullEncoder {
    fn init_encode(&mut self, _settings: &CodecSettings, _core_count: u32, _max_payload_size: usize) -> Result<(), EncodeError> {
        Err(EncodeError::UnsupportedCodec)
    }
    fn register_callback(&mut self, _sink: Box<dyn EncodedImageCallback + Send>) -> Result<(), EncodeError> {
        Err(EncodeError::UnsupportedCodec)
    }
    fn encode(&mut self, _frame: &VideoFrame, _codec_specific: Option<&CodecSpecificInfo>, _frame_types: Option<&[FrameType]>) -> Result<(), EncodeError> {
        Err(EncodeError::Uninitialized)
    }
    fn set_channel_parameters(&mut self, _packet_loss: u8, _rtt_ms: i64) -> Result<(), EncodeError> {
        Err(EncodeError::Generic)
    }
    fn set_rates(&mut self, _bitrate_kbps: u32, _framerate: u32) -> Result<(), EncodeError> {
        Err(EncodeError::Uninitialized)
    }
    fn release(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }
    fn feedback_handle(&self) -> FeedbackHandle {
        self.feedback.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_maps_codec_types() {
        assert_eq!(Encoder::codec_to_encoder_type(VideoCodecType::Vp8), EncoderType::Vp8);
        assert_eq!(Encoder::codec_to_encoder_type(VideoCodecType::H264), EncoderType::H264);
        assert_eq!(Encoder::codec_to_encoder_type(VideoCodecType::Unknown), EncoderType::Unsupported);
    }

    #[test]
    fn factory_rejects_unsupported() {
        assert!(Encoder::new(EncoderType::Unsupported).is_err());
        assert!(!Encoder::is_supported_software(EncoderType::Unsupported));
        assert!(Encoder::is_supported_software(EncoderType::Vp9));
    }

    #[test]
    fn implementation_names() {
        assert_eq!(Encoder::new(EncoderType::Vp8).unwrap().implementation_name(), "vp8_software");
        assert_eq!(Encoder::new(EncoderType::Vp9).unwrap().implementation_name(), "vp9_software");
        assert_eq!(Encoder::new(EncoderType::H264).unwrap().implementation_name(), "h264_software");
    }
}
