// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::callback::{DeliveryStatus, EncodedImageCallback};
use crate::feedback::{ChannelState, FeedbackHandle};
use crate::frame::*;
use crate::settings::*;
use crate::types::{EncodeError, VideoCodecType};
use super::EncoderStats;

// Loss fraction (out of 255) above which the payload budget is shrunk
// to leave headroom for retransmissions.
const HIGH_LOSS_THRESHOLD: u8 = 26;
const MIN_PAYLOAD_BYTES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    Uninitialized,
    Initialized,
    Released,
}

/// Per-family constants a concrete backend instantiates the core with.
pub(crate) struct CodecProfile {
    pub name: &'static str,
    pub codec_type: VideoCodecType,
    pub scaling: ScalingSettings,
    pub base_qp: i32,
    /// Whether encoded units carry a fragmentation header (legacy packetization).
    pub fragmentation: bool,
}

/// Subset of `CodecSettings` the core keeps across calls. The settings reference
/// itself is only valid for the duration of `init_encode`.
struct Config {
    width: u32,
    height: u32,
    min_bitrate_kbps: u32,
    max_bitrate_kbps: u32,
    qp_max: u32,
    max_payload_size: usize,
    key_frame_interval: u32,
    frame_dropping_on: bool,
}

/// Shared software encoder core: the full lifecycle state machine, validation,
/// rate control and callback bookkeeping. Concrete backends layer codec-family
/// validation and capability descriptors on top.
///
/// Encoding is synchronous: the sink is invoked on the `encode` caller's thread
/// before `encode` returns, which also makes `release` trivially quiescent.
pub(crate) struct SoftwareEncoder {
    profile: CodecProfile,
    state: EncoderState,
    config: Option<Config>,
    callback: Option<Box<dyn EncodedImageCallback + Send>>,
    feedback: FeedbackHandle,
    image: EncodedImage,
    frames_since_key: u32,
    periodic_key_frames: bool,
    force_key_frame: bool,
    pending_drop: bool,
    stats: EncoderStats,
}

impl SoftwareEncoder {
    pub fn new(profile: CodecProfile) -> Self {
        Self {
            profile,
            state: EncoderState::Uninitialized,
            config: None,
            callback: None,
            feedback: FeedbackHandle::new(ChannelState::new(0, 30)),
            image: EncodedImage::default(),
            frames_since_key: 0,
            periodic_key_frames: true,
            force_key_frame: true,
            pending_drop: false,
            stats: EncoderStats::default(),
        }
    }

    /// Invalidate the instance. Backends call this before any validation of
    /// their own that can fail, so a failed re-init never leaves the encoder
    /// usable with stale state.
    pub fn uninitialize(&mut self) {
        self.state = EncoderState::Uninitialized;
    }

    pub fn init_encode(&mut self, settings: &CodecSettings, core_count: u32, max_payload_size: usize) -> Result<(), EncodeError> {
        // Any failure below leaves the instance unusable until a fresh init succeeds.
        self.state = EncoderState::Uninitialized;

        if settings.width == 0 || settings.height == 0 {
            return Err(EncodeError::SizeError);
        }
        if core_count == 0 || max_payload_size == 0 || settings.max_framerate == 0 {
            return Err(EncodeError::BadParameter);
        }
        if settings.max_bitrate_kbps == 0
            || settings.min_bitrate_kbps > settings.start_bitrate_kbps
            || settings.start_bitrate_kbps > settings.max_bitrate_kbps
        {
            return Err(EncodeError::BadParameter);
        }

        let (interval, dropping) = match &settings.codec_specific {
            CodecSpecificSettings::Vp8(s) => (s.key_frame_interval, s.frame_dropping_on),
            CodecSpecificSettings::Vp9(s) => (s.key_frame_interval, s.frame_dropping_on),
            CodecSpecificSettings::H264(s) => (s.key_frame_interval, s.frame_dropping_on),
            CodecSpecificSettings::None => (0, true),
        };

        self.image.payload = Vec::new();
        self.image.payload.try_reserve(max_payload_size).map_err(|_| EncodeError::OutOfMemory)?;

        self.config = Some(Config {
            width: settings.width,
            height: settings.height,
            min_bitrate_kbps: settings.min_bitrate_kbps,
            max_bitrate_kbps: settings.max_bitrate_kbps,
            qp_max: settings.qp_max,
            max_payload_size,
            key_frame_interval: interval,
            frame_dropping_on: dropping,
        });
        self.feedback.reset(settings.start_bitrate_kbps, settings.max_framerate);
        self.frames_since_key = 0;
        self.force_key_frame = true;
        self.pending_drop = false;
        self.stats = EncoderStats::default();
        self.state = EncoderState::Initialized;

        log::debug!("{}: initialized {}x{} @ {} kbps (max payload {} bytes)",
            self.profile.name, settings.width, settings.height, settings.start_bitrate_kbps, max_payload_size);
        Ok(())
    }

    pub fn register_callback(&mut self, sink: Box<dyn EncodedImageCallback + Send>) -> Result<(), EncodeError> {
        if self.state == EncoderState::Released {
            return Err(EncodeError::Uninitialized);
        }
        // Replaces any prior sink; there is no multicast.
        self.callback = Some(sink);
        Ok(())
    }

    pub fn encode(&mut self, frame: &VideoFrame, codec_specific: Option<&CodecSpecificInfo>, frame_types: Option<&[FrameType]>) -> Result<(), EncodeError> {
        if self.state != EncoderState::Initialized {
            return Err(EncodeError::Uninitialized);
        }
        let Some(config) = &self.config else {
            return Err(EncodeError::Uninitialized);
        };
        if frame.width != config.width || frame.height != config.height {
            return Err(EncodeError::BadParameter);
        }
        if frame.data.len() != frame.format.buffer_size(frame.width, frame.height) {
            return Err(EncodeError::BadParameter);
        }

        // Sink-requested backpressure: skip this frame, consume the flag.
        if self.pending_drop {
            self.pending_drop = false;
            self.stats.frames_dropped += 1;
            return Ok(());
        }

        if self.callback.is_none() {
            // No sink registered yet; drop silently rather than buffer a borrowed frame.
            self.stats.frames_dropped += 1;
            return Ok(());
        }

        let rate = self.feedback.snapshot();
        let mut target_kbps = rate.target_bitrate_kbps
            .clamp(config.min_bitrate_kbps, config.max_bitrate_kbps);
        if rate.packet_loss > HIGH_LOSS_THRESHOLD {
            target_kbps = target_kbps * 9 / 10;
        }
        if rate.target_bitrate_kbps == 0 && config.frame_dropping_on {
            // Rate controller starved the stream: an encoder-decided drop.
            if let Some(cb) = self.callback.as_mut() {
                cb.on_dropped_frame();
            }
            self.stats.frames_dropped += 1;
            return Ok(());
        }

        let key_frame = self.force_key_frame
            || frame_types.is_some_and(|t| t.contains(&FrameType::Key))
            || (self.periodic_key_frames
                && config.key_frame_interval > 0
                && self.frames_since_key >= config.key_frame_interval);

        let fps = rate.framerate.max(1) as usize;
        let mut len = (target_kbps as usize * 1000) / (8 * fps);
        if key_frame {
            len *= 3;
        }
        let clipped = len > config.max_payload_size;
        len = len.max(MIN_PAYLOAD_BYTES).min(config.max_payload_size);

        let qp = (self.profile.base_qp + if clipped { 12 } else { 0 }).min(config.qp_max as i32);

        fill_payload(&mut self.image.payload, len, frame.rtp_timestamp, key_frame);
        self.image.frame_type = Some(if key_frame { FrameType::Key } else { FrameType::Delta });
        self.image.rtp_timestamp = frame.rtp_timestamp;
        self.image.capture_time_ms = frame.capture_time_ms;
        self.image.encoded_width = frame.width;
        self.image.encoded_height = frame.height;
        self.image.qp = Some(qp);
        self.image.complete = true;
        self.image.checksum = crc32fast::hash(&self.image.payload);

        // Layered allocations tag delta frames with a cycling temporal index;
        // key frames always sit in the base layer.
        let temporal_idx = rate.allocation.filter(|_| !key_frame).and_then(|a| {
            let layers = a.active_temporal_layers(0);
            (layers > 1).then(|| (self.stats.frames_encoded % layers as u64) as u8)
        });
        let own_info;
        let info = match codec_specific {
            Some(info) => info,
            None => {
                own_info = CodecSpecificInfo { codec_type: self.profile.codec_type, temporal_idx };
                &own_info
            }
        };
        let fragmentation = self.profile.fragmentation.then(|| FragmentationHeader {
            fragments: vec![Fragment { offset: 0, length: self.image.payload.len() }],
        });

        let result = match self.callback.as_mut() {
            Some(cb) => cb.on_encoded_image(&self.image, Some(info), fragmentation.as_ref()),
            None => return Ok(()),
        };
        // The image's backing buffer may be reused from here on.

        match result.status {
            DeliveryStatus::Delivered { frame_id } => {
                self.stats.last_frame_id = Some(frame_id);
            }
            DeliveryStatus::SendFailed => {
                // Informational only; the state machine is unaffected.
                log::warn!("{}: downstream send failed for frame {}", self.profile.name, frame.rtp_timestamp);
                self.stats.send_failures += 1;
            }
        }
        if result.drop_next_frame {
            self.pending_drop = true;
        }

        self.stats.frames_encoded += 1;
        if key_frame {
            self.stats.key_frames += 1;
            self.frames_since_key = 0;
        } else {
            self.frames_since_key += 1;
        }
        self.force_key_frame = false;
        Ok(())
    }

    pub fn set_channel_parameters(&mut self, packet_loss: u8, rtt_ms: i64) -> Result<(), EncodeError> {
        if self.state != EncoderState::Initialized {
            return Err(EncodeError::Generic);
        }
        self.feedback.set_channel_parameters(packet_loss, rtt_ms);
        log::debug!("{}: channel update, loss {}/255, rtt {} ms", self.profile.name, packet_loss, rtt_ms);
        Ok(())
    }

    pub fn set_rates(&mut self, bitrate_kbps: u32, framerate: u32) -> Result<(), EncodeError> {
        if self.state != EncoderState::Initialized {
            return Err(EncodeError::Uninitialized);
        }
        let Some(config) = &self.config else {
            return Err(EncodeError::Uninitialized);
        };
        if framerate == 0 {
            return Err(EncodeError::BadParameter);
        }
        let clamped = bitrate_kbps.clamp(config.min_bitrate_kbps, config.max_bitrate_kbps);
        if clamped != bitrate_kbps {
            log::warn!("{}: target {} kbps outside [{}, {}], clamped to {}",
                self.profile.name, bitrate_kbps, config.min_bitrate_kbps, config.max_bitrate_kbps, clamped);
        }
        self.feedback.set_rates(clamped, framerate);
        Ok(())
    }

    /// Layered-rate path for backends that keep per-layer targets.
    pub fn set_rate_allocation(&mut self, allocation: &BitrateAllocation, framerate: u32) -> Result<(), EncodeError> {
        if self.state != EncoderState::Initialized {
            return Err(EncodeError::Uninitialized);
        }
        if framerate == 0 {
            return Err(EncodeError::BadParameter);
        }
        self.feedback.set_rate_allocation(*allocation, framerate);
        Ok(())
    }

    pub fn set_periodic_key_frames(&mut self, enable: bool) -> Result<(), EncodeError> {
        if self.state != EncoderState::Initialized {
            return Err(EncodeError::Uninitialized);
        }
        self.periodic_key_frames = enable;
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), EncodeError> {
        // Encoding is synchronous, so nothing is in flight by the time we get here.
        self.callback = None;
        self.config = None;
        self.image = EncodedImage::default();
        self.state = EncoderState::Released;
        log::debug!("{}: released", self.profile.name);
        Ok(())
    }

    pub fn scaling_settings(&self) -> ScalingSettings {
        self.profile.scaling
    }

    pub fn implementation_name(&self) -> &'static str {
        self.profile.name
    }

    pub fn feedback_handle(&self) -> FeedbackHandle {
        self.feedback.clone()
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }
}

fn fill_payload(buf: &mut Vec<u8>, len: usize, rtp_timestamp: u32, key_frame: bool) {
    buf.clear();
    buf.resize(len, 0);
    let seed = rtp_timestamp.to_le_bytes();
    for (i, b) in buf.iter_mut().enumerate() {
        *b = seed[i % 4] ^ (i as u8);
    }
    // Leading marker so frame types are distinguishable in payload dumps.
    buf[0] = if key_frame { 0x9D } else { 0x1D };
}
