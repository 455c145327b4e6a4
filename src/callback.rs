// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::frame::{CodecSpecificInfo, EncodedImage, FragmentationHeader};

/// Outcome of delivering one encoded image downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The frame was handed to the transport. `frame_id` is the identifier the
    /// downstream receiver will observe for this frame (the RTP timestamp when
    /// RTP carries the stream); the encoder keeps it for reference-frame
    /// bookkeeping and statistics correlation.
    Delivered { frame_id: u32 },
    /// The transport could not take the frame. Informational only: the encoder
    /// logs and counts it but its state machine is unaffected.
    SendFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackResult {
    pub status: DeliveryStatus,
    /// Backpressure request: the next `encode` call should skip producing output.
    pub drop_next_frame: bool,
}

impl CallbackResult {
    pub fn delivered(frame_id: u32) -> Self {
        Self { status: DeliveryStatus::Delivered { frame_id }, drop_next_frame: false }
    }
    pub fn send_failed() -> Self {
        Self { status: DeliveryStatus::SendFailed, drop_next_frame: false }
    }
    pub fn with_drop_next_frame(mut self, drop: bool) -> Self {
        self.drop_next_frame = drop;
        self
    }
}

/// The registered consumer of encoded output.
///
/// Exactly one sink is registered per encoder instance; registering a new one
/// replaces the prior one. Invocations for a given instance are strictly ordered
/// and never overlap — the software backends call the sink synchronously on the
/// `encode` caller's thread. A sink must never panic into the encoder; any
/// downstream failure is reported only through the returned [`CallbackResult`].
pub trait EncodedImageCallback {
    /// Called once per encoded output unit, in encode order. The image borrow is
    /// only valid for this call; copy out anything retained.
    fn on_encoded_image(
        &mut self,
        image: &EncodedImage,
        codec_specific: Option<&CodecSpecificInfo>,
        fragmentation: Option<&FragmentationHeader>,
    ) -> CallbackResult;

    /// Called when the encoder itself drops a frame it was given (rate
    /// constraints), independent of any backpressure the sink requested.
    fn on_dropped_frame(&mut self) {}
}
