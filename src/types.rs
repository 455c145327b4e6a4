// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use thiserror::Error;

/// Which concrete backend the factory should instantiate. Immutable once chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncoderType {
    H264,
    Vp8,
    Vp9,
    Unsupported,
}

/// Wire-level codec identifier as negotiated by the surrounding pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodecType {
    Vp8,
    Vp9,
    H264,
    Generic,
    Unknown,
}

/// Synchronous failure kinds for encoder operations.
///
/// Downstream send failures are not represented here on purpose: the encoder may
/// already have produced the image by the time transmission fails, so those travel
/// back through [`crate::CallbackResult`] instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Encoder is not initialized")]
    Uninitialized,
    #[error("Invalid parameter")]
    BadParameter,
    #[error("Unsupported frame size")]
    SizeError,
    #[error("Codec level exceeded")]
    LevelExceeded,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Encoder error")]
    Generic,
    #[error("Encode timed out")]
    Timeout,
    #[error("Codec is not supported")]
    UnsupportedCodec,
}
