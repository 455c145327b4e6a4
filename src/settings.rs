// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use crate::types::VideoCodecType;

pub const MAX_SPATIAL_LAYERS: usize = 5;
pub const MAX_TEMPORAL_STREAMS: usize = 4;

/// Codec configuration handed to `init_encode` by reference.
/// The encoder copies what it needs; it must not hold the reference past the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSettings {
    pub codec_type: VideoCodecType,
    pub width: u32,
    pub height: u32,
    pub start_bitrate_kbps: u32,
    pub min_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub max_framerate: u32,
    pub qp_max: u32,
    pub codec_specific: CodecSpecificSettings,
}

impl CodecSettings {
    /// Baseline settings for a codec family at the given resolution.
    pub fn with_defaults(codec_type: VideoCodecType, width: u32, height: u32) -> Self {
        let codec_specific = match codec_type {
            VideoCodecType::Vp8 => CodecSpecificSettings::Vp8(Vp8Settings::default()),
            VideoCodecType::Vp9 => CodecSpecificSettings::Vp9(Vp9Settings::default()),
            VideoCodecType::H264 => CodecSpecificSettings::H264(H264Settings::default()),
            _ => CodecSpecificSettings::None,
        };
        Self {
            codec_type,
            width, height,
            start_bitrate_kbps: 300,
            min_bitrate_kbps: 30,
            max_bitrate_kbps: 2500,
            max_framerate: 30,
            qp_max: 56,
            codec_specific,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecSpecificSettings {
    Vp8(Vp8Settings),
    Vp9(Vp9Settings),
    H264(H264Settings),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vp8Settings {
    pub complexity: u8,
    pub number_of_temporal_layers: u8,
    pub denoising_on: bool,
    pub automatic_resize_on: bool,
    pub frame_dropping_on: bool,
    pub key_frame_interval: u32,
}

impl Default for Vp8Settings {
    fn default() -> Self {
        Self {
            complexity: 0,
            number_of_temporal_layers: 1,
            denoising_on: true,
            automatic_resize_on: true,
            frame_dropping_on: true,
            key_frame_interval: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vp9Settings {
    pub number_of_temporal_layers: u8,
    pub number_of_spatial_layers: u8,
    pub denoising_on: bool,
    pub frame_dropping_on: bool,
    pub adaptive_qp_mode: bool,
    pub flexible_mode: bool,
    pub key_frame_interval: u32,
}

impl Default for Vp9Settings {
    fn default() -> Self {
        Self {
            number_of_temporal_layers: 1,
            number_of_spatial_layers: 1,
            denoising_on: true,
            frame_dropping_on: true,
            adaptive_qp_mode: true,
            flexible_mode: false,
            key_frame_interval: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H264Profile {
    ConstrainedBaseline,
    Baseline,
    Main,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H264Settings {
    pub profile: H264Profile,
    pub frame_dropping_on: bool,
    pub key_frame_interval: u32,
}

impl Default for H264Settings {
    fn default() -> Self {
        Self {
            profile: H264Profile::ConstrainedBaseline,
            frame_dropping_on: true,
            key_frame_interval: 3000,
        }
    }
}

/// QP interval at which the orchestrator should consider scaling resolution down
/// (above `high`) or back up (below `low`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QpThresholds {
    pub low: i32,
    pub high: i32,
}

/// Capability descriptor for quality-driven resolution scaling.
///
/// Thresholds are only meaningful when `enabled` is true; the default is
/// disabled with no thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalingSettings {
    pub enabled: bool,
    pub thresholds: Option<QpThresholds>,
}

impl ScalingSettings {
    pub fn enabled(low: i32, high: i32) -> Self {
        debug_assert!(low < high);
        Self { enabled: true, thresholds: Some(QpThresholds { low, high }) }
    }
}

/// Target bitrate per spatial/temporal layer, in bps.
/// Backends without layer support collapse this to its aggregate sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BitrateAllocation {
    layers: [[u32; MAX_TEMPORAL_STREAMS]; MAX_SPATIAL_LAYERS],
}

impl BitrateAllocation {
    /// Returns false (and stores nothing) when the layer indices are out of range.
    pub fn set_bitrate(&mut self, spatial: usize, temporal: usize, bps: u32) -> bool {
        if spatial >= MAX_SPATIAL_LAYERS || temporal >= MAX_TEMPORAL_STREAMS {
            return false;
        }
        self.layers[spatial][temporal] = bps;
        true
    }

    pub fn get_bitrate(&self, spatial: usize, temporal: usize) -> u32 {
        self.layers.get(spatial).and_then(|s| s.get(temporal)).copied().unwrap_or(0)
    }

    pub fn sum_bps(&self) -> u32 {
        self.layers.iter().flatten().sum()
    }

    pub fn sum_kbps(&self) -> u32 {
        self.sum_bps() / 1000
    }

    /// Number of temporal layers with a non-zero target in the given spatial layer.
    pub fn active_temporal_layers(&self, spatial: usize) -> usize {
        self.layers.get(spatial).map_or(0, |s| s.iter().filter(|bps| **bps > 0).count())
    }

    pub fn is_zero(&self) -> bool {
        self.sum_bps() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_defaults_to_disabled() {
        let s = ScalingSettings::default();
        assert!(!s.enabled);
        assert!(s.thresholds.is_none());
    }

    #[test]
    fn scaling_thresholds_ordered() {
        let s = ScalingSettings::enabled(20, 40);
        let t = s.thresholds.unwrap();
        assert!(t.low < t.high);
    }

    #[test]
    fn allocation_sums_all_layers() {
        let mut alloc = BitrateAllocation::default();
        assert!(alloc.set_bitrate(0, 0, 200_000));
        assert!(alloc.set_bitrate(0, 1, 100_000));
        assert!(alloc.set_bitrate(1, 0, 500_000));
        assert!(!alloc.set_bitrate(MAX_SPATIAL_LAYERS, 0, 1));
        assert_eq!(alloc.sum_bps(), 800_000);
        assert_eq!(alloc.sum_kbps(), 800);
    }

    #[test]
    fn default_settings_per_family() {
        let s = CodecSettings::with_defaults(VideoCodecType::Vp9, 1280, 720);
        assert!(matches!(s.codec_specific, CodecSpecificSettings::Vp9(_)));
        assert!(s.min_bitrate_kbps <= s.start_bitrate_kbps);
        assert!(s.start_bitrate_kbps <= s.max_bitrate_kbps);
    }
}
