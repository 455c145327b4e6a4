use std::sync::Arc;
use parking_lot::Mutex;

use crate::settings::BitrateAllocation;

/// Rate/channel state shared between an encoder and its control plane.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChannelState {
    pub target_bitrate_kbps: u32,
    pub framerate: u32,
    pub allocation: Option<BitrateAllocation>,
    /// Fraction lost, 0..=255 (loss percent = 100 * packet_loss / 255).
    pub packet_loss: u8,
    pub rtt_ms: i64,
}

impl ChannelState {
    pub fn new(target_bitrate_kbps: u32, framerate: u32) -> Self {
        Self { target_bitrate_kbps, framerate, allocation: None, packet_loss: 0, rtt_ms: 0 }
    }
}

/// Cloneable handle for pushing network feedback into a running encoder.
///
/// This is the reverse path of the pipeline: a control thread can update rate
/// targets and channel conditions at its own cadence without holding the encoder
/// itself. Updates are applied on the next `encode` call. The lock only covers
/// this snapshot; it is never held across callback emission.
#[derive(Clone)]
pub struct FeedbackHandle {
    inner: Arc<Mutex<ChannelState>>,
}

impl FeedbackHandle {
    pub(crate) fn new(state: ChannelState) -> Self {
        Self { inner: Arc::new(Mutex::new(state)) }
    }

    pub fn set_rates(&self, bitrate_kbps: u32, framerate: u32) {
        let mut state = self.inner.lock();
        state.target_bitrate_kbps = bitrate_kbps;
        state.framerate = framerate;
        state.allocation = None;
    }

    pub fn set_rate_allocation(&self, allocation: BitrateAllocation, framerate: u32) {
        let mut state = self.inner.lock();
        state.target_bitrate_kbps = allocation.sum_kbps();
        state.framerate = framerate;
        state.allocation = Some(allocation);
    }

    pub fn set_channel_parameters(&self, packet_loss: u8, rtt_ms: i64) {
        let mut state = self.inner.lock();
        state.packet_loss = packet_loss;
        state.rtt_ms = rtt_ms;
    }

    pub(crate) fn snapshot(&self) -> ChannelState {
        *self.inner.lock()
    }

    pub(crate) fn reset(&self, target_bitrate_kbps: u32, framerate: u32) {
        *self.inner.lock() = ChannelState::new(target_bitrate_kbps, framerate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_visible_through_clones() {
        let handle = FeedbackHandle::new(ChannelState::new(300, 30));
        let clone = handle.clone();
        clone.set_channel_parameters(26, 120);
        clone.set_rates(800, 25);
        let state = handle.snapshot();
        assert_eq!(state.packet_loss, 26);
        assert_eq!(state.rtt_ms, 120);
        assert_eq!(state.target_bitrate_kbps, 800);
        assert_eq!(state.framerate, 25);
    }

    #[test]
    fn allocation_replaces_aggregate() {
        let handle = FeedbackHandle::new(ChannelState::new(300, 30));
        let mut alloc = BitrateAllocation::default();
        alloc.set_bitrate(0, 0, 250_000);
        alloc.set_bitrate(1, 0, 750_000);
        handle.set_rate_allocation(alloc, 30);
        let state = handle.snapshot();
        assert_eq!(state.target_bitrate_kbps, 1000);
        assert!(state.allocation.is_some());
    }
}
