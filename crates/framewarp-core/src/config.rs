use std::{default::Default, time::Duration};

use crate::{
    constants::{
        DATA_HEADER_SIZE, DEFAULT_MTU, FRAME_RING_SLOTS, LIVE_FRAME_WINDOW, MIN_RTO_MS,
        UDP_IP_OVERHEAD,
    },
    error::{ErrorKind, Result},
};

/// Configuration options to tune transport and runtime behavior.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum transmission unit used to derive the fragment payload size.
    pub mtu: u16,
    /// Number of slots in the capture frame ring.
    pub frame_ring_slots: usize,
    /// Floor for the retransmission timeout.
    pub min_rto: Duration,
    /// Trailing window of compressed frames whose fragments may still be
    /// retransmitted. Older frames are abandoned wholesale.
    pub live_frame_window: u32,
    /// Interval between periodic stats emissions.
    pub stats_interval: Duration,
    /// Upper bound on how long the event loop sleeps between polls.
    pub poll_granularity: Duration,
    /// Read timeout on the receiver's socket so shutdown is observed.
    pub recv_timeout: Duration,
    /// Socket receive buffer size in bytes (None = use system default).
    /// Corresponds to SO_RCVBUF; video bursts benefit from a large value.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = use system default).
    /// Corresponds to SO_SNDBUF.
    pub socket_send_buffer_size: Option<usize>,
}

impl Config {
    /// Returns the maximum fragment payload for the configured MTU.
    pub fn max_fragment_payload(&self) -> usize {
        (self.mtu as usize).saturating_sub(UDP_IP_OVERHEAD + DATA_HEADER_SIZE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            frame_ring_slots: FRAME_RING_SLOTS,
            min_rto: Duration::from_millis(MIN_RTO_MS),
            live_frame_window: LIVE_FRAME_WINDOW,
            stats_interval: Duration::from_secs(1),
            poll_granularity: Duration::from_millis(1),
            recv_timeout: Duration::from_millis(200),
            socket_recv_buffer_size: Some(4 * 1024 * 1024),
            socket_send_buffer_size: Some(4 * 1024 * 1024),
        }
    }
}

/// Negotiated per-session video parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StreamParams {
    /// Frame width in pixels.
    pub width: u16,
    /// Frame height in pixels.
    pub height: u16,
    /// Frames per second.
    pub fps: u16,
}

/// Supported (width, height, max fps) tiers; the first tier whose dimensions
/// both bound the request applies.
const TIERS: [(u16, u16, u16); 6] = [
    (1280, 720, 120),
    (1920, 1080, 60),
    (2000, 1500, 50),
    (3840, 2160, 20),
    (4000, 3000, 14),
    (8000, 6000, 3),
];

const ALLOWED_FPS: [u16; 6] = [120, 60, 50, 20, 14, 3];

/// Validates a requested resolution and frame rate against the tier table.
pub fn validate_resolution_and_fps(width: u16, height: u16, fps: u16) -> Result<()> {
    if width == 0 || height == 0 || fps == 0 {
        return Err(ErrorKind::ConfigError(
            "width, height, and fps must all be > 0".to_string(),
        ));
    }

    let tier_max = TIERS
        .iter()
        .find(|(w, h, _)| width <= *w && height <= *h)
        .map(|(_, _, max_fps)| *max_fps)
        .ok_or_else(|| {
            ErrorKind::ConfigError(format!("unsupported resolution: {}x{}", width, height))
        })?;

    if ALLOWED_FPS.contains(&fps) && fps <= tier_max {
        return Ok(());
    }

    Err(ErrorKind::ConfigError(format!(
        "unsupported frame rate {}fps for resolution {}x{} (max {}fps)",
        fps, width, height, tier_max
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_fragment_payload_default_mtu() {
        let config = Config::default();
        // 1500 - 28 (IP/UDP) - 22 (header) = 1450
        assert_eq!(config.max_fragment_payload(), 1450);
    }

    #[test]
    fn test_max_fragment_payload_custom_mtu() {
        let config = Config { mtu: 576, ..Config::default() };
        assert_eq!(config.max_fragment_payload(), 576 - 28 - 22);
    }

    #[test]
    fn test_tier_table_accepts_exact_tiers() {
        assert!(validate_resolution_and_fps(1280, 720, 120).is_ok());
        assert!(validate_resolution_and_fps(1920, 1080, 60).is_ok());
        assert!(validate_resolution_and_fps(2000, 1500, 50).is_ok());
        assert!(validate_resolution_and_fps(3840, 2160, 20).is_ok());
        assert!(validate_resolution_and_fps(4000, 3000, 14).is_ok());
        assert!(validate_resolution_and_fps(8000, 6000, 3).is_ok());
    }

    #[test]
    fn test_tier_table_uses_first_bounding_tier() {
        // 1600x900 falls into the 1920x1080 tier with a 60fps cap.
        assert!(validate_resolution_and_fps(1600, 900, 60).is_ok());
        assert!(validate_resolution_and_fps(1600, 900, 120).is_err());
    }

    #[test]
    fn test_tier_table_rejects_oversized_resolution() {
        assert!(validate_resolution_and_fps(9000, 6000, 3).is_err());
    }

    #[test]
    fn test_fps_must_be_in_allowed_set() {
        // 30fps is below the 720p cap but not in the allowed set.
        assert!(validate_resolution_and_fps(1280, 720, 30).is_err());
    }

    #[test]
    fn test_fps_above_tier_cap_rejected() {
        assert!(validate_resolution_and_fps(3840, 2160, 60).is_err());
    }

    #[test]
    fn test_zero_parameters_rejected() {
        assert!(validate_resolution_and_fps(0, 720, 60).is_err());
        assert!(validate_resolution_and_fps(1280, 0, 60).is_err());
        assert!(validate_resolution_and_fps(1280, 720, 0).is_err());
    }
}
