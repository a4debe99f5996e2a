#![warn(missing_docs)]

//! framewarp-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core utilities shared across all
//! layers of the video telemetry pipeline:
//! - Configuration types and the supported resolution tiers
//! - Error handling
//! - Protocol constants
//! - Raw frame buffers (YUV420P)
//! - Codec trait seams for the external encoder/decoder/renderer
//!
//! Transport logic lives in specialized crates:
//! - `framewarp-protocol`: wire records, message codec, RTT estimation
//! - `framewarp-sender`: packetization, unacked tracking, retransmission
//! - `framewarp-receiver`: frame reassembly, key-frame resync, decode worker
//! - `framewarp-runtime`: frame ring, capture thread, sessions, event loop

/// Protocol constants shared across layers.
pub mod constants {
    /// The size of the serialized data-fragment header in bytes.
    ///
    /// tag (1) + frame_id (4) + frame_type (1) + frag_id (2) + frag_cnt (2)
    /// + rtx (2) + send_ts (8) + payload_len (2)
    pub const DATA_HEADER_SIZE: usize = 22;
    /// The size of a serialized acknowledgment message in bytes.
    pub const ACK_MSG_SIZE: usize = 15;
    /// The size of a serialized configuration message in bytes.
    pub const CONFIG_MSG_SIZE: usize = 11;
    /// Per-datagram IP and UDP header overhead.
    ///
    /// Derived from ipv4_header_size + udp_header_size = 20 + 8. IPv6 would
    /// leave 20 bytes less room; the default MTU keeps enough slack that a
    /// 1450-byte payload still fits a common 1500-byte ethernet frame.
    pub const UDP_IP_OVERHEAD: usize = 28;
    /// Default maximum transmission unit used to size fragment payloads.
    pub const DEFAULT_MTU: u16 = 1500;
    /// Default number of slots in the capture frame ring.
    ///
    /// Sized so several hundred milliseconds of scheduling jitter at high
    /// frame rates does not stall capture.
    pub const FRAME_RING_SLOTS: usize = 500;
    /// Number of most-recently compressed frames whose fragments are still
    /// eligible for retransmission.
    pub const LIVE_FRAME_WINDOW: u32 = 8;
    /// Floor for the retransmission timeout in milliseconds.
    pub const MIN_RTO_MS: u64 = 20;
}

/// Codec trait seams and the built-in passthrough codec.
pub mod codec;
/// Configuration options and resolution tier validation.
pub mod config;
/// Error types and results.
pub mod error;
/// Raw video frames and frame types.
pub mod frame;
