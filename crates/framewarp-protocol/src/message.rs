//! Wire record types for the fragmented-frame transport.
//!
//! This module defines the three records that cross the network:
//! - `Datagram`: one UDP-sized slice of a compressed frame
//! - `AckMsg`: per-fragment acknowledgment echoing the send timestamp
//! - `ConfigMsg`: session configuration exchanged during the handshake
//!
//! `WireMsg` is the sum of all three so downstream dispatch is exhaustive.

use framewarp_core::frame::FrameType;

/// Wire tag for data fragments.
pub const TAG_DATA: u8 = 0;
/// Wire tag for acknowledgments.
pub const TAG_ACK: u8 = 1;
/// Wire tag for configuration messages.
pub const TAG_CONFIG: u8 = 2;

/// One UDP-sized slice of a compressed video frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datagram {
    /// Monotonically increasing frame identifier.
    pub frame_id: u32,
    /// Whether the frame is self-contained (KEY) or dependent (DELTA).
    pub frame_type: FrameType,
    /// Index of this fragment within the frame.
    pub frag_id: u16,
    /// Total number of fragments in the frame.
    pub frag_cnt: u16,
    /// Number of times this fragment has been retransmitted.
    pub rtx: u16,
    /// Sender-side send timestamp in microseconds; 0 means not yet sent.
    pub send_ts: u64,
    /// Compressed payload bytes.
    pub payload: Vec<u8>,
}

/// Acknowledgment for a single received fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AckMsg {
    /// Frame identifier of the acknowledged fragment.
    pub frame_id: u32,
    /// Fragment index of the acknowledged fragment.
    pub frag_id: u16,
    /// Echoed send timestamp for RTT sampling at the sender.
    pub send_ts: u64,
}

impl AckMsg {
    /// Builds the acknowledgment for a received datagram.
    pub fn for_datagram(datagram: &Datagram) -> AckMsg {
        AckMsg {
            frame_id: datagram.frame_id,
            frag_id: datagram.frag_id,
            send_ts: datagram.send_ts,
        }
    }
}

/// Session configuration exchanged once at stream start.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConfigMsg {
    /// Frame width in pixels (0 in the receiver's initial request).
    pub width: u16,
    /// Frame height in pixels (0 in the receiver's initial request).
    pub height: u16,
    /// Frames per second (0 in the receiver's initial request).
    pub fps: u16,
    /// Target bitrate in kbps, forwarded to the encoder.
    pub target_bitrate: u32,
}

/// Sum of all record kinds that can arrive on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WireMsg {
    /// A data fragment.
    Data(Datagram),
    /// A per-fragment acknowledgment.
    Ack(AckMsg),
    /// A configuration message.
    Config(ConfigMsg),
}

impl WireMsg {
    /// Returns the leading wire tag for this record kind.
    pub fn tag(&self) -> u8 {
        match self {
            WireMsg::Data(_) => TAG_DATA,
            WireMsg::Ack(_) => TAG_ACK,
            WireMsg::Config(_) => TAG_CONFIG,
        }
    }
}
