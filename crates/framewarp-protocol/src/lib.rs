#![warn(missing_docs)]

//! framewarp-protocol: wire records and transport estimators.
//!
//! Three record kinds share a single wire envelope with a leading type tag:
//! data fragments, per-fragment acknowledgments, and the session
//! configuration exchanged during the handshake. All multi-byte integers are
//! big-endian. The codec lives in [`message_codec`]; [`rtt`] provides the
//! smoothed round-trip-time estimator that drives retransmission timeouts.

/// Wire record types.
pub mod message;
/// Binary encoding and decoding of wire records.
pub mod message_codec;
/// Smoothed RTT estimation and retransmission timeouts.
pub mod rtt;

pub use message::{AckMsg, ConfigMsg, Datagram, WireMsg};
pub use message_codec::{MessageDecoder, MessageEncoder};
pub use rtt::RttEstimator;
