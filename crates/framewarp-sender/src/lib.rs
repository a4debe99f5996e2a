#![warn(missing_docs)]

//! framewarp-sender: the sender half of the fragmented-frame transport.
//!
//! [`SenderTransport`] turns encoded frames into wire fragments, tracks
//! which fragments are still unacknowledged, and re-queues timed-out
//! fragments of recent frames for retransmission. It owns no socket: the
//! event loop feeds it raw frames and ACKs and drains its pending FIFO.

/// Sender transport state machine.
pub mod transport;

pub use transport::SenderTransport;
