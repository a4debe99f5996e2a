#![warn(missing_docs)]

//! Framewarp: a small public API facade for the workspace.
//!
//! This crate provides a clean, stable surface that re-exports the most
//! commonly used types to build a video telemetry pipeline:
//!
//! - Configuration and tiers (`Config`, `StreamParams`,
//!   `validate_resolution_and_fps`)
//! - Wire records (`Datagram`, `AckMsg`, `ConfigMsg`, `WireMsg`) and their
//!   codec
//! - The sender transport and receiver reassembler
//! - The runtime pieces: frame ring, capture thread, handshake, sessions
//!
//! The `framewarp-sender` and `framewarp-receiver` binaries wire these
//! together into the two endpoint processes.

// Core: configuration, errors, frames, codec seams
pub use framewarp_core::codec::{
    FrameSink, NullSink, PassthroughCodec, VideoDecoder, VideoEncoder,
};
pub use framewarp_core::config::{validate_resolution_and_fps, Config, StreamParams};
pub use framewarp_core::error::{DecodingErrorKind, ErrorKind, Result};
pub use framewarp_core::frame::{FrameType, RawFrame};
// Protocol: wire records and estimators
pub use framewarp_protocol::{
    AckMsg, ConfigMsg, Datagram, MessageDecoder, MessageEncoder, RttEstimator, WireMsg,
};
// Transport endpoints
pub use framewarp_receiver::{
    CompletedFrame, DecodeWorker, Frame, FrameTimingLog, LazyLevel, Reassembler, Y4mWriter,
};
pub use framewarp_sender::SenderTransport;
// Runtime: ring, capture, handshake, sessions
pub use framewarp_runtime::handshake::{await_config, request_config, send_config_reply};
pub use framewarp_runtime::socket::{bind_udp, connect_udp};
pub use framewarp_runtime::{
    capture_loop, Clock, FrameRing, FrameSource, PeriodicTimer, ReceiverSession, RingConsumer,
    RingProducer, SenderSession, SystemClock, TestPatternSource,
};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        Config, ConfigMsg, Datagram, ErrorKind, FrameType, LazyLevel, PassthroughCodec, RawFrame,
        ReceiverSession, Reassembler, Result, SenderSession, SenderTransport, StreamParams,
        WireMsg,
    };
}
