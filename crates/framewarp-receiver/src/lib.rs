#![warn(missing_docs)]

//! framewarp-receiver: the receiver half of the fragmented-frame transport.
//!
//! [`Reassembler`] collects fragments into [`Frame`] entities, decides when
//! the next frame is consumable, and performs key-frame resync when the
//! head-of-line frame cannot complete. Completed frames are handed to a
//! [`worker::DecodeWorker`] that decodes, optionally displays, and
//! optionally persists them as YUV4MPEG2 off the network path.

/// Partial-frame reassembly entity.
pub mod frame;
/// Fragment-to-frame reassembly with key-frame resync.
pub mod reassembler;
/// Decode/display worker thread and frame-timing log.
pub mod worker;
/// YUV4MPEG2 file writer.
pub mod y4m;

pub use frame::Frame;
pub use reassembler::{CompletedFrame, Reassembler};
pub use worker::{DecodeWorker, FrameTimingLog, LazyLevel};
pub use y4m::Y4mWriter;
