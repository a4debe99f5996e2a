#![warn(missing_docs)]

//! framewarp-runtime: threads, sockets, and the cooperative event loop.
//!
//! This crate owns everything that touches the operating system: the bounded
//! frame ring between the capture thread and the sender loop, the capture
//! thread itself, UDP socket setup, the control handshake, and the
//! [`session::SenderSession`] / [`session::ReceiverSession`] loops that
//! drive the transport crates.

/// Capture thread and raw-frame sources.
pub mod capture;
/// Control handshake over UDP.
pub mod handshake;
/// Bounded SPSC ring of raw frames between capture and sender.
pub mod ring;
/// Sender and receiver session loops.
pub mod session;
/// UDP socket setup helpers.
pub mod socket;
/// Periodic timers for the event loop.
pub mod timer;
/// Abstraction over a time source to improve testability.
pub mod time;

pub use capture::{capture_loop, FrameSource, TestPatternSource};
pub use ring::{FrameRing, RingConsumer, RingProducer};
pub use session::{ReceiverSession, SenderSession};
pub use time::{Clock, SystemClock};
pub use timer::PeriodicTimer;
