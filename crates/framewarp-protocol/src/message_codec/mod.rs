//! Binary wire codec for telemetry messages.
//!
//! Layout is big-endian with fixed-width fields and the payload as a raw
//! byte run. Decoding failures never terminate the loop; callers log the
//! error and discard the datagram.

mod decoder;
mod encoder;


pub use decoder::MessageDecoder;
pub use encoder::MessageEncoder;
