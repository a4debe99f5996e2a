use std::{fmt, io};

/// Wrapped result type with the crate-wide error kind.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Errors that can occur anywhere in the pipeline.
#[derive(Debug)]
pub enum ErrorKind {
    /// A wrapped I/O error from a socket, file, or thread primitive.
    IoError(io::Error),
    /// An inbound datagram could not be decoded.
    DecodingError(DecodingErrorKind),
    /// The encoder or decoder failed; this is fatal for the session.
    CodecError(String),
    /// Invalid configuration (tier table violation, malformed argument).
    ConfigError(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::IoError(e) => write!(f, "I/O error: {}", e),
            ErrorKind::DecodingError(e) => write!(f, "could not decode datagram: {}", e),
            ErrorKind::CodecError(msg) => write!(f, "codec error: {}", msg),
            ErrorKind::ConfigError(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ErrorKind::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ErrorKind {
    fn from(inner: io::Error) -> Self {
        ErrorKind::IoError(inner)
    }
}

/// Specific reasons an inbound datagram failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodingErrorKind {
    /// The leading type tag did not name a known record kind.
    MessageTag,
    /// The frame type byte was neither KEY nor DELTA.
    FrameType,
    /// Fragment index/count violated `frag_id < frag_cnt` or `frag_cnt >= 1`.
    FragmentBounds,
    /// The declared payload length was zero or exceeded the buffer.
    PayloadLength,
    /// The buffer ended before a fixed-width field could be read.
    UnexpectedEnd,
}

impl fmt::Display for DecodingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DecodingErrorKind::MessageTag => "unknown message tag",
            DecodingErrorKind::FrameType => "unknown frame type",
            DecodingErrorKind::FragmentBounds => "fragment index out of bounds",
            DecodingErrorKind::PayloadLength => "invalid payload length",
            DecodingErrorKind::UnexpectedEnd => "unexpected end of buffer",
        };
        write!(f, "{}", msg)
    }
}
