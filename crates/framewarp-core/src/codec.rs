//! Trait seams for the external video codec and renderer.
//!
//! The actual encoder/decoder (libvpx, hardware blocks, ...) and the preview
//! renderer are external collaborators; these traits pin down the contract
//! the pipeline relies on. `PassthroughCodec` is the built-in implementation
//! used by the binaries and tests: it stores raw planes verbatim with a
//! forced key-frame cadence, so the full transport path runs without vendor
//! bindings.

use crate::{
    error::{ErrorKind, Result},
    frame::{FrameType, RawFrame},
};

/// Compresses raw frames into opaque byte blobs.
pub trait VideoEncoder: Send {
    /// Compresses one raw frame. The encoder decides whether the output is a
    /// self-contained KEY frame or a predecessor-dependent DELTA frame.
    fn compress(&mut self, frame: &RawFrame) -> Result<(Vec<u8>, FrameType)>;

    /// Sets the target bitrate in kbps, effective on the next compressed
    /// frame.
    fn set_target_bitrate(&mut self, kbps: u32);
}

/// Decompresses byte blobs back into raw frames.
pub trait VideoDecoder: Send {
    /// Decodes one compressed blob into exactly one raw frame.
    fn decode(&mut self, data: &[u8]) -> Result<RawFrame>;
}

/// Consumes decoded frames for display.
pub trait FrameSink: Send {
    /// Presents one decoded frame.
    fn show(&mut self, frame: &RawFrame) -> Result<()>;
}

/// Discards every frame; stands in when no renderer is attached.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _frame: &RawFrame) -> Result<()> {
        Ok(())
    }
}

/// Key-frame cadence used when the bitrate gives no better hint.
const DEFAULT_KEY_INTERVAL: u32 = 30;

/// Identity codec: the compressed blob is the raw YUV420P buffer.
///
/// Emits a KEY frame every `key_interval` frames and DELTA frames otherwise,
/// mimicking the cadence a real encoder derives from its target bitrate.
#[derive(Debug)]
pub struct PassthroughCodec {
    width: u16,
    height: u16,
    key_interval: u32,
    frames_compressed: u32,
    target_bitrate: u32,
}

impl PassthroughCodec {
    /// Creates a passthrough codec for the given frame dimensions.
    pub fn new(width: u16, height: u16) -> PassthroughCodec {
        PassthroughCodec {
            width,
            height,
            key_interval: DEFAULT_KEY_INTERVAL,
            frames_compressed: 0,
            target_bitrate: 0,
        }
    }

    /// Overrides the forced key-frame cadence.
    pub fn with_key_interval(mut self, key_interval: u32) -> PassthroughCodec {
        self.key_interval = key_interval.max(1);
        self
    }

    /// Returns the most recently requested target bitrate in kbps.
    pub fn target_bitrate(&self) -> u32 {
        self.target_bitrate
    }
}

impl VideoEncoder for PassthroughCodec {
    fn compress(&mut self, frame: &RawFrame) -> Result<(Vec<u8>, FrameType)> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(ErrorKind::CodecError(format!(
                "encoder configured for {}x{} but got a {}x{} frame",
                self.width,
                self.height,
                frame.width(),
                frame.height()
            )));
        }

        let frame_type = if self.frames_compressed % self.key_interval == 0 {
            FrameType::Key
        } else {
            FrameType::Delta
        };
        self.frames_compressed += 1;

        Ok((frame.data().to_vec(), frame_type))
    }

    fn set_target_bitrate(&mut self, kbps: u32) {
        self.target_bitrate = kbps;
    }
}

impl VideoDecoder for PassthroughCodec {
    fn decode(&mut self, data: &[u8]) -> Result<RawFrame> {
        RawFrame::from_vec(self.width, self.height, data.to_vec())
    }
}
