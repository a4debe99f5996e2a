use std::convert::TryFrom;

use crate::error::{DecodingErrorKind, ErrorKind};

/// Id to identify how a compressed frame depends on its predecessors.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Self-contained frame; decodable without any predecessor.
    Key = 0,
    /// Depends on the previously decoded frame.
    Delta = 1,
}

impl FrameType {
    /// Converts the frame type to its wire byte.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FrameType {
    type Error = ErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FrameType::Key),
            1 => Ok(FrameType::Delta),
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::FrameType)),
        }
    }
}

/// An owned raw video frame in YUV420P layout.
///
/// The buffer holds the Y plane (width × height bytes) followed by the U and
/// V planes (width/2 × height/2 bytes each), tightly packed row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    width: u16,
    height: u16,
    data: Vec<u8>,
}

impl RawFrame {
    /// Returns the YUV420P buffer size for the given dimensions.
    pub fn frame_size(width: u16, height: u16) -> usize {
        width as usize * height as usize * 3 / 2
    }

    /// Creates a zeroed frame of the given dimensions.
    pub fn new(width: u16, height: u16) -> RawFrame {
        RawFrame { width, height, data: vec![0; Self::frame_size(width, height)] }
    }

    /// Wraps an existing buffer, validating its size against the dimensions.
    pub fn from_vec(width: u16, height: u16, data: Vec<u8>) -> crate::error::Result<RawFrame> {
        let expected = Self::frame_size(width, height);
        if data.len() != expected {
            return Err(ErrorKind::CodecError(format!(
                "raw frame size mismatch: got {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(RawFrame { width, height, data })
    }

    /// Returns the frame width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns the frame height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns the full packed YUV420P buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the full packed YUV420P buffer mutably.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn y_size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn chroma_size(&self) -> usize {
        self.y_size() / 4
    }

    /// Returns the luma plane.
    pub fn y_plane(&self) -> &[u8] {
        &self.data[..self.y_size()]
    }

    /// Returns the U chroma plane.
    pub fn u_plane(&self) -> &[u8] {
        let y = self.y_size();
        &self.data[y..y + self.chroma_size()]
    }

    /// Returns the V chroma plane.
    pub fn v_plane(&self) -> &[u8] {
        let start = self.y_size() + self.chroma_size();
        &self.data[start..start + self.chroma_size()]
    }
}
