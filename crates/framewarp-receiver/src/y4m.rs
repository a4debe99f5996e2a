use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use framewarp_core::{
    error::{ErrorKind, Result},
    frame::RawFrame,
};

/// Buffer size for the output stream; plane writes are large and sequential.
const WRITER_BUF_SIZE: usize = 8 * 1024 * 1024;

/// Writes decoded frames to a YUV4MPEG2 file.
///
/// The stream header is
/// `YUV4MPEG2 W<w> H<h> F<fps>:1 Ip A128:117\n` followed by one `FRAME\n`
/// record per frame with the Y, U, and V planes row-major.
pub struct Y4mWriter {
    out: BufWriter<File>,
    width: u16,
    height: u16,
}

impl Y4mWriter {
    /// Creates the file and writes the stream header.
    pub fn create<P: AsRef<Path>>(path: P, width: u16, height: u16, fps: u16) -> Result<Y4mWriter> {
        let file = File::create(path)?;
        let mut out = BufWriter::with_capacity(WRITER_BUF_SIZE, file);
        write!(out, "YUV4MPEG2 W{} H{} F{}:1 Ip A128:117\n", width, height, fps)?;
        Ok(Y4mWriter { out, width, height })
    }

    /// Appends one frame record.
    pub fn write_frame(&mut self, frame: &RawFrame) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(ErrorKind::CodecError(format!(
                "frame is {}x{} but the stream was opened as {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        self.out.write_all(b"FRAME\n")?;
        self.out.write_all(frame.y_plane())?;
        self.out.write_all(frame.u_plane())?;
        self.out.write_all(frame.v_plane())?;
        Ok(())
    }

    /// Flushes buffered frame data to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for Y4mWriter {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}
