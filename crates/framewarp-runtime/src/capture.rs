use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use framewarp_core::{error::Result, frame::RawFrame};
use tracing::{debug, error, trace};

use crate::ring::RingProducer;

/// Raw-frame acquisition backend.
///
/// The OS camera subsystem is an external collaborator; this trait pins
/// down the contract the capture thread relies on: blocking delivery of one
/// YUV420P frame per call at the configured rate.
pub trait FrameSource: Send {
    /// Blocks until the next raw frame is available and writes it into
    /// `frame`.
    fn read_frame(&mut self, frame: &mut RawFrame) -> Result<()>;
}

/// Deterministic moving-gradient source, paced to the configured fps.
///
/// Stands in for a camera wherever none is attached: each frame shifts the
/// luma gradient by one step so consumers can observe frame progression.
pub struct TestPatternSource {
    fps: u16,
    frame_index: u64,
    next_frame_at: Instant,
}

impl TestPatternSource {
    /// Creates a pattern source producing `fps` frames per second.
    pub fn new(fps: u16) -> TestPatternSource {
        TestPatternSource {
            fps: fps.max(1),
            frame_index: 0,
            next_frame_at: Instant::now(),
        }
    }
}

impl FrameSource for TestPatternSource {
    fn read_frame(&mut self, frame: &mut RawFrame) -> Result<()> {
        // Pace to the frame interval like a real capture device.
        let now = Instant::now();
        if self.next_frame_at > now {
            thread::sleep(self.next_frame_at - now);
        }
        self.next_frame_at += Duration::from_secs(1) / self.fps as u32;

        let width = frame.width() as u64;
        let shift = self.frame_index;
        let y_len = frame.width() as usize * frame.height() as usize;
        let data = frame.data_mut();
        for (i, byte) in data[..y_len].iter_mut().enumerate() {
            *byte = ((i as u64 % width + shift) & 0xFF) as u8;
        }
        // Neutral chroma.
        for byte in data[y_len..].iter_mut() {
            *byte = 128;
        }

        self.frame_index += 1;
        Ok(())
    }
}

/// Capture thread body: acquires frames and pushes them into the ring.
///
/// Checks the shutdown flag between acquisitions. Ring overflow is not an
/// error here; the producer endpoint counts the drop and capture continues.
pub fn capture_loop(
    mut source: Box<dyn FrameSource>,
    width: u16,
    height: u16,
    mut producer: RingProducer,
    shutdown: Arc<AtomicBool>,
) {
    let mut frame = RawFrame::new(width, height);

    while !shutdown.load(Ordering::Relaxed) {
        if let Err(e) = source.read_frame(&mut frame) {
            error!(error = %e, "frame acquisition failed, stopping capture");
            break;
        }

        if !producer.push(frame.data()) {
            trace!(dropped = producer.dropped(), "frame ring full, dropped capture frame");
        }
    }

    debug!(dropped = producer.dropped(), "capture loop exiting");
}
