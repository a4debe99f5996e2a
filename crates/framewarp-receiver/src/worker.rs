use std::{
    convert::TryFrom,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use framewarp_core::{
    codec::{FrameSink, VideoDecoder},
    error::{ErrorKind, Result},
};
use tracing::{debug, error, info, warn};

use crate::{reassembler::CompletedFrame, y4m::Y4mWriter};

/// How much work to do with each consumable frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub enum LazyLevel {
    /// Decode and display frames.
    DecodeDisplay = 0,
    /// Decode but do not display frames.
    DecodeOnly = 1,
    /// Neither decode nor display frames.
    NoDecodeDisplay = 2,
}

impl TryFrom<u8> for LazyLevel {
    type Error = ErrorKind;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(LazyLevel::DecodeDisplay),
            1 => Ok(LazyLevel::DecodeOnly),
            2 => Ok(LazyLevel::NoDecodeDisplay),
            _ => Err(ErrorKind::ConfigError(format!("invalid lazy level: {}", value))),
        }
    }
}

/// Optional CSV log of `frame_id,frame_size,timestamp_us` per frame.
pub struct FrameTimingLog {
    out: BufWriter<File>,
    epoch: Instant,
}

impl FrameTimingLog {
    /// Creates the log file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<FrameTimingLog> {
        let file = File::create(path)?;
        Ok(FrameTimingLog { out: BufWriter::new(file), epoch: Instant::now() })
    }

    /// Appends one record for a decodable frame.
    pub fn record(&mut self, frame_id: u32, frame_size: usize) -> Result<()> {
        let timestamp_us = self.epoch.elapsed().as_micros() as u64;
        writeln!(self.out, "{},{},{}", frame_id, frame_size, timestamp_us)?;
        Ok(())
    }
}

impl Drop for FrameTimingLog {
    fn drop(&mut self) {
        let _ = self.out.flush();
    }
}

/// How long the worker blocks on its queue before re-checking shutdown.
const QUEUE_POLL: Duration = Duration::from_millis(200);

/// Decode-and-display worker running off the network path.
///
/// Completed frames arrive over a channel; the worker drains everything
/// available into a local batch before decoding so the network thread is
/// never blocked behind a slow decode.
pub struct DecodeWorker {
    queue: Sender<CompletedFrame>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl DecodeWorker {
    /// Spawns the worker thread.
    ///
    /// `display` is consulted only when `lazy` is [`LazyLevel::DecodeDisplay`].
    /// A codec failure is fatal: the worker raises `shutdown` and exits with
    /// the error. A failing Y4M write also raises `shutdown` (disk full is
    /// treated like SIGINT) but is not an error.
    pub fn spawn(
        mut decoder: Box<dyn VideoDecoder>,
        lazy: LazyLevel,
        mut display: Option<Box<dyn FrameSink>>,
        mut y4m: Option<Y4mWriter>,
        mut timing_log: Option<FrameTimingLog>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<DecodeWorker> {
        let (queue, receiver) = unbounded::<CompletedFrame>();

        if lazy != LazyLevel::DecodeDisplay {
            display = None;
        }

        let handle = thread::Builder::new()
            .name("decode-worker".to_string())
            .spawn(move || -> Result<()> {
                debug!("decode worker started");
                let mut local_queue: Vec<CompletedFrame> = Vec::new();

                'outer: loop {
                    match receiver.recv_timeout(QUEUE_POLL) {
                        Ok(frame) => {
                            // Drain the shared queue quickly, then decode
                            // from the local batch.
                            local_queue.push(frame);
                            while let Ok(more) = receiver.try_recv() {
                                local_queue.push(more);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if shutdown.load(Ordering::Relaxed) {
                                break;
                            }
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    for frame in local_queue.drain(..) {
                        if shutdown.load(Ordering::Relaxed) {
                            break 'outer;
                        }

                        let raw = match decoder.decode(&frame.payload) {
                            Ok(raw) => raw,
                            Err(e) => {
                                error!(frame_id = frame.id, error = %e, "decode failed");
                                shutdown.store(true, Ordering::Relaxed);
                                return Err(e);
                            }
                        };

                        if let Some(mut log) = timing_log.take() {
                            match log.record(frame.id, frame.payload.len()) {
                                Ok(()) => timing_log = Some(log),
                                Err(e) => warn!(error = %e, "frame-timing log failed, disabling"),
                            }
                        }

                        if let Some(writer) = y4m.as_mut() {
                            if let Err(e) = writer.write_frame(&raw) {
                                // Disk full or I/O failure: stop the session
                                // gracefully, like SIGINT.
                                warn!(error = %e, "output write failed, shutting down");
                                shutdown.store(true, Ordering::Relaxed);
                                break 'outer;
                            }
                        }

                        if let Some(mut sink) = display.take() {
                            match sink.show(&raw) {
                                Ok(()) => display = Some(sink),
                                Err(e) => warn!(error = %e, "display failed, disabling"),
                            }
                        }
                    }
                }

                info!("decode worker exiting");
                Ok(())
            })?;

        Ok(DecodeWorker { queue, handle: Some(handle) })
    }

    /// Queues one completed frame; returns false if the worker is gone.
    pub fn submit(&self, frame: CompletedFrame) -> bool {
        self.queue.send(frame).is_ok()
    }

    /// Waits for the worker to exit and returns its result.
    pub fn join(mut self) -> Result<()> {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        // Dropping the sender disconnects the queue, letting the worker
        // finish its backlog and exit.
        drop(self);

        match handle.join() {
            Ok(result) => result,
            Err(_) => Err(ErrorKind::CodecError("decode worker panicked".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use framewarp_core::{
        codec::PassthroughCodec,
        frame::{FrameType, RawFrame},
    };

    use super::*;

    /// Sink that counts the frames it is shown.
    struct CountingSink {
        shown: Arc<Mutex<u32>>,
    }

    impl FrameSink for CountingSink {
        fn show(&mut self, _frame: &RawFrame) -> Result<()> {
            *self.shown.lock().expect("sink counter poisoned") += 1;
            Ok(())
        }
    }

    fn completed(id: u32, width: u16, height: u16) -> CompletedFrame {
        CompletedFrame {
            id,
            frame_type: FrameType::Key,
            payload: RawFrame::new(width, height).data().to_vec(),
        }
    }

    #[test]
    fn test_worker_decodes_and_displays_each_frame() {
        let shown = Arc::new(Mutex::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = DecodeWorker::spawn(
            Box::new(PassthroughCodec::new(16, 16)),
            LazyLevel::DecodeDisplay,
            Some(Box::new(CountingSink { shown: shown.clone() })),
            None,
            None,
            shutdown,
        )
        .unwrap();

        for id in 0..5 {
            assert!(worker.submit(completed(id, 16, 16)));
        }
        worker.join().unwrap();
        assert_eq!(*shown.lock().unwrap(), 5);
    }

    #[test]
    fn test_decode_only_skips_display() {
        let shown = Arc::new(Mutex::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = DecodeWorker::spawn(
            Box::new(PassthroughCodec::new(16, 16)),
            LazyLevel::DecodeOnly,
            Some(Box::new(CountingSink { shown: shown.clone() })),
            None,
            None,
            shutdown,
        )
        .unwrap();

        worker.submit(completed(0, 16, 16));
        worker.join().unwrap();
        assert_eq!(*shown.lock().unwrap(), 0);
    }

    #[test]
    fn test_codec_error_is_fatal_and_raises_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = DecodeWorker::spawn(
            Box::new(PassthroughCodec::new(16, 16)),
            LazyLevel::DecodeOnly,
            None,
            None,
            None,
            shutdown.clone(),
        )
        .unwrap();

        // Payload of the wrong size cannot decode.
        worker.submit(CompletedFrame {
            id: 0,
            frame_type: FrameType::Key,
            payload: vec![0; 3],
        });

        assert!(worker.join().is_err());
        assert!(shutdown.load(Ordering::Relaxed));
    }

    #[test]
    fn test_lazy_level_parsing() {
        assert_eq!(LazyLevel::try_from(0).unwrap(), LazyLevel::DecodeDisplay);
        assert_eq!(LazyLevel::try_from(1).unwrap(), LazyLevel::DecodeOnly);
        assert_eq!(LazyLevel::try_from(2).unwrap(), LazyLevel::NoDecodeDisplay);
        assert!(LazyLevel::try_from(3).is_err());
    }
}
