use std::{
    io,
    net::UdpSocket,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use framewarp_core::{
    config::{Config, StreamParams},
    error::Result,
    frame::RawFrame,
};
use framewarp_protocol::{message::WireMsg, MessageDecoder, MessageEncoder};
use framewarp_receiver::{
    worker::{DecodeWorker, FrameTimingLog},
    Reassembler,
};
use framewarp_sender::SenderTransport;
use tracing::{debug, info, trace, warn};

use crate::{
    time::{Clock, SystemClock},
    timer::PeriodicTimer,
    ring::RingConsumer,
};

/// Sender main loop: a single-threaded cooperative poll-and-dispatch loop.
///
/// Four sources are multiplexed and dispatched exhaustively each iteration:
/// the fps timer (frame intake and compression), socket-writable interest
/// (draining the transport FIFO), socket-readable (ACK intake), and the
/// stats timer. No handler is re-entered; the capture thread communicates
/// only through the frame ring.
pub struct SenderSession {
    socket: UdpSocket,
    transport: SenderTransport,
    frames: RingConsumer,
    params: StreamParams,
    config: Config,
    clock: Arc<dyn Clock>,
    /// Reusable raw frame the ring copies into.
    raw_img: RawFrame,
    encode_buf: Vec<u8>,
    recv_buf: Vec<u8>,
    /// Writable-interest flag: set while the FIFO holds fragments.
    writable: bool,
}

impl SenderSession {
    /// Creates a session over a connected, non-blocking socket.
    pub fn new(
        socket: UdpSocket,
        transport: SenderTransport,
        frames: RingConsumer,
        params: StreamParams,
        config: Config,
    ) -> SenderSession {
        Self::with_clock(socket, transport, frames, params, config, Arc::new(SystemClock))
    }

    /// Creates a session with a custom clock for testing.
    pub fn with_clock(
        socket: UdpSocket,
        transport: SenderTransport,
        frames: RingConsumer,
        params: StreamParams,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> SenderSession {
        let raw_img = RawFrame::new(params.width, params.height);
        SenderSession {
            socket,
            transport,
            frames,
            params,
            config,
            clock,
            raw_img,
            encode_buf: Vec::new(),
            recv_buf: vec![0u8; 2048],
            writable: false,
        }
    }

    /// Runs the loop until `shutdown` is raised or a fatal error occurs.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        let now = self.clock.now();
        let frame_interval = Duration::from_secs(1) / self.params.fps.max(1) as u32;
        let mut fps_timer = PeriodicTimer::new(frame_interval, now);
        let mut stats_timer = PeriodicTimer::new(self.config.stats_interval, now);

        info!(
            width = self.params.width,
            height = self.params.height,
            fps = self.params.fps,
            "sender session started"
        );

        while !shutdown.load(Ordering::Relaxed) {
            let now = self.clock.now();

            let expirations = fps_timer.expirations(now);
            if expirations > 0 {
                self.on_frame_tick(expirations, frame_interval)?;
            }

            if self.writable {
                self.on_writable()?;
            }

            self.on_readable()?;

            if stats_timer.expirations(now) > 0 {
                self.transport.output_periodic_stats(self.clock.now());
            }

            // Sleep until the nearest timer deadline, capped to the polling
            // granularity so socket readiness is observed promptly.
            let now = self.clock.now();
            let next_deadline = fps_timer.next_deadline().min(stats_timer.next_deadline());
            let sleep_for = next_deadline
                .saturating_duration_since(now)
                .min(self.config.poll_granularity);
            if !sleep_for.is_zero() {
                thread::sleep(sleep_for);
            }
        }

        info!("sender session exiting");
        Ok(())
    }

    /// FPS-timer handler: drains the ring and compresses the newest frame.
    ///
    /// When the loop fell behind (`expirations > 1`), the older frames are
    /// consumed and discarded to stay real-time.
    fn on_frame_tick(&mut self, expirations: u32, frame_interval: Duration) -> Result<()> {
        if expirations > 1 {
            warn!(skipped = expirations - 1, "loop fell behind, skipping raw frames");
        }

        let taken = self.frames.take_latest(expirations, frame_interval, self.raw_img.data_mut());
        if taken == 0 {
            // Capture has produced nothing in a full frame interval.
            return Ok(());
        }

        self.transport.compress_frame(&self.raw_img)?;

        if self.transport.has_pending() {
            self.writable = true;
        }
        Ok(())
    }

    /// Writable handler: drains the transport FIFO onto the socket.
    ///
    /// Each fragment's send timestamp is stamped immediately before
    /// transmission. A would-block puts the fragment back at the head and
    /// keeps writable interest armed; an empty FIFO disarms it.
    fn on_writable(&mut self) -> Result<()> {
        while let Some(mut datagram) = self.transport.pop_pending() {
            datagram.send_ts = self.transport.timestamp_us(self.clock.now());

            self.encode_buf.clear();
            MessageEncoder::encode_datagram_into(&mut self.encode_buf, &datagram)?;

            match self.socket.send(&self.encode_buf) {
                Ok(_) => {
                    trace!(
                        frame_id = datagram.frame_id,
                        frag_id = datagram.frag_id,
                        frag_cnt = datagram.frag_cnt,
                        rtx = datagram.rtx,
                        "sent datagram"
                    );
                    self.transport.record_sent(&datagram);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.transport.requeue_front(datagram);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.transport.requeue_front(datagram);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.writable = false;
        Ok(())
    }

    /// Readable handler: drains pending datagrams and processes ACKs.
    ///
    /// Undecodable records are logged and dropped; non-ACK records are
    /// ignored. Retransmissions queued by ACK handling re-arm writable
    /// interest.
    fn on_readable(&mut self) -> Result<()> {
        loop {
            match self.socket.recv(&mut self.recv_buf) {
                Ok(len) => match MessageDecoder::decode(&self.recv_buf[..len]) {
                    Ok(WireMsg::Ack(ack)) => {
                        trace!(frame_id = ack.frame_id, frag_id = ack.frag_id, "received ack");
                        self.transport.handle_ack(&ack, self.clock.now());
                    }
                    Ok(WireMsg::Config(config)) => {
                        // Late config updates only carry a new bitrate hint.
                        info!(bitrate = config.target_bitrate, "received config update");
                        self.transport.set_target_bitrate(config.target_bitrate);
                    }
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "dropping undecodable datagram"),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if self.transport.has_pending() {
            self.writable = true;
        }
        Ok(())
    }

    /// Returns the number of capture frames dropped at the ring.
    pub fn ring_drops(&self) -> u64 {
        self.frames.dropped()
    }
}

/// Receiver main loop: bounded-blocking receive, ACK, reassemble, consume.
///
/// Decoding and rendering happen on the worker thread; this loop only
/// touches the network and the reassembler.
pub struct ReceiverSession {
    socket: UdpSocket,
    reassembler: Reassembler,
    worker: Option<DecodeWorker>,
    /// Frame-timing log written on this thread when no worker exists.
    timing_log: Option<FrameTimingLog>,
    clock: Arc<dyn Clock>,
    recv_buf: Vec<u8>,
    ack_buf: Vec<u8>,
}

impl ReceiverSession {
    /// Creates a session over a connected socket; installs a read timeout
    /// so the shutdown flag is observed between datagrams.
    pub fn new(
        socket: UdpSocket,
        config: &Config,
        worker: Option<DecodeWorker>,
        timing_log: Option<FrameTimingLog>,
    ) -> Result<ReceiverSession> {
        socket.set_read_timeout(Some(config.recv_timeout))?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(ReceiverSession {
            socket,
            reassembler: Reassembler::new(clock.now()),
            worker,
            timing_log,
            clock,
            recv_buf: vec![0u8; 2048],
            ack_buf: Vec::new(),
        })
    }

    /// Runs the loop until `shutdown` is raised or a fatal error occurs.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        info!("receiver session started");

        while !shutdown.load(Ordering::Relaxed) {
            match self.socket.recv(&mut self.recv_buf) {
                Ok(len) => self.on_datagram(len)?,
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut
                        || e.kind() == io::ErrorKind::Interrupted =>
                {
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("receiver session exiting");
        Ok(())
    }

    /// Joins the worker thread, surfacing a fatal codec error if it had one.
    pub fn finish(self) -> Result<()> {
        match self.worker {
            Some(worker) => worker.join(),
            None => Ok(()),
        }
    }

    fn on_datagram(&mut self, len: usize) -> Result<()> {
        let datagram = match MessageDecoder::decode(&self.recv_buf[..len]) {
            Ok(WireMsg::Data(datagram)) => datagram,
            Ok(_) => return Ok(()), // ignore stray config/ack records
            Err(e) => {
                debug!(error = %e, "dropping undecodable datagram");
                return Ok(());
            }
        };

        // Acknowledge every parsed fragment, duplicates included; duplicate
        // ACKs are cheap and the sender handles them idempotently.
        let ack = framewarp_protocol::message::AckMsg::for_datagram(&datagram);
        self.ack_buf.clear();
        MessageEncoder::encode_ack_into(&mut self.ack_buf, &ack)?;
        match self.socket.send(&self.ack_buf) {
            Ok(_) => {
                trace!(frame_id = datagram.frame_id, frag_id = datagram.frag_id, "acked datagram");
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                trace!("ack dropped, socket busy");
            }
            Err(e) => return Err(e.into()),
        }

        self.reassembler.add_datagram(datagram);

        while self.reassembler.next_frame_complete() {
            let Some(completed) = self.reassembler.consume_next_frame(self.clock.now()) else {
                break;
            };

            if let Some(worker) = &self.worker {
                if !worker.submit(completed) {
                    // Worker exited (fatal decode error raises shutdown).
                    break;
                }
            } else if let Some(mut log) = self.timing_log.take() {
                match log.record(completed.id, completed.payload.len()) {
                    Ok(()) => self.timing_log = Some(log),
                    Err(e) => warn!(error = %e, "frame-timing log failed, disabling"),
                }
            }
        }

        Ok(())
    }

    /// Returns the identifier the receiver is waiting to emit.
    pub fn next_frame(&self) -> u32 {
        self.reassembler.next_frame()
    }
}
