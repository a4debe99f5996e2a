use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use framewarp_core::{
    codec::VideoEncoder,
    config::Config,
    constants::DATA_HEADER_SIZE,
    error::{ErrorKind, Result},
    frame::RawFrame,
};
use framewarp_protocol::{message::{AckMsg, Datagram}, rtt::RttEstimator};
use tracing::{debug, info, warn};

/// Per-interval sender counters, reset on every stats flush.
#[derive(Debug, Default)]
struct SenderStats {
    frames_compressed: u64,
    frags_sent: u64,
    frags_rtx: u64,
    bytes_sent: u64,
}

impl SenderStats {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Sender-side transport: packetization, unacked tracking, retransmission.
///
/// All methods run on the event-loop thread; no locking is needed. Methods
/// that depend on time take `now` explicitly so tests can drive a synthetic
/// clock.
pub struct SenderTransport {
    encoder: Box<dyn VideoEncoder>,
    max_payload: usize,
    min_rto: Duration,
    live_window: u32,
    /// Identifier assigned to the next compressed frame.
    next_frame_id: u32,
    /// Fragments waiting for (re)transmission, FIFO.
    send_buf: VecDeque<Datagram>,
    /// In-flight fragments awaiting an ACK, keyed by (frame_id, frag_id).
    unacked: HashMap<(u32, u16), Datagram>,
    rtt: RttEstimator,
    /// Reference point for wire timestamps; 0 stays the "unsent" sentinel.
    epoch: Instant,
    stats: SenderStats,
    last_stats_at: Instant,
}

impl SenderTransport {
    /// Creates a transport around the given encoder.
    pub fn new(encoder: Box<dyn VideoEncoder>, config: &Config, now: Instant) -> SenderTransport {
        SenderTransport {
            encoder,
            max_payload: config.max_fragment_payload(),
            min_rto: config.min_rto,
            live_window: config.live_frame_window,
            next_frame_id: 0,
            send_buf: VecDeque::new(),
            unacked: HashMap::new(),
            rtt: RttEstimator::new(),
            epoch: now,
            stats: SenderStats::default(),
            last_stats_at: now,
        }
    }

    /// Returns microseconds since the transport epoch for wire timestamps.
    pub fn timestamp_us(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_micros() as u64
    }

    /// Forwards a bitrate hint to the encoder, effective on the next frame.
    pub fn set_target_bitrate(&mut self, kbps: u32) {
        self.encoder.set_target_bitrate(kbps);
    }

    /// Compresses one raw frame and appends its fragments to the FIFO.
    ///
    /// Fragments are created in index order with `rtx = 0` and an unset send
    /// timestamp; the writable handler stamps them just before transmission.
    pub fn compress_frame(&mut self, frame: &RawFrame) -> Result<()> {
        let (blob, frame_type) = self.encoder.compress(frame)?;
        if blob.is_empty() {
            return Err(ErrorKind::CodecError("encoder produced an empty frame".to_string()));
        }

        let frag_cnt = (blob.len() + self.max_payload - 1) / self.max_payload;
        if frag_cnt > u16::MAX as usize {
            warn!(
                size = blob.len(),
                frag_cnt, "compressed frame exceeds the fragment count limit, dropping"
            );
            return Ok(());
        }

        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;

        for (frag_id, chunk) in blob.chunks(self.max_payload).enumerate() {
            self.send_buf.push_back(Datagram {
                frame_id,
                frame_type,
                frag_id: frag_id as u16,
                frag_cnt: frag_cnt as u16,
                rtx: 0,
                send_ts: 0,
                payload: chunk.to_vec(),
            });
        }

        self.stats.frames_compressed += 1;
        debug!(frame_id, ?frame_type, frag_cnt, size = blob.len(), "compressed frame");
        Ok(())
    }

    /// Returns true while fragments are waiting for (re)transmission.
    pub fn has_pending(&self) -> bool {
        !self.send_buf.is_empty()
    }

    /// Takes the next fragment to transmit.
    pub fn pop_pending(&mut self) -> Option<Datagram> {
        self.send_buf.pop_front()
    }

    /// Puts a fragment back at the head of the FIFO after a would-block
    /// send; its send timestamp is cleared since it was never on the wire.
    pub fn requeue_front(&mut self, mut datagram: Datagram) {
        datagram.send_ts = 0;
        self.send_buf.push_front(datagram);
    }

    /// Records a successful transmission.
    ///
    /// First transmissions enter the unacked table; retransmissions refresh
    /// the existing entry's timestamp and retransmission count.
    pub fn record_sent(&mut self, datagram: &Datagram) {
        self.stats.frags_sent += 1;
        self.stats.bytes_sent += (DATA_HEADER_SIZE + datagram.payload.len()) as u64;

        if datagram.rtx == 0 {
            self.unacked.insert((datagram.frame_id, datagram.frag_id), datagram.clone());
        } else {
            self.stats.frags_rtx += 1;
            if let Some(entry) = self.unacked.get_mut(&(datagram.frame_id, datagram.frag_id)) {
                entry.send_ts = datagram.send_ts;
                entry.rtx = datagram.rtx;
            }
        }
    }

    /// Processes one acknowledgment.
    ///
    /// Unknown (duplicate or abandoned) ACKs are ignored. A matching ACK
    /// removes its entry, feeds the RTT estimator when it answers a first
    /// transmission, and then sweeps the table for timed-out fragments.
    pub fn handle_ack(&mut self, ack: &AckMsg, now: Instant) {
        let Some(entry) = self.unacked.remove(&(ack.frame_id, ack.frag_id)) else {
            return;
        };

        if entry.rtx == 0 && ack.send_ts != 0 {
            let now_us = self.timestamp_us(now);
            if now_us >= ack.send_ts {
                self.rtt.update(Duration::from_micros(now_us - ack.send_ts));
            }
        }

        self.retransmit_expired(now);
    }

    /// Re-queues every live fragment whose last transmission has aged past
    /// the RTO and abandons fragments of frames outside the live window.
    fn retransmit_expired(&mut self, now: Instant) {
        let oldest_live = self.next_frame_id.saturating_sub(self.live_window);
        let before = self.unacked.len();
        self.unacked.retain(|&(frame_id, _), _| frame_id >= oldest_live);
        let abandoned = before - self.unacked.len();
        if abandoned > 0 {
            debug!(abandoned, oldest_live, "abandoned unacked fragments of aged-out frames");
        }

        let rto = self.rtt.rto(self.min_rto);
        let rto_us = rto.as_micros() as u64;
        let now_us = self.timestamp_us(now);

        let expired: Vec<(u32, u16)> = self
            .unacked
            .iter()
            .filter(|(_, d)| d.send_ts != 0 && now_us.saturating_sub(d.send_ts) > rto_us)
            .map(|(key, _)| *key)
            .collect();

        for key in &expired {
            if let Some(entry) = self.unacked.get_mut(key) {
                entry.rtx += 1;
                // Provisional stamp: one more RTO must pass before the next
                // re-queue. The writable handler re-stamps on transmission.
                entry.send_ts = now_us;

                let mut clone = entry.clone();
                clone.send_ts = 0;
                self.send_buf.push_back(clone);
            }
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), ?rto, "queued retransmissions");
        }
    }

    /// Returns the current smoothed RTT, if any sample has been taken.
    pub fn smoothed_rtt(&self) -> Option<Duration> {
        self.rtt.smoothed_rtt()
    }

    /// Returns the number of in-flight fragments awaiting an ACK.
    pub fn unacked_len(&self) -> usize {
        self.unacked.len()
    }

    /// Returns the identifier the next compressed frame will receive.
    pub fn next_frame_id(&self) -> u32 {
        self.next_frame_id
    }

    /// Emits the per-interval counters and resets them.
    pub fn output_periodic_stats(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_stats_at);
        if elapsed.is_zero() {
            return;
        }

        let kbps = self.stats.bytes_sent as f64 * 8.0 / elapsed.as_secs_f64() / 1000.0;
        info!(
            frames = self.stats.frames_compressed,
            sent = self.stats.frags_sent,
            rtx = self.stats.frags_rtx,
            in_flight = self.unacked.len(),
            srtt_ms = self.rtt.smoothed_rtt().map(|d| d.as_secs_f64() * 1000.0),
            bitrate_kbps = format!("{:.1}", kbps).as_str(),
            "sender stats"
        );

        self.stats.reset();
        self.last_stats_at = now;
    }
}
