use std::{
    collections::BTreeMap,
    time::{Duration, Instant},
};

use framewarp_core::frame::FrameType;
use framewarp_protocol::message::Datagram;
use tracing::{debug, info, warn};

use crate::frame::Frame;

/// A fully reassembled frame ready for decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFrame {
    /// Frame identifier.
    pub id: u32,
    /// Whether the frame is self-contained or predecessor-dependent.
    pub frame_type: FrameType,
    /// Concatenated fragment payloads in index order.
    pub payload: Vec<u8>,
}

/// Collects fragments into frames and advances a monotonic frontier.
///
/// `next_frame` is the identifier the receiver is waiting to emit. It never
/// decreases; once the frontier has passed a frame, late fragments for it
/// are dropped on arrival.
pub struct Reassembler {
    /// Frame id => reassembly entity, keys sparse but ordered.
    frame_buf: BTreeMap<u32, Frame>,
    /// Identifier of the next frame to emit.
    next_frame: u32,
    // Per-interval stats, flushed on consumption.
    num_decodable_frames: u64,
    total_decodable_bytes: u64,
    last_stats_at: Instant,
    stats_interval: Duration,
}

impl Reassembler {
    /// Creates an empty reassembler with its stats epoch at `now`.
    pub fn new(now: Instant) -> Reassembler {
        Reassembler {
            frame_buf: BTreeMap::new(),
            next_frame: 0,
            num_decodable_frames: 0,
            total_decodable_bytes: 0,
            last_stats_at: now,
            stats_interval: Duration::from_secs(1),
        }
    }

    /// Returns the identifier the receiver is waiting to emit.
    pub fn next_frame(&self) -> u32 {
        self.next_frame
    }

    /// Returns the number of frames currently under reassembly.
    pub fn buffered_frames(&self) -> usize {
        self.frame_buf.len()
    }

    /// Inserts one received fragment.
    ///
    /// Fragments of frames behind the frontier are dropped; the first
    /// fragment of a new frame creates its entity using the declared type
    /// and count.
    pub fn add_datagram(&mut self, datagram: Datagram) {
        if datagram.frame_id < self.next_frame {
            return;
        }

        if !self.frame_buf.contains_key(&datagram.frame_id) {
            match Frame::new(datagram.frame_id, datagram.frame_type, datagram.frag_cnt) {
                Ok(frame) => {
                    self.frame_buf.insert(datagram.frame_id, frame);
                }
                Err(e) => {
                    warn!(frame_id = datagram.frame_id, error = %e, "dropping fragment");
                    return;
                }
            }
        }

        if let Some(frame) = self.frame_buf.get_mut(&datagram.frame_id) {
            frame.insert_frag(datagram);
        }
    }

    /// Returns whether the frame at the frontier is consumable.
    ///
    /// When it is not, scans buffered frames from the highest identifier
    /// downward: a complete KEY frame ahead of the frontier lets the
    /// receiver skip forward, discarding everything older. DELTA frames are
    /// never skipped to; they would be undecodable without their
    /// predecessors.
    pub fn next_frame_complete(&mut self) -> bool {
        if let Some(frame) = self.frame_buf.get(&self.next_frame) {
            if frame.complete() {
                return true;
            }
        }

        let skip_to = self
            .frame_buf
            .iter()
            .rev()
            .take_while(|(&id, _)| id > self.next_frame)
            .find(|(_, frame)| frame.frame_type() == FrameType::Key && frame.complete())
            .map(|(&id, _)| id);

        if let Some(frame_id) = skip_to {
            let skipped = frame_id - self.next_frame;
            self.advance_next_frame(skipped);
            info!(skipped, key_frame = frame_id, "recovery: skipped ahead to complete key frame");
            return true;
        }

        false
    }

    /// Removes the frontier frame and returns its assembled payload.
    ///
    /// Callers must have observed `next_frame_complete()`; an incomplete
    /// frontier frame is put back and `None` returned.
    pub fn consume_next_frame(&mut self, now: Instant) -> Option<CompletedFrame> {
        let frame = self.frame_buf.remove(&self.next_frame)?;
        if !frame.complete() {
            debug!(frame_id = frame.id(), "frontier frame not complete yet");
            self.frame_buf.insert(self.next_frame, frame);
            return None;
        }

        let id = frame.id();
        let frame_type = frame.frame_type();
        let payload = frame.into_payload()?;

        self.num_decodable_frames += 1;
        self.total_decodable_bytes += payload.len() as u64;
        self.flush_stats(now);

        self.advance_next_frame(1);
        Some(CompletedFrame { id, frame_type, payload })
    }

    fn advance_next_frame(&mut self, n: u32) {
        self.next_frame += n;
        self.clean_up_to(self.next_frame);
    }

    /// Discards buffered state for every frame behind `frontier`.
    fn clean_up_to(&mut self, frontier: u32) {
        self.frame_buf = self.frame_buf.split_off(&frontier);
    }

    /// Emits decodable-frame counters for each whole interval that elapsed.
    fn flush_stats(&mut self, now: Instant) {
        while now >= self.last_stats_at + self.stats_interval {
            let interval_ms = self.stats_interval.as_secs_f64() * 1000.0;
            let kbps = self.total_decodable_bytes as f64 * 8.0 / interval_ms;
            info!(
                decodable = self.num_decodable_frames,
                bitrate_kbps = format!("{:.1}", kbps).as_str(),
                "receiver stats"
            );

            self.num_decodable_frames = 0;
            self.total_decodable_bytes = 0;
            self.last_stats_at += self.stats_interval;
        }
    }
}
