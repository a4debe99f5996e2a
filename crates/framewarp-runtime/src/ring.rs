use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Condvar, Mutex,
};
use std::time::Duration;

/// One ring slot: a pre-allocated frame buffer behind its own mutex.
struct Slot {
    state: Mutex<SlotBuf>,
}

struct SlotBuf {
    data: Box<[u8]>,
    size: usize,
    ready: bool,
}

struct RingShared {
    slots: Box<[Slot]>,
    /// Count of ready frames; pairs with `available` for consumer waits.
    ready_count: Mutex<usize>,
    available: Condvar,
    /// Producer attempts that found the head slot still occupied.
    dropped: AtomicU64,
}

/// Bounded single-producer/single-consumer ring of raw frames.
///
/// Each slot owns a buffer sized for one frame for the lifetime of the
/// ring. The producer endpoint is the only writer of the head index and the
/// consumer endpoint the only writer of the tail, so slot access is
/// exclusive by construction; the per-slot mutex orders the hand-off of a
/// slot's contents between the two threads.
pub struct FrameRing;

impl FrameRing {
    /// Allocates a ring of `slots` buffers of `frame_size` bytes and splits
    /// it into its two endpoints.
    pub fn with_capacity(slots: usize, frame_size: usize) -> (RingProducer, RingConsumer) {
        assert!(slots >= 2, "ring needs at least two slots");

        let slots: Box<[Slot]> = (0..slots)
            .map(|_| Slot {
                state: Mutex::new(SlotBuf {
                    data: vec![0u8; frame_size].into_boxed_slice(),
                    size: 0,
                    ready: false,
                }),
            })
            .collect();

        let shared = Arc::new(RingShared {
            slots,
            ready_count: Mutex::new(0),
            available: Condvar::new(),
            dropped: AtomicU64::new(0),
        });

        (
            RingProducer { shared: shared.clone(), head: 0 },
            RingConsumer { shared, tail: 0 },
        )
    }
}

/// Capture-side endpoint; sole writer of the head index.
pub struct RingProducer {
    shared: Arc<RingShared>,
    head: usize,
}

impl RingProducer {
    /// Copies one frame into the head slot and signals the consumer.
    ///
    /// When the head slot is still occupied the frame is dropped rather
    /// than blocking: real-time capture must not fall behind. Returns
    /// whether the frame entered the ring.
    pub fn push(&mut self, frame: &[u8]) -> bool {
        let slot = &self.shared.slots[self.head];
        {
            let mut buf = slot.state.lock().expect("ring slot mutex poisoned");
            if buf.ready {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            if frame.len() > buf.data.len() {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }

            buf.data[..frame.len()].copy_from_slice(frame);
            buf.size = frame.len();
            buf.ready = true;
        }

        self.head = (self.head + 1) % self.shared.slots.len();

        let mut ready = self.shared.ready_count.lock().expect("ring mutex poisoned");
        *ready += 1;
        self.shared.available.notify_one();
        true
    }

    /// Returns the number of frames dropped at the producer.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Loop-side endpoint; sole writer of the tail index.
pub struct RingConsumer {
    shared: Arc<RingShared>,
    tail: usize,
}

impl RingConsumer {
    /// Takes up to `max` ready frames, keeping only the newest.
    ///
    /// Waits on the ring condition variable for at most `timeout` when no
    /// frame is ready. The newest taken frame is copied into `out` (which
    /// must hold one frame); older ones are discarded to stay real-time.
    /// Returns the number of frames taken, 0 if none arrived in time.
    pub fn take_latest(&mut self, max: u32, timeout: Duration, out: &mut [u8]) -> u32 {
        {
            let ready = self.shared.ready_count.lock().expect("ring mutex poisoned");
            let (ready, _) = self
                .shared
                .available
                .wait_timeout_while(ready, timeout, |count| *count == 0)
                .expect("ring mutex poisoned");
            if *ready == 0 {
                return 0;
            }
        }

        let mut taken = 0u32;
        while taken < max {
            let slot = &self.shared.slots[self.tail];
            {
                let mut buf = slot.state.lock().expect("ring slot mutex poisoned");
                if !buf.ready {
                    break;
                }
                let copy_len = buf.size.min(out.len());
                out[..copy_len].copy_from_slice(&buf.data[..copy_len]);
                buf.ready = false;
                buf.size = 0;
            }

            self.tail = (self.tail + 1) % self.shared.slots.len();
            taken += 1;

            let mut ready = self.shared.ready_count.lock().expect("ring mutex poisoned");
            *ready -= 1;
        }

        taken
    }

    /// Returns the number of frames dropped at the producer.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Instant};

    use super::*;

    const FRAME: usize = 64;

    fn frame_of(byte: u8) -> Vec<u8> {
        vec![byte; FRAME]
    }

    #[test]
    fn test_push_then_take() {
        let (mut producer, mut consumer) = FrameRing::with_capacity(4, FRAME);
        assert!(producer.push(&frame_of(7)));

        let mut out = vec![0u8; FRAME];
        let taken = consumer.take_latest(1, Duration::from_millis(10), &mut out);
        assert_eq!(taken, 1);
        assert_eq!(out, frame_of(7));
    }

    #[test]
    fn test_take_latest_keeps_newest_of_k() {
        let (mut producer, mut consumer) = FrameRing::with_capacity(8, FRAME);
        for byte in 1..=3 {
            assert!(producer.push(&frame_of(byte)));
        }

        let mut out = vec![0u8; FRAME];
        let taken = consumer.take_latest(3, Duration::from_millis(10), &mut out);
        assert_eq!(taken, 3);
        assert_eq!(out, frame_of(3));

        // Ring is empty again.
        assert_eq!(consumer.take_latest(1, Duration::from_millis(1), &mut out), 0);
    }

    #[test]
    fn test_take_latest_bounded_by_max() {
        let (mut producer, mut consumer) = FrameRing::with_capacity(8, FRAME);
        for byte in 1..=5 {
            assert!(producer.push(&frame_of(byte)));
        }

        let mut out = vec![0u8; FRAME];
        assert_eq!(consumer.take_latest(2, Duration::from_millis(10), &mut out), 2);
        assert_eq!(out, frame_of(2));
        assert_eq!(consumer.take_latest(5, Duration::from_millis(10), &mut out), 3);
        assert_eq!(out, frame_of(5));
    }

    #[test]
    fn test_overflow_drops_newest_and_counts() {
        let (mut producer, consumer) = FrameRing::with_capacity(2, FRAME);
        assert!(producer.push(&frame_of(1)));
        assert!(producer.push(&frame_of(2)));

        // Both slots occupied: further pushes are dropped.
        assert!(!producer.push(&frame_of(3)));
        assert!(!producer.push(&frame_of(4)));
        assert_eq!(producer.dropped(), 2);
        assert_eq!(consumer.dropped(), 2);
    }

    #[test]
    fn test_empty_ring_times_out() {
        let (_producer, mut consumer) = FrameRing::with_capacity(2, FRAME);
        let mut out = vec![0u8; FRAME];

        let start = Instant::now();
        assert_eq!(consumer.take_latest(1, Duration::from_millis(20), &mut out), 0);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_producer_overrun_yields_gapped_monotonic_frames() {
        // Producer writes faster than the consumer drains with a tiny ring:
        // the consumer must observe strictly increasing frame contents and
        // every overflow must show up in the drop counter.
        let (mut producer, mut consumer) = FrameRing::with_capacity(4, FRAME);
        const TOTAL: u64 = 200;

        let handle = thread::spawn(move || {
            let mut accepted = 0u64;
            for i in 0..TOTAL {
                let mut frame = vec![0u8; FRAME];
                frame[..8].copy_from_slice(&i.to_be_bytes());
                if producer.push(&frame) {
                    accepted += 1;
                }
                thread::sleep(Duration::from_micros(100));
            }
            (accepted, producer.dropped())
        });

        let mut out = vec![0u8; FRAME];
        let mut seen: Vec<u64> = Vec::new();
        let take = |consumer: &mut RingConsumer, seen: &mut Vec<u64>, out: &mut Vec<u8>| {
            if consumer.take_latest(1, Duration::from_millis(5), out) == 1 {
                let mut id = [0u8; 8];
                id.copy_from_slice(&out[..8]);
                seen.push(u64::from_be_bytes(id));
            }
        };

        // Slow consumer while the producer is running.
        while !handle.is_finished() {
            take(&mut consumer, &mut seen, &mut out);
            thread::sleep(Duration::from_micros(300));
        }
        let (accepted, dropped) = handle.join().expect("producer thread panicked");

        // Drain whatever is still buffered.
        loop {
            let before = seen.len();
            take(&mut consumer, &mut seen, &mut out);
            if seen.len() == before {
                break;
            }
        }

        // Monotonic (gaps allowed), and accounting adds up.
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "consumer saw reordered frames");
        assert_eq!(accepted + dropped, TOTAL);
        assert_eq!(seen.len() as u64, accepted, "every accepted frame is consumed exactly once");
    }
}
