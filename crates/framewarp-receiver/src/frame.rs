use framewarp_core::{
    error::{DecodingErrorKind, ErrorKind, Result},
    frame::FrameType,
};
use framewarp_protocol::message::Datagram;
use tracing::warn;

/// Receiver-side view of one video frame under reassembly.
///
/// Created lazily when the first fragment carrying its identifier arrives.
/// Slots are filled idempotently: duplicates are dropped, never overwritten,
/// so the accumulated size equals the sum of occupied payload sizes.
#[derive(Debug)]
pub struct Frame {
    id: u32,
    frame_type: FrameType,
    /// Fragment slots, sized by the declared fragment count.
    frags: Vec<Option<Datagram>>,
    /// Number of still-empty slots; the frame is complete at zero.
    null_frags: usize,
    /// Accumulated payload bytes across occupied slots.
    frame_size: usize,
}

impl Frame {
    /// Creates an empty frame with `frag_cnt` unoccupied slots.
    pub fn new(frame_id: u32, frame_type: FrameType, frag_cnt: u16) -> Result<Frame> {
        if frag_cnt == 0 {
            return Err(ErrorKind::DecodingError(DecodingErrorKind::FragmentBounds));
        }
        let mut frags = Vec::new();
        frags.resize_with(frag_cnt as usize, || None);
        Ok(Frame { id: frame_id, frame_type, frags, null_frags: frag_cnt as usize, frame_size: 0 })
    }

    /// Returns the frame identifier.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns the frame type shared by all fragments.
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// Returns whether the slot for `frag_id` is occupied.
    pub fn has_frag(&self, frag_id: u16) -> bool {
        self.frags.get(frag_id as usize).map_or(false, Option::is_some)
    }

    /// Returns the number of still-empty fragment slots.
    pub fn null_frags(&self) -> usize {
        self.null_frags
    }

    /// Returns whether every fragment has arrived.
    pub fn complete(&self) -> bool {
        self.null_frags == 0
    }

    /// Returns the accumulated byte size once the frame is complete.
    pub fn frame_size(&self) -> Option<usize> {
        if self.complete() {
            Some(self.frame_size)
        } else {
            None
        }
    }

    fn accepts(&self, datagram: &Datagram) -> bool {
        datagram.frame_id == self.id
            && datagram.frame_type == self.frame_type
            && (datagram.frag_id as usize) < self.frags.len()
            && datagram.frag_cnt as usize == self.frags.len()
    }

    /// Inserts a fragment into its slot.
    ///
    /// Fragments disagreeing with this frame's identity, type, or count are
    /// logged and dropped without mutating the entity. Duplicates of an
    /// occupied slot are silently dropped.
    pub fn insert_frag(&mut self, datagram: Datagram) {
        if !self.accepts(&datagram) {
            warn!(
                frame_id = self.id,
                frag_id = datagram.frag_id,
                frag_cnt = datagram.frag_cnt,
                expected_cnt = self.frags.len(),
                "dropping fragment incompatible with its frame"
            );
            return;
        }

        let slot = &mut self.frags[datagram.frag_id as usize];
        if slot.is_none() {
            self.frame_size += datagram.payload.len();
            self.null_frags -= 1;
            *slot = Some(datagram);
        }
    }

    /// Concatenates the fragment payloads in index order.
    ///
    /// Returns `None` unless the frame is complete.
    pub fn into_payload(self) -> Option<Vec<u8>> {
        if !self.complete() {
            return None;
        }

        let mut payload = Vec::with_capacity(self.frame_size);
        for frag in self.frags.into_iter().flatten() {
            payload.extend_from_slice(&frag.payload);
        }
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frag(frame_id: u32, frag_id: u16, frag_cnt: u16, payload: Vec<u8>) -> Datagram {
        Datagram {
            frame_id,
            frame_type: FrameType::Key,
            frag_id,
            frag_cnt,
            rtx: 0,
            send_ts: 0,
            payload,
        }
    }

    #[test]
    fn test_new_frame_is_incomplete() {
        let frame = Frame::new(0, FrameType::Key, 3).unwrap();
        assert!(!frame.complete());
        assert_eq!(frame.null_frags(), 3);
        assert_eq!(frame.frame_size(), None);
    }

    #[test]
    fn test_zero_fragment_count_rejected() {
        assert!(Frame::new(0, FrameType::Key, 0).is_err());
    }

    #[test]
    fn test_fragments_complete_the_frame() {
        let mut frame = Frame::new(0, FrameType::Key, 2).unwrap();
        frame.insert_frag(frag(0, 0, 2, vec![1, 2]));
        assert!(!frame.complete());

        frame.insert_frag(frag(0, 1, 2, vec![3]));
        assert!(frame.complete());
        assert_eq!(frame.frame_size(), Some(3));
    }

    #[test]
    fn test_payload_concatenates_in_index_order() {
        let mut frame = Frame::new(0, FrameType::Key, 3).unwrap();
        // Insert out of order.
        frame.insert_frag(frag(0, 2, 3, vec![7, 8, 9]));
        frame.insert_frag(frag(0, 0, 3, vec![1, 2, 3]));
        frame.insert_frag(frag(0, 1, 3, vec![4, 5, 6]));

        assert_eq!(frame.into_payload().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_duplicate_does_not_alter_size_or_contents() {
        let mut frame = Frame::new(0, FrameType::Key, 2).unwrap();
        frame.insert_frag(frag(0, 0, 2, vec![1, 2]));
        let size_after_first = frame.frame_size;

        // Same slot with different bytes must not overwrite.
        frame.insert_frag(frag(0, 0, 2, vec![9, 9, 9, 9]));
        assert_eq!(frame.frame_size, size_after_first);

        frame.insert_frag(frag(0, 1, 2, vec![3]));
        assert_eq!(frame.into_payload().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mismatched_fragment_dropped_without_mutation() {
        let mut frame = Frame::new(0, FrameType::Key, 2).unwrap();

        // Wrong declared count.
        frame.insert_frag(frag(0, 0, 3, vec![1]));
        assert_eq!(frame.null_frags(), 2);

        // Wrong frame type.
        let mut wrong_type = frag(0, 0, 2, vec![1]);
        wrong_type.frame_type = FrameType::Delta;
        frame.insert_frag(wrong_type);
        assert_eq!(frame.null_frags(), 2);
    }

    #[test]
    fn test_incomplete_frame_yields_no_payload() {
        let mut frame = Frame::new(0, FrameType::Key, 2).unwrap();
        frame.insert_frag(frag(0, 0, 2, vec![1]));
        assert!(frame.into_payload().is_none());
    }
}
