//! Wire message decoding.
//!
//! Decodes telemetry messages received from the network. Every failure is
//! reported as `ErrorKind::DecodingError` so the caller can drop the
//! datagram and continue.

use std::{
    convert::TryFrom,
    io::{Cursor, Read},
};

use byteorder::{BigEndian, ReadBytesExt};

use framewarp_core::{
    error::{DecodingErrorKind, ErrorKind, Result},
    frame::FrameType,
};

use crate::message::{AckMsg, ConfigMsg, Datagram, WireMsg, TAG_ACK, TAG_CONFIG, TAG_DATA};

/// Deserializes wire messages from network bytes.
pub struct MessageDecoder;

fn truncated<T>(_: T) -> ErrorKind {
    ErrorKind::DecodingError(DecodingErrorKind::UnexpectedEnd)
}

impl MessageDecoder {
    /// Decodes a single wire message from a received datagram.
    pub fn decode(data: &[u8]) -> Result<WireMsg> {
        let mut cursor = Cursor::new(data);
        let tag = cursor.read_u8().map_err(truncated)?;

        match tag {
            TAG_DATA => {
                let frame_id = cursor.read_u32::<BigEndian>().map_err(truncated)?;
                let frame_type = FrameType::try_from(cursor.read_u8().map_err(truncated)?)?;
                let frag_id = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let frag_cnt = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let rtx = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let send_ts = cursor.read_u64::<BigEndian>().map_err(truncated)?;
                let payload_len = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;

                if frag_cnt == 0 || frag_id >= frag_cnt {
                    return Err(ErrorKind::DecodingError(DecodingErrorKind::FragmentBounds));
                }
                if payload_len == 0 {
                    return Err(ErrorKind::DecodingError(DecodingErrorKind::PayloadLength));
                }

                let mut payload = vec![0u8; payload_len];
                cursor.read_exact(&mut payload).map_err(|_| {
                    ErrorKind::DecodingError(DecodingErrorKind::PayloadLength)
                })?;

                Ok(WireMsg::Data(Datagram {
                    frame_id,
                    frame_type,
                    frag_id,
                    frag_cnt,
                    rtx,
                    send_ts,
                    payload,
                }))
            }
            TAG_ACK => {
                let frame_id = cursor.read_u32::<BigEndian>().map_err(truncated)?;
                let frag_id = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let send_ts = cursor.read_u64::<BigEndian>().map_err(truncated)?;
                Ok(WireMsg::Ack(AckMsg { frame_id, frag_id, send_ts }))
            }
            TAG_CONFIG => {
                let width = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let height = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let fps = cursor.read_u16::<BigEndian>().map_err(truncated)?;
                let target_bitrate = cursor.read_u32::<BigEndian>().map_err(truncated)?;
                Ok(WireMsg::Config(ConfigMsg { width, height, fps, target_bitrate }))
            }
            _ => Err(ErrorKind::DecodingError(DecodingErrorKind::MessageTag)),
        }
    }
}
