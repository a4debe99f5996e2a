//! Wire message encoding.
//!
//! Provides efficient binary serialization of telemetry messages for
//! transmission over the network.

use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::message::{AckMsg, ConfigMsg, Datagram, WireMsg, TAG_ACK, TAG_CONFIG, TAG_DATA};

/// Serializes wire messages into bytes for transmission.
pub struct MessageEncoder;

impl MessageEncoder {
    /// Encodes a data fragment into the provided buffer (appends bytes).
    pub fn encode_datagram_into(buffer: &mut Vec<u8>, datagram: &Datagram) -> io::Result<()> {
        buffer.write_u8(TAG_DATA)?;
        buffer.write_u32::<BigEndian>(datagram.frame_id)?;
        buffer.write_u8(datagram.frame_type.to_u8())?;
        buffer.write_u16::<BigEndian>(datagram.frag_id)?;
        buffer.write_u16::<BigEndian>(datagram.frag_cnt)?;
        buffer.write_u16::<BigEndian>(datagram.rtx)?;
        buffer.write_u64::<BigEndian>(datagram.send_ts)?;
        buffer.write_u16::<BigEndian>(datagram.payload.len() as u16)?;
        buffer.write_all(&datagram.payload)?;
        Ok(())
    }

    /// Encodes an acknowledgment into the provided buffer (appends bytes).
    pub fn encode_ack_into(buffer: &mut Vec<u8>, ack: &AckMsg) -> io::Result<()> {
        buffer.write_u8(TAG_ACK)?;
        buffer.write_u32::<BigEndian>(ack.frame_id)?;
        buffer.write_u16::<BigEndian>(ack.frag_id)?;
        buffer.write_u64::<BigEndian>(ack.send_ts)?;
        Ok(())
    }

    /// Encodes a configuration message into the provided buffer (appends bytes).
    pub fn encode_config_into(buffer: &mut Vec<u8>, config: &ConfigMsg) -> io::Result<()> {
        buffer.write_u8(TAG_CONFIG)?;
        buffer.write_u16::<BigEndian>(config.width)?;
        buffer.write_u16::<BigEndian>(config.height)?;
        buffer.write_u16::<BigEndian>(config.fps)?;
        buffer.write_u32::<BigEndian>(config.target_bitrate)?;
        Ok(())
    }

    /// Encodes any wire message into the provided buffer (appends bytes).
    pub fn encode_into(buffer: &mut Vec<u8>, msg: &WireMsg) -> io::Result<()> {
        match msg {
            WireMsg::Data(datagram) => Self::encode_datagram_into(buffer, datagram),
            WireMsg::Ack(ack) => Self::encode_ack_into(buffer, ack),
            WireMsg::Config(config) => Self::encode_config_into(buffer, config),
        }
    }

    /// Encodes any wire message into a fresh byte vector.
    pub fn encode(msg: &WireMsg) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::encode_into(&mut buffer, msg)?;
        Ok(buffer)
    }
}
