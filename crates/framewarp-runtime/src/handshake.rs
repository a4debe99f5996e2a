use std::net::{SocketAddr, UdpSocket};

use framewarp_core::{config::StreamParams, error::Result};
use framewarp_protocol::{
    message::{ConfigMsg, WireMsg},
    MessageDecoder, MessageEncoder,
};
use tracing::{debug, info};

/// Sender side: blocks until the first valid CONFIG record arrives.
///
/// Only the target bitrate in the request matters; width, height, and fps
/// are the sender's own. Malformed or non-CONFIG records are ignored.
pub fn await_config(socket: &UdpSocket) -> Result<(SocketAddr, ConfigMsg)> {
    let mut buf = vec![0u8; 2048];
    loop {
        let (len, peer) = socket.recv_from(&mut buf)?;
        match MessageDecoder::decode(&buf[..len]) {
            Ok(WireMsg::Config(config)) => return Ok((peer, config)),
            Ok(_) | Err(_) => {
                debug!(peer = %peer, "ignoring non-config datagram during handshake");
            }
        }
    }
}

/// Sender side: replies with the session's actual parameters, echoing the
/// requested bitrate.
pub fn send_config_reply(
    socket: &UdpSocket,
    params: StreamParams,
    target_bitrate: u32,
) -> Result<()> {
    let reply = ConfigMsg {
        width: params.width,
        height: params.height,
        fps: params.fps,
        target_bitrate,
    };
    socket.send(&MessageEncoder::encode(&WireMsg::Config(reply))?)?;
    Ok(())
}

/// Receiver side: requests a configuration and blocks for the reply.
///
/// The request carries only the target bitrate; the reply carries the
/// sender's width, height, and fps.
pub fn request_config(socket: &UdpSocket, target_bitrate: u32) -> Result<ConfigMsg> {
    let request = ConfigMsg { width: 0, height: 0, fps: 0, target_bitrate };
    socket.send(&MessageEncoder::encode(&WireMsg::Config(request))?)?;

    let mut buf = vec![0u8; 2048];
    loop {
        let len = socket.recv(&mut buf)?;
        match MessageDecoder::decode(&buf[..len]) {
            Ok(WireMsg::Config(config)) => {
                info!(
                    width = config.width,
                    height = config.height,
                    fps = config.fps,
                    bitrate = config.target_bitrate,
                    "received config"
                );
                return Ok(config);
            }
            Ok(_) | Err(_) => {
                debug!("ignoring non-config datagram during handshake");
            }
        }
    }
}
