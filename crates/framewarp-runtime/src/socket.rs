use std::{
    io,
    net::{Ipv4Addr, SocketAddrV4, ToSocketAddrs, UdpSocket},
};

use framewarp_core::{config::Config, error::Result};
use socket2::Socket as Socket2;

/// Applies socket options from configuration to a UdpSocket.
fn apply_socket_options(socket: &UdpSocket, config: &Config) -> io::Result<()> {
    let socket2 = Socket2::from(socket.try_clone()?);

    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }
    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }

    Ok(())
}

/// Binds a UDP socket on all interfaces at `port` with configured options.
///
/// The socket starts in blocking mode for the handshake; the session flips
/// it to non-blocking before entering its loop.
pub fn bind_udp(port: u16, config: &Config) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
    apply_socket_options(&socket, config)?;
    Ok(socket)
}

/// Binds an ephemeral UDP socket and connects it to the peer.
pub fn connect_udp<A: ToSocketAddrs>(peer: A, config: &Config) -> Result<UdpSocket> {
    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?;
    apply_socket_options(&socket, config)?;
    socket.connect(peer)?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_udp_with_options() {
        let config = Config::default();
        let socket = bind_udp(0, &config).unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_connect_udp_reaches_bound_socket() {
        let config = Config::default();
        let server = bind_udp(0, &config).unwrap();
        let addr = server.local_addr().unwrap();

        let client = connect_udp(("127.0.0.1", addr.port()), &config).unwrap();
        client.send(b"ping").unwrap();

        let mut buf = [0u8; 16];
        let (len, _) = server.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"ping");
    }
}
