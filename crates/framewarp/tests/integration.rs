//! End-to-end tests over real loopback UDP sockets.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use framewarp::{
    await_config, bind_udp, capture_loop, connect_udp, request_config, send_config_reply,
    AckMsg, Config, Datagram, DecodeWorker, FrameRing, LazyLevel, MessageDecoder, MessageEncoder,
    PassthroughCodec, RawFrame, Reassembler, ReceiverSession, SenderSession, SenderTransport,
    StreamParams, TestPatternSource, WireMsg,
};

/// Drains the transport FIFO onto a socket, stamping and recording each
/// fragment the way the sender's writable handler does. `drop_frag` skips
/// actual transmission for one (frame_id, frag_id) to simulate loss.
fn transmit_pending(
    transport: &mut SenderTransport,
    socket: &std::net::UdpSocket,
    drop_frag: Option<(u32, u16)>,
) -> usize {
    let mut sent = 0;
    while let Some(mut datagram) = transport.pop_pending() {
        datagram.send_ts = transport.timestamp_us(Instant::now());
        if drop_frag != Some((datagram.frame_id, datagram.frag_id)) {
            let bytes = MessageEncoder::encode(&WireMsg::Data(datagram.clone()))
                .expect("encoding cannot fail");
            socket.send(&bytes).expect("loopback send failed");
            sent += 1;
        }
        // The transport saw a successful transmission either way; the
        // "lost" fragment simply never reaches the peer.
        transport.record_sent(&datagram);
    }
    sent
}

/// Receives one datagram, acks it, and returns the parsed fragment.
fn recv_and_ack(socket: &std::net::UdpSocket, buf: &mut [u8]) -> Option<Datagram> {
    let len = socket.recv(buf).ok()?;
    match MessageDecoder::decode(&buf[..len]) {
        Ok(WireMsg::Data(datagram)) => {
            let ack = AckMsg::for_datagram(&datagram);
            let bytes = MessageEncoder::encode(&WireMsg::Ack(ack)).expect("encoding cannot fail");
            socket.send(&bytes).expect("loopback ack failed");
            Some(datagram)
        }
        _ => None,
    }
}

/// Drains ACKs back into the transport.
fn drain_acks(transport: &mut SenderTransport, socket: &std::net::UdpSocket, buf: &mut [u8]) {
    while let Ok(len) = socket.recv(buf) {
        if let Ok(WireMsg::Ack(ack)) = MessageDecoder::decode(&buf[..len]) {
            transport.handle_ack(&ack, Instant::now());
        }
    }
}

fn connected_pair(config: &Config) -> (std::net::UdpSocket, std::net::UdpSocket) {
    let a = bind_udp(0, config).expect("bind failed");
    let b = bind_udp(0, config).expect("bind failed");
    let a_addr = a.local_addr().unwrap();
    let b_addr = b.local_addr().unwrap();
    a.connect(b_addr).unwrap();
    b.connect(a_addr).unwrap();
    (a, b)
}

#[test]
fn test_lossless_frame_crosses_loopback() {
    let config = Config::default();
    let (sender_sock, receiver_sock) = connected_pair(&config);
    receiver_sock.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    sender_sock.set_read_timeout(Some(Duration::from_millis(200))).unwrap();

    let mut transport = SenderTransport::new(
        Box::new(PassthroughCodec::new(64, 64)),
        &config,
        Instant::now(),
    );
    let mut reassembler = Reassembler::new(Instant::now());

    let mut frame = RawFrame::new(64, 64);
    for (i, byte) in frame.data_mut().iter_mut().enumerate() {
        *byte = i as u8;
    }
    transport.compress_frame(&frame).unwrap();
    let sent = transmit_pending(&mut transport, &sender_sock, None);
    assert!(sent > 1, "a 64x64 frame must span several fragments");

    let mut buf = vec![0u8; 2048];
    let mut consumed = None;
    for _ in 0..sent {
        let datagram = recv_and_ack(&receiver_sock, &mut buf).expect("fragment lost on loopback");
        reassembler.add_datagram(datagram);
        if reassembler.next_frame_complete() {
            consumed = reassembler.consume_next_frame(Instant::now());
            break;
        }
    }

    let completed = consumed.expect("frame never completed");
    assert_eq!(completed.id, 0);
    assert_eq!(completed.payload, frame.data());
    assert_eq!(reassembler.next_frame(), 1);

    // All ACKs flow back and the estimator picks up a sample.
    drain_acks(&mut transport, &sender_sock, &mut buf);
    assert_eq!(transport.unacked_len(), 0);
    assert!(transport.smoothed_rtt().is_some());
}

#[test]
fn test_lost_fragment_recovered_by_retransmission() {
    let config = Config::default();
    let (sender_sock, receiver_sock) = connected_pair(&config);
    receiver_sock.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    sender_sock.set_read_timeout(Some(Duration::from_millis(200))).unwrap();

    let mut transport = SenderTransport::new(
        Box::new(PassthroughCodec::new(64, 64)),
        &config,
        Instant::now(),
    );
    let mut reassembler = Reassembler::new(Instant::now());

    // Frame 0: lose fragment (0, 1) on first transmission.
    transport.compress_frame(&RawFrame::new(64, 64)).unwrap();
    let sent = transmit_pending(&mut transport, &sender_sock, Some((0, 1)));
    let mut buf = vec![0u8; 2048];
    for _ in 0..sent {
        let datagram = recv_and_ack(&receiver_sock, &mut buf).expect("fragment lost on loopback");
        reassembler.add_datagram(datagram);
    }
    assert!(!reassembler.next_frame_complete(), "frame cannot complete with a lost fragment");

    // Drain the prompt ACKs: loopback samples keep the RTO at its floor,
    // and only the lost fragment stays in the unacked table.
    drain_acks(&mut transport, &sender_sock, &mut buf);
    assert_eq!(transport.unacked_len(), 1);
    assert!(!transport.has_pending(), "nothing has timed out yet");

    // Age the lost fragment past the RTO floor, then let the next frame's
    // ACKs trigger the sweep.
    thread::sleep(config.min_rto + Duration::from_millis(10));
    transport.compress_frame(&RawFrame::new(64, 64)).unwrap();
    let sent = transmit_pending(&mut transport, &sender_sock, None);
    for _ in 0..sent {
        // Frame 1 is a DELTA frame; completing it must not skip frame 0.
        let datagram = recv_and_ack(&receiver_sock, &mut buf).expect("fragment lost on loopback");
        reassembler.add_datagram(datagram);
    }
    assert!(!reassembler.next_frame_complete(), "a complete delta frame must not trigger resync");

    drain_acks(&mut transport, &sender_sock, &mut buf);
    assert!(transport.has_pending(), "timed-out fragment was not re-queued");
    let srtt_after_first_sends = transport.smoothed_rtt();

    let resent = transmit_pending(&mut transport, &sender_sock, None);
    assert_eq!(resent, 1);

    let datagram = recv_and_ack(&receiver_sock, &mut buf).expect("retransmission lost");
    assert_eq!((datagram.frame_id, datagram.frag_id, datagram.rtx), (0, 1, 1));
    reassembler.add_datagram(datagram);

    // Frame 0 completes and frame 1 follows immediately behind it.
    assert!(reassembler.next_frame_complete());
    assert_eq!(reassembler.consume_next_frame(Instant::now()).unwrap().id, 0);
    assert!(reassembler.next_frame_complete());
    assert_eq!(reassembler.consume_next_frame(Instant::now()).unwrap().id, 1);
    assert_eq!(reassembler.next_frame(), 2);

    // The retransmission's ACK clears the table but leaves the estimator
    // untouched.
    drain_acks(&mut transport, &sender_sock, &mut buf);
    assert_eq!(transport.unacked_len(), 0);
    assert_eq!(transport.smoothed_rtt(), srtt_after_first_sends);
}

#[test]
fn test_end_to_end_sessions_stream_frames() {
    let config = Config::default();
    let params = StreamParams { width: 64, height: 64, fps: 60 };

    let sender_sock = bind_udp(0, &config).unwrap();
    let sender_port = sender_sock.local_addr().unwrap().port();
    let shutdown = Arc::new(AtomicBool::new(false));

    // Receiver endpoint: handshake, then run a full session with a decode
    // worker until shutdown.
    let receiver_handle = {
        let config = config.clone();
        let shutdown = shutdown.clone();
        thread::spawn(move || -> u32 {
            let socket = connect_udp(("127.0.0.1", sender_port), &config).unwrap();
            let stream = request_config(&socket, 2000).unwrap();
            assert_eq!((stream.width, stream.height, stream.fps), (64, 64, 60));
            assert_eq!(stream.target_bitrate, 2000);

            let worker = DecodeWorker::spawn(
                Box::new(PassthroughCodec::new(64, 64)),
                LazyLevel::DecodeOnly,
                None,
                None,
                None,
                shutdown.clone(),
            )
            .unwrap();

            let mut session = ReceiverSession::new(socket, &config, Some(worker), None).unwrap();
            session.run(&shutdown).unwrap();
            let consumed = session.next_frame();
            session.finish().unwrap();
            consumed
        })
    };

    // Sender endpoint: handshake, capture thread, session loop.
    let (peer, request) = await_config(&sender_sock).unwrap();
    sender_sock.connect(peer).unwrap();
    send_config_reply(&sender_sock, params, request.target_bitrate).unwrap();
    sender_sock.set_nonblocking(true).unwrap();

    let frame_size = RawFrame::frame_size(params.width, params.height);
    let (producer, consumer) = FrameRing::with_capacity(64, frame_size);
    let capture_handle = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            capture_loop(Box::new(TestPatternSource::new(60)), 64, 64, producer, shutdown)
        })
    };

    let mut transport = SenderTransport::new(
        Box::new(PassthroughCodec::new(64, 64)),
        &config,
        Instant::now(),
    );
    transport.set_target_bitrate(request.target_bitrate);
    let mut session = SenderSession::new(sender_sock, transport, consumer, params, config);

    let sender_handle = {
        let shutdown = shutdown.clone();
        thread::spawn(move || session.run(&shutdown).unwrap())
    };

    // Stream for a while, then shut everything down.
    thread::sleep(Duration::from_millis(1500));
    shutdown.store(true, Ordering::Relaxed);

    sender_handle.join().expect("sender session panicked");
    capture_handle.join().expect("capture thread panicked");
    let consumed = receiver_handle.join().expect("receiver session panicked");

    assert!(consumed > 0, "receiver consumed no frames in 1.5s of streaming");
}
