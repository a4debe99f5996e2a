//! Framewarp sender: captures frames and streams them to a receiver.
//!
//! ```text
//! framewarp-sender <port> -w <width> -h <height> -r <fps> [--mtu <mtu>] [-v]
//! ```
//!
//! Binds the given UDP port, waits for a receiver's config request, then
//! streams compressed frames with ACK-driven selective retransmission.

use std::{
    io,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use framewarp::{
    await_config, bind_udp, capture_loop, send_config_reply, validate_resolution_and_fps, Config,
    ErrorKind, FrameRing, PassthroughCodec, RawFrame, Result, SenderSession, SenderTransport,
    StreamParams, TestPatternSource,
};

#[derive(Parser, Debug)]
#[command(
    name = "framewarp-sender",
    about = "Stream captured video frames over UDP",
    disable_help_flag = true
)]
struct Cli {
    /// UDP port to listen on for the receiver's config request.
    port: u16,

    /// Frame width in pixels.
    #[arg(short = 'w', long)]
    width: u16,

    /// Frame height in pixels.
    #[arg(short = 'h', long)]
    height: u16,

    /// Frames per second.
    #[arg(short = 'r', long = "fps")]
    fps: u16,

    /// MTU for deciding the UDP payload size.
    #[arg(long, default_value_t = framewarp_core::constants::DEFAULT_MTU)]
    mtu: u16,

    /// Enable more logging for debugging.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print help.
    #[arg(long, action = clap::ArgAction::HelpLong)]
    help: Option<bool>,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn install_sigint() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
        .map_err(|e| ErrorKind::IoError(io::Error::other(e.to_string())))?;
    Ok(shutdown)
}

fn run(cli: Cli) -> Result<()> {
    // Configuration errors abort before any I/O.
    validate_resolution_and_fps(cli.width, cli.height, cli.fps)?;

    let config = Config { mtu: cli.mtu, ..Config::default() };
    let params = StreamParams { width: cli.width, height: cli.height, fps: cli.fps };
    let shutdown = install_sigint()?;

    // Capture runs in parallel from the start; the frame ring is the only
    // state shared with the session loop.
    let frame_size = RawFrame::frame_size(params.width, params.height);
    let (producer, consumer) = FrameRing::with_capacity(config.frame_ring_slots, frame_size);
    let source = TestPatternSource::new(params.fps);
    let capture = {
        let shutdown = shutdown.clone();
        let (width, height) = (params.width, params.height);
        thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || capture_loop(Box::new(source), width, height, producer, shutdown))?
    };

    let socket = bind_udp(cli.port, &config)?;
    info!("local address: {}", socket.local_addr()?);
    info!("waiting for receiver...");

    let (peer, request) = await_config(&socket)?;
    info!(peer = %peer, bitrate = request.target_bitrate, "received config request");
    socket.connect(peer)?;
    send_config_reply(&socket, params, request.target_bitrate)?;
    socket.set_nonblocking(true)?;

    let mut transport = SenderTransport::new(
        Box::new(PassthroughCodec::new(params.width, params.height)),
        &config,
        Instant::now(),
    );
    transport.set_target_bitrate(request.target_bitrate);

    let mut session = SenderSession::new(socket, transport, consumer, params, config);
    let result = session.run(&shutdown);

    shutdown.store(true, Ordering::Relaxed);
    if capture.join().is_err() {
        warn!("capture thread panicked");
    }
    info!(ring_drops = session.ring_drops(), "sender shut down");

    result
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("framewarp-sender: {}", e);
        process::exit(1);
    }
}
