//! Framewarp receiver: reassembles, decodes, and persists the stream.
//!
//! ```text
//! framewarp-receiver <host> <port> --cbr <kbps> [--lazy {0,1,2}]
//!                    [--output <path>] [--log <path>] [-v]
//! ```
//!
//! Requests the stream from the sender, acknowledges every fragment, and
//! hands completed frames to a decode worker. `--lazy` selects how much
//! work to do: 0 decode and display, 1 decode only, 2 neither.

use std::{
    convert::TryFrom,
    io,
    path::PathBuf,
    process,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use framewarp::{
    connect_udp, request_config, Config, DecodeWorker, ErrorKind, FrameSink, FrameTimingLog,
    LazyLevel, NullSink, PassthroughCodec, ReceiverSession, Result, Y4mWriter,
};

#[derive(Parser, Debug)]
#[command(name = "framewarp-receiver", about = "Receive and decode a framewarp stream")]
struct Cli {
    /// Sender host name or address.
    host: String,

    /// Sender UDP port.
    port: u16,

    /// Target bitrate in kbps to request from the sender.
    #[arg(long)]
    cbr: u32,

    /// 0: decode and display; 1: decode only; 2: neither.
    #[arg(long, default_value_t = 0)]
    lazy: u8,

    /// Write decoded frames to a YUV4MPEG2 file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write per-frame timing records to a CSV file.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Enable more logging for debugging.
    #[arg(short = 'v', long)]
    verbose: bool,
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
    if cli.cbr == 0 {
        return Err(ErrorKind::ConfigError("--cbr must be greater than 0".to_string()));
    }
    let lazy = LazyLevel::try_from(cli.lazy)?;

    let config = Config::default();
    let shutdown = install_sigint()?;

    let socket = connect_udp((cli.host.as_str(), cli.port), &config)?;
    info!("local address: {}", socket.local_addr()?);

    let stream = request_config(&socket, cli.cbr)?;

    let y4m = match &cli.output {
        Some(path) => Some(Y4mWriter::create(path, stream.width, stream.height, stream.fps)?),
        None => None,
    };
    let timing_log = match &cli.log {
        Some(path) => Some(FrameTimingLog::create(path)?),
        None => None,
    };

    // Decoding and rendering happen off the network path; with --lazy 2 the
    // session only accounts frames (and logs timings on its own thread).
    let (worker, session_log) = if lazy <= LazyLevel::DecodeOnly {
        let display: Option<Box<dyn FrameSink>> = if lazy == LazyLevel::DecodeDisplay {
            Some(Box::new(NullSink))
        } else {
            None
        };
        let worker = DecodeWorker::spawn(
            Box::new(PassthroughCodec::new(stream.width, stream.height)),
            lazy,
            display,
            y4m,
            timing_log,
            shutdown.clone(),
        )?;
        (Some(worker), None)
    } else {
        if y4m.is_some() {
            warn!("--output ignored: --lazy 2 never decodes frames");
        }
        (None, timing_log)
    };

    let mut session = ReceiverSession::new(socket, &config, worker, session_log)?;
    let result = session.run(&shutdown);

    shutdown.store(true, Ordering::Relaxed);
    let worker_result = session.finish();

    result.and(worker_result)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("framewarp-receiver: {}", e);
        process::exit(1);
    }
}
