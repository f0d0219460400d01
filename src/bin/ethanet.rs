//! Command line front end: send a file or stdin, or receive to a file or stdout

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use ethanet::core::error::byte_field;
use ethanet::network::UdpTransport;
use ethanet::{Address, Error, Result, Session, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "ethanet", version, about = "EthaNET link-layer MAC node")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// This node's address [0-255]
    #[arg(short, long, global = true, allow_hyphen_values = true)]
    address: Option<i64>,

    /// Endpoint frames are published to
    #[arg(long, global = true)]
    transmit_endpoint: Option<SocketAddr>,

    /// Endpoint frames are received on
    #[arg(long, global = true)]
    receive_endpoint: Option<SocketAddr>,

    /// JSON session configuration; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send input data in MTU-sized frames
    #[command(alias = "s")]
    Send(SendArgs),
    /// Receive frames addressed to this node
    #[command(alias = "r")]
    Receive(ReceiveArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Input file (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Chunk size for outbound frames [1-255]
    #[arg(long, allow_hyphen_values = true)]
    mtu: Option<i64>,

    /// Modulation and coding scheme [0-255]
    #[arg(short, long, default_value_t = 1, allow_hyphen_values = true)]
    mcs: i64,

    /// Destination node address [0-255]
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    destination: i64,
}

#[derive(Args, Debug)]
struct ReceiveArgs {
    /// Stop after this many payload bytes
    #[arg(short, long)]
    num_bytes: Option<u64>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    debug!(
        "Creating session for {} (transmit {}, receive {})",
        config.address,
        config.transmit_endpoint,
        config.receive_endpoint
    );

    let transport = UdpTransport::from_config(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut session = Session::new(config, transport)?.with_shutdown(shutdown_rx.clone());

    let result = match cli.command {
        Command::Send(args) => send(&mut session, args).await,
        Command::Receive(args) => receive(&mut session, args, shutdown_rx).await,
    };

    debug!("Session stats: {:?}", session.stats());
    result
}

/// Builds the session configuration from the file (if any) and flags
fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };

    if let Some(address) = cli.address {
        config.address = Address(byte_field("address", address)?);
    }
    if let Some(endpoint) = cli.transmit_endpoint {
        config.transmit_endpoint = endpoint;
    }
    if let Some(endpoint) = cli.receive_endpoint {
        config.receive_endpoint = endpoint;
    }
    if let Command::Send(SendArgs { mtu: Some(mtu), .. }) = &cli.command {
        config.mtu = mtu_field(*mtu)?;
    }

    Ok(config)
}

fn mtu_field(value: i64) -> Result<u8> {
    match u8::try_from(value) {
        Ok(mtu) if mtu > 0 => Ok(mtu),
        _ => Err(Error::field_range("mtu", value, 1, u8::MAX as i64)),
    }
}

async fn send(session: &mut Session<UdpTransport>, args: SendArgs) -> Result<()> {
    let destination = Address(byte_field("destination", args.destination)?);
    let mcs = byte_field("mcs", args.mcs)?;

    let mut input: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(tokio::fs::File::open(path).await?),
        None => {
            info!("Reading input from stdin until EOF");
            Box::new(tokio::io::stdin())
        }
    };

    let mut chunk = vec![0u8; session.config().mtu as usize];
    let mut total = 0usize;

    loop {
        let len = read_chunk(&mut input, &mut chunk).await?;
        if len == 0 {
            break;
        }

        match session.send(&chunk[..len], destination, mcs).await {
            Ok(report) => {
                debug!(
                    "Delivered seq {} after {} attempt(s) in {:?}",
                    report.sequence,
                    report.attempts,
                    report.elapsed
                );
                total += len;
            }
            Err(Error::Cancelled(sequence)) => {
                info!("Stopped with seq {} unacknowledged", sequence);
                return Ok(());
            }
            Err(e) => return Err(e),
        }
    }

    info!("Done sending {} bytes to {}", total, destination);
    Ok(())
}

/// Fills `buf` unless the input ends first; returns the bytes read
async fn read_chunk<R: AsyncRead + Unpin>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = input.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

async fn receive(
    session: &mut Session<UdpTransport>,
    args: ReceiveArgs,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut output: Box<dyn AsyncWrite + Unpin + Send> = match &args.output {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };

    let timeout = session.config().receive_timeout;
    let mut written = 0u64;

    while args.num_bytes.map_or(true, |limit| written < limit) {
        let accepted = tokio::select! {
            accepted = session.accept(timeout) => accepted?,
            Ok(_) = shutdown.wait_for(|stop| *stop) => break,
        };

        let Some(delivery) = accepted else {
            debug!("Nothing received within {:?}", timeout);
            continue;
        };
        if delivery.duplicate {
            continue;
        }

        let mut payload = &delivery.payload[..];
        if let Some(limit) = args.num_bytes {
            let remaining = usize::try_from(limit - written).unwrap_or(usize::MAX);
            payload = &payload[..payload.len().min(remaining)];
        }

        output.write_all(payload).await?;
        output.flush().await?;
        written += payload.len() as u64;
    }

    info!("Received {} bytes", written);
    Ok(())
}
