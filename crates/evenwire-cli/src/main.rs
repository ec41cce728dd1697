//! Evenwire CLI
//!
//! Tunnels a local stream (stdio or a forwarded TCP connection) to a peer
//! over a single TCP connection that carries fixed-size encrypted frames at
//! a constant rate, so an observer learns nothing from lengths or timing.
//!
//! Both ends load the same pre-shared key file out of band; each session
//! additionally performs an ephemeral X25519 exchange.

mod stdio;
mod timeout;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use evenwire_core::{DEFAULT_FRAME_SIZE, Role, connect};
use stdio::Stdio;
use timeout::Deadline;

/// Minimum accepted pre-shared key length in bytes
const MIN_KEY_LEN: usize = 8;

/// Key length written by `keygen`
const GENERATED_KEY_LEN: usize = 32;

/// evenwire - constant-rate encrypted tunnel
#[derive(Parser)]
#[command(name = "evenwire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dial a server and tunnel stdio over the connection
    Client {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:24873")]
        address: String,

        #[command(flatten)]
        tunnel: TunnelArgs,
    },

    /// Accept connections, forwarding each to a target address or stdio
    Server {
        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:24873")]
        address: String,

        /// Forward the plaintext side to this TCP address (stdio if absent)
        #[arg(short, long)]
        target: Option<String>,

        #[command(flatten)]
        tunnel: TunnelArgs,
    },

    /// Generate a random pre-shared key file
    Keygen {
        /// Output file for the key
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Session options shared by client and server
#[derive(Args, Clone)]
struct TunnelArgs {
    /// Pre-shared key file (at least 8 bytes)
    #[arg(short, long)]
    key_file: PathBuf,

    /// Milliseconds between frames
    #[arg(long, default_value_t = 10)]
    period_ms: u64,

    /// Ciphertext frame size in bytes (both ends must agree)
    #[arg(long, default_value_t = DEFAULT_FRAME_SIZE)]
    frame_size: usize,

    /// Per-operation deadline on the remote connection, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl TunnelArgs {
    fn config(&self) -> evenwire_core::TunnelConfig {
        evenwire_core::TunnelConfig {
            frame_size: self.frame_size,
            period: Duration::from_millis(self.period_ms),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    match cli.command {
        Commands::Client { address, tunnel } => run_client(address, tunnel).await,
        Commands::Server {
            address,
            target,
            tunnel,
        } => run_server(address, target, tunnel).await,
        Commands::Keygen { output } => generate_key(output).await,
    }
}

async fn load_key(path: &Path) -> anyhow::Result<Vec<u8>> {
    let key = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read key file {}", path.display()))?;
    anyhow::ensure!(
        key.len() >= MIN_KEY_LEN,
        "key in {} is too short: {} < {} bytes",
        path.display(),
        key.len(),
        MIN_KEY_LEN,
    );
    Ok(key)
}

async fn run_client(address: String, tunnel: TunnelArgs) -> anyhow::Result<()> {
    let key = load_key(&tunnel.key_file).await?;

    let stream = TcpStream::connect(&address)
        .await
        .with_context(|| format!("failed to connect to {address}"))?;
    info!(%address, "connected");

    run_session(Stdio::new(), stream, &key, Role::Client, &tunnel).await
}

async fn run_server(
    address: String,
    target: Option<String>,
    tunnel: TunnelArgs,
) -> anyhow::Result<()> {
    let key = load_key(&tunnel.key_file).await?;

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to listen on {address}"))?;
    info!(%address, "listening");

    loop {
        let (stream, peer) = listener.accept().await.context("failed to accept")?;
        let key = key.clone();
        let target = target.clone();
        let tunnel = tunnel.clone();
        tokio::spawn(async move {
            info!(%peer, "session started");
            if let Err(err) = serve_session(stream, target, &key, &tunnel).await {
                error!(%peer, %err, "session ended");
            }
        });
    }
}

async fn serve_session(
    stream: TcpStream,
    target: Option<String>,
    key: &[u8],
    tunnel: &TunnelArgs,
) -> anyhow::Result<()> {
    match target {
        Some(target) => {
            let plain = TcpStream::connect(&target)
                .await
                .with_context(|| format!("failed to connect to target {target}"))?;
            plain.set_nodelay(true)?;
            run_session(plain, stream, key, Role::Server, tunnel).await
        }
        None => run_session(Stdio::new(), stream, key, Role::Server, tunnel).await,
    }
}

async fn run_session<P>(
    plain: P,
    stream: TcpStream,
    key: &[u8],
    role: Role,
    tunnel: &TunnelArgs,
) -> anyhow::Result<()>
where
    P: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Frames must leave on their tick, not on Nagle's schedule.
    stream.set_nodelay(true)?;

    match tunnel.timeout_secs {
        Some(secs) => {
            let deadlined = Deadline::new(stream, Duration::from_secs(secs));
            connect(plain, deadlined, key, role, tunnel.config()).await?;
        }
        None => connect(plain, stream, key, role, tunnel.config()).await?,
    }
    Ok(())
}

async fn generate_key(output: PathBuf) -> anyhow::Result<()> {
    let mut key = vec![0u8; GENERATED_KEY_LEN];
    evenwire_crypto::random::fill(&mut key).context("failed to gather randomness")?;

    tokio::fs::write(&output, &key)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&output, std::fs::Permissions::from_mode(0o600))
            .await
            .with_context(|| format!("failed to restrict permissions on {}", output.display()))?;
    }

    info!(path = %output.display(), bytes = GENERATED_KEY_LEN, "key written");
    Ok(())
}
