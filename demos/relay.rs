//! Relay an IVF/VP9 stream read from stdin
//!
//! Run with: cargo run --example relay [SIGNALING_ADDR] < stream.ivf
//!
//! Examples:
//!   ffmpeg -re -i input.mp4 -c:v libvpx-vp9 -f ivf - | cargo run --example relay
//!   cargo run --example relay localhost:9000 < capture.ivf
//!
//! Viewers connect to ws://SIGNALING_ADDR/ice and send an offer. This demo
//! ships a loopback media transport: it answers every offer, reports the
//! connection as up right away and logs each frame it would have sent. Plug
//! a real WebRTC stack in through `TransportFactory` to deliver video.
//!
//! The process exits 0 once stdin is exhausted and 1 if the stream cannot
//! be read.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use tokio::sync::mpsc;

use rtc_relay::error::{Error, TransportError};
use rtc_relay::hub::{BroadcastHub, Frame};
use rtc_relay::media::IvfReader;
use rtc_relay::server::{RelayConfig, RelayServer};
use rtc_relay::signaling::{IceCandidate, SessionDescription};
use rtc_relay::transport::{
    ConnectivityState, FrameSink, MediaTransport, TransportEvent, TransportFactory,
};

/// Answers offers by echoing them and connects immediately
struct LoopbackTransport {
    events: mpsc::Sender<TransportEvent>,
}

struct LoggingSink {
    frames: u64,
}

impl FrameSink for LoggingSink {
    async fn send_frame(&mut self, frame: Frame, duration: Duration) -> Result<(), TransportError> {
        self.frames += 1;
        tracing::debug!(
            timestamp = frame.timestamp,
            size = frame.size(),
            duration_ms = duration.as_millis() as u64,
            sent = self.frames,
            "Frame out"
        );
        Ok(())
    }
}

impl MediaTransport for LoopbackTransport {
    type Sink = LoggingSink;

    async fn negotiate(
        &mut self,
        offer: SessionDescription,
    ) -> Result<SessionDescription, TransportError> {
        self.events
            .send(TransportEvent::Connectivity(ConnectivityState::Connected))
            .await
            .map_err(|_| TransportError::Closed)?;
        Ok(SessionDescription::answer(offer.sdp))
    }

    async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), TransportError> {
        tracing::debug!(candidate = %candidate.candidate, "Remote candidate ignored");
        Ok(())
    }

    fn frame_sink(&self) -> LoggingSink {
        LoggingSink { frames: 0 }
    }

    async fn close(&mut self) {
        let _ = self
            .events
            .try_send(TransportEvent::Connectivity(ConnectivityState::Closed));
    }
}

struct LoopbackFactory;

impl TransportFactory for LoopbackFactory {
    type Transport = LoopbackTransport;

    fn create(
        &self,
        _config: &RelayConfig,
    ) -> Result<(LoopbackTransport, mpsc::Receiver<TransportEvent>), TransportError> {
        let (events, events_rx) = mpsc::channel(16);
        Ok((LoopbackTransport { events }, events_rx))
    }
}

fn parse_signaling_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = 8080;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid signaling address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: relay [SIGNALING_ADDR] < stream.ivf");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  SIGNALING_ADDR    WebSocket signaling address (default: 127.0.0.1:8080)");
    eprintln!();
    eprintln!("Reads an IVF container with VP9 frames from stdin.");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return ExitCode::SUCCESS;
    }

    let mut config = RelayConfig::default();
    if let Some(addr_str) = args.get(1) {
        match parse_signaling_addr(addr_str) {
            Ok(addr) => config = config.signaling_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                return ExitCode::FAILURE;
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rtc_relay=info,relay=info")),
        )
        .init();

    let source = match IvfReader::new(tokio::io::stdin()).await {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(error = %e, "Stdin is not an IVF stream");
            return ExitCode::FAILURE;
        }
    };

    let header = source.header();
    tracing::info!(
        codec = %header.fourcc_str(),
        width = header.width,
        height = header.height,
        "Reading stream from stdin"
    );
    if !header.is_vp9() {
        tracing::warn!("Stream is not VP9; viewers will drop every frame");
    }
    if let Some(duration) = header.frame_duration() {
        config.session = config.session.clone().frame_duration(duration);
    }

    let (hub, _hub_task) = BroadcastHub::spawn(config.hub.clone());
    tracing::info!(
        addr = %config.signaling_addr,
        path = %config.signaling_path,
        "Accepting viewers"
    );
    let server = RelayServer::new(config, LoopbackFactory, hub);

    match server.broadcast(source).await {
        Ok(summary) => {
            tracing::info!(frames = summary.frames, bytes = summary.bytes, "Stream finished");
            ExitCode::SUCCESS
        }
        Err(Error::Source(e)) => {
            tracing::error!(error = %e, "Stream read failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(error = %e, "Relay failed");
            ExitCode::FAILURE
        }
    }
}
