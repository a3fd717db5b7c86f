//! # ingest
//!
//! Telemetry producers for the dispatcher. Each one decodes JSON
//! [`TelemetryEvent`] envelopes and forwards them, in arrival order, into the
//! single dispatcher channel.
//!
//! - UDP listener: one envelope per datagram, as sent by `trajectory-sim` or a
//!   flight-stack bridge.
//! - Replay: a JSON-lines telemetry log, one envelope per line.
//!
//! Malformed envelopes are dropped and logged; transport errors never end a run.

use std::path::Path;

use flight_test_types::TelemetryEvent;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ── Configuration ─────────────────────────────────────────────────────────────

pub struct IngestConfig {
    /// UDP port to listen on (default 14600)
    pub udp_port: u16,
    /// Bind address (default 0.0.0.0)
    pub bind_addr: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            udp_port: std::env::var("VERIFIER_UDP_PORT")
                .ok().and_then(|v| v.parse().ok()).unwrap_or(14600),
            bind_addr: std::env::var("VERIFIER_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }
}

// ── UDP listener ──────────────────────────────────────────────────────────────

pub async fn bind_udp(config: &IngestConfig) -> std::io::Result<UdpSocket> {
    let addr = format!("{}:{}", config.bind_addr, config.udp_port);
    let socket = UdpSocket::bind(&addr).await?;
    info!("📡 Telemetry listener on UDP {addr}");
    Ok(socket)
}

/// Runs until the dispatcher side of the channel is dropped.
pub async fn run_udp_listener(socket: UdpSocket, tx: mpsc::Sender<TelemetryEvent>) {
    let mut buf = vec![0u8; 4096];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, src)) => {
                let Some(event) = decode(&buf[..len]) else {
                    debug!("Telemetry: malformed datagram from {src}");
                    continue;
                };
                if tx.send(event).await.is_err() {
                    debug!("Telemetry: dispatcher gone, stopping UDP listener");
                    return;
                }
            }
            Err(e) => {
                warn!("Telemetry: UDP recv error: {e}");
            }
        }
    }
}

// ── Replay ────────────────────────────────────────────────────────────────────

/// Streams a JSON-lines telemetry log into the channel, then closes it.
/// Returns the number of events forwarded.
pub async fn replay_file(path: &Path, tx: mpsc::Sender<TelemetryEvent>) -> std::io::Result<usize> {
    let file = File::open(path).await?;
    info!("▶ Replaying telemetry from {}", path.display());
    let mut lines = BufReader::new(file).lines();
    let mut forwarded = 0;
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(event) = decode(line.as_bytes()) else {
            warn!("Replay: skipping malformed line {line_no}");
            continue;
        };
        if tx.send(event).await.is_err() {
            break;
        }
        forwarded += 1;
    }
    info!("Replay finished: {forwarded} events");
    Ok(forwarded)
}

fn decode(data: &[u8]) -> Option<TelemetryEvent> {
    serde_json::from_slice(data).ok()
}
