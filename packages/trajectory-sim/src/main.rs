//! main.rs — Synthetic flight telemetry generator
//!
//! Flies the mission described by a mission/comparison file pair and streams
//! the resulting telemetry to the trajectory verifier over UDP, paced at the
//! configured rate. With `--dump` the stream is written to a JSON-lines file
//! instead, ready for `trajectory-verifier --replay`.

mod flight_sim;
mod udp_tx;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use flight_test_types::records::{load_comparison_file, load_mission_file};
use flight_test_types::TelemetryEvent;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::interval;
use tracing::{info, warn};

use flight_sim::{plan_legs, FlightSim, SimConfig};
use udp_tx::TelemetryTransmitter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "trajectory-sim", about = "Synthetic flight telemetry for the trajectory verifier")]
struct Args {
    /// Mission file (TOML, one [[waypoint]] per mission step)
    #[arg(long)]
    mission: PathBuf,
    /// Comparison file with the position reached after each step
    #[arg(long)]
    comparison: PathBuf,
    /// Verifier UDP address
    #[arg(long, default_value = "127.0.0.1:14600")]
    target: String,
    /// Telemetry ticks per second
    #[arg(long, default_value = "20")]
    rate_hz: f64,
    /// Ticks flown per mission leg
    #[arg(long, default_value = "100")]
    ticks_per_leg: usize,
    /// Simulation speed multiplier (1.0 = real-time)
    #[arg(long, default_value = "1.0")]
    speed: f64,
    /// Takeoff altitude, meters
    #[arg(long, default_value = "5.0")]
    takeoff_alt: f64,
    /// 1σ position noise, meters
    #[arg(long, default_value = "0.05")]
    position_noise: f64,
    /// 1σ velocity noise, m/s
    #[arg(long, default_value = "0.02")]
    velocity_noise: f64,
    /// Seed for a reproducible flight
    #[arg(long)]
    seed: Option<u64>,
    /// Write the telemetry as JSON lines to this file instead of sending it
    #[arg(long)]
    dump: Option<PathBuf>,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trajectory_sim=info".into()),
        )
        .init();

    let args = Args::parse();
    if !(args.rate_hz > 0.0 && args.speed > 0.0) {
        bail!("--rate-hz and --speed must be positive");
    }

    let missions = load_mission_file(&args.mission).context("loading mission")?;
    let comparisons = load_comparison_file(&args.comparison).context("loading comparison")?;
    let legs = plan_legs(&missions, &comparisons)?;

    let cfg = SimConfig {
        rate_hz: args.rate_hz,
        ticks_per_leg: args.ticks_per_leg,
        position_noise_m: args.position_noise,
        velocity_noise_mps: args.velocity_noise,
        ..SimConfig::default()
    };
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut sim = FlightSim::new(cfg, rng)?;

    info!("🚁 Flight sim: {} mission legs at {} Hz", legs.len(), args.rate_hz);

    let mut events = sim.leading_phases(args.takeoff_alt);
    for leg in &legs {
        events.extend(sim.fly_leg(leg));
    }

    match &args.dump {
        Some(path) => dump(path, &events),
        None => stream(&args, &events).await,
    }
}

fn dump(path: &Path, events: &[TelemetryEvent]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);
    writeln!(out, "# trajectory-sim telemetry, one envelope per line")?;
    for event in events {
        serde_json::to_writer(&mut out, event)?;
        writeln!(out)?;
    }
    out.flush()?;
    info!("💾 Wrote {} events to {}", events.len(), path.display());
    Ok(())
}

/// Sends one tick's worth of envelopes per interval; a tick ends at each
/// position sample or waypoint advance.
async fn stream(args: &Args, events: &[TelemetryEvent]) -> anyhow::Result<()> {
    let transmitter = TelemetryTransmitter::new(&args.target).context("binding UDP socket")?;
    let tick = Duration::from_secs_f64(1.0 / (args.rate_hz * args.speed));
    let mut ticker = interval(tick);

    info!("📡 Streaming to {} ({}ms per tick)", args.target, tick.as_millis());

    let mut failed = 0usize;
    for event in events {
        if !transmitter.send(event) {
            failed += 1;
        }
        match event {
            TelemetryEvent::Position(_) => {
                ticker.tick().await;
            }
            TelemetryEvent::WaypointReached { label } => {
                info!("✅ Waypoint reached: {}", label.as_deref().unwrap_or("-"));
                ticker.tick().await;
            }
            _ => {}
        }
    }

    if failed > 0 {
        warn!("{failed} of {} envelopes were not sent", events.len());
    }
    info!("🏁 Flight complete");
    Ok(())
}
