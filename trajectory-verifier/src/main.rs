mod clock;
mod config;
mod dispatcher;
mod engine;
mod error;
mod ingest;
mod mission;
mod report;
mod sink;
mod tolerance;


use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use clock::SystemClock;
use config::VerifierConfig;
use dispatcher::RunEnd;
use engine::{RunSummary, VerificationEngine};
use ingest::IngestConfig;
use mission::MissionModel;
use sink::ChannelSink;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "trajectory-verifier",
    about = "Verifies a scripted flight against its mission, waypoint by waypoint"
)]
struct Args {
    /// Mission file (TOML, one [[waypoint]] per mission step)
    #[arg(long)]
    mission: PathBuf,
    /// Comparison file with the expected position after each step
    #[arg(long)]
    comparison: PathBuf,
    /// Verifier config file (tolerances, run timeout)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// UDP port for telemetry envelopes
    #[arg(long)]
    udp_port: Option<u16>,
    /// Replay a JSON-lines telemetry log instead of listening on UDP
    #[arg(long, conflicts_with = "udp_port")]
    replay: Option<PathBuf>,
    /// Append verdicts as JSON lines to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Wall-clock bound on the whole run, seconds
    #[arg(long)]
    run_timeout_secs: Option<u64>,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trajectory_verifier=info".into()),
        )
        .init();

    let args = Args::parse();

    // Everything that can be misconfigured fails here, before telemetry flows
    let mut cfg = VerifierConfig::load(args.config.as_deref()).context("loading verifier config")?;
    if let Some(secs) = args.run_timeout_secs.or_else(|| {
        std::env::var("VERIFIER_RUN_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok())
    }) {
        cfg.run_timeout_secs = secs;
    }
    let mission = MissionModel::load(&args.mission, &args.comparison).context("loading mission")?;

    let run_id = Uuid::new_v4();
    info!("🛫 Trajectory verifier run {run_id}");

    let (verdict_tx, verdict_rx) = mpsc::channel(mission.max_verdicts());
    let reporter = tokio::spawn(report::run_report_writer(run_id, args.report.clone(), verdict_rx));

    let (telemetry_tx, telemetry_rx) = mpsc::channel(1024);
    let producer = match &args.replay {
        Some(path) => {
            let path = path.clone();
            tokio::spawn(async move {
                if let Err(e) = ingest::replay_file(&path, telemetry_tx).await {
                    error!("Replay of {} failed: {e}", path.display());
                }
            })
        }
        None => {
            let mut ingest_cfg = IngestConfig::default();
            if let Some(port) = args.udp_port {
                ingest_cfg.udp_port = port;
            }
            let socket = ingest::bind_udp(&ingest_cfg).await.context("binding telemetry socket")?;
            tokio::spawn(ingest::run_udp_listener(socket, telemetry_tx))
        }
    };

    let mut engine =
        VerificationEngine::new(mission, cfg, ChannelSink::new(verdict_tx), SystemClock::new());
    let end = dispatcher::run(
        &mut engine,
        telemetry_rx,
        Duration::from_secs(cfg.run_timeout_secs),
    )
    .await;

    let summary = engine.summary();
    let total = engine.total_waypoints();
    let reached = engine.current_waypoint().min(total);
    let dropped = engine.dropped_verdicts();
    // Dropping the engine closes the verdict channel so the report can finish
    drop(engine);
    producer.abort();
    let reported = reporter.await.unwrap_or_default();

    info!(
        "🏁 Run {run_id} ended ({end:?}): {}/{} waypoints, {} verdicts ({} passed, {} failed), {} reported, {} dropped",
        reached,
        total,
        summary.verdicts,
        summary.passed,
        summary.failed,
        reported,
        dropped
    );

    if !run_succeeded(end, &summary, cfg.run_timeout_secs) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// A run passes only when the mission was flown to its last waypoint and no
/// verdict failed.
fn run_succeeded(end: RunEnd, summary: &RunSummary, run_timeout_secs: u64) -> bool {
    if !summary.all_passed() {
        error!("{} verification(s) failed", summary.failed);
        return false;
    }
    match end {
        RunEnd::MissionComplete => true,
        RunEnd::ChannelClosed => {
            error!(
                "Telemetry ended after {} waypoint advances; mission incomplete",
                summary.waypoints_reached
            );
            false
        }
        RunEnd::TimedOut => {
            error!("Mission did not complete within {run_timeout_secs}s");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(waypoints_reached: u32, passed: usize, failed: usize) -> RunSummary {
        RunSummary {
            waypoints_reached,
            verdicts: passed + failed,
            passed,
            failed,
        }
    }

    #[test]
    fn completed_mission_without_failures_succeeds() {
        assert!(run_succeeded(RunEnd::MissionComplete, &summary(5, 8, 0), 60));
    }

    #[test]
    fn failed_verdict_fails_a_completed_mission() {
        assert!(!run_succeeded(RunEnd::MissionComplete, &summary(5, 7, 1), 60));
    }

    #[test]
    fn stream_closed_before_last_waypoint_fails() {
        // Cut-off or unreadable replay: nothing failed because nothing was tested
        assert!(!run_succeeded(RunEnd::ChannelClosed, &summary(1, 0, 0), 60));
        assert!(!run_succeeded(RunEnd::ChannelClosed, &summary(4, 4, 0), 60));
    }

    #[test]
    fn timed_out_run_fails() {
        assert!(!run_succeeded(RunEnd::TimedOut, &summary(3, 0, 0), 60));
    }
}
