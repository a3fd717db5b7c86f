//! Single-consumer event loop. Owns the engine, applies telemetry strictly in
//! channel order and is the only writer of engine state.

use std::time::Duration;

use flight_test_types::TelemetryEvent;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::engine::VerificationEngine;
use crate::sink::VerdictSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Every waypoint of the mission has been closed out
    MissionComplete,
    /// All producers hung up
    ChannelClosed,
    /// The wall-clock bound elapsed
    TimedOut,
}

pub async fn run<S: VerdictSink, C: Clock>(
    engine: &mut VerificationEngine<S, C>,
    mut rx: mpsc::Receiver<TelemetryEvent>,
    run_timeout: Duration,
) -> RunEnd {
    let deadline = tokio::time::sleep(run_timeout);
    tokio::pin!(deadline);

    info!(
        "⏱ Verifying {} waypoints (run timeout {}s)",
        engine.total_waypoints(),
        run_timeout.as_secs()
    );

    loop {
        tokio::select! {
            biased;
            event = rx.recv() => {
                let Some(event) = event else {
                    info!("Telemetry stream closed at waypoint {}", engine.current_waypoint());
                    return RunEnd::ChannelClosed;
                };
                engine.handle(event);
                if engine.current_waypoint() >= engine.total_waypoints() {
                    info!("All {} waypoints reached", engine.total_waypoints());
                    return RunEnd::MissionComplete;
                }
            }
            _ = &mut deadline => {
                warn!(
                    "Run timeout after {}s at waypoint {} of {}",
                    run_timeout.as_secs(),
                    engine.current_waypoint(),
                    engine.total_waypoints()
                );
                return RunEnd::TimedOut;
            }
        }
    }
}
