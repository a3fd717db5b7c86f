use std::collections::HashMap;
use std::time::Duration;

use flight_test_types::{
    PositionSample, TelemetryEvent, TestDimension, TypeMask, Verdict, VerdictValue, VelocitySample,
};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::VerifierConfig;
use crate::mission::{MissionModel, WaypointSpec};
use crate::sink::VerdictSink;
use crate::tolerance::round2;

/// Setpoint-type votes for one waypoint, in first-seen order.
type VoteTally = Vec<(TypeMask, u32)>;

/// Mutable state owned by the engine. No internal synchronization: callers
/// must serialize every ingestion and advance call.
#[derive(Debug, Default)]
struct EngineState {
    current_waypoint: u32,
    /// Last position fix, last write wins
    current_position: Option<PositionSample>,
    /// Velocity samples since the last advance
    velocity_buffer: Vec<VelocitySample>,
    /// Kept for the whole run, keyed by waypoint index
    type_votes: HashMap<u32, VoteTally>,
    waypoint_started: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub waypoints_reached: u32,
    pub verdicts: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Aggregates telemetry between waypoint-advance events and, on each advance,
/// verifies the waypoint just completed against the mission model.
pub struct VerificationEngine<S, C> {
    mission: MissionModel,
    config: VerifierConfig,
    state: EngineState,
    sink: S,
    clock: C,
    summary: RunSummary,
}

impl<S: VerdictSink, C: Clock> VerificationEngine<S, C> {
    pub fn new(mission: MissionModel, config: VerifierConfig, sink: S, clock: C) -> Self {
        let state = EngineState {
            waypoint_started: clock.now(),
            ..Default::default()
        };
        Self {
            mission,
            config,
            state,
            sink,
            clock,
            summary: RunSummary::default(),
        }
    }

    pub fn handle(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::Position(p) => self.on_position(p),
            TelemetryEvent::Velocity(v) => self.on_velocity(v),
            TelemetryEvent::SetpointType { type_mask } => self.on_setpoint_type(type_mask),
            TelemetryEvent::WaypointReached { label } => {
                match label {
                    Some(l) => info!("Waypoint {} reached ({l})", self.state.current_waypoint),
                    None => info!("Waypoint {} reached", self.state.current_waypoint),
                }
                self.on_waypoint_advance();
            }
        }
    }

    pub fn on_position(&mut self, sample: PositionSample) {
        self.state.current_position = Some(sample);
    }

    pub fn on_velocity(&mut self, sample: VelocitySample) {
        self.state.velocity_buffer.push(sample);
    }

    pub fn on_setpoint_type(&mut self, type_mask: TypeMask) {
        let tally = self.state.type_votes.entry(self.state.current_waypoint).or_default();
        match tally.iter_mut().find(|(m, _)| *m == type_mask) {
            Some((_, count)) => *count += 1,
            None => tally.push((type_mask, 1)),
        }
    }

    /// Closes the current waypoint: runs the type, position, velocity and
    /// timeout checks (in that order) when the waypoint is tested, then opens
    /// the next one. Returns the number of verdicts emitted.
    pub fn on_waypoint_advance(&mut self) -> usize {
        let now = self.clock.now();
        let mut emitted = 0;

        if self.tests_current_waypoint() {
            if let Some(spec) = self.mission.get(self.state.current_waypoint).cloned() {
                debug!(
                    "Checking waypoint {} ({})",
                    spec.index,
                    spec.label.as_deref().unwrap_or("unlabelled")
                );
                let verdicts = [
                    self.type_test(&spec),
                    self.position_test(&spec),
                    self.velocity_test(&spec),
                    Some(self.timeout_test(&spec, now)),
                ];
                for verdict in verdicts.into_iter().flatten() {
                    self.emit(verdict);
                    emitted += 1;
                }
            }
        }

        self.state.waypoint_started = now;
        self.state.velocity_buffer.clear();
        self.state.current_waypoint += 1;
        self.summary.waypoints_reached += 1;
        emitted
    }

    /// True iff `3 <= current waypoint < total waypoints`.
    pub fn tests_current_waypoint(&self) -> bool {
        self.mission.is_tested(self.state.current_waypoint)
    }

    pub fn current_waypoint(&self) -> u32 {
        self.state.current_waypoint
    }

    pub fn total_waypoints(&self) -> u32 {
        self.mission.total_waypoints()
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn dropped_verdicts(&self) -> usize {
        self.sink.dropped()
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn type_test(&self, spec: &WaypointSpec) -> Option<Verdict> {
        let tally = self.state.type_votes.get(&spec.index);
        let Some(observed) = tally.and_then(|t| majority_vote(t)) else {
            debug!("Waypoint {}: no setpoint types recorded, skipping type test", spec.index);
            return None;
        };
        Some(Verdict::new(
            spec.index,
            TestDimension::Type,
            observed == spec.expected_type_mask,
            VerdictValue::Mask(spec.expected_type_mask),
            VerdictValue::Mask(observed),
        ))
    }

    fn position_test(&self, spec: &WaypointSpec) -> Option<Verdict> {
        let Some(position) = self.state.current_position else {
            warn!("Waypoint {}: no position fix received, skipping position test", spec.index);
            return None;
        };
        let observed = position.as_array();
        let passed = self.config.position.all_close(&observed, &spec.expected_position);
        Some(Verdict::new(
            spec.index,
            TestDimension::Position,
            passed,
            VerdictValue::Vector(spec.expected_position.iter().copied().map(round2).collect()),
            VerdictValue::Vector(observed.iter().copied().map(round2).collect()),
        ))
    }

    fn velocity_test(&self, spec: &WaypointSpec) -> Option<Verdict> {
        let expected = spec.expected_velocity?;
        let window = trim_transients(&self.state.velocity_buffer, self.config.velocity.trim);
        if window.is_empty() {
            warn!(
                "Waypoint {}: only {} velocity samples, need more than {}; skipping velocity test",
                spec.index,
                self.state.velocity_buffer.len(),
                2 * self.config.velocity.trim
            );
            return None;
        }

        let tolerance = self.config.velocity.tolerance();
        let passed = window.iter().all(|v| tolerance.all_close(&v.as_array(), &expected));
        let n = window.len() as f64;
        let mean = [
            window.iter().map(|v| v.vx).sum::<f64>() / n,
            window.iter().map(|v| v.vy).sum::<f64>() / n,
        ];
        Some(Verdict::new(
            spec.index,
            TestDimension::Velocity,
            passed,
            VerdictValue::Vector(expected.iter().copied().map(round2).collect()),
            VerdictValue::Vector(mean.iter().copied().map(round2).collect()),
        ))
    }

    fn timeout_test(&self, spec: &WaypointSpec, now: Duration) -> Verdict {
        let elapsed_secs = now.saturating_sub(self.state.waypoint_started).as_secs_f64();
        let expected = f64::from(spec.expected_timeout_secs);
        let passed = elapsed_secs <= expected * self.config.timeout_margin;
        let observed = if passed {
            VerdictValue::Seconds(expected)
        } else {
            VerdictValue::Text("more".to_string())
        };
        Verdict::new(
            spec.index,
            TestDimension::Timeout,
            passed,
            VerdictValue::Seconds(expected),
            observed,
        )
    }

    fn emit(&mut self, verdict: Verdict) {
        self.summary.verdicts += 1;
        if verdict.passed {
            self.summary.passed += 1;
            info!("{}", verdict.description);
        } else {
            self.summary.failed += 1;
            error!("{}", verdict.description);
        }
        self.sink.publish(verdict);
    }
}

/// Most-voted mask. Ties go to the mask seen first.
pub fn majority_vote(tally: &[(TypeMask, u32)]) -> Option<TypeMask> {
    let mut best: Option<(TypeMask, u32)> = None;
    for &(mask, count) in tally {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((mask, count));
        }
    }
    best.map(|(mask, _)| mask)
}

/// Drops `trim` samples from each end. Empty when there are `2 * trim` or fewer.
pub fn trim_transients(samples: &[VelocitySample], trim: usize) -> &[VelocitySample] {
    if samples.len() <= 2 * trim {
        return &[];
    }
    &samples[trim..samples.len() - trim]
}
