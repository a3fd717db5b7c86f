//! flight_sim.rs — Kinematic vehicle flying a scripted mission
//!
//! Produces the telemetry a flight stack would publish while the mission
//! runs: commanded setpoint type, local velocity and local position on every
//! tick, then a `waypoint_reached` event when the leg ends.
//!
//! - Position moves linearly from the previous target to the leg's target
//! - Velocity equals the xy setpoint on velocity-controlled legs, otherwise
//!   the straight-line velocity implied by the leg
//! - Gaussian noise on position and velocity, like a GPS/EKF fix

use anyhow::{anyhow, Result};
use flight_test_types::records::{ComparisonRecord, MissionRecord};
use flight_test_types::{
    AxisMode, PositionSample, TelemetryEvent, TypeMask, VelocitySample,
};
use rand::Rng;
use rand_distr::{Distribution, Normal};

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Telemetry ticks per second
    pub rate_hz: f64,
    /// Ticks flown per mission leg
    pub ticks_per_leg: usize,
    /// Ticks flown in each of arming, takeoff and pre-mission
    pub ticks_per_phase: usize,
    /// 1σ position noise, meters
    pub position_noise_m: f64,
    /// 1σ velocity noise, m/s
    pub velocity_noise_mps: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rate_hz: 20.0,
            ticks_per_leg: 100,
            ticks_per_phase: 20,
            position_noise_m: 0.05,
            velocity_noise_mps: 0.02,
        }
    }
}

// ── Mission legs ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub label: Option<String>,
    pub mask: TypeMask,
    /// x, y, z, yaw at the end of the leg
    pub target: [f64; 4],
    /// Commanded horizontal velocity on velocity-controlled legs
    pub commanded_velocity: Option<[f64; 2]>,
}

impl Leg {
    pub fn from_records(ordinal: usize, m: &MissionRecord, c: &ComparisonRecord) -> Result<Self> {
        let mask = TypeMask::from_axis_modes(m.xy_type, m.z_type, m.yaw_type).ok_or_else(|| {
            anyhow!(
                "record {ordinal}: no setpoint type for xy={}, z={}, yaw={}",
                m.xy_type, m.z_type, m.yaw_type
            )
        })?;
        Ok(Self {
            label: m.label.clone().or_else(|| c.label.clone()),
            mask,
            target: c.position(),
            commanded_velocity: (m.xy_type == AxisMode::Vel).then_some([m.x_setpoint, m.y_setpoint]),
        })
    }
}

pub fn plan_legs(missions: &[MissionRecord], comparisons: &[ComparisonRecord]) -> Result<Vec<Leg>> {
    if missions.len() != comparisons.len() {
        return Err(anyhow!(
            "mission has {} records but comparison has {}",
            missions.len(),
            comparisons.len()
        ));
    }
    missions
        .iter()
        .zip(comparisons)
        .enumerate()
        .map(|(i, (m, c))| Leg::from_records(i, m, c))
        .collect()
}

// ── Vehicle ───────────────────────────────────────────────────────────────────

pub struct FlightSim<R: Rng> {
    cfg: SimConfig,
    rng: R,
    position_noise: Normal<f64>,
    velocity_noise: Normal<f64>,
    /// Noise-free vehicle state: x, y, z, yaw
    position: [f64; 4],
}

impl<R: Rng> FlightSim<R> {
    pub fn new(cfg: SimConfig, rng: R) -> Result<Self> {
        let position_noise = Normal::new(0.0, cfg.position_noise_m)
            .map_err(|e| anyhow!("position noise: {e}"))?;
        let velocity_noise = Normal::new(0.0, cfg.velocity_noise_mps)
            .map_err(|e| anyhow!("velocity noise: {e}"))?;
        Ok(Self { cfg, rng, position_noise, velocity_noise, position: [0.0; 4] })
    }

    /// Arming, takeoff to `takeoff_alt_m` and the pre-mission hold. Each ends
    /// with a waypoint advance so the first mission leg lands on index 3.
    pub fn leading_phases(&mut self, takeoff_alt_m: f64) -> Vec<TelemetryEvent> {
        let ground = self.position;
        let mut airborne = ground;
        airborne[2] = takeoff_alt_m;

        let mut events = Vec::new();
        events.extend(self.fly_to(ground, TypeMask::XY_POS_Z_POS_YAW_POS, None, self.cfg.ticks_per_phase));
        events.push(reached("Arming"));
        events.extend(self.fly_to(airborne, TypeMask::XY_POS_Z_POS_YAW_POS, None, self.cfg.ticks_per_phase));
        events.push(reached("Takeoff"));
        events.extend(self.fly_to(airborne, TypeMask::XY_POS_Z_POS_YAW_POS, None, self.cfg.ticks_per_phase));
        events.push(reached("Pre-mission"));
        events
    }

    pub fn fly_leg(&mut self, leg: &Leg) -> Vec<TelemetryEvent> {
        let mut events = self.fly_to(leg.target, leg.mask, leg.commanded_velocity, self.cfg.ticks_per_leg);
        events.push(TelemetryEvent::WaypointReached { label: leg.label.clone() });
        events
    }

    fn fly_to(
        &mut self,
        target: [f64; 4],
        mask: TypeMask,
        commanded_velocity: Option<[f64; 2]>,
        ticks: usize,
    ) -> Vec<TelemetryEvent> {
        let start = self.position;
        let ticks = ticks.max(1);
        let duration_s = ticks as f64 / self.cfg.rate_hz;
        let velocity = commanded_velocity.unwrap_or([
            (target[0] - start[0]) / duration_s,
            (target[1] - start[1]) / duration_s,
        ]);

        let mut events = Vec::with_capacity(ticks * 3);
        for tick in 1..=ticks {
            let progress = tick as f64 / ticks as f64;
            for (axis, p) in self.position.iter_mut().enumerate() {
                *p = start[axis] + (target[axis] - start[axis]) * progress;
            }

            events.push(TelemetryEvent::SetpointType { type_mask: mask });
            events.push(TelemetryEvent::Velocity(VelocitySample {
                vx: velocity[0] + self.velocity_noise.sample(&mut self.rng),
                vy: velocity[1] + self.velocity_noise.sample(&mut self.rng),
            }));
            events.push(TelemetryEvent::Position(PositionSample {
                x: self.position[0] + self.position_noise.sample(&mut self.rng),
                y: self.position[1] + self.position_noise.sample(&mut self.rng),
                z: self.position[2] + self.position_noise.sample(&mut self.rng),
                yaw: self.position[3],
            }));
        }
        events
    }
}

fn reached(label: &str) -> TelemetryEvent {
    TelemetryEvent::WaypointReached { label: Some(label.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn records() -> (Vec<MissionRecord>, Vec<ComparisonRecord>) {
        let missions = vec![MissionRecord {
            label: Some("Forward".into()),
            timeout_secs: 10,
            xy_type: AxisMode::Vel,
            z_type: AxisMode::Pos,
            yaw_type: AxisMode::Pos,
            x_setpoint: 1.0,
            y_setpoint: 0.0,
        }];
        let comparisons = vec![ComparisonRecord { label: None, x: 5.0, y: 0.0, z: 5.0, yaw: 0.0 }];
        (missions, comparisons)
    }

    fn quiet_sim() -> FlightSim<StdRng> {
        let cfg = SimConfig { position_noise_m: 0.0, velocity_noise_mps: 0.0, ..Default::default() };
        FlightSim::new(cfg, StdRng::seed_from_u64(7)).unwrap()
    }

    #[test]
    fn leading_phases_advance_three_times() {
        let mut sim = quiet_sim();
        let events = sim.leading_phases(5.0);
        let advances = events
            .iter()
            .filter(|e| matches!(e, TelemetryEvent::WaypointReached { .. }))
            .count();
        assert_eq!(advances, 3);
        assert!(matches!(events.last(), Some(TelemetryEvent::WaypointReached { .. })));
    }

    #[test]
    fn leg_ends_at_target_with_commanded_velocity() {
        let (m, c) = records();
        let legs = plan_legs(&m, &c).unwrap();
        assert_eq!(legs[0].mask, TypeMask::XY_VEL_Z_POS_YAW_POS);

        let mut sim = quiet_sim();
        sim.leading_phases(5.0);
        let events = sim.fly_leg(&legs[0]);
        assert_eq!(events.len(), 100 * 3 + 1);

        let last_position = events.iter().rev().find_map(|e| match e {
            TelemetryEvent::Position(p) => Some(*p),
            _ => None,
        });
        assert_eq!(last_position, Some(PositionSample { x: 5.0, y: 0.0, z: 5.0, yaw: 0.0 }));
        assert!(events.iter().all(|e| match e {
            TelemetryEvent::Velocity(v) => v.vx == 1.0 && v.vy == 0.0,
            _ => true,
        }));
    }

    #[test]
    fn mismatched_record_counts_are_rejected() {
        let (m, _) = records();
        assert!(plan_legs(&m, &[]).is_err());
    }

    #[test]
    fn uncommandable_combination_is_rejected() {
        let (mut m, c) = records();
        m[0].xy_type = AxisMode::Pos;
        m[0].z_type = AxisMode::Vel;
        m[0].yaw_type = AxisMode::Vel;
        assert!(plan_legs(&m, &c).is_err());
    }
}
