//! # mission
//!
//! Immutable per-waypoint expectations, built once from the mission and
//! comparison records before any telemetry is consumed.
//!
//! Mission record `i` becomes waypoint `i + 3`; indices 0..3 (arming, takeoff,
//! pre-mission) have no entry and are never tested.

use std::collections::BTreeMap;
use std::path::Path;

use flight_test_types::records::{
    load_comparison_file, load_mission_file, ComparisonRecord, MissionRecord,
};
use flight_test_types::{AxisMode, TestDimension, TypeMask, MISSION_INDEX_OFFSET};
use tracing::{debug, info};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct WaypointSpec {
    pub index: u32,
    pub label: Option<String>,
    /// x, y, z, yaw
    pub expected_position: [f64; 4],
    pub expected_type_mask: TypeMask,
    /// `None` when the velocity dimension does not apply to this waypoint
    pub expected_velocity: Option<[f64; 2]>,
    pub expected_timeout_secs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissionModel {
    waypoints: BTreeMap<u32, WaypointSpec>,
}

impl MissionModel {
    pub fn load(mission_path: &Path, comparison_path: &Path) -> Result<Self, ConfigError> {
        let missions = load_mission_file(mission_path).map_err(ConfigError::Mission)?;
        let comparisons = load_comparison_file(comparison_path).map_err(ConfigError::Comparison)?;
        let model = Self::build(&missions, &comparisons)?;
        info!(
            "Loaded mission {} ({} waypoints, {} tested)",
            mission_path.display(),
            model.total_waypoints(),
            model.tested_count()
        );
        for w in model.iter() {
            debug!(
                "  wpt {}: mask {} timeout {}s velocity {:?} at {:?}",
                w.index,
                w.expected_type_mask,
                w.expected_timeout_secs,
                w.expected_velocity,
                w.expected_position
            );
        }
        Ok(model)
    }

    /// Pure: the same records always produce an identical model.
    pub fn build(
        missions: &[MissionRecord],
        comparisons: &[ComparisonRecord],
    ) -> Result<Self, ConfigError> {
        if missions.len() != comparisons.len() {
            return Err(ConfigError::RecordCountMismatch {
                mission: missions.len(),
                comparison: comparisons.len(),
            });
        }

        let mut waypoints = BTreeMap::new();
        for (ordinal, (m, c)) in missions.iter().zip(comparisons).enumerate() {
            let index = ordinal as u32 + MISSION_INDEX_OFFSET;
            let spec = WaypointSpec {
                index,
                label: m.label.clone().or_else(|| c.label.clone()),
                expected_position: c.position(),
                expected_type_mask: resolve_type_mask(ordinal, m.xy_type, m.z_type, m.yaw_type)?,
                expected_velocity: expected_velocity(m),
                expected_timeout_secs: m.timeout_secs,
            };
            waypoints.insert(index, spec);
        }
        Ok(Self { waypoints })
    }

    pub fn get(&self, index: u32) -> Option<&WaypointSpec> {
        self.waypoints.get(&index)
    }

    /// Mission records plus the three untested leading phases.
    pub fn total_waypoints(&self) -> u32 {
        self.waypoints.len() as u32 + MISSION_INDEX_OFFSET
    }

    pub fn is_tested(&self, index: u32) -> bool {
        (MISSION_INDEX_OFFSET..self.total_waypoints()).contains(&index)
    }

    pub fn tested_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Upper bound on verdicts in one run: every dimension of every tested
    /// waypoint. Never zero, so it can size a channel.
    pub fn max_verdicts(&self) -> usize {
        (self.tested_count() * TestDimension::ALL.len()).max(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaypointSpec> {
        self.waypoints.values()
    }
}

pub fn resolve_type_mask(
    ordinal: usize,
    xy: AxisMode,
    z: AxisMode,
    yaw: AxisMode,
) -> Result<TypeMask, ConfigError> {
    TypeMask::from_axis_modes(xy, z, yaw)
        .ok_or(ConfigError::UnknownAxisCombination { ordinal, xy, z, yaw })
}

/// Only a moving, velocity-controlled horizontal group has an expected velocity.
pub fn expected_velocity(record: &MissionRecord) -> Option<[f64; 2]> {
    let moving = record.x_setpoint > 0.0 || record.y_setpoint > 0.0;
    (record.xy_type == AxisMode::Vel && moving).then_some([record.x_setpoint, record.y_setpoint])
}

#[cfg(test)]
mod tests {
    use super::*;
    use AxisMode::{Pos, Vel};

    fn mission(xy: AxisMode, z: AxisMode, yaw: AxisMode, x: f64, y: f64) -> MissionRecord {
        MissionRecord {
            label: None,
            timeout_secs: 10,
            xy_type: xy,
            z_type: z,
            yaw_type: yaw,
            x_setpoint: x,
            y_setpoint: y,
        }
    }

    fn comparison(x: f64, y: f64, z: f64, yaw: f64) -> ComparisonRecord {
        ComparisonRecord { label: None, x, y, z, yaw }
    }

    #[test]
    fn every_table_combination_resolves() {
        let table = [
            (Pos, Pos, Pos, TypeMask::XY_POS_Z_POS_YAW_POS),
            (Pos, Pos, Vel, TypeMask::XY_POS_Z_POS_YAW_RATE),
            (Vel, Pos, Pos, TypeMask::XY_VEL_Z_POS_YAW_POS),
            (Vel, Pos, Vel, TypeMask::XY_VEL_Z_POS_YAW_RATE),
            (Vel, Vel, Pos, TypeMask::XY_VEL_Z_VEL_YAW_POS),
            (Vel, Vel, Vel, TypeMask::XY_VEL_Z_VEL_YAW_RATE),
            (Pos, Vel, Pos, TypeMask::XY_POS_Z_VEL_YAW_POS),
        ];
        for (xy, z, yaw, mask) in table {
            assert_eq!(resolve_type_mask(0, xy, z, yaw).unwrap(), mask);
        }
    }

    #[test]
    fn combination_outside_table_fails_construction() {
        let err = MissionModel::build(
            &[mission(Pos, Pos, Pos, 0.0, 0.0), mission(Pos, Vel, Vel, 0.0, 0.0)],
            &[comparison(0.0, 0.0, 5.0, 0.0), comparison(0.0, 0.0, 5.0, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownAxisCombination { ordinal: 1, xy: Pos, z: Vel, yaw: Vel }
        ));
    }

    #[test]
    fn indices_are_offset_by_three() {
        let model = MissionModel::build(
            &[mission(Pos, Pos, Pos, 0.0, 0.0), mission(Vel, Pos, Pos, 1.0, 0.0)],
            &[comparison(10.0, 0.0, 5.0, 0.0), comparison(20.0, 0.0, 5.0, 0.0)],
        )
        .unwrap();
        assert_eq!(model.total_waypoints(), 5);
        assert!(model.get(2).is_none());
        assert_eq!(model.get(3).unwrap().expected_position, [10.0, 0.0, 5.0, 0.0]);
        assert_eq!(model.get(4).unwrap().expected_position, [20.0, 0.0, 5.0, 0.0]);
        assert!(model.get(5).is_none());
        assert_eq!(model.iter().map(|w| w.index).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn tested_range_excludes_leading_phases_and_overrun() {
        let model = MissionModel::build(
            &[mission(Pos, Pos, Pos, 0.0, 0.0)],
            &[comparison(0.0, 0.0, 5.0, 0.0)],
        )
        .unwrap();
        let tested: Vec<u32> = (0..8).filter(|i| model.is_tested(*i)).collect();
        assert_eq!(tested, vec![3]);
        assert_eq!(model.max_verdicts(), 4);
    }

    #[test]
    fn empty_mission_tests_nothing() {
        let model = MissionModel::build(&[], &[]).unwrap();
        assert_eq!(model.tested_count(), 0);
        assert_eq!(model.total_waypoints(), 3);
        assert!((0..5).all(|i| !model.is_tested(i)));
        assert_eq!(model.max_verdicts(), 1);
    }

    #[test]
    fn velocity_applies_only_when_moving_under_velocity_control() {
        assert_eq!(expected_velocity(&mission(Vel, Pos, Pos, 1.0, 0.0)), Some([1.0, 0.0]));
        assert_eq!(expected_velocity(&mission(Vel, Pos, Pos, 0.0, 0.5)), Some([0.0, 0.5]));
        assert_eq!(expected_velocity(&mission(Vel, Pos, Pos, 0.0, 0.0)), None);
        assert_eq!(expected_velocity(&mission(Vel, Pos, Pos, -1.0, 0.0)), None);
        assert_eq!(expected_velocity(&mission(Pos, Pos, Pos, 1.0, 1.0)), None);
    }

    #[test]
    fn record_count_mismatch_is_rejected() {
        let err = MissionModel::build(&[mission(Pos, Pos, Pos, 0.0, 0.0)], &[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::RecordCountMismatch { mission: 1, comparison: 0 }
        ));
    }

    #[test]
    fn construction_is_deterministic() {
        let missions = [mission(Vel, Vel, Vel, 2.0, 1.0), mission(Pos, Vel, Pos, 0.0, 0.0)];
        let comparisons = [comparison(1.0, 2.0, 3.0, 0.1), comparison(4.0, 5.0, 6.0, 0.2)];
        let a = MissionModel::build(&missions, &comparisons).unwrap();
        let b = MissionModel::build(&missions, &comparisons).unwrap();
        assert_eq!(a, b);
    }
}
