//! # flight-test-types
//!
//! Shared telemetry, setpoint-mask and verdict types for the trajectory
//! verification suite.
//!
//! These types are used by:
//! - `trajectory-verifier`: decoding telemetry envelopes, building the mission
//!   model, publishing verdicts
//! - `trajectory-sim`: producing telemetry envelopes for a scripted mission
//!
//! ## Waypoint indexing
//!
//! The first three waypoint indices of every run (arming, takeoff and the
//! pre-mission phase) are not part of the mission file. Mission record `i`
//! therefore describes waypoint `i + MISSION_INDEX_OFFSET`.

pub mod records;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of waypoint indices consumed before the first mission record.
pub const MISSION_INDEX_OFFSET: u32 = 3;

// ── Setpoint Type Masks ───────────────────────────────────────────────────────

/// MAVLink `POSITION_TARGET_TYPEMASK` ignore bits.
pub mod ignore {
    pub const PX: u16 = 1;
    pub const PY: u16 = 2;
    pub const PZ: u16 = 4;
    pub const VX: u16 = 8;
    pub const VY: u16 = 16;
    pub const VZ: u16 = 32;
    pub const AFX: u16 = 64;
    pub const AFY: u16 = 128;
    pub const AFZ: u16 = 256;
    pub const FORCE: u16 = 512;
    pub const YAW: u16 = 1024;
    pub const YAW_RATE: u16 = 2048;

    /// Acceleration is never commanded by the offboard controller.
    pub const ACCEL: u16 = AFX | AFY | AFZ;
}

/// Opaque setpoint type code, as published on the commanded-setpoint stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeMask(pub u16);

impl TypeMask {
    pub const XY_POS_Z_POS_YAW_POS: TypeMask =
        TypeMask(ignore::ACCEL | ignore::VX | ignore::VY | ignore::VZ | ignore::YAW_RATE);
    pub const XY_POS_Z_POS_YAW_RATE: TypeMask =
        TypeMask(ignore::ACCEL | ignore::VX | ignore::VY | ignore::VZ | ignore::YAW);
    pub const XY_VEL_Z_POS_YAW_POS: TypeMask =
        TypeMask(ignore::ACCEL | ignore::PX | ignore::PY | ignore::VZ | ignore::YAW_RATE);
    pub const XY_VEL_Z_POS_YAW_RATE: TypeMask =
        TypeMask(ignore::ACCEL | ignore::PX | ignore::PY | ignore::VZ | ignore::YAW);
    pub const XY_VEL_Z_VEL_YAW_POS: TypeMask =
        TypeMask(ignore::ACCEL | ignore::PX | ignore::PY | ignore::PZ | ignore::YAW_RATE);
    pub const XY_VEL_Z_VEL_YAW_RATE: TypeMask =
        TypeMask(ignore::ACCEL | ignore::PX | ignore::PY | ignore::PZ | ignore::YAW);
    pub const XY_POS_Z_VEL_YAW_POS: TypeMask =
        TypeMask(ignore::ACCEL | ignore::VX | ignore::VY | ignore::PZ | ignore::YAW_RATE);

    /// Mask for a per-axis-group control combination.
    /// Returns `None` for combinations the offboard controller never commands.
    pub fn from_axis_modes(xy: AxisMode, z: AxisMode, yaw: AxisMode) -> Option<Self> {
        use AxisMode::{Pos, Vel};
        match (xy, z, yaw) {
            (Pos, Pos, Pos) => Some(Self::XY_POS_Z_POS_YAW_POS),
            (Pos, Pos, Vel) => Some(Self::XY_POS_Z_POS_YAW_RATE),
            (Vel, Pos, Pos) => Some(Self::XY_VEL_Z_POS_YAW_POS),
            (Vel, Pos, Vel) => Some(Self::XY_VEL_Z_POS_YAW_RATE),
            (Vel, Vel, Pos) => Some(Self::XY_VEL_Z_VEL_YAW_POS),
            (Vel, Vel, Vel) => Some(Self::XY_VEL_Z_VEL_YAW_RATE),
            (Pos, Vel, Pos) => Some(Self::XY_POS_Z_VEL_YAW_POS),
            (Pos, Vel, Vel) => None,
        }
    }
}

impl fmt::Display for TypeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Control mode of one axis group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    Pos,
    Vel,
}

impl AxisMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pos" => Some(Self::Pos),
            "vel" => Some(Self::Vel),
            _ => None,
        }
    }
}

impl fmt::Display for AxisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pos => "pos",
            Self::Vel => "vel",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisGroup {
    Xy,
    Z,
    Yaw,
}

impl AxisGroup {
    /// Field holding this group's mode in a mission record.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Xy => "xy_type",
            Self::Z => "z_type",
            Self::Yaw => "yaw_type",
        }
    }
}

// ── Telemetry ─────────────────────────────────────────────────────────────────

/// Local position fix. `yaw` is the heading proxy taken from the
/// orientation quaternion's z component.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

impl PositionSample {
    pub fn as_array(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.yaw]
    }
}

/// Horizontal local velocity, m/s
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocitySample {
    pub vx: f64,
    pub vy: f64,
}

impl VelocitySample {
    pub fn as_array(&self) -> [f64; 2] {
        [self.vx, self.vy]
    }
}

/// JSON envelope for every telemetry event delivered to the verifier.
///
/// ```json
/// {"kind":"position","x":1.0,"y":2.0,"z":5.0,"yaw":0.0}
/// {"kind":"velocity","vx":1.0,"vy":0.0}
/// {"kind":"setpoint_type","type_mask":2552}
/// {"kind":"waypoint_reached","label":"Takeoff"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Position(PositionSample),
    Velocity(VelocitySample),
    SetpointType {
        type_mask: TypeMask,
    },
    WaypointReached {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

// ── Verdicts ──────────────────────────────────────────────────────────────────

/// One verified aspect of a waypoint, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestDimension {
    #[serde(rename = "target_type")]
    Type,
    #[serde(rename = "wpt_position")]
    Position,
    #[serde(rename = "average_velocity")]
    Velocity,
    #[serde(rename = "timeout")]
    Timeout,
}

impl TestDimension {
    pub const ALL: [TestDimension; 4] = [
        TestDimension::Type,
        TestDimension::Position,
        TestDimension::Velocity,
        TestDimension::Timeout,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Type => "target_type",
            Self::Position => "wpt_position",
            Self::Velocity => "average_velocity",
            Self::Timeout => "timeout",
        }
    }

    /// Phrase placed between "Expected" and the expected value.
    pub fn expectation_phrase(self) -> &'static str {
        match self {
            Self::Type => "type mask",
            Self::Position => "to finish at",
            Self::Velocity => "",
            Self::Timeout => "to finish in",
        }
    }
}

impl fmt::Display for TestDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected or observed value carried by a verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VerdictValue {
    Mask(TypeMask),
    Vector(Vec<f64>),
    Seconds(f64),
    Text(String),
}

impl fmt::Display for VerdictValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mask(m) => write!(f, "{m}"),
            Self::Vector(v) => {
                f.write_str("[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{x}")?;
                }
                f.write_str("]")
            }
            Self::Seconds(s) => write!(f, "{s}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// Outcome of one test dimension for one waypoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub waypoint: u32,
    #[serde(rename = "test_type")]
    pub dimension: TestDimension,
    pub passed: bool,
    pub expected: VerdictValue,
    pub observed: VerdictValue,
    pub description: String,
}

impl Verdict {
    pub fn new(
        waypoint: u32,
        dimension: TestDimension,
        passed: bool,
        expected: VerdictValue,
        observed: VerdictValue,
    ) -> Self {
        let description = describe(waypoint, dimension, passed, &expected, &observed);
        Self { waypoint, dimension, passed, expected, observed, description }
    }
}

fn describe(
    waypoint: u32,
    dimension: TestDimension,
    passed: bool,
    expected: &VerdictValue,
    observed: &VerdictValue,
) -> String {
    let outcome = if passed { "PASSED" } else { "FAILED" };
    let phrase = dimension.expectation_phrase();
    let expectation = if phrase.is_empty() {
        format!("Expected {expected} and got {observed}")
    } else {
        format!("Expected {phrase} {expected} and got {observed}")
    };
    format!(
        "Waypoint {waypoint}: {} TEST {outcome}\nWaypoint {waypoint} {outcome} the {dimension} test.\n{expectation}",
        dimension.name().to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_only_mask_matches_mavros_constant() {
        assert_eq!(TypeMask::XY_POS_Z_POS_YAW_POS, TypeMask(2552));
    }

    #[test]
    fn all_named_masks_are_distinct() {
        let masks = [
            TypeMask::XY_POS_Z_POS_YAW_POS,
            TypeMask::XY_POS_Z_POS_YAW_RATE,
            TypeMask::XY_VEL_Z_POS_YAW_POS,
            TypeMask::XY_VEL_Z_POS_YAW_RATE,
            TypeMask::XY_VEL_Z_VEL_YAW_POS,
            TypeMask::XY_VEL_Z_VEL_YAW_RATE,
            TypeMask::XY_POS_Z_VEL_YAW_POS,
        ];
        for (i, a) in masks.iter().enumerate() {
            for b in &masks[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn xy_pos_z_vel_yaw_vel_has_no_mask() {
        assert_eq!(TypeMask::from_axis_modes(AxisMode::Pos, AxisMode::Vel, AxisMode::Vel), None);
    }

    #[test]
    fn telemetry_envelope_decodes_tagged_json() {
        let ev: TelemetryEvent =
            serde_json::from_str(r#"{"kind":"velocity","vx":1.5,"vy":-0.5}"#).unwrap();
        assert_eq!(ev, TelemetryEvent::Velocity(VelocitySample { vx: 1.5, vy: -0.5 }));

        let ev: TelemetryEvent =
            serde_json::from_str(r#"{"kind":"setpoint_type","type_mask":2552}"#).unwrap();
        assert_eq!(ev, TelemetryEvent::SetpointType { type_mask: TypeMask(2552) });

        let ev: TelemetryEvent = serde_json::from_str(r#"{"kind":"waypoint_reached"}"#).unwrap();
        assert_eq!(ev, TelemetryEvent::WaypointReached { label: None });
    }

    #[test]
    fn verdict_description_names_waypoint_and_outcome() {
        let v = Verdict::new(
            4,
            TestDimension::Timeout,
            false,
            VerdictValue::Seconds(10.0),
            VerdictValue::Text("more".into()),
        );
        assert!(v.description.starts_with("Waypoint 4: TIMEOUT TEST FAILED"));
        assert!(v.description.ends_with("Expected to finish in 10 and got more"));
    }

    #[test]
    fn velocity_description_has_no_phrase_gap() {
        let v = Verdict::new(
            3,
            TestDimension::Velocity,
            true,
            VerdictValue::Vector(vec![1.0, 0.0]),
            VerdictValue::Vector(vec![1.02, 0.0]),
        );
        assert!(v.description.ends_with("Expected [1, 0] and got [1.02, 0]"));
    }

    #[test]
    fn verdict_serializes_wire_names() {
        let v = Verdict::new(
            3,
            TestDimension::Type,
            true,
            VerdictValue::Mask(TypeMask(2552)),
            VerdictValue::Mask(TypeMask(2552)),
        );
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["test_type"], "target_type");
        assert_eq!(json["expected"], 2552);
    }
}
