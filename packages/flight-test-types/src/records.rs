//! Mission and comparison records, loaded from TOML files.
//!
//! Both files hold a `[[waypoint]]` array. Records share ordinals: record `i`
//! of the mission file and record `i` of the comparison file describe the same
//! waypoint.
//!
//! ```toml
//! # mission
//! [[waypoint]]
//! label = "Go forward"
//! timeout = 10
//! xy_type = "vel"
//! z_type = "pos"
//! yaw_type = "pos"
//! x_setpoint = 1.0
//! y_setpoint = 0.0
//!
//! # comparison
//! [[waypoint]]
//! x = 10.0
//! y = 0.0
//! z = 5.0
//! yaw = 0.0
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

use crate::{AxisGroup, AxisMode};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("`waypoint` must be an array of tables")]
    NotAWaypointArray,
    #[error("record {ordinal}: missing field `{field}`")]
    MissingField { ordinal: usize, field: &'static str },
    #[error("record {ordinal}: field `{field}` is not numeric ({value})")]
    NonNumeric { ordinal: usize, field: &'static str, value: String },
    #[error("record {ordinal}: `{}` must be \"pos\" or \"vel\", got {value}", .group.field_name())]
    InvalidAxisMode { ordinal: usize, group: AxisGroup, value: String },
    #[error("record {ordinal}: timeout must be a positive whole number of seconds, got {value}")]
    InvalidTimeout { ordinal: usize, value: String },
}

/// One mission waypoint, excluding arming, takeoff and the pre-mission phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionRecord {
    pub label: Option<String>,
    pub timeout_secs: u32,
    pub xy_type: AxisMode,
    pub z_type: AxisMode,
    pub yaw_type: AxisMode,
    pub x_setpoint: f64,
    pub y_setpoint: f64,
}

/// Expected position and heading at the end of one mission waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRecord {
    pub label: Option<String>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

impl ComparisonRecord {
    pub fn position(&self) -> [f64; 4] {
        [self.x, self.y, self.z, self.yaw]
    }
}

pub fn load_mission_file(path: &Path) -> Result<Vec<MissionRecord>, RecordError> {
    parse_mission_records(&read(path)?)
}

pub fn load_comparison_file(path: &Path) -> Result<Vec<ComparisonRecord>, RecordError> {
    parse_comparison_records(&read(path)?)
}

pub fn parse_mission_records(src: &str) -> Result<Vec<MissionRecord>, RecordError> {
    waypoint_tables(src)?
        .iter()
        .enumerate()
        .map(|(ordinal, t)| {
            Ok(MissionRecord {
                label: label(t),
                timeout_secs: timeout(t, ordinal)?,
                xy_type: axis_mode(t, ordinal, AxisGroup::Xy)?,
                z_type: axis_mode(t, ordinal, AxisGroup::Z)?,
                yaw_type: axis_mode(t, ordinal, AxisGroup::Yaw)?,
                x_setpoint: numeric(t, ordinal, "x_setpoint")?,
                y_setpoint: numeric(t, ordinal, "y_setpoint")?,
            })
        })
        .collect()
}

pub fn parse_comparison_records(src: &str) -> Result<Vec<ComparisonRecord>, RecordError> {
    waypoint_tables(src)?
        .iter()
        .enumerate()
        .map(|(ordinal, t)| {
            Ok(ComparisonRecord {
                label: label(t),
                x: numeric(t, ordinal, "x")?,
                y: numeric(t, ordinal, "y")?,
                z: numeric(t, ordinal, "z")?,
                yaw: numeric(t, ordinal, "yaw")?,
            })
        })
        .collect()
}

fn read(path: &Path) -> Result<String, RecordError> {
    std::fs::read_to_string(path).map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn waypoint_tables(src: &str) -> Result<Vec<Table>, RecordError> {
    let doc: Table = toml::from_str(src)?;
    match doc.get("waypoint") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::Table(t) => Ok(t.clone()),
                _ => Err(RecordError::NotAWaypointArray),
            })
            .collect(),
        Some(_) => Err(RecordError::NotAWaypointArray),
    }
}

fn field<'a>(t: &'a Table, ordinal: usize, field: &'static str) -> Result<&'a Value, RecordError> {
    t.get(field).ok_or(RecordError::MissingField { ordinal, field })
}

fn label(t: &Table) -> Option<String> {
    t.get("label").and_then(Value::as_str).map(str::to_string)
}

/// Numbers may be written bare or quoted, as spreadsheet exports tend to do.
fn numeric(t: &Table, ordinal: usize, name: &'static str) -> Result<f64, RecordError> {
    let v = field(t, ordinal, name)?;
    let parsed = match v {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|x| x.is_finite())
        .ok_or_else(|| RecordError::NonNumeric { ordinal, field: name, value: v.to_string() })
}

fn timeout(t: &Table, ordinal: usize) -> Result<u32, RecordError> {
    let v = field(t, ordinal, "timeout")?;
    let parsed = match v {
        Value::Integer(i) => u32::try_from(*i).ok(),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed
        .filter(|secs| *secs > 0)
        .ok_or_else(|| RecordError::InvalidTimeout { ordinal, value: v.to_string() })
}

fn axis_mode(t: &Table, ordinal: usize, group: AxisGroup) -> Result<AxisMode, RecordError> {
    let v = field(t, ordinal, group.field_name())?;
    v.as_str()
        .and_then(|s| AxisMode::parse(s.trim()))
        .ok_or_else(|| RecordError::InvalidAxisMode { ordinal, group, value: v.to_string() })
}
