use std::path::PathBuf;

use flight_test_types::records::RecordError;
use flight_test_types::AxisMode;
use thiserror::Error;

/// Fatal problems with the mission, comparison or verifier config input.
/// All of them surface before the first telemetry event is consumed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("mission file: {0}")]
    Mission(#[source] RecordError),
    #[error("comparison file: {0}")]
    Comparison(#[source] RecordError),
    #[error(
        "record {ordinal}: no setpoint type mask for xy={xy}, z={z}, yaw={yaw}"
    )]
    UnknownAxisCombination {
        ordinal: usize,
        xy: AxisMode,
        z: AxisMode,
        yaw: AxisMode,
    },
    #[error("mission has {mission} records but comparison has {comparison}")]
    RecordCountMismatch { mission: usize, comparison: usize },
    #[error("cannot read config {}: {source}", .path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    ConfigToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    InvalidSetting(String),
}
