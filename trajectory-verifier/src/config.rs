//! Verifier settings, optionally overridden from a TOML file.
//!
//! ```toml
//! timeout_margin = 1.1
//! run_timeout_secs = 10000
//!
//! [position]
//! rtol = 2.0
//! atol = 1.0
//!
//! [velocity]
//! rtol = 1.2
//! atol = 0.1
//! trim = 35
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::ConfigError;
use crate::tolerance::Tolerance;

/// Sized for GPS and flight noise, not a precision check.
pub const POSITION_TOLERANCE: Tolerance = Tolerance::new(2.0, 1.0);
pub const VELOCITY_TOLERANCE: Tolerance = Tolerance::new(1.2, 0.1);
/// Samples dropped from each end of a waypoint's velocity window
/// (acceleration on entry, deceleration on exit).
pub const VELOCITY_TRIM: usize = 35;
pub const TIMEOUT_MARGIN: f64 = 1.1;
pub const RUN_TIMEOUT_SECS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VelocityCheck {
    pub rtol: f64,
    pub atol: f64,
    pub trim: usize,
}

impl VelocityCheck {
    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.rtol, self.atol)
    }
}

impl Default for VelocityCheck {
    fn default() -> Self {
        Self {
            rtol: VELOCITY_TOLERANCE.rtol,
            atol: VELOCITY_TOLERANCE.atol,
            trim: VELOCITY_TRIM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub position: Tolerance,
    pub velocity: VelocityCheck,
    /// Grace factor applied to every waypoint timeout
    pub timeout_margin: f64,
    /// Wall-clock bound on a whole run
    pub run_timeout_secs: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            position: POSITION_TOLERANCE,
            velocity: VelocityCheck::default(),
            timeout_margin: TIMEOUT_MARGIN,
            run_timeout_secs: RUN_TIMEOUT_SECS,
        }
    }
}

impl VerifierConfig {
    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml(&src).map_err(|e| match e {
            ConfigError::ConfigToml { source, .. } => ConfigError::ConfigToml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!("Loaded verifier config from {}", path.display());
        Ok(cfg)
    }

    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(src).map_err(|source| ConfigError::ConfigToml {
            path: "<inline>".into(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let tolerances = [
            ("position.rtol", self.position.rtol),
            ("position.atol", self.position.atol),
            ("velocity.rtol", self.velocity.rtol),
            ("velocity.atol", self.velocity.atol),
        ];
        for (name, v) in tolerances {
            if !(v.is_finite() && v >= 0.0) {
                return Err(ConfigError::InvalidSetting(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if !(self.timeout_margin.is_finite() && self.timeout_margin > 0.0) {
            return Err(ConfigError::InvalidSetting(format!(
                "timeout_margin must be positive, got {}",
                self.timeout_margin
            )));
        }
        if self.run_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting("run_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = VerifierConfig::from_toml("").unwrap();
        assert_eq!(cfg, VerifierConfig::default());
        assert_eq!(cfg.velocity.trim, 35);
        assert_eq!(cfg.position, Tolerance::new(2.0, 1.0));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = VerifierConfig::from_toml(
            r#"
            timeout_margin = 1.5
            [velocity]
            trim = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_margin, 1.5);
        assert_eq!(cfg.velocity.trim, 10);
        assert_eq!(cfg.velocity.rtol, 1.2);
        assert_eq!(cfg.run_timeout_secs, RUN_TIMEOUT_SECS);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let err = VerifierConfig::from_toml("[position]\nrtol = -1.0\natol = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting(_)));
    }

    #[test]
    fn position_section_requires_both_fields() {
        let err = VerifierConfig::from_toml("[position]\nrtol = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::ConfigToml { .. }));
    }
}
