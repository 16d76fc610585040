// Author: Dustin Pilgrim
// License: MIT

use crate::core::error::{ConfigError, Error};
use crate::core::script::ScriptTemplate;

pub const DEFAULT_IDLE_TIMEOUT: f64 = 600.0;

/// Construction-time settings of the idle controller.
#[derive(Debug, Clone, PartialEq)]
pub struct IdleConfig {
    /// Seconds of inactivity tolerated before the shutdown script runs.
    pub idle_timeout: f64,
    pub gcode: ScriptTemplate,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            gcode: ScriptTemplate::default(),
        }
    }
}

impl IdleConfig {
    pub fn validate(&self) -> Result<(), Error> {
        validate_timeout(self.idle_timeout).map(|_| ())
    }
}

/// Timeouts must be finite and strictly positive.
pub fn validate_timeout(seconds: f64) -> Result<f64, Error> {
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(Error::InvalidConfig(ConfigError::NonPositiveTimeout(seconds)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_negative_and_nan() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(validate_timeout(bad).is_err(), "{bad} should be rejected");
        }
        assert_eq!(validate_timeout(0.25), Ok(0.25));
    }

    #[test]
    fn default_is_ten_minutes() {
        let cfg = IdleConfig::default();
        assert_eq!(cfg.idle_timeout, 600.0);
        assert!(cfg.validate().is_ok());
    }
}
