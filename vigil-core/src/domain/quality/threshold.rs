// vigil-core/src/domain/quality/threshold.rs

use serde::{Deserialize, Serialize};

use crate::domain::quality::check::CheckKind;
use crate::domain::quality::status::Status;

/// Warn/fail boundaries for ratio-based checks, expressed as fractions (0.25 = 25%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub warn: f64,
    pub fail: f64,
}

/// Per-table override; unset fields keep the default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThresholdOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<f64>,
}

impl ThresholdOverride {
    pub fn new(warn: Option<f64>, fail: Option<f64>) -> Self {
        Self { warn, fail }
    }

    pub fn is_empty(&self) -> bool {
        self.warn.is_none() && self.fail.is_none()
    }

    /// Layers `self` over `base`: fields set here win.
    pub fn over(self, base: ThresholdOverride) -> ThresholdOverride {
        ThresholdOverride {
            warn: self.warn.or(base.warn),
            fail: self.fail.or(base.fail),
        }
    }
}

impl ThresholdConfig {
    pub const NULL_RATE: ThresholdConfig = ThresholdConfig {
        warn: 0.10,
        fail: 0.25,
    };

    pub const ROW_COUNT_CHANGE: ThresholdConfig = ThresholdConfig {
        warn: 0.20,
        fail: 0.40,
    };

    /// Fixed defaults; `None` for kinds that are not ratio-based.
    pub fn defaults_for(kind: CheckKind) -> Option<ThresholdConfig> {
        match kind {
            CheckKind::NullRate => Some(Self::NULL_RATE),
            CheckKind::RowCountChange => Some(Self::ROW_COUNT_CHANGE),
            _ => None,
        }
    }

    pub fn merged(self, overrides: &ThresholdOverride) -> ThresholdConfig {
        ThresholdConfig {
            warn: overrides.warn.unwrap_or(self.warn),
            fail: overrides.fail.unwrap_or(self.fail),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.warn.is_finite() || !self.fail.is_finite() {
            return Err(format!(
                "thresholds must be finite numbers (warn={}, fail={})",
                self.warn, self.fail
            ));
        }
        if self.warn < 0.0 || self.fail < 0.0 {
            return Err(format!(
                "thresholds cannot be negative (warn={}, fail={})",
                self.warn, self.fail
            ));
        }
        if self.warn > self.fail {
            return Err(format!(
                "warn threshold {:.1}% is above fail threshold {:.1}%",
                self.warn * 100.0,
                self.fail * 100.0
            ));
        }
        Ok(())
    }

    /// FAIL when `value >= fail`, WARN when `value >= warn`, PASS otherwise.
    pub fn classify(&self, value: f64) -> Status {
        if value >= self.fail {
            Status::Fail
        } else if value >= self.warn {
            Status::Warn
        } else {
            Status::Pass
        }
    }
}
