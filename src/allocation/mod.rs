pub mod bounds;
pub mod engine;
pub mod factors;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{allocate, parse_amount, parse_budget};
pub use factors::{FactorSource, FixedFactors, SeededFactors, SequenceFactors};

/// Lower bound of the randomized allocation factor.
pub const FACTOR_FLOOR: f64 = 0.7;
/// Upper bound of the randomized allocation factor.
pub const FACTOR_CEILING: f64 = 1.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConstraint {
    pub name: String,
    pub min_percent: f64,
    pub max_percent: f64,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default)]
    pub current_budget: u64,
}

impl ChannelConstraint {
    pub fn new(name: impl Into<String>, min_percent: f64, max_percent: f64) -> Self {
        Self {
            name: name.into(),
            min_percent,
            max_percent,
            frozen: false,
            current_budget: 0,
        }
    }

    pub fn with_current_budget(mut self, current_budget: u64) -> Self {
        self.current_budget = current_budget;
        self
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn validate(&self) -> Result<(), AllocationError> {
        let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
        if !in_range(self.min_percent) || !in_range(self.max_percent) {
            return Err(AllocationError::InvalidConstraint {
                channel: self.name.clone(),
                reason: "percent bounds must lie within [0, 100]".to_string(),
            });
        }
        if self.min_percent > self.max_percent {
            return Err(AllocationError::InvalidConstraint {
                channel: self.name.clone(),
                reason: format!(
                    "min_percent {} exceeds max_percent {}",
                    self.min_percent, self.max_percent
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationResult {
    pub name: String,
    pub size: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AllocationError {
    #[error("invalid total budget: {0}")]
    InvalidBudget(String),
    #[error("invalid constraint for channel {channel}: {reason}")]
    InvalidConstraint { channel: String, reason: String },
    #[error("duplicate channel name: {0}")]
    DuplicateChannel(String),
    #[error("frozen channels hold {frozen} but the total budget is only {total}")]
    FrozenExceedsBudget { frozen: u64, total: u64 },
    #[error("all adjustable channels have zero weight, cannot place {remaining}")]
    DegenerateWeights { remaining: u64 },
    #[error("no adjustable channels left to absorb {remaining}")]
    NoAdjustableChannels { remaining: u64 },
}

/// Share of `total` as a percentage rounded to one decimal.
pub fn percentage_of(size: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (size as f64 / total as f64 * 1000.0).round() / 10.0
}
