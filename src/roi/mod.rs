pub mod lever;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub use lever::LeverBudget;

/// Band of the budget ratio (`new / reference`) that selects a decay formula.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoiBracket {
    /// ratio > 1.5
    SteepIncrease,
    /// 1.2 < ratio <= 1.5
    LargeIncrease,
    /// 1.0 < ratio <= 1.2
    ModerateIncrease,
    /// 0.8 < ratio <= 1.0
    SlightCut,
    /// 0.5 < ratio <= 0.8
    ModerateCut,
    /// ratio <= 0.5
    DeepCut,
}

impl RoiBracket {
    /// Thresholds between brackets, highest first. Each threshold value
    /// belongs to the bracket below it.
    pub const THRESHOLDS: [f64; 5] = [1.5, 1.2, 1.0, 0.8, 0.5];

    pub fn classify(ratio: f64) -> Self {
        if ratio > 1.5 {
            Self::SteepIncrease
        } else if ratio > 1.2 {
            Self::LargeIncrease
        } else if ratio > 1.0 {
            Self::ModerateIncrease
        } else if ratio > 0.8 {
            Self::SlightCut
        } else if ratio > 0.5 {
            Self::ModerateCut
        } else {
            Self::DeepCut
        }
    }

    pub fn multiplier(self, ratio: f64) -> f64 {
        match self {
            Self::SteepIncrease => 0.75 + 0.25 / ratio,
            Self::LargeIncrease => 0.85 + 0.15 / ratio,
            Self::ModerateIncrease => 0.95 + 0.05 / ratio,
            Self::SlightCut => 1.0 + (1.0 - ratio) * 0.1,
            Self::ModerateCut => 1.0 + (1.0 - ratio) * 0.2,
            Self::DeepCut => 1.0 + (1.0 - ratio) * 0.3,
        }
    }
}

impl Display for RoiBracket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::SteepIncrease => "> 1.5",
            Self::LargeIncrease => "(1.2, 1.5]",
            Self::ModerateIncrease => "(1.0, 1.2]",
            Self::SlightCut => "(0.8, 1.0]",
            Self::ModerateCut => "(0.5, 0.8]",
            Self::DeepCut => "<= 0.5",
        };
        write!(f, "{label}")
    }
}

/// `new / reference`, or 1 when there is no usable reference budget.
pub fn budget_ratio(ref_budget: f64, new_budget: f64) -> f64 {
    if ref_budget > 0.0 {
        new_budget / ref_budget
    } else {
        1.0
    }
}

pub fn roi_multiplier(ratio: f64) -> f64 {
    RoiBracket::classify(ratio).multiplier(ratio)
}

/// Scales `base_roi` by the diminishing-returns curve for moving a channel
/// from `ref_budget` to `new_budget`.
pub fn adjust_roi(base_roi: f64, ref_budget: f64, new_budget: f64) -> f64 {
    base_roi * roi_multiplier(budget_ratio(ref_budget, new_budget))
}

/// Inputs and result of one ROI adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RoiQuote {
    pub base_roi: f64,
    pub ref_budget: f64,
    pub new_budget: f64,
    pub ratio: f64,
    pub bracket: RoiBracket,
    pub adjusted_roi: f64,
}

impl RoiQuote {
    pub fn new(base_roi: f64, ref_budget: f64, new_budget: f64) -> Self {
        let ratio = budget_ratio(ref_budget, new_budget);
        let bracket = RoiBracket::classify(ratio);
        Self {
            base_roi,
            ref_budget,
            new_budget,
            ratio,
            bracket,
            adjusted_roi: base_roi * bracket.multiplier(ratio),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundaryJump {
    pub threshold: f64,
    /// Multiplier at the threshold itself.
    pub at: f64,
    /// Limit of the multiplier approaching the threshold from above.
    pub from_above: f64,
    pub jump: f64,
}

/// Size of the step in the multiplier at each bracket threshold.
pub fn boundary_discontinuities() -> Vec<BoundaryJump> {
    RoiBracket::THRESHOLDS
        .iter()
        .map(|&threshold| {
            let at = roi_multiplier(threshold);
            let upper = RoiBracket::classify(next_up(threshold));
            let from_above = upper.multiplier(threshold);
            BoundaryJump {
                threshold,
                at,
                from_above,
                jump: at - from_above,
            }
        })
        .collect()
}

fn next_up(value: f64) -> f64 {
    f64::from_bits(value.to_bits() + 1)
}
