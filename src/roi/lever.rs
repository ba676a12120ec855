use serde::{Deserialize, Serialize};

use crate::roi::{adjust_roi, budget_ratio, RoiBracket};

/// A simulation lever. The reference budget and base ROI are fixed at
/// construction; `roi` tracks `new_budget`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeverBudget {
    name: String,
    ref_budget: u64,
    new_budget: u64,
    base_roi: f64,
    roi: f64,
}

impl LeverBudget {
    pub fn new(name: impl Into<String>, ref_budget: u64, base_roi: f64) -> Self {
        Self {
            name: name.into(),
            ref_budget,
            new_budget: ref_budget,
            base_roi,
            roi: base_roi,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ref_budget(&self) -> u64 {
        self.ref_budget
    }

    pub fn new_budget(&self) -> u64 {
        self.new_budget
    }

    pub fn base_roi(&self) -> f64 {
        self.base_roi
    }

    pub fn roi(&self) -> f64 {
        self.roi
    }

    pub fn set_new_budget(&mut self, new_budget: u64) {
        self.new_budget = new_budget;
        self.roi = adjust_roi(self.base_roi, self.ref_budget as f64, new_budget as f64);
    }

    pub fn ratio(&self) -> f64 {
        budget_ratio(self.ref_budget as f64, self.new_budget as f64)
    }

    pub fn bracket(&self) -> RoiBracket {
        RoiBracket::classify(self.ratio())
    }

    /// Percentage change of `new_budget` against the reference.
    pub fn budget_change_pct(&self) -> f64 {
        if self.ref_budget == 0 {
            return 0.0;
        }
        (self.new_budget as f64 - self.ref_budget as f64) / self.ref_budget as f64 * 100.0
    }

    pub fn projected_return(&self) -> f64 {
        self.new_budget as f64 * self.roi
    }

    pub fn reference_return(&self) -> f64 {
        self.ref_budget as f64 * self.base_roi
    }
}
