use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationResult, ChannelConstraint};
use crate::roi::{adjust_roi, LeverBudget};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Projection {
    /// Spend-weighted ROI of the plan, two decimals.
    pub roi: f64,
    /// Percent change in projected return against the reference plan, one decimal.
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelProjection {
    pub name: String,
    pub current_budget: u64,
    pub size: u64,
    pub base_roi: f64,
    pub roi: f64,
}

pub fn project_channels(
    results: &[AllocationResult],
    channels: &[ChannelConstraint],
    base_rois: &BTreeMap<String, f64>,
    default_roi: f64,
) -> (Projection, Vec<ChannelProjection>) {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        let current_budget = channels
            .iter()
            .find(|c| c.name == result.name)
            .map(|c| c.current_budget)
            .unwrap_or(0);
        let base_roi = base_rois.get(&result.name).copied().unwrap_or(default_roi);
        rows.push(ChannelProjection {
            name: result.name.clone(),
            current_budget,
            size: result.size,
            base_roi,
            roi: adjust_roi(base_roi, current_budget as f64, result.size as f64),
        });
    }

    let spend: f64 = rows.iter().map(|r| r.size as f64).sum();
    let projected: f64 = rows.iter().map(|r| r.size as f64 * r.roi).sum();
    let reference: f64 = rows
        .iter()
        .map(|r| r.current_budget as f64 * r.base_roi)
        .sum();
    (summarize(spend, projected, reference), rows)
}

pub fn project_levers(levers: &[LeverBudget]) -> Projection {
    let spend: f64 = levers.iter().map(|l| l.new_budget() as f64).sum();
    let projected: f64 = levers.iter().map(LeverBudget::projected_return).sum();
    let reference: f64 = levers.iter().map(LeverBudget::reference_return).sum();
    summarize(spend, projected, reference)
}

fn summarize(spend: f64, projected: f64, reference: f64) -> Projection {
    let roi = if spend > 0.0 { projected / spend } else { 0.0 };
    let contribution = if reference > 0.0 {
        (projected - reference) / reference * 100.0
    } else {
        0.0
    };
    Projection {
        roi: round_to(roi, 2),
        contribution: round_to(contribution, 1),
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
