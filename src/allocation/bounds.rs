use serde::{Deserialize, Serialize};

use crate::allocation::{AllocationResult, ChannelConstraint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BoundSide {
    BelowMin,
    AboveMax,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoundViolation {
    pub channel: String,
    pub percentage: f64,
    pub min_percent: f64,
    pub max_percent: f64,
    pub side: BoundSide,
}

/// Lists allocations whose final share falls outside the channel's
/// `[min_percent, max_percent]` window. Frozen channels are skipped since
/// their size is fixed by the user.
pub fn bounds_violations(
    results: &[AllocationResult],
    channels: &[ChannelConstraint],
) -> Vec<BoundViolation> {
    let mut out = Vec::new();
    for result in results {
        let Some(channel) = channels.iter().find(|c| c.name == result.name) else {
            continue;
        };
        if channel.frozen {
            continue;
        }
        let side = if result.percentage < channel.min_percent {
            BoundSide::BelowMin
        } else if result.percentage > channel.max_percent {
            BoundSide::AboveMax
        } else {
            continue;
        };
        out.push(BoundViolation {
            channel: result.name.clone(),
            percentage: result.percentage,
            min_percent: channel.min_percent,
            max_percent: channel.max_percent,
            side,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_both_sides_and_skips_frozen() {
        let channels = vec![
            ChannelConstraint::new("TV", 40.0, 50.0).frozen(),
            ChannelConstraint::new("Digital", 10.0, 20.0),
            ChannelConstraint::new("Social", 30.0, 60.0),
            ChannelConstraint::new("Radio", 5.0, 15.0),
        ];
        let results = vec![
            AllocationResult {
                name: "TV".to_string(),
                size: 10,
                percentage: 10.0,
            },
            AllocationResult {
                name: "Digital".to_string(),
                size: 55,
                percentage: 55.0,
            },
            AllocationResult {
                name: "Social".to_string(),
                size: 25,
                percentage: 25.0,
            },
            AllocationResult {
                name: "Radio".to_string(),
                size: 10,
                percentage: 10.0,
            },
        ];
        let violations = bounds_violations(&results, &channels);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].channel, "Digital");
        assert_eq!(violations[0].side, BoundSide::AboveMax);
        assert_eq!(violations[1].channel, "Social");
        assert_eq!(violations[1].side, BoundSide::BelowMin);
    }
}
