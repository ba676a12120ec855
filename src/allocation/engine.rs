use std::cmp::Reverse;
use std::collections::BTreeSet;

use tracing::debug;

use crate::allocation::{
    percentage_of, AllocationError, AllocationResult, ChannelConstraint, FactorSource,
};

/// Largest budget that still round-trips exactly through `f64`.
const MAX_BUDGET: f64 = 9_007_199_254_740_992.0;

/// Splits `total_budget` across `channels`.
///
/// Frozen channels keep their current budget. The remainder is spread over
/// the adjustable channels in proportion to `max_percent`, each share scaled
/// by a factor in `[0.7, 1.0]` drawn from `factors`, then rescaled back onto
/// the remainder. Whatever rounding leaves over lands on the largest share, so
/// the sizes always add up to `total_budget` exactly.
///
/// `min_percent`/`max_percent` only weight the split; results may end up
/// outside a channel's window (see [`crate::allocation::bounds`]).
pub fn allocate<F>(
    total_budget: u64,
    channels: &[ChannelConstraint],
    factors: &mut F,
) -> Result<Vec<AllocationResult>, AllocationError>
where
    F: FactorSource + ?Sized,
{
    if total_budget == 0 {
        return Err(AllocationError::InvalidBudget(
            "total budget must be greater than zero".to_string(),
        ));
    }
    if total_budget > MAX_BUDGET as u64 {
        return Err(AllocationError::InvalidBudget(format!(
            "total budget {total_budget} is too large"
        )));
    }
    validate_channels(channels)?;

    let frozen_total = channels
        .iter()
        .filter(|c| c.frozen)
        .try_fold(0u64, |acc, c| acc.checked_add(c.current_budget))
        .unwrap_or(u64::MAX);
    if frozen_total > total_budget {
        return Err(AllocationError::FrozenExceedsBudget {
            frozen: frozen_total,
            total: total_budget,
        });
    }
    let remaining = total_budget - frozen_total;

    let mut sizes = channels
        .iter()
        .map(|c| if c.frozen { c.current_budget } else { 0 })
        .collect::<Vec<_>>();
    let adjustable = channels
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.frozen)
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();

    if remaining > 0 {
        if adjustable.is_empty() {
            return Err(AllocationError::NoAdjustableChannels { remaining });
        }
        let weight_total: f64 = adjustable.iter().map(|&i| channels[i].max_percent).sum();
        if weight_total <= 0.0 {
            return Err(AllocationError::DegenerateWeights { remaining });
        }
        let weights = adjustable
            .iter()
            .map(|&i| channels[i].max_percent / weight_total)
            .collect::<Vec<_>>();

        let placed = spread_remaining(remaining, &weights, factors);
        for (slot, &idx) in adjustable.iter().enumerate() {
            sizes[idx] = placed[slot];
        }
    }

    let results = channels
        .iter()
        .zip(&sizes)
        .map(|(channel, &size)| AllocationResult {
            name: channel.name.clone(),
            size,
            percentage: percentage_of(size, total_budget),
        })
        .collect::<Vec<_>>();

    debug!(
        total_budget,
        frozen_total,
        remaining,
        channels = results.len(),
        "allocated budget"
    );
    Ok(results)
}

/// Parses a user-entered budget such as `"350,000"` or `"$1_200.40"` into
/// whole currency units. Zero is rejected.
pub fn parse_budget(raw: &str) -> Result<u64, AllocationError> {
    let amount = parse_amount(raw)?;
    if amount == 0 {
        return Err(AllocationError::InvalidBudget(format!(
            "{raw:?} must be greater than zero"
        )));
    }
    Ok(amount)
}

/// Like [`parse_budget`] but accepts zero, for cutting a channel entirely.
pub fn parse_amount(raw: &str) -> Result<u64, AllocationError> {
    let sanitized = raw
        .trim()
        .replace([',', '_', '$'], "")
        .trim()
        .to_string();
    let value = sanitized
        .parse::<f64>()
        .map_err(|_| AllocationError::InvalidBudget(format!("{raw:?} is not a number")))?;
    if !value.is_finite() {
        return Err(AllocationError::InvalidBudget(format!(
            "{raw:?} is not a finite number"
        )));
    }
    let rounded = value.round();
    if rounded < 0.0 {
        return Err(AllocationError::InvalidBudget(format!(
            "{raw:?} must not be negative"
        )));
    }
    if rounded > MAX_BUDGET {
        return Err(AllocationError::InvalidBudget(format!("{raw:?} is too large")));
    }
    Ok(rounded as u64)
}

fn validate_channels(channels: &[ChannelConstraint]) -> Result<(), AllocationError> {
    let mut seen = BTreeSet::new();
    for channel in channels {
        channel.validate()?;
        if !seen.insert(channel.name.as_str()) {
            return Err(AllocationError::DuplicateChannel(channel.name.clone()));
        }
    }
    Ok(())
}

fn spread_remaining<F>(remaining: u64, weights: &[f64], factors: &mut F) -> Vec<u64>
where
    F: FactorSource + ?Sized,
{
    let drafts = weights
        .iter()
        .map(|w| {
            let factor = factors.next_factor();
            (remaining as f64 * w * factor).round() as u64
        })
        .collect::<Vec<_>>();
    let draft_total: u64 = drafts.iter().sum();

    let mut placed = if draft_total == 0 {
        vec![0; drafts.len()]
    } else {
        let adjustment = remaining as f64 / draft_total as f64;
        drafts
            .iter()
            .map(|&d| (d as f64 * adjustment).round() as u64)
            .collect::<Vec<_>>()
    };

    let placed_total: u64 = placed.iter().sum();
    let diff = remaining as i128 - placed_total as i128;
    absorb_residual(&mut placed, weights, diff);
    placed
}

/// Pushes `diff` onto the largest share (first one on ties). A negative
/// residual larger than that share spills onto the next largest.
fn absorb_residual(sizes: &mut [u64], weights: &[f64], diff: i128) {
    if diff == 0 || sizes.is_empty() {
        return;
    }
    let mut order = (0..sizes.len()).collect::<Vec<_>>();
    if sizes.iter().all(|&s| s == 0) {
        order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
    } else {
        order.sort_by_key(|&i| Reverse(sizes[i]));
    }

    if diff > 0 {
        sizes[order[0]] += diff as u64;
        return;
    }
    let mut owed = diff.unsigned_abs() as u64;
    for idx in order {
        let take = owed.min(sizes[idx]);
        sizes[idx] -= take;
        owed -= take;
        if owed == 0 {
            break;
        }
    }
}
