use budget_planner::allocation::{allocate, AllocationError, ChannelConstraint, SeededFactors};
use budget_planner::roi::adjust_roi;
use proptest::prelude::*;

fn channel_strategy() -> impl Strategy<Value = (f64, bool, u64)> {
    (0.0f64..=100.0, any::<bool>(), 0u64..200_000)
}

fn build_channels(specs: &[(f64, bool, u64)]) -> Vec<ChannelConstraint> {
    specs
        .iter()
        .enumerate()
        .map(|(idx, &(max_percent, frozen, current))| {
            let mut channel = ChannelConstraint::new(format!("channel-{idx}"), 0.0, max_percent)
                .with_current_budget(current);
            channel.frozen = frozen;
            channel
        })
        .collect()
}

proptest! {
    #[test]
    fn sizes_sum_to_total_and_frozen_stay_put(
        total in 1u64..5_000_000,
        specs in prop::collection::vec(channel_strategy(), 1..8),
        seed in any::<u64>(),
    ) {
        let channels = build_channels(&specs);
        match allocate(total, &channels, &mut SeededFactors::new(seed)) {
            Ok(results) => {
                prop_assert_eq!(results.len(), channels.len());
                prop_assert_eq!(results.iter().map(|r| r.size).sum::<u64>(), total);
                for (result, channel) in results.iter().zip(&channels) {
                    prop_assert_eq!(&result.name, &channel.name);
                    prop_assert!(result.percentage >= 0.0 && result.percentage <= 100.0);
                    if channel.frozen {
                        prop_assert_eq!(result.size, channel.current_budget);
                    }
                }
            }
            Err(AllocationError::FrozenExceedsBudget { frozen, .. }) => {
                prop_assert!(frozen > total);
            }
            Err(AllocationError::NoAdjustableChannels { .. }) => {
                prop_assert!(channels.iter().all(|c| c.frozen));
            }
            Err(AllocationError::DegenerateWeights { .. }) => {
                prop_assert!(channels
                    .iter()
                    .filter(|c| !c.frozen)
                    .all(|c| c.max_percent == 0.0));
            }
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }

    #[test]
    fn same_seed_same_allocation(
        total in 1_000u64..1_000_000,
        seed in any::<u64>(),
    ) {
        let channels = vec![
            ChannelConstraint::new("Search", 10.0, 50.0),
            ChannelConstraint::new("Social", 5.0, 30.0),
            ChannelConstraint::new("Video", 0.0, 20.0),
        ];
        let a = allocate(total, &channels, &mut SeededFactors::new(seed)).unwrap();
        let b = allocate(total, &channels, &mut SeededFactors::new(seed)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn unchanged_budget_keeps_roi(roi in 0.0f64..50.0, budget in 1.0f64..1e9) {
        prop_assert!((adjust_roi(roi, budget, budget) - roi).abs() < 1e-9);
    }

    #[test]
    fn multiplier_stays_positive(ratio_budget in 0.0f64..1e7, reference in 1.0f64..1e6) {
        let adjusted = adjust_roi(1.0, reference, ratio_budget);
        prop_assert!(adjusted > 0.0);
        prop_assert!(adjusted <= 1.3 + 1e-12);
    }
}
