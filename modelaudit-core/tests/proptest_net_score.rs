//! Property-based tests for net score aggregation and flattening.

use proptest::prelude::*;
use std::collections::BTreeMap;

use modelaudit_core::{
    DEVICES, MetricResult, MetricValue, NetScoreAggregator, ResultSet, Score,
    WeightNormalization, WeightTable, flatten_to_ndjson,
};

const SCALAR_METRICS: [&str; 7] = [
    "license",
    "ramp_up_time",
    "bus_factor",
    "dataset_and_code_score",
    "dataset_quality",
    "code_quality",
    "performance_claims",
];

fn result_set(scores: &[f64], size: f64, latency: u64) -> ResultSet {
    let mut set: ResultSet = SCALAR_METRICS
        .iter()
        .zip(scores)
        .map(|(name, v)| MetricResult::from_score(*name, Score::new(*v), latency))
        .collect();
    let map: BTreeMap<String, f64> = DEVICES.iter().map(|d| (d.to_string(), size)).collect();
    set.insert(MetricResult::from_score(
        "size_score",
        Score::new(MetricValue::Devices(map)),
        latency,
    ));
    set
}

fn net(set: &ResultSet, normalization: WeightNormalization) -> f64 {
    NetScoreAggregator::new(WeightTable::reference(), normalization)
        .aggregate(set)
        .value
        .as_score()
        .unwrap_or(f64::NAN)
}

// --- Aggregation properties ---

proptest! {
    #[test]
    fn net_score_stays_in_unit_interval(
        scores in prop::collection::vec(0.0f64..=1.0, 7),
        size in 0.0f64..=1.0,
    ) {
        let set = result_set(&scores, size, 0);
        for mode in [WeightNormalization::Absolute, WeightNormalization::AppliedWeights] {
            let v = net(&set, mode);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&v), "{mode:?} gave {v}");
        }
    }

    #[test]
    fn aggregation_is_deterministic(
        scores in prop::collection::vec(0.0f64..=1.0, 7),
        size in 0.0f64..=1.0,
    ) {
        let set = result_set(&scores, size, 5);
        prop_assert_eq!(
            net(&set, WeightNormalization::Absolute),
            net(&set, WeightNormalization::Absolute)
        );
    }

    #[test]
    fn reference_table_needs_no_renormalization(
        scores in prop::collection::vec(0.0f64..=1.0, 7),
        size in 0.0f64..=1.0,
    ) {
        let set = result_set(&scores, size, 0);
        let absolute = net(&set, WeightNormalization::Absolute);
        let applied = net(&set, WeightNormalization::AppliedWeights);
        prop_assert!((absolute - applied).abs() < 1e-9);
    }

    #[test]
    fn unweighted_metrics_never_move_the_score(
        scores in prop::collection::vec(0.0f64..=1.0, 7),
        extra in -1.0f64..=1.0,
    ) {
        let base = result_set(&scores, 0.5, 0);
        let mut with_extra = base.clone();
        with_extra.insert(MetricResult::from_score("reviewedness", Score::new(extra), 0));
        prop_assert_eq!(
            net(&base, WeightNormalization::Absolute),
            net(&with_extra, WeightNormalization::Absolute)
        );
    }

    #[test]
    fn net_score_latency_is_reported(scores in prop::collection::vec(0.0f64..=1.0, 7)) {
        let set = result_set(&scores, 1.0, 0);
        let result = NetScoreAggregator::default().aggregate(&set);
        prop_assert_eq!(result.name.as_str(), "net_score");
        prop_assert!(result.latency_ms < 60_000);
    }
}

// --- Flatten properties ---

proptest! {
    #[test]
    fn flatten_emits_value_and_latency_per_metric(
        scores in prop::collection::vec(0.0f64..=1.0, 7),
        latency in 0u64..100_000,
    ) {
        let set = result_set(&scores, 0.3, latency);
        let record = flatten_to_ndjson(&set);
        prop_assert_eq!(record.len(), set.len() * 2);
        for result in set.iter() {
            let key = format!("{}_latency", result.name);
            prop_assert_eq!(record[&key].as_u64(), Some(latency));
            prop_assert!(record.contains_key(&result.name));
        }
    }
}
