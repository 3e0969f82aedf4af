//! Flattening of a result set into a single NDJSON record.

use crate::metric::ResultSet;
use serde_json::{Map, Value};

/// `<name>` → value and `<name>_latency` → integer milliseconds, for every
/// result in name order. Values are emitted as-is.
pub fn flatten_to_ndjson(results: &ResultSet) -> Map<String, Value> {
    let mut record = Map::new();
    for result in results {
        let value = serde_json::to_value(&result.value).unwrap_or(Value::Null);
        record.insert(result.name.clone(), value);
        record.insert(format!("{}_latency", result.name), Value::from(result.latency_ms));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricResult, MetricValue, Score};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_flatten_scalar() {
        let set: ResultSet = [MetricResult::from_score("license", Score::new(0.9), 12)]
            .into_iter()
            .collect();
        assert_eq!(
            Value::Object(flatten_to_ndjson(&set)),
            json!({"license": 0.9, "license_latency": 12})
        );
    }

    #[test]
    fn test_flatten_devices_and_order() {
        let set: ResultSet = [
            MetricResult::from_score("size_score", Score::new(MetricValue::zero_devices()), 3),
            MetricResult::from_score("bus_factor", Score::new(0.25), 0),
        ]
        .into_iter()
        .collect();
        let record = flatten_to_ndjson(&set);
        assert_eq!(
            record.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["bus_factor", "bus_factor_latency", "size_score", "size_score_latency"]
        );
        assert_eq!(record["size_score"]["jetson_nano"], json!(0.0));
    }

    #[test]
    fn test_details_are_not_flattened() {
        let result = MetricResult::failure("license", MetricValue::Score(0.0), 4, "boom");
        let set: ResultSet = [result].into_iter().collect();
        let record = flatten_to_ndjson(&set);
        assert_eq!(record.len(), 2);
        assert!(!record.contains_key("error"));
    }
}
