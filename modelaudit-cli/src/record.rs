//! Output record assembly: labels and key order of the NDJSON line.

use modelaudit_core::{DEVICES, ResultSet, flatten_to_ndjson};
use serde_json::{Map, Value};

pub const CATEGORY: &str = "MODEL";

/// Top-level key order of an output record. Keys not listed follow in their
/// existing order.
pub const RECORD_ORDER: &[&str] = &[
    "name",
    "category",
    "net_score",
    "net_score_latency",
    "ramp_up_time",
    "ramp_up_time_latency",
    "bus_factor",
    "bus_factor_latency",
    "performance_claims",
    "performance_claims_latency",
    "license",
    "license_latency",
    "size_score",
    "size_score_latency",
    "dataset_and_code_score",
    "dataset_and_code_score_latency",
    "dataset_quality",
    "dataset_quality_latency",
    "code_quality",
    "code_quality_latency",
];

/// Flatten a finished result set and label it with the model name.
pub fn build_record(results: &ResultSet, name: &str) -> Map<String, Value> {
    let mut record = flatten_to_ndjson(results);
    record.insert("name".into(), Value::from(name));
    record.insert("category".into(), Value::from(CATEGORY));
    if let Some(Value::Object(devices)) = record.get_mut("size_score") {
        *devices = reorder(std::mem::take(devices), &DEVICES);
    }
    reorder(record, RECORD_ORDER)
}

/// `order` keys first (when present), then the rest as they were.
pub fn reorder(map: Map<String, Value>, order: &[&str]) -> Map<String, Value> {
    let mut rest: Vec<(String, Value)> = map.into_iter().collect();
    let mut out = Map::with_capacity(rest.len());
    for key in order {
        if let Some(pos) = rest.iter().position(|(k, _)| k == key) {
            let (k, v) = rest.remove(pos);
            out.insert(k, v);
        }
    }
    out.extend(rest);
    out
}
