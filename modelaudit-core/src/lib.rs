//! # modelaudit-core
//!
//! Trust scoring for machine-learning model packages: the metric contract and
//! registry, the concurrent metrics engine, net score aggregation, NDJSON
//! flattening, and the hub adapters that supply model, dataset and code
//! artifacts.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod metric;
pub mod net_score;
pub mod registry;
pub mod resources;
pub mod urls;

pub use adapters::Hub;
pub use config::{AuditConfig, EngineConfig, WeightNormalization, load_config};
pub use engine::{MetricsEngine, run_isolated};
pub use error::{AggregateError, AuditError, ConfigError, FetchError, MetricError, RegistryError};
pub use flatten::flatten_to_ndjson;
pub use metric::{
    DEVICE_METRIC, DEVICES, Details, Metric, MetricResult, MetricValue, NET_SCORE, ResultSet, Score,
};
pub use net_score::{NetScoreAggregator, WeightTable};
pub use registry::MetricRegistry;
pub use resources::{
    CodeResource, DatasetResource, LocalResource, Metadata, ModelDescriptor, ModelResource,
    RepoView, Resource, ResourceKind,
};
