//! Metric Registry: the ordered set of metrics an engine runs.
//!
//! The registry is an ordinary value built by the composition root; there is
//! no global list. Registration order is preserved and is the order the
//! engine follows in sequential mode.

use crate::error::RegistryError;
use crate::metric::{Metric, NET_SCORE};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct MetricRegistry {
    metrics: Vec<Arc<dyn Metric>>,
    index: HashMap<String, usize>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric. Fails on a duplicate or reserved name.
    pub fn register(&mut self, metric: Arc<dyn Metric>) -> Result<(), RegistryError> {
        let name = metric.name().to_string();
        if name == NET_SCORE {
            return Err(RegistryError::ReservedName { name });
        }
        if self.index.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered { name });
        }
        debug!(metric = %name, "Registering metric");
        self.index.insert(name, self.metrics.len());
        self.metrics.push(metric);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, metric: Arc<dyn Metric>) -> Result<Self, RegistryError> {
        self.register(metric)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Metric>> {
        self.index.get(name).map(|&i| self.metrics[i].clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name().to_string()).collect()
    }

    /// Metrics in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Metric>> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("metrics", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;
    use crate::metric::Score;
    use crate::resources::ModelDescriptor;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Metric for Named {
        fn name(&self) -> &str {
            self.0
        }
        async fn compute(&self, _model: &ModelDescriptor) -> Result<Score, MetricError> {
            Ok(Score::new(1.0))
        }
    }

    #[test]
    fn test_register_preserves_order() {
        let registry = MetricRegistry::new()
            .with(Arc::new(Named("license")))
            .unwrap()
            .with(Arc::new(Named("bus_factor")))
            .unwrap();
        assert_eq!(registry.names(), vec!["license", "bus_factor"]);
        assert!(registry.contains("bus_factor"));
        assert_eq!(registry.get("license").unwrap().name(), "license");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = MetricRegistry::new();
        registry.register(Arc::new(Named("license"))).unwrap();
        let err = registry.register(Arc::new(Named("license"))).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_net_score_is_reserved() {
        let mut registry = MetricRegistry::new();
        let err = registry.register(Arc::new(Named("net_score"))).unwrap_err();
        assert!(matches!(err, RegistryError::ReservedName { .. }));
        assert!(registry.is_empty());
    }
}
