//! URL file parsing and the per-line evaluation loop.

use crate::record::build_record;
use modelaudit_core::{
    CodeResource, DatasetResource, Hub, MetricsEngine, ModelDescriptor, ModelResource,
    NetScoreAggregator, Resource,
};
use modelaudit_metrics::readme::try_readme;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

/// A malformed line in the URL file.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LineError {
    #[error("line {line}: expected 'code_url,dataset_url,model_url', found {fields} field(s)")]
    FieldCount { line: usize, fields: usize },

    #[error("line {line}: model URL is empty")]
    MissingModel { line: usize },
}

/// One `code_url,dataset_url,model_url` line. Empty fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlLine {
    pub line: usize,
    pub code: Option<String>,
    pub dataset: Option<String>,
    pub model: String,
}

fn non_empty(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

/// Parse a URL file. Blank lines are skipped; a line with a single field is
/// taken as a bare model URL.
pub fn parse_url_file(content: &str) -> Vec<Result<UrlLine, LineError>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(idx, raw)| {
            let line = idx + 1;
            let fields: Vec<&str> = raw.split(',').collect();
            let (code, dataset, model) = match fields.as_slice() {
                [model] => (None, None, non_empty(model)),
                [code, dataset, model] => (non_empty(code), non_empty(dataset), non_empty(model)),
                _ => {
                    return Err(LineError::FieldCount {
                        line,
                        fields: fields.len(),
                    });
                }
            };
            let model = model.ok_or(LineError::MissingModel { line })?;
            Ok(UrlLine {
                line,
                code,
                dataset,
                model,
            })
        })
        .collect()
}

/// Resources for a parsed line, backed by the live hub adapters.
pub fn descriptor_for(line: &UrlLine, hub: &Arc<Hub>) -> ModelDescriptor {
    let mut descriptor = ModelDescriptor::new(Arc::new(ModelResource::new(&line.model, hub.clone())));
    if let Some(url) = &line.dataset {
        descriptor = descriptor.with_dataset(Arc::new(DatasetResource::new(url, hub.clone())));
    }
    if let Some(url) = &line.code {
        descriptor = descriptor.with_code(Arc::new(CodeResource::new(url, hub.clone())));
    }
    descriptor
}

/// The previous line's dataset, if the current model's README links to it.
pub async fn shared_dataset(
    current: &ModelDescriptor,
    previous: &ModelDescriptor,
) -> Option<Arc<dyn Resource>> {
    let dataset = previous.dataset.as_ref()?;
    let readme = try_readme(current.model.as_ref()).await?;
    readme.contains(dataset.url()).then(|| dataset.clone())
}

/// Evaluates descriptors in order and writes one JSON line per model.
pub struct BatchRunner {
    engine: MetricsEngine,
    aggregator: NetScoreAggregator,
    include: Option<HashSet<String>>,
}

impl BatchRunner {
    pub fn new(
        engine: MetricsEngine,
        aggregator: NetScoreAggregator,
        include: Option<HashSet<String>>,
    ) -> Self {
        Self {
            engine,
            aggregator,
            include,
        }
    }

    /// The flat record for one model.
    pub async fn evaluate(&self, descriptor: &ModelDescriptor) -> Map<String, Value> {
        let mut results = self
            .engine
            .compute_all_metrics(descriptor, self.include.as_ref())
            .await;
        let net = self.aggregator.apply(&mut results);
        info!(model = %descriptor.name(), net_score = ?net.value, "Model evaluated");
        build_record(&results, &descriptor.name())
    }

    /// Evaluate every descriptor, reusing the previous dataset where the model
    /// card links to it, and return the number of records written.
    pub async fn run<W: Write>(
        &self,
        descriptors: Vec<ModelDescriptor>,
        out: &mut W,
    ) -> anyhow::Result<usize> {
        let mut previous: Option<ModelDescriptor> = None;
        let mut written = 0;
        for mut descriptor in descriptors {
            if descriptor.dataset.is_none()
                && let Some(prev) = &previous
                && let Some(dataset) = shared_dataset(&descriptor, prev).await
            {
                info!(model = %descriptor.name(), dataset = dataset.url(), "Reusing dataset from previous line");
                descriptor.dataset = Some(dataset);
            }

            let record = self.evaluate(&descriptor).await;
            serde_json::to_writer(&mut *out, &Value::Object(record))?;
            writeln!(out)?;
            out.flush()?;
            written += 1;
            previous = Some(descriptor);
        }
        Ok(written)
    }
}

/// Report malformed lines and keep the rest.
pub fn usable_lines(parsed: Vec<Result<UrlLine, LineError>>) -> Vec<UrlLine> {
    parsed
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "Skipping URL line");
                eprintln!("Skipping {e}");
                None
            }
        })
        .collect()
}
