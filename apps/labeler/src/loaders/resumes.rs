use std::sync::Arc;

use futures::stream::BoxStream;
use serde_json::Value;
use tracing::debug;

use crate::loaders::{first_text, paged_records, DatasetSource, LoadError, LoadOptions};
use crate::models::TrainingResume;
use crate::registry::DatasetRegistry;
use crate::transform::{ResumeTextTransformer, TransformOptions};

/// Columns that may carry the raw résumé text, in lookup order.
pub const RESUME_TEXT_FIELDS: &[&str] = &["Resume_str", "resume_text", "Resume", "resume", "text"];
pub const RESUME_CATEGORY_FIELDS: &[&str] = &["Category", "category", "label"];

/// Loads raw-text résumé datasets and yields structured `TrainingResume`s.
#[derive(Clone)]
pub struct ResumeLoader {
    registry: Arc<dyn DatasetRegistry>,
    source: DatasetSource,
    transformer: ResumeTextTransformer,
}

impl ResumeLoader {
    pub fn new(registry: Arc<dyn DatasetRegistry>, source: DatasetSource) -> Self {
        Self {
            registry,
            source,
            transformer: ResumeTextTransformer,
        }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Lazily pulls résumés in registry order. Rows without text, outside the
    /// category filter, or rejected by the transformer are skipped.
    pub fn load_resumes(
        &self,
        options: LoadOptions,
    ) -> BoxStream<'static, Result<TrainingResume, LoadError>> {
        let transformer = self.transformer;
        let dataset = self.source.dataset.clone();
        let filter = options.clone();

        paged_records(
            self.registry.clone(),
            self.source.clone(),
            &options,
            move |row| {
                let category = first_text(&row, RESUME_CATEGORY_FIELDS);
                if !filter.matches_category(category.as_deref()) {
                    return None;
                }
                resume_from_row(&row, &dataset, category, &transformer)
            },
        )
    }
}

fn resume_from_row(
    row: &Value,
    dataset: &str,
    category: Option<String>,
    transformer: &ResumeTextTransformer,
) -> Option<TrainingResume> {
    let Some(text) = first_text(row, RESUME_TEXT_FIELDS) else {
        debug!(dataset, "row has no résumé text column, skipping");
        return None;
    };

    let options = TransformOptions {
        category,
        source: Some(dataset.to_string()),
    };
    match transformer.transform(&text, &options) {
        Ok(resume) => Some(resume),
        Err(rejection) => {
            debug!(dataset, %rejection, "résumé row rejected");
            None
        }
    }
}
