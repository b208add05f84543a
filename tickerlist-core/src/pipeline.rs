//! One unit of work: fetch → parse → normalize → validate.

use crate::error::BuildError;
use crate::fetch::Fetch;
use crate::normalize::Normalizer;
use crate::parse::{parse_document, RawDocument};
use crate::validate::{Validated, Validator};
use tracing::debug;

/// Everything one build attempt needs besides the fetcher.
#[derive(Debug, Clone)]
pub struct Pipeline {
    url: String,
    normalizer: Normalizer,
    validator: Validator,
}

impl Pipeline {
    pub fn new(url: impl Into<String>, normalizer: Normalizer, validator: Validator) -> Self {
        Self {
            url: url.into(),
            normalizer,
            validator,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Fetch the source and run it through the pipeline.
    pub fn run_once(&self, fetcher: &dyn Fetch) -> Result<Validated, BuildError> {
        let doc = fetcher.fetch(&self.url)?;
        self.process(&doc)
    }

    /// Parse, normalize and validate an already-fetched document.
    pub fn process(&self, doc: &RawDocument) -> Result<Validated, BuildError> {
        let candidates = parse_document(doc)?;
        let symbols = self.normalizer.normalize_all(&candidates);
        debug!(
            candidates = candidates.len(),
            normalized = symbols.len(),
            "normalized candidates"
        );
        Ok(self.validator.validate(symbols)?)
    }
}
