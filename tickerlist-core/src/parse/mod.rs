//! Format detection and candidate extraction.
//!
//! A document is offered to a fixed, ordered list of strategies (JSON, CSV,
//! HTML table). The first strategy that applies and yields a non-empty,
//! plausible candidate list wins. A declared content shape moves its strategy
//! to the front of the list.

mod delimited;
mod html;
mod json;

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Content shape of a fetched document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentShape {
    Json,
    Csv,
    Html,
    #[default]
    Unknown,
}

impl DocumentShape {
    /// Infer the shape from an HTTP `Content-Type` value.
    pub fn from_content_type(content_type: &str) -> Self {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if mime.ends_with("json") {
            DocumentShape::Json
        } else if mime == "text/csv" || mime == "application/csv" {
            DocumentShape::Csv
        } else if mime == "text/html" || mime == "application/xhtml+xml" {
            DocumentShape::Html
        } else {
            DocumentShape::Unknown
        }
    }
}

/// Raw payload returned by a fetch.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub body: String,
    pub shape: DocumentShape,
    pub status: u16,
}

impl RawDocument {
    pub fn new(body: impl Into<String>, shape: DocumentShape) -> Self {
        Self {
            body: body.into(),
            shape,
            status: 200,
        }
    }
}

/// One way of reading candidates out of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStrategy {
    Json,
    Csv,
    HtmlTable,
}

impl FormatStrategy {
    pub const DEFAULT_ORDER: [FormatStrategy; 3] =
        [FormatStrategy::Json, FormatStrategy::Csv, FormatStrategy::HtmlTable];

    fn for_shape(shape: DocumentShape) -> Option<Self> {
        match shape {
            DocumentShape::Json => Some(FormatStrategy::Json),
            DocumentShape::Csv => Some(FormatStrategy::Csv),
            DocumentShape::Html => Some(FormatStrategy::HtmlTable),
            DocumentShape::Unknown => None,
        }
    }

    /// Strategy order for a document: declared shape first, then the default order.
    pub fn order_for(shape: DocumentShape) -> Vec<FormatStrategy> {
        let mut order = Vec::with_capacity(Self::DEFAULT_ORDER.len());
        if let Some(first) = Self::for_shape(shape) {
            order.push(first);
        }
        for s in Self::DEFAULT_ORDER {
            if !order.contains(&s) {
                order.push(s);
            }
        }
        order
    }

    /// Whether this strategy can read the payload at all.
    pub fn applies(self, text: &str) -> bool {
        match self {
            FormatStrategy::Json => json::applies(text),
            FormatStrategy::Csv => !looks_like_markup(text),
            FormatStrategy::HtmlTable => html::applies(text),
        }
    }

    pub fn extract(self, text: &str) -> Result<Vec<String>, ParseError> {
        match self {
            FormatStrategy::Json => Ok(json::extract(text)),
            FormatStrategy::Csv => delimited::extract(text),
            FormatStrategy::HtmlTable => html::extract(text),
        }
    }
}

fn looks_like_markup(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

/// At least one candidate could plausibly be a ticker.
fn is_plausible(candidates: &[String]) -> bool {
    candidates.iter().any(|c| {
        let t = c.trim();
        !t.is_empty() && t.chars().count() <= 16 && !t.contains('<')
    })
}

/// Extract candidate strings from a document.
///
/// Returns an empty list when nothing applies; the validator's minimum count
/// rejects that later. Markup without a qualifying table is a `ParseError`.
pub fn parse_document(doc: &RawDocument) -> Result<Vec<String>, ParseError> {
    parse_text(&doc.body, doc.shape)
}

pub fn parse_text(text: &str, shape: DocumentShape) -> Result<Vec<String>, ParseError> {
    let mut first_error = None;

    for strategy in FormatStrategy::order_for(shape) {
        if !strategy.applies(text) {
            continue;
        }
        match strategy.extract(text) {
            Ok(candidates) if is_plausible(&candidates) => {
                debug!(?strategy, count = candidates.len(), "format detected");
                return Ok(candidates);
            }
            Ok(_) => debug!(?strategy, "strategy produced no plausible candidates"),
            Err(e) => {
                debug!(?strategy, error = %e, "strategy failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(Vec::new()),
    }
}
