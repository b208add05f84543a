//! CSV payloads, e.g. a published spreadsheet export.

use crate::error::ParseError;

const HEADER_NAMES: [&str; 2] = ["symbol", "ticker"];

/// Column holding the symbols: the first header named `symbol`, else `ticker`, else 0.
fn symbol_column(header: &csv::StringRecord) -> usize {
    let names: Vec<String> = header
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
        .collect();
    HEADER_NAMES
        .iter()
        .find_map(|want| names.iter().position(|n| n == want))
        .unwrap_or(0)
}

pub(super) fn extract(text: &str) -> Result<Vec<String>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(rec) => rec.map_err(|e| ParseError::InvalidCsv(e.to_string()))?,
        None => return Ok(Vec::new()),
    };
    let idx = symbol_column(&header);

    let mut out = Vec::new();
    for rec in records {
        let rec = rec.map_err(|e| ParseError::InvalidCsv(e.to_string()))?;
        if rec.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if let Some(field) = rec.get(idx) {
            out.push(field.to_string());
        }
    }
    Ok(out)
}
