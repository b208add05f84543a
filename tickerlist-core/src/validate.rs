//! Completeness checks over the normalized symbol list.

use crate::error::ValidationError;
use crate::normalize::Normalizer;
use crate::symbol::{ClassSeparator, Symbol, SymbolSet};
use regex::Regex;
use tracing::warn;

/// Default minimum number of symbols for a build to be trusted.
pub const DEFAULT_MIN_COUNT: usize = 80;

/// Structural filter and count policy for a candidate symbol list.
#[derive(Debug, Clone)]
pub struct Validator {
    min_count: usize,
    must_have: Vec<Symbol>,
    max_missing: usize,
    pattern: Regex,
}

/// A symbol set that passed validation, with any non-fatal findings.
#[derive(Debug, Clone)]
pub struct Validated {
    pub symbols: SymbolSet,
    /// Entries dropped by the structural pattern.
    pub rejected: Vec<String>,
    /// Must-have symbols absent from the set.
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validator {
    pub fn new(separator: ClassSeparator, min_count: usize) -> Self {
        let sep = regex::escape(&separator.as_char().to_string());
        let pattern = Regex::new(&format!(r"^[A-Z0-9][A-Z0-9{sep}\-]{{0,9}}$"))
            .expect("symbol pattern");
        Self {
            min_count,
            must_have: Vec::new(),
            max_missing: 0,
            pattern,
        }
    }

    /// Symbols expected in every build. Shortfalls above `max_missing` are warnings only.
    pub fn with_must_have<I, S>(mut self, symbols: I, max_missing: usize, normalizer: &Normalizer) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.must_have = normalizer.normalize_all(symbols);
        self.max_missing = max_missing;
        self
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// Whether a single symbol passes the structural pattern.
    pub fn is_well_formed(&self, symbol: &str) -> bool {
        self.pattern.is_match(symbol)
    }

    /// Whether an already-built set would pass validation unchanged: every
    /// entry well-formed and at least `min_count` of them.
    pub fn accepts(&self, symbols: &SymbolSet) -> bool {
        symbols.len() >= self.min_count && symbols.iter().all(|s| self.is_well_formed(s.as_str()))
    }

    pub fn validate(&self, symbols: Vec<Symbol>) -> Result<Validated, ValidationError> {
        let mut rejected = Vec::new();
        let mut set = SymbolSet::new();
        for symbol in symbols {
            if self.is_well_formed(symbol.as_str()) {
                set.insert(symbol);
            } else {
                rejected.push(symbol.into_string());
            }
        }
        rejected.sort();
        rejected.dedup();

        if set.len() < self.min_count {
            return Err(ValidationError::TooFewSymbols {
                observed: set.len(),
                required: self.min_count,
            });
        }

        let missing: Vec<String> = self
            .must_have
            .iter()
            .filter(|s| !set.contains(s.as_str()))
            .map(|s| s.as_str().to_string())
            .collect();

        let mut warnings = Vec::new();
        if missing.len() > self.max_missing {
            let msg = format!(
                "{} must-have symbols missing (tolerance {}): {}",
                missing.len(),
                self.max_missing,
                missing.join(", ")
            );
            warn!("{msg}");
            warnings.push(msg);
        }

        Ok(Validated {
            symbols: set,
            rejected,
            missing,
            warnings,
        })
    }
}
