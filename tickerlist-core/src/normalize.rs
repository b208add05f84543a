//! Candidate → symbol normalization.
//!
//! Steps run in a fixed order: trim, strip `[n]` footnote markers, strip
//! non-breaking spaces, uppercase, drop characters outside `[A-Z0-9./-]`, then
//! remap a trailing share-class letter onto the configured separator. The
//! output alphabet is closed under every step, so normalizing twice is the
//! same as normalizing once.

use crate::symbol::{ClassSeparator, Symbol};
use regex::Regex;
use std::sync::OnceLock;

fn footnote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d+\]").expect("footnote pattern"))
}

fn class_share_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z0-9]+)[./]([A-Z])$").expect("class share pattern"))
}

/// Maps raw candidates to canonical symbols.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    separator: ClassSeparator,
}

impl Normalizer {
    pub fn new(separator: ClassSeparator) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> ClassSeparator {
        self.separator
    }

    /// Normalize one candidate, or `None` when nothing usable remains.
    pub fn normalize(&self, raw: &str) -> Option<Symbol> {
        let trimmed = raw.trim();
        let unfooted = footnote_re().replace_all(trimmed, "");
        let upper = unfooted.replace('\u{00A0}', "").to_uppercase();

        let mut s: String = upper
            .chars()
            .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '/' | '-'))
            .collect();

        if let Some(caps) = class_share_re().captures(&s) {
            s = format!("{}{}{}", &caps[1], self.separator.as_char(), &caps[2]);
        }

        if s.is_empty() {
            None
        } else {
            Some(Symbol::new_unchecked(s))
        }
    }

    /// Normalize every candidate, dropping the ones that normalize to nothing.
    pub fn normalize_all<I, S>(&self, candidates: I) -> Vec<Symbol>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        candidates
            .into_iter()
            .filter_map(|c| self.normalize(c.as_ref()))
            .collect()
    }
}
