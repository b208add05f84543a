//! Built-in seed list: the last resort of the fallback chain.
//!
//! S&P 100 constituents as of the most recent manual review. Written only when
//! the source cannot be read and no previous artifact exists; such a build is
//! still reported as failed.

use crate::normalize::Normalizer;
use crate::symbol::SymbolSet;

/// Seed constituents, written with the `.` class separator.
pub const SEED_SYMBOLS: &[&str] = &[
    "AAPL", "ABBV", "ABT", "ACN", "ADBE", "AIG", "AMD", "AMGN", "AMT", "AMZN", "AVGO", "AXP",
    "BA", "BAC", "BK", "BKNG", "BLK", "BMY", "BRK.B", "C", "CAT", "CHTR", "CL", "CMCSA", "COF",
    "COP", "COST", "CRM", "CSCO", "CVS", "CVX", "DE", "DHR", "DIS", "DUK", "EMR", "F", "FDX",
    "GD", "GE", "GILD", "GM", "GOOG", "GOOGL", "GS", "HD", "HON", "IBM", "INTC", "INTU", "ISRG",
    "JNJ", "JPM", "KHC", "KO", "LIN", "LLY", "LMT", "LOW", "MA", "MCD", "MDLZ", "MDT", "MET",
    "META", "MMM", "MO", "MRK", "MS", "MSFT", "NEE", "NFLX", "NKE", "NOW", "NVDA", "ORCL",
    "PEP", "PFE", "PG", "PLTR", "PM", "PYPL", "QCOM", "RTX", "SBUX", "SCHW", "SO", "SPG", "T",
    "TGT", "TMO", "TMUS", "TSLA", "TXN", "UBER", "UNH", "UNP", "UPS", "USB", "V", "VZ", "WFC",
    "WMT", "XOM",
];

/// Default must-have allowlist: large, long-standing constituents.
pub const DEFAULT_MUST_HAVE: &[&str] = &["AAPL", "MSFT", "AMZN", "NVDA", "JPM", "BRK.B"];

/// The seed list normalized under the given convention.
pub fn seed_set(normalizer: &Normalizer) -> SymbolSet {
    normalizer.normalize_all(SEED_SYMBOLS.iter().copied()).into_iter().collect()
}
