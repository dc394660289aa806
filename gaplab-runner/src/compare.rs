//! Side-by-side metrics for several named trade-result sets.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gaplab_core::domain::Trade;

use crate::metrics::MetricsReport;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    #[error("expected NAME=FILE, got '{0}'")]
    BadSpec(String),
}

/// A `NAME=FILE` argument naming one results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedResultsFile {
    pub name: String,
    pub path: PathBuf,
}

impl FromStr for NamedResultsFile {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = s
            .split_once('=')
            .map(|(n, p)| (n.trim(), p.trim()))
            .filter(|(n, p)| !n.is_empty() && !p.is_empty())
            .ok_or_else(|| CompareError::BadSpec(s.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub name: String,
    pub metrics: MetricsReport,
}

impl StrategyComparison {
    /// True when the set has no closed trades.
    pub fn is_empty(&self) -> bool {
        self.metrics.trade_count == 0
    }
}

/// Aggregate each named set, preserving input order.
pub fn compare<S: AsRef<str>>(sets: &[(S, Vec<Trade>)]) -> Vec<StrategyComparison> {
    sets.iter()
        .map(|(name, trades)| StrategyComparison {
            name: name.as_ref().to_string(),
            metrics: MetricsReport::aggregate(trades),
        })
        .collect()
}

/// The set with the highest expectancy. Sets without trades never win.
pub fn best_by_expectancy(rows: &[StrategyComparison]) -> Option<&StrategyComparison> {
    rows.iter()
        .filter_map(|r| r.metrics.expectancy.map(|e| (r, e)))
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .map(|(r, _)| r)
}
