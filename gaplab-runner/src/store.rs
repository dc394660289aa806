//! Bar stores: where the runner gets per-ticker bar series.
//!
//! The `BarStore` trait abstracts over sources so the runner can be driven by
//! CSV files, synthetic sessions or in-memory fixtures:
//! - `CsvBarStore` — a directory of `<TICKER>.csv` files
//! - `SyntheticBarStore` — seeded random-walk sessions (tagged synthetic)
//! - `InMemoryBarStore` — pre-built series, for tests
//!
//! CSV files carry a header `timestamp,open,high,low,close,volume`, where
//! `timestamp` is either epoch milliseconds or an RFC 3339 datetime.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use gaplab_core::domain::{Bar, BarError, BarSeries};
use gaplab_core::session::SessionWindow;
use gaplab_core::synthetic::{generate_sessions, SyntheticConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no bar data for '{ticker}'")]
    NotFound { ticker: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("bad timestamp '{value}' in {}", .path.display())]
    Timestamp { path: PathBuf, value: String },

    #[error(transparent)]
    Bars(#[from] BarError),
}

/// A source of bar series, one per ticker.
pub trait BarStore: Send + Sync {
    fn name(&self) -> &str;

    /// All bars stored for `ticker`, ordered by timestamp.
    fn load(&self, ticker: &str) -> Result<BarSeries, StoreError>;

    /// Whether series from this store are generated rather than recorded.
    fn is_synthetic(&self) -> bool {
        false
    }
}

// ─── CSV directory ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Directory of `<TICKER>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvBarStore {
    dir: PathBuf,
}

impl CsvBarStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", ticker.to_ascii_uppercase()))
    }

    /// Tickers with a CSV file in the directory, uppercased and sorted.
    /// File names match tickers case-insensitively, so `qqq.csv` lists as `QQQ`.
    pub fn tickers(&self) -> Result<Vec<String>, StoreError> {
        let mut tickers: Vec<String> = self
            .csv_files()?
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_ascii_uppercase))
            .collect();
        tickers.sort();
        tickers.dedup();
        Ok(tickers)
    }

    /// The file holding `ticker`: `path_for` if present, otherwise any
    /// `.csv` whose stem equals the ticker ignoring ASCII case.
    fn find_file(&self, ticker: &str) -> Result<Option<PathBuf>, StoreError> {
        let canonical = self.path_for(ticker);
        if canonical.is_file() {
            return Ok(Some(canonical));
        }
        if !self.dir.is_dir() {
            return Ok(None);
        }
        let mut matches: Vec<PathBuf> = self
            .csv_files()?
            .filter(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(ticker))
            })
            .collect();
        matches.sort();
        Ok(matches.into_iter().next())
    }

    fn csv_files(&self) -> Result<impl Iterator<Item = PathBuf>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        Ok(entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))))
    }
}

impl BarStore for CsvBarStore {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, ticker: &str) -> Result<BarSeries, StoreError> {
        let Some(path) = self.find_file(ticker)? else {
            return Err(StoreError::NotFound {
                ticker: ticker.to_string(),
            });
        };
        let file = File::open(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let bars = read_bars_csv(BufReader::new(file), &path)?;
        debug!(ticker, bars = bars.len(), path = %path.display(), "loaded bars");
        Ok(BarSeries::from_unsorted(ticker, bars)?)
    }
}

/// Parse bar rows from CSV. `path` is only used in error messages.
pub fn read_bars_csv<R: std::io::Read>(reader: R, path: &Path) -> Result<Vec<Bar>, StoreError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for result in csv_reader.deserialize() {
        let row: CsvRow = result.map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| StoreError::Timestamp {
            path: path.to_path_buf(),
            value: row.timestamp.clone(),
        })?;
        bars.push(Bar {
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.max(0.0).round() as u64,
        });
    }
    Ok(bars)
}

/// Epoch milliseconds, or an RFC 3339 datetime.
fn parse_timestamp(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.timestamp_millis())
    })
}

/// Write bars in the format `CsvBarStore` reads.
pub fn write_bars_csv<W: std::io::Write>(writer: W, bars: &[Bar]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;
    for b in bars {
        wtr.write_record([
            b.timestamp.to_string(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ─── Synthetic ──────────────────────────────────────────────────────

/// Seeded random-walk sessions. Each ticker gets its own deterministic seed,
/// derived from the master seed independently of load order.
#[derive(Debug, Clone)]
pub struct SyntheticBarStore {
    start: NaiveDate,
    end: NaiveDate,
    window: SessionWindow,
    config: SyntheticConfig,
}

impl SyntheticBarStore {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        window: SessionWindow,
        config: SyntheticConfig,
    ) -> Self {
        Self {
            start,
            end,
            window,
            config,
        }
    }

    /// Per-ticker seed: BLAKE3 over the master seed and ticker.
    pub fn seed_for(&self, ticker: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.config.seed.to_le_bytes());
        hasher.update(ticker.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl BarStore for SyntheticBarStore {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self, ticker: &str) -> Result<BarSeries, StoreError> {
        let config = SyntheticConfig {
            seed: self.seed_for(ticker),
            ..self.config.clone()
        };
        Ok(generate_sessions(
            ticker,
            self.start,
            self.end,
            &self.window,
            &config,
        )?)
    }

    fn is_synthetic(&self) -> bool {
        true
    }
}

// ─── In memory ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InMemoryBarStore {
    series: HashMap<String, BarSeries>,
}

impl InMemoryBarStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: BarSeries) {
        self.series.insert(series.ticker().to_string(), series);
    }
}

impl BarStore for InMemoryBarStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self, ticker: &str) -> Result<BarSeries, StoreError> {
        self.series
            .get(ticker)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                ticker: ticker.to_string(),
            })
    }
}
