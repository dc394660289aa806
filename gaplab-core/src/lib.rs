//! GapLab Core — bar series, gap classification, VWAP-reclaim scanning, trade simulation.
//!
//! This crate is pure computation; it never touches the filesystem or network:
//! - Domain types (bars, signals, trades, position sides)
//! - Session windows resolved through IANA time zones
//! - Gap classifier and running VWAP / volume statistics
//! - Per-day signal scanner state machine
//! - Single-position trade simulator with stop / target / time exits
//! - Data-quality warnings and seeded synthetic sessions

pub mod domain;
pub mod gap;
pub mod indicators;
pub mod quality;
pub mod scanner;
pub mod session;
pub mod simulator;
pub mod synthetic;

#[cfg(test)]
mod test_support;

pub use domain::{Bar, BarError, BarSeries, ExitReason, PositionSide, Signal, Trade};
pub use gap::{classify_gap, GapDirection, GapError, GapResult};
pub use scanner::{scan, ScanOutcome, ScanState, ScannerConfig, SkipReason};
pub use session::{SessionError, SessionWindow};
pub use simulator::{simulate, ExitRules, StopFill};
