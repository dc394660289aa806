//! Domain types for GapLab

pub mod bar;
pub mod position;
pub mod signal;
pub mod time_of_day;
pub mod trade;

pub use bar::{Bar, BarError, BarSeries};
pub use position::PositionSide;
pub use signal::Signal;
pub use trade::{ExitReason, Trade};
