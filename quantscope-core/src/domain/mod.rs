//! Domain types for QuantScope

pub mod bar;
pub mod series;

pub use bar::Bar;
pub use series::{log_returns, Interval, PriceSeries};

/// Symbol type alias
pub type Symbol = String;
