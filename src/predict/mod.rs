//! Forecasting
//!
//! Next-season scoring from career rows and next-game box-score lines
//! from recent game logs.

pub mod linear;
pub mod season;

pub use linear::{forecast_linear, LinearForecast, LinearTarget, TargetForecast};
pub use season::{forecast_season, ForecastResult};
