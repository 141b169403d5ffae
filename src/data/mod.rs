//! Data ingestion and storage
//!
//! Provider access, the SQLite mirror, CSV export and the static team table.

pub mod bulk;
pub mod database;
pub mod export;
pub mod source;
pub mod standings;
pub mod teams;

pub use database::{Database, DatabaseStats};
pub use source::{RetryPolicy, RosterEntry, StatsApiClient, StatsSource};
pub use standings::{rankings, StandingRow};
