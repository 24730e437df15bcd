//! SQL builders for the recordings database, rendered for SQLite.

pub mod ddl;
pub mod recordings;
