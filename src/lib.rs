// Library interface for the server binary and integration tests

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod queries;
pub mod schema;
pub mod serve;
pub mod store;

pub use error::StoreError;
pub use store::{Recording, RecordingStore};
