pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use store::{MemorySubmissionStore, PgSubmissionStore, SubmissionStore};
