//! Error types for the catalog search repository.

mod store_error;

pub use store_error::StoreError;
