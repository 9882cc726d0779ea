//! Trait definitions for the catalog search repository.

mod document_store;

pub use document_store::DocumentStore;
