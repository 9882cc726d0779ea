//! In-memory implementation of the document store.

mod eval;
mod mapping;
mod store;

pub use store::MemoryDocumentStore;
