//! Index schema: settings with the analysis chain, and per-type mappings.

mod mapping;
mod settings;

pub use mapping::MappingBuilder;
pub use settings::index_settings;
