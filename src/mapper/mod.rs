// Sat Feb 21 2026 - Alex

pub mod definition;
pub mod error;
pub mod source;

pub use definition::{CompiledMapper, GlobalHooks, MapperDefinition, MapperMetadata, PlatformOptions};
pub use error::MapperError;
pub use source::{DescriptorSource, JsonFileSource};
