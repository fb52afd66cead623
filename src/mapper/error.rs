// Sat Feb 21 2026 - Alex

use crate::property::RegistryError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems that abort a mapper load.
#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Failed to read mapper {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse mapper: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Property '{path}' uses unknown reference table '{table}'")]
    UnknownReference { path: String, table: String },
    #[error("Reference table '{table}' has {count} null entries; at most one terminator is allowed")]
    AmbiguousTerminator { table: String, count: usize },
    #[error("Mapper declares no memory ranges and no platform memory size")]
    NoRanges,
}
