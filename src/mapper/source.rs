// Sat Feb 21 2026 - Alex

use crate::mapper::{MapperDefinition, MapperError};
use std::fs;
use std::path::{Path, PathBuf};

/// Supplies a mapper definition each time an instance (re)loads.
pub trait DescriptorSource: Send + Sync {
    fn load(&self) -> Result<MapperDefinition, MapperError>;

    fn describe(&self) -> String;
}

/// Mapper stored as a JSON file, re-read on every load.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorSource for JsonFileSource {
    fn load(&self) -> Result<MapperDefinition, MapperError> {
        let text = fs::read_to_string(&self.path).map_err(|source| MapperError::Io {
            path: self.path.clone(),
            source,
        })?;
        MapperDefinition::from_json(&text)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl DescriptorSource for MapperDefinition {
    fn load(&self) -> Result<MapperDefinition, MapperError> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory mapper '{}'", self.metadata.game_name)
    }
}
