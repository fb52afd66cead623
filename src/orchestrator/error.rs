// Sun Feb 22 2026 - Alex

use crate::driver::DriverError;
use crate::mapper::MapperError;
use crate::memory::MemoryError;
use crate::property::PropertyError;
use crate::scripting::HookError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("No mapper is loaded")]
    NotLoaded,
    #[error("Property '{0}' not found")]
    UnknownProperty(String),
    #[error(transparent)]
    Mapper(#[from] MapperError),
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
    #[error(transparent)]
    Property(#[from] PropertyError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
