// Thu Feb 19 2026 - Alex

pub mod correlation;
pub mod error;
pub mod shared_memory;
pub mod static_memory;
pub mod traits;

pub use correlation::CorrelationDriver;
pub use error::DriverError;
pub use shared_memory::SharedMemoryDriver;
pub use static_memory::StaticDriver;
pub use traits::{Driver, MemoryBlock};
