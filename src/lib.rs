// Sun Feb 22 2026 - Alex

pub mod config;
pub mod driver;
pub mod mapper;
pub mod memory;
pub mod orchestrator;
pub mod property;
pub mod resolver;
pub mod scripting;
pub mod utils;

pub use config::Config;
pub use driver::{CorrelationDriver, Driver, SharedMemoryDriver, StaticDriver};
pub use mapper::{JsonFileSource, MapperDefinition};
pub use orchestrator::{Instance, InstanceState, NotificationSink};
pub use property::{PropertyEngine, PropertyRegistry, PropertyValue};
