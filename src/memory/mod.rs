// Mon Feb 16 2026 - Alex

pub mod address;
pub mod error;
pub mod fragment;
pub mod range;
pub mod store;

pub use address::Address;
pub use error::MemoryError;
pub use fragment::MemoryFragment;
pub use range::MemoryRange;
pub use store::{MemoryStore, DEFAULT_NAMESPACE};
