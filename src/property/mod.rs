// Wed Feb 18 2026 - Alex

pub mod bits;
pub mod codec;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod reference;
pub mod registry;
pub mod state;
pub mod value;

pub use bits::BitSelector;
pub use codec::{CodecContext, Endianness};
pub use descriptor::{PropertyDescriptor, ValueKind};
pub use engine::{PropertyEngine, PropertyProblem};
pub use error::PropertyError;
pub use reference::{Lookup, ReferenceEntry, ReferenceTable, ReferenceTables};
pub use registry::{Property, PropertyRegistry, PropertySnapshot, RegistryError};
pub use state::{ChangedFacets, PropertyState};
pub use value::PropertyValue;
