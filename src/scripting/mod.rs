// Thu Feb 19 2026 - Alex

pub mod functions;
pub mod hooks;
pub mod transform;

pub use functions::FunctionHooks;
pub use hooks::{HookContext, HookError, HookOutcome, HookProvider, NoHooks};
pub use transform::{ByteTransform, TransformRegistry};
