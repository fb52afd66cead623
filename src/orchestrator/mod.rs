// Sun Feb 22 2026 - Alex

pub mod cancel;
pub mod error;
pub mod instance;
pub mod notify;

pub use cancel::CancellationToken;
pub use error::InstanceError;
pub use instance::{Instance, InstanceState};
pub use notify::{ChannelSink, LoggingSink, Notification, NotificationSink};
