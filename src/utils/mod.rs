// Tue Jan 13 2026 - Alex

pub mod logging;

pub use logging::{LoggingUtils, ScopedTimer};

/// `0a 00 ff` style dump used in CLI output and log lines.
pub fn hex_string_spaced(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
