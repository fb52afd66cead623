// Fri Feb 20 2026 - Alex

use crate::driver::DriverError;
use crate::memory::Address;
use itertools::Itertools;

pub const READ_COMMAND: &str = "READ_CORE_MEMORY";
pub const WRITE_COMMAND: &str = "WRITE_CORE_MEMORY";

/// The peer expects single-digit addresses in decimal and everything else in
/// bare lowercase hex.
pub fn format_address(address: Address) -> String {
    let value = address.as_u32();
    if value < 10 {
        value.to_string()
    } else {
        format!("{:x}", value)
    }
}

pub fn read_command(address: Address, length: usize) -> String {
    format!("{} {} {}", READ_COMMAND, format_address(address), length)
}

pub fn write_command(address: Address, bytes: &[u8]) -> String {
    format!(
        "{} {} {}",
        WRITE_COMMAND,
        format_address(address),
        bytes.iter().map(|b| format!("{:02x}", b)).join(" ")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    /// The peer answered with the `-1` sentinel.
    Error(String),
}

/// Correlation key. Error replies carry no byte count and are keyed without one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    pub command: String,
    pub address: Address,
    pub length: Option<usize>,
}

impl ResponseKey {
    pub fn new(command: &str, address: Address, length: Option<usize>) -> Self {
        Self {
            command: command.to_string(),
            address,
            length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: String,
    pub address: Address,
    pub payload: Payload,
}

impl Response {
    pub fn key(&self) -> ResponseKey {
        let length = match &self.payload {
            Payload::Bytes(bytes) => Some(bytes.len()),
            Payload::Error(_) => None,
        };
        ResponseKey::new(&self.command, self.address, length)
    }
}

/// Parse `"<COMMAND> <hex-address> <byte> <byte> ..."` or `"<COMMAND> <hex-address> -1 ..."`.
pub fn parse_response(datagram: &str) -> Result<Response, DriverError> {
    let mut tokens = datagram.split_whitespace();
    let command = tokens
        .next()
        .ok_or_else(|| DriverError::MalformedResponse("empty datagram".to_string()))?;
    let address_text = tokens
        .next()
        .ok_or_else(|| DriverError::MalformedResponse(format!("missing address in '{}'", datagram.trim())))?;
    let address = u32::from_str_radix(address_text.trim_start_matches("0x"), 16)
        .map(Address::new)
        .map_err(|_| DriverError::MalformedResponse(format!("bad address '{}'", address_text)))?;

    let rest: Vec<&str> = tokens.collect();
    let payload = if rest.first() == Some(&"-1") {
        Payload::Error(rest[1..].join(" "))
    } else {
        let bytes = rest
            .iter()
            .map(|token| u8::from_str_radix(token, 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| DriverError::MalformedResponse(format!("bad byte in '{}'", datagram.trim())))?;
        Payload::Bytes(bytes)
    };

    Ok(Response {
        command: command.to_string(),
        address,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_quirk() {
        assert_eq!(format_address(Address::new(0)), "0");
        assert_eq!(format_address(Address::new(9)), "9");
        assert_eq!(format_address(Address::new(10)), "a");
        assert_eq!(format_address(Address::new(0xD16B)), "d16b");
    }

    #[test]
    fn test_commands() {
        assert_eq!(read_command(Address::new(0x100), 16), "READ_CORE_MEMORY 100 16");
        assert_eq!(read_command(Address::new(3), 2), "READ_CORE_MEMORY 3 2");
        assert_eq!(
            write_command(Address::new(0xC000), &[0x0A, 0xFF]),
            "WRITE_CORE_MEMORY c000 0a ff"
        );
    }

    #[test]
    fn test_parse_bytes() {
        let response = parse_response("READ_CORE_MEMORY d16b 0a 00 ff\n").unwrap();
        assert_eq!(response.address, Address::new(0xD16B));
        assert_eq!(response.payload, Payload::Bytes(vec![0x0A, 0x00, 0xFF]));
        assert_eq!(response.key(), ResponseKey::new(READ_COMMAND, Address::new(0xD16B), Some(3)));
    }

    #[test]
    fn test_parse_sentinel() {
        let response = parse_response("READ_CORE_MEMORY 100 -1 no memory map defined").unwrap();
        assert_eq!(response.payload, Payload::Error("no memory map defined".to_string()));
        assert_eq!(response.key().length, None);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse_response("").is_err());
        assert!(parse_response("READ_CORE_MEMORY").is_err());
        assert!(parse_response("READ_CORE_MEMORY zz 00").is_err());
        assert!(parse_response("READ_CORE_MEMORY 10 0g").is_err());
    }
}
