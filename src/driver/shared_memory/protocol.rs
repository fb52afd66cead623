// Sat Feb 21 2026 - Alex

use crate::driver::DriverError;
use crate::memory::Address;
use bytes::{Buf, BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Setup = 0x01,
    Close = 0x02,
    Write = 0x03,
    Ping = 0xFF,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Opcode::Setup),
            0x02 => Some(Opcode::Close),
            0x03 => Some(Opcode::Write),
            0xFF => Some(Opcode::Ping),
            _ => None,
        }
    }
}

/// Where one polled range lands inside the shared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub game_address: Address,
    pub length: u32,
    pub transfer_position: u32,
}

impl BlockLayout {
    /// Byte offset in the shared region for `address`, if this block covers `length` bytes there.
    pub fn offset_of(&self, address: Address, length: usize) -> Option<usize> {
        let delta = address.distance_from(self.game_address)? as usize;
        if delta + length <= self.length as usize {
            Some(self.transfer_position as usize + delta)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Setup { frame_skip: i32, blocks: Vec<BlockLayout> },
    Close,
    Write { address: Address, data: Vec<u8> },
    Ping,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Setup { .. } => Opcode::Setup,
            Instruction::Close => Opcode::Close,
            Instruction::Write { .. } => Opcode::Write,
            Instruction::Ping => Opcode::Ping,
        }
    }

    /// All integers are little-endian.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16);
        buf.put_u8(self.opcode() as u8);

        match self {
            Instruction::Setup { frame_skip, blocks } => {
                buf.put_i32_le(*frame_skip);
                buf.put_u32_le(blocks.len() as u32);
                for block in blocks {
                    buf.put_u32_le(block.game_address.as_u32());
                    buf.put_u32_le(block.length);
                    buf.put_u32_le(block.transfer_position);
                }
            }
            Instruction::Write { address, data } => {
                buf.put_u32_le(address.as_u32());
                buf.put_u32_le(data.len() as u32);
                buf.put_slice(data);
            }
            Instruction::Close | Instruction::Ping => {}
        }

        buf.freeze()
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, DriverError> {
        let mut buf = datagram;
        if !buf.has_remaining() {
            return Err(DriverError::MalformedResponse("empty instruction".to_string()));
        }
        let byte = buf.get_u8();
        let opcode = Opcode::from_byte(byte)
            .ok_or_else(|| DriverError::MalformedResponse(format!("unknown opcode {:#04x}", byte)))?;

        match opcode {
            Opcode::Close => Ok(Instruction::Close),
            Opcode::Ping => Ok(Instruction::Ping),
            Opcode::Setup => {
                need(buf, 8, "setup header")?;
                let frame_skip = buf.get_i32_le();
                let count = buf.get_u32_le() as usize;
                need(buf, count * 12, "setup blocks")?;
                let blocks = (0..count)
                    .map(|_| BlockLayout {
                        game_address: Address::new(buf.get_u32_le()),
                        length: buf.get_u32_le(),
                        transfer_position: buf.get_u32_le(),
                    })
                    .collect();
                Ok(Instruction::Setup { frame_skip, blocks })
            }
            Opcode::Write => {
                need(buf, 8, "write header")?;
                let address = Address::new(buf.get_u32_le());
                let length = buf.get_u32_le() as usize;
                need(buf, length, "write payload")?;
                Ok(Instruction::Write {
                    address,
                    data: buf[..length].to_vec(),
                })
            }
        }
    }
}

fn need(buf: &[u8], bytes: usize, what: &str) -> Result<(), DriverError> {
    if buf.len() < bytes {
        return Err(DriverError::MalformedResponse(format!("truncated {}", what)));
    }
    Ok(())
}

/// Assign consecutive transfer positions to `ranges` in order.
pub fn layout(ranges: &[crate::memory::MemoryRange]) -> Vec<BlockLayout> {
    let mut position = 0u32;
    ranges
        .iter()
        .map(|range| {
            let block = BlockLayout {
                game_address: range.start(),
                length: range.size(),
                transfer_position: position,
            };
            position += range.size();
            block
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRange;

    #[test]
    fn test_setup_wire_format() {
        let blocks = layout(&[
            MemoryRange::new(Address::new(0xC000), 0x10),
            MemoryRange::new(Address::new(0xD000), 0x20),
        ]);
        assert_eq!(blocks[1].transfer_position, 0x10);

        let encoded = Instruction::Setup { frame_skip: -1, blocks: blocks.clone() }.encode();
        assert_eq!(encoded.len(), 1 + 8 + 2 * 12);
        assert_eq!(encoded[0], 0x01);
        assert_eq!(&encoded[1..5], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&encoded[9..13], &[0x00, 0xC0, 0x00, 0x00]);

        assert_eq!(
            Instruction::decode(&encoded).unwrap(),
            Instruction::Setup { frame_skip: -1, blocks }
        );
    }

    #[test]
    fn test_write_wire_format() {
        let encoded = Instruction::Write {
            address: Address::new(0x10),
            data: vec![7, 8],
        }
        .encode();
        assert_eq!(encoded.as_ref(), &[0x03, 0x10, 0, 0, 0, 2, 0, 0, 0, 7, 8]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Instruction::decode(&[]).is_err());
        assert!(Instruction::decode(&[0x42]).is_err());
        assert!(Instruction::decode(&[0x03, 1, 0]).is_err());
        assert!(Instruction::decode(&[0x01, 0, 0, 0, 0, 5, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_block_offsets() {
        let block = BlockLayout {
            game_address: Address::new(0x100),
            length: 0x10,
            transfer_position: 0x40,
        };
        assert_eq!(block.offset_of(Address::new(0x104), 4), Some(0x44));
        assert_eq!(block.offset_of(Address::new(0x10E), 4), None);
        assert_eq!(block.offset_of(Address::new(0xFF), 1), None);
    }
}
