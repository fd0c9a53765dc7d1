//! Block1/Block2 option field packing and Block2 carving (RFC 7959).

use coap_lite::{CoapOption, Packet};

use crate::options::{decode_uint, encode_uint, first_value};

/// Decoded Block1/Block2 option value: `num << 4 | more << 3 | szx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockValue {
    /// 0-based block index (at most 2^20 - 1).
    pub num: u32,
    /// Further blocks exist.
    pub more: bool,
    /// Size exponent; block size is `2^(szx + 4)` bytes, 16..1024.
    pub szx: u8,
}

impl BlockValue {
    const NUM_MAX: u32 = (1 << 20) - 1;
    const SZX_RESERVED: u8 = 7;

    pub fn new(num: u32, more: bool, szx: u8) -> Option<Self> {
        if num > Self::NUM_MAX || szx >= Self::SZX_RESERVED {
            return None;
        }
        Some(Self { num, more, szx })
    }

    /// Decode a raw option value. Zero-length means block 0, size 16,
    /// no more flag. Reserved szx and overlong values are rejected.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        if raw.len() > 3 {
            return None;
        }
        let packed = decode_uint(raw)?;
        Self::new(packed >> 4, packed & 0x8 != 0, (packed & 0x7) as u8)
    }

    /// Minimal-length encoding of the packed field.
    pub fn encode(&self) -> Vec<u8> {
        encode_uint(self.num << 4 | u32::from(self.more) << 3 | u32::from(self.szx))
    }

    /// Block size in bytes.
    pub fn size(&self) -> usize {
        1 << (self.szx as usize + 4)
    }

    /// Byte offset of this block within the full body.
    pub fn offset(&self) -> usize {
        self.num as usize * self.size()
    }
}

/// The request's Block1 or Block2 option, if present and well-formed.
pub fn block_option(packet: &Packet, option: CoapOption) -> Option<BlockValue> {
    first_value(packet, option).and_then(|raw| BlockValue::parse(raw))
}

/// Replace a Block1/Block2 option on an outgoing message.
pub fn set_block_option(packet: &mut Packet, option: CoapOption, value: BlockValue) {
    packet.clear_option(option);
    packet.add_option(option, value.encode());
}

/// Carve the window a Block2 request addresses out of the full body.
/// Returns the slice and whether further blocks exist.
///
/// An offset strictly past the end of the body resets the window to the
/// start (the client asked for a block that does not exist; serve the
/// first block rather than fail). The final block is the one whose end
/// reaches or passes the end of the body.
pub fn carve<'a>(body: &'a [u8], block: BlockValue) -> (&'a [u8], bool) {
    let mut read_from = block.offset();
    if read_from > body.len() {
        read_from = 0;
    }
    let read_to = read_from + block.size();
    if read_to >= body.len() {
        (&body[read_from..], false)
    } else {
        (&body[read_from..read_to], true)
    }
}
