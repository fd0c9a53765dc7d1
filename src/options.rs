use coap_lite::{CoapOption, Packet};

/// Decode a CoAP uint option value (RFC 7252 §3.2): big-endian bytes,
/// zero length meaning zero. Values wider than 32 bits are rejected.
pub fn decode_uint(raw: &[u8]) -> Option<u32> {
    if raw.len() > 4 {
        return None;
    }
    let mut value: u32 = 0;
    for &byte in raw {
        value = (value << 8) | u32::from(byte);
    }
    Some(value)
}

/// Encode a CoAP uint option value with the minimal number of bytes.
/// Zero encodes as the empty value.
pub fn encode_uint(value: u32) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

/// The first value of a repeatable option, if the option is present.
pub fn first_value(packet: &Packet, option: CoapOption) -> Option<&Vec<u8>> {
    packet.get_option(option).and_then(|values| values.front())
}

/// The first value of an option, decoded as a uint.
pub fn uint_option(packet: &Packet, option: CoapOption) -> Option<u32> {
    first_value(packet, option).and_then(|raw| decode_uint(raw))
}

/// Replace an option with a single uint value.
pub fn set_uint_option(packet: &mut Packet, option: CoapOption, value: u32) {
    packet.clear_option(option);
    packet.add_option(option, encode_uint(value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_roundtrip() {
        for value in [0u32, 1, 0x7f, 0xff, 0x100, 0xffff, 0x10000, 0xfffff] {
            assert_eq!(decode_uint(&encode_uint(value)), Some(value));
        }
    }

    #[test]
    fn uint_minimal_length() {
        assert_eq!(encode_uint(0), Vec::<u8>::new());
        assert_eq!(encode_uint(0x2d), vec![0x2d]);
        assert_eq!(encode_uint(0x2b2a), vec![0x2b, 0x2a]);
        assert_eq!(encode_uint(0x012b2a), vec![0x01, 0x2b, 0x2a]);
    }

    #[test]
    fn empty_value_is_zero() {
        assert_eq!(decode_uint(&[]), Some(0));
    }

    #[test]
    fn overlong_value_rejected() {
        assert_eq!(decode_uint(&[1, 2, 3, 4, 5]), None);
    }

    #[test]
    fn option_accessors() {
        let mut packet = Packet::new();
        assert_eq!(uint_option(&packet, CoapOption::ContentFormat), None);

        set_uint_option(&mut packet, CoapOption::ContentFormat, 11050);
        assert_eq!(uint_option(&packet, CoapOption::ContentFormat), Some(11050));

        // set replaces, never accumulates
        set_uint_option(&mut packet, CoapOption::ContentFormat, 50);
        assert_eq!(
            packet.get_option(CoapOption::ContentFormat).unwrap().len(),
            1
        );
        assert_eq!(uint_option(&packet, CoapOption::ContentFormat), Some(50));
    }
}
