use bytes::BufMut;

use crate::internal::error::{Error, Result};

/// Longest encoding of a 64-bit value: ten groups of seven bits.
const MAX_VARINT_LEN: usize = 10;

/// Maps a signed value onto an unsigned one so that small magnitudes stay small.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Writes an unsigned value as little-endian base-128 groups.
pub fn write_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Writes a signed value in zig-zag varint form (the int and long encoding).
pub fn write_long<B: BufMut>(buf: &mut B, value: i64) {
    write_varint(buf, zigzag_encode(value));
}

/// Reads an unsigned varint; returns the value and the number of bytes consumed.
pub fn read_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (idx, byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        let group = u64::from(byte & 0x7F);
        let shift = 7 * idx as u32;
        if idx == MAX_VARINT_LEN - 1 && group > 1 {
            return Err(Error::Codec("Varint value too large".to_string()));
        }
        value |= group << shift;
        if byte & 0x80 == 0 {
            return Ok((value, idx + 1));
        }
    }
    if data.len() >= MAX_VARINT_LEN {
        Err(Error::Codec("Varint value too large".to_string()))
    } else {
        Err(Error::Codec("Incomplete varint data".to_string()))
    }
}

/// Reads a zig-zag varint long.
pub fn read_long(data: &[u8]) -> Result<(i64, usize)> {
    let (raw, read) = read_varint(data)?;
    Ok((zigzag_decode(raw), read))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_long(&mut buf, value);
        buf
    }

    #[test]
    fn test_zigzag_mapping() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
    }

    #[test]
    fn test_write_long() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(-1), vec![0x01]);
        assert_eq!(encoded(1), vec![0x02]);
        assert_eq!(encoded(-64), vec![0x7F]);
        assert_eq!(encoded(64), vec![0x80, 0x01]);
        assert_eq!(encoded(150), vec![0xAC, 0x02]);
    }

    #[test]
    fn test_read_long() {
        assert_eq!(read_long(&[0x00]).unwrap(), (0, 1));
        assert_eq!(read_long(&[0x7F]).unwrap(), (-64, 1));
        assert_eq!(read_long(&[0xAC, 0x02, 0xFF]).unwrap(), (150, 2));
        assert_eq!(read_long(&encoded(i64::MIN)).unwrap(), (i64::MIN, 10));
    }

    #[test]
    fn test_read_varint_incomplete() {
        assert!(read_varint(&[]).is_err());
        assert!(read_varint(&[0x80]).is_err());
        assert!(read_varint(&[0xFF; 9]).is_err());
    }

    #[test]
    fn test_read_varint_too_large() {
        let data = vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(read_varint(&data).is_err());
        let data = vec![0xFF; 11];
        assert!(read_varint(&data).is_err());
    }
}
