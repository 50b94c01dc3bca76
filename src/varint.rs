//! Bitcoin "CompactSize" variable-length integer encoding.
//!
//! Grounded in `original_source/test/tables/archives/output.cpp`'s fixture
//! bytes for `table::output::slab`: a zero `value` serializes as the
//! single byte `0x00`, while `0xdebc9a7856341202` serializes as
//! `0xff` followed by the 8-byte little-endian value. This is the classic
//! satoshi wire integer, used for every variable-length payload in the
//! slab tables (output scripts, `outs`/`txs` link lists, filter bytes).

/// Encoded byte length of `value` under CompactSize.
pub fn encoded_len(value: u64) -> usize {
    match value {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

pub fn write(value: u64, buf: &mut Vec<u8>) {
    match value {
        0..=0xFC => buf.push(value as u8),
        0xFD..=0xFFFF => {
            buf.push(0xFD);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xFFFF_FFFF => {
            buf.push(0xFE);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xFF);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Reads one CompactSize integer from the front of `data`, returning the
/// value and the number of bytes consumed, or `None` if `data` is too
/// short to hold the prefix it claims.
pub fn read(data: &[u8]) -> Option<(u64, usize)> {
    let prefix = *data.first()?;
    match prefix {
        0..=0xFC => Some((prefix as u64, 1)),
        0xFD => {
            let bytes = data.get(1..3)?;
            Some((u16::from_le_bytes(bytes.try_into().ok()?) as u64, 3))
        }
        0xFE => {
            let bytes = data.get(1..5)?;
            Some((u32::from_le_bytes(bytes.try_into().ok()?) as u64, 5))
        }
        0xFF => {
            let bytes = data.get(1..9)?;
            Some((u64::from_le_bytes(bytes.try_into().ok()?), 9))
        }
    }
}

/// Write a length-prefixed byte string: CompactSize length, then the bytes.
pub fn write_bytes(bytes: &[u8], buf: &mut Vec<u8>) {
    write(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

/// Read a length-prefixed byte string written by [`write_bytes`].
pub fn read_bytes(data: &[u8]) -> Option<(&[u8], usize)> {
    let (len, consumed) = read(data)?;
    let len = len as usize;
    let body = data.get(consumed..consumed + len)?;
    Some((body, consumed + len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_one_byte() {
        let mut buf = Vec::new();
        write(0, &mut buf);
        assert_eq!(buf, vec![0x00]);
        assert_eq!(read(&buf), Some((0, 1)));
    }

    #[test]
    fn large_value_matches_fixture() {
        let mut buf = Vec::new();
        write(0xdebc_9a78_5634_1202, &mut buf);
        assert_eq!(
            buf,
            vec![0xff, 0x02, 0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde]
        );
        assert_eq!(read(&buf), Some((0xdebc_9a78_5634_1202, 9)));
    }

    #[test]
    fn boundary_widths() {
        assert_eq!(encoded_len(0xFC), 1);
        assert_eq!(encoded_len(0xFD), 3);
        assert_eq!(encoded_len(0xFFFF), 3);
        assert_eq!(encoded_len(0x1_0000), 5);
        assert_eq!(encoded_len(0xFFFF_FFFF), 5);
        assert_eq!(encoded_len(0x1_0000_0000), 9);
    }

    #[test]
    fn bytes_round_trip() {
        let mut buf = Vec::new();
        write_bytes(b"hello", &mut buf);
        let (out, consumed) = read_bytes(&buf).unwrap();
        assert_eq!(out, b"hello");
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn truncated_input_is_none() {
        assert_eq!(read(&[0xff, 0x01]), None);
        assert_eq!(read(&[]), None);
    }
}
