//! LEB128 readers over a byte cursor.
//!
//! Every reader here advances `*offset` only on success, so a caller can
//! always attribute a failure to the offset it started reading at.
use crate::error::DecodeErrorKind;

/// Reads an unsigned LEB128 value of at most `bits` significant bits.
pub fn read_uleb(bytes: &[u8], offset: &mut usize, bits: u32) -> Result<u64, DecodeErrorKind> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = *bytes.get(*offset).ok_or(DecodeErrorKind::UnexpectedEof)?;
        *offset += 1;
        let low_bits = (byte & 0x7f) as u64;
        if shift < 64 {
            result |= low_bits << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            if shift > bits && (result >> bits) != 0 {
                return Err(DecodeErrorKind::IntegerTooLarge);
            }
            return Ok(result);
        }
        if shift >= 70 {
            return Err(DecodeErrorKind::IntegerTooLarge);
        }
    }
}

/// Reads an unsigned LEB128 `u32`.
pub fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, DecodeErrorKind> {
    read_uleb(bytes, offset, 32).map(|v| v as u32)
}

/// Reads an unsigned LEB128 `u64`.
pub fn read_u64(bytes: &[u8], offset: &mut usize) -> Result<u64, DecodeErrorKind> {
    read_uleb(bytes, offset, 64)
}

/// Reads a signed LEB128 value of at most `bits` significant bits, sign
/// extended to `i64`.
pub fn read_sleb(bytes: &[u8], offset: &mut usize, bits: u32) -> Result<i64, DecodeErrorKind> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;
    let mut byte;
    loop {
        byte = *bytes.get(*offset).ok_or(DecodeErrorKind::UnexpectedEof)?;
        *offset += 1;
        let low_bits = (byte & 0x7f) as i64;
        if shift < 64 {
            result |= low_bits << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
        if shift >= 70 {
            return Err(DecodeErrorKind::IntegerTooLarge);
        }
    }
    if shift < bits.min(64) && (byte & 0x40) != 0 {
        result |= -1i64 << shift;
    }
    Ok(result)
}

/// Reads a signed LEB128 `i32`.
pub fn read_i32(bytes: &[u8], offset: &mut usize) -> Result<i32, DecodeErrorKind> {
    read_sleb(bytes, offset, 32).map(|v| v as i32)
}

/// Reads a signed LEB128 `i64`.
pub fn read_i64(bytes: &[u8], offset: &mut usize) -> Result<i64, DecodeErrorKind> {
    read_sleb(bytes, offset, 64)
}

/// Reads `n` raw bytes.
pub fn read_bytes<'a>(bytes: &'a [u8], offset: &mut usize, n: usize) -> Result<&'a [u8], DecodeErrorKind> {
    let start = *offset;
    let end = start.checked_add(n).ok_or(DecodeErrorKind::UnexpectedEof)?;
    let slice = bytes.get(start..end).ok_or(DecodeErrorKind::UnexpectedEof)?;
    *offset = end;
    Ok(slice)
}

/// Reads a single raw byte.
pub fn read_byte(bytes: &[u8], offset: &mut usize) -> Result<u8, DecodeErrorKind> {
    let byte = *bytes.get(*offset).ok_or(DecodeErrorKind::UnexpectedEof)?;
    *offset += 1;
    Ok(byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb_single_byte() {
        let mut offset = 0;
        assert_eq!(read_u32(&[0x00], &mut offset).unwrap(), 0);
        assert_eq!(offset, 1);

        let mut offset = 0;
        assert_eq!(read_u32(&[0x7f], &mut offset).unwrap(), 127);
    }

    #[test]
    fn uleb_multi_byte() {
        let mut offset = 0;
        // 624485 encoded per the wasm spec's own worked example.
        assert_eq!(read_u32(&[0xe5, 0x8e, 0x26], &mut offset).unwrap(), 624485);
        assert_eq!(offset, 3);
    }

    #[test]
    fn sleb_negative() {
        let mut offset = 0;
        // -624485 per the same worked example.
        assert_eq!(read_i32(&[0x9b, 0xf1, 0x59], &mut offset).unwrap(), -624485);
    }

    #[test]
    fn sleb_small_negative() {
        let mut offset = 0;
        assert_eq!(read_i32(&[0x7f], &mut offset).unwrap(), -1);
    }

    #[test]
    fn truncated_input_fails() {
        let mut offset = 0;
        assert_eq!(read_u32(&[0x80], &mut offset), Err(DecodeErrorKind::UnexpectedEof));
    }
}
