//! Little-endian readers and string decoders for binary records.
use thiserror::Error;

/// Binary parsing error type
#[derive(Debug, Clone, Error)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    #[error("Insufficient data: expected {expected}, got {available}")]
    InsufficientData { expected: usize, available: usize },
}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn slice(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    data.get(offset..offset + len)
        .ok_or(BinaryError::InsufficientData {
            expected: offset + len,
            available: data.len(),
        })
}

/// Read a little-endian u16 at the given offset.
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    let b = slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

/// Read a little-endian u32 at the given offset.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    let b = slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode UTF-16LE text, stopping at the first NUL.
pub fn utf16le_string(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&u| u != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode Windows-1252 text, stopping at the first NUL.
pub fn cp1252_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&data[..end]);
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_le() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert_eq!(read_u16_le(&data, 0).unwrap(), 0x1234);
        assert_eq!(read_u32_le(&data, 0).unwrap(), 0x5678_1234);
        assert!(read_u32_le(&data, 1).is_err());
    }

    #[test]
    fn test_strings() {
        assert_eq!(utf16le_string(&[b'H', 0, b'i', 0, 0, 0, b'x', 0]), "Hi");
        assert_eq!(cp1252_string(&[b'c', b'a', b'f', 0xE9]), "café");
    }
}
