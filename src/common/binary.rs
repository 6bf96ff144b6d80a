//! Binary data helpers shared across the engine.
//!
//! Little-endian integer access for on-disk fields and the UTF-16LE name
//! codec used by directory entries.

use zerocopy::{FromBytes, LE, U16, U32, U64};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    InsufficientData { expected: usize, available: usize },
    /// UTF-16 payload has an odd length
    InvalidUtf16(String),
}

impl std::fmt::Display for BinaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryError::InsufficientData {
                expected,
                available,
            } => write!(
                f,
                "Insufficient data: expected {}, got {}",
                expected, available
            ),
            BinaryError::InvalidUtf16(msg) => write!(f, "Invalid UTF-16: {}", msg),
        }
    }
}

impl std::error::Error for BinaryError {}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

#[inline]
fn window(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset.checked_add(len).unwrap_or(usize::MAX);
    if end > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: end,
            available: data.len(),
        });
    }
    Ok(&data[offset..end])
}

/// Read a little-endian u16 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use cfbkit::common::binary::read_u16_le;
/// let data = [0x3E, 0x00, 0x03, 0x00];
/// assert_eq!(read_u16_le(&data, 0).unwrap(), 0x3E);
/// assert_eq!(read_u16_le(&data, 2).unwrap(), 3);
/// ```
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> BinaryResult<u16> {
    let bytes = window(data, offset, 2)?;
    U16::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| BinaryError::InsufficientData {
            expected: 2,
            available: bytes.len(),
        })
}

/// Read a little-endian u32 from a byte slice at the given offset.
///
/// # Examples
///
/// ```
/// use cfbkit::common::binary::read_u32_le;
/// let data = [0xFE, 0xFF, 0xFF, 0xFF];
/// assert_eq!(read_u32_le(&data, 0).unwrap(), 0xFFFF_FFFE);
/// ```
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> BinaryResult<u32> {
    let bytes = window(data, offset, 4)?;
    U32::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| BinaryError::InsufficientData {
            expected: 4,
            available: bytes.len(),
        })
}

/// Read a little-endian u64 from a byte slice at the given offset.
#[inline]
pub fn read_u64_le(data: &[u8], offset: usize) -> BinaryResult<u64> {
    let bytes = window(data, offset, 8)?;
    U64::<LE>::read_from_bytes(bytes)
        .map(|v| v.get())
        .map_err(|_| BinaryError::InsufficientData {
            expected: 8,
            available: bytes.len(),
        })
}

/// Encode a u16 as little-endian bytes.
#[inline]
pub fn u16_le_bytes(value: u16) -> [u8; 2] {
    U16::<LE>::new(value).to_bytes()
}

/// Encode a u32 as little-endian bytes.
#[inline]
pub fn u32_le_bytes(value: u32) -> [u8; 4] {
    U32::<LE>::new(value).to_bytes()
}

/// Encode a u64 as little-endian bytes.
#[inline]
pub fn u64_le_bytes(value: u64) -> [u8; 8] {
    U64::<LE>::new(value).to_bytes()
}

/// Decode a null-padded UTF-16LE buffer, stopping at the first NUL code unit.
///
/// Unpaired surrogates are replaced with U+FFFD.
pub fn decode_utf16le(data: &[u8]) -> BinaryResult<String> {
    if data.len() % 2 != 0 {
        return Err(BinaryError::InvalidUtf16(format!(
            "odd byte length {}",
            data.len()
        )));
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    Ok(String::from_utf16_lossy(&units))
}

/// Encode a string as UTF-16LE without a terminator.
pub fn encode_utf16le(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_out_of_range() {
        let data = [1u8, 2, 3];
        assert_eq!(
            read_u32_le(&data, 0),
            Err(BinaryError::InsufficientData {
                expected: 4,
                available: 3
            })
        );
        assert!(read_u16_le(&data, usize::MAX).is_err());
    }

    #[test]
    fn test_le_encoding() {
        assert_eq!(u32_le_bytes(0xFFFF_FFFE), [0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(u16_le_bytes(0xFFFE), [0xFE, 0xFF]);
        assert_eq!(read_u64_le(&u64_le_bytes(4096), 0).unwrap(), 4096);
    }

    #[test]
    fn test_utf16_codec() {
        let mut encoded = encode_utf16le("Root Entry");
        assert_eq!(encoded.len(), 20);
        encoded.resize(64, 0);
        assert_eq!(decode_utf16le(&encoded).unwrap(), "Root Entry");
        assert!(decode_utf16le(&[0x41]).is_err());
    }
}
