//! Additive checksum used by QN/Etekcity frames.
//!
//! The checksum is the sum of the covered bytes, truncated to 8 bits.

/// Calculate the additive checksum of `data`.
///
/// # Example
///
/// ```
/// use qn_scale_ble::protocol::calculate_checksum;
///
/// assert_eq!(calculate_checksum(&[0x13, 0x09, 0xFF]), 0x1B);
/// ```
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &byte| acc.wrapping_add(byte))
}

/// Verify a frame whose final byte is the checksum of everything before it.
///
/// Returns `false` for frames too short to carry a payload.
pub fn verify_trailing_checksum(data: &[u8]) -> bool {
    match data.split_last() {
        Some((&checksum, payload)) if !payload.is_empty() => {
            calculate_checksum(payload) == checksum
        }
        _ => false,
    }
}

/// Append the checksum of `data` as a trailing byte.
pub fn append_checksum(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len() + 1);
    result.extend_from_slice(data);
    result.push(calculate_checksum(data));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty() {
        assert_eq!(calculate_checksum(&[]), 0);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(calculate_checksum(&[0xFF, 0x02]), 0x01);
        assert_eq!(calculate_checksum(&[0x80, 0x80, 0x80]), 0x80);
    }

    #[test]
    fn test_verify_trailing_checksum() {
        let frame = append_checksum(&[0x13, 0x09, 0xFF, 0x01]);
        assert_eq!(frame.len(), 5);
        assert!(verify_trailing_checksum(&frame));

        let mut corrupted = frame.clone();
        corrupted[2] ^= 0x01;
        assert!(!verify_trailing_checksum(&corrupted));
    }

    #[test]
    fn test_verify_too_short() {
        assert!(!verify_trailing_checksum(&[]));
        assert!(!verify_trailing_checksum(&[0x00]));
    }
}
