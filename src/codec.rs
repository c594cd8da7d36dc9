//! Hex conversion and block padding used by the frame builder and cipher.

use crate::error::{Result, TuyaError};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Decode a hex string (either case) into bytes.
pub fn hex_decode(hex_str: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str).map_err(|e| TuyaError::Format(format!("invalid hex '{hex_str}': {e}")))
}

/// Encode bytes as an uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// PKCS#7 padding to [`BLOCK_SIZE`]. A full block is appended when the input is
/// already aligned.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let padding_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + padding_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding_len, padding_len as u8);
    padded
}

/// Strip PKCS#7 padding, rejecting zero, oversized or non-uniform pad bytes.
pub fn unpad(data: &[u8]) -> Result<&[u8]> {
    let Some(&last) = data.last() else {
        return Err(TuyaError::Format("cannot unpad empty buffer".into()));
    };
    let pad_len = last as usize;
    if pad_len == 0 || pad_len > data.len() {
        return Err(TuyaError::Format(format!(
            "invalid pad length {} for {} byte buffer",
            pad_len,
            data.len()
        )));
    }

    let (body, padding) = data.split_at(data.len() - pad_len);
    if padding.iter().any(|&b| b != last) {
        return Err(TuyaError::Format("non-uniform padding bytes".into()));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decodes_either_case() {
        assert_eq!(hex_decode("00aa55").unwrap(), vec![0x00, 0xAA, 0x55]);
        assert_eq!(hex_decode("00AA55").unwrap(), vec![0x00, 0xAA, 0x55]);
        assert_eq!(hex_encode(&[0x00, 0xAA, 0x55]), "00AA55");
    }

    #[test]
    fn hex_rejects_odd_length_and_garbage() {
        assert!(matches!(hex_decode("abc"), Err(TuyaError::Format(_))));
        assert!(matches!(hex_decode("zz"), Err(TuyaError::Format(_))));
    }

    #[test]
    fn pad_unpad_all_short_lengths() {
        for len in 0..64 {
            let data: Vec<u8> = (0..len as u8).collect();
            let padded = pad(&data);
            assert_eq!(padded.len() % BLOCK_SIZE, 0);
            assert!(padded.len() > data.len());
            assert_eq!(unpad(&padded).unwrap(), data.as_slice());
        }
    }

    #[test]
    fn aligned_input_gets_full_block() {
        let padded = pad(&[7u8; 16]);
        assert_eq!(padded.len(), 32);
        assert!(padded[16..].iter().all(|&b| b == BLOCK_SIZE as u8));
    }

    #[test]
    fn unpad_rejects_bad_padding() {
        assert!(matches!(unpad(&[]), Err(TuyaError::Format(_))));
        assert!(matches!(unpad(&[1, 2, 0]), Err(TuyaError::Format(_))));
        assert!(matches!(unpad(&[9, 9]), Err(TuyaError::Format(_))));
        assert!(matches!(unpad(&[1, 3, 2, 3]), Err(TuyaError::Format(_))));
    }
}
