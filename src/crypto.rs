//! Tuya v3.1 payload encryption and signing.
//! AES-128-ECB with PKCS#7 padding, plus the MD5 signature fragment.
//!
//! ECB under a single long-lived key is how the device family works on the wire;
//! it is not something this crate can change without breaking compatibility.

use crate::codec::{self, BLOCK_SIZE};
use crate::error::{Result, TuyaError};
use aes::Aes128;
use base64::{Engine as _, engine::general_purpose};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use ecb::{Decryptor, Encryptor};
use md5::{Digest, Md5};

/// Local keys are always 16 bytes.
pub const KEY_LEN: usize = 16;

/// TuyaCipher provides AES-128 encryption and decryption in ECB mode.
///
/// Build one per operation and drop it afterwards.
pub struct TuyaCipher {
    key: [u8; KEY_LEN],
}

impl TuyaCipher {
    /// Create a new TuyaCipher with a 16-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| TuyaError::InvalidKey(key.len()))?;
        Ok(Self { key })
    }

    /// Pad and encrypt `data`.
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let mut encryptor = Encryptor::<Aes128>::new(&self.key.into());
        let mut ciphertext = codec::pad(data);
        for chunk in ciphertext.chunks_mut(BLOCK_SIZE) {
            let block = cipher::generic_array::GenericArray::from_mut_slice(chunk);
            encryptor.encrypt_block_mut(block);
        }
        ciphertext
    }

    /// Pad, encrypt and Base64-encode `data`, as sent in set commands.
    pub fn encrypt_b64(&self, data: &[u8]) -> Vec<u8> {
        general_purpose::STANDARD
            .encode(self.encrypt(data))
            .into_bytes()
    }

    /// Decrypt `data` and strip its padding.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() || !data.len().is_multiple_of(BLOCK_SIZE) {
            return Err(TuyaError::DecryptionFailed);
        }

        let mut decryptor = Decryptor::<Aes128>::new(&self.key.into());
        let mut plaintext = data.to_vec();
        for chunk in plaintext.chunks_mut(BLOCK_SIZE) {
            let block = cipher::generic_array::GenericArray::from_mut_slice(chunk);
            decryptor.decrypt_block_mut(block);
        }

        let len = codec::unpad(&plaintext)?.len();
        plaintext.truncate(len);
        Ok(plaintext)
    }

    /// Decode Base64 `data`, then decrypt it.
    pub fn decrypt_b64(&self, data: &[u8]) -> Result<Vec<u8>> {
        let raw = general_purpose::STANDARD
            .decode(data)
            .map_err(|e| TuyaError::Format(format!("invalid base64: {e}")))?;
        self.decrypt(&raw)
    }
}

/// Lowercase hex MD5 digest of `data`.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Signature fragment for a Base64 ciphertext: characters 8..24 of
/// `md5("data=" + ciphertext + "||lpv=" + version + "||" + key)`.
pub fn signature(ciphertext_b64: &[u8], version: &[u8], local_key: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(ciphertext_b64.len() + version.len() + local_key.len() + 13);
    input.extend_from_slice(b"data=");
    input.extend_from_slice(ciphertext_b64);
    input.extend_from_slice(b"||lpv=");
    input.extend_from_slice(version);
    input.extend_from_slice(b"||");
    input.extend_from_slice(local_key);

    md5_hex(&input).as_bytes()[8..24].to_vec()
}
