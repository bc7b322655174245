//! AES-128-CBC helpers for media segment payloads.
//!
//! The block cipher itself comes from the `aes`/`cbc` crates; this module
//! only validates key, IV, and ciphertext shapes and handles PKCS#7
//! padding. Whole-segment encryption pads the final block, so a decrypted
//! segment normally has its padding verified and stripped; pass
//! `remove_padding = false` for byte-range sub-reads that end mid-resource.

use aes::cipher::block_padding::{NoPadding, Pkcs7};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;

use crate::error::{Error, Result};

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

const BLOCK_SIZE: usize = 16;

/// Decrypt `data` with AES-128-CBC under `key` and `iv`.
///
/// With `remove_padding`, PKCS#7 padding is verified (final byte `p` in
/// `1..=16`, all trailing `p` bytes equal to `p`) and stripped; a
/// verification failure is [`Error::InvalidPadding`].
pub fn decrypt(data: &[u8], key: &[u8], iv: &[u8], remove_padding: bool) -> Result<Vec<u8>> {
    let (key, iv) = check_key_iv(key, iv)?;
    if data.len() % BLOCK_SIZE != 0 {
        return Err(Error::InvalidCiphertextLength(data.len()));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let decryptor = Aes128CbcDec::new((&key).into(), (&iv).into());
    if remove_padding {
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| Error::InvalidPadding)
    } else {
        decryptor
            .decrypt_padded_vec_mut::<NoPadding>(data)
            .map_err(|_| Error::InvalidCiphertextLength(data.len()))
    }
}

/// Encrypt `data` with AES-128-CBC under `key` and `iv`, applying PKCS#7
/// padding to reach the block boundary.
pub fn encrypt(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    let (key, iv) = check_key_iv(key, iv)?;
    let encryptor = Aes128CbcEnc::new((&key).into(), (&iv).into());
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(data))
}

/// Strip PKCS#7 padding when it verifies; return the input unchanged when
/// it does not.
pub fn strip_padding_lossy(data: &[u8]) -> Vec<u8> {
    match padding_len(data) {
        Some(padding) => data[..data.len() - padding].to_vec(),
        None => data.to_vec(),
    }
}

fn padding_len(data: &[u8]) -> Option<usize> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return None;
    }

    let padding = *data.last()? as usize;
    if !(1..=BLOCK_SIZE).contains(&padding) {
        return None;
    }
    if data[data.len() - padding..].iter().all(|&b| b == padding as u8) {
        Some(padding)
    } else {
        None
    }
}

fn check_key_iv(key: &[u8], iv: &[u8]) -> Result<([u8; 16], [u8; 16])> {
    let key: [u8; 16] = key.try_into().map_err(|_| Error::InvalidKeyLength(key.len()))?;
    let iv: [u8; 16] = iv.try_into().map_err(|_| Error::InvalidIvLength(iv.len()))?;
    Ok((key, iv))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];
    const IV: [u8; 16] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

    /// Encrypt without padding, for building ciphertexts whose plaintext
    /// shape the tests control exactly.
    fn encrypt_raw(data: &[u8]) -> Vec<u8> {
        let encryptor = Aes128CbcEnc::new((&KEY).into(), (&IV).into());
        encryptor.encrypt_padded_vec_mut::<NoPadding>(data)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let data = b"0123456789";
        let encrypted = encrypt(data, &KEY, &IV).unwrap();
        assert_eq!(encrypted.len() % BLOCK_SIZE, 0);

        let decrypted = decrypt(&encrypted, &KEY, &IV, true).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn decrypt_without_padding_keeps_all_blocks() {
        let data = b"0123456789";
        let encrypted = encrypt(data, &KEY, &IV).unwrap();

        let decrypted = decrypt(&encrypted, &KEY, &IV, false).unwrap();
        assert_eq!(&decrypted[..data.len()], data);
        assert_eq!(decrypted.len(), BLOCK_SIZE);
        // The padding bytes are still there.
        assert_eq!(decrypted[BLOCK_SIZE - 1], 6);
    }

    #[test]
    fn rejects_bad_key_iv_and_ciphertext_shapes() {
        let encrypted = encrypt(b"0123456789", &KEY, &IV).unwrap();

        assert!(matches!(
            decrypt(&encrypted, &KEY[..15], &IV, true),
            Err(Error::InvalidKeyLength(15))
        ));
        assert!(matches!(
            decrypt(&encrypted, &KEY, &IV[..8], true),
            Err(Error::InvalidIvLength(8))
        ));
        assert!(matches!(
            decrypt(&encrypted[..10], &KEY, &IV, true),
            Err(Error::InvalidCiphertextLength(10))
        ));
    }

    #[test]
    fn inconsistent_padding_bytes_are_rejected() {
        // Plaintext ends 05 05 05 04: the final byte claims 4 bytes of
        // padding, but they are not all 04.
        let mut plaintext = vec![0u8; BLOCK_SIZE];
        plaintext[12..].copy_from_slice(&[0x05, 0x05, 0x05, 0x04]);
        let encrypted = encrypt_raw(&plaintext);

        assert!(matches!(
            decrypt(&encrypted, &KEY, &IV, true),
            Err(Error::InvalidPadding)
        ));
        // Without padding removal the same ciphertext is fine.
        assert_eq!(decrypt(&encrypted, &KEY, &IV, false).unwrap(), plaintext);
    }

    #[test]
    fn zero_and_oversized_padding_are_rejected() {
        let mut plaintext = vec![7u8; BLOCK_SIZE];
        plaintext[BLOCK_SIZE - 1] = 0;
        let encrypted = encrypt_raw(&plaintext);
        assert!(matches!(decrypt(&encrypted, &KEY, &IV, true), Err(Error::InvalidPadding)));

        let plaintext = vec![17u8; BLOCK_SIZE];
        let encrypted = encrypt_raw(&plaintext);
        assert!(matches!(decrypt(&encrypted, &KEY, &IV, true), Err(Error::InvalidPadding)));
    }

    #[test]
    fn strip_padding_lossy_is_best_effort() {
        let mut padded = b"0123456789".to_vec();
        padded.extend_from_slice(&[6; 6]);
        assert_eq!(strip_padding_lossy(&padded), b"0123456789");

        // Not block-aligned and badly padded inputs come back unchanged.
        assert_eq!(strip_padding_lossy(b"0123456789"), b"0123456789");
        let mut bad = vec![0u8; BLOCK_SIZE];
        bad[BLOCK_SIZE - 1] = 3;
        assert_eq!(strip_padding_lossy(&bad), bad);
    }
}
