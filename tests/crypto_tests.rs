//! Segment decryption through the public API.

#![cfg(feature = "aes-decrypt")]

use hls_playlist::{crypto, format_iv, Error, Key, KeyMethod, MediaSegment};

const KEY_BYTES: [u8; 16] = *b"0123456789abcdef";

fn encrypted_segment(media_sequence: u64, iv: Option<String>) -> MediaSegment {
    MediaSegment {
        uri: "seg.ts".to_owned(),
        duration: 9.0,
        keys: vec![Key {
            method: KeyMethod::Aes128,
            uri: Some("https://example.com/key".to_owned()),
            iv,
            ..Key::default()
        }],
        media_sequence,
        ..MediaSegment::default()
    }
}

#[test]
fn iv_falls_back_to_media_sequence() {
    let segment = encrypted_segment(0x42, None);
    assert_eq!(
        segment.iv().unwrap(),
        [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x42]
    );
}

#[test]
fn decrypts_what_the_helper_encrypted() {
    let segment = encrypted_segment(7, None);
    let iv = segment.iv().unwrap();

    let payload = b"not really mpeg-ts data, but close enough";
    let ciphertext = crypto::encrypt(payload, &KEY_BYTES, &iv).unwrap();

    let plaintext = segment.aes128_decrypt(&ciphertext, &KEY_BYTES, true).unwrap();
    assert_eq!(plaintext, payload);

    // Without padding removal the tail keeps the pad bytes.
    let padded = segment.aes128_decrypt(&ciphertext, &KEY_BYTES, false).unwrap();
    assert_eq!(&padded[..payload.len()], payload);
    assert_eq!(padded.len() % 16, 0);
    assert_eq!(crypto::strip_padding_lossy(&padded), payload);
}

#[test]
fn explicit_iv_drives_decryption() {
    let iv_bytes: [u8; 16] = [9; 16];
    let segment = encrypted_segment(7, Some(format_iv(&iv_bytes, true)));
    assert_eq!(segment.iv().unwrap(), iv_bytes);

    let payload = b"0123456789";
    let ciphertext = crypto::encrypt(payload, &KEY_BYTES, &iv_bytes).unwrap();
    assert_eq!(
        segment.aes128_decrypt(&ciphertext, &KEY_BYTES, true).unwrap(),
        payload
    );
}

#[test]
fn wrong_key_length_is_rejected() {
    let segment = encrypted_segment(7, None);
    assert!(matches!(
        segment.aes128_decrypt(&[0u8; 32], b"shortkey", true),
        Err(Error::InvalidKeyLength(8))
    ));
}
