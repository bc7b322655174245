//! Media segments and their per-segment decryption entry points.

use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};
use crate::tags::{ByteRange, InitMap, Key};
use crate::value::decode_hex_sequence;

/// One media segment of a media playlist (RFC 8216, 4.3.2).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaSegment {
    /// Segment URI. Required; taken from the URI line.
    pub uri: String,
    /// Free-form `EXTINF` title; may be empty.
    pub title: String,
    /// Segment duration in seconds. Required, strictly positive.
    pub duration: f64,
    pub byte_range: Option<ByteRange>,
    /// Keys in effect for this segment, in declaration order. Multiple keys
    /// model simultaneous KEYFORMATs; an empty list means unencrypted.
    pub keys: Vec<Key>,
    pub init_map: Option<InitMap>,
    pub program_date_time: Option<DateTime<FixedOffset>>,
    pub discontinuity: bool,

    /// Absolute media sequence number. Derived by finalization; not encoded.
    pub media_sequence: u64,
    /// Absolute discontinuity counter. Derived by finalization; not encoded.
    pub discontinuity_sequence: u64,
}

impl MediaSegment {
    /// The AES-128-CBC initialization vector for this segment.
    ///
    /// An explicit IV on the first key wins and must decode to exactly
    /// 16 bytes. Otherwise the IV is the segment's media sequence number as
    /// a big-endian integer in the low eight bytes of a zeroed block
    /// (RFC 8216, 5.2).
    pub fn iv(&self) -> Result<[u8; 16]> {
        if let Some(iv) = self.keys.first().and_then(|k| k.iv.as_deref()) {
            if !iv.is_empty() {
                let bytes = decode_hex_sequence(iv)?;
                let len = bytes.len();
                return bytes.try_into().map_err(|_| Error::InvalidIvLength(len));
            }
        }

        let mut iv = [0u8; 16];
        iv[8..].copy_from_slice(&self.media_sequence.to_be_bytes());
        Ok(iv)
    }

    /// Decrypt this segment's ciphertext with AES-128-CBC, deriving the IV
    /// via [`iv`](Self::iv).
    ///
    /// With `remove_padding`, PKCS#7 padding is verified and stripped;
    /// otherwise the raw plaintext blocks are returned.
    #[cfg(feature = "aes-decrypt")]
    pub fn aes128_decrypt(&self, data: &[u8], key: &[u8], remove_padding: bool) -> Result<Vec<u8>> {
        let iv = self.iv()?;
        crate::crypto::decrypt(data, key, &iv, remove_padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::KeyMethod;

    #[test]
    fn iv_defaults_to_big_endian_media_sequence() {
        let segment = MediaSegment {
            keys: vec![Key {
                method: KeyMethod::Aes128,
                uri: Some("https://example.com/key".to_owned()),
                ..Key::default()
            }],
            media_sequence: 0x42,
            ..MediaSegment::default()
        };

        assert_eq!(
            segment.iv().unwrap(),
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x42]
        );
    }

    #[test]
    fn explicit_iv_wins_over_media_sequence() {
        let segment = MediaSegment {
            keys: vec![Key {
                method: KeyMethod::Aes128,
                uri: Some("https://example.com/key".to_owned()),
                iv: Some("0x0102030405060708090A0B0C0D0E0F10".to_owned()),
                ..Key::default()
            }],
            media_sequence: 7,
            ..MediaSegment::default()
        };

        assert_eq!(
            segment.iv().unwrap(),
            [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]
        );
    }

    #[test]
    fn short_explicit_iv_is_an_error() {
        let segment = MediaSegment {
            keys: vec![Key {
                method: KeyMethod::Aes128,
                uri: Some("https://example.com/key".to_owned()),
                iv: Some("0x0102".to_owned()),
                ..Key::default()
            }],
            ..MediaSegment::default()
        };

        assert!(matches!(segment.iv().unwrap_err(), Error::InvalidIvLength(2)));
    }
}
