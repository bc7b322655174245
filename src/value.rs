//! Lexical primitives of the M3U8 attribute grammar.
//!
//! Each primitive is a bidirectional conversion with an explicit failure
//! mode (RFC 8216, 4.2): quoted and unquoted strings, decimal integers and
//! floats, hexadecimal sequences, `YES`/`NO` booleans, and ISO-8601
//! timestamps. Decoding is exposed as free functions; encoding goes through
//! the [`Value`] capability so attribute and tag emission can be generic
//! over any primitive.

use std::io::Write;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::error::{Error, Result};

/// Capability shared by every encodable attribute value.
///
/// Values reporting `is_zero` are suppressed by the attribute and tag
/// writers instead of being emitted empty.
pub(crate) trait Value {
    fn is_zero(&self) -> bool;
    fn encode(&self, w: &mut dyn Write) -> Result<()>;
}

impl<T: Value> Value for Option<T> {
    fn is_zero(&self) -> bool {
        self.as_ref().map_or(true, Value::is_zero)
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        match self {
            Some(value) => value.encode(w),
            None => Ok(()),
        }
    }
}

/// A `"..."` attribute value. The interior must not contain CR, LF, or `"`.
pub(crate) struct QuotedStr<'a>(pub &'a str);

impl QuotedStr<'_> {
    fn valid(&self) -> bool {
        !self.0.contains(['\r', '\n', '"'])
    }
}

impl Value for QuotedStr<'_> {
    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if !self.valid() {
            return Err(Error::InvalidQuotedString);
        }
        write!(w, "\"{}\"", self.0)?;
        Ok(())
    }
}

/// Decode a quoted string, rejecting empty interiors.
pub(crate) fn decode_quoted(s: &str) -> Result<String> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(Error::InvalidQuotedString)?;
    if inner.is_empty() || inner.contains(['\r', '\n', '"']) {
        return Err(Error::InvalidQuotedString);
    }
    Ok(inner.to_owned())
}

/// A bare attribute value: non-empty, without comma, space, or quote.
pub(crate) struct UnquotedStr<'a>(pub &'a str);

impl UnquotedStr<'_> {
    fn valid(&self) -> bool {
        !self.0.is_empty() && !self.0.contains([',', ' ', '"'])
    }
}

impl Value for UnquotedStr<'_> {
    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if !self.valid() {
            return Err(Error::InvalidUnquotedString);
        }
        w.write_all(self.0.as_bytes())?;
        Ok(())
    }
}

pub(crate) fn decode_unquoted(s: &str) -> Result<String> {
    if UnquotedStr(s).valid() {
        Ok(s.to_owned())
    } else {
        Err(Error::InvalidUnquotedString)
    }
}

/// A nonnegative base-10 integer.
pub(crate) struct DecimalInteger(pub u64);

impl Value for DecimalInteger {
    fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        write!(w, "{}", self.0)?;
        Ok(())
    }
}

/// Decode a decimal integer, rejecting values below `min`.
pub(crate) fn decode_decimal_integer(s: &str, min: u64) -> Result<u64> {
    match s.parse::<u64>() {
        Ok(value) if value >= min => Ok(value),
        _ => Err(Error::InvalidDecimalInteger),
    }
}

/// A nonnegative float, emitted with at most three fractional digits.
pub(crate) struct DecimalFloat(pub f64);

impl Value for DecimalFloat {
    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.0 < 0.0 {
            return Err(Error::InvalidDecimalFloat);
        }
        w.write_all(format_float(self.0).as_bytes())?;
        Ok(())
    }
}

/// Shortest decimal form, truncated (not rounded) to three fractional digits.
pub(crate) fn format_float(value: f64) -> String {
    let mut s = value.to_string();
    if let Some(dot) = s.find('.') {
        if s.len() - dot - 1 > 3 {
            s.truncate(dot + 4);
        }
    }
    s
}

pub(crate) fn decode_decimal_float(s: &str) -> Result<f64> {
    match s.parse::<f64>() {
        Ok(value) if value >= 0.0 => Ok(value),
        _ => Err(Error::InvalidDecimalFloat),
    }
}

/// A float that may be negative. Only TIME-OFFSET uses it.
pub(crate) struct SignedDecimalFloat(pub f64);

impl Value for SignedDecimalFloat {
    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        write!(w, "{}", self.0)?;
        Ok(())
    }
}

pub(crate) fn decode_signed_decimal_float(s: &str) -> Result<f64> {
    s.parse::<f64>().map_err(|_| Error::InvalidDecimalFloat)
}

/// A byte sequence emitted as `0x` followed by upper-case hex digits.
pub(crate) struct HexSeq<'a>(pub &'a [u8]);

impl Value for HexSeq<'_> {
    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidHexSequence);
        }
        write!(w, "0x{}", hex::encode_upper(self.0))?;
        Ok(())
    }
}

/// Decode a hexadecimal sequence with a mandatory `0x`/`0X` prefix and an
/// even number of digits.
pub(crate) fn decode_hex_sequence(s: &str) -> Result<Vec<u8>> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or(Error::InvalidHexSequence)?;
    if digits.is_empty() {
        return Err(Error::InvalidHexSequence);
    }
    hex::decode(digits).map_err(|_| Error::InvalidHexSequence)
}

/// A `YES`/`NO` boolean. `NO` is the zero value and never emitted.
pub(crate) struct YesNo(pub bool);

impl Value for YesNo {
    fn is_zero(&self) -> bool {
        !self.0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(if self.0 { b"YES" } else { b"NO" })?;
        Ok(())
    }
}

pub(crate) fn decode_yes_no(s: &str) -> Result<bool> {
    match s {
        "YES" => Ok(true),
        "NO" => Ok(false),
        _ => Err(Error::InvalidBool),
    }
}

/// An ISO-8601 timestamp with optional fractional seconds and `Z` or a
/// numeric offset (RFC 8216, 4.3.2.6).
pub(crate) struct Timestamp(pub DateTime<FixedOffset>);

impl Value for Timestamp {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        let s = self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        w.write_all(s.as_bytes())?;
        Ok(())
    }
}

pub(crate) fn decode_timestamp(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).map_err(|_| Error::InvalidTime)
}
