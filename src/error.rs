//! Crate error type.
//!
//! This module defines [`Error`] and the [`Result`] alias used across the
//! crate. There is one variant per failure kind of the wire grammar, the
//! model validation, and the crypto helpers, plus two wrapping variants:
//! [`Error::Context`] attaches an attribute or tag name, and
//! [`Error::Parse`] attaches the 1-based line number and the offending line
//! text during parsing.

use std::io;

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the `hls-playlist` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The first non-blank, non-comment line of the input is not `#EXTM3U`.
    #[error("not an M3U8 playlist: missing #EXTM3U")]
    NotM3u,

    /// Master-only and media-only tags appeared in the same playlist.
    #[error("mixed master and media playlist tags")]
    MixedMasterMedia,

    /// The input contained no tag that classifies it as master or media.
    #[error("not a master or media playlist")]
    NotMasterOrMedia,

    /// A singleton tag appeared more than once (strict mode only).
    #[error("duplicated tag")]
    DuplicatedTag,

    /// A tag appeared after the segments it must precede (strict mode only).
    #[error("must appear before any media segments")]
    MisplacedTag,

    /// The declared `EXT-X-VERSION` is below the minimum the playlist's
    /// contents require.
    #[error("declared version {declared} is below the required version {required}")]
    TooLowVersion {
        /// The version declared by `EXT-X-VERSION`.
        declared: u64,
        /// The minimum version inferred from the playlist contents.
        required: u64,
    },

    /// A URI line is empty or contains a space, comma, or quote.
    #[error("invalid URI")]
    InvalidUri,

    /// An attribute item has no `=` separator.
    #[error("invalid attribute")]
    InvalidAttribute,

    /// An attribute name is empty or not `[A-Z0-9-]+`.
    #[error("invalid attribute name")]
    InvalidAttributeName,

    /// An attribute value is empty or malformed for its position.
    #[error("invalid attribute value")]
    InvalidAttributeValue,

    #[error("invalid quoted string")]
    InvalidQuotedString,

    #[error("invalid unquoted string")]
    InvalidUnquotedString,

    #[error("invalid decimal integer")]
    InvalidDecimalInteger,

    #[error("invalid decimal float")]
    InvalidDecimalFloat,

    /// A boolean attribute was neither `YES` nor `NO`.
    #[error("invalid bool")]
    InvalidBool,

    /// A hexadecimal sequence lacks the `0x` prefix or has non-hex digits.
    #[error("invalid hexadecimal sequence")]
    InvalidHexSequence,

    /// An `EXT-X-PROGRAM-DATE-TIME` value is not an ISO-8601 timestamp.
    #[error("invalid time")]
    InvalidTime,

    #[error("invalid byte range")]
    InvalidByteRange,

    #[error("invalid resolution")]
    InvalidResolution,

    #[error("invalid key method")]
    InvalidKeyMethod,

    #[error("invalid HDCP level")]
    InvalidHdcpLevel,

    #[error("invalid media type")]
    InvalidMediaType,

    #[error("invalid media playlist type")]
    InvalidPlaylistKind,

    /// A media playlist was validated or encoded with no segments.
    #[error("missing media segments")]
    MissingMediaSegments,

    /// A required attribute is absent (`missing URI`, `missing BANDWIDTH`, ...).
    #[error("missing {0}")]
    MissingAttribute(&'static str),

    /// A segment's rounded duration exceeds the playlist target duration.
    #[error("media segment duration exceeds target duration at {index}")]
    SegmentExceedsTargetDuration {
        /// Index of the offending segment.
        index: usize,
    },

    /// An `EXT-X-SESSION-KEY` declared `METHOD=NONE`.
    #[error("METHOD must not be NONE")]
    SessionKeyMethodNone,

    /// Two renditions in the same group share a NAME.
    #[error("duplicate media name {name:?} in group {group:?}")]
    DuplicateRenditionName {
        /// The repeated NAME attribute.
        name: String,
        /// The GROUP-ID both renditions belong to.
        group: String,
    },

    /// More than one rendition in a group is flagged DEFAULT.
    #[error("multiple default media in group {group:?}")]
    MultipleDefaultRenditions {
        /// The offending GROUP-ID.
        group: String,
    },

    /// PKCS#7 padding did not verify during decryption.
    #[error("invalid PKCS#7 padding")]
    InvalidPadding,

    /// AES-128 key material is not 16 bytes.
    #[error("invalid AES-128 key length: expected 16, got {0}")]
    InvalidKeyLength(usize),

    /// An initialization vector is not 16 bytes.
    #[error("invalid AES-128 IV length: expected 16, got {0}")]
    InvalidIvLength(usize),

    /// Ciphertext is not a whole number of AES blocks.
    #[error("ciphertext length {0} is not a multiple of the AES block size")]
    InvalidCiphertextLength(usize),

    /// Extra context around a lower-level error, typically the attribute or
    /// tag name the error occurred under.
    #[error("{context}: {source}")]
    Context {
        /// What was being decoded or encoded.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// A parse-phase error wrapped with the 1-based line number and the
    /// offending line text.
    #[error("line {line}: {data}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// The offending line, trimmed.
        data: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// I/O error from the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Attach an attribute or tag name to an existing error.
    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Wrap a parse-phase error with its source location.
    pub(crate) fn at_line(self, line: usize, data: impl Into<String>) -> Self {
        Error::Parse {
            line,
            data: data.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping any [`Context`](Error::Context) and
    /// [`Parse`](Error::Parse) layers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } | Error::Parse { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_nested_context() {
        let err = Error::InvalidBool.context("PRECISE").at_line(3, "#EXT-X-START:PRECISE=MAYBE");
        assert!(matches!(err.root(), Error::InvalidBool));
        assert_eq!(
            err.to_string(),
            "line 3: #EXT-X-START:PRECISE=MAYBE: PRECISE: invalid bool"
        );
    }
}
