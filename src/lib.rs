//! Codec for HLS playlists in the M3U8 textual format (RFC 8216).
//!
//! This crate converts between the line-oriented wire text and a typed,
//! validated in-memory model, in both directions:
//!
//! - [`parse`] / [`parse_with_options`] decode a byte stream into a
//!   [`Playlist`] — either a [`MasterPlaylist`] of variant streams or a
//!   [`MediaPlaylist`] of media segments.
//! - [`Playlist::output`] (and the per-kind `output` methods) encode a
//!   model back to wire text that round-trips through the parser,
//!   collapsing repeated key and init-map tags and inferring the minimum
//!   protocol version.
//! - [`MediaSegment::iv`] and [`MediaSegment::aes128_decrypt`] derive the
//!   per-segment AES-128-CBC initialization vector and decrypt segment
//!   payloads with PKCS#7 padding handling (feature `aes-decrypt`).
//!
//! The parser is relaxed by default: real-world playlists with duplicated
//! singleton tags parse fine, and unknown tags are logged at debug level
//! and skipped. [`ParseOptions::strict`] turns duplicate and ordering
//! violations into errors.
//!
//! This crate is composed of several modules:
//! - `value`: the small lexical grammars (quoted strings, decimals, hex
//!   sequences, timestamps).
//! - `attr`: the `NAME=VALUE,...` attribute-list codec.
//! - `tags`: typed tag values (`Key`, `InitMap`, `Media`, `StreamInf`, ...).
//! - `parser`: the line-oriented state machine.
//! - `master` / `media` / `segment`: the playlist models, finalization,
//!   validation, and encoders.
//! - `crypto`: AES-128-CBC decrypt/encrypt helpers.
//! - `error`: the unified error type.
//!
//! This file acts as a facade: it re-exports the main types and functions
//! from the internal modules to form the public API of the crate.
//!
//! ```
//! use hls_playlist::{parse, Playlist};
//!
//! let text = "#EXTM3U\n\
//!             #EXT-X-TARGETDURATION:10\n\
//!             #EXTINF:9.009,\n\
//!             first.ts\n\
//!             #EXT-X-ENDLIST\n";
//!
//! let playlist = parse(text.as_bytes())?;
//! assert_eq!(playlist.type_tag(), "Media");
//! if let Playlist::Media(media) = &playlist {
//!     assert_eq!(media.segments.len(), 1);
//!     assert!(media.endlist);
//! }
//! # Ok::<(), hls_playlist::Error>(())
//! ```
//!
//! Fetching playlists and segments over HTTP, resolving URIs, and acquiring
//! decryption keys are deliberately out of scope; the codec consumes a
//! [`std::io::Read`] and produces into a [`std::io::Write`].

mod attr;
mod error;
mod master;
mod media;
mod parser;
mod playlist;
mod segment;
mod tags;
mod value;

#[cfg(feature = "aes-decrypt")]
pub mod crypto;

pub use crate::error::{Error, Result};
pub use crate::master::{MasterPlaylist, Variant};
pub use crate::media::{MediaPlaylist, PlaylistKind};
pub use crate::playlist::{
    parse, parse_with_options, ParseOptions, Playlist, PLAYLIST_TYPE_MASTER, PLAYLIST_TYPE_MEDIA,
};
pub use crate::segment::MediaSegment;
pub use crate::tags::{
    format_iv, ByteRange, HdcpLevel, IFrameStreamInf, InitMap, Key, KeyMethod, Media, MediaType,
    Resolution, SessionData, Start, StreamInf,
};
