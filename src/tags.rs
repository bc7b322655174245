//! Typed tag values.
//!
//! Every compound attribute group of RFC 8216 gets a typed representation
//! with a decode from the wire text, an encode back to it, and (where the
//! protocol version matters) a minimum-version function feeding the
//! playlist-level version inference.
//!
//! Wire attribute order on encode follows the RFC examples: `EXT-X-KEY`
//! emits METHOD, IV, URI, KEYFORMAT, KEYFORMATVERSIONS; `EXT-X-STREAM-INF`
//! leads with BANDWIDTH; and so on. Unknown attribute names are ignored on
//! decode.

use std::fmt;
use std::io::Write;

use crate::attr::{iter_attributes, write_attrs, Attr};
use crate::error::{Error, Result};
use crate::value::{
    decode_decimal_float, decode_decimal_integer, decode_hex_sequence, decode_quoted,
    decode_signed_decimal_float, decode_yes_no, DecimalFloat, DecimalInteger, HexSeq, QuotedStr,
    SignedDecimalFloat, UnquotedStr, Value, YesNo,
};

/// The playlist tag vocabulary (RFC 8216, 4.3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tag {
    // Basic tags
    M3u,
    Version,

    // Media segment tags
    Inf,
    ByteRange,
    Discontinuity,
    Key,
    Map,
    ProgramDateTime,
    DateRange,

    // Media playlist tags
    TargetDuration,
    MediaSequence,
    DiscontinuitySequence,
    EndList,
    PlaylistType,
    IFramesOnly,

    // Master playlist tags
    Media,
    StreamInf,
    IFrameStreamInf,
    SessionData,
    SessionKey,

    // Media or master playlist tags
    IndependentSegments,
    Start,
}

impl Tag {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Tag::M3u => "#EXTM3U",
            Tag::Version => "#EXT-X-VERSION",
            Tag::Inf => "#EXTINF",
            Tag::ByteRange => "#EXT-X-BYTERANGE",
            Tag::Discontinuity => "#EXT-X-DISCONTINUITY",
            Tag::Key => "#EXT-X-KEY",
            Tag::Map => "#EXT-X-MAP",
            Tag::ProgramDateTime => "#EXT-X-PROGRAM-DATE-TIME",
            Tag::DateRange => "#EXT-X-DATERANGE",
            Tag::TargetDuration => "#EXT-X-TARGETDURATION",
            Tag::MediaSequence => "#EXT-X-MEDIA-SEQUENCE",
            Tag::DiscontinuitySequence => "#EXT-X-DISCONTINUITY-SEQUENCE",
            Tag::EndList => "#EXT-X-ENDLIST",
            Tag::PlaylistType => "#EXT-X-PLAYLIST-TYPE",
            Tag::IFramesOnly => "#EXT-X-I-FRAMES-ONLY",
            Tag::Media => "#EXT-X-MEDIA",
            Tag::StreamInf => "#EXT-X-STREAM-INF",
            Tag::IFrameStreamInf => "#EXT-X-I-FRAME-STREAM-INF",
            Tag::SessionData => "#EXT-X-SESSION-DATA",
            Tag::SessionKey => "#EXT-X-SESSION-KEY",
            Tag::IndependentSegments => "#EXT-X-INDEPENDENT-SEGMENTS",
            Tag::Start => "#EXT-X-START",
        }
    }

    pub(crate) fn from_name(name: &str) -> Option<Tag> {
        Some(match name {
            "#EXTM3U" => Tag::M3u,
            "#EXT-X-VERSION" => Tag::Version,
            "#EXTINF" => Tag::Inf,
            "#EXT-X-BYTERANGE" => Tag::ByteRange,
            "#EXT-X-DISCONTINUITY" => Tag::Discontinuity,
            "#EXT-X-KEY" => Tag::Key,
            "#EXT-X-MAP" => Tag::Map,
            "#EXT-X-PROGRAM-DATE-TIME" => Tag::ProgramDateTime,
            "#EXT-X-DATERANGE" => Tag::DateRange,
            "#EXT-X-TARGETDURATION" => Tag::TargetDuration,
            "#EXT-X-MEDIA-SEQUENCE" => Tag::MediaSequence,
            "#EXT-X-DISCONTINUITY-SEQUENCE" => Tag::DiscontinuitySequence,
            "#EXT-X-ENDLIST" => Tag::EndList,
            "#EXT-X-PLAYLIST-TYPE" => Tag::PlaylistType,
            "#EXT-X-I-FRAMES-ONLY" => Tag::IFramesOnly,
            "#EXT-X-MEDIA" => Tag::Media,
            "#EXT-X-STREAM-INF" => Tag::StreamInf,
            "#EXT-X-I-FRAME-STREAM-INF" => Tag::IFrameStreamInf,
            "#EXT-X-SESSION-DATA" => Tag::SessionData,
            "#EXT-X-SESSION-KEY" => Tag::SessionKey,
            "#EXT-X-INDEPENDENT-SEGMENTS" => Tag::IndependentSegments,
            "#EXT-X-START" => Tag::Start,
            _ => return None,
        })
    }
}

/// Format a 16-byte IV as a hexadecimal sequence with the `0x` prefix.
///
/// # Panics
///
/// With `strict`, panics when `iv` is not exactly 16 bytes. That is a
/// programmer error, not an input error; pass `strict = false` for data of
/// unknown provenance.
pub fn format_iv(iv: &[u8], strict: bool) -> String {
    if strict {
        assert_eq!(iv.len(), 16, "IV is not a 16-octet sequence");
    }
    format!("0x{}", hex::encode_upper(iv))
}

/// A sub-range of a resource: length plus optional offset, `<n>[@<o>]`
/// (RFC 8216, 4.3.2.2).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ByteRange {
    /// Length of the range in bytes. Required, non-zero.
    pub length: u64,
    /// Offset of the range start; 0 is omitted on the wire.
    pub offset: u64,
}

impl ByteRange {
    /// Align the range outward to 16-byte AES block boundaries: the length
    /// is rounded up, the offset down. Encrypted ranges must cover whole
    /// blocks.
    pub fn align16(mut self) -> ByteRange {
        self.length = (self.length + 0xF) & !0xF;
        self.offset &= !0xF;
        self
    }

    /// Widen the range by the 16-byte IV block that precedes an I-frame.
    ///
    /// The returned flag reports whether the preceding IV block was absorbed
    /// into the range (the offset was at least 16).
    pub fn adjust_for_iframe(mut self) -> (ByteRange, bool) {
        self.length += 16;
        let has_iv = self.offset >= 16;
        if has_iv {
            self.offset -= 16;
        }
        (self, has_iv)
    }

    /// Protocol version this range demands when present.
    pub fn min_version(&self) -> u64 {
        if self.length > 0 {
            4
        } else {
            1
        }
    }

    pub(crate) fn decode(s: &str) -> Result<ByteRange> {
        let (length, offset) = match s.split_once('@') {
            Some((length, offset)) => {
                (length, offset.parse().map_err(|_| Error::InvalidByteRange)?)
            }
            None => (s, 0),
        };

        let length: u64 = length.parse().map_err(|_| Error::InvalidByteRange)?;
        if length == 0 {
            return Err(Error::InvalidByteRange);
        }

        Ok(ByteRange { length, offset })
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset > 0 {
            write!(f, "{}@{}", self.length, self.offset)
        } else {
            write!(f, "{}", self.length)
        }
    }
}

impl Value for ByteRange {
    fn is_zero(&self) -> bool {
        self.length == 0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.length == 0 {
            return Err(Error::InvalidByteRange);
        }
        write!(w, "{self}")?;
        Ok(())
    }
}

/// A `WIDTHxHEIGHT` display resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub width: u64,
    pub height: u64,
}

impl Resolution {
    pub(crate) fn decode(s: &str) -> Result<Resolution> {
        let (width, height) = s.split_once('x').ok_or(Error::InvalidResolution)?;
        let width = width.parse().map_err(|_| Error::InvalidResolution)?;
        let height = height.parse().map_err(|_| Error::InvalidResolution)?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidResolution);
        }
        Ok(Resolution { width, height })
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl Value for Resolution {
    fn is_zero(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.is_zero() {
            return Err(Error::InvalidResolution);
        }
        write!(w, "{self}")?;
        Ok(())
    }
}

/// `EXT-X-KEY` encryption method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyMethod {
    /// Segments are not encrypted. Disables any key in effect.
    #[default]
    None,
    /// Whole-segment AES-128-CBC with PKCS#7 padding.
    Aes128,
    /// Sample-based AES encryption.
    SampleAes,
}

impl KeyMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyMethod::None => "NONE",
            KeyMethod::Aes128 => "AES-128",
            KeyMethod::SampleAes => "SAMPLE-AES",
        }
    }

    pub(crate) fn decode(s: &str) -> Result<KeyMethod> {
        match s {
            "NONE" => Ok(KeyMethod::None),
            "AES-128" => Ok(KeyMethod::Aes128),
            "SAMPLE-AES" => Ok(KeyMethod::SampleAes),
            _ => Err(Error::InvalidKeyMethod),
        }
    }
}

impl Value for KeyMethod {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(self.as_str().as_bytes())?;
        Ok(())
    }
}

/// `EXT-X-MEDIA` rendition type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Audio,
    Video,
    Subtitles,
    ClosedCaptions,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Audio => "AUDIO",
            MediaType::Video => "VIDEO",
            MediaType::Subtitles => "SUBTITLES",
            MediaType::ClosedCaptions => "CLOSED-CAPTIONS",
        }
    }

    pub(crate) fn decode(s: &str) -> Result<MediaType> {
        match s {
            "AUDIO" => Ok(MediaType::Audio),
            "VIDEO" => Ok(MediaType::Video),
            "SUBTITLES" => Ok(MediaType::Subtitles),
            "CLOSED-CAPTIONS" => Ok(MediaType::ClosedCaptions),
            _ => Err(Error::InvalidMediaType),
        }
    }
}

impl Value for MediaType {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(self.as_str().as_bytes())?;
        Ok(())
    }
}

/// `HDCP-LEVEL` of a variant stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HdcpLevel {
    None,
    Type0,
}

impl HdcpLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            HdcpLevel::None => "NONE",
            HdcpLevel::Type0 => "TYPE-0",
        }
    }

    pub(crate) fn decode(s: &str) -> Result<HdcpLevel> {
        match s {
            "NONE" => Ok(HdcpLevel::None),
            "TYPE-0" => Ok(HdcpLevel::Type0),
            _ => Err(Error::InvalidHdcpLevel),
        }
    }
}

impl Value for HdcpLevel {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(self.as_str().as_bytes())?;
        Ok(())
    }
}

/// An `EXT-X-KEY` / `EXT-X-SESSION-KEY` value (RFC 8216, 4.3.2.4).
///
/// A key applies to every media segment between its appearance and the next
/// key with the same KEYFORMAT, or the end of the playlist. Keys with
/// distinct KEYFORMATs may apply to the same segment simultaneously.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Key {
    pub method: KeyMethod,
    /// Key acquisition URI. Required unless `method` is NONE.
    pub uri: Option<String>,
    /// Explicit IV as a hexadecimal sequence with the `0x`/`0X` prefix.
    pub iv: Option<String>,
    pub key_format: Option<String>,
    pub key_format_versions: Option<String>,
}

impl Key {
    /// Protocol version this key demands.
    pub fn min_version(&self) -> u64 {
        let mut version = 1;
        if self.iv.is_some() {
            version = version.max(2);
        }
        if self.key_format.is_some() || self.key_format_versions.is_some() {
            version = version.max(5);
        }
        version
    }

    pub(crate) fn decode(s: &str) -> Result<Key> {
        let mut key = Key::default();
        let mut has_method = false;

        iter_attributes(s, 0, |name, value| {
            match name {
                "METHOD" => {
                    key.method = KeyMethod::decode(value)?;
                    has_method = true;
                }
                "URI" => key.uri = Some(decode_quoted(value)?),
                "IV" => {
                    let bytes = decode_hex_sequence(value)?;
                    key.iv = Some(format_iv(&bytes, false));
                }
                "KEYFORMAT" => key.key_format = Some(decode_quoted(value)?),
                "KEYFORMATVERSIONS" => key.key_format_versions = Some(decode_quoted(value)?),
                _ => {}
            }
            Ok(())
        })?;

        if !has_method {
            return Err(Error::MissingAttribute("METHOD"));
        }
        key.check()?;
        Ok(key)
    }

    fn check(&self) -> Result<()> {
        if self.method != KeyMethod::None && self.uri.as_deref().unwrap_or("").is_empty() {
            return Err(Error::MissingAttribute("URI"));
        }
        Ok(())
    }
}

impl Value for Key {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        write_attrs(w, true, &[Attr::new("METHOD", &self.method)])?;
        if self.method == KeyMethod::None {
            // METHOD=NONE forbids every other attribute.
            return Ok(());
        }

        self.check()?;
        let iv = match &self.iv {
            Some(iv) => decode_hex_sequence(iv).map_err(|e| e.context("IV"))?,
            None => Vec::new(),
        };

        write_attrs(
            w,
            false,
            &[
                Attr::new("IV", &HexSeq(&iv)),
                Attr::new("URI", &QuotedStr(self.uri.as_deref().unwrap_or(""))),
                Attr::new("KEYFORMAT", &QuotedStr(self.key_format.as_deref().unwrap_or(""))),
                Attr::new(
                    "KEYFORMATVERSIONS",
                    &QuotedStr(self.key_format_versions.as_deref().unwrap_or("")),
                ),
            ],
        )
    }
}

/// An `EXT-X-MAP` media-initialization section (RFC 8216, 4.3.2.5).
///
/// Applies to every segment after it until the next `EXT-X-MAP` or the end
/// of the playlist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InitMap {
    pub uri: String,
    pub byte_range: Option<ByteRange>,
}

impl InitMap {
    pub(crate) fn decode(s: &str) -> Result<InitMap> {
        let mut map = InitMap::default();

        iter_attributes(s, 0, |name, value| {
            match name {
                "URI" => map.uri = decode_quoted(value)?,
                "BYTERANGE" => {
                    let text = decode_quoted(value)?;
                    map.byte_range = Some(ByteRange::decode(&text)?);
                }
                _ => {}
            }
            Ok(())
        })?;

        if map.uri.is_empty() {
            return Err(Error::MissingAttribute("URI"));
        }
        Ok(map)
    }
}

impl Value for InitMap {
    fn is_zero(&self) -> bool {
        self.uri.is_empty()
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.uri.is_empty() {
            return Err(Error::MissingAttribute("URI"));
        }

        // BYTERANGE is a quoted string wrapping the byte-range form.
        let range = self.byte_range.filter(|r| r.length > 0).map(|r| r.to_string());
        write_attrs(
            w,
            true,
            &[
                Attr::new("URI", &QuotedStr(&self.uri)),
                Attr::new("BYTERANGE", &QuotedStr(range.as_deref().unwrap_or(""))),
            ],
        )
    }
}

/// An `EXT-X-MEDIA` alternative rendition (RFC 8216, 4.3.4.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Media {
    pub media_type: MediaType,
    /// Group this rendition belongs to. Required.
    pub group_id: String,
    /// Human-readable name, unique within the group. Required.
    pub name: String,
    pub language: Option<String>,
    pub assoc_language: Option<String>,
    /// `CC1`..`CC4` or `SERVICE1`..`SERVICE63`. Only valid (and then
    /// required) for CLOSED-CAPTIONS renditions.
    pub instream_id: Option<String>,
    pub characteristics: Option<String>,
    pub channels: Option<String>,
    /// Media playlist URI. Forbidden for CLOSED-CAPTIONS renditions.
    pub uri: Option<String>,
    pub autoselect: bool,
    pub is_default: bool,
    pub forced: bool,
}

impl Media {
    pub fn new(media_type: MediaType, group_id: impl Into<String>, name: impl Into<String>) -> Media {
        Media {
            media_type,
            group_id: group_id.into(),
            name: name.into(),
            language: None,
            assoc_language: None,
            instream_id: None,
            characteristics: None,
            channels: None,
            uri: None,
            autoselect: false,
            is_default: false,
            forced: false,
        }
    }

    /// Protocol version this rendition demands.
    pub fn min_version(&self) -> u64 {
        match &self.instream_id {
            Some(id) if id.starts_with("SERVICE") => 7,
            _ => 1,
        }
    }

    pub(crate) fn decode(s: &str) -> Result<Media> {
        let mut media = Media::new(MediaType::Audio, "", "");
        let mut has_type = false;

        iter_attributes(s, 0, |name, value| {
            match name {
                "TYPE" => {
                    media.media_type = MediaType::decode(value)?;
                    has_type = true;
                }
                "GROUP-ID" => media.group_id = decode_quoted(value)?,
                "NAME" => media.name = decode_quoted(value)?,
                "LANGUAGE" => media.language = Some(decode_quoted(value)?),
                "ASSOC-LANGUAGE" => media.assoc_language = Some(decode_quoted(value)?),
                "DEFAULT" => media.is_default = decode_yes_no(value)?,
                "FORCED" => media.forced = decode_yes_no(value)?,
                "AUTOSELECT" => media.autoselect = decode_yes_no(value)?,
                "INSTREAM-ID" => media.instream_id = Some(decode_quoted(value)?),
                "CHARACTERISTICS" => media.characteristics = Some(decode_quoted(value)?),
                "CHANNELS" => media.channels = Some(decode_quoted(value)?),
                "URI" => media.uri = Some(decode_quoted(value)?),
                _ => {}
            }
            Ok(())
        })?;

        if !has_type {
            return Err(Error::MissingAttribute("TYPE"));
        }
        media.check()?;
        Ok(media)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::MissingAttribute("NAME"));
        }
        if self.group_id.is_empty() {
            return Err(Error::MissingAttribute("GROUP-ID"));
        }

        if self.media_type == MediaType::ClosedCaptions {
            if self.uri.is_some() {
                return Err(Error::InvalidAttributeValue.context("URI"));
            }
            if !valid_instream_id(self.instream_id.as_deref().unwrap_or("")) {
                return Err(Error::InvalidAttributeValue.context("INSTREAM-ID"));
            }
        } else if self.instream_id.is_some() {
            // INSTREAM-ID is only valid for CLOSED-CAPTIONS renditions.
            return Err(Error::InvalidAttributeValue.context("INSTREAM-ID"));
        }

        Ok(())
    }
}

fn valid_instream_id(id: &str) -> bool {
    match id {
        "CC1" | "CC2" | "CC3" | "CC4" => true,
        _ => match id.strip_prefix("SERVICE") {
            Some(n) => matches!(n.parse::<u64>(), Ok(v) if (1..=63).contains(&v)),
            None => false,
        },
    }
}

impl Value for Media {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        self.check()?;

        write_attrs(
            w,
            true,
            &[
                Attr::new("TYPE", &self.media_type),
                Attr::new("GROUP-ID", &QuotedStr(&self.group_id)),
                Attr::new("NAME", &QuotedStr(&self.name)),
                Attr::new("LANGUAGE", &QuotedStr(self.language.as_deref().unwrap_or(""))),
                Attr::new(
                    "ASSOC-LANGUAGE",
                    &QuotedStr(self.assoc_language.as_deref().unwrap_or("")),
                ),
                Attr::new("DEFAULT", &YesNo(self.is_default)),
                Attr::new("FORCED", &YesNo(self.forced)),
                Attr::new("AUTOSELECT", &YesNo(self.autoselect)),
                Attr::new("INSTREAM-ID", &QuotedStr(self.instream_id.as_deref().unwrap_or(""))),
                Attr::new(
                    "CHARACTERISTICS",
                    &QuotedStr(self.characteristics.as_deref().unwrap_or("")),
                ),
                Attr::new("CHANNELS", &QuotedStr(self.channels.as_deref().unwrap_or(""))),
                Attr::new("URI", &QuotedStr(self.uri.as_deref().unwrap_or(""))),
            ],
        )
    }
}

/// An `EXT-X-STREAM-INF` variant stream (RFC 8216, 4.3.4.2).
///
/// The URI comes from the line that follows the tag, not from an attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamInf {
    pub uri: String,
    /// Peak bandwidth in bits per second. Required, non-zero.
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    pub codecs: Vec<String>,
    pub hdcp_level: Option<HdcpLevel>,
    pub frame_rate: Option<f64>,
    pub resolution: Option<Resolution>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub subtitles: Option<String>,
    /// The literal `NONE` is emitted unquoted; any other value is quoted.
    pub closed_captions: Option<String>,
}

impl StreamInf {
    pub(crate) fn decode(s: &str) -> Result<StreamInf> {
        let mut inf = StreamInf::default();

        iter_attributes(s, 0, |name, value| {
            match name {
                "BANDWIDTH" => inf.bandwidth = decode_decimal_integer(value, 1)?,
                "AVERAGE-BANDWIDTH" => {
                    inf.average_bandwidth = Some(decode_decimal_integer(value, 0)?)
                }
                "CODECS" => {
                    inf.codecs = decode_quoted(value)?.split(',').map(str::to_owned).collect()
                }
                "RESOLUTION" => inf.resolution = Some(Resolution::decode(value)?),
                "FRAME-RATE" => inf.frame_rate = Some(decode_decimal_float(value)?),
                "HDCP-LEVEL" => inf.hdcp_level = Some(HdcpLevel::decode(value)?),
                "AUDIO" => inf.audio = Some(decode_quoted(value)?),
                "VIDEO" => inf.video = Some(decode_quoted(value)?),
                "SUBTITLES" => inf.subtitles = Some(decode_quoted(value)?),
                "CLOSED-CAPTIONS" => {
                    inf.closed_captions = Some(if value == "NONE" {
                        "NONE".to_owned()
                    } else {
                        decode_quoted(value)?
                    })
                }
                _ => {}
            }
            Ok(())
        })?;

        if inf.bandwidth == 0 {
            return Err(Error::MissingAttribute("BANDWIDTH"));
        }
        Ok(inf)
    }
}

impl Value for StreamInf {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.bandwidth == 0 {
            return Err(Error::MissingAttribute("BANDWIDTH"));
        }

        let codecs = self.codecs.join(",");
        let cc = self.closed_captions.as_deref().unwrap_or("");
        let cc_quoted = QuotedStr(cc);
        let cc_bare = UnquotedStr(cc);
        let closed_captions: &dyn Value = if cc.is_empty() || cc == "NONE" {
            &cc_bare
        } else {
            &cc_quoted
        };

        write_attrs(
            w,
            true,
            &[
                Attr::new("BANDWIDTH", &DecimalInteger(self.bandwidth)),
                Attr::new(
                    "AVERAGE-BANDWIDTH",
                    &DecimalInteger(self.average_bandwidth.unwrap_or(0)),
                ),
                Attr::new("CODECS", &QuotedStr(&codecs)),
                Attr::new("FRAME-RATE", &DecimalFloat(self.frame_rate.unwrap_or(0.0))),
                Attr::new("HDCP-LEVEL", &self.hdcp_level),
                Attr::new("RESOLUTION", &self.resolution),
                Attr::new("AUDIO", &QuotedStr(self.audio.as_deref().unwrap_or(""))),
                Attr::new("VIDEO", &QuotedStr(self.video.as_deref().unwrap_or(""))),
                Attr::new("SUBTITLES", &QuotedStr(self.subtitles.as_deref().unwrap_or(""))),
                Attr::new("CLOSED-CAPTIONS", closed_captions),
            ],
        )
    }
}

/// An `EXT-X-I-FRAME-STREAM-INF` I-frame variant (RFC 8216, 4.3.4.3).
///
/// Unlike `EXT-X-STREAM-INF`, the URI is a quoted attribute.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IFrameStreamInf {
    pub uri: String,
    /// Peak bandwidth in bits per second. Required, non-zero.
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    pub codecs: Vec<String>,
    pub hdcp_level: Option<HdcpLevel>,
    pub resolution: Option<Resolution>,
    pub video: Option<String>,
}

impl IFrameStreamInf {
    pub(crate) fn decode(s: &str) -> Result<IFrameStreamInf> {
        let mut inf = IFrameStreamInf::default();

        iter_attributes(s, 0, |name, value| {
            match name {
                "URI" => inf.uri = decode_quoted(value)?,
                "BANDWIDTH" => inf.bandwidth = decode_decimal_integer(value, 1)?,
                "AVERAGE-BANDWIDTH" => {
                    inf.average_bandwidth = Some(decode_decimal_integer(value, 0)?)
                }
                "CODECS" => {
                    inf.codecs = decode_quoted(value)?.split(',').map(str::to_owned).collect()
                }
                "RESOLUTION" => inf.resolution = Some(Resolution::decode(value)?),
                "HDCP-LEVEL" => inf.hdcp_level = Some(HdcpLevel::decode(value)?),
                "VIDEO" => inf.video = Some(decode_quoted(value)?),
                _ => {}
            }
            Ok(())
        })?;

        inf.check()?;
        Ok(inf)
    }

    fn check(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(Error::MissingAttribute("URI"));
        }
        if self.bandwidth == 0 {
            return Err(Error::MissingAttribute("BANDWIDTH"));
        }
        Ok(())
    }
}

impl Value for IFrameStreamInf {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        self.check()?;

        let codecs = self.codecs.join(",");
        write_attrs(
            w,
            true,
            &[
                Attr::new("BANDWIDTH", &DecimalInteger(self.bandwidth)),
                Attr::new(
                    "AVERAGE-BANDWIDTH",
                    &DecimalInteger(self.average_bandwidth.unwrap_or(0)),
                ),
                Attr::new("CODECS", &QuotedStr(&codecs)),
                Attr::new("HDCP-LEVEL", &self.hdcp_level),
                Attr::new("RESOLUTION", &self.resolution),
                Attr::new("VIDEO", &QuotedStr(self.video.as_deref().unwrap_or(""))),
                Attr::new("URI", &QuotedStr(&self.uri)),
            ],
        )
    }
}

/// An `EXT-X-SESSION-DATA` entry (RFC 8216, 4.3.4.4).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionData {
    /// Reverse-DNS data identifier. Required.
    pub data_id: String,
    pub value: Option<String>,
    pub uri: Option<String>,
    pub language: Option<String>,
}

impl SessionData {
    pub(crate) fn decode(s: &str) -> Result<SessionData> {
        let mut data = SessionData::default();

        iter_attributes(s, 0, |name, value| {
            match name {
                "DATA-ID" => data.data_id = decode_quoted(value)?,
                "VALUE" => data.value = Some(decode_quoted(value)?),
                "LANGUAGE" => data.language = Some(decode_quoted(value)?),
                "URI" => data.uri = Some(decode_quoted(value)?),
                _ => {}
            }
            Ok(())
        })?;

        if data.data_id.is_empty() {
            return Err(Error::MissingAttribute("DATA-ID"));
        }
        Ok(data)
    }
}

impl Value for SessionData {
    fn is_zero(&self) -> bool {
        false
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.data_id.is_empty() {
            return Err(Error::MissingAttribute("DATA-ID"));
        }

        write_attrs(
            w,
            true,
            &[
                Attr::new("DATA-ID", &QuotedStr(&self.data_id)),
                Attr::new("VALUE", &QuotedStr(self.value.as_deref().unwrap_or(""))),
                Attr::new("LANGUAGE", &QuotedStr(self.language.as_deref().unwrap_or(""))),
                Attr::new("URI", &QuotedStr(self.uri.as_deref().unwrap_or(""))),
            ],
        )
    }
}

/// An `EXT-X-START` preferred start point (RFC 8216, 4.3.5.2).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Start {
    /// Offset from the beginning (or, if negative, the end) of the
    /// playlist, in seconds. Required, non-zero.
    pub time_offset: f64,
    pub precise: bool,
}

impl Start {
    pub(crate) fn decode(s: &str) -> Result<Start> {
        let mut start = Start::default();

        iter_attributes(s, 0, |name, value| {
            match name {
                "TIME-OFFSET" => start.time_offset = decode_signed_decimal_float(value)?,
                "PRECISE" => start.precise = decode_yes_no(value)?,
                _ => {}
            }
            Ok(())
        })?;

        if start.time_offset == 0.0 {
            return Err(Error::MissingAttribute("TIME-OFFSET"));
        }
        Ok(start)
    }
}

impl Value for Start {
    fn is_zero(&self) -> bool {
        self.time_offset == 0.0
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        write_attrs(
            w,
            true,
            &[
                Attr::new("TIME-OFFSET", &SignedDecimalFloat(self.time_offset)),
                Attr::new("PRECISE", &YesNo(self.precise)),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(value: &dyn Value) -> String {
        let mut buf = Vec::new();
        value.encode(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn byte_range_align16_and_iframe_adjust() {
        let aligned = ByteRange { length: 123456, offset: 789012 }.align16();
        assert_eq!(aligned, ByteRange { length: 123456, offset: 789008 });

        let (iframe, has_iv) = aligned.adjust_for_iframe();
        assert_eq!(iframe, ByteRange { length: 123472, offset: 788992 });
        assert!(has_iv);

        let (front, has_iv) = ByteRange { length: 32, offset: 0 }.adjust_for_iframe();
        assert_eq!(front, ByteRange { length: 48, offset: 0 });
        assert!(!has_iv);
    }

    #[test]
    fn byte_range_wire_forms() {
        assert_eq!(ByteRange::decode("1234@5678").unwrap(), ByteRange { length: 1234, offset: 5678 });
        assert_eq!(ByteRange::decode("1234").unwrap(), ByteRange { length: 1234, offset: 0 });
        assert!(ByteRange::decode("0").is_err());
        assert!(ByteRange::decode("x@1").is_err());

        assert_eq!(encode(&ByteRange { length: 1234, offset: 5678 }), "1234@5678");
        assert_eq!(encode(&ByteRange { length: 1234, offset: 0 }), "1234");
    }

    #[test]
    fn format_iv_is_upper_hex_with_prefix() {
        let iv: Vec<u8> = (1..=16).collect();
        assert_eq!(format_iv(&iv, true), "0x0102030405060708090A0B0C0D0E0F10");
    }

    #[test]
    #[should_panic(expected = "16-octet")]
    fn format_iv_strict_panics_on_short_iv() {
        format_iv(&[1, 2, 3], true);
    }

    #[test]
    fn key_decode_normalizes_iv_and_orders_attributes() {
        let key = Key::decode(
            "METHOD=AES-128,URI=\"https://example.com/key\",IV=0xabcdef0123456789abcdef0123456789",
        )
        .unwrap();
        assert_eq!(key.method, KeyMethod::Aes128);
        assert_eq!(key.iv.as_deref(), Some("0xABCDEF0123456789ABCDEF0123456789"));
        assert_eq!(key.min_version(), 2);

        assert_eq!(
            encode(&key),
            "METHOD=AES-128,IV=0xABCDEF0123456789ABCDEF0123456789,URI=\"https://example.com/key\""
        );
    }

    #[test]
    fn key_method_none_suppresses_other_attributes() {
        let key = Key {
            method: KeyMethod::None,
            uri: Some("https://example.com/key".to_owned()),
            ..Key::default()
        };
        assert_eq!(encode(&key), "METHOD=NONE");
    }

    #[test]
    fn key_requires_uri_unless_none() {
        let err = Key::decode("METHOD=AES-128").unwrap_err();
        assert!(matches!(err.root(), Error::MissingAttribute("URI")));

        assert!(Key::decode("METHOD=NONE").is_ok());

        let err = Key::decode("URI=\"https://example.com/key\"").unwrap_err();
        assert!(matches!(err.root(), Error::MissingAttribute("METHOD")));
    }

    #[test]
    fn key_format_raises_min_version() {
        let key = Key {
            method: KeyMethod::Aes128,
            uri: Some("k".to_owned()),
            key_format: Some("identity".to_owned()),
            ..Key::default()
        };
        assert_eq!(key.min_version(), 5);
    }

    #[test]
    fn init_map_byte_range_is_quoted() {
        let map = InitMap {
            uri: "init.mp4".to_owned(),
            byte_range: Some(ByteRange { length: 720, offset: 0 }),
        };
        assert_eq!(encode(&map), "URI=\"init.mp4\",BYTERANGE=\"720\"");

        let parsed = InitMap::decode("URI=\"init.mp4\",BYTERANGE=\"720\"").unwrap();
        assert_eq!(parsed, map);
    }

    #[test]
    fn media_instream_id_rules() {
        let mut cc = Media::new(MediaType::ClosedCaptions, "cc", "English");
        cc.instream_id = Some("CC1".to_owned());
        assert!(cc.check().is_ok());

        cc.instream_id = Some("SERVICE63".to_owned());
        assert!(cc.check().is_ok());
        assert_eq!(cc.min_version(), 7);

        for bad in ["SERVICE64", "SERVICE0", "CC5", "cc1", ""] {
            cc.instream_id = Some(bad.to_owned());
            assert!(cc.check().is_err(), "accepted {bad:?}");
        }

        cc.instream_id = Some("CC1".to_owned());
        cc.uri = Some("captions.m3u8".to_owned());
        assert!(cc.check().is_err());

        let mut audio = Media::new(MediaType::Audio, "aac", "English");
        audio.instream_id = Some("CC1".to_owned());
        assert!(audio.check().is_err());
    }

    #[test]
    fn stream_inf_closed_captions_none_is_bare() {
        let mut inf = StreamInf { bandwidth: 1280000, ..StreamInf::default() };
        inf.closed_captions = Some("NONE".to_owned());
        assert_eq!(encode(&inf), "BANDWIDTH=1280000,CLOSED-CAPTIONS=NONE");

        inf.closed_captions = Some("cc".to_owned());
        assert_eq!(encode(&inf), "BANDWIDTH=1280000,CLOSED-CAPTIONS=\"cc\"");
    }

    #[test]
    fn stream_inf_decode_splits_codecs() {
        let inf = StreamInf::decode(
            "BANDWIDTH=2560000,CODECS=\"mp4a.40.2,avc1.4d401f\",RESOLUTION=1280x720,FRAME-RATE=29.97",
        )
        .unwrap();
        assert_eq!(inf.bandwidth, 2560000);
        assert_eq!(inf.codecs, ["mp4a.40.2", "avc1.4d401f"]);
        assert_eq!(inf.resolution, Some(Resolution { width: 1280, height: 720 }));
        assert_eq!(inf.frame_rate, Some(29.97));

        let err = StreamInf::decode("CODECS=\"mp4a.40.2\"").unwrap_err();
        assert!(matches!(err.root(), Error::MissingAttribute("BANDWIDTH")));
    }

    #[test]
    fn session_data_requires_data_id() {
        let err = SessionData::decode("VALUE=\"x\"").unwrap_err();
        assert!(matches!(err.root(), Error::MissingAttribute("DATA-ID")));
    }

    #[test]
    fn start_round_trip() {
        let start = Start::decode("TIME-OFFSET=-12.5,PRECISE=YES").unwrap();
        assert_eq!(start, Start { time_offset: -12.5, precise: true });
        assert_eq!(encode(&start), "TIME-OFFSET=-12.5,PRECISE=YES");

        assert!(Start::decode("PRECISE=YES").is_err());
    }
}
