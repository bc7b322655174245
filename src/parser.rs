//! Line-oriented parser state machine.
//!
//! The parser reads the input line by line, trims ASCII whitespace, skips
//! blank lines and comments (`#` without the `EXT` prefix), and dispatches
//! tag lines to a lazily created master or media builder. A URI line closes
//! the builder's in-progress variant or segment. Parsing ends at end of
//! input or at `EXT-X-ENDLIST`.
//!
//! Every parse-phase error is wrapped with the 1-based line number and the
//! offending line text. Unknown tags are logged at debug level and never
//! fail the parse.

use std::io::{BufRead, BufReader, Read};

use tracing::debug;

use crate::error::{Error, Result};
use crate::master::{MasterPlaylist, Variant};
use crate::media::{MediaPlaylist, PlaylistKind};
use crate::playlist::{ParseOptions, Playlist};
use crate::segment::MediaSegment;
use crate::attr::split_attributes;
use crate::tags::{
    ByteRange, IFrameStreamInf, InitMap, Key, KeyMethod, Media, SessionData, Start, StreamInf, Tag,
};
use crate::value::{
    decode_decimal_float, decode_decimal_integer, decode_timestamp, decode_unquoted,
};

/// Which builder receives the next URI line.
#[derive(Clone, Copy, PartialEq, Eq)]
enum UriSink {
    None,
    Master,
    Media,
}

pub(crate) struct Parser {
    lineno: usize,
    line: String,
    strict: bool,

    version: u64,
    start: Option<Start>,
    independent_segments: bool,

    master: Option<MasterBuilder>,
    media: Option<MediaBuilder>,
    sink: UriSink,
}

impl Parser {
    pub(crate) fn new(options: ParseOptions) -> Parser {
        Parser {
            lineno: 0,
            line: String::new(),
            strict: options.strict,
            version: 0,
            start: None,
            independent_segments: false,
            master: None,
            media: None,
            sink: UriSink::None,
        }
    }

    pub(crate) fn parse<R: Read>(mut self, reader: R) -> Result<Playlist> {
        let mut reader = BufReader::new(reader);
        if let Err(e) = self.run(&mut reader) {
            return Err(e.at_line(self.lineno, self.line));
        }
        self.finish()
    }

    fn run(&mut self, reader: &mut impl BufRead) -> Result<()> {
        match self.read_line(reader)? {
            Some(line) if line == Tag::M3u.as_str() => {}
            _ => return Err(Error::NotM3u),
        }

        while let Some(line) = self.read_line(reader)? {
            if line.starts_with('#') {
                self.parse_tag_line(&line)?;
            } else {
                self.parse_uri_line(&line)?;
            }

            if self.media.as_ref().is_some_and(MediaBuilder::end) {
                break;
            }
        }

        Ok(())
    }

    /// Read the next non-trivial line, keeping a copy for error reporting.
    fn read_line(&mut self, reader: &mut impl BufRead) -> Result<Option<String>> {
        let mut buf = String::new();
        loop {
            self.lineno += 1;
            buf.clear();
            if reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }

            let line = buf.trim();
            if line.is_empty() || (line.starts_with('#') && !line.starts_with("#EXT")) {
                continue;
            }

            self.line = line.to_owned();
            return Ok(Some(self.line.clone()));
        }
    }

    fn parse_tag_line(&mut self, line: &str) -> Result<()> {
        let (name, attr) = match line.split_once(':') {
            Some((name, attr)) => (name, attr),
            None => (line, ""),
        };

        self.dispatch_tag(name, attr).map_err(|e| e.context(name))
    }

    fn dispatch_tag(&mut self, name: &str, attr: &str) -> Result<()> {
        let Some(tag) = Tag::from_name(name) else {
            debug!(tag = name, attr, "unknown tag");
            return Ok(());
        };

        match tag {
            // Basic tags
            Tag::M3u => {
                if self.strict {
                    return Err(Error::DuplicatedTag);
                }
            }
            Tag::Version => {
                if self.version > 0 && self.strict {
                    return Err(Error::DuplicatedTag);
                }
                self.version = decode_decimal_integer(attr, 1)?;
            }

            // Media or master playlist tags.
            // EXT-X-INDEPENDENT-SEGMENTS applies to every media segment; in
            // a master playlist it applies to every media playlist in it
            // (RFC 8216, 4.3.5.1).
            Tag::IndependentSegments => self.independent_segments = true,
            Tag::Start => self.start = Some(Start::decode(attr)?),

            // Master playlist tags
            Tag::Media | Tag::StreamInf | Tag::IFrameStreamInf | Tag::SessionData
            | Tag::SessionKey => {
                if self.media.is_some() {
                    return Err(Error::MixedMasterMedia);
                }
                let builder = self.master.get_or_insert_with(MasterBuilder::default);
                builder.parse_tag(tag, attr)?;
                if builder.has_current() {
                    self.sink = UriSink::Master;
                }
            }

            // Media segment and media playlist tags
            Tag::Inf
            | Tag::ByteRange
            | Tag::Discontinuity
            | Tag::Key
            | Tag::Map
            | Tag::ProgramDateTime
            | Tag::DateRange
            | Tag::TargetDuration
            | Tag::MediaSequence
            | Tag::DiscontinuitySequence
            | Tag::EndList
            | Tag::PlaylistType
            | Tag::IFramesOnly => {
                if self.master.is_some() {
                    return Err(Error::MixedMasterMedia);
                }
                let strict = self.strict;
                let builder = self.media.get_or_insert_with(MediaBuilder::default);
                builder.parse_tag(tag, attr, strict)?;
                if builder.has_current() {
                    self.sink = UriSink::Media;
                }
            }
        }

        Ok(())
    }

    fn parse_uri_line(&mut self, line: &str) -> Result<()> {
        let uri = decode_unquoted(line).map_err(|_| Error::InvalidUri)?;
        match self.sink {
            UriSink::None => return Err(Error::InvalidUri),
            UriSink::Master => {
                if let Some(builder) = self.master.as_mut() {
                    builder.set_uri(uri);
                }
            }
            UriSink::Media => {
                if let Some(builder) = self.media.as_mut() {
                    builder.set_uri(uri);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Playlist> {
        let Parser { version, start, independent_segments, master, media, .. } = self;

        if let Some(builder) = master {
            let playlist = builder.finish(version, start, independent_segments);
            playlist.validate()?;
            return Ok(Playlist::Master(playlist));
        }

        if let Some(builder) = media {
            let mut playlist = builder.finish(version, start, independent_segments);
            playlist.finalize();
            playlist.validate()?;
            return Ok(Playlist::Media(playlist));
        }

        Err(Error::NotMasterOrMedia)
    }
}

#[derive(Default)]
struct MasterBuilder {
    playlist: MasterPlaylist,
    current: Option<Variant>,
}

impl MasterBuilder {
    fn has_current(&self) -> bool {
        self.current.is_some()
    }

    fn open(&mut self) -> &mut Variant {
        self.current.get_or_insert_with(Variant::default)
    }

    /// Close the in-progress variant with its URI line.
    fn set_uri(&mut self, uri: String) {
        if let Some(mut variant) = self.current.take() {
            variant.stream_inf.uri = uri;
            self.playlist.variants.push(variant);
        }
    }

    fn parse_tag(&mut self, tag: Tag, attr: &str) -> Result<()> {
        match tag {
            Tag::Media => {
                let media = Media::decode(attr)?;
                self.open().renditions.push(media);
            }
            Tag::StreamInf => {
                let inf = StreamInf::decode(attr)?;
                self.open().stream_inf = inf;
            }
            Tag::IFrameStreamInf => {
                let inf = IFrameStreamInf::decode(attr)?;
                self.open().i_frame_streams.push(inf);
            }
            Tag::SessionData => {
                let data = SessionData::decode(attr)?;
                self.open().session_data.push(data);
            }
            Tag::SessionKey => {
                let key = Key::decode(attr)?;
                if key.method == KeyMethod::None {
                    return Err(Error::SessionKeyMethodNone);
                }
                self.open().session_keys.push(key);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self, version: u64, start: Option<Start>, independent_segments: bool) -> MasterPlaylist {
        let mut playlist = self.playlist;
        playlist.version = version;
        playlist.start = start;
        playlist.independent_segments = independent_segments;

        // Highest quality first; the sort is stable so equal resolutions
        // keep their input order.
        playlist.variants.sort_by(|a, b| {
            let ra = a.stream_inf.resolution.unwrap_or_default();
            let rb = b.stream_inf.resolution.unwrap_or_default();
            rb.width.cmp(&ra.width).then(rb.height.cmp(&ra.height))
        });

        playlist
    }
}

#[derive(Default)]
struct MediaBuilder {
    playlist: MediaPlaylist,
    current: Option<MediaSegment>,
}

impl MediaBuilder {
    fn end(&self) -> bool {
        self.playlist.endlist
    }

    fn has_current(&self) -> bool {
        self.current.is_some()
    }

    fn open(&mut self) -> &mut MediaSegment {
        self.current.get_or_insert_with(MediaSegment::default)
    }

    /// Close the in-progress segment with its URI line. A segment without
    /// explicit keys inherits the key set of the previous segment.
    fn set_uri(&mut self, uri: String) {
        if let Some(mut segment) = self.current.take() {
            if segment.keys.is_empty() {
                if let Some(previous) = self.playlist.segments.last() {
                    segment.keys = previous.keys.clone();
                }
            }
            segment.uri = uri;
            self.playlist.segments.push(segment);
        }
    }

    fn parse_tag(&mut self, tag: Tag, attr: &str, strict: bool) -> Result<()> {
        match tag {
            // Media segment tags
            Tag::Inf => {
                // Applies only to the next media segment and is required for
                // each one (RFC 8216, 4.3.2.1).
                let items = split_attributes(attr, 2);
                let duration = decode_decimal_float(items[0])?;
                if duration <= 0.0 {
                    return Err(Error::InvalidDecimalFloat);
                }

                let segment = self.open();
                segment.duration = duration;
                if let Some(title) = items.get(1) {
                    segment.title = (*title).to_owned();
                }
            }
            Tag::ByteRange => {
                // Applies only to the next URI line (RFC 8216, 4.3.2.2).
                let range = ByteRange::decode(attr)?;
                self.open().byte_range = Some(range);
            }
            Tag::Discontinuity => self.open().discontinuity = true,
            Tag::Key => {
                // Applies until the next key with the same KEYFORMAT
                // (RFC 8216, 4.3.2.4); keys with distinct KEYFORMATs
                // accumulate on the same segment.
                let key = Key::decode(attr)?;
                self.open().keys.push(key);
            }
            Tag::Map => {
                // Applies to every segment after it until the next EXT-X-MAP
                // (RFC 8216, 4.3.2.5).
                let map = InitMap::decode(attr)?;
                self.open().init_map = Some(map);
            }
            Tag::ProgramDateTime => {
                let time = decode_timestamp(attr)?;
                self.open().program_date_time = Some(time);
            }
            Tag::DateRange => {
                // Classifies the playlist as media; the tag itself is not
                // modeled.
                self.open();
            }

            // Media playlist tags
            Tag::TargetDuration => {
                if self.playlist.target_duration > 0 && strict {
                    return Err(Error::DuplicatedTag);
                }
                self.playlist.target_duration = decode_decimal_integer(attr, 1)?;
            }
            Tag::MediaSequence => {
                if self.playlist.media_sequence > 0 && strict {
                    return Err(Error::DuplicatedTag);
                }
                self.playlist.media_sequence = decode_decimal_integer(attr, 1)?;
            }
            Tag::DiscontinuitySequence => {
                // Must precede the first media segment and any
                // EXT-X-DISCONTINUITY (RFC 8216, 4.3.3.3).
                if self.playlist.discontinuity_sequence > 0 && strict {
                    return Err(Error::DuplicatedTag);
                }
                let sequence = decode_decimal_integer(attr, 1)?;
                if strict && (!self.playlist.segments.is_empty() || self.current.is_some()) {
                    return Err(Error::MisplacedTag);
                }
                self.playlist.discontinuity_sequence = sequence;
            }
            Tag::EndList => {
                if self.playlist.endlist && strict {
                    return Err(Error::DuplicatedTag);
                }
                self.playlist.endlist = true;
            }
            Tag::PlaylistType => {
                if self.playlist.playlist_kind != PlaylistKind::None && strict {
                    return Err(Error::DuplicatedTag);
                }
                self.playlist.playlist_kind = PlaylistKind::decode(attr)?;
            }
            Tag::IFramesOnly => {
                if self.playlist.iframe_only && strict {
                    return Err(Error::DuplicatedTag);
                }
                self.playlist.iframe_only = true;
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(self, version: u64, start: Option<Start>, independent_segments: bool) -> MediaPlaylist {
        let mut playlist = self.playlist;
        playlist.version = version;
        playlist.start = start;
        playlist.independent_segments = independent_segments;
        playlist
    }
}
