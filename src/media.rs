//! Media playlist model, finalization, validation, and encoder.

use std::cmp::Ordering;
use std::io::Write;

use chrono::TimeDelta;

use crate::attr::{write_flag_tag, write_tag};
use crate::error::{Error, Result};
use crate::segment::MediaSegment;
use crate::tags::{InitMap, Key, Start, Tag};
use crate::value::{DecimalFloat, DecimalInteger, Timestamp, UnquotedStr, Value};

/// Media playlist type: VOD, EVENT, or unspecified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaylistKind {
    /// No `EXT-X-PLAYLIST-TYPE` tag; segments may be added or removed.
    #[default]
    None,
    /// The playlist never changes.
    Vod,
    /// Segments are only ever appended.
    Event,
}

impl PlaylistKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaylistKind::None => "",
            PlaylistKind::Vod => "VOD",
            PlaylistKind::Event => "EVENT",
        }
    }

    pub(crate) fn decode(s: &str) -> Result<PlaylistKind> {
        match s {
            "VOD" => Ok(PlaylistKind::Vod),
            "EVENT" => Ok(PlaylistKind::Event),
            _ => Err(Error::InvalidPlaylistKind),
        }
    }
}

impl Value for PlaylistKind {
    fn is_zero(&self) -> bool {
        *self == PlaylistKind::None
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        if self.is_zero() {
            return Err(Error::InvalidPlaylistKind);
        }
        w.write_all(self.as_str().as_bytes())?;
        Ok(())
    }
}

/// A media playlist: the segments of one stream with their timing,
/// encryption, and byte-range metadata.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaPlaylist {
    /// Declared protocol version; 0 means unspecified.
    pub version: u64,
    pub start: Option<Start>,
    /// Upper bound on any segment's rounded duration, in seconds.
    pub target_duration: u64,
    /// Media sequence number of the first segment.
    pub media_sequence: u64,
    /// Discontinuity sequence in effect before the first segment.
    pub discontinuity_sequence: u64,
    pub playlist_kind: PlaylistKind,
    pub independent_segments: bool,
    pub iframe_only: bool,
    pub endlist: bool,
    pub segments: Vec<MediaSegment>,
}

impl MediaPlaylist {
    /// The largest protocol version any contained construct demands, or the
    /// declared version if that is higher.
    pub fn min_version(&self) -> u64 {
        self.version.max(self.inferred_min_version())
    }

    fn inferred_min_version(&self) -> u64 {
        let mut version = 1;
        for segment in &self.segments {
            if segment.duration.fract() != 0.0 {
                version = version.max(3);
            }
            if let Some(range) = &segment.byte_range {
                version = version.max(range.min_version());
            }
            for key in &segment.keys {
                version = version.max(key.min_version());
            }
            if segment.init_map.is_some() {
                version = version.max(if self.iframe_only { 5 } else { 6 });
            }
        }
        if self.iframe_only {
            version = version.max(4);
        }
        version
    }

    /// Sum of all segment durations, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Populate the derived per-segment numbering and propagate
    /// `EXT-X-PROGRAM-DATE-TIME` across segments that lack one.
    ///
    /// The parser runs this once after a successful parse. Call it on a
    /// hand-constructed playlist before relying on the derived
    /// [`MediaSegment::media_sequence`] and
    /// [`MediaSegment::discontinuity_sequence`] fields.
    pub fn finalize(&mut self) {
        let base = self.media_sequence;
        let mut discontinuity = self.discontinuity_sequence;

        for (i, segment) in self.segments.iter_mut().enumerate() {
            segment.media_sequence = base + i as u64;
            if segment.discontinuity {
                discontinuity += 1;
            }
            segment.discontinuity_sequence = discontinuity;
        }

        if let Some(first) = self.segments.first() {
            self.media_sequence = first.media_sequence;
        }

        self.propagate_program_date_time();
    }

    /// Bridge program-date-time gaps in both directions from the first
    /// anchored segment: backwards, each segment's time is the successor's
    /// minus its own duration; forwards, the predecessor's plus the
    /// predecessor's duration. Later anchors are honoured as-is.
    fn propagate_program_date_time(&mut self) {
        let Some(anchor) = self
            .segments
            .iter()
            .position(|s| s.program_date_time.is_some())
        else {
            return;
        };

        for i in (0..anchor).rev() {
            if self.segments[i].program_date_time.is_none() {
                let next = self.segments[i + 1].program_date_time;
                let delta = seconds_to_delta(self.segments[i].duration);
                self.segments[i].program_date_time = next.map(|t| t - delta);
            }
        }

        for i in anchor + 1..self.segments.len() {
            if self.segments[i].program_date_time.is_none() {
                let previous = self.segments[i - 1].program_date_time;
                let delta = seconds_to_delta(self.segments[i - 1].duration);
                self.segments[i].program_date_time = previous.map(|t| t + delta);
            }
        }
    }

    /// Index of the segment whose media sequence equals `seq`, or `None`
    /// when the playlist does not contain it.
    ///
    /// Only meaningful after [`finalize`](Self::finalize).
    pub fn segment_index_by_media_sequence(&self, seq: u64) -> Option<usize> {
        let index = seq.checked_sub(self.media_sequence)? as usize;
        if index >= self.segments.len() {
            return None;
        }

        match self.segments[index].media_sequence.cmp(&seq) {
            Ordering::Equal => Some(index),
            Ordering::Greater => self.segments[..index]
                .iter()
                .rposition(|s| s.media_sequence == seq),
            Ordering::Less => self.segments[index + 1..]
                .iter()
                .position(|s| s.media_sequence == seq)
                .map(|i| index + 1 + i),
        }
    }

    /// Check the playlist against the rules a well-formed media playlist
    /// must satisfy: a declared version at or above the inferred minimum,
    /// at least one segment, and no segment whose rounded duration exceeds
    /// the target duration.
    pub fn validate(&self) -> Result<()> {
        let required = self.inferred_min_version();
        if self.version > 0 && self.version < required {
            return Err(Error::TooLowVersion { declared: self.version, required });
        }

        if self.segments.is_empty() {
            return Err(Error::MissingMediaSegments);
        }

        for (index, segment) in self.segments.iter().enumerate() {
            if (segment.duration + 0.5) as u64 > self.target_duration {
                return Err(Error::SegmentExceedsTargetDuration { index });
            }
        }

        Ok(())
    }

    /// Validate and encode the playlist in M3U8 form.
    ///
    /// On error the contents of `w` are unspecified.
    ///
    /// # Panics
    ///
    /// Panics when a segment has an empty URI or a non-positive duration;
    /// those are contract violations of the public model, not input errors.
    pub fn output<W: Write>(&self, w: &mut W) -> Result<()> {
        self.validate()?;
        self.encode(w)
    }

    fn encode(&self, w: &mut dyn Write) -> Result<()> {
        w.write_all(Tag::M3u.as_str().as_bytes())?;
        w.write_all(b"\n")?;

        let version = self.min_version();
        if version > 1 {
            write_tag(w, Tag::Version, &DecimalInteger(version))?;
        }

        write_flag_tag(w, Tag::IndependentSegments, self.independent_segments)?;
        write_tag(w, Tag::Start, &self.start)?;

        write_tag(w, Tag::PlaylistType, &self.playlist_kind)?;
        write_tag(w, Tag::TargetDuration, &DecimalInteger(self.target_duration))?;
        write_flag_tag(w, Tag::IFramesOnly, self.iframe_only)?;
        write_tag(w, Tag::MediaSequence, &DecimalInteger(self.media_sequence))?;
        write_tag(w, Tag::DiscontinuitySequence, &DecimalInteger(self.discontinuity_sequence))?;

        // Keys and init maps apply forward until superseded, so a segment
        // repeating the previously emitted set emits nothing.
        let mut last_keys: Vec<Key> = Vec::new();
        let mut last_map: Option<InitMap> = None;

        for segment in &self.segments {
            assert!(!segment.uri.is_empty(), "missing URI in media segment");
            assert!(segment.duration > 0.0, "missing duration in media segment");

            let keys = sorted_keys(&segment.keys);
            if keys != last_keys {
                for key in &segment.keys {
                    write_tag(w, Tag::Key, key)?;
                }
                last_keys = keys;
            }

            if segment.init_map != last_map {
                if let Some(map) = &segment.init_map {
                    write_tag(w, Tag::Map, map)?;
                }
                last_map = segment.init_map.clone();
            }

            write_flag_tag(w, Tag::Discontinuity, segment.discontinuity)?;
            write_tag(w, Tag::ProgramDateTime, &segment.program_date_time.map(Timestamp))?;
            write_tag(w, Tag::ByteRange, &segment.byte_range)?;

            w.write_all(Tag::Inf.as_str().as_bytes())?;
            w.write_all(b":")?;
            DecimalFloat(segment.duration).encode(w)?;
            w.write_all(b",")?;
            w.write_all(segment.title.as_bytes())?;
            w.write_all(b"\n")?;

            UnquotedStr(&segment.uri).encode(w).map_err(|e| e.context("URI"))?;
            w.write_all(b"\n")?;
        }

        write_flag_tag(w, Tag::EndList, self.endlist)?;
        Ok(())
    }
}

/// The comparison form of a segment's key set: stable-sorted by KEYFORMAT,
/// then URI, so reordered but otherwise identical sets compare equal.
fn sorted_keys(keys: &[Key]) -> Vec<Key> {
    let mut keys = keys.to_vec();
    keys.sort_by(|a, b| a.key_format.cmp(&b.key_format).then_with(|| a.uri.cmp(&b.uri)));
    keys
}

fn seconds_to_delta(seconds: f64) -> TimeDelta {
    TimeDelta::milliseconds((seconds * 1000.0).round() as i64)
}
