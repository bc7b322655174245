//! Master playlist model, validation, and encoder.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use crate::attr::{write_flag_tag, write_tag};
use crate::error::{Error, Result};
use crate::tags::{IFrameStreamInf, Key, KeyMethod, Media, SessionData, Start, StreamInf, Tag};
use crate::value::{DecimalInteger, UnquotedStr, Value};

/// One selectable variant: the `EXT-X-STREAM-INF` entry plus the session
/// keys, session data, alternative renditions, and I-frame streams declared
/// with it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Variant {
    pub stream_inf: StreamInf,
    pub renditions: Vec<Media>,
    pub i_frame_streams: Vec<IFrameStreamInf>,
    pub session_data: Vec<SessionData>,
    pub session_keys: Vec<Key>,
}

/// A master playlist: variant streams and their alternative renditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MasterPlaylist {
    /// Declared protocol version; 0 means unspecified.
    pub version: u64,
    pub start: Option<Start>,
    pub independent_segments: bool,
    /// After parsing, variants are ordered by descending resolution
    /// (width, then height); equal resolutions keep their input order.
    pub variants: Vec<Variant>,
}

impl MasterPlaylist {
    /// The largest protocol version any contained construct demands, or the
    /// declared version if that is higher.
    pub fn min_version(&self) -> u64 {
        self.version.max(self.inferred_min_version())
    }

    fn inferred_min_version(&self) -> u64 {
        self.variants
            .iter()
            .flat_map(|v| v.renditions.iter())
            .map(Media::min_version)
            .max()
            .unwrap_or(1)
    }

    /// Check the playlist against the rules a well-formed master playlist
    /// must satisfy: every variant has a URI, rendition names are unique
    /// per group with at most one DEFAULT, and no session key uses
    /// `METHOD=NONE`.
    pub fn validate(&self) -> Result<()> {
        for variant in &self.variants {
            if variant.stream_inf.uri.is_empty() {
                return Err(Error::MissingAttribute("URI").context(Tag::StreamInf.as_str()));
            }

            check_renditions(&variant.renditions)?;

            for key in &variant.session_keys {
                if key.method == KeyMethod::None {
                    return Err(Error::SessionKeyMethodNone.context(Tag::SessionKey.as_str()));
                }
            }
        }
        Ok(())
    }

    /// Validate and encode the playlist in M3U8 form.
    ///
    /// On error the contents of `w` are unspecified.
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

        for variant in &self.variants {
            for key in &variant.session_keys {
                write_tag(w, Tag::SessionKey, key)?;
            }
            for data in &variant.session_data {
                write_tag(w, Tag::SessionData, data)?;
            }
            for media in &variant.renditions {
                write_tag(w, Tag::Media, media)?;
            }
            for stream in &variant.i_frame_streams {
                write_tag(w, Tag::IFrameStreamInf, stream)?;
            }

            write_tag(w, Tag::StreamInf, &variant.stream_inf)?;
            UnquotedStr(&variant.stream_inf.uri)
                .encode(w)
                .map_err(|e| e.context("URI"))?;
            w.write_all(b"\n")?;
        }

        Ok(())
    }
}

fn check_renditions(renditions: &[Media]) -> Result<()> {
    for media in renditions {
        media.check()?;
    }

    if renditions.len() < 2 {
        return Ok(());
    }

    struct Group<'a> {
        names: HashSet<&'a str>,
        has_default: bool,
    }

    let mut groups: HashMap<&str, Group<'_>> = HashMap::new();
    for media in renditions {
        let group = groups.entry(&media.group_id).or_insert_with(|| Group {
            names: HashSet::new(),
            has_default: false,
        });

        if !group.names.insert(&media.name) {
            return Err(Error::DuplicateRenditionName {
                name: media.name.clone(),
                group: media.group_id.clone(),
            });
        }

        if media.is_default {
            if group.has_default {
                return Err(Error::MultipleDefaultRenditions {
                    group: media.group_id.clone(),
                });
            }
            group.has_default = true;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::MediaType;

    fn variant(bandwidth: u64, uri: &str) -> Variant {
        Variant {
            stream_inf: StreamInf {
                uri: uri.to_owned(),
                bandwidth,
                ..StreamInf::default()
            },
            ..Variant::default()
        }
    }

    #[test]
    fn validate_requires_variant_uri() {
        let playlist = MasterPlaylist {
            variants: vec![variant(1280000, "")],
            ..MasterPlaylist::default()
        };
        let err = playlist.validate().unwrap_err();
        assert!(matches!(err.root(), Error::MissingAttribute("URI")));
        assert_eq!(err.to_string(), "#EXT-X-STREAM-INF: missing URI");
    }

    #[test]
    fn validate_rejects_duplicate_rendition_names() {
        let mut v = variant(1280000, "low.m3u8");
        v.renditions = vec![
            Media::new(MediaType::Audio, "aac", "English"),
            Media::new(MediaType::Audio, "aac", "English"),
        ];
        let playlist = MasterPlaylist { variants: vec![v], ..MasterPlaylist::default() };
        assert!(matches!(
            playlist.validate().unwrap_err(),
            Error::DuplicateRenditionName { .. }
        ));
    }

    #[test]
    fn validate_rejects_multiple_defaults_in_a_group() {
        let mut english = Media::new(MediaType::Audio, "aac", "English");
        english.is_default = true;
        let mut german = Media::new(MediaType::Audio, "aac", "Deutsch");
        german.is_default = true;

        let mut v = variant(1280000, "low.m3u8");
        v.renditions = vec![english, german];
        let playlist = MasterPlaylist { variants: vec![v], ..MasterPlaylist::default() };
        assert!(matches!(
            playlist.validate().unwrap_err(),
            Error::MultipleDefaultRenditions { .. }
        ));

        // One default per group is fine.
        let mut english = Media::new(MediaType::Audio, "aac", "English");
        english.is_default = true;
        let mut v = variant(1280000, "low.m3u8");
        v.renditions = vec![english, Media::new(MediaType::Audio, "aac", "Deutsch")];
        let playlist = MasterPlaylist { variants: vec![v], ..MasterPlaylist::default() };
        assert!(playlist.validate().is_ok());
    }

    #[test]
    fn validate_rejects_none_session_keys() {
        let mut v = variant(1280000, "low.m3u8");
        v.session_keys = vec![Key { method: KeyMethod::None, ..Key::default() }];
        let playlist = MasterPlaylist { variants: vec![v], ..MasterPlaylist::default() };
        assert!(matches!(
            playlist.validate().unwrap_err().root(),
            Error::SessionKeyMethodNone
        ));
    }

    #[test]
    fn min_version_follows_renditions() {
        let mut cc = Media::new(MediaType::ClosedCaptions, "cc", "English");
        cc.instream_id = Some("SERVICE1".to_owned());

        let mut v = variant(1280000, "low.m3u8");
        v.renditions = vec![cc];
        let playlist = MasterPlaylist { variants: vec![v], ..MasterPlaylist::default() };
        assert_eq!(playlist.min_version(), 7);
    }

    #[test]
    fn encode_emits_streams_in_order() {
        let playlist = MasterPlaylist {
            variants: vec![
                variant(1280000, "http://example.com/low.m3u8"),
                variant(2560000, "http://example.com/mid.m3u8"),
            ],
            ..MasterPlaylist::default()
        };

        let mut buf = Vec::new();
        playlist.output(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=1280000\n\
             http://example.com/low.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2560000\n\
             http://example.com/mid.m3u8\n"
        );
    }
}
