//! Public parse entry points and the playlist sum type.

use std::io::{Read, Write};

use crate::error::Result;
use crate::master::MasterPlaylist;
use crate::media::MediaPlaylist;
use crate::parser::Parser;

/// Type tag of a master playlist.
pub const PLAYLIST_TYPE_MASTER: &str = "Master";
/// Type tag of a media playlist.
pub const PLAYLIST_TYPE_MEDIA: &str = "Media";

/// A parsed playlist: master or media. The two never mix; a document
/// containing tags of both kinds fails to parse.
#[derive(Clone, Debug, PartialEq)]
pub enum Playlist {
    Master(MasterPlaylist),
    Media(MediaPlaylist),
}

impl Playlist {
    /// [`PLAYLIST_TYPE_MASTER`] or [`PLAYLIST_TYPE_MEDIA`].
    pub fn type_tag(&self) -> &'static str {
        match self {
            Playlist::Master(_) => PLAYLIST_TYPE_MASTER,
            Playlist::Media(_) => PLAYLIST_TYPE_MEDIA,
        }
    }

    /// The largest protocol version any contained construct demands, or the
    /// declared version if that is higher.
    pub fn min_version(&self) -> u64 {
        match self {
            Playlist::Master(playlist) => playlist.min_version(),
            Playlist::Media(playlist) => playlist.min_version(),
        }
    }

    /// Validate and encode the playlist in M3U8 form.
    ///
    /// On error the contents of `w` are unspecified.
    pub fn output<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Playlist::Master(playlist) => playlist.output(w),
            Playlist::Media(playlist) => playlist.output(w),
        }
    }
}

/// Parser configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParseOptions {
    /// Reject duplicated singleton tags and an `EXT-X-DISCONTINUITY-SEQUENCE`
    /// appearing after the first segment, instead of accepting them the way
    /// real-world playlists require.
    pub strict: bool,
}

/// Decode a master or media playlist from `reader` in relaxed mode.
pub fn parse<R: Read>(reader: R) -> Result<Playlist> {
    parse_with_options(reader, ParseOptions::default())
}

/// Decode a master or media playlist from `reader`.
pub fn parse_with_options<R: Read>(reader: R, options: ParseOptions) -> Result<Playlist> {
    Parser::new(options).parse(reader)
}
