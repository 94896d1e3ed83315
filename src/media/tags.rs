// Tag extraction - normalizes whatever each container format exposes
// id3 for the mp3 family, mp4ameta for the mp4 family, symphonia for the rest
// Decode failures never propagate: a file we can't read is just tag-less

use std::fs::File;
use std::path::Path;

use id3::TagLike;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;
use tracing::debug;

use super::TagFamily;

/// The normalized subset of tag metadata the playlist pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tags {
    pub track: Option<u32>,
    pub year: Option<i32>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub length_seconds: Option<f64>,
}

impl Tags {
    pub fn is_empty(&self) -> bool {
        *self == Tags::default()
    }
}

pub struct TagReader;

impl TagReader {
    /// Read whatever metadata the file's container exposes. Returns None for
    /// unsupported formats, corrupt headers, and plain IO failures alike.
    pub fn read(path: &Path) -> Option<Tags> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let tags = match TagFamily::from_extension(&ext) {
            TagFamily::Id3 => Self::read_id3(path),
            TagFamily::Mp4 => Self::read_mp4(path),
            TagFamily::Probe => Self::probe(path, true),
            TagFamily::Header => Self::probe(path, false),
            TagFamily::Untagged => None,
        };

        // All-None tags are indistinguishable from "no tag block" to callers
        tags.filter(|t| !t.is_empty())
    }

    fn read_id3(path: &Path) -> Option<Tags> {
        match id3::Tag::read_from_path(path) {
            Ok(tag) => {
                let mut tags = Tags {
                    track: tag.track(),
                    year: tag.year(),
                    artist: tag.artist().map(str::to_string),
                    album: tag.album().map(str::to_string),
                    title: tag.title().map(str::to_string),
                    length_seconds: tag.duration().map(|ms| f64::from(ms) / 1000.0),
                };
                if tags.length_seconds.is_none() {
                    // No TLEN frame - fall back to the stream header
                    tags.length_seconds =
                        Self::probe(path, false).and_then(|t| t.length_seconds);
                }
                Some(tags)
            }
            Err(err) => {
                debug!("no id3 tag in {}: {}", path.display(), err);
                // The stream may still tell us how long the track is
                Self::probe(path, false)
            }
        }
    }

    fn read_mp4(path: &Path) -> Option<Tags> {
        match mp4ameta::Tag::read_from_path(path) {
            Ok(tag) => Some(Tags {
                track: tag.track_number().map(u32::from),
                year: tag.year().and_then(|y| y.parse().ok()),
                artist: tag.artist().map(str::to_string),
                album: tag.album().map(str::to_string),
                title: tag.title().map(str::to_string),
                length_seconds: tag.duration().map(|d| d.as_secs_f64()),
            }),
            Err(err) => {
                debug!("no mp4 atoms in {}: {}", path.display(), err);
                Self::probe(path, false)
            }
        }
    }

    /// Probe the stream with symphonia: duration from the default track's
    /// codec parameters, and optionally the text tags the demuxer surfaces
    /// (vorbis comments for flac/ogg).
    fn probe(path: &Path, with_text_tags: bool) -> Option<Tags> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(err) => {
                debug!("cannot open {}: {}", path.display(), err);
                return None;
            }
        };
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = match symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        ) {
            Ok(p) => p,
            Err(err) => {
                debug!("cannot probe {}: {}", path.display(), err);
                return None;
            }
        };

        let mut tags = Tags::default();

        if let Some(track) = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        {
            if let (Some(time_base), Some(n_frames)) =
                (track.codec_params.time_base, track.codec_params.n_frames)
            {
                let time = time_base.calc_time(n_frames);
                tags.length_seconds = Some(time.seconds as f64 + time.frac);
            }
        }

        if with_text_tags {
            // Tags can surface either from the container or from the probe
            let found_in_container = {
                let mut container_meta = probed.format.metadata();
                match container_meta.skip_to_latest() {
                    Some(revision) => {
                        apply_text_tags(&mut tags, revision);
                        true
                    }
                    None => false,
                }
            };
            if !found_in_container {
                if let Some(revision) =
                    probed.metadata.get().as_ref().and_then(|m| m.current())
                {
                    apply_text_tags(&mut tags, revision);
                }
            }
        }

        Some(tags)
    }
}

fn apply_text_tags(tags: &mut Tags, revision: &MetadataRevision) {
    for tag in revision.tags() {
        match tag.std_key {
            Some(StandardTagKey::Artist) => tags.artist = Some(tag.value.to_string()),
            Some(StandardTagKey::Album) => tags.album = Some(tag.value.to_string()),
            Some(StandardTagKey::TrackTitle) => tags.title = Some(tag.value.to_string()),
            Some(StandardTagKey::TrackNumber) => {
                tags.track = parse_track_number(&tag.value.to_string());
            }
            Some(StandardTagKey::Date) | Some(StandardTagKey::ReleaseDate) => {
                if tags.year.is_none() {
                    tags.year = parse_year(&tag.value.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Track numbers come as "3" or "3/12" depending on the tagger.
fn parse_track_number(value: &str) -> Option<u32> {
    value
        .split(['/', '-'])
        .next()
        .and_then(|n| n.trim().parse().ok())
}

/// Dates come as "1994", "1994-05-21", and similar; the year leads.
fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}
