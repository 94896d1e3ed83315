// Media format registry - which extensions count as playlist material
// Built once per run, passed around immutably, never patched at call sites

pub mod tags;

pub use tags::{TagReader, Tags};

use std::collections::BTreeSet;

/// Everything the registry enables out of the box. Audio formats we can
/// read tags from, plus the video formats an M3U playlist commonly carries.
const DEFAULT_FORMATS: &[&str] = &[
    "mp1", "mp2", "mp3", "mp4", "m4a", "m4b", "aac", "ogg", "oga", "opus",
    "flac", "wav", "wma", "avi", "xvid", "divx", "mpeg", "mpg", "mov", "wmv",
];

/// How we get metadata out of a container, selected by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFamily {
    /// ID3 frames (mp1/mp2/mp3)
    Id3,
    /// MP4 atoms (mp4/m4a/m4b/aac/mov)
    Mp4,
    /// Vorbis comments read off the stream (flac/ogg/oga/opus)
    Probe,
    /// Duration from the stream header only, no text tags (wav)
    Header,
    /// Nothing we can decode (video formats, unknown extensions)
    Untagged,
}

impl TagFamily {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp1" | "mp2" | "mp3" => TagFamily::Id3,
            "mp4" | "m4a" | "m4b" | "aac" | "mov" => TagFamily::Mp4,
            "flac" | "ogg" | "oga" | "opus" => TagFamily::Probe,
            "wav" => TagFamily::Header,
            _ => TagFamily::Untagged,
        }
    }

    pub fn has_text_tags(&self) -> bool {
        !matches!(self, TagFamily::Header | TagFamily::Untagged)
    }
}

/// Immutable set of enabled extensions, all stored lowercase.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    enabled: BTreeSet<String>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self {
            enabled: DEFAULT_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Built-in set plus user-supplied extra extensions.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for ext in extra {
            let ext = ext.as_ref().trim_matches(['*', '.']).to_ascii_lowercase();
            if !ext.is_empty() {
                registry.enabled.insert(ext);
            }
        }
        registry
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.enabled.contains(&ext.to_ascii_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
