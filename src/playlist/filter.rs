// Filter chain - extension, regex, size, duration, tag equality
// Cheap checks run first so tag reads only happen when they can still matter

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::{Error, Result};
use crate::media::FormatRegistry;

use super::PlaylistEntry;

/// Tag fields a metadata filter can match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Artist,
    Album,
    Title,
    Track,
    Year,
}

impl TagField {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "artist" => Ok(TagField::Artist),
            "album" => Ok(TagField::Album),
            "title" => Ok(TagField::Title),
            "track" => Ok(TagField::Track),
            "year" => Ok(TagField::Year),
            _ => Err(Error::TagField {
                name: name.to_string(),
            }),
        }
    }

    /// Parse a "FIELD=VALUE" argument into a metadata filter pair.
    pub fn parse_filter(literal: &str) -> Result<(Self, String)> {
        let (field, value) = literal.split_once('=').ok_or_else(|| Error::TagFilter {
            literal: literal.to_string(),
        })?;
        Ok((Self::parse(field.trim())?, value.to_string()))
    }
}

/// Immutable snapshot of every filter for one build.
#[derive(Debug, Default)]
pub struct FilterCriteria {
    /// Allowed extensions; empty means "anything the registry enables"
    pub formats: BTreeSet<String>,
    pub include_pattern: Option<Regex>,
    pub exclude_pattern: Option<Regex>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    pub min_length: Option<f64>,
    pub max_length: Option<f64>,
    /// All pairs must match, in order, case-sensitively
    pub metadata_filters: Vec<(TagField, String)>,
}

impl FilterCriteria {
    /// Inverted ranges are configuration mistakes, caught before scanning.
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                return Err(Error::SizeRange { min, max });
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(Error::LengthRange { min, max });
            }
        }
        Ok(())
    }

    /// True when matching needs a tag read (length bounds or tag equality).
    pub fn needs_tags(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some() || !self.metadata_filters.is_empty()
    }
}

pub struct PathFilter<'a> {
    criteria: &'a FilterCriteria,
    registry: &'a FormatRegistry,
}

impl<'a> PathFilter<'a> {
    pub fn new(criteria: &'a FilterCriteria, registry: &'a FormatRegistry) -> Self {
        Self { criteria, registry }
    }

    /// Full check; expects tags to already be attached when required.
    pub fn matches(&self, entry: &PlaylistEntry) -> bool {
        self.matches_path(entry) && self.matches_tags(entry)
    }

    /// The cheap half: extension, patterns, size. Safe to call before any
    /// tag read has happened.
    pub fn matches_path(&self, entry: &PlaylistEntry) -> bool {
        self.matches_extension(entry) && self.matches_patterns(entry) && self.matches_size(entry)
    }

    pub fn matches_extension(&self, entry: &PlaylistEntry) -> bool {
        if self.criteria.formats.is_empty() {
            self.registry.contains(&entry.extension)
        } else {
            self.criteria.formats.contains(&entry.extension)
        }
    }

    pub fn matches_patterns(&self, entry: &PlaylistEntry) -> bool {
        if let Some(include) = &self.criteria.include_pattern {
            if !include.is_match(&entry.path) {
                return false;
            }
        }
        if let Some(exclude) = &self.criteria.exclude_pattern {
            if exclude.is_match(&entry.path) {
                return false;
            }
        }
        true
    }

    fn matches_size(&self, entry: &PlaylistEntry) -> bool {
        // Unknown size (remote links) bypasses size bounds
        let Some(size) = entry.size else {
            return true;
        };
        if let Some(min) = self.criteria.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.criteria.max_size {
            if size > max {
                return false;
            }
        }
        true
    }

    /// The expensive half: duration bounds and tag equality. Fails closed
    /// when a bound is configured but the entry carries no tags.
    pub fn matches_tags(&self, entry: &PlaylistEntry) -> bool {
        if self.criteria.min_length.is_some() || self.criteria.max_length.is_some() {
            let Some(length) = entry.tags.as_ref().and_then(|t| t.length_seconds) else {
                return false;
            };
            if let Some(min) = self.criteria.min_length {
                if length < min {
                    return false;
                }
            }
            if let Some(max) = self.criteria.max_length {
                if length > max {
                    return false;
                }
            }
        }

        for (field, expected) in &self.criteria.metadata_filters {
            let Some(tags) = entry.tags.as_ref() else {
                return false;
            };
            let actual = match field {
                TagField::Artist => tags.artist.clone(),
                TagField::Album => tags.album.clone(),
                TagField::Title => tags.title.clone(),
                TagField::Track => tags.track.map(|t| t.to_string()),
                TagField::Year => tags.year.map(|y| y.to_string()),
            };
            if actual.as_deref() != Some(expected.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Parse a size literal: bare bytes, or a number with a kb/mb/gb suffix
/// (1024-based, case-insensitive).
pub fn parse_size(literal: &str) -> Result<u64> {
    let lower = literal.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = lower.strip_suffix("kb") {
        (n, 1024u64)
    } else if let Some(n) = lower.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else {
        (lower.as_str(), 1)
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| Error::SizeLiteral {
            literal: literal.to_string(),
        })
}

/// Parse a duration literal: bare seconds ("240", "3.5") or colon form
/// ("3:30", "1:02:30").
pub fn parse_duration(literal: &str) -> Result<f64> {
    let trimmed = literal.trim();
    let err = || Error::DurationLiteral {
        literal: literal.to_string(),
    };

    if trimmed.contains(':') {
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(err());
        }
        let mut seconds = 0u64;
        for part in &parts {
            let value: u64 = part.parse().map_err(|_| err())?;
            seconds = seconds * 60 + value;
        }
        Ok(seconds as f64)
    } else {
        let seconds: f64 = trimmed.parse().map_err(|_| err())?;
        if seconds.is_finite() && seconds >= 0.0 {
            Ok(seconds)
        } else {
            Err(err())
        }
    }
}
