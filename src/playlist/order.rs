// Ordering - one stable sort keyed per user choice, or a uniform shuffle
// Missing keys (no tags, no mtime) sort after everything that has one

use std::cmp::Ordering;
use std::str::FromStr;

use rand::prelude::*;

use crate::error::Error;

use super::PlaylistEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    /// Case-insensitive path
    Name,
    /// Filesystem modification time
    Date,
    /// Tag track number
    Track,
    /// Tag year
    Year,
    /// File size in bytes
    Size,
    /// Track duration in seconds
    Length,
}

impl FromStr for OrderKey {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Error> {
        match name.to_ascii_lowercase().as_str() {
            "name" => Ok(OrderKey::Name),
            "date" => Ok(OrderKey::Date),
            "track" => Ok(OrderKey::Track),
            "year" => Ok(OrderKey::Year),
            "size" => Ok(OrderKey::Size),
            "length" => Ok(OrderKey::Length),
            _ => Err(Error::OrderKey {
                name: name.to_string(),
            }),
        }
    }
}

/// Stable sort by the chosen key. Descending reverses the comparator, not
/// the result, so entries with equal keys keep their relative order either
/// way.
pub fn sort_entries(entries: &mut [PlaylistEntry], key: OrderKey, descending: bool) {
    entries.sort_by(|a, b| {
        let ordering = compare(a, b, key);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

/// Uniform random permutation. Ignores the descending flag by design of
/// the caller: there is no direction to a shuffle.
pub fn shuffle_entries(entries: &mut [PlaylistEntry]) {
    entries.shuffle(&mut thread_rng());
}

fn compare(a: &PlaylistEntry, b: &PlaylistEntry, key: OrderKey) -> Ordering {
    match key {
        OrderKey::Name => a
            .path
            .to_lowercase()
            .cmp(&b.path.to_lowercase()),
        OrderKey::Date => compare_option(a.modified, b.modified),
        OrderKey::Track => compare_option(
            a.tags.as_ref().and_then(|t| t.track),
            b.tags.as_ref().and_then(|t| t.track),
        ),
        OrderKey::Year => compare_option(
            a.tags.as_ref().and_then(|t| t.year),
            b.tags.as_ref().and_then(|t| t.year),
        ),
        OrderKey::Size => compare_option(a.size, b.size),
        OrderKey::Length => {
            let a = a.tags.as_ref().and_then(|t| t.length_seconds);
            let b = b.tags.as_ref().and_then(|t| t.length_seconds);
            match (a, b) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
    }
}

fn compare_option<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
