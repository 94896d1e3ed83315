// Reads existing playlists back in - append mode and --join both land here
// Header and #EXTINF lines are skipped; every other line is a path or URL

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{is_remote_path, PlaylistEntry};

/// Parse a playlist file into entries. Local paths that still exist are
/// stat'ed for size and mtime; everything else simply comes back sizeless.
/// Tag metadata is never re-read here.
pub fn read_playlist(path: &Path) -> io::Result<Vec<PlaylistEntry>> {
    let bytes = fs::read(path)?;
    Ok(parse_playlist(&decode_text(&bytes)))
}

pub fn parse_playlist(text: &str) -> Vec<PlaylistEntry> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(entry_from_line)
        .collect()
}

fn entry_from_line(line: &str) -> PlaylistEntry {
    if is_remote_path(line) {
        return PlaylistEntry::remote(line);
    }
    let path = PathBuf::from(line);
    let mut entry = PlaylistEntry::local(&path, Path::new(""));
    if let Ok(metadata) = fs::metadata(&path) {
        entry.size = Some(metadata.len());
        entry.modified = metadata.modified().ok();
    }
    entry
}

/// Playlists are UTF-8 in practice; old ones occasionally are not, and a
/// Latin-1 reinterpretation is always lossless.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
