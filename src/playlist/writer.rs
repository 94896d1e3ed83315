// M3U serialization - renders the whole playlist to a buffer, then swaps
// the target file in one rename so a failed write never leaves half a list

use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result, ScanWarning};

use super::{Playlist, PlaylistEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

/// Output text encoding. M3U8 files are UTF-8 by definition; plain M3U can
/// be written as Latin-1 or ASCII for old hardware players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            _ => Err(Error::EncodingName {
                name: name.to_string(),
            }),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
        }
    }

    /// Encode one line. The bool reports whether any character had to be
    /// replaced; without `ignore`, the first unrepresentable character is
    /// fatal instead.
    fn encode(self, line: &str, ignore: bool) -> Result<(Vec<u8>, bool)> {
        match self {
            Encoding::Utf8 => Ok((line.as_bytes().to_vec(), false)),
            Encoding::Latin1 | Encoding::Ascii => {
                let limit = if self == Encoding::Ascii { 0x80 } else { 0x100 };
                let mut bytes = Vec::with_capacity(line.len());
                let mut lossy = false;
                for c in line.chars() {
                    if (c as u32) < limit {
                        bytes.push(c as u8);
                    } else if ignore {
                        bytes.push(b'?');
                        lossy = true;
                    } else {
                        return Err(Error::Encoding {
                            text: line.to_string(),
                            encoding: self.name(),
                        });
                    }
                }
                Ok((bytes, lossy))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStyle {
    /// Leave separators exactly as discovered
    #[default]
    Native,
    /// Force forward slashes
    Forward,
    /// Force backslashes (hardware players raised on Windows)
    Backslash,
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub mode: WriteMode,
    pub encoding: Encoding,
    pub path_style: PathStyle,
    /// Resolve entries to absolute paths before rendering
    pub absolute: bool,
    /// Percent-escape URL-unsafe characters in local paths
    pub escape_url_chars: bool,
    /// Emit #EXTINF lines where duration and title are known
    pub add_info: bool,
    /// Replace unrepresentable characters with '?' instead of failing
    pub ignore_encoding_errors: bool,
}

pub struct PlaylistWriter;

impl PlaylistWriter {
    /// Target sanity checks, meant to run before any scanning starts.
    pub fn validate_target(target: &Path, encoding: Encoding) -> Result<()> {
        let extension = target
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "m3u" => Ok(()),
            "m3u8" if encoding == Encoding::Utf8 => Ok(()),
            "m3u8" => Err(Error::M3u8Encoding {
                path: target.to_path_buf(),
            }),
            _ => Err(Error::PlaylistExtension {
                path: target.to_path_buf(),
            }),
        }
    }

    /// Serialize the playlist. Returns the per-line warnings produced by
    /// lossy encoding; everything else is either written completely or not
    /// at all.
    pub fn write(
        target: &Path,
        playlist: &Playlist,
        options: &WriteOptions,
    ) -> Result<Vec<ScanWarning>> {
        Self::validate_target(target, options.encoding)?;

        // Refuse before the target is opened or truncated - an accidental
        // no-match run must not destroy a previously valid playlist
        if playlist.is_empty() {
            return Err(Error::EmptyResult);
        }

        let write_err = |source: io::Error| Error::Write {
            path: target.to_path_buf(),
            source,
        };

        let mut buffer = Vec::new();
        if options.mode == WriteMode::Append {
            match fs::read(target) {
                Ok(bytes) => buffer = bytes,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(write_err(err)),
            }
        }

        // Header only on overwrite or when the file has no content yet;
        // appending must never stack a second #EXTM3U
        let emit_header = options.mode == WriteMode::Overwrite
            || buffer.iter().all(|b| b.is_ascii_whitespace());

        let mut warnings = Vec::new();
        if !buffer.is_empty() && !buffer.ends_with(b"\n") {
            buffer.push(b'\n');
        }
        for line in Self::render_lines(playlist, options, emit_header) {
            let (bytes, lossy) = options
                .encoding
                .encode(&line, options.ignore_encoding_errors)?;
            if lossy {
                warnings.push(ScanWarning::LossyEncoding {
                    text: line.clone(),
                    encoding: options.encoding.name(),
                });
            }
            buffer.extend_from_slice(&bytes);
            buffer.push(b'\n');
        }

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(&buffer).map_err(write_err)?;
        tmp.persist(target).map_err(|err| write_err(err.error))?;

        info!("wrote {} entries to {}", playlist.len(), target.display());
        Ok(warnings)
    }

    fn render_lines(playlist: &Playlist, options: &WriteOptions, emit_header: bool) -> Vec<String> {
        let mut lines = Vec::new();
        if emit_header {
            lines.push("#EXTM3U".to_string());
            if options.encoding != Encoding::Utf8 {
                lines.push(format!("#EXTENC:{}", options.encoding.name()));
            }
            if let Some(title) = &playlist.title {
                lines.push(format!("#PLAYLIST:{title}"));
            }
            if let Some(image) = &playlist.image {
                lines.push(format!("#EXTIMG:{}", image.display()));
            }
        }
        for entry in &playlist.entries {
            if options.add_info {
                if let Some(info) = extinf_line(entry) {
                    lines.push(info);
                }
            }
            lines.push(render_path(entry, options));
        }
        lines
    }
}

/// Absolute resolution, then separator style, then escaping - in that
/// order, so the escape pass sees the final separator characters. Remote
/// links pass through untouched.
fn render_path(entry: &PlaylistEntry, options: &WriteOptions) -> String {
    if entry.is_remote() {
        return entry.path.clone();
    }
    let mut path = entry.path.clone();
    if options.absolute {
        if let Ok(resolved) = std::path::absolute(Path::new(&path)) {
            path = resolved.to_string_lossy().into_owned();
        }
    }
    match options.path_style {
        PathStyle::Native => {}
        PathStyle::Forward => path = path.replace('\\', "/"),
        PathStyle::Backslash => path = path.replace('/', "\\"),
    }
    if options.escape_url_chars {
        path = escape_url_chars(&path);
    }
    path
}

fn extinf_line(entry: &PlaylistEntry) -> Option<String> {
    let tags = entry.tags.as_ref()?;
    let length = tags.length_seconds?;
    let title = tags.title.as_deref()?;
    let display = match tags.artist.as_deref() {
        Some(artist) => format!("{artist} - {title}"),
        None => title.to_string(),
    };
    Some(format!("#EXTINF:{},{}", length.round() as i64, display))
}

/// Percent-escape everything outside the URL-safe set, keeping separators
/// readable.
fn escape_url_chars(path: &str) -> String {
    const KEEP: &[u8] = b"-_.~/:";
    let mut out = String::with_capacity(path.len());
    for &byte in path.as_bytes() {
        if byte.is_ascii_alphanumeric() || KEEP.contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
