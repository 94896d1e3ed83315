// Error taxonomy - fatal errors abort the run, warnings accumulate
// Tag decode failures are neither: they just yield tag-less entries

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Configuration problems are raised before any scanning
/// starts; the rest abort the current build or write.
#[derive(Debug, Error)]
pub enum Error {
    #[error("playlist file {path} must end in .m3u or .m3u8")]
    PlaylistExtension { path: PathBuf },

    #[error("{path} is an m3u8 playlist, which is always UTF-8")]
    M3u8Encoding { path: PathBuf },

    #[error("minimum size {min} is larger than maximum size {max}")]
    SizeRange { min: u64, max: u64 },

    #[error("minimum length {min}s is larger than maximum length {max}s")]
    LengthRange { min: f64, max: f64 },

    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid size {literal:?}: expected bytes or a kb/mb/gb suffix")]
    SizeLiteral { literal: String },

    #[error("invalid duration {literal:?}: expected seconds or MM:SS")]
    DurationLiteral { literal: String },

    #[error("invalid tag filter {literal:?}: expected FIELD=VALUE")]
    TagFilter { literal: String },

    #[error("unknown tag field {name:?}")]
    TagField { name: String },

    #[error("unknown order key {name:?}")]
    OrderKey { name: String },

    #[error("unknown encoding {name:?}")]
    EncodingName { name: String },

    #[error("nothing to write: no files matched the current filters")]
    EmptyResult,

    #[error("cannot encode {text:?} as {encoding}")]
    Encoding {
        text: String,
        encoding: &'static str,
    },

    #[error("failed to write playlist {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions. These are collected during a build, reported to
/// the caller alongside the result, and never abort anything.
#[derive(Debug, Error)]
pub enum ScanWarning {
    #[error("cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("not an absolute http(s) link: {link:?}")]
    InvalidLink { link: String },

    #[error("cannot read playlist {path}: {message}")]
    UnreadablePlaylist { path: PathBuf, message: String },

    #[error("replaced characters not representable as {encoding} in {text:?}")]
    LossyEncoding {
        text: String,
        encoding: &'static str,
    },
}
