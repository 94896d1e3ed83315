// mixtape - make M3U playlists from the command line
// Scan directories, filter what matters, order it, write the playlist

use std::io::{self, BufRead, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use regex::Regex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mixtape::config::Config;
use mixtape::error::Error;
use mixtape::media::FormatRegistry;
use mixtape::playlist::filter::{parse_duration, parse_size, FilterCriteria, TagField};
use mixtape::playlist::writer::{Encoding, PathStyle, WriteMode, WriteOptions};
use mixtape::playlist::{BuildConfig, OrderKey, PlaylistBuilder, PlaylistWriter};

#[derive(Parser)]
#[command(name = "mixtape")]
#[command(version, about = "Make M3U playlists from the command line")]
struct Args {
    /// Playlist file to write (.m3u or .m3u8)
    playlist: PathBuf,

    /// Directories that contain multimedia files
    #[arg(short, long, num_args = 1..)]
    directories: Vec<PathBuf>,

    /// Directory paths excluded from the scan, subtrees included
    #[arg(short, long = "exclude-dirs", num_args = 1..)]
    exclude_dirs: Vec<PathBuf>,

    /// Select only these file formats (repeatable)
    #[arg(short, long = "format")]
    formats: Vec<String>,

    /// Enable extra file formats on top of the built-in set
    #[arg(short, long = "include-formats", num_args = 1..)]
    include_formats: Vec<String>,

    /// Regular expression a path must match to be included
    #[arg(short, long)]
    pattern: Option<String>,

    /// Regular expression that excludes matching paths
    #[arg(short = 'P', long = "exclude-pattern")]
    exclude_pattern: Option<String>,

    /// Minimum file size (bytes, or a number with kb/mb/gb suffix)
    #[arg(long = "min-size", value_name = "SIZE")]
    min_size: Option<String>,

    /// Maximum file size (bytes, or a number with kb/mb/gb suffix)
    #[arg(long = "max-size", value_name = "SIZE")]
    max_size: Option<String>,

    /// Minimum track length (seconds or MM:SS)
    #[arg(long = "min-length", value_name = "LENGTH")]
    min_length: Option<String>,

    /// Maximum track length (seconds or MM:SS)
    #[arg(long = "max-length", value_name = "LENGTH")]
    max_length: Option<String>,

    /// Keep only files whose tag matches FIELD=VALUE (repeatable)
    #[arg(long = "tag", value_name = "FIELD=VALUE")]
    tags: Vec<String>,

    /// Recursive search
    #[arg(short, long)]
    recursive: bool,

    /// The same files are not placed in the playlist twice
    #[arg(short, long)]
    unique: bool,

    /// Absolute file names
    #[arg(short, long)]
    absolute: bool,

    /// Casual order
    #[arg(short, long, conflicts_with = "orderby")]
    shuffle: bool,

    /// Sort by name, date, track, year, size, or length
    #[arg(long, value_name = "KEY")]
    orderby: Option<String>,

    /// Reverse the chosen order (ignored by --shuffle)
    #[arg(long)]
    descending: bool,

    /// Maximum number of tracks
    #[arg(short, long = "max-tracks", value_name = "NUMBER")]
    max_tracks: Option<usize>,

    /// Continue the playlist instead of overwriting it
    #[arg(short = 'c', long)]
    append: bool,

    /// Merge entries from existing playlists (repeatable)
    #[arg(short, long = "join", num_args = 1.., value_name = "PLAYLIST")]
    joins: Vec<PathBuf>,

    /// Add specific files regardless of the scan (repeatable)
    #[arg(long = "file", num_args = 1.., value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Add remote http(s) links (repeatable)
    #[arg(short, long = "link", num_args = 1.., value_name = "URL")]
    links: Vec<String>,

    /// Also write one playlist per source directory
    #[arg(long)]
    split: bool,

    /// Playlist title header
    #[arg(short, long)]
    title: Option<String>,

    /// Playlist image header
    #[arg(short = 'g', long)]
    image: Option<PathBuf>,

    /// Write #EXTINF lines where duration and title are known
    #[arg(short = 'n', long = "add-info")]
    add_info: bool,

    /// Output text encoding: utf-8, latin-1, or ascii
    #[arg(long, value_name = "NAME")]
    encoding: Option<String>,

    /// Replace characters the encoding cannot represent instead of failing
    #[arg(long = "ignore-encoding-errors")]
    ignore_encoding_errors: bool,

    /// Percent-escape URL characters in paths
    #[arg(long = "url-chars")]
    url_chars: bool,

    /// Backslash path separators, for players raised on Windows
    #[arg(long, conflicts_with = "forward")]
    windows: bool,

    /// Force forward-slash path separators
    #[arg(long)]
    forward: bool,

    /// Confirm every file before it is added
    #[arg(short = 'I', long)]
    interactive: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "mixtape=debug,info"
    } else {
        "mixtape=info,warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;
    run(args)
}

fn run(args: Args) -> Result<()> {
    // Load config - falls back to defaults if missing
    let defaults = Config::load()?;

    let encoding = match &args.encoding {
        Some(name) => Encoding::parse(name)?,
        None => Encoding::Utf8,
    };

    // Target problems should surface before any scanning starts
    PlaylistWriter::validate_target(&args.playlist, encoding)?;

    let registry = FormatRegistry::with_extra(&args.include_formats);
    let criteria = build_criteria(&args)?;

    let directories = if args.directories.is_empty() {
        defaults.directories.clone()
    } else {
        args.directories.clone()
    };
    let order = args
        .orderby
        .as_deref()
        .map(|name| name.parse::<OrderKey>())
        .transpose()?;

    let config = BuildConfig {
        directories,
        exclude_dirs: args.exclude_dirs.clone(),
        criteria,
        recursive: args.recursive || defaults.recursive,
        unique: args.unique || defaults.unique,
        extra_files: args.files.clone(),
        links: args.links.clone(),
        joins: args.joins.clone(),
        split: args.split,
        max_tracks: args.max_tracks,
        order,
        shuffle: args.shuffle,
        descending: args.descending,
        add_info: args.add_info,
        append_target: args.append.then(|| args.playlist.clone()),
        title: args.title.clone(),
        image: args.image.clone(),
    };

    let builder = PlaylistBuilder::new(&registry);
    let outcome = if args.interactive {
        let mut prompt = |path: &Path| ask_confirmation(path);
        builder.build_with(&config, Some(&mut prompt))?
    } else {
        builder.build(&config)?
    };

    let options = WriteOptions {
        mode: if args.append {
            WriteMode::Append
        } else {
            WriteMode::Overwrite
        },
        encoding,
        path_style: if args.windows {
            PathStyle::Backslash
        } else if args.forward {
            PathStyle::Forward
        } else {
            PathStyle::Native
        },
        absolute: args.absolute,
        escape_url_chars: args.url_chars,
        add_info: args.add_info,
        ignore_encoding_errors: args.ignore_encoding_errors,
    };

    for warning in PlaylistWriter::write(&args.playlist, &outcome.playlist, &options)? {
        warn!("{warning}");
    }
    info!(
        "{}: {} tracks",
        args.playlist.display(),
        outcome.playlist.len()
    );

    // Per-directory playlists always start fresh; appending only makes
    // sense for the aggregate
    let split_options = WriteOptions {
        mode: WriteMode::Overwrite,
        ..options
    };
    for (root, playlist) in &outcome.splits {
        let target = split_target(&args.playlist, root);
        for warning in PlaylistWriter::write(&target, playlist, &split_options)? {
            warn!("{warning}");
        }
        info!("{}: {} tracks", target.display(), playlist.len());
    }

    Ok(())
}

fn build_criteria(args: &Args) -> Result<FilterCriteria> {
    let mut criteria = FilterCriteria::default();

    for format in &args.formats {
        criteria
            .formats
            .insert(format.trim_matches(['*', '.']).to_ascii_lowercase());
    }
    if let Some(pattern) = &args.pattern {
        criteria.include_pattern = Some(compile_pattern(pattern)?);
    }
    if let Some(pattern) = &args.exclude_pattern {
        criteria.exclude_pattern = Some(compile_pattern(pattern)?);
    }
    criteria.min_size = args.min_size.as_deref().map(parse_size).transpose()?;
    criteria.max_size = args.max_size.as_deref().map(parse_size).transpose()?;
    criteria.min_length = args.min_length.as_deref().map(parse_duration).transpose()?;
    criteria.max_length = args.max_length.as_deref().map(parse_duration).transpose()?;
    for literal in &args.tags {
        criteria.metadata_filters.push(TagField::parse_filter(literal)?);
    }

    criteria.validate()?;
    Ok(criteria)
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| {
        Error::Pattern {
            pattern: pattern.to_string(),
            source,
        }
        .into()
    })
}

fn ask_confirmation(path: &Path) -> bool {
    print!("add {}? [Y/n] ", path.display());
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

/// out.m3u + /music/rock -> out-rock.m3u, next to the aggregate.
fn split_target(target: &Path, root: &Path) -> PathBuf {
    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("playlist");
    let extension = target
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("m3u");
    let dir_name = root
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("directory");
    target.with_file_name(format!("{stem}-{dir_name}.{extension}"))
}
