// Build pipeline - scan, filter, tag, extend, dedup, order, truncate, split
// One pass per source directory, then the explicit additions, then the
// whole-list transforms; nothing here touches the output file

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result, ScanWarning};
use crate::media::{FormatRegistry, TagReader};
use crate::scanner::Scanner;

use super::filter::{FilterCriteria, PathFilter};
use super::order::{self, OrderKey};
use super::reader;
use super::{is_remote_path, Playlist, PlaylistEntry};

/// Everything one build invocation needs, fixed up front.
#[derive(Debug, Default)]
pub struct BuildConfig {
    /// Root directories to scan
    pub directories: Vec<PathBuf>,
    /// Directories pruned from the scan, subtrees included
    pub exclude_dirs: Vec<PathBuf>,
    pub criteria: FilterCriteria,
    pub recursive: bool,
    /// Drop duplicate files, first occurrence wins
    pub unique: bool,
    /// Files added regardless of the scan (still filtered by format/pattern)
    pub extra_files: Vec<PathBuf>,
    /// Remote http(s) links, appended as-is
    pub links: Vec<String>,
    /// Existing playlists whose entries are merged in
    pub joins: Vec<PathBuf>,
    /// Also produce one playlist per source directory
    pub split: bool,
    pub max_tracks: Option<usize>,
    pub order: Option<OrderKey>,
    pub shuffle: bool,
    pub descending: bool,
    /// Read tags so the writer can emit #EXTINF lines
    pub add_info: bool,
    /// Target being appended to; its current entries seed the dedup set
    pub append_target: Option<PathBuf>,
    pub title: Option<String>,
    pub image: Option<PathBuf>,
}

/// What a build hands back: the aggregate playlist, the per-directory
/// buckets when splitting was requested, and every warning encountered.
#[derive(Debug)]
pub struct BuildOutcome {
    pub playlist: Playlist,
    pub splits: Vec<(PathBuf, Playlist)>,
    pub warnings: Vec<ScanWarning>,
}

pub struct PlaylistBuilder<'a> {
    registry: &'a FormatRegistry,
}

impl<'a> PlaylistBuilder<'a> {
    pub fn new(registry: &'a FormatRegistry) -> Self {
        Self { registry }
    }

    pub fn build(&self, config: &BuildConfig) -> Result<BuildOutcome> {
        self.build_with(config, None)
    }

    /// Build with an optional confirmation callback, invoked once per file
    /// that passed every filter; returning false drops the file.
    pub fn build_with(
        &self,
        config: &BuildConfig,
        mut confirm: Option<&mut dyn FnMut(&Path) -> bool>,
    ) -> Result<BuildOutcome> {
        config.criteria.validate()?;

        let mut warnings = Vec::new();
        let mut entries = Vec::new();
        let filter = PathFilter::new(&config.criteria, self.registry);
        let needs_tags = config.add_info
            || config.criteria.needs_tags()
            || matches!(
                config.order,
                Some(OrderKey::Track | OrderKey::Year | OrderKey::Length)
            );

        // 1. scan the roots
        let scanner = Scanner::new(config.recursive, &config.exclude_dirs);
        for root in &config.directories {
            let before = entries.len();
            for path in scanner.scan(root, &mut warnings) {
                if let Some(entry) = admit_file(
                    &path,
                    root,
                    &filter,
                    needs_tags,
                    false,
                    &mut warnings,
                    &mut confirm,
                ) {
                    entries.push(entry);
                }
            }
            info!(
                "{}: {} tracks matched",
                root.display(),
                entries.len() - before
            );
        }

        // 2. explicit extra files skip the directory walk but not the
        //    format/pattern filters
        for file in &config.extra_files {
            if !file.is_file() {
                push_warning(&mut warnings, ScanWarning::MissingFile { path: file.clone() });
                continue;
            }
            if let Some(entry) = admit_file(
                file,
                Path::new(""),
                &filter,
                needs_tags,
                true,
                &mut warnings,
                &mut confirm,
            ) {
                entries.push(entry);
            }
        }

        // 3. remote links, kept opaque - no fetch, no tags, no size
        for link in &config.links {
            if is_remote_path(link) {
                entries.push(PlaylistEntry::remote(link));
            } else {
                push_warning(&mut warnings, ScanWarning::InvalidLink { link: link.clone() });
            }
        }

        // 4. merge joined playlists
        for join in &config.joins {
            match reader::read_playlist(join) {
                Ok(parsed) => {
                    debug!("joined {} entries from {}", parsed.len(), join.display());
                    entries.extend(parsed);
                }
                Err(err) => push_warning(
                    &mut warnings,
                    ScanWarning::UnreadablePlaylist {
                        path: join.clone(),
                        message: err.to_string(),
                    },
                ),
            }
        }

        // 5. unique-dedup before ordering, so order keys see the final
        //    membership; appending seeds the set with what's already there
        if config.unique {
            let mut seen = HashSet::new();
            if let Some(target) = &config.append_target {
                if target.exists() {
                    match reader::read_playlist(target) {
                        Ok(existing) => {
                            for entry in existing {
                                seen.insert(entry.normalized_path());
                            }
                        }
                        Err(err) => push_warning(
                            &mut warnings,
                            ScanWarning::UnreadablePlaylist {
                                path: target.clone(),
                                message: err.to_string(),
                            },
                        ),
                    }
                }
            }
            entries.retain(|entry| seen.insert(entry.normalized_path()));
        }

        // 6. ordering
        if config.shuffle {
            order::shuffle_entries(&mut entries);
        } else if let Some(key) = config.order {
            order::sort_entries(&mut entries, key, config.descending);
        } else if config.descending {
            entries.reverse();
        }

        // 7. cap
        if let Some(max) = config.max_tracks {
            entries.truncate(max);
        }

        if entries.is_empty() {
            return Err(Error::EmptyResult);
        }

        // 8. split buckets derive from the final aggregate, so they inherit
        //    dedup, ordering, and the track cap; explicit additions have no
        //    source directory and stay aggregate-only
        let splits = if config.split {
            split_by_source(&entries, &config.directories)
        } else {
            Vec::new()
        };

        Ok(BuildOutcome {
            playlist: Playlist {
                title: config.title.clone(),
                image: config.image.clone(),
                entries,
            },
            splits,
            warnings,
        })
    }
}

/// Stat, filter, and tag one candidate file. Returns None when any filter
/// rejects it; extra files skip the size/length/metadata checks per the
/// narrower contract explicit additions get.
#[allow(clippy::too_many_arguments)]
fn admit_file(
    path: &Path,
    source_dir: &Path,
    filter: &PathFilter,
    needs_tags: bool,
    explicit: bool,
    warnings: &mut Vec<ScanWarning>,
    confirm: &mut Option<&mut dyn FnMut(&Path) -> bool>,
) -> Option<PlaylistEntry> {
    let mut entry = PlaylistEntry::local(path, source_dir);

    match fs::metadata(path) {
        Ok(metadata) => {
            entry.size = Some(metadata.len());
            entry.modified = metadata.modified().ok();
        }
        Err(err) => {
            push_warning(
                warnings,
                ScanWarning::Unreadable {
                    path: path.to_path_buf(),
                    message: err.to_string(),
                },
            );
            return None;
        }
    }

    if explicit {
        if !filter.matches_extension(&entry) || !filter.matches_patterns(&entry) {
            return None;
        }
    } else if !filter.matches_path(&entry) {
        return None;
    }

    if needs_tags {
        entry.tags = TagReader::read(path);
    }
    if !explicit && !filter.matches_tags(&entry) {
        return None;
    }

    if let Some(confirm) = confirm.as_deref_mut() {
        if !confirm(path) {
            debug!("skipped on request: {}", path.display());
            return None;
        }
    }

    Some(entry)
}

// Warnings surface in the log the moment they happen, and again in the
// outcome for callers that want to present them
fn push_warning(warnings: &mut Vec<ScanWarning>, warning: ScanWarning) {
    warn!("{warning}");
    warnings.push(warning);
}

fn split_by_source(entries: &[PlaylistEntry], roots: &[PathBuf]) -> Vec<(PathBuf, Playlist)> {
    let mut splits = Vec::new();
    for root in roots {
        let bucket: Vec<PlaylistEntry> = entries
            .iter()
            .filter(|entry| entry.source_dir == *root)
            .cloned()
            .collect();
        if !bucket.is_empty() {
            splits.push((
                root.clone(),
                Playlist {
                    entries: bucket,
                    ..Playlist::default()
                },
            ));
        }
    }
    splits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::writer::{PlaylistWriter, WriteMode, WriteOptions};
    use std::fs;

    fn write_file(path: &Path, len: usize) {
        fs::write(path, vec![0u8; len]).unwrap();
    }

    fn base_config(root: &Path) -> BuildConfig {
        BuildConfig {
            directories: vec![root.to_path_buf()],
            recursive: true,
            ..BuildConfig::default()
        }
    }

    fn registry() -> FormatRegistry {
        FormatRegistry::new()
    }

    #[test]
    fn test_scan_filter_and_collect() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("a.mp3"), 10);
        write_file(&root.join("b.flac"), 10);
        write_file(&root.join("notes.txt"), 10);

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&base_config(root)).unwrap();
        assert_eq!(outcome.playlist.len(), 2);
    }

    #[test]
    fn test_size_window_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("small.mp3"), 1024 * 1024);
        write_file(&root.join("medium.mp3"), 3 * 1024 * 1024);
        write_file(&root.join("large.mp3"), 5 * 1024 * 1024);

        let mut config = base_config(root);
        config.criteria.min_size = Some(2 * 1024 * 1024);
        config.criteria.max_size = Some(4 * 1024 * 1024);

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 1);
        assert!(outcome.playlist.entries[0].path.ends_with("medium.mp3"));
    }

    #[test]
    fn test_track_order_with_corrupt_file_last() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        for (name, track) in [("01.mp3", 1u32), ("02.mp3", 2)] {
            let path = root.join(name);
            fs::write(&path, []).unwrap();
            let mut tag = id3::Tag::new();
            tag.set_track(track);
            tag.set_title(format!("Track {track}"));
            tag.write_to_path(&path, id3::Version::Id3v24).unwrap();
        }
        fs::write(root.join("03.mp3"), b"garbage header").unwrap();

        let mut config = base_config(root);
        config.criteria.formats.insert("mp3".to_string());
        config.order = Some(OrderKey::Track);

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        let names: Vec<&str> = outcome
            .playlist
            .entries
            .iter()
            .map(|e| e.path.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(names, vec!["01.mp3", "02.mp3", "03.mp3"]);
        assert_eq!(outcome.playlist.entries[2].tags, None);
    }

    #[test]
    fn test_max_tracks_caps_the_ordered_list() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for i in 0..5 {
            write_file(&root.join(format!("{i}.mp3")), 10);
        }

        let mut config = base_config(root);
        config.max_tracks = Some(3);

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 3);

        config.max_tracks = Some(100);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 5);
    }

    #[test]
    fn test_unique_dedup_is_stable_and_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("a.mp3"), 10);
        write_file(&root.join("b.mp3"), 10);

        let mut config = base_config(root);
        // Same root twice: every file shows up twice before dedup
        config.directories.push(root.to_path_buf());
        config.unique = true;

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 2);

        let first: Vec<String> = outcome
            .playlist
            .entries
            .iter()
            .map(|e| e.normalized_path())
            .collect();

        // Dedup twice yields the same sequence as once
        let again = builder.build(&config).unwrap();
        let second: Vec<String> = again
            .playlist
            .entries
            .iter()
            .map(|e| e.normalized_path())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_result_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("notes.txt"), 10);

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let result = builder.build(&base_config(root));
        assert!(matches!(result, Err(Error::EmptyResult)));
    }

    #[test]
    fn test_links_are_validated_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("a.mp3"), 10);

        let mut config = base_config(root);
        config.links = vec![
            "http://radio.example/stream.mp3".to_string(),
            "ftp://radio.example/nope".to_string(),
        ];

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 2);
        assert_eq!(
            outcome
                .warnings
                .iter()
                .filter(|w| matches!(w, ScanWarning::InvalidLink { .. }))
                .count(),
            1
        );
        let remote = &outcome.playlist.entries[1];
        assert!(remote.is_remote());
        assert_eq!(remote.size, None);
        assert_eq!(remote.tags, None);
    }

    #[test]
    fn test_missing_extra_file_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("a.mp3"), 10);
        write_file(&root.join("bonus.flac"), 10);

        let mut config = base_config(root);
        config.extra_files = vec![root.join("bonus.flac"), root.join("missing.mp3")];
        config.unique = true;

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        // bonus.flac was already scanned; unique keeps one copy
        assert_eq!(outcome.playlist.len(), 2);
        assert!(outcome
            .warnings
            .iter()
            .any(|w| matches!(w, ScanWarning::MissingFile { .. })));
    }

    #[test]
    fn test_join_merges_existing_playlists() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("a.mp3"), 10);
        let joined = root.join("old.m3u");
        fs::write(&joined, "#EXTM3U\nelsewhere/x.mp3\nelsewhere/y.mp3\n").unwrap();

        let mut config = base_config(root);
        config.joins = vec![joined];
        config.criteria.formats.insert("mp3".to_string());

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 3);
        assert_eq!(outcome.playlist.entries[1].tags, None);
    }

    #[test]
    fn test_split_buckets_by_root_and_skips_explicit_additions() {
        let dir = tempfile::tempdir().unwrap();
        let rock = dir.path().join("rock");
        let jazz = dir.path().join("jazz");
        fs::create_dir_all(&rock).unwrap();
        fs::create_dir_all(&jazz).unwrap();
        write_file(&rock.join("r1.mp3"), 10);
        write_file(&rock.join("r2.mp3"), 10);
        write_file(&jazz.join("j1.mp3"), 10);

        let mut config = BuildConfig {
            directories: vec![rock.clone(), jazz.clone()],
            recursive: true,
            split: true,
            ..BuildConfig::default()
        };
        config.links = vec!["http://radio.example/live".to_string()];

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 4);
        assert_eq!(outcome.splits.len(), 2);

        let (rock_root, rock_list) = &outcome.splits[0];
        assert_eq!(rock_root, &rock);
        assert_eq!(rock_list.len(), 2);
        let (_, jazz_list) = &outcome.splits[1];
        assert_eq!(jazz_list.len(), 1);
        // The link lives only in the aggregate
        assert!(outcome
            .splits
            .iter()
            .all(|(_, list)| list.entries.iter().all(|e| !e.is_remote())));
    }

    #[test]
    fn test_confirm_callback_filters_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_file(&root.join("a.mp3"), 10);
        write_file(&root.join("b.mp3"), 10);

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let mut rejected = Vec::new();
        let mut confirm = |path: &Path| {
            let keep = path.to_string_lossy().ends_with("a.mp3");
            if !keep {
                rejected.push(path.to_path_buf());
            }
            keep
        };
        let outcome = builder
            .build_with(&base_config(root), Some(&mut confirm))
            .unwrap();
        assert_eq!(outcome.playlist.len(), 1);
        assert_eq!(rejected.len(), 1);
    }

    #[test]
    fn test_append_with_unique_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let target = dir.path().join("out.m3u");

        // Existing playlist with three absolute entries
        for name in ["one.mp3", "two.mp3", "three.mp3"] {
            write_file(&root.join(name), 10);
        }
        let existing: Vec<String> = ["one.mp3", "two.mp3", "three.mp3"]
            .iter()
            .map(|n| root.join(n).to_string_lossy().into_owned())
            .collect();
        fs::write(&target, format!("#EXTM3U\n{}\n", existing.join("\n"))).unwrap();

        // Two new files appear
        write_file(&root.join("four.mp3"), 10);
        write_file(&root.join("five.mp3"), 10);

        let mut config = base_config(root);
        config.unique = true;
        config.append_target = Some(target.clone());
        // The playlist itself sits inside the scan root; keep it out of
        // the membership via format filtering (m3u is not a registry format)

        let registry = registry();
        let builder = PlaylistBuilder::new(&registry);
        let outcome = builder.build(&config).unwrap();
        assert_eq!(outcome.playlist.len(), 2);

        let options = WriteOptions {
            mode: WriteMode::Append,
            absolute: true,
            ..WriteOptions::default()
        };
        PlaylistWriter::write(&target, &outcome.playlist, &options).unwrap();
        let lines: Vec<String> = fs::read_to_string(&target)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        assert_eq!(lines.len(), 5);

        // Re-running the identical append finds nothing new
        let rerun = builder.build(&config);
        assert!(matches!(rerun, Err(Error::EmptyResult)));
        let lines_after: Vec<String> = fs::read_to_string(&target)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        assert_eq!(lines_after.len(), 5);
    }
}
