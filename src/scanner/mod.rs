// Directory scanning - turns root directories into candidate files
// Unreadable paths become warnings, not failures; the walk keeps going

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ScanWarning;

pub struct Scanner {
    recursive: bool,
    exclude_dirs: Vec<PathBuf>,
}

impl Scanner {
    pub fn new(recursive: bool, exclude_dirs: &[PathBuf]) -> Self {
        // Remember both the spelling we were given and the resolved one, so
        // "-e music/old" prunes the subtree no matter how the walk names it
        let mut exclude = Vec::new();
        for dir in exclude_dirs {
            exclude.push(dir.clone());
            if let Ok(real) = dir.canonicalize() {
                if real != *dir {
                    exclude.push(real);
                }
            }
        }
        Self {
            recursive,
            exclude_dirs: exclude,
        }
    }

    /// Walk one root and collect every file under it, honoring the
    /// recursion flag and pruning excluded directories with their subtrees.
    /// Follows symlinks; walkdir's ancestor check keeps link cycles finite
    /// and turns them into per-path warnings.
    pub fn scan(&self, root: &Path, warnings: &mut Vec<ScanWarning>) -> Vec<PathBuf> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(true)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    warn!("skipping {}: {}", path.display(), err);
                    warnings.push(ScanWarning::Unreadable {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        debug!("found {} files under {}", files.len(), root.display());
        files
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude_dirs.iter().any(|excluded| excluded == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_recursive_scan() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("album")).unwrap();
        touch(&root.join("a.mp3"));
        touch(&root.join("album/b.mp3"));

        let mut warnings = Vec::new();
        let scanner = Scanner::new(true, &[]);
        let files = scanner.scan(root, &mut warnings);
        assert_eq!(files.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_flat_scan_stays_shallow() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("album")).unwrap();
        touch(&root.join("a.mp3"));
        touch(&root.join("album/b.mp3"));

        let mut warnings = Vec::new();
        let scanner = Scanner::new(false, &[]);
        let files = scanner.scan(root, &mut warnings);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.mp3"));
    }

    #[test]
    fn test_excluded_directory_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("keep")).unwrap();
        fs::create_dir_all(root.join("skip/deeper")).unwrap();
        touch(&root.join("keep/a.mp3"));
        touch(&root.join("skip/b.mp3"));
        touch(&root.join("skip/deeper/c.mp3"));

        let mut warnings = Vec::new();
        let scanner = Scanner::new(true, &[root.join("skip")]);
        let files = scanner.scan(root, &mut warnings);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("keep/a.mp3"));
    }

    #[test]
    fn test_scan_order_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.mp3"));
        touch(&root.join("a.mp3"));
        touch(&root.join("c.mp3"));

        let mut warnings = Vec::new();
        let scanner = Scanner::new(true, &[]);
        let first = scanner.scan(root, &mut warnings);
        let second = scanner.scan(root, &mut warnings);
        assert_eq!(first, second);
        assert!(first[0].ends_with("a.mp3"));
    }
}
