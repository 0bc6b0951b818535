//! # Local File Enumerator
//!
//! Deterministic recursive walk of an upload directory.
//!
//! Entries are yielded sorted by file name within each directory, symlinks are
//! not followed, and operating-system artifacts (`.DS_Store`, `Thumbs.db`,
//! AppleDouble `._*` files and friends) are skipped. An optional extension
//! allow-list narrows the result further.

use crate::error::{Result, SyncError};
use crate::filter::{extension_allowed, extension_of};
use core_runtime::config::FilterSpec;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// File names never uploaded
const OS_ARTIFACTS: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini", ".localized", "Icon\r"];

/// A regular file found under the upload root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute path
    pub path: PathBuf,
    /// Base file name
    pub filename: String,
}

impl LocalFile {
    pub fn extension(&self) -> String {
        extension_of(&self.filename)
    }
}

/// Whether `name` is an operating-system metadata file
pub fn is_os_artifact(name: &str) -> bool {
    OS_ARTIFACTS.contains(&name) || name.starts_with("._")
}

/// Walks a directory tree and yields uploadable files.
///
/// ```ignore
/// let enumerator = LocalFileEnumerator::new("/srv/uploads")?
///     .with_filter(FilterSpec::with_extensions(["pdf", "png"]));
/// for file in enumerator.iter() {
///     let file = file?;
///     println!("{}", file.filename);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LocalFileEnumerator {
    root: PathBuf,
    filter: FilterSpec,
}

impl LocalFileEnumerator {
    /// Create an enumerator rooted at `root`.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotADirectory`] when `root` does not exist or is not a
    /// directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let not_a_directory = || SyncError::NotADirectory {
            path: root.to_path_buf(),
        };

        if !root.is_dir() {
            return Err(not_a_directory());
        }
        let root = root.canonicalize().map_err(|_| not_a_directory())?;

        Ok(Self {
            root,
            filter: FilterSpec::accept_all(),
        })
    }

    /// Only yield files whose extension passes `filter`
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = filter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the tree. Each call starts a fresh walk.
    pub fn iter(&self) -> impl Iterator<Item = Result<LocalFile>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        return None;
                    }
                    let filename = entry.file_name().to_string_lossy().into_owned();
                    if is_os_artifact(&filename) {
                        trace!(file = %filename, "Skipping OS artifact");
                        return None;
                    }
                    if !extension_allowed(&extension_of(&filename), &self.filter) {
                        trace!(file = %filename, "Skipping file outside extension allow-list");
                        return None;
                    }
                    Some(Ok(LocalFile {
                        path: entry.into_path(),
                        filename,
                    }))
                }
                Err(e) => Some(Err(SyncError::Io(e.to_string()))),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn names(enumerator: &LocalFileEnumerator) -> Vec<String> {
        enumerator
            .iter()
            .map(|f| f.unwrap().filename)
            .collect()
    }

    #[test]
    fn test_rejects_missing_or_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        touch(&file);

        assert!(matches!(
            LocalFileEnumerator::new(&file),
            Err(SyncError::NotADirectory { .. })
        ));
        assert!(matches!(
            LocalFileEnumerator::new(dir.path().join("missing")),
            Err(SyncError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_walks_recursively_in_name_order_skipping_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.pdf"));
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join(".DS_Store"));
        touch(&dir.path().join("._a.png"));
        touch(&dir.path().join("nested/Thumbs.db"));
        touch(&dir.path().join("nested/c.txt"));
        touch(&dir.path().join("Icon\r"));

        let enumerator = LocalFileEnumerator::new(dir.path()).unwrap();
        assert_eq!(names(&enumerator), vec!["a.png", "b.pdf", "c.txt"]);

        let first = enumerator.iter().next().unwrap().unwrap();
        assert!(first.path.is_absolute());
        assert_eq!(first.extension(), "png");
    }

    #[test]
    fn test_enumeration_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["z.txt", "m/q.txt", "m/a.txt", "k.jpg"] {
            touch(&dir.path().join(name));
        }

        let enumerator = LocalFileEnumerator::new(dir.path()).unwrap();
        let first: Vec<LocalFile> = enumerator.iter().map(|f| f.unwrap()).collect();
        let second: Vec<LocalFile> = enumerator.iter().map(|f| f.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.PNG"));
        touch(&dir.path().join("b.exe"));
        touch(&dir.path().join("notes"));

        let enumerator = LocalFileEnumerator::new(dir.path())
            .unwrap()
            .with_filter(FilterSpec::with_extensions(["png", "txt"]));
        assert_eq!(names(&enumerator), vec!["a.PNG"]);
    }

    #[test]
    fn test_is_os_artifact() {
        assert!(is_os_artifact(".DS_Store"));
        assert!(is_os_artifact("desktop.ini"));
        assert!(is_os_artifact("._report.pdf"));
        assert!(!is_os_artifact("report.pdf"));
        assert!(!is_os_artifact(".env"));
    }
}
