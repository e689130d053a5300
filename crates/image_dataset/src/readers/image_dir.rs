use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects image file paths from a directory (with optional recursion and
/// extension filtering). Only paths are gathered, never pixel data, so the
/// result can be handed straight to [`ImageDataset::builder`].
///
/// Paths come back sorted, which keeps dataset indices stable across runs.
///
/// # Example
/// ```ignore
/// // root/cat/1.png, root/dog/2.png, ...
/// let (paths, labels) = ImageDirSource::new("./data/train", &["png", "dcm"], true)
///     .labeled_by_parent()?;
///
/// let dataset = ImageDataset::builder(paths).labels(labels).build()?;
/// ```
///
/// [`ImageDataset::builder`]: crate::image_set::ImageDataset
pub struct ImageDirSource {
    dir_path: PathBuf,
    extensions: Vec<String>,
    recurse: bool,
}

impl ImageDirSource {
    /// Creates a new image directory source.
    ///
    /// # Arguments
    /// - `dir_path`: Directory to scan.
    /// - `extensions`: File extensions to include (e.g., `["jpg", "png", "dcm"]`). Case-insensitive.
    /// - `recurse`: If `true`, scans subdirectories recursively.
    pub fn new(dir_path: impl Into<PathBuf>, extensions: &[&str], recurse: bool) -> Self {
        Self {
            dir_path: dir_path.into(),
            extensions: extensions.iter().map(|s| s.to_lowercase()).collect(),
            recurse,
        }
    }

    /// All matching files, sorted by path.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let dir_metadata = fs::metadata(&self.dir_path)
            .with_context(|| format!("Failed to access directory: {}", self.dir_path.display()))?;
        if !dir_metadata.is_dir() {
            bail!("Path is not a directory: {}", self.dir_path.display());
        }

        // - recurse = true: traverse all subdirectories.
        // - recurse = false: only the top-level directory.
        let max_depth = if self.recurse { usize::MAX } else { 1 };
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.dir_path).min_depth(1).max_depth(max_depth) {
            let entry = entry.with_context(|| {
                format!("Failed to read directory entry in {}", self.dir_path.display())
            })?;
            // Symlinks are skipped, not followed.
            if entry.file_type().is_file() && self.extension_matches(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Matching files paired with the name of their parent directory, the
    /// usual `root/<class>/<image>` layout.
    pub fn labeled_by_parent(&self) -> Result<(Vec<PathBuf>, Vec<String>)> {
        let paths = self.scan()?;
        let labels = paths
            .iter()
            .map(|path| {
                path.parent()
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().into_owned())
                    .with_context(|| format!("No parent directory for {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((paths, labels))
    }

    fn extension_matches(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| self.extensions.contains(&e.to_lowercase()))
    }
}
