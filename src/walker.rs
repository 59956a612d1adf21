use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::Result;

/// A discovered document file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the corpus root directory.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

/// File name patterns of documents that are indexed.
const DOCUMENT_PATTERNS: &[&str] =
    &["*.md", "*.markdown", "*.mdx", "*.txt", "*.xml"];

/// File names skipped even though they match [`DOCUMENT_PATTERNS`].
const EXCLUDED_NAMES: &[&str] = &["README.md"];

/// Decides which file names are part of the corpus.
#[derive(Debug, Clone)]
pub struct DocumentFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl DocumentFilter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            include: build_set(DOCUMENT_PATTERNS)?,
            exclude: build_set(EXCLUDED_NAMES)?,
        })
    }

    /// Returns true if a file with this name should be indexed.
    pub fn is_document(&self, file_name: &str) -> bool {
        self.include.is_match(file_name) && !self.exclude.is_match(file_name)
    }
}

fn build_set(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

/// Recursively walk a directory and discover eligible document files.
///
/// Results are sorted by relative path so enumeration order (and with it the
/// tie-break order of equal scores) is the same on every run.
pub fn discover_files(root: &Path) -> Result<Vec<DiscoveredFile>> {
    let filter = DocumentFilter::new()?;
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&filter, &canonical_root, &canonical_root, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    filter: &DocumentFilter,
    root: &Path,
    current: &Path,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(filter, root, &entry.path(), results)?;
        } else if file_type.is_symlink() {
            // Only file symlinks are followed; directory links could cycle.
            let Ok(resolved) = entry.path().canonicalize() else {
                continue;
            };
            if resolved.is_file() && filter.is_document(&name) {
                results.push(make_discovered(root, &entry.path(), resolved));
            }
        } else if file_type.is_file() && filter.is_document(&name) {
            let absolute = entry.path().canonicalize()?;
            results.push(make_discovered(root, &entry.path(), absolute));
        }
    }

    Ok(())
}

fn make_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: PathBuf,
) -> DiscoveredFile {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();

    DiscoveredFile {
        relative_path,
        absolute_path,
    }
}
