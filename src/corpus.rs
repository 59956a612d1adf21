//! Loading a corpus root into passages.

use std::path::Path;

use tracing::{debug, info};

use crate::{
    chunking::chunk_document,
    error::Result,
    passage::Passage,
    walker::{self, DiscoveredFile},
};

/// All passages of one corpus snapshot, in enumeration order.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub passages: Vec<Passage>,
    pub file_count: usize,
}

impl Corpus {
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// Discover every document under `root`, read it, and chunk it.
pub fn load_corpus(root: &Path, chunk_size: usize) -> Result<Corpus> {
    let files = walker::discover_files(root)?;
    info!(files = files.len(), root = %root.display(), "discovered documents");

    let mut passages = Vec::new();
    for file in &files {
        passages.extend(load_file(file, chunk_size)?);
    }
    info!(chunks = passages.len(), "chunked corpus");

    Ok(Corpus {
        passages,
        file_count: files.len(),
    })
}

/// Chunk an in-memory document into passages for `relative_path`.
///
/// # Examples
///
/// ```
/// use docsearch::corpus::passages_for;
///
/// let passages = passages_for("intro.md", "# Intro\nhello world", 800);
/// assert_eq!(passages[0].id, "intro.md#0");
/// assert_eq!(passages[0].header, "# Intro");
/// ```
pub fn passages_for(
    relative_path: &str,
    content: &str,
    chunk_size: usize,
) -> Vec<Passage> {
    chunk_document(content, chunk_size)
        .into_iter()
        .map(|chunk| {
            Passage::new(relative_path, chunk.index, chunk.header, chunk.text)
        })
        .collect()
}

fn load_file(file: &DiscoveredFile, chunk_size: usize) -> Result<Vec<Passage>> {
    let bytes = std::fs::read(&file.absolute_path)?;
    let content = String::from_utf8_lossy(&bytes);
    let relative = relative_key(&file.relative_path);
    let passages = passages_for(&relative, &content, chunk_size);
    debug!(file = %relative, chunks = passages.len(), "chunked document");
    Ok(passages)
}

/// Relative path with `/` separators on every platform, so passage ids
/// match between machines.
fn relative_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
