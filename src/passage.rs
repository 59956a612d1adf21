/// A bounded excerpt of one document, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// `{file}#{chunk_index}`, unique within one corpus snapshot.
    pub id: String,
    /// Path of the originating document relative to the corpus root.
    pub file: String,
    /// Nearest heading line seen before this chunk, or empty.
    pub header: String,
    /// Trimmed chunk body.
    pub text: String,
    /// Zero-based position within the document.
    pub chunk_index: usize,
}

impl Passage {
    pub fn new(
        file: &str,
        chunk_index: usize,
        header: String,
        text: String,
    ) -> Self {
        Self {
            id: passage_id(file, chunk_index),
            file: file.to_string(),
            header,
            text,
            chunk_index,
        }
    }
}

/// Build the stable identifier for a chunk of a document.
///
/// # Examples
///
/// ```
/// use docsearch::passage::passage_id;
///
/// assert_eq!(passage_id("guides/setup.md", 3), "guides/setup.md#3");
/// ```
pub fn passage_id(file: &str, chunk_index: usize) -> String {
    format!("{file}#{chunk_index}")
}
