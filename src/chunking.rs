//! Header-aware chunking of documents into bounded passages.
//!
//! A document is cut into sections at lines that open a markdown heading
//! (`#`, `##` or `###` followed by whitespace). Sections are packed into
//! chunks of at most `chunk_size` characters; a section that is larger than
//! that on its own is broken into whitespace-delimited word groups.
//!
//! Sizes are counted in `char`s, not bytes, so multi-byte text is never cut
//! inside a code point.

/// Default maximum chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Deepest heading level that starts a new section.
const MAX_HEADING_LEVEL: usize = 3;

/// A chunk of a single document, before it is tied to a file.
///
/// Produced by [`chunk_document`]; [`crate::corpus`] turns these into
/// [`crate::passage::Passage`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Trimmed chunk text.
    pub text: String,
    /// Heading line current when the chunk was emitted, or empty.
    pub header: String,
    /// Zero-based chunk index within the document.
    pub index: usize,
}

/// Split a document into header-aware chunks.
///
/// The header attached to a chunk is the most recent heading seen at the
/// moment the chunk is flushed. Because a buffer is flushed when the
/// *next* section does not fit, a chunk can carry the heading of the
/// section that caused the flush.
///
/// A heading needs its text on the same line: a bare `#` line still starts
/// a new section but does not change the header.
///
/// # Examples
///
/// ```
/// use docsearch::chunking::chunk_document;
///
/// let chunks = chunk_document("# Intro\nhello world", 800);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].header, "# Intro");
/// assert!(chunks[0].text.contains("hello world"));
///
/// assert!(chunk_document("", 800).is_empty());
/// ```
pub fn chunk_document(content: &str, chunk_size: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut header = String::new();
    let mut buffer = Buffer::default();

    for section in split_sections(content) {
        if let Some(heading) = heading_line(section) {
            header = heading.to_string();
        }

        let section_len = section.chars().count();
        if buffer.len + section_len <= chunk_size {
            buffer.push_line(section, section_len);
            continue;
        }

        emit(&mut chunks, &buffer.text, &header);

        if section_len > chunk_size {
            let mut words = Buffer::default();
            for word in section.split_whitespace() {
                let word_len = word.chars().count();
                if words.len + word_len + 1 <= chunk_size {
                    words.push_word(word, word_len);
                } else {
                    emit(&mut chunks, &words.text, &header);
                    words = Buffer::default();
                    words.push_word(word, word_len);
                }
            }
            buffer = words;
        } else {
            buffer = Buffer::default();
            buffer.push_line(section, section_len);
        }
    }

    emit(&mut chunks, &buffer.text, &header);
    chunks
}

/// Running text plus its length in chars.
#[derive(Debug, Default)]
struct Buffer {
    text: String,
    len: usize,
}

impl Buffer {
    fn push_line(&mut self, line: &str, line_len: usize) {
        self.text.push_str(line);
        self.text.push('\n');
        self.len += line_len + 1;
    }

    fn push_word(&mut self, word: &str, word_len: usize) {
        self.text.push_str(word);
        self.text.push(' ');
        self.len += word_len + 1;
    }
}

fn emit(chunks: &mut Vec<Chunk>, text: &str, header: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    chunks.push(Chunk {
        text: text.to_string(),
        header: header.to_string(),
        index: chunks.len(),
    });
}

/// Cut `content` before every newline that is followed by a heading.
///
/// The separating newline itself is dropped, so joining the sections with
/// `'\n'` gives back the input.
fn split_sections(content: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if offset > 0 && opens_heading(line) {
            sections.push(&content[start..offset - 1]);
            start = offset;
        }
        offset += line.len();
    }
    sections.push(&content[start..]);
    sections
}

/// True if `line` starts with one to three `#` followed by whitespace.
fn opens_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=MAX_HEADING_LEVEL).contains(&hashes)
        && line[hashes..].chars().next().is_some_and(char::is_whitespace)
}

/// The trimmed heading line a section starts with, if it has one.
fn heading_line(section: &str) -> Option<&str> {
    let first = section.lines().next()?;
    let hashes = first.chars().take_while(|&c| c == '#').count();
    if !opens_heading(section) || first[hashes..].trim().is_empty() {
        return None;
    }
    Some(first.trim())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_document_has_no_chunks() {
        assert!(chunk_document("", 800).is_empty());
        assert!(chunk_document("  \n\n\t ", 800).is_empty());
    }

    #[test]
    fn heading_document_single_chunk() {
        let chunks = chunk_document("# Intro\nhello world", 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].header, "# Intro");
        assert_eq!(chunks[0].text, "# Intro\nhello world");
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn plain_text_has_empty_header() {
        let chunks = chunk_document("Intro\n\nhello world", 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].header, "");
    }

    #[test]
    fn splits_at_headings_levels_one_to_three() {
        let sections =
            split_sections("pre\n# A\na\n## B\nb\n### C\nc\n#### D\nd");
        assert_eq!(
            sections,
            vec!["pre", "# A\na", "## B\nb", "### C\nc\n#### D\nd"]
        );
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        assert!(!opens_heading("#tag"));
        assert!(opens_heading("## Title"));
        assert!(opens_heading("#\tTabbed"));
        assert!(!opens_heading("####  Deep"));
    }

    #[test]
    fn bare_hash_line_keeps_previous_header() {
        assert_eq!(heading_line("#\nfoo"), None);

        let chunks = chunk_document("# Real\nalpha\n#\nfoo", 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].header, "# Real");
        assert!(chunks[0].text.contains("foo"));

        let chunks = chunk_document("intro\n#\nfoo", 800);
        assert!(chunks.iter().all(|c| c.header.is_empty()));
    }

    #[test]
    fn sections_that_do_not_fit_start_new_chunk() {
        let doc = format!("# A\n{}\n# B\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunk_document(&doc, 40);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("# A"));
        assert!(chunks[1].text.starts_with("# B"));
        assert_eq!(chunks[1].header, "# B");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn flushed_chunk_carries_header_current_at_emission() {
        let doc = format!("# A\n{}\n# B\n{}", "a".repeat(30), "b".repeat(30));
        let chunks = chunk_document(&doc, 40);
        // "# A" section is flushed after "# B" has been seen.
        assert_eq!(chunks[0].header, "# B");
    }

    #[test]
    fn small_sections_are_packed_together() {
        let chunks = chunk_document("# A\none\n# B\ntwo\n# C\nthree", 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].header, "# C");
        assert_eq!(chunks[0].text, "# A\none\n# B\ntwo\n# C\nthree");
    }

    #[test]
    fn oversized_section_split_on_words() {
        let doc = "word ".repeat(100);
        let chunks = chunk_document(&doc, 50);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 50);
        }
        assert_eq!(normalize(&doc), normalize(&join(&chunks)));
    }

    #[test]
    fn unsplittable_word_becomes_own_chunk() {
        let long = "x".repeat(120);
        let doc = format!("short words here {long} tail");
        let chunks = chunk_document(&doc, 50);
        assert!(chunks.iter().any(|c| c.text == long));
        assert_eq!(normalize(&doc), normalize(&join(&chunks)));
    }

    #[test]
    fn multibyte_text_counts_chars() {
        let doc = "café naïve 日本語 🎉 ".repeat(40);
        let chunks = chunk_document(&doc, 60);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 60);
        }
    }

    fn join(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn document() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                4 => "[a-z]{1,12}",
                1 => "\n",
                1 => "\n#{1,3} [a-z]{1,8}\n",
                1 => "[a-z]{30,90}",
            ],
            0..120,
        )
        .prop_map(|parts| parts.join(" "))
    }

    proptest! {
        #[test]
        fn chunks_reconstruct_document(doc in document(), size in 10usize..200) {
            let chunks = chunk_document(&doc, size);
            prop_assert_eq!(normalize(&join(&chunks)), normalize(&doc));
        }

        #[test]
        fn chunks_respect_size_bound(doc in document(), size in 10usize..200) {
            for chunk in chunk_document(&doc, size) {
                let len = chunk.text.chars().count();
                prop_assert!(
                    len <= size || !chunk.text.contains(char::is_whitespace),
                    "chunk of {} chars exceeds {}", len, size
                );
            }
        }

        #[test]
        fn indices_are_sequential(doc in document(), size in 10usize..200) {
            for (i, chunk) in chunk_document(&doc, size).iter().enumerate() {
                prop_assert_eq!(chunk.index, i);
            }
        }
    }
}
