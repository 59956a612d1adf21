use serde::Serialize;

use crate::{
    embedding::Embedder,
    error::Result,
    fuzzy::FuzzyMatcher,
    passage::Passage,
    semantic::SemanticMatcher,
    text_util::{DEFAULT_EXCERPT_CHARS, code_fence, excerpt},
};

/// A ranked passage. Higher scores are better in both modes.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub passage: Passage,
    pub score: f64,
}

/// Which matcher ranks the passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Embedding similarity.
    Semantic,
    /// Approximate string matching, no model needed.
    Fast,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Llm,
    Json,
}

/// Parameters for a search operation.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub top_k: usize,
    pub mode: Mode,
}

/// Rank `passages` against the query with the matcher the mode selects.
///
/// In [`Mode::Fast`] the semantic matcher is never touched, so no model is
/// loaded and no cache is read.
pub fn execute_search<E: Embedder>(
    params: &SearchParams,
    passages: &[Passage],
    semantic: &mut SemanticMatcher<E>,
) -> Result<Vec<SearchResult>> {
    match params.mode {
        Mode::Fast => Ok(FuzzyMatcher::default().search(
            &params.query,
            passages,
            params.top_k,
        )),
        Mode::Semantic => {
            semantic.search(&params.query, passages, params.top_k)
        }
    }
}

/// Render results in the requested format.
pub fn render(
    results: &[SearchResult],
    query: &str,
    mode: Mode,
    format: OutputFormat,
) -> Result<String> {
    Ok(match format {
        OutputFormat::Human => format_human(results),
        OutputFormat::Llm => format_llm(results, query),
        OutputFormat::Json => format_json(results, query, mode)?,
    })
}

/// One block per result, separated by blank lines.
pub fn format_human(results: &[SearchResult]) -> String {
    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("━━━ Result {} ━━━\n", i + 1));
        out.push_str(&format!("📄 File: {}\n", r.passage.file));
        if !r.passage.header.is_empty() {
            out.push_str(&format!("📌 Section: {}\n", r.passage.header));
        }
        out.push_str(&format!("📊 Score: {:.4}\n\n", r.score));
        out.push_str(&excerpt(&r.passage.text, DEFAULT_EXCERPT_CHARS));
        out.push_str("\n\n");
    }
    out
}

/// A single markdown document meant to be pasted into a model prompt.
///
/// Passage text is included in full, fenced.
pub fn format_llm(results: &[SearchResult], query: &str) -> String {
    let mut out = format!("# Search Results for: {query}\n\n");
    out.push_str(&format!("Found {} relevant sections:\n\n", results.len()));

    for (i, r) in results.iter().enumerate() {
        out.push_str(&format!("## [{}] {}\n", i + 1, r.passage.file));
        if !r.passage.header.is_empty() {
            out.push_str(&format!("**Section:** {}\n", r.passage.header));
        }
        out.push_str(&format!(
            "**Relevance:** {:.0}%\n\n",
            (r.score * 100.0).round()
        ));
        let fence = code_fence(&r.passage.text);
        out.push_str(&format!("{fence}\n{}\n{fence}\n\n", r.passage.text));
    }
    out.push('\n');
    out
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    mode: Mode,
    result_count: usize,
    results: Vec<JsonResult<'a>>,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    rank: usize,
    id: &'a str,
    file: &'a str,
    header: &'a str,
    chunk_index: usize,
    score: f64,
    text: &'a str,
}

/// Pretty-printed JSON, newline-terminated.
pub fn format_json(
    results: &[SearchResult],
    query: &str,
    mode: Mode,
) -> Result<String> {
    let output = JsonOutput {
        query,
        mode,
        result_count: results.len(),
        results: results
            .iter()
            .enumerate()
            .map(|(i, r)| JsonResult {
                rank: i + 1,
                id: &r.passage.id,
                file: &r.passage.file,
                header: &r.passage.header,
                chunk_index: r.passage.chunk_index,
                score: r.score,
                text: &r.passage.text,
            })
            .collect(),
    };
    let mut json = serde_json::to_string_pretty(&output)?;
    json.push('\n');
    Ok(json)
}
