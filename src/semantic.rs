use std::collections::{HashMap, HashSet};

use kdam::{BarExt, tqdm};
use tracing::{debug, info};

use crate::{
    cache::{CacheRecord, CacheStore, fingerprint},
    embedding::{Embedder, cosine_similarity, embedding_input},
    error::Result,
    passage::Passage,
    search::SearchResult,
};

/// Emit a progress line every this many embedded passages.
const PROGRESS_EVERY: usize = 50;

/// What [`SemanticMatcher::ensure_index`] did to produce the vectors.
#[derive(Debug, Clone, Default)]
pub struct IndexOutcome {
    pub embeddings: HashMap<String, Vec<f32>>,
    /// Vectors taken from the cache file.
    pub reused: usize,
    /// Vectors computed in this run.
    pub embedded: usize,
    /// Whether the cache file was (re)written.
    pub saved: bool,
}

/// Ranks passages by cosine similarity between embeddings.
///
/// Holds the embedder and the cache store for the lifetime of one
/// invocation.
pub struct SemanticMatcher<E> {
    embedder: E,
    cache: CacheStore,
    show_progress: bool,
}

impl<E: Embedder> SemanticMatcher<E> {
    pub fn new(embedder: E, cache: CacheStore) -> Self {
        Self {
            embedder,
            cache,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr while embedding.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Make sure every passage has a vector, reusing the cache file when it
    /// matches this corpus and model, and writing it back when anything had
    /// to be computed.
    pub fn ensure_index(&mut self, passages: &[Passage]) -> Result<IndexOutcome> {
        let fingerprint = fingerprint(passages);
        let model_id = self.embedder.model_id().to_string();

        let cached = self.cache.load(&fingerprint).filter(|record| {
            let same_model = record.model == model_id;
            if !same_model {
                debug!(cached = %record.model, current = %model_id, "cache miss: model changed");
            }
            same_model
        });
        let hit = cached.is_some();
        let mut embeddings = cached.map(|r| r.embeddings).unwrap_or_default();
        let live: HashSet<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        embeddings.retain(|id, _| live.contains(id.as_str()));
        let reused = embeddings.len();
        if hit {
            info!(entries = reused, "embedding cache hit");
        } else {
            info!(path = %self.cache.path().display(), "embedding cache miss");
        }

        let missing: Vec<&Passage> = passages
            .iter()
            .filter(|p| !embeddings.contains_key(&p.id))
            .collect();

        if !missing.is_empty() {
            info!(
                missing = missing.len(),
                total = passages.len(),
                "embedding passages"
            );
            let mut bar = self
                .show_progress
                .then(|| tqdm!(total = missing.len(), desc = "Embedding"));

            for (done, passage) in missing.iter().enumerate() {
                let vector = self.embedder.embed(embedding_input(&passage.text))?;
                embeddings.insert(passage.id.clone(), vector);

                if let Some(bar) = bar.as_mut() {
                    bar.update(1)?;
                }
                if (done + 1) % PROGRESS_EVERY == 0 {
                    debug!(done = done + 1, total = missing.len(), "embedding progress");
                }
            }
            if bar.is_some() {
                eprintln!();
            }
        }

        let saved = !hit || !missing.is_empty();
        let embedded = missing.len();
        if saved {
            let record = CacheRecord::new(fingerprint, model_id, embeddings);
            self.cache.save(&record)?;
            embeddings = record.embeddings;
        }

        Ok(IndexOutcome {
            embeddings,
            reused,
            embedded,
            saved,
        })
    }

    /// Return at most `top_k` passages ranked by cosine similarity to
    /// `query`, best first. Ties keep corpus order.
    pub fn search(
        &mut self,
        query: &str,
        passages: &[Passage],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 || passages.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed(query)?;
        let index = self.ensure_index(passages)?;

        let mut results: Vec<SearchResult> = passages
            .iter()
            .map(|p| {
                let score = index
                    .embeddings
                    .get(&p.id)
                    .map_or(0.0, |v| cosine_similarity(&query_vector, v));
                SearchResult {
                    passage: p.clone(),
                    score: f64::from(score),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::hash::{DefaultHasher, Hash, Hasher};

    use super::*;
    use crate::{corpus::passages_for, embedding::l2_normalize, error::Error};

    const DIM: usize = 64;

    /// Bag-of-words embedder: each lower-cased word bumps one hashed slot.
    pub(crate) struct HashEmbedder {
        pub model: String,
        pub calls: usize,
        pub fail: bool,
    }

    impl HashEmbedder {
        pub(crate) fn new() -> Self {
            Self {
                model: "hash-test".to_string(),
                calls: 0,
                fail: false,
            }
        }
    }

    impl Embedder for HashEmbedder {
        fn model_id(&self) -> &str {
            &self.model
        }

        fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(Error::EmbeddingUnavailable("offline".to_string()));
            }
            self.calls += 1;
            let mut v = vec![0.0f32; DIM];
            for word in text.split_whitespace() {
                let mut h = DefaultHasher::new();
                word.to_lowercase().hash(&mut h);
                v[(h.finish() % DIM as u64) as usize] += 1.0;
            }
            l2_normalize(&mut v);
            Ok(v)
        }
    }

    fn corpus() -> Vec<Passage> {
        let mut passages = passages_for(
            "rust.md",
            "# Rust\nrust ownership borrowing lifetimes",
            800,
        );
        passages.extend(passages_for(
            "pasta.md",
            "# Pasta\nboil water add salt cook pasta",
            800,
        ));
        passages.extend(passages_for(
            "garden.md",
            "# Garden\nwater plants prune leaves compost soil",
            800,
        ));
        passages
    }

    fn matcher(
        tmp: &tempfile::TempDir,
        embedder: HashEmbedder,
    ) -> SemanticMatcher<HashEmbedder> {
        SemanticMatcher::new(
            embedder,
            CacheStore::new(tmp.path().join("cache.redb")),
        )
    }

    #[test]
    fn identical_text_ranks_first() {
        let tmp = tempfile::tempdir().unwrap();
        let passages = corpus();
        let mut m = matcher(&tmp, HashEmbedder::new());

        let results = m.search(&passages[1].text, &passages, 3).unwrap();
        assert_eq!(results[0].passage.id, "pasta.md#0");
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn scores_bounded_and_descending() {
        let tmp = tempfile::tempdir().unwrap();
        let passages = corpus();
        let mut m = matcher(&tmp, HashEmbedder::new());

        let results = m.search("water the garden", &passages, 3).unwrap();
        assert_eq!(results.len(), 3);
        for r in &results {
            assert!((-1.0..=1.0).contains(&r.score));
        }
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn ties_keep_corpus_order() {
        let tmp = tempfile::tempdir().unwrap();
        let passages: Vec<Passage> = ["z.md", "a.md", "m.md"]
            .into_iter()
            .flat_map(|file| passages_for(file, "shared words here", 800))
            .collect();
        let mut m = matcher(&tmp, HashEmbedder::new());

        let results = m.search("shared", &passages, 3).unwrap();
        let files: Vec<&str> =
            results.iter().map(|r| r.passage.file.as_str()).collect();
        assert_eq!(files, ["z.md", "a.md", "m.md"]);
        assert_eq!(results[0].score, results[1].score);
        assert_eq!(results[1].score, results[2].score);
    }

    #[test]
    fn top_k_limits_and_zero_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let passages = corpus();
        let mut m = matcher(&tmp, HashEmbedder::new());

        assert_eq!(m.search("rust", &passages, 2).unwrap().len(), 2);

        let calls = m.embedder().calls;
        assert!(m.search("rust", &passages, 0).unwrap().is_empty());
        assert_eq!(m.embedder().calls, calls, "top_k=0 must not embed");
    }

    #[test]
    fn cache_is_built_once_then_reused() {
        let tmp = tempfile::tempdir().unwrap();
        let passages = corpus();

        let mut first = matcher(&tmp, HashEmbedder::new());
        first.search("rust", &passages, 1).unwrap();
        // One query plus one per passage.
        assert_eq!(first.embedder().calls, 1 + passages.len());
        assert!(first.cache().path().exists());

        let mut second = matcher(&tmp, HashEmbedder::new());
        let results = second.search("rust", &passages, 1).unwrap();
        assert_eq!(second.embedder().calls, 1, "only the query is embedded");
        assert_eq!(results[0].passage.file, "rust.md");
    }

    #[test]
    fn corpus_change_triggers_rebuild() {
        let tmp = tempfile::tempdir().unwrap();
        let mut passages = corpus();
        matcher(&tmp, HashEmbedder::new())
            .ensure_index(&passages)
            .unwrap();

        passages.extend(passages_for("new.md", "fresh content", 800));
        let outcome = matcher(&tmp, HashEmbedder::new())
            .ensure_index(&passages)
            .unwrap();
        assert_eq!(outcome.reused, 0);
        assert_eq!(outcome.embedded, passages.len());
        assert!(outcome.saved);
    }

    #[test]
    fn model_change_triggers_rebuild() {
        let tmp = tempfile::tempdir().unwrap();
        let passages = corpus();
        matcher(&tmp, HashEmbedder::new())
            .ensure_index(&passages)
            .unwrap();

        let mut other = HashEmbedder::new();
        other.model = "another-model".to_string();
        let outcome = matcher(&tmp, other).ensure_index(&passages).unwrap();
        assert_eq!(outcome.embedded, passages.len());
    }

    #[test]
    fn warm_cache_is_not_rewritten() {
        let tmp = tempfile::tempdir().unwrap();
        let passages = corpus();
        matcher(&tmp, HashEmbedder::new())
            .ensure_index(&passages)
            .unwrap();

        let outcome = matcher(&tmp, HashEmbedder::new())
            .ensure_index(&passages)
            .unwrap();
        assert_eq!(outcome.reused, passages.len());
        assert_eq!(outcome.embedded, 0);
        assert!(!outcome.saved);
    }

    #[test]
    fn empty_corpus_writes_empty_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let mut m = matcher(&tmp, HashEmbedder::new());

        let outcome = m.ensure_index(&[]).unwrap();
        assert!(outcome.embeddings.is_empty());
        assert!(outcome.saved);
        assert_eq!(m.embedder().calls, 0);

        let record = m.cache().load(&fingerprint(&[])).unwrap();
        assert!(record.embeddings.is_empty());
    }

    #[test]
    fn embedder_failure_propagates() {
        let tmp = tempfile::tempdir().unwrap();
        let mut embedder = HashEmbedder::new();
        embedder.fail = true;
        let mut m = matcher(&tmp, embedder);

        let err = m.search("rust", &corpus(), 3).unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
        assert!(!m.cache().path().exists());
    }
}
