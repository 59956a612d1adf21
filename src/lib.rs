//! docsearch - search a project's `.docs` directory from the command line.
//!
//! Documents are split into header-aware passages and ranked either by
//! embedding similarity (a ColBERT model via
//! [pylate-rs](https://github.com/lightonai/pylate-rs), with vectors cached
//! in a [redb](https://github.com/cberner/redb) file next to the corpus) or
//! by Bitap fuzzy matching, which needs no model at all.
//!
//! # Quick start
//!
//! ```no_run
//! use docsearch::{CacheStore, DocsDir, ModelManager};
//! use docsearch::corpus::load_corpus;
//! use docsearch::search::{self, Mode, SearchParams};
//! use docsearch::semantic::SemanticMatcher;
//!
//! let docs_dir = DocsDir::resolve(None).unwrap();
//! let corpus = load_corpus(docs_dir.root(), 800).unwrap();
//! let mut semantic = SemanticMatcher::new(
//!     ModelManager::new(),
//!     CacheStore::for_docs_dir(&docs_dir),
//! );
//!
//! let params = SearchParams {
//!     query: "how do mutations work".to_string(),
//!     top_k: 5,
//!     mode: Mode::Semantic,
//! };
//!
//! let results =
//!     search::execute_search(&params, &corpus.passages, &mut semantic).unwrap();
//! for r in &results {
//!     println!("{} (score: {:.3})", r.passage.id, r.score);
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod corpus;
pub mod docs_dir;
pub mod embedding;
pub mod error;
pub mod fuzzy;
pub mod model_manager;
pub mod passage;
pub mod search;
pub mod semantic;
pub mod text_util;
pub mod walker;

pub use cache::CacheStore;
pub use docs_dir::DocsDir;
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use model_manager::ModelManager;
pub use passage::Passage;
pub use search::SearchResult;
