use std::{
    path::{Path, PathBuf},
    process::Command,
};

use tracing::debug;

use crate::error::{Error, Result};

/// Directory name looked for at each candidate location.
pub const DOCS_DIR_NAME: &str = ".docs";

/// Environment variable naming an explicit corpus root.
pub const DOCS_DIR_ENV_VAR: &str = "DOCSEARCH_DOCS_DIR";

/// File name of the embedding cache inside the corpus root.
pub const CACHE_FILE_NAME: &str = ".search-cache.redb";

/// The resolved corpus root.
#[derive(Debug, Clone)]
pub struct DocsDir {
    root: PathBuf,
}

impl DocsDir {
    /// Resolve the corpus root from, in order of priority:
    /// 1. An explicit path (from --docs-dir)
    /// 2. The DOCSEARCH_DOCS_DIR environment variable
    /// 3. `.docs` at the top of the enclosing git working tree
    /// 4. `.docs` in the current directory
    /// 5. `.docs` in the parent of the current directory
    ///
    /// The first existing directory wins.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(DOCS_DIR_ENV_VAR).map(PathBuf::from));
        if let Some(path) = explicit {
            return Self::from_candidates(vec![path]);
        }

        let cwd = std::env::current_dir()?;
        Self::from_candidates(default_candidates(git_toplevel(&cwd), &cwd))
    }

    /// Pick the first candidate that is an existing directory.
    pub fn from_candidates(candidates: Vec<PathBuf>) -> Result<Self> {
        match candidates.iter().find(|p| p.is_dir()) {
            Some(root) => {
                debug!(root = %root.display(), "located docs directory");
                Ok(Self { root: root.clone() })
            }
            None => Err(Error::CorpusNotFound {
                searched: candidates,
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_path(&self) -> PathBuf {
        self.root.join(CACHE_FILE_NAME)
    }
}

/// Candidate roots in lookup order, without checking existence.
pub fn default_candidates(git_root: Option<PathBuf>, cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(git_root) = git_root {
        candidates.push(git_root.join(DOCS_DIR_NAME));
    }
    candidates.push(cwd.join(DOCS_DIR_NAME));
    candidates.push(cwd.join("..").join(DOCS_DIR_NAME));
    candidates
}

/// Top of the git working tree containing `cwd`, if git knows one.
fn git_toplevel(cwd: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(cwd)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let top = String::from_utf8(output.stdout).ok()?;
    let top = top.trim();
    (!top.is_empty()).then(|| PathBuf::from(top))
}
