use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use crate::{
    docs_dir::DocsDir,
    error::{Error, Result},
    passage::Passage,
};

const META: TableDefinition<&str, &str> = TableDefinition::new("meta");
const EMBEDDINGS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("embeddings");

/// Format version of the cache file. Any other value forces a rebuild.
pub const CACHE_VERSION: u32 = 2;

/// Persisted passage-id → embedding mapping for one corpus snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub version: u32,
    pub fingerprint: String,
    /// Id of the model that produced the vectors.
    pub model: String,
    pub embeddings: HashMap<String, Vec<f32>>,
}

impl CacheRecord {
    pub fn new(
        fingerprint: String,
        model: String,
        embeddings: HashMap<String, Vec<f32>>,
    ) -> Self {
        Self {
            version: CACHE_VERSION,
            fingerprint,
            model,
            embeddings,
        }
    }

    /// Length of the stored vectors, or 0 when there are none.
    pub fn dimension(&self) -> usize {
        self.embeddings.values().next().map_or(0, Vec::len)
    }
}

/// Fingerprint of a passage set, used to validate a cache record.
///
/// Covers every passage id and text in order, so adding, removing, or
/// editing a document changes it.
///
/// # Examples
///
/// ```
/// use docsearch::{cache::fingerprint, corpus::passages_for};
///
/// let a = passages_for("a.md", "alpha", 800);
/// let mut b = a.clone();
/// b.extend(passages_for("b.md", "beta", 800));
///
/// assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
/// assert_ne!(fingerprint(&a), fingerprint(&b));
/// assert!(fingerprint(&b).starts_with("2:"));
/// ```
pub fn fingerprint(passages: &[Passage]) -> String {
    let mut hasher = blake3::Hasher::new();
    for passage in passages {
        hasher.update(passage.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(passage.text.as_bytes());
        hasher.update(&[0]);
    }
    format!("{}:{}", passages.len(), hasher.finalize().to_hex())
}

/// Owns the cache file of one corpus root.
///
/// Binary format per embedding entry: the vector's f32 values in native
/// byte order, keyed by passage id. The `meta` table holds `version`,
/// `fingerprint`, `model` and `dimension`.
///
/// Writes are last-write-wins with no locking; two processes saving at
/// once may leave either file behind.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_docs_dir(docs_dir: &DocsDir) -> Self {
        Self::new(docs_dir.cache_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached record if it is valid for `fingerprint`.
    ///
    /// Never fails: unreadable files, a different format version, and a
    /// stale fingerprint are all reported as a miss.
    pub fn load(&self, fingerprint: &str) -> Option<CacheRecord> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "cache miss: no cache file");
            return None;
        }

        let record = match self.read() {
            Ok(record) => record,
            Err(e) => {
                debug!(error = %e, "cache miss: unreadable cache file");
                return None;
            }
        };

        if record.version != CACHE_VERSION {
            debug!(
                found = record.version,
                expected = CACHE_VERSION,
                "cache miss: format version changed"
            );
            return None;
        }
        if record.fingerprint != fingerprint {
            debug!("cache miss: corpus changed since last build");
            return None;
        }

        debug!(entries = record.embeddings.len(), "cache hit");
        Some(record)
    }

    /// Read the cache file without validating it against a corpus.
    pub fn read(&self) -> Result<CacheRecord> {
        let db = Database::open(&self.path)?;
        let txn = db.begin_read()?;

        let meta = txn.open_table(META)?;
        let field = |key: &str| -> Result<String> {
            meta.get(key)?
                .map(|v| v.value().to_string())
                .ok_or_else(|| Error::CacheCorrupt(format!("missing {key}")))
        };
        let version = field("version")?
            .parse()
            .map_err(|_| Error::CacheCorrupt("bad version".to_string()))?;
        let fingerprint = field("fingerprint")?;
        let model = field("model")?;
        let dimension: usize = field("dimension")?
            .parse()
            .map_err(|_| Error::CacheCorrupt("bad dimension".to_string()))?;

        let table = txn.open_table(EMBEDDINGS)?;
        let mut embeddings = HashMap::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            let id = key.value().to_string();
            let vector = decode_vector(value.value(), dimension)
                .ok_or_else(|| {
                    Error::CacheCorrupt(format!("bad vector for {id}"))
                })?;
            embeddings.insert(id, vector);
        }

        Ok(CacheRecord {
            version,
            fingerprint,
            model,
            embeddings,
        })
    }

    /// Replace the cache file with `record`.
    pub fn save(&self, record: &CacheRecord) -> Result<()> {
        let dimension = record.dimension();
        if let Some((id, vector)) =
            record.embeddings.iter().find(|(_, v)| v.len() != dimension)
        {
            return Err(Error::DimensionMismatch {
                id: id.clone(),
                expected: dimension,
                found: vector.len(),
            });
        }

        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }

        let db = Database::create(&self.path)?;
        let txn = db.begin_write()?;
        {
            let mut meta = txn.open_table(META)?;
            meta.insert("version", record.version.to_string().as_str())?;
            meta.insert("fingerprint", record.fingerprint.as_str())?;
            meta.insert("model", record.model.as_str())?;
            meta.insert("dimension", dimension.to_string().as_str())?;

            let mut table = txn.open_table(EMBEDDINGS)?;
            for (id, vector) in &record.embeddings {
                let bytes: &[u8] = bytemuck::cast_slice(vector.as_slice());
                table.insert(id.as_str(), bytes)?;
            }
        }
        txn.commit()?;

        debug!(
            path = %self.path.display(),
            entries = record.embeddings.len(),
            "saved embedding cache"
        );
        Ok(())
    }

    /// Size of the cache file in bytes, if it exists.
    pub fn size_on_disk(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }
}

fn decode_vector(bytes: &[u8], dimension: usize) -> Option<Vec<f32>> {
    if bytes.len() != dimension * size_of::<f32>() {
        return None;
    }
    // redb slices carry no alignment guarantee.
    Some(bytemuck::pod_collect_to_vec(bytes))
}
