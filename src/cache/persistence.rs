// =============================================================================
// Persistence backends for the candle cache
// =============================================================================
//
// The cache talks to storage only through the `Persistence` trait. Which
// backend is used is decided once, when the engine is built:
//
//   - FilePersistence:   one JSON document per key in a directory, written
//                        atomically (tmp + rename).
//   - MemoryPersistence: process-local map; used when no cache dir is set and
//                        in tests.
//   - NoopPersistence:   storage unavailable; every read misses and every
//                        write is dropped.
// =============================================================================

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::market_data::{fnv1a, Candle, CandleKey, CandleSeries};

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

/// On-disk shape of one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
    pub market: String,
    pub interval: String,
    pub candles: Vec<Candle>,
    pub first_timestamp: i64,
    pub last_timestamp: i64,
    pub last_update: i64,
}

impl PersistedEntry {
    pub fn key(&self) -> CandleKey {
        CandleKey::new(&self.market, &self.interval)
    }

    /// Rebuild the series, re-establishing sort order and uniqueness in case
    /// the document was edited by hand. Empty documents yield `None`.
    pub fn into_series(self) -> Option<CandleSeries> {
        let key = self.key();
        CandleSeries::from_candles(key, self.candles, self.last_update)
    }
}

impl From<&CandleSeries> for PersistedEntry {
    fn from(series: &CandleSeries) -> Self {
        Self {
            market: series.market().to_string(),
            interval: series.interval().to_string(),
            candles: series.candles().to_vec(),
            first_timestamp: series.first_timestamp(),
            last_timestamp: series.last_timestamp(),
            last_update: series.last_update(),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Persistence: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// `false` for backends that never retain anything.
    fn is_available(&self) -> bool {
        true
    }

    async fn load(&self, key: &CandleKey) -> EngineResult<Option<PersistedEntry>>;

    /// Replace the whole record for `entry.key()`.
    async fn store(&self, entry: &PersistedEntry) -> EngineResult<()>;

    async fn remove(&self, key: &CandleKey) -> EngineResult<()>;

    async fn keys(&self) -> EngineResult<Vec<CandleKey>>;
}

// ---------------------------------------------------------------------------
// FilePersistence
// ---------------------------------------------------------------------------

/// Longest hex stem used verbatim; longer keys get a hashed name so the file
/// name stays well under the usual 255-byte limit.
const MAX_HEX_STEM: usize = 200;

/// One `<hex(market:interval)>.json` file per key under `dir`. Keys whose hex
/// form exceeds `MAX_HEX_STEM` are stored as `<hex prefix>-<fnv1a>.json`.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Create `dir` if needed. Fails when the directory cannot be created,
    /// so the caller can fall back to [`NoopPersistence`].
    pub fn open(dir: impl AsRef<Path>) -> EngineResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            EngineError::cache(format!("cannot create cache dir {}: {e}", dir.display()))
        })?;
        info!(dir = %dir.display(), "file-backed candle cache opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CandleKey) -> PathBuf {
        self.dir.join(format!("{}.json", Self::file_stem_for(key)))
    }

    fn file_stem_for(key: &CandleKey) -> String {
        let raw = key.to_string();
        let encoded = hex::encode(&raw);
        if encoded.len() <= MAX_HEX_STEM {
            return encoded;
        }
        format!("{}-{:016x}", &encoded[..64], fnv1a(raw.as_bytes()))
    }

    fn key_from_path(path: &Path) -> Option<CandleKey> {
        if path.extension()?.to_str()? != "json" {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let raw = String::from_utf8(hex::decode(stem).ok()?).ok()?;
        let (market, interval) = raw.rsplit_once(':')?;
        Some(CandleKey::new(market, interval))
    }

    /// Key of a hashed-name entry, read from the document itself.
    async fn key_from_document(path: &Path) -> Option<CandleKey> {
        if path.extension()?.to_str()? != "json" {
            return None;
        }
        let content = tokio::fs::read_to_string(path).await.ok()?;
        let entry: PersistedEntry = serde_json::from_str(&content).ok()?;
        Some(entry.key())
    }
}

#[async_trait]
impl Persistence for FilePersistence {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, key: &CandleKey) -> EngineResult<Option<PersistedEntry>> {
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EngineError::cache(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        let entry: PersistedEntry = serde_json::from_str(&content).map_err(|e| {
            EngineError::cache(format!("corrupt cache entry {}: {e}", path.display()))
        })?;
        // Hashed names can collide; the document carries the real key.
        if entry.key() != *key {
            debug!(path = %path.display(), key = %key, "cache file belongs to another key");
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn store(&self, entry: &PersistedEntry) -> EngineResult<()> {
        let path = self.path_for(&entry.key());
        let content = serde_json::to_string(entry)?;

        // Atomic write: write to a temporary sibling file, then rename.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content.as_bytes())
            .await
            .map_err(|e| EngineError::cache(format!("failed to write {}: {e}", tmp_path.display())))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| EngineError::cache(format!("failed to rename {}: {e}", path.display())))?;

        debug!(path = %path.display(), candles = entry.candles.len(), "cache entry written");
        Ok(())
    }

    async fn remove(&self, key: &CandleKey) -> EngineResult<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EngineError::cache(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }

    async fn keys(&self) -> EngineResult<Vec<CandleKey>> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| EngineError::cache(format!("failed to list {}: {e}", self.dir.display())))?;

        let mut keys = Vec::new();
        loop {
            match dir.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    let key = match Self::key_from_path(&path) {
                        Some(key) => Some(key),
                        None => Self::key_from_document(&path).await,
                    };
                    match key {
                        Some(key) => keys.push(key),
                        None => debug!(path = %path.display(), "skipping non-cache file"),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %self.dir.display(), error = %e, "cache dir listing interrupted");
                    break;
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// MemoryPersistence
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryPersistence {
    entries: RwLock<HashMap<CandleKey, PersistedEntry>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, key: &CandleKey) -> EngineResult<Option<PersistedEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn store(&self, entry: &PersistedEntry) -> EngineResult<()> {
        self.entries.write().insert(entry.key(), entry.clone());
        Ok(())
    }

    async fn remove(&self, key: &CandleKey) -> EngineResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn keys(&self) -> EngineResult<Vec<CandleKey>> {
        let mut keys: Vec<CandleKey> = self.entries.read().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// NoopPersistence
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

#[async_trait]
impl Persistence for NoopPersistence {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn load(&self, _key: &CandleKey) -> EngineResult<Option<PersistedEntry>> {
        Ok(None)
    }

    async fn store(&self, _entry: &PersistedEntry) -> EngineResult<()> {
        Ok(())
    }

    async fn remove(&self, _key: &CandleKey) -> EngineResult<()> {
        Ok(())
    }

    async fn keys(&self) -> EngineResult<Vec<CandleKey>> {
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
