//! On-disk view cache - versioned file blobs keyed by view identity
//!
//! One subdirectory per catalog, one file per cached entity:
//!
//! - `romlist.<view>.json`                 parsed catalog snapshot
//! - `romlist.<view>.globalfilter.json`    post-global-filter snapshot
//! - `romlist.<view>.filter.<N>.json`      one built entry per sub-filter
//! - `snapshot.<view>.json`                romlist hash + emulator set
//! - `stats.<emulator>.json`               play-statistics mirror
//!
//! Every payload carries an embedded format version; a mismatch is treated
//! identically to corruption: delete the entry and report a miss. Writes are
//! whole-file replace so a crash mid-write never damages the previous entry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::catalog::Catalog;
use crate::catalog::view::FilterEntry;

/// Current cache format version - entries are rebuilt on mismatch
pub const CACHE_VERSION: u32 = 3;

/// Cache file extension (payloads are human-readable JSON)
const CACHE_EXT: &str = "json";

/// Errors from cache persistence
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed cache payload: {0}")]
    Format(#[from] serde_json::Error),

    #[error("cache version {found} does not match expected {expected}")]
    Version { found: u32, expected: u32 },

    #[error("cached index {index} no longer present in catalog")]
    StaleIndex { index: u32 },
}

/// Versioned envelope wrapped around every persisted payload
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    payload: T,
}

/// Snapshot of the inputs a view's cache tree was built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    /// SHA-256 of the raw romlist file
    pub romlist_hash: String,
    /// Sorted names of the configured emulators
    pub emulators: Vec<String>,
}

impl SourceSnapshot {
    /// Compute the current snapshot for a romlist file and emulator set
    pub fn current(romlist_path: &Path, mut emulators: Vec<String>) -> Self {
        emulators.sort();
        let romlist_hash = match fs::read(romlist_path) {
            Ok(bytes) => {
                let mut hasher = Sha256::new();
                hasher.update(&bytes);
                format!("{:x}", hasher.finalize())
            }
            Err(_) => String::new(),
        };
        Self {
            romlist_hash,
            emulators,
        }
    }
}

/// The cache directory for one catalog.
///
/// An explicit context object owned by the session; there is no process-wide
/// cache state.
#[derive(Debug, Clone)]
pub struct CacheDir {
    dir: PathBuf,
}

impl CacheDir {
    /// Open the cache subdirectory for a catalog (created lazily on save)
    pub fn new(cache_root: &Path, catalog: &str) -> Self {
        Self {
            dir: cache_root.join(sanitize(catalog)),
        }
    }

    // =========================================================================
    // Key construction
    // =========================================================================

    pub fn catalog_key(view: &str) -> String {
        format!("romlist.{}.{}", sanitize(view), CACHE_EXT)
    }

    pub fn global_filter_key(view: &str) -> String {
        format!("romlist.{}.globalfilter.{}", sanitize(view), CACHE_EXT)
    }

    pub fn sub_filter_key(view: &str, ordinal: usize) -> String {
        format!("romlist.{}.filter.{}.{}", sanitize(view), ordinal, CACHE_EXT)
    }

    pub fn snapshot_key(view: &str) -> String {
        format!("snapshot.{}.{}", sanitize(view), CACHE_EXT)
    }

    pub fn stats_key(emulator: &str) -> String {
        format!("stats.{}.{}", sanitize(emulator), CACHE_EXT)
    }

    // =========================================================================
    // Save / load / invalidate
    // =========================================================================

    /// Persist a payload under the current cache version.
    ///
    /// The write is whole-file replace: a new file is written and renamed
    /// over the old one, so a failed write leaves the previous entry intact.
    pub fn save<T: Serialize>(&self, key: &str, payload: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;

        let envelope = Envelope {
            version: CACHE_VERSION,
            payload,
        };
        let bytes = serde_json::to_vec(&envelope)?;

        let path = self.path(key);
        let tmp = self.dir.join(format!("{}.tmp", key));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        debug!(key, bytes = bytes.len(), "cache entry written");
        Ok(())
    }

    /// Load a payload. Absent entries, version mismatches and corrupt files
    /// all report `None`; corrupt entries are deleted so the next save
    /// starts clean.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(found) => found,
            Err(err) => {
                warn!(key, %err, "corrupt cache entry removed");
                self.invalidate(key);
                None
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let bytes = match fs::read(self.path(key)) {
            Ok(bytes) => bytes,
            // Read failures are cache misses, never user-visible errors
            Err(_) => return Ok(None),
        };

        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        if envelope.version != CACHE_VERSION {
            return Err(CacheError::Version {
                found: envelope.version,
                expected: CACHE_VERSION,
            });
        }
        Ok(Some(envelope.payload))
    }

    /// Delete one cache entry (best-effort)
    pub fn invalidate(&self, key: &str) {
        let _ = fs::remove_file(self.path(key));
    }

    /// Delete a view's entire cache tree: catalog snapshot, global filter,
    /// source snapshot and every sub-filter entry. Used when sub-filters are
    /// added, removed or renamed (ordinal keys are no longer stable) and
    /// when the source snapshot changes.
    pub fn invalidate_view(&self, view: &str) {
        self.invalidate(&Self::catalog_key(view));
        self.invalidate(&Self::global_filter_key(view));
        self.invalidate(&Self::snapshot_key(view));

        let prefix = format!("romlist.{}.filter.", sanitize(view));
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(&prefix) {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
        debug!(view, "view cache tree invalidated");
    }

    // =========================================================================
    // Typed entity helpers
    // =========================================================================

    /// Load a cached filter entry and validate every index against the live
    /// catalog. Any missing index fails the whole load: the entry is dropped
    /// and a full rebuild follows, never a partial one.
    pub fn load_entry(&self, view: &str, ordinal: usize, catalog: &Catalog) -> Option<FilterEntry> {
        let key = Self::sub_filter_key(view, ordinal);
        let entry: FilterEntry = self.load(&key)?;

        let stale = entry.indices().find(|i| !catalog.contains(*i));
        match stale {
            None => Some(entry),
            Some(index) => {
                let err = CacheError::StaleIndex { index };
                warn!(view, ordinal, %err, "cached entry rejected; rebuilding");
                self.invalidate(&key);
                None
            }
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

/// Replace filesystem-hostile characters in a cache key component
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
