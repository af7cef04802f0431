//! File store for fetched elevation, keyed by a caller-supplied identity.
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{is_no_save, load_json, save_json};

pub struct ElevationCache {
    dir: PathBuf,
    key: String,
}

impl ElevationCache {
    /// A `key` equal to a no-save sentinel gives a cache that never reads or
    /// writes.
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            key: key.to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.key.is_empty() && !is_no_save(&self.key)
    }

    /// Cache file for one elevation product, e.g. `gulf_coast_coarse_elevation.json`.
    pub fn path(&self, product: &str) -> Option<PathBuf> {
        self.is_enabled()
            .then(|| self.dir.join(format!("{}_{product}_elevation.json", self.key)))
    }

    /// Cached value, if present, readable and accepted by `check`. A corrupt
    /// file or one `check` rejects (built for another request, malformed) is
    /// reported and treated as a miss so the caller refetches.
    pub fn load<T, F>(&self, product: &str, check: F) -> Option<T>
    where
        T: DeserializeOwned,
        F: FnOnce(&T) -> Result<()>,
    {
        let path = self.path(product)?;
        if !path.exists() {
            return None;
        }
        let value: T = match load_json(&path) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable elevation cache");
                return None;
            }
        };
        match check(&value) {
            Ok(()) => {
                debug!(path = %path.display(), "elevation cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cached elevation does not fit this request; refetching");
                None
            }
        }
    }

    pub fn store<T: Serialize>(&self, product: &str, value: &T) -> Result<()> {
        if let Some(path) = self.path(product) {
            save_json(&path, value)?;
            debug!(path = %path.display(), "elevation cached");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SurgeError;

    #[test]
    fn sentinel_key_disables_cache() {
        let dir = tempfile::tempdir().unwrap();
        for key in ["none", "None"] {
            let cache = ElevationCache::new(dir.path(), key);
            assert!(!cache.is_enabled());
            cache.store("coarse", &vec![1.0f64]).unwrap();
            assert!(cache.load::<Vec<f64>, _>("coarse", |_| Ok(())).is_none());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn stored_value_is_loaded_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ElevationCache::new(dir.path(), "keys");
        cache.store("fine", &vec![3u32, 4]).unwrap();
        assert_eq!(cache.load::<Vec<u32>, _>("fine", |_| Ok(())), Some(vec![3, 4]));
        assert!(cache.load::<Vec<u32>, _>("coarse", |_| Ok(())).is_none());
        assert!(dir.path().join("keys_fine_elevation.json").exists());
    }

    #[test]
    fn corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad_coarse_elevation.json"), "{not json").unwrap();
        let cache = ElevationCache::new(dir.path(), "bad");
        assert!(cache.load::<Vec<f64>, _>("coarse", |_| Ok(())).is_none());
    }

    #[test]
    fn rejected_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ElevationCache::new(dir.path(), "site");
        cache.store("coarse", &vec![1.0f64, 2.0]).unwrap();
        let stale = cache.load::<Vec<f64>, _>("coarse", |v| {
            if v.len() == 3 {
                Ok(())
            } else {
                Err(SurgeError::ShapeMismatch { what: "cached values", expected: 3, actual: v.len() })
            }
        });
        assert!(stale.is_none());
        assert_eq!(cache.load::<Vec<f64>, _>("coarse", |_| Ok(())), Some(vec![1.0, 2.0]));
    }
}
