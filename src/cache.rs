use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

use crate::opcode::CompileOutput;

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: CompileOutput,
}

/// Disk cache of compiled templates, keyed by source content hash. A stale
/// or corrupt entry is treated as a miss and dropped.
pub struct IncrementalCache {
    cache_dir: PathBuf,
}

impl IncrementalCache {
    pub fn new() -> Self {
        Self::with_dir(PathBuf::from(".weft/cache"))
    }

    pub fn with_dir(cache_dir: PathBuf) -> Self {
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self { cache_dir }
    }

    pub fn compute_hash(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn entry_path(&self, file_path: &str) -> PathBuf {
        // Stable file name per template path
        let safe_name = file_path
            .replace('/', "_")
            .replace('\\', "_")
            .replace(':', "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, source: &str) -> Option<CompileOutput> {
        let entry_path = self.entry_path(file_path);
        if !entry_path.exists() {
            return None;
        }

        let data = match fs::read_to_string(&entry_path) {
            Ok(data) => data,
            Err(_) => return None,
        };

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(entry) => entry,
            Err(e) => {
                eprintln!("[Weft] Cache deserialization failed for {}: {}", file_path, e);
                fs::remove_file(entry_path).ok();
                return None;
            }
        };

        if entry.hash == Self::compute_hash(source) {
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, output: CompileOutput) {
        let entry_path = self.entry_path(file_path);
        let entry = CacheEntry {
            hash: Self::compute_hash(source),
            output,
        };

        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(entry_path, data).ok();
        }
    }
}

impl Default for IncrementalCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_content_sensitive() {
        assert_eq!(
            IncrementalCache::compute_hash("[]"),
            IncrementalCache::compute_hash("[]")
        );
        assert_ne!(
            IncrementalCache::compute_hash("[]"),
            IncrementalCache::compute_hash("[\"x\"]")
        );
    }

    #[test]
    fn test_entry_path_flattens_separators() {
        let cache = IncrementalCache {
            cache_dir: PathBuf::from("cache"),
        };
        let path = cache.entry_path("pages/home.tpl.json");
        assert_eq!(path, PathBuf::from("cache/pages_home.tpl.json.json"));
    }
}
