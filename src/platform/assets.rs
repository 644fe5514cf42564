//! Static asset resolution (logo, watermark, signatures)

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Resolves image references used inside the capture surface. Assets are
/// expected to be available before capture; a missing one leaves its box
/// empty.
pub trait AssetProvider: Send + Sync {
    fn fetch(&self, reference: &str) -> Option<Vec<u8>>;
}

/// In-memory assets for tests and embedding hosts
pub struct MemoryAssets {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        MemoryAssets { files: Mutex::new(HashMap::new()) }
    }

    pub fn insert(&self, reference: &str, bytes: Vec<u8>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(reference.to_string(), bytes);
        }
    }
}

impl Default for MemoryAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetProvider for MemoryAssets {
    fn fetch(&self, reference: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(reference).cloned()
    }
}

/// Reads assets relative to a root directory. References that try to leave
/// the root are refused.
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirAssets { root: root.into() }
    }

    fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let rel = Path::new(reference.trim_start_matches('/'));
        if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
            log::warn!("refusing asset reference outside the asset root: {}", reference);
            return None;
        }
        Some(self.root.join(rel))
    }
}

impl AssetProvider for DirAssets {
    fn fetch(&self, reference: &str) -> Option<Vec<u8>> {
        let path = self.resolve(reference)?;
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::debug!("asset {} not readable: {}", path.display(), e);
                None
            }
        }
    }
}
