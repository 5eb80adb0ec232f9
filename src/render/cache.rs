//! Per-session resource cache keyed by configuration signatures
//!
//! One cache per render session, owned and mutated only by that session's
//! loop. A key is a part-scoped [`ConfigSignature`], so two configurations
//! that agree on a part's relevant fields share the same GPU resources.
//! Lifetime is the render session: entries are created lazily and released
//! explicitly on teardown.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ConfigSignature;

/// Keyed store for one resource kind
///
/// Generic over the resource so the reuse invariant is testable without a
/// GPU device. `get_or_insert_with` guarantees at most one allocation per
/// distinct key.
pub struct SignatureCache<T> {
    entries: HashMap<ConfigSignature, Arc<T>>,
    allocations: u64,
    hits: u64,
}

impl<T> SignatureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            allocations: 0,
            hits: 0,
        }
    }

    /// Fetch the entry for `key`, building it once if absent
    pub fn get_or_insert_with<F>(&mut self, key: &str, build: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(existing) = self.entries.get(key) {
            self.hits += 1;
            return existing.clone();
        }
        self.allocations += 1;
        let built = Arc::new(build());
        self.entries.insert(key.to_owned(), built.clone());
        built
    }

    /// Look up without inserting
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of build calls over the cache lifetime
    pub fn allocations(&self) -> u64 {
        self.allocations
    }

    /// Total number of key hits over the cache lifetime
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Drop every entry, calling `release` on each before removal
    pub fn dispose_with<F>(&mut self, mut release: F)
    where
        F: FnMut(&T),
    {
        for entry in self.entries.values() {
            release(entry);
        }
        self.entries.clear();
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for SignatureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU mesh handle: vertex + index buffers
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    /// Optional per-instance transform buffer (instanced markers)
    pub instance_buffer: Option<wgpu::Buffer>,
    pub instance_count: u32,
}

impl GpuMesh {
    /// Release the underlying GPU buffers
    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        if let Some(instances) = &self.instance_buffer {
            instances.destroy();
        }
    }
}

/// The keyed stores owned by one render session
pub struct ResourceCache {
    pub geometry: SignatureCache<GpuMesh>,
    pub textures: SignatureCache<wgpu::Texture>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self {
            geometry: SignatureCache::new(),
            textures: SignatureCache::new(),
        }
    }

    /// Release every cached GPU handle; the cache is empty afterwards
    pub fn dispose(&mut self) {
        let meshes = self.geometry.len();
        let textures = self.textures.len();
        self.geometry.dispose_with(|mesh| mesh.destroy());
        self.textures.dispose_with(|texture| texture.destroy());
        log::debug!("resource cache disposed ({meshes} meshes, {textures} textures)");
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_allocation_per_key() {
        let mut cache: SignatureCache<String> = SignatureCache::new();

        let a = cache.get_or_insert_with("dial:black/sunburst", || "mesh".to_owned());
        let b = cache.get_or_insert_with("dial:black/sunburst", || "other".to_owned());

        // Identical key: identical handle, builder ran once
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.allocations(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(*b, "mesh");
    }

    #[test]
    fn test_distinct_keys_distinct_handles() {
        let mut cache: SignatureCache<u32> = SignatureCache::new();
        let a = cache.get_or_insert_with("strap:leather/black", || 1);
        let b = cache.get_or_insert_with("strap:rubber/black", || 2);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.allocations(), 2);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let mut cache: SignatureCache<u32> = SignatureCache::new();
        cache.get_or_insert_with("a", || 1);
        cache.get_or_insert_with("b", || 2);

        let mut released = 0;
        cache.dispose_with(|_| released += 1);
        assert_eq!(released, 2);
        assert!(cache.is_empty());
        assert!(!cache.contains("a"));
    }

    #[test]
    fn test_get_does_not_insert() {
        let cache: SignatureCache<u32> = SignatureCache::new();
        assert!(cache.get("missing").is_none());
        assert_eq!(cache.len(), 0);
    }
}
