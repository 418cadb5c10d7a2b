//! Process-wide struct mapping cache.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::{Record, StructMapping};
use crate::error::{OrmError, OrmResult};

type Entry = Arc<dyn Any + Send + Sync>;

/// Lazily built, read-mostly store of [`StructMapping`]s keyed by `TypeId`.
///
/// Each record type gets exactly one mapping instance for the lifetime of the
/// cache; concurrent first lookups converge on the same `Arc`. Failed builds
/// are not cached.
#[derive(Default)]
pub struct MappingCache {
    entries: RwLock<HashMap<TypeId, Entry>>,
}

impl std::fmt::Debug for MappingCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingCache")
            .field("len", &self.len())
            .finish()
    }
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> Arc<MappingCache> {
        static GLOBAL: OnceLock<Arc<MappingCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MappingCache::new())))
    }

    /// Get the mapping of `R`, building it on first use.
    pub fn get<R: Record>(&self) -> OrmResult<Arc<StructMapping<R>>> {
        let key = TypeId::of::<R>();
        let cached = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(entry) = cached {
            return downcast(entry);
        }

        let built: Entry = Arc::new(StructMapping::<R>::build()?);
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Another task may have won the race while we were building.
        let entry = entries.entry(key).or_insert(built);
        downcast(Arc::clone(entry))
    }

    /// Number of cached mappings.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn downcast<R: Record>(entry: Entry) -> OrmResult<Arc<StructMapping<R>>> {
    entry
        .downcast::<StructMapping<R>>()
        .map_err(|_| OrmError::Other("mapping cache entry has an unexpected type".to_string()))
}
