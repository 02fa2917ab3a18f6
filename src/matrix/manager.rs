use crate::util::LazyCache;
use log::debug;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Constructs matrices (or other values) on demand for a [`MatrixManager`].
pub trait MatrixFactory<K, V> {
    fn create_matrix(&self, key: &K) -> V;
}

/// A keyed, lazily populated cache of shared values.
///
/// Values are constructed by a [`MatrixFactory`] the first time a key is requested. Factories may
/// request other entries of the same manager. Concurrent requests for a key that is being
/// constructed wait for the construction to finish, so each key is constructed at most once.
#[derive(Debug)]
pub struct MatrixManager<K, V> {
    name: &'static str,
    entries: LazyCache<K, V>,
    constructions: AtomicUsize,
}

impl<K, V> MatrixManager<K, V>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: LazyCache::default(),
            constructions: AtomicUsize::new(0),
        }
    }

    pub fn get<F>(&self, factory: &F, key: &K) -> Arc<V>
    where
        F: MatrixFactory<K, V> + ?Sized,
    {
        self.entries.get_or_insert_with(key, || {
            debug!("{}: constructing entry for {:?}", self.name, key);
            self.constructions.fetch_add(1, Ordering::Relaxed);
            factory.create_matrix(key)
        })
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Removes the entry for the given key, returning whether an entry was present.
    ///
    /// Handles previously returned by [`get`](Self::get) remain valid.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.remove(key)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The total number of values constructed by this manager.
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::Relaxed)
    }
}
