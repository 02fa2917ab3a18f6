use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::convert::Infallible;
use std::hash::Hash;
use std::sync::Arc;

/// Clones the upper triangle entries into the lower triangle entries.
///
/// The primary use case for this is to construct a full symmetric matrix from a symmetric
/// matrix represented only by its upper triangular entries.
pub(crate) fn clone_upper_to_lower(matrix: &mut DMatrix<f64>) {
    for j in 0..matrix.ncols() {
        for i in (j + 1)..matrix.nrows() {
            matrix[(i, j)] = matrix[(j, i)];
        }
    }
}

/// A lazily initialized shared value.
///
/// The first caller constructs the value while holding the slot lock. Concurrent callers wait
/// for it and receive the same value, so the value is constructed at most once. A failed
/// construction leaves the slot empty.
#[derive(Debug)]
pub(crate) struct LazySlot<V> {
    value: Mutex<Option<Arc<V>>>,
}

impl<V> Default for LazySlot<V> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

impl<V> LazySlot<V> {
    pub fn get_or_try_init<E>(&self, create: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E> {
        let mut value = self.value.lock();
        if let Some(existing) = value.as_ref() {
            return Ok(Arc::clone(existing));
        }
        let created = Arc::new(create()?);
        *value = Some(Arc::clone(&created));
        Ok(created)
    }

    pub fn get_or_init(&self, create: impl FnOnce() -> V) -> Arc<V> {
        match self.get_or_try_init(|| Ok::<V, Infallible>(create())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.value.lock().is_some()
    }
}

/// A keyed cache of lazily initialized shared values.
///
/// Each key owns a [`LazySlot`]. The map lock is only held to look up or insert the slot, so
/// constructors are free to request other keys of the same cache. A constructor must not request
/// its own key.
#[derive(Debug)]
pub(crate) struct LazyCache<K, V> {
    slots: Mutex<FxHashMap<K, Arc<LazySlot<V>>>>,
}

impl<K, V> Default for LazyCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K, V> LazyCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn slot(&self, key: &K) -> Arc<LazySlot<V>> {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) => Arc::clone(slot),
            None => Arc::clone(slots.entry(key.clone()).or_default()),
        }
    }

    pub fn get_or_try_insert_with<E>(
        &self,
        key: &K,
        create: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        self.slot(key).get_or_try_init(create)
    }

    pub fn get_or_insert_with(&self, key: &K, create: impl FnOnce() -> V) -> Arc<V> {
        self.slot(key).get_or_init(create)
    }

    pub fn contains(&self, key: &K) -> bool {
        let slot = self.slots.lock().get(key).cloned();
        slot.map_or(false, |slot| slot.is_initialized())
    }

    /// Removes the entry for the key, returning whether a value was present.
    pub fn remove(&self, key: &K) -> bool {
        let slot = self.slots.lock().remove(key);
        slot.map_or(false, |slot| slot.is_initialized())
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// The number of constructed values.
    pub fn len(&self) -> usize {
        let slots: Vec<_> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.is_initialized()).count()
    }
}

/// Pointwise product `a .* b`.
pub fn vmul(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "Operands must have the same length");
    a.iter().zip(b).map(|(x, y)| x * y).collect()
}

/// Computes `y += alpha * x`.
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "Operands must have the same length");
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Dense matrix-vector product with slices as input and output.
pub fn dense_mul(matrix: &DMatrix<f64>, x: &[f64]) -> Vec<f64> {
    assert_eq!(matrix.ncols(), x.len(), "Dimension mismatch in matrix-vector product");
    let y = matrix * DVector::from_column_slice(x);
    y.as_slice().to_vec()
}
