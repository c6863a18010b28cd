use std::collections::BTreeMap;

use anyhow::{anyhow, Context};
use serde::Serialize;

use crate::reducer::Reducer;

struct Buffered<V> {
    arrival: u64,
    value: V,
    size: usize,
}

/// In-memory entries grouped by key, in arrival order within a key.
///
/// With a reducer configured every key holds at most one entry: the second arrival is folded
/// into the first immediately.
pub(crate) struct SpillBuffer<K, V> {
    entries: BTreeMap<K, Vec<Buffered<V>>>,
    size: usize,
    len: usize,
}

fn serialized_size<T: Serialize>(t: &T) -> Result<usize, anyhow::Error> {
    let bytes = serde_json::to_vec(t)
        .with_context(|| anyhow!("Failed to serialize buffered entry"))?;
    Ok(bytes.len())
}

impl<K, V> SpillBuffer<K, V>
where
    K: Ord + Clone + Serialize,
    V: Serialize,
{
    pub(crate) fn new() -> SpillBuffer<K, V> {
        SpillBuffer {
            entries: BTreeMap::new(),
            size: 0,
            len: 0,
        }
    }

    /// Serialized size of all buffered entries in bytes.
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn insert(&mut self, key: K, arrival: u64, value: V, reducer: &mut Reducer<V>) -> Result<(), anyhow::Error> {
        let key_size = serialized_size(&key)?;
        let size = key_size + serialized_size(&value)?;
        let bucket = self.entries.entry(key).or_default();
        bucket.push(Buffered { arrival, value, size });
        self.size += size;
        self.len += 1;

        if reducer.is_enabled() && bucket.len() == 2 {
            if let (Some(later), Some(earlier)) = (bucket.pop(), bucket.pop()) {
                let value = reducer.reduce(earlier.value, later.value)?;
                let size = key_size + serialized_size(&value)?;
                self.size = self.size - earlier.size - later.size + size;
                self.len -= 1;
                bucket.push(Buffered { arrival: earlier.arrival, value, size });
            }
        }
        Ok(())
    }

    /// Take all entries in ascending key order, ties in arrival order.
    pub(crate) fn drain_sorted(&mut self) -> impl Iterator<Item = (K, V)> {
        self.size = 0;
        self.len = 0;
        std::mem::take(&mut self.entries)
            .into_iter()
            .flat_map(|(key, bucket)| {
                bucket.into_iter().map(move |buffered| (key.clone(), buffered.value))
            })
    }
}
