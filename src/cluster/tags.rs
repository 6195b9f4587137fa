//! Per-node Tag Directory
//!
//! A bidirectional `name <-> id` cache filled lazily from the node's tag collection.
//! Entries are never evicted: tag identity on a backend is immutable once observed.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

#[derive(Debug, Default)]
pub struct TagDirectory {
    name_to_id: DashMap<String, i64>,
    id_to_name: DashMap<i64, String>,
}

impl TagDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.name_to_id.get(name).map(|entry| *entry.value())
    }

    pub fn name_of(&self, id: i64) -> Option<String> {
        self.id_to_name.get(&id).map(|entry| entry.value().clone())
    }

    /// Records an observed `name <-> id` pair. Returns `true` if the pair was new.
    ///
    /// First writer wins: a name or id that is already mapped is never remapped, so the
    /// two maps stay inverse to each other. The name shard is always locked before the id
    /// shard, which keeps concurrent inserts deadlock free.
    pub fn record(&self, name: &str, id: i64) -> bool {
        match self.name_to_id.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                if *existing.get() != id {
                    tracing::warn!(
                        "Tag '{}' already mapped to {}, ignoring id {}",
                        name,
                        existing.get(),
                        id
                    );
                }
                false
            }
            Entry::Vacant(vacant) => match self.id_to_name.entry(id) {
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        "Tag id {} already mapped to '{}', ignoring name '{}'",
                        id,
                        existing.get(),
                        name
                    );
                    false
                }
                Entry::Vacant(reverse) => {
                    reverse.insert(name.to_string());
                    vacant.insert(id);
                    true
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name_to_id.is_empty()
    }
}
