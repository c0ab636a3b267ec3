//! In-memory record storage.
//!
//! Each store is a plain vector plus a monotonic id counter. Ids handed out
//! by [`MemoryStore::allocate_id`] are never reused, even after removal.

use chrono::Utc;

use crate::category::Category;
use crate::task::Task;

/// A stored record with an immutable numeric id.
pub trait Record {
    fn id(&self) -> u32;
}

#[derive(Debug, Clone)]
pub struct MemoryStore<T> {
    records: Vec<T>,
    next_id: u32,
}

pub type TaskStore = MemoryStore<Task>;
pub type CategoryStore = MemoryStore<Category>;

impl<T: Record> MemoryStore<T> {
    /// Creates an empty store whose first allocated id is `first_id`.
    pub fn starting_at(first_id: u32) -> Self {
        Self {
            records: Vec::new(),
            next_id: first_id,
        }
    }

    /// Reserves the next id.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, record: T) {
        self.records.push(record);
    }

    pub fn find(&self, id: u32) -> Option<&T> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn find_mut(&mut self, id: u32) -> Option<&mut T> {
        self.records.iter_mut().find(|record| record.id() == id)
    }

    /// Removes and returns the record with `id`, preserving the order of the rest.
    pub fn remove(&mut self, id: u32) -> Option<T> {
        let index = self.records.iter().position(|record| record.id() == id)?;
        Some(self.records.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl CategoryStore {
    /// Creates a category store holding the four default categories.
    /// New categories continue at id 5.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let defaults = [
            (1, "Trabalho", "#4a6fa5"),
            (2, "Pessoal", "#6a4ca5"),
            (3, "Estudo", "#4ca56a"),
            (4, "Saúde", "#a54c4c"),
        ];
        Self {
            records: defaults
                .into_iter()
                .map(|(id, name, color)| Category {
                    id,
                    name: name.to_string(),
                    color: color.to_string(),
                    created_at: now,
                    updated_at: now,
                })
                .collect(),
            next_id: 5,
        }
    }
}

/// Converts a parsed id into a store key. Ids outside the `u32` range can
/// never match a record.
pub fn store_key(id: i64) -> Option<u32> {
    u32::try_from(id).ok()
}
