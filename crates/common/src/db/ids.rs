//! Application-side primary key allocation
//!
//! Keys are drawn from per-table counters seeded with `max(id) + 1`, so rows
//! of several tables can reference each other before any of them is written.
//! One allocator belongs to one run; two allocators seeded from the same
//! store hand out the same keys, so writers must be serialized externally.

use std::collections::HashMap;

/// Per-table key counters owned by a single import run or request
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: HashMap<&'static str, i32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table's counter from the largest key currently stored
    pub fn seed(&mut self, table: &'static str, max_existing: Option<i32>) {
        self.next.insert(table, first_free(max_existing));
    }

    /// Take the next key for `table`; unseeded tables start at 1
    pub fn allocate(&mut self, table: &'static str) -> i32 {
        let slot = self.next.entry(table).or_insert(1);
        let id = *slot;
        *slot += 1;
        id
    }

    /// The key the next `allocate` call would return
    pub fn peek(&self, table: &'static str) -> i32 {
        self.next.get(table).copied().unwrap_or(1)
    }
}

/// `max + 1`, or 1 for an empty table
pub fn first_free(max_existing: Option<i32>) -> i32 {
    max_existing.map(|max| max + 1).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_starts_at_one() {
        let mut ids = IdAllocator::new();
        ids.seed("PaperInstance", None);
        let allocated: Vec<i32> = (0..3).map(|_| ids.allocate("PaperInstance")).collect();
        assert_eq!(allocated, vec![1, 2, 3]);
    }

    #[test]
    fn test_continues_after_existing_max() {
        let mut ids = IdAllocator::new();
        ids.seed("PaperInstance", Some(41));
        assert_eq!(ids.allocate("PaperInstance"), 42);
        assert_eq!(ids.allocate("PaperInstance"), 43);
        assert_eq!(ids.peek("PaperInstance"), 44);
    }

    #[test]
    fn test_tables_are_independent() {
        let mut ids = IdAllocator::new();
        ids.seed("PaperInstance", Some(10));
        ids.seed("AuthorInstance", None);
        assert_eq!(ids.allocate("PaperInstance"), 11);
        assert_eq!(ids.allocate("AuthorInstance"), 1);
        assert_eq!(ids.allocate("PaperInstance"), 12);
    }
}
