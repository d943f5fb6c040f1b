use std::collections::HashMap;

/// Maps opaque `u64` handles to owned GPU objects.
/// The driver only ever sees the handle; zero is never issued.
pub struct HandleStore<T> {
    items: HashMap<u64, T>,
    next: u64,
}

impl<T> HandleStore<T> {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            next: 1,
        }
    }

    /// Insert an item and return its handle.
    pub fn insert(&mut self, item: T) -> u64 {
        let handle = self.next;
        self.next += 1;
        self.items.insert(handle, item);
        handle
    }

    pub fn get(&self, handle: u64) -> Option<&T> {
        self.items.get(&handle)
    }

    pub fn remove(&mut self, handle: u64) -> Option<T> {
        self.items.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop every item. Handles are not reused afterwards.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T> Default for HandleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_start_at_one_and_are_unique() {
        let mut store = HandleStore::new();
        let a = store.insert("a");
        let b = store.insert("b");
        assert_eq!(a, 1);
        assert_ne!(a, b);
        assert_eq!(store.get(b), Some(&"b"));
    }

    #[test]
    fn test_cleared_handles_are_not_reissued() {
        let mut store = HandleStore::new();
        let a = store.insert(1);
        store.clear();
        assert!(store.is_empty());
        assert!(store.get(a).is_none());
        assert_ne!(store.insert(2), a);
    }

    #[test]
    fn test_remove() {
        let mut store = HandleStore::new();
        let a = store.insert(7);
        assert_eq!(store.remove(a), Some(7));
        assert_eq!(store.remove(a), None);
        assert_eq!(store.len(), 0);
    }
}
