//! Bounded least-recently-used map.
//!
//! Entries live in a slab-backed doubly-linked list ordered from least to
//! most recently used; a hash map points from key to slab slot. Lookups,
//! touches, inserts and evictions are all O(1). Index links instead of
//! pointers keep the structure entirely safe code.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotIdx(usize);

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: Option<SlotIdx>,
    next: Option<SlotIdx>,
}

/// A map holding at most `capacity` entries, evicting the least recently
/// used one when full.
#[derive(Debug)]
pub struct LruCache<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    map: HashMap<K, SlotIdx>,
    /// Least recently used.
    head: Option<SlotIdx>,
    /// Most recently used.
    tail: Option<SlotIdx>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache bounded to `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity + 1),
            free: Vec::new(),
            map: HashMap::with_capacity(capacity + 1),
            head: None,
            tail: None,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Look up `key` and mark it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.move_to_back(idx);
        self.slots[idx.0].as_ref().map(|n| &n.value)
    }

    /// Look up `key` without touching recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let idx = self.map.get(key)?;
        self.slots[idx.0].as_ref().map(|n| &n.value)
    }

    /// Insert or overwrite `key`, marking it most recently used.
    ///
    /// Returns the entries evicted to stay within capacity, oldest first.
    /// An overwrite returns nothing; the replaced value is dropped.
    pub fn put(&mut self, key: K, value: V) -> Vec<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some(node) = self.slots[idx.0].as_mut() {
                node.value = value;
            }
            self.move_to_back(idx);
            return Vec::new();
        }

        let idx = self.alloc(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.link_back(idx);
        self.map.insert(key, idx);

        let mut evicted = Vec::new();
        while self.map.len() > self.capacity {
            match self.pop_front() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        debug_assert!(self.map.len() <= self.capacity, "LRU bound exceeded");
        evicted
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.release(idx).map(|n| n.value)
    }

    /// Remove every entry whose key matches `pred`, returning them.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Vec<(K, V)>
    where
        F: FnMut(&K) -> bool,
    {
        let doomed: Vec<K> = self.map.keys().filter(|k| pred(k)).cloned().collect();
        doomed
            .into_iter()
            .filter_map(|k| self.remove(&k).map(|v| (k, v)))
            .collect()
    }

    /// Remove and return the least recently used entry.
    pub fn pop_front(&mut self) -> Option<(K, V)> {
        let idx = self.head?;
        self.unlink(idx);
        let node = self.release(idx)?;
        self.map.remove(&node.key);
        Some((node.key, node.value))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.map.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate from least to most recently used, without touching recency.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            cache: self,
            cursor: self.head,
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> SlotIdx {
        match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(node);
                SlotIdx(i)
            }
            None => {
                self.slots.push(Some(node));
                SlotIdx(self.slots.len() - 1)
            }
        }
    }

    fn release(&mut self, idx: SlotIdx) -> Option<Node<K, V>> {
        let node = self.slots[idx.0].take();
        if node.is_some() {
            self.free.push(idx.0);
        }
        node
    }

    fn links(&self, idx: SlotIdx) -> (Option<SlotIdx>, Option<SlotIdx>) {
        self.slots[idx.0]
            .as_ref()
            .map(|n| (n.prev, n.next))
            .unwrap_or((None, None))
    }

    fn set_prev(&mut self, idx: SlotIdx, prev: Option<SlotIdx>) {
        if let Some(n) = self.slots[idx.0].as_mut() {
            n.prev = prev;
        }
    }

    fn set_next(&mut self, idx: SlotIdx, next: Option<SlotIdx>) {
        if let Some(n) = self.slots[idx.0].as_mut() {
            n.next = next;
        }
    }

    fn unlink(&mut self, idx: SlotIdx) {
        let (prev, next) = self.links(idx);
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.tail = prev,
        }
        self.set_prev(idx, None);
        self.set_next(idx, None);
    }

    fn link_back(&mut self, idx: SlotIdx) {
        match self.tail {
            Some(t) => {
                self.set_next(t, Some(idx));
                self.set_prev(idx, Some(t));
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn move_to_back(&mut self, idx: SlotIdx) {
        if self.tail == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.link_back(idx);
    }
}

/// Iterator over entries from least to most recently used.
pub struct Iter<'a, K, V> {
    cache: &'a LruCache<K, V>,
    cursor: Option<SlotIdx>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.cache.slots[idx.0].as_ref()?;
        self.cursor = node.next;
        Some((&node.key, &node.value))
    }
}
