//! The keyed container index: an ordered map from the high 16 bits of a
//! value to the container holding that chunk's low 16 bits.
//!
//! Containers are held behind `Arc`, which is the copy-on-write mechanism:
//! a shallow clone shares container bodies, and every mutation path goes
//! through [`Arc::make_mut`], paying the deep copy exactly when a body is
//! shared.

use std::sync::Arc;

use crate::container::Container;

#[derive(Clone, Debug, Default)]
pub(crate) struct ChunkIndex {
    keys: Vec<u16>,
    containers: Vec<Arc<Container>>,
}

impl ChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            containers: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn key_at(&self, i: usize) -> u16 {
        self.keys[i]
    }

    #[inline]
    pub fn container_at(&self, i: usize) -> &Container {
        &self.containers[i]
    }

    #[inline]
    pub fn shared_at(&self, i: usize) -> Arc<Container> {
        Arc::clone(&self.containers[i])
    }

    #[inline]
    pub fn position(&self, key: u16) -> Result<usize, usize> {
        self.keys.binary_search(&key)
    }

    /// Smallest index `>= from` whose key is `>= key`: the chunk-skipping
    /// workhorse of the zipper merges, exponential probe then binary search.
    pub fn advance_until(&self, key: u16, from: usize) -> usize {
        crate::container::advance_until(&self.keys, from, key)
    }

    pub fn get(&self, key: u16) -> Option<&Container> {
        self.position(key).ok().map(|i| &*self.containers[i])
    }

    /// CoW-aware mutable access: a shared container body is deep-copied
    /// before the caller sees it.
    pub fn get_mut(&mut self, key: u16) -> Option<&mut Container> {
        match self.position(key) {
            Ok(i) => Some(Arc::make_mut(&mut self.containers[i])),
            Err(_) => None,
        }
    }

    #[inline]
    pub fn container_at_mut(&mut self, i: usize) -> &mut Container {
        Arc::make_mut(&mut self.containers[i])
    }

    /// Mutable access to the container for `key`, creating an empty one if
    /// the chunk was absent.
    pub fn entry(&mut self, key: u16) -> &mut Container {
        let i = match self.position(key) {
            Ok(i) => i,
            Err(i) => {
                self.keys.insert(i, key);
                self.containers.insert(i, Arc::new(Container::new()));
                i
            }
        };
        Arc::make_mut(&mut self.containers[i])
    }

    pub fn insert_at(&mut self, i: usize, key: u16, container: Arc<Container>) {
        debug_assert!(!container.is_empty());
        self.keys.insert(i, key);
        self.containers.insert(i, container);
    }

    pub fn push(&mut self, key: u16, container: Arc<Container>) {
        debug_assert!(self.keys.last().map_or(true, |&last| key > last));
        debug_assert!(!container.is_empty());
        self.keys.push(key);
        self.containers.push(container);
    }

    pub fn remove_at(&mut self, i: usize) {
        self.keys.remove(i);
        self.containers.remove(i);
    }

    /// Drop the entry for `key` if its container became empty.
    pub fn prune(&mut self, key: u16) {
        if let Ok(i) = self.position(key) {
            if self.containers[i].is_empty() {
                self.remove_at(i);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &Arc<Container>)> {
        self.keys.iter().copied().zip(self.containers.iter())
    }

    /// Clone with container bodies copied rather than shared.
    pub fn deep_clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            containers: self
                .containers
                .iter()
                .map(|c| Arc::new(Container::clone(c)))
                .collect(),
        }
    }

    pub fn cardinality(&self) -> u64 {
        self.containers.iter().map(|c| c.cardinality()).sum()
    }

    pub fn and(&self, other: &Self) -> Self {
        let mut out = Self::new();
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                std::cmp::Ordering::Equal => {
                    let c = self.containers[i].and(&other.containers[j]);
                    if !c.is_empty() {
                        out.push(self.keys[i], Arc::new(c));
                    }
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i = self.advance_until(other.keys[j], i),
                std::cmp::Ordering::Greater => j = other.advance_until(self.keys[i], j),
            }
        }
        out
    }

    pub fn or(&self, other: &Self) -> Self {
        let mut out = Self::with_capacity(self.len().max(other.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                std::cmp::Ordering::Equal => {
                    out.push(self.keys[i], Arc::new(self.containers[i].or(&other.containers[j])));
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    out.push(self.keys[i], self.shared_at(i));
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(other.keys[j], other.shared_at(j));
                    j += 1;
                }
            }
        }
        for k in i..self.len() {
            out.push(self.keys[k], self.shared_at(k));
        }
        for k in j..other.len() {
            out.push(other.keys[k], other.shared_at(k));
        }
        out
    }

    pub fn xor(&self, other: &Self) -> Self {
        let mut out = Self::new();
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                std::cmp::Ordering::Equal => {
                    let c = self.containers[i].xor(&other.containers[j]);
                    if !c.is_empty() {
                        out.push(self.keys[i], Arc::new(c));
                    }
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    out.push(self.keys[i], self.shared_at(i));
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(other.keys[j], other.shared_at(j));
                    j += 1;
                }
            }
        }
        for k in i..self.len() {
            out.push(self.keys[k], self.shared_at(k));
        }
        for k in j..other.len() {
            out.push(other.keys[k], other.shared_at(k));
        }
        out
    }

    pub fn and_not(&self, other: &Self) -> Self {
        let mut out = Self::new();
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.keys[i].cmp(&other.keys[j]) {
                std::cmp::Ordering::Equal => {
                    let c = self.containers[i].and_not(&other.containers[j]);
                    if !c.is_empty() {
                        out.push(self.keys[i], Arc::new(c));
                    }
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    out.push(self.keys[i], self.shared_at(i));
                    i += 1;
                }
                std::cmp::Ordering::Greater => j = other.advance_until(self.keys[i], j),
            }
        }
        for k in i..self.len() {
            out.push(self.keys[k], self.shared_at(k));
        }
        out
    }

    pub fn and_inplace(&mut self, other: &Self) {
        let mut write = 0;
        let mut j = 0;
        for read in 0..self.keys.len() {
            let key = self.keys[read];
            j = other.advance_until(key, j);
            if j < other.len() && other.keys[j] == key {
                let c = Arc::make_mut(&mut self.containers[read]);
                c.and_inplace(&other.containers[j]);
                if !c.is_empty() {
                    self.keys.swap(write, read);
                    self.containers.swap(write, read);
                    write += 1;
                }
            }
        }
        self.keys.truncate(write);
        self.containers.truncate(write);
    }

    pub fn or_inplace(&mut self, other: &Self) {
        let mut i = 0;
        for (key, container) in other.iter() {
            i = self.advance_until(key, i);
            if i < self.len() && self.keys[i] == key {
                Arc::make_mut(&mut self.containers[i]).or_inplace(container);
            } else {
                self.insert_at(i, key, Arc::clone(container));
            }
            i += 1;
        }
    }

    pub fn xor_inplace(&mut self, other: &Self) {
        let mut i = 0;
        for (key, container) in other.iter() {
            i = self.advance_until(key, i);
            if i < self.len() && self.keys[i] == key {
                let c = Arc::make_mut(&mut self.containers[i]);
                c.xor_inplace(container);
                if c.is_empty() {
                    self.remove_at(i);
                    continue;
                }
            } else {
                self.insert_at(i, key, Arc::clone(container));
            }
            i += 1;
        }
    }

    pub fn and_not_inplace(&mut self, other: &Self) {
        let mut write = 0;
        let mut j = 0;
        for read in 0..self.keys.len() {
            let key = self.keys[read];
            j = other.advance_until(key, j);
            let keep = if j < other.len() && other.keys[j] == key {
                let c = Arc::make_mut(&mut self.containers[read]);
                c.and_not_inplace(&other.containers[j]);
                !c.is_empty()
            } else {
                true
            };
            if keep {
                self.keys.swap(write, read);
                self.containers.swap(write, read);
                write += 1;
            }
        }
        self.keys.truncate(write);
        self.containers.truncate(write);
    }

    pub fn has_run_container(&self) -> bool {
        self.containers
            .iter()
            .any(|c| matches!(**c, Container::Run(_)))
    }
}

/// Representation-independent equality: same keys, same chunk contents.
impl PartialEq for ChunkIndex {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
            && self
                .containers
                .iter()
                .zip(other.containers.iter())
                .all(|(a, b)| a == b)
    }
}

impl Eq for ChunkIndex {}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(values: &[u32]) -> ChunkIndex {
        let mut index = ChunkIndex::new();
        for &v in values {
            index.entry((v >> 16) as u16).insert(v as u16);
        }
        index
    }

    #[test]
    fn entries_stay_sorted_by_key() {
        let index = index_of(&[1 << 20, 5, 1 << 18, 70000]);
        let keys: Vec<u16> = index.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(index.cardinality(), 4);
    }

    #[test]
    fn advance_until_skips() {
        let index = index_of(&[0, 5 << 16, 9 << 16]);
        assert_eq!(index.advance_until(0, 0), 0);
        assert_eq!(index.advance_until(3, 0), 1);
        assert_eq!(index.advance_until(9, 0), 2);
        assert_eq!(index.advance_until(10, 0), 3);
    }

    #[test]
    fn cow_clone_diverges_on_write() {
        let mut a = index_of(&[1, 2, 3]);
        let b = a.clone();
        a.entry(0).insert(100);
        assert_eq!(a.cardinality(), 4);
        assert_eq!(b.cardinality(), 3);
        assert!(!b.container_at(0).contains(100));
    }

    #[test]
    fn zipper_ops_drop_empty_chunks() {
        let a = index_of(&[1, 70000]);
        let b = index_of(&[2, 70000]);
        let and = a.and(&b);
        assert_eq!(and.len(), 1);
        assert_eq!(and.cardinality(), 1);
        let xor = a.xor(&b);
        assert_eq!(xor.len(), 1);
        assert_eq!(xor.cardinality(), 2);
        let or = a.or(&b);
        assert_eq!(or.len(), 2);
        assert_eq!(or.cardinality(), 3);
        let and_not = a.and_not(&b);
        assert_eq!(and_not.cardinality(), 1);
    }

    #[test]
    fn inplace_matches_value_form() {
        let a = index_of(&[1, 2, 70000, 1 << 20]);
        let b = index_of(&[2, 70001, 1 << 21]);
        for (value, inplace) in [
            (a.and(&b), {
                let mut c = a.clone();
                c.and_inplace(&b);
                c
            }),
            (a.or(&b), {
                let mut c = a.clone();
                c.or_inplace(&b);
                c
            }),
            (a.xor(&b), {
                let mut c = a.clone();
                c.xor_inplace(&b);
                c
            }),
            (a.and_not(&b), {
                let mut c = a.clone();
                c.and_not_inplace(&b);
                c
            }),
        ] {
            assert_eq!(value, inplace);
        }
    }
}
