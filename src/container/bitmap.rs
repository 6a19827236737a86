use std::ops::RangeInclusive;

use super::array::ArrayStore;

/// Number of 64-bit words in a bitmap container: 65536 bits.
pub const BITMAP_LENGTH: usize = 1024;

/// Fixed 65536-bit vector with a cached cardinality.
#[derive(Clone, Debug)]
pub struct BitmapStore {
    len: u64,
    bits: Box<[u64; BITMAP_LENGTH]>,
}

impl Default for BitmapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BitmapStore {
    pub fn new() -> Self {
        Self {
            len: 0,
            bits: Box::new([0; BITMAP_LENGTH]),
        }
    }

    pub fn full() -> Self {
        Self {
            len: 1 << 16,
            bits: Box::new([u64::MAX; BITMAP_LENGTH]),
        }
    }

    /// Wrap raw words with a precomputed population count.
    pub fn from_unchecked(len: u64, bits: Box<[u64; BITMAP_LENGTH]>) -> Self {
        debug_assert_eq!(len, bits.iter().map(|w| u64::from(w.count_ones())).sum::<u64>());
        Self { len, bits }
    }

    pub fn from_words(bits: Box<[u64; BITMAP_LENGTH]>) -> Self {
        let len = bits.iter().map(|w| u64::from(w.count_ones())).sum();
        Self { len, bits }
    }

    #[inline]
    pub fn as_words(&self) -> &[u64; BITMAP_LENGTH] {
        &self.bits
    }

    #[inline]
    pub fn cardinality(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.bits[key(value)] & (1 << bit(value)) != 0
    }

    #[inline]
    pub fn insert(&mut self, value: u16) -> bool {
        let word = &mut self.bits[key(value)];
        let mask = 1 << bit(value);
        let absent = *word & mask == 0;
        *word |= mask;
        self.len += absent as u64;
        absent
    }

    #[inline]
    pub fn remove(&mut self, value: u16) -> bool {
        let word = &mut self.bits[key(value)];
        let mask = 1 << bit(value);
        let present = *word & mask != 0;
        *word &= !mask;
        self.len -= present as u64;
        present
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let before = self.len;
        self.for_range_words(range, |word, mask| *word |= mask);
        self.len = self.popcount();
        self.len - before
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let before = self.len;
        self.for_range_words(range, |word, mask| *word &= !mask);
        self.len = self.popcount();
        before - self.len
    }

    /// Flip every bit in `range`.
    pub fn flip_range(&mut self, range: RangeInclusive<u16>) {
        self.for_range_words(range, |word, mask| *word ^= mask);
        self.len = self.popcount();
    }

    fn for_range_words(&mut self, range: RangeInclusive<u16>, mut f: impl FnMut(&mut u64, u64)) {
        let (start, end) = (*range.start() as usize, *range.end() as usize);
        let (first, last) = (start / 64, end / 64);
        let head = u64::MAX << (start % 64);
        let tail = u64::MAX >> (63 - end % 64);
        if first == last {
            f(&mut self.bits[first], head & tail);
        } else {
            f(&mut self.bits[first], head);
            for word in &mut self.bits[first + 1..last] {
                f(word, u64::MAX);
            }
            f(&mut self.bits[last], tail);
        }
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        let span = u64::from(range.end() - range.start()) + 1;
        self.range_cardinality(range) == span
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start() as usize, *range.end() as usize);
        let (first, last) = (start / 64, end / 64);
        let head = u64::MAX << (start % 64);
        let tail = u64::MAX >> (63 - end % 64);
        if first == last {
            return u64::from((self.bits[first] & head & tail).count_ones());
        }
        let mut count = u64::from((self.bits[first] & head).count_ones());
        for word in &self.bits[first + 1..last] {
            count += u64::from(word.count_ones());
        }
        count + u64::from((self.bits[last] & tail).count_ones())
    }

    /// Number of values less than or equal to `value`.
    pub fn rank(&self, value: u16) -> u64 {
        let k = key(value);
        let rank: u64 = self.bits[..k].iter().map(|w| u64::from(w.count_ones())).sum();
        let below = !(u64::MAX << bit(value)) | (1 << bit(value));
        rank + u64::from((self.bits[k] & below).count_ones())
    }

    pub fn select(&self, mut n: u64) -> Option<u16> {
        for (k, word) in self.bits.iter().enumerate() {
            let ones = u64::from(word.count_ones());
            if n < ones {
                return Some((k * 64) as u16 + nth_set_bit(*word, n as u32));
            }
            n -= ones;
        }
        None
    }

    pub fn min(&self) -> Option<u16> {
        self.bits
            .iter()
            .enumerate()
            .find(|(_, &word)| word != 0)
            .map(|(k, word)| (k * 64 + word.trailing_zeros() as usize) as u16)
    }

    pub fn max(&self) -> Option<u16> {
        self.bits
            .iter()
            .enumerate()
            .rev()
            .find(|(_, &word)| word != 0)
            .map(|(k, word)| (k * 64 + 63 - word.leading_zeros() as usize) as u16)
    }

    fn popcount(&self) -> u64 {
        self.bits.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    pub fn union_inplace(&mut self, other: &Self) {
        let mut len = 0;
        for (word, &o) in self.bits.iter_mut().zip(other.bits.iter()) {
            *word |= o;
            len += u64::from(word.count_ones());
        }
        self.len = len;
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let mut bits = Box::new([0u64; BITMAP_LENGTH]);
        let mut len = 0;
        for (dst, (&a, &b)) in bits.iter_mut().zip(self.bits.iter().zip(other.bits.iter())) {
            *dst = a & b;
            len += u64::from(dst.count_ones());
        }
        Self { len, bits }
    }

    pub fn intersection_inplace(&mut self, other: &Self) {
        let mut len = 0;
        for (word, &o) in self.bits.iter_mut().zip(other.bits.iter()) {
            *word &= o;
            len += u64::from(word.count_ones());
        }
        self.len = len;
    }

    pub fn difference_inplace(&mut self, other: &Self) {
        let mut len = 0;
        for (word, &o) in self.bits.iter_mut().zip(other.bits.iter()) {
            *word &= !o;
            len += u64::from(word.count_ones());
        }
        self.len = len;
    }

    pub fn symmetric_difference_inplace(&mut self, other: &Self) {
        let mut len = 0;
        for (word, &o) in self.bits.iter_mut().zip(other.bits.iter()) {
            *word ^= o;
            len += u64::from(word.count_ones());
        }
        self.len = len;
    }

    /// Filter `array` down to the values set in `self`.
    pub fn intersection_array(&self, array: &ArrayStore) -> ArrayStore {
        let mut result = ArrayStore::with_capacity(array.cardinality() as usize);
        for value in array.iter() {
            if self.contains(value) {
                result.push_unchecked(value);
            }
        }
        result
    }

    pub fn to_array(&self) -> ArrayStore {
        let mut result = ArrayStore::with_capacity(self.len as usize);
        for (k, &word) in self.bits.iter().enumerate() {
            let mut w = word;
            while w != 0 {
                result.push_unchecked((k * 64) as u16 + w.trailing_zeros() as u16);
                w &= w - 1;
            }
        }
        result
    }

    pub fn iter(&self) -> BitmapStoreIter<'_> {
        BitmapStoreIter::new(&self.bits, 0)
    }

    pub fn iter_from(&self, value: u16) -> BitmapStoreIter<'_> {
        BitmapStoreIter::new(&self.bits, value)
    }

    pub fn size_in_bytes(&self) -> u64 {
        BITMAP_LENGTH as u64 * 8 + 16
    }
}

#[inline]
fn key(value: u16) -> usize {
    value as usize / 64
}

#[inline]
fn bit(value: u16) -> usize {
    value as usize % 64
}

#[inline]
fn nth_set_bit(mut word: u64, mut n: u32) -> u16 {
    while n > 0 {
        word &= word - 1;
        n -= 1;
    }
    word.trailing_zeros() as u16
}

/// Double-ended scan over the set bits of a bitmap container.
#[derive(Clone)]
pub struct BitmapStoreIter<'a> {
    bits: &'a [u64; BITMAP_LENGTH],
    // Next front bit index, and one past the last back bit index.
    front: u32,
    back: u32,
}

impl<'a> BitmapStoreIter<'a> {
    fn new(bits: &'a [u64; BITMAP_LENGTH], start: u16) -> Self {
        Self {
            bits,
            front: u32::from(start),
            back: 1 << 16,
        }
    }
}

impl Iterator for BitmapStoreIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        while self.front < self.back {
            let word = self.bits[self.front as usize / 64] >> (self.front % 64);
            if word != 0 {
                let found = self.front + word.trailing_zeros();
                if found >= self.back {
                    break;
                }
                self.front = found + 1;
                return Some(found as u16);
            }
            // Skip to the next word boundary.
            self.front = (self.front / 64 + 1) * 64;
        }
        self.front = self.back;
        None
    }
}

impl DoubleEndedIterator for BitmapStoreIter<'_> {
    fn next_back(&mut self) -> Option<u16> {
        while self.back > self.front {
            let last = self.back - 1;
            let word = self.bits[last as usize / 64] << (63 - last % 64);
            if word != 0 {
                let found = last - word.leading_zeros();
                if found < self.front {
                    break;
                }
                self.back = found;
                return Some(found as u16);
            }
            self.back = (last / 64) * 64;
        }
        self.back = self.front;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_tracks_cardinality() {
        let mut store = BitmapStore::new();
        assert!(store.insert(0));
        assert!(store.insert(65535));
        assert!(!store.insert(0));
        assert_eq!(store.cardinality(), 2);
        assert!(store.remove(0));
        assert!(!store.remove(0));
        assert_eq!(store.cardinality(), 1);
    }

    #[test]
    fn range_ops_cover_word_boundaries() {
        let mut store = BitmapStore::new();
        assert_eq!(store.insert_range(60..=130), 71);
        assert!(store.contains(60));
        assert!(store.contains(130));
        assert!(!store.contains(131));
        assert!(store.contains_range(60..=130));
        assert_eq!(store.range_cardinality(0..=63), 4);
        assert_eq!(store.remove_range(64..=127), 64);
        assert_eq!(store.cardinality(), 7);
    }

    #[test]
    fn rank_select_roundtrip() {
        let mut store = BitmapStore::new();
        for v in [3u16, 64, 100, 9000] {
            store.insert(v);
        }
        assert_eq!(store.rank(2), 0);
        assert_eq!(store.rank(3), 1);
        assert_eq!(store.rank(9000), 4);
        for n in 0..4 {
            let v = store.select(n).unwrap();
            assert_eq!(store.rank(v), n + 1);
        }
        assert_eq!(store.select(4), None);
    }

    #[test]
    fn iter_is_double_ended() {
        let mut store = BitmapStore::new();
        for v in [1u16, 63, 64, 1000, 65535] {
            store.insert(v);
        }
        let forward: Vec<u16> = store.iter().collect();
        assert_eq!(forward, vec![1, 63, 64, 1000, 65535]);
        let mut backward: Vec<u16> = store.iter().rev().collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(store.iter_from(64).next(), Some(64));
        assert_eq!(store.iter_from(65).next(), Some(1000));
    }
}
