use std::ops::RangeInclusive;

use super::bitmap::BitmapStore;

/// Maximum cardinality of an array container. Above this the container is
/// converted to a bitmap, which then occupies less memory per element.
pub const ARRAY_LIMIT: u64 = 4096;

/// When one operand of an intersection is at least this many times smaller
/// than the other, galloping (exponential + binary search) beats the linear
/// merge.
const GALLOP_RATIO: usize = 64;

/// Sorted, duplicate-free sequence of 16-bit values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArrayStore {
    vec: Vec<u16>,
}

impl ArrayStore {
    pub fn new() -> Self {
        Self { vec: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vec: Vec::with_capacity(capacity),
        }
    }

    /// Wrap an already sorted, duplicate-free vector.
    pub fn from_sorted(vec: Vec<u16>) -> Self {
        debug_assert!(vec.windows(2).all(|w| w[0] < w[1]));
        Self { vec }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.vec
    }

    #[inline]
    pub fn cardinality(&self) -> u64 {
        self.vec.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.vec.binary_search(&value).is_ok()
    }

    pub fn insert(&mut self, value: u16) -> bool {
        match self.vec.binary_search(&value) {
            Ok(_) => false,
            Err(loc) => {
                self.vec.insert(loc, value);
                true
            }
        }
    }

    /// Append `value`, which must be greater than the current maximum.
    pub fn push_unchecked(&mut self, value: u16) {
        debug_assert!(self.vec.last().map_or(true, |&max| value > max));
        self.vec.push(value);
    }

    pub fn remove(&mut self, value: u16) -> bool {
        match self.vec.binary_search(&value) {
            Ok(loc) => {
                self.vec.remove(loc);
                true
            }
            Err(_) => false,
        }
    }

    /// Insert every value in `range`, returning the number of newly added
    /// values.
    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let lo = self.vec.partition_point(|&v| v < start);
        let hi = self.vec.partition_point(|&v| v <= end);
        let present = (hi - lo) as u64;
        let span = u64::from(end - start) + 1;
        self.vec.splice(lo..hi, start..=end);
        span - present
    }

    /// Remove every value in `range`, returning the number of removed values.
    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let lo = self.vec.partition_point(|&v| v < start);
        let hi = self.vec.partition_point(|&v| v <= end);
        self.vec.drain(lo..hi);
        (hi - lo) as u64
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        let (start, end) = (*range.start(), *range.end());
        let span = u64::from(end - start) + 1;
        self.range_cardinality(range) == span
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        let lo = self.vec.partition_point(|&v| v < *range.start());
        let hi = self.vec.partition_point(|&v| v <= *range.end());
        (hi - lo) as u64
    }

    /// Number of values less than or equal to `value`.
    #[inline]
    pub fn rank(&self, value: u16) -> u64 {
        self.vec.partition_point(|&v| v <= value) as u64
    }

    #[inline]
    pub fn select(&self, n: u64) -> Option<u16> {
        self.vec.get(n as usize).copied()
    }

    #[inline]
    pub fn min(&self) -> Option<u16> {
        self.vec.first().copied()
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        self.vec.last().copied()
    }

    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, u16>> {
        self.vec.iter().copied()
    }

    /// Iterator over values greater than or equal to `value`.
    pub fn iter_from(&self, value: u16) -> std::iter::Copied<std::slice::Iter<'_, u16>> {
        let lo = self.vec.partition_point(|&v| v < value);
        self.vec[lo..].iter().copied()
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut vec = Vec::with_capacity(self.vec.len() + other.vec.len());
        let (mut i, mut j) = (0, 0);
        let (a, b) = (&self.vec, &other.vec);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    vec.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    vec.push(b[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    vec.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        vec.extend_from_slice(&a[i..]);
        vec.extend_from_slice(&b[j..]);
        Self { vec }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let (small, large) = if self.vec.len() <= other.vec.len() {
            (&self.vec, &other.vec)
        } else {
            (&other.vec, &self.vec)
        };
        if small.len() * GALLOP_RATIO < large.len() {
            Self {
                vec: gallop_intersection(small, large),
            }
        } else {
            Self {
                vec: linear_intersection(small, large),
            }
        }
    }

    pub fn difference(&self, other: &Self) -> Self {
        let mut vec = Vec::with_capacity(self.vec.len());
        let (mut i, mut j) = (0, 0);
        let (a, b) = (&self.vec, &other.vec);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    vec.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        vec.extend_from_slice(&a[i..]);
        Self { vec }
    }

    pub fn symmetric_difference(&self, other: &Self) -> Self {
        let mut vec = Vec::with_capacity(self.vec.len() + other.vec.len());
        let (mut i, mut j) = (0, 0);
        let (a, b) = (&self.vec, &other.vec);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    vec.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    vec.push(b[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        vec.extend_from_slice(&a[i..]);
        vec.extend_from_slice(&b[j..]);
        Self { vec }
    }

    pub fn to_bitmap(&self) -> BitmapStore {
        let mut bits = BitmapStore::new();
        for &value in &self.vec {
            bits.insert(value);
        }
        bits
    }

    /// In-memory footprint estimate, used by the size-sorting aggregation
    /// heuristics.
    pub fn size_in_bytes(&self) -> u64 {
        self.vec.len() as u64 * 2 + 16
    }
}

fn linear_intersection(a: &[u16], b: &[u16]) -> Vec<u16> {
    let mut vec = Vec::with_capacity(a.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                vec.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    vec
}

/// Intersection by searching for each value of the small side in the large
/// side, skipping exponentially ahead first. O(min * log(max/min)) comparisons.
fn gallop_intersection(small: &[u16], large: &[u16]) -> Vec<u16> {
    let mut vec = Vec::with_capacity(small.len());
    let mut base = 0;
    for &value in small {
        base = advance_until(large, base, value);
        if base == large.len() {
            break;
        }
        if large[base] == value {
            vec.push(value);
            base += 1;
        }
    }
    vec
}

/// Smallest index `>= pos` whose element is `>= value`, found with an
/// exponential probe followed by a binary search over the probed window.
pub fn advance_until(slice: &[u16], pos: usize, value: u16) -> usize {
    let mut lower = pos;
    if lower >= slice.len() || slice[lower] >= value {
        return lower;
    }
    let mut span = 1;
    while lower + span < slice.len() && slice[lower + span] < value {
        span *= 2;
    }
    let upper = (lower + span).min(slice.len() - 1);
    if slice[upper] < value {
        return slice.len();
    }
    lower += span / 2;
    lower + slice[lower..=upper].partition_point(|&v| v < value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_ordered() {
        let mut store = ArrayStore::new();
        assert!(store.insert(5));
        assert!(store.insert(1));
        assert!(store.insert(3));
        assert!(!store.insert(3));
        assert_eq!(store.as_slice(), &[1, 3, 5]);
        assert!(store.remove(3));
        assert!(!store.remove(3));
        assert_eq!(store.as_slice(), &[1, 5]);
    }

    #[test]
    fn insert_range_splices() {
        let mut store = ArrayStore::from_sorted(vec![2, 5, 9]);
        assert_eq!(store.insert_range(4..=7), 3);
        assert_eq!(store.as_slice(), &[2, 4, 5, 6, 7, 9]);
        assert_eq!(store.insert_range(4..=7), 0);
    }

    #[test]
    fn remove_range_drains() {
        let mut store = ArrayStore::from_sorted(vec![2, 4, 5, 6, 9]);
        assert_eq!(store.remove_range(4..=6), 3);
        assert_eq!(store.as_slice(), &[2, 9]);
    }

    #[test]
    fn rank_select_agree() {
        let store = ArrayStore::from_sorted(vec![10, 20, 30]);
        assert_eq!(store.rank(9), 0);
        assert_eq!(store.rank(10), 1);
        assert_eq!(store.rank(25), 2);
        assert_eq!(store.select(0), Some(10));
        assert_eq!(store.select(2), Some(30));
        assert_eq!(store.select(3), None);
    }

    #[test]
    fn gallop_matches_linear() {
        let small: Vec<u16> = (0..100).map(|i| i * 501).collect();
        let large: Vec<u16> = (0..50000).collect();
        let a = ArrayStore::from_sorted(small.clone());
        let b = ArrayStore::from_sorted(large.clone());
        let expected = linear_intersection(&small, &large);
        assert_eq!(a.intersection(&b).as_slice(), expected.as_slice());
        assert_eq!(b.intersection(&a).as_slice(), expected.as_slice());
    }

    #[test]
    fn advance_until_past_end() {
        let slice = [1u16, 4, 9];
        assert_eq!(advance_until(&slice, 0, 0), 0);
        assert_eq!(advance_until(&slice, 0, 5), 2);
        assert_eq!(advance_until(&slice, 0, 10), 3);
        assert_eq!(advance_until(&slice, 2, 9), 2);
    }
}
