//! The three interchangeable physical encodings of one 65536-value chunk.
//!
//! A [`Container`] is a tagged union over the 16-bit value domain; which
//! variant holds the data is an implementation detail, only the set content
//! is meaningful. Mutations keep the array/bitmap size threshold canonical
//! (an array never exceeds [`ARRAY_LIMIT`] values, a bitmap never holds
//! fewer); run encoding is chosen only by explicit
//! [`run_optimize`](Container::run_optimize).

mod array;
mod bitmap;
mod run;

pub use array::{advance_until, ArrayStore, ARRAY_LIMIT};
pub use bitmap::{BitmapStore, BitmapStoreIter, BITMAP_LENGTH};
pub use run::{array_num_runs, bitmap_num_runs, Rle, RunStore, RunStoreIter};

use std::ops::RangeInclusive;

#[derive(Clone, Debug)]
pub enum Container {
    Array(ArrayStore),
    Bitmap(BitmapStore),
    Run(RunStore),
}

use Container::{Array, Bitmap, Run};

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Array(ArrayStore::new())
    }

    /// Container holding exactly the values of `range`, in the canonical
    /// (threshold-respecting) representation.
    pub fn from_range(range: RangeInclusive<u16>) -> Self {
        let span = u64::from(range.end() - range.start()) + 1;
        if span > ARRAY_LIMIT {
            let mut bits = BitmapStore::new();
            bits.insert_range(range);
            Bitmap(bits)
        } else {
            let mut array = ArrayStore::with_capacity(span as usize);
            for value in range {
                array.push_unchecked(value);
            }
            Array(array)
        }
    }

    pub fn cardinality(&self) -> u64 {
        match self {
            Array(a) => a.cardinality(),
            Bitmap(b) => b.cardinality(),
            Run(r) => r.cardinality(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cardinality() == 0
    }

    pub fn contains(&self, value: u16) -> bool {
        match self {
            Array(a) => a.contains(value),
            Bitmap(b) => b.contains(value),
            Run(r) => r.contains(value),
        }
    }

    pub fn min(&self) -> Option<u16> {
        match self {
            Array(a) => a.min(),
            Bitmap(b) => b.min(),
            Run(r) => r.min(),
        }
    }

    pub fn max(&self) -> Option<u16> {
        match self {
            Array(a) => a.max(),
            Bitmap(b) => b.max(),
            Run(r) => r.max(),
        }
    }

    /// Number of values less than or equal to `value`.
    pub fn rank(&self, value: u16) -> u64 {
        match self {
            Array(a) => a.rank(value),
            Bitmap(b) => b.rank(value),
            Run(r) => r.rank(value),
        }
    }

    /// The n-th smallest value (0-based).
    pub fn select(&self, n: u64) -> Option<u16> {
        match self {
            Array(a) => a.select(n),
            Bitmap(b) => b.select(n),
            Run(r) => r.select(n),
        }
    }

    pub fn insert(&mut self, value: u16) -> bool {
        match self {
            Array(a) => {
                let added = a.insert(value);
                if a.cardinality() > ARRAY_LIMIT {
                    *self = Bitmap(a.to_bitmap());
                }
                added
            }
            Bitmap(b) => b.insert(value),
            Run(r) => r.insert(value),
        }
    }

    pub fn remove(&mut self, value: u16) -> bool {
        match self {
            Array(a) => a.remove(value),
            Bitmap(b) => {
                let removed = b.remove(value);
                if b.cardinality() <= ARRAY_LIMIT {
                    *self = Array(b.to_array());
                }
                removed
            }
            Run(r) => r.remove(value),
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        match self {
            Array(a) => {
                let added = a.insert_range(range);
                if a.cardinality() > ARRAY_LIMIT {
                    *self = Bitmap(a.to_bitmap());
                }
                added
            }
            Bitmap(b) => b.insert_range(range),
            Run(r) => r.insert_range(range),
        }
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        match self {
            Array(a) => a.remove_range(range),
            Bitmap(b) => {
                let removed = b.remove_range(range);
                if b.cardinality() <= ARRAY_LIMIT {
                    *self = Array(b.to_array());
                }
                removed
            }
            Run(r) => r.remove_range(range),
        }
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        match self {
            Array(a) => a.contains_range(range),
            Bitmap(b) => b.contains_range(range),
            Run(r) => r.contains_range(range),
        }
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        match self {
            Array(a) => a.range_cardinality(range),
            Bitmap(b) => b.range_cardinality(range),
            Run(r) => r.range_cardinality(range),
        }
    }

    pub fn and(&self, other: &Self) -> Self {
        match (self, other) {
            (Array(a), Array(b)) => Array(a.intersection(b)),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => Array(b.intersection_array(a)),
            (Bitmap(a), Bitmap(b)) => from_bitmap_auto(a.intersection(b)),
            (Array(a), Run(r)) | (Run(r), Array(a)) => Array(intersect_array_run(a, r)),
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => {
                let mut bits = b.clone();
                for gap in r.not_range(0, u16::MAX).runs() {
                    bits.remove_range(gap.start..=gap.end());
                }
                from_bitmap_auto(bits)
            }
            (Run(a), Run(b)) => from_run_auto(a.intersect(b)),
        }
    }

    pub fn or(&self, other: &Self) -> Self {
        match (self, other) {
            (Array(a), Array(b)) => from_array_auto(a.union(b)),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => {
                let mut bits = b.clone();
                for value in a.iter() {
                    bits.insert(value);
                }
                Bitmap(bits)
            }
            (Bitmap(a), Bitmap(b)) => {
                let mut bits = a.clone();
                bits.union_inplace(b);
                Bitmap(bits)
            }
            (Array(a), Run(r)) | (Run(r), Array(a)) => {
                let mut runs = r.clone();
                for value in a.iter() {
                    runs.insert(value);
                }
                from_run_auto(runs)
            }
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => {
                let mut bits = b.clone();
                for run in r.runs() {
                    bits.insert_range(run.start..=run.end());
                }
                Bitmap(bits)
            }
            (Run(a), Run(b)) => from_run_auto(a.union(b)),
        }
    }

    pub fn xor(&self, other: &Self) -> Self {
        match (self, other) {
            (Array(a), Array(b)) => from_array_auto(a.symmetric_difference(b)),
            (Array(a), Bitmap(b)) | (Bitmap(b), Array(a)) => {
                let mut bits = b.clone();
                for value in a.iter() {
                    if !bits.remove(value) {
                        bits.insert(value);
                    }
                }
                from_bitmap_auto(bits)
            }
            (Bitmap(a), Bitmap(b)) => {
                let mut bits = a.clone();
                bits.symmetric_difference_inplace(b);
                from_bitmap_auto(bits)
            }
            (Array(a), Run(r)) | (Run(r), Array(a)) => {
                let mut runs = r.clone();
                for value in a.iter() {
                    if !runs.remove(value) {
                        runs.insert(value);
                    }
                }
                from_run_auto(runs)
            }
            (Bitmap(b), Run(r)) | (Run(r), Bitmap(b)) => {
                let mut bits = b.clone();
                for run in r.runs() {
                    bits.flip_range(run.start..=run.end());
                }
                from_bitmap_auto(bits)
            }
            (Run(a), Run(b)) => from_run_auto(a.symmetric_difference(b)),
        }
    }

    /// Values of `self` not present in `other`.
    pub fn and_not(&self, other: &Self) -> Self {
        match (self, other) {
            (Array(a), Array(b)) => Array(a.difference(b)),
            (Array(a), Bitmap(b)) => {
                let mut out = ArrayStore::with_capacity(a.cardinality() as usize);
                for value in a.iter() {
                    if !b.contains(value) {
                        out.push_unchecked(value);
                    }
                }
                Array(out)
            }
            (Array(a), Run(r)) => {
                let mut out = ArrayStore::with_capacity(a.cardinality() as usize);
                for value in a.iter() {
                    if !r.contains(value) {
                        out.push_unchecked(value);
                    }
                }
                Array(out)
            }
            (Bitmap(b), Array(a)) => {
                let mut bits = b.clone();
                for value in a.iter() {
                    bits.remove(value);
                }
                from_bitmap_auto(bits)
            }
            (Bitmap(a), Bitmap(b)) => {
                let mut bits = a.clone();
                bits.difference_inplace(b);
                from_bitmap_auto(bits)
            }
            (Bitmap(b), Run(r)) => {
                let mut bits = b.clone();
                for run in r.runs() {
                    bits.remove_range(run.start..=run.end());
                }
                from_bitmap_auto(bits)
            }
            (Run(r), Array(a)) => {
                let mut runs = r.clone();
                for value in a.iter() {
                    runs.remove(value);
                }
                from_run_auto(runs)
            }
            (Run(r), Bitmap(b)) => {
                let mut bits = r.to_bitmap();
                bits.difference_inplace(b);
                from_bitmap_auto(bits)
            }
            (Run(a), Run(b)) => from_run_auto(a.and_not(b)),
        }
    }

    pub fn and_inplace(&mut self, other: &Self) {
        match (std::mem::take(self), other) {
            (Bitmap(mut a), Bitmap(b)) => {
                a.intersection_inplace(b);
                *self = from_bitmap_auto(a);
            }
            (this, _) => *self = this.and(other),
        }
    }

    pub fn or_inplace(&mut self, other: &Self) {
        match (std::mem::take(self), other) {
            (Bitmap(mut a), Bitmap(b)) => {
                a.union_inplace(b);
                *self = Bitmap(a);
            }
            (Bitmap(mut a), Array(b)) => {
                for value in b.iter() {
                    a.insert(value);
                }
                *self = Bitmap(a);
            }
            (this, _) => *self = this.or(other),
        }
    }

    pub fn xor_inplace(&mut self, other: &Self) {
        match (std::mem::take(self), other) {
            (Bitmap(mut a), Bitmap(b)) => {
                a.symmetric_difference_inplace(b);
                *self = from_bitmap_auto(a);
            }
            (this, _) => *self = this.xor(other),
        }
    }

    pub fn and_not_inplace(&mut self, other: &Self) {
        match (std::mem::take(self), other) {
            (Bitmap(mut a), Bitmap(b)) => {
                a.difference_inplace(b);
                *self = from_bitmap_auto(a);
            }
            (this, _) => *self = this.and_not(other),
        }
    }

    /// Flip every value of `range`, leaving the rest of the container
    /// untouched.
    pub fn not(&self, range: RangeInclusive<u16>) -> Self {
        match self {
            Array(a) => {
                let mut bits = a.to_bitmap();
                bits.flip_range(range);
                from_bitmap_auto(bits)
            }
            Bitmap(b) => {
                let mut bits = b.clone();
                bits.flip_range(range);
                from_bitmap_auto(bits)
            }
            Run(r) => from_run_auto(r.not_range(*range.start(), *range.end())),
        }
    }

    /// Number of intervals the content spans, whatever the representation.
    pub fn num_runs(&self) -> u64 {
        match self {
            Array(a) => array_num_runs(a),
            Bitmap(b) => bitmap_num_runs(b),
            Run(r) => r.num_runs() as u64,
        }
    }

    /// Recompute the smallest of the three representations for the current
    /// content. Returns true if the representation changed.
    pub fn to_efficient(&mut self) -> bool {
        let card = self.cardinality();
        let run_size = 2 + 4 * self.num_runs();
        let array_size = 2 * card;
        let bitmap_size = 8 * BITMAP_LENGTH as u64;
        let run_wins = run_size < array_size.min(bitmap_size);
        match self {
            Run(_) if run_wins => false,
            Run(r) => {
                *self = if card <= ARRAY_LIMIT {
                    Array(r.to_array())
                } else {
                    Bitmap(r.to_bitmap())
                };
                true
            }
            Array(a) if run_wins => {
                *self = Run(RunStore::from_sorted_values(a.iter()));
                true
            }
            Bitmap(b) if run_wins => {
                *self = Run(RunStore::from_sorted_values(b.iter()));
                true
            }
            _ => false,
        }
    }

    /// Convert a run container back to array or bitmap. Returns true if a
    /// change was applied.
    pub fn remove_run_compression(&mut self) -> bool {
        match self {
            Run(r) => {
                *self = if r.cardinality() <= ARRAY_LIMIT {
                    Array(r.to_array())
                } else {
                    Bitmap(r.to_bitmap())
                };
                true
            }
            _ => false,
        }
    }

    /// In-memory footprint estimate used by the size-sorting aggregation
    /// heuristics.
    pub fn size_in_bytes(&self) -> u64 {
        match self {
            Array(a) => a.size_in_bytes(),
            Bitmap(b) => b.size_in_bytes(),
            Run(r) => r.size_in_bytes(),
        }
    }

    /// Serialized payload size in the portable format.
    pub fn portable_len(&self) -> usize {
        match self {
            Array(a) => 2 * a.cardinality() as usize,
            Bitmap(_) => 8 * BITMAP_LENGTH,
            Run(r) => 2 + 4 * r.num_runs(),
        }
    }

    /// Sum of all values, for statistics.
    pub fn sum_values(&self) -> u64 {
        match self {
            Array(a) => a.iter().map(u64::from).sum(),
            Bitmap(b) => b.iter().map(u64::from).sum(),
            Run(r) => r
                .runs()
                .iter()
                .map(|run| {
                    let n = run.run_len();
                    n * u64::from(run.start) + n * (n - 1) / 2
                })
                .sum(),
        }
    }

    pub fn iter(&self) -> ContainerIter<'_> {
        match self {
            Array(a) => ContainerIter::Array(a.iter()),
            Bitmap(b) => ContainerIter::Bitmap(b.iter()),
            Run(r) => ContainerIter::Run(r.iter()),
        }
    }

    /// Iterator over values greater than or equal to `value`.
    pub fn iter_from(&self, value: u16) -> ContainerIter<'_> {
        match self {
            Array(a) => ContainerIter::Array(a.iter_from(value)),
            Bitmap(b) => ContainerIter::Bitmap(b.iter_from(value)),
            Run(r) => ContainerIter::Run(r.iter_from(value)),
        }
    }

    /// Structural well-formedness check, used by
    /// [`Bitmap::validate`](crate::Bitmap::validate).
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        match self {
            Array(a) => {
                if !a.as_slice().windows(2).all(|w| w[0] < w[1]) {
                    return Err("array container not strictly ascending");
                }
                if a.cardinality() > ARRAY_LIMIT {
                    return Err("array container above the size threshold");
                }
            }
            Bitmap(b) => {
                if b.cardinality() <= ARRAY_LIMIT {
                    return Err("bitmap container at or below the array threshold");
                }
                let counted: u64 = b.as_words().iter().map(|w| u64::from(w.count_ones())).sum();
                if counted != b.cardinality() {
                    return Err("bitmap container cardinality cache out of sync");
                }
            }
            Run(r) => {
                if r.runs().is_empty() && r.cardinality() != 0 {
                    return Err("run container cardinality without runs");
                }
                let ordered = r
                    .runs()
                    .windows(2)
                    .all(|w| u32::from(w[0].end()) + 1 < u32::from(w[1].start));
                if !ordered {
                    return Err("run container intervals overlap or touch");
                }
                let counted: u64 = r.runs().iter().map(|run| run.run_len()).sum();
                if counted != r.cardinality() {
                    return Err("run container cardinality cache out of sync");
                }
            }
        }
        Ok(())
    }
}

/// Representation-independent equality: same content, any encoding.
impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(a), Array(b)) => a == b,
            (Bitmap(a), Bitmap(b)) => a.cardinality() == b.cardinality() && a.as_words() == b.as_words(),
            (Run(a), Run(b)) => a == b,
            _ => {
                self.cardinality() == other.cardinality()
                    && self.iter().zip(other.iter()).all(|(a, b)| a == b)
            }
        }
    }
}

impl Eq for Container {}

fn from_array_auto(array: ArrayStore) -> Container {
    if array.cardinality() > ARRAY_LIMIT {
        Bitmap(array.to_bitmap())
    } else {
        Array(array)
    }
}

fn from_bitmap_auto(bits: BitmapStore) -> Container {
    if bits.cardinality() <= ARRAY_LIMIT {
        Array(bits.to_array())
    } else {
        Bitmap(bits)
    }
}

/// Keep a run-to-run result as a run only while that stays the smallest
/// representation.
fn from_run_auto(runs: RunStore) -> Container {
    let mut container = Run(runs);
    container.to_efficient();
    container
}

fn intersect_array_run(array: &ArrayStore, runs: &RunStore) -> ArrayStore {
    let mut out = ArrayStore::with_capacity(array.cardinality() as usize);
    for value in array.iter() {
        if runs.contains(value) {
            out.push_unchecked(value);
        }
    }
    out
}

#[derive(Clone)]
pub enum ContainerIter<'a> {
    Array(std::iter::Copied<std::slice::Iter<'a, u16>>),
    Bitmap(BitmapStoreIter<'a>),
    Run(RunStoreIter<'a>),
}

impl Iterator for ContainerIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(it) => it.next(),
            ContainerIter::Bitmap(it) => it.next(),
            ContainerIter::Run(it) => it.next(),
        }
    }
}

impl DoubleEndedIterator for ContainerIter<'_> {
    fn next_back(&mut self) -> Option<u16> {
        match self {
            ContainerIter::Array(it) => it.next_back(),
            ContainerIter::Bitmap(it) => it.next_back(),
            ContainerIter::Run(it) => it.next_back(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of(values: &[u16]) -> Container {
        let mut c = Container::new();
        for &v in values {
            c.insert(v);
        }
        c
    }

    /// Build the same content in all three representations.
    fn representations(values: &[u16]) -> Vec<Container> {
        let array = of(values);
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut bits = BitmapStore::new();
        for &v in &sorted {
            bits.insert(v);
        }
        let runs = RunStore::from_sorted_values(sorted.into_iter());
        vec![array, Bitmap(bits), Run(runs)]
    }

    #[test]
    fn array_grows_into_bitmap() {
        let mut c = Container::new();
        for v in 0..=ARRAY_LIMIT as u16 {
            c.insert(v);
        }
        assert!(matches!(c, Bitmap(_)));
        assert_eq!(c.cardinality(), ARRAY_LIMIT + 1);
        c.remove(0);
        assert!(matches!(c, Array(_)));
        assert_eq!(c.cardinality(), ARRAY_LIMIT);
    }

    #[test]
    fn representation_transparent_ops() {
        let left = representations(&[1, 2, 3, 1000, 1001, 40000]);
        let right = representations(&[2, 1001, 1002, 50000]);
        let expect_and = of(&[2, 1001]);
        let expect_or = of(&[1, 2, 3, 1000, 1001, 1002, 40000, 50000]);
        let expect_xor = of(&[1, 3, 1000, 1002, 40000, 50000]);
        let expect_and_not = of(&[1, 3, 1000, 40000]);
        for a in &left {
            for b in &right {
                assert_eq!(a.and(b), expect_and);
                assert_eq!(a.or(b), expect_or);
                assert_eq!(a.xor(b), expect_xor);
                assert_eq!(a.and_not(b), expect_and_not);
                let mut c = a.clone();
                c.and_inplace(b);
                assert_eq!(c, expect_and);
                let mut c = a.clone();
                c.or_inplace(b);
                assert_eq!(c, expect_or);
                let mut c = a.clone();
                c.xor_inplace(b);
                assert_eq!(c, expect_xor);
                let mut c = a.clone();
                c.and_not_inplace(b);
                assert_eq!(c, expect_and_not);
            }
        }
    }

    #[test]
    fn cross_representation_equality() {
        for c in representations(&[5, 6, 7, 300, 40000]) {
            for d in representations(&[5, 6, 7, 300, 40000]) {
                assert_eq!(c, d);
            }
            for d in representations(&[5, 6, 7, 300]) {
                assert_ne!(c, d);
            }
        }
    }

    #[test]
    fn not_range_flips_subrange() {
        let c = of(&[4]);
        let flipped = c.not(1..=2);
        assert_eq!(flipped, of(&[1, 2, 4]));
        let back = flipped.not(1..=2);
        assert_eq!(back, c);
    }

    #[test]
    fn to_efficient_prefers_runs_for_dense_ranges() {
        let mut c = Container::from_range(100..=60000);
        assert!(matches!(c, Bitmap(_)));
        assert!(c.to_efficient());
        assert!(matches!(c, Run(_)));
        assert_eq!(c.cardinality(), 59901);
        assert!(!c.to_efficient());
        assert!(c.remove_run_compression());
        assert!(matches!(c, Bitmap(_)));
    }

    #[test]
    fn sparse_content_stays_array() {
        let mut c = of(&[1, 100, 5000, 20000]);
        assert!(!c.to_efficient());
        assert!(matches!(c, Array(_)));
    }

    #[test]
    fn rank_select_dispatch() {
        for c in representations(&[10, 11, 12, 500]) {
            assert_eq!(c.rank(9), 0);
            assert_eq!(c.rank(11), 2);
            assert_eq!(c.rank(60000), 4);
            assert_eq!(c.select(0), Some(10));
            assert_eq!(c.select(3), Some(500));
            assert_eq!(c.select(4), None);
        }
    }
}
