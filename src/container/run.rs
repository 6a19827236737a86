use std::ops::RangeInclusive;

use super::array::ArrayStore;
use super::bitmap::{BitmapStore, BITMAP_LENGTH};

/// One interval of the run container: the closed value range
/// `[start, start + len]`, matching the portable format's (start, length)
/// pairs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rle {
    pub start: u16,
    pub len: u16,
}

impl Rle {
    #[inline]
    pub fn new(start: u16, end: u16) -> Self {
        debug_assert!(start <= end);
        Self {
            start,
            len: end - start,
        }
    }

    /// Last value covered by the interval.
    #[inline]
    pub fn end(self) -> u16 {
        self.start + self.len
    }

    #[inline]
    pub fn run_len(self) -> u64 {
        u64::from(self.len) + 1
    }
}

/// Ascending, non-overlapping, non-adjacent sequence of intervals plus the
/// cardinality, maintained on every edit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStore {
    runs: Vec<Rle>,
    card: u64,
}

/// Outcome of the interval binary search: every other run operation is built
/// on this primitive.
///
/// `Err(Some(i))` means the value is not covered and `i` is the index of the
/// interval strictly before it; `Err(None)` means the value precedes every
/// interval (including the empty-store case).
type RunSearch = Result<usize, Option<usize>>;

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already valid interval list.
    pub fn from_runs(runs: Vec<Rle>) -> Self {
        debug_assert!(runs
            .windows(2)
            .all(|w| u32::from(w[0].end()) + 1 < u32::from(w[1].start)));
        let card = runs.iter().map(|r| r.run_len()).sum();
        Self { runs, card }
    }

    pub fn from_sorted_values(values: impl Iterator<Item = u16>) -> Self {
        let mut store = Self::new();
        for value in values {
            match store.runs.last_mut() {
                Some(last) if u32::from(last.end()) + 1 == u32::from(value) => last.len += 1,
                _ => store.runs.push(Rle { start: value, len: 0 }),
            }
            store.card += 1;
        }
        store
    }

    #[inline]
    pub fn runs(&self) -> &[Rle] {
        &self.runs
    }

    #[inline]
    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    #[inline]
    pub fn cardinality(&self) -> u64 {
        self.card
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Whether the store covers the whole 16-bit domain.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.runs.len() == 1 && self.runs[0].start == 0 && self.runs[0].len == u16::MAX
    }

    fn search(&self, value: u16) -> RunSearch {
        let i = self.runs.partition_point(|r| r.start <= value);
        if i == 0 {
            return Err(None);
        }
        if value <= self.runs[i - 1].end() {
            Ok(i - 1)
        } else {
            Err(Some(i - 1))
        }
    }

    #[inline]
    pub fn contains(&self, value: u16) -> bool {
        self.search(value).is_ok()
    }

    pub fn insert(&mut self, value: u16) -> bool {
        match self.search(value) {
            Ok(_) => false,
            Err(None) => {
                match self.runs.first_mut() {
                    Some(first) if u32::from(value) + 1 == u32::from(first.start) => {
                        first.start = value;
                        first.len += 1;
                    }
                    _ => self.runs.insert(0, Rle { start: value, len: 0 }),
                }
                self.card += 1;
                true
            }
            Err(Some(i)) => {
                let follows_prev = u32::from(self.runs[i].end()) + 1 == u32::from(value);
                let precedes_next = self
                    .runs
                    .get(i + 1)
                    .map_or(false, |next| u32::from(value) + 1 == u32::from(next.start));
                match (follows_prev, precedes_next) {
                    (true, true) => {
                        // Fills the gap between two runs exactly: merge them.
                        self.runs[i].len += self.runs[i + 1].len + 2;
                        self.runs.remove(i + 1);
                    }
                    (true, false) => self.runs[i].len += 1,
                    (false, true) => {
                        self.runs[i + 1].start = value;
                        self.runs[i + 1].len += 1;
                    }
                    (false, false) => self.runs.insert(i + 1, Rle { start: value, len: 0 }),
                }
                self.card += 1;
                true
            }
        }
    }

    pub fn remove(&mut self, value: u16) -> bool {
        let Ok(i) = self.search(value) else {
            return false;
        };
        let run = self.runs[i];
        if run.len == 0 {
            self.runs.remove(i);
        } else if value == run.start {
            self.runs[i] = Rle::new(value + 1, run.end());
        } else if value == run.end() {
            self.runs[i].len -= 1;
        } else {
            // Interior removal splits the interval in two.
            self.runs[i] = Rle::new(run.start, value - 1);
            self.runs.insert(i + 1, Rle::new(value + 1, run.end()));
        }
        self.card -= 1;
        true
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let span = u64::from(end - start) + 1;
        let present = self.remove_range(start..=end);
        // After the overlap is cleared, a single merged interval goes in.
        let i = self.runs.partition_point(|r| r.start < start);
        let mut new = Rle::new(start, end);
        if let Some(next) = self.runs.get(i) {
            if u32::from(end) + 1 == u32::from(next.start) {
                new = Rle::new(start, next.end());
                self.runs.remove(i);
            }
        }
        if i > 0 && u32::from(self.runs[i - 1].end()) + 1 == u32::from(start) {
            self.runs[i - 1] = Rle::new(self.runs[i - 1].start, new.end());
        } else {
            self.runs.insert(i, new);
        }
        self.card += span;
        span - present
    }

    /// Remove every value in `range`, the four-case interval subtraction:
    /// both bounds inside one run split it, aligned bounds shrink or drop
    /// runs in place.
    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let mut removed = 0u64;
        let mut i = match self.search(start) {
            Ok(i) => i,
            Err(Some(i)) => i + 1,
            Err(None) => 0,
        };
        while i < self.runs.len() && self.runs[i].start <= end {
            let run = self.runs[i];
            let (rstart, rend) = (run.start, run.end());
            if rstart < start && rend > end {
                // Deletion interior to one run: shrink it and insert the
                // surviving right piece.
                self.runs[i] = Rle::new(rstart, start - 1);
                self.runs.insert(i + 1, Rle::new(end + 1, rend));
                removed += u64::from(end - start) + 1;
                break;
            } else if rstart < start {
                // Right part of the run dies.
                removed += u64::from(rend - start) + 1;
                self.runs[i] = Rle::new(rstart, start - 1);
                i += 1;
            } else if rend > end {
                // Left part of the run dies.
                removed += u64::from(end - rstart) + 1;
                self.runs[i] = Rle::new(end + 1, rend);
                break;
            } else {
                removed += run.run_len();
                self.runs.remove(i);
            }
        }
        self.card -= removed;
        removed
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        // A covering interval must be a single run, runs being non-adjacent.
        match self.search(*range.start()) {
            Ok(i) => self.runs[i].end() >= *range.end(),
            Err(_) => false,
        }
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let below_start = if start == 0 { 0 } else { self.rank(start - 1) };
        self.rank(end) - below_start
    }

    /// Number of values less than or equal to `value`.
    pub fn rank(&self, value: u16) -> u64 {
        let i = self.runs.partition_point(|r| r.start <= value);
        if i == 0 {
            return 0;
        }
        let pred: u64 = self.runs[..i - 1].iter().map(|r| r.run_len()).sum();
        let run = self.runs[i - 1];
        pred + u64::from(value.min(run.end()) - run.start) + 1
    }

    pub fn select(&self, mut n: u64) -> Option<u16> {
        for run in &self.runs {
            if n < run.run_len() {
                return Some(run.start + n as u16);
            }
            n -= run.run_len();
        }
        None
    }

    #[inline]
    pub fn min(&self) -> Option<u16> {
        self.runs.first().map(|r| r.start)
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        self.runs.last().map(|r| r.end())
    }

    /// Linear two-pointer union keeping one pending merged interval; runs
    /// subsumed by the pending interval are skipped with a binary search
    /// rather than one at a time.
    pub fn union(&self, other: &Self) -> Self {
        let (a, b) = (&self.runs, &other.runs);
        let mut out: Vec<Rle> = Vec::with_capacity(a.len() + b.len());
        let mut pending: Option<Rle> = None;
        let (mut i, mut j) = (0, 0);
        while i < a.len() || j < b.len() {
            let next = if j >= b.len() || (i < a.len() && a[i].start <= b[j].start) {
                let r = a[i];
                i += 1;
                r
            } else {
                let r = b[j];
                j += 1;
                r
            };
            match pending {
                None => pending = Some(next),
                Some(p) if u32::from(next.start) <= u32::from(p.end()) + 1 => {
                    let merged = Rle::new(p.start, p.end().max(next.end()));
                    // Skip whole intervals the merged one subsumes; interval
                    // ends are ascending, so a binary search applies.
                    i += a[i..].partition_point(|r| r.end() <= merged.end());
                    j += b[j..].partition_point(|r| r.end() <= merged.end());
                    pending = Some(merged);
                }
                Some(p) => {
                    out.push(p);
                    pending = Some(next);
                }
            }
        }
        out.extend(pending);
        Self::from_runs(out)
    }

    /// Two-pointer intersection; an interval only partially consumed keeps
    /// its pointer and catches secondary overlaps through the max() of the
    /// advanced starts.
    pub fn intersect(&self, other: &Self) -> Self {
        let (a, b) = (&self.runs, &other.runs);
        let mut out: Vec<Rle> = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (astart, aend) = (a[i].start, a[i].end());
            let (bstart, bend) = (b[j].start, b[j].end());
            if aend < bstart {
                i += 1;
            } else if bend < astart {
                j += 1;
            } else {
                out.push(Rle::new(astart.max(bstart), aend.min(bend)));
                if aend == bend {
                    i += 1;
                    j += 1;
                } else if aend < bend {
                    i += 1;
                } else {
                    j += 1;
                }
            }
        }
        Self::from_runs(out)
    }

    /// Difference of two run lists in a single forward sweep: emit the part
    /// of the current A interval before the current B interval, advance
    /// whichever ends first, and keep a partially surviving A start without
    /// emitting yet.
    pub fn and_not(&self, other: &Self) -> Self {
        let (a, b) = (&self.runs, &other.runs);
        let mut out: Vec<Rle> = Vec::new();
        let (mut i, mut j) = (0, 0);
        if a.is_empty() {
            return Self::new();
        }
        let (mut astart, mut aend) = (u32::from(a[0].start), u32::from(a[0].end()));
        while i < a.len() && j < b.len() {
            let (bstart, bend) = (u32::from(b[j].start), u32::from(b[j].end()));
            if bend < astart {
                j += 1;
            } else if bstart > aend {
                out.push(Rle::new(astart as u16, aend as u16));
                i += 1;
                if i < a.len() {
                    astart = u32::from(a[i].start);
                    aend = u32::from(a[i].end());
                }
            } else {
                if astart < bstart {
                    out.push(Rle::new(astart as u16, (bstart - 1) as u16));
                }
                if bend < aend {
                    astart = bend + 1;
                    j += 1;
                } else {
                    i += 1;
                    if i < a.len() {
                        astart = u32::from(a[i].start);
                        aend = u32::from(a[i].end());
                    }
                }
            }
        }
        if i < a.len() {
            out.push(Rle::new(astart as u16, aend as u16));
            out.extend_from_slice(&a[i + 1..]);
        }
        Self::from_runs(out)
    }

    pub fn symmetric_difference(&self, other: &Self) -> Self {
        let union = self.union(other);
        let both = self.intersect(other);
        union.and_not(&both)
    }

    /// Complement within `[lo, hi]`: values outside the range are untouched,
    /// the n intervals inside become at most n+1 gap intervals.
    pub fn not_range(&self, lo: u16, hi: u16) -> Self {
        let mut out: Vec<Rle> = Vec::with_capacity(self.runs.len() + 1);
        let mut cursor = u32::from(lo);
        for run in &self.runs {
            let (rstart, rend) = (u32::from(run.start), u32::from(run.end()));
            if rend < u32::from(lo) {
                push_merged(&mut out, rstart, rend);
                continue;
            }
            if rstart > u32::from(hi) {
                if cursor <= u32::from(hi) {
                    push_merged(&mut out, cursor, u32::from(hi));
                    cursor = u32::from(hi) + 1;
                }
                push_merged(&mut out, rstart, rend);
                continue;
            }
            if rstart < u32::from(lo) {
                push_merged(&mut out, rstart, u32::from(lo) - 1);
            }
            if cursor < rstart {
                push_merged(&mut out, cursor, rstart - 1);
            }
            cursor = rend + 1;
            if rend > u32::from(hi) {
                push_merged(&mut out, u32::from(hi) + 1, rend);
            }
        }
        if cursor <= u32::from(hi) {
            push_merged(&mut out, cursor, u32::from(hi));
        }
        Self::from_runs(out)
    }

    pub fn to_bitmap(&self) -> BitmapStore {
        let mut bits = BitmapStore::new();
        for run in &self.runs {
            bits.insert_range(run.start..=run.end());
        }
        bits
    }

    pub fn to_array(&self) -> ArrayStore {
        let mut array = ArrayStore::with_capacity(self.card as usize);
        for run in &self.runs {
            for value in run.start..=run.end() {
                array.push_unchecked(value);
            }
        }
        array
    }

    pub fn iter(&self) -> RunStoreIter<'_> {
        RunStoreIter::new(&self.runs)
    }

    pub fn iter_from(&self, value: u16) -> RunStoreIter<'_> {
        let mut iter = self.iter();
        match self.search(value) {
            Ok(i) => {
                iter.front_run = i;
                iter.front_offset = u64::from(value - self.runs[i].start);
            }
            Err(Some(i)) => {
                iter.front_run = i + 1;
            }
            Err(None) => {}
        }
        iter
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.runs.len() as u64 * 4 + 24
    }
}

fn push_merged(out: &mut Vec<Rle>, start: u32, end: u32) {
    match out.last_mut() {
        Some(last) if u32::from(last.end()) + 1 == start => {
            *last = Rle::new(last.start, end as u16)
        }
        _ => out.push(Rle::new(start as u16, end as u16)),
    }
}

/// Number of runs an array container would need.
pub fn array_num_runs(array: &ArrayStore) -> u64 {
    let slice = array.as_slice();
    let breaks = slice.windows(2).filter(|w| w[1] - w[0] > 1).count() as u64;
    if slice.is_empty() {
        0
    } else {
        breaks + 1
    }
}

/// Number of runs a bitmap container holds, counted word-parallel: a run
/// starts at every set bit whose predecessor is clear.
pub fn bitmap_num_runs(bits: &BitmapStore) -> u64 {
    let mut runs = 0u64;
    let mut carry = 0u64;
    for &word in bits.as_words().iter().take(BITMAP_LENGTH) {
        runs += u64::from((word & !((word << 1) | carry)).count_ones());
        carry = word >> 63;
    }
    runs
}

/// Double-ended iterator over the values of a run container.
#[derive(Clone)]
pub struct RunStoreIter<'a> {
    runs: &'a [Rle],
    front_run: usize,
    front_offset: u64,
    back_run: usize,
    back_offset: u64,
}

impl<'a> RunStoreIter<'a> {
    fn new(runs: &'a [Rle]) -> Self {
        Self {
            runs,
            front_run: 0,
            front_offset: 0,
            back_run: runs.len().saturating_sub(1),
            back_offset: runs.last().map_or(0, |r| u64::from(r.len)),
        }
    }
}

impl Iterator for RunStoreIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.front_run >= self.runs.len() || self.front_run > self.back_run {
            return None;
        }
        if self.front_run == self.back_run && self.front_offset > self.back_offset {
            return None;
        }
        let run = self.runs[self.front_run];
        let value = run.start + self.front_offset as u16;
        if self.front_offset == u64::from(run.len) {
            self.front_run += 1;
            self.front_offset = 0;
        } else {
            self.front_offset += 1;
        }
        Some(value)
    }
}

impl DoubleEndedIterator for RunStoreIter<'_> {
    fn next_back(&mut self) -> Option<u16> {
        if self.runs.is_empty() || self.back_run < self.front_run {
            return None;
        }
        if self.back_run == self.front_run && self.back_offset < self.front_offset {
            return None;
        }
        let run = self.runs[self.back_run];
        let value = run.start + self.back_offset as u16;
        if self.back_offset == 0 {
            if self.back_run == 0 {
                // Exhausted from the back.
                self.front_run = self.runs.len();
            } else {
                self.back_run -= 1;
                self.back_offset = u64::from(self.runs[self.back_run].len);
            }
        } else {
            self.back_offset -= 1;
        }
        Some(value)
    }
}
