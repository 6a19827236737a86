use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use super::{Bitmap, Statistics};
use crate::container::Container;

impl Bitmap {
    /// Creates a new bitmap (initially empty)
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::new();
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new bitmap (initially empty) with a provided
    /// container-storage capacity (it is a performance hint).
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::with_capacity(8);
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn with_capacity(capacity: u32) -> Self {
        Bitmap {
            index: super::ChunkIndex::with_capacity(capacity as usize),
            copy_on_write: false,
        }
    }

    /// Creates a new bitmap from a slice of u32 integers
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 3]);
    ///
    /// assert!(bitmap.contains(1));
    /// assert!(bitmap.contains(2));
    /// assert!(bitmap.contains(3));
    /// assert!(!bitmap.contains(4));
    /// ```
    #[inline]
    pub fn of(elements: &[u32]) -> Self {
        let mut bitmap = Bitmap::new();
        bitmap.add_many(elements);
        bitmap
    }

    /// Add the integer element to the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// assert!(bitmap.is_empty());
    /// bitmap.add(1);
    /// assert!(!bitmap.is_empty());
    /// ```
    #[inline]
    pub fn add(&mut self, element: u32) {
        self.index.entry(key(element)).insert(low(element));
    }

    /// Add the integer element to the bitmap. Returns true if the value was
    /// added, false if the value was already in the bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// assert!(bitmap.add_checked(1));
    /// assert!(!bitmap.add_checked(1));
    /// ```
    #[inline]
    pub fn add_checked(&mut self, element: u32) -> bool {
        self.index.entry(key(element)).insert(low(element))
    }

    /// Add all members of a slice to the bitmap
    ///
    /// Sorted input is fastest, but any order is accepted.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// bitmap.add_many(&[1, 2, 3]);
    ///
    /// assert!(!bitmap.is_empty());
    /// assert!(bitmap.contains(1));
    /// assert!(bitmap.contains(2));
    /// assert!(bitmap.contains(3));
    /// ```
    pub fn add_many(&mut self, elements: &[u32]) {
        let mut i = 0;
        while i < elements.len() {
            let chunk = key(elements[i]);
            let container = self.index.entry(chunk);
            while i < elements.len() && key(elements[i]) == chunk {
                container.insert(low(elements[i]));
                i += 1;
            }
        }
    }

    /// Remove the integer element from the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// bitmap.add(1);
    /// bitmap.remove(1);
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn remove(&mut self, element: u32) {
        self.remove_checked(element);
    }

    /// Remove the integer element from the bitmap. Returns true if the value
    /// was removed, false if the value was not present in the bitmap.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// bitmap.add(1);
    /// assert!(bitmap.remove_checked(1));
    /// assert!(!bitmap.remove_checked(1));
    /// ```
    pub fn remove_checked(&mut self, element: u32) -> bool {
        let chunk = key(element);
        match self.index.position(chunk) {
            Ok(i) => {
                // Avoid the CoW copy when the value is absent anyway.
                if !self.index.container_at(i).contains(low(element)) {
                    return false;
                }
                let container = self.index.container_at_mut(i);
                container.remove(low(element));
                if container.is_empty() {
                    self.index.remove_at(i);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Add all values in range
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap1 = Bitmap::new();
    /// bitmap1.add_range(1..3);
    ///
    /// assert!(!bitmap1.is_empty());
    /// assert!(bitmap1.contains(1));
    /// assert!(bitmap1.contains(2));
    /// assert!(!bitmap1.contains(3));
    ///
    /// let mut bitmap2 = Bitmap::new();
    /// bitmap2.add_range(3..3);
    /// assert!(bitmap2.is_empty());
    ///
    /// let mut bitmap3 = Bitmap::new();
    /// bitmap3.add_range(..=2);
    /// bitmap3.add_range(u32::MAX..=u32::MAX);
    /// assert!(bitmap3.contains(0));
    /// assert!(bitmap3.contains(1));
    /// assert!(bitmap3.contains(2));
    /// assert!(bitmap3.contains(u32::MAX));
    /// assert_eq!(bitmap3.cardinality(), 4);
    /// ```
    pub fn add_range<R: RangeBounds<u32>>(&mut self, range: R) {
        let Some((start, end)) = range_to_inclusive(range) else {
            return;
        };
        for_each_chunk(start, end, |chunk, lo, hi| {
            self.index.entry(chunk).insert_range(lo..=hi);
        });
    }

    /// Remove all values in range
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// bitmap.add_range(1..4);
    /// assert!(!bitmap.is_empty());
    ///
    /// bitmap.remove_range(1..3);
    ///
    /// assert!(!bitmap.contains(1));
    /// assert!(!bitmap.contains(2));
    /// assert!(bitmap.contains(3));
    /// ```
    pub fn remove_range<R: RangeBounds<u32>>(&mut self, range: R) {
        let Some((start, end)) = range_to_inclusive(range) else {
            return;
        };
        for_each_chunk(start, end, |chunk, lo, hi| {
            if let Some(container) = self.index.get_mut(chunk) {
                container.remove_range(lo..=hi);
            }
            self.index.prune(chunk);
        });
    }

    /// Check whether the element is present in the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// bitmap.add(1);
    ///
    /// assert!(bitmap.contains(1));
    /// assert!(!bitmap.contains(2));
    /// ```
    #[inline]
    pub fn contains(&self, element: u32) -> bool {
        match self.index.get(key(element)) {
            Some(container) => container.contains(low(element)),
            None => false,
        }
    }

    /// Check whether all values of a range are present
    ///
    /// Empty ranges are trivially contained.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1, 2]);
    /// assert!(bitmap.contains_range(1..3));
    /// assert!(!bitmap.contains_range(1..4));
    /// assert!(bitmap.contains_range(5..5));
    ///
    /// let mut bitmap = bitmap.clone();
    /// bitmap.add(u32::MAX - 1);
    /// bitmap.add(u32::MAX);
    /// assert!(bitmap.contains_range((u32::MAX - 1)..=u32::MAX));
    /// ```
    pub fn contains_range<R: RangeBounds<u32>>(&self, range: R) -> bool {
        let Some((start, end)) = range_to_inclusive(range) else {
            return true;
        };
        let mut all = true;
        for_each_chunk(start, end, |chunk, lo, hi| {
            all = all
                && match self.index.get(chunk) {
                    Some(container) => container.contains_range(lo..=hi),
                    None => false,
                };
        });
        all
    }

    /// Empties the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[1, 2]);
    /// bitmap.clear();
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn clear(&mut self) {
        self.index = super::ChunkIndex::new();
    }

    /// Returns the number of integers contained in the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// assert_eq!(bitmap.cardinality(), 0);
    ///
    /// bitmap.add(1);
    /// assert_eq!(bitmap.cardinality(), 1);
    /// ```
    #[inline]
    pub fn cardinality(&self) -> u64 {
        self.index.cardinality()
    }

    /// Returns the number of integers contained in the range
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1, 3, 4, u32::MAX]);
    ///
    /// assert_eq!(bitmap.range_cardinality(..1), 0);
    /// assert_eq!(bitmap.range_cardinality(..2), 1);
    /// assert_eq!(bitmap.range_cardinality(3..5), 2);
    /// assert_eq!(bitmap.range_cardinality(..), 4);
    /// ```
    pub fn range_cardinality<R: RangeBounds<u32>>(&self, range: R) -> u64 {
        let Some((start, end)) = range_to_inclusive(range) else {
            return 0;
        };
        let mut count = 0;
        for_each_chunk(start, end, |chunk, lo, hi| {
            if let Some(container) = self.index.get(chunk) {
                count += container.range_cardinality(lo..=hi);
            }
        });
        count
    }

    /// Returns true if the bitmap contains no elements
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// assert!(bitmap.is_empty());
    ///
    /// bitmap.add(1);
    /// assert!(!bitmap.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the smallest value in the bitmap, or None if the bitmap is
    /// empty
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// assert_eq!(bitmap.minimum(), None);
    ///
    /// bitmap.add_range(5..10);
    /// assert_eq!(bitmap.minimum(), Some(5));
    /// ```
    pub fn minimum(&self) -> Option<u32> {
        if self.index.is_empty() {
            return None;
        }
        let chunk = self.index.key_at(0);
        let min = self.index.container_at(0).min()?;
        Some(join(chunk, min))
    }

    /// Returns the largest value in the bitmap, or None if the bitmap is
    /// empty
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// assert_eq!(bitmap.maximum(), None);
    ///
    /// bitmap.add_range(5..10);
    /// assert_eq!(bitmap.maximum(), Some(9));
    /// ```
    pub fn maximum(&self) -> Option<u32> {
        if self.index.is_empty() {
            return None;
        }
        let last = self.index.len() - 1;
        let chunk = self.index.key_at(last);
        let max = self.index.container_at(last).max()?;
        Some(join(chunk, max))
    }

    /// Returns the number of values in the bitmap that are less than or
    /// equal to the given value
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[10, 100, 1000]);
    ///
    /// assert_eq!(bitmap.rank(5), 0);
    /// assert_eq!(bitmap.rank(10), 1);
    /// assert_eq!(bitmap.rank(500), 2);
    /// assert_eq!(bitmap.rank(u32::MAX), 3);
    /// ```
    pub fn rank(&self, value: u32) -> u64 {
        let chunk = key(value);
        let mut count = 0;
        for (k, container) in self.index.iter() {
            match k.cmp(&chunk) {
                std::cmp::Ordering::Less => count += container.cardinality(),
                std::cmp::Ordering::Equal => {
                    count += container.rank(low(value));
                    break;
                }
                std::cmp::Ordering::Greater => break,
            }
        }
        count
    }

    /// Returns the element of the given rank, in ascending order, or None if
    /// the rank is at least the cardinality of the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[10, 100, 1000]);
    ///
    /// assert_eq!(bitmap.select(0), Some(10));
    /// assert_eq!(bitmap.select(2), Some(1000));
    /// assert_eq!(bitmap.select(3), None);
    /// ```
    pub fn select(&self, rank: u32) -> Option<u32> {
        let mut remaining = u64::from(rank);
        for (k, container) in self.index.iter() {
            let cardinality = container.cardinality();
            if remaining < cardinality {
                return container.select(remaining).map(|v| join(k, v));
            }
            remaining -= cardinality;
        }
        None
    }

    /// Returns a new bitmap with all values in the range flipped, leaving
    /// values outside the range untouched
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[4]);
    ///
    /// let flipped = bitmap.flip(1..3);
    ///
    /// assert_eq!(flipped.to_vec(), [1, 2, 4]);
    /// assert_eq!(flipped.flip(1..3), bitmap);
    /// ```
    #[inline]
    #[must_use]
    pub fn flip<R: RangeBounds<u32>>(&self, range: R) -> Self {
        let mut result = self.clone();
        result.flip_inplace(range);
        result
    }

    /// Flip all values in the range in place
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[4]);
    /// bitmap.flip_inplace(1..3);
    ///
    /// assert_eq!(bitmap.to_vec(), [1, 2, 4]);
    /// ```
    pub fn flip_inplace<R: RangeBounds<u32>>(&mut self, range: R) {
        let Some((start, end)) = range_to_inclusive(range) else {
            return;
        };
        for_each_chunk(start, end, |chunk, lo, hi| {
            match self.index.position(chunk) {
                Ok(i) => {
                    let flipped = self.index.container_at(i).not(lo..=hi);
                    if flipped.is_empty() {
                        self.index.remove_at(i);
                    } else {
                        *self.index.container_at_mut(i) = flipped;
                    }
                }
                Err(i) => {
                    self.index
                        .insert_at(i, chunk, Arc::new(Container::from_range(lo..=hi)));
                }
            }
        });
    }

    /// Returns the intersection of the two bitmaps as a new bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[1, 2]);
    /// let bitmap2 = Bitmap::of(&[2]);
    ///
    /// let bitmap3 = bitmap1.and(&bitmap2);
    ///
    /// assert!(bitmap3.contains(2));
    /// assert!(!bitmap3.contains(1));
    /// ```
    #[inline]
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Bitmap {
            index: self.index.and(&other.index),
            copy_on_write: self.copy_on_write,
        }
    }

    /// Computes the intersection between two bitmaps, storing the result in
    /// the current bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// bitmap.and_inplace(&bitmap2);
    ///
    /// assert!(bitmap.is_empty());
    /// ```
    #[inline]
    pub fn and_inplace(&mut self, other: &Self) {
        self.index.and_inplace(&other.index);
    }

    /// Returns the union of the two bitmaps as a new bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15]);
    /// let bitmap2 = Bitmap::of(&[25]);
    ///
    /// let bitmap3 = bitmap1.or(&bitmap2);
    ///
    /// assert_eq!(bitmap3.cardinality(), 2);
    /// assert!(bitmap3.contains(15));
    /// assert!(bitmap3.contains(25));
    /// ```
    #[inline]
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Bitmap {
            index: self.index.or(&other.index),
            copy_on_write: self.copy_on_write,
        }
    }

    /// Computes the union between two bitmaps, storing the result in the
    /// current bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[15]);
    /// bitmap.or_inplace(&Bitmap::of(&[25]));
    ///
    /// assert_eq!(bitmap.to_vec(), [15, 25]);
    /// ```
    #[inline]
    pub fn or_inplace(&mut self, other: &Self) {
        self.index.or_inplace(&other.index);
    }

    /// Returns the symmetric difference (xor) between the two bitmaps as a
    /// new bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = bitmap1.xor(&bitmap2);
    ///
    /// assert_eq!(bitmap3.to_vec(), [15, 35]);
    /// ```
    #[inline]
    #[must_use]
    pub fn xor(&self, other: &Self) -> Self {
        Bitmap {
            index: self.index.xor(&other.index),
            copy_on_write: self.copy_on_write,
        }
    }

    /// Computes the symmetric difference (xor) between two bitmaps, storing
    /// the result in the current bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[15, 25]);
    /// bitmap.xor_inplace(&Bitmap::of(&[25, 35]));
    ///
    /// assert_eq!(bitmap.to_vec(), [15, 35]);
    /// ```
    #[inline]
    pub fn xor_inplace(&mut self, other: &Self) {
        self.index.xor_inplace(&other.index);
    }

    /// Returns the set difference between the two bitmaps as a new bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// let bitmap3 = bitmap1.andnot(&bitmap2);
    ///
    /// assert_eq!(bitmap3.to_vec(), [15]);
    /// ```
    #[inline]
    #[must_use]
    pub fn andnot(&self, other: &Self) -> Self {
        Bitmap {
            index: self.index.and_not(&other.index),
            copy_on_write: self.copy_on_write,
        }
    }

    /// Computes the set difference between two bitmaps, storing the result
    /// in the current bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[15, 25]);
    /// bitmap.andnot_inplace(&Bitmap::of(&[25, 35]));
    ///
    /// assert_eq!(bitmap.to_vec(), [15]);
    /// ```
    #[inline]
    pub fn andnot_inplace(&mut self, other: &Self) {
        self.index.and_not_inplace(&other.index);
    }

    /// Returns the number of elements in the intersection of the two bitmaps
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.and_cardinality(&bitmap2), 1);
    /// ```
    pub fn and_cardinality(&self, other: &Self) -> u64 {
        let mut count = 0;
        let (mut i, mut j) = (0, 0);
        while i < self.index.len() && j < other.index.len() {
            match self.index.key_at(i).cmp(&other.index.key_at(j)) {
                std::cmp::Ordering::Equal => {
                    count += self
                        .index
                        .container_at(i)
                        .and(other.index.container_at(j))
                        .cardinality();
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i = self.index.advance_until(other.index.key_at(j), i),
                std::cmp::Ordering::Greater => {
                    j = other.index.advance_until(self.index.key_at(i), j);
                }
            }
        }
        count
    }

    /// Returns the number of elements in the union of the two bitmaps
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.or_cardinality(&bitmap2), 3);
    /// ```
    #[inline]
    pub fn or_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() + other.cardinality() - self.and_cardinality(other)
    }

    /// Returns the number of elements in the set difference of the two
    /// bitmaps
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.andnot_cardinality(&bitmap2), 1);
    /// ```
    #[inline]
    pub fn andnot_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() - self.and_cardinality(other)
    }

    /// Returns the number of elements in the symmetric difference (xor) of
    /// the two bitmaps
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(bitmap1.xor_cardinality(&bitmap2), 2);
    /// ```
    #[inline]
    pub fn xor_cardinality(&self, other: &Self) -> u64 {
        self.cardinality() + other.cardinality() - 2 * self.and_cardinality(other)
    }

    /// Returns true if the two bitmaps have at least one element in common
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    /// let bitmap3 = Bitmap::of(&[35, 45]);
    ///
    /// assert!(bitmap1.intersect(&bitmap2));
    /// assert!(!bitmap1.intersect(&bitmap3));
    /// ```
    pub fn intersect(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.index.len() && j < other.index.len() {
            match self.index.key_at(i).cmp(&other.index.key_at(j)) {
                std::cmp::Ordering::Equal => {
                    if !self
                        .index
                        .container_at(i)
                        .and(other.index.container_at(j))
                        .is_empty()
                    {
                        return true;
                    }
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i = self.index.advance_until(other.index.key_at(j), i),
                std::cmp::Ordering::Greater => {
                    j = other.index.advance_until(self.index.key_at(i), j);
                }
            }
        }
        false
    }

    /// Returns the Jaccard index between the two bitmaps: the size of the
    /// intersection divided by the size of the union
    ///
    /// NaN if both bitmaps are empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[15, 25]);
    /// let bitmap2 = Bitmap::of(&[25, 35]);
    ///
    /// assert!((bitmap1.jaccard_index(&bitmap2) - 1.0 / 3.0).abs() < 1e-9);
    /// ```
    pub fn jaccard_index(&self, other: &Self) -> f64 {
        let intersection = self.and_cardinality(other);
        let union = self.cardinality() + other.cardinality() - intersection;
        intersection as f64 / union as f64
    }

    /// Returns true if all the elements of self are contained in other
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[5, 15]);
    /// let bitmap2 = Bitmap::of(&[5, 15, 25]);
    ///
    /// assert!(bitmap1.is_subset(&bitmap2));
    /// assert!(!bitmap2.is_subset(&bitmap1));
    /// assert!(bitmap1.is_subset(&bitmap1));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        let mut j = 0;
        for (chunk, container) in self.index.iter() {
            j = other.index.advance_until(chunk, j);
            if j == other.index.len() || other.index.key_at(j) != chunk {
                return false;
            }
            let candidate = other.index.container_at(j);
            if container.and(candidate).cardinality() != container.cardinality() {
                return false;
            }
        }
        true
    }

    /// Returns true if all the elements of self are contained in other, and
    /// other is strictly larger
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap1 = Bitmap::of(&[5, 15]);
    /// let bitmap2 = Bitmap::of(&[5, 15, 25]);
    ///
    /// assert!(bitmap1.is_strict_subset(&bitmap2));
    /// assert!(!bitmap1.is_strict_subset(&bitmap1));
    /// ```
    #[inline]
    pub fn is_strict_subset(&self, other: &Self) -> bool {
        self.cardinality() < other.cardinality() && self.is_subset(other)
    }

    /// Compresses the bitmap, switching containers to run encoding where
    /// that is smaller. Returns true if the result has at least one run
    /// container.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (100..1000).collect();
    ///
    /// assert_eq!(bitmap.cardinality(), 900);
    /// assert!(bitmap.run_optimize());
    /// ```
    pub fn run_optimize(&mut self) -> bool {
        for i in 0..self.index.len() {
            self.index.container_at_mut(i).to_efficient();
        }
        self.index
            .iter()
            .any(|(_, c)| matches!(**c, Container::Run(_)))
    }

    /// Removes run encoding, leaving only array and bitmap containers.
    /// Returns true if the bitmap was modified.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (100..1000).collect();
    ///
    /// bitmap.run_optimize();
    /// assert!(bitmap.remove_run_compression());
    /// assert!(!bitmap.remove_run_compression());
    /// ```
    pub fn remove_run_compression(&mut self) -> bool {
        let mut changed = false;
        for i in 0..self.index.len() {
            if matches!(*self.index.container_at(i), Container::Run(_)) {
                changed |= self.index.container_at_mut(i).remove_run_compression();
            }
        }
        changed
    }

    /// Returns a vector containing all of the integers stored in the bitmap
    /// in ascending order
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[15, 25]);
    ///
    /// assert_eq!(bitmap.to_vec(), [15, 25]);
    /// ```
    pub fn to_vec(&self) -> Vec<u32> {
        let mut result = Vec::with_capacity(self.cardinality() as usize);
        result.extend(self.iter());
        result
    }

    /// Returns an estimate of the memory used by the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[15, 25]);
    /// assert!(bitmap.get_size_in_bytes() > 0);
    /// ```
    pub fn get_size_in_bytes(&self) -> u64 {
        let containers: u64 = self.index.iter().map(|(_, c)| c.size_in_bytes()).sum();
        // Each entry also carries a key and a pointer in the index.
        containers + 10 * self.index.len() as u64
    }

    /// Returns statistics about the composition of the bitmap
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap: Bitmap = (1..100).collect();
    /// let statistics = bitmap.statistics();
    ///
    /// assert_eq!(statistics.n_containers, 1);
    /// assert_eq!(statistics.n_array_containers, 1);
    /// assert_eq!(statistics.n_run_containers, 0);
    /// assert_eq!(statistics.n_bitmap_containers, 0);
    /// assert_eq!(statistics.n_values_array_containers, 99);
    /// assert_eq!(statistics.min_value, 1);
    /// assert_eq!(statistics.max_value, 99);
    /// assert_eq!(statistics.cardinality, 99);
    ///
    /// bitmap.run_optimize();
    /// let statistics = bitmap.statistics();
    ///
    /// assert_eq!(statistics.n_run_containers, 1);
    /// assert_eq!(statistics.n_values_run_containers, 99);
    /// ```
    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics::default();
        for (_, container) in self.index.iter() {
            stats.n_containers += 1;
            let cardinality = container.cardinality();
            let bytes = container.size_in_bytes();
            match **container {
                Container::Array(_) => {
                    stats.n_array_containers += 1;
                    stats.n_values_array_containers += cardinality;
                    stats.n_bytes_array_containers += bytes;
                }
                Container::Bitmap(_) => {
                    stats.n_bitmap_containers += 1;
                    stats.n_values_bitmap_containers += cardinality;
                    stats.n_bytes_bitmap_containers += bytes;
                }
                Container::Run(_) => {
                    stats.n_run_containers += 1;
                    stats.n_values_run_containers += cardinality;
                    stats.n_bytes_run_containers += bytes;
                }
            }
            stats.cardinality += cardinality;
        }
        stats.min_value = self.minimum().unwrap_or(0);
        stats.max_value = self.maximum().unwrap_or(0);
        stats
    }

    /// Checks the internal invariants of the bitmap, returning a description
    /// of the first violation found
    ///
    /// All bitmaps built through the public API satisfy the invariants; this
    /// is mainly useful after deserializing untrusted bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 100_000]);
    /// assert!(bitmap.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), &'static str> {
        let mut prev: Option<u16> = None;
        for (chunk, container) in self.index.iter() {
            if prev.is_some_and(|p| p >= chunk) {
                return Err("chunk keys not strictly ascending");
            }
            prev = Some(chunk);
            if container.is_empty() {
                return Err("empty container stored in the index");
            }
            container.check_invariants()?;
        }
        Ok(())
    }

    /// Whether `clone` shares container storage between the copies.
    ///
    /// With copy-on-write enabled, cloning is cheap and the actual copy is
    /// deferred until one of the copies is mutated.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::of(&[15]);
    /// assert!(!bitmap.get_copy_on_write());
    ///
    /// bitmap.set_copy_on_write(true);
    /// let mut copy = bitmap.clone();
    /// copy.add(25);
    ///
    /// assert!(copy.contains(25));
    /// assert!(!bitmap.contains(25));
    /// ```
    #[inline]
    pub fn set_copy_on_write(&mut self, enable: bool) {
        self.copy_on_write = enable;
    }

    /// Returns true if cloning this bitmap shares container storage
    #[inline]
    pub fn get_copy_on_write(&self) -> bool {
        self.copy_on_write
    }
}

#[inline]
pub(super) fn key(value: u32) -> u16 {
    (value >> 16) as u16
}

#[inline]
pub(super) fn low(value: u32) -> u16 {
    value as u16
}

#[inline]
pub(super) fn join(key: u16, low: u16) -> u32 {
    (u32::from(key) << 16) | u32::from(low)
}

/// Normalize any `RangeBounds<u32>` to a closed interval, `None` if empty.
pub(super) fn range_to_inclusive<R: RangeBounds<u32>>(range: R) -> Option<(u32, u32)> {
    let start = match range.start_bound() {
        Bound::Included(&i) => i,
        Bound::Excluded(&i) => i.checked_add(1)?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&i) => i,
        Bound::Excluded(&i) => i.checked_sub(1)?,
        Bound::Unbounded => u32::MAX,
    };
    (start <= end).then_some((start, end))
}

/// Visit every chunk overlapping the closed interval `[start, end]`, with
/// the low-bit bounds clamped per chunk.
fn for_each_chunk(start: u32, end: u32, mut f: impl FnMut(u16, u16, u16)) {
    for chunk in key(start)..=key(end) {
        let lo = if chunk == key(start) { low(start) } else { 0 };
        let hi = if chunk == key(end) { low(end) } else { u16::MAX };
        f(chunk, lo, hi);
    }
}
