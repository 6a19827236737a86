use super::imp::{join, key, low};
use super::Bitmap;
use crate::container::ContainerIter;

/// Iterator over the values of a [`Bitmap`], in ascending order.
pub struct BitmapIterator<'a> {
    bitmap: &'a Bitmap,
    front: Option<(u16, ContainerIter<'a>)>,
    back: Option<(u16, ContainerIter<'a>)>,
    // Chunk positions in `front_next..back_next` are not yet claimed by
    // either end.
    front_next: usize,
    back_next: usize,
}

impl<'a> BitmapIterator<'a> {
    fn new(bitmap: &'a Bitmap) -> Self {
        BitmapIterator {
            bitmap,
            front: None,
            back: None,
            front_next: 0,
            back_next: bitmap.index.len(),
        }
    }

    /// Attempt to read many values from the iterator into `dst`
    ///
    /// Returns the number of items read from the iterator, may be `< dst.len()` iff
    /// the iterator is exhausted.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let mut bitmap = Bitmap::new();
    /// bitmap.add_range(0..100);
    /// bitmap.add(222);
    /// bitmap.add(555);
    ///
    /// let mut buf = [0; 100];
    /// let mut iter = bitmap.iter();
    /// assert_eq!(iter.next_many(&mut buf), 100);
    /// for (i, item) in buf.iter().enumerate() {
    ///     assert_eq!(*item, i as u32);
    /// }
    /// // Calls to next_many() can be interleaved with calls to next()
    /// assert_eq!(iter.next(), Some(222));
    /// assert_eq!(iter.next_many(&mut buf), 1);
    /// assert_eq!(buf[0], 555);
    ///
    /// assert_eq!(iter.next(), None);
    /// assert_eq!(iter.next_many(&mut buf), 0);
    /// ```
    pub fn next_many(&mut self, dst: &mut [u32]) -> usize {
        let mut written = 0;
        while written < dst.len() {
            match self.next() {
                Some(value) => {
                    dst[written] = value;
                    written += 1;
                }
                None => break,
            }
        }
        written
    }

    /// Reset the iterator to the first value `>= val`
    ///
    /// This can move the iterator forwards or backwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[0, 1, 100, 1000, u32::MAX]);
    /// let mut iter = bitmap.iter();
    /// iter.reset_at_or_after(0);
    /// assert_eq!(iter.next(), Some(0));
    /// iter.reset_at_or_after(0);
    /// assert_eq!(iter.next(), Some(0));
    ///
    /// iter.reset_at_or_after(101);
    /// assert_eq!(iter.next(), Some(1000));
    /// assert_eq!(iter.next(), Some(u32::MAX));
    /// assert_eq!(iter.next(), None);
    /// iter.reset_at_or_after(u32::MAX);
    /// assert_eq!(iter.next(), Some(u32::MAX));
    /// assert_eq!(iter.next(), None);
    /// ```
    pub fn reset_at_or_after(&mut self, val: u32) {
        let index = &self.bitmap.index;
        let chunk = key(val);
        let i = index.advance_until(chunk, 0);
        self.front = None;
        self.back = None;
        self.back_next = index.len();
        if i < index.len() && index.key_at(i) == chunk {
            self.front = Some((chunk, index.container_at(i).iter_from(low(val))));
            self.front_next = i + 1;
        } else {
            self.front_next = i;
        }
    }

    fn claim_front(&mut self) -> Option<()> {
        if self.front_next < self.back_next {
            let i = self.front_next;
            self.front_next += 1;
            let index = &self.bitmap.index;
            self.front = Some((index.key_at(i), index.container_at(i).iter()));
            Some(())
        } else {
            None
        }
    }

    fn claim_back(&mut self) -> Option<()> {
        if self.front_next < self.back_next {
            self.back_next -= 1;
            let i = self.back_next;
            let index = &self.bitmap.index;
            self.back = Some((index.key_at(i), index.container_at(i).iter()));
            Some(())
        } else {
            None
        }
    }
}

impl<'a> Iterator for BitmapIterator<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((chunk, it)) = self.front.as_mut() {
                if let Some(v) = it.next() {
                    return Some(join(*chunk, v));
                }
                self.front = None;
            } else if self.claim_front().is_none() {
                // Drain what the back end claimed but has not yielded.
                let (chunk, it) = self.back.as_mut()?;
                return match it.next() {
                    Some(v) => Some(join(*chunk, v)),
                    None => {
                        self.back = None;
                        None
                    }
                };
            }
        }
    }
}

impl DoubleEndedIterator for BitmapIterator<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((chunk, it)) = self.back.as_mut() {
                if let Some(v) = it.next_back() {
                    return Some(join(*chunk, v));
                }
                self.back = None;
            } else if self.claim_back().is_none() {
                let (chunk, it) = self.front.as_mut()?;
                return match it.next_back() {
                    Some(v) => Some(join(*chunk, v)),
                    None => {
                        self.front = None;
                        None
                    }
                };
            }
        }
    }
}

impl Bitmap {
    /// Returns an iterator over each value stored in the bitmap.
    /// Returned values are ordered in ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap = Bitmap::of(&[4, 3, 2]);
    /// let mut iterator = bitmap.iter();
    ///
    /// assert_eq!(iterator.next(), Some(2));
    /// assert_eq!(iterator.next(), Some(3));
    /// assert_eq!(iterator.next(), Some(4));
    /// assert_eq!(iterator.next(), None);
    ///
    /// let descending: Vec<u32> = bitmap.iter().rev().collect();
    /// assert_eq!(descending, [4, 3, 2]);
    /// ```
    pub fn iter(&self) -> BitmapIterator<'_> {
        BitmapIterator::new(self)
    }
}

impl FromIterator<u32> for Bitmap {
    /// Convenience method for creating bitmap from an iterator.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let bitmap: Bitmap = (1..3).collect();
    ///
    /// assert!(!bitmap.is_empty());
    /// assert!(bitmap.contains(1));
    /// assert!(bitmap.contains(2));
    /// assert_eq!(bitmap.cardinality(), 2);
    /// ```
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut bitmap = Bitmap::new();
        bitmap.extend(iter);
        bitmap
    }
}

impl Extend<u32> for Bitmap {
    fn extend<T: IntoIterator<Item = u32>>(&mut self, iter: T) {
        for item in iter {
            self.add(item);
        }
    }
}

impl<'a> IntoIterator for &'a Bitmap {
    type Item = u32;
    type IntoIter = BitmapIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
