//! Read-only bitmaps backed by serialized bytes.
//!
//! A [`BitmapView`] decodes container payloads lazily: lookups and iteration
//! read the little-endian bytes in place, so building a view allocates only
//! the chunk table.

use std::fmt;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use super::imp::{join, key, low};
use super::serialization::ViewDeserializer;
use super::{Bitmap, BitmapView};
use crate::container::{ArrayStore, BitmapStore, Container, Rle, RunStore, BITMAP_LENGTH};
use crate::serialization::DeserializeError;

/// A container whose payload still lives in the serialized buffer.
///
/// Array bytes are sorted u16 values, bitmap bytes are 1024 u64 words, run
/// bytes are (start, length) u16 pairs.
#[derive(Clone, Copy)]
pub(super) enum ContainerRef<'a> {
    Array(&'a [u8]),
    Bitmap(&'a [u8]),
    Run(&'a [u8]),
}

impl<'a> ContainerRef<'a> {
    pub fn cardinality(self) -> u64 {
        match self {
            ContainerRef::Array(bytes) => (bytes.len() / 2) as u64,
            ContainerRef::Bitmap(bytes) => bytes
                .chunks_exact(8)
                .map(|w| u64::from(LittleEndian::read_u64(w).count_ones()))
                .sum(),
            ContainerRef::Run(bytes) => bytes
                .chunks_exact(4)
                .map(|pair| u64::from(LittleEndian::read_u16(&pair[2..])) + 1)
                .sum(),
        }
    }

    pub fn contains(self, value: u16) -> bool {
        match self {
            ContainerRef::Array(bytes) => {
                let mut lo = 0;
                let mut hi = bytes.len() / 2;
                while lo < hi {
                    let mid = (lo + hi) / 2;
                    if array_value(bytes, mid) < value {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                lo < bytes.len() / 2 && array_value(bytes, lo) == value
            }
            ContainerRef::Bitmap(bytes) => {
                let word = LittleEndian::read_u64(&bytes[8 * (usize::from(value) / 64)..]);
                word & (1 << (value % 64)) != 0
            }
            ContainerRef::Run(bytes) => bytes.chunks_exact(4).any(|pair| {
                let start = LittleEndian::read_u16(pair);
                let len = LittleEndian::read_u16(&pair[2..]);
                value >= start && u32::from(value) <= u32::from(start) + u32::from(len)
            }),
        }
    }

    pub fn min(self) -> Option<u16> {
        match self {
            ContainerRef::Array(bytes) => (!bytes.is_empty()).then(|| array_value(bytes, 0)),
            ContainerRef::Bitmap(bytes) => bytes
                .chunks_exact(8)
                .enumerate()
                .find_map(|(i, w)| match LittleEndian::read_u64(w) {
                    0 => None,
                    word => Some((i * 64) as u16 + word.trailing_zeros() as u16),
                }),
            ContainerRef::Run(bytes) => {
                (!bytes.is_empty()).then(|| LittleEndian::read_u16(bytes))
            }
        }
    }

    pub fn max(self) -> Option<u16> {
        match self {
            ContainerRef::Array(bytes) => {
                (!bytes.is_empty()).then(|| array_value(bytes, bytes.len() / 2 - 1))
            }
            ContainerRef::Bitmap(bytes) => bytes
                .chunks_exact(8)
                .enumerate()
                .rev()
                .find_map(|(i, w)| match LittleEndian::read_u64(w) {
                    0 => None,
                    word => Some((i * 64 + 63) as u16 - word.leading_zeros() as u16),
                }),
            ContainerRef::Run(bytes) => (!bytes.is_empty()).then(|| {
                let last = &bytes[bytes.len() - 4..];
                LittleEndian::read_u16(last) + LittleEndian::read_u16(&last[2..])
            }),
        }
    }

    /// Decode into an owned container.
    pub fn to_container(self) -> Container {
        match self {
            ContainerRef::Array(bytes) => {
                let values = bytes
                    .chunks_exact(2)
                    .map(LittleEndian::read_u16)
                    .collect::<Vec<_>>();
                Container::Array(ArrayStore::from_sorted(values))
            }
            ContainerRef::Bitmap(bytes) => {
                let mut words = Box::new([0u64; BITMAP_LENGTH]);
                for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(8)) {
                    *word = LittleEndian::read_u64(chunk);
                }
                Container::Bitmap(BitmapStore::from_words(words))
            }
            ContainerRef::Run(bytes) => {
                let runs = bytes
                    .chunks_exact(4)
                    .map(|pair| Rle {
                        start: LittleEndian::read_u16(pair),
                        len: LittleEndian::read_u16(&pair[2..]),
                    })
                    .collect::<Vec<_>>();
                Container::Run(RunStore::from_runs(runs))
            }
        }
    }

    fn iter(self) -> ContainerRefIter<'a> {
        ContainerRefIter {
            container: self,
            pos: 0,
            run_offset: 0,
        }
    }
}

#[inline]
fn array_value(bytes: &[u8], i: usize) -> u16 {
    LittleEndian::read_u16(&bytes[2 * i..])
}

struct ContainerRefIter<'a> {
    container: ContainerRef<'a>,
    // Array: value index. Bitmap: next bit to examine (up to 1 << 16).
    // Run: pair index, with `run_offset` inside the current interval.
    pos: u32,
    run_offset: u32,
}

impl Iterator for ContainerRefIter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self.container {
            ContainerRef::Array(bytes) => {
                if self.pos as usize * 2 >= bytes.len() {
                    return None;
                }
                let value = array_value(bytes, self.pos as usize);
                self.pos += 1;
                Some(value)
            }
            ContainerRef::Bitmap(bytes) => {
                while self.pos < 1 << 16 {
                    let word_index = (self.pos / 64) as usize;
                    let word = LittleEndian::read_u64(&bytes[8 * word_index..])
                        & (u64::MAX << (self.pos % 64));
                    if word != 0 {
                        let value = (word_index * 64) as u16 + word.trailing_zeros() as u16;
                        self.pos = u32::from(value) + 1;
                        return Some(value);
                    }
                    self.pos = (word_index as u32 + 1) * 64;
                }
                None
            }
            ContainerRef::Run(bytes) => {
                let pair = bytes.get(4 * self.pos as usize..4 * self.pos as usize + 4)?;
                let start = LittleEndian::read_u16(pair);
                let len = LittleEndian::read_u16(&pair[2..]);
                let value = (u32::from(start) + self.run_offset) as u16;
                if self.run_offset < u32::from(len) {
                    self.run_offset += 1;
                } else {
                    self.run_offset = 0;
                    self.pos += 1;
                }
                Some(value)
            }
        }
    }
}

impl<'a> BitmapView<'a> {
    pub(super) fn from_entries(entries: Vec<(u16, ContainerRef<'a>)>) -> Self {
        BitmapView { entries }
    }

    /// Build a view over bytes serialized in the given format.
    ///
    /// The buffer is validated up front; lookups on the returned view do not
    /// re-validate.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, BitmapView, Frozen};
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 70000]);
    /// let bytes = bitmap.serialize::<Frozen>();
    ///
    /// let view = BitmapView::deserialize::<Frozen>(&bytes).unwrap();
    /// assert_eq!(view, bitmap);
    /// ```
    #[inline]
    pub fn deserialize<D: ViewDeserializer>(data: &'a [u8]) -> Result<Self, DeserializeError> {
        D::deserialize_view(data)
    }

    /// Returns the number of integers in the view
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, BitmapView, Portable};
    ///
    /// let bytes = Bitmap::of(&[1, 2, 70000]).serialize::<Portable>();
    /// let view = BitmapView::deserialize::<Portable>(&bytes).unwrap();
    ///
    /// assert_eq!(view.cardinality(), 3);
    /// ```
    pub fn cardinality(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c.cardinality()).sum()
    }

    /// Returns true if the view contains no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether the element is present
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, BitmapView, Portable};
    ///
    /// let bytes = Bitmap::of(&[1, 2, 70000]).serialize::<Portable>();
    /// let view = BitmapView::deserialize::<Portable>(&bytes).unwrap();
    ///
    /// assert!(view.contains(70000));
    /// assert!(!view.contains(3));
    /// ```
    pub fn contains(&self, element: u32) -> bool {
        match self
            .entries
            .binary_search_by_key(&key(element), |&(k, _)| k)
        {
            Ok(i) => self.entries[i].1.contains(low(element)),
            Err(_) => false,
        }
    }

    /// Returns the smallest value in the view, or None if empty
    pub fn minimum(&self) -> Option<u32> {
        let (chunk, container) = self.entries.first()?;
        container.min().map(|v| join(*chunk, v))
    }

    /// Returns the largest value in the view, or None if empty
    pub fn maximum(&self) -> Option<u32> {
        let (chunk, container) = self.entries.last()?;
        container.max().map(|v| join(*chunk, v))
    }

    /// Iterate the values of the view in ascending order
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, BitmapView, Portable};
    ///
    /// let bytes = Bitmap::of(&[1, 2, 70000]).serialize::<Portable>();
    /// let view = BitmapView::deserialize::<Portable>(&bytes).unwrap();
    ///
    /// assert_eq!(view.iter().collect::<Vec<u32>>(), [1, 2, 70000]);
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries
            .iter()
            .flat_map(|&(chunk, container)| container.iter().map(move |v| join(chunk, v)))
    }

    /// Decode the view into an owned [`Bitmap`]
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, BitmapView, Frozen};
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 70000]);
    /// let bytes = bitmap.serialize::<Frozen>();
    ///
    /// let thawed = BitmapView::deserialize::<Frozen>(&bytes).unwrap().to_bitmap();
    /// assert_eq!(thawed, bitmap);
    /// ```
    pub fn to_bitmap(&self) -> Bitmap {
        let mut bitmap = Bitmap::new();
        for &(chunk, container) in &self.entries {
            bitmap.index.push(chunk, Arc::new(container.to_container()));
        }
        bitmap
    }
}

impl PartialEq for BitmapView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cardinality() == other.cardinality() && self.iter().eq(other.iter())
    }
}

impl Eq for BitmapView<'_> {}

impl PartialEq<Bitmap> for BitmapView<'_> {
    fn eq(&self, other: &Bitmap) -> bool {
        self.cardinality() == other.cardinality() && self.iter().eq(other.iter())
    }
}

impl PartialEq<BitmapView<'_>> for Bitmap {
    fn eq(&self, other: &BitmapView<'_>) -> bool {
        other == self
    }
}

impl fmt::Debug for BitmapView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.cardinality() < 32 {
            write!(f, "BitmapView<{:?}>", self.iter().collect::<Vec<_>>())
        } else {
            write!(
                f,
                "BitmapView<{:?} values between {:?} and {:?}>",
                self.cardinality(),
                self.minimum().unwrap(),
                self.maximum().unwrap()
            )
        }
    }
}
