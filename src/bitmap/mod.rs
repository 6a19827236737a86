//! A compressed bitmap over `u32` keys.
//!
//! # Example
//!
//! ```rust
//! use corvid::Bitmap;
//!
//! let mut rb1 = Bitmap::new();
//! rb1.add(1);
//! rb1.add(2);
//! rb1.add(3);
//! rb1.add(4);
//! rb1.add(5);
//! rb1.add(100);
//! rb1.add(1000);
//! rb1.run_optimize();
//!
//! let mut rb2 = Bitmap::new();
//! rb2.add(3);
//! rb2.add(4);
//! rb2.add(1000);
//! rb2.run_optimize();
//!
//! let mut rb3 = Bitmap::new();
//!
//! assert_eq!(rb1.cardinality(), 7);
//! assert!(rb1.contains(3));
//!
//! rb1.and_inplace(&rb2);
//! rb3.add(5);
//! rb3.or_inplace(&rb1);
//!
//! let rb4 = Bitmap::fast_or(&[&rb1, &rb2, &rb3]);
//! assert_eq!(rb4.to_vec(), [3, 4, 5, 1000]);
//! ```

pub(crate) use self::index::ChunkIndex;

/// A compressed bitmap
#[derive(Default)]
pub struct Bitmap {
    index: ChunkIndex,
    copy_on_write: bool,
}

/// A read-only bitmap backed by a serialized byte slice
///
/// Lookups decode the bytes in place; see [`BitmapView::deserialize`].
pub struct BitmapView<'a> {
    entries: Vec<(u16, view::ContainerRef<'a>)>,
}

/// Detailed statistics on the composition of a bitmap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct Statistics {
    /// Number of containers in the bitmap
    pub n_containers: u32,
    /// Number of array containers
    pub n_array_containers: u32,
    /// Number of run containers
    pub n_run_containers: u32,
    /// Number of bitmap containers
    pub n_bitmap_containers: u32,
    /// Number of values stored in array containers
    pub n_values_array_containers: u64,
    /// Number of values stored in run containers
    pub n_values_run_containers: u64,
    /// Number of values stored in bitmap containers
    pub n_values_bitmap_containers: u64,
    /// Bytes used by array containers
    pub n_bytes_array_containers: u64,
    /// Bytes used by run containers
    pub n_bytes_run_containers: u64,
    /// Bytes used by bitmap containers
    pub n_bytes_bitmap_containers: u64,
    /// Largest value in the bitmap, or 0 if empty
    pub max_value: u32,
    /// Smallest value in the bitmap, or 0 if empty
    pub min_value: u32,
    /// Total number of values stored in the bitmap
    pub cardinality: u64,
}

mod aggregate;
mod imp;
mod index;
mod iter;
mod ops;
mod serialization;
mod view;

pub use self::iter::BitmapIterator;
pub use self::serialization::{Deserializer, Serializer, ViewDeserializer};
