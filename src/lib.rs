//! A compressed bitmap (roaring bitmap) for dense and sparse sets of `u32`.
//!
//! Values are partitioned by their high 16 bits into chunks, and each chunk
//! is stored in whichever container encoding is smallest: a sorted array, a
//! 65536-bit bitmap, or run-length intervals. Set operations work container
//! to container without decompressing.
//!
//! ```
//! use corvid::Bitmap;
//!
//! let mut queried = Bitmap::of(&[100, 200, 300]);
//! queried.add_range(100_000..150_000);
//! let matched = Bitmap::of(&[200, 100_001]);
//!
//! assert_eq!(queried.and(&matched), matched);
//! assert_eq!(queried.cardinality(), 50_003);
//! ```

pub mod bitmap;
mod container;
mod serialization;

pub use bitmap::{Bitmap, BitmapIterator, BitmapView, Statistics};
pub use bitmap::{Deserializer, Serializer, ViewDeserializer};
pub use serialization::{DeserializeError, Frozen, Portable};
