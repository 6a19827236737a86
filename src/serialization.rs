use thiserror::Error;

/// The `Portable` format is meant to be compatible with other roaring bitmap
/// libraries, such as Go or Java.
///
/// It's defined here: <https://github.com/RoaringBitmap/RoaringFormatSpec>
pub enum Portable {}

/// The `Frozen` format lays containers out so a bitmap can be read directly
/// from the serialized bytes, without rebuilding containers.
///
/// This reduces the amount of allocation and copying required during
/// deserialization, though `Portable` offers comparable performance.
/// It is not compatible with other roaring bitmap libraries.
pub enum Frozen {}

/// The ways a byte slice can fail to decode as a bitmap.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeserializeError {
    /// The input does not start with a recognized cookie.
    #[error("unexpected cookie {0:#x}")]
    UnexpectedCookie(u32),
    /// The input ended before the declared containers were read.
    #[error("input truncated: needed {needed} bytes, had {had}")]
    Truncated { needed: usize, had: usize },
    /// A structural check on the decoded containers failed.
    #[error("malformed bitmap: {0}")]
    Malformed(&'static str),
    /// Reading from the underlying stream failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
