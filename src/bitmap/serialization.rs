//! Wire formats.
//!
//! `Portable` follows the interoperable roaring format
//! (<https://github.com/RoaringBitmap/RoaringFormatSpec>): a cookie header,
//! per-container descriptive headers (key and cardinality minus one), offsets
//! into the payload area, and container payloads, all little-endian.
//!
//! `Frozen` is this crate's zero-copy layout: container payloads first, then
//! keys, counts, and typecodes, with the count and cookie at the very end so
//! the whole header can be found from the tail of the buffer.

use std::io::{self, Read, Write};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::view::ContainerRef;
use super::{Bitmap, BitmapView};
use crate::container::{ArrayStore, BitmapStore, Container, Rle, RunStore, ARRAY_LIMIT, BITMAP_LENGTH};
use crate::serialization::{DeserializeError, Frozen, Portable};

/// Cookie announcing at least one run container follows (low 16 bits).
const SERIAL_COOKIE: u16 = 12347;
/// Cookie of a bitmap without run containers.
const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;
/// With run containers present, offsets are written only at or above this
/// container count.
const NO_OFFSET_THRESHOLD: usize = 4;

/// Trailing cookie of the frozen format.
const FROZEN_COOKIE: u32 = 13532;

const FROZEN_ARRAY: u8 = 1;
const FROZEN_BITMAP: u8 = 2;
const FROZEN_RUN: u8 = 3;

pub trait Serializer {
    /// Serialize a bitmap to bytes, appending to `dst`. Returns the bytes
    /// just written.
    fn serialize_into<'a>(bitmap: &Bitmap, dst: &'a mut Vec<u8>) -> &'a [u8];
    /// The exact number of bytes `serialize_into` will append.
    fn get_serialized_size_in_bytes(bitmap: &Bitmap) -> usize;
    /// Serialize a bitmap directly to a writer. The bytes written are
    /// identical to the buffer form.
    fn write_to<W: Write>(bitmap: &Bitmap, dst: W) -> io::Result<()>;
}

pub trait Deserializer {
    /// Decode a bitmap from bytes, validating the structure.
    fn try_deserialize(buffer: &[u8]) -> Result<Bitmap, DeserializeError>;
    /// Decode a bitmap from a reader.
    fn read_from<R: Read>(src: R) -> Result<Bitmap, DeserializeError>;
}

pub trait ViewDeserializer {
    /// Build a zero-copy [`BitmapView`] over serialized bytes.
    fn deserialize_view(data: &[u8]) -> Result<BitmapView<'_>, DeserializeError>;
}

impl Serializer for Portable {
    fn serialize_into<'a>(bitmap: &Bitmap, dst: &'a mut Vec<u8>) -> &'a [u8] {
        let start = dst.len();
        dst.reserve(Self::get_serialized_size_in_bytes(bitmap));
        // Writing to a Vec cannot fail.
        write_portable(bitmap, dst).unwrap_or_else(|_| unreachable!());
        &dst[start..]
    }

    fn get_serialized_size_in_bytes(bitmap: &Bitmap) -> usize {
        portable_header_len(bitmap)
            + bitmap
                .index
                .iter()
                .map(|(_, c)| c.portable_len())
                .sum::<usize>()
    }

    fn write_to<W: Write>(bitmap: &Bitmap, mut dst: W) -> io::Result<()> {
        write_portable(bitmap, &mut dst)
    }
}

impl Deserializer for Portable {
    fn try_deserialize(buffer: &[u8]) -> Result<Bitmap, DeserializeError> {
        let mut cursor = io::Cursor::new(buffer);
        let bitmap = read_portable(&mut cursor)?;
        if cursor.position() != buffer.len() as u64 {
            return Err(DeserializeError::Malformed(
                "trailing bytes after the last container",
            ));
        }
        Ok(bitmap)
    }

    fn read_from<R: Read>(mut src: R) -> Result<Bitmap, DeserializeError> {
        read_portable(&mut src)
    }
}

impl ViewDeserializer for Portable {
    fn deserialize_view(data: &[u8]) -> Result<BitmapView<'_>, DeserializeError> {
        view_portable(data)
    }
}

impl Serializer for Frozen {
    fn serialize_into<'a>(bitmap: &Bitmap, dst: &'a mut Vec<u8>) -> &'a [u8] {
        let start = dst.len();
        dst.reserve(Self::get_serialized_size_in_bytes(bitmap));
        write_frozen(bitmap, dst).unwrap_or_else(|_| unreachable!());
        &dst[start..]
    }

    fn get_serialized_size_in_bytes(bitmap: &Bitmap) -> usize {
        let payloads: usize = bitmap
            .index
            .iter()
            .map(|(_, c)| frozen_payload_len(c))
            .sum();
        payloads + 5 * bitmap.index.len() + 8
    }

    fn write_to<W: Write>(bitmap: &Bitmap, mut dst: W) -> io::Result<()> {
        write_frozen(bitmap, &mut dst)
    }
}

impl Deserializer for Frozen {
    fn try_deserialize(buffer: &[u8]) -> Result<Bitmap, DeserializeError> {
        Ok(Self::deserialize_view(buffer)?.to_bitmap())
    }

    fn read_from<R: Read>(mut src: R) -> Result<Bitmap, DeserializeError> {
        // The frozen header sits at the end of the stream, so buffer it all.
        let mut buffer = Vec::new();
        src.read_to_end(&mut buffer)?;
        Self::try_deserialize(&buffer)
    }
}

impl ViewDeserializer for Frozen {
    fn deserialize_view(data: &[u8]) -> Result<BitmapView<'_>, DeserializeError> {
        view_frozen(data)
    }
}

impl Bitmap {
    /// Serializes a bitmap to a slice of bytes in the given format.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, Portable};
    ///
    /// let original_bitmap = Bitmap::of(&[1, 2, 3, 4, 5]);
    ///
    /// let serialized_buffer = original_bitmap.serialize::<Portable>();
    ///
    /// let deserialized_bitmap = Bitmap::deserialize::<Portable>(&serialized_buffer);
    ///
    /// assert_eq!(original_bitmap, deserialized_bitmap);
    /// ```
    #[inline]
    pub fn serialize<S: Serializer>(&self) -> Vec<u8> {
        let mut dst = Vec::new();
        S::serialize_into(self, &mut dst);
        dst
    }

    /// Serializes a bitmap to a slice of bytes in the given format, appending
    /// to the provided vec. Returns the newly written bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, Portable};
    ///
    /// let original_bitmap = Bitmap::of(&[1, 2, 3, 4, 5]);
    ///
    /// let mut data = Vec::new();
    /// for _ in 0..2 {
    ///     original_bitmap.serialize_into::<Portable>(&mut data);
    /// }
    /// ```
    #[inline]
    pub fn serialize_into<'a, S: Serializer>(&self, dst: &'a mut Vec<u8>) -> &'a [u8] {
        S::serialize_into(self, dst)
    }

    /// The number of bytes `serialize` will produce in the given format.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, Portable};
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 3]);
    /// let buffer = bitmap.serialize::<Portable>();
    ///
    /// assert_eq!(buffer.len(), bitmap.get_serialized_size_in_bytes::<Portable>());
    /// ```
    #[inline]
    pub fn get_serialized_size_in_bytes<S: Serializer>(&self) -> usize {
        S::get_serialized_size_in_bytes(self)
    }

    /// Serializes a bitmap to a writer in the given format.
    ///
    /// The bytes written are identical to [`Bitmap::serialize`].
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, Portable};
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 3]);
    ///
    /// let mut out = Vec::new();
    /// bitmap.write_to::<_, Portable>(&mut out).unwrap();
    ///
    /// assert_eq!(out, bitmap.serialize::<Portable>());
    /// ```
    #[inline]
    pub fn write_to<W: Write, S: Serializer>(&self, dst: W) -> io::Result<()> {
        S::write_to(self, dst)
    }

    /// Given a serialized bitmap as a slice of bytes in the given format,
    /// returns a `Bitmap` instance, or an error describing why the bytes
    /// could not be decoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, Portable};
    ///
    /// let original_bitmap = Bitmap::of(&[1, 2, 3, 4, 5]);
    /// let serialized_buffer = original_bitmap.serialize::<Portable>();
    ///
    /// let deserialized_bitmap = Bitmap::try_deserialize::<Portable>(&serialized_buffer);
    /// assert_eq!(deserialized_bitmap.unwrap(), original_bitmap);
    ///
    /// assert!(Bitmap::try_deserialize::<Portable>(b"totally random").is_err());
    /// ```
    #[inline]
    pub fn try_deserialize<D: Deserializer>(buffer: &[u8]) -> Result<Self, DeserializeError> {
        D::try_deserialize(buffer)
    }

    /// Given a serialized bitmap as a slice of bytes in the given format,
    /// returns a `Bitmap` instance.
    ///
    /// # Panics
    ///
    /// Panics if the bytes are not a valid serialized bitmap; use
    /// [`Bitmap::try_deserialize`] for untrusted input.
    #[inline]
    pub fn deserialize<D: Deserializer>(buffer: &[u8]) -> Self {
        match D::try_deserialize(buffer) {
            Ok(bitmap) => bitmap,
            Err(e) => panic!("failed to deserialize bitmap: {e}"),
        }
    }

    /// Reads a bitmap from a reader in the given format.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::{Bitmap, Portable};
    ///
    /// let bitmap = Bitmap::of(&[1, 2, 3]);
    /// let buffer = bitmap.serialize::<Portable>();
    ///
    /// let read_back = Bitmap::read_from::<_, Portable>(&buffer[..]).unwrap();
    /// assert_eq!(read_back, bitmap);
    /// ```
    #[inline]
    pub fn read_from<R: Read, D: Deserializer>(src: R) -> Result<Self, DeserializeError> {
        D::read_from(src)
    }
}

fn portable_header_len(bitmap: &Bitmap) -> usize {
    let n = bitmap.index.len();
    if bitmap.index.has_run_container() {
        let offsets = if n >= NO_OFFSET_THRESHOLD { 4 * n } else { 0 };
        4 + (n + 7) / 8 + 4 * n + offsets
    } else {
        8 + 4 * n + 4 * n
    }
}

fn write_portable<W: Write>(bitmap: &Bitmap, dst: &mut W) -> io::Result<()> {
    let index = &bitmap.index;
    let n = index.len();
    let has_run = index.has_run_container();

    if has_run {
        dst.write_u16::<LittleEndian>(SERIAL_COOKIE)?;
        dst.write_u16::<LittleEndian>((n - 1) as u16)?;
        let mut run_bits = vec![0u8; (n + 7) / 8];
        for (i, (_, container)) in index.iter().enumerate() {
            if matches!(**container, Container::Run(_)) {
                run_bits[i / 8] |= 1 << (i % 8);
            }
        }
        dst.write_all(&run_bits)?;
    } else {
        dst.write_u32::<LittleEndian>(SERIAL_COOKIE_NO_RUNCONTAINER)?;
        dst.write_u32::<LittleEndian>(n as u32)?;
    }

    for (key, container) in index.iter() {
        dst.write_u16::<LittleEndian>(key)?;
        dst.write_u16::<LittleEndian>((container.cardinality() - 1) as u16)?;
    }

    if !has_run || n >= NO_OFFSET_THRESHOLD {
        let mut offset = portable_header_len(bitmap);
        for (_, container) in index.iter() {
            dst.write_u32::<LittleEndian>(offset as u32)?;
            offset += container.portable_len();
        }
    }

    for (_, container) in index.iter() {
        match &**container {
            Container::Array(array) => {
                for &value in array.as_slice() {
                    dst.write_u16::<LittleEndian>(value)?;
                }
            }
            Container::Bitmap(bits) => {
                for &word in bits.as_words().iter() {
                    dst.write_u64::<LittleEndian>(word)?;
                }
            }
            Container::Run(runs) => {
                dst.write_u16::<LittleEndian>(runs.num_runs() as u16)?;
                for run in runs.runs() {
                    dst.write_u16::<LittleEndian>(run.start)?;
                    dst.write_u16::<LittleEndian>(run.len)?;
                }
            }
        }
    }
    Ok(())
}

fn read_portable<R: Read>(src: &mut R) -> Result<Bitmap, DeserializeError> {
    let cookie = src.read_u32::<LittleEndian>()?;
    let (n, run_bits) = if cookie & 0xFFFF == u32::from(SERIAL_COOKIE) {
        let n = (cookie >> 16) as usize + 1;
        let mut bits = vec![0u8; (n + 7) / 8];
        src.read_exact(&mut bits)?;
        (n, Some(bits))
    } else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
        let n = src.read_u32::<LittleEndian>()? as usize;
        if n > 1 << 16 {
            return Err(DeserializeError::Malformed("container count out of range"));
        }
        (n, None)
    } else {
        return Err(DeserializeError::UnexpectedCookie(cookie));
    };

    let mut keys = Vec::with_capacity(n);
    let mut cardinalities = Vec::with_capacity(n);
    for _ in 0..n {
        let key = src.read_u16::<LittleEndian>()?;
        if keys.last().is_some_and(|&last| key <= last) {
            return Err(DeserializeError::Malformed("chunk keys not ascending"));
        }
        keys.push(key);
        cardinalities.push(u64::from(src.read_u16::<LittleEndian>()?) + 1);
    }

    let has_offsets = run_bits.is_none() || n >= NO_OFFSET_THRESHOLD;
    let mut offsets = Vec::with_capacity(if has_offsets { n } else { 0 });
    if has_offsets {
        for _ in 0..n {
            offsets.push(src.read_u32::<LittleEndian>()? as usize);
        }
    }

    let header_len = {
        let base = match &run_bits {
            Some(bits) => 4 + bits.len(),
            None => 8,
        };
        base + 4 * n + if has_offsets { 4 * n } else { 0 }
    };

    let mut bitmap = Bitmap::new();
    let mut position = header_len;
    for i in 0..n {
        if has_offsets && offsets[i] != position {
            return Err(DeserializeError::Malformed("container offset mismatch"));
        }
        let is_run = run_bits
            .as_ref()
            .is_some_and(|bits| bits[i / 8] & (1 << (i % 8)) != 0);
        let cardinality = cardinalities[i];

        let container = if is_run {
            let n_runs = src.read_u16::<LittleEndian>()? as usize;
            let mut runs = Vec::with_capacity(n_runs);
            let mut next_valid_start = 0u32;
            for _ in 0..n_runs {
                let start = src.read_u16::<LittleEndian>()?;
                let len = src.read_u16::<LittleEndian>()?;
                if u32::from(start) < next_valid_start
                    || u32::from(start) + u32::from(len) > u32::from(u16::MAX)
                {
                    return Err(DeserializeError::Malformed(
                        "run container intervals invalid",
                    ));
                }
                next_valid_start = u32::from(start) + u32::from(len) + 2;
                runs.push(Rle { start, len });
            }
            position += 2 + 4 * n_runs;
            let store = RunStore::from_runs(runs);
            if store.cardinality() != cardinality {
                return Err(DeserializeError::Malformed(
                    "run container does not match its declared cardinality",
                ));
            }
            Container::Run(store)
        } else if cardinality <= ARRAY_LIMIT {
            let mut values = Vec::with_capacity(cardinality as usize);
            for _ in 0..cardinality {
                let value = src.read_u16::<LittleEndian>()?;
                if values.last().is_some_and(|&last| value <= last) {
                    return Err(DeserializeError::Malformed(
                        "array container values not sorted",
                    ));
                }
                values.push(value);
            }
            position += 2 * cardinality as usize;
            Container::Array(ArrayStore::from_sorted(values))
        } else {
            let mut words = Box::new([0u64; BITMAP_LENGTH]);
            for word in words.iter_mut() {
                *word = src.read_u64::<LittleEndian>()?;
            }
            position += 8 * BITMAP_LENGTH;
            let store = BitmapStore::from_words(words);
            if store.cardinality() != cardinality {
                return Err(DeserializeError::Malformed(
                    "bitmap container does not match its declared cardinality",
                ));
            }
            Container::Bitmap(store)
        };

        container
            .check_invariants()
            .map_err(DeserializeError::Malformed)?;
        bitmap.index.push(keys[i], Arc::new(container));
    }
    Ok(bitmap)
}

fn view_portable(data: &[u8]) -> Result<BitmapView<'_>, DeserializeError> {
    let mut cursor = io::Cursor::new(data);
    let src = &mut cursor;
    let cookie = src.read_u32::<LittleEndian>()?;
    let (n, run_bits_at) = if cookie & 0xFFFF == u32::from(SERIAL_COOKIE) {
        let n = (cookie >> 16) as usize + 1;
        let at = src.position() as usize;
        let bytes = (n + 7) / 8;
        require(data, at + bytes)?;
        src.set_position((at + bytes) as u64);
        (n, Some(at))
    } else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
        let n = src.read_u32::<LittleEndian>()? as usize;
        if n > 1 << 16 {
            return Err(DeserializeError::Malformed("container count out of range"));
        }
        (n, None)
    } else {
        return Err(DeserializeError::UnexpectedCookie(cookie));
    };

    let headers_at = src.position() as usize;
    let has_offsets = run_bits_at.is_none() || n >= NO_OFFSET_THRESHOLD;
    let offsets_len = if has_offsets { 4 * n } else { 0 };
    let payload_at = headers_at + 4 * n + offsets_len;
    require(data, payload_at)?;

    let mut entries = Vec::with_capacity(n);
    let mut position = payload_at;
    let mut prev_key = None;
    for i in 0..n {
        let key = read_u16_at(data, headers_at + 4 * i);
        if prev_key.is_some_and(|last| key <= last) {
            return Err(DeserializeError::Malformed("chunk keys not ascending"));
        }
        prev_key = Some(key);
        let cardinality = usize::from(read_u16_at(data, headers_at + 4 * i + 2)) + 1;
        let is_run =
            run_bits_at.is_some_and(|at| data[at + i / 8] & (1 << (i % 8)) != 0);

        let container = if is_run {
            require(data, position + 2)?;
            let n_runs = usize::from(read_u16_at(data, position));
            require(data, position + 2 + 4 * n_runs)?;
            let refr = ContainerRef::Run(&data[position + 2..position + 2 + 4 * n_runs]);
            position += 2 + 4 * n_runs;
            refr
        } else if cardinality as u64 <= ARRAY_LIMIT {
            require(data, position + 2 * cardinality)?;
            let refr = ContainerRef::Array(&data[position..position + 2 * cardinality]);
            position += 2 * cardinality;
            refr
        } else {
            require(data, position + 8 * BITMAP_LENGTH)?;
            let refr = ContainerRef::Bitmap(&data[position..position + 8 * BITMAP_LENGTH]);
            position += 8 * BITMAP_LENGTH;
            refr
        };
        if container.cardinality() != cardinality as u64 {
            return Err(DeserializeError::Malformed(
                "container does not match its declared cardinality",
            ));
        }
        entries.push((key, container));
    }
    if position != data.len() {
        return Err(DeserializeError::Malformed(
            "trailing bytes after the last container",
        ));
    }
    Ok(BitmapView::from_entries(entries))
}

fn frozen_payload_len(container: &Container) -> usize {
    match container {
        Container::Array(array) => 2 * array.cardinality() as usize,
        Container::Bitmap(_) => 8 * BITMAP_LENGTH,
        Container::Run(runs) => 4 * runs.num_runs(),
    }
}

fn write_frozen<W: Write>(bitmap: &Bitmap, dst: &mut W) -> io::Result<()> {
    let index = &bitmap.index;

    for (_, container) in index.iter() {
        match &**container {
            Container::Array(array) => {
                for &value in array.as_slice() {
                    dst.write_u16::<LittleEndian>(value)?;
                }
            }
            Container::Bitmap(bits) => {
                for &word in bits.as_words().iter() {
                    dst.write_u64::<LittleEndian>(word)?;
                }
            }
            Container::Run(runs) => {
                for run in runs.runs() {
                    dst.write_u16::<LittleEndian>(run.start)?;
                    dst.write_u16::<LittleEndian>(run.len)?;
                }
            }
        }
    }
    for (key, _) in index.iter() {
        dst.write_u16::<LittleEndian>(key)?;
    }
    for (_, container) in index.iter() {
        let count = match &**container {
            Container::Run(runs) => runs.num_runs() as u16,
            c => (c.cardinality() - 1) as u16,
        };
        dst.write_u16::<LittleEndian>(count)?;
    }
    for (_, container) in index.iter() {
        let typecode = match &**container {
            Container::Array(_) => FROZEN_ARRAY,
            Container::Bitmap(_) => FROZEN_BITMAP,
            Container::Run(_) => FROZEN_RUN,
        };
        dst.write_u8(typecode)?;
    }
    dst.write_u32::<LittleEndian>(index.len() as u32)?;
    dst.write_u32::<LittleEndian>(FROZEN_COOKIE)?;
    Ok(())
}

fn view_frozen(data: &[u8]) -> Result<BitmapView<'_>, DeserializeError> {
    if data.len() < 8 {
        return Err(DeserializeError::Truncated {
            needed: 8,
            had: data.len(),
        });
    }
    let cookie = read_u32_at(data, data.len() - 4);
    if cookie != FROZEN_COOKIE {
        return Err(DeserializeError::UnexpectedCookie(cookie));
    }
    let n = read_u32_at(data, data.len() - 8) as usize;
    let header_len = 5 * n + 8;
    if data.len() < header_len {
        return Err(DeserializeError::Truncated {
            needed: header_len,
            had: data.len(),
        });
    }
    let payload = &data[..data.len() - header_len];
    let keys_at = data.len() - header_len;
    let counts_at = keys_at + 2 * n;
    let typecodes_at = counts_at + 2 * n;

    let mut entries = Vec::with_capacity(n);
    let mut position = 0;
    let mut prev_key = None;
    for i in 0..n {
        let key = read_u16_at(data, keys_at + 2 * i);
        if prev_key.is_some_and(|last| key <= last) {
            return Err(DeserializeError::Malformed("chunk keys not ascending"));
        }
        prev_key = Some(key);
        let count = usize::from(read_u16_at(data, counts_at + 2 * i));
        let typecode = data[typecodes_at + i];
        let len = match typecode {
            FROZEN_ARRAY => 2 * (count + 1),
            FROZEN_BITMAP => 8 * BITMAP_LENGTH,
            FROZEN_RUN => 4 * count,
            _ => return Err(DeserializeError::Malformed("unknown container typecode")),
        };
        if payload.len() < position + len {
            return Err(DeserializeError::Truncated {
                needed: header_len + position + len,
                had: data.len(),
            });
        }
        let bytes = &payload[position..position + len];
        let container = match typecode {
            FROZEN_ARRAY => ContainerRef::Array(bytes),
            FROZEN_BITMAP => ContainerRef::Bitmap(bytes),
            _ => ContainerRef::Run(bytes),
        };
        entries.push((key, container));
        position += len;
    }
    if position != payload.len() {
        return Err(DeserializeError::Malformed(
            "payload length does not match the header",
        ));
    }
    Ok(BitmapView::from_entries(entries))
}

fn require(data: &[u8], needed: usize) -> Result<(), DeserializeError> {
    if data.len() < needed {
        Err(DeserializeError::Truncated {
            needed,
            had: data.len(),
        })
    } else {
        Ok(())
    }
}

#[inline]
fn read_u16_at(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

#[inline]
fn read_u32_at(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bitmap_round_trips() {
        let bitmap = Bitmap::new();
        let bytes = bitmap.serialize::<Portable>();
        assert_eq!(bytes.len(), 8);
        assert_eq!(Bitmap::try_deserialize::<Portable>(&bytes).unwrap(), bitmap);
    }

    #[test]
    fn no_run_layout() {
        let bitmap = Bitmap::of(&[1, 2, 70000]);
        let bytes = bitmap.serialize::<Portable>();
        // cookie + count + 2 headers + 2 offsets + 3 values
        assert_eq!(bytes.len(), 8 + 8 + 8 + 6);
        assert_eq!(read_u32_at(&bytes, 0), SERIAL_COOKIE_NO_RUNCONTAINER);
        assert_eq!(read_u32_at(&bytes, 4), 2);
        assert_eq!(Bitmap::try_deserialize::<Portable>(&bytes).unwrap(), bitmap);
    }

    #[test]
    fn run_layout_omits_offsets_below_threshold() {
        let mut bitmap = Bitmap::new();
        bitmap.add_range(10..1000);
        bitmap.run_optimize();
        let bytes = bitmap.serialize::<Portable>();
        // cookie half, count-1 half, 1 bitset byte, 1 header, no offsets,
        // then n_runs and one run
        assert_eq!(bytes.len(), 4 + 1 + 4 + 2 + 4);
        assert_eq!(u32::from(read_u16_at(&bytes, 0)), u32::from(SERIAL_COOKIE));
        assert_eq!(Bitmap::try_deserialize::<Portable>(&bytes).unwrap(), bitmap);
    }

    #[test]
    fn rejects_bad_cookie() {
        let err = Bitmap::try_deserialize::<Portable>(&[9, 9, 9, 9]).unwrap_err();
        assert!(matches!(err, DeserializeError::UnexpectedCookie(_)));
    }

    #[test]
    fn rejects_unsorted_array_payload() {
        let bitmap = Bitmap::of(&[1, 2, 3]);
        let mut bytes = bitmap.serialize::<Portable>();
        let len = bytes.len();
        // Swap the last two array values.
        bytes.swap(len - 4, len - 2);
        bytes.swap(len - 3, len - 1);
        assert!(Bitmap::try_deserialize::<Portable>(&bytes).is_err());
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bitmap = Bitmap::of(&[1, 2, 70000]);
        bitmap.add_range(1000..3000);
        bitmap.run_optimize();

        let mut bytes = bitmap.serialize::<Portable>();
        bytes.extend_from_slice(&[0xAB; 7]);
        assert!(matches!(
            Bitmap::try_deserialize::<Portable>(&bytes).unwrap_err(),
            DeserializeError::Malformed(_)
        ));
        assert!(matches!(
            BitmapView::deserialize::<Portable>(&bytes).unwrap_err(),
            DeserializeError::Malformed(_)
        ));

        // The stream form stops at the end of the bitmap and leaves the rest.
        let back = Bitmap::read_from::<_, Portable>(&bytes[..]).unwrap();
        assert_eq!(back, bitmap);
    }

    #[test]
    fn stream_and_buffer_forms_agree() {
        let mut bitmap = Bitmap::of(&[1, 5, 70000, u32::MAX]);
        bitmap.add_range(1000..3000);
        bitmap.run_optimize();

        let buffer = bitmap.serialize::<Portable>();
        let mut streamed = Vec::new();
        bitmap.write_to::<_, Portable>(&mut streamed).unwrap();
        assert_eq!(buffer, streamed);

        let back = Bitmap::read_from::<_, Portable>(&streamed[..]).unwrap();
        assert_eq!(back, bitmap);
    }

    #[test]
    fn frozen_round_trips_all_container_kinds() {
        let mut bitmap = Bitmap::of(&[1, 2, 70000]);
        bitmap.add_range(200_000..210_000);
        let mut sparse_bitmap: Bitmap = (0..u32::from(u16::MAX)).step_by(2).collect();
        sparse_bitmap.or_inplace(&bitmap);
        sparse_bitmap.run_optimize();

        let bytes = sparse_bitmap.serialize::<Frozen>();
        assert_eq!(
            bytes.len(),
            sparse_bitmap.get_serialized_size_in_bytes::<Frozen>()
        );
        let back = Bitmap::try_deserialize::<Frozen>(&bytes).unwrap();
        assert_eq!(back, sparse_bitmap);
    }

    #[test]
    fn frozen_rejects_truncation() {
        let bitmap = Bitmap::of(&[1, 2, 3]);
        let bytes = bitmap.serialize::<Frozen>();
        for len in 0..bytes.len() {
            assert!(Bitmap::try_deserialize::<Frozen>(&bytes[..len]).is_err());
        }
    }
}
