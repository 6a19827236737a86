//! N-ary aggregation strategies.
//!
//! All of these compute the same result as a pairwise left fold; they differ
//! in how they order the work. `fast_and` sorts its inputs once, the heap
//! variants repeatedly combine the two smallest operands, and `par_and`
//! fans per-chunk intersections out to a process-wide worker pool.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, OnceLock};
use std::thread;

use crossbeam_channel::{bounded, unbounded, Sender};

use super::Bitmap;
use crate::container::Container;

impl Bitmap {
    /// Intersection of all the given bitmaps.
    ///
    /// Inputs are folded in descending size order.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let a = Bitmap::of(&[1, 2, 3]);
    /// let b = Bitmap::of(&[2, 3, 4]);
    /// let c = Bitmap::of(&[3, 4, 5]);
    ///
    /// assert_eq!(Bitmap::fast_and(&[&a, &b, &c]).to_vec(), [3]);
    /// assert!(Bitmap::fast_and(&[]).is_empty());
    /// ```
    pub fn fast_and(bitmaps: &[&Bitmap]) -> Self {
        let Some((&first, rest)) = bitmaps.split_first() else {
            return Bitmap::new();
        };
        if rest.is_empty() {
            return first.clone();
        }
        let mut ordered: Vec<&Bitmap> = bitmaps.to_vec();
        ordered.sort_by_key(|b| Reverse(b.get_size_in_bytes()));
        let mut iter = ordered.into_iter();
        let mut result = iter.next().map(Bitmap::clone).unwrap_or_default();
        for bitmap in iter {
            if result.is_empty() {
                break;
            }
            result.and_inplace(bitmap);
        }
        result
    }

    /// Union of all the given bitmaps.
    ///
    /// Equivalent to [`Bitmap::heap_or`].
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let a = Bitmap::of(&[15]);
    /// let b = Bitmap::of(&[25]);
    ///
    /// assert_eq!(Bitmap::fast_or(&[&a, &b]).to_vec(), [15, 25]);
    /// ```
    #[inline]
    pub fn fast_or(bitmaps: &[&Bitmap]) -> Self {
        Self::heap_or(bitmaps)
    }

    /// Symmetric difference (xor) of all the given bitmaps.
    ///
    /// Equivalent to [`Bitmap::heap_xor`].
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let a = Bitmap::of(&[15, 25]);
    /// let b = Bitmap::of(&[25, 35]);
    /// let c = Bitmap::of(&[35, 45]);
    ///
    /// assert_eq!(Bitmap::fast_xor(&[&a, &b, &c]).to_vec(), [15, 45]);
    /// ```
    #[inline]
    pub fn fast_xor(bitmaps: &[&Bitmap]) -> Self {
        Self::heap_xor(bitmaps)
    }

    /// Union of all the given bitmaps, combining the two smallest operands
    /// first.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let a = Bitmap::of(&[15]);
    /// let b = Bitmap::of(&[25]);
    ///
    /// assert_eq!(Bitmap::heap_or(&[&a, &b]).to_vec(), [15, 25]);
    /// assert!(Bitmap::heap_or(&[]).is_empty());
    /// ```
    pub fn heap_or(bitmaps: &[&Bitmap]) -> Self {
        heap_combine(bitmaps, Bitmap::or_inplace)
    }

    /// Symmetric difference (xor) of all the given bitmaps, combining the
    /// two smallest operands first.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let a = Bitmap::of(&[15, 25]);
    /// let b = Bitmap::of(&[25, 35]);
    ///
    /// assert_eq!(Bitmap::heap_xor(&[&a, &b]).to_vec(), [15, 35]);
    /// ```
    pub fn heap_xor(bitmaps: &[&Bitmap]) -> Self {
        heap_combine(bitmaps, Bitmap::xor_inplace)
    }

    /// Intersection of all the given bitmaps, with per-chunk work spread
    /// over a shared worker pool.
    ///
    /// `parallelism` sizes the pool when it is first created anywhere in the
    /// process; `0` means one worker per available CPU. Later calls reuse
    /// the existing pool whatever their `parallelism` argument.
    ///
    /// # Examples
    ///
    /// ```
    /// use corvid::Bitmap;
    ///
    /// let a = Bitmap::of(&[1, 2, 3, 70000]);
    /// let b = Bitmap::of(&[2, 3, 4, 70000]);
    ///
    /// assert_eq!(Bitmap::par_and(&[&a, &b], 0).to_vec(), [2, 3, 70000]);
    /// assert_eq!(Bitmap::par_and(&[&a, &b], 0), a.and(&b));
    /// ```
    pub fn par_and(bitmaps: &[&Bitmap], parallelism: usize) -> Self {
        let Some((&first, rest)) = bitmaps.split_first() else {
            return Bitmap::new();
        };
        if rest.is_empty() {
            return first.clone();
        }

        let pool = worker_pool(parallelism);
        let (result_tx, result_rx) = unbounded();

        // Chunk keys must appear in every input to contribute.
        let mut cursors = vec![0usize; rest.len()];
        let mut submitted = 0usize;
        'keys: for i in 0..first.index.len() {
            let chunk = first.index.key_at(i);
            let mut containers = Vec::with_capacity(bitmaps.len());
            containers.push(first.index.shared_at(i));
            for (bitmap, cursor) in rest.iter().zip(cursors.iter_mut()) {
                *cursor = bitmap.index.advance_until(chunk, *cursor);
                if *cursor == bitmap.index.len() || bitmap.index.key_at(*cursor) != chunk {
                    continue 'keys;
                }
                containers.push(bitmap.index.shared_at(*cursor));
            }
            // Workers never block sending results (unbounded channel), so
            // blocking here until the task queue drains cannot deadlock.
            if pool
                .send(Task {
                    chunk,
                    containers,
                    result: result_tx.clone(),
                })
                .is_err()
            {
                break;
            }
            submitted += 1;
        }
        drop(result_tx);

        let mut chunks: Vec<(u16, Container)> = Vec::with_capacity(submitted);
        while let Ok(result) = result_rx.recv() {
            chunks.push(result);
        }
        chunks.sort_unstable_by_key(|&(chunk, _)| chunk);

        let mut result = Bitmap::new();
        for (chunk, container) in chunks {
            if !container.is_empty() {
                result.index.push(chunk, Arc::new(container));
            }
        }
        result
    }
}

enum Operand<'a> {
    Borrowed(&'a Bitmap),
    Owned(Bitmap),
}

/// Min-heap entry: ordered by size estimate, with an insertion counter so
/// the bitmaps themselves never need comparing.
struct HeapEntry<'a> {
    size: Reverse<u64>,
    tiebreak: Reverse<usize>,
    operand: Operand<'a>,
}

impl PartialEq for HeapEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        (self.size, self.tiebreak) == (other.size, other.tiebreak)
    }
}

impl Eq for HeapEntry<'_> {}

impl PartialOrd for HeapEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry<'_> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.size, self.tiebreak).cmp(&(other.size, other.tiebreak))
    }
}

fn heap_combine(bitmaps: &[&Bitmap], combine: fn(&mut Bitmap, &Bitmap)) -> Bitmap {
    let Some((&first, rest)) = bitmaps.split_first() else {
        return Bitmap::new();
    };
    if rest.is_empty() {
        return first.clone();
    }

    let mut heap: BinaryHeap<HeapEntry> = bitmaps
        .iter()
        .enumerate()
        .map(|(i, &b)| HeapEntry {
            size: Reverse(b.get_size_in_bytes()),
            tiebreak: Reverse(i),
            operand: Operand::Borrowed(b),
        })
        .collect();
    let mut tiebreak = bitmaps.len();

    while heap.len() > 1 {
        let a = heap.pop().unwrap_or_else(|| unreachable!()).operand;
        let b = heap.pop().unwrap_or_else(|| unreachable!()).operand;
        let combined = match (a, b) {
            (Operand::Owned(mut owned), Operand::Borrowed(borrowed))
            | (Operand::Borrowed(borrowed), Operand::Owned(mut owned)) => {
                combine(&mut owned, borrowed);
                owned
            }
            (Operand::Owned(mut owned), Operand::Owned(other)) => {
                combine(&mut owned, &other);
                owned
            }
            (Operand::Borrowed(a), Operand::Borrowed(b)) => {
                let mut owned = a.clone();
                combine(&mut owned, b);
                owned
            }
        };
        tiebreak += 1;
        heap.push(HeapEntry {
            size: Reverse(combined.get_size_in_bytes()),
            tiebreak: Reverse(tiebreak),
            operand: Operand::Owned(combined),
        });
    }

    match heap.pop().map(|entry| entry.operand) {
        Some(Operand::Owned(result)) => result,
        Some(Operand::Borrowed(result)) => result.clone(),
        None => Bitmap::new(),
    }
}

struct Task {
    chunk: u16,
    containers: Vec<Arc<Container>>,
    result: Sender<(u16, Container)>,
}

/// Sender side of the process-wide task queue, started on first use.
static POOL: OnceLock<Sender<Task>> = OnceLock::new();

fn worker_pool(parallelism: usize) -> &'static Sender<Task> {
    POOL.get_or_init(|| {
        let workers = match parallelism {
            0 => thread::available_parallelism().map_or(1, |n| n.get()),
            n => n,
        };
        let (tx, rx) = bounded::<Task>(workers * 2);
        for i in 0..workers {
            let rx = rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("corvid-and-{i}"))
                .spawn(move || {
                    for task in rx.iter() {
                        let mut containers = task.containers.iter();
                        let mut acc = match (containers.next(), containers.next()) {
                            (Some(a), Some(b)) => a.and(b),
                            _ => continue,
                        };
                        for container in containers {
                            if acc.is_empty() {
                                break;
                            }
                            acc.and_inplace(container);
                        }
                        let _ = task.result.send((task.chunk, acc));
                    }
                });
            debug_assert!(spawned.is_ok());
        }
        tx
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> Vec<Bitmap> {
        vec![
            Bitmap::of(&[1, 2, 3, 70000, 1 << 20]),
            Bitmap::of(&[2, 3, 4, 70000]),
            (0..2000).collect(),
        ]
    }

    #[test]
    fn strategies_agree_with_pairwise_fold() {
        let bitmaps = inputs();
        let refs: Vec<&Bitmap> = bitmaps.iter().collect();

        let mut and_fold = bitmaps[0].clone();
        let mut or_fold = bitmaps[0].clone();
        let mut xor_fold = bitmaps[0].clone();
        for b in &bitmaps[1..] {
            and_fold.and_inplace(b);
            or_fold.or_inplace(b);
            xor_fold.xor_inplace(b);
        }

        assert_eq!(Bitmap::fast_and(&refs), and_fold);
        assert_eq!(Bitmap::par_and(&refs, 2), and_fold);
        assert_eq!(Bitmap::fast_or(&refs), or_fold);
        assert_eq!(Bitmap::heap_or(&refs), or_fold);
        assert_eq!(Bitmap::fast_xor(&refs), xor_fold);
        assert_eq!(Bitmap::heap_xor(&refs), xor_fold);
    }

    #[test]
    fn order_does_not_matter() {
        let bitmaps = inputs();
        let forward: Vec<&Bitmap> = bitmaps.iter().collect();
        let backward: Vec<&Bitmap> = bitmaps.iter().rev().collect();

        assert_eq!(Bitmap::fast_and(&forward), Bitmap::fast_and(&backward));
        assert_eq!(Bitmap::heap_or(&forward), Bitmap::heap_or(&backward));
        assert_eq!(Bitmap::heap_xor(&forward), Bitmap::heap_xor(&backward));
        assert_eq!(Bitmap::par_and(&forward, 2), Bitmap::par_and(&backward, 2));
    }

    #[test]
    fn degenerate_inputs() {
        assert!(Bitmap::fast_and(&[]).is_empty());
        assert!(Bitmap::heap_or(&[]).is_empty());
        assert!(Bitmap::heap_xor(&[]).is_empty());
        assert!(Bitmap::par_and(&[], 1).is_empty());

        let single = Bitmap::of(&[1, 70000]);
        assert_eq!(Bitmap::fast_and(&[&single]), single);
        assert_eq!(Bitmap::heap_or(&[&single]), single);
        assert_eq!(Bitmap::par_and(&[&single], 1), single);
    }

    #[test]
    fn par_and_disjoint_chunks_is_empty() {
        let a = Bitmap::of(&[1, 2]);
        let b = Bitmap::of(&[70000, 70001]);
        assert!(Bitmap::par_and(&[&a, &b], 2).is_empty());
    }
}
