use corvid::{Bitmap, BitmapView, Frozen, Portable};
use proptest::prelude::*;

// borrowed and adapted from https://github.com/Nemo157/roaring-rs/blob/5089f180ca7e17db25f5c58023f4460d973e747f/tests/lib.rs#L7-L37
#[test]
fn smoke1() {
    let mut bitmap = Bitmap::new();
    assert_eq!(bitmap.cardinality(), 0);
    assert!(bitmap.is_empty());
    bitmap.remove(0);
    assert_eq!(bitmap.cardinality(), 0);
    assert!(bitmap.is_empty());
    bitmap.add(1);
    assert!(bitmap.contains(1));
    assert_eq!(bitmap.cardinality(), 1);
    assert!(!bitmap.is_empty());
    bitmap.add(u32::MAX - 2);
    assert!(bitmap.contains(u32::MAX - 2));
    assert_eq!(bitmap.cardinality(), 2);
    bitmap.add(u32::MAX);
    assert!(bitmap.contains(u32::MAX));
    assert_eq!(bitmap.cardinality(), 3);
    bitmap.add(2);
    assert!(bitmap.contains(2));
    assert_eq!(bitmap.cardinality(), 4);
    bitmap.remove(2);
    assert!(!bitmap.contains(2));
    assert_eq!(bitmap.cardinality(), 3);
    assert!(!bitmap.contains(0));
    assert!(bitmap.contains(1));
    assert!(!bitmap.contains(100));
    assert!(bitmap.contains(u32::MAX - 2));
    assert!(!bitmap.contains(u32::MAX - 1));
    assert!(bitmap.contains(u32::MAX));
    bitmap.clear();
    assert_eq!(bitmap.cardinality(), 0);
    assert!(bitmap.is_empty());
}

// borrowed and adapted from https://github.com/Bitmap/gocroaring/blob/4a2fc02f79b1c36b904301e7d052f7f0017b6973/gocroaring_test.go#L24-L64
#[test]
fn smoke2() {
    let mut rb1 = Bitmap::of(&[1, 2, 3, 4, 5, 100, 1000]);
    rb1.run_optimize();

    let mut rb2 = Bitmap::of(&[3, 4, 1000]);
    rb2.run_optimize();

    let mut rb3 = Bitmap::new();

    assert_eq!(rb1.cardinality(), 7);
    assert!(rb1.contains(3));

    rb1.and_inplace(&rb2);
    assert_eq!(rb1.to_vec(), [3, 4, 1000]);

    rb3.add(5);
    rb3.or_inplace(&rb1);
    assert_eq!(rb3.to_vec(), [3, 4, 5, 1000]);

    let rb4 = Bitmap::fast_or(&[&rb1, &rb2, &rb3]);
    assert_eq!(rb4.to_vec(), [3, 4, 5, 1000]);
}

#[test]
fn container_conversions_at_the_threshold() {
    // 4096 values fit an array container; one more forces a bitmap.
    let mut bitmap: Bitmap = (0..4096).collect();
    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_array_containers, 1);
    assert_eq!(statistics.n_bitmap_containers, 0);

    bitmap.add(4096);
    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_array_containers, 0);
    assert_eq!(statistics.n_bitmap_containers, 1);

    // Removing back below the threshold converts again.
    bitmap.remove(0);
    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_array_containers, 1);
    assert_eq!(bitmap.cardinality(), 4096);
}

#[test]
fn chunked_values_land_in_separate_containers() {
    let bitmap = Bitmap::of(&[1, 0x10001, 0x20001]);
    assert_eq!(bitmap.statistics().n_containers, 3);
    assert_eq!(bitmap.to_vec(), [1, 0x10001, 0x20001]);
}

#[test]
fn and_or_xor_across_disjoint_chunks() {
    let a = Bitmap::of(&[1, 0x10001]);
    let b = Bitmap::of(&[2, 0x10001]);

    assert_eq!(a.and(&b).cardinality(), 1);
    assert_eq!(a.or(&b).cardinality(), 3);
    assert_eq!(a.xor(&b).cardinality(), 2);
    assert_eq!(a.andnot(&b).to_vec(), [1]);

    let c = Bitmap::of(&[0x30001, 0x30002]);
    assert_eq!(a.and(&c).cardinality(), 0);
    assert_eq!(a.or(&c).cardinality(), 4);
    assert_eq!(a.xor(&c).cardinality(), 4);
}

#[test]
fn run_spanning_multiple_chunks() {
    let mut bitmap = Bitmap::new();
    bitmap.add_range(500..75000);
    bitmap.run_optimize();

    assert_eq!(bitmap.cardinality(), 75000 - 500);
    assert!(bitmap.contains_range(500..75000));
    assert!(!bitmap.contains(75000));
    assert!(!bitmap.contains(499));
    assert_eq!(bitmap.statistics().n_run_containers, 2);

    let mut other = Bitmap::new();
    other.add_range(74000..80000);
    let union = bitmap.or(&other);
    assert!(union.contains_range(500..80000));
    assert_eq!(union.cardinality(), 80000 - 500);
}

#[test]
fn flip_twice_is_identity() {
    let bitmap = Bitmap::of(&[1, 5, 100, 70000, u32::MAX]);
    assert_eq!(bitmap.flip(3..200_000).flip(3..200_000), bitmap);
    assert_eq!(bitmap.flip(..).flip(..), bitmap);
}

#[test]
fn flip_reports_complement_within_range() {
    let bitmap = Bitmap::of(&[0, 2, 4]);
    let flipped = bitmap.flip(0..6);
    assert_eq!(flipped.to_vec(), [1, 3, 5]);

    // Values outside the range are untouched.
    let bitmap = Bitmap::of(&[0, 100]);
    let flipped = bitmap.flip(0..2);
    assert_eq!(flipped.to_vec(), [1, 100]);
}

#[test]
fn absent_values_partition_the_range() {
    let bitmap = Bitmap::of(&[2, 4, 70000, 70002]);
    let absent: Vec<u32> =
        bitmap.flip(0..70004).iter().filter(|&v| v < 70004).collect();
    assert_eq!(absent.len() as u64 + bitmap.range_cardinality(0..70004), 70004);
    assert!(absent.iter().all(|&v| !bitmap.contains(v)));

    // Filling the gaps and flipping back restores the original.
    let mut filled = bitmap.clone();
    filled.add_many(&absent);
    assert!(filled.contains_range(0..70004));
    let mut restored = filled.flip(0..70004);
    restored.add_many(&[2, 4, 70000, 70002]);
    assert_eq!(restored, bitmap);
}

#[test]
fn rank_select_agree() {
    let bitmap = Bitmap::of(&[5, 70000, 200_000, u32::MAX]);
    for (i, value) in bitmap.iter().enumerate() {
        assert_eq!(bitmap.select(i as u32), Some(value));
        assert_eq!(bitmap.rank(value), i as u64 + 1);
    }
    assert_eq!(bitmap.select(4), None);
}

#[test]
fn run_optimize_preserves_contents() {
    let mut bitmap = Bitmap::new();
    bitmap.add_range(0..10_000);
    bitmap.add(1 << 20);
    let unoptimized = bitmap.clone();

    assert!(bitmap.run_optimize());
    assert_eq!(bitmap, unoptimized);
    assert!(bitmap.get_serialized_size_in_bytes::<Portable>()
        < unoptimized.get_serialized_size_in_bytes::<Portable>());

    assert!(bitmap.remove_run_compression());
    assert_eq!(bitmap, unoptimized);
}

#[test]
fn copy_on_write_clones_diverge() {
    let mut original = Bitmap::of(&[1, 2, 3]);
    original.set_copy_on_write(true);

    let mut copy = original.clone();
    copy.add(4);
    original.remove(1);

    assert_eq!(copy.to_vec(), [1, 2, 3, 4]);
    assert_eq!(original.to_vec(), [2, 3]);
}

#[test]
fn view_matches_owned_bitmap() {
    let mut bitmap = Bitmap::of(&[1, 5, 70000]);
    bitmap.add_range(200_000..210_000);
    bitmap.run_optimize();

    let portable = bitmap.serialize::<Portable>();
    let view = BitmapView::deserialize::<Portable>(&portable).unwrap();
    assert_eq!(view, bitmap);
    assert_eq!(view.cardinality(), bitmap.cardinality());
    assert!(view.contains(70000));
    assert!(!view.contains(70001));
    assert_eq!(view.minimum(), bitmap.minimum());
    assert_eq!(view.maximum(), bitmap.maximum());

    let frozen = bitmap.serialize::<Frozen>();
    let view = BitmapView::deserialize::<Frozen>(&frozen).unwrap();
    assert_eq!(view.to_bitmap(), bitmap);
}

#[test]
fn deserialize_rejects_garbage() {
    assert!(Bitmap::try_deserialize::<Portable>(b"").is_err());
    assert!(Bitmap::try_deserialize::<Portable>(b"asdf").is_err());
    assert!(Bitmap::try_deserialize::<Frozen>(b"12345678").is_err());

    // Truncated portable buffers fail rather than panic.
    let bytes = Bitmap::of(&[1, 2, 3, 70000]).serialize::<Portable>();
    for len in 0..bytes.len() {
        assert!(Bitmap::try_deserialize::<Portable>(&bytes[..len]).is_err());
    }
}

#[test]
fn iteration_both_directions() {
    let values = [0u32, 1, 63, 64, 99, 70000, 1 << 20, u32::MAX];
    let bitmap = Bitmap::of(&values);

    let forward: Vec<u32> = bitmap.iter().collect();
    assert_eq!(forward, values);

    let mut backward: Vec<u32> = bitmap.iter().rev().collect();
    backward.reverse();
    assert_eq!(backward, values);

    // Meet in the middle.
    let mut iter = bitmap.iter();
    assert_eq!(iter.next(), Some(0));
    assert_eq!(iter.next_back(), Some(u32::MAX));
    assert_eq!(iter.next_back(), Some(1 << 20));
    assert_eq!(iter.next(), Some(1));
    let rest: Vec<u32> = iter.collect();
    assert_eq!(rest, [63, 64, 99, 70000]);
}

proptest! {
    #[test]
    fn bitmap_cardinality_roundtrip(
        indices in prop::collection::vec(proptest::num::u32::ANY, 1..3000)
    ) {
        let original = Bitmap::of(&indices);
        let mut a = indices;
        a.sort_unstable();
        a.dedup();
        prop_assert_eq!(a.len(), original.cardinality() as usize);
        prop_assert_eq!(a, original.to_vec());
    }

    #[test]
    fn portable_serialization_roundtrip(
        indices in prop::collection::vec(proptest::num::u32::ANY, 1..3000)
    ) {
        let mut original = Bitmap::of(&indices);
        original.run_optimize();

        let buffer = original.serialize::<Portable>();
        prop_assert_eq!(buffer.len(), original.get_serialized_size_in_bytes::<Portable>());

        let deserialized = Bitmap::try_deserialize::<Portable>(&buffer).unwrap();
        prop_assert_eq!(&original, &deserialized);
        prop_assert!(deserialized.validate().is_ok());
    }

    #[test]
    fn frozen_serialization_roundtrip(
        indices in prop::collection::vec(proptest::num::u32::ANY, 1..3000)
    ) {
        let mut original = Bitmap::of(&indices);
        original.run_optimize();

        let buffer = original.serialize::<Frozen>();
        prop_assert_eq!(buffer.len(), original.get_serialized_size_in_bytes::<Frozen>());

        let view = BitmapView::deserialize::<Frozen>(&buffer).unwrap();
        prop_assert_eq!(view.cardinality(), original.cardinality());
        prop_assert_eq!(view.to_bitmap(), original);
    }

    #[test]
    fn set_algebra_laws(
        xs in prop::collection::vec(proptest::num::u32::ANY, 0..2000),
        ys in prop::collection::vec(proptest::num::u32::ANY, 0..2000),
    ) {
        let a = Bitmap::of(&xs);
        let b = Bitmap::of(&ys);

        // Commutativity
        prop_assert_eq!(a.and(&b), b.and(&a));
        prop_assert_eq!(a.or(&b), b.or(&a));
        prop_assert_eq!(a.xor(&b), b.xor(&a));

        // Xor as union minus intersection
        prop_assert_eq!(a.xor(&b), a.or(&b).andnot(&a.and(&b)));

        // Difference partitions the union
        let left = a.andnot(&b);
        let right = b.andnot(&a);
        let middle = a.and(&b);
        prop_assert_eq!(left.or(&right).or(&middle), a.or(&b));

        // Cardinality shortcuts agree with the materialized results
        prop_assert_eq!(a.and_cardinality(&b), a.and(&b).cardinality());
        prop_assert_eq!(a.or_cardinality(&b), a.or(&b).cardinality());
        prop_assert_eq!(a.xor_cardinality(&b), a.xor(&b).cardinality());
        prop_assert_eq!(a.andnot_cardinality(&b), a.andnot(&b).cardinality());
        prop_assert_eq!(a.intersect(&b), !a.and(&b).is_empty());
        prop_assert!(a.andnot(&b).is_subset(&a));
    }

    #[test]
    fn inplace_ops_match_value_forms(
        xs in prop::collection::vec(proptest::num::u32::ANY, 0..2000),
        ys in prop::collection::vec(proptest::num::u32::ANY, 0..2000),
    ) {
        let a = Bitmap::of(&xs);
        let b = Bitmap::of(&ys);

        let mut and = a.clone();
        and.and_inplace(&b);
        prop_assert_eq!(and, a.and(&b));

        let mut or = a.clone();
        or.or_inplace(&b);
        prop_assert_eq!(or, a.or(&b));

        let mut xor = a.clone();
        xor.xor_inplace(&b);
        prop_assert_eq!(xor, a.xor(&b));

        let mut andnot = a.clone();
        andnot.andnot_inplace(&b);
        prop_assert_eq!(andnot, a.andnot(&b));
    }

    #[test]
    fn aggregation_strategies_agree(
        xs in prop::collection::vec(proptest::num::u32::ANY, 0..500),
        ys in prop::collection::vec(proptest::num::u32::ANY, 0..500),
        zs in prop::collection::vec(proptest::num::u32::ANY, 0..500),
    ) {
        let a = Bitmap::of(&xs);
        let b = Bitmap::of(&ys);
        let c = Bitmap::of(&zs);
        let refs = [&a, &b, &c];

        let and = a.and(&b).and(&c);
        let or = a.or(&b).or(&c);
        let xor = a.xor(&b).xor(&c);

        prop_assert_eq!(Bitmap::fast_and(&refs), and.clone());
        prop_assert_eq!(Bitmap::par_and(&refs, 2), and);
        prop_assert_eq!(Bitmap::fast_or(&refs), or.clone());
        prop_assert_eq!(Bitmap::heap_or(&refs), or);
        prop_assert_eq!(Bitmap::fast_xor(&refs), xor.clone());
        prop_assert_eq!(Bitmap::heap_xor(&refs), xor);
    }

    #[test]
    fn flip_involution(
        xs in prop::collection::vec(proptest::num::u32::ANY, 0..1000),
        start in proptest::num::u32::ANY,
        len in 0u32..500_000,
    ) {
        let bitmap = Bitmap::of(&xs);
        let end = start.saturating_add(len);
        prop_assert_eq!(bitmap.flip(start..end).flip(start..end), bitmap);
    }

    #[test]
    fn absent_values_complement_present_ones(
        xs in prop::collection::vec(0u32..200_000, 0..1000),
        start in 0u32..150_000,
        len in 1u32..50_000,
    ) {
        let bitmap = Bitmap::of(&xs);
        let end = start + len;

        let absent: Vec<u32> = bitmap
            .flip(start..end)
            .iter()
            .filter(|v| (start..end).contains(v))
            .collect();
        let present: Vec<u32> = bitmap
            .iter()
            .filter(|v| (start..end).contains(v))
            .collect();
        prop_assert_eq!(absent.len() + present.len(), len as usize);
        prop_assert!(absent.iter().all(|&v| !bitmap.contains(v)));

        let mut filled = bitmap.clone();
        filled.add_many(&absent);
        prop_assert!(filled.contains_range(start..end));
        let mut restored = filled.flip(start..end);
        restored.add_many(&present);
        prop_assert_eq!(restored, bitmap);
    }

    #[test]
    fn run_optimized_equals_original(
        xs in prop::collection::vec(proptest::num::u32::ANY, 0..3000),
    ) {
        let original = Bitmap::of(&xs);
        let mut optimized = original.clone();
        optimized.run_optimize();
        prop_assert_eq!(&optimized, &original);

        let mut uncompressed = optimized.clone();
        uncompressed.remove_run_compression();
        prop_assert_eq!(uncompressed, original);
    }
}
