use std::collections::HashSet;

use packet::{Packet, PacketCache};
use proptest::prelude::*;

#[derive(Packet, Debug, PartialEq, Clone, Copy)]
#[repr(i16)]
enum Grade {
    Low = -1,
    Mid = 0,
    High = 1,
}

#[derive(Packet, Debug, PartialEq, Clone)]
struct Leaf {
    key: String,
    weight: f64,
}

#[derive(Packet, Debug, PartialEq, Clone)]
struct Node {
    id: u64,
    name: String,
    grade: Grade,
    scores: Vec<i16>,
    flags: Vec<bool>,
    leaves: Vec<Leaf>,
    seen: HashSet<u32>,
    pair: (char, Vec<u8>),
}

fn grade() -> impl Strategy<Value = Grade> {
    prop_oneof![Just(Grade::Low), Just(Grade::Mid), Just(Grade::High)]
}

prop_compose! {
    fn leaf()(key in ".{0,12}", weight in -1.0e12f64..1.0e12) -> Leaf {
        Leaf { key, weight }
    }
}

prop_compose! {
    fn node()(
        id in any::<u64>(),
        name in "\\PC{0,16}",
        grade in grade(),
        scores in prop::collection::vec(any::<i16>(), 0..16),
        flags in prop::collection::vec(any::<bool>(), 0..8),
        leaves in prop::collection::vec(leaf(), 0..4),
        seen in prop::collection::hash_set(any::<u32>(), 0..8),
        pair in (any::<char>(), prop::collection::vec(any::<u8>(), 0..32)),
    ) -> Node {
        Node { id, name, grade, scores, flags, leaves, seen, pair }
    }
}

proptest! {
    #[test]
    fn records_roundtrip(value in node()) {
        let cache = PacketCache::new();
        let bytes = cache.serialize(&value).unwrap();
        prop_assert_eq!(cache.deserialize::<Node>(&bytes).unwrap(), value);
    }

    #[test]
    fn fixed_width_is_exact(value in any::<u64>(), cut in 0usize..8) {
        let cache = PacketCache::new();
        let bytes = cache.serialize(&value).unwrap();
        prop_assert_eq!(bytes.len(), 8);
        prop_assert_eq!(&bytes[..], &value.to_le_bytes()[..]);
        prop_assert!(cache.deserialize::<u64>(&bytes[..cut]).unwrap_err().is_overflow());
    }

    #[test]
    fn strided_decode_counts(raw in prop::collection::vec(any::<u8>(), 0..64)) {
        let cache = PacketCache::new();
        match cache.deserialize::<Vec<u32>>(&raw) {
            Ok(items) => {
                prop_assert_eq!(raw.len() % 4, 0);
                prop_assert_eq!(items.len(), raw.len() / 4);
            }
            Err(err) => {
                prop_assert_ne!(raw.len() % 4, 0);
                prop_assert!(err.is_overflow());
            }
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(raw in prop::collection::vec(any::<u8>(), 0..256)) {
        let cache = PacketCache::new();
        let _ = cache.deserialize::<Node>(&raw);
        let _ = cache.deserialize::<Vec<Leaf>>(&raw);
        let _ = cache.reader(&raw).field_names();
    }
}
