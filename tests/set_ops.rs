use patricia_set::{NoBitmap, PatriciaSet};

#[test]
fn empty_set_contains_nothing() {
    let set = PatriciaSet::<u32, u64>::new();
    assert!(set.is_empty());
    assert!(!set.contains(0));
    assert!(!set.contains(u32::MAX));
}

#[test]
fn inserted_keys_are_members() {
    let mut set = PatriciaSet::<u32, u64>::new();
    for key in [0u32, 7, 63, 64, 1_000_000, u32::MAX] {
        assert_eq!(set.insert(key), Ok(true));
        assert!(set.contains(key));
        assert!(!set.is_empty());
    }
}

#[test]
fn inserting_does_not_invent_other_members() {
    let mut set = PatriciaSet::<u32, u64>::new();
    let probes: Vec<u32> = (0..2_048).collect();

    for key in [5u32, 130, 131, 70_000] {
        let before: Vec<bool> = probes.iter().map(|&p| set.contains(p)).collect();
        set.insert(key).unwrap();

        for (&probe, &was_member) in probes.iter().zip(&before) {
            if probe != key {
                assert_eq!(set.contains(probe), was_member);
            }
        }
    }
}

#[test]
fn boundary_keys_u8() {
    let mut set = PatriciaSet::<u8, u64>::new();
    for key in [0, 1, u8::MAX - 1, u8::MAX] {
        set.insert(key).unwrap();
    }
    for key in [0, 1, u8::MAX - 1, u8::MAX] {
        assert!(set.contains(key));
    }
    for key in [2, 127, 128, u8::MAX - 2] {
        assert!(!set.contains(key));
    }
}

#[test]
fn boundary_keys_u32() {
    let mut set = PatriciaSet::<u32, u64>::new();
    for key in [0, 1, u32::MAX - 1, u32::MAX] {
        set.insert(key).unwrap();
    }
    for key in [0, 1, u32::MAX - 1, u32::MAX] {
        assert!(set.contains(key));
    }
    for key in [2, 0x8000_0000, u32::MAX - 2] {
        assert!(!set.contains(key));
    }
}

#[test]
fn boundary_keys_u128_without_bitmap() {
    let mut set = PatriciaSet::<u128, NoBitmap>::new();
    for key in [0, 1, u128::MAX - 1, u128::MAX] {
        set.insert(key).unwrap();
    }
    for key in [0, 1, u128::MAX - 1, u128::MAX] {
        assert!(set.contains(key));
    }
    for key in [2, 1u128 << 127, u128::MAX - 2] {
        assert!(!set.contains(key));
    }
}

#[test]
fn single_key_without_bitmap() {
    let mut set = PatriciaSet::<u32, NoBitmap>::new();
    set.insert(1).unwrap();

    assert!(set.contains(1));
    assert!(!set.contains(0));
    assert!(!set.contains(2));

    set.clear();
    assert!(set.is_empty());
    assert!(!set.contains(1));
}

#[test]
fn reinserting_a_member_keeps_the_version() {
    let mut set = PatriciaSet::<u32, u64>::new();
    set.insert(5).unwrap();

    let version = set.clone();
    for _ in 0..1_000 {
        assert_eq!(set.insert(5), Ok(false));
        assert!(set.same_version(&version));
    }
}

#[test]
fn version_probe_tracks_changes() {
    let mut set = PatriciaSet::<u32, u64>::new();
    let empty = set.clone();
    assert!(set.same_version(&empty));

    set.insert(9).unwrap();
    assert!(!set.same_version(&empty));

    let nine = set.clone();
    set.insert(9).unwrap();
    assert!(set.same_version(&nine));
    set.insert(10).unwrap();
    assert!(!set.same_version(&nine));
}

#[test]
fn clear_is_idempotent() {
    let mut set = PatriciaSet::<u32, u64>::new();
    set.clear();
    assert!(set.is_empty());

    set.insert(77).unwrap();
    set.clear();
    set.clear();
    assert!(!set.contains(77));

    assert_eq!(set.insert(77), Ok(true));
    assert!(set.contains(77));
}
