#![allow(unused)]

use std::collections::BTreeSet;

use patricia_set::{LeafBitmap, PatriciaSet};
use proptest_derive::Arbitrary;

/// One step of a randomized workload. Weights favor growth so the trees get
/// some depth before a fork or clear hits them.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub enum Op {
    #[proptest(weight = 6)]
    Insert(#[proptest(strategy = "0u32..640")] u32),
    #[proptest(weight = 2)]
    InsertWide(u32),
    #[proptest(weight = 3)]
    Contains(#[proptest(strategy = "0u32..640")] u32),
    #[proptest(weight = 1)]
    Fork,
    #[proptest(weight = 1)]
    Clear,
}

/// Replays `ops` against both a set and a `BTreeSet` model, checking every
/// observable along the way. Forked versions are kept together with a frozen
/// copy of the model and re-checked at the end, which catches any mutation
/// leaking across versions.
pub fn run_against_model<B: LeafBitmap<u32>>(ops: &[Op]) {
    let mut set = PatriciaSet::<u32, B>::new();
    let mut model = BTreeSet::new();
    let mut forks: Vec<(PatriciaSet<u32, B>, BTreeSet<u32>)> = Vec::new();
    let mut touched = BTreeSet::new();

    for &op in ops {
        match op {
            Op::Insert(key) | Op::InsertWide(key) => {
                let newly_added = set.insert(key).unwrap();
                assert_eq!(newly_added, model.insert(key));
                touched.insert(key);
            }
            Op::Contains(key) => {
                assert_eq!(set.contains(key), model.contains(&key));
            }
            Op::Fork => forks.push((set.clone(), model.clone())),
            Op::Clear => {
                set.clear();
                model.clear();
            }
        }
    }

    for &key in &touched {
        assert_eq!(set.contains(key), model.contains(&key));
    }

    for (fork, frozen) in &forks {
        for &key in &touched {
            assert_eq!(fork.contains(key), frozen.contains(&key));
        }
    }
}
