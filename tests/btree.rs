use std::collections::BTreeMap as ModelMap;

use bplus_index::{BTree, BTreeConfig, BTreeError, Range, Record};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn verified_tree<V>(order: usize) -> BTree<i32, V> {
    let config = BTreeConfig::new(order).unwrap().with_self_verify(true);
    BTree::with_config(config)
}

fn collect(range: Range<'_, i32, ()>) -> Vec<i32> {
    range.map(|record| *record.key()).collect()
}

fn keys_of<V>(tree: &BTree<i32, V>) -> Vec<i32> {
    tree.traverse().map(|record| *record.key()).collect()
}

#[test]
fn ascending_inserts_build_a_multi_level_tree() {
    init_logger();
    let mut tree = verified_tree(3);
    for i in 1..=10 {
        assert_eq!(tree.insert(i, (i, i)), None);
    }

    assert_eq!(keys_of(&tree), (1..=10).collect::<Vec<_>>());
    assert!(tree.height() >= 2);
    assert_eq!(tree.search(&7), Ok(&Record::new(7, (7, 7))));
    assert_eq!(tree.search(&11), Err(BTreeError::NotFound));

    assert_eq!(
        tree.levels(),
        vec![
            vec![vec![7]],
            vec![vec![3, 5], vec![9]],
            vec![vec![1, 2], vec![3, 4], vec![5, 6], vec![7, 8], vec![9, 10]],
        ]
    );
    assert_eq!(tree.get_stats().leaves, 5);
    assert_eq!(tree.get_stats().inner_nodes, 3);
    assert_eq!(tree.get_stats().nodes(), 8);
}

#[test]
fn delete_updates_separators() {
    init_logger();
    let mut tree = verified_tree(4);
    for key in [5, 3, 8, 1, 9, 2] {
        tree.insert(key, key * 100);
    }

    assert_eq!(tree.delete(&5), Ok(Record::new(5, 500)));
    assert_eq!(tree.search(&5), Err(BTreeError::NotFound));
    assert_eq!(keys_of(&tree), vec![1, 2, 3, 8, 9]);
    assert_eq!(tree.levels()[0], vec![vec![8]]);
    assert_eq!(tree.len(), 5);
}

#[test]
fn duplicate_insert_overwrites() {
    let mut tree = verified_tree(3);
    assert_eq!(tree.insert(4, "first"), None);
    assert_eq!(tree.insert(4, "second"), Some("first"));

    assert_eq!(tree.search(&4).map(Record::value), Ok(&"second"));
    assert_eq!(tree.len(), 1);
    assert_eq!(keys_of(&tree), vec![4]);
}

#[test]
fn rejects_orders_below_two() {
    assert!(matches!(
        BTree::<i32, ()>::with_order(1),
        Err(BTreeError::InvalidOrder(1))
    ));
    assert!(matches!(
        BTree::<i32, ()>::with_order(0),
        Err(BTreeError::InvalidOrder(0))
    ));
    assert!(BTree::<i32, ()>::with_order(2).is_ok());
}

#[test]
fn deleting_an_absent_key_changes_nothing() {
    let mut tree = verified_tree(3);
    for i in (0..40).step_by(2) {
        tree.insert(i, i);
    }
    let before = tree.levels();

    assert_eq!(tree.delete(&7), Err(BTreeError::NotFound));
    assert_eq!(tree.delete(&100), Err(BTreeError::NotFound));
    assert_eq!(tree.delete(&-1), Err(BTreeError::NotFound));

    assert_eq!(tree.levels(), before);
    assert_eq!(tree.len(), 20);
    assert!(tree.verify().is_ok());
}

#[test]
fn draining_collapses_the_root() {
    init_logger();
    let mut tree = verified_tree(3);
    for i in 1..=10 {
        tree.insert(i, i);
    }

    assert_eq!(tree.delete(&1).map(Record::into_parts), Ok((1, 1)));
    assert_eq!(tree.delete(&9).map(Record::into_parts), Ok((9, 9)));
    assert_eq!(tree.height(), 2);
    assert_eq!(
        tree.levels(),
        vec![vec![vec![5, 7]], vec![vec![2, 3, 4], vec![5, 6], vec![7, 8, 10]]]
    );

    for i in [2, 3, 4, 5, 6, 7, 8, 10] {
        assert!(tree.delete(&i).is_ok());
        assert_eq!(tree.search(&i), Err(BTreeError::NotFound));
    }

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.traverse().count(), 0);
    assert_eq!(tree.get_stats().nodes(), 1);
    assert_eq!(tree.delete(&1), Err(BTreeError::NotFound));
}

#[test]
fn smallest_order_borrows_into_empty_leaves() {
    let mut tree = verified_tree(2);
    for i in [1, 2, 3] {
        tree.insert(i, ());
    }
    assert_eq!(tree.levels(), vec![vec![vec![2]], vec![vec![1], vec![2, 3]]]);

    assert!(tree.delete(&1).is_ok());
    assert_eq!(tree.levels(), vec![vec![vec![3]], vec![vec![2], vec![3]]]);

    assert!(tree.delete(&2).is_ok());
    assert_eq!(tree.levels(), vec![vec![vec![3]]]);
    assert_eq!(keys_of(&tree), vec![3]);
}

#[test]
fn traversal_is_restartable_and_reversible() {
    let mut tree = verified_tree(4);
    let mut keys: Vec<i32> = (0..100).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(7));
    for &key in &keys {
        tree.insert(key, key.to_string());
    }

    let first: Vec<_> = keys_of(&tree);
    let second: Vec<_> = keys_of(&tree);
    assert_eq!(first, (0..100).collect::<Vec<_>>());
    assert_eq!(first, second);

    let backwards: Vec<_> = tree.traverse_rev().map(|r| *r.key()).collect();
    assert_eq!(backwards, (0..100).rev().collect::<Vec<_>>());

    let via_into_iter: Vec<_> = (&tree).into_iter().map(|r| r.value().clone()).collect();
    assert_eq!(via_into_iter[42], "42");

    assert_eq!(tree.first().map(Record::key), Some(&0));
    assert_eq!(tree.last().map(Record::key), Some(&99));
}

#[test]
fn range_scans() {
    let mut tree = verified_tree(3);
    for i in (0..60).step_by(3) {
        tree.insert(i, ());
    }

    assert_eq!(collect(tree.range(10..20)), vec![12, 15, 18]);
    assert_eq!(collect(tree.range(9..=18)), vec![9, 12, 15, 18]);
    assert_eq!(collect(tree.range(..7)), vec![0, 3, 6]);
    assert_eq!(collect(tree.range(54..)), vec![54, 57]);
    assert_eq!(collect(tree.range(58..)), Vec::<i32>::new());
    assert_eq!(collect(tree.range(20..10)), Vec::<i32>::new());
    assert_eq!(collect(tree.range(..)).len(), 20);

    use std::ops::Bound::{Excluded, Included};
    assert_eq!(
        collect(tree.range((Excluded(9), Included(15)))),
        vec![12, 15]
    );
}

#[test]
fn diagnostics() {
    let mut tree = verified_tree(3);
    for i in 1..=4 {
        tree.insert(i, ());
    }

    assert_eq!(
        tree.to_string(),
        "Level: 0, Node: 3 |\nLevel: 1, Node: 1 2 |\nLevel: 1, Node: 3 4 |\n"
    );

    let debug = format!("{:?}", tree);
    assert!(debug.contains("level 1 slotuse 1"));
    assert!(debug.contains("leaves:"));

    let stats = tree.get_stats();
    assert_eq!(stats.size, 4);
    assert!((stats.avgfill_leaves() - 4.0 / 6.0).abs() < 1e-9);
}

#[test]
fn clear_resets_to_an_empty_leaf() {
    let mut tree = verified_tree(3);
    for i in 0..50 {
        tree.insert(i, i);
    }
    tree.clear();

    assert!(tree.is_empty());
    assert_eq!(tree.height(), 1);
    assert_eq!(tree.first(), None);
    assert_eq!(tree.config().order(), 3);

    tree.insert(1, 1);
    assert_eq!(keys_of(&tree), vec![1]);
}

#[test]
fn binary_search_paths_agree() {
    let config = BTreeConfig::new(32)
        .unwrap()
        .with_binsearch_threshold(0)
        .with_self_verify(true);
    let mut tree = BTree::with_config(config);
    for i in (0..2000).rev() {
        tree.insert(i, i * 2);
    }
    for i in (0..2000).step_by(2) {
        assert!(tree.delete(&i).is_ok());
    }

    for i in 0..2000 {
        if i % 2 == 0 {
            assert!(!tree.contains_key(&i));
        } else {
            assert_eq!(tree.get(&i), Some(&(i * 2)));
        }
    }
}

#[test]
fn random_ops_match_model() {
    init_logger();
    for order in [2, 3, 4, 5, 7, 16] {
        let mut rng = StdRng::seed_from_u64(order as u64);
        let mut tree = verified_tree(order);
        let mut model = ModelMap::new();

        for step in 0..3000 {
            let key = rng.gen_range(0..400);
            if rng.gen_bool(0.55) {
                let value = rng.gen::<u32>();
                assert_eq!(tree.insert(key, value), model.insert(key, value));
            } else {
                let expected = model.remove(&key).map(|value| Record::new(key, value));
                assert_eq!(tree.delete(&key).ok(), expected);
            }

            assert_eq!(tree.len(), model.len());
            if step % 100 == 0 {
                assert!(tree.verify().is_ok());
                let records: Vec<_> = tree.traverse().map(|r| (*r.key(), *r.value())).collect();
                let expected: Vec<_> = model.iter().map(|(k, v)| (*k, *v)).collect();
                assert_eq!(records, expected, "order {} step {}", order, step);
            }
        }

        for (key, value) in &model {
            assert_eq!(tree.get(key), Some(value));
        }

        let mut keys: Vec<_> = model.keys().copied().collect();
        keys.shuffle(&mut rng);
        for key in keys {
            assert!(tree.delete(&key).is_ok());
        }
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 1);
        assert!(tree.verify().is_ok());
    }
}
