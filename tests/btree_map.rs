use std::{borrow::Borrow, collections::HashSet};

use bplus_index::btree_map::DefaultBTreeMap;
use rand::{seq::SliceRandom, thread_rng, Rng};

#[test]
fn btree_map_works() {
    let mut tree = Box::new(DefaultBTreeMap::<i32, i32>::new());

    for i in 0..1000 {
        assert_eq!(tree.put(i, i + 1), None);
    }

    for i in 0..1000 {
        assert_eq!(tree.get(&i), Some(&(i + 1)));
    }

    assert_eq!(tree.get(&12), Some(&13));
    assert_eq!(tree.remove(&12), Some(13));
    assert!(tree.get(&12).is_none());
    assert_eq!(tree.remove(&12), None);
    tree.put(12, 24);
    assert_eq!(tree.get(&12), Some(&24));
    assert_eq!(tree.put(12, 25), Some(24));

    for i in 0..1000 {
        if i == 12 {
            assert_eq!(tree.get(&i), Some(&25));
        } else {
            assert_eq!(tree.get(&i), Some(&(i + 1)));
        }
    }
    assert_eq!(tree.len(), 1000);
    assert!(tree.as_tree().verify().is_ok());
}

#[test]
fn works_on_pointer_types() {
    let mut tree = Box::new(DefaultBTreeMap::<String, String>::new());
    assert_eq!(tree.get(&"test".into()), None);
    tree.put("test".into(), "test2".into());
    assert_eq!(tree.get(&"test".into()), Some(&("test2".to_string())));
    for i in 0..100 {
        tree.put(i.to_string(), (i + 1).to_string());
    }
    for i in 0..100 {
        assert_eq!(
            tree.get(i.to_string().borrow()),
            Some((i + 1).to_string().borrow()),
        );
    }
    assert!(tree.contains_key(&"42".to_string()));
    assert!(!tree.contains_key(&"missing".to_string()));
}

#[test]
fn iterates_in_key_order() {
    let mut tree = DefaultBTreeMap::<u32, char>::with_order(3).unwrap();
    for (i, c) in "zyxwvutsrq".chars().enumerate() {
        tree.put(10 - i as u32, c);
    }

    let pairs: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(pairs.first(), Some(&(1, 'q')));
    assert_eq!(pairs.last(), Some(&(10, 'z')));
    assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0));

    let window: Vec<_> = tree.range(4..7).map(|(k, _)| *k).collect();
    assert_eq!(window, vec![4, 5, 6]);
}

#[test]
fn random_op_test() {
    let mut tree = Box::new(DefaultBTreeMap::<i32, i32>::new());

    let n = 50000;

    let mut rng = thread_rng();

    let mut keys = HashSet::new();
    while keys.len() < n {
        keys.insert(rng.gen::<u16>() as i32);
    }
    let mut keys: Vec<_> = keys.into_iter().collect();

    for &key in keys.iter() {
        tree.put(key, key + 1);
    }

    for &key in keys.iter() {
        assert_eq!(tree.get(&key), Some(&(key + 1)));
    }

    keys.shuffle(&mut rng);
    let removed_keys = keys.split_off(n / 2);
    for &key in removed_keys.iter() {
        assert_eq!(tree.remove(&key), Some(key + 1));
    }

    for &key in removed_keys.iter() {
        assert!(tree.get(&key).is_none());
    }

    for &key in keys.iter() {
        assert_eq!(tree.get(&key), Some(&(key + 1)));
    }

    assert_eq!(tree.len(), n / 2);
    assert!(tree.as_tree().verify().is_ok());
}
