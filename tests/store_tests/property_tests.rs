//! Property tests: the last SET wins and DEL empties

use std::collections::HashMap;

use cachedkv::store::Store;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(String, Vec<String>),
    Del(String),
}

fn arb_key() -> impl Strategy<Value = String> {
    "[a-d]".prop_map(|s| s.to_string())
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (arb_key(), proptest::collection::vec("[a-z]{1,4}", 1..4)).prop_map(|(k, v)| Op::Set(k, v)),
        arb_key().prop_map(Op::Del),
    ]
}

proptest! {
    #[test]
    fn get_returns_most_recent_set(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let store = Store::new();
        let mut expected: HashMap<String, Vec<String>> = HashMap::new();

        for op in &ops {
            match op {
                Op::Set(k, v) => {
                    store.set(k.clone(), v.clone());
                    expected.insert(k.clone(), v.clone());
                }
                Op::Del(k) => {
                    store.delete(k);
                    expected.remove(k);
                }
            }
        }

        for key in ["a", "b", "c", "d"] {
            let want = expected.get(key).cloned().unwrap_or_default();
            prop_assert_eq!(store.get(key), want);
        }
        prop_assert_eq!(store.len(), expected.len());
    }
}
