//! 順序キーの性質テスト

use blockcaret::model::{key_between, n_keys_between, validate_key};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    /// 任意の位置への挿入を繰り返しても、キー列は厳密に昇順のまま
    #[test]
    fn prop_repeated_inserts_stay_sorted(positions in proptest::collection::vec(0u16..512, 1..64)) {
        let mut keys: Vec<String> = Vec::new();
        for position in positions {
            let at = usize::from(position) % (keys.len() + 1);
            let before = if at == 0 { None } else { keys.get(at - 1).map(String::as_str) };
            let after = keys.get(at).map(String::as_str);
            let key = key_between(before, after).unwrap();

            prop_assert!(validate_key(&key).is_ok());
            if let Some(before) = before {
                prop_assert!(before < key.as_str());
            }
            if let Some(after) = after {
                prop_assert!(key.as_str() < after);
            }
            keys.insert(at, key);
        }
        prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn prop_n_keys_between_fit_the_gap(n in 0usize..24, split in 0usize..3) {
        let (before, after) = match split {
            0 => (None, None),
            1 => (Some("F"), None),
            _ => (Some("F"), Some("V")),
        };
        let keys = n_keys_between(before, after, n).unwrap();
        prop_assert_eq!(keys.len(), n);
        prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        if let (Some(first), Some(before)) = (keys.first(), before) {
            prop_assert!(before < first.as_str());
        }
        if let (Some(last), Some(after)) = (keys.last(), after) {
            prop_assert!(last.as_str() < after);
        }
    }
}

#[test]
fn test_inverted_neighbors_are_rejected() {
    assert!(key_between(Some("V"), Some("F")).is_err());
    assert!(key_between(Some("F"), Some("F")).is_err());
}
