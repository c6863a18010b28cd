use std::collections::BTreeMap;

use proptest::prelude::*;
use tb_sort::external_sort::ExternalSort;
use tb_sort::key::{KeyValue, SortKey};

fn sort_entries(input: &[(u8, u32)], memory_budget: usize) -> Result<Vec<(u8, u32)>, anyhow::Error> {
    let tmp = tempfile::tempdir()?;
    let mut sort = ExternalSort::new();
    sort.with_tmp_dir(tmp.path().to_path_buf());
    sort.with_memory_budget(memory_budget);
    let mut sorted = sort.sort(input.to_vec())?;
    let entries = sorted.entries()?.collect::<Result<Vec<(u8, u32)>, anyhow::Error>>()?;
    Ok(entries)
}

fn reduce_entries(input: &[(u8, String)], memory_budget: usize) -> Result<Vec<(u8, String)>, anyhow::Error> {
    let tmp = tempfile::tempdir()?;
    let mut sort = ExternalSort::new();
    sort.with_tmp_dir(tmp.path().to_path_buf());
    sort.with_memory_budget(memory_budget);
    sort.with_reduce(|a: String, b: String| Ok(format!("{a}{b}")));
    let mut sorted = sort.sort(input.to_vec())?;
    let entries = sorted.entries()?.collect::<Result<Vec<(u8, String)>, anyhow::Error>>()?;
    Ok(entries)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the output is the stable sort of the input for any memory budget
    #[test]
    fn prop_sort_is_stable(
        keys in prop::collection::vec(0u8..16, 0..300),
        memory_budget in prop_oneof![Just(0usize), 1usize..400, Just(10_000_000usize)],
    ) {
        let input: Vec<(u8, u32)> = keys.into_iter().zip(0u32..).collect();
        let mut expected = input.clone();
        expected.sort_by_key(|(k, _)| *k);
        prop_assert_eq!(sort_entries(&input, memory_budget).unwrap(), expected);
    }

    /// Property: reducing equals folding the values of each key in input order
    #[test]
    fn prop_reduce_folds_in_input_order(
        entries in prop::collection::vec((0u8..8, "[a-z]{1,3}"), 0..200),
        memory_budget in prop_oneof![Just(0usize), 1usize..200, Just(10_000_000usize)],
    ) {
        let mut expected: BTreeMap<u8, String> = BTreeMap::new();
        for (k, v) in &entries {
            expected.entry(*k).or_default().push_str(v);
        }
        let expected: Vec<(u8, String)> = expected.into_iter().collect();
        prop_assert_eq!(reduce_entries(&entries, memory_budget).unwrap(), expected);
    }

    /// Property: integers keep their numeric order whether given as numbers or as text
    #[test]
    fn prop_integer_keys_order_by_value(a in any::<i64>(), b in any::<i64>()) {
        let number_a = SortKey::new(&KeyValue::from(a));
        let number_b = SortKey::new(&KeyValue::from(b));
        let text_a = SortKey::new(&KeyValue::from(a.to_string()));
        let text_b = SortKey::new(&KeyValue::from(b.to_string()));
        prop_assert_eq!(number_a.cmp(&number_b), a.cmp(&b));
        prop_assert_eq!(text_a.cmp(&text_b), a.cmp(&b));
        prop_assert_eq!(number_a, text_a);
    }

    /// Property: embedded numbers compare by value
    #[test]
    fn prop_embedded_numbers_order_by_value(prefix in "[a-z]{0,4}", a in 0u32..100_000, b in 0u32..100_000) {
        let key_a = SortKey::new(&KeyValue::from(format!("{prefix}{a}.txt")));
        let key_b = SortKey::new(&KeyValue::from(format!("{prefix}{b}.txt")));
        prop_assert_eq!(key_a.cmp(&key_b), a.cmp(&b));
    }
}
