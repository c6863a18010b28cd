use anyhow::anyhow;
use tb_sort::error::SortError;
use tb_sort::external_sort::ExternalSort;
use tb_sort::key::{KeyValue, SortKey};

mod common;

fn sorter<V>(tmp: &std::path::Path, memory_budget: usize) -> ExternalSort<V>
where
    V: serde::Serialize + serde::de::DeserializeOwned,
{
    let mut sort = ExternalSort::new();
    sort.with_tmp_dir(tmp.to_path_buf());
    sort.with_memory_budget(memory_budget);
    sort
}

#[test]
fn test_reduce_example() -> Result<(), anyhow::Error> {
    for budget in [0, 10, 10_000_000] {
        let dir = tempfile::tempdir()?;
        let mut sort = sorter(dir.path(), budget);
        sort.with_reduce(|a: String, b: String| Ok(a + &b));
        let input = vec![(3, "c"), (1, "a"), (2, "b"), (1, "a2")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()));
        let values: Vec<String> = sort.sort(input)?.into_iter().collect::<Result<_, _>>()?;
        assert_eq!(values, vec!["aa2", "b", "c"], "budget: {budget}");
        assert_eq!(common::dir_entries(dir.path()), 0);
    }
    Ok(())
}

#[test]
fn test_stable_example() -> Result<(), anyhow::Error> {
    for budget in [0, 10_000_000] {
        let dir = tempfile::tempdir()?;
        let mut sort = sorter(dir.path(), budget);
        let input = vec![(5, "5"), (3, "3a"), (3, "3b"), (1, "1")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()));
        let values: Vec<String> = sort.sort(input)?.into_iter().collect::<Result<_, _>>()?;
        assert_eq!(values, vec!["1", "3a", "3b", "5"], "budget: {budget}");
    }
    Ok(())
}

#[test]
fn test_empty_input() -> Result<(), anyhow::Error> {
    for budget in [0, 10_000_000] {
        let dir = tempfile::tempdir()?;
        let mut sort: ExternalSort<String> = sorter(dir.path(), budget);
        let mut sorted = sort.sort(Vec::<(i32, String)>::new())?;
        assert_eq!(sorted.stats().entries(), 0);
        assert_eq!(sorted.values()?.count(), 0);
        assert_eq!(common::dir_entries(dir.path()), 0);
    }
    Ok(())
}

#[test]
fn test_zero_budget_spills_and_merges() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    let input: Vec<(u32, u32)> = (0..2000u32).map(|i| ((i * 7919) % 2000, i)).collect();
    let sorted = sort.sort(input.clone())?;
    assert!(sorted.stats().spilled());
    assert!(sorted.stats().runs() > 1);
    assert!(sorted.stats().passes() > 0);

    let mut expected = input;
    expected.sort_by_key(|(k, _)| *k);
    let values: Vec<u32> = sorted.into_iter().collect::<Result<_, _>>()?;
    assert_eq!(values, expected.into_iter().map(|(_, v)| v).collect::<Vec<u32>>());
    assert_eq!(common::dir_entries(dir.path()), 0);
    Ok(())
}

#[test]
fn test_sorted_input_needs_no_merge() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 100);
    let input: Vec<(u32, String)> = (0..5000u32).map(|i| (i, format!("value {i}"))).collect();
    let sorted = sort.sort(input.clone())?;
    assert!(sorted.stats().spilled());
    assert_eq!(sorted.stats().runs(), 1);
    assert_eq!(sorted.stats().passes(), 0);

    let values: Vec<String> = sorted.into_iter().collect::<Result<_, _>>()?;
    assert_eq!(values, input.into_iter().map(|(_, v)| v).collect::<Vec<String>>());
    Ok(())
}

#[test]
fn test_reduce_counts_across_spills() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 64);
    sort.with_reduce(|a: u64, b: u64| Ok(a + b));
    let input = (0..10_000u64).map(|i| (format!("key{}", (i * 31) % 13), 1u64));
    let mut sorted = sort.sort(input)?;
    assert!(sorted.stats().reductions() > 0);

    let entries: Vec<(String, u64)> = sorted.entries()?.collect::<Result<_, _>>()?;
    assert_eq!(entries.len(), 13);
    assert_eq!(entries.iter().map(|(_, n)| n).sum::<u64>(), 10_000);
    let mut keys: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
    let unsorted = keys.clone();
    keys.sort();
    assert_eq!(keys, unsorted);
    Ok(())
}

#[test]
fn test_sort_by_key_map() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    let rows = vec!["b,2", "a,10", "c,1", "a,9"];
    let sorted = sort.sort_by_key_map(
        rows,
        |row| {
            let amount = row.split(',').nth(1).ok_or_else(|| anyhow!("no amount in {row}"))?;
            Ok(SortKey::from_json(&serde_json::json!(amount))?)
        },
        |row| Ok(row.split(',').next().unwrap_or_default().to_string()),
    )?;
    let values: Vec<String> = sorted.into_iter().collect::<Result<_, _>>()?;
    assert_eq!(values, vec!["c", "b", "a", "a"]);
    Ok(())
}

#[test]
fn test_invalid_key_aborts() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    let rows = vec![serde_json::json!("a"), serde_json::json!(1), serde_json::json!({"x": 1})];
    let result = sort.sort_by_key(rows, SortKey::from_json);
    let error = result.err().ok_or_else(|| anyhow!("expected an error"))?;
    assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::InvalidKey(_))));
    assert_eq!(common::dir_entries(dir.path()), 0);
    Ok(())
}

#[test]
fn test_reduce_error_aborts_and_cleans_up() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    sort.with_reduce(|a: u32, b: u32| {
        if a + b > 3 {
            Err(anyhow!("overflow"))
        } else {
            Ok(a + b)
        }
    });
    let input = vec![(2, 1u32), (1, 1), (2, 1), (1, 1), (2, 1), (1, 1), (2, 1)];
    assert!(sort.sort(input).is_err());
    assert_eq!(common::dir_entries(dir.path()), 0);
    Ok(())
}

#[test]
fn test_input_error_aborts() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort: ExternalSort<u32> = sorter(dir.path(), 0);
    let input = vec![Ok((2, 2)), Ok((1, 1)), Err(anyhow!("read failed")), Ok((3, 3))];
    assert!(sort.try_sort(input).is_err());
    assert_eq!(common::dir_entries(dir.path()), 0);
    Ok(())
}

#[test]
fn test_single_traversal() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    let mut sorted = sort.sort(vec![(2, 2u32), (1, 1)])?;
    let values: Vec<u32> = sorted.values()?.collect::<Result<_, _>>()?;
    assert_eq!(values, vec![1, 2]);

    let error = sorted.values().err().ok_or_else(|| anyhow!("expected an error"))?;
    assert!(matches!(error.downcast_ref::<SortError>(), Some(SortError::AlreadyConsumed)));
    assert!(sorted.entries().is_err());
    Ok(())
}

#[test]
fn test_abandoned_traversal_cleans_up() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    let input: Vec<(u32, u32)> = (0..100u32).rev().map(|i| (i, i)).collect();

    let mut sorted = sort.sort(input.clone())?;
    assert!(common::dir_entries(dir.path()) > 0);
    let mut values = sorted.values()?;
    assert_eq!(values.next().transpose()?, Some(0));
    drop(values);
    assert_eq!(common::dir_entries(dir.path()), 0);

    let sorted = sort.sort(input)?;
    assert!(common::dir_entries(dir.path()) > 0);
    drop(sorted);
    assert_eq!(common::dir_entries(dir.path()), 0);
    Ok(())
}

#[test]
fn test_groups() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let mut sort = sorter(dir.path(), 0);
    let words = vec!["b", "a", "c", "a", "b", "a"];
    let mut sorted = sort.sort(words.into_iter().enumerate().map(|(i, w)| (w.to_string(), i)))?;
    let groups: Vec<(String, Vec<usize>)> = sorted.groups()?.collect::<Result<_, _>>()?;
    assert_eq!(
        groups,
        vec![
            ("a".to_string(), vec![1, 3, 5]),
            ("b".to_string(), vec![0, 4]),
            ("c".to_string(), vec![2]),
        ]
    );
    Ok(())
}

#[test]
fn test_default_tmp_dir() -> Result<(), anyhow::Error> {
    let mut sort = ExternalSort::new();
    sort.with_tmp_prefix("tb-sort-default-test-");
    sort.with_memory_budget(0);
    let values: Vec<i64> = sort.sort(vec![(3, 3i64), (1, 1), (2, 2)])?.into_iter().collect::<Result<_, _>>()?;
    assert_eq!(values, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn test_overflowing_numbers_spill() -> Result<(), anyhow::Error> {
    for budget in [0, 10_000_000] {
        let dir = tempfile::tempdir()?;
        let mut sort = sorter(dir.path(), budget);
        let names = vec!["1e400", "5", "-1e400", "1e-400", "file1e999"];
        let sorted = sort.sort_by_key(
            names.into_iter().map(String::from),
            |name| Ok(SortKey::new(&KeyValue::from(name.as_str()))),
        )?;
        let values: Vec<String> = sorted.into_iter().collect::<Result<_, _>>()?;
        assert_eq!(values, vec!["-1e400", "1e-400", "5", "1e400", "file1e999"], "budget: {budget}");
        assert_eq!(common::dir_entries(dir.path()), 0);
    }
    Ok(())
}

#[test]
fn test_long_ids_stay_distinct_under_reduce() -> Result<(), anyhow::Error> {
    for budget in [0, 10_000_000] {
        let dir = tempfile::tempdir()?;
        let mut sort = sorter(dir.path(), budget);
        sort.with_reduce(|a: String, b: String| Ok(format!("{a}+{b}")));
        let ids = vec![
            "id1234567890123456789012346",
            "id1234567890123456789012345",
            "id1234567890123456789012346",
            "id01234567890123456789012345",
        ];
        let sorted = sort.sort_by_key(
            ids.into_iter().map(String::from),
            |id| Ok(SortKey::new(&KeyValue::from(id.as_str()))),
        )?;
        let values: Vec<String> = sorted.into_iter().collect::<Result<_, _>>()?;
        assert_eq!(
            values,
            vec![
                "id1234567890123456789012345+id01234567890123456789012345",
                "id1234567890123456789012346+id1234567890123456789012346",
            ],
            "budget: {budget}"
        );
    }
    Ok(())
}
