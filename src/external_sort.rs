use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::merge::merge;
use crate::reducer::Reducer;
use crate::sorted::{SortStats, Sorted};
use crate::spiller::{Spilled, Spiller};

/// External merge sort of `(key, value)` entries with optional reduction of equal keys.
///
/// Entries are buffered in memory up to a budget measured in serialized bytes. Beyond the budget
/// they are written to scratch files as ascending runs, and the runs are merged two files at a
/// time until a single run remains. When a reduce function is configured, entries with equal
/// keys are combined as soon as they meet, while buffering, while writing runs and while merging.
/// The result is the same as folding all values of a key in input order.
///
/// Without a reduce function the sort is stable.
///
/// # Examples
/// ```
/// use tb_sort::external_sort::ExternalSort;
///
/// fn concat_by_key() -> Result<(), anyhow::Error> {
///     let mut sort = ExternalSort::new();
///     sort.with_memory_budget(0);
///     sort.with_reduce(|a: String, b: String| Ok(a + &b));
///     let input = vec![(3, "c".to_string()), (1, "a".to_string()), (2, "b".to_string()), (1, "a2".to_string())];
///     let values = sort.sort(input)?
///         .into_iter()
///         .collect::<Result<Vec<String>, anyhow::Error>>()?;
///     assert_eq!(values, vec!["aa2", "b", "c"]);
///     Ok(())
/// }
/// # concat_by_key().unwrap();
/// ```
pub struct ExternalSort<V> {
    tmp: PathBuf,
    tmp_prefix: String,
    memory_budget: usize,
    reducer: Reducer<V>,
}

impl<V> ExternalSort<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Create a default ExternalSort.
    ///
    /// * scratch files go to std::env::temp_dir()
    /// * scratch file names start with a process unique prefix
    /// * the memory budget is 10 MB of serialized entries
    /// * no reduce function
    pub fn new() -> ExternalSort<V> {
        ExternalSort {
            tmp: std::env::temp_dir(),
            tmp_prefix: format!("tb-sort-{}-", std::process::id()),
            memory_budget: 10_000_000,
            reducer: Reducer::none(),
        }
    }

    /// Set directory for scratch files. By default use std::env::temp_dir()
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the prefix of scratch file names
    pub fn with_tmp_prefix(&mut self, prefix: &str) {
        self.tmp_prefix = prefix.to_string();
    }

    /// Set the number of serialized bytes buffered in memory before spilling to disk. A budget
    /// of 0 spills from the first entry on.
    pub fn with_memory_budget(&mut self, memory_budget: usize) {
        self.memory_budget = memory_budget;
    }

    /// Set the function combining two values with equal keys. It receives the earlier value
    /// first and must be associative.
    pub fn with_reduce<F>(&mut self, reduce: F)
    where
        F: FnMut(V, V) -> Result<V, anyhow::Error> + 'static,
    {
        self.reducer = Reducer::new(Box::new(reduce));
    }

    /// Sort `(key, value)` entries.
    pub fn sort<K, I>(&mut self, input: I) -> Result<Sorted<K, V>, anyhow::Error>
    where
        K: Ord + Clone + Serialize + DeserializeOwned,
        I: IntoIterator<Item = (K, V)>,
    {
        self.try_sort(input.into_iter().map(Ok))
    }

    /// Sort values by a key computed from each value.
    pub fn sort_by_key<K, I, F>(&mut self, input: I, key: F) -> Result<Sorted<K, V>, anyhow::Error>
    where
        K: Ord + Clone + Serialize + DeserializeOwned,
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> Result<K, anyhow::Error>,
    {
        self.sort_by_key_map(input, key, Ok)
    }

    /// Sort items by a key computed from each item, storing `transform(item)` as the value.
    pub fn sort_by_key_map<T, K, I, F, M>(&mut self, input: I, mut key: F, mut transform: M) -> Result<Sorted<K, V>, anyhow::Error>
    where
        K: Ord + Clone + Serialize + DeserializeOwned,
        I: IntoIterator<Item = T>,
        F: FnMut(&T) -> Result<K, anyhow::Error>,
        M: FnMut(T) -> Result<V, anyhow::Error>,
    {
        self.try_sort(
            input.into_iter().map(
                |item| -> Result<(K, V), anyhow::Error> {
                    let k = key(&item)?;
                    let value = transform(item)?;
                    Ok((k, value))
                }
            )
        )
    }

    /// Sort entries coming from a fallible source. The first error aborts the sort.
    pub fn try_sort<K, I>(&mut self, input: I) -> Result<Sorted<K, V>, anyhow::Error>
    where
        K: Ord + Clone + Serialize + DeserializeOwned,
        I: IntoIterator<Item = Result<(K, V), anyhow::Error>>,
    {
        let config = self.create_config();
        log::info!("Start external sort, memory budget: {} bytes, tmp: {}", config.memory_budget(), config.tmp().display());
        self.reducer.reset();

        let mut spiller = Spiller::new(config.clone());
        for entry in input {
            let (key, value) = entry?;
            spiller.push(key, value, &mut self.reducer)?;
        }
        let entries = spiller.arrivals();
        let spilled = spiller.spills() > 0;

        let sorted = match spiller.finish()? {
            Spilled::Memory(sorted) => {
                let stats = SortStats::new(entries, 0, 0, self.reducer.reductions(), spilled);
                Sorted::in_memory(sorted, stats)
            }
            Spilled::Disk(files) => {
                let runs = files.runs();
                let (file, passes) = merge::<K, V>(files.into_slots(), &config, &mut self.reducer)?;
                let stats = SortStats::new(entries, runs, passes, self.reducer.reductions(), spilled);
                Sorted::on_disk(file, stats)?
            }
        };
        log::info!("Finish external sort, {:?}", sorted.stats());
        Ok(sorted)
    }

    fn create_config(&self) -> Config {
        Config::new(
            self.tmp.clone(),
            self.tmp_prefix.clone(),
            ".run".to_string(),
            self.memory_budget,
        )
    }
}

impl<V> Default for ExternalSort<V>
where
    V: Serialize + DeserializeOwned,
{
    fn default() -> Self {
        ExternalSort::new()
    }
}
