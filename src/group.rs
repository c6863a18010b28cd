//! Grouping of sorted entries.
//!
//! Once entries are sorted, all entries sharing a key are adjacent. [Groups] collects each such
//! stretch into one `(key, values)` item, values in sorted (and for equal keys, arrival) order.
//!
//! # Examples
//! ```
//! use tb_sort::external_sort::ExternalSort;
//!
//! fn count_words(words: Vec<String>) -> Result<Vec<(String, usize)>, anyhow::Error> {
//!     let mut sorted = ExternalSort::new().sort(words.into_iter().map(|w| (w.clone(), w)))?;
//!     sorted.groups()?
//!         .map(|group| group.map(|(word, values)| (word, values.len())))
//!         .collect()
//! }
//! ```

/// Consecutive entries with equal keys, taken from an iterator of sorted entries.
pub struct Groups<K, V, I> {
    entries: I,
    pending: Option<(K, V)>,
    done: bool,
}

impl<K, V, I> Groups<K, V, I>
where
    K: PartialEq,
    I: Iterator<Item = Result<(K, V), anyhow::Error>>,
{
    pub fn new(entries: I) -> Groups<K, V, I> {
        Groups {
            entries,
            pending: None,
            done: false,
        }
    }
}

impl<K, V, I> Iterator for Groups<K, V, I>
where
    K: PartialEq,
    I: Iterator<Item = Result<(K, V), anyhow::Error>>,
{
    type Item = Result<(K, Vec<V>), anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let (key, value) = match self.pending.take() {
            Some(entry) => entry,
            None => match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            },
        };

        let mut values = vec![value];
        loop {
            match self.entries.next() {
                None => break,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok((next_key, next_value))) => {
                    if next_key == key {
                        values.push(next_value);
                    } else {
                        self.pending = Some((next_key, next_value));
                        break;
                    }
                }
            }
        }
        Some(Ok((key, values)))
    }
}
