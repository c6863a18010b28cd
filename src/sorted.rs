use std::vec::IntoIter;

use serde::de::DeserializeOwned;

use crate::error::SortError;
use crate::group::Groups;
use crate::scratch_file::{Record, RunReader, ScratchFile};

/// Counters describing one sort invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortStats {
    entries: u64,
    runs: usize,
    passes: usize,
    reductions: usize,
    spilled: bool,
}

impl SortStats {
    pub(crate) fn new(entries: u64, runs: usize, passes: usize, reductions: usize, spilled: bool) -> SortStats {
        SortStats {
            entries,
            runs,
            passes,
            reductions,
            spilled,
        }
    }

    /// Number of input entries.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Number of runs written to disk before merging, 0 when the input fit in memory.
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Number of merge passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of times the reduce function was applied.
    pub fn reductions(&self) -> usize {
        self.reductions
    }

    /// Whether the memory budget was exceeded.
    pub fn spilled(&self) -> bool {
        self.spilled
    }
}

enum Source<K, V> {
    Memory(IntoIter<(K, V)>),
    // reader is declared first so it is closed before the file is removed
    Disk {
        reader: RunReader<K, V>,
        _file: ScratchFile,
    },
}

/// The result of a sort: a single forward traversal over the sorted entries.
///
/// The traversal can be taken once, through [Sorted::values], [Sorted::entries],
/// [Sorted::groups] or `into_iter`. Scratch files are removed when the traversal is exhausted,
/// fails, or is dropped, whichever happens first.
pub struct Sorted<K, V> {
    source: Option<Source<K, V>>,
    stats: SortStats,
}

impl<K, V> Sorted<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    pub(crate) fn in_memory(entries: Vec<(K, V)>, stats: SortStats) -> Sorted<K, V> {
        Sorted {
            source: Some(Source::Memory(entries.into_iter())),
            stats,
        }
    }

    pub(crate) fn on_disk(mut file: ScratchFile, stats: SortStats) -> Result<Sorted<K, V>, anyhow::Error> {
        let reader = file.reader()?;
        Ok(
            Sorted {
                source: Some(Source::Disk { reader, _file: file }),
                stats,
            }
        )
    }

    pub fn stats(&self) -> &SortStats {
        &self.stats
    }

    /// Take the traversal as `(key, value)` pairs.
    pub fn entries(&mut self) -> Result<Entries<K, V>, anyhow::Error> {
        match self.source.take() {
            Some(source) => Ok(Entries { source: Some(source) }),
            None => Err(SortError::AlreadyConsumed.into()),
        }
    }

    /// Take the traversal as values, keys are dropped.
    pub fn values(&mut self) -> Result<Values<K, V>, anyhow::Error> {
        Ok(Values { entries: self.entries()? })
    }

    /// Take the traversal as groups of values sharing a key.
    pub fn groups(&mut self) -> Result<Groups<K, V, Entries<K, V>>, anyhow::Error>
    where
        K: PartialEq,
    {
        Ok(Groups::new(self.entries()?))
    }
}

impl<K, V> IntoIterator for Sorted<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    type Item = Result<V, anyhow::Error>;
    type IntoIter = Values<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        Values {
            entries: Entries { source: self.source },
        }
    }
}

/// Sorted `(key, value)` pairs.
pub struct Entries<K, V> {
    source: Option<Source<K, V>>,
}

impl<K, V> Iterator for Entries<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    type Item = Result<(K, V), anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = match self.source.as_mut()? {
            Source::Memory(entries) => entries.next().map(Ok),
            Source::Disk { reader, .. } => match reader.next_record() {
                Ok(Some(Record::Entry(key, value))) => Some(Ok((key, value))),
                Ok(Some(Record::EndOfRun)) | Ok(None) => None,
                Err(e) => Some(Err(e)),
            },
        };

        match next {
            Some(Ok(entry)) => Some(Ok(entry)),
            other => {
                if self.source.take().is_some() {
                    log::trace!("Sorted traversal finished, scratch storage released");
                }
                other
            }
        }
    }
}

/// Sorted values.
pub struct Values<K, V> {
    entries: Entries<K, V>,
}

impl<K, V> Iterator for Values<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    type Item = Result<V, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .next()
            .map(|entry| entry.map(|(_, value)| value))
    }
}
