use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::reducer::Reducer;
use crate::scratch_file::{Record, RunReader, ScratchFile};

/// A reader over one source file together with its next unread record.
struct Cursor<K, V> {
    reader: RunReader<K, V>,
    head: Option<Record<K, V>>,
}

impl<K, V> Cursor<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    fn open(file: &mut ScratchFile) -> Result<Cursor<K, V>, anyhow::Error> {
        let mut reader = file.reader()?;
        let head = reader.next_record()?;
        Ok(Cursor { reader, head })
    }

    fn advance(&mut self) -> Result<Option<Record<K, V>>, anyhow::Error> {
        let next = self.reader.next_record()?;
        Ok(std::mem::replace(&mut self.head, next))
    }

    fn at_eof(&self) -> bool {
        self.head.is_none()
    }

    fn head_key(&self) -> Option<&K> {
        match &self.head {
            Some(Record::Entry(key, _)) => Some(key),
            _ => None,
        }
    }

    fn take_entry(&mut self) -> Result<Option<(K, V)>, anyhow::Error> {
        match self.advance()? {
            Some(Record::Entry(key, value)) => Ok(Some((key, value))),
            _ => Ok(None),
        }
    }

    fn skip_end_of_run(&mut self) -> Result<(), anyhow::Error> {
        if let Some(Record::EndOfRun) = self.head {
            self.advance()?;
        }
        Ok(())
    }
}

/// Merge the current run of `left` with the current run of `right` into one run of `target`.
///
/// Equal keys are reduced when a reducer is configured, otherwise the left entry goes first.
fn merge_runs<K, V>(
    left: &mut Cursor<K, V>,
    right: &mut Cursor<K, V>,
    target: &mut ScratchFile,
    reducer: &mut Reducer<V>,
) -> Result<(), anyhow::Error>
where
    K: Ord + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    loop {
        let order = match (left.head_key(), right.head_key()) {
            (Some(l), Some(r)) => l.cmp(r),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match order {
            Ordering::Equal if reducer.is_enabled() => {
                if let (Some((key, l)), Some((_, r))) = (left.take_entry()?, right.take_entry()?) {
                    let value = reducer.reduce(l, r)?;
                    target.write_entry(&key, &value)?;
                }
            }
            Ordering::Less | Ordering::Equal => {
                if let Some((key, value)) = left.take_entry()? {
                    target.write_entry(&key, &value)?;
                }
            }
            Ordering::Greater => {
                if let Some((key, value)) = right.take_entry()? {
                    target.write_entry(&key, &value)?;
                }
            }
        }
    }

    left.skip_end_of_run()?;
    right.skip_end_of_run()?;
    target.end_run()
}

/// One pass: pairs of runs from the two sources become single runs written alternately to the
/// two destinations. A run without a partner is copied over as it is.
fn merge_pass<K, V>(
    sources: &mut [ScratchFile; 2],
    destinations: &mut [ScratchFile; 2],
    reducer: &mut Reducer<V>,
) -> Result<usize, anyhow::Error>
where
    K: Ord + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    let [source_left, source_right] = sources;
    let mut left: Cursor<K, V> = Cursor::open(source_left)?;
    let mut right: Cursor<K, V> = Cursor::open(source_right)?;

    let mut target = 0;
    let mut runs = 0;
    while !(left.at_eof() && right.at_eof()) {
        merge_runs(&mut left, &mut right, &mut destinations[target], reducer)?;
        target = 1 - target;
        runs += 1;
    }
    Ok(runs)
}

/// Merge runs until a single one remains and return the file holding it.
///
/// The runs of `files[0]` must precede the runs of `files[1]` at equal positions, which keeps
/// the merge stable. At most four scratch files exist at a time, the sources of a pass are
/// truncated and reused as the destinations of the next one.
pub(crate) fn merge<K, V>(
    files: [ScratchFile; 2],
    config: &Config,
    reducer: &mut Reducer<V>,
) -> Result<(ScratchFile, usize), anyhow::Error>
where
    K: Ord + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    let mut sources = files;
    let mut spare: Option<[ScratchFile; 2]> = None;
    let mut passes = 0;

    while !sources[1].is_empty() {
        let mut destinations = match spare.take() {
            Some(destinations) => destinations,
            None => [ScratchFile::new(config)?, ScratchFile::new(config)?],
        };
        log::debug!(
            "Merge pass {}: {} + {} runs, {} + {} entries",
            passes + 1,
            sources[0].runs(),
            sources[1].runs(),
            sources[0].entries(),
            sources[1].entries()
        );
        let runs = merge_pass::<K, V>(&mut sources, &mut destinations, reducer)?;
        passes += 1;
        log::debug!("Merge pass {} produced {} runs", passes, runs);

        for source in sources.iter_mut() {
            source.truncate()?;
        }
        spare = Some(std::mem::replace(&mut sources, destinations));
    }

    let [merged, _] = sources;
    Ok((merged, passes))
}
