use std::cmp::Ordering;

use serde::Serialize;

use crate::config::Config;
use crate::reducer::Reducer;
use crate::scratch_file::ScratchFile;
use crate::spill_buffer::SpillBuffer;

/// Two scratch files receiving runs alternately. Slot 0 always receives the first run, so the
/// k-th run of slot 0 precedes the k-th run of slot 1 in input order.
pub(crate) struct FilePair {
    slots: [ScratchFile; 2],
    current: usize,
}

impl FilePair {
    pub(crate) fn new(config: &Config) -> Result<FilePair, anyhow::Error> {
        Ok(
            FilePair {
                slots: [ScratchFile::new(config)?, ScratchFile::new(config)?],
                current: 0,
            }
        )
    }

    pub(crate) fn current(&mut self) -> &mut ScratchFile {
        &mut self.slots[self.current]
    }

    pub(crate) fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    pub(crate) fn runs(&self) -> usize {
        self.slots[0].runs() + self.slots[1].runs()
    }

    pub(crate) fn into_slots(self) -> [ScratchFile; 2] {
        self.slots
    }
}

enum Phase<K, V> {
    Buffering,
    /// Entries are written straight to the current run, `prev` is the last one accepted.
    Streaming { prev: (K, V) },
}

/// What is left after all input has been accepted.
pub(crate) enum Spilled<K, V> {
    /// The budget was never exceeded, nothing touched the disk.
    Memory(Vec<(K, V)>),
    /// Every entry is in one of the two files, in terminated runs.
    Disk(FilePair),
}

/// Accepts entries in arrival order and produces ascending runs.
///
/// Entries are buffered until the memory budget is exceeded. The buffer is then written out in
/// key order and the spiller keeps extending the same run for as long as the input stays
/// ascending. The first out-of-order entry closes the run, switches to the other file and starts
/// buffering again.
pub(crate) struct Spiller<K, V> {
    config: Config,
    buffer: SpillBuffer<K, V>,
    phase: Phase<K, V>,
    files: Option<FilePair>,
    arrivals: u64,
    spills: usize,
}

impl<K, V> Spiller<K, V>
where
    K: Ord + Clone + Serialize,
    V: Serialize,
{
    pub(crate) fn new(config: Config) -> Spiller<K, V> {
        Spiller {
            config,
            buffer: SpillBuffer::new(),
            phase: Phase::Buffering,
            files: None,
            arrivals: 0,
            spills: 0,
        }
    }

    /// Number of entries accepted so far.
    pub(crate) fn arrivals(&self) -> u64 {
        self.arrivals
    }

    pub(crate) fn spills(&self) -> usize {
        self.spills
    }

    pub(crate) fn push(&mut self, key: K, value: V, reducer: &mut Reducer<V>) -> Result<(), anyhow::Error> {
        let arrival = self.arrivals;
        self.arrivals += 1;

        match std::mem::replace(&mut self.phase, Phase::Buffering) {
            Phase::Buffering => {
                self.buffer_entry(key, arrival, value, reducer)?;
            }
            Phase::Streaming { prev: (prev_key, prev_value) } => {
                match key.cmp(&prev_key) {
                    Ordering::Equal if reducer.is_enabled() => {
                        let value = reducer.reduce(prev_value, value)?;
                        self.phase = Phase::Streaming { prev: (prev_key, value) };
                    }
                    Ordering::Less => {
                        let files = self.files()?;
                        files.current().write_entry(&prev_key, &prev_value)?;
                        files.current().end_run()?;
                        files.swap();
                        log::debug!("Inversion after {} entries, run closed", arrival);
                        self.buffer_entry(key, arrival, value, reducer)?;
                    }
                    _ => {
                        self.files()?.current().write_entry(&prev_key, &prev_value)?;
                        self.phase = Phase::Streaming { prev: (key, value) };
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<Spilled<K, V>, anyhow::Error> {
        match std::mem::replace(&mut self.phase, Phase::Buffering) {
            Phase::Streaming { prev: (key, value) } => {
                let files = self.files()?;
                files.current().write_entry(&key, &value)?;
                files.current().end_run()?;
            }
            Phase::Buffering => {
                match self.files.as_mut() {
                    None => {
                        return Ok(Spilled::Memory(self.buffer.drain_sorted().collect()));
                    }
                    Some(files) => {
                        if !self.buffer.is_empty() {
                            for (key, value) in self.buffer.drain_sorted() {
                                files.current().write_entry(&key, &value)?;
                            }
                            files.current().end_run()?;
                        }
                    }
                }
            }
        }

        match self.files.take() {
            Some(files) => {
                log::debug!("Input spilled into {} runs", files.runs());
                Ok(Spilled::Disk(files))
            }
            None => Err(anyhow::anyhow!("Spilled input without scratch files")),
        }
    }

    fn files(&mut self) -> Result<&mut FilePair, anyhow::Error> {
        if self.files.is_none() {
            self.files = Some(FilePair::new(&self.config)?);
        }
        self.files
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Scratch files are not available"))
    }

    fn buffer_entry(&mut self, key: K, arrival: u64, value: V, reducer: &mut Reducer<V>) -> Result<(), anyhow::Error> {
        self.buffer.insert(key, arrival, value, reducer)?;
        if self.buffer.size() > self.config.memory_budget() {
            self.spill()?;
        }
        Ok(())
    }

    /// Write the buffer to the current run, keeping the largest entry back as `prev`.
    fn spill(&mut self) -> Result<(), anyhow::Error> {
        log::debug!(
            "Spilling {} entries, {} bytes, budget {} bytes",
            self.buffer.len(),
            self.buffer.size(),
            self.config.memory_budget()
        );
        self.files()?;
        let files = match self.files.as_mut() {
            Some(files) => files,
            None => return Err(anyhow::anyhow!("Scratch files are not available")),
        };

        let mut prev = None;
        for entry in self.buffer.drain_sorted() {
            if let Some((key, value)) = prev.replace(entry) {
                files.current().write_entry(&key, &value)?;
            }
        }
        if let Some(prev) = prev {
            self.phase = Phase::Streaming { prev };
        }
        self.spills += 1;
        Ok(())
    }
}
