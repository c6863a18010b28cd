use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::{Builder, NamedTempFile};

use crate::config::Config;

const END_OF_RUN: &[u8] = b"\n";

/// One item read back from a scratch file.
pub(crate) enum Record<K, V> {
    Entry(K, V),
    EndOfRun,
}

/// A temporary file holding runs of ascending entries.
///
/// Each entry is one line with the JSON array `[key, value]`, an empty line terminates a run.
/// The file is removed from disk when the [ScratchFile] is dropped.
pub(crate) struct ScratchFile {
    file: NamedTempFile,
    writer: Option<BufWriter<File>>,
    entries: usize,
    runs: usize,
}

impl ScratchFile {
    pub(crate) fn new(config: &Config) -> Result<ScratchFile, anyhow::Error> {
        let file = Builder::new()
            .prefix(config.tmp_prefix())
            .suffix(config.tmp_suffix())
            .tempfile_in(config.tmp())
            .with_context(|| anyhow!("Failed to create scratch file in: {}", config.tmp().display()))?;
        log::debug!("Created scratch file: {}", file.path().display());
        Ok(
            ScratchFile {
                file,
                writer: None,
                entries: 0,
                runs: 0,
            }
        )
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    pub(crate) fn entries(&self) -> usize {
        self.entries
    }

    pub(crate) fn runs(&self) -> usize {
        self.runs
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.runs == 0 && self.entries == 0
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, anyhow::Error> {
        if self.writer.is_none() {
            let file = self.file.reopen()
                .with_context(|| anyhow!("path: {}", self.file.path().display()))?;
            self.writer = Some(BufWriter::new(file));
        }
        self.writer
            .as_mut()
            .ok_or_else(|| anyhow!("No writer for scratch file: {}", self.file.path().display()))
    }

    pub(crate) fn write_entry<K, V>(&mut self, key: &K, value: &V) -> Result<(), anyhow::Error>
    where
        K: Serialize,
        V: Serialize,
    {
        let path = self.file.path().to_path_buf();
        let writer = self.writer()?;
        serde_json::to_writer(&mut *writer, &(key, value))
            .with_context(|| anyhow!("path: {}", path.display()))?;
        writer.write_all(b"\n")
            .with_context(|| anyhow!("path: {}", path.display()))?;
        self.entries += 1;
        Ok(())
    }

    pub(crate) fn end_run(&mut self) -> Result<(), anyhow::Error> {
        let path = self.file.path().to_path_buf();
        self.writer()?
            .write_all(END_OF_RUN)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        self.runs += 1;
        Ok(())
    }

    /// Flush pending writes and open a reader positioned at the start of the file.
    pub(crate) fn reader<K, V>(&mut self) -> Result<RunReader<K, V>, anyhow::Error>
    where
        K: DeserializeOwned,
        V: DeserializeOwned,
    {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()
                .with_context(|| anyhow!("path: {}", self.file.path().display()))?;
        }
        let file = self.file.reopen()
            .with_context(|| anyhow!("path: {}", self.file.path().display()))?;
        Ok(RunReader::new(self.file.path().to_path_buf(), file))
    }

    /// Discard the content so the file can take the next pass.
    pub(crate) fn truncate(&mut self) -> Result<(), anyhow::Error> {
        self.writer = None;
        self.file.as_file()
            .set_len(0)
            .with_context(|| anyhow!("Failed to truncate: {}", self.file.path().display()))?;
        self.entries = 0;
        self.runs = 0;
        Ok(())
    }
}

pub(crate) struct RunReader<K, V> {
    path: PathBuf,
    reader: BufReader<File>,
    line: String,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> RunReader<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    fn new(path: PathBuf, file: File) -> RunReader<K, V> {
        RunReader {
            path,
            reader: BufReader::new(file),
            line: String::new(),
            _marker: PhantomData,
        }
    }

    /// Read the next record, `None` at end of file.
    pub(crate) fn next_record(&mut self) -> Result<Option<Record<K, V>>, anyhow::Error> {
        self.line.clear();
        let bytes = self.reader.read_line(&mut self.line)
            .with_context(|| anyhow!("path: {}", self.path.display()))?;
        if bytes == 0 {
            return Ok(None);
        }

        let line = self.line.trim_end_matches('\n');
        if line.is_empty() {
            Ok(Some(Record::EndOfRun))
        } else {
            let (key, value) = serde_json::from_str(line)
                .with_context(|| anyhow!("path: {}, corrupt entry: {}", self.path.display(), line))?;
            Ok(Some(Record::Entry(key, value)))
        }
    }
}
