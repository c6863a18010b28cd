use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use regex::Regex;
use tempfile::Builder;

use crate::external_sort::ExternalSort;
use crate::field::Field;
use crate::field_type::FieldType;
use crate::line_record::LineKey;
use crate::order::Order;

/// Sort text files with record like lines, e.g. CSV or TSV.
///
/// Lines are sorted with [ExternalSort], so inputs larger than memory are fine.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use tb_sort::field::Field;
/// use tb_sort::field_type::FieldType;
/// use tb_sort::sort::Sort;
///
/// // sort a CSV file with a header by city, then by amount
/// fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
///     let mut table_sort = Sort::new(vec![input], output);
///     table_sort.with_field_separator(',');
///     table_sort.with_header(true);
///     table_sort.add_field(Field::named("city", FieldType::Natural));
///     table_sort.add_field(Field::named("amount", FieldType::Number));
///     // set the directory for intermediate results. The default is the system temp dir -
///     // std::env::temp_dir()
///     table_sort.with_tmp_dir(tmp);
///     table_sort.sort()
/// }
/// ```
pub struct Sort {
    input_files: Vec<PathBuf>,
    output: PathBuf,
    tmp: PathBuf,
    field_separator: char,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    memory_budget: usize,
    fields: Vec<Field>,
    order: Order,
    prefix: Vec<String>,
    suffix: Vec<String>,
    endl: char,
    header: bool,
    unique: bool,
}

impl Sort {
    /// Create a default Sort definition.
    ///
    /// A default Sort definition will use the system temporary
    /// directory as defined by std::env::temp_dir().
    /// * The default field separator is a TAB ('\t')
    /// * The complete line will be considered as a single field in natural order
    /// * no lines are ignored
    /// * up to 10 MB of lines are sorted in memory before spilling to disk
    /// * default Order is Asc
    /// * prefix and suffix are empty
    /// * default end lines is '\n'
    /// * there is no header line and duplicates are kept
    pub fn new(input_files: Vec<PathBuf>, output: PathBuf) -> Sort {
        Sort {
            input_files,
            output,
            tmp: std::env::temp_dir(),
            field_separator: '\t',
            ignore_empty: false,
            ignore_lines: None,
            memory_budget: 10_000_000,
            fields: vec![],
            order: Order::Asc,
            prefix: vec![],
            suffix: vec![],
            endl: '\n',
            header: false,
            unique: false,
        }
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    pub fn with_tmp_dir(&mut self, tmp: PathBuf) {
        self.tmp = tmp;
    }

    /// Set the field separator. The default is '\t'
    pub fn with_field_separator(&mut self, field_separator: char) {
        self.field_separator = field_separator
    }

    /// Lines are sorted in memory until their size exceeds `memory_budget` bytes
    pub fn with_memory_budget(&mut self, memory_budget: usize) {
        self.memory_budget = memory_budget;
    }

    /// Direct the algorithm to ignore empty lines. The default is false
    pub fn with_ignore_empty(&mut self) {
        self.ignore_empty = true;
    }

    /// Specify which lines to ignore. Each line matching the regex will be ignored and will not
    /// appear in the output.
    pub fn with_ignore_lines(&mut self, r: Regex) {
        self.ignore_lines = Some(r)
    }

    /// Add field specification. The default is to treat the complete line as a single field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Replace all fields with the `fields` value.
    pub fn with_fields(&mut self, fields: Vec<Field>) {
        self.fields = fields
    }

    /// Set [Order]
    pub fn with_order(&mut self, order: Order) {
        self.order = order
    }

    /// Add file prefix. The provided prefix will be inserted at the beginning of the sorted file
    pub fn add_prefix_line(&mut self, prefix_line: String) {
        self.prefix.push(prefix_line);
    }

    /// Set prefix lines
    pub fn with_prefix_lines(&mut self, prefix_lines: Vec<String>) {
        self.prefix = prefix_lines;
    }

    /// Add file suffix. The provided suffix will be inserted at the end of the sorted file
    pub fn add_suffix_line(&mut self, suffix_line: String) {
        self.suffix.push(suffix_line);
    }

    /// Set suffix lines
    pub fn with_suffix_lines(&mut self, suffix_lines: Vec<String>) {
        self.suffix = suffix_lines;
    }

    /// Set line ending char, a single byte - not supporting CRLF
    pub fn with_endl(&mut self, endl: char) {
        self.endl = endl
    }

    /// Treat the first line of every input as a header. The header of the first input is
    /// written first, after the prefix lines, headers of other inputs are dropped.
    pub fn with_header(&mut self, header: bool) {
        self.header = header;
    }

    /// Keep only the first line of lines with equal keys
    pub fn with_unique(&mut self, unique: bool) {
        self.unique = unique;
    }

    /// Sort input files into the output file.
    ///
    /// The output is written to a temporary file next to it and renamed when complete.
    pub fn sort(&self) -> Result<(), anyhow::Error> {
        log::info!("Start sorting {} input files into {}", self.input_files.len(), self.output.display());
        let endl = self.endl_byte()?;
        let header = self.read_header(endl)?;
        let fields = self.resolve_fields(header.as_deref())?;

        let mut external_sort: ExternalSort<String> = ExternalSort::new();
        external_sort.with_tmp_dir(self.tmp.clone());
        external_sort.with_memory_budget(self.memory_budget);
        if self.unique {
            external_sort.with_reduce(|first, _| Ok(first));
        }

        let records = LineReader::new(self.input_files.clone(), endl, self.header)
            .filter(|line| line.as_ref().map_or(true, |line| !self.is_ignored(line)))
            .map(
                |line| -> Result<(LineKey, String), anyhow::Error> {
                    let line = line?;
                    let key = LineKey::new(&line, &fields, self.field_separator, self.order)?;
                    Ok((key, line))
                }
            );
        let sorted = external_sort.try_sort(records)?;

        let parent = match self.output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let output_file = Builder::new()
            .prefix(".tb-sort-")
            .suffix(".out")
            .tempfile_in(parent)
            .with_context(|| anyhow!("Failed to create output file in: {}", parent.display()))?;

        let mut lines = 0;
        {
            let mut writer = BufWriter::new(output_file.as_file());
            for prefix in &self.prefix {
                write!(writer, "{}{}", prefix, self.endl)?;
            }
            if let Some(header) = &header {
                write!(writer, "{}{}", header, self.endl)?;
            }
            for line in sorted {
                write!(writer, "{}{}", line?, self.endl)?;
                lines += 1;
            }
            for suffix in &self.suffix {
                write!(writer, "{}{}", suffix, self.endl)?;
            }
            writer.flush()
                .with_context(|| anyhow!("path: {}", output_file.path().display()))?;
        }

        output_file.persist(&self.output)
            .with_context(|| anyhow!("Persist sorted output to {}", self.output.display()))?;
        log::info!("Finish sorting, {} lines written to {}", lines, self.output.display());
        Ok(())
    }

    /// Check that each input file is sorted on its own.
    pub fn check(&self) -> Result<bool, anyhow::Error> {
        let endl = self.endl_byte()?;
        for path in &self.input_files {
            let header = Self::first_line(path, endl)?.filter(|_| self.header);
            let fields = self.resolve_fields(header.as_deref())?;
            if !self.check_file(path, &fields, endl)? {
                log::info!("Not sorted: {}", path.display());
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_file(&self, path: &Path, fields: &[Field], endl: u8) -> Result<bool, anyhow::Error> {
        let mut previous: Option<LineKey> = None;
        for line in LineReader::new(vec![path.to_path_buf()], endl, self.header) {
            let line = line?;
            if self.is_ignored(&line) {
                continue;
            }
            let current = LineKey::new(&line, fields, self.field_separator, self.order)?;
            if let Some(previous) = &previous {
                if previous > &current {
                    return Ok(false);
                }
            }
            previous = Some(current);
        }
        Ok(true)
    }

    fn is_ignored(&self, line: &str) -> bool {
        if self.ignore_empty && line.trim().is_empty() {
            return true;
        }
        match &self.ignore_lines {
            Some(r) => r.is_match(line.trim()),
            None => false,
        }
    }

    fn endl_byte(&self) -> Result<u8, anyhow::Error> {
        if self.endl.is_ascii() {
            Ok(self.endl as u8)
        } else {
            Err(anyhow!("Line ending must be a single byte character, got: {:?}", self.endl))
        }
    }

    fn read_header(&self, endl: u8) -> Result<Option<String>, anyhow::Error> {
        if !self.header {
            return Ok(None);
        }
        match self.input_files.first() {
            Some(path) => Self::first_line(path, endl),
            None => Ok(None),
        }
    }

    fn first_line(path: &Path, endl: u8) -> Result<Option<String>, anyhow::Error> {
        let file = File::open(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        let mut reader = BufReader::new(file);
        read_line(&mut reader, endl, path)
    }

    fn resolve_fields(&self, header: Option<&str>) -> Result<Vec<Field>, anyhow::Error> {
        if self.fields.is_empty() {
            return Ok(vec![Field::new(0, FieldType::Natural)]);
        }
        let titles: Option<Vec<&str>> = header.map(|header| header.split(self.field_separator).collect());
        self.fields
            .iter()
            .map(|field| field.resolve(titles.as_deref()))
            .collect()
    }
}

fn read_line(reader: &mut BufReader<File>, endl: u8, path: &Path) -> Result<Option<String>, anyhow::Error> {
    let mut buf = Vec::new();
    let bytes = reader.read_until(endl, &mut buf)
        .with_context(|| anyhow!("path: {}", path.display()))?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&endl) {
        buf.pop();
    }
    let line = String::from_utf8(buf)
        .with_context(|| anyhow!("path: {}, invalid UTF-8", path.display()))?;
    Ok(Some(line))
}

/// Lines of several files in sequence, optionally skipping the first line of each file.
struct LineReader {
    paths: VecDeque<PathBuf>,
    current: Option<(PathBuf, BufReader<File>)>,
    endl: u8,
    skip_header: bool,
}

impl LineReader {
    fn new(paths: Vec<PathBuf>, endl: u8, skip_header: bool) -> LineReader {
        LineReader {
            paths: paths.into(),
            current: None,
            endl,
            skip_header,
        }
    }

    fn open(&self, path: &Path) -> Result<BufReader<File>, anyhow::Error> {
        let file = File::open(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        let mut reader = BufReader::new(file);
        if self.skip_header {
            read_line(&mut reader, self.endl, path)?;
        }
        Ok(reader)
    }
}

impl Iterator for LineReader {
    type Item = Result<String, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.paths.pop_front()?;
                match self.open(&path) {
                    Ok(reader) => self.current = Some((path, reader)),
                    Err(e) => return Some(Err(e)),
                }
            }

            let (path, reader) = self.current.as_mut()?;
            match read_line(reader, self.endl, path) {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => self.current = None,
                Err(e) => {
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}
