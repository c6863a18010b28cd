//! This crate implements an external merge sort with reduction, the engine behind sorting,
//! grouping and aggregating tables that do not fit in memory.
//!
//! [ExternalSort](external_sort::ExternalSort) consumes `(key, value)` entries and hands them back
//! in ascending key order. Entries are kept in memory up to a configurable budget, then written
//! to scratch files as ascending runs which are merged two at a time until one run remains.
//! Already ascending input is streamed straight into a single run, so sorting sorted data never
//! needs a merge pass. An optional associative reduce function combines entries with equal keys
//! as early as possible, which bounds the disk usage of group-by style workloads.
//!
//! Keys are any `Ord` type, [SortKey](key::SortKey) provides the natural ("smart") order used for
//! table fields: `file2` sorts before `file10` and numeric strings sort by value.
//!
//! On top of the engine [Sort](sort::Sort) sorts delimited text files, such as CSV or TSV, by one
//! or more fields.
//!
//! # Examples
//! ```
//! use tb_sort::external_sort::ExternalSort;
//! use tb_sort::key::{KeyValue, SortKey};
//!
//! fn natural_sort(names: Vec<&str>) -> Result<Vec<String>, anyhow::Error> {
//!     let mut sort = ExternalSort::new();
//!     // keep at most 1 MB of entries in memory
//!     sort.with_memory_budget(1_000_000);
//!     let sorted = sort.sort_by_key(
//!         names.into_iter().map(String::from),
//!         |name| Ok(SortKey::new(&KeyValue::from(name.as_str()))),
//!     )?;
//!     sorted.into_iter().collect()
//! }
//!
//! assert_eq!(natural_sort(vec!["file10", "file2", ""]).unwrap(), vec!["", "file2", "file10"]);
//! ```
//!

pub(crate) mod config;
pub(crate) mod reducer;
pub(crate) mod scratch_file;
pub(crate) mod spill_buffer;
pub(crate) mod spiller;
pub(crate) mod merge;
pub(crate) mod line_record;

pub mod error;
pub mod key;
pub mod external_sort;
pub mod sorted;
pub mod group;
pub mod aggregate;
pub mod sort;
pub mod field;
pub mod field_type;
pub mod order;
