//! Aggregate functions usable as the reduce function of an [ExternalSort](crate::external_sort::ExternalSort).
//!
//! Every input value starts its own [Accumulator] via [Aggregate::start]. Two accumulators of
//! the same kind combine with [Accumulator::merge], which is associative, so they can be reduced
//! at any point of the sort. [Accumulator::finish] renders the final value.
//!
//! # Examples
//! ```
//! use tb_sort::aggregate::{Accumulator, Aggregate};
//! use tb_sort::external_sort::ExternalSort;
//!
//! fn sum_by_city(rows: Vec<(&str, &str)>) -> Result<Vec<String>, anyhow::Error> {
//!     let mut sort = ExternalSort::new();
//!     sort.with_reduce(Accumulator::merge);
//!     let input = rows.into_iter()
//!         .map(|(city, amount)| Ok::<_, anyhow::Error>((city.to_string(), Aggregate::Sum.start(amount)?)));
//!     sort.try_sort(input)?
//!         .into_iter()
//!         .map(|accumulator| accumulator.map(|a| a.finish()))
//!         .collect()
//! }
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SortError;
use crate::key::{parse_number, KeyValue, Number, SortKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    First,
    Last,
    Values,
}

impl Aggregate {
    /// Start an accumulator from a single value.
    pub fn start(&self, value: &str) -> Result<Accumulator, anyhow::Error> {
        let accumulator = match self {
            Aggregate::Count => Accumulator::Count(1),
            Aggregate::Sum => Accumulator::Sum(Self::number(value)?),
            Aggregate::Min => Accumulator::Min(SortKey::new(&KeyValue::from(value)), value.to_string()),
            Aggregate::Max => Accumulator::Max(SortKey::new(&KeyValue::from(value)), value.to_string()),
            Aggregate::Avg => Accumulator::Avg(Self::number(value)?, 1),
            Aggregate::First => Accumulator::First(value.to_string()),
            Aggregate::Last => Accumulator::Last(value.to_string()),
            Aggregate::Values => Accumulator::Values(vec![value.to_string()]),
        };
        Ok(accumulator)
    }

    fn number(value: &str) -> Result<Number, anyhow::Error> {
        parse_number(value)
            .ok_or_else(|| SortError::Reduce(format!("not a number: {:?}", value)).into())
    }
}

impl FromStr for Aggregate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(Aggregate::Count),
            "sum" => Ok(Aggregate::Sum),
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            "avg" => Ok(Aggregate::Avg),
            "first" => Ok(Aggregate::First),
            "last" => Ok(Aggregate::Last),
            "values" => Ok(Aggregate::Values),
            other => Err(anyhow::anyhow!("unknown aggregate: {}", other)),
        }
    }
}

/// Partial state of an [Aggregate].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Accumulator {
    Count(u64),
    Sum(Number),
    Min(SortKey, String),
    Max(SortKey, String),
    Avg(Number, u64),
    First(String),
    Last(String),
    Values(Vec<String>),
}

impl Accumulator {
    /// Combine an earlier accumulator with a later one of the same kind.
    pub fn merge(earlier: Accumulator, later: Accumulator) -> Result<Accumulator, anyhow::Error> {
        let merged = match (earlier, later) {
            (Accumulator::Count(a), Accumulator::Count(b)) => Accumulator::Count(a + b),
            (Accumulator::Sum(a), Accumulator::Sum(b)) => Accumulator::Sum(a.plus(b)),
            (Accumulator::Min(ka, a), Accumulator::Min(kb, b)) => {
                if kb < ka { Accumulator::Min(kb, b) } else { Accumulator::Min(ka, a) }
            }
            (Accumulator::Max(ka, a), Accumulator::Max(kb, b)) => {
                if kb > ka { Accumulator::Max(kb, b) } else { Accumulator::Max(ka, a) }
            }
            (Accumulator::Avg(sa, ca), Accumulator::Avg(sb, cb)) => Accumulator::Avg(sa.plus(sb), ca + cb),
            (first @ Accumulator::First(_), Accumulator::First(_)) => first,
            (Accumulator::Last(_), last @ Accumulator::Last(_)) => last,
            (Accumulator::Values(mut a), Accumulator::Values(b)) => {
                a.extend(b);
                Accumulator::Values(a)
            }
            (a, b) => {
                return Err(SortError::Reduce(format!("cannot merge {:?} with {:?}", a, b)).into());
            }
        };
        Ok(merged)
    }

    /// Render the aggregated value.
    pub fn finish(&self) -> String {
        match self {
            Accumulator::Count(n) => n.to_string(),
            Accumulator::Sum(n) => n.to_string(),
            Accumulator::Min(_, v) | Accumulator::Max(_, v) => v.clone(),
            Accumulator::Avg(sum, count) => (sum.as_f64() / *count as f64).to_string(),
            Accumulator::First(v) | Accumulator::Last(v) => v.clone(),
            Accumulator::Values(values) => values.join(","),
        }
    }
}
