use serde::{Deserialize, Serialize};

/// Sort order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}
