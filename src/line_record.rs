use std::cmp::Ordering;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::field::Field;
use crate::key::SortKey;
use crate::order::Order;

/// The composite key of a line: one [SortKey] per field, compared in field order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct LineKey {
    keys: Vec<SortKey>,
    order: Order,
}

impl LineKey {
    pub(crate) fn new(line: &str, fields: &[Field], field_separator: char, order: Order) -> Result<LineKey, anyhow::Error> {
        if fields.len() == 1 && fields[0].index() == 0 {
            let key = fields[0].key(line).map_err(|e| anyhow!("line: {line}, error: {e}"))?;
            return Ok(LineKey { keys: vec![key], order });
        }

        let parts: Vec<&str> = line.split(field_separator).collect();
        let mut keys = Vec::with_capacity(fields.len());
        for field in fields {
            if field.index() == 0 {
                return Err(
                    anyhow!(
                        "line: {line}, error: Field index of 0 must be specified only once, meaning the entire line is to be used as a key"
                    )
                );
            }
            let part = parts.get(field.index() - 1).ok_or_else(|| {
                anyhow!(
                    "line: {line}, error: Requested comparison for field {} but there are only {} fields using {:?} as field separator.",
                    field.index(),
                    parts.len(),
                    field_separator,
                )
            })?;
            keys.push(field.key(part).map_err(|e| anyhow!("line: {line}, error: {e}"))?);
        }
        Ok(LineKey { keys, order })
    }
}

impl Eq for LineKey {}

impl PartialEq<Self> for LineKey {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl PartialOrd<Self> for LineKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = self.keys.cmp(&other.keys);
        match self.order {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::field_type::FieldType;

    use super::*;

    #[test]
    fn test_fields_and_order() -> Result<(), anyhow::Error> {
        let fields = vec![Field::new(2, FieldType::Natural), Field::new(1, FieldType::Integer)];
        let a = LineKey::new("10,x2", &fields, ',', Order::Asc)?;
        let b = LineKey::new("9,x10", &fields, ',', Order::Asc)?;
        let c = LineKey::new("8,x10", &fields, ',', Order::Asc)?;
        assert!(a < b);
        assert!(c < b);

        let a = LineKey::new("10,x2", &fields, ',', Order::Desc)?;
        let b = LineKey::new("9,x10", &fields, ',', Order::Desc)?;
        assert!(a > b);
        Ok(())
    }

    #[test]
    fn test_missing_field() {
        let fields = vec![Field::new(3, FieldType::String)];
        assert!(LineKey::new("a,b", &fields, ',', Order::Asc).is_err());
        let fields = vec![Field::new(1, FieldType::String), Field::new(0, FieldType::String)];
        assert!(LineKey::new("a,b", &fields, ',', Order::Asc).is_err());
    }
}
