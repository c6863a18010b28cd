use anyhow::anyhow;
use data_encoding::HEXLOWER;

use crate::field_type::FieldType;
use crate::key::{KeyValue, Number, SortKey};

/// Defines a field of a line record used as part of the sort key.
///
/// A field is addressed either by position, starting at 1, or by name. Names are looked up in
/// the header line, so they require a [Sort](crate::sort::Sort) with a header.
///
/// # Examples
/// ```
/// // specify that the second field of the record is compared in natural order with blanks
/// // stripped and case ignored
/// use tb_sort::field::Field;
/// use tb_sort::field_type::FieldType;
/// let field = Field::new(2, FieldType::Natural)
///     .with_ignore_blanks(true)
///     .with_ignore_case(true);
///
/// // the field titled "amount" in the header, compared as a number
/// let amount = Field::named("amount", FieldType::Number);
/// ```
#[derive(Clone, Debug)]
pub struct Field {
    name: Option<String>,
    index: usize,
    field_type: FieldType,
    ignore_blanks: bool,
    ignore_case: bool,
    random: bool,
}

impl Field {
    /// Create a new [Field]
    ///
    /// # Arguments
    /// * `index` - the index of the field, starting at 1. Index of 0 treats the complete line as a
    ///   field
    /// * `field_type` - the type of the field. See [FieldType] for supported types
    pub fn new(index: usize, field_type: FieldType) -> Field {
        Field {
            name: None,
            index,
            field_type,
            ignore_blanks: false,
            ignore_case: false,
            random: false,
        }
    }

    /// Create a [Field] addressed by its name in the header line.
    pub fn named(name: &str, field_type: FieldType) -> Field {
        Field {
            name: Some(name.to_string()),
            ..Field::new(0, field_type)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn ignore_blanks(&self) -> bool {
        self.ignore_blanks
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn random(&self) -> bool {
        self.random
    }

    /// Specify whether to ignore blanks for comparison. When true the field will be trimmed before
    /// comparison.
    pub fn with_ignore_blanks(mut self, ignore_blanks: bool) -> Field {
        self.ignore_blanks = ignore_blanks;
        self
    }

    /// Specify whether to ignore case for comparison.
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Field {
        self.ignore_case = ignore_case;
        self
    }

    /// Specify whether to generate a random field value. Specifying true will cause the file to
    /// be randomly shuffled.
    pub fn with_random(mut self, random: bool) -> Field {
        self.random = random;
        self
    }

    /// Replace a name with the position of that name in `header`.
    pub(crate) fn resolve(&self, header: Option<&[&str]>) -> Result<Field, anyhow::Error> {
        match (&self.name, header) {
            (None, _) => Ok(self.clone()),
            (Some(name), Some(header)) => {
                let position = header.iter()
                    .position(|title| title.trim() == name)
                    .ok_or_else(|| anyhow!("Field {:?} is not in the header: {:?}", name, header))?;
                Ok(
                    Field {
                        index: position + 1,
                        ..self.clone()
                    }
                )
            }
            (Some(name), None) => Err(anyhow!("Field {:?} is addressed by name but there is no header", name)),
        }
    }

    /// Build the sort key of one field value.
    pub(crate) fn key(&self, text: &str) -> Result<SortKey, anyhow::Error> {
        if self.random {
            return Ok(SortKey::lexical(&HEXLOWER.encode(&rand::random::<[u8; 16]>())));
        }

        let mut text = if self.ignore_blanks { text.trim().to_string() } else { text.to_string() };
        if self.ignore_case {
            text = text.to_uppercase();
        }

        match self.field_type {
            FieldType::String => Ok(SortKey::lexical(&text)),
            FieldType::Integer => {
                let i = text.trim().parse::<i64>()
                    .map_err(|e| anyhow!("{:?} is not an integer: {}", text, e))?;
                Ok(SortKey::from(Number::Integer(i)))
            }
            FieldType::Number => {
                let n = text.trim().parse::<f64>()
                    .map_err(|e| anyhow!("{:?} is not a number: {}", text, e))?;
                Ok(SortKey::from(Number::Float(n)))
            }
            FieldType::Natural => Ok(SortKey::new(&KeyValue::Text(text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_name() -> Result<(), anyhow::Error> {
        let header = ["id", " city", "amount"];
        let field = Field::named("city", FieldType::Natural).resolve(Some(&header))?;
        assert_eq!(field.index(), 2);
        assert!(Field::named("zip", FieldType::Natural).resolve(Some(&header)).is_err());
        assert!(Field::named("city", FieldType::Natural).resolve(None).is_err());
        assert_eq!(Field::new(3, FieldType::String).resolve(None)?.index(), 3);
        Ok(())
    }

    #[test]
    fn test_keys() -> Result<(), anyhow::Error> {
        let natural = Field::new(1, FieldType::Natural);
        assert!(natural.key("file2")? < natural.key("file10")?);
        let string = Field::new(1, FieldType::String);
        assert!(string.key("file2")? > string.key("file10")?);
        let integer = Field::new(1, FieldType::Integer);
        assert!(integer.key(" 9")? < integer.key("10")?);
        assert!(integer.key("x").is_err());
        let case = Field::new(1, FieldType::String).with_ignore_case(true).with_ignore_blanks(true);
        assert_eq!(case.key(" abc ")?, case.key("ABC")?);
        Ok(())
    }
}
