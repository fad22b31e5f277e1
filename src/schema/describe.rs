//! Describe-table decoding
//!
//! A describe response is a list of positional rows:
//!
//! ```text
//! [name, type, nullable-flag, primary-key-flag, local-key-flag, ...]
//! ```
//!
//! The store encodes the three flags with inverted polarity: a flag value of
//! `0` means the property holds. All flag handling goes through
//! [`store_flag_to_bool`].

use crate::error::DecodeError;
use crate::types::{ColumnMetadata, Value};
use std::collections::HashMap;

const NAME: usize = 0;
const TYPE: usize = 1;
const NULLABLE: usize = 2;
const PRIMARY_KEY: usize = 3;
const LOCAL_KEY: usize = 4;

/// Convert a store flag to a boolean
///
/// `0` (in any numeric-looking encoding) maps to `true`, any non-zero value to
/// `false`. An absent or null flag maps to `true`.
pub fn store_flag_to_bool(flag: Option<&Value>) -> bool {
    let Some(flag) = flag else {
        return true;
    };
    match flag {
        Value::Null => true,
        Value::Int(n) => *n == 0,
        Value::Boolean(b) => !*b,
        Value::Double(d) => truncates_to_zero(*d),
        Value::Varchar(s) => s
            .trim()
            .parse::<f64>()
            .map(truncates_to_zero)
            .unwrap_or(true),
    }
}

fn truncates_to_zero(d: f64) -> bool {
    d.is_nan() || d.trunc() == 0.0
}

/// Decode describe-table rows into column metadata keyed by column name
///
/// Name and type are required; the three flags default per
/// [`store_flag_to_bool`]. A later row with a duplicate name replaces the
/// earlier one.
pub fn decode_describe(
    raw_rows: &[Vec<Value>],
) -> Result<HashMap<String, ColumnMetadata>, DecodeError> {
    let mut columns = HashMap::with_capacity(raw_rows.len());

    for (index, row) in raw_rows.iter().enumerate() {
        let name = required(row, index, NAME, "name")?;
        let column_type = required(row, index, TYPE, "type")?;

        columns.insert(
            name.clone(),
            ColumnMetadata {
                name,
                column_type,
                nullable: store_flag_to_bool(row.get(NULLABLE)),
                is_primary_key: store_flag_to_bool(row.get(PRIMARY_KEY)),
                is_local_key: store_flag_to_bool(row.get(LOCAL_KEY)),
            },
        );
    }

    Ok(columns)
}

fn required(
    row: &[Value],
    index: usize,
    position: usize,
    field: &'static str,
) -> Result<String, DecodeError> {
    match row.get(position) {
        None | Some(Value::Null) => Err(DecodeError::MissingField { row: index, field }),
        Some(value) => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<Value>) -> Vec<Value> {
        values
    }

    #[test]
    fn test_flag_polarity() {
        assert!(store_flag_to_bool(Some(&Value::Int(0))));
        assert!(!store_flag_to_bool(Some(&Value::Int(1))));
        assert!(!store_flag_to_bool(Some(&Value::Int(-3))));
        assert!(store_flag_to_bool(Some(&Value::Boolean(false))));
        assert!(!store_flag_to_bool(Some(&Value::Boolean(true))));
        assert!(store_flag_to_bool(Some(&Value::Double(0.4))));
        assert!(!store_flag_to_bool(Some(&Value::Double(1.0))));
        assert!(store_flag_to_bool(Some(&Value::from("0"))));
        assert!(!store_flag_to_bool(Some(&Value::from("1"))));
        assert!(store_flag_to_bool(Some(&Value::from("yes"))));
    }

    #[test]
    fn test_missing_flag_defaults_true() {
        assert!(store_flag_to_bool(None));
        assert!(store_flag_to_bool(Some(&Value::Null)));
    }

    #[test]
    fn test_decode_amount_column() {
        let rows = vec![row(vec![
            "amount".into(),
            "double".into(),
            0.into(),
            1.into(),
            1.into(),
        ])];
        let columns = decode_describe(&rows).unwrap();
        let amount = &columns["amount"];
        assert_eq!(amount.column_type, "double");
        assert!(amount.nullable);
        assert!(!amount.is_primary_key);
        assert!(!amount.is_local_key);
    }

    #[test]
    fn test_decode_short_row_defaults_flags() {
        let rows = vec![row(vec!["region".into(), "varchar".into(), 1.into()])];
        let columns = decode_describe(&rows).unwrap();
        let region = &columns["region"];
        assert!(!region.nullable);
        assert!(region.is_primary_key);
        assert!(region.is_local_key);
    }

    #[test]
    fn test_decode_duplicate_name_last_wins() {
        let rows = vec![
            row(vec!["a".into(), "varchar".into(), 0.into(), 0.into(), 0.into()]),
            row(vec!["a".into(), "sint64".into(), 1.into(), 1.into(), 1.into()]),
        ];
        let columns = decode_describe(&rows).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns["a"].column_type, "sint64");
    }

    #[test]
    fn test_decode_missing_type_fails() {
        let rows = vec![
            row(vec!["ok".into(), "varchar".into()]),
            row(vec!["broken".into()]),
        ];
        assert_eq!(
            decode_describe(&rows),
            Err(DecodeError::MissingField { row: 1, field: "type" })
        );
    }

    #[test]
    fn test_decode_null_name_fails() {
        let rows = vec![row(vec![Value::Null, "varchar".into()])];
        assert_eq!(
            decode_describe(&rows),
            Err(DecodeError::MissingField { row: 0, field: "name" })
        );
    }

    #[test]
    fn test_decode_is_idempotent() {
        let rows = vec![
            row(vec!["time".into(), "timestamp".into(), 1.into(), 0.into(), 0.into()]),
            row(vec!["temp".into(), "double".into(), 0.into(), 1.into(), 1.into()]),
        ];
        assert_eq!(decode_describe(&rows), decode_describe(&rows));
    }
}
