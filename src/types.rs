//! Core data types used throughout the crate
//!
//! # Key Types
//!
//! - **`Field`**: A column description (name, type, nullability)
//! - **`QuantizedField`**: The time-bucketing column of a table's partition key
//! - **`TableDefinition`**: Everything the DDL compiler needs to emit `CREATE TABLE`
//! - **`ColumnMetadata`**: One decoded row of a describe-table response
//! - **`Value`** / **`Row`**: Cell values as returned by the store
//! - **`KeyComponent`** / **`CompositeKey`**: A row's primary key, in key column order
//!
//! # Example
//!
//! ```rust
//! use quantum_ts::types::{Field, FieldType, QuantizedField, TableDefinition, TimeUnit};
//!
//! let time = QuantizedField::new("time", FieldType::Timestamp, 15, TimeUnit::Minutes).unwrap();
//! let def = TableDefinition::new(
//!     "GeoCheckin",
//!     time,
//!     vec![Field::new("region", FieldType::Varchar).not_null()],
//!     vec![Field::new("temperature", FieldType::Double)],
//! )
//! .unwrap();
//!
//! assert_eq!(def.key_column_names(), vec!["region", "time"]);
//! ```

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column type as understood by the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    /// UTF-8 string
    #[default]
    Varchar,
    /// Plain integer
    Int,
    /// Signed 64-bit integer
    Sint64,
    /// 64-bit float
    Double,
    /// Milliseconds since the Unix epoch
    Timestamp,
    /// true/false
    Boolean,
    /// Opaque bytes
    Blob,
    /// Any other store type, rendered verbatim
    Custom(String),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Varchar => write!(f, "VARCHAR"),
            FieldType::Int => write!(f, "INT"),
            FieldType::Sint64 => write!(f, "SINT64"),
            FieldType::Double => write!(f, "DOUBLE"),
            FieldType::Timestamp => write!(f, "TIMESTAMP"),
            FieldType::Boolean => write!(f, "BOOLEAN"),
            FieldType::Blob => write!(f, "BLOB"),
            FieldType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "VARCHAR" => FieldType::Varchar,
            "INT" => FieldType::Int,
            "SINT64" => FieldType::Sint64,
            "DOUBLE" => FieldType::Double,
            "TIMESTAMP" => FieldType::Timestamp,
            "BOOLEAN" => FieldType::Boolean,
            "BLOB" => FieldType::Blob,
            _ => FieldType::Custom(s.to_string()),
        })
    }
}

/// A column description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Column name
    pub name: String,
    /// Column type
    pub field_type: FieldType,
    /// Whether the column accepts NULL
    pub nullable: bool,
}

impl Field {
    /// Create a nullable field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Create a nullable VARCHAR field
    pub fn varchar(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Varchar)
    }

    /// Mark the field NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set nullability explicitly
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Unit of a quantum bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// `ms`
    Milliseconds,
    /// `s`
    Seconds,
    /// `m`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
}

impl TimeUnit {
    /// Unit literal used inside `QUANTUM(...)`
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" => Ok(TimeUnit::Milliseconds),
            "s" => Ok(TimeUnit::Seconds),
            "m" => Ok(TimeUnit::Minutes),
            "h" => Ok(TimeUnit::Hours),
            "d" => Ok(TimeUnit::Days),
            other => Err(SchemaError::UnknownUnit(other.to_string())),
        }
    }
}

/// The time-bucketing field of a table's partition key
///
/// Always NOT NULL when built through [`QuantizedField::new`]. The inner field
/// is public, so the DDL compiler re-checks nullability at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedField {
    /// Underlying column
    pub field: Field,
    /// Bucket width, in `unit`s
    pub bucket_size: u64,
    /// Bucket unit
    pub unit: TimeUnit,
}

impl QuantizedField {
    /// Create a quantized field; fails on a zero bucket size
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        bucket_size: u64,
        unit: TimeUnit,
    ) -> Result<Self, SchemaError> {
        let field = Field::new(name, field_type).not_null();
        if bucket_size == 0 {
            return Err(SchemaError::InvalidBucketSize {
                field: field.name,
                size: bucket_size,
            });
        }
        Ok(Self {
            field,
            bucket_size,
            unit,
        })
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.field.name
    }
}

/// A time-series table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name
    pub name: String,
    /// Time-bucketing field, last component of the key
    pub quantized_field: QuantizedField,
    /// Primary-key fields in key order, excluding the quantized field
    pub primary_key_fields: Vec<Field>,
    /// Non-key columns
    pub additional_fields: Vec<Field>,
}

impl TableDefinition {
    /// Create a validated table definition
    ///
    /// Fails with [`SchemaError::NullablePrimaryKey`] if any key field
    /// (including the quantized field) is nullable.
    pub fn new(
        name: impl Into<String>,
        quantized_field: QuantizedField,
        primary_key_fields: Vec<Field>,
        additional_fields: Vec<Field>,
    ) -> Result<Self, SchemaError> {
        let def = Self {
            name: name.into(),
            quantized_field,
            primary_key_fields,
            additional_fields,
        };
        def.validate()?;
        Ok(def)
    }

    /// Check the structural invariants
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::EmptyName("table"));
        }
        for field in self.key_fields() {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName("field"));
            }
            if field.nullable {
                return Err(SchemaError::NullablePrimaryKey(field.name.clone()));
            }
        }
        if self.additional_fields.iter().any(|f| f.name.is_empty()) {
            return Err(SchemaError::EmptyName("field"));
        }
        if self.quantized_field.bucket_size == 0 {
            return Err(SchemaError::InvalidBucketSize {
                field: self.quantized_field.field.name.clone(),
                size: 0,
            });
        }
        Ok(())
    }

    /// Key fields in key order: primary-key fields, then the quantized field
    pub fn key_fields(&self) -> impl Iterator<Item = &Field> {
        self.primary_key_fields
            .iter()
            .chain(std::iter::once(&self.quantized_field.field))
    }

    /// Key column names in key order
    pub fn key_column_names(&self) -> Vec<&str> {
        self.key_fields().map(|f| f.name.as_str()).collect()
    }

    /// Total number of columns
    pub fn column_count(&self) -> usize {
        self.primary_key_fields.len() + 1 + self.additional_fields.len()
    }
}

/// Decoded metadata for a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Store type name, as reported
    pub column_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Member of the partition key
    pub is_primary_key: bool,
    /// Member of the local key
    pub is_local_key: bool,
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer (SINT64 and TIMESTAMP columns)
    Int(i64),
    /// Float
    Double(f64),
    /// String
    Varchar(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Varchar(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Varchar(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Varchar(v)
    }
}

/// One row: cell values in column order
pub type Row = Vec<Value>;

/// One scalar component of a composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyComponent {
    /// Numeric component (e.g. a timestamp)
    Int(i64),
    /// Any other component
    Str(String),
}

impl fmt::Display for KeyComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyComponent::Int(i) => write!(f, "{}", i),
            KeyComponent::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for KeyComponent {
    fn from(v: i64) -> Self {
        KeyComponent::Int(v)
    }
}

impl From<i32> for KeyComponent {
    fn from(v: i32) -> Self {
        KeyComponent::Int(i64::from(v))
    }
}

impl From<&str> for KeyComponent {
    fn from(v: &str) -> Self {
        KeyComponent::Str(v.to_string())
    }
}

impl From<String> for KeyComponent {
    fn from(v: String) -> Self {
        KeyComponent::Str(v)
    }
}

/// A row's primary key, components in key column order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeKey(pub Vec<KeyComponent>);

impl CompositeKey {
    /// Create a key from its components
    pub fn new(components: Vec<KeyComponent>) -> Self {
        Self(components)
    }

    /// Key components in order
    pub fn components(&self) -> &[KeyComponent] {
        &self.0
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a key without components
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<KeyComponent>> for CompositeKey {
    fn from(components: Vec<KeyComponent>) -> Self {
        Self(components)
    }
}

/// Comma-separated, the store's key listing format
impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

/// Build a [`CompositeKey`] from mixed integer and string literals
///
/// ```rust
/// use quantum_ts::key;
/// use quantum_ts::types::KeyComponent;
///
/// let k = key![1, "alpha"];
/// assert_eq!(k.components(), &[KeyComponent::Int(1), KeyComponent::from("alpha")]);
/// ```
#[macro_export]
macro_rules! key {
    ($($component:expr),* $(,)?) => {
        $crate::types::CompositeKey::new(vec![$($crate::types::KeyComponent::from($component)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_defaults_to_nullable() {
        let field = Field::varchar("name");
        assert!(field.nullable);
        assert_eq!(field.field_type, FieldType::Varchar);
        assert!(!field.not_null().nullable);
    }

    #[test]
    fn test_quantized_field_is_never_nullable() {
        let q = QuantizedField::new("time", FieldType::Timestamp, 1, TimeUnit::Hours).unwrap();
        assert!(!q.field.nullable);
        assert_eq!(q.name(), "time");
    }

    #[test]
    fn test_quantized_field_rejects_zero_bucket() {
        let err = QuantizedField::new("time", FieldType::Timestamp, 0, TimeUnit::Hours).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidBucketSize { size: 0, .. }));
    }

    #[test]
    fn test_table_definition_rejects_nullable_key() {
        let q = QuantizedField::new("time", FieldType::Timestamp, 15, TimeUnit::Minutes).unwrap();
        let err = TableDefinition::new("t", q, vec![Field::varchar("region")], vec![]).unwrap_err();
        assert_eq!(err, SchemaError::NullablePrimaryKey("region".to_string()));
    }

    #[test]
    fn test_table_definition_allows_nullable_additional_fields() {
        let q = QuantizedField::new("time", FieldType::Timestamp, 15, TimeUnit::Minutes).unwrap();
        let def = TableDefinition::new(
            "t",
            q,
            vec![Field::varchar("region").not_null()],
            vec![Field::new("temp", FieldType::Double)],
        )
        .unwrap();
        assert_eq!(def.column_count(), 3);
        assert_eq!(def.key_column_names(), vec!["region", "time"]);
    }

    #[test]
    fn test_time_unit_parse() {
        assert_eq!("m".parse::<TimeUnit>().unwrap(), TimeUnit::Minutes);
        assert_eq!("d".parse::<TimeUnit>().unwrap(), TimeUnit::Days);
        assert!("weeks".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_field_type_parse_keeps_unknown_types() {
        assert_eq!("double".parse::<FieldType>().unwrap(), FieldType::Double);
        assert_eq!(
            "geo".parse::<FieldType>().unwrap(),
            FieldType::Custom("geo".to_string())
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Double(1.0).to_string(), "1");
        assert_eq!(Value::Double(21.5).to_string(), "21.5");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_composite_key_display() {
        let key = CompositeKey::new(vec![KeyComponent::Int(1), KeyComponent::from("alpha")]);
        assert_eq!(key.to_string(), "1,alpha");
        assert_eq!(key.len(), 2);
    }
}
