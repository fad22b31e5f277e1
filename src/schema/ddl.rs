//! CREATE TABLE compilation
//!
//! Renders a [`TableDefinition`] into a single statement:
//!
//! ```text
//! CREATE TABLE GeoCheckin (
//!     region VARCHAR NOT NULL,          <- primary-key fields, in order
//!     time TIMESTAMP NOT NULL,          <- quantized field
//!     temperature DOUBLE NULL,          <- additional fields
//!     PRIMARY KEY ((region, QUANTUM(time, 15, 'm')), region, time)
//! )                 ^ partition key                  ^ local key
//! ```
//!
//! The output is emitted on one line; the layout above is only illustrative.

use crate::error::SchemaError;
use crate::types::{Field, QuantizedField, TableDefinition};
use tracing::debug;

/// Compile a table definition into a `CREATE TABLE` statement
///
/// Every key field, including the quantized one, is checked for nullability
/// while rendering; the first violation aborts compilation and nothing is
/// returned.
///
/// # Example
///
/// ```rust
/// use quantum_ts::schema::compile_create_table;
/// use quantum_ts::types::{Field, FieldType, QuantizedField, TableDefinition, TimeUnit};
///
/// let def = TableDefinition::new(
///     "GeoCheckin",
///     QuantizedField::new("time", FieldType::Timestamp, 15, TimeUnit::Minutes).unwrap(),
///     vec![Field::varchar("region").not_null()],
///     vec![Field::new("temperature", FieldType::Double)],
/// )
/// .unwrap();
///
/// assert_eq!(
///     compile_create_table(&def).unwrap(),
///     "CREATE TABLE GeoCheckin (region VARCHAR NOT NULL, time TIMESTAMP NOT NULL, \
///      temperature DOUBLE NULL, PRIMARY KEY ((region, QUANTUM(time, 15, 'm')), region, time))"
/// );
/// ```
pub fn compile_create_table(def: &TableDefinition) -> Result<String, SchemaError> {
    if def.name.is_empty() {
        return Err(SchemaError::EmptyName("table"));
    }

    let columns = render_column_list(def)?;
    let constraint = render_primary_key(&def.quantized_field, &def.primary_key_fields)?;

    debug!(
        table = %def.name,
        columns = def.column_count(),
        "Compiled CREATE TABLE statement"
    );

    Ok(format!(
        "CREATE TABLE {} ({}, {})",
        def.name, columns, constraint
    ))
}

/// Render `name type NULL|NOT NULL` for every column
fn render_column_list(def: &TableDefinition) -> Result<String, SchemaError> {
    let mut items = Vec::with_capacity(def.column_count());

    for field in &def.primary_key_fields {
        items.push(render_column(field, true)?);
    }
    items.push(render_column(&def.quantized_field.field, true)?);
    for field in &def.additional_fields {
        items.push(render_column(field, false)?);
    }

    Ok(items.join(", "))
}

fn render_column(field: &Field, is_key: bool) -> Result<String, SchemaError> {
    if field.name.is_empty() {
        return Err(SchemaError::EmptyName("field"));
    }
    if is_key && field.nullable {
        return Err(SchemaError::NullablePrimaryKey(field.name.clone()));
    }

    let nullability = if field.nullable { "NULL" } else { "NOT NULL" };
    Ok(format!("{} {} {}", field.name, field.field_type, nullability))
}

/// Render `PRIMARY KEY ((pk..., QUANTUM(q, n, 'u')), pk..., q)`
fn render_primary_key(
    quantized: &QuantizedField,
    primary_key_fields: &[Field],
) -> Result<String, SchemaError> {
    if quantized.bucket_size == 0 {
        return Err(SchemaError::InvalidBucketSize {
            field: quantized.field.name.clone(),
            size: 0,
        });
    }

    let partition: Vec<String> = primary_key_fields
        .iter()
        .map(|f| f.name.clone())
        .chain(std::iter::once(format!(
            "QUANTUM({}, {}, '{}')",
            quantized.field.name, quantized.bucket_size, quantized.unit
        )))
        .collect();

    let local: Vec<&str> = primary_key_fields
        .iter()
        .map(|f| f.name.as_str())
        .chain(std::iter::once(quantized.field.name.as_str()))
        .collect();

    Ok(format!(
        "PRIMARY KEY (({}), {})",
        partition.join(", "),
        local.join(", ")
    ))
}
