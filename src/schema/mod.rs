//! Table schema: DDL compilation, describe decoding and table discovery
//!
//! # Components
//!
//! - **DDL Compiler** ([`compile_create_table`]): `TableDefinition` → `CREATE TABLE`
//! - **Column Introspector** ([`decode_describe`]): describe rows → `ColumnMetadata`
//! - **Catalog** ([`catalog::list_tables`]): table names from a node's DDL directory

pub mod catalog;
pub mod ddl;
pub mod describe;

pub use catalog::list_tables;
pub use ddl::compile_create_table;
pub use describe::{decode_describe, store_flag_to_bool};
