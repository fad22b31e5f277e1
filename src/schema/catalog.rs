//! Table discovery from a node's compiled DDL artefacts
//!
//! Every table the store has compiled leaves one or more files named
//! `riak_ql_table_<table>$<version>.beam` under `<node>/data/ddl_ebin/`.
//! Listing that directory is the only way to enumerate tables without a
//! query surface.

use crate::config::NodeDescriptor;
use crate::error::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-name prefix of compiled table DDL
pub const DDL_FILE_PREFIX: &str = "riak_ql_table_";

/// Directory holding compiled DDL, relative to the node root
pub const DDL_DIR: &str = "data/ddl_ebin";

/// Extract a table name from a compiled DDL file name
///
/// Returns `None` for files that do not follow the
/// `riak_ql_table_<table>$<suffix>` pattern.
pub fn table_name_from_file(file_name: &str) -> Option<&str> {
    let start = file_name.find(DDL_FILE_PREFIX)? + DDL_FILE_PREFIX.len();
    let rest = &file_name[start..];
    let end = rest.find('$')?;
    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix('~') {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            let stripped = stripped.trim_start_matches('/');
            if !stripped.is_empty() {
                expanded.push(stripped);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}

/// List the tables known to a node, sorted and de-duplicated across versions
pub async fn list_tables(node: &NodeDescriptor) -> Result<Vec<String>> {
    let dir = expand_home(&node.rel_path).join(DDL_DIR);
    list_tables_in(&dir).await
}

/// List the tables whose compiled DDL lives in `dir`
pub async fn list_tables_in(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut tables = BTreeSet::new();

    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        match table_name_from_file(&file_name) {
            Some(table) => {
                tables.insert(table.to_string());
            },
            None => debug!(file = %file_name, "Skipping non-DDL file"),
        }
    }

    debug!(dir = %dir.display(), tables = tables.len(), "Listed tables");
    Ok(tables.into_iter().collect())
}
