use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::errors::StorageError;
use crate::engine::storage::DataTable;
use crate::engine::types::LogicalType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub logical_type: LogicalType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

/// Name to table map. Lookups hand out `Arc`s, so a dropped table stays
/// alive for readers that already hold it.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: RwLock<BTreeMap<String, Arc<DataTable>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<Arc<DataTable>, StorageError> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    pub fn insert(&self, table: DataTable) -> Result<Arc<DataTable>, StorageError> {
        let mut tables = self.tables.write();
        if tables.contains_key(table.name()) {
            return Err(StorageError::TableExists(table.name().to_string()));
        }
        let table = Arc::new(table);
        tables.insert(table.name().to_string(), Arc::clone(&table));
        info!(
            target: "catalog::insert",
            table = %table.name(), columns = table.column_count(),
            "Table registered"
        );
        Ok(table)
    }

    pub fn remove(&self, name: &str) -> Result<Arc<DataTable>, StorageError> {
        let table = self
            .tables
            .write()
            .remove(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))?;
        table.mark_dropped();
        info!(target: "catalog::remove", table = %name, "Table dropped");
        Ok(table)
    }

    /// All tables in name order.
    pub fn tables(&self) -> Vec<Arc<DataTable>> {
        self.tables.read().values().cloned().collect()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}
