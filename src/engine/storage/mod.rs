pub mod catalog;
pub mod checkpoint;
pub mod data_table;
pub mod database;
pub mod table_filter;
pub mod table_scan;

pub use catalog::{Catalog, ColumnDefinition};
pub use checkpoint::{CheckpointStore, CURRENT_FILE_NAME, checkpoint_file_name};
pub use data_table::{DataTable, RowId, TableData};
pub use database::Database;
pub use table_filter::{BoundFilters, TableFilter};
pub use table_scan::{ScanChunk, TableScan};

#[cfg(test)]
mod table_scan_test;
