use std::sync::Arc;

use crate::{
    cells::Cell,
    errors::SnowflakeResult,
    statement::{ColumnType, WirePartitionInfo, WireStatementMetaData},
};
pub type StringTable = Vec<Vec<Option<String>>>;

/// A block of rows from a result set, together with the column metadata
#[derive(Debug, Clone)]
pub struct Partition {
    pub(crate) meta_data: WireStatementMetaData,
    pub(crate) data: Arc<StringTable>,
    pub(crate) index: usize,
}

impl Partition {
    /// Build a standalone partition from column metadata and raw rows
    pub fn new(columns: Vec<ColumnType>, data: StringTable) -> Partition {
        Partition {
            meta_data: WireStatementMetaData {
                num_rows: data.len(),
                row_type: columns,
                partition_info: vec![WirePartitionInfo {}],
            },
            data: Arc::new(data),
            index: 0,
        }
    }

    /// Get the index of this partition
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the number of rows in just this partition
    /// This is obtained from data.len() rather than the metadata
    /// because this partition may have been constructed by concatenating
    pub fn num_rows(&self) -> usize {
        self.data.len()
    }

    pub fn column_types(&self) -> &[ColumnType] {
        &self.meta_data.row_type
    }

    /// Column names, lower-cased so callers can compare them case-insensitively
    pub fn column_names(&self) -> Vec<String> {
        self.meta_data
            .row_type
            .iter()
            .map(|column| column.name.to_lowercase())
            .collect()
    }

    /// Get the cells in this partition as strings just as they were returned from Snowflake
    ///
    /// This could be more efficient for some use cases than converting to `Cell`s
    /// but without the type information it could be difficult to work with
    pub fn raw_cells(&self) -> &[Vec<Option<String>>] {
        self.data.as_ref()
    }

    /// Convert the response into `Cell`s in a list of lists format
    ///
    /// This most closely matches the format of the response from Snowflake
    pub fn cells(&self) -> SnowflakeResult<Vec<Vec<Cell>>> {
        self.data
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.meta_data.row_type)
                    .map(|(value, row_type)| row_type.data_type.to_cell(value))
                    .collect()
            })
            .collect()
    }

    /// Convert the response into `serde_json::Value`s in a list of lists format
    pub fn json_table(&self) -> SnowflakeResult<Vec<Vec<serde_json::Value>>> {
        Ok(self
            .cells()?
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.into()).collect())
            .collect())
    }

    /// Convert the response into `serde_json::Value`s in a list of objects format
    pub fn json_objects(&self) -> SnowflakeResult<Vec<serde_json::Value>> {
        Ok(self
            .json_table()?
            .into_iter()
            .map(|row| {
                serde_json::Value::Object(
                    row.into_iter()
                        .enumerate()
                        .map(|(i, cell)| (self.meta_data.row_type[i].name.clone(), cell))
                        .collect(),
                )
            })
            .collect())
    }
}
