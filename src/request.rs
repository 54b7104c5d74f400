//! Reading a table into a list of rows, a polars `DataFrame`, or a DataFusion `DataFrame`
//!
//! All three variants run the same query and differ only in how the rows are materialized.

use datafusion::prelude::SessionContext;

use crate::cells::Cell;
use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::executor::Executor;
use crate::frame;
use crate::identifier::{Identifier, QualifiedTable};
use crate::partition::Partition;

pub const DEFAULT_ROW_AMOUNT: u64 = 1000;

/// What to read: a table, how many rows, and optionally which columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRequest {
    pub table: QualifiedTable,
    pub row_amount: u64,
    pub column_list: Option<Vec<String>>,
}

impl TableRequest {
    /// All columns of the first 1000 rows
    pub fn new(
        database_name: &str,
        schema_name: &str,
        table_name: &str,
    ) -> SnowflakeResult<TableRequest> {
        Ok(TableRequest {
            table: QualifiedTable::new(database_name, schema_name, table_name)?,
            row_amount: DEFAULT_ROW_AMOUNT,
            column_list: None,
        })
    }

    pub fn with_row_amount(mut self, row_amount: u64) -> TableRequest {
        self.row_amount = row_amount;
        self
    }

    /// Only select these columns, in this order
    pub fn with_columns<I, S>(mut self, columns: I) -> TableRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_list = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// The `SELECT` this request runs; column names are validated here
    pub fn to_sql(&self) -> SnowflakeResult<String> {
        let projection = match &self.column_list {
            None => "*".to_owned(),
            Some(columns) if columns.is_empty() => {
                return Err(SnowflakeError::SchemaMismatch(
                    "the column list is empty".to_owned(),
                ))
            }
            Some(columns) => columns
                .iter()
                .map(|column| Identifier::new(column).map(|c| c.to_string()))
                .collect::<SnowflakeResult<Vec<_>>>()?
                .join(","),
        };
        Ok(format!(
            "SELECT {projection} FROM {} LIMIT {}",
            self.table, self.row_amount
        ))
    }
}

/// Runs the request once and returns the raw result set
pub async fn fetch<E: Executor + ?Sized>(
    conn: &E,
    request: &TableRequest,
) -> SnowflakeResult<Partition> {
    let sql = request.to_sql()?;
    log::debug!("Requesting {}", sql);
    conn.execute(&sql, &[])
        .await
        .map_err(|err| err.for_read_target(&request.table.to_string()))
}

/// Requests a table as rows of cells, plus the lower-cased column names
pub async fn request_snowflake_to_list<E: Executor + ?Sized>(
    conn: &E,
    request: &TableRequest,
) -> SnowflakeResult<(Vec<Vec<Cell>>, Vec<String>)> {
    let result = fetch(conn, request).await?;
    Ok((result.cells()?, result.column_names()))
}

/// Requests a table as a polars `DataFrame` with lower-cased column names
pub async fn request_snowflake_to_polars_df<E: Executor + ?Sized>(
    conn: &E,
    request: &TableRequest,
) -> SnowflakeResult<polars::prelude::DataFrame> {
    let result = fetch(conn, request).await?;
    frame::to_polars(&result)
}

/// Requests a table as a DataFusion `DataFrame` with lower-cased column names
///
/// The frame lives in `ctx`, or in a fresh `SessionContext` when none is given.
pub async fn request_snowflake_to_datafusion_df<E: Executor + ?Sized>(
    conn: &E,
    ctx: Option<&SessionContext>,
    request: &TableRequest,
) -> SnowflakeResult<datafusion::dataframe::DataFrame> {
    let result = fetch(conn, request).await?;
    match ctx {
        Some(ctx) => frame::to_datafusion(&result, ctx),
        None => frame::to_datafusion(&result, &SessionContext::new()),
    }
}
