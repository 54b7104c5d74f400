//! Writing a polars `DataFrame` to a table and reading it back

use std::path::Path;
use std::str::FromStr;

use polars::prelude::{CsvReadOptions, DataFrame, DataType, SerReader, Series};

use crate::bindings::Binding;
use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::executor::Executor;
use crate::frame;
use crate::identifier::{Identifier, QualifiedTable};
use crate::lifecycle::{column_list, ColumnDef, SqlType};

/// Snowflake accepts at most this many rows in one `VALUES` clause
const MAX_ROWS_PER_INSERT: usize = 16_384;

pub const IF_EXISTS_OPTIONS: &[&str] = &["fail", "replace", "append"];

/// What to do when the destination table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    /// Refuse to write, with [`SnowflakeError::Conflict`]
    Fail,
    /// Drop the table and create it again from the payload's columns
    #[default]
    Replace,
    /// Insert into the existing table
    Append,
}

impl IfExists {
    fn create_table(self, table: &QualifiedTable, columns: &str) -> String {
        match self {
            IfExists::Fail => format!("CREATE TABLE {table} ({columns})"),
            IfExists::Replace => format!("CREATE OR REPLACE TABLE {table} ({columns})"),
            IfExists::Append => format!("CREATE TABLE IF NOT EXISTS {table} ({columns})"),
        }
    }
}

impl FromStr for IfExists {
    type Err = SnowflakeError;

    fn from_str(value: &str) -> SnowflakeResult<IfExists> {
        match value {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            _ => Err(SnowflakeError::Validation {
                value: value.to_owned(),
                allowed: IF_EXISTS_OPTIONS,
            }),
        }
    }
}

/// Column definitions and row-major values for a payload
struct Payload {
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Binding>>,
}

impl Payload {
    fn from_frame(data: &DataFrame) -> SnowflakeResult<Payload> {
        if data.width() == 0 {
            return Err(SnowflakeError::SchemaMismatch(
                "the dataframe has no columns".to_owned(),
            ));
        }
        let mut columns = Vec::with_capacity(data.width());
        let mut rows = vec![Vec::with_capacity(data.width()); data.height()];
        for column in data.get_columns() {
            let series = column.as_materialized_series();
            let (data_type, values) = column_values(series)?;
            columns.push(ColumnDef::new(series.name().as_str(), data_type)?);
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(Payload { columns, rows })
    }

    fn inserts(&self, table: &QualifiedTable) -> Vec<String> {
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let names = names.join(", ");
        self.rows
            .chunks(MAX_ROWS_PER_INSERT)
            .map(|chunk| {
                let values: Vec<String> = chunk
                    .iter()
                    .map(|row| {
                        let literals: Vec<String> =
                            row.iter().map(Binding::to_sql_literal).collect();
                        format!("({})", literals.join(", "))
                    })
                    .collect();
                format!("INSERT INTO {table} ({names}) VALUES {}", values.join(", "))
            })
            .collect()
    }
}

fn column_values(series: &Series) -> SnowflakeResult<(SqlType, Vec<Binding>)> {
    let as_text = |series: &Series| -> SnowflakeResult<Vec<Binding>> {
        Ok(series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(Binding::from)
            .collect())
    };
    let column = match series.dtype() {
        DataType::Boolean => (
            SqlType::Boolean,
            series.bool()?.into_iter().map(Binding::from).collect(),
        ),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => (
            SqlType::Integer,
            series
                .cast(&DataType::Int64)?
                .i64()?
                .into_iter()
                .map(Binding::from)
                .collect(),
        ),
        DataType::UInt64 => (
            SqlType::Integer,
            series.u64()?.into_iter().map(Binding::from).collect(),
        ),
        DataType::Float32 | DataType::Float64 => (
            SqlType::Float,
            series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(Binding::from)
                .collect(),
        ),
        DataType::String => (
            SqlType::Text,
            series.str()?.into_iter().map(Binding::from).collect(),
        ),
        DataType::Date => (SqlType::Date, as_text(series)?),
        DataType::Time => (SqlType::Time, as_text(series)?),
        DataType::Datetime(_, _) => (SqlType::Timestamp, as_text(series)?),
        DataType::Null => (SqlType::Text, vec![Binding::null(); series.len()]),
        other => {
            return Err(SnowflakeError::SchemaMismatch(format!(
                "column {} has unsupported type {other}",
                series.name()
            )))
        }
    };
    Ok(column)
}

/// Looks the table up with `SHOW TABLES`, which needs no running warehouse
///
/// `LIKE` treats `_` as a wildcard, so the returned names are compared exactly.
async fn table_exists<E: Executor + ?Sized>(
    conn: &E,
    table: &QualifiedTable,
) -> SnowflakeResult<bool> {
    let sql = format!(
        "SHOW TABLES LIKE {} IN SCHEMA {}.{}",
        Binding::from(table.table.as_str()).to_sql_literal(),
        table.database,
        table.schema
    );
    let result = conn.execute(&sql, &[]).await?;
    let Some(name_index) = result.column_names().iter().position(|name| name == "name") else {
        return Ok(false);
    };
    Ok(result.raw_cells().iter().any(|row| {
        row.get(name_index)
            .and_then(Option::as_deref)
            .is_some_and(|name| name.eq_ignore_ascii_case(table.table.as_str()))
    }))
}

/// Uploads a polars `DataFrame` to `table` using `warehouse_name`, then reads the whole table back
///
/// The write and the read-back run as one script in one session. Rows are inserted inside
/// a transaction that is committed only after the read-back, so a failure part way through
/// leaves no partial rows visible. Table creation is DDL and commits on its own.
pub async fn upload_polars_df_to_snowflake<E: Executor + ?Sized>(
    conn: &E,
    data: &DataFrame,
    warehouse_name: &str,
    table: &QualifiedTable,
    if_exists: IfExists,
) -> SnowflakeResult<DataFrame> {
    let warehouse = Identifier::new(warehouse_name)?;
    let payload = Payload::from_frame(data)?;

    if if_exists == IfExists::Fail && table_exists(conn, table).await? {
        return Err(SnowflakeError::Conflict {
            table: table.to_string(),
        });
    }

    let mut script = vec![
        format!("USE WAREHOUSE {warehouse}"),
        if_exists.create_table(table, &column_list(&payload.columns)?),
        "BEGIN".to_owned(),
    ];
    script.extend(payload.inserts(table));
    script.push(format!("SELECT * FROM {table}"));
    script.push("COMMIT".to_owned());
    let select_index = script.len() - 2;

    log::info!(
        "Uploading {} rows to {} ({:?}) in {} statements",
        data.height(),
        table,
        if_exists,
        script.len()
    );
    let results = conn
        .execute_script(&script)
        .await
        .map_err(|err| err.for_write_target(&table.to_string()))?;
    let read_back = results
        .get(select_index)
        .ok_or(SnowflakeError::MissingResults {
            expected: script.len(),
            got: results.len(),
        })?;
    frame::to_polars(read_back)
}

/// Reads a local CSV file with a header row and uploads it like [`upload_polars_df_to_snowflake`]
pub async fn upload_csv_to_snowflake<E: Executor + ?Sized>(
    conn: &E,
    csv_path: impl AsRef<Path>,
    warehouse_name: &str,
    table: &QualifiedTable,
    if_exists: IfExists,
) -> SnowflakeResult<DataFrame> {
    let data = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(csv_path.as_ref().to_path_buf()))?
        .finish()?;
    upload_polars_df_to_snowflake(conn, &data, warehouse_name, table, if_exists).await
}
