//! Turning result sets into dataframes
//!
//! Both dataframe flavours are built from the same typed columns, so a polars
//! frame and a DataFusion frame of one result set always agree on shape and names.

use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use datafusion::arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
    Time64NanosecondArray, TimestampMicrosecondArray,
};
use datafusion::arrow::datatypes::{
    DataType as ArrowType, Field, Schema, TimeUnit as ArrowTimeUnit,
};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::prelude::SessionContext;
use polars::prelude::{DataFrame, DataType, NamedFrom, Series, TimeUnit};

use crate::cells::{Cell, RawCell};
use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::partition::Partition;
use crate::statement::ColumnType;

const UTC: &str = "UTC";

/// One column of a result set, in a single physical type
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    /// Days since the epoch
    Date(Vec<Option<i32>>),
    /// Nanoseconds since midnight
    Time(Vec<Option<i64>>),
    /// Microseconds since the epoch, wall clock without a zone
    Timestamp(Vec<Option<i64>>),
    /// Microseconds since the epoch for instants, shown in UTC
    ZonedTimestamp(Vec<Option<i64>>),
    Binary(Vec<Option<Vec<u8>>>),
}

impl ColumnData {
    fn for_column(column: &ColumnType, capacity: usize) -> ColumnData {
        match column.data_type {
            RawCell::Fixed if column.scale.unwrap_or(0) == 0 => {
                ColumnData::Int(Vec::with_capacity(capacity))
            }
            RawCell::Fixed | RawCell::Real => ColumnData::Float(Vec::with_capacity(capacity)),
            RawCell::Boolean => ColumnData::Boolean(Vec::with_capacity(capacity)),
            RawCell::Date => ColumnData::Date(Vec::with_capacity(capacity)),
            RawCell::Time => ColumnData::Time(Vec::with_capacity(capacity)),
            RawCell::TimestampNtz => ColumnData::Timestamp(Vec::with_capacity(capacity)),
            RawCell::TimestampLtz | RawCell::TimestampTz => {
                ColumnData::ZonedTimestamp(Vec::with_capacity(capacity))
            }
            RawCell::Binary => ColumnData::Binary(Vec::with_capacity(capacity)),
            RawCell::Text | RawCell::Variant | RawCell::Object | RawCell::Array => {
                ColumnData::Text(Vec::with_capacity(capacity))
            }
        }
    }

    fn push(&mut self, cell: Cell) -> SnowflakeResult<()> {
        let mismatch = |cell: &Cell, expected: &str| {
            SnowflakeError::SchemaMismatch(format!("{cell:?} in a {expected} column"))
        };
        match (self, cell) {
            (ColumnData::Int(values), Cell::Null) => values.push(None),
            (ColumnData::Int(values), Cell::Int(x)) => values.push(Some(
                i64::try_from(x).map_err(|_| mismatch(&Cell::Int(x), "64-bit integer"))?,
            )),
            (ColumnData::Float(values), Cell::Null) => values.push(None),
            (ColumnData::Float(values), Cell::Int(x)) => values.push(Some(x as f64)),
            (ColumnData::Float(values), Cell::Float(x)) => values.push(Some(x)),
            (ColumnData::Boolean(values), Cell::Null) => values.push(None),
            (ColumnData::Boolean(values), Cell::Boolean(x)) => values.push(Some(x)),
            (ColumnData::Text(values), Cell::Null) => values.push(None),
            (ColumnData::Text(values), Cell::Varchar(x)) => values.push(Some(x)),
            (ColumnData::Date(values), Cell::Null) => values.push(None),
            (ColumnData::Date(values), Cell::Date(x)) => {
                values.push(Some((x - NaiveDate::default()).num_days() as i32))
            }
            (ColumnData::Time(values), Cell::Null) => values.push(None),
            (ColumnData::Time(values), Cell::Time(x)) => values.push(Some(
                x.num_seconds_from_midnight() as i64 * 1_000_000_000 + x.nanosecond() as i64,
            )),
            (ColumnData::Timestamp(values), Cell::Null) => values.push(None),
            (ColumnData::Timestamp(values), Cell::TimestampNtz(x)) => {
                values.push(Some(x.and_utc().timestamp_micros()))
            }
            (ColumnData::ZonedTimestamp(values), Cell::Null) => values.push(None),
            (ColumnData::ZonedTimestamp(values), Cell::TimestampLtz(x)) => {
                values.push(Some(x.timestamp_micros()))
            }
            (ColumnData::ZonedTimestamp(values), Cell::TimestampTz(x)) => {
                values.push(Some(x.timestamp_micros()))
            }
            (ColumnData::Binary(values), Cell::Null) => values.push(None),
            (ColumnData::Binary(values), Cell::Binary(x)) => values.push(Some(x)),
            (column, cell) => return Err(mismatch(&cell, column.type_name())),
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        match self {
            ColumnData::Int(_) => "integer",
            ColumnData::Float(_) => "float",
            ColumnData::Boolean(_) => "boolean",
            ColumnData::Text(_) => "text",
            ColumnData::Date(_) => "date",
            ColumnData::Time(_) => "time",
            ColumnData::Timestamp(_) => "timestamp",
            ColumnData::ZonedTimestamp(_) => "zoned timestamp",
            ColumnData::Binary(_) => "binary",
        }
    }

    fn into_series(self, name: &str) -> SnowflakeResult<Series> {
        let series = match self {
            ColumnData::Int(values) => Series::new(name.into(), values),
            ColumnData::Float(values) => Series::new(name.into(), values),
            ColumnData::Boolean(values) => Series::new(name.into(), values),
            ColumnData::Text(values) => Series::new(name.into(), values),
            ColumnData::Date(values) => Series::new(name.into(), values).cast(&DataType::Date)?,
            ColumnData::Time(values) => Series::new(name.into(), values).cast(&DataType::Time)?,
            ColumnData::Timestamp(values) => Series::new(name.into(), values)
                .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
            ColumnData::ZonedTimestamp(values) => Series::new(name.into(), values).cast(
                &DataType::Datetime(TimeUnit::Microseconds, Some(UTC.into())),
            )?,
            ColumnData::Binary(values) => {
                let hex: Vec<Option<String>> =
                    values.into_iter().map(|v| v.map(hex::encode)).collect();
                Series::new(name.into(), hex)
            }
        };
        Ok(series)
    }

    fn into_arrow(self, name: &str) -> (Field, ArrayRef) {
        let (data_type, array): (ArrowType, ArrayRef) = match self {
            ColumnData::Int(values) => (ArrowType::Int64, Arc::new(Int64Array::from(values))),
            ColumnData::Float(values) => {
                (ArrowType::Float64, Arc::new(Float64Array::from(values)))
            }
            ColumnData::Boolean(values) => {
                (ArrowType::Boolean, Arc::new(BooleanArray::from(values)))
            }
            ColumnData::Text(values) => (ArrowType::Utf8, Arc::new(StringArray::from(values))),
            ColumnData::Date(values) => (ArrowType::Date32, Arc::new(Date32Array::from(values))),
            ColumnData::Time(values) => (
                ArrowType::Time64(ArrowTimeUnit::Nanosecond),
                Arc::new(Time64NanosecondArray::from(values)),
            ),
            ColumnData::Timestamp(values) => (
                ArrowType::Timestamp(ArrowTimeUnit::Microsecond, None),
                Arc::new(TimestampMicrosecondArray::from(values)),
            ),
            ColumnData::ZonedTimestamp(values) => (
                ArrowType::Timestamp(ArrowTimeUnit::Microsecond, Some(UTC.into())),
                Arc::new(TimestampMicrosecondArray::from(values).with_timezone(UTC)),
            ),
            ColumnData::Binary(values) => {
                let values: Vec<Option<&[u8]>> = values.iter().map(|v| v.as_deref()).collect();
                (ArrowType::Binary, Arc::new(BinaryArray::from(values)))
            }
        };
        (Field::new(name, data_type, true), array)
    }
}

/// Lower-cased column names paired with typed columns
pub(crate) fn columns(partition: &Partition) -> SnowflakeResult<Vec<(String, ColumnData)>> {
    let mut columns: Vec<(String, ColumnData)> = partition
        .column_names()
        .into_iter()
        .zip(partition.column_types())
        .map(|(name, column)| (name, ColumnData::for_column(column, partition.num_rows())))
        .collect();
    for row in partition.cells()? {
        for ((_, column), cell) in columns.iter_mut().zip(row) {
            column.push(cell)?;
        }
    }
    Ok(columns)
}

/// Materialize a result set as a polars `DataFrame`
pub fn to_polars(partition: &Partition) -> SnowflakeResult<DataFrame> {
    let series = columns(partition)?
        .into_iter()
        .map(|(name, column)| column.into_series(&name).map(Into::into))
        .collect::<SnowflakeResult<Vec<_>>>()?;
    Ok(DataFrame::new(series)?)
}

/// Materialize a result set as a lazy DataFusion `DataFrame` in the given session
pub fn to_datafusion(
    partition: &Partition,
    ctx: &SessionContext,
) -> SnowflakeResult<datafusion::dataframe::DataFrame> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns(partition)?
        .into_iter()
        .map(|(name, column)| column.into_arrow(&name))
        .unzip();
    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    Ok(ctx.read_batch(batch)?)
}
