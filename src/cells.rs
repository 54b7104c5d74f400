use std::fmt;

use chrono::{
    naive::{NaiveDate, NaiveDateTime, NaiveTime},
    DateTime, Duration, FixedOffset, Local, TimeZone, Utc,
};

use crate::errors::{SnowflakeError, SnowflakeResult};

/// The wire encodings Snowflake uses for each column type in JSON result sets
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawCell {
    Fixed,
    Real,
    Text,
    Binary,
    Boolean,
    Date,
    Time,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,
    // Semi-structured values arrive as JSON text
    Variant,
    Object,
    Array,
}

impl RawCell {
    pub fn name(self) -> &'static str {
        match self {
            RawCell::Fixed => "FIXED",
            RawCell::Real => "REAL",
            RawCell::Text => "TEXT",
            RawCell::Binary => "BINARY",
            RawCell::Boolean => "BOOLEAN",
            RawCell::Date => "DATE",
            RawCell::Time => "TIME",
            RawCell::TimestampLtz => "TIMESTAMP_LTZ",
            RawCell::TimestampNtz => "TIMESTAMP_NTZ",
            RawCell::TimestampTz => "TIMESTAMP_TZ",
            RawCell::Variant => "VARIANT",
            RawCell::Object => "OBJECT",
            RawCell::Array => "ARRAY",
        }
    }

    /// Convert a raw string from the result set into a Cell.
    ///
    /// - Decimals are not supported. Number type columns are converted to i128 if possible,
    ///   otherwise f64. So there can be a loss of precision, which is a tradeoff for convenience.
    /// - For the same reason, NUMBER columns can contain mixed types: Int and Float
    pub fn to_cell(self, value: &Option<String>) -> SnowflakeResult<Cell> {
        let value = match value {
            Some(value) => value.as_str(),
            None => return Ok(Cell::Null),
        };
        let fail = || SnowflakeError::CellParse {
            data_type: self.name(),
            value: value.to_owned(),
        };
        let cell = match self {
            RawCell::Fixed => match value.trim_end_matches(".0").parse() {
                Ok(value) => Cell::Int(value),
                Err(_) => Cell::Float(value.parse().map_err(|_| fail())?),
            },
            RawCell::Real => Cell::Float(value.parse().map_err(|_| fail())?),
            RawCell::Text | RawCell::Variant | RawCell::Object | RawCell::Array => {
                Cell::Varchar(value.to_owned())
            }
            RawCell::Binary => Cell::Binary(hex::decode(value).map_err(|_| fail())?),
            RawCell::Boolean => Cell::Boolean(match value {
                "true" | "TRUE" | "1" => true,
                "false" | "FALSE" | "0" => false,
                _ => return Err(fail()),
            }),
            RawCell::Date => {
                let days: i64 = value.parse().map_err(|_| fail())?;
                Cell::Date(epoch_date() + Duration::days(days))
            }
            RawCell::Time => {
                let (seconds, nanos) = parse_epoch(value).ok_or_else(fail)?;
                Cell::Time(
                    u32::try_from(seconds)
                        .ok()
                        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos))
                        .ok_or_else(fail)?,
                )
            }
            RawCell::TimestampLtz => {
                let utc = parse_utc(value).ok_or_else(fail)?;
                Cell::TimestampLtz(utc.with_timezone(&Local))
            }
            RawCell::TimestampNtz => {
                Cell::TimestampNtz(parse_utc(value).ok_or_else(fail)?.naive_utc())
            }
            RawCell::TimestampTz => {
                // "<seconds since epoch> <offset in minutes + 1440>"
                let (instant, offset) = value.split_once(' ').ok_or_else(fail)?;
                let offset_minutes = offset.parse::<i32>().map_err(|_| fail())? - 1440;
                let offset = FixedOffset::east_opt(offset_minutes * 60).ok_or_else(fail)?;
                Cell::TimestampTz(parse_utc(instant).ok_or_else(fail)?.with_timezone(&offset))
            }
        };
        Ok(cell)
    }
}

fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

/// Split "1672534861.123456789" into whole seconds and nanoseconds without going through f64
fn parse_epoch(value: &str) -> Option<(i64, u32)> {
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let negative = whole.starts_with('-');
    let mut seconds: i64 = whole.parse().ok()?;
    let digits = fraction.get(..fraction.len().min(9))?;
    let mut nanos: u32 = if digits.is_empty() {
        0
    } else {
        digits.parse::<u32>().ok()? * 10u32.pow(9 - digits.len() as u32)
    };
    if negative && nanos > 0 {
        seconds -= 1;
        nanos = 1_000_000_000 - nanos;
    }
    Some((seconds, nanos))
}

fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    let (seconds, nanos) = parse_epoch(value)?;
    Utc.timestamp_opt(seconds, nanos).single()
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Int(i128),
    Float(f64),
    Varchar(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    TimestampLtz(DateTime<Local>),
    TimestampNtz(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Cell::*;
        match self {
            Null => f.write_str("None"),
            Int(value) => write!(f, "{value}"),
            Float(value) => write!(f, "{value}"),
            Varchar(value) => write!(f, "'{value}'"),
            Binary(value) => write!(f, "b'{}'", hex::encode(value)),
            Boolean(value) => write!(f, "{value}"),
            Date(value) => write!(f, "{value}"),
            Time(value) => write!(f, "{value}"),
            TimestampLtz(value) => write!(f, "{value}"),
            TimestampNtz(value) => write!(f, "{value}"),
            TimestampTz(value) => write!(f, "{value}"),
        }
    }
}

impl From<Cell> for serde_json::Value {
    fn from(cell: Cell) -> Self {
        use serde_json::json;
        use Cell::*;
        match cell {
            Null => json!(null),
            // Without arbitrary precision, JSON numbers stop at 64 bits
            Int(value) => match i64::try_from(value) {
                Ok(value) => json!(value),
                Err(_) => json!(value.to_string()),
            },
            Float(value) => json!(value),
            Varchar(value) => json!(value),
            Binary(value) => json!(hex::encode(value)),
            Boolean(value) => json!(value),
            Date(value) => json!(value),
            Time(value) => json!(value),
            TimestampLtz(value) => json!(value),
            TimestampNtz(value) => json!(value),
            TimestampTz(value) => json!(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    fn cell(raw: RawCell, value: &str) -> SnowflakeResult<Cell> {
        raw.to_cell(&Some(value.to_owned()))
    }

    #[test]
    fn numbers() -> SnowflakeResult<()> {
        assert_eq!(cell(RawCell::Fixed, "42")?, Cell::Int(42));
        assert_eq!(cell(RawCell::Fixed, "1.0")?, Cell::Int(1));
        assert_eq!(cell(RawCell::Fixed, "5.1")?, Cell::Float(5.1));
        assert_eq!(cell(RawCell::Real, "0.25")?, Cell::Float(0.25));
        assert_eq!(RawCell::Fixed.to_cell(&None)?, Cell::Null);
        Ok(())
    }

    #[test]
    fn bad_values_are_errors_not_panics() {
        assert!(matches!(
            cell(RawCell::Real, "abc"),
            Err(SnowflakeError::CellParse { data_type: "REAL", .. })
        ));
        assert!(cell(RawCell::Binary, "zz").is_err());
        assert!(cell(RawCell::Boolean, "maybe").is_err());
        assert!(cell(RawCell::Time, "90000").is_err());
    }

    #[test]
    fn temporal_values() -> SnowflakeResult<()> {
        let Cell::Date(date) = cell(RawCell::Date, "19358")? else {
            panic!("expected a date");
        };
        assert_eq!((date.year(), date.month(), date.day()), (2023, 1, 1));

        let Cell::Time(time) = cell(RawCell::Time, "3661.500000000")? else {
            panic!("expected a time");
        };
        assert_eq!((time.hour(), time.minute(), time.second()), (1, 1, 1));
        assert_eq!(time.nanosecond(), 500_000_000);

        let Cell::TimestampNtz(ts) = cell(RawCell::TimestampNtz, "1672534861.000000000")? else {
            panic!("expected a timestamp");
        };
        assert_eq!((ts.year(), ts.hour(), ts.minute(), ts.second()), (2023, 1, 1, 1));

        let Cell::TimestampTz(ts) = cell(RawCell::TimestampTz, "1672534861.000000000 1500")? else {
            panic!("expected a zoned timestamp");
        };
        assert_eq!(ts.offset().local_minus_utc(), 3600);
        assert_eq!(ts.hour(), 2);
        Ok(())
    }

    #[test]
    fn negative_epochs_borrow_a_second() {
        assert_eq!(parse_epoch("-1.250000000"), Some((-2, 750_000_000)));
        assert_eq!(parse_epoch("12"), Some((12, 0)));
        assert_eq!(parse_epoch("1.5"), Some((1, 500_000_000)));
    }

    #[test]
    fn display_looks_like_a_tuple_member() {
        assert_eq!(Cell::Varchar("iris".into()).to_string(), "'iris'");
        assert_eq!(Cell::Null.to_string(), "None");
        assert_eq!(Cell::Int(3).to_string(), "3");
    }

    #[test]
    fn large_ints_survive_json() {
        let big = serde_json::Value::from(Cell::Int(i128::MAX));
        assert_eq!(big, serde_json::json!(i128::MAX.to_string()));
        assert_eq!(serde_json::Value::from(Cell::Int(7)), serde_json::json!(7));
    }
}
