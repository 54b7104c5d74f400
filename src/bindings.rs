use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Binding types, used for serialization and sending data to Snowflake.
///
/// These don't round trip because the format Snowflake returns is different,
/// and those are in `cells::Cell`.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum Binding {
    Boolean { value: String },
    Fixed { value: String },
    Real { value: String },
    Text { value: String },
    TimestampNtz { value: String },
    Date { value: String },
    Time { value: String },
    /// Travels as `NULL` in a literal; the SQL API has no untyped null binding
    #[serde(rename = "TEXT")]
    Null { value: Option<String> },
}

impl Binding {
    pub fn null() -> Binding {
        Binding::Null { value: None }
    }

    /// Render the value as a SQL literal
    ///
    /// Multi-statement requests are sent as one block of text, so values
    /// that would otherwise be bound are inlined here. Text is single-quoted
    /// with embedded quotes and backslashes escaped, and numbers are only
    /// emitted bare if they actually parse as numbers.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Binding::Null { .. } => "NULL".to_owned(),
            Binding::Boolean { value } => match value.as_str() {
                "true" | "TRUE" => "TRUE".to_owned(),
                "false" | "FALSE" => "FALSE".to_owned(),
                other => quote(other),
            },
            Binding::Fixed { value } if value.parse::<i128>().is_ok() => value.clone(),
            Binding::Real { value } if value.parse::<f64>().map_or(false, f64::is_finite) => {
                value.clone()
            }
            Binding::Fixed { value }
            | Binding::Real { value }
            | Binding::Text { value }
            | Binding::TimestampNtz { value }
            | Binding::Date { value }
            | Binding::Time { value } => quote(value),
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

macro_rules! impl_binding {
    ($ty: ty, $ex: ident) => {
        impl From<$ty> for Binding {
            fn from(value: $ty) -> Self {
                Binding::$ex {
                    value: value.to_string(),
                }
            }
        }
    };
}
impl_binding!(bool, Boolean);
impl_binding!(i8, Fixed);
impl_binding!(i16, Fixed);
impl_binding!(i32, Fixed);
impl_binding!(i64, Fixed);
impl_binding!(isize, Fixed);
impl_binding!(u8, Fixed);
impl_binding!(u16, Fixed);
impl_binding!(u32, Fixed);
impl_binding!(u64, Fixed);
impl_binding!(usize, Fixed);
impl_binding!(f32, Real);
impl_binding!(f64, Real);
impl_binding!(char, Text);
impl_binding!(String, Text);
impl_binding!(&str, Text);
impl_binding!(NaiveDateTime, Text);
impl_binding!(NaiveDate, Text);
impl_binding!(NaiveTime, Text);

impl From<&[u8]> for Binding {
    fn from(value: &[u8]) -> Self {
        Binding::Text {
            value: hex::encode(value),
        }
    }
}

impl<T: Into<Binding>> From<Option<T>> for Binding {
    fn from(value: Option<T>) -> Self {
        value.map_or_else(Binding::null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_are_escaped() {
        assert_eq!(Binding::from("O'Brien").to_sql_literal(), "'O''Brien'");
        assert_eq!(Binding::from(r"a\'b").to_sql_literal(), r"'a\\''b'");
        assert_eq!(Binding::from(12).to_sql_literal(), "12");
        assert_eq!(Binding::from(0.5).to_sql_literal(), "0.5");
        assert_eq!(Binding::from(f64::NAN).to_sql_literal(), "'NaN'");
        assert_eq!(Binding::from(true).to_sql_literal(), "TRUE");
        assert_eq!(Binding::from(None::<i32>).to_sql_literal(), "NULL");
    }

    #[test]
    fn bindings_serialize_with_snowflake_type_tags() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(Binding::from(10))?;
        assert_eq!(json, serde_json::json!({"type": "FIXED", "value": "10"}));
        let json = serde_json::to_value(Binding::null())?;
        assert_eq!(json, serde_json::json!({"type": "TEXT", "value": null}));
        Ok(())
    }
}
