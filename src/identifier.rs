use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{SnowflakeError, SnowflakeResult};

fn unquoted_identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]{0,254}$").expect("identifier pattern is valid")
    })
}

/// A name that is safe to splice into SQL text
///
/// Only Snowflake's unquoted identifier grammar is accepted: a letter or underscore,
/// then letters, digits, underscores or dollar signs, up to 255 characters.
/// Snowflake resolves these case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: &str) -> SnowflakeResult<Identifier> {
        if unquoted_identifier().is_match(name) {
            Ok(Identifier(name.to_owned()))
        } else {
            Err(SnowflakeError::InvalidIdentifier(name.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = SnowflakeError;

    fn try_from(name: &str) -> SnowflakeResult<Identifier> {
        Identifier::new(name)
    }
}

/// `database.schema.table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedTable {
    pub database: Identifier,
    pub schema: Identifier,
    pub table: Identifier,
}

impl QualifiedTable {
    pub fn new(database: &str, schema: &str, table: &str) -> SnowflakeResult<QualifiedTable> {
        Ok(QualifiedTable {
            database: Identifier::new(database)?,
            schema: Identifier::new(schema)?,
            table: Identifier::new(table)?,
        })
    }
}

impl fmt::Display for QualifiedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}
