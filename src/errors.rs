use std::path::PathBuf;

/// Snowflake error code for "Object does not exist or not authorized"
pub(crate) const OBJECT_NOT_FOUND: &str = "002003";
/// Snowflake error code for "Object already exists"
pub(crate) const OBJECT_ALREADY_EXISTS: &str = "002002";

#[derive(thiserror::Error, Debug)]
pub enum SnowflakeError {
    #[error(transparent)]
    Token(#[from] jwt_simple::Error),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("Missing or empty environment variable: {variable}")]
    Configuration { variable: &'static str },
    #[error("Could not read private key file {path:?}: {source}")]
    KeyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Snowflake rejected the credentials: {code}: {message}")]
    Authentication { code: String, message: String },
    #[error("{value} is not viable. Please choose from {allowed:?}")]
    Validation {
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("Snowflake server error: {code}: {message}")]
    ServerError { code: String, message: String },
    #[error("Table {table} does not exist or not authorized: {code}: {message}")]
    TableNotFound {
        table: String,
        code: String,
        message: String,
    },
    #[error("Table {table} already exists")]
    Conflict { table: String },
    #[error("Unsupported payload: {0}")]
    SchemaMismatch(String),
    #[error("Could not parse {value:?} as {data_type}")]
    CellParse {
        data_type: &'static str,
        value: String,
    },
    #[error("Expected {expected} statement results, got {got}")]
    MissingResults { expected: usize, got: usize },
    #[error(transparent)]
    JSONError(#[from] serde_json::Error),
    #[error("Response contains multiple partitions")]
    MultiplePartitions,
    #[error(transparent)]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
    #[error(transparent)]
    DataFusion(#[from] datafusion::error::DataFusionError),
    #[error(transparent)]
    Arrow(#[from] datafusion::arrow::error::ArrowError),
}

pub type SnowflakeResult<T> = Result<T, SnowflakeError>;

impl SnowflakeError {
    /// Classify an error payload returned by the SQL API
    ///
    /// Codes in the 390xxx range come from the login layer,
    /// everything else is a statement that the server refused to run.
    pub fn from_server(code: String, message: String) -> SnowflakeError {
        if code.starts_with("390") {
            SnowflakeError::Authentication { code, message }
        } else {
            SnowflakeError::ServerError { code, message }
        }
    }

    /// True for any statement the remote system rejected,
    /// including the more specific [`SnowflakeError::TableNotFound`]
    pub fn is_remote_execution(&self) -> bool {
        matches!(
            self,
            SnowflakeError::ServerError { .. } | SnowflakeError::TableNotFound { .. }
        )
    }

    /// The Snowflake error code, if this error came from the server
    pub fn server_code(&self) -> Option<&str> {
        match self {
            SnowflakeError::ServerError { code, .. }
            | SnowflakeError::TableNotFound { code, .. }
            | SnowflakeError::Authentication { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Narrow a "does not exist" server error down to the table being read
    pub(crate) fn for_read_target(self, table: &str) -> SnowflakeError {
        match self {
            SnowflakeError::ServerError { code, message } if code == OBJECT_NOT_FOUND => {
                SnowflakeError::TableNotFound {
                    table: table.to_owned(),
                    code,
                    message,
                }
            }
            other => other,
        }
    }

    /// Narrow an "already exists" server error down to the table being written
    pub(crate) fn for_write_target(self, table: &str) -> SnowflakeError {
        match self {
            SnowflakeError::ServerError { code, .. } if code == OBJECT_ALREADY_EXISTS => {
                SnowflakeError::Conflict {
                    table: table.to_owned(),
                }
            }
            other => other,
        }
    }
}

#[derive(serde::Deserialize, Debug)]
#[serde(untagged)]
pub enum SnowflakeWireResult<T> {
    Ok(T),
    Error { code: String, message: String },
}

impl<T> SnowflakeWireResult<T> {
    /// Convert from the custom wire format to a standard result
    pub fn into_result(self) -> SnowflakeResult<T> {
        match self {
            SnowflakeWireResult::Error { code, message } => {
                Err(SnowflakeError::from_server(code, message))
            }
            SnowflakeWireResult::Ok(t) => Ok(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(code: &str) -> SnowflakeError {
        SnowflakeError::from_server(code.into(), "boom".into())
    }

    #[test]
    fn login_codes_are_authentication_errors() {
        assert!(matches!(server("390144"), SnowflakeError::Authentication { .. }));
        assert!(matches!(server("002003"), SnowflakeError::ServerError { .. }));
    }

    #[test]
    fn missing_object_narrows_to_table_not_found() {
        let err = server(OBJECT_NOT_FOUND).for_read_target("DB.S.OOOPS");
        assert!(matches!(
            err,
            SnowflakeError::TableNotFound { ref table, .. } if table == "DB.S.OOOPS"
        ));
        assert!(err.is_remote_execution());

        let err = server("001003").for_read_target("DB.S.T");
        assert!(matches!(err, SnowflakeError::ServerError { .. }));
    }

    #[test]
    fn existing_object_narrows_to_conflict() {
        let err = server(OBJECT_ALREADY_EXISTS).for_write_target("DB.S.T");
        assert!(matches!(err, SnowflakeError::Conflict { .. }));
        assert!(!err.is_remote_execution());
    }

    #[derive(serde::Deserialize, Debug)]
    struct Probe {
        #[allow(dead_code)]
        data: Vec<String>,
    }

    #[test]
    fn wire_errors_deserialize() -> SnowflakeResult<()> {
        let wire: SnowflakeWireResult<Probe> =
            serde_json::from_str(r#"{"code": "390144", "message": "JWT token is invalid."}"#)?;
        assert!(matches!(
            wire.into_result(),
            Err(SnowflakeError::Authentication { .. })
        ));
        let wire: SnowflakeWireResult<Probe> = serde_json::from_str(r#"{"data": ["a"]}"#)?;
        assert!(wire.into_result().is_ok());
        Ok(())
    }
}
