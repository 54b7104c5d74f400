//! Building a [`SnowflakeClient`] from the process environment

use std::path::PathBuf;

use jwt_simple::algorithms::RS256KeyPair;

use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::executor::Executor;
use crate::SnowflakeClient;

pub const ACCOUNT_VAR: &str = "SNOWFLAKE_ACCOUNT";
pub const USERNAME_VAR: &str = "SNOWFLAKE_USERNAME";
pub const PRIVATE_KEY_PATH_VAR: &str = "SNOWFLAKE_PRIVATE_KEY_PATH";
pub const WAREHOUSE_VAR: &str = "SNOWFLAKE_WAREHOUSE";
pub const DATABASE_VAR: &str = "SNOWFLAKE_DATABASE";
pub const ROLE_VAR: &str = "SNOWFLAKE_ROLE";

impl SnowflakeClient {
    /// Read the client configuration from the environment,
    /// loading a `.env` file first if there is one
    ///
    /// `SNOWFLAKE_ACCOUNT`, `SNOWFLAKE_USERNAME` and `SNOWFLAKE_PRIVATE_KEY_PATH` are required.
    /// `SNOWFLAKE_WAREHOUSE`, `SNOWFLAKE_DATABASE` and `SNOWFLAKE_ROLE` are optional.
    ///
    /// This does not touch the network, see [`connect`] for that.
    pub fn from_env() -> SnowflakeResult<SnowflakeClient> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SnowflakeResult<SnowflakeClient> {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let require = |name: &'static str| {
            optional(name).ok_or(SnowflakeError::Configuration { variable: name })
        };
        let account = require(ACCOUNT_VAR)?;
        let user = require(USERNAME_VAR)?;
        let key_path = PathBuf::from(require(PRIVATE_KEY_PATH_VAR)?);
        let pem = std::fs::read_to_string(&key_path).map_err(|source| SnowflakeError::KeyFile {
            path: key_path.clone(),
            source,
        })?;
        Ok(SnowflakeClient {
            key_pair: RS256KeyPair::from_pem(&pem)?,
            account,
            user,
            database: optional(DATABASE_VAR),
            warehouse: optional(WAREHOUSE_VAR),
            role: optional(ROLE_VAR),
        })
    }
}

/// Returns a live connection to Snowflake configured from the environment
///
/// A single `SELECT CURRENT_VERSION()` is issued so that rejected credentials
/// fail here with [`SnowflakeError::Authentication`] rather than on first use.
/// There is no retry.
pub async fn connect() -> SnowflakeResult<SnowflakeClient> {
    let client = SnowflakeClient::from_env()?;
    let version = server_version(&client).await?;
    log::info!(
        "Connected to Snowflake account {} as {} (version {})",
        client.account,
        client.user,
        version
    );
    Ok(client)
}

/// The version of Snowflake the account is running
pub async fn server_version<E: Executor + ?Sized>(conn: &E) -> SnowflakeResult<String> {
    let result = conn.execute("SELECT CURRENT_VERSION()", &[]).await?;
    Ok(result
        .raw_cells()
        .first()
        .and_then(|row| row.first().cloned().flatten())
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::testing::{text_result, MockExecutor};

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn missing_account_is_a_configuration_error() {
        let err = SnowflakeClient::from_lookup(lookup(&[(USERNAME_VAR, "me")])).unwrap_err();
        assert!(matches!(
            err,
            SnowflakeError::Configuration { variable } if variable == ACCOUNT_VAR
        ));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let err = SnowflakeClient::from_lookup(lookup(&[
            (ACCOUNT_VAR, "abc123"),
            (USERNAME_VAR, "  "),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            SnowflakeError::Configuration { variable } if variable == USERNAME_VAR
        ));
    }

    #[test]
    fn unreadable_key_file_is_reported_with_its_path() {
        let err = SnowflakeClient::from_lookup(lookup(&[
            (ACCOUNT_VAR, "abc123"),
            (USERNAME_VAR, "me"),
            (PRIVATE_KEY_PATH_VAR, "/definitely/not/a/key.p8"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            SnowflakeError::KeyFile { ref path, .. } if path.ends_with("key.p8")
        ));
    }

    #[test]
    fn key_pair_and_optional_context_are_loaded() -> SnowflakeResult<()> {
        let pem = RS256KeyPair::generate(2048)?.to_pem()?;
        let path = std::env::temp_dir()
            .join(format!("snowflake-utilities-{}.p8", uuid::Uuid::new_v4()));
        std::fs::write(&path, pem).map_err(|source| SnowflakeError::KeyFile {
            path: path.clone(),
            source,
        })?;
        let client = SnowflakeClient::from_lookup(lookup(&[
            (ACCOUNT_VAR, "abc123.us-east-1"),
            (USERNAME_VAR, "me"),
            (PRIVATE_KEY_PATH_VAR, path.to_str().unwrap_or_default()),
            (WAREHOUSE_VAR, "tiny_warehouse_mg"),
            (ROLE_VAR, ""),
        ]));
        let _ = std::fs::remove_file(&path);
        let client = client?;
        assert_eq!(client.account, "abc123.us-east-1");
        assert_eq!(client.warehouse.as_deref(), Some("tiny_warehouse_mg"));
        assert_eq!(client.database, None);
        assert_eq!(client.role, None);
        Ok(())
    }

    #[tokio::test]
    async fn server_version_reads_the_single_cell() -> SnowflakeResult<()> {
        let conn = MockExecutor::new().respond_to(
            "CURRENT_VERSION",
            text_result("CURRENT_VERSION()", &["8.40.1"]),
        );
        assert_eq!(server_version(&conn).await?, "8.40.1");
        assert_eq!(conn.executed(), vec!["SELECT CURRENT_VERSION()"]);
        Ok(())
    }
}
