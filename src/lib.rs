//! Convenience functions for managing and loading Snowflake resources.
//!
//! Everything goes through the Snowflake SQL API with key-pair authentication.
//! The helpers create and drop warehouses, databases, schemas and tables, list
//! resources, read tables into rows or dataframes, and upload dataframes.
//! They are all generic over [`Executor`], which [`SnowflakeClient`] implements.
//!
//! Example usage:
//!
//! ```rust,no_run
//! use snowflake_utilities::{
//!     connect, create_database, create_schema, create_warehouse, print_resources,
//!     request_snowflake_to_polars_df, upload_csv_to_snowflake, IfExists, QualifiedTable,
//!     SnowflakeError, TableRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SnowflakeError> {
//!     // Reads SNOWFLAKE_ACCOUNT, SNOWFLAKE_USERNAME and SNOWFLAKE_PRIVATE_KEY_PATH
//!     let conn = connect().await?;
//!
//!     create_warehouse(&conn, "tiny_warehouse_mg").await?;
//!     create_database(&conn, "testdb").await?;
//!     create_schema(&conn, "testdb", "testschema").await?;
//!     print_resources(&conn, "SCHEMAS").await?;
//!
//!     let table = QualifiedTable::new("testdb", "testschema", "iris")?;
//!     let uploaded = upload_csv_to_snowflake(
//!         &conn,
//!         "iris.csv",
//!         "tiny_warehouse_mg",
//!         &table,
//!         IfExists::Replace,
//!     )
//!     .await?;
//!     println!("{uploaded}");
//!
//!     let request = TableRequest::new("testdb", "testschema", "iris")?
//!         .with_row_amount(10)
//!         .with_columns(["sepal_length", "species"]);
//!     let df = request_snowflake_to_polars_df(&conn, &request).await?;
//!     println!("{df}");
//!
//!     Ok(())
//! }
//! ```
//!
//! Lower level access is still available: [`SnowflakeClient::prepare`] returns a
//! [`Statement`] that takes bindings and yields a [`QueryResponse`].
use jwt_simple::algorithms::RS256KeyPair;

mod bindings;
mod cells;
mod config;
mod errors;
mod executor;
mod frame;
mod identifier;
mod jwt;
mod lifecycle;
mod partition;
mod request;
mod resource;
mod statement;
#[cfg(test)]
mod testing;
mod upload;

pub use bindings::Binding;
pub use cells::{Cell, RawCell};
pub use config::{
    connect, server_version, ACCOUNT_VAR, DATABASE_VAR, PRIVATE_KEY_PATH_VAR, ROLE_VAR,
    USERNAME_VAR, WAREHOUSE_VAR,
};
pub use errors::{SnowflakeError, SnowflakeResult};
pub use executor::Executor;
pub use frame::{to_datafusion, to_polars};
pub use identifier::{Identifier, QualifiedTable};
pub use jwt_simple;
pub use lifecycle::{
    create_database, create_schema, create_table, create_warehouse, delete_database, delete_schema,
    delete_table, delete_warehouse, ColumnDef, SqlType,
};
pub use partition::Partition;
pub use request::{
    fetch, request_snowflake_to_datafusion_df, request_snowflake_to_list,
    request_snowflake_to_polars_df, TableRequest, DEFAULT_ROW_AMOUNT,
};
pub use resource::{
    check_resource_viable, print_resources, ResourceKind, ResourceType, VIABLE_RESOURCE_TYPES,
};
pub use statement::{Changes, ColumnType, QueryResponse, Statement};
pub use upload::{
    upload_csv_to_snowflake, upload_polars_df_to_snowflake, IfExists, IF_EXISTS_OPTIONS,
};

/// Credentials and session context for the SQL API
///
/// Each request is authenticated separately, so a client holds no open connection
/// and can be cloned freely. Database, warehouse and role default to the user's.
#[derive(Debug, Clone)]
pub struct SnowflakeClient {
    pub key_pair: RS256KeyPair,
    pub account: String,
    pub user: String,
    pub database: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
}
impl SnowflakeClient {
    pub fn prepare(&self, sql: &str) -> Statement {
        Statement::new(sql, self)
    }
}
