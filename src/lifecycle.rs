//! Creating and dropping warehouses, databases, schemas and tables
//!
//! Creates use `IF NOT EXISTS` and drops use `IF EXISTS`, so every operation here can be
//! repeated safely. Names are validated as [`Identifier`]s before anything is sent.

use std::fmt;

use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::executor::Executor;
use crate::identifier::{Identifier, QualifiedTable};
use crate::resource::ResourceKind;

/// Column types used when this crate creates tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Boolean,
    Integer,
    Float,
    Text,
    Date,
    Time,
    Timestamp,
    Binary,
}

impl SqlType {
    pub fn keyword(self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "NUMBER(38,0)",
            SqlType::Float => "FLOAT",
            SqlType::Text => "TEXT",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP_NTZ",
            SqlType::Binary => "BINARY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Identifier,
    pub data_type: SqlType,
}

impl ColumnDef {
    pub fn new(name: &str, data_type: SqlType) -> SnowflakeResult<ColumnDef> {
        Ok(ColumnDef {
            name: Identifier::new(name)?,
            data_type,
        })
    }
}

impl fmt::Display for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type.keyword())
    }
}

pub(crate) fn column_list(columns: &[ColumnDef]) -> SnowflakeResult<String> {
    if columns.is_empty() {
        return Err(SnowflakeError::SchemaMismatch(
            "a table needs at least one column".to_owned(),
        ));
    }
    let columns: Vec<String> = columns.iter().map(ColumnDef::to_string).collect();
    Ok(columns.join(", "))
}

async fn create_resource<E: Executor + ?Sized>(
    conn: &E,
    kind: ResourceKind,
    name: &str,
) -> SnowflakeResult<()> {
    log::info!("Creating {} {} if it does not exist", kind.keyword(), name);
    conn.execute(&format!("CREATE {} IF NOT EXISTS {name}", kind.keyword()), &[])
        .await?;
    Ok(())
}

async fn drop_resource<E: Executor + ?Sized>(
    conn: &E,
    kind: ResourceKind,
    name: &str,
) -> SnowflakeResult<()> {
    log::info!("Dropping {} {} if it exists", kind.keyword(), name);
    conn.execute(&format!("DROP {} IF EXISTS {name}", kind.keyword()), &[])
        .await?;
    Ok(())
}

pub async fn create_warehouse<E: Executor + ?Sized>(
    conn: &E,
    warehouse_name: &str,
) -> SnowflakeResult<()> {
    let name = Identifier::new(warehouse_name)?;
    create_resource(conn, ResourceKind::Warehouse, name.as_str()).await
}

pub async fn delete_warehouse<E: Executor + ?Sized>(
    conn: &E,
    warehouse_name: &str,
) -> SnowflakeResult<()> {
    let name = Identifier::new(warehouse_name)?;
    drop_resource(conn, ResourceKind::Warehouse, name.as_str()).await
}

pub async fn create_database<E: Executor + ?Sized>(
    conn: &E,
    database_name: &str,
) -> SnowflakeResult<()> {
    let name = Identifier::new(database_name)?;
    create_resource(conn, ResourceKind::Database, name.as_str()).await
}

pub async fn delete_database<E: Executor + ?Sized>(
    conn: &E,
    database_name: &str,
) -> SnowflakeResult<()> {
    let name = Identifier::new(database_name)?;
    drop_resource(conn, ResourceKind::Database, name.as_str()).await
}

/// Creates `database_name.schema_name`
pub async fn create_schema<E: Executor + ?Sized>(
    conn: &E,
    database_name: &str,
    schema_name: &str,
) -> SnowflakeResult<()> {
    let database = Identifier::new(database_name)?;
    let schema = Identifier::new(schema_name)?;
    create_resource(conn, ResourceKind::Schema, &format!("{database}.{schema}")).await
}

pub async fn delete_schema<E: Executor + ?Sized>(
    conn: &E,
    database_name: &str,
    schema_name: &str,
) -> SnowflakeResult<()> {
    let database = Identifier::new(database_name)?;
    let schema = Identifier::new(schema_name)?;
    drop_resource(conn, ResourceKind::Schema, &format!("{database}.{schema}")).await
}

/// Creates an empty table with the given columns, unless a table of that name already exists
///
/// An existing table is left alone even if its columns differ.
pub async fn create_table<E: Executor + ?Sized>(
    conn: &E,
    table: &QualifiedTable,
    columns: &[ColumnDef],
) -> SnowflakeResult<()> {
    let columns = column_list(columns)?;
    log::info!("Creating TABLE {} if it does not exist", table);
    conn.execute(&format!("CREATE TABLE IF NOT EXISTS {table} ({columns})"), &[])
        .await?;
    Ok(())
}

/// Drops a table after selecting its database and schema
///
/// The three statements run as one script, so a failed `USE` means no `DROP`.
pub async fn delete_table<E: Executor + ?Sized>(
    conn: &E,
    table: &QualifiedTable,
) -> SnowflakeResult<()> {
    log::info!("Dropping TABLE {} if it exists", table);
    conn.execute_script(&[
        format!("USE DATABASE {}", table.database),
        format!("USE SCHEMA {}", table.schema),
        format!("DROP TABLE IF EXISTS {}", table.table),
    ])
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::errors::OBJECT_NOT_FOUND;
    use crate::testing::MockExecutor;

    use super::*;

    #[tokio::test]
    async fn creates_are_idempotent_statements() -> SnowflakeResult<()> {
        let conn = MockExecutor::new();
        create_warehouse(&conn, "tiny_warehouse_mg").await?;
        create_warehouse(&conn, "tiny_warehouse_mg").await?;
        create_database(&conn, "mydb").await?;
        create_schema(&conn, "mydb", "myschema").await?;
        assert_eq!(
            conn.executed(),
            vec![
                "CREATE WAREHOUSE IF NOT EXISTS tiny_warehouse_mg",
                "CREATE WAREHOUSE IF NOT EXISTS tiny_warehouse_mg",
                "CREATE DATABASE IF NOT EXISTS mydb",
                "CREATE SCHEMA IF NOT EXISTS mydb.myschema",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn deletes_are_idempotent_statements() -> SnowflakeResult<()> {
        let conn = MockExecutor::new();
        delete_warehouse(&conn, "tiny_warehouse_mg").await?;
        delete_database(&conn, "mydb").await?;
        delete_database(&conn, "mydb").await?;
        delete_schema(&conn, "mydb", "myschema").await?;
        assert_eq!(
            conn.executed(),
            vec![
                "DROP WAREHOUSE IF EXISTS tiny_warehouse_mg",
                "DROP DATABASE IF EXISTS mydb",
                "DROP DATABASE IF EXISTS mydb",
                "DROP SCHEMA IF EXISTS mydb.myschema",
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn bad_names_never_reach_the_server() {
        let conn = MockExecutor::new();
        let err = create_database(&conn, "mydb; DROP DATABASE prod").await.unwrap_err();
        assert!(matches!(err, SnowflakeError::InvalidIdentifier(_)));
        assert!(delete_schema(&conn, "mydb", "").await.is_err());
        assert!(conn.executed().is_empty());
    }

    #[tokio::test]
    async fn table_create_lists_columns() -> SnowflakeResult<()> {
        let conn = MockExecutor::new();
        let table = QualifiedTable::new("testdb", "testschema", "testtable")?;
        create_table(
            &conn,
            &table,
            &[ColumnDef::new("id", SqlType::Integer)?, ColumnDef::new("name", SqlType::Text)?],
        )
        .await?;
        assert_eq!(
            conn.executed(),
            vec![
                "CREATE TABLE IF NOT EXISTS testdb.testschema.testtable \
                 (id NUMBER(38,0), name TEXT)"
            ]
        );
        assert!(matches!(
            create_table(&conn, &table, &[]).await,
            Err(SnowflakeError::SchemaMismatch(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn table_delete_selects_scope_first() -> SnowflakeResult<()> {
        let conn = MockExecutor::new();
        delete_table(&conn, &QualifiedTable::new("mydb", "myschema", "mytable")?).await?;
        assert_eq!(conn.scripts(), vec![3]);
        assert_eq!(
            conn.executed(),
            vec!["USE DATABASE mydb", "USE SCHEMA myschema", "DROP TABLE IF EXISTS mytable"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn table_delete_stops_when_scope_is_missing() -> SnowflakeResult<()> {
        let conn = MockExecutor::new().fail_on("USE SCHEMA", OBJECT_NOT_FOUND);
        let err = delete_table(&conn, &QualifiedTable::new("mydb", "nope", "mytable")?)
            .await
            .unwrap_err();
        assert!(err.is_remote_execution());
        assert!(!conn.executed().iter().any(|sql| sql.starts_with("DROP")));
        Ok(())
    }
}
