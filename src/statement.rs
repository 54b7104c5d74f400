use std::collections::HashMap;
use std::sync::Arc;

use futures::{StreamExt, TryStream, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::bindings::Binding;
use crate::cells::{Cell, RawCell};
use crate::errors::{SnowflakeResult, SnowflakeWireResult};
use crate::partition::{Partition, StringTable};
use crate::{jwt, SnowflakeClient};

/// A builder for a prepared statement (created by SnowflakeClient)
///
#[derive(Debug, Clone)]
pub struct Statement {
    host: String,
    wire: WireStatement,
    uuid: uuid::Uuid,
    config: SnowflakeClient,
}

impl Statement {
    /// Create a new statement from a SQL string and a SnowflakeClient
    ///
    /// Usually you will want to use [`SnowflakeClient::prepare`] instead of this method
    /// but the difference is merely ergonomic.
    pub fn new(sql: &str, config: &SnowflakeClient) -> Statement {
        Statement {
            host: format!(
                "https://{}.snowflakecomputing.com",
                config.account.to_ascii_lowercase(),
            ),
            wire: WireStatement {
                statement: sql.to_owned(),
                timeout: Some(30),
                database: config.database.as_ref().map(|x| x.to_ascii_uppercase()),
                warehouse: config.warehouse.as_ref().map(|x| x.to_ascii_uppercase()),
                role: config.role.as_ref().map(|x| x.to_ascii_uppercase()),
                bindings: HashMap::new(),
                parameters: None,
            },
            uuid: uuid::Uuid::new_v4(),
            config: config.to_owned(),
        }
    }

    pub(crate) fn client(&self) -> SnowflakeResult<reqwest::Client> {
        use reqwest::header::*;
        let token = jwt::create_token(
            &self.config.key_pair,
            &self.config.account,
            &self.config.user,
        )?;

        let mut headers = HeaderMap::with_capacity(5);
        headers.append(CONTENT_TYPE, "application/json".parse()?);
        headers.append(AUTHORIZATION, format!("Bearer {}", token).parse()?);
        headers.append(
            "X-Snowflake-Authorization-Token-Type",
            "KEYPAIR_JWT".parse()?,
        );
        headers.append(ACCEPT, "application/json".parse()?);
        headers.append(
            USER_AGENT,
            concat!(env!("CARGO_PKG_NAME"), '/', env!("CARGO_PKG_VERSION")).parse()?,
        );

        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(
                self.wire.timeout.unwrap_or(30) + 15,
            ))
            .build()?)
    }

    async fn send(&self) -> SnowflakeResult<reqwest::Response> {
        log::debug!(
            "Sending statement: {}",
            serde_json::to_string_pretty(&self.wire)?
        );
        Ok(self
            .client()?
            .post(format!(
                "{}/api/v2/statements?nullable=true&requestId={}",
                self.host, self.uuid
            ))
            .json(&self.wire)
            .send()
            .await?)
    }

    /// Execute SQL that returns a result set
    ///
    /// This supports multiple partitions, which are streamed lazily
    /// but the first partition is buffered immediately.
    ///
    /// For a single partition, consider using [`QueryResponse::only_partition`].
    pub async fn query(&self) -> SnowflakeResult<QueryResponse> {
        Ok(self
            .send()
            .await?
            .json::<SnowflakeWireResult<WireQueryResponse>>()
            .await?
            .into_result()?
            .hydrate(self.clone()))
    }

    /// Execute SQL that does not return a result set
    ///
    /// This is useful for DML statements like `INSERT`, `UPDATE`, and `DELETE`
    pub async fn manipulate(&self) -> SnowflakeResult<Changes> {
        let dml_result = self
            .send()
            .await?
            .json::<SnowflakeWireResult<WireDMLResult>>()
            .await?
            .into_result()?;
        Ok(Changes {
            message: dml_result.message,
            rows_inserted: dml_result.stats.rows_inserted,
            rows_deleted: dml_result.stats.rows_deleted,
            rows_updated: dml_result.stats.rows_updated,
            duplicates: dml_result.stats.duplicates,
        })
    }

    /// Set the Snowflake-side timeout for the statement
    ///
    /// The client-side timeout will automatically be set to this value plus 15 seconds
    ///
    /// The default server side timeout is 172800 seconds (2 days),
    /// which is far too long for the use cases this library is targeting,
    /// so this library defaults to 30 seconds on the server side if not specified,
    /// implying a client-side timeout of 45 seconds.
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Statement {
        self.wire.timeout = Some(timeout_seconds);
        self
    }

    /// Send the SQL as a script of `count` statements separated by semicolons
    ///
    /// All statements run in order in a single session, and the first failure
    /// stops the rest. Results of the individual statements are available
    /// through [`QueryResponse::statement_handles`].
    pub fn with_statement_count(mut self, count: usize) -> Statement {
        self.wire.parameters = Some(WireParameters {
            multi_statement_count: count.to_string(),
        });
        self
    }

    /// Add a binding to the statement
    ///
    /// Several types are supported:
    ///
    /// * All integers are bound as `FIXED`
    /// * `f64` and `f32` are bound as `REAL`
    /// * `bool` is bound as `BOOLEAN`
    /// * `&str`, `String`, `chrono::NaiveDate`, `chrono::NaiveDateTime`, and `chrono::NaiveTime` are bound as `TEXT`
    ///
    /// Text is the most flexible type, and for additional types you can usually workaround by
    /// converting to text before binding.
    pub fn add_binding<T: Into<Binding>>(mut self, value: T) -> Statement {
        let bindings = &mut self.wire.bindings;
        bindings.insert((bindings.len() + 1).to_string(), value.into());
        self
    }
}

/// The result of SQL that returns rows
///
/// The first partition is included immediately,
/// but additional partitions are streamed lazily and incur additional IO.
///
/// You might consider using [`QueryResponse::only_partition`] if you only need one partition.
#[derive(Debug)]
pub struct QueryResponse {
    result_set_meta_data: WireStatementMetaData,
    data: Arc<StringTable>,
    statement_status_url: String,
    statement_handles: Vec<String>,
    statement: Statement,
}

/// The result of a DML statement
///
/// These are returned by [`Statement::manipulate`] and are almost exactly
/// the same as the response from Snowflake.
#[derive(Debug)]
pub struct Changes {
    pub message: String,
    pub rows_inserted: usize,
    pub rows_deleted: usize,
    pub rows_updated: usize,
    pub duplicates: usize,
}

impl QueryResponse {
    /// Get the number of rows across all partitions
    pub fn num_rows(&self) -> usize {
        self.result_set_meta_data.num_rows
    }

    /// Get the number of columns
    pub fn num_columns(&self) -> usize {
        self.result_set_meta_data.row_type.len()
    }

    /// Get the number of partitions in the response
    pub fn num_partitions(&self) -> usize {
        self.result_set_meta_data.partition_info.len()
    }

    /// Column types in the result set
    ///
    /// In most cases Cell should already expose the data you need,
    /// but if you use the raw strings or want information about nullability, etc,
    /// this can be useful.
    pub fn column_types(&self) -> &[ColumnType] {
        &self.result_set_meta_data.row_type
    }

    /// Handles of the individual statements of a multi-statement request, in order
    ///
    /// Empty for single statements.
    pub fn statement_handles(&self) -> &[String] {
        &self.statement_handles
    }

    /// Fetch the result of one statement of a multi-statement request
    pub async fn statement_result(&self, handle: &str) -> SnowflakeResult<QueryResponse> {
        let url = format!("{}/api/v2/statements/{}", self.statement.host, handle);
        Ok(self
            .statement
            .client()?
            .get(&url)
            .send()
            .await?
            .json::<SnowflakeWireResult<WireQueryResponse>>()
            .await?
            .into_result()?
            .hydrate(self.statement.clone()))
    }

    /// A convenience method to assert that there is only one partition and return it
    ///
    /// This never causes IO, is not async, and can only error with [`SnowflakeError::MultiplePartitions`]
    ///
    /// [`SnowflakeError::MultiplePartitions`]: crate::SnowflakeError::MultiplePartitions
    pub fn only_partition(self) -> SnowflakeResult<Partition> {
        if self.num_partitions() > 1 {
            Err(crate::SnowflakeError::MultiplePartitions)
        } else {
            Ok(self.first_partition())
        }
    }

    fn first_partition(&self) -> Partition {
        Partition {
            index: 0,
            meta_data: self.result_set_meta_data.clone(),
            data: self.data.clone(),
        }
    }

    async fn fetch_partition(&self, index: usize) -> SnowflakeResult<Partition> {
        if index == 0 {
            return Ok(self.first_partition());
        }
        let url = self.statement.host.trim_end_matches('/').to_owned() + &self.statement_status_url;
        let response = self
            .statement
            .client()?
            .get(&url)
            .query(&[("partition", index)])
            .header("Accept", "application/json")
            .send()
            .await?
            .json::<SnowflakeWireResult<WirePartitionResponse>>()
            .await?
            .into_result()?;

        Ok(Partition {
            index,
            meta_data: self.result_set_meta_data.clone(),
            data: response.data,
        })
    }

    /// Get a single partition from the response
    ///
    /// If this is the first partition, you get it immediately,
    /// otherwise it will incur an additional request to get the partition
    ///
    /// Returns `None` if the requested partition does not exist.
    pub async fn partition(&self, index: usize) -> SnowflakeResult<Option<Partition>> {
        if index > 0 && index >= self.num_partitions() {
            Ok(None)
        } else {
            Ok(Some(self.fetch_partition(index).await?))
        }
    }

    /// Stream over all partitions in the response
    ///
    /// This incurs IO, so try to only use this once.
    ///
    /// In order to improve concurrency, this will buffer one partition,
    /// so you can have one partition in flight while processing another.
    pub fn partitions(&self) -> impl TryStream<Ok = Partition, Error = crate::SnowflakeError> + '_ {
        let partition_futures =
            (0..self.num_partitions().max(1)).map(|index| self.fetch_partition(index));
        futures::stream::iter(partition_futures).buffered(1)
    }

    /// Concatenate all partitions into a single partition
    ///
    /// This incurs IO, so try to only use this once.
    ///
    /// This could use an unbounded amount of memory,
    /// but it could save time for uses cases requiring multiple passes.
    pub async fn concat_partitions(&self) -> SnowflakeResult<Partition> {
        if self.num_partitions() <= 1 {
            return Ok(self.first_partition());
        }
        let mut cells = Vec::with_capacity(self.num_rows());
        for partition in self.partitions().try_collect::<Vec<_>>().await? {
            cells.extend(Arc::unwrap_or_clone(partition.data));
        }
        Ok(Partition {
            index: 0,
            meta_data: self.result_set_meta_data.clone(),
            data: Arc::new(cells),
        })
    }

    /// Stream over all rows in the response
    ///
    /// This incurs IO, so try to only use this once.
    ///
    /// If you only need one partition, it may be simpler to use `partition`
    /// and then stream over the rows in that partition.
    pub fn rows(&self) -> impl TryStream<Ok = Vec<Cell>, Error = crate::SnowflakeError> + '_ {
        self.partitions()
            .and_then(|partition| async move { partition.cells() })
            .map_ok(|cells| futures::stream::iter(cells).map(Ok))
            .try_flatten()
    }

    /// Stream over all rows in the response as JSON objects
    ///
    /// This incurs IO, so try to only use this once.
    pub fn json_objects(
        &self,
    ) -> impl TryStream<Ok = serde_json::Value, Error = crate::SnowflakeError> + '_ {
        self.partitions()
            .and_then(|partition| async move { partition.json_objects() })
            .map_ok(|objects| futures::stream::iter(objects).map(Ok))
            .try_flatten()
    }
}

#[cfg(test)]
mod tests {
    use jwt_simple::algorithms::RS256KeyPair;

    use crate::errors::SnowflakeResult;

    use super::*;

    fn client() -> SnowflakeResult<SnowflakeClient> {
        Ok(SnowflakeClient {
            key_pair: RS256KeyPair::generate(2048)?,
            account: "ACCOUNT".into(),
            user: "USER".into(),
            database: None,
            warehouse: Some("wh".into()),
            role: Some("ROLE".into()),
        })
    }

    #[test]
    fn sql() -> SnowflakeResult<()> {
        let sql = client()?
            .prepare("SELECT * FROM TEST_TABLE WHERE id = ? AND name = ?")
            .add_binding(10);
        assert_eq!(sql.wire.bindings.len(), 1);
        let sql = sql.add_binding("Henry");
        assert_eq!(sql.wire.bindings.len(), 2);
        assert_eq!(sql.wire.bindings["2"], Binding::from("Henry"));
        Ok(())
    }

    #[test]
    fn optional_context_is_left_out_of_the_request() -> SnowflakeResult<()> {
        let wire = serde_json::to_value(&client()?.prepare("SHOW WAREHOUSES").wire)?;
        assert_eq!(wire["warehouse"], "WH");
        assert!(wire.get("database").is_none());
        assert!(wire.get("parameters").is_none());
        Ok(())
    }

    #[test]
    fn scripts_declare_their_statement_count() -> SnowflakeResult<()> {
        let statement = client()?
            .prepare("USE DATABASE a;\nUSE SCHEMA b;\nDROP TABLE IF EXISTS c")
            .with_statement_count(3)
            .with_timeout(60);
        let wire = serde_json::to_value(&statement.wire)?;
        assert_eq!(wire["parameters"]["MULTI_STATEMENT_COUNT"], "3");
        assert_eq!(wire["timeout"], 60);
        Ok(())
    }

    #[test]
    fn wire_responses_deserialize() -> SnowflakeResult<()> {
        let body = r#"{
            "resultSetMetaData": {
                "numRows": 1,
                "format": "jsonv2",
                "partitionInfo": [{"rowCount": 1, "uncompressedSize": 12}],
                "rowType": [
                    {"name": "NAME", "database": "", "schema": "", "table": "",
                     "type": "text", "nullable": true, "byteLength": 16777216}
                ]
            },
            "data": [["TINY_WAREHOUSE"]],
            "code": "090001",
            "statementStatusUrl": "/api/v2/statements/01a?requestId=x",
            "statementHandles": ["01b", "01c"]
        }"#;
        let wire = serde_json::from_str::<SnowflakeWireResult<WireQueryResponse>>(body)?
            .into_result()?;
        let response = wire.hydrate(client()?.prepare("SHOW WAREHOUSES"));
        assert_eq!(response.num_rows(), 1);
        assert_eq!(response.num_columns(), 1);
        assert_eq!(response.statement_handles(), ["01b", "01c"]);
        let partition = response.only_partition()?;
        assert_eq!(partition.cells()?[0][0], Cell::Varchar("TINY_WAREHOUSE".into()));
        Ok(())
    }
}

//
// Wire types
//

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStatementMetaData {
    pub num_rows: usize,
    //pub format: String,
    pub row_type: Vec<ColumnType>,
    // The partition info mostly doesn't matter, only the number of partitions
    #[serde(default)]
    pub partition_info: Vec<WirePartitionInfo>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePartitionInfo {
    //pub row_count: usize,
    //pub uncompressed_size: usize,
    //pub compressed_size: Option<usize>,
}

/// The type of a column in the result set
///
/// In most cases Cell should already expose the data you need,
/// but if you use the raw strings or need additional information like nullability, etc,
/// this can be useful.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ColumnType {
    /// The name of the column
    pub name: String,
    /// The database the column is in
    #[serde(default)]
    pub database: String,
    /// The schema the column is in
    #[serde(default)]
    pub schema: String,
    /// The table the column is in
    #[serde(default)]
    pub table: String,
    /// How many decimal digits of precision the column has
    /// (this is usually 38)
    pub precision: Option<u32>,
    /// The length of the column in bytes
    pub byte_length: Option<usize>,
    #[serde(rename = "type")]
    /// The format used when serializing the type to String before returning it
    pub data_type: RawCell,
    // The number of decimal digits of scale the column has (after the decimal point, usually 0)
    pub scale: Option<i32>,
    // Whether the column can be null
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
}

fn nullable_by_default() -> bool {
    true
}

impl ColumnType {
    /// A nullable column with no table context, mostly useful for building partitions by hand
    pub fn new(name: impl Into<String>, data_type: RawCell) -> ColumnType {
        ColumnType {
            name: name.into(),
            database: String::new(),
            schema: String::new(),
            table: String::new(),
            precision: None,
            byte_length: None,
            data_type,
            scale: None,
            nullable: true,
        }
    }

    pub fn with_scale(mut self, scale: i32) -> ColumnType {
        self.scale = Some(scale);
        self
    }
}

#[derive(Deserialize, Debug)]
pub struct WireChanges {
    #[serde(rename = "numRowsInserted")]
    pub rows_inserted: usize,
    #[serde(rename = "numRowsDeleted")]
    pub rows_deleted: usize,
    #[serde(rename = "numRowsUpdated")]
    pub rows_updated: usize,
    #[serde(rename = "numDmlDuplicates")]
    pub duplicates: usize,
}

#[derive(Deserialize, Debug)]
pub struct WireDMLResult {
    pub message: String,
    pub stats: WireChanges,
}

impl WireQueryResponse {
    fn hydrate(self, statement: Statement) -> QueryResponse {
        QueryResponse {
            result_set_meta_data: self.result_set_meta_data,
            data: self.data,
            statement_status_url: self.statement_status_url,
            statement_handles: self.statement_handles,
            statement,
        }
    }
}

#[derive(Deserialize, Debug)]
struct WirePartitionResponse {
    data: Arc<StringTable>,
}

#[derive(Serialize, Debug, Clone)]
struct WireStatement {
    statement: String,
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    bindings: HashMap<String, Binding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<WireParameters>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct WireParameters {
    multi_statement_count: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct WireQueryResponse {
    result_set_meta_data: WireStatementMetaData,
    data: Arc<StringTable>,
    // code: String,
    statement_status_url: String,
    #[serde(default)]
    statement_handles: Vec<String>,
    // request_id: String,
    // sql_state: String,
    // message: String,
}
