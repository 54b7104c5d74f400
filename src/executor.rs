use crate::bindings::Binding;
use crate::errors::SnowflakeResult;
use crate::partition::Partition;
use crate::SnowflakeClient;

/// Anything that can run SQL against Snowflake
///
/// Every helper in this crate is written against this trait, so they work the same
/// with a [`SnowflakeClient`] or with any other way of reaching a warehouse.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Run one statement and return every row it produced
    ///
    /// Results spanning several partitions are fetched and concatenated.
    async fn execute(&self, sql: &str, bindings: &[Binding]) -> SnowflakeResult<Partition>;

    /// Run several statements in order, in a single session
    ///
    /// The first failing statement stops the script and its error is returned.
    /// On success there is one result per statement.
    async fn execute_script(&self, statements: &[String]) -> SnowflakeResult<Vec<Partition>>;
}

#[async_trait::async_trait]
impl Executor for SnowflakeClient {
    async fn execute(&self, sql: &str, bindings: &[Binding]) -> SnowflakeResult<Partition> {
        let statement = bindings
            .iter()
            .cloned()
            .fold(self.prepare(sql), |statement, binding| statement.add_binding(binding));
        statement.query().await?.concat_partitions().await
    }

    async fn execute_script(&self, statements: &[String]) -> SnowflakeResult<Vec<Partition>> {
        match statements {
            [] => return Ok(Vec::new()),
            [single] => return Ok(vec![self.execute(single, &[]).await?]),
            _ => {}
        }
        let response = self
            .prepare(&statements.join(";\n"))
            .with_statement_count(statements.len())
            .query()
            .await?;
        let mut results = Vec::with_capacity(statements.len());
        for handle in response.statement_handles() {
            let result = response.statement_result(handle).await?;
            results.push(result.concat_partitions().await?);
        }
        Ok(results)
    }
}
