//! In-memory executor for unit tests
//!
//! Statements are matched against registered patterns by substring, first match wins.
//! Anything unmatched succeeds with a one-row status result.

use std::sync::Mutex;

use crate::bindings::Binding;
use crate::cells::RawCell;
use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::executor::Executor;
use crate::partition::Partition;
use crate::statement::ColumnType;

#[derive(Default)]
pub(crate) struct MockExecutor {
    responses: Vec<(String, Partition)>,
    failures: Vec<(String, String)>,
    executed: Mutex<Vec<String>>,
    scripts: Mutex<Vec<usize>>,
}

impl MockExecutor {
    pub fn new() -> MockExecutor {
        MockExecutor::default()
    }

    pub fn respond_to(mut self, pattern: &str, result: Partition) -> MockExecutor {
        self.responses.push((pattern.to_owned(), result));
        self
    }

    /// Reject statements containing `pattern` with a Snowflake error code
    pub fn fail_on(mut self, pattern: &str, code: &str) -> MockExecutor {
        self.failures.push((pattern.to_owned(), code.to_owned()));
        self
    }

    /// Every statement that reached the server, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().map(|x| x.clone()).unwrap_or_default()
    }

    /// Number of statements in each script request
    pub fn scripts(&self) -> Vec<usize> {
        self.scripts.lock().map(|x| x.clone()).unwrap_or_default()
    }

    fn run(&self, sql: &str) -> SnowflakeResult<Partition> {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(sql.to_owned());
        }
        if let Some((_, code)) = self.failures.iter().find(|(p, _)| sql.contains(p.as_str())) {
            return Err(SnowflakeError::from_server(
                code.clone(),
                format!("SQL compilation error: rejected {sql:?}"),
            ));
        }
        Ok(self
            .responses
            .iter()
            .find(|(p, _)| sql.contains(p.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(status_result))
    }
}

#[async_trait::async_trait]
impl Executor for MockExecutor {
    async fn execute(&self, sql: &str, _bindings: &[Binding]) -> SnowflakeResult<Partition> {
        self.run(sql)
    }

    async fn execute_script(&self, statements: &[String]) -> SnowflakeResult<Vec<Partition>> {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push(statements.len());
        }
        statements.iter().map(|sql| self.run(sql)).collect()
    }
}

pub(crate) fn status_result() -> Partition {
    text_result("status", &["Statement executed successfully."])
}

pub(crate) fn text_result(column: &str, values: &[&str]) -> Partition {
    Partition::new(
        vec![ColumnType::new(column, RawCell::Text)],
        values.iter().map(|v| vec![Some(v.to_string())]).collect(),
    )
}

/// The first `rows` rows of an iris-shaped table, as Snowflake would return them
pub(crate) fn iris_result(rows: usize) -> Partition {
    let columns = vec![
        ColumnType::new("SEPAL_LENGTH", RawCell::Fixed).with_scale(1),
        ColumnType::new("SEPAL_WIDTH", RawCell::Fixed).with_scale(1),
        ColumnType::new("PETAL_LENGTH", RawCell::Fixed).with_scale(1),
        ColumnType::new("PETAL_WIDTH", RawCell::Fixed).with_scale(1),
        ColumnType::new("SPECIES", RawCell::Text),
    ];
    let species = ["setosa", "versicolor", "virginica"];
    let data = (0..rows)
        .map(|i| {
            vec![
                Some(format!("{}.{}", 4 + i % 4, i % 10)),
                Some(format!("3.{}", i % 10)),
                Some(format!("{}.{}", 1 + i % 6, (i + 3) % 10)),
                Some(format!("0.{}", (i % 9) + 1)),
                Some(species[i * 3 / rows.max(1)].to_owned()),
            ]
        })
        .collect();
    Partition::new(columns, data)
}
