//! Resource kinds, the `SHOW` allow-list, and listing resources

use std::fmt;

use crate::cells::Cell;
use crate::errors::{SnowflakeError, SnowflakeResult};
use crate::executor::Executor;

/// Every resource type tag that can be listed, singular and plural
pub const VIABLE_RESOURCE_TYPES: &[&str] = &[
    "WAREHOUSE",
    "DATABASE",
    "SCHEMA",
    "TABLE",
    "WAREHOUSES",
    "DATABASES",
    "SCHEMAS",
    "TABLES",
];

/// The kinds of remote objects this crate manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Warehouse,
    Database,
    Schema,
    Table,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Warehouse,
        ResourceKind::Database,
        ResourceKind::Schema,
        ResourceKind::Table,
    ];

    /// Keyword used when creating or dropping one resource
    pub fn keyword(self) -> &'static str {
        match self {
            ResourceKind::Warehouse => "WAREHOUSE",
            ResourceKind::Database => "DATABASE",
            ResourceKind::Schema => "SCHEMA",
            ResourceKind::Table => "TABLE",
        }
    }

    /// Keyword used when listing resources
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Warehouse => "WAREHOUSES",
            ResourceKind::Database => "DATABASES",
            ResourceKind::Schema => "SCHEMAS",
            ResourceKind::Table => "TABLES",
        }
    }
}

/// A validated resource type tag, remembering which form the caller used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceType {
    pub kind: ResourceKind,
    pub plural: bool,
}

impl ResourceType {
    pub fn tag(self) -> &'static str {
        if self.plural {
            self.kind.plural()
        } else {
            self.kind.keyword()
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = SnowflakeError;

    fn from_str(tag: &str) -> SnowflakeResult<ResourceType> {
        ResourceKind::ALL
            .into_iter()
            .flat_map(|kind| {
                [
                    ResourceType { kind, plural: false },
                    ResourceType { kind, plural: true },
                ]
            })
            .find(|candidate| candidate.tag() == tag)
            .ok_or_else(|| SnowflakeError::Validation {
                value: tag.to_owned(),
                allowed: VIABLE_RESOURCE_TYPES,
            })
    }
}

/// Checks that a resource type tag is one of [`VIABLE_RESOURCE_TYPES`]
///
/// The check is case-sensitive and does no I/O.
pub fn check_resource_viable(resource_type: &str) -> SnowflakeResult<ResourceType> {
    resource_type.parse()
}

/// Lists every resource of a type with `SHOW`, printing each row to stdout
///
/// The tag is validated before anything is sent. All rows come back in one batch.
pub async fn print_resources<E: Executor + ?Sized>(
    conn: &E,
    resource_type: &str,
) -> SnowflakeResult<Vec<Vec<Cell>>> {
    let resource_type = check_resource_viable(resource_type)?;
    let all_rows = conn
        .execute(&format!("SHOW {resource_type}"), &[])
        .await?
        .cells()?;
    for row in &all_rows {
        println!("{}", format_row(row));
    }
    Ok(all_rows)
}

fn format_row(row: &[Cell]) -> String {
    let cells: Vec<String> = row.iter().map(Cell::to_string).collect();
    format!("({})", cells.join(", "))
}
