//! Database schema and its flattened prompt encoding.
//!
//! `SchemaText` format, one block per table:
//!
//! ```text
//! Table: employees
//! - id, name, dept
//! Table: departments
//! - id, title
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

const TABLE_PREFIX: &str = "Table: ";
const COLUMNS_PREFIX: &str = "- ";
const COLUMN_SEPARATOR: &str = ", ";

/// Columns of a single table, in database order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
}

/// Ordered mapping of table name to column names.
///
/// Table names are unique. Inserting an existing name replaces its columns but
/// keeps the table at its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<TableSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, columns: Vec<String>) {
        let name = name.into();
        match self.tables.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.columns = columns,
            None => self.tables.push(TableSchema { name, columns }),
        }
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.columns.as_slice())
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Flatten into the text form sent to the language model.
    pub fn to_text(&self) -> SchemaText {
        let text = self
            .tables
            .iter()
            .map(|t| {
                format!(
                    "{}{}\n{}{}",
                    TABLE_PREFIX,
                    t.name,
                    COLUMNS_PREFIX,
                    t.columns.join(COLUMN_SEPARATOR)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        SchemaText(text)
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<String>)> for Schema {
    fn from_iter<I: IntoIterator<Item = (N, Vec<String>)>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for (name, columns) in iter {
            schema.insert(name, columns);
        }
        schema
    }
}

// Rendered as a JSON object so templates can iterate table -> columns.
impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, &table.columns)?;
        }
        map.end()
    }
}

/// Flattened schema encoding, the only schema form sent to the language model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaText(String);

impl SchemaText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Parse the text form back into a [`Schema`].
    ///
    /// A `Table: ` line opens a table context; a `- ` line inside a context
    /// sets that table's columns. Anything else is ignored, as is a header
    /// without a column line.
    pub fn parse(&self) -> Schema {
        let mut schema = Schema::new();
        let mut current: Option<&str> = None;

        for line in self.0.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(name) = line.strip_prefix(TABLE_PREFIX) {
                current = Some(name.trim());
            } else if let Some(columns) = line.strip_prefix(COLUMNS_PREFIX) {
                if let Some(table) = current {
                    let columns = columns
                        .split(COLUMN_SEPARATOR)
                        .map(str::to_string)
                        .collect();
                    schema.insert(table, columns);
                }
            }
        }

        schema
    }
}

impl fmt::Display for SchemaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
