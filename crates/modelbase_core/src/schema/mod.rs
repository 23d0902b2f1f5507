//! Entity registration: typed column schema, table naming and table args.
//!
//! # Responsibility
//! - Describe each entity type once: columns, types, nullability and extra
//!   table constraints.
//! - Validate declarations at registration time, before any SQL runs.
//!
//! # Invariants
//! - Every schema has an implicit integer primary key named `id`, listed
//!   first.
//! - Table name defaults to the plural of the entity name.
//! - Storage defaults are always part of the table args; entity constraints
//!   are appended after them.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) mod ddl;
pub mod naming;

pub use ddl::{create_table, drop_table};

/// Primary key column shared by every entity.
pub const PRIMARY_KEY: &str = "id";
/// Columns starting with this prefix are persisted but never exposed by
/// `to_dict`/`to_json`/`repr`.
pub const PRIVATE_PREFIX: &str = "_";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Storage type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    Date,
    DateTime,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }

    /// Column type inside a `STRICT` SQLite table.
    pub(crate) fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Text | Self::Date | Self::DateTime => "TEXT",
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    kind: ColumnType,
    nullable: bool,
    max_len: Option<u32>,
    primary_key: bool,
}

impl Column {
    /// New nullable column.
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
            max_len: None,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Caps text length in characters. Only valid on `Text` columns.
    pub fn max_len(mut self, max_len: u32) -> Self {
        self.max_len = Some(max_len);
        self
    }

    fn primary_key() -> Self {
        Self {
            name: PRIMARY_KEY.to_string(),
            kind: ColumnType::Integer,
            nullable: false,
            max_len: None,
            primary_key: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn max_length(&self) -> Option<u32> {
        self.max_len
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_private(&self) -> bool {
        is_private_name(&self.name)
    }
}

pub(crate) fn is_private_name(name: &str) -> bool {
    name.starts_with(PRIVATE_PREFIX)
}

/// Extra per-entity table constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Index { name: String, columns: Vec<String> },
    Unique { name: String, columns: Vec<String> },
}

impl Constraint {
    pub fn index(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::Index {
            name: name.into(),
            columns: columns.iter().map(|column| (*column).to_string()).collect(),
        }
    }

    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self::Unique {
            name: name.into(),
            columns: columns.iter().map(|column| (*column).to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Index { name, .. } | Self::Unique { name, .. } => name,
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            Self::Index { columns, .. } | Self::Unique { columns, .. } => columns,
        }
    }
}

/// Table-level option applied when the table is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOption {
    /// Column types are enforced by SQLite instead of being advisory.
    Strict,
}

/// Options every table gets, whatever the entity declares.
pub const DEFAULT_TABLE_OPTIONS: &[TableOption] = &[TableOption::Strict];

/// Storage defaults merged with entity constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableArgs {
    options: Vec<TableOption>,
    constraints: Vec<Constraint>,
}

impl TableArgs {
    fn with_constraints(constraints: Vec<Constraint>) -> Self {
        Self {
            options: DEFAULT_TABLE_OPTIONS.to_vec(),
            constraints,
        }
    }

    pub fn options(&self) -> &[TableOption] {
        &self.options
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// Registration-time schema error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidIdentifier(String),
    ReservedColumn(String),
    DuplicateColumn(String),
    InvalidMaxLength(String),
    EmptyConstraint(String),
    DuplicateConstraint(String),
    UnknownConstraintColumn { constraint: String, column: String },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "invalid identifier `{value}`"),
            Self::ReservedColumn(value) => {
                write!(f, "column `{value}` is reserved for the primary key")
            }
            Self::DuplicateColumn(value) => write!(f, "column `{value}` declared twice"),
            Self::InvalidMaxLength(value) => {
                write!(f, "max length on column `{value}` must be positive and text-only")
            }
            Self::EmptyConstraint(value) => write!(f, "constraint `{value}` has no columns"),
            Self::DuplicateConstraint(value) => {
                write!(f, "constraint `{value}` declared twice")
            }
            Self::UnknownConstraintColumn { constraint, column } => write!(
                f,
                "constraint `{constraint}` references unknown column `{column}`"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Validated, immutable description of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    entity_name: String,
    table_name: String,
    columns: Vec<Column>,
    table_args: TableArgs,
}

impl Schema {
    pub fn builder(entity_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            entity_name: entity_name.into(),
            table_name: None,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// All columns, primary key first, then declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Columns written on insert/update (everything but the primary key).
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| !column.primary_key)
    }

    pub fn table_args(&self) -> &TableArgs {
        &self.table_args
    }
}

/// Declarative builder for [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    entity_name: String,
    table_name: Option<String>,
    columns: Vec<Column>,
    constraints: Vec<Constraint>,
}

impl SchemaBuilder {
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Overrides the pluralized default table name.
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        ensure_identifier(&self.entity_name)?;
        let table_name = match self.table_name {
            Some(name) => name,
            None => naming::table_name(&self.entity_name),
        };
        ensure_identifier(&table_name)?;

        let mut names = BTreeSet::new();
        for column in &self.columns {
            ensure_identifier(&column.name)?;
            if column.name == PRIMARY_KEY {
                return Err(SchemaError::ReservedColumn(column.name.clone()));
            }
            if !names.insert(column.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
            if let Some(max_len) = column.max_len {
                if max_len == 0 || column.kind != ColumnType::Text {
                    return Err(SchemaError::InvalidMaxLength(column.name.clone()));
                }
            }
        }

        let mut constraint_names = BTreeSet::new();
        for constraint in &self.constraints {
            let name = constraint.name();
            ensure_identifier(name)?;
            if !constraint_names.insert(name) {
                return Err(SchemaError::DuplicateConstraint(name.to_string()));
            }
            if constraint.columns().is_empty() {
                return Err(SchemaError::EmptyConstraint(name.to_string()));
            }
            if let Some(column) = constraint
                .columns()
                .iter()
                .find(|column| column.as_str() != PRIMARY_KEY && !names.contains(column.as_str()))
            {
                return Err(SchemaError::UnknownConstraintColumn {
                    constraint: name.to_string(),
                    column: column.clone(),
                });
            }
        }

        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::primary_key());
        columns.extend(self.columns);

        Ok(Schema {
            entity_name: self.entity_name,
            table_name,
            columns,
            table_args: TableArgs::with_constraints(self.constraints),
        })
    }
}

fn ensure_identifier(value: &str) -> Result<(), SchemaError> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(value.to_string()))
    }
}
