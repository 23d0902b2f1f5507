//! Table definition statements rendered from a [`Schema`].

use super::{Column, ColumnType, Constraint, Schema, TableOption};
use crate::db::{Database, DbResult};
use log::info;

impl Schema {
    /// `CREATE TABLE` followed by one `CREATE [UNIQUE] INDEX` per constraint.
    pub fn create_table_statements(&self) -> Vec<String> {
        let table = quote_identifier(self.table_name());
        let columns = self
            .columns()
            .iter()
            .map(column_definition)
            .collect::<Vec<_>>()
            .join(", ");
        let options = self
            .table_args()
            .options()
            .iter()
            .map(|option| match option {
                TableOption::Strict => "STRICT",
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {table} ({columns}) {options};"
        )];
        statements.extend(self.table_args().constraints().iter().map(|constraint| {
            let unique = match constraint {
                Constraint::Index { .. } => "",
                Constraint::Unique { .. } => "UNIQUE ",
            };
            let indexed = constraint
                .columns()
                .iter()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "CREATE {unique}INDEX IF NOT EXISTS {} ON {table} ({indexed});",
                quote_identifier(constraint.name())
            )
        }));
        statements
    }

    pub fn drop_table_statement(&self) -> String {
        format!(
            "DROP TABLE IF EXISTS {};",
            quote_identifier(self.table_name())
        )
    }
}

/// Creates the entity table and its constraints in one transaction.
pub fn create_table(db: &Database, schema: &Schema) -> DbResult<()> {
    db.with_session(|session| {
        session.begin()?;
        for statement in schema.create_table_statements() {
            session.connection().execute_batch(&statement)?;
        }
        session.commit()?;
        info!(
            "event=table_create module=schema status=ok entity={} table={}",
            schema.entity_name(),
            schema.table_name()
        );
        Ok(())
    })
}

pub fn drop_table(db: &Database, schema: &Schema) -> DbResult<()> {
    db.with_session(|session| {
        session
            .connection()
            .execute_batch(&schema.drop_table_statement())?;
        info!(
            "event=table_drop module=schema status=ok entity={} table={}",
            schema.entity_name(),
            schema.table_name()
        );
        Ok(())
    })
}

pub(crate) fn quote_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn column_definition(column: &Column) -> String {
    let name = quote_identifier(column.name());
    if column.is_primary_key() {
        return format!("{name} INTEGER PRIMARY KEY");
    }

    let mut definition = format!("{name} {}", column.kind().sql_type());
    if !column.is_nullable() {
        definition.push_str(" NOT NULL");
    }
    if let Some(max_len) = column.max_length() {
        definition.push_str(&format!(" CHECK (length({name}) <= {max_len})"));
    }
    if column.kind() == ColumnType::Boolean {
        definition.push_str(&format!(" CHECK ({name} IN (0, 1))"));
    }
    definition
}
