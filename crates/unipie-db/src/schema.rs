//! DDL for the canonical tables.
//!
//! Statements are generated from [`unipie_core::TableSchema`] so the
//! database and the normalizer share one column list. Identifiers are
//! quoted: several source headers carry capitals or spaces
//! (`"Living costs"`, `"fees (annual)"`).

use sqlx::PgPool;
use unipie_core::{Entity, TableSchema};

use crate::DbError;

/// Quote a Postgres identifier.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_list(idents: &[&str]) -> String {
    idents
        .iter()
        .map(|i| quote_ident(i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE IF NOT EXISTS` statement for one schema.
#[must_use]
pub fn create_table_sql(schema: &TableSchema) -> String {
    let mut parts: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(c.name), c.ty.sql_type()))
        .collect();

    parts.push(format!("PRIMARY KEY ({})", quote_list(schema.primary_key)));
    for fk in schema.foreign_keys {
        parts.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(fk.column),
            quote_ident(fk.references_table),
            quote_ident(fk.references_column)
        ));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote_ident(schema.name),
        parts.join(",\n    ")
    )
}

/// Create the five canonical tables if they do not exist.
///
/// Tables are created parents first inside one transaction; existing
/// tables are left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DbError> {
    let mut tx = pool.begin().await?;
    for entity in Entity::ALL {
        let sql = create_table_sql(entity.schema());
        sqlx::query(&sql).execute(&mut *tx).await?;
        tracing::debug!(table = %entity, "ensured table");
    }
    tx.commit().await?;
    Ok(())
}
