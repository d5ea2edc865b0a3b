use sqlx::{PgConnection, PgPool};
use unipie_core::{AccumulatedTables, Cell, ColumnType, Entity, Table};

use crate::schema::quote_ident;
use crate::DbError;

/// Overwrite one table and clear every table that references it.
///
/// Existing rows are removed with `TRUNCATE … CASCADE`: replacing
/// University empties all four child tables, replacing Programme empties
/// its three dependents. Use [`write_tables`] to rewrite a consistent set.
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::NonCanonicalColumns`] if the table's columns differ
/// from its schema, [`DbError::InvalidNumber`] if a numeric cell cannot be
/// parsed, or [`DbError::Write`] / [`DbError::Sqlx`] if any statement
/// fails; the transaction is rolled back in every case.
pub async fn replace_table(pool: &PgPool, table: &Table) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let written = replace_in(&mut tx, table).await?;
    tx.commit().await?;
    Ok(written)
}

/// Replace every canonical table, parents first, in one transaction.
///
/// A failure on any table rolls back the whole batch, so a run never
/// leaves parents replaced and children cleared.
///
/// # Errors
///
/// Returns the first [`DbError`] raised by [`replace_table`]'s logic.
pub async fn write_tables(
    pool: &PgPool,
    tables: &AccumulatedTables,
) -> Result<Vec<(Entity, u64)>, DbError> {
    let mut tx = pool.begin().await?;
    let mut written = Vec::with_capacity(Entity::ALL.len());

    for entity in Entity::ALL {
        let empty;
        let table = match tables.get(entity) {
            Some(table) => table,
            None => {
                empty = Table::empty(entity);
                &empty
            }
        };
        let rows = replace_in(&mut tx, table).await?;
        written.push((entity, rows));
    }

    tx.commit().await?;
    Ok(written)
}

async fn replace_in(conn: &mut PgConnection, table: &Table) -> Result<u64, DbError> {
    let entity = table.entity;
    if !table.has_canonical_columns() {
        return Err(DbError::NonCanonicalColumns {
            table: entity.to_string(),
        });
    }

    let schema = entity.schema();
    let table_name = quote_ident(schema.name);

    sqlx::query(&format!("TRUNCATE TABLE {table_name} CASCADE"))
        .execute(&mut *conn)
        .await?;

    let columns: Vec<String> = schema.column_names().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    let sql = format!(
        "INSERT INTO {table_name} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );

    let mut written = 0u64;
    for (row_idx, row) in table.rows.iter().enumerate() {
        let mut query = sqlx::query(&sql);
        for value in typed_row(entity, row_idx, row)? {
            query = match value {
                TypedValue::Text(v) => query.bind(v),
                TypedValue::Integer(v) => query.bind(v),
                TypedValue::Float(v) => query.bind(v),
            };
        }

        query
            .execute(&mut *conn)
            .await
            .map_err(|source| DbError::Write {
                table: entity.to_string(),
                row: row_idx,
                source,
            })?;
        written += 1;
    }

    tracing::info!(table = %entity, rows = written, "replaced table");
    Ok(written)
}

/// A cell converted to the type of its destination column.
#[derive(Debug, Clone, PartialEq)]
enum TypedValue {
    Text(Option<String>),
    Integer(Option<i32>),
    Float(Option<f64>),
}

/// Convert one row to its column types. Blank cells stay NULL; a non-blank
/// numeric cell that does not parse is an error naming its position.
fn typed_row(entity: Entity, row_idx: usize, row: &[Cell]) -> Result<Vec<TypedValue>, DbError> {
    let invalid = |column: &str, value: &str| {
        tracing::warn!(
            table = %entity,
            column,
            row = row_idx,
            value,
            "non-numeric value in numeric column"
        );
        DbError::InvalidNumber {
            table: entity.to_string(),
            column: column.to_string(),
            row: row_idx,
            value: value.to_string(),
        }
    };

    entity
        .schema()
        .columns
        .iter()
        .zip(row)
        .map(|(column, cell)| {
            let raw = cell.as_deref();
            Ok(match column.ty {
                ColumnType::Text => TypedValue::Text(raw.map(str::to_string)),
                ColumnType::Integer => TypedValue::Integer(match raw {
                    Some(v) => Some(parse_integer(v).ok_or_else(|| invalid(column.name, v))?),
                    None => None,
                }),
                ColumnType::Float => TypedValue::Float(match raw {
                    Some(v) => Some(parse_float(v).ok_or_else(|| invalid(column.name, v))?),
                    None => None,
                }),
            })
        })
        .collect()
}

/// Row counts for every canonical table, in write order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a table is missing or a query fails.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(Entity, i64)>, DbError> {
    let mut counts = Vec::with_capacity(Entity::ALL.len());
    for entity in Entity::ALL {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(entity.table_name()));
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
        counts.push((entity, count));
    }
    Ok(counts)
}

/// Strip currency marks and spacing, and resolve `,` as either a
/// thousands separator (`1,200`) or a decimal comma (`6,5`).
fn clean_number(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_start_matches(['$', '€', '£'])
        .trim();
    if trimmed.is_empty() {
        return None;
    }

    let compact: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '_'))
        .collect();

    if !compact.contains(',') {
        return Some(compact);
    }
    if compact.contains('.') {
        return Some(compact.replace(',', ""));
    }

    let mut groups = compact.split(',');
    let head = groups.next().unwrap_or_default();
    let tail: Vec<&str> = groups.collect();
    let thousands = !head.is_empty()
        && tail
            .iter()
            .all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()));

    if thousands {
        Some(compact.replace(',', ""))
    } else if tail.len() == 1 {
        Some(compact.replacen(',', ".", 1))
    } else {
        None
    }
}

/// Parse an integer cell. Whole floats such as `1861.0` are accepted.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn parse_integer(raw: &str) -> Option<i32> {
    let cleaned = clean_number(raw)?;
    if let Ok(value) = cleaned.parse::<i32>() {
        return Some(value);
    }
    let value = cleaned.parse::<f64>().ok()?;
    let in_range = value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX);
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// Parse a floating-point cell.
#[must_use]
pub fn parse_float(raw: &str) -> Option<f64> {
    let value = clean_number(raw)?.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}
