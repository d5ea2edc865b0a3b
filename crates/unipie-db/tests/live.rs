//! Live integration tests for unipie-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh Postgres database from the sqlx test harness.
//! No migrations are applied; tables are created by `ensure_schema`.

use unipie_core::{Accumulator, Entity, Table};
use unipie_db::{ensure_schema, replace_table, table_counts, write_tables, DbError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn table(entity: Entity, rows: &[&[&str]]) -> Table {
    let mut table = Table::empty(entity);
    for row in rows {
        table.push_row(
            row.iter()
                .map(|v| (!v.is_empty()).then(|| (*v).to_string()))
                .collect(),
        );
    }
    table
}

fn university(name: &str) -> Table {
    table(Entity::University, &[&[name, "Cambridge, MA", "1861"]])
}

async fn count(pool: &sqlx::PgPool, entity: Entity) -> i64 {
    table_counts(pool)
        .await
        .unwrap()
        .into_iter()
        .find(|(e, _)| *e == entity)
        .map(|(_, n)| n)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn ensure_schema_is_idempotent(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();
    ensure_schema(&pool).await.unwrap();

    let counts = table_counts(&pool).await.unwrap();
    assert_eq!(counts.len(), 5);
    assert!(counts.iter().all(|(_, n)| *n == 0));
}

// ---------------------------------------------------------------------------
// Replace semantics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn replace_table_overwrites_previous_rows(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();

    replace_table(&pool, &university("MIT")).await.unwrap();
    replace_table(&pool, &university("TUM")).await.unwrap();

    let names: Vec<String> = sqlx::query_scalar("SELECT uni_name FROM \"University\"")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(names, vec!["TUM".to_string()]);

    let founded: Option<i32> = sqlx::query_scalar("SELECT founded FROM \"University\"")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(founded, Some(1861));
}

#[sqlx::test(migrations = false)]
async fn unparseable_number_aborts_and_keeps_previous_rows(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();
    replace_table(&pool, &university("MIT")).await.unwrap();

    let err = replace_table(&pool, &table(Entity::University, &[&["TUM", "", "circa 1868"]]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidNumber { ref column, row: 0, .. } if column == "founded"
    ));

    let names: Vec<String> = sqlx::query_scalar("SELECT uni_name FROM \"University\"")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(names, vec!["MIT".to_string()]);
}

#[sqlx::test(migrations = false)]
async fn replacing_university_clears_child_tables(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();

    let mut acc = Accumulator::new();
    acc.absorb(university("MIT")).unwrap();
    acc.absorb(table(
        Entity::Programme,
        &[&["MIT", "Computer Science", "4 years", "", "", "", "BSc"]],
    ))
    .unwrap();
    write_tables(&pool, &acc.finish()).await.unwrap();
    assert_eq!(count(&pool, Entity::Programme).await, 1);

    replace_table(&pool, &university("MIT")).await.unwrap();
    assert_eq!(count(&pool, Entity::University).await, 1);
    assert_eq!(count(&pool, Entity::Programme).await, 0);
}

#[sqlx::test(migrations = false)]
async fn write_tables_writes_parents_before_children(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();

    let mut acc = Accumulator::new();
    acc.absorb(university("MIT")).unwrap();
    acc.absorb(table(
        Entity::Programme,
        &[&["MIT", "Computer Science", "4 years", "", "", "", "BSc"]],
    ))
    .unwrap();
    acc.absorb(table(
        Entity::TestType,
        &[&["MIT", "Computer Science", "IELTS", "7", "6.5"]],
    ))
    .unwrap();

    let written = write_tables(&pool, &acc.finish()).await.unwrap();
    let order: Vec<Entity> = written.iter().map(|(e, _)| *e).collect();
    assert_eq!(order, Entity::ALL.to_vec());
    assert_eq!(count(&pool, Entity::TestType).await, 1);

    let minimum: Option<f64> = sqlx::query_scalar("SELECT minimum_score FROM \"TestType\"")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(minimum, Some(6.5));
}

// ---------------------------------------------------------------------------
// Failure paths
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = false)]
async fn programme_with_unknown_university_fails(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();

    let orphan = table(Entity::Programme, &[&["Nowhere U", "History", "", "", "", "", "BA"]]);
    let err = replace_table(&pool, &orphan).await.unwrap_err();
    assert!(matches!(err, DbError::Write { row: 0, .. }));
    assert_eq!(count(&pool, Entity::Programme).await, 0);
}

#[sqlx::test(migrations = false)]
async fn failed_batch_rolls_back_every_table(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();
    replace_table(&pool, &university("MIT")).await.unwrap();

    let mut acc = Accumulator::new();
    acc.absorb(university("TUM")).unwrap();
    acc.absorb(table(
        Entity::Programme,
        &[&["Unknown U", "Informatics", "", "", "", "", "BSc"]],
    ))
    .unwrap();

    let err = write_tables(&pool, &acc.finish()).await.unwrap_err();
    assert!(matches!(err, DbError::Write { .. }));

    let names: Vec<String> = sqlx::query_scalar("SELECT uni_name FROM \"University\"")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(names, vec!["MIT".to_string()]);
}

#[sqlx::test(migrations = false)]
async fn non_canonical_table_is_rejected(pool: sqlx::PgPool) {
    ensure_schema(&pool).await.unwrap();

    let mut bad = university("MIT");
    bad.columns.push("extra".to_string());
    let err = replace_table(&pool, &bad).await.unwrap_err();
    assert!(matches!(err, DbError::NonCanonicalColumns { .. }));
}
