//! In-memory tables and the per-entity accumulator.
//!
//! A [`Table`] produced from one (file, entity) pair is a fragment. The
//! [`Accumulator`] unions fragments across files and, on
//! [`Accumulator::finish`], drops exact duplicates so the result does not
//! depend on how many times the same fragment was absorbed.

use std::collections::{BTreeMap, HashSet};

use crate::schema::Entity;
use crate::CoreError;

/// A single cell; blank cells are `None`.
pub type Cell = Option<String>;

/// A row of cells, positionally aligned with [`Table::columns`].
pub type Row = Vec<Cell>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub entity: Entity,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// A table with the entity's canonical columns and no rows.
    #[must_use]
    pub fn empty(entity: Entity) -> Self {
        Self {
            entity,
            columns: entity.columns().into_iter().map(str::to_string).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`, if both exist and the cell is set.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Append a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    /// Remove rows identical across every column, keeping the first.
    pub fn dedup(&mut self) {
        let mut seen: HashSet<Row> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// True when the column set equals the entity's canonical columns.
    #[must_use]
    pub fn has_canonical_columns(&self) -> bool {
        self.columns.iter().map(String::as_str).eq(self.entity.columns())
    }
}

/// Running union of fragments, one table per entity.
#[derive(Debug, Clone)]
pub struct Accumulator {
    tables: BTreeMap<Entity, Table>,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Entity::ALL
                .into_iter()
                .map(|entity| (entity, Table::empty(entity)))
                .collect(),
        }
    }

    /// Append a fragment's rows to its entity's table.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ColumnMismatch`] if the fragment's columns are
    /// not the canonical column list for its entity.
    pub fn absorb(&mut self, fragment: Table) -> Result<(), CoreError> {
        if !fragment.has_canonical_columns() {
            return Err(CoreError::ColumnMismatch {
                entity: fragment.entity.to_string(),
                columns: fragment.columns.join(", "),
            });
        }
        let target = self
            .tables
            .entry(fragment.entity)
            .or_insert_with(|| Table::empty(fragment.entity));
        target.rows.extend(fragment.rows);
        Ok(())
    }

    /// Deduplicate every table and return them in write order.
    #[must_use]
    pub fn finish(self) -> AccumulatedTables {
        let mut tables = self.tables;
        let ordered = Entity::ALL
            .into_iter()
            .map(|entity| {
                let mut table = tables
                    .remove(&entity)
                    .unwrap_or_else(|| Table::empty(entity));
                table.dedup();
                table
            })
            .collect();
        AccumulatedTables { tables: ordered }
    }
}

/// Final per-entity tables, ordered by [`Entity::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatedTables {
    tables: Vec<Table>,
}

impl AccumulatedTables {
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&Table> {
        self.tables.iter().find(|t| t.entity == entity)
    }

    /// Tables in foreign-key dependency order.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(Table::len).sum()
    }
}
