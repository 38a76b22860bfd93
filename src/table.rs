use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;

use crate::error::{EtlError, Result};

/// One typed cell of a working table. Raw files carry empty cells for any
/// column, so every type is nullable via `Field::Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Text(String),
    Int(i64),
    Real(f64),
    Date(NaiveDate),
    Null,
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Field::Text(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Field::Int(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Field::Real(f) => {
                2u8.hash(state);
                // Normalize -0.0 so equal reals cannot hash apart.
                let bits = if *f == 0.0 { 0u64 } else { f.to_bits() };
                bits.hash(state);
            }
            Field::Date(d) => {
                3u8.hash(state);
                d.hash(state);
            }
            Field::Null => 4u8.hash(state),
        }
    }
}

impl Field {
    pub fn text(value: impl Into<String>) -> Field {
        Field::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Field::Real(f) => Some(*f),
            Field::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Field::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }
}

/// A named-column, row-major working set. Extract and transform stages each
/// consume their input by value and hand back a new table, so no stage ever
/// observes another stage's mutations.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Field>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Field>>) -> Result<Table> {
        for row in &rows {
            if row.len() != columns.len() {
                return Err(EtlError::schema(format!(
                    "row width {} does not match {} columns",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Field>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Project a subset of columns by name, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let idx = self
                .column_index(name)
                .ok_or_else(|| EtlError::schema(format!("column `{name}` not in raw table")))?;
            indices.push(idx);
        }
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// Apply a pure renaming function to every column name. The function is
    /// expected to be total over this table's columns; an unknown name
    /// surfaces as a schema error.
    pub fn rename_columns(mut self, rename: impl Fn(&str) -> Result<String>) -> Result<Table> {
        let mut renamed = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            renamed.push(rename(name)?);
        }
        self.columns = renamed;
        Ok(self)
    }

    /// Concatenate another row-set below this one. Both tables must carry
    /// the identical canonical column list; a mismatch means a renaming
    /// function drifted between the winner and loser projections.
    pub fn stack(mut self, other: Table) -> Result<Table> {
        if self.columns != other.columns {
            return Err(EtlError::schema(format!(
                "stacked column sets differ: {:?} vs {:?}",
                self.columns, other.columns
            )));
        }
        self.rows.extend(other.rows);
        Ok(self)
    }

    /// Exact full-row duplicate elimination, keeping the first occurrence
    /// of each row in its original position.
    pub fn dedup(mut self) -> Table {
        let mut seen: HashSet<Vec<Field>> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
        self
    }

    /// Prepend a column holding the same value on every row. Used to stamp
    /// season-scoped entities.
    pub fn insert_lead_column(&mut self, name: &str, value: Field) {
        self.columns.insert(0, name.to_string());
        for row in &mut self.rows {
            row.insert(0, value.clone());
        }
    }

    /// Rewrite one column cell-by-cell. The closure sees the whole row so
    /// derived values can depend on sibling cells.
    pub fn map_column_with_row(
        &mut self,
        name: &str,
        f: impl Fn(&[Field], &Field) -> Field,
    ) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| EtlError::schema(format!("column `{name}` not in table")))?;
        for row in &mut self.rows {
            let replacement = f(row, &row[idx]);
            row[idx] = replacement;
        }
        Ok(())
    }

    pub fn set_column_name(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self
            .column_index(old)
            .ok_or_else(|| EtlError::schema(format!("column `{old}` not in table")))?;
        self.columns[idx] = new.to_string();
        Ok(())
    }

    /// Distinct text values of one column in first-occurrence order; null
    /// cells are skipped. Natural keys for the dimension tables come from
    /// here.
    pub fn distinct_text(&self, name: &str) -> Result<Vec<String>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| EtlError::schema(format!("column `{name}` not in table")))?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            match &row[idx] {
                Field::Text(s) => {
                    if seen.insert(s.clone()) {
                        out.push(s.clone());
                    }
                }
                Field::Null => {}
                other => {
                    return Err(EtlError::schema(format!(
                        "column `{name}` holds non-text value {other:?}"
                    )));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_column(rows: Vec<Vec<Field>>) -> Table {
        Table::new(vec!["a".to_string(), "b".to_string()], rows).unwrap()
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let table = two_column(vec![
            vec![Field::text("x"), Field::Int(1)],
            vec![Field::text("y"), Field::Int(2)],
            vec![Field::text("x"), Field::Int(1)],
            vec![Field::text("z"), Field::Int(3)],
        ])
        .dedup();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0][0].as_text(), Some("x"));
        assert_eq!(table.rows()[1][0].as_text(), Some("y"));
        assert_eq!(table.rows()[2][0].as_text(), Some("z"));
    }

    #[test]
    fn dedup_treats_equal_reals_as_duplicates() {
        let table = two_column(vec![
            vec![Field::text("x"), Field::Real(1.5)],
            vec![Field::text("x"), Field::Real(1.5)],
            vec![Field::text("x"), Field::Real(0.0)],
            vec![Field::text("x"), Field::Real(-0.0)],
        ])
        .dedup();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn stack_rejects_diverged_columns() {
        let left = two_column(vec![]);
        let right = Table::new(vec!["a".to_string(), "c".to_string()], vec![]).unwrap();
        assert!(left.stack(right).is_err());
    }

    #[test]
    fn insert_lead_column_stamps_every_row() {
        let mut table = two_column(vec![
            vec![Field::text("x"), Field::Int(1)],
            vec![Field::text("y"), Field::Int(2)],
        ]);
        table.insert_lead_column("season", Field::Int(2010));
        assert_eq!(table.columns()[0], "season");
        assert!(table.rows().iter().all(|r| r[0] == Field::Int(2010)));
    }

    #[test]
    fn select_unknown_column_is_schema_error() {
        let table = two_column(vec![]);
        let err = table.select(&["a", "missing"]).unwrap_err();
        assert_eq!(err.kind(), "schema");
    }

    #[test]
    fn distinct_text_skips_nulls_and_repeats() {
        let table = two_column(vec![
            vec![Field::text("x"), Field::Int(1)],
            vec![Field::Null, Field::Int(2)],
            vec![Field::text("x"), Field::Int(3)],
            vec![Field::text("y"), Field::Int(4)],
        ]);
        assert_eq!(table.distinct_text("a").unwrap(), vec!["x", "y"]);
    }
}
