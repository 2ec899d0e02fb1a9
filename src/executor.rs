use tracing::debug;

use crate::ast::{ColumnsSelect, OrderByClause, Select, SortDirection};
use crate::condition::Condition;
use crate::data_type::DataType;
use crate::error::{DbError, Result};
use crate::index::Bucket;
use crate::schema::{Row, Schema};
use crate::table::Table;
use crate::value::Value;

/// Runs queries and mutations against a single [Table].
///
/// Predicates are resolved to a set of offsets first, either through an index on
/// the predicate's column or by scanning, and the set is always fully
/// materialised before any row is touched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Executes a `SELECT` against `table`.
    ///
    /// 1. **Resolves** the `WHERE` condition to offsets.
    /// 2. **Fetches** every resolved row.
    /// 3. **Sorts** the rows on the `ORDER BY` column (stable).
    /// 4. **Projects** the requested columns, in schema order.
    /// 5. **Slices** the result to `[offset, offset + limit)`.
    ///
    /// Sorting happens before projection so that any schema column can be used
    /// for ordering; for a projected column the outcome is the same either way.
    ///
    /// # Errors
    /// - [DbError::Schema] for unknown columns in the projection, the ordering or
    ///   the condition.
    /// - [DbError::TypeMismatch] for a condition whose literal does not fit its column.
    /// - [DbError::Range] for a negative limit or offset.
    /// - [DbError::Consistency] if a resolved offset has no live row.
    pub fn select(&self, table: &Table, select: &Select) -> Result<Vec<Row>> {
        let schema = table.schema();

        if let Some(condition) = &select.condition {
            condition.validate(schema)?;
        }
        let projection = project_positions(schema, &select.columns)?;
        let order = select
            .order_by
            .as_ref()
            .map(|order| Ok::<_, DbError>((schema.require(&order.column)?, order)))
            .transpose()?;
        let skip = non_negative("offset", select.offset)?.unwrap_or(0);
        let take = non_negative("limit", select.limit)?.unwrap_or(usize::MAX);

        let offsets = self.resolve(table, select.condition.as_ref())?;

        let mut rows = offsets
            .into_iter()
            .map(|offset| {
                table.get(offset).cloned().ok_or_else(|| {
                    DbError::Consistency(format!("row with offset {offset} is missing"))
                })
            })
            .collect::<Result<Vec<Row>>>()?;

        if let Some((position, order)) = order {
            sort(&mut rows, position, order);
        }

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| match &projection {
                Some(positions) => project(row, positions),
                None => row,
            })
            .collect())
    }

    /// Validates `row` against the table's schema, then appends it.
    ///
    /// # Errors
    /// Returns [DbError::Schema] on an arity mismatch and [DbError::TypeMismatch]
    /// when a value does not have its column's type. Nothing is written on error.
    pub fn insert(&self, table: &mut Table, row: Row) -> Result<usize> {
        let schema = table.schema();

        if row.len() != schema.len() {
            return Err(DbError::Schema(format!(
                "row has {} values but table {:?} has {} columns",
                row.len(),
                table.name(),
                schema.len()
            )));
        }
        for (column, value) in schema.columns().iter().zip(row.values()) {
            check_type(&column.name, column.data_type, value)?;
        }

        Ok(table.insert(row))
    }

    /// Applies `assignments` to every row matching `condition` and returns the
    /// number of rows updated.
    ///
    /// Every target column and value type is checked before the first row is
    /// touched. Once validation passed, rows are updated one after the other.
    pub fn update(
        &self,
        table: &mut Table,
        assignments: &[(String, Value)],
        condition: Option<&Condition>,
    ) -> Result<usize> {
        let schema = table.schema();
        let changes = assignments
            .iter()
            .map(|(column, value)| {
                let position = schema.require(column)?;
                check_type(column, schema.columns()[position].data_type, value)?;
                Ok((position, value.clone()))
            })
            .collect::<Result<Vec<(usize, Value)>>>()?;
        if let Some(condition) = condition {
            condition.validate(schema)?;
        }

        let offsets = self.resolve(table, condition)?;
        for offset in &offsets {
            table.update(*offset, &changes)?;
        }

        debug!(table = table.name(), rows = offsets.len(), "rows updated");
        Ok(offsets.len())
    }

    /// Deletes every row matching `condition` and returns how many were removed.
    pub fn delete(&self, table: &mut Table, condition: Option<&Condition>) -> Result<usize> {
        if let Some(condition) = condition {
            condition.validate(table.schema())?;
        }

        let offsets = self.resolve(table, condition)?;
        for offset in &offsets {
            table.delete(*offset)?;
        }

        debug!(table = table.name(), rows = offsets.len(), "rows deleted");
        Ok(offsets.len())
    }

    /// Resolves a condition tree to the set of matching live offsets.
    ///
    /// A node's own predicate goes through the index on its column when there is
    /// one and a scan otherwise. `and` clauses are intersected into that set and
    /// `or` clauses are unioned in afterwards, which is exactly
    /// [Condition::evaluate] applied row by row. Without a condition every live
    /// row is selected.
    pub fn resolve(&self, table: &Table, condition: Option<&Condition>) -> Result<Bucket> {
        let Some(condition) = condition else {
            return self.scan(table, None);
        };

        let mut offsets = match table.index(&condition.column, condition)? {
            Some(offsets) => {
                debug!(
                    table = table.name(),
                    column = %condition.column,
                    operator = %condition.operator,
                    "resolved through index"
                );
                offsets
            }
            None => {
                debug!(
                    table = table.name(),
                    column = %condition.column,
                    operator = %condition.operator,
                    "resolved by scan"
                );
                self.scan(table, Some(condition))?
            }
        };

        for clause in &condition.and {
            let narrowing = self.resolve(table, Some(clause))?;
            offsets.retain(|offset| narrowing.contains(offset));
        }
        for clause in &condition.or {
            offsets.extend(self.resolve(table, Some(clause))?);
        }

        Ok(offsets)
    }

    /// Walks every live row and keeps those whose value passes the condition's own
    /// predicate.
    fn scan(&self, table: &Table, condition: Option<&Condition>) -> Result<Bucket> {
        let predicate = condition
            .map(|c| Ok::<_, DbError>((c.matcher()?, table.schema().require(&c.column)?)))
            .transpose()?;

        let mut offsets = Bucket::new();
        let mut cursor = table.cursor();
        while !cursor.end() {
            let offset = cursor.advance()?;
            let row = table.get(offset).ok_or_else(|| {
                DbError::Consistency(format!("cursor points to missing row {offset}"))
            })?;

            let keep = predicate.as_ref().is_none_or(|(matcher, position)| {
                row.get(*position).is_some_and(|value| matcher.test(value))
            });
            if keep {
                offsets.insert(offset);
            }
        }

        Ok(offsets)
    }
}

fn check_type(column: &str, expected: DataType, value: &Value) -> Result<()> {
    if value.data_type() != expected {
        return Err(DbError::TypeMismatch(format!(
            "column {column:?} expects {expected:?}, got {:?}",
            value.data_type()
        )));
    }
    Ok(())
}

fn non_negative(what: &str, value: Option<i64>) -> Result<Option<usize>> {
    value
        .map(|v| {
            usize::try_from(v)
                .map_err(|_| DbError::Range(format!("{what} must be non-negative, got {v}")))
        })
        .transpose()
}

/// Schema positions to keep, in schema order, or `None` for `*`.
fn project_positions(schema: &Schema, columns: &ColumnsSelect) -> Result<Option<Vec<usize>>> {
    let ColumnsSelect::ColumnsNames(names) = columns else {
        return Ok(None);
    };
    for name in names {
        schema.require(name)?;
    }

    Ok(Some(
        schema
            .names()
            .enumerate()
            .filter(|(_, name)| names.iter().any(|n| n.as_str() == *name))
            .map(|(position, _)| position)
            .collect(),
    ))
}

fn project(row: Row, positions: &[usize]) -> Row {
    let values = row.into_values();
    Row::new(
        positions
            .iter()
            .filter_map(|position| values.get(*position).cloned())
            .collect(),
    )
}

fn sort(rows: &mut [Row], position: usize, order: &OrderByClause) {
    rows.sort_by(|a, b| {
        let ord = a.get(position).cmp(&b.get(position));
        match order.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}
