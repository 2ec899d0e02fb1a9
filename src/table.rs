use std::collections::HashMap;

use allocative::Allocative;
use bitvec::prelude::*;
use tracing::{debug, trace};

use crate::condition::{Condition, Operator};
use crate::cursor::TableCursor;
use crate::error::{DbError, Result};
use crate::index::{Bucket, Index};
use crate::schema::{Row, Schema};
use crate::value::Value;

/// Offset-addressed row store.
///
/// A row keeps the offset it was inserted at for its whole life. Deleting a row
/// leaves a tombstone in its slot; slots are never reused or compacted. Every
/// mutation keeps the table's indexes in step with the rows.
///
/// The table does not type-check rows: callers validate arity and types against
/// the schema before mutating (see [crate::Executor]).
#[derive(Debug, Allocative)]
pub struct Table {
    name: String,
    schema: Schema,
    rows: Vec<Option<Row>>,
    /// A set bit marks the slot at that offset as deleted.
    #[allocative(skip)]
    tombstones: BitVec,
    indexes: HashMap<String, Index>,
    /// Column name to the name of the index maintained on it.
    indexed_columns: HashMap<String, String>,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
            tombstones: bitvec!(),
            indexes: HashMap::new(),
            indexed_columns: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Number of slots ever allocated, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of live rows.
    pub fn live_count(&self) -> usize {
        self.tombstones.count_zeros()
    }

    /// Returns the row at `offset`, or `None` if it is out of range or deleted.
    pub fn get(&self, offset: usize) -> Option<&Row> {
        self.rows.get(offset).and_then(Option::as_ref)
    }

    /// Appends `row` and returns its offset.
    pub fn insert(&mut self, row: Row) -> usize {
        let offset = self.rows.len();

        for (column, value) in self.schema.names().zip(row.values()) {
            if let Some(index) = index_on(&mut self.indexes, &self.indexed_columns, column) {
                index.add(value.clone(), offset);
            }
        }

        self.rows.push(Some(row));
        self.tombstones.push(false);
        trace!(table = %self.name, offset, "row inserted");
        offset
    }

    /// Overwrites columns of the row at `offset` in place. The row keeps its offset.
    ///
    /// # Errors
    /// Returns [DbError::Consistency] if `offset` is deleted or out of range, and
    /// [DbError::Schema] if a position is past the schema's arity.
    pub fn update(&mut self, offset: usize, changes: &[(usize, Value)]) -> Result<()> {
        let row = self
            .rows
            .get_mut(offset)
            .and_then(Option::as_mut)
            .ok_or_else(|| {
                DbError::Consistency(format!("row with offset {offset} has been deleted"))
            })?;

        for (position, new) in changes {
            let column = self
                .schema
                .column(*position)
                .ok_or_else(|| DbError::Schema(format!("no column at position {position}")))?;
            let Some(old) = row.set(*position, new.clone()) else {
                return Err(DbError::Consistency(format!(
                    "row with offset {offset} has no value at position {position}"
                )));
            };

            if let Some(index) = index_on(&mut self.indexes, &self.indexed_columns, &column.name) {
                index.remove(&old, offset);
                index.add(new.clone(), offset);
            }
        }

        trace!(table = %self.name, offset, "row updated");
        Ok(())
    }

    /// Retires the row at `offset`. The offset is never handed out again.
    ///
    /// # Errors
    /// Returns [DbError::Consistency] if `offset` is already deleted or out of range.
    pub fn delete(&mut self, offset: usize) -> Result<()> {
        let row = self
            .rows
            .get_mut(offset)
            .and_then(Option::take)
            .ok_or_else(|| {
                DbError::Consistency(format!("row with offset {offset} has been deleted"))
            })?;

        for (column, value) in self.schema.names().zip(row.values()) {
            if let Some(index) = index_on(&mut self.indexes, &self.indexed_columns, column) {
                index.remove(value, offset);
            }
        }

        self.tombstones.set(offset, true);
        trace!(table = %self.name, offset, "row deleted");
        Ok(())
    }

    /// Returns a cursor over the currently live offsets, in ascending order.
    pub fn cursor(&self) -> TableCursor {
        TableCursor::new(0, self.rows.len(), self.tombstones.clone())
    }

    /// Builds the index `name` on `column` from every live row.
    ///
    /// Indexing a column that already has an index points the column at the new
    /// one; the previous index stays listed but is no longer maintained.
    ///
    /// # Errors
    /// Returns [DbError::Schema] if `name` is taken or `column` does not exist.
    pub fn create_index(&mut self, name: &str, column: &str) -> Result<()> {
        if self.indexes.contains_key(name) {
            return Err(DbError::Schema(format!(
                "index {name:?} already exists on table {:?}",
                self.name
            )));
        }
        let position = self.schema.require(column)?;
        let data_type = self.schema.columns()[position].data_type;

        let mut index = Index::new(column, data_type);
        index.fill(self.rows.iter().enumerate().filter_map(|(offset, row)| {
            row.as_ref()
                .and_then(|row| row.get(position))
                .map(|value| (offset, value.clone()))
        }));

        debug!(
            table = %self.name,
            index = name,
            column,
            values = index.len(),
            height = index.height(),
            superseded = self.index_for(column),
            "index created"
        );
        self.indexes.insert(name.to_string(), index);
        self.indexed_columns
            .insert(column.to_string(), name.to_string());
        Ok(())
    }

    /// Resolves `condition`'s own predicate through the index on `column`.
    ///
    /// Returns `Ok(None)` when the column has no index or the operator cannot be
    /// served by one (`LIKE`); the caller then scans.
    pub fn index(&self, column: &str, condition: &Condition) -> Result<Option<Bucket>> {
        if condition.operator == Operator::Like {
            return Ok(None);
        }
        let Some(index) = self
            .indexed_columns
            .get(column)
            .and_then(|name| self.indexes.get(name))
        else {
            return Ok(None);
        };

        if condition.value.data_type() != index.data_type() {
            return Err(DbError::TypeMismatch(format!(
                "index on {column:?} holds {:?} values, got {:?}",
                index.data_type(),
                condition.value
            )));
        }
        index.cursor(condition).map(Some)
    }

    /// Names of the table's indexes, sorted.
    pub fn index_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.indexes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Name of the index currently maintained on `column`, if any.
    pub fn index_for(&self, column: &str) -> Option<&str> {
        self.indexed_columns.get(column).map(String::as_str)
    }

    /// Heap bytes held by the table: rows, tombstoned slots and indexes.
    pub fn allocated_bytes(&self) -> usize {
        allocative::size_of_unique_allocated_data(self)
    }
}

fn index_on<'a>(
    indexes: &'a mut HashMap<String, Index>,
    indexed_columns: &HashMap<String, String>,
    column: &str,
) -> Option<&'a mut Index> {
    indexed_columns
        .get(column)
        .and_then(|name| indexes.get_mut(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::schema::ColumnDef;

    fn names_table() -> Table {
        let schema = Schema::new(vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("value", DataType::Text),
        ])
        .unwrap();
        Table::new("names", schema)
    }

    fn row(id: i64, value: &str) -> Row {
        Row::new(vec![Value::Int(id), Value::from(value)])
    }

    fn id_eq(id: i64) -> Condition {
        Condition::new("id", Operator::Eq, Value::Int(id))
    }

    #[test]
    fn test_insert_and_get() {
        let mut table = names_table();

        assert_eq!(table.insert(row(1, "John")), 0);
        assert_eq!(table.insert(row(2, "Jane")), 1);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some(&row(1, "John")));
        assert_eq!(table.get(1), Some(&row(2, "Jane")));
        assert_eq!(table.get(2), None);
    }

    #[test]
    fn test_cursor() {
        let mut table = names_table();
        table.insert(row(1, "a"));
        table.insert(row(2, "b"));
        table.insert(row(3, "c"));

        let mut cursor = table.cursor();

        assert!(!cursor.end());
        assert_eq!(cursor.advance(), Ok(0));
        assert!(!cursor.end());
        assert_eq!(cursor.advance(), Ok(1));
        assert!(!cursor.end());
        assert_eq!(cursor.advance(), Ok(2));
        assert!(cursor.end());
    }

    #[test]
    fn test_cursor_with_deleted() {
        let mut table = names_table();
        table.insert(row(1, "a"));
        table.insert(row(2, "b"));
        table.insert(row(3, "c"));

        table.delete(0).unwrap();

        assert_eq!(table.cursor().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn test_cursor_with_all_deleted() {
        let mut table = names_table();
        table.insert(row(1, "a"));
        table.insert(row(2, "b"));

        table.delete(0).unwrap();
        table.delete(1).unwrap();

        assert!(table.cursor().end());
    }

    #[test]
    fn test_delete_retires_offset() {
        let mut table = names_table();
        table.insert(row(1, "a"));
        table.delete(0).unwrap();

        assert_eq!(table.get(0), None);
        assert!(matches!(table.delete(0), Err(DbError::Consistency(_))));
        // The next insert gets a fresh offset
        assert_eq!(table.insert(row(2, "b")), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_update_in_place() {
        let mut table = names_table();
        table.insert(row(1, "John"));

        table
            .update(0, &[(0, Value::Int(4)), (1, Value::from("Johnny"))])
            .unwrap();

        assert_eq!(table.get(0), Some(&row(4, "Johnny")));
        assert!(matches!(
            table.update(7, &[(0, Value::Int(1))]),
            Err(DbError::Consistency(_))
        ));
    }

    #[test]
    fn test_create_index_skips_tombstones() {
        let mut table = names_table();
        table.insert(row(1, "a"));
        table.insert(row(2, "b"));
        table.insert(row(1, "c"));
        table.delete(1).unwrap();

        table.create_index("by_id", "id").unwrap();

        assert_eq!(
            table.index("id", &id_eq(1)).unwrap(),
            Some(Bucket::from([0, 2]))
        );
        assert_eq!(table.index("id", &id_eq(2)).unwrap(), Some(Bucket::new()));
    }

    #[test]
    fn test_create_index_errors() {
        let mut table = names_table();
        table.create_index("by_id", "id").unwrap();

        assert!(matches!(
            table.create_index("by_id", "value"),
            Err(DbError::Schema(_))
        ));
        assert!(matches!(
            table.create_index("by_age", "age"),
            Err(DbError::Schema(_))
        ));
        assert_eq!(table.index_names(), vec!["by_id"]);
    }

    #[test]
    fn test_index_follows_mutations() {
        let mut table = names_table();
        table.create_index("by_id", "id").unwrap();
        table.insert(row(1, "John"));
        table.insert(row(2, "Jane"));

        table.update(0, &[(0, Value::Int(4))]).unwrap();
        assert_eq!(table.index("id", &id_eq(1)).unwrap(), Some(Bucket::new()));
        assert_eq!(
            table.index("id", &id_eq(4)).unwrap(),
            Some(Bucket::from([0]))
        );

        table.delete(1).unwrap();
        assert_eq!(table.index("id", &id_eq(2)).unwrap(), Some(Bucket::new()));
    }

    #[test]
    fn test_index_unavailable() {
        let mut table = names_table();
        table.create_index("by_value", "value").unwrap();

        // No index on id
        assert_eq!(table.index("id", &id_eq(1)).unwrap(), None);
        // LIKE always falls back to a scan
        let like = Condition::new("value", Operator::Like, Value::from("J%"));
        assert_eq!(table.index("value", &like).unwrap(), None);
    }

    #[test]
    fn test_reindex_column_last_write_wins() {
        let mut table = names_table();
        table.create_index("first", "id").unwrap();
        table.create_index("second", "id").unwrap();

        assert_eq!(table.index_for("id"), Some("second"));
        assert_eq!(table.index_names(), vec!["first", "second"]);
    }

    #[test]
    fn test_allocated_bytes_keep_tombstoned_slots() {
        let mut table = names_table();
        let empty = table.allocated_bytes();
        for i in 0..32 {
            table.insert(row(i, "some longer text value"));
        }
        assert!(table.allocated_bytes() > empty);

        for offset in 0..32 {
            table.delete(offset).unwrap();
        }

        // Row contents are freed, the slots themselves are not
        assert!(table.allocated_bytes() >= 32 * std::mem::size_of::<Option<Row>>());
        assert_eq!(table.len(), 32);
        assert_eq!(table.live_count(), 0);
    }
}
