use std::collections::HashSet;

use allocative::Allocative;

use crate::data_type::DataType;
use crate::error::{DbError, Result};
use crate::value::Value;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column metadata of a table. Column names are unique.
#[derive(Debug, Clone, PartialEq, Allocative)]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl Schema {
    /// Builds a schema from its column definitions.
    ///
    /// # Errors
    /// Returns [DbError::Schema] if the list is empty or a column name repeats.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        if columns.is_empty() {
            return Err(DbError::Schema("a table needs at least one column".into()));
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DbError::Schema(format!(
                    "column {:?} is defined twice",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the column named `name`, if any.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Same as [Schema::position], but reports an unknown column as an error.
    pub fn require(&self, name: &str) -> Result<usize> {
        self.position(name)
            .ok_or_else(|| DbError::Schema(format!("column {name:?} does not exist")))
    }

    pub fn column(&self, position: usize) -> Option<&ColumnDef> {
        self.columns.get(position)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// A fixed-arity tuple of values, laid out in schema order.
///
/// Identity is positional: two rows holding equal values are still different rows
/// when they live at different offsets.
#[derive(Debug, Clone, PartialEq, Eq, Allocative)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Overwrites the value at `position` and hands back the previous one.
    ///
    /// Returns `None` (and changes nothing) if `position` is past the row's arity.
    pub fn set(&mut self, position: usize, value: Value) -> Option<Value> {
        self.values
            .get_mut(position)
            .map(|slot| std::mem::replace(slot, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
