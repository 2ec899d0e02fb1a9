use crate::{ColumnDef, Condition, Row, Value};

/// The closed set of statements the engine executes.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    DropTable(DropTable),
    CreateIndex(CreateIndex),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
    ShowTables,
    ShowIndex(ShowIndex),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub row: Row,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnsSelect {
    Star,
    ColumnsNames(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: SortDirection,
}

/// `limit` and `offset` are signed so that a negative request reaches the
/// executor and is rejected there.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub columns: ColumnsSelect,
    pub condition: Option<Condition>,
    pub order_by: Option<OrderByClause>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Select {
    /// `SELECT * FROM table`, to be narrowed with struct update syntax.
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: ColumnsSelect::Star,
            condition: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShowIndex {
    pub table: String,
}
