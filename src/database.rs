use std::collections::HashMap;

use tracing::debug;

use crate::ast::Statement;
use crate::error::{DbError, Result};
use crate::executor::Executor;
use crate::parser::Parser;
use crate::schema::{Row, Schema};
use crate::table::Table;
use crate::value::Value;

/// The main entry point for the in-memory database engine.
/// It manages a collection of tables and orchestrates statement execution.
#[derive(Debug, Default)]
pub struct Database {
    /// A map of table names to their respective [Table] structures.
    tables: HashMap<String, Table>,
    executor: Executor,
}

impl Database {
    /// Creates a new, empty database instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new table in the database.
    ///
    /// # Errors
    /// Returns [DbError::Schema] if a table with the same name already exists.
    pub fn create_table(&mut self, name: String, schema: Schema) -> Result<()> {
        if self.tables.contains_key(&name) {
            return Err(DbError::Schema(format!("table {name:?} already exists")));
        }

        debug!(table = %name, columns = schema.len(), "table created");
        let table = Table::new(name.clone(), schema);
        self.tables.insert(name, table);
        Ok(())
    }

    /// Removes a table and all of its indexes.
    ///
    /// # Errors
    /// Returns [DbError::Schema] if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        match self.tables.remove(name) {
            Some(_) => {
                debug!(table = name, "table dropped");
                Ok(())
            }
            None => Err(DbError::Schema(format!("table {name:?} does not exist"))),
        }
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Parses and runs a single statement.
    ///
    /// # Example
    /// ```
    /// use rowdb::{Database, Value};
    /// let mut db = Database::new();
    /// db.execute("CREATE TABLE users (id INT)").unwrap();
    /// db.execute("INSERT INTO users VALUES (1)").unwrap();
    /// db.execute("DELETE FROM users WHERE id > 12").unwrap();
    ///
    /// let rows = db.execute("SELECT * FROM users").unwrap();
    /// assert_eq!(rows[0].get(0), Some(&Value::Int(1)));
    /// ```
    pub fn execute(&mut self, sql: &str) -> Result<Vec<Row>> {
        let statement = Parser::from_sql(sql)?.parse()?;
        self.run(statement)
    }

    /// Runs every `;`-separated statement of `sql` in order and returns one
    /// result list per statement.
    ///
    /// Parsing happens up front, so a syntax error anywhere runs nothing.
    /// Execution stops at the first failing statement; the ones before it stay
    /// applied.
    pub fn script(&mut self, sql: &str) -> Result<Vec<Vec<Row>>> {
        let statements = Parser::from_sql(sql)?.parse_script()?;
        statements
            .into_iter()
            .map(|statement| self.run(statement))
            .collect()
    }

    /// Executes an already parsed statement.
    ///
    /// DDL and DML return no rows; `SELECT` and the `SHOW` variants return
    /// their result rows.
    pub fn run(&mut self, statement: Statement) -> Result<Vec<Row>> {
        match statement {
            Statement::CreateTable(create) => {
                let schema = Schema::new(create.columns)?;
                self.create_table(create.name, schema)?;
                Ok(Vec::new())
            }
            Statement::DropTable(drop) => {
                self.drop_table(&drop.name)?;
                Ok(Vec::new())
            }
            Statement::CreateIndex(create) => {
                self.table_mut(&create.table)?
                    .create_index(&create.name, &create.column)?;
                Ok(Vec::new())
            }
            Statement::Insert(insert) => {
                let executor = self.executor;
                executor.insert(self.table_mut(&insert.table)?, insert.row)?;
                Ok(Vec::new())
            }
            Statement::Select(select) => {
                let table = self.table(&select.table)?;
                self.executor.select(table, &select)
            }
            Statement::Update(update) => {
                let executor = self.executor;
                executor.update(
                    self.table_mut(&update.table)?,
                    &update.assignments,
                    update.condition.as_ref(),
                )?;
                Ok(Vec::new())
            }
            Statement::Delete(delete) => {
                let executor = self.executor;
                executor.delete(self.table_mut(&delete.table)?, delete.condition.as_ref())?;
                Ok(Vec::new())
            }
            Statement::ShowTables => Ok(text_rows(self.list_tables())),
            Statement::ShowIndex(show) => Ok(text_rows(self.table(&show.table)?.index_names())),
        }
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.get_table(name)
            .ok_or_else(|| DbError::Schema(format!("table {name:?} does not exist")))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.get_table_mut(name)
            .ok_or_else(|| DbError::Schema(format!("table {name:?} does not exist")))
    }
}

/// One single-column row per name.
fn text_rows(names: Vec<&str>) -> Vec<Row> {
    names
        .into_iter()
        .map(|name| Row::new(vec![Value::from(name)]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::DataType;
    use crate::error::ErrorKind;
    use crate::schema::ColumnDef;

    fn simple_schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("name", DataType::Text),
        ])
        .unwrap()
    }

    fn row(id: i64, name: &str) -> Row {
        Row::new(vec![Value::Int(id), Value::from(name)])
    }

    fn users() -> Database {
        let mut db = Database::new();
        db.script(
            "CREATE TABLE users (id INT, name TEXT);
             INSERT INTO users VALUES (1, 'Alice');
             INSERT INTO users VALUES (2, 'Bob');
             INSERT INTO users VALUES (3, 'Charlie');",
        )
        .unwrap();
        db
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut db = Database::new();

        assert!(db.create_table("users".to_string(), simple_schema()).is_ok());
        assert!(db.get_table("users").is_some());

        assert!(db.drop_table("users").is_ok());
        assert!(db.get_table("users").is_none());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut db = Database::new();

        db.create_table("users".to_string(), simple_schema()).unwrap();
        let err = db
            .create_table("users".to_string(), simple_schema())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut db = Database::new();

        let err = db.drop_table("unknown").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_list_tables_sorted() {
        let mut db = Database::new();

        db.create_table("users".to_string(), simple_schema()).unwrap();
        db.create_table("posts".to_string(), simple_schema()).unwrap();

        assert_eq!(db.list_tables(), vec!["posts", "users"]);
    }

    #[test]
    fn test_get_table_mut() {
        let mut db = Database::new();
        db.create_table("users".to_string(), simple_schema()).unwrap();

        {
            let table = db.get_table_mut("users").unwrap();
            table.insert(row(1, "Alice"));
            table.insert(row(2, "Bob"));
        }

        let table = db.get_table("users").unwrap();
        assert_eq!(table.live_count(), 2);
        assert_eq!(table.get(0), Some(&row(1, "Alice")));
        assert_eq!(table.get(1), Some(&row(2, "Bob")));
    }

    #[test]
    fn test_execute_insert_and_select_star() {
        let db = &mut users();

        let rows = db.execute("SELECT * FROM users").unwrap();

        assert_eq!(rows, vec![row(1, "Alice"), row(2, "Bob"), row(3, "Charlie")]);
    }

    #[test]
    fn test_select_with_where_and_index() {
        let mut db = users();
        db.execute("CREATE INDEX by_id ON users (id)").unwrap();

        let rows = db.execute("SELECT name FROM users WHERE id >= 2").unwrap();

        assert_eq!(
            rows,
            vec![
                Row::new(vec![Value::from("Bob")]),
                Row::new(vec![Value::from("Charlie")])
            ]
        );
    }

    #[test]
    fn test_select_order_by_hidden_column() {
        let mut db = users();

        let rows = db
            .execute("SELECT name FROM users ORDER BY id DESC LIMIT 2")
            .unwrap();

        assert_eq!(
            rows,
            vec![
                Row::new(vec![Value::from("Charlie")]),
                Row::new(vec![Value::from("Bob")])
            ]
        );
    }

    #[test]
    fn test_update_and_delete() {
        let mut db = users();

        db.execute("UPDATE users SET name = 'Bobby' WHERE id = 2")
            .unwrap();
        db.execute("DELETE FROM users WHERE name LIKE 'A%'").unwrap();

        let rows = db.execute("SELECT * FROM users").unwrap();
        assert_eq!(rows, vec![row(2, "Bobby"), row(3, "Charlie")]);
    }

    #[test]
    fn test_update_type_mismatch_error() {
        let mut db = users();

        let err = db.execute("UPDATE users SET id = 'two'").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_update_non_existent_column() {
        let mut db = users();

        let err = db.execute("UPDATE users SET age = 3").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_unknown_table() {
        let mut db = Database::new();

        for sql in [
            "SELECT * FROM ghosts",
            "INSERT INTO ghosts VALUES (1)",
            "DELETE FROM ghosts",
            "CREATE INDEX i ON ghosts (id)",
            "SHOW INDEX FROM ghosts",
        ] {
            assert_eq!(db.execute(sql).unwrap_err().kind(), ErrorKind::Schema, "{sql}");
        }
    }

    #[test]
    fn test_show_tables_and_index() {
        let mut db = users();
        db.script(
            "CREATE TABLE audit (id INT);
             CREATE INDEX names ON users (name);
             CREATE INDEX ids ON users (id);",
        )
        .unwrap();

        assert_eq!(
            db.execute("SHOW TABLES").unwrap(),
            vec![
                Row::new(vec![Value::from("audit")]),
                Row::new(vec![Value::from("users")])
            ]
        );
        assert_eq!(
            db.execute("SHOW INDEX FROM users").unwrap(),
            vec![
                Row::new(vec![Value::from("ids")]),
                Row::new(vec![Value::from("names")])
            ]
        );
    }

    #[test]
    fn test_script_stops_at_first_error() {
        let mut db = Database::new();

        let err = db
            .script(
                "CREATE TABLE t (id INT);
                 INSERT INTO t VALUES (1);
                 INSERT INTO t VALUES ('x');
                 INSERT INTO t VALUES (3);",
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(db.execute("SELECT * FROM t").unwrap().len(), 1);
    }

    #[test]
    fn test_script_syntax_error_runs_nothing() {
        let mut db = Database::new();

        let err = db
            .script("CREATE TABLE t (id INT); SELECT FROM t;")
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(db.list_tables().is_empty());
    }

    #[test]
    fn test_create_table_duplicate_columns() {
        let mut db = Database::new();

        let err = db.execute("CREATE TABLE t (id INT, id TEXT)").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(db.get_table("t").is_none());
    }
}
