pub mod ast;
pub mod binary_tree;
pub mod condition;
pub mod cursor;
pub mod data_type;
pub mod database;
pub mod error;
pub mod executor;
pub mod index;
pub mod parser;
pub mod schema;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use ast::Statement;
pub use binary_tree::{BinaryTree, NodeHandle};
pub use condition::{Condition, Matcher, Operator};
pub use cursor::TableCursor;
pub use data_type::DataType;
pub use database::Database;
pub use error::{DbError, ErrorKind, Result};
pub use executor::Executor;
pub use index::{Bucket, Index};
pub use schema::{ColumnDef, Row, Schema};
pub use table::Table;
pub use value::Value;
