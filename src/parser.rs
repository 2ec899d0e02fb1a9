use crate::ast::*;
use crate::condition::{Condition, Operator};
use crate::error::{DbError, Result};
use crate::tokenizer::{Token, Tokenizer};
use crate::{ColumnDef, DataType, Row, Value};

/// Recursive descent parser turning a [Token] stream into [Statement]s.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Tokenizes `sql` and builds a parser over it.
    pub fn from_sql(sql: &str) -> Result<Self> {
        Ok(Self::new(Tokenizer::new(sql).tokenize()?))
    }

    /// Parses exactly one statement, with an optional trailing semicolon.
    pub fn parse(&mut self) -> Result<Statement> {
        let statement = self.parse_statement()?;

        // semicolon is optional after a single statement
        if matches!(self.current_token(), Token::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            return Err(DbError::Parse(format!(
                "unexpected token after statement: {:?}",
                self.current_token()
            )));
        }

        Ok(statement)
    }

    /// Parses a sequence of statements separated by semicolons. Empty statements
    /// are skipped.
    pub fn parse_script(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();

        loop {
            while matches!(self.current_token(), Token::Semicolon) {
                self.advance();
            }
            if self.is_at_end() {
                break;
            }

            statements.push(self.parse_statement()?);

            match self.current_token() {
                Token::Semicolon => self.advance(),
                Token::Eof => break,
                other => {
                    return Err(DbError::Parse(format!(
                        "expected ';' between statements, found {other:?}"
                    )));
                }
            }
        }

        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current_token() {
            Token::Create => self.parse_create(),
            Token::Drop => self.parse_drop_table(),
            Token::Insert => self.parse_insert(),
            Token::Select => self.parse_select(),
            Token::Update => self.parse_update(),
            Token::Delete => self.parse_delete(),
            Token::Show => self.parse_show(),
            other => Err(DbError::Parse(format!("unexpected token: {other:?}"))),
        }
    }

    //helpers
    fn current_token(&self) -> &Token {
        // tokens always end with Eof and `advance` never moves past it
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(DbError::Parse(format!(
                "expected {:?}, found {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    /// Consumes `expected` if it is the current token.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_ident(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Ident(string) => {
                let string = string.clone();
                self.advance();
                Ok(string)
            }
            other => Err(DbError::Parse(format!(
                "expected identifier, found {other:?}"
            ))),
        }
    }

    fn consume_number(&mut self) -> Result<i64> {
        match self.current_token() {
            Token::Number(n) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            other => Err(DbError::Parse(format!("expected number, found {other:?}"))),
        }
    }

    fn consume_value(&mut self) -> Result<Value> {
        let value = match self.current_token() {
            Token::Number(n) => Value::Int(*n),
            Token::String(s) => Value::from(s.as_str()),
            other => {
                return Err(DbError::Parse(format!(
                    "expected a literal, found {other:?}"
                )));
            }
        };
        self.advance();
        Ok(value)
    }

    fn consume_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current_token() {
            Token::Int => DataType::Int,
            Token::Text => DataType::Text,
            other => {
                return Err(DbError::Parse(format!(
                    "current token {other:?} is not a column type"
                )));
            }
        };
        self.advance();
        Ok(data_type)
    }

    /// Parses `item (, item)*` with `item` produced by `parse_item`.
    fn parse_list<T>(
        &mut self,
        mut parse_item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = vec![parse_item(self)?];
        while self.eat(&Token::Comma) {
            items.push(parse_item(self)?);
        }
        Ok(items)
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.consume_ident()?;
        let data_type = self.consume_data_type()?;

        Ok(ColumnDef { name, data_type })
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.consume(Token::Create)?;
        match self.current_token() {
            Token::Table => self.parse_create_table(),
            Token::Index => self.parse_create_index(),
            other => Err(DbError::Parse(format!(
                "expected TABLE or INDEX after CREATE, found {other:?}"
            ))),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.consume(Token::Table)?;
        let name = self.consume_ident()?;
        self.consume(Token::LeftParen)?;
        let columns = self.parse_list(Self::parse_column_def)?;
        self.consume(Token::RightParen)?;

        Ok(Statement::CreateTable(CreateTable { name, columns }))
    }

    fn parse_create_index(&mut self) -> Result<Statement> {
        self.consume(Token::Index)?;
        let name = self.consume_ident()?;
        self.consume(Token::On)?;
        let table = self.consume_ident()?;
        self.consume(Token::LeftParen)?;
        let column = self.consume_ident()?;
        self.consume(Token::RightParen)?;

        Ok(Statement::CreateIndex(CreateIndex {
            name,
            table,
            column,
        }))
    }

    fn parse_drop_table(&mut self) -> Result<Statement> {
        self.consume(Token::Drop)?;
        self.consume(Token::Table)?;
        let name = self.consume_ident()?;

        Ok(Statement::DropTable(DropTable { name }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.consume(Token::Insert)?;
        self.consume(Token::Into)?;
        let table = self.consume_ident()?;
        self.consume(Token::Values)?;
        self.consume(Token::LeftParen)?;
        let values = self.parse_list(Self::consume_value)?;
        self.consume(Token::RightParen)?;

        Ok(Statement::Insert(Insert {
            table,
            row: Row::new(values),
        }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.consume(Token::Select)?;
        let columns = if self.eat(&Token::Star) {
            ColumnsSelect::Star
        } else {
            ColumnsSelect::ColumnsNames(self.parse_list(Self::consume_ident)?)
        };
        self.consume(Token::From)?;
        let table = self.consume_ident()?;
        let condition = self.parse_where()?;

        let order_by = if self.eat(&Token::Order) {
            self.consume(Token::By)?;
            let column = self.consume_ident()?;
            let direction = if self.eat(&Token::Desc) {
                SortDirection::Desc
            } else {
                self.eat(&Token::Asc);
                SortDirection::Asc
            };
            Some(OrderByClause { column, direction })
        } else {
            None
        };

        let limit = if self.eat(&Token::Limit) {
            Some(self.consume_number()?)
        } else {
            None
        };
        let offset = if self.eat(&Token::Offset) {
            Some(self.consume_number()?)
        } else {
            None
        };

        Ok(Statement::Select(Select {
            table,
            columns,
            condition,
            order_by,
            limit,
            offset,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.consume(Token::Update)?;
        let table = self.consume_ident()?;
        self.consume(Token::Set)?;
        let assignments = self.parse_list(|parser| {
            let column = parser.consume_ident()?;
            parser.consume(Token::Equal)?;
            Ok((column, parser.consume_value()?))
        })?;
        let condition = self.parse_where()?;

        Ok(Statement::Update(Update {
            table,
            assignments,
            condition,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.consume(Token::Delete)?;
        self.consume(Token::From)?;
        let table = self.consume_ident()?;
        let condition = self.parse_where()?;

        Ok(Statement::Delete(Delete { table, condition }))
    }

    fn parse_show(&mut self) -> Result<Statement> {
        self.consume(Token::Show)?;
        match self.current_token() {
            Token::Tables => {
                self.advance();
                Ok(Statement::ShowTables)
            }
            Token::Index => {
                self.advance();
                self.consume(Token::From)?;
                let table = self.consume_ident()?;
                Ok(Statement::ShowIndex(ShowIndex { table }))
            }
            other => Err(DbError::Parse(format!(
                "expected TABLES or INDEX after SHOW, found {other:?}"
            ))),
        }
    }

    fn parse_where(&mut self) -> Result<Option<Condition>> {
        if self.eat(&Token::Where) {
            Ok(Some(self.parse_or()?))
        } else {
            Ok(None)
        }
    }

    /// `and_group (OR and_group)*`
    fn parse_or(&mut self) -> Result<Condition> {
        let mut condition = self.parse_and()?;
        while self.eat(&Token::Or) {
            let clause = self.parse_and()?;
            condition.or.push(clause);
        }
        Ok(condition)
    }

    /// `primary (AND primary)*`
    fn parse_and(&mut self) -> Result<Condition> {
        let mut condition = self.parse_primary()?;
        while self.eat(&Token::And) {
            let clause = self.parse_primary()?;
            condition = condition.conjoin(&clause);
        }
        Ok(condition)
    }

    /// A single predicate or a parenthesised condition.
    fn parse_primary(&mut self) -> Result<Condition> {
        if self.eat(&Token::LeftParen) {
            let condition = self.parse_or()?;
            self.consume(Token::RightParen)?;
            return Ok(condition);
        }

        let column = self.consume_ident()?;
        let operator = match self.current_token() {
            Token::Equal => Operator::Eq,
            Token::NotEqual => Operator::Ne,
            Token::Greater => Operator::Gt,
            Token::GreaterEqual => Operator::Ge,
            Token::Lower => Operator::Lt,
            Token::LowerEqual => Operator::Le,
            Token::Like => Operator::Like,
            other => {
                return Err(DbError::Parse(format!(
                    "expected a comparison operator, found {other:?}"
                )));
            }
        };
        self.advance();
        let value = self.consume_value()?;

        Ok(Condition::new(column, operator, value))
    }
}
