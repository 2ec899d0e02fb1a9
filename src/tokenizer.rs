use crate::error::{DbError, Result};

/// Represents the smallest meaningful units (atoms) of the SQL language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    // --- SQL Keywords ---
    Create,
    Table,
    Index,
    On,
    Drop,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    And,
    Or,
    Like,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Offset,
    Update,
    Set,
    Delete,
    Show,
    Tables,

    // --- Data Types ---
    /// `INT` or `INTEGER`
    Int,
    /// `TEXT` or `STRING`
    Text,

    // --- Identifiers & Literals ---
    /// A name representing a table, a column or an index (e.g., `users`, `id`).
    Ident(String),
    /// A 64-bit integer literal, optionally negative (e.g., `42`, `-7`).
    Number(i64),
    /// A string literal between single or double quotes (e.g., `'Alice'`).
    String(String),

    // --- Symbols ---
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    /// Wildcard `*`
    Star,
    Equal,
    /// `!=` or `<>`
    NotEqual,
    Greater,
    GreaterEqual,
    Lower,
    LowerEqual,

    // --- Special ---
    /// Represents the End Of File/Input.
    Eof,
}

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
///
/// `--` starts a comment that runs to the end of the line.
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending with
    /// [Token::Eof].
    ///
    /// # Errors
    /// Returns [DbError::Parse] on an unsupported character, an unterminated
    /// string or an integer literal that does not fit in 64 bits.
    ///
    /// # Example
    /// ```
    /// # use rowdb::tokenizer::{Tokenizer, Token};
    /// let mut t = Tokenizer::new("SELECT *");
    /// let tokens = t.tokenize().unwrap();
    /// assert_eq!(tokens[0], Token::Select);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                break;
            }
            tokens.push(self.next_token()?);
        }

        tokens.push(Token::Eof);
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token> {
        let ch = self.current_char();

        let token = match ch {
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '*' => Token::Star,
            '=' => Token::Equal,
            '!' if self.peek() == Some('=') => {
                self.advance();
                Token::NotEqual
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    Token::LowerEqual
                }
                Some('>') => {
                    self.advance();
                    Token::NotEqual
                }
                _ => Token::Lower,
            },
            '>' if self.peek() == Some('=') => {
                self.advance();
                Token::GreaterEqual
            }
            '>' => Token::Greater,
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => return self.read_number(),
            c if c.is_alphabetic() || c == '_' => return Ok(self.read_identifier()),
            c if c.is_ascii_digit() => return self.read_number(),
            '\'' | '"' => return self.read_string(ch),
            _ => {
                return Err(DbError::Parse(format!(
                    "character {ch:?} at position {} is not supported",
                    self.position
                )));
            }
        };

        self.advance();
        Ok(token)
    }

    // --- Navigation Helpers ---

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            let ch = self.current_char();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '-' && self.peek() == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    // --- Extraction Logic ---

    /// Reads an identifier or a keyword. Keywords are matched case-insensitively.
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while !self.is_at_end()
            && (self.current_char().is_alphanumeric() || self.current_char() == '_')
        {
            ident.push(self.current_char());
            self.advance();
        }

        match ident.to_uppercase().as_str() {
            "CREATE" => Token::Create,
            "TABLE" => Token::Table,
            "INDEX" => Token::Index,
            "ON" => Token::On,
            "DROP" => Token::Drop,
            "INSERT" => Token::Insert,
            "INTO" => Token::Into,
            "VALUES" => Token::Values,
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "AND" => Token::And,
            "OR" => Token::Or,
            "LIKE" => Token::Like,
            "ORDER" => Token::Order,
            "BY" => Token::By,
            "ASC" => Token::Asc,
            "DESC" => Token::Desc,
            "LIMIT" => Token::Limit,
            "OFFSET" => Token::Offset,
            "UPDATE" => Token::Update,
            "SET" => Token::Set,
            "DELETE" => Token::Delete,
            "SHOW" => Token::Show,
            "TABLES" => Token::Tables,
            "INT" | "INTEGER" => Token::Int,
            "TEXT" | "STRING" => Token::Text,
            _ => Token::Ident(ident),
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let mut number = String::new();
        if self.current_char() == '-' {
            number.push('-');
            self.advance();
        }

        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            number.push(self.current_char());
            self.advance();
        }

        number
            .parse::<i64>()
            .map(Token::Number)
            .map_err(|e| DbError::Parse(format!("invalid integer {number:?}: {e}")))
    }

    /// Reads a string literal closed by the same quote character that opened it.
    fn read_string(&mut self, quote: char) -> Result<Token> {
        self.advance(); // opening quote

        let mut string = String::new();
        while !self.is_at_end() && self.current_char() != quote {
            string.push(self.current_char());
            self.advance();
        }

        if self.is_at_end() {
            return Err(DbError::Parse("unterminated string".into()));
        }
        self.advance(); // closing quote

        Ok(Token::String(string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(sql: &str) -> Vec<Token> {
        Tokenizer::new(sql).tokenize().unwrap()
    }

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(
            tokenize("CREATE TABLE users"),
            vec![
                Token::Create,
                Token::Table,
                Token::Ident("users".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_create_table() {
        assert_eq!(
            tokenize("create table names (id integer, value string)"),
            vec![
                Token::Create,
                Token::Table,
                Token::Ident("names".into()),
                Token::LeftParen,
                Token::Ident("id".into()),
                Token::Int,
                Token::Comma,
                Token::Ident("value".into()),
                Token::Text,
                Token::RightParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(
            tokenize("42, -7, 0"),
            vec![
                Token::Number(42),
                Token::Comma,
                Token::Number(-7),
                Token::Comma,
                Token::Number(0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_number_overflow() {
        let result = Tokenizer::new("99999999999999999999").tokenize();

        assert!(matches!(result, Err(DbError::Parse(_))));
    }

    #[test]
    fn test_tokenize_strings() {
        assert_eq!(
            tokenize(r#"'Alice', "Bob Dylan", '', "it's""#),
            vec![
                Token::String("Alice".into()),
                Token::Comma,
                Token::String("Bob Dylan".into()),
                Token::Comma,
                Token::String(String::new()),
                Token::Comma,
                Token::String("it's".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let result = Tokenizer::new("'hello").tokenize();

        assert!(matches!(result, Err(DbError::Parse(_))));
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            tokenize("= != <> < <= > >="),
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::NotEqual,
                Token::Lower,
                Token::LowerEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let sql = "-- the whole line\nSELECT * -- trailing\nFROM t;";

        assert_eq!(
            tokenize(sql),
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Ident("t".into()),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unsupported_character() {
        assert!(matches!(
            Tokenizer::new("SELECT # FROM t").tokenize(),
            Err(DbError::Parse(_))
        ));
        assert!(matches!(
            Tokenizer::new("a ! b").tokenize(),
            Err(DbError::Parse(_))
        ));
    }
}
