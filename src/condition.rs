use std::fmt;

use regex::Regex;

use crate::data_type::DataType;
use crate::error::{DbError, Result};
use crate::schema::{Row, Schema};
use crate::value::Value;

/// Comparison operator of a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Wildcard match: `%` is any sequence, `_` is exactly one character.
    Like,
}

impl Operator {
    /// Whether the operator compares by ordering and so needs integer operands.
    pub fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Ge | Self::Lt | Self::Le)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
        };
        f.write_str(symbol)
    }
}

/// A compound predicate: `column operator value`, narrowed by `and` clauses and
/// widened by `or` clauses.
///
/// A node holds for a row when `(own predicate AND every and-clause) OR any
/// or-clause`. The parser builds `a AND b OR c AND d` as `a` with `and = [b]` and
/// `or = [c AND d]`, so AND binds tighter than OR.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
    pub and: Vec<Condition>,
    pub or: Vec<Condition>,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
            and: Vec::new(),
            or: Vec::new(),
        }
    }

    pub fn and(mut self, clause: Condition) -> Self {
        self.and.push(clause);
        self
    }

    pub fn or(mut self, clause: Condition) -> Self {
        self.or.push(clause);
        self
    }

    /// Builds a condition that holds exactly when both `self` and `other` hold.
    ///
    /// `other` joins the and-clauses, and every or-clause is conjoined with it
    /// as well: `(p AND a) OR o` becomes `(p AND a AND other) OR (o AND other)`.
    /// This lets a parenthesised disjunction sit on the left of an `AND`.
    pub fn conjoin(self, other: &Condition) -> Self {
        let Condition {
            column,
            operator,
            value,
            mut and,
            or,
        } = self;
        and.push(other.clone());

        Condition {
            column,
            operator,
            value,
            and,
            or: or.into_iter().map(|clause| clause.conjoin(other)).collect(),
        }
    }

    /// Prepares this node's own predicate for testing column values, compiling
    /// the `LIKE` pattern once.
    ///
    /// # Errors
    /// Returns [DbError::Parse] if the pattern cannot be compiled.
    pub fn matcher(&self) -> Result<Matcher<'_>> {
        let pattern = match (self.operator, self.value.as_str()) {
            (Operator::Like, Some(pattern)) => Some(like_regex(pattern)?),
            _ => None,
        };
        Ok(Matcher {
            condition: self,
            pattern,
        })
    }

    /// Evaluates the whole condition tree against a row.
    pub fn evaluate(&self, row: &Row, schema: &Schema) -> Result<bool> {
        let position = schema.require(&self.column)?;
        let value = row.get(position).ok_or_else(|| {
            DbError::Consistency(format!("row has no value for column {:?}", self.column))
        })?;

        let mut holds = self.matcher()?.test(value);
        for clause in &self.and {
            if !holds {
                break;
            }
            holds = clause.evaluate(row, schema)?;
        }
        if holds {
            return Ok(true);
        }

        for clause in &self.or {
            if clause.evaluate(row, schema)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Checks every node of the tree against `schema`: the column must exist, the
    /// literal must have the column's type, ordering operators need an `Int`
    /// column and `LIKE` needs a `Text` column.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        let position = schema.require(&self.column)?;
        let expected = schema.columns()[position].data_type;

        if self.value.data_type() != expected {
            return Err(DbError::TypeMismatch(format!(
                "column {:?} is {:?} but is compared with {:?}",
                self.column, expected, self.value
            )));
        }
        if self.operator.is_ordering() && expected != DataType::Int {
            return Err(DbError::TypeMismatch(format!(
                "operator {} needs an Int column, {:?} is {:?}",
                self.operator, self.column, expected
            )));
        }
        if self.operator == Operator::Like && expected != DataType::Text {
            return Err(DbError::TypeMismatch(format!(
                "LIKE needs a Text column, {:?} is {:?}",
                self.column, expected
            )));
        }

        self.and
            .iter()
            .chain(&self.or)
            .try_for_each(|clause| clause.validate(schema))
    }
}

/// A condition's own predicate, ready to be tested against many values.
#[derive(Debug)]
pub struct Matcher<'a> {
    condition: &'a Condition,
    pattern: Option<Regex>,
}

impl Matcher<'_> {
    /// Evaluates the predicate against a column value, ignoring the sub-clauses.
    ///
    /// Operands of the wrong variant never match. The executor validates
    /// predicates against the schema first, so that case does not come up there.
    pub fn test(&self, value: &Value) -> bool {
        let condition = self.condition;
        match condition.operator {
            Operator::Eq => *value == condition.value,
            Operator::Ne => *value != condition.value,
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                match (value, &condition.value) {
                    (Value::Int(left), Value::Int(right)) => match condition.operator {
                        Operator::Gt => left > right,
                        Operator::Ge => left >= right,
                        Operator::Lt => left < right,
                        _ => left <= right,
                    },
                    _ => false,
                }
            }
            Operator::Like => match (value.as_str(), &self.pattern) {
                (Some(text), Some(pattern)) => pattern.is_match(text),
                _ => false,
            },
        }
    }
}

/// Compiles a `LIKE` pattern: `%` is any sequence, `_` exactly one character,
/// everything else is literal. The match is a substring search, so `'an'`
/// matches `Jane`.
fn like_regex(pattern: &str) -> Result<Regex> {
    let mut translated = String::new();
    let mut literal = String::new();
    for ch in pattern.chars() {
        match ch {
            '%' | '_' => {
                translated.push_str(&regex::escape(&literal));
                literal.clear();
                translated.push_str(if ch == '%' { "(?s:.*)" } else { "(?s:.)" });
            }
            _ => literal.push(ch),
        }
    }
    translated.push_str(&regex::escape(&literal));

    Regex::new(&translated)
        .map_err(|e| DbError::Parse(format!("invalid LIKE pattern {pattern:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("id", DataType::Int),
            ColumnDef::new("value", DataType::Text),
        ])
        .unwrap()
    }

    fn row(id: i64, value: &str) -> Row {
        Row::new(vec![Value::Int(id), Value::from(value)])
    }

    fn like(pattern: &str, text: &str) -> bool {
        like_regex(pattern).unwrap().is_match(text)
    }

    fn holds(cond: Condition, value: &Value) -> bool {
        cond.matcher().unwrap().test(value)
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("Ja%", "Jane"));
        assert!(like("Ja%", "Ja"));
        assert!(!like("Ja%", "John"));
        assert!(like("J_hn", "John"));
        assert!(!like("J_hn", "Jhn"));
        assert!(like("%an%", "Jane"));
        assert!(like("%", ""));
    }

    #[test]
    fn test_like_matches_substrings() {
        assert!(like("an", "Jane"));
        assert!(like("Ja", "Jane"));
        assert!(like("ne", "Jane"));
        assert!(!like("na", "Jane"));
        assert!(like("a_e", "Jane"));
        assert!(!like("J_e", "Jane"));
    }

    #[test]
    fn test_matcher_reuses_compiled_pattern() {
        let cond = Condition::new("value", Operator::Like, Value::from("J%n"));
        let matcher = cond.matcher().unwrap();

        assert!(matcher.test(&Value::from("John")));
        assert!(matcher.test(&Value::from("Jan")));
        assert!(!matcher.test(&Value::from("Anna")));
        assert!(!matcher.test(&Value::Int(1)));
    }

    #[test]
    fn test_like_escapes_regex_characters() {
        assert!(like("a.c", "a.c"));
        assert!(!like("a.c", "abc"));
        assert!(like("(1+1)*%", "(1+1)*2"));
        assert!(like("[x]$", "[x]$"));
        assert!(!like("^J", "Jane"));
    }

    #[test]
    fn test_compare_operators() {
        let v = Value::Int(5);

        assert!(holds(Condition::new("id", Operator::Eq, Value::Int(5)), &v));
        assert!(holds(Condition::new("id", Operator::Ne, Value::Int(4)), &v));
        assert!(holds(Condition::new("id", Operator::Gt, Value::Int(4)), &v));
        assert!(!holds(Condition::new("id", Operator::Gt, Value::Int(5)), &v));
        assert!(holds(Condition::new("id", Operator::Ge, Value::Int(5)), &v));
        assert!(holds(Condition::new("id", Operator::Lt, Value::Int(6)), &v));
        assert!(holds(Condition::new("id", Operator::Le, Value::Int(5)), &v));
        assert!(!holds(Condition::new("id", Operator::Le, Value::Int(4)), &v));
    }

    #[test]
    fn test_ordering_on_text_never_matches() {
        let cond = Condition::new("value", Operator::Gt, Value::from("a"));

        assert!(!holds(cond, &Value::from("b")));
    }

    #[test]
    fn test_evaluate_and_or() {
        let schema = schema();
        // id > 1 AND value = 'Jane' OR id = 1
        let cond = Condition::new("id", Operator::Gt, Value::Int(1))
            .and(Condition::new("value", Operator::Eq, Value::from("Jane")))
            .or(Condition::new("id", Operator::Eq, Value::Int(1)));

        assert!(cond.evaluate(&row(1, "John"), &schema).unwrap());
        assert!(cond.evaluate(&row(2, "Jane"), &schema).unwrap());
        assert!(!cond.evaluate(&row(3, "John"), &schema).unwrap());
    }

    #[test]
    fn test_and_clause_uses_its_own_column() {
        let schema = schema();
        // id = 2 AND value LIKE 'J%'
        let cond = Condition::new("id", Operator::Eq, Value::Int(2))
            .and(Condition::new("value", Operator::Like, Value::from("J%")));

        assert!(cond.evaluate(&row(2, "Jane"), &schema).unwrap());
        assert!(!cond.evaluate(&row(2, "Anna"), &schema).unwrap());
        assert!(!cond.evaluate(&row(1, "John"), &schema).unwrap());
    }

    #[test]
    fn test_ne_combined_with_and() {
        let schema = schema();
        // id != 1 AND value != 'Jane'
        let cond = Condition::new("id", Operator::Ne, Value::Int(1))
            .and(Condition::new("value", Operator::Ne, Value::from("Jane")));

        assert!(!cond.evaluate(&row(1, "Anna"), &schema).unwrap());
        assert!(!cond.evaluate(&row(2, "Jane"), &schema).unwrap());
        assert!(cond.evaluate(&row(3, "Anna"), &schema).unwrap());
    }

    #[test]
    fn test_conjoin_distributes_over_or() {
        let schema = schema();
        // (id = 1 OR id = 2) AND value = 'Jane'
        let group = Condition::new("id", Operator::Eq, Value::Int(1))
            .or(Condition::new("id", Operator::Eq, Value::Int(2)));
        let cond = group.conjoin(&Condition::new("value", Operator::Eq, Value::from("Jane")));

        assert!(cond.evaluate(&row(2, "Jane"), &schema).unwrap());
        assert!(cond.evaluate(&row(1, "Jane"), &schema).unwrap());
        assert!(!cond.evaluate(&row(1, "John"), &schema).unwrap());
        assert!(!cond.evaluate(&row(3, "Jane"), &schema).unwrap());
    }

    #[test]
    fn test_evaluate_unknown_column() {
        let cond = Condition::new("age", Operator::Eq, Value::Int(1));

        assert!(matches!(
            cond.evaluate(&row(1, "x"), &schema()),
            Err(DbError::Schema(_))
        ));
    }

    #[test]
    fn test_validate() {
        let schema = schema();

        assert!(Condition::new("id", Operator::Lt, Value::Int(1))
            .validate(&schema)
            .is_ok());
        assert!(matches!(
            Condition::new("id", Operator::Eq, Value::from("1")).validate(&schema),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(matches!(
            Condition::new("value", Operator::Gt, Value::from("a")).validate(&schema),
            Err(DbError::TypeMismatch(_))
        ));
        assert!(matches!(
            Condition::new("id", Operator::Like, Value::Int(1)).validate(&schema),
            Err(DbError::TypeMismatch(_))
        ));
        // Nested clauses are checked too
        let nested = Condition::new("id", Operator::Eq, Value::Int(1))
            .or(Condition::new("missing", Operator::Eq, Value::Int(1)));
        assert!(matches!(nested.validate(&schema), Err(DbError::Schema(_))));
    }
}
