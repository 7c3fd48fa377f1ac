//! Filter queries of the form `SELECT * FROM <table> [WHERE <conditions>]`.
//!
//! Conditions compare a feature attribute with a literal: `name = 'Oslo'`, `pop_max >= 1000000`.
//! They are joined with `AND` and `OR`, `AND` binding tighter. Keywords are case-insensitive,
//! string literals use single quotes with `''` as an escaped quote.

use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map as JsonMap, Value};

use super::SourceError;

lazy_static! {
    static ref SELECT: Regex =
        Regex::new(r"(?is)^\s*select\s+\*\s+from\s+([A-Za-z0-9_.\-]+)(?:\s+where\s+(.*?))?\s*;?\s*$")
            .expect("valid regex");
    static ref CONDITION: Regex = Regex::new(
        r#"^\s*([A-Za-z_][A-Za-z0-9_]*|"[^"]+")\s*(=|!=|<>|<=|>=|<|>)\s*('(?:[^']|'')*'|[-+]?\d+(?:\.\d*)?(?:[eE][-+]?\d+)?)"#
    )
    .expect("valid regex");
    static ref CONNECTOR: Regex = Regex::new(r"(?i)^\s+(and|or)\s+").expect("valid regex");
}

/// Comparison operator of a condition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// `=`
    Equal,
    /// `!=` or `<>`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

impl Comparison {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => Self::Equal,
            "!=" | "<>" => Self::NotEqual,
            "<" => Self::Less,
            "<=" => Self::LessOrEqual,
            ">" => Self::Greater,
            ">=" => Self::GreaterOrEqual,
            _ => return None,
        })
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Equal => ordering == Ordering::Equal,
            Self::NotEqual => ordering != Ordering::Equal,
            Self::Less => ordering == Ordering::Less,
            Self::LessOrEqual => ordering != Ordering::Greater,
            Self::Greater => ordering == Ordering::Greater,
            Self::GreaterOrEqual => ordering != Ordering::Less,
        }
    }
}

/// Literal value of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Quoted string.
    Text(String),
    /// Number.
    Number(f64),
}

/// A single `<field> <op> <literal>` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Attribute name.
    pub field: String,
    /// Operator.
    pub comparison: Comparison,
    /// Value the attribute is compared with.
    pub literal: Literal,
}

impl Condition {
    /// Evaluates the condition against feature attributes. A missing or null attribute never
    /// matches.
    pub fn matches(&self, properties: &JsonMap<String, Value>) -> bool {
        let Some(value) = properties.get(&self.field) else {
            return false;
        };

        let ordering = match (&self.literal, value) {
            (Literal::Number(expected), Value::Number(actual)) => {
                actual.as_f64().and_then(|actual| actual.partial_cmp(expected))
            }
            (Literal::Number(expected), Value::String(actual)) => actual
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|actual| actual.partial_cmp(expected)),
            (Literal::Text(expected), Value::String(actual)) => Some(actual.as_str().cmp(expected)),
            (Literal::Text(expected), Value::Number(actual)) => {
                Some(actual.to_string().as_str().cmp(expected))
            }
            (Literal::Text(expected), Value::Bool(actual)) => {
                Some(actual.to_string().as_str().cmp(expected))
            }
            _ => None,
        };

        ordering.is_some_and(|ordering| self.comparison.accepts(ordering))
    }
}

/// Parsed filter query.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    table: String,
    /// Alternatives joined with `OR`, each a list of conditions joined with `AND`.
    clauses: Vec<Vec<Condition>>,
}

impl Filter {
    /// Parses a query.
    pub fn parse(query: &str) -> Result<Self, SourceError> {
        let captures = SELECT
            .captures(query)
            .ok_or_else(|| SourceError::query(query, "expected SELECT * FROM <table>"))?;

        let table = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let clauses = match captures.get(2) {
            Some(conditions) => parse_conditions(query, conditions.as_str())?,
            None => vec![],
        };

        Ok(Self { table, clauses })
    }

    /// Name of the table the query selects from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns true if the query has no `WHERE` clause.
    pub fn selects_all(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the `WHERE` clause against feature attributes.
    pub fn matches(&self, properties: &JsonMap<String, Value>) -> bool {
        self.clauses.is_empty()
            || self
                .clauses
                .iter()
                .any(|clause| clause.iter().all(|condition| condition.matches(properties)))
    }
}

fn parse_conditions(query: &str, mut input: &str) -> Result<Vec<Vec<Condition>>, SourceError> {
    let mut clauses = vec![];
    let mut current = vec![];

    loop {
        let captures = CONDITION.captures(input).ok_or_else(|| {
            SourceError::query(query, format!("cannot parse condition at '{}'", input.trim()))
        })?;

        let (Some(whole), Some(field), Some(operator), Some(literal)) = (
            captures.get(0),
            captures.get(1),
            captures.get(2),
            captures.get(3),
        ) else {
            return Err(SourceError::query(query, "incomplete condition"));
        };

        let comparison = Comparison::from_token(operator.as_str())
            .ok_or_else(|| SourceError::query(query, "unknown operator"))?;
        current.push(Condition {
            field: field.as_str().trim_matches('"').to_string(),
            comparison,
            literal: parse_literal(query, literal.as_str())?,
        });

        input = &input[whole.end()..];
        if input.trim().is_empty() {
            break;
        }

        let connector = CONNECTOR.captures(input).ok_or_else(|| {
            SourceError::query(query, format!("expected AND or OR at '{}'", input.trim()))
        })?;
        let (Some(whole), Some(keyword)) = (connector.get(0), connector.get(1)) else {
            return Err(SourceError::query(query, "incomplete connector"));
        };

        if keyword.as_str().eq_ignore_ascii_case("or") {
            clauses.push(std::mem::take(&mut current));
        }
        input = &input[whole.end()..];
    }

    clauses.push(current);
    Ok(clauses)
}

fn parse_literal(query: &str, literal: &str) -> Result<Literal, SourceError> {
    if let Some(text) = literal
        .strip_prefix('\'')
        .and_then(|text| text.strip_suffix('\''))
    {
        return Ok(Literal::Text(text.replace("''", "'")));
    }

    literal
        .parse::<f64>()
        .map(Literal::Number)
        .map_err(|_| SourceError::query(query, format!("invalid number '{literal}'")))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn properties(value: Value) -> JsonMap<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn select_all() {
        let filter = Filter::parse("SELECT * from ne_10m_admin_0_countries").unwrap();
        assert_eq!(filter.table(), "ne_10m_admin_0_countries");
        assert!(filter.selects_all());
        assert!(filter.matches(&properties(json!({}))));
    }

    #[test]
    fn where_clause() {
        let filter =
            Filter::parse("select * FROM countries where SOV_A3 = 'US1' and pop >= 1e6;").unwrap();
        assert_eq!(filter.table(), "countries");

        assert!(filter.matches(&properties(json!({"SOV_A3": "US1", "pop": 3.0e8}))));
        assert!(!filter.matches(&properties(json!({"SOV_A3": "US1", "pop": 10}))));
        assert!(!filter.matches(&properties(json!({"SOV_A3": "CAN", "pop": 3.0e8}))));
        assert!(!filter.matches(&properties(json!({"pop": 3.0e8}))));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let filter =
            Filter::parse("SELECT * FROM t WHERE a = 1 OR b = 'x' AND c <> 'it''s'").unwrap();

        assert!(filter.matches(&properties(json!({"a": 1}))));
        assert!(filter.matches(&properties(json!({"b": "x", "c": "y"}))));
        assert!(!filter.matches(&properties(json!({"b": "x", "c": "it's"}))));
        assert!(!filter.matches(&properties(json!({"a": 2, "b": "y"}))));
    }

    #[test]
    fn numeric_text_attributes() {
        let filter = Filter::parse("SELECT * FROM t WHERE rank < 3").unwrap();
        assert!(filter.matches(&properties(json!({"rank": "2"}))));
        assert!(!filter.matches(&properties(json!({"rank": "high"}))));
        assert!(!filter.matches(&properties(json!({"rank": null}))));
    }

    #[test]
    fn malformed_queries() {
        for query in [
            "",
            "DELETE FROM t",
            "SELECT name FROM t",
            "SELECT * FROM t WHERE",
            "SELECT * FROM t WHERE a ~ 1",
            "SELECT * FROM t WHERE a = 1 b = 2",
            "SELECT * FROM t WHERE a = 'open",
        ] {
            assert_matches!(Filter::parse(query), Err(SourceError::Query { .. }), "{query}");
        }
    }
}
