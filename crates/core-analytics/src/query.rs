//! Predicate-expression filter over particle-shaped data points.
//!
//! Grammar, deliberately tiny:
//!
//! ```text
//! query  := "where" clause (("and" | "or") clause)*
//! clause := field op number
//! field  := "x" | "y" | "value" | "speed"
//! op     := ">" | "<" | ">=" | "<=" | "=" | "!="
//! ```
//!
//! Combinators evaluate left to right without precedence, matching the
//! historical behavior: `a and b or c` is `(a and b) or c`.

use core_error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    X,
    Y,
    Value,
    Speed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Clause {
    field: Field,
    op: Op,
    number: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
}

/// A parsed filter, ready to evaluate against many points.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    first: Clause,
    rest: Vec<(Combinator, Clause)>,
}

/// One data point as the filter sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub value: f32,
    pub speed: f32,
}

fn parse_field(token: &str) -> Result<Field> {
    match token {
        "x" => Ok(Field::X),
        "y" => Ok(Field::Y),
        "value" => Ok(Field::Value),
        "speed" => Ok(Field::Speed),
        other => Err(EngineError::parse(format!("unknown field `{other}`"))),
    }
}

fn parse_op(token: &str) -> Result<Op> {
    match token {
        ">" => Ok(Op::Gt),
        "<" => Ok(Op::Lt),
        ">=" => Ok(Op::Ge),
        "<=" => Ok(Op::Le),
        "=" | "==" => Ok(Op::Eq),
        "!=" => Ok(Op::Ne),
        other => Err(EngineError::parse(format!("unknown operator `{other}`"))),
    }
}

fn parse_number(token: &str) -> Result<f32> {
    token
        .parse::<f32>()
        .map_err(|_| EngineError::parse(format!("expected a number, got `{token}`")))
}

impl Query {
    /// Parse `where <field> <op> <number> [and|or ...]`. Tokens are
    /// whitespace-separated and case-insensitive for keywords.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let mut cursor = 0usize;

        let keyword = tokens
            .first()
            .ok_or_else(|| EngineError::parse("empty query"))?;
        if !keyword.eq_ignore_ascii_case("where") {
            return Err(EngineError::parse("query must start with `where`"));
        }
        cursor += 1;

        let mut next_clause = |cursor: &mut usize| -> Result<Clause> {
            if *cursor + 3 > tokens.len() {
                return Err(EngineError::parse("truncated clause"));
            }
            let clause = Clause {
                field: parse_field(tokens[*cursor])?,
                op: parse_op(tokens[*cursor + 1])?,
                number: parse_number(tokens[*cursor + 2])?,
            };
            *cursor += 3;
            Ok(clause)
        };

        let first = next_clause(&mut cursor)?;
        let mut rest = Vec::new();
        while cursor < tokens.len() {
            let combinator = if tokens[cursor].eq_ignore_ascii_case("and") {
                Combinator::And
            } else if tokens[cursor].eq_ignore_ascii_case("or") {
                Combinator::Or
            } else {
                return Err(EngineError::parse(format!(
                    "expected `and`/`or`, got `{}`",
                    tokens[cursor]
                )));
            };
            cursor += 1;
            rest.push((combinator, next_clause(&mut cursor)?));
        }

        Ok(Self { first, rest })
    }

    pub fn matches(&self, point: Point) -> bool {
        let mut acc = eval(self.first, point);
        for &(combinator, clause) in &self.rest {
            let rhs = eval(clause, point);
            acc = match combinator {
                Combinator::And => acc && rhs,
                Combinator::Or => acc || rhs,
            };
        }
        acc
    }
}

fn eval(clause: Clause, point: Point) -> bool {
    let lhs = match clause.field {
        Field::X => point.x,
        Field::Y => point.y,
        Field::Value => point.value,
        Field::Speed => point.speed,
    };
    match clause.op {
        Op::Gt => lhs > clause.number,
        Op::Lt => lhs < clause.number,
        Op::Ge => lhs >= clause.number,
        Op::Le => lhs <= clause.number,
        Op::Eq => (lhs - clause.number).abs() < 1e-6,
        Op::Ne => (lhs - clause.number).abs() >= 1e-6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32, value: f32, speed: f32) -> Point {
        Point { x, y, value, speed }
    }

    #[test]
    fn single_clause() {
        let q = Query::parse("where x > 50").unwrap();
        assert!(q.matches(point(60.0, 0.0, 0.0, 0.0)));
        assert!(!q.matches(point(40.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn and_narrows_or_widens() {
        let q = Query::parse("where x > 50 and value < 100").unwrap();
        assert!(q.matches(point(60.0, 0.0, 50.0, 0.0)));
        assert!(!q.matches(point(60.0, 0.0, 150.0, 0.0)));

        let q = Query::parse("where x > 50 or value < 100").unwrap();
        assert!(q.matches(point(10.0, 0.0, 50.0, 0.0)));
        assert!(!q.matches(point(10.0, 0.0, 150.0, 0.0)));
    }

    #[test]
    fn left_to_right_combination() {
        // (x > 0 and y > 0) or speed > 100
        let q = Query::parse("where x > 0 and y > 0 or speed > 100").unwrap();
        assert!(q.matches(point(-1.0, -1.0, 0.0, 200.0)));
        assert!(q.matches(point(1.0, 1.0, 0.0, 0.0)));
        assert!(!q.matches(point(-1.0, 1.0, 0.0, 50.0)));
    }

    #[test]
    fn equality_and_inequality() {
        let q = Query::parse("where value = 5").unwrap();
        assert!(q.matches(point(0.0, 0.0, 5.0, 0.0)));
        assert!(!q.matches(point(0.0, 0.0, 5.1, 0.0)));

        let q = Query::parse("where speed != 0").unwrap();
        assert!(q.matches(point(0.0, 0.0, 0.0, 3.0)));
        assert!(!q.matches(point(0.0, 0.0, 0.0, 0.0)));
    }

    #[test]
    fn malformed_queries_are_parse_errors() {
        for bad in [
            "",
            "x > 5",
            "where",
            "where x >",
            "where x > banana",
            "where q > 5",
            "where x ~ 5",
            "where x > 5 also y < 2",
        ] {
            let err = Query::parse(bad).unwrap_err();
            assert_eq!(err.kind(), core_error::ErrorKind::Parse, "query: {bad:?}");
        }
    }
}
