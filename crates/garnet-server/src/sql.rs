//! SQL adapter.
//!
//! Wraps `sqlparser` to translate a minimal SQL subset into the neutral
//! query model the pipeline runs on:
//! - SELECT with column list or *
//! - FROM single table
//! - WHERE with AND-combined predicates (=, !=, <, <=, >, >=, LIKE,
//!   NOT LIKE, IN, NOT IN, IS NULL, IS NOT NULL, BETWEEN)
//! - LIMIT
//!
//! Everything else (joins, subqueries, OR, DDL, DML) is rejected.

use garnet_types::{Filter, FilterOperator};
use serde_json::Value;
use sqlparser::ast::{
    BinaryOperator, Expr, Ident, ObjectName, Query, Select, SelectItem, SetExpr, Statement,
    Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::{Result, ServerError};

/// Parsed SELECT statement in pipeline terms.
#[derive(Debug, Clone)]
pub struct ParsedQuery {
    /// Table name from the FROM clause.
    pub table: String,
    /// Selected columns. Empty means SELECT *.
    pub columns: Vec<String>,
    /// WHERE predicates, all AND-combined.
    pub predicates: Vec<Filter>,
    /// LIMIT value, if present.
    pub limit: Option<u32>,
}

/// Parses a SQL string into a [`ParsedQuery`].
pub fn parse_query(sql: &str) -> Result<ParsedQuery> {
    let dialect = GenericDialect {};
    let statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| ServerError::QueryParse(e.to_string()))?;

    if statements.len() != 1 {
        return Err(ServerError::QueryParse(format!(
            "expected exactly 1 statement, got {}",
            statements.len()
        )));
    }

    match &statements[0] {
        Statement::Query(query) => parse_select_query(query),
        _ => Err(ServerError::QueryParse(
            "Only SELECT statements are supported".to_string(),
        )),
    }
}

fn parse_select_query(query: &Query) -> Result<ParsedQuery> {
    if query.with.is_some() {
        return Err(ServerError::QueryParse(
            "WITH clauses (CTEs) are not supported".to_string(),
        ));
    }

    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        _ => {
            return Err(ServerError::QueryParse(
                "Only SELECT statements are supported".to_string(),
            ));
        }
    };

    let (table, columns, predicates) = parse_select(select)?;
    let limit = parse_limit(query.limit.as_ref())?;

    Ok(ParsedQuery {
        table,
        columns,
        predicates,
        limit,
    })
}

fn parse_select(select: &Select) -> Result<(String, Vec<String>, Vec<Filter>)> {
    // FROM - exactly one table, no joins
    if select.from.len() != 1 {
        return Err(ServerError::QueryParse(format!(
            "expected exactly 1 table in FROM clause, got {}",
            select.from.len()
        )));
    }

    let from = &select.from[0];
    if !from.joins.is_empty() {
        return Err(ServerError::QueryParse(
            "JOIN is not supported".to_string(),
        ));
    }

    let table = match &from.relation {
        sqlparser::ast::TableFactor::Table { name, .. } => object_name_to_string(name),
        other => {
            return Err(ServerError::QueryParse(format!(
                "unsupported FROM clause: {other:?}"
            )));
        }
    };

    let columns = parse_select_items(&select.projection)?;

    let predicates = match &select.selection {
        Some(expr) => parse_where_expr(expr)?,
        None => vec![],
    };

    Ok((table, columns, predicates))
}

/// Parses the projection. An empty result means SELECT *.
fn parse_select_items(items: &[SelectItem]) -> Result<Vec<String>> {
    let mut columns = Vec::new();

    for item in items {
        match item {
            SelectItem::Wildcard(_) => {
                return Ok(Vec::new());
            }
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                columns.push(ident.value.clone());
            }
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) if idents.len() == 2 => {
                // table.column - just use the column name
                columns.push(idents[1].value.clone());
            }
            SelectItem::ExprWithAlias {
                expr: Expr::Identifier(ident),
                ..
            } => {
                // Aliases are ignored, the column name is what connectors see
                columns.push(ident.value.clone());
            }
            other => {
                return Err(ServerError::QueryParse(format!(
                    "unsupported SELECT item: {other:?}"
                )));
            }
        }
    }

    Ok(columns)
}

/// Maximum nesting depth for WHERE clause expressions.
///
/// Prevents stack overflow from pathological input like
/// `WHERE ((((...(a = 1)...))))`.
const MAX_WHERE_DEPTH: usize = 100;

fn parse_where_expr(expr: &Expr) -> Result<Vec<Filter>> {
    parse_where_expr_inner(expr, 0)
}

fn parse_where_expr_inner(expr: &Expr, depth: usize) -> Result<Vec<Filter>> {
    if depth >= MAX_WHERE_DEPTH {
        return Err(ServerError::QueryParse(format!(
            "WHERE clause nesting exceeds maximum depth of {MAX_WHERE_DEPTH}"
        )));
    }

    match expr {
        // AND combines multiple predicates
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            let mut predicates = parse_where_expr_inner(left, depth + 1)?;
            predicates.extend(parse_where_expr_inner(right, depth + 1)?);
            Ok(predicates)
        }

        // LIKE / NOT LIKE
        Expr::Like {
            expr,
            pattern,
            negated,
            ..
        } => {
            let column = expr_to_column(expr)?;
            let pattern = expr_to_value(pattern)?;
            let operator = if *negated {
                FilterOperator::NotLike
            } else {
                FilterOperator::Like
            };
            Ok(vec![Filter::new(column, operator, pattern)])
        }

        // IS NULL / IS NOT NULL
        Expr::IsNull(expr) => {
            let column = expr_to_column(expr)?;
            Ok(vec![Filter::new(column, FilterOperator::IsNull, Value::Null)])
        }

        Expr::IsNotNull(expr) => {
            let column = expr_to_column(expr)?;
            Ok(vec![Filter::new(
                column,
                FilterOperator::IsNotNull,
                Value::Null,
            )])
        }

        // IN / NOT IN
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let column = expr_to_column(expr)?;
            let values: Result<Vec<Value>> = list.iter().map(expr_to_value).collect();
            let operator = if *negated {
                FilterOperator::NotIn
            } else {
                FilterOperator::In
            };
            Ok(vec![Filter::new(column, operator, Value::Array(values?))])
        }

        // BETWEEN low AND high
        Expr::Between {
            expr,
            negated,
            low,
            high,
        } => {
            if *negated {
                return Err(ServerError::QueryParse(
                    "NOT BETWEEN is not supported".to_string(),
                ));
            }
            let column = expr_to_column(expr)?;
            let bounds = vec![expr_to_value(low)?, expr_to_value(high)?];
            Ok(vec![Filter::new(
                column,
                FilterOperator::Between,
                Value::Array(bounds),
            )])
        }

        // Comparison operators
        Expr::BinaryOp { left, op, right } => {
            let predicate = parse_comparison(left, op, right)?;
            Ok(vec![predicate])
        }

        // Parenthesized expression
        Expr::Nested(inner) => parse_where_expr_inner(inner, depth + 1),

        other => Err(ServerError::QueryParse(format!(
            "unsupported WHERE expression: {other:?}"
        ))),
    }
}

fn parse_comparison(left: &Expr, op: &BinaryOperator, right: &Expr) -> Result<Filter> {
    let column = expr_to_column(left)?;
    let value = expr_to_value(right)?;

    let operator = match op {
        BinaryOperator::Eq => FilterOperator::Equals,
        BinaryOperator::NotEq => FilterOperator::NotEquals,
        BinaryOperator::Lt => FilterOperator::LessThan,
        BinaryOperator::LtEq => FilterOperator::LessOrEqual,
        BinaryOperator::Gt => FilterOperator::GreaterThan,
        BinaryOperator::GtEq => FilterOperator::GreaterOrEqual,
        other => {
            return Err(ServerError::QueryParse(format!(
                "unsupported operator: {other:?}"
            )));
        }
    };

    Ok(Filter::new(column, operator, value))
}

fn expr_to_column(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(idents) if idents.len() == 2 => {
            // table.column - ignore the table qualifier
            Ok(idents[1].value.clone())
        }
        other => Err(ServerError::QueryParse(format!(
            "expected column name, got {other:?}"
        ))),
    }
}

/// Converts a SQL literal to a JSON value.
fn expr_to_value(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Value(SqlValue::Number(n, _)) => parse_number_literal(n),
        Expr::Value(SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s)) => {
            Ok(Value::String(s.clone()))
        }
        Expr::Value(SqlValue::Boolean(b)) => Ok(Value::Bool(*b)),
        Expr::Value(SqlValue::Null) => Ok(Value::Null),
        Expr::UnaryOp {
            op: sqlparser::ast::UnaryOperator::Minus,
            expr,
        } => {
            if let Expr::Value(SqlValue::Number(n, _)) = expr.as_ref() {
                parse_number_literal(&format!("-{n}"))
            } else {
                Err(ServerError::QueryParse(format!(
                    "unsupported unary minus operand: {expr:?}"
                )))
            }
        }
        other => Err(ServerError::QueryParse(format!(
            "unsupported value expression: {other:?}"
        ))),
    }
}

fn parse_number_literal(n: &str) -> Result<Value> {
    if let Ok(v) = n.parse::<i64>() {
        return Ok(Value::from(v));
    }
    n.parse::<f64>()
        .ok()
        .and_then(|v| serde_json::Number::from_f64(v).map(Value::Number))
        .ok_or_else(|| ServerError::QueryParse(format!("invalid number literal: {n}")))
}

fn parse_limit(limit: Option<&Expr>) -> Result<Option<u32>> {
    match limit {
        None => Ok(None),
        Some(Expr::Value(SqlValue::Number(n, _))) => {
            let v: u32 = n
                .parse()
                .map_err(|_| ServerError::QueryParse(format!("invalid LIMIT value: {n}")))?;
            Ok(Some(v))
        }
        Some(other) => Err(ServerError::QueryParse(format!(
            "unsupported LIMIT expression: {other:?}"
        ))),
    }
}

fn object_name_to_string(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|i: &Ident| i.value.clone())
        .collect::<Vec<_>>()
        .join(".")
}
