//! SQL preview of a search request using sea-query.
//!
//! Emulates what the query API does with a request: every descriptor becomes
//! an id query over the model's table, and `relevant` back-references become
//! sub-selects over the `relationships` table that point at the referenced
//! descriptor's query.

use crate::expression::{Expression, Operand, RELEVANT_OP};
use crate::request::{QueryDescriptor, SearchRequest};
use sea_query::{Expr, Iden, LikeExpr, PostgresQueryBuilder, SelectStatement, SimpleExpr, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Represents a table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "{}", self.0).unwrap();
    }
}

const RELATIONSHIPS_TABLE: &str = "relationships";
const LIKE_ESCAPE: char = '!';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("descriptor {at} references sub-request {index}, which is not emitted before it")]
    ForwardReference { at: usize, index: usize },

    #[error("unsupported operator {0:?}")]
    UnsupportedOperator(String),

    #[error("operator {op:?} expects {expected} on the right-hand side")]
    OperandMismatch { op: String, expected: &'static str },
}

/// Compiled statements, one per descriptor, main query last.
#[derive(Debug)]
pub struct CompileResult {
    pub statements: Vec<String>,
}

impl CompileResult {
    pub fn main_sql(&self) -> &str {
        self.statements.last().map(String::as_str).unwrap_or_default()
    }
}

/// Compiles search requests to PostgreSQL
pub struct SqlCompiler {
    /// Maps model names to table names
    table_mapping: HashMap<String, String>,
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self {
            table_mapping: HashMap::new(),
        }
    }

    pub fn with_table_mapping(table_mapping: HashMap<String, String>) -> Self {
        Self { table_mapping }
    }

    fn table_name(&self, model_name: &str) -> String {
        self.table_mapping
            .get(model_name)
            .cloned()
            .unwrap_or_else(|| model_name.to_lowercase())
    }

    pub fn compile(&self, request: &SearchRequest) -> Result<CompileResult, CompileError> {
        let mut compiled: Vec<(String, SelectStatement)> = Vec::new();

        for (at, descriptor) in request.descriptors().enumerate() {
            let select = self.compile_descriptor(at, descriptor, &compiled)?;
            compiled.push((descriptor.object_name.clone(), select));
        }

        Ok(CompileResult {
            statements: compiled
                .iter()
                .map(|(_, select)| select.to_string(PostgresQueryBuilder))
                .collect(),
        })
    }

    /// `SELECT "id" FROM <table> WHERE <filters>`
    fn compile_descriptor(
        &self,
        at: usize,
        descriptor: &QueryDescriptor,
        earlier: &[(String, SelectStatement)],
    ) -> Result<SelectStatement, CompileError> {
        let condition = self.compile_expression(at, &descriptor.filters.expression, earlier)?;

        let mut select = SelectStatement::new();
        select
            .column(ColumnName("id".to_string()))
            .from(TableName(self.table_name(&descriptor.object_name)))
            .and_where(condition);
        Ok(select)
    }

    fn compile_expression(
        &self,
        at: usize,
        expression: &Expression,
        earlier: &[(String, SelectStatement)],
    ) -> Result<SimpleExpr, CompileError> {
        match expression {
            Expression::Empty {} => Ok(Expr::val(true).into()),
            Expression::Binary { left, op, right } => {
                let left = self.compile_expression(at, left, earlier)?;
                let right = self.compile_expression(at, right, earlier)?;
                match op.name.to_ascii_uppercase().as_str() {
                    "AND" => Ok(left.and(right)),
                    "OR" => Ok(left.or(right)),
                    _ => Err(CompileError::UnsupportedOperator(op.name.clone())),
                }
            }
            Expression::Comparison { left, op, right } => compile_comparison(left, &op.name, right),
            Expression::Relevant { op, ids, .. } => {
                if op.name != RELEVANT_OP {
                    return Err(CompileError::UnsupportedOperator(op.name.clone()));
                }
                let conditions = ids
                    .iter()
                    .map(|&index| relevant_condition(at, index, earlier))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(combine_with_and(conditions))
            }
        }
    }
}

impl Default for SqlCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// `"id" IN (SELECT "destination_id" FROM "relationships"
///           WHERE "source_type" = <object> AND "source_id" IN (<descriptor>))`
fn relevant_condition(
    at: usize,
    index: usize,
    earlier: &[(String, SelectStatement)],
) -> Result<SimpleExpr, CompileError> {
    let (object_name, source) = earlier
        .get(index)
        .ok_or(CompileError::ForwardReference { at, index })?;

    let mut relationships = SelectStatement::new();
    relationships
        .column(ColumnName("destination_id".to_string()))
        .from(TableName(RELATIONSHIPS_TABLE.to_string()))
        .and_where(Expr::col(ColumnName("source_type".to_string())).eq(string_value(object_name)))
        .and_where(Expr::col(ColumnName("source_id".to_string())).in_subquery(source.clone()));

    Ok(Expr::col(ColumnName("id".to_string())).in_subquery(relationships))
}

fn compile_comparison(field: &str, op: &str, right: &Operand) -> Result<SimpleExpr, CompileError> {
    let col = Expr::col(ColumnName(field.to_string()));

    let value = match right {
        Operand::List(values) => {
            let values: Vec<Value> = values.iter().map(|v| string_value(v)).collect();
            return match op.to_ascii_uppercase().as_str() {
                "IN" | "=" => Ok(col.is_in(values)),
                "NOT IN" | "!=" => Ok(col.is_not_in(values)),
                _ => Err(CompileError::OperandMismatch {
                    op: op.to_string(),
                    expected: "a single value",
                }),
            };
        }
        Operand::Text(value) => value,
    };

    let expr = match op {
        "=" => col.eq(string_value(value)),
        "!=" => col.ne(string_value(value)),
        "~" => col.like(contains_pattern(value)),
        "!~" => col.not_like(contains_pattern(value)),
        ">" => col.gt(string_value(value)),
        "<" => col.lt(string_value(value)),
        ">=" => col.gte(string_value(value)),
        "<=" => col.lte(string_value(value)),
        "IN" | "NOT IN" => {
            return Err(CompileError::OperandMismatch {
                op: op.to_string(),
                expected: "a list of values",
            })
        }
        other => return Err(CompileError::UnsupportedOperator(other.to_string())),
    };
    Ok(expr)
}

/// `%value%` with the value's own `%` and `_` matched literally.
fn contains_pattern(value: &str) -> LikeExpr {
    if !value.contains(['%', '_', LIKE_ESCAPE]) {
        return LikeExpr::new(format!("%{}%", value));
    }

    let mut pattern = String::with_capacity(value.len() + 4);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape(LIKE_ESCAPE)
}

fn string_value(s: &str) -> Value {
    Value::String(Some(Box::new(s.to_string())))
}

fn combine_with_and(conditions: Vec<SimpleExpr>) -> SimpleExpr {
    conditions
        .into_iter()
        .reduce(|acc, expr| acc.and(expr))
        .unwrap_or_else(|| Expr::val(true).into())
}
