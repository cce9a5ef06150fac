//! Expression tree consumed by the query API.
//!
//! The JSON grammar is owned by the query engine:
//!
//! ```text
//! {"expression": {}}                                              match everything
//! {"expression": {"left": "Title", "op": {"name": "~"}, "right": "plan"}}
//! {"expression": {"left": <expr>, "op": {"name": "AND"}, "right": <expr>}}
//! {"expression": {"object_name": "__previous__", "op": {"name": "relevant"}, "ids": [0]}}
//! ```

use serde::{Deserialize, Serialize};

/// Object name used by back-references to earlier sub-request results.
pub const PREVIOUS_OBJECT: &str = "__previous__";
/// Operator name of a back-reference.
pub const RELEVANT_OP: &str = "relevant";

/// Top-level wrapper, `{"expression": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterExpression {
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpName {
    pub name: String,
}

impl OpName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Right-hand side of a comparison leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Text(String),
    List(Vec<String>),
}

/// Only a literal `{}` deserializes as `Empty`; any other map must match one
/// of the node shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "WireExpression")]
pub enum Expression {
    Relevant {
        object_name: String,
        op: OpName,
        ids: Vec<usize>,
    },
    Binary {
        left: Box<Expression>,
        op: OpName,
        right: Box<Expression>,
    },
    Comparison {
        left: String,
        op: OpName,
        right: Operand,
    },
    Empty {},
}

/// Deserialization shape of [`Expression`]. `Empty` keeps the map so that
/// stray keys can be rejected instead of widening the filter.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireExpression {
    Relevant {
        object_name: String,
        op: OpName,
        ids: Vec<usize>,
    },
    Binary {
        left: Box<Expression>,
        op: OpName,
        right: Box<Expression>,
    },
    Comparison {
        left: String,
        op: OpName,
        right: Operand,
    },
    Empty(serde_json::Map<String, serde_json::Value>),
}

impl TryFrom<WireExpression> for Expression {
    type Error = String;

    fn try_from(wire: WireExpression) -> Result<Self, Self::Error> {
        Ok(match wire {
            WireExpression::Relevant { object_name, op, ids } => Expression::Relevant { object_name, op, ids },
            WireExpression::Binary { left, op, right } => Expression::Binary { left, op, right },
            WireExpression::Comparison { left, op, right } => Expression::Comparison { left, op, right },
            WireExpression::Empty(map) if map.is_empty() => Expression::Empty {},
            WireExpression::Empty(map) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                return Err(format!("malformed expression with keys {:?}", keys));
            }
        })
    }
}

impl Default for Expression {
    fn default() -> Self {
        Expression::Empty {}
    }
}

impl Expression {
    pub fn is_empty(&self) -> bool {
        matches!(self, Expression::Empty {})
    }

    /// Nesting depth of binary nodes; leaves count as 1, the sentinel as 0.
    pub fn depth(&self) -> usize {
        match self {
            Expression::Empty {} => 0,
            Expression::Binary { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expression::Comparison { .. } | Expression::Relevant { .. } => 1,
        }
    }
}

impl FilterExpression {
    /// The `{"expression": {}}` sentinel.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.expression.is_empty()
    }

    pub fn comparison(left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            expression: Expression::Comparison {
                left: left.into(),
                op: OpName::new(op),
                right: Operand::Text(right.into()),
            },
        }
    }

    pub fn membership(left: impl Into<String>, op: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            expression: Expression::Comparison {
                left: left.into(),
                op: OpName::new(op),
                right: Operand::List(values),
            },
        }
    }

    /// Back-reference to the result of the `index`-th sub-request.
    pub fn relevant(index: usize) -> Self {
        Self {
            expression: Expression::Relevant {
                object_name: PREVIOUS_OBJECT.to_string(),
                op: OpName::new(RELEVANT_OP),
                ids: vec![index],
            },
        }
    }
}

/// Combine two filters with `op`. An empty side is absorbed, so joining with
/// the match-all sentinel returns the other side unchanged.
pub fn join(left: FilterExpression, right: FilterExpression, op: &str) -> FilterExpression {
    if left.is_empty() {
        return right;
    }
    if right.is_empty() {
        return left;
    }
    FilterExpression {
        expression: Expression::Binary {
            left: Box::new(left.expression),
            op: OpName::new(op),
            right: Box::new(right.expression),
        },
    }
}
