//! Builds a query-API expression from an infix list of filter items.
//!
//! ## 构建流程图
//!
//! ```text
//! build(items, side_requests)
//!   ├─ to_postfix(items)            调度场算法, OR = 1, AND = 2
//!   └─ evaluate(postfix)
//!        ├─ Attribute        → {left: field, op, right: value.trim()}
//!        ├─ State            → StatusFilterBuilder (NONE 时取反)
//!        ├─ Group            → build(children, side_requests) (递归)
//!        ├─ MappingCriteria  → resolve_mapping()
//!        │                       ├─ filter AND evaluate(mapped_to)
//!        │                       ├─ 追加子请求 (type "ids")
//!        │                       └─ {object_name: "__previous__", op: relevant, ids: [N]}
//!        └─ Operator         → 弹出 a, 弹出 b → {left: a, op, right: b}
//! ```
//!
//! Operands are evaluated in postfix order, which keeps them in their
//! original left-to-right order. Sub-requests are therefore appended
//! depth-first, innermost first, before any back-reference to them is built.

use crate::expression::{join, FilterExpression};
use crate::item::{AttributeFilter, ItemNode, LogicalOp, MappingCriteria};
use crate::request::{push_sub_request, QueryDescriptor};
use crate::status_filter::StatusFilterBuilder;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("operator {op} at postfix position {position} is missing an operand")]
    MissingOperand { op: LogicalOp, position: usize },

    #[error("{count} operands left without an operator joining them")]
    DanglingOperands { count: usize },

    #[error("no state vocabulary configured for model {0:?}")]
    UnknownModel(String),

    #[error("operator {0} used where a filter item is expected")]
    UnexpectedOperator(LogicalOp),
}

/// A postfix token: either an operand node or an operator.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Postfix<'a> {
    Operand(&'a ItemNode),
    Operator(LogicalOp),
}

pub struct FilterBuilder<'s, S: StatusFilterBuilder + ?Sized> {
    statuses: &'s S,
}

impl<'s, S: StatusFilterBuilder + ?Sized> FilterBuilder<'s, S> {
    pub fn new(statuses: &'s S) -> Self {
        Self { statuses }
    }

    /// Build the expression for `items`, appending any sub-requests to
    /// `side_requests`. An empty list yields `{"expression": {}}`.
    pub fn build(
        &self,
        items: &[ItemNode],
        side_requests: &mut Vec<QueryDescriptor>,
    ) -> Result<FilterExpression, BuildError> {
        let postfix = to_postfix(items);
        tracing::trace!(postfix = ?postfix, "postfix order");
        self.evaluate(&postfix, side_requests)
    }

    fn evaluate(
        &self,
        postfix: &[Postfix<'_>],
        side_requests: &mut Vec<QueryDescriptor>,
    ) -> Result<FilterExpression, BuildError> {
        let mut stack: Vec<FilterExpression> = Vec::new();

        for (position, token) in postfix.iter().enumerate() {
            match token {
                Postfix::Operand(node) => {
                    let expr = self.evaluate_operand(node, side_requests)?;
                    stack.push(expr);
                }
                Postfix::Operator(op) => {
                    let missing = || BuildError::MissingOperand { op: *op, position };
                    // The first popped operand becomes the left branch.
                    let left = stack.pop().ok_or_else(missing)?;
                    let right = stack.pop().ok_or_else(missing)?;
                    stack.push(join(left, right, op.as_str()));
                }
            }
        }

        match stack.len() {
            0 => Ok(FilterExpression::empty()),
            1 => Ok(stack.pop().unwrap_or_default()),
            count => Err(BuildError::DanglingOperands { count }),
        }
    }

    fn evaluate_operand(
        &self,
        node: &ItemNode,
        side_requests: &mut Vec<QueryDescriptor>,
    ) -> Result<FilterExpression, BuildError> {
        match node {
            ItemNode::Attribute(attribute) => Ok(attribute_expression(attribute)),
            ItemNode::State(state) => self.statuses.build_status_filter(
                &state.items,
                &state.model_name,
                state.is_inverse(),
            ),
            ItemNode::Group(children) => self.build(children, side_requests),
            ItemNode::MappingCriteria(criteria) => self.resolve_mapping(criteria, side_requests),
            // only reachable through `mapped_to`
            ItemNode::Operator(op) => Err(BuildError::UnexpectedOperator(*op)),
        }
    }

    /// Emit a sub-request for `criteria` and return a back-reference to it.
    fn resolve_mapping(
        &self,
        criteria: &MappingCriteria,
        side_requests: &mut Vec<QueryDescriptor>,
    ) -> Result<FilterExpression, BuildError> {
        let mut filter = attribute_expression(&criteria.filter);

        if let Some(mapped_to) = &criteria.mapped_to {
            let relevant = self.evaluate_operand(mapped_to, side_requests)?;
            filter = join(filter, relevant, LogicalOp::And.as_str());
        }

        let index = push_sub_request(
            side_requests,
            QueryDescriptor::ids(criteria.object_name.clone(), filter),
        );
        tracing::debug!(object = %criteria.object_name, index, "emitted sub-request");

        Ok(FilterExpression::relevant(index))
    }
}

/// Convenience wrapper around [`FilterBuilder::build`].
pub fn build_filter<S: StatusFilterBuilder + ?Sized>(
    items: &[ItemNode],
    side_requests: &mut Vec<QueryDescriptor>,
    statuses: &S,
) -> Result<FilterExpression, BuildError> {
    FilterBuilder::new(statuses).build(items, side_requests)
}

fn attribute_expression(attribute: &AttributeFilter) -> FilterExpression {
    FilterExpression::comparison(
        attribute.field.clone(),
        attribute.operator.clone(),
        attribute.value.trim(),
    )
}

/// Shunting-yard reordering of one infix level. Groups stay opaque operands.
fn to_postfix(items: &[ItemNode]) -> Vec<Postfix<'_>> {
    let mut output = Vec::with_capacity(items.len());
    let mut operators: Vec<LogicalOp> = Vec::new();

    for item in items {
        match item {
            ItemNode::Operator(op) => {
                while let Some(&top) = operators.last() {
                    if top.precedence() < op.precedence() {
                        break;
                    }
                    output.push(Postfix::Operator(top));
                    operators.pop();
                }
                operators.push(*op);
            }
            operand => output.push(Postfix::Operand(operand)),
        }
    }

    while let Some(op) = operators.pop() {
        output.push(Postfix::Operator(op));
    }

    output
}
