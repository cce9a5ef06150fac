//! Item model for the advanced search filter.
//!
//! A filter is edited as a flat, infix-ordered list of [`ItemNode`]s: operands
//! (attributes, states, mapping criteria, groups) separated by `AND` / `OR`
//! operators. Precedence is only resolved later by the filter builder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One element of a user-composed filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum ItemNode {
    /// Attribute comparison, e.g. `Title ~ "plan"`
    Attribute(AttributeFilter),
    /// Boolean operator between two operands
    Operator(LogicalOp),
    /// Status / state set filter
    State(StateFilter),
    /// "Related to objects of type X matching F"
    MappingCriteria(MappingCriteria),
    /// Parenthesised infix sequence
    Group(Vec<ItemNode>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeFilter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl AttributeFilter {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Boolean operators allowed between filter operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    #[default]
    And,
    Or,
}

impl LogicalOp {
    /// Higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            LogicalOp::Or => 1,
            LogicalOp::And => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown logical operator: {0:?}")]
pub struct UnknownOperator(pub String);

impl FromStr for LogicalOp {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(LogicalOp::And),
            "OR" => Ok(LogicalOp::Or),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

/// How the selected states are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateOperator {
    /// Object is in any of the listed states
    #[default]
    Any,
    /// Object is in none of the listed states
    None,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StateFilter {
    pub items: Vec<String>,
    pub model_name: String,
    pub operator: StateOperator,
}

impl StateFilter {
    pub fn is_inverse(&self) -> bool {
        self.operator == StateOperator::None
    }
}

/// Cross-object filter: objects related to `object_name` instances that match
/// `filter` (and, transitively, whatever `mapped_to` matches).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingCriteria {
    pub object_name: String,
    pub filter: AttributeFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_to: Option<Box<ItemNode>>,
}

impl ItemNode {
    pub fn is_operator(&self) -> bool {
        matches!(self, ItemNode::Operator(_))
    }

    /// Short kind label, used in logs and validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemNode::Attribute(_) => "attribute",
            ItemNode::Operator(_) => "operator",
            ItemNode::State(_) => "state",
            ItemNode::MappingCriteria(_) => "mappingCriteria",
            ItemNode::Group(_) => "group",
        }
    }
}

pub fn create_attribute(partial: Option<AttributeFilter>) -> ItemNode {
    ItemNode::Attribute(partial.unwrap_or_default())
}

/// Without a symbol the operator defaults to `AND`, the operator the editor
/// inserts between newly added items.
pub fn create_operator(symbol: Option<LogicalOp>) -> ItemNode {
    ItemNode::Operator(symbol.unwrap_or_default())
}

pub fn create_state(partial: Option<StateFilter>) -> ItemNode {
    ItemNode::State(partial.unwrap_or_default())
}

pub fn create_mapping_criteria(partial: Option<MappingCriteria>) -> ItemNode {
    ItemNode::MappingCriteria(partial.unwrap_or_default())
}

pub fn create_group(children: Option<Vec<ItemNode>>) -> ItemNode {
    ItemNode::Group(children.unwrap_or_default())
}
