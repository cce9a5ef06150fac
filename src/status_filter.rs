//! Status filter collaborator.
//!
//! The filter builder does not know which states a model supports; it hands
//! state items to a [`StatusFilterBuilder`]. [`StateRegistry`] is the
//! configuration-backed implementation.

use crate::expression::FilterExpression;
use crate::filter_builder::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_STATUS_FIELD: &str = "Status";

/// Builds the expression for a state selection.
///
/// With `inverse` set the result must select the complement of `statuses`
/// within the model's vocabulary, not wrap the selection in a negation.
pub trait StatusFilterBuilder {
    fn build_status_filter(
        &self,
        statuses: &[String],
        model_name: &str,
        inverse: bool,
    ) -> Result<FilterExpression, BuildError>;
}

fn default_status_field() -> String {
    DEFAULT_STATUS_FIELD.to_string()
}

/// Valid states of one model and the attribute that stores them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVocabulary {
    #[serde(default = "default_status_field")]
    pub field: String,
    pub values: Vec<String>,
}

impl StateVocabulary {
    pub fn new(values: &[&str]) -> Self {
        Self {
            field: default_status_field(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    models: HashMap<String, StateVocabulary>,
}

impl StateRegistry {
    pub fn new(models: HashMap<String, StateVocabulary>) -> Self {
        Self { models }
    }

    pub fn insert(&mut self, model_name: impl Into<String>, vocabulary: StateVocabulary) {
        self.models.insert(model_name.into(), vocabulary);
    }

    pub fn states_for(&self, model_name: &str) -> Option<&[String]> {
        self.models.get(model_name).map(|v| v.values.as_slice())
    }

    pub fn status_field(&self, model_name: &str) -> &str {
        self.models
            .get(model_name)
            .map(|v| v.field.as_str())
            .unwrap_or(DEFAULT_STATUS_FIELD)
    }
}

impl StatusFilterBuilder for StateRegistry {
    fn build_status_filter(
        &self,
        statuses: &[String],
        model_name: &str,
        inverse: bool,
    ) -> Result<FilterExpression, BuildError> {
        // Nothing selected means no state restriction.
        if statuses.is_empty() {
            return Ok(FilterExpression::empty());
        }

        let field = self.status_field(model_name);
        let selected = if inverse {
            let all = self
                .states_for(model_name)
                .ok_or_else(|| BuildError::UnknownModel(model_name.to_string()))?;
            all.iter()
                .filter(|state| !statuses.contains(state))
                .cloned()
                .collect()
        } else {
            statuses.to_vec()
        };

        tracing::trace!(model = model_name, inverse, ?selected, "status filter");
        Ok(FilterExpression::membership(field, "IN", selected))
    }
}
