//! Query descriptors handed to the query API.
//!
//! Sub-requests emitted for mapping criteria come first, in emission order;
//! the main query is appended last. Later expressions refer to earlier
//! results only by list position (see [`FilterExpression::relevant`]).

use crate::expression::FilterExpression;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Ids,
    #[default]
    Values,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub object_name: String,
    #[serde(rename = "type")]
    pub query_type: QueryType,
    pub filters: FilterExpression,
}

impl QueryDescriptor {
    pub fn new(object_name: impl Into<String>, query_type: QueryType, filters: FilterExpression) -> Self {
        Self {
            object_name: object_name.into(),
            query_type,
            filters,
        }
    }

    /// Sub-request resolving a mapping criteria to object ids.
    pub fn ids(object_name: impl Into<String>, filters: FilterExpression) -> Self {
        Self::new(object_name, QueryType::Ids, filters)
    }
}

/// Appends `descriptor` and returns its position in the list.
pub fn push_sub_request(side_requests: &mut Vec<QueryDescriptor>, descriptor: QueryDescriptor) -> usize {
    side_requests.push(descriptor);
    side_requests.len() - 1
}

/// Complete payload for one search: sub-requests followed by the main query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub sub_requests: Vec<QueryDescriptor>,
    pub main: QueryDescriptor,
}

impl SearchRequest {
    pub fn new(sub_requests: Vec<QueryDescriptor>, main: QueryDescriptor) -> Self {
        Self { sub_requests, main }
    }

    /// Index the main query will have in the flattened list.
    pub fn main_index(&self) -> usize {
        self.sub_requests.len()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &QueryDescriptor> {
        self.sub_requests.iter().chain(std::iter::once(&self.main))
    }

    /// Request body as sent to the query API.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let all: Vec<&QueryDescriptor> = self.descriptors().collect();
        serde_json::to_string_pretty(&all)
    }
}
