//! Editing state of an advanced search.
//!
//! The filter builder expects a well-formed infix list. [`FilterList`] keeps
//! it that way: operators are inserted and removed together with the
//! operands they separate.

use crate::expression::join;
use crate::filter_builder::{BuildError, FilterBuilder};
use crate::item::{create_operator, create_state, ItemNode, LogicalOp, StateFilter};
use crate::request::{QueryDescriptor, QueryType, SearchRequest};
use crate::status_filter::StatusFilterBuilder;
use serde::{Deserialize, Serialize};

/// A problem that must be fixed before the filter can be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path of indexes from the list root to the offending node
    pub path: Vec<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterList {
    items: Vec<ItemNode>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ItemNode] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Append an operand, preceded by `AND` when the list is not empty.
    pub fn add(&mut self, item: ItemNode) {
        self.add_with(LogicalOp::And, item);
    }

    pub fn add_with(&mut self, op: LogicalOp, item: ItemNode) {
        if !self.items.is_empty() {
            self.items.push(create_operator(Some(op)));
        }
        self.items.push(item);
    }

    /// Remove the operand at `index` and the operator next to it: the one
    /// before, or the one after when there is none before. Neighbouring
    /// operands are never touched.
    pub fn remove(&mut self, index: usize) -> Option<ItemNode> {
        if index >= self.items.len() || self.items[index].is_operator() {
            return None;
        }

        let removed = self.items.remove(index);
        if index > 0 && self.items[index - 1].is_operator() {
            self.items.remove(index - 1);
        } else if self.items.get(index).is_some_and(ItemNode::is_operator) {
            self.items.remove(index);
        }
        Some(removed)
    }

    /// Switch the operator at `index`; returns false if it is not an operator.
    pub fn set_operator(&mut self, index: usize, op: LogicalOp) -> bool {
        match self.items.get_mut(index) {
            Some(ItemNode::Operator(current)) => {
                *current = op;
                true
            }
            _ => false,
        }
    }

    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        validate_sequence(&self.items, &mut Vec::new(), &mut issues);
        issues
    }
}

impl From<Vec<ItemNode>> for FilterList {
    fn from(items: Vec<ItemNode>) -> Self {
        Self { items }
    }
}

fn validate_sequence(items: &[ItemNode], path: &mut Vec<usize>, issues: &mut Vec<ValidationIssue>) {
    let mut expect_operand = true;

    for (index, item) in items.iter().enumerate() {
        path.push(index);
        let message = match (expect_operand, item.is_operator()) {
            (true, true) if index == 0 => Some("leading operator"),
            (true, true) => Some("operator follows another operator"),
            (false, false) => Some("missing operator between operands"),
            _ => None,
        };
        if let Some(message) = message {
            issues.push(ValidationIssue {
                path: path.clone(),
                message: message.to_string(),
            });
        }
        validate_node(item, path, issues);
        path.pop();
        expect_operand = item.is_operator();
    }

    if let Some(last) = items.len().checked_sub(1).filter(|&i| items[i].is_operator()) {
        path.push(last);
        issues.push(ValidationIssue {
            path: path.clone(),
            message: "trailing operator".to_string(),
        });
        path.pop();
    }
}

fn validate_node(item: &ItemNode, path: &mut Vec<usize>, issues: &mut Vec<ValidationIssue>) {
    let mut issue = |message: &str| {
        issues.push(ValidationIssue {
            path: path.clone(),
            message: message.to_string(),
        })
    };

    match item {
        ItemNode::Attribute(attribute) if attribute.field.trim().is_empty() => {
            issue("attribute field is empty");
        }
        ItemNode::MappingCriteria(criteria) => {
            if criteria.object_name.trim().is_empty() {
                issue("mapping object is empty");
            }
            if criteria.filter.field.trim().is_empty() {
                issue("mapping filter field is empty");
            }
            if let Some(mapped_to) = &criteria.mapped_to {
                if mapped_to.is_operator() {
                    issue("mapped-to item is an operator");
                }
                validate_node(mapped_to, path, issues);
            }
        }
        ItemNode::Group(children) => validate_sequence(children, path, issues),
        _ => {}
    }
}

/// Filter and mapping lists being edited, plus the last applied snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedSearch {
    pub model_name: String,
    pub filter_items: FilterList,
    pub mapping_items: FilterList,
    applied_filter_items: FilterList,
    applied_mapping_items: FilterList,
}

impl AdvancedSearch {
    pub fn new(model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        let filter_items = default_filter_items(&model_name);
        Self {
            applied_filter_items: filter_items.clone(),
            filter_items,
            mapping_items: FilterList::new(),
            applied_mapping_items: FilterList::new(),
            model_name,
        }
    }

    pub fn applied_filter_items(&self) -> &FilterList {
        &self.applied_filter_items
    }

    pub fn applied_mapping_items(&self) -> &FilterList {
        &self.applied_mapping_items
    }

    /// Snapshot the editing lists. Fails without changes if validation does.
    pub fn apply(&mut self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = self.filter_items.validate();
        issues.extend(self.mapping_items.validate());
        if !issues.is_empty() {
            return Err(issues);
        }

        self.applied_filter_items = self.filter_items.clone();
        self.applied_mapping_items = self.mapping_items.clone();
        Ok(())
    }

    /// Restore the default filter and clear mappings (editing lists only).
    pub fn reset(&mut self) {
        self.filter_items = default_filter_items(&self.model_name);
        self.mapping_items = FilterList::new();
    }

    /// Drop unapplied edits.
    pub fn discard(&mut self) {
        self.filter_items = self.applied_filter_items.clone();
        self.mapping_items = self.applied_mapping_items.clone();
    }

    /// Build the request for the applied snapshot. Filter and mapping lists
    /// share one sub-request list and are combined with `AND`.
    pub fn build_request<S: StatusFilterBuilder + ?Sized>(
        &self,
        statuses: &S,
        main_query_type: QueryType,
    ) -> Result<SearchRequest, BuildError> {
        let builder = FilterBuilder::new(statuses);
        let mut sub_requests = Vec::new();

        let filters = builder.build(self.applied_filter_items.items(), &mut sub_requests)?;
        let mappings = builder.build(self.applied_mapping_items.items(), &mut sub_requests)?;
        let combined = join(filters, mappings, LogicalOp::And.as_str());

        tracing::debug!(
            model = %self.model_name,
            sub_requests = sub_requests.len(),
            "built search request"
        );

        Ok(SearchRequest::new(
            sub_requests,
            QueryDescriptor::new(self.model_name.clone(), main_query_type, combined),
        ))
    }
}

fn default_filter_items(model_name: &str) -> FilterList {
    FilterList::from(vec![create_state(Some(StateFilter {
        model_name: model_name.to_string(),
        ..StateFilter::default()
    }))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::FilterExpression;
    use crate::item::{create_attribute, create_mapping_criteria, AttributeFilter, MappingCriteria};
    use crate::status_filter::{StateRegistry, StateVocabulary};
    use serde_json::json;

    fn attr(field: &str, value: &str) -> ItemNode {
        create_attribute(Some(AttributeFilter::new(field, "=", value)))
    }

    fn kinds(list: &FilterList) -> Vec<&'static str> {
        list.items().iter().map(ItemNode::kind).collect()
    }

    #[test]
    fn test_add_inserts_operator() {
        let mut list = FilterList::new();
        list.add(attr("a", "1"));
        list.add_with(LogicalOp::Or, attr("b", "2"));
        list.add(attr("c", "3"));

        assert_eq!(
            kinds(&list),
            vec!["attribute", "operator", "attribute", "operator", "attribute"]
        );
        assert_eq!(list.items()[1], ItemNode::Operator(LogicalOp::Or));
        assert_eq!(list.items()[3], ItemNode::Operator(LogicalOp::And));
    }

    #[test]
    fn test_remove_takes_preceding_operator() {
        let mut list = FilterList::new();
        list.add(attr("a", "1"));
        list.add_with(LogicalOp::Or, attr("b", "2"));
        list.add(attr("c", "3"));

        assert_eq!(list.remove(2), Some(attr("b", "2")));
        assert_eq!(list.items(), &[attr("a", "1"), create_operator(None), attr("c", "3")]);
    }

    #[test]
    fn test_remove_first_takes_following_operator() {
        let mut list = FilterList::new();
        list.add(attr("a", "1"));
        list.add(attr("b", "2"));

        list.remove(0);
        assert_eq!(list.items(), &[attr("b", "2")]);

        list.remove(0);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_rejects_operator_and_out_of_range() {
        let mut list = FilterList::from(vec![attr("a", "1"), create_operator(None), attr("b", "2")]);
        assert_eq!(list.remove(1), None);
        assert_eq!(list.remove(7), None);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_remove_keeps_neighbouring_operands() {
        let mut list = FilterList::from(vec![attr("a", "1"), attr("b", "2")]);
        assert_eq!(list.remove(1), Some(attr("b", "2")));
        assert_eq!(list.items(), &[attr("a", "1")]);

        let mut list = FilterList::from(vec![attr("a", "1"), attr("b", "2"), create_operator(None), attr("c", "3")]);
        assert_eq!(list.remove(1), Some(attr("b", "2")));
        assert_eq!(list.items(), &[attr("a", "1"), attr("c", "3")]);
    }

    #[test]
    fn test_validate_reports_structure() {
        let list = FilterList::from(vec![create_operator(None), attr("a", "1"), create_operator(None)]);
        let issues = list.validate();
        assert_eq!(
            issues,
            vec![
                ValidationIssue { path: vec![0], message: "leading operator".to_string() },
                ValidationIssue { path: vec![2], message: "trailing operator".to_string() },
            ]
        );

        let list = FilterList::from(vec![
            attr("a", "1"),
            create_operator(None),
            create_operator(Some(LogicalOp::Or)),
            ItemNode::Group(vec![attr("b", "2"), attr("c", "3")]),
        ]);
        let paths: Vec<_> = list.validate().into_iter().map(|i| (i.path, i.message)).collect();
        assert_eq!(
            paths,
            vec![
                (vec![2], "operator follows another operator".to_string()),
                (vec![3, 1], "missing operator between operands".to_string()),
            ]
        );
    }

    #[test]
    fn test_apply_rejects_malformed_sequence() {
        let mut search = AdvancedSearch::new("Control");
        search.filter_items = FilterList::from(vec![attr("Title", "x"), create_operator(None)]);
        assert!(search.apply().is_err());
        assert_eq!(search.applied_filter_items().len(), 1);
    }

    #[test]
    fn test_set_operator() {
        let mut list = FilterList::from(vec![attr("a", "1"), create_operator(None), attr("b", "2")]);
        assert!(list.set_operator(1, LogicalOp::Or));
        assert!(!list.set_operator(0, LogicalOp::Or));
        assert_eq!(list.items()[1], ItemNode::Operator(LogicalOp::Or));
    }

    #[test]
    fn test_validate_reports_nested_paths() {
        let list = FilterList::from(vec![
            attr("", "x"),
            create_operator(None),
            ItemNode::Group(vec![
                attr("Title", "y"),
                create_operator(None),
                create_mapping_criteria(Some(MappingCriteria {
                    object_name: "".to_string(),
                    filter: AttributeFilter::new("Title", "=", "z"),
                    mapped_to: None,
                })),
            ]),
        ]);

        let issues = list.validate();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].path, vec![0]);
        assert_eq!(issues[1].path, vec![2, 2]);
        assert_eq!(issues[1].message, "mapping object is empty");
    }

    #[test]
    fn test_apply_snapshots_and_discard_restores() {
        let mut search = AdvancedSearch::new("Control");
        search.filter_items.add(attr("Title", "plan"));
        assert_eq!(search.applied_filter_items().len(), 1);

        search.apply().unwrap();
        assert_eq!(search.applied_filter_items().len(), 3);

        search.filter_items.add(attr("Owner", "me"));
        search.discard();
        assert_eq!(search.filter_items.len(), 3);
    }

    #[test]
    fn test_apply_rejects_invalid_items() {
        let mut search = AdvancedSearch::new("Control");
        search.filter_items.add(attr("", "plan"));
        assert!(search.apply().is_err());
        assert_eq!(search.applied_filter_items().len(), 1);
    }

    #[test]
    fn test_reset_restores_default_state_item() {
        let mut search = AdvancedSearch::new("Risk");
        search.filter_items.add(attr("Title", "plan"));
        search.mapping_items.add(create_mapping_criteria(None));
        search.reset();

        assert!(search.mapping_items.is_empty());
        match search.filter_items.items() {
            [ItemNode::State(state)] => assert_eq!(state.model_name, "Risk"),
            other => panic!("Expected single state item, got {:?}", other),
        }
    }

    #[test]
    fn test_build_request_joins_filters_and_mappings() {
        let mut registry = StateRegistry::default();
        registry.insert("Control", StateVocabulary::new(&["Draft", "Active"]));

        let mut search = AdvancedSearch::new("Control");
        search.filter_items = FilterList::from(vec![attr("Title", "plan")]);
        search.mapping_items.add(create_mapping_criteria(Some(MappingCriteria {
            object_name: "Standard".to_string(),
            filter: AttributeFilter::new("Title", "=", "ISO"),
            mapped_to: None,
        })));
        search.apply().unwrap();

        let request = search.build_request(&registry, QueryType::Values).unwrap();
        assert_eq!(request.sub_requests.len(), 1);
        assert_eq!(request.main.object_name, "Control");
        assert_eq!(
            serde_json::to_value(&request.main.filters).unwrap(),
            json!({"expression": {
                "left": {"left": "Title", "op": {"name": "="}, "right": "plan"},
                "op": {"name": "AND"},
                "right": {"object_name": "__previous__", "op": {"name": "relevant"}, "ids": [0]},
            }})
        );
    }

    #[test]
    fn test_default_search_matches_everything() {
        let search = AdvancedSearch::new("Control");
        let request = search
            .build_request(&StateRegistry::default(), QueryType::Count)
            .unwrap();
        assert!(request.sub_requests.is_empty());
        assert_eq!(request.main.filters, FilterExpression::empty());
        assert_eq!(request.main.query_type, QueryType::Count);
    }
}
