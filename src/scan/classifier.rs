use chrono::NaiveDate;
use serde::Serialize;

use super::host::NodeShape;
use super::rules::{RuleCategory, RuleTable, SignatureRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    EarlyItem,
    LateItem,
    TargetItem,
    Unclassified,
}

impl From<RuleCategory> for Classification {
    fn from(category: RuleCategory) -> Self {
        match category {
            RuleCategory::Early => Self::EarlyItem,
            RuleCategory::Late => Self::LateItem,
            RuleCategory::Target => Self::TargetItem,
        }
    }
}

/// Matches inserted nodes against every rule generation still in effect.
#[derive(Debug, Clone)]
pub struct NodeClassifier {
    provider_prefix: String,
    rules: Vec<SignatureRule>,
}

impl NodeClassifier {
    pub fn new(table: &RuleTable, as_of: NaiveDate) -> Self {
        Self {
            provider_prefix: table.provider_prefix.clone(),
            rules: table.active_on(as_of),
        }
    }

    pub fn rules(&self) -> &[SignatureRule] {
        &self.rules
    }

    pub fn classify(&self, shape: Option<NodeShape<'_>>) -> Classification {
        self.matching_rule(shape)
            .map(|rule| Classification::from(rule.category))
            .unwrap_or(Classification::Unclassified)
    }

    /// False for text and comment nodes and for elements outside the provider's namespace.
    pub fn is_candidate(&self, shape: Option<NodeShape<'_>>) -> bool {
        shape.is_some_and(|shape| shape.local_name.starts_with(&self.provider_prefix))
    }

    pub fn matching_rule(&self, shape: Option<NodeShape<'_>>) -> Option<&SignatureRule> {
        if !self.is_candidate(shape) {
            return None;
        }
        let shape = shape?;
        self.rules
            .iter()
            .find(|rule| rule.local_name == shape.local_name && shape.has_class(&rule.class_name))
    }
}
