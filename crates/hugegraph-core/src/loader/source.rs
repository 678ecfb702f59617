//! Relationship sources consumed by the loader

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property value as exposed by a source store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Integer value
    Long(i64),
    /// Floating point value
    Double(f64),
    /// Boolean value
    Boolean(bool),
    /// String value
    Text(String),
}

impl PropertyValue {
    /// Numeric view of the value; `None` for non-numeric kinds
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Long(value) => Some(*value as f64),
            Self::Double(value) => Some(*value),
            Self::Boolean(_) | Self::Text(_) => None,
        }
    }

    /// Name of the value kind, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Long(_) => "Long",
            Self::Double(_) => "Double",
            Self::Boolean(_) => "Boolean",
            Self::Text(_) => "Text",
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Long(value as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Store the loader reads relationships from.
///
/// Implementations must be callable from several worker threads at once;
/// each call only concerns one source node.
pub trait RelationshipSource: Sync {
    /// Number of nodes; ids are `[0, node_count)`
    fn node_count(&self) -> u64;

    /// Visit every outgoing relationship of `node` with the value of
    /// `property_key`, if one was requested and the relationship has it
    fn for_each_relationship_of_node(
        &self,
        node: NodeId,
        property_key: Option<&str>,
        visitor: &mut dyn FnMut(NodeId, Option<&PropertyValue>),
    );

    /// Some `(source, target)` relationship whose source lies outside
    /// `[0, node_count)`. The loader never visits such nodes and fails the
    /// load when one is reported.
    fn out_of_range_relationship(&self) -> Option<(NodeId, NodeId)> {
        None
    }
}

#[derive(Debug, Clone)]
struct SourceRelationship {
    target: NodeId,
    properties: Vec<(String, PropertyValue)>,
}

/// Relationship source held in memory.
///
/// Ids are not validated here, so malformed stores can be modelled.
/// Relationships are kept per source node in a sparse map.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    node_count: u64,
    relationships: BTreeMap<NodeId, Vec<SourceRelationship>>,
    relationship_count: u64,
}

impl InMemorySource {
    /// Create a source with `node_count` nodes and no relationships
    pub fn new(node_count: u64) -> Self {
        Self {
            node_count,
            relationships: BTreeMap::new(),
            relationship_count: 0,
        }
    }

    /// Append a node and return its id
    pub fn add_node(&mut self) -> NodeId {
        self.node_count += 1;
        self.node_count - 1
    }

    /// Add a relationship without properties
    pub fn add_relationship(&mut self, source: NodeId, target: NodeId) {
        self.push(source, target, Vec::new());
    }

    /// Add a relationship with one property
    pub fn add_relationship_with_property(
        &mut self,
        source: NodeId,
        target: NodeId,
        key: &str,
        value: impl Into<PropertyValue>,
    ) {
        self.push(source, target, vec![(key.to_string(), value.into())]);
    }

    /// Number of relationships added so far
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    fn push(&mut self, source: NodeId, target: NodeId, properties: Vec<(String, PropertyValue)>) {
        self.relationships
            .entry(source)
            .or_default()
            .push(SourceRelationship { target, properties });
        self.relationship_count += 1;
    }
}

impl RelationshipSource for InMemorySource {
    fn node_count(&self) -> u64 {
        self.node_count
    }

    fn for_each_relationship_of_node(
        &self,
        node: NodeId,
        property_key: Option<&str>,
        visitor: &mut dyn FnMut(NodeId, Option<&PropertyValue>),
    ) {
        let Some(relationships) = self.relationships.get(&node) else {
            return;
        };
        for relationship in relationships {
            let value = property_key.and_then(|key| {
                relationship
                    .properties
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| value)
            });
            visitor(relationship.target, value);
        }
    }

    fn out_of_range_relationship(&self) -> Option<(NodeId, NodeId)> {
        self.relationships
            .range(self.node_count..)
            .find_map(|(source, relationships)| relationships.first().map(|r| (*source, r.target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(PropertyValue::from(3).as_f64(), Some(3.0));
        assert_eq!(PropertyValue::from(2.5).as_f64(), Some(2.5));
        assert_eq!(PropertyValue::from(true).as_f64(), None);
        assert_eq!(PropertyValue::from("heavy").as_f64(), None);
        assert_eq!(PropertyValue::from("heavy").type_name(), "Text");
    }

    #[test]
    fn test_in_memory_source_visits_in_insertion_order() {
        let mut source = InMemorySource::new(3);
        source.add_relationship(0, 2);
        source.add_relationship_with_property(0, 1, "weight", 4);
        source.add_relationship(2, 0);

        let mut seen = Vec::new();
        source.for_each_relationship_of_node(0, Some("weight"), &mut |target, value| {
            seen.push((target, value.and_then(PropertyValue::as_f64)));
        });
        assert_eq!(seen, vec![(2, None), (1, Some(4.0))]);

        let mut count = 0;
        source.for_each_relationship_of_node(1, None, &mut |_, _| count += 1);
        assert_eq!(count, 0);
        assert_eq!(source.relationship_count(), 3);
    }

    #[test]
    fn test_property_is_hidden_without_key() {
        let mut source = InMemorySource::new(2);
        source.add_relationship_with_property(0, 1, "weight", 1.5);

        let mut values = Vec::new();
        source.for_each_relationship_of_node(0, None, &mut |_, value| values.push(value.cloned()));
        assert_eq!(values, vec![None]);
    }

    #[test]
    fn test_reports_relationship_from_unknown_node() {
        let mut source = InMemorySource::new(2);
        source.add_relationship(0, 1);
        assert_eq!(source.out_of_range_relationship(), None);

        source.add_relationship(1_000_000_000_000, 0);
        source.add_relationship(5, 1);
        assert_eq!(source.out_of_range_relationship(), Some((5, 1)));
        assert_eq!(source.relationship_count(), 3);
    }

    #[test]
    fn test_add_node() {
        let mut source = InMemorySource::new(0);
        assert_eq!(source.add_node(), 0);
        assert_eq!(source.add_node(), 1);
        assert_eq!(source.node_count(), 2);
    }

    #[test]
    fn test_property_value_json() {
        let value: PropertyValue = serde_json::from_str("12").unwrap();
        assert_eq!(value, PropertyValue::Long(12));
        let value: PropertyValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(value, PropertyValue::Text("x".to_string()));
    }
}
