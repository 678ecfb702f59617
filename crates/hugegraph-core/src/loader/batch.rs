//! Per-batch import and flush into the shared page stores
//!
//! A batch owns a contiguous node range. Importing reads its relationships
//! from the source into a private [`BatchFragment`]; flushing copies the
//! fragment into its pre-computed region of the shared stores. Regions of
//! different fragments never overlap, so flushes only meet at the lazy page
//! allocation of pages they share.

use super::source::RelationshipSource;
use crate::graph::NodeId;
use crate::graph::compression::encode_targets;
use crate::paged::PageStore;
use crate::{Error, Result};
use std::ops::Range;

/// Relationship property requested for a load
#[derive(Debug, Clone, Copy)]
pub(crate) struct PropertyRequest<'a> {
    pub key: &'a str,
    pub default_value: f64,
}

/// Relationships of one batch, encoded and ready to flush
#[derive(Debug, Default)]
pub(crate) struct BatchFragment {
    nodes: Range<NodeId>,
    bytes: Vec<u8>,
    byte_offsets: Vec<u64>,
    degrees: Vec<u32>,
    relationship_offsets: Vec<u64>,
    properties: Vec<f64>,
    relationship_count: u64,
}

impl BatchFragment {
    /// Read all relationships of `nodes` from `source`
    pub fn import(
        source: &(impl RelationshipSource + ?Sized),
        nodes: Range<NodeId>,
        node_count: u64,
        property: Option<PropertyRequest<'_>>,
    ) -> Result<Self> {
        let batch_len = (nodes.end - nodes.start) as usize;
        let mut fragment = Self {
            nodes: nodes.clone(),
            byte_offsets: Vec::with_capacity(batch_len),
            degrees: Vec::with_capacity(batch_len),
            relationship_offsets: Vec::with_capacity(batch_len),
            ..Self::default()
        };

        let mut targets: Vec<NodeId> = Vec::new();
        for node in nodes.clone() {
            targets.clear();
            let mut failure: Option<Error> = None;

            source.for_each_relationship_of_node(
                node,
                property.map(|p| p.key),
                &mut |target, value| {
                    if failure.is_some() {
                        return;
                    }
                    if target >= node_count {
                        failure = Some(Error::load(
                            nodes.start,
                            nodes.end,
                            format!(
                                "relationship ({})->({}) points outside [0, {})",
                                node, target, node_count
                            ),
                        ));
                        return;
                    }
                    if let Some(request) = property {
                        let numeric = match value {
                            None => request.default_value,
                            Some(value) => match value.as_f64() {
                                Some(numeric) => numeric,
                                None => {
                                    failure = Some(Error::load(
                                        nodes.start,
                                        nodes.end,
                                        format!(
                                            "property '{}' of relationship ({})->({}) is {} but a numeric value was requested",
                                            request.key,
                                            node,
                                            target,
                                            value.type_name()
                                        ),
                                    ));
                                    return;
                                }
                            },
                        };
                        fragment.properties.push(numeric);
                    }
                    targets.push(target);
                },
            );

            if let Some(err) = failure {
                return Err(err);
            }

            let degree = u32::try_from(targets.len()).map_err(|_| {
                Error::load(
                    nodes.start,
                    nodes.end,
                    format!("node {} has {} relationships, more than a list can hold", node, targets.len()),
                )
            })?;

            fragment.byte_offsets.push(fragment.bytes.len() as u64);
            fragment.relationship_offsets.push(fragment.relationship_count);
            fragment.degrees.push(degree);
            fragment.relationship_count += degree as u64;
            encode_targets(node, &targets, &mut fragment.bytes);
        }

        Ok(fragment)
    }

    /// Compressed size of the fragment's target lists
    pub fn byte_len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Relationships imported by this batch
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    /// Node range of the batch
    pub fn nodes(&self) -> &Range<NodeId> {
        &self.nodes
    }

    /// Copy the fragment into `stores`, starting at the given global byte and
    /// relationship positions
    pub fn flush(&self, stores: &BuildStores, placement: Placement) -> Result<()> {
        stores.targets.set_range(placement.byte_offset, &self.bytes)?;

        let offsets: Vec<u64> = self
            .byte_offsets
            .iter()
            .map(|offset| offset + placement.byte_offset)
            .collect();
        stores.offsets.set_range(self.nodes.start, &offsets)?;
        stores.degrees.set_range(self.nodes.start, &self.degrees)?;

        if let Some(properties) = &stores.properties {
            properties
                .values
                .set_range(placement.relationship_offset, &self.properties)?;
            let offsets: Vec<u64> = self
                .relationship_offsets
                .iter()
                .map(|offset| offset + placement.relationship_offset)
                .collect();
            properties.offsets.set_range(self.nodes.start, &offsets)?;
        }
        Ok(())
    }
}

/// Global start positions of one fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Placement {
    pub byte_offset: u64,
    pub relationship_offset: u64,
}

/// Assign consecutive regions to fragments in batch order.
///
/// Returns one placement per fragment plus the total byte and relationship
/// counts. The layout depends only on the source, never on scheduling.
pub(crate) fn place(fragments: &[BatchFragment]) -> (Vec<Placement>, Placement) {
    let mut total = Placement::default();
    let placements = fragments
        .iter()
        .map(|fragment| {
            let placement = total;
            total.byte_offset += fragment.byte_len();
            total.relationship_offset += fragment.relationship_count();
            placement
        })
        .collect();
    (placements, total)
}

/// Shared stores written during the flush phase
pub(crate) struct BuildStores {
    pub targets: PageStore<u8>,
    pub offsets: PageStore<u64>,
    pub degrees: PageStore<u32>,
    pub properties: Option<PropertyBuildStores>,
}

/// Property side of [`BuildStores`]
pub(crate) struct PropertyBuildStores {
    pub values: PageStore<f64>,
    pub offsets: PageStore<u64>,
}

impl BuildStores {
    /// Allocate page tables for `node_count` nodes and the placed totals
    pub fn new(node_count: u64, total: Placement, with_properties: bool) -> Result<Self> {
        let properties = if with_properties {
            Some(PropertyBuildStores {
                values: PageStore::new(total.relationship_offset)?,
                offsets: PageStore::new(node_count)?,
            })
        } else {
            None
        };
        Ok(Self {
            targets: PageStore::new(total.byte_offset)?,
            offsets: PageStore::new(node_count)?,
            degrees: PageStore::new(node_count)?,
            properties,
        })
    }
}
