//! Compressed, paged adjacency lists
//!
//! All target lists live back to back in one paged byte array. Two per-node
//! index arrays locate a node's list: the byte offset of its first delta and
//! its degree. A list may straddle a page boundary; [`AdjacencyCursor`]
//! follows it onto the next page.

use super::NodeId;
use super::compression::{apply_delta, decode_varint};
use crate::paged::PagedArray;
use crate::{Error, Result};
use tracing::error;

/// Read-only adjacency lists of all nodes
#[derive(Debug, Clone)]
pub struct AdjacencyStore {
    targets: PagedArray<u8>,
    offsets: PagedArray<u64>,
    degrees: PagedArray<u32>,
}

impl AdjacencyStore {
    pub(crate) fn new(
        targets: PagedArray<u8>,
        offsets: PagedArray<u64>,
        degrees: PagedArray<u32>,
    ) -> Result<Self> {
        if offsets.len() != degrees.len() {
            return Err(Error::internal(format!(
                "adjacency index mismatch: {} offsets for {} degrees",
                offsets.len(),
                degrees.len()
            )));
        }
        Ok(Self {
            targets,
            offsets,
            degrees,
        })
    }

    /// Number of nodes with an index entry
    pub fn node_count(&self) -> u64 {
        self.degrees.len()
    }

    /// Number of relationships of `node`
    pub fn degree(&self, node: NodeId) -> Result<u32> {
        self.degrees.get(node)
    }

    /// Iterate the targets of `node` in insertion order
    pub fn cursor(&self, node: NodeId) -> Result<AdjacencyCursor<'_>> {
        let degree = self.degrees.get(node)?;
        let offset = self.offsets.get(node)?;
        Ok(AdjacencyCursor::new(&self.targets, node, offset, degree))
    }

    /// Size of the compressed target pages in bytes
    pub fn compressed_size(&self) -> u64 {
        self.targets.len()
    }

    /// Bytes held by target and index pages
    pub fn memory_usage(&self) -> usize {
        self.targets.memory_usage() + self.offsets.memory_usage() + self.degrees.memory_usage()
    }
}

/// Decoding iterator over one adjacency list
#[derive(Debug, Clone)]
pub struct AdjacencyCursor<'a> {
    bytes: &'a PagedArray<u8>,
    page: &'a [u8],
    page_index: usize,
    position: usize,
    remaining: u32,
    previous: NodeId,
}

impl<'a> AdjacencyCursor<'a> {
    fn new(bytes: &'a PagedArray<u8>, source: NodeId, offset: u64, degree: u32) -> Self {
        let layout = bytes.layout();
        let page_index = layout.page_index(offset);
        let page: &'a [u8] = if degree == 0 {
            &[]
        } else {
            bytes.page(page_index).unwrap_or(&[])
        };
        Self {
            bytes,
            page,
            page_index,
            position: layout.index_in_page(offset),
            remaining: degree,
            previous: source,
        }
    }

    /// Targets not yet returned
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    fn next_byte(&mut self) -> Option<u8> {
        if self.position == self.page.len() {
            self.page_index += 1;
            self.page = self.bytes.page(self.page_index)?;
            self.position = 0;
        }
        let byte = self.page.get(self.position).copied();
        self.position += 1;
        byte
    }
}

impl Iterator for AdjacencyCursor<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let decoded = decode_varint(&mut std::iter::from_fn(|| self.next_byte()));
        let Some(encoded) = decoded else {
            error!(
                remaining = self.remaining,
                "Adjacency list ends before its recorded degree"
            );
            debug_assert_eq!(self.remaining, 0, "truncated adjacency list");
            self.remaining = 0;
            return None;
        };
        self.previous = apply_delta(self.previous, encoded);
        self.remaining -= 1;
        Some(self.previous)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}
