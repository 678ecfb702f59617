//! Relationship property values, parallel to the adjacency lists

use super::NodeId;
use crate::paged::PagedArray;
use crate::{Error, Result};

/// One `f64` per relationship, stored in the same order as the adjacency
/// lists. Relationships without a value in the source hold the mapping
/// default, filled in at load time.
#[derive(Debug, Clone)]
pub struct PropertyStore {
    key: String,
    default_value: f64,
    values: PagedArray<f64>,
    offsets: PagedArray<u64>,
}

impl PropertyStore {
    pub(crate) fn new(
        key: String,
        default_value: f64,
        values: PagedArray<f64>,
        offsets: PagedArray<u64>,
    ) -> Self {
        Self {
            key,
            default_value,
            values,
            offsets,
        }
    }

    /// Source property key that was loaded
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value used for relationships without the property
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Total number of stored values
    pub fn len(&self) -> u64 {
        self.values.len()
    }

    /// True if no relationship carries a value
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values of `node`'s relationships; `degree` comes from the adjacency store
    pub fn values(&self, node: NodeId, degree: u32) -> Result<PropertyCursor<'_>> {
        let start = self.offsets.get(node)?;
        let end = start + degree as u64;
        if end > self.values.len() {
            return Err(Error::internal(format!(
                "property window [{}, {}) of node {} exceeds {} stored values",
                start,
                end,
                node,
                self.values.len()
            )));
        }
        Ok(PropertyCursor {
            values: &self.values,
            next: start,
            end,
        })
    }

    /// Bytes held by value and offset pages
    pub fn memory_usage(&self) -> usize {
        self.values.memory_usage() + self.offsets.memory_usage()
    }
}

/// Iterator over one node's property window
#[derive(Debug, Clone)]
pub struct PropertyCursor<'a> {
    values: &'a PagedArray<f64>,
    next: u64,
    end: u64,
}

impl Iterator for PropertyCursor<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.end {
            return None;
        }
        let value = self.values.get(self.next).ok()?;
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_follow_node_windows() {
        let store = PropertyStore::new(
            "weight".to_string(),
            0.5,
            PagedArray::from_slice(&[1.0, 2.0, 3.0, 4.0]).unwrap(),
            PagedArray::from_slice(&[0u64, 3, 3]).unwrap(),
        );

        assert_eq!(store.key(), "weight");
        assert_eq!(store.default_value(), 0.5);
        assert_eq!(store.values(0, 3).unwrap().collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(store.values(1, 0).unwrap().count(), 0);
        assert_eq!(store.values(2, 1).unwrap().collect::<Vec<_>>(), vec![4.0]);
    }

    #[test]
    fn test_window_past_end_is_rejected() {
        let store = PropertyStore::new(
            "w".to_string(),
            0.0,
            PagedArray::from_slice(&[1.0]).unwrap(),
            PagedArray::from_slice(&[0u64]).unwrap(),
        );
        assert!(matches!(store.values(0, 2), Err(Error::Internal(_))));
        assert!(matches!(store.values(1, 0), Err(Error::Index { .. })));
    }
}
