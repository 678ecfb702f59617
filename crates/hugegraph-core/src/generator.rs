//! Seeded random graph generation
//!
//! Produces an [`InMemorySource`] with a fixed node count and a uniform
//! out-degree drawn around the requested average. The same seed always yields
//! the same source.

use crate::loader::InMemorySource;
use crate::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

/// Relationship property attached by the generator
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProperty {
    /// Property key
    pub name: String,
    /// Values are drawn uniformly from this range
    pub range: Range<f64>,
}

/// Random graph generator
#[derive(Debug, Clone, PartialEq)]
pub struct RandomGraphGenerator {
    node_count: u64,
    average_degree: u64,
    seed: u64,
    property: Option<GeneratedProperty>,
}

impl RandomGraphGenerator {
    /// Generator for `node_count` nodes with `average_degree` relationships
    /// per node
    pub fn new(node_count: u64, average_degree: u64) -> Self {
        Self {
            node_count,
            average_degree,
            seed: 42,
            property: None,
        }
    }

    /// Set the RNG seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Attach `name` to every relationship with values from `range`
    pub fn with_property(mut self, name: impl Into<String>, range: Range<f64>) -> Self {
        self.property = Some(GeneratedProperty {
            name: name.into(),
            range,
        });
        self
    }

    /// Build the source
    pub fn generate(&self) -> Result<InMemorySource> {
        if let Some(property) = &self.property {
            if property.range.is_empty() {
                return Err(Error::config(format!(
                    "property range {:?} is empty",
                    property.range
                )));
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut source = InMemorySource::new(self.node_count);
        if self.node_count == 0 {
            return Ok(source);
        }

        let max_degree = self.average_degree * 2;
        for node in 0..self.node_count {
            let degree = rng.gen_range(0..=max_degree);
            for _ in 0..degree {
                let target = rng.gen_range(0..self.node_count);
                match &self.property {
                    Some(property) => {
                        let value = rng.gen_range(property.range.clone());
                        source.add_relationship_with_property(node, target, &property.name, value);
                    }
                    None => source.add_relationship(node, target),
                }
            }
        }
        Ok(source)
    }
}
