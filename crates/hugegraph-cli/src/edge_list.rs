//! Edge-list CSV reader
//!
//! One relationship per line: `source,target[,value]`. Blank lines and lines
//! starting with `#` are skipped, and so is a first line that does not start
//! with a node id (a header). Node ids must be integers in
//! `[0, MAX_NODE_COUNT)`; the node count is the largest id plus one.

use anyhow::{Context, Result, bail};
use hugegraph_core::loader::{InMemorySource, PropertyValue};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Upper bound on the node count an edge list may imply
pub const MAX_NODE_COUNT: u64 = 1 << 32;

/// Read the file at `path`, storing the optional third column under
/// `property_key`
pub fn read_edge_list_file(path: &Path, property_key: &str) -> Result<InMemorySource> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_edge_list(BufReader::new(file), property_key)
        .with_context(|| format!("failed to read edge list {}", path.display()))
}

/// Parse an edge list from `reader`
pub fn read_edge_list(reader: impl BufRead, property_key: &str) -> Result<InMemorySource> {
    let mut edges: Vec<(u64, u64, Option<PropertyValue>)> = Vec::new();
    let mut max_id: Option<u64> = None;
    let mut first_record = true;

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let is_header = first_record && fields[0].parse::<u64>().is_err();
        first_record = false;
        if is_header {
            continue;
        }
        if fields.len() < 2 || fields.len() > 3 {
            bail!("line {}: expected source,target[,value], got '{}'", number + 1, line);
        }

        let source = parse_id(fields[0], number + 1)?;
        let target = parse_id(fields[1], number + 1)?;
        let value = fields.get(2).map(|raw| parse_value(raw));

        max_id = Some(max_id.map_or(source.max(target), |m| m.max(source).max(target)));
        edges.push((source, target, value));
    }

    let node_count = match max_id {
        None => 0,
        Some(max_id) => max_id
            .checked_add(1)
            .filter(|count| *count <= MAX_NODE_COUNT)
            .with_context(|| {
                format!("node id {} exceeds the limit of {} nodes", max_id, MAX_NODE_COUNT)
            })?,
    };

    let mut graph = InMemorySource::new(node_count);
    for (source, target, value) in edges {
        match value {
            Some(value) => graph.add_relationship_with_property(source, target, property_key, value),
            None => graph.add_relationship(source, target),
        }
    }
    Ok(graph)
}

fn parse_id(raw: &str, line: usize) -> Result<u64> {
    raw.parse::<u64>()
        .with_context(|| format!("line {}: '{}' is not a node id", line, raw))
}

fn parse_value(raw: &str) -> PropertyValue {
    if let Ok(value) = raw.parse::<i64>() {
        return PropertyValue::Long(value);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return PropertyValue::Double(value);
    }
    match raw {
        "true" => PropertyValue::Boolean(true),
        "false" => PropertyValue::Boolean(false),
        _ => PropertyValue::Text(raw.to_string()),
    }
}
