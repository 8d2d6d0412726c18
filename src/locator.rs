//! Embedded-data locator.
//!
//! The search page ships its initial ad state inside `<script type="application/json">`
//! blobs, and later batches arrive as API response bodies. Both carry the same
//! marker object (`ad_library_main`) somewhere inside an otherwise unknown JSON
//! tree. This module finds JSON values inside raw text, searches them for the
//! marker and turns its result edges into ad groups.
//!
//! Traversal order is deterministic: object keys are visited in
//! `serde_json::Map` order (sorted), an object's own keys are checked before
//! its values are descended into, and array elements are visited in order.
//! The first populated match wins.

use serde_json::{Deserializer, Value};
use tracing::{debug, info};

use crate::config::INIT_DATA_KEY;
use crate::error::ExtractError;

/// Ads the feed collates together. May hold a single ad.
pub type RawAdGroup = Vec<Value>;

/// Iterator over every JSON object or array embedded in a piece of text.
///
/// Each `{` or `[` is tried as the start of a value; on success the scan
/// resumes right after the parsed value, so yielded segments never overlap.
pub struct JsonSegments<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> JsonSegments<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl Iterator for JsonSegments<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let start = self.pos + rest.find(|c: char| c == '{' || c == '[')?;

            let mut stream = Deserializer::from_str(&self.text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(value)) => {
                    self.pos = start + stream.byte_offset();
                    return Some(value);
                }
                _ => self.pos = start + 1,
            }
        }
        None
    }
}

/// `false` for null, false, 0, "" and empty containers.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Depth-first search for `key`, returning the first non-null value bound to it.
pub fn find_nested_value<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    match data {
        Value::Object(map) => {
            if let Some(found) = map.get(key).filter(|v| !v.is_null()) {
                return Some(found);
            }
            map.values().find_map(|value| find_nested_value(value, key))
        }
        Value::Array(items) => items.iter().find_map(|item| find_nested_value(item, key)),
        _ => None,
    }
}

/// Locate the marker object in a single piece of text (script body or response body).
pub fn find_marker_in_text(text: &str, key: &str) -> Option<Value> {
    if !text.contains(key) {
        return None;
    }

    JsonSegments::new(text).find_map(|segment| {
        find_nested_value(&segment, key)
            .filter(|found| is_populated(found))
            .cloned()
    })
}

/// Locate the marker object across the page's JSON script blocks.
///
/// Scripts that don't mention the marker are not parsed at all.
pub fn find_init_data<S: AsRef<str>>(scripts: &[S]) -> Option<Value> {
    let found = scripts
        .iter()
        .find_map(|script| find_marker_in_text(script.as_ref(), INIT_DATA_KEY));

    if found.is_some() {
        info!("Found {}", INIT_DATA_KEY);
    } else {
        debug!(scripts = scripts.len(), "{} not present in any script", INIT_DATA_KEY);
    }
    found
}

/// Keep `node.collated_results` of every edge that has a populated one.
pub fn parse_edges(edges: &[Value]) -> Vec<RawAdGroup> {
    edges
        .iter()
        .filter_map(|edge| edge.get("node").filter(|node| node.is_object()))
        .filter_map(|node| node.get("collated_results"))
        .filter(|results| is_populated(results))
        .filter_map(|results| results.as_array().cloned())
        .collect()
}

/// Pull `search_results_connection.edges` out of a marker object.
pub fn edges_of(marker: &Value) -> Result<&[Value], ExtractError> {
    marker
        .get("search_results_connection")
        .and_then(|connection| connection.get("edges"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(ExtractError::MissingEdges)
}

/// Full initial-render extraction: marker lookup, edges, ad groups.
pub fn extract_initial_groups<S: AsRef<str>>(scripts: &[S]) -> Result<Vec<RawAdGroup>, ExtractError> {
    let init_data = find_init_data(scripts).ok_or(ExtractError::MarkerNotFound(INIT_DATA_KEY))?;
    let edges = edges_of(&init_data)?;
    Ok(parse_edges(edges))
}
