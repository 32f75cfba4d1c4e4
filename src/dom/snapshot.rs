//! Snapshot parser
//!
//! Decodes the `DOMSnapshot.captureSnapshot` wire format (parallel node arrays,
//! a layout table and one shared string table) into capture-ordered element records.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use super::PerceptionError;
use super::element::{ElementRecord, Rect};
use super::indexer::is_element_clickable;

#[derive(Debug, Default, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    strings: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    nodes: RawNodes,
    #[serde(default)]
    layout: RawLayout,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNodes {
    #[serde(default)]
    parent_index: Vec<i64>,
    #[serde(default)]
    node_name: Vec<i64>,
    #[serde(default)]
    node_value: Vec<i64>,
    #[serde(default)]
    backend_node_id: Vec<i64>,
    #[serde(default)]
    attributes: Vec<Vec<i64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLayout {
    #[serde(default)]
    node_index: Vec<i64>,
    #[serde(default)]
    styles: Vec<Vec<i64>>,
    #[serde(default)]
    bounds: Vec<Vec<f64>>,
}

/// Resolve a string-table index; negative or out-of-range means absent
fn string_at(strings: &[String], index: i64) -> Option<&str> {
    usize::try_from(index)
        .ok()
        .and_then(|i| strings.get(i))
        .map(String::as_str)
}

/// Parse a raw snapshot into element records, one per node in capture order.
///
/// `computed_styles` must be the property list the snapshot was captured with;
/// layout style entries are positional against it.
pub fn parse_snapshot(
    raw: Value,
    computed_styles: &[&str],
) -> Result<Vec<ElementRecord>, PerceptionError> {
    let snapshot: RawSnapshot =
        serde_json::from_value(raw).map_err(|e| PerceptionError::Decode(e.to_string()))?;
    let strings = &snapshot.strings;
    let mut records = Vec::new();

    for doc in &snapshot.documents {
        // Parent indices are document-local; shift them into the flattened list
        let base = records.len();
        let nodes = &doc.nodes;
        let layout = &doc.layout;

        let layout_rows: HashMap<i64, usize> = layout
            .node_index
            .iter()
            .enumerate()
            .map(|(row, node)| (*node, row))
            .collect();
        let node_count = nodes.backend_node_id.len();
        let laid_out: HashSet<usize> = layout_rows
            .keys()
            .filter_map(|n| usize::try_from(*n).ok())
            .filter(|n| *n < node_count)
            .collect();

        for (i, backend_id) in nodes.backend_node_id.iter().enumerate() {
            let mut attributes = HashMap::new();
            if let Some(pairs) = nodes.attributes.get(i) {
                for pair in pairs.chunks(2) {
                    let [name_idx, value_idx] = pair else { continue };
                    if let (Some(name), Some(value)) =
                        (string_at(strings, *name_idx), string_at(strings, *value_idx))
                    {
                        attributes.insert(name.to_lowercase(), value.to_string());
                    }
                }
            }

            let tag_name = nodes
                .node_name
                .get(i)
                .and_then(|idx| string_at(strings, *idx))
                .unwrap_or_default()
                .to_lowercase();
            let text_content = nodes
                .node_value
                .get(i)
                .and_then(|idx| string_at(strings, *idx))
                .unwrap_or_default()
                .trim()
                .to_string();
            let parent = nodes
                .parent_index
                .get(i)
                .and_then(|p| usize::try_from(*p).ok())
                .map(|p| base + p);

            let row = layout_rows.get(&(i as i64)).copied();
            let style_hints = row
                .and_then(|r| layout.styles.get(r))
                .map(|values| {
                    computed_styles
                        .iter()
                        .zip(values)
                        .filter_map(|(name, idx)| {
                            string_at(strings, *idx).map(|v| (name.to_string(), v.to_string()))
                        })
                        .collect()
                })
                .unwrap_or_default();
            let bounds = row
                .and_then(|r| layout.bounds.get(r))
                .and_then(|b| match b.as_slice() {
                    [x, y, width, height, ..] => Some(Rect {
                        x: *x,
                        y: *y,
                        width: *width,
                        height: *height,
                    }),
                    _ => None,
                });

            let clickable = is_element_clickable(&tag_name, &attributes);
            records.push(ElementRecord {
                node_index: base + i,
                backend_node_id: *backend_id,
                tag_name,
                attributes,
                text_content,
                clickable,
                visible: laid_out.contains(&i),
                parent,
                highlight_index: None,
                style_hints,
                bounds,
            });
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SNAPSHOT_COMPUTED_STYLES;
    use serde_json::json;

    fn sample() -> Value {
        // 0: #document, 1: HTML, 2: A(href), 3: #text "  Home \n", 4: DIV (no layout)
        json!({
            "strings": ["#document", "HTML", "A", "HREF", "/home", "#text", "  Home \n", "DIV", "block", "visible", "1"],
            "documents": [{
                "nodes": {
                    "parentIndex": [-1, 0, 1, 2, 1],
                    "nodeName": [0, 1, 2, 5, 7],
                    "nodeValue": [-1, -1, -1, 6, -1],
                    "backendNodeId": [10, 11, 12, 13, 14],
                    "attributes": [[], [], [3, 4, -1, 4], [], []]
                },
                "layout": {
                    "nodeIndex": [1, 2, 3],
                    "styles": [[8, 9, 10], [8, 9, 10], [8, 9, 10]],
                    "bounds": [[0, 0, 800, 600], [5, 5, 40, 10], [5, 5, 40, 10]]
                }
            }]
        })
    }

    #[test]
    fn decodes_nodes_in_capture_order() {
        let records = parse_snapshot(sample(), &SNAPSHOT_COMPUTED_STYLES).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[2].tag_name, "a");
        assert_eq!(records[2].attribute("href"), Some("/home"));
        // key index -1 skips the pair
        assert_eq!(records[2].attributes.len(), 1);
        assert_eq!(records[3].text_content, "Home");
        assert_eq!(records[0].text_content, "");
        assert_eq!(records[0].parent, None);
        assert_eq!(records[3].parent, Some(2));
        assert_eq!(records[2].backend_node_id, 12);
    }

    #[test]
    fn visibility_is_layout_presence() {
        let records = parse_snapshot(sample(), &SNAPSHOT_COMPUTED_STYLES).unwrap();
        let visible: Vec<bool> = records.iter().map(|r| r.visible).collect();
        assert_eq!(visible, vec![false, true, true, true, false]);
        assert_eq!(records[2].style_hints.get("display").map(String::as_str), Some("block"));
        assert_eq!(records[2].bounds.map(|b| b.width), Some(40.0));
        assert!(records[4].bounds.is_none());
    }

    #[test]
    fn clickability_is_computed_per_record() {
        let records = parse_snapshot(sample(), &SNAPSHOT_COMPUTED_STYLES).unwrap();
        assert!(records[2].clickable);
        assert!(!records[4].clickable);
    }

    #[test]
    fn flattens_documents_with_offset_parents() {
        let raw = json!({
            "strings": ["#document", "BUTTON"],
            "documents": [
                {"nodes": {"parentIndex": [-1, 0], "nodeName": [0, 1], "nodeValue": [-1, -1], "backendNodeId": [1, 2]}},
                {"nodes": {"parentIndex": [-1, 0], "nodeName": [0, 1], "nodeValue": [-1, -1], "backendNodeId": [3, 4]}}
            ]
        });
        let records = parse_snapshot(raw, &[]).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].parent, Some(2));
        assert_eq!(records[3].node_index, 3);
    }

    #[test]
    fn attribute_keys_are_case_folded() {
        let raw = json!({
            "strings": ["DIV", "Role", "button"],
            "documents": [{"nodes": {"nodeName": [0], "nodeValue": [-1], "backendNodeId": [7], "attributes": [[1, 2]]}}]
        });
        let records = parse_snapshot(raw, &[]).unwrap();
        assert_eq!(records[0].attribute("role"), Some("button"));
        assert!(records[0].clickable);
    }

    #[test]
    fn malformed_snapshot_is_a_decode_error() {
        let err = parse_snapshot(json!({"documents": "nope"}), &[]).unwrap_err();
        assert!(matches!(err, PerceptionError::Decode(_)));
    }
}
