//! State serializer: one compact line per element worth showing the oracle
//!
//! Line shape: `[i_3] <a href='/docs'> Documentation`. Non-indexed lines start
//! with blank padding instead of the marker. The marker syntax is what
//! `tools::parse_index` accepts back.

use super::element::ElementRecord;

/// Maximum characters of derived text per line
pub const MAX_TEXT_CHARS: usize = 50;

/// Attributes passed through to the serialized line
const PASSTHROUGH_ATTRIBUTES: &[&str] = &["href", "name"];

pub fn handle_marker(index: usize) -> String {
    format!("[i_{}]", index)
}

/// First non-empty of text content, `aria-label`, `placeholder`, `value`
pub fn derived_text(el: &ElementRecord) -> String {
    let candidates = [
        Some(el.text_content.trim()),
        el.attribute("aria-label"),
        el.attribute("placeholder"),
        el.attribute("value"),
    ];
    let text = candidates
        .into_iter()
        .flatten()
        .find(|t| !t.trim().is_empty())
        .unwrap_or_default();

    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_TEXT_CHARS)
        .collect()
}

/// Render elements in list order; elements with neither an index nor text are dropped
pub fn serialize_elements(elements: &[ElementRecord]) -> String {
    // non-indexed lines are padded to the widest marker of this cycle
    let marker_width = elements
        .iter()
        .filter_map(|el| el.highlight_index)
        .map(|index| handle_marker(index).len())
        .max()
        .unwrap_or_else(|| handle_marker(0).len());
    let blank = " ".repeat(marker_width);
    let mut lines = Vec::new();

    for el in elements {
        let text = derived_text(el);
        if el.highlight_index.is_none() && text.is_empty() {
            continue;
        }

        let prefix = match el.highlight_index {
            Some(index) => handle_marker(index),
            None => blank.clone(),
        };

        let attrs: Vec<String> = PASSTHROUGH_ATTRIBUTES
            .iter()
            .filter_map(|name| el.attribute(name).map(|v| format!("{}='{}'", name, v)))
            .collect();
        let open_tag = if attrs.is_empty() {
            format!("<{}>", el.tag_name)
        } else {
            format!("<{} {}>", el.tag_name, attrs.join(" "))
        };

        let line = if text.is_empty() {
            format!("{} {}", prefix, open_tag)
        } else {
            format!("{} {} {}", prefix, open_tag, text)
        };
        lines.push(line);
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::indexer::index_elements;
    use std::collections::HashMap;

    fn el(tag: &str, text: &str, pairs: &[(&str, &str)], clickable: bool) -> ElementRecord {
        ElementRecord {
            node_index: 0,
            backend_node_id: 1,
            tag_name: tag.to_string(),
            attributes: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text_content: text.to_string(),
            clickable,
            visible: true,
            parent: None,
            highlight_index: None,
            style_hints: HashMap::new(),
            bounds: None,
        }
    }

    #[test]
    fn drops_silent_non_indexed_elements() {
        let (filtered, _) = index_elements(
            vec![
                el("div", "", &[], false),
                el("input", "", &[("placeholder", "Search")], false),
            ],
            1,
        );
        let out = serialize_elements(&filtered);
        assert_eq!(out, "      <input> Search");
    }

    #[test]
    fn text_precedence() {
        let e = el("button", "", &[("aria-label", "Close"), ("value", "x")], true);
        assert_eq!(derived_text(&e), "Close");
        let e = el("input", "", &[("aria-label", ""), ("value", "Go")], true);
        assert_eq!(derived_text(&e), "Go");
        let e = el("a", " Docs ", &[("aria-label", "Documentation")], true);
        assert_eq!(derived_text(&e), "Docs");
    }

    #[test]
    fn text_is_single_line_and_bounded() {
        let long = format!("first\nsecond {}", "é".repeat(80));
        let e = el("p", &long, &[], false);
        let text = derived_text(&e);
        assert!(!text.contains('\n'));
        assert!(text.starts_with("first second "));
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn indexed_line_carries_marker_and_passthrough_attributes() {
        let (filtered, _) = index_elements(
            vec![
                el("a", "Home", &[("href", "/"), ("class", "nav")], true),
                el("input", "", &[("name", "q")], true),
            ],
            1,
        );
        let out = serialize_elements(&filtered);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "[i_0] <a href='/'> Home");
        assert_eq!(lines[1], "[i_1] <input name='q'>");
    }

    #[test]
    fn marker_round_trips_through_index_parser() {
        let marker = handle_marker(12);
        assert_eq!(
            crate::tools::parse_index(&serde_json::Value::String(marker)).unwrap(),
            12
        );
    }

    #[test]
    fn padding_matches_widest_marker() {
        let mut elements: Vec<ElementRecord> = (0..12).map(|_| el("button", "", &[], true)).collect();
        elements.push(el("p", "Total", &[], false));
        let (filtered, _) = index_elements(elements, 1);

        let out = serialize_elements(&filtered);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[11], "[i_11] <button>");
        assert_eq!(lines[12], "       <p> Total");
        assert_eq!(lines[12].find('<'), lines[11].find('<'));
    }
}
