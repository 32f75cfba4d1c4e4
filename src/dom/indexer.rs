//! Interactivity filter and ephemeral indexer

use std::collections::{BTreeMap, HashMap};

use super::element::ElementRecord;

/// Tags that are always interactive
const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "details", "summary",
];

/// ARIA roles that make any element interactive
const INTERACTIVE_ROLES: &[&str] = &["button", "link", "menuitem", "option", "checkbox", "radio"];

/// Clickability rule: interactive tag, interactive ARIA role, a non-empty inline
/// click handler, or `contenteditable="true"`.
pub fn is_element_clickable(tag_name: &str, attributes: &HashMap<String, String>) -> bool {
    if INTERACTIVE_TAGS.contains(&tag_name) {
        return true;
    }
    if attributes
        .get("role")
        .is_some_and(|role| INTERACTIVE_ROLES.contains(&role.as_str()))
    {
        return true;
    }
    attributes.get("onclick").is_some_and(|h| !h.is_empty())
        || attributes.get("contenteditable").is_some_and(|v| v == "true")
}

/// Ephemeral index → element map for exactly one perception cycle.
///
/// Replaced wholesale at the start of every cycle; never merged.
#[derive(Debug, Clone, Default)]
pub struct HandleMap {
    cycle: u64,
    entries: BTreeMap<usize, ElementRecord>,
}

impl HandleMap {
    /// An empty map for `cycle`; every lookup fails until the cycle is indexed
    pub fn empty(cycle: u64) -> Self {
        Self {
            cycle,
            entries: BTreeMap::new(),
        }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Look up an ephemeral index; negative indices never resolve
    pub fn get(&self, index: i64) -> Option<&ElementRecord> {
        usize::try_from(index).ok().and_then(|i| self.entries.get(&i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }
}

/// Keep visible elements and hand out `0..n` to the clickable ones in capture order.
///
/// Visible non-clickable elements stay in the output (their text is still useful)
/// but get no index and no map entry.
pub fn index_elements(elements: Vec<ElementRecord>, cycle: u64) -> (Vec<ElementRecord>, HandleMap) {
    let mut map = HandleMap::empty(cycle);
    let mut counter = 0usize;
    let mut filtered = Vec::new();

    for mut el in elements.into_iter().filter(|el| el.visible) {
        if el.clickable {
            el.highlight_index = Some(counter);
            map.entries.insert(counter, el.clone());
            counter += 1;
        }
        filtered.push(el);
    }

    (filtered, map)
}
