//! Style and text mutations with undo
//!
//! Original state is captured once per element at selection time. Later
//! mutations never touch the captured baseline, so a reset always returns to
//! what the page rendered before the inspector changed anything.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::attributes;
use crate::error::Rejection;

use super::correlate::GroupResolution;
use super::dom::{Document, NodeId};
use super::HIGHLIGHT_CLASSES;

/// What an element looked like before the inspector changed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeElementState {
    pub classes: Vec<String>,
    pub text: String,
    pub style_text: String,
    pub dynamic: bool,
}

/// Class list without inspector highlight classes
pub fn visible_classes(doc: &Document, node: NodeId) -> Vec<String> {
    doc.classes(node)
        .iter()
        .filter(|c| !HIGHLIGHT_CLASSES.contains(&c.as_str()))
        .cloned()
        .collect()
}

/// Captured original state keyed by element id
///
/// Elements without an `id` get a synthesized temporary marker attribute that
/// is removed again when their state is restored.
#[derive(Debug, Default)]
pub struct UndoStore {
    entries: BTreeMap<String, RuntimeElementState>,
    next_temp: usize,
}

impl UndoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key of an element, if it already has one
    pub fn key_of(doc: &Document, node: NodeId) -> Option<String> {
        doc.attribute(node, attributes::ID)
            .filter(|id| !id.is_empty())
            .or_else(|| doc.attribute(node, attributes::TEMP_ID))
            .map(str::to_string)
    }

    fn key_or_assign(&mut self, doc: &mut Document, node: NodeId) -> String {
        if let Some(key) = Self::key_of(doc, node) {
            return key;
        }
        self.next_temp += 1;
        let key = format!("inspector-temp-{}", self.next_temp);
        doc.set_attribute(node, attributes::TEMP_ID, &key);
        key
    }

    /// Record the element's current state unless it was captured before
    ///
    /// Returns whether a new entry was created.
    pub fn capture(&mut self, doc: &mut Document, node: NodeId) -> bool {
        let key = self.key_or_assign(doc, node);
        if self.entries.contains_key(&key) {
            return false;
        }
        let state = RuntimeElementState {
            classes: visible_classes(doc, node),
            text: doc.text_content(node),
            style_text: doc.style(node).to_string(),
            dynamic: attributes::is_flag_set(doc.attribute(node, attributes::DYNAMIC)),
        };
        tracing::debug!(key = %key, "captured original state");
        self.entries.insert(key, state);
        true
    }

    pub fn original(&self, doc: &Document, node: NodeId) -> Option<&RuntimeElementState> {
        Self::key_of(doc, node).and_then(|key| self.entries.get(&key))
    }

    pub fn is_captured(&self, doc: &Document, node: NodeId) -> bool {
        self.original(doc, node).is_some()
    }

    /// Put the captured state back and forget it
    ///
    /// Text is only written for non-dynamic elements whose text changed.
    /// Returns false when nothing was captured for the element.
    pub fn restore(&mut self, doc: &mut Document, node: NodeId) -> bool {
        let Some(key) = Self::key_of(doc, node) else {
            return false;
        };
        let Some(state) = self.entries.remove(&key) else {
            return false;
        };

        doc.set_classes(node, state.classes);
        doc.set_style(node, &state.style_text);
        if !state.dynamic && doc.text_content(node) != state.text {
            doc.set_text_content(node, &state.text);
        }
        doc.remove_attribute(node, attributes::TEMP_ID);
        tracing::debug!(key = %key, "restored original state");
        true
    }
}

/// Give every member `new_value` and take away the other exclusive values
///
/// An empty `new_value` only removes.
pub fn apply_style_mutation<S: AsRef<str>>(
    doc: &mut Document,
    members: &[NodeId],
    new_value: &str,
    exclusive: &[S],
) {
    for &node in members {
        for value in exclusive {
            doc.remove_class(node, value.as_ref());
        }
        doc.add_class(node, new_value);
    }
}

/// Replace the text of a static, ungrouped element
pub fn update_text(
    doc: &mut Document,
    group: &GroupResolution,
    new_value: &str,
) -> Result<(), Rejection> {
    let node = *group.members.first().ok_or(Rejection::NoSelection)?;
    if !doc.is_connected(node) {
        return Err(Rejection::Detached);
    }
    let tag = doc.tag(node).to_string();
    if group.is_grouped() {
        return Err(Rejection::GroupedText { tag });
    }
    if attributes::is_flag_set(doc.attribute(node, attributes::DYNAMIC)) {
        return Err(Rejection::DynamicText { tag });
    }
    doc.set_text_content(node, new_value);
    Ok(())
}

/// Restore every member that has captured state; returns how many were restored
pub fn reset_group(doc: &mut Document, store: &mut UndoStore, members: &[NodeId]) -> usize {
    members
        .iter()
        .filter(|node| store.restore(doc, **node))
        .count()
}
