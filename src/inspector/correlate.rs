//! Group correlation over the live document
//!
//! The group-id attribute on the selected element, or on its nearest
//! ancestor, is authoritative. Matching on the concrete id with its
//! `-<index>` suffix stripped is only used when no group-id is present but
//! the element sits inside an array-rendered subtree.

use serde::Serialize;

use crate::attributes::{self, strip_index_suffix};

use super::dom::{Document, NodeId};

/// How a group was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// No group; the selection is the element alone
    Single,
    GroupAttribute,
    IdPattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResolution {
    /// Selected element first, then every other member in document order
    pub members: Vec<NodeId>,
    pub group_id: Option<String>,
    pub strategy: Strategy,
    /// Element carrying the group marker, possibly an ancestor of the selection
    pub anchor: Option<NodeId>,
    /// Whether id-pattern matching would have produced a different set
    pub disagreement: bool,
}

impl GroupResolution {
    fn single(selected: NodeId) -> Self {
        Self {
            members: vec![selected],
            group_id: None,
            strategy: Strategy::Single,
            anchor: None,
            disagreement: false,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.strategy != Strategy::Single
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Position of the anchor within its collection, when rendered with one
    pub fn index(&self, doc: &Document) -> Option<usize> {
        self.anchor
            .and_then(|a| doc.attribute(a, attributes::ARRAY_INDEX))
            .and_then(|i| i.parse().ok())
    }

    /// Collection name carried by the anchor
    pub fn array<'d>(&self, doc: &'d Document) -> Option<&'d str> {
        self.anchor.and_then(|a| doc.attribute(a, attributes::ARRAY))
    }
}

/// Resolve the group of a selected element
pub fn resolve_group(doc: &Document, selected: NodeId) -> GroupResolution {
    if let Some(anchor) = doc.closest_with_attribute(selected, attributes::GROUP_ID) {
        let group_id = doc
            .attribute(anchor, attributes::GROUP_ID)
            .unwrap_or_default()
            .to_string();
        let matches = doc.query_by_attribute(attributes::GROUP_ID, &group_id);

        let disagreement = match pattern_base(doc, anchor) {
            Some(base) => {
                let by_pattern = pattern_matches(doc, base);
                let differs = by_pattern != matches;
                if differs {
                    tracing::warn!(
                        group_id = %group_id,
                        by_attribute = matches.len(),
                        by_id_pattern = by_pattern.len(),
                        "group attribute and id pattern disagree, using group attribute"
                    );
                }
                differs
            }
            None => false,
        };

        return GroupResolution {
            members: selected_first(selected, matches),
            group_id: Some(group_id),
            strategy: Strategy::GroupAttribute,
            anchor: Some(anchor),
            disagreement,
        };
    }

    let legacy = doc
        .closest_with_attribute(selected, attributes::ARRAY)
        .and_then(|anchor| pattern_base(doc, anchor).map(|base| (anchor, base.to_string())));
    if let Some((anchor, base)) = legacy {
        tracing::debug!(base = %base, "grouping by id pattern");
        let matches = pattern_matches(doc, &base);
        return GroupResolution {
            members: selected_first(selected, matches),
            group_id: Some(base),
            strategy: Strategy::IdPattern,
            anchor: Some(anchor),
            disagreement: false,
        };
    }

    GroupResolution::single(selected)
}

fn pattern_base(doc: &Document, node: NodeId) -> Option<&str> {
    doc.attribute(node, attributes::ID).and_then(strip_index_suffix)
}

fn pattern_matches(doc: &Document, base: &str) -> Vec<NodeId> {
    doc.query_by_id(|id| strip_index_suffix(id) == Some(base))
}

fn selected_first(selected: NodeId, matches: Vec<NodeId>) -> Vec<NodeId> {
    std::iter::once(selected)
        .chain(matches.into_iter().filter(|n| *n != selected))
        .collect()
}
