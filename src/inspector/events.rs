//! Change events emitted after every successful mutation

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::Serialize;

use crate::attributes;

use super::dom::{Document, NodeId};
use super::mutation::visible_classes;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Change {
    Text { before: String, after: String },
    Style { property: String, value: String },
    Reset,
}

/// Identity attributes of the changed element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementIdentity {
    pub tag: String,
    pub id: Option<String>,
    pub component: Option<String>,
    pub file: Option<String>,
    pub group_id: Option<String>,
    pub array: Option<String>,
    pub array_index: Option<usize>,
    pub dynamic: bool,
}

impl ElementIdentity {
    pub fn read(doc: &Document, node: NodeId) -> Self {
        let attr = |name: &str| doc.attribute(node, name).map(str::to_string);
        Self {
            tag: doc.tag(node).to_string(),
            id: attr(attributes::ID),
            component: attr(attributes::COMPONENT),
            file: attr(attributes::FILE),
            group_id: attr(attributes::GROUP_ID),
            array: attr(attributes::ARRAY),
            array_index: doc
                .attribute(node, attributes::ARRAY_INDEX)
                .and_then(|i| i.parse().ok()),
            dynamic: attributes::is_flag_set(doc.attribute(node, attributes::DYNAMIC)),
        }
    }
}

/// Class list and inline style at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub classes: Vec<String>,
    pub style: String,
}

impl Snapshot {
    pub fn read(doc: &Document, node: NodeId) -> Self {
        Self {
            classes: visible_classes(doc, node),
            style: doc.style(node).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub group_id: String,
    pub array: Option<String>,
    pub index: Option<usize>,
    /// Number of elements the change was applied to
    pub affected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub change: Change,
    pub element: ElementIdentity,
    pub before: Snapshot,
    pub after: Snapshot,
    pub group: Option<GroupSummary>,
}

/// Receives change events
pub trait ChangeSink {
    fn emit(&mut self, event: &ChangeEvent);
}

/// Logs each change through `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl ChangeSink for TracingSink {
    fn emit(&mut self, event: &ChangeEvent) {
        tracing::info!(
            tag = %event.element.tag,
            id = event.element.id.as_deref().unwrap_or(""),
            affected = event.group.as_ref().map_or(1, |g| g.affected),
            change = ?event.change,
            "element changed"
        );
    }
}

/// Shared in-memory event list; clones see the same events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.borrow().clone()
    }

    pub fn last(&self) -> Option<ChangeEvent> {
        self.events.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl ChangeSink for EventLog {
    fn emit(&mut self, event: &ChangeEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Writes one JSON object per event and line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ChangeSink for JsonLinesSink<W> {
    fn emit(&mut self, event: &ChangeEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                tracing::warn!("failed to serialize change event: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.writer, "{}", json) {
            tracing::warn!("failed to write change event: {}", e);
        }
    }
}
