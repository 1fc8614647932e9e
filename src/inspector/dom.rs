//! In-memory live document
//!
//! An arena of elements rooted at `body`. Elements removed from the tree keep
//! their slot and their `NodeId` stays valid, but they are no longer
//! connected and no query returns them.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::attributes;
use crate::instrument::IdentityRecord;

/// Handle to an element of one `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    PointerEnter,
    PointerLeave,
    Click,
    KeyDown,
}

/// A user interaction delivered to the inspector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub target: NodeId,
    pub key: Option<String>,
}

impl Event {
    pub fn pointer_enter(target: NodeId) -> Self {
        Self::new(EventKind::PointerEnter, target)
    }

    pub fn pointer_leave(target: NodeId) -> Self {
        Self::new(EventKind::PointerLeave, target)
    }

    pub fn click(target: NodeId) -> Self {
        Self::new(EventKind::Click, target)
    }

    pub fn key_down(target: NodeId, key: impl Into<String>) -> Self {
        Self {
            kind: EventKind::KeyDown,
            target,
            key: Some(key.into()),
        }
    }

    fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            key: None,
        }
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    style: String,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: Vec::new(),
            classes: Vec::new(),
            style: String::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<ElementData>,
    body: NodeId,
    listeners: BTreeSet<(EventKind, bool)>,
    cursor: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            elements: vec![ElementData::new("body")],
            body: NodeId(0),
            listeners: BTreeSet::new(),
            cursor: None,
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.elements.push(ElementData::new(tag));
        NodeId(self.elements.len() - 1)
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.elements[child.0].parent = Some(parent);
        self.elements[parent.0].children.push(child);
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.append_child(parent, node);
        node
    }

    /// Append the element one template instance renders to
    ///
    /// Grouped records get their concrete `-<index>` id and array index.
    pub fn append_rendered(
        &mut self,
        parent: NodeId,
        record: &IdentityRecord,
        index: usize,
    ) -> NodeId {
        let node = self.append_element(parent, &record.tag);
        self.set_attribute(node, attributes::ID, &record.id.concrete(index));
        self.set_attribute(node, attributes::COMPONENT, &record.component_name);
        self.set_attribute(node, attributes::FILE, &record.file_path);
        if let Some(group_id) = &record.group_id {
            self.set_attribute(node, attributes::GROUP_ID, group_id);
            if let Some(array) = &record.array_name {
                self.set_attribute(node, attributes::ARRAY, array);
            }
            self.set_attribute(node, attributes::ARRAY_INDEX, &index.to_string());
        }
        if record.dynamic {
            self.set_attribute(node, attributes::DYNAMIC, "true");
        }
        node
    }

    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.elements[node.0].parent.take() {
            self.elements[parent.0].children.retain(|c| *c != node);
        }
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.elements[node.0].tag
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.elements[node.0]
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let attrs = &mut self.elements[node.0].attributes;
        match attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.elements[node.0].attributes.retain(|(n, _)| n != name);
    }

    pub fn classes(&self, node: NodeId) -> &[String] {
        &self.elements[node.0].classes
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if !class.is_empty() && !self.has_class(node, class) {
            self.elements[node.0].classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.elements[node.0].classes.retain(|c| c != class);
    }

    /// Replace the class list wholesale
    pub fn set_classes(&mut self, node: NodeId, classes: Vec<String>) {
        self.elements[node.0].classes = classes;
    }

    /// Raw inline style text
    pub fn style(&self, node: NodeId) -> &str {
        &self.elements[node.0].style
    }

    pub fn set_style(&mut self, node: NodeId, style: &str) {
        self.elements[node.0].style = style.to_string();
    }

    /// Text of the element followed by the text of its descendants
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let data = &self.elements[node.0];
        out.push_str(&data.text);
        for child in &data.children {
            self.collect_text(*child, out);
        }
    }

    /// Replace the element's whole content with `text`, dropping its children
    pub fn set_text_content(&mut self, node: NodeId, text: &str) {
        let children = std::mem::take(&mut self.elements[node.0].children);
        for child in children {
            self.elements[child.0].parent = None;
        }
        self.elements[node.0].text = text.to_string();
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.elements[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.elements[node.0].children
    }

    /// Ancestors from the parent outwards
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), move |n| self.parent(*n))
    }

    /// Nearest element carrying `name`, starting with `node` itself
    pub fn closest_with_attribute(&self, node: NodeId, name: &str) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|n| self.has_attribute(*n, name))
    }

    /// Whether `node` is `container` or one of its descendants
    pub fn contains(&self, container: NodeId, node: NodeId) -> bool {
        node == container || self.ancestors(node).any(|a| a == container)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.body, node)
    }

    /// Connected elements in document order
    fn document_order(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        order
    }

    pub fn query_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|n| self.attribute(*n, name) == Some(value))
            .collect()
    }

    pub fn query_by_class(&self, class: &str) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    /// Connected elements whose `id` satisfies `predicate`
    pub fn query_by_id(&self, predicate: impl Fn(&str) -> bool) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|n| self.attribute(*n, attributes::ID).is_some_and(&predicate))
            .collect()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.query_by_id(|candidate| candidate == id).into_iter().next()
    }

    /// Register a document-level listener; returns false if it was already there
    pub fn add_listener(&mut self, kind: EventKind, capture: bool) -> bool {
        self.listeners.insert((kind, capture))
    }

    pub fn remove_listener(&mut self, kind: EventKind, capture: bool) -> bool {
        self.listeners.remove(&(kind, capture))
    }

    pub fn has_listener(&self, kind: EventKind, capture: bool) -> bool {
        self.listeners.contains(&(kind, capture))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn set_cursor(&mut self, cursor: Option<&str>) {
        self.cursor = cursor.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::ElementId;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let main = doc.append_element(doc.body(), "main");
        let p = doc.append_element(main, "p");
        doc.set_text_content(p, "Hello ");
        let b = doc.append_element(p, "b");
        doc.set_text_content(b, "world");
        (doc, main, p, b)
    }

    #[test]
    fn test_text_content_includes_descendants() {
        let (doc, main, p, _) = sample();
        assert_eq!(doc.text_content(p), "Hello world");
        assert_eq!(doc.text_content(main), "Hello world");
    }

    #[test]
    fn test_set_text_content_detaches_children() {
        let (mut doc, _, p, b) = sample();
        doc.set_text_content(p, "Bye");
        assert_eq!(doc.text_content(p), "Bye");
        assert!(doc.children(p).is_empty());
        assert!(!doc.is_connected(b));
    }

    #[test]
    fn test_classes_are_a_set() {
        let (mut doc, main, _, _) = sample();
        doc.add_class(main, "p-4");
        doc.add_class(main, "p-4");
        doc.add_class(main, "");
        assert_eq!(doc.classes(main), ["p-4".to_string()]);
        doc.remove_class(main, "p-4");
        assert!(doc.classes(main).is_empty());
    }

    #[test]
    fn test_closest_is_inclusive() {
        let (mut doc, main, p, b) = sample();
        doc.set_attribute(main, "data-group-id", "g");
        assert_eq!(doc.closest_with_attribute(b, "data-group-id"), Some(main));
        assert_eq!(doc.closest_with_attribute(main, "data-group-id"), Some(main));
        doc.set_attribute(p, "data-group-id", "h");
        assert_eq!(doc.closest_with_attribute(b, "data-group-id"), Some(p));
    }

    #[test]
    fn test_queries_in_document_order_and_skip_detached() {
        let mut doc = Document::new();
        let a = doc.append_element(doc.body(), "div");
        let a1 = doc.append_element(a, "span");
        let b = doc.append_element(doc.body(), "div");
        for n in [a, a1, b] {
            doc.add_class(n, "x");
        }
        assert_eq!(doc.query_by_class("x"), vec![a, a1, b]);
        doc.remove(a);
        assert_eq!(doc.query_by_class("x"), vec![b]);
        assert!(!doc.is_connected(a1));
    }

    #[test]
    fn test_append_rendered_grouped_instance() {
        let record = IdentityRecord {
            id: ElementId::Indexed {
                group_id: "todos-li-3".to_string(),
                index_var: "index".to_string(),
            },
            group_id: Some("todos-li-3".to_string()),
            component_name: "App".to_string(),
            file_path: "src/App.jsx".to_string(),
            array_name: Some("todos".to_string()),
            array_index: Some("index".to_string()),
            dynamic: true,
            tag: "li".to_string(),
            line: 4,
        };
        let mut doc = Document::new();
        let li = doc.append_rendered(doc.body(), &record, 2);
        assert_eq!(doc.tag(li), "li");
        assert_eq!(doc.attribute(li, "id"), Some("todos-li-3-2"));
        assert_eq!(doc.attribute(li, "data-group-id"), Some("todos-li-3"));
        assert_eq!(doc.attribute(li, "data-array"), Some("todos"));
        assert_eq!(doc.attribute(li, "data-array-index"), Some("2"));
        assert_eq!(doc.attribute(li, "data-dynamic"), Some("true"));
        assert_eq!(doc.get_element_by_id("todos-li-3-2"), Some(li));
    }

    #[test]
    fn test_listener_registry() {
        let mut doc = Document::new();
        assert!(doc.add_listener(EventKind::Click, true));
        assert!(!doc.add_listener(EventKind::Click, true));
        assert!(!doc.has_listener(EventKind::Click, false));
        assert!(doc.remove_listener(EventKind::Click, true));
        assert_eq!(doc.listener_count(), 0);
    }
}
