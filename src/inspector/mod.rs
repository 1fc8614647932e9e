//! Runtime element inspector
//!
//! Drives selection over a live [`Document`]: hovering highlights elements
//! and their groups, clicking selects, and style or text mutations are
//! applied to the whole group with undo. The inspector is a state machine:
//!
//! ```text
//! Idle -> Inspecting -> Selected -> Idle
//!              ^            |
//!              +------------+  (re-entering inspect mode)
//! ```
//!
//! Document listeners are attached and detached only by transitions.

pub mod correlate;
pub mod dom;
pub mod events;
pub mod mutation;
pub mod protocol;

use serde::Serialize;

use crate::error::Rejection;
use crate::palette::StylePalette;

pub use correlate::{resolve_group, GroupResolution, Strategy};
pub use dom::{Document, Event, EventKind, NodeId};
pub use events::{
    Change, ChangeEvent, ChangeSink, ElementIdentity, EventLog, GroupSummary, JsonLinesSink,
    Snapshot, TracingSink,
};
pub use mutation::{RuntimeElementState, UndoStore};
pub use protocol::{Acknowledged, ControlMessage, OriginPolicy, StatusMessage};

pub const HOVER_CLASS: &str = "inspector-hover";
pub const GROUP_HOVER_CLASS: &str = "inspector-hover-array";
pub const SELECTED_CLASS: &str = "inspector-selected";
pub const GROUP_SELECTED_CLASS: &str = "inspector-array-highlight";

/// Classes the inspector adds for its own highlighting
pub const HIGHLIGHT_CLASSES: [&str; 4] = [
    HOVER_CLASS,
    GROUP_HOVER_CLASS,
    SELECTED_CLASS,
    GROUP_SELECTED_CLASS,
];

pub const INSPECT_CURSOR: &str = "crosshair";
pub const ESCAPE_KEY: &str = "Escape";

/// Listeners attached while inspecting, all in the capture phase
const INSPECT_LISTENERS: [EventKind; 3] = [
    EventKind::PointerEnter,
    EventKind::PointerLeave,
    EventKind::Click,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle,
    Inspecting,
    Selected,
}

/// The current selection, passed explicitly to correlation and mutation
#[derive(Debug, Clone, Default)]
pub struct SelectionSession {
    mode: Mode,
    selected: Option<NodeId>,
    group: Option<GroupResolution>,
}

impl SelectionSession {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn group(&self) -> Option<&GroupResolution> {
        self.group.as_ref()
    }

    /// Selected element and its group members
    pub fn members(&self) -> &[NodeId] {
        match &self.group {
            Some(group) => &group.members,
            None => &[],
        }
    }

    fn drop_selection(&mut self) {
        self.selected = None;
        self.group = None;
    }
}

/// State of the panel's text-edit field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    pub value: String,
    pub enabled: bool,
}

/// What the host should do with an event after the inspector saw it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handled: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
}

impl DispatchOutcome {
    fn handled() -> Self {
        Self {
            handled: true,
            ..Self::default()
        }
    }

    fn consumed() -> Self {
        Self {
            handled: true,
            default_prevented: true,
            propagation_stopped: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied(ChangeEvent),
    Rejected(Rejection),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            MutationOutcome::Rejected(r) => Some(r),
            MutationOutcome::Applied(_) => None,
        }
    }
}

/// What the panel shows about the selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionInfo {
    pub element: ElementIdentity,
    pub strategy: Strategy,
    pub group: Option<GroupSummary>,
    pub text_editable: bool,
}

pub struct Inspector {
    session: SelectionSession,
    visible: bool,
    store: UndoStore,
    text_field: TextField,
    palette: StylePalette,
    sink: Box<dyn ChangeSink>,
    origins: OriginPolicy,
    ui_root: Option<NodeId>,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}

impl Inspector {
    pub fn new() -> Self {
        Self {
            session: SelectionSession::default(),
            visible: false,
            store: UndoStore::new(),
            text_field: TextField::default(),
            palette: StylePalette::default(),
            sink: Box::new(TracingSink),
            origins: OriginPolicy::any(),
            ui_root: None,
        }
    }

    pub fn with_palette(mut self, palette: StylePalette) -> Self {
        self.palette = palette;
        self
    }

    pub fn with_sink(mut self, sink: impl ChangeSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_allowed_origins(mut self, origins: OriginPolicy) -> Self {
        self.origins = origins;
        self
    }

    /// Attach to a document; `ui_root` is the inspector's own panel subtree
    pub fn mount(&mut self, doc: &mut Document, ui_root: NodeId) {
        self.ui_root = Some(ui_root);
        doc.add_listener(EventKind::KeyDown, false);
    }

    pub fn session(&self) -> &SelectionSession {
        &self.session
    }

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn text_field(&self) -> &TextField {
        &self.text_field
    }

    pub fn palette(&self) -> &StylePalette {
        &self.palette
    }

    pub fn store(&self) -> &UndoStore {
        &self.store
    }

    /// Show or hide the panel; hiding cancels inspection
    pub fn toggle_visibility(&mut self, doc: &mut Document) {
        self.visible = !self.visible;
        if !self.visible {
            self.cancel(doc);
        }
    }

    /// Enter inspect mode, or leave it if already inspecting
    pub fn toggle_inspect_mode(&mut self, doc: &mut Document) {
        if self.session.mode == Mode::Inspecting {
            self.cancel(doc);
        } else {
            self.enter_inspect_mode(doc);
        }
    }

    /// `Idle | Selected -> Inspecting`
    pub fn enter_inspect_mode(&mut self, doc: &mut Document) {
        if self.session.mode == Mode::Inspecting {
            return;
        }
        self.visible = true;
        for kind in INSPECT_LISTENERS {
            doc.add_listener(kind, true);
        }
        doc.set_cursor(Some(INSPECT_CURSOR));
        self.transition(Mode::Inspecting);
    }

    /// Any state -> `Idle`, dropping the selection without restoring anything
    ///
    /// Safe to call repeatedly.
    pub fn cancel(&mut self, doc: &mut Document) {
        self.detach(doc);
        clear_highlights(doc);
        self.session.drop_selection();
        self.text_field = TextField::default();
        self.transition(Mode::Idle);
    }

    /// `Selected -> Idle` keeping every change made so far
    pub fn clear_selection(&mut self, doc: &mut Document) {
        if self.session.selected.is_none() {
            return;
        }
        clear_highlights(doc);
        self.session.drop_selection();
        self.text_field = TextField::default();
        if self.session.mode == Mode::Selected {
            self.detach(doc);
            self.transition(Mode::Idle);
        }
    }

    fn detach(&mut self, doc: &mut Document) {
        for kind in INSPECT_LISTENERS {
            doc.remove_listener(kind, true);
        }
        doc.set_cursor(None);
    }

    fn transition(&mut self, to: Mode) {
        if self.session.mode != to {
            tracing::debug!(from = ?self.session.mode, to = ?to, "inspector transition");
            self.session.mode = to;
        }
    }

    fn in_ui(&self, doc: &Document, node: NodeId) -> bool {
        self.ui_root.is_some_and(|root| doc.contains(root, node))
    }

    /// Deliver a user event; events without an attached listener are ignored
    pub fn dispatch(&mut self, doc: &mut Document, event: &Event) -> DispatchOutcome {
        if event.kind == EventKind::KeyDown {
            if !doc.has_listener(EventKind::KeyDown, false)
                || event.key.as_deref() != Some(ESCAPE_KEY)
            {
                return DispatchOutcome::default();
            }
            self.cancel(doc);
            self.visible = false;
            return DispatchOutcome::handled();
        }

        if !doc.has_listener(event.kind, true) || self.in_ui(doc, event.target) {
            return DispatchOutcome::default();
        }
        match event.kind {
            EventKind::PointerEnter => {
                self.hover(doc, event.target);
                DispatchOutcome::handled()
            }
            EventKind::PointerLeave => {
                self.unhover(doc, event.target);
                DispatchOutcome::handled()
            }
            EventKind::Click => {
                self.select(doc, event.target);
                DispatchOutcome::consumed()
            }
            EventKind::KeyDown => DispatchOutcome::default(),
        }
    }

    fn hover(&mut self, doc: &mut Document, target: NodeId) {
        if self.session.selected == Some(target) {
            return;
        }
        doc.add_class(target, HOVER_CLASS);
        let group = resolve_group(doc, target);
        for &member in group.members.iter().skip(1) {
            doc.add_class(member, GROUP_HOVER_CLASS);
        }
    }

    fn unhover(&mut self, doc: &mut Document, target: NodeId) {
        doc.remove_class(target, HOVER_CLASS);
        for node in doc.query_by_class(GROUP_HOVER_CLASS) {
            doc.remove_class(node, GROUP_HOVER_CLASS);
        }
    }

    /// `Inspecting -> Selected`
    fn select(&mut self, doc: &mut Document, target: NodeId) {
        // Listeners go first so a second click cannot run against this one.
        self.detach(doc);
        clear_highlights(doc);

        doc.add_class(target, SELECTED_CLASS);
        let group = resolve_group(doc, target);
        for &member in &group.members {
            self.store.capture(doc, member);
            if member != target {
                doc.add_class(member, GROUP_SELECTED_CLASS);
            }
        }

        let dynamic = crate::attributes::is_flag_set(
            doc.attribute(target, crate::attributes::DYNAMIC),
        );
        self.text_field = if dynamic || group.is_grouped() {
            TextField::default()
        } else {
            TextField {
                value: doc.text_content(target),
                enabled: true,
            }
        };

        tracing::debug!(
            tag = doc.tag(target),
            members = group.len(),
            strategy = ?group.strategy,
            "selected element"
        );
        self.session.selected = Some(target);
        self.session.group = Some(group);
        self.transition(Mode::Selected);
    }

    /// The selected element, provided it is still in the document
    fn live_selection(&self, doc: &Document) -> Result<NodeId, Rejection> {
        let node = self.session.selected.ok_or(Rejection::NoSelection)?;
        if !doc.is_connected(node) {
            return Err(Rejection::Detached);
        }
        Ok(node)
    }

    fn reject(&self, rejection: Rejection) -> MutationOutcome {
        tracing::warn!("{}", rejection);
        MutationOutcome::Rejected(rejection)
    }

    fn summary(doc: &Document, group: &GroupResolution, affected: usize) -> Option<GroupSummary> {
        let group_id = group.group_id.clone().filter(|_| group.is_grouped())?;
        Some(GroupSummary {
            group_id,
            array: group.array(doc).map(str::to_string),
            index: group.index(doc),
            affected,
        })
    }

    fn emit(&mut self, event: ChangeEvent) -> MutationOutcome {
        self.sink.emit(&event);
        MutationOutcome::Applied(event)
    }

    /// Apply `new_value` to the selection's whole group
    ///
    /// `exclusive` lists the values of the same property that must go.
    pub fn apply_style<S: AsRef<str>>(
        &mut self,
        doc: &mut Document,
        property: &str,
        new_value: &str,
        exclusive: &[S],
    ) -> MutationOutcome {
        let node = match self.live_selection(doc) {
            Ok(node) => node,
            Err(r) => return self.reject(r),
        };

        let group = resolve_group(doc, node);
        for &member in &group.members {
            self.store.capture(doc, member);
        }
        let before = Snapshot::read(doc, node);
        mutation::apply_style_mutation(doc, &group.members, new_value, exclusive);

        let event = ChangeEvent {
            change: Change::Style {
                property: property.to_string(),
                value: new_value.to_string(),
            },
            element: ElementIdentity::read(doc, node),
            before,
            after: Snapshot::read(doc, node),
            group: Self::summary(doc, &group, group.len()),
        };
        self.session.group = Some(group);
        self.emit(event)
    }

    /// Apply a named palette option of `property`
    pub fn apply_palette_option(
        &mut self,
        doc: &mut Document,
        property: &str,
        option: &str,
    ) -> MutationOutcome {
        let found = self.palette.category(property).and_then(|category| {
            let chosen = category.option(option)?;
            let exclusive: Vec<String> = category
                .exclusive_classes()
                .into_iter()
                .map(str::to_string)
                .collect();
            Some((chosen.class.clone(), exclusive))
        });
        match found {
            Some((class, exclusive)) => self.apply_style(doc, property, &class, exclusive.as_slice()),
            None => self.reject(Rejection::UnknownOption {
                property: property.to_string(),
                option: option.to_string(),
            }),
        }
    }

    /// Replace the text of the selected element
    pub fn update_text(&mut self, doc: &mut Document, new_value: &str) -> MutationOutcome {
        let node = match self.live_selection(doc) {
            Ok(node) => node,
            Err(r) => return self.reject(r),
        };
        let group = resolve_group(doc, node);
        let before_text = doc.text_content(node);
        let before = Snapshot::read(doc, node);
        if let Err(r) = mutation::update_text(doc, &group, new_value) {
            return self.reject(r);
        }

        self.text_field.value = new_value.to_string();
        let event = ChangeEvent {
            change: Change::Text {
                before: before_text,
                after: new_value.to_string(),
            },
            element: ElementIdentity::read(doc, node),
            before,
            after: Snapshot::read(doc, node),
            group: None,
        };
        self.emit(event)
    }

    /// Restore the selection's group to its captured state, then go idle
    pub fn reset(&mut self, doc: &mut Document) -> MutationOutcome {
        let Some(node) = self.session.selected else {
            return self.reject(Rejection::NoSelection);
        };
        let group = self
            .session
            .group
            .take()
            .unwrap_or_else(|| resolve_group(doc, node));

        let before = Snapshot::read(doc, node);
        let restored = mutation::reset_group(doc, &mut self.store, &group.members);
        clear_highlights(doc);

        let event = ChangeEvent {
            change: Change::Reset,
            element: ElementIdentity::read(doc, node),
            before,
            after: Snapshot::read(doc, node),
            group: Self::summary(doc, &group, restored),
        };
        self.detach(doc);
        self.session.drop_selection();
        self.text_field = TextField::default();
        self.transition(Mode::Idle);
        self.emit(event)
    }

    /// Handle a control message from an embedding context
    ///
    /// Messages from disallowed origins or of unknown kind are ignored.
    pub fn handle_message(
        &mut self,
        doc: &mut Document,
        origin: &str,
        payload: &str,
    ) -> Option<StatusMessage> {
        if !self.origins.allows(origin) {
            tracing::debug!(origin, "ignoring message from disallowed origin");
            return None;
        }
        let message = protocol::parse_control(payload)?;
        let acknowledged = match message {
            ControlMessage::Start => {
                self.enter_inspect_mode(doc);
                Acknowledged::Start
            }
            ControlMessage::Stop => {
                self.cancel(doc);
                Acknowledged::Stop
            }
        };
        Some(StatusMessage {
            acknowledged,
            active: self.session.mode == Mode::Inspecting,
            mode: self.session.mode,
        })
    }

    pub fn selection_info(&self, doc: &Document) -> Option<SelectionInfo> {
        let node = self.session.selected?;
        let group = self.session.group.as_ref()?;
        Some(SelectionInfo {
            element: ElementIdentity::read(doc, node),
            strategy: group.strategy,
            group: Self::summary(doc, group, group.len()),
            text_editable: self.text_field.enabled,
        })
    }
}

/// Remove every inspector highlight class from the document
fn clear_highlights(doc: &mut Document) {
    for class in HIGHLIGHT_CLASSES {
        for node in doc.query_by_class(class) {
            doc.remove_class(node, class);
        }
    }
}
