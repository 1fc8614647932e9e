//! Iteration-context resolution
//!
//! Resolution is purely structural: the nearest enclosing iteration call in
//! the ancestor chain wins, and names come straight from the source text.

use crate::parser::ast::{Callback, Element, Iteration, ParamList, Param};

/// Collection name used when the receiver has no usable name
pub const DEFAULT_COLLECTION: &str = "items";
/// Item variable used when the callback does not name one
pub const DEFAULT_ITEM: &str = "item";
/// Index variable used when the callback does not name one
pub const DEFAULT_INDEX: &str = "index";

/// One step of the path from the module root to an element
#[derive(Debug, Clone, Copy)]
pub enum Ancestor<'a> {
    Element(&'a Element),
    Iteration(&'a Iteration),
}

/// The iteration an element is rendered by
#[derive(Debug, Clone, PartialEq)]
pub struct IterationContext<'a> {
    pub collection_name: String,
    pub item_var: String,
    pub index_var: String,
    pub iteration: &'a Iteration,
}

impl<'a> IterationContext<'a> {
    pub fn from_iteration(iteration: &'a Iteration) -> Self {
        let callback = &iteration.callback;
        let item_var = callback.item_name().unwrap_or(DEFAULT_ITEM).to_string();
        let index_var = match callback.index_name() {
            Some(name) => name.to_string(),
            None if item_var == DEFAULT_INDEX => "itemIndex".to_string(),
            None => DEFAULT_INDEX.to_string(),
        };
        Self {
            collection_name: iteration
                .receiver
                .clone()
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            item_var,
            index_var,
            iteration,
        }
    }

    /// Whether the callback declares the index variable itself
    pub fn index_declared(&self) -> bool {
        self.iteration.callback.index_name().is_some()
    }
}

/// Find the iteration context of the element whose ancestors are given
///
/// `ancestors` is ordered from the module root inwards.
pub fn resolve<'a>(ancestors: &[Ancestor<'a>]) -> Option<IterationContext<'a>> {
    ancestors.iter().rev().find_map(|ancestor| match ancestor {
        Ancestor::Iteration(iteration) => Some(IterationContext::from_iteration(iteration)),
        Ancestor::Element(_) => None,
    })
}

/// Why an index parameter could not be added to a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unbindable {
    /// `(...args) =>`
    RestParameter,
    /// Second parameter is a destructuring pattern
    PatternIndex,
}

/// Text insertions that make `callback` bind `index_var` as its second parameter
///
/// Returns no insertions when the callback already names an index.
pub fn index_parameter_insertions(
    callback: &Callback,
    index_var: &str,
) -> Result<Vec<(usize, String)>, Unbindable> {
    if callback.index_name().is_some() {
        return Ok(Vec::new());
    }
    if callback.has_rest() {
        return Err(Unbindable::RestParameter);
    }
    if matches!(callback.params.get(1), Some(Param::Pattern)) {
        return Err(Unbindable::PatternIndex);
    }

    let insertions = match &callback.list {
        ParamList::Parenthesized {
            close,
            trailing_comma,
        } => {
            let text = match (callback.params.len(), trailing_comma) {
                (0, _) => format!("{}, {}", DEFAULT_ITEM, index_var),
                (_, true) => format!(" {}", index_var),
                (_, false) => format!(", {}", index_var),
            };
            vec![(*close, text)]
        }
        ParamList::Bare { span } => vec![
            (span.start, "(".to_string()),
            (span.end, format!(", {})", index_var)),
        ],
    };
    Ok(insertions)
}
