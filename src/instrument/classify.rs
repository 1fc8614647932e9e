//! Dynamic-content classification
//!
//! An element is dynamic when its rendered content can change without the
//! source changing: it is produced by an iteration, it has a computed
//! attribute, or it has a computed child expression.

use crate::parser::ast::{Attribute, AttrValue, Child, Element, ExprKind};

use super::context::IterationContext;

/// Attribute that identifies iteration instances and never counts as dynamic
pub const ITERATION_KEY: &str = "key";

pub fn is_dynamic(element: &Element, context: Option<&IterationContext<'_>>) -> bool {
    context.is_some()
        || element.attributes.iter().any(attribute_is_dynamic)
        || element.children.iter().any(child_is_dynamic)
}

fn attribute_is_dynamic(attribute: &Attribute) -> bool {
    match attribute {
        Attribute::Spread(_) => true,
        Attribute::Named(named) if named.name.node == ITERATION_KEY => false,
        Attribute::Named(named) => named.value.as_ref().is_some_and(|v| !v.is_literal()),
    }
}

fn child_is_dynamic(child: &Child) -> bool {
    match child {
        Child::Expression(expr) => expr.kind == ExprKind::Computed,
        Child::Text(_) | Child::Element(_) => false,
    }
}

/// Whether the element's attribute value for `name` is a plain literal
pub fn literal_attribute<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    match element.attribute(name)?.value.as_ref()? {
        AttrValue::Literal(value) => Some(value.node.as_str()),
        _ => None,
    }
}
