//! The instrumentation pass
//!
//! One pass over one file: parse, walk the markup tree once collecting text
//! insertions, then splice them into the original source in a single step.
//! The parsed tree is never modified, and a parse failure leaves the source
//! untouched.

pub mod batch;
pub mod classify;
pub mod context;
pub mod identity;
pub mod registry;

use std::collections::HashSet;
use std::path::Path;

use crate::attributes;
use crate::error::ParseError;
use crate::parser::ast::{Attribute, AttrValue, Child, Element, ElementName, Node};
use crate::parser::{parse_with_method, walk_elements};

pub use batch::{BatchReport, FailedFile, FileOutcome, Instrumenter};
pub use context::{Ancestor, IterationContext};
pub use identity::{ElementId, IdentityRecord};
pub use registry::{IdentityRegistry, RegistryScope, SuffixMode};

/// Provenance attributes shared by every element of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// File stem, matched against capitalized tag names
    pub component_name: String,
    /// Project-relative path with forward slashes
    pub file_path: String,
}

impl FileInfo {
    pub fn new(component_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            file_path: file_path.into(),
        }
    }

    /// Derive provenance for `path` relative to `project_root`
    pub fn from_path(path: &Path, project_root: &Path) -> Self {
        let component_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let relative = path
            .strip_prefix(project_root)
            .map(Path::to_path_buf)
            .or_else(|_| {
                let path = path.canonicalize()?;
                let root = project_root.canonicalize()?;
                path.strip_prefix(&root)
                    .map(Path::to_path_buf)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            })
            .unwrap_or_else(|_| path.to_path_buf());

        Self {
            component_name,
            file_path: normalize_separators(&relative.to_string_lossy()),
        }
    }
}

fn normalize_separators(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").map(str::to_string).unwrap_or(path)
}

/// Result of instrumenting one source text
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutput {
    pub source: String,
    pub records: Vec<IdentityRecord>,
}

impl PassOutput {
    /// Whether any element received an identity block
    pub fn modified(&self) -> bool {
        !self.records.is_empty()
    }
}

/// A text insertion into the original source
#[derive(Debug, Clone, PartialEq, Eq)]
struct Insertion {
    offset: usize,
    text: String,
}

/// Instrument one source text
///
/// Identity allocation goes through `registry`; the caller decides when the
/// registry is reset.
#[tracing::instrument(skip_all, fields(file = %file.file_path))]
pub fn instrument_source(
    source: &str,
    file: &FileInfo,
    registry: &mut IdentityRegistry,
    iteration_method: &str,
) -> Result<PassOutput, ParseError> {
    let module = parse_with_method(source, iteration_method)?;

    walk_elements(&module.nodes, &mut |element| {
        if let Some(id) = classify::literal_attribute(element, attributes::ID) {
            registry.reserve(id);
        }
        if let Some(group_id) = classify::literal_attribute(element, attributes::GROUP_ID) {
            registry.reserve_group(group_id);
        }
    });

    let mut pass = Pass {
        source,
        file,
        registry,
        ancestors: Vec::new(),
        insertions: Vec::new(),
        records: Vec::new(),
        bound_iterations: HashSet::new(),
    };
    pass.visit_nodes(&module.nodes);

    let Pass {
        mut insertions,
        records,
        ..
    } = pass;

    if insertions.is_empty() {
        return Ok(PassOutput {
            source: source.to_string(),
            records,
        });
    }

    insertions.sort_by_key(|insertion| insertion.offset);
    let extra: usize = insertions.iter().map(|i| i.text.len()).sum();
    let mut output = String::with_capacity(source.len() + extra);
    let mut last = 0;
    for insertion in &insertions {
        output.push_str(&source[last..insertion.offset]);
        output.push_str(&insertion.text);
        last = insertion.offset;
    }
    output.push_str(&source[last..]);

    tracing::debug!(elements = records.len(), "instrumented");
    Ok(PassOutput {
        source: output,
        records,
    })
}

struct Pass<'a, 'r> {
    source: &'a str,
    file: &'r FileInfo,
    registry: &'r mut IdentityRegistry,
    ancestors: Vec<Ancestor<'a>>,
    insertions: Vec<Insertion>,
    records: Vec<IdentityRecord>,
    /// Iterations whose callback already got an index parameter
    bound_iterations: HashSet<usize>,
}

impl<'a, 'r> Pass<'a, 'r> {
    fn visit_nodes(&mut self, nodes: &'a [Node]) {
        for node in nodes {
            match node {
                Node::Element(element) => self.visit_element(element),
                Node::Iteration(iteration) => {
                    self.ancestors.push(Ancestor::Iteration(iteration));
                    self.visit_nodes(&iteration.nodes);
                    self.ancestors.pop();
                }
            }
        }
    }

    fn visit_element(&mut self, element: &'a Element) {
        self.instrument(element);

        self.ancestors.push(Ancestor::Element(element));
        for attribute in &element.attributes {
            match attribute {
                Attribute::Named(named) => match &named.value {
                    Some(AttrValue::Expression(expr)) => self.visit_nodes(&expr.nodes),
                    Some(AttrValue::Element(inner)) => self.visit_element(inner),
                    Some(AttrValue::Literal(_)) | None => {}
                },
                Attribute::Spread(expr) => self.visit_nodes(&expr.nodes),
            }
        }
        for child in &element.children {
            match child {
                Child::Element(inner) => self.visit_element(inner),
                Child::Expression(expr) => self.visit_nodes(&expr.nodes),
                Child::Text(_) => {}
            }
        }
        self.ancestors.pop();
    }

    fn instrument(&mut self, element: &'a Element) {
        let ElementName::Ident(tag) = &element.name.node else {
            return;
        };
        if tag == "Fragment" {
            return;
        }
        if tag.starts_with(|c: char| c.is_uppercase()) && *tag != self.file.component_name {
            tracing::trace!(tag = %tag, "skipping nested component");
            return;
        }
        if element.has_attribute(attributes::ID) {
            return;
        }

        let context = context::resolve(&self.ancestors);
        let dynamic = classify::is_dynamic(element, context.as_ref());

        let record = match &context {
            Some(ctx) => {
                let group_id = self.registry.allocate_group(&ctx.collection_name, tag);
                IdentityRecord {
                    id: ElementId::Indexed {
                        group_id: group_id.clone(),
                        index_var: ctx.index_var.clone(),
                    },
                    group_id: Some(group_id),
                    component_name: self.file.component_name.clone(),
                    file_path: self.file.file_path.clone(),
                    array_name: Some(ctx.collection_name.clone()),
                    array_index: Some(ctx.index_var.clone()),
                    dynamic,
                    tag: tag.clone(),
                    line: self.line_of(element.span.start),
                }
            }
            None => IdentityRecord {
                id: ElementId::Static(self.registry.allocate(tag)),
                group_id: None,
                component_name: self.file.component_name.clone(),
                file_path: self.file.file_path.clone(),
                array_name: None,
                array_index: None,
                dynamic,
                tag: tag.clone(),
                line: self.line_of(element.span.start),
            },
        };

        if let Some(ctx) = &context {
            self.bind_index(ctx);
        }

        tracing::debug!(
            tag = %tag,
            id = ?record.id,
            dynamic = record.dynamic,
            "identity block"
        );
        self.insertions.push(Insertion {
            offset: element.name.span.end,
            text: record.render_block(),
        });
        self.records.push(record);
    }

    /// Make sure the iteration callback binds the index the id refers to
    fn bind_index(&mut self, ctx: &IterationContext<'a>) {
        if !self.bound_iterations.insert(ctx.iteration.span.start) {
            return;
        }
        match context::index_parameter_insertions(&ctx.iteration.callback, &ctx.index_var) {
            Ok(insertions) => {
                self.insertions.extend(
                    insertions
                        .into_iter()
                        .map(|(offset, text)| Insertion { offset, text }),
                );
            }
            Err(reason) => {
                tracing::warn!(
                    collection = %ctx.collection_name,
                    line = self.line_of(ctx.iteration.span.start),
                    ?reason,
                    "cannot add index parameter to iteration callback; `{}` may be unbound",
                    ctx.index_var
                );
            }
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.source[..offset].matches('\n').count() + 1
    }
}
