//! Identity records and the identity block written into markup

use serde::{Deserialize, Serialize};

use crate::attributes;

/// The `id` given to an instrumented element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    /// Literal id of a non-grouped element
    Static(String),
    /// `group_id + "-" + index_var`, evaluated per rendered instance
    #[serde(rename_all = "camelCase")]
    Indexed { group_id: String, index_var: String },
}

impl ElementId {
    /// The id a rendered instance carries; static ids ignore the index
    pub fn concrete(&self, index: usize) -> String {
        match self {
            ElementId::Static(id) => id.clone(),
            ElementId::Indexed { group_id, .. } => format!("{}-{}", group_id, index),
        }
    }

    /// Attribute value as written in source, including quotes or braces
    pub fn attribute_source(&self) -> String {
        match self {
            ElementId::Static(id) => quote_attribute(id),
            ElementId::Indexed {
                group_id,
                index_var,
            } => format!("{{{} + {}}}", script_string(&format!("{}-", group_id)), index_var),
        }
    }
}

/// Metadata injected into one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub id: ElementId,
    pub group_id: Option<String>,
    pub component_name: String,
    pub file_path: String,
    pub array_name: Option<String>,
    /// Index expression, such as `index`
    pub array_index: Option<String>,
    pub dynamic: bool,
    pub tag: String,
    /// 1-based line of the element's opening tag
    pub line: usize,
}

impl IdentityRecord {
    pub fn is_grouped(&self) -> bool {
        self.group_id.is_some()
    }

    /// Render the identity block inserted right after the tag name
    ///
    /// Every attribute is preceded by a space, so the block can be spliced in
    /// without touching the attributes that follow.
    pub fn render_block(&self) -> String {
        let mut block = String::new();
        block.push_str(&format!(" {}={}", attributes::ID, self.id.attribute_source()));
        block.push_str(&format!(
            " {}={}",
            attributes::COMPONENT,
            quote_attribute(&self.component_name)
        ));
        block.push_str(&format!(" {}={}", attributes::FILE, quote_attribute(&self.file_path)));
        if let Some(group_id) = &self.group_id {
            block.push_str(&format!(" {}={}", attributes::GROUP_ID, quote_attribute(group_id)));
            if let Some(array) = &self.array_name {
                block.push_str(&format!(" {}={}", attributes::ARRAY, quote_attribute(array)));
            }
            if let Some(index) = &self.array_index {
                block.push_str(&format!(" {}={{{}}}", attributes::ARRAY_INDEX, index));
            }
        }
        if self.dynamic {
            block.push_str(&format!(" {}=\"true\"", attributes::DYNAMIC));
        }
        block
    }
}

/// Quote a literal markup attribute value
fn quote_attribute(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "&quot;"))
}

/// Quote a value as a script string literal
fn script_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
