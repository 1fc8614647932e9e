//! Markup attribute names shared by the instrumentation pass and the runtime

/// Element identity, literal for static elements and computed for grouped ones
pub const ID: &str = "id";
/// Component that rendered the element, derived from the file name
pub const COMPONENT: &str = "data-component";
/// Project-relative source file with forward slashes
pub const FILE: &str = "data-file";
/// Identifier shared by every instance of an iteration template
pub const GROUP_ID: &str = "data-group-id";
/// Name of the collection being iterated
pub const ARRAY: &str = "data-array";
/// Position of the instance within its collection
pub const ARRAY_INDEX: &str = "data-array-index";
/// Present with value `"true"` on elements whose content is computed
pub const DYNAMIC: &str = "data-dynamic";
/// Marker id given at runtime to selected elements that have no `id`
pub const TEMP_ID: &str = "data-inspector-temp-id";

/// Strip a trailing `-<digits>` suffix from a concrete id
///
/// Returns `None` when the id does not end in a numeric suffix.
pub fn strip_index_suffix(id: &str) -> Option<&str> {
    let (base, index) = id.rsplit_once('-')?;
    if base.is_empty() || index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(base)
}

/// Interpret a dynamic-flag attribute value
pub fn is_flag_set(value: Option<&str>) -> bool {
    value == Some("true")
}
