//! Inspector IDs - stable element identities for JSX and a live element inspector
//!
//! The library has two halves. The instrumentation pass rewrites JSX/TSX
//! source so every rendered element carries an identity block (an `id`, the
//! component and file it came from, and group attributes for elements
//! rendered by a list iteration). The inspector runtime works on a live
//! document built from those attributes: it selects elements, correlates
//! list instances into groups and applies style or text changes with undo.
//!
//! # Example
//!
//! ```rust
//! use inspector_ids::{instrument, FileInfo};
//!
//! let file = FileInfo::new("App", "src/App.jsx");
//! let output = instrument("<h1>Hello</h1>", &file).unwrap();
//! assert!(output.source.contains(r#"id="h1-1""#));
//! ```

pub mod attributes;
pub mod config;
pub mod error;
pub mod inspector;
pub mod instrument;
pub mod palette;
pub mod parser;

pub use config::{ConfigError, InstrumentConfig};
pub use error::{InstrumentError, ParseError, Rejection};
pub use inspector::{Document, Inspector, Mode, MutationOutcome};
pub use instrument::{
    instrument_source, BatchReport, FileInfo, IdentityRecord, IdentityRegistry, Instrumenter,
    PassOutput, RegistryScope, SuffixMode,
};
pub use palette::StylePalette;
pub use parser::parse;

/// Instrument a source text with a fresh registry and default settings
pub fn instrument(source: &str, file: &FileInfo) -> Result<PassOutput, ParseError> {
    instrument_with_config(source, file, &InstrumentConfig::default())
}

/// Instrument a source text with a fresh registry built from `config`
pub fn instrument_with_config(
    source: &str,
    file: &FileInfo,
    config: &InstrumentConfig,
) -> Result<PassOutput, ParseError> {
    let mut registry = IdentityRegistry::new(config);
    instrument_source(source, file, &mut registry, &config.iteration_method)
}
