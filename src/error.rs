//! Error types for parsing, instrumentation and runtime rejections

use std::path::PathBuf;

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::config::ConfigError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Syntax { span, .. } => span.clone(),
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return format!("{}: {}", filename, self);
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Errors from running the instrumentation pass over files
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Whole-project run without a source directory
    #[error("source directory {} does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InstrumentError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}

/// Runtime operations the inspector refuses to perform
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("no element is selected")]
    NoSelection,

    #[error("text of dynamic element <{tag}> is rendered from data and cannot be edited")]
    DynamicText { tag: String },

    #[error("text of grouped element <{tag}> is rendered from data and cannot be edited")]
    GroupedText { tag: String },

    #[error("unknown style option '{option}' for '{property}'")]
    UnknownOption { property: String, option: String },

    #[error("selected element is no longer in the document")]
    Detached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_includes_message_and_expected() {
        let err = ParseError::Syntax {
            span: 5..8,
            message: "unclosed element <div>".to_string(),
            expected: vec!["closing tag".to_string()],
        };
        let report = err.format("<ul><div></ul>", "src/App.jsx");
        assert!(report.contains("unclosed element <div>"));
        assert!(report.contains("Expected: closing tag"));
        assert!(report.contains("src/App.jsx"));
    }

    #[test]
    fn test_instrument_error_display() {
        let err = InstrumentError::MissingRoot(PathBuf::from("app/src"));
        assert_eq!(err.to_string(), "source directory app/src does not exist");

        let err = InstrumentError::parse(
            "src/App.jsx",
            ParseError::Syntax {
                span: 0..1,
                message: "unterminated tag".to_string(),
                expected: vec![],
            },
        );
        assert!(err.to_string().starts_with("failed to parse src/App.jsx"));
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::GroupedText {
            tag: "li".to_string(),
        };
        assert!(rejection.to_string().contains("<li>"));
    }
}
