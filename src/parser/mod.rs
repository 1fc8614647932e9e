//! Parser for JSX/TSX component modules

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse, parse_with_method};
