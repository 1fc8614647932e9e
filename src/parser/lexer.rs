//! Lexer for script-mode tokens using logos
//!
//! Markup text, attribute strings and template literal chunks are not lexed
//! here: the grammar scans those raw, because their meaning depends on where
//! the parser currently is.

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f\u{000B}]+")]
pub enum Token {
    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("`")]
    Backtick,
    #[token("@")]
    At,
    #[token("#")]
    Hash,

    // Member access
    #[token(".")]
    Dot,
    #[token("?.")]
    OptionalDot,
    #[token("...")]
    Ellipsis,

    // Tokens the grammar has to look at individually
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("/")]
    Slash,
    #[token("/=")]
    SlashAssign,
    #[token("=")]
    Assign,
    #[token("=>")]
    FatArrow,
    #[token("?")]
    Question,
    #[token("!")]
    Bang,
    #[token("++")]
    Increment,
    #[token("--")]
    Decrement,

    // Remaining operators
    #[token("===")]
    #[token("!==")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("??")]
    #[token("&&=")]
    #[token("||=")]
    #[token("??=")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("**")]
    #[token("%")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("**=")]
    #[token("%=")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("~")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<")]
    #[token(">>")]
    #[token(">>>")]
    #[token("<<=")]
    #[token(">>=")]
    #[token(">>>=")]
    Operator,

    // Literals
    #[regex(r"[a-zA-Z_$\u{80}-\u{10FFFF}][a-zA-Z0-9_$\u{80}-\u{10FFFF}]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\\n]|\\(.|\n))*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    #[regex(r#"'([^'\\\n]|\\(.|\n))*'"#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    String(String),

    #[regex(r"0[xXoObB][0-9a-fA-F_]+n?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", logos::skip)]
    BlockComment,
}

impl Token {
    /// True for the literal tokens whose value is fixed at parse time
    pub fn is_plain_literal(&self) -> bool {
        matches!(self, Token::String(_) | Token::Number(_))
    }
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
