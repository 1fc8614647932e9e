//! Hand-written parser for JSX/TSX modules
//!
//! Script code is lexed one token at a time with logos. Markup, attribute
//! strings, template literals and regular expressions are scanned raw, since
//! their meaning depends on context the lexer cannot see. Only the markup
//! structure and the iteration calls around it are kept; everything else is
//! validated for balanced delimiters and skipped.

use logos::Logos;

use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Words after which an expression (and therefore markup) may start
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "case",
    "default",
    "yield",
    "await",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "instanceof",
];

/// Words followed by a statement block rather than an expression
const BLOCK_KEYWORDS: &[&str] = &["else", "do", "try", "finally"];

/// Parse source text, recognising `.map(...)` calls as iterations
pub fn parse(input: &str) -> Result<Module, ParseError> {
    parse_with_method(input, "map")
}

/// Parse source text with a custom iteration method name
pub fn parse_with_method(input: &str, method: &str) -> Result<Module, ParseError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        method,
    };
    let nodes = parser.scan_script(Until::End)?;
    Ok(Module { nodes })
}

/// Where a run of script code ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Until {
    End,
    /// Unmatched `}`, left unconsumed
    Brace,
    /// Unmatched `)`, left unconsumed
    Paren,
    /// Depth-zero `,` or unmatched `)`, left unconsumed
    Argument,
}

impl Until {
    fn closes_with(self, delim: Delim) -> bool {
        match self {
            Until::End => false,
            Until::Brace => delim == Delim::Brace,
            Until::Paren | Until::Argument => delim == Delim::Paren,
        }
    }

    fn expected(self) -> &'static [&'static str] {
        match self {
            Until::End => &["end of input"],
            Until::Brace => &["'}'"],
            Until::Paren => &["')'"],
            Until::Argument => &["','", "')'"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    Paren,
    Brace,
    Bracket,
}

impl Delim {
    fn closer(self) -> &'static str {
        match self {
            Delim::Paren => "')'",
            Delim::Brace => "'}'",
            Delim::Bracket => "']'",
        }
    }
}

/// What the previous script token was, as far as `<` and `/` care
#[derive(Debug, Clone, PartialEq)]
enum Prev {
    /// Start of a statement or of an arrow body
    Statement,
    Operator,
    Operand,
    Ident(String),
    Dot,
}

impl Prev {
    fn expects_operand(&self) -> bool {
        matches!(self, Prev::Statement | Prev::Operator)
    }
}

type Lexed = (Result<Token, ()>, Span);

fn syntax(span: Span, message: impl Into<String>, expected: &[&str]) -> ParseError {
    ParseError::Syntax {
        span,
        message: message.into(),
        expected: expected.iter().map(|e| e.to_string()).collect(),
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-' | '.' | ':')
}

fn is_attribute_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-' | ':')
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    method: &'a str,
}

impl<'a> Parser<'a> {
    // Cursor helpers

    fn token_at(&self, pos: usize) -> Option<Lexed> {
        let pos = self.skip_trivia_from(pos);
        let mut lexer = Token::lexer(&self.src[pos..]);
        let token = lexer.next()?;
        let span = lexer.span();
        Some((token, pos + span.start..pos + span.end))
    }

    fn peek(&self) -> Option<Lexed> {
        self.token_at(self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance_char(&mut self) {
        if let Some(c) = self.current_char() {
            self.pos += c.len_utf8();
        }
    }

    fn char_span(&self) -> Span {
        let len = self.current_char().map_or(0, char::len_utf8);
        self.pos..self.pos + len
    }

    fn skip_trivia_from(&self, mut pos: usize) -> usize {
        loop {
            let rest = &self.src[pos..];
            if let Some(c) = rest.chars().next().filter(|c| c.is_whitespace()) {
                pos += c.len_utf8();
            } else if rest.starts_with("//") {
                pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                pos += rest[2..].find("*/").map_or(rest.len(), |i| i + 4);
            } else {
                return pos;
            }
        }
    }

    fn skip_trivia(&mut self) {
        self.pos = self.skip_trivia_from(self.pos);
    }

    fn take_while(&mut self, accept: fn(char) -> bool) -> Span {
        let start = self.pos;
        while let Some(c) = self.current_char().filter(|&c| accept(c)) {
            self.pos += c.len_utf8();
        }
        start..self.pos
    }

    // Script

    fn scan_script(&mut self, until: Until) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        // Open delimiters; the flag marks braces that open a statement block
        let mut open: Vec<(Delim, Span, bool)> = Vec::new();
        let mut prev = Prev::Statement;

        loop {
            let Some((token, span)) = self.peek() else {
                if let Some((delim, at, _)) = open.last() {
                    return Err(syntax(at.clone(), "unclosed delimiter", &[delim.closer()]));
                }
                self.pos = self.src.len();
                return match until {
                    Until::End => Ok(nodes),
                    _ => Err(syntax(
                        self.src.len()..self.src.len(),
                        "unexpected end of input",
                        until.expected(),
                    )),
                };
            };

            let Ok(token) = token else {
                self.pos = span.end;
                prev = Prev::Operand;
                continue;
            };

            match token {
                Token::ParenOpen | Token::BraceOpen | Token::BracketOpen => {
                    let delim = match token {
                        Token::ParenOpen => Delim::Paren,
                        Token::BraceOpen => Delim::Brace,
                        _ => Delim::Bracket,
                    };
                    let block = delim == Delim::Brace && prev != Prev::Operator;
                    open.push((delim, span.clone(), block));
                    self.pos = span.end;
                    prev = Prev::Operator;
                }
                Token::ParenClose | Token::BraceClose | Token::BracketClose => {
                    let delim = match token {
                        Token::ParenClose => Delim::Paren,
                        Token::BraceClose => Delim::Brace,
                        _ => Delim::Bracket,
                    };
                    match open.pop() {
                        Some((expected, _, block)) if expected == delim => {
                            self.pos = span.end;
                            prev = if block { Prev::Statement } else { Prev::Operand };
                        }
                        Some((expected, _, _)) => {
                            return Err(syntax(span, "mismatched delimiter", &[expected.closer()]));
                        }
                        None if until.closes_with(delim) => {
                            self.pos = span.start;
                            return Ok(nodes);
                        }
                        None => {
                            return Err(syntax(span, "unexpected closing delimiter", until.expected()));
                        }
                    }
                }
                Token::Comma if open.is_empty() && until == Until::Argument => {
                    self.pos = span.start;
                    return Ok(nodes);
                }
                Token::Backtick => {
                    self.pos = span.start;
                    self.scan_template(&mut nodes)?;
                    prev = Prev::Operand;
                }
                Token::Slash | Token::SlashAssign if prev.expects_operand() => {
                    self.pos = span.start;
                    self.scan_regex()?;
                    prev = Prev::Operand;
                }
                Token::Lt if prev.expects_operand() => {
                    if self.at_type_parameters(span.end) {
                        self.pos = span.end;
                        self.skip_type_parameters(span.clone())?;
                        prev = Prev::Operator;
                    } else if self.at_markup(span.end) {
                        self.pos = span.start;
                        nodes.push(Node::Element(self.parse_element()?));
                        prev = Prev::Operand;
                    } else {
                        self.pos = span.end;
                        prev = Prev::Operator;
                    }
                }
                Token::Dot | Token::OptionalDot => {
                    if let Some((iteration, rest)) = self.try_iteration(&prev, span.clone())? {
                        nodes.push(Node::Iteration(iteration));
                        nodes.extend(rest);
                        prev = Prev::Operand;
                    } else {
                        self.pos = span.end;
                        prev = Prev::Dot;
                    }
                }
                Token::Semicolon | Token::FatArrow => {
                    self.pos = span.end;
                    prev = Prev::Statement;
                }
                Token::Ident(name) => {
                    self.pos = span.end;
                    prev = if prev == Prev::Dot {
                        Prev::Ident(name)
                    } else if BLOCK_KEYWORDS.contains(&name.as_str()) {
                        Prev::Statement
                    } else if EXPRESSION_KEYWORDS.contains(&name.as_str()) {
                        Prev::Operator
                    } else {
                        Prev::Ident(name)
                    };
                }
                Token::String(_) | Token::Number(_) | Token::Increment | Token::Decrement => {
                    self.pos = span.end;
                    prev = Prev::Operand;
                }
                _ => {
                    self.pos = span.end;
                    prev = Prev::Operator;
                }
            }
        }
    }

    fn scan_template(&mut self, nodes: &mut Vec<Node>) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.current_char() {
                None => {
                    return Err(syntax(start..start + 1, "unterminated template literal", &["'`'"]));
                }
                Some('`') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some('\\') => {
                    self.pos += 1;
                    self.advance_char();
                }
                Some('$') if self.rest().starts_with("${") => {
                    self.pos += 2;
                    nodes.extend(self.scan_script(Until::Brace)?);
                    self.pos += 1;
                }
                Some(_) => self.advance_char(),
            }
        }
    }

    fn scan_regex(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.current_char() {
                None | Some('\n') => {
                    return Err(syntax(
                        start..self.pos,
                        "unterminated regular expression",
                        &["'/'"],
                    ));
                }
                Some('\\') => {
                    self.pos += 1;
                    self.advance_char();
                }
                Some('[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.advance_char(),
            }
        }
        self.take_while(|c| c.is_ascii_alphabetic());
        Ok(())
    }

    /// `<T,>`, `<T extends U>` or `<T>(...) =>` in expression or type position
    fn at_type_parameters(&self, after_lt: usize) -> bool {
        let Some((Ok(Token::Ident(_)), first)) = self.token_at(after_lt) else {
            return false;
        };
        match self.token_at(first.end) {
            Some((Ok(Token::Comma), _)) => true,
            Some((Ok(Token::Ident(word)), _)) => word == "extends",
            Some((Ok(Token::Gt), gt)) => self.at_signature(gt.end),
            _ => false,
        }
    }

    /// A parenthesized parameter list followed by `=>`
    fn at_signature(&self, pos: usize) -> bool {
        let Some((Ok(Token::ParenOpen), open)) = self.token_at(pos) else {
            return false;
        };
        let mut depth = 1usize;
        let mut pos = open.end;
        while depth > 0 {
            match self.token_at(pos) {
                Some((Ok(Token::ParenOpen), span)) => {
                    depth += 1;
                    pos = span.end;
                }
                Some((Ok(Token::ParenClose), span)) => {
                    depth -= 1;
                    pos = span.end;
                }
                Some((_, span)) => pos = span.end,
                None => return false,
            }
        }
        matches!(self.token_at(pos), Some((Ok(Token::FatArrow), _)))
    }

    fn skip_type_parameters(&mut self, open: Span) -> Result<(), ParseError> {
        let mut depth: i32 = 1;
        while depth > 0 {
            let Some((token, span)) = self.peek() else {
                return Err(syntax(open, "unclosed type parameter list", &["'>'"]));
            };
            depth += match token {
                Ok(Token::Lt) => 1,
                Ok(Token::Gt) => -1,
                Ok(Token::Operator) => match &self.src[span.clone()] {
                    ">>" => -2,
                    ">>>" => -3,
                    _ => 0,
                },
                _ => 0,
            };
            self.pos = span.end;
        }
        Ok(())
    }

    fn at_markup(&self, after_lt: usize) -> bool {
        let pos = self.skip_trivia_from(after_lt);
        self.src[pos..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || is_name_start(c))
    }

    // Iterations

    fn try_iteration(
        &mut self,
        prev: &Prev,
        dot: Span,
    ) -> Result<Option<(Iteration, Vec<Node>)>, ParseError> {
        if prev.expects_operand() || *prev == Prev::Dot {
            return Ok(None);
        }
        let Some((Ok(Token::Ident(method)), method_span)) = self.token_at(dot.end) else {
            return Ok(None);
        };
        if method != self.method {
            return Ok(None);
        }
        let Some((Ok(Token::ParenOpen), paren)) = self.token_at(method_span.end) else {
            return Ok(None);
        };

        let receiver = match prev {
            Prev::Ident(name) if name != "this" => Some(name.clone()),
            _ => None,
        };

        self.pos = paren.end;
        let Some((callback, nodes)) = self.callback()? else {
            self.pos = dot.start;
            return Ok(None);
        };

        // Remaining arguments belong to the enclosing scope
        let rest = self.scan_script(Until::Paren)?;
        self.pos += 1;

        Ok(Some((
            Iteration {
                receiver,
                callback,
                nodes,
                span: dot.start..self.pos,
            },
            rest,
        )))
    }

    /// Parse a callback argument; `None` when the argument is not a function literal
    fn callback(&mut self) -> Result<Option<(Callback, Vec<Node>)>, ParseError> {
        if let Some((Ok(Token::Ident(word)), span)) = self.peek() {
            if word == "async" && !matches!(self.token_at(span.end), Some((Ok(Token::FatArrow), _))) {
                self.pos = span.end;
            }
        }

        match self.peek() {
            Some((Ok(Token::Ident(word)), span)) if word == "function" => {
                self.pos = span.end;
                if let Some((Ok(Token::Ident(_)), name)) = self.peek() {
                    self.pos = name.end;
                }
                let Some((Ok(Token::ParenOpen), open)) = self.peek() else {
                    return Ok(None);
                };
                self.pos = open.end;
                let Some((params, list)) = self.parameters() else {
                    return Ok(None);
                };
                if !self.skip_return_type() {
                    return Ok(None);
                }
                let Some((Ok(Token::BraceOpen), body)) = self.peek() else {
                    return Ok(None);
                };
                self.pos = body.end;
                let nodes = self.scan_script(Until::Brace)?;
                self.pos += 1;
                Ok(Some((Callback { params, list }, nodes)))
            }
            Some((Ok(Token::ParenOpen), open)) => {
                self.pos = open.end;
                let Some((params, list)) = self.parameters() else {
                    return Ok(None);
                };
                if !self.skip_return_type() {
                    return Ok(None);
                }
                let Some((Ok(Token::FatArrow), arrow)) = self.peek() else {
                    return Ok(None);
                };
                self.pos = arrow.end;
                let nodes = self.arrow_body()?;
                Ok(Some((Callback { params, list }, nodes)))
            }
            Some((Ok(Token::Ident(name)), span)) => {
                let Some((Ok(Token::FatArrow), arrow)) = self.token_at(span.end) else {
                    return Ok(None);
                };
                self.pos = arrow.end;
                let nodes = self.arrow_body()?;
                Ok(Some((
                    Callback {
                        params: vec![Param::Named(Spanned::new(name, span.clone()))],
                        list: ParamList::Bare { span },
                    },
                    nodes,
                )))
            }
            _ => Ok(None),
        }
    }

    fn arrow_body(&mut self) -> Result<Vec<Node>, ParseError> {
        match self.peek() {
            Some((Ok(Token::BraceOpen), open)) => {
                self.pos = open.end;
                let nodes = self.scan_script(Until::Brace)?;
                self.pos += 1;
                Ok(nodes)
            }
            _ => self.scan_script(Until::Argument),
        }
    }

    /// Parameter list after `(`, consuming the closing `)`
    fn parameters(&mut self) -> Option<(Vec<Param>, ParamList)> {
        let mut params = Vec::new();
        let mut trailing_comma = false;
        loop {
            let (token, span) = self.peek()?;
            match token.ok()? {
                Token::ParenClose => {
                    self.pos = span.end;
                    let list = ParamList::Parenthesized {
                        close: span.start,
                        trailing_comma,
                    };
                    return Some((params, list));
                }
                Token::Ellipsis => {
                    self.pos = span.end;
                    params.push(Param::Rest);
                }
                Token::Ident(name) => {
                    self.pos = span.end;
                    params.push(Param::Named(Spanned::new(name, span)));
                }
                Token::BraceOpen | Token::BracketOpen => {
                    if !self.skip_balanced() {
                        return None;
                    }
                    params.push(Param::Pattern);
                }
                _ => return None,
            }
            trailing_comma = false;

            if !self.skip_parameter_tail() {
                return None;
            }
            match self.peek()? {
                (Ok(Token::Comma), comma) => {
                    self.pos = comma.end;
                    trailing_comma = true;
                }
                (Ok(Token::ParenClose), _) => {}
                _ => return None,
            }
        }
    }

    /// Skip a destructuring pattern starting at `{` or `[`
    fn skip_balanced(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            let Some((Ok(token), span)) = self.peek() else {
                return false;
            };
            self.pos = span.end;
            match token {
                Token::ParenOpen | Token::BraceOpen | Token::BracketOpen => depth += 1,
                Token::ParenClose | Token::BraceClose | Token::BracketClose => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
    }

    /// Skip a type annotation or default value up to the next `,` or `)`
    fn skip_parameter_tail(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            let Some((Ok(token), span)) = self.peek() else {
                return false;
            };
            match token {
                Token::Comma | Token::ParenClose if depth == 0 => return true,
                Token::ParenOpen | Token::BraceOpen | Token::BracketOpen | Token::Lt => depth += 1,
                Token::ParenClose | Token::BraceClose | Token::BracketClose | Token::Gt => {
                    depth = depth.saturating_sub(1)
                }
                Token::Operator => match &self.src[span.clone()] {
                    ">>" => depth = depth.saturating_sub(2),
                    ">>>" => depth = depth.saturating_sub(3),
                    _ => {}
                },
                _ => {}
            }
            self.pos = span.end;
        }
    }

    /// Skip `: Type` after a parameter list, stopping before `=>` or `{`
    fn skip_return_type(&mut self) -> bool {
        let Some((Ok(Token::Colon), colon)) = self.peek() else {
            return true;
        };
        self.pos = colon.end;
        let mut depth = 0usize;
        loop {
            let Some((Ok(token), span)) = self.peek() else {
                return false;
            };
            match token {
                Token::FatArrow if depth == 0 => return true,
                Token::BraceOpen if depth == 0 && !self.src[colon.end..span.start].trim().is_empty() => {
                    return true
                }
                Token::Comma | Token::ParenClose if depth == 0 => return false,
                Token::ParenOpen | Token::BracketOpen | Token::Lt | Token::BraceOpen => depth += 1,
                Token::ParenClose | Token::BracketClose | Token::Gt | Token::BraceClose => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.pos = span.end;
        }
    }

    // Markup

    fn parse_element(&mut self) -> Result<Element, ParseError> {
        let start = self.pos;
        self.pos += 1;
        self.skip_trivia();

        let name = if self.current_char() == Some('>') {
            Spanned::new(ElementName::Fragment, self.pos..self.pos)
        } else {
            self.tag_name()?
        };

        let mut attributes = Vec::new();
        loop {
            self.skip_trivia();
            match self.current_char() {
                Some('>') => {
                    self.pos += 1;
                    break;
                }
                Some('/') if self.rest().starts_with("/>") => {
                    self.pos += 2;
                    return Ok(Element {
                        name,
                        attributes,
                        children: Vec::new(),
                        self_closing: true,
                        span: start..self.pos,
                    });
                }
                Some('{') => attributes.push(Attribute::Spread(self.expression_container()?)),
                Some(c) if is_name_start(c) => attributes.push(self.named_attribute()?),
                Some(_) => {
                    return Err(syntax(
                        self.char_span(),
                        format!("unexpected character in <{}> tag", name.node.as_str()),
                        &["attribute", "'>'", "'/>'"],
                    ));
                }
                None => {
                    return Err(syntax(start..start + 1, "unterminated tag", &["'>'", "'/>'"]));
                }
            }
        }

        let children = self.parse_children(&name)?;
        Ok(Element {
            name,
            attributes,
            children,
            self_closing: false,
            span: start..self.pos,
        })
    }

    fn tag_name(&mut self) -> Result<Spanned<ElementName>, ParseError> {
        let span = self.take_while(is_tag_char);
        if span.is_empty() {
            return Err(syntax(self.char_span(), "expected tag name", &["tag name"]));
        }
        let text = self.src[span.clone()].to_string();
        let name = if text.contains('.') {
            ElementName::Member(text)
        } else if text.contains(':') {
            ElementName::Namespaced(text)
        } else {
            ElementName::Ident(text)
        };
        Ok(Spanned::new(name, span))
    }

    fn named_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name_span = self.take_while(is_attribute_char);
        let name = Spanned::new(self.src[name_span.clone()].to_string(), name_span.clone());

        let after_name = self.pos;
        self.skip_trivia();
        if self.current_char() != Some('=') {
            self.pos = after_name;
            return Ok(Attribute::Named(NamedAttribute {
                name,
                value: None,
                span: name_span,
            }));
        }
        self.pos += 1;
        self.skip_trivia();

        let value = match self.current_char() {
            Some(quote @ ('"' | '\'')) => {
                let open = self.pos;
                self.pos += 1;
                let Some(len) = self.rest().find(quote) else {
                    return Err(syntax(open..open + 1, "unterminated attribute string", &[]));
                };
                let text = self.rest()[..len].to_string();
                self.pos += len + 1;
                AttrValue::Literal(Spanned::new(text, open..self.pos))
            }
            Some('{') => AttrValue::Expression(self.expression_container()?),
            Some('<') => AttrValue::Element(Box::new(self.parse_element()?)),
            _ => {
                return Err(syntax(
                    self.char_span(),
                    format!("expected value for attribute '{}'", name.node),
                    &["string", "'{'", "element"],
                ));
            }
        };

        Ok(Attribute::Named(NamedAttribute {
            name,
            value: Some(value),
            span: name_span.start..self.pos,
        }))
    }

    fn expression_container(&mut self) -> Result<ExprContainer, ParseError> {
        let start = self.pos;
        self.pos += 1;

        let kind = match self.peek() {
            Some((Ok(Token::BraceClose), _)) => ExprKind::Empty,
            Some((Ok(token), span)) => {
                let closes = matches!(self.token_at(span.end), Some((Ok(Token::BraceClose), _)));
                match token {
                    Token::String(_) if closes => ExprKind::StringLiteral,
                    Token::Number(_) if closes => ExprKind::NumberLiteral,
                    _ => ExprKind::Computed,
                }
            }
            _ => ExprKind::Computed,
        };

        let nodes = self.scan_script(Until::Brace)?;
        self.pos += 1;
        Ok(ExprContainer {
            kind,
            nodes,
            span: start..self.pos,
        })
    }

    fn parse_children(&mut self, name: &Spanned<ElementName>) -> Result<Vec<Child>, ParseError> {
        let mut children = Vec::new();
        loop {
            match self.current_char() {
                None => {
                    return Err(syntax(
                        name.span.clone(),
                        format!("unclosed element <{}>", name.node.as_str()),
                        &["closing tag"],
                    ));
                }
                Some('<') => {
                    let after = self.skip_trivia_from(self.pos + 1);
                    if self.src[after..].starts_with('/') {
                        self.closing_tag(name)?;
                        return Ok(children);
                    }
                    children.push(Child::Element(self.parse_element()?));
                }
                Some('{') => children.push(Child::Expression(self.expression_container()?)),
                Some(_) => {
                    let start = self.pos;
                    let len = self
                        .rest()
                        .find(|c| c == '<' || c == '{')
                        .unwrap_or(self.rest().len());
                    self.pos += len;
                    children.push(Child::Text(start..self.pos));
                }
            }
        }
    }

    fn closing_tag(&mut self, name: &Spanned<ElementName>) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos = self.skip_trivia_from(self.pos + 1) + 1;
        self.skip_trivia();
        let closing = self.take_while(is_tag_char);
        let closing = &self.src[closing];
        if closing != name.node.as_str() {
            return Err(syntax(
                start..self.pos,
                format!(
                    "mismatched closing tag </{}> for <{}>",
                    closing,
                    name.node.as_str()
                ),
                &[],
            ));
        }
        self.skip_trivia();
        if self.current_char() != Some('>') {
            return Err(syntax(self.char_span(), "unterminated closing tag", &["'>'"]));
        }
        self.pos += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(module: &Module) -> Vec<String> {
        let mut names = Vec::new();
        walk_elements(&module.nodes, &mut |el| names.push(el.name.node.as_str().to_string()));
        names
    }

    fn collect_iterations<'a>(nodes: &'a [Node], found: &mut Vec<&'a Iteration>) {
        for node in nodes {
            match node {
                Node::Iteration(iteration) => {
                    found.push(iteration);
                    collect_iterations(&iteration.nodes, found);
                }
                Node::Element(el) => collect_in_element(el, found),
            }
        }
    }

    fn collect_in_element<'a>(el: &'a Element, found: &mut Vec<&'a Iteration>) {
        for child in &el.children {
            match child {
                Child::Expression(expr) => collect_iterations(&expr.nodes, found),
                Child::Element(inner) => collect_in_element(inner, found),
                Child::Text(_) => {}
            }
        }
    }

    fn first_iteration(nodes: &[Node]) -> Option<&Iteration> {
        let mut found = Vec::new();
        collect_iterations(nodes, &mut found);
        found.into_iter().next()
    }

    #[test]
    fn test_simple_component() {
        let src = r#"
export default function App() {
  return <div className="app"><h1>Hello</h1></div>;
}
"#;
        let module = parse(src).unwrap();
        assert_eq!(elements(&module), vec!["div", "h1"]);
    }

    #[test]
    fn test_fragment_and_self_closing() {
        let module = parse("const x = <><br /><img src='a.png'/></>;").unwrap();
        let Node::Element(fragment) = &module.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(fragment.name.node, ElementName::Fragment);
        assert_eq!(fragment.children.len(), 2);
        assert_eq!(elements(&module), vec!["", "br", "img"]);
    }

    #[test]
    fn test_member_and_namespaced_names() {
        let module = parse("<motion.div><svg:rect /></motion.div>").unwrap();
        let Node::Element(el) = &module.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(el.name.node, ElementName::Member("motion.div".to_string()));
        let Child::Element(inner) = &el.children[0] else {
            panic!("expected child element");
        };
        assert_eq!(inner.name.node, ElementName::Namespaced("svg:rect".to_string()));
    }

    #[test]
    fn test_attribute_kinds() {
        let src = r#"<input disabled type="text" value={name} size={3} {...rest} />"#;
        let module = parse(src).unwrap();
        let Node::Element(el) = &module.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(el.attributes.len(), 5);
        assert!(el.attribute("disabled").unwrap().value.is_none());
        assert!(el.attribute("type").unwrap().value.as_ref().unwrap().is_literal());
        assert!(!el.attribute("value").unwrap().value.as_ref().unwrap().is_literal());
        assert!(el.attribute("size").unwrap().value.as_ref().unwrap().is_literal());
        assert!(matches!(el.attributes[4], Attribute::Spread(_)));
    }

    #[test]
    fn test_name_span_points_at_tag() {
        let src = "<section id='a'></section>";
        let module = parse(src).unwrap();
        let Node::Element(el) = &module.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(&src[el.name.span.clone()], "section");
        assert_eq!(el.span, 0..src.len());
    }

    #[test]
    fn test_child_expression_kinds() {
        let module = parse("<p>{'a'}{1}{/* note */}{count}</p>").unwrap();
        let Node::Element(el) = &module.nodes[0] else {
            panic!("expected element");
        };
        let kinds: Vec<_> = el
            .children
            .iter()
            .filter_map(|c| match c {
                Child::Expression(expr) => Some(expr.kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                ExprKind::StringLiteral,
                ExprKind::NumberLiteral,
                ExprKind::Empty,
                ExprKind::Computed
            ]
        );
    }

    #[test]
    fn test_map_with_parenthesized_params() {
        let src = "<ul>{todos.map((todo, i) => <li key={i}>{todo}</li>)}</ul>";
        let module = parse(src).unwrap();
        let iteration = first_iteration(&module.nodes).unwrap();
        assert_eq!(iteration.receiver.as_deref(), Some("todos"));
        assert_eq!(iteration.callback.item_name(), Some("todo"));
        assert_eq!(iteration.callback.index_name(), Some("i"));
        assert_eq!(iteration.nodes.len(), 1);
    }

    #[test]
    fn test_map_with_bare_param_and_member_receiver() {
        let src = "<ul>{props.items?.map(item => (<li>{item}</li>))}</ul>";
        let module = parse(src).unwrap();
        let iteration = first_iteration(&module.nodes).unwrap();
        assert_eq!(iteration.receiver.as_deref(), Some("items"));
        assert_eq!(iteration.callback.item_name(), Some("item"));
        assert_eq!(iteration.callback.index_name(), None);
        let ParamList::Bare { span } = &iteration.callback.list else {
            panic!("expected bare parameter");
        };
        assert_eq!(&src[span.clone()], "item");
    }

    #[test]
    fn test_map_with_function_expression_and_block_body() {
        let src = r#"
const list = rows.map(function (row, idx) {
  const label = `${row.name}`;
  return <tr key={idx}><td>{label}</td></tr>;
});
"#;
        let module = parse(src).unwrap();
        let Node::Iteration(iteration) = &module.nodes[0] else {
            panic!("expected iteration");
        };
        assert_eq!(iteration.receiver.as_deref(), Some("rows"));
        assert_eq!(iteration.callback.index_name(), Some("idx"));
        assert_eq!(elements(&module), vec!["tr", "td"]);
    }

    #[test]
    fn test_map_with_block_bodied_arrow() {
        let src = r#"<ul>
  {todos.map((todo, i) => {
    const label = todo.trim();
    return <li key={i}>{label}</li>;
  })}
</ul>"#;
        let module = parse(src).unwrap();
        let iteration = first_iteration(&module.nodes).unwrap();
        assert_eq!(iteration.receiver.as_deref(), Some("todos"));
        assert_eq!(iteration.callback.index_name(), Some("i"));
        assert_eq!(&src[iteration.span.end - 1..iteration.span.end], ")");
        assert_eq!(elements(&module), vec!["ul", "li"]);
    }

    #[test]
    fn test_closing_brace_on_its_own_line() {
        let src = r#"<button
  onClick={toggle}
  className={`btn ${
    active ? 'on' : 'off'}`
  }
>
  {label
  }
</button>"#;
        let module = parse(src).unwrap();
        let Node::Element(el) = &module.nodes[0] else {
            panic!("expected element");
        };
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.span, 0..src.len());
        let expressions = el
            .children
            .iter()
            .filter(|c| matches!(c, Child::Expression(_)))
            .count();
        assert_eq!(expressions, 1);
    }

    #[test]
    fn test_map_on_call_result_has_no_receiver() {
        let src = "Object.keys(data).map((key) => <span>{key}</span>)";
        let module = parse(src).unwrap();
        let Node::Iteration(iteration) = &module.nodes[0] else {
            panic!("expected iteration");
        };
        assert_eq!(iteration.receiver, None);
        let ParamList::Parenthesized { close, trailing_comma } = iteration.callback.list else {
            panic!("expected parenthesized parameters");
        };
        assert_eq!(&src[close..close + 1], ")");
        assert!(!trailing_comma);
    }

    #[test]
    fn test_map_with_named_function_is_not_an_iteration() {
        let module = parse("<ul>{items.map(renderItem)}</ul>").unwrap();
        assert!(first_iteration(&module.nodes).is_none());
    }

    #[test]
    fn test_typed_callback_with_destructuring() {
        let src = "items.map(({ id, label }: Item, index: number): JSX.Element => <li>{label}</li>)";
        let module = parse(src).unwrap();
        let Node::Iteration(iteration) = &module.nodes[0] else {
            panic!("expected iteration");
        };
        assert_eq!(iteration.callback.params.len(), 2);
        assert_eq!(iteration.callback.item_name(), None);
        assert_eq!(iteration.callback.index_name(), Some("index"));
    }

    #[test]
    fn test_nested_iterations() {
        let src = "<div>{groups.map(g => <section>{g.members.map(m => <p>{m}</p>)}</section>)}</div>";
        let module = parse(src).unwrap();
        let outer = first_iteration(&module.nodes).unwrap();
        assert_eq!(outer.receiver.as_deref(), Some("groups"));
        let Node::Element(section) = &outer.nodes[0] else {
            panic!("expected element");
        };
        let Child::Expression(expr) = &section.children[0] else {
            panic!("expected expression");
        };
        let Node::Iteration(inner) = &expr.nodes[0] else {
            panic!("expected nested iteration");
        };
        assert_eq!(inner.receiver.as_deref(), Some("members"));
    }

    #[test]
    fn test_comparisons_and_generics_are_not_markup() {
        let src = r#"
const ok = a < b && c > d;
const [items, setItems] = useState<string[]>([]);
const id = <T,>(value: T) => value;
const view = <div>{ok ? 1 : 2}</div>;
"#;
        let module = parse(src).unwrap();
        assert_eq!(elements(&module), vec!["div"]);
    }

    #[test]
    fn test_generic_signature_in_type_position() {
        let src = r#"
type Wrap = (a: number) => <T>(b: T) => T;
const id = <T>(value: T) => value;
const view = <T>text</T>;
"#;
        let module = parse(src).unwrap();
        assert_eq!(elements(&module), vec!["T"]);
    }

    #[test]
    fn test_regex_after_statement_block() {
        let src = r#"
if (x) {} /"}/.test(s);
const ok = () => {
  return true;
}
/<b>/.test(s) && render(<p />);
const ratio = { a: 1 }.a / 2;
"#;
        let module = parse(src).unwrap();
        assert_eq!(elements(&module), vec!["p"]);
    }

    #[test]
    fn test_regex_and_template_literals() {
        let src = r#"
const re = /<div>[/]/g;
const text = `<p>${count > 1 ? <b>many</b> : "one"}</p>`;
"#;
        let module = parse(src).unwrap();
        assert_eq!(elements(&module), vec!["b"]);
    }

    #[test]
    fn test_text_with_apostrophes() {
        let module = parse("<p>Don't panic, it's fine</p>").unwrap();
        assert_eq!(elements(&module), vec!["p"]);
    }

    #[test]
    fn test_mismatched_closing_tag() {
        let err = parse("<div><span></div></span>").unwrap_err();
        let ParseError::Syntax { message, .. } = err;
        assert!(message.contains("mismatched closing tag"));
    }

    #[test]
    fn test_unclosed_element() {
        let err = parse("const a = <div><p>text</p>").unwrap_err();
        let ParseError::Syntax { message, span, .. } = err;
        assert!(message.contains("unclosed element <div>"));
        assert_eq!(span, 11..14);
    }

    #[test]
    fn test_unbalanced_script() {
        assert!(parse("function f() { return (1; }").is_err());
        assert!(parse("const a = [1, 2;").is_err());
    }

    #[test]
    fn test_trailing_comma_parameter() {
        let module = parse("list.map((entry,) => <i />)").unwrap();
        let Node::Iteration(iteration) = &module.nodes[0] else {
            panic!("expected iteration");
        };
        assert!(matches!(
            iteration.callback.list,
            ParamList::Parenthesized {
                trailing_comma: true,
                ..
            }
        ));
    }

    #[test]
    fn test_custom_iteration_method() {
        let module = parse_with_method("rows.each(r => <tr />)", "each").unwrap();
        assert!(matches!(module.nodes[0], Node::Iteration(_)));
        let module = parse_with_method("rows.map(r => <tr />)", "each").unwrap();
        assert!(matches!(module.nodes[0], Node::Element(_)));
    }
}
