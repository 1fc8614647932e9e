//! Markup tree produced by the parser
//!
//! The tree only models what instrumentation needs: markup elements, their
//! attributes and children, embedded expression containers and the iteration
//! constructs (`collection.map(callback)`) that surround them. Ordinary script
//! code between those nodes is skipped over and left to the source text.

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Root of a parsed source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub nodes: Vec<Node>,
}

/// A markup-relevant node found in script code
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `<tag ...>...</tag>`, `<tag />` or a fragment
    Element(Element),
    /// `receiver.map(callback)` with the nodes found inside the call
    Iteration(Iteration),
}

/// Tag name of a markup element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementName {
    /// `<>...</>`
    Fragment,
    /// Plain identifier such as `div`, `my-widget` or `Header`
    Ident(String),
    /// Member expression such as `motion.div` or `React.Fragment`
    Member(String),
    /// Namespaced name such as `svg:rect`
    Namespaced(String),
}

impl ElementName {
    /// Source text of the name, empty for fragments
    pub fn as_str(&self) -> &str {
        match self {
            ElementName::Fragment => "",
            ElementName::Ident(s) | ElementName::Member(s) | ElementName::Namespaced(s) => s,
        }
    }
}

/// A markup element
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: Spanned<ElementName>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Child>,
    pub self_closing: bool,
    pub span: Span,
}

impl Element {
    /// Find a named attribute
    pub fn attribute(&self, name: &str) -> Option<&NamedAttribute> {
        self.attributes.iter().find_map(|attr| match attr {
            Attribute::Named(named) if named.name.node == name => Some(named),
            _ => None,
        })
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// Attribute in an opening tag
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// `name`, `name="text"`, `name={expr}` or `name=<el />`
    Named(NamedAttribute),
    /// `{...props}`
    Spread(ExprContainer),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedAttribute {
    pub name: Spanned<String>,
    pub value: Option<AttrValue>,
    pub span: Span,
}

/// Value of a named attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Quoted string, stored without quotes
    Literal(Spanned<String>),
    /// `{...}`
    Expression(ExprContainer),
    /// Element used directly as a value
    Element(Box<Element>),
}

impl AttrValue {
    /// True when the value is known at parse time
    pub fn is_literal(&self) -> bool {
        match self {
            AttrValue::Literal(_) => true,
            AttrValue::Expression(expr) => expr.kind.is_literal(),
            AttrValue::Element(_) => false,
        }
    }
}

/// Child of a markup element
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Text(Span),
    Expression(ExprContainer),
    Element(Element),
}

/// Braced expression embedded in markup
#[derive(Debug, Clone, PartialEq)]
pub struct ExprContainer {
    pub kind: ExprKind,
    /// Markup nodes found inside the expression
    pub nodes: Vec<Node>,
    /// Span including the braces
    pub span: Span,
}

/// Shape of an embedded expression, as far as classification cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
    /// Nothing but whitespace or comments: `{/* note */}`
    Empty,
    StringLiteral,
    NumberLiteral,
    /// Anything evaluated at render time
    Computed,
}

impl ExprKind {
    pub fn is_literal(self) -> bool {
        matches!(self, ExprKind::StringLiteral | ExprKind::NumberLiteral)
    }
}

/// An iteration construct: `receiver.map(callback)`
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    /// Receiver identifier, or the last property name of a member receiver
    pub receiver: Option<String>,
    pub callback: Callback,
    /// Markup nodes found inside the callback
    pub nodes: Vec<Node>,
    /// Span from the member access dot to the closing parenthesis
    pub span: Span,
}

/// Parameter list of an iteration callback
#[derive(Debug, Clone, PartialEq)]
pub struct Callback {
    pub params: Vec<Param>,
    pub list: ParamList,
}

impl Callback {
    /// Name of the item parameter, if it is a plain identifier
    pub fn item_name(&self) -> Option<&str> {
        self.params.first().and_then(Param::name)
    }

    /// Name of the index parameter, if it is a plain identifier
    pub fn index_name(&self) -> Option<&str> {
        self.params.get(1).and_then(Param::name)
    }

    pub fn has_rest(&self) -> bool {
        self.params.iter().any(|p| matches!(p, Param::Rest))
    }
}

/// How the callback spells its parameter list
#[derive(Debug, Clone, PartialEq)]
pub enum ParamList {
    /// `(a, b) =>` or `function (a, b)`; offset of the closing parenthesis
    Parenthesized { close: usize, trailing_comma: bool },
    /// `a =>`; span of the single identifier
    Bare { span: Span },
}

/// One callback parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Named(Spanned<String>),
    /// Object or array destructuring
    Pattern,
    /// `...rest`
    Rest,
}

impl Param {
    pub fn name(&self) -> Option<&str> {
        match self {
            Param::Named(name) => Some(name.node.as_str()),
            Param::Pattern | Param::Rest => None,
        }
    }
}

/// Visit every element in a node list in document order
pub fn walk_elements<'a>(nodes: &'a [Node], visit: &mut impl FnMut(&'a Element)) {
    for node in nodes {
        match node {
            Node::Element(element) => walk_element(element, visit),
            Node::Iteration(iteration) => walk_elements(&iteration.nodes, visit),
        }
    }
}

fn walk_element<'a>(element: &'a Element, visit: &mut impl FnMut(&'a Element)) {
    visit(element);
    for attr in &element.attributes {
        match attr {
            Attribute::Named(NamedAttribute {
                value: Some(AttrValue::Expression(expr)),
                ..
            })
            | Attribute::Spread(expr) => walk_elements(&expr.nodes, visit),
            Attribute::Named(NamedAttribute {
                value: Some(AttrValue::Element(inner)),
                ..
            }) => walk_element(inner, visit),
            Attribute::Named(_) => {}
        }
    }
    for child in &element.children {
        match child {
            Child::Element(inner) => walk_element(inner, visit),
            Child::Expression(expr) => walk_elements(&expr.nodes, visit),
            Child::Text(_) => {}
        }
    }
}
