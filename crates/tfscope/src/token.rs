//! token data model
//!
//! Tokens live in a flat arena ([crate::tree::TokenTree]) and refer to each other by [TokenId].
//! A token id is its index in that arena, so ids are unique within one lex pass and increase in creation order.
use serde::Serialize;

/// Index of a [Token] inside its owning [crate::tree::TokenTree]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenId(pub usize);

impl std::fmt::Display for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Root,
    Block,
    Attribute,
    Assignment,
    Identifier,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,
    NullLiteral,
    ArrayLiteral,
    ObjectLiteral,
    FunctionCall,
    PropertyAccess,
    Interpolation,
    Heredoc,
    Comment,
    Whitespace,
    Punctuation,
    Operator,
    Unknown,
}

impl TokenKind {
    /// Trivia never carries decorators and is skipped when looking for the "previous" token
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Kinds whose text is run through [crate::decorator::classify]
    pub fn is_decorated(self) -> bool {
        matches!(
            self,
            TokenKind::StringLiteral
                | TokenKind::Heredoc
                | TokenKind::NumberLiteral
                | TokenKind::Identifier
                | TokenKind::PropertyAccess
        )
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::Root => "root",
            TokenKind::Block => "block",
            TokenKind::Attribute => "attribute",
            TokenKind::Assignment => "assignment",
            TokenKind::Identifier => "identifier",
            TokenKind::StringLiteral => "string-literal",
            TokenKind::NumberLiteral => "number-literal",
            TokenKind::BooleanLiteral => "boolean-literal",
            TokenKind::NullLiteral => "null-literal",
            TokenKind::ArrayLiteral => "array-literal",
            TokenKind::ObjectLiteral => "object-literal",
            TokenKind::FunctionCall => "function-call",
            TokenKind::PropertyAccess => "property-access",
            TokenKind::Interpolation => "interpolation",
            TokenKind::Heredoc => "heredoc",
            TokenKind::Comment => "comment",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Operator => "operator",
            TokenKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Scalar carried by a token
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TokenValue {
    String(String),
    Number(f64),
    Boolean(bool),
    None,
}

impl TokenValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TokenValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TokenValue {
    fn from(value: &str) -> Self {
        TokenValue::String(value.to_string())
    }
}

impl From<String> for TokenValue {
    fn from(value: String) -> Self {
        TokenValue::String(value)
    }
}

/// A point in the source text
///
/// `offset` is a byte offset, `line` and `column` are 1-based (column counts unicode scalar values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, derive_new::new)]
pub struct Point {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Point {
    /// The first character of a document
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// Compare by line and column only
    pub fn cmp_line_col(&self, other: &Point) -> std::cmp::Ordering {
        (self.line, self.column).cmp(&(other.line, other.column))
    }

    /// The point reached after walking over `text` starting at `self`
    pub fn advanced_by(&self, text: &str) -> Point {
        let mut point = *self;
        for c in text.chars() {
            point.offset += c.len_utf8();
            if c == '\n' {
                point.line += 1;
                point.column = 1;
            } else {
                point.column += 1;
            }
        }
        point
    }
}

/// Half-open source range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, derive_new::new)]
pub struct Location {
    pub start: Point,
    pub end: Point,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Both ends inclusive, so a point sitting on a boundary is contained by both neighbours
    pub fn touches(&self, point: &Point) -> bool {
        self.start.cmp_line_col(point).is_le() && point.cmp_line_col(&self.end).is_le()
    }

    pub fn contains_location(&self, other: &Location) -> bool {
        self.start.offset <= other.start.offset && other.end.offset <= self.end.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecoratorKind {
    GitSshUrl,
    GitHttpsUrl,
    RegistryUrl,
    S3Url,
    HttpsUrl,
    FilePath,
    Email,
    IpAddress,
    Date,
    Time,
    Uuid,
}

/// Classified sub-span of a token's text
///
/// Offsets are byte offsets relative to the start of the token text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, derive_new::new)]
pub struct Decorator {
    pub kind: DecoratorKind,
    pub start_index: usize,
    pub end_index: usize,
}

impl Decorator {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slice the decorated part out of the owning token's text
    pub fn slice<'t>(&self, token_text: &'t str) -> &'t str {
        &token_text[self.start_index..self.end_index]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenKind,
    pub value: TokenValue,
    pub location: Location,
    pub children: Vec<TokenId>,
    /// non-owning back reference into the arena
    pub parent: Option<TokenId>,
    pub decorators: Vec<Decorator>,
}

impl Token {
    pub fn new(id: TokenId, kind: TokenKind, value: TokenValue, location: Location) -> Self {
        Self {
            id,
            kind,
            value,
            location,
            children: vec![],
            parent: None,
            decorators: vec![],
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
