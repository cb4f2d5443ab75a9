//! token arena and nesting
//!
//! A [TokenTree] owns every token of one document in a flat arena. Parent/child links are [TokenId]s into that
//! arena, so there is no shared ownership between nodes.
//!
//! [crate::lexer::tokenize] produces a tree whose root holds the flat token stream. [build_tree] then groups that
//! stream into nested composites using an explicit delimiter stack:
//!
//! | source                    | composite                                      |
//! |---------------------------|------------------------------------------------|
//! | `ident "label" { ... }`   | [TokenKind::Block] (header and body)           |
//! | `key = value`             | [TokenKind::Attribute] (until newline or `,`)  |
//! | `{ ... }`                 | [TokenKind::ObjectLiteral]                     |
//! | `[ ... ]`                 | [TokenKind::ArrayLiteral]                      |
//! | `name( ... )`             | [TokenKind::FunctionCall]                      |
//! | mismatched closer         | [TokenKind::Unknown] wrapping the region       |
use crate::lexer::tokenize;
use crate::token::{Location, Point, Token, TokenId, TokenKind, TokenValue};
use crate::visit::VisitTokens;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct TokenTree {
    source: String,
    tokens: Vec<Token>,
    root: TokenId,
}

impl TokenTree {
    /// Empty tree with a root token spanning all of `source`
    pub(crate) fn new(source: &str) -> Self {
        let location = Location::new(Point::start(), Point::start().advanced_by(source));
        let root = TokenId(0);
        Self {
            source: source.to_string(),
            tokens: vec![Token::new(root, TokenKind::Root, TokenValue::None, location)],
            root,
        }
    }

    pub fn root(&self) -> TokenId {
        self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// # Panic
    /// Panics on an id from another tree
    pub fn get(&self, id: TokenId) -> &Token {
        &self.tokens[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: TokenId) -> &mut Token {
        &mut self.tokens[id.0]
    }

    /// Source text covered by a token
    pub fn text(&self, id: TokenId) -> &str {
        let location = &self.get(id).location;
        &self.source[location.start.offset..location.end.offset]
    }

    pub fn parent(&self, id: TokenId) -> Option<&Token> {
        self.get(id).parent.map(|parent| self.get(parent))
    }

    pub fn children(&self, id: TokenId) -> impl Iterator<Item = &Token> {
        self.get(id).children.iter().map(|child| self.get(*child))
    }

    /// All tokens in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn push(
        &mut self,
        kind: TokenKind,
        value: TokenValue,
        location: Location,
    ) -> TokenId {
        let id = TokenId(self.tokens.len());
        self.tokens.push(Token::new(id, kind, value, location));
        id
    }

    pub(crate) fn attach(&mut self, parent: TokenId, child: TokenId) {
        self.tokens[parent.0].children.push(child);
        self.tokens[child.0].parent = Some(parent);
    }

    /// Resolve a zero-based protocol position to a point in the source
    ///
    /// Positions past the end of a line or the document are clamped.
    pub fn point_at(&self, position: Position) -> Point {
        let mut point = Point::start();
        for line in self.source.split_inclusive('\n').take(position.line) {
            if !line.ends_with('\n') {
                break;
            }
            point = point.advanced_by(line);
        }

        let line = self.source[point.offset..].split('\n').next().unwrap_or("");
        let prefix_len = line
            .char_indices()
            .nth(position.character)
            .map(|(index, _)| index)
            .unwrap_or(line.len());

        point.advanced_by(&line[..prefix_len])
    }

    /// Deepest token whose range touches `position`
    ///
    /// When the position sits on the boundary between two tokens the right-hand one wins.
    pub fn token_at(&self, position: Position) -> TokenId {
        let point = self.point_at(position);
        let mut current = self.root;

        while let Some(next) = self
            .get(current)
            .children
            .iter()
            .rev()
            .find(|child| self.get(**child).location.touches(&point))
        {
            current = *next;
        }

        current
    }

    /// All property access tokens (`dependency.vpc.outputs.id`, `local.name`, ...) in source order
    pub fn references(&self) -> Vec<TokenId> {
        let mut references = vec![];
        let mut collect = |token: &Token| {
            if token.kind == TokenKind::PropertyAccess {
                references.push(token.id);
            }
        };
        self.visit_tokens(self.root, &mut collect);
        references
    }

    /// Serializable view of the subtree below `id`
    pub fn view(&self, id: TokenId) -> TokenView<'_> {
        TokenView {
            tree: self,
            id,
            depth: 0,
        }
    }

    /// Set every builder composite's range to span its children
    fn recompute_extents(&mut self) {
        let mut preorder = vec![];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            preorder.push(id);
            stack.extend(self.get(id).children.iter().copied());
        }

        // reversed preorder visits descendants before their ancestors
        for id in preorder.into_iter().rev() {
            let token = self.get(id);
            let is_composite = !matches!(
                token.kind,
                TokenKind::Root
                    | TokenKind::StringLiteral
                    | TokenKind::Heredoc
                    | TokenKind::Interpolation
            );
            let (Some(first), Some(last)) = (token.children.first(), token.children.last()) else {
                continue;
            };
            if !is_composite {
                continue;
            }

            let location =
                Location::new(self.get(*first).location.start, self.get(*last).location.end);
            self.get_mut(id).location = location;
        }
    }
}

/// Zero-based line/character position as used by editor protocols
///
/// Token locations are 1-based. [Position::from_point] and [Position::line_column] are the only conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_new::new)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn from_point(point: &Point) -> Self {
        Self {
            line: point.line - 1,
            character: point.column - 1,
        }
    }

    /// 1-based `(line, column)`
    pub fn line_column(&self) -> (usize, usize) {
        (self.line + 1, self.character + 1)
    }
}

/// Syntactic surrounding of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionContext {
    Block,
    Function,
    Attribute,
    Parameter,
    Root,
    RootAssignment,
    Reference,
    Unknown,
}

/// Lex and nest `source`
pub fn parse(source: &str) -> TokenTree {
    build_tree(tokenize(source))
}

/// Group the flat token stream below the root into nested composites
///
/// Never fails: mismatched closers are wrapped in [TokenKind::Unknown] tokens and unclosed regions end at their
/// last child.
pub fn build_tree(mut tree: TokenTree) -> TokenTree {
    let root = tree.root();
    let stream = std::mem::take(&mut tree.get_mut(root).children);

    Builder::new(&mut tree, root, false).nest(stream);
    tree.recompute_extents();

    tree
}

/// Context of the cursor at `position`
///
/// Walks up from the deepest token at `position` until a token kind decides the context.
pub fn position_context(tree: &TokenTree, position: Position) -> PositionContext {
    let mut current = tree.token_at(position);

    loop {
        let token = tree.get(current);
        let context = match token.kind {
            TokenKind::Root => return PositionContext::Root,
            TokenKind::PropertyAccess | TokenKind::Interpolation => PositionContext::Reference,
            TokenKind::FunctionCall if token.is_leaf() => PositionContext::Function,
            // reached from one of the call's children
            TokenKind::FunctionCall => PositionContext::Parameter,
            TokenKind::Block => PositionContext::Block,
            TokenKind::Attribute if token.is_leaf() => PositionContext::Attribute,
            TokenKind::Attribute => match tree.parent(current).map(|parent| parent.kind) {
                Some(TokenKind::Root) => PositionContext::RootAssignment,
                _ => PositionContext::Attribute,
            },
            TokenKind::Unknown => PositionContext::Unknown,
            _ => {
                let Some(parent) = token.parent else {
                    return PositionContext::Unknown;
                };
                current = parent;
                continue;
            }
        };

        tracing::trace!(token = %current, ?context, "position context");
        return context;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BracketKind {
    Brace,
    Bracket,
    Paren,
}

impl BracketKind {
    fn opening(text: &str) -> Option<Self> {
        match text {
            "{" => Some(BracketKind::Brace),
            "[" => Some(BracketKind::Bracket),
            "(" => Some(BracketKind::Paren),
            _ => None,
        }
    }

    fn closing(text: &str) -> Option<Self> {
        match text {
            "}" => Some(BracketKind::Brace),
            "]" => Some(BracketKind::Bracket),
            ")" => Some(BracketKind::Paren),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Frame {
    /// An open bracket
    Delimited {
        delimiter: char,
        line: usize,
        column: usize,
        kind: BracketKind,
        /// receives the tokens until the closer
        container: TokenId,
        /// holds `anchor`
        parent: TokenId,
        /// first token of the region (the composite, or the opener itself for plain parentheses)
        anchor: TokenId,
    },
    /// An open `key = value` statement
    Statement { container: TokenId },
}

struct Builder<'t> {
    tree: &'t mut TokenTree,
    base: TokenId,
    /// nesting the inside of a `${ }` span, whose closing brace arrives as a stray closer
    template: bool,
    stack: Vec<Frame>,
}

impl<'t> Builder<'t> {
    fn new(tree: &'t mut TokenTree, base: TokenId, template: bool) -> Self {
        Self {
            tree,
            base,
            template,
            stack: vec![],
        }
    }

    fn current(&self) -> TokenId {
        match self.stack.last() {
            Some(Frame::Delimited { container, .. }) | Some(Frame::Statement { container }) => {
                *container
            }
            None => self.base,
        }
    }

    fn nest(&mut self, stream: Vec<TokenId>) {
        let count = stream.len();

        for (index, id) in stream.into_iter().enumerate() {
            self.nest_templates(id);

            let kind = self.tree.get(id).kind;
            let text = self.tree.text(id);

            match kind {
                TokenKind::Punctuation => {
                    if let Some(bracket) = BracketKind::opening(text) {
                        self.open(id, bracket);
                    } else if let Some(bracket) = BracketKind::closing(text) {
                        self.close(id, bracket, index + 1 == count);
                    } else {
                        if text == "," {
                            self.end_statement();
                        }
                        self.append(id);
                    }
                }
                TokenKind::Whitespace if text.contains('\n') => {
                    self.end_statement();
                    self.append(id);
                }
                TokenKind::Attribute => {
                    self.end_statement();
                    self.start_statement(id);
                }
                _ => self.append(id),
            }
        }

        for frame in self.stack.drain(..) {
            if let Frame::Delimited {
                delimiter,
                line,
                column,
                ..
            } = frame
            {
                tracing::debug!(%delimiter, line, column, "unclosed delimiter");
            }
        }
    }

    /// Nest the inside of every interpolation below a string or heredoc
    fn nest_templates(&mut self, id: TokenId) {
        if !matches!(
            self.tree.get(id).kind,
            TokenKind::StringLiteral | TokenKind::Heredoc
        ) {
            return;
        }

        for interpolation in self.tree.get(id).children.clone() {
            let mut stream = std::mem::take(&mut self.tree.get_mut(interpolation).children);
            if stream.is_empty() {
                continue;
            }

            // keep the `${` opener in place
            let inner = stream.split_off(1);
            self.tree.get_mut(interpolation).children = stream;

            Builder::new(&mut *self.tree, interpolation, true).nest(inner);
        }
    }

    fn append(&mut self, id: TokenId) {
        let container = self.current();
        self.tree.attach(container, id);
    }

    /// Create a composite holding `first`, attached where `first` would have gone
    fn composite(&mut self, kind: TokenKind, value: TokenValue, first: TokenId) -> TokenId {
        let location = self.tree.get(first).location;
        self.tree.push(kind, value, location)
    }

    fn open(&mut self, opener: TokenId, kind: BracketKind) {
        let parent = self.current();

        let (container, anchor) = match kind {
            BracketKind::Brace => match self.block_header(parent) {
                Some(header_index) => {
                    let header = self.tree.get_mut(parent).children.split_off(header_index);
                    let value = self.tree.get(header[0]).value.clone();
                    let block = self.composite(TokenKind::Block, value, header[0]);
                    for token in header {
                        self.tree.attach(block, token);
                    }
                    self.tree.attach(parent, block);
                    (block, block)
                }
                None => {
                    let object = self.composite(TokenKind::ObjectLiteral, TokenValue::None, opener);
                    self.tree.attach(parent, object);
                    (object, object)
                }
            },
            BracketKind::Bracket => {
                let array = self.composite(TokenKind::ArrayLiteral, TokenValue::None, opener);
                self.tree.attach(parent, array);
                (array, array)
            }
            BracketKind::Paren => match self.tree.get(parent).children.last().copied() {
                Some(name)
                    if self.tree.get(name).kind == TokenKind::FunctionCall
                        && self.tree.get(name).is_leaf() =>
                {
                    self.tree.get_mut(parent).children.pop();
                    let value = self.tree.get(name).value.clone();
                    let call = self.composite(TokenKind::FunctionCall, value, name);
                    self.tree.attach(call, name);
                    self.tree.attach(parent, call);
                    (call, call)
                }
                // plain parentheses group without a composite
                _ => (parent, opener),
            },
        };

        self.tree.attach(container, opener);

        let start = self.tree.get(opener).location.start;
        self.stack.push(Frame::Delimited {
            delimiter: self.tree.text(opener).chars().next().unwrap_or_default(),
            line: start.line,
            column: start.column,
            kind,
            container,
            parent,
            anchor,
        });
    }

    /// Index of the block keyword when the container ends with `keyword label* [=]`
    fn block_header(&self, parent: TokenId) -> Option<usize> {
        let children = &self.tree.get(parent).children;
        for (index, id) in children.iter().enumerate().rev() {
            let token = self.tree.get(*id);
            match token.kind {
                TokenKind::Block if token.is_leaf() => return Some(index),
                TokenKind::Whitespace
                | TokenKind::Comment
                | TokenKind::StringLiteral
                | TokenKind::Identifier
                | TokenKind::Assignment => continue,
                _ => return None,
            }
        }
        None
    }

    fn close(&mut self, closer: TokenId, kind: BracketKind, last: bool) {
        self.end_statement();

        let open_kind = match self.stack.last() {
            Some(Frame::Delimited { kind, .. }) => Some(*kind),
            _ => None,
        };

        match open_kind {
            Some(open_kind) if open_kind == kind => {
                let container = self.current();
                self.tree.attach(container, closer);
                self.stack.pop();
            }
            Some(_) => {
                let Some(Frame::Delimited {
                    delimiter,
                    line,
                    column,
                    parent,
                    anchor,
                    ..
                }) = self.stack.pop()
                else {
                    unreachable!("top frame was just matched as delimited");
                };
                tracing::debug!(
                    %delimiter,
                    line,
                    column,
                    closer = self.tree.text(closer),
                    "mismatched delimiter"
                );
                self.wrap_unknown(parent, Some(anchor), closer);
            }
            None if self.template && last => self.append(closer),
            None => {
                tracing::debug!(
                    closer = self.tree.text(closer),
                    "closing delimiter without opener"
                );
                let container = self.current();
                self.wrap_unknown(container, None, closer);
            }
        }
    }

    /// Move `parent`'s children from `anchor` onwards plus `closer` into a new unknown token
    fn wrap_unknown(&mut self, parent: TokenId, anchor: Option<TokenId>, closer: TokenId) {
        let region = match anchor {
            Some(anchor) => {
                let children = &mut self.tree.get_mut(parent).children;
                let index = children
                    .iter()
                    .position(|child| *child == anchor)
                    .unwrap_or(children.len());
                children.split_off(index)
            }
            None => vec![],
        };

        let first = region.first().copied().unwrap_or(closer);
        let wrapper = self.composite(TokenKind::Unknown, TokenValue::None, first);
        for token in region {
            self.tree.attach(wrapper, token);
        }
        self.tree.attach(wrapper, closer);
        self.tree.attach(parent, wrapper);
    }

    fn start_statement(&mut self, key: TokenId) {
        let value = self.tree.get(key).value.clone();
        let attribute = self.composite(TokenKind::Attribute, value, key);
        let parent = self.current();
        self.tree.attach(parent, attribute);
        self.tree.attach(attribute, key);
        self.stack.push(Frame::Statement {
            container: attribute,
        });
    }

    fn end_statement(&mut self) {
        while let Some(Frame::Statement { .. }) = self.stack.last() {
            self.stack.pop();
        }
    }
}

/// Levels of a [TokenView] serialized as nested tokens, deeper children are listed by id
pub const MAX_VIEW_DEPTH: usize = 128;

/// Serializable recursive view of a token subtree
pub struct TokenView<'a> {
    tree: &'a TokenTree,
    id: TokenId,
    depth: usize,
}

impl Serialize for TokenView<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let token = self.tree.get(self.id);

        let mut ser = serializer.serialize_struct("Token", 7)?;
        ser.serialize_field("id", &token.id)?;
        ser.serialize_field("kind", &token.kind)?;
        ser.serialize_field("value", &token.value)?;
        ser.serialize_field("location", &token.location)?;
        ser.serialize_field("text", self.tree.text(self.id))?;
        ser.serialize_field("decorators", &token.decorators)?;
        if self.depth < MAX_VIEW_DEPTH {
            let children: Vec<_> = token
                .children
                .iter()
                .map(|child| TokenView {
                    tree: self.tree,
                    id: *child,
                    depth: self.depth + 1,
                })
                .collect();
            ser.serialize_field("children", &children)?;
        } else {
            ser.serialize_field("children", &token.children)?;
        }
        ser.end()
    }
}
