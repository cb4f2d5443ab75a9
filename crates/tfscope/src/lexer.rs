//! source text to flat token stream
//!
//! [tokenize] never fails. Input that matches nothing becomes a one character [TokenKind::Unknown] token so the
//! cursor always moves forward, and the root's children cover every input byte without gaps.
//!
//! String literals and heredocs get [TokenKind::Interpolation] children for each `${ ... }` / `%{ ... }` span.
//! The inner text of those spans is lexed again with absolute locations. Spans nested deeper than
//! [MAX_TEMPLATE_DEPTH] stay plain string content.
use crate::decorator;
use crate::token::{Location, Point, TokenId, TokenKind, TokenValue};
use crate::tree::TokenTree;

/// Interpolations nested deeper than this are not lexed again
pub const MAX_TEMPLATE_DEPTH: usize = 64;

/// Lex `source` into a [TokenTree] whose root holds the flat token stream
pub fn tokenize(source: &str) -> TokenTree {
    let mut tree = TokenTree::new(source);
    let root = tree.root();

    let mut lexer = Lexer::new(&mut tree, source, Point::start(), source.len());
    lexer.run(root);

    tracing::trace!(tokens = tree.len(), "tokenized");
    tree
}

/// Result of scanning one token
struct Scanned {
    kind: TokenKind,
    value: TokenValue,
    /// absolute byte ranges of `${ }` / `%{ }` spans
    templates: Vec<(usize, usize)>,
}

impl Scanned {
    fn new(kind: TokenKind, value: impl Into<TokenValue>) -> Self {
        Self {
            kind,
            value: value.into(),
            templates: vec![],
        }
    }

    fn bare(kind: TokenKind) -> Self {
        Self::new(kind, TokenValue::None)
    }
}

struct Lexer<'t, 's> {
    tree: &'t mut TokenTree,
    source: &'s str,
    pos: usize,
    end: usize,
    line: usize,
    col: usize,
    /// number of enclosing interpolations
    depth: usize,
}

impl<'t, 's> Lexer<'t, 's> {
    fn new(tree: &'t mut TokenTree, source: &'s str, start: Point, end: usize) -> Self {
        Self {
            tree,
            source,
            pos: start.offset,
            end,
            line: start.line,
            col: start.column,
            depth: 0,
        }
    }

    fn run(&mut self, container: TokenId) {
        while self.pos < self.end {
            let start = self.point();
            let scanned = self.scan();

            if self.pos == start.offset {
                debug_assert!(false, "lexer cursor did not advance at {start:?}");
                self.bump();
            }

            self.emit(container, scanned, start);
        }
    }

    fn point(&self) -> Point {
        Point::new(self.pos, self.line, self.col)
    }

    fn rest(&self) -> &'s str {
        &self.source[self.pos..self.end]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Advance until the cursor reaches `target` (clamped to the lexer end)
    fn bump_to(&mut self, target: usize) {
        while self.pos < target.min(self.end) {
            self.bump();
        }
    }

    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.bump();
        }
    }

    fn emit(&mut self, container: TokenId, scanned: Scanned, start: Point) -> TokenId {
        let location = Location::new(start, self.point());
        let id = self.tree.push(scanned.kind, scanned.value, location);
        self.tree.attach(container, id);

        if scanned.kind.is_decorated() {
            let decorators = decorator::classify(self.tree.text(id));
            self.tree.get_mut(id).decorators = decorators;
        }

        if !scanned.templates.is_empty() && self.depth >= MAX_TEMPLATE_DEPTH {
            tracing::debug!(
                line = start.line,
                column = start.column,
                "template nesting too deep, kept as plain content"
            );
            return id;
        }

        for (template_start, template_end) in scanned.templates {
            self.emit_template(id, start, template_start, template_end);
        }

        id
    }

    /// Emit an interpolation token and lex its inner expression
    fn emit_template(&mut self, owner: TokenId, owner_start: Point, start: usize, end: usize) {
        let start_point = owner_start.advanced_by(&self.source[owner_start.offset..start]);
        let end_point = start_point.advanced_by(&self.source[start..end]);

        let (_, closed) = template_len(&self.source[start..end]);
        let inner_end = if closed { end - 1 } else { end };

        let interpolation = self.tree.push(
            TokenKind::Interpolation,
            TokenValue::from(self.source[start + 2..inner_end].trim()),
            Location::new(start_point, end_point),
        );
        self.tree.attach(owner, interpolation);

        let mut sub = Lexer::new(&mut *self.tree, self.source, start_point, inner_end);
        sub.depth = self.depth + 1;
        let opener = sub.source[start..start + 2].to_string();
        sub.bump();
        sub.bump();
        sub.emit(interpolation, Scanned::new(TokenKind::Punctuation, opener), start_point);
        sub.run(interpolation);

        if closed {
            let close_start = sub.point();
            sub.end = end;
            sub.bump();
            sub.emit(interpolation, Scanned::new(TokenKind::Punctuation, "}"), close_start);
        }
    }

    fn scan(&mut self) -> Scanned {
        let rest = self.rest();
        let Some(c) = self.peek() else {
            return Scanned::bare(TokenKind::Unknown);
        };

        // trivia
        if is_whitespace(c) {
            self.bump_while(is_whitespace);
            return Scanned::bare(TokenKind::Whitespace);
        }
        if c == '#' || rest.starts_with("//") {
            let start = self.pos;
            self.bump_while(|c| c != '\n');
            return Scanned::new(TokenKind::Comment, &self.source[start..self.pos]);
        }
        if rest.starts_with("/*") {
            let start = self.pos;
            let len = rest[2..].find("*/").map(|i| i + 4).unwrap_or(rest.len());
            self.bump_to(start + len);
            return Scanned::new(TokenKind::Comment, &self.source[start..self.pos]);
        }

        // literals
        if rest.starts_with("<<") {
            if let Some(heredoc) = self.scan_heredoc() {
                return heredoc;
            }
        }
        if c == '"' {
            return self.scan_string();
        }
        if c.is_ascii_digit() {
            return self.scan_number();
        }

        // structure, keywords and references
        if is_ident_start(c) {
            return self.scan_word();
        }

        self.scan_symbol(c)
    }

    fn scan_symbol(&mut self, c: char) -> Scanned {
        if matches!(c, '{' | '}' | '[' | ']' | '(' | ')' | ',' | ':') {
            self.bump();
            return Scanned::new(TokenKind::Punctuation, c.to_string());
        }

        const OPERATORS: &[&str] = &["...", "==", "!=", "<=", ">=", "&&", "||", "=>"];
        if let Some(op) = OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
            self.bump_to(self.pos + op.len());
            return Scanned::new(TokenKind::Operator, *op);
        }

        self.bump();
        match c {
            '=' => Scanned::new(TokenKind::Assignment, "="),
            '?' | '!' | '+' | '-' | '*' | '/' | '%' | '<' | '>' | '.' => {
                Scanned::new(TokenKind::Operator, c.to_string())
            }
            _ => Scanned::new(TokenKind::Unknown, c.to_string()),
        }
    }

    fn scan_string(&mut self) -> Scanned {
        self.bump(); // opening quote

        let mut value = String::new();
        let mut templates = vec![];

        loop {
            let rest = self.rest();
            match self.peek() {
                None | Some('\n') => {
                    tracing::trace!(line = self.line, "unterminated string literal");
                    return Scanned::new(TokenKind::Unknown, value);
                }
                Some('"') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('\n') | None => {
                            value.push('\\');
                            continue;
                        }
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                    self.bump();
                }
                Some('$' | '%') if rest.starts_with("$${") || rest.starts_with("%%{") => {
                    value.push_str(&rest[1..3]);
                    self.bump_to(self.pos + 3);
                }
                Some('$' | '%') if rest[1..].starts_with('{') => {
                    let start = self.pos;
                    let (len, _) = template_len(rest);
                    self.bump_to(start + len);
                    value.push_str(&self.source[start..self.pos]);
                    templates.push((start, self.pos));
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }

        Scanned {
            kind: TokenKind::StringLiteral,
            value: value.into(),
            templates,
        }
    }

    fn scan_heredoc(&mut self) -> Option<Scanned> {
        let rest = self.rest();
        let after = &rest[2..];
        let (indented, after) = match after.strip_prefix('-') {
            Some(after) => (true, after),
            None => (false, after),
        };

        if !after.starts_with(is_ident_start) {
            return None;
        }
        let tag_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let tag = &after[..tag_len];

        // rest of the opening line belongs to the header
        self.bump_while(|c| c != '\n');
        self.bump();

        let body_start = self.pos;
        let mut body_end = self.end;
        let mut terminated = false;

        while self.pos < self.end {
            let line_start = self.pos;
            let line_len = self.rest().find('\n').unwrap_or(self.rest().len());
            let line = &self.source[line_start..line_start + line_len];

            if line.trim() == tag {
                body_end = line_start;
                self.bump_to(line_start + line_len);
                terminated = true;
                break;
            }

            self.bump_to(line_start + line_len);
            self.bump();
        }

        if !terminated {
            tracing::trace!(tag, "unterminated heredoc");
        }

        let raw_body = &self.source[body_start..body_end.max(body_start)];
        let body = raw_body.strip_suffix('\n').unwrap_or(raw_body);
        let body = body.strip_suffix('\r').unwrap_or(body);
        let value = if indented { dedent(body) } else { body.to_string() };

        Some(Scanned {
            kind: TokenKind::Heredoc,
            value: value.into(),
            templates: template_spans(raw_body, body_start),
        })
    }

    fn scan_number(&mut self) -> Scanned {
        let start = self.pos;
        self.bump_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.bump_while(|c| c.is_ascii_digit());
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.bump();
                }
                self.bump_while(|c| c.is_ascii_digit());
            }
        }

        let numeric = &self.source[start..self.pos];
        let value = numeric.parse::<f64>().unwrap_or(f64::NAN);

        // unit suffix (`10GB`, `1.5x`)
        self.bump_while(|c| c.is_ascii_alphabetic());

        Scanned::new(TokenKind::NumberLiteral, TokenValue::Number(value))
    }

    fn scan_word(&mut self) -> Scanned {
        let start = self.pos;
        self.bump_while(is_ident_char);

        // provider defined functions: provider::aws::arn_parse
        while self.rest().starts_with("::") && self.rest()[2..].starts_with(is_ident_start) {
            self.bump_to(self.pos + 2);
            self.bump_while(is_ident_char);
        }

        let word = &self.source[start..self.pos];
        let rest = self.rest();

        match word {
            "true" => return Scanned::new(TokenKind::BooleanLiteral, TokenValue::Boolean(true)),
            "false" => return Scanned::new(TokenKind::BooleanLiteral, TokenValue::Boolean(false)),
            "null" => return Scanned::bare(TokenKind::NullLiteral),
            _ => {}
        }

        if is_block_header(rest) {
            return Scanned::new(TokenKind::Block, word);
        }

        if is_assignment(rest.trim_start_matches([' ', '\t'])) {
            return Scanned::new(TokenKind::Attribute, word);
        }

        if rest.starts_with('(') {
            return Scanned::new(TokenKind::FunctionCall, word);
        }

        let accessors = accessor_len(rest);
        if accessors > 0 {
            self.bump_to(self.pos + accessors);
            return Scanned::new(TokenKind::PropertyAccess, &self.source[start..self.pos]);
        }

        Scanned::new(TokenKind::Identifier, word)
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{feff}')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// `=` that is neither `==` nor `=>`
fn is_assignment(text: &str) -> bool {
    text.starts_with('=') && !text.starts_with("==") && !text.starts_with("=>")
}

/// Does the text after a word complete a block header on the same line?
///
/// Accepts `label* {` where labels are quoted strings or identifiers, and `= {` (block assignment).
fn is_block_header(rest: &str) -> bool {
    let mut rest = rest.trim_start_matches([' ', '\t']);
    let mut labels = 0;

    loop {
        if rest.starts_with('{') {
            return true;
        }

        if labels == 0 && is_assignment(rest) {
            return rest[1..].trim_start_matches([' ', '\t']).starts_with('{');
        }

        if let Some(quoted) = rest.strip_prefix('"') {
            let Some(close) = quoted_len(quoted) else {
                return false;
            };
            rest = &quoted[close..];
        } else if rest.starts_with(is_ident_start) {
            let len = rest.find(|c| !is_ident_char(c)).unwrap_or(rest.len());
            rest = &rest[len..];
        } else {
            return false;
        }

        labels += 1;
        rest = rest.trim_start_matches([' ', '\t']);
    }
}

/// Length of a quoted string body including the closing quote, `None` when unterminated on this line
fn quoted_len(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match c {
            '\n' => return None,
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '"' if !escaped => return Some(index + 1),
            _ => {}
        }
        escaped = false;
    }
    None
}

/// Length of the attribute/index chain after a word: `.name`, `.*`, `.0`, `[0]`, `[*]`, `["key"]`
fn accessor_len(text: &str) -> usize {
    let mut len = 0;

    loop {
        let rest = &text[len..];
        if let Some(after) = rest.strip_prefix('.') {
            let segment = if after.starts_with(is_ident_start) {
                after.find(|c| !is_ident_char(c)).unwrap_or(after.len())
            } else if after.starts_with('*') {
                1
            } else if after.starts_with(|c: char| c.is_ascii_digit()) {
                after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len())
            } else {
                return len;
            };
            len += 1 + segment;
        } else if let Some(after) = rest.strip_prefix('[') {
            let inner = if after.starts_with('*') {
                1
            } else if after.starts_with(|c: char| c.is_ascii_digit()) {
                after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len())
            } else if let Some(quoted) = after.strip_prefix('"') {
                match quoted_len(quoted) {
                    Some(close) => close + 1,
                    None => return len,
                }
            } else {
                return len;
            };

            if !after[inner..].starts_with(']') {
                return len;
            }
            len += 1 + inner + 1;
        } else {
            return len;
        }
    }
}

/// Byte length of a template span starting with `${` or `%{`, and whether it was closed
fn template_len(text: &str) -> (usize, bool) {
    let mut depth = 0usize;
    let mut chars = text.char_indices().skip(1);

    while let Some((index, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return (index + 1, true);
                }
            }
            '"' => {
                let Some(close) = quoted_len(&text[index + 1..]) else {
                    continue;
                };
                let target = index + 1 + close;
                for (next, _) in chars.by_ref() {
                    if next + 1 >= target {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    (text.len(), false)
}

/// All template spans in heredoc body text, offsets shifted by `base`
fn template_spans(text: &str, base: usize) -> Vec<(usize, usize)> {
    let mut spans = vec![];
    let mut index = 0;

    while index < text.len() {
        let rest = &text[index..];
        if rest.starts_with("$${") || rest.starts_with("%%{") {
            index += 3;
            continue;
        }
        if rest.starts_with("${") || rest.starts_with("%{") {
            let (len, _) = template_len(rest);
            spans.push((base + index, base + index + len));
            index += len;
            continue;
        }
        index += rest.chars().next().map(char::len_utf8).unwrap_or(1);
    }

    spans
}

/// Strip the common leading whitespace of all non-blank lines
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);

    text.lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::token::DecoratorKind;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        let tree = tokenize(source);
        tree.get(tree.root())
            .children
            .iter()
            .filter(|id| !tree.get(**id).kind.is_trivia())
            .map(|id| (tree.get(*id).kind, tree.text(*id).to_string()))
            .collect()
    }

    fn concatenated(source: &str) -> String {
        let tree = tokenize(source);
        tree.get(tree.root())
            .children
            .iter()
            .map(|id| tree.text(*id))
            .collect()
    }

    #[test]
    fn block_with_labels() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"resource "aws_vpc" "main" {}"#),
            vec![
                (Block, "resource".into()),
                (StringLiteral, r#""aws_vpc""#.into()),
                (StringLiteral, r#""main""#.into()),
                (Punctuation, "{".into()),
                (Punctuation, "}".into()),
            ]
        );
    }

    #[test]
    fn block_assignment_and_attribute() {
        use TokenKind::*;
        assert_eq!(
            kinds("inputs = {\n  name = \"x\"\n}"),
            vec![
                (Block, "inputs".into()),
                (Assignment, "=".into()),
                (Punctuation, "{".into()),
                (Attribute, "name".into()),
                (Assignment, "=".into()),
                (StringLiteral, "\"x\"".into()),
                (Punctuation, "}".into()),
            ]
        );
    }

    #[test]
    fn references_calls_and_keywords() {
        use TokenKind::*;
        assert_eq!(
            kinds("a = merge(dependency.vpc.outputs.tags, local.list[0]) != null || true"),
            vec![
                (Attribute, "a".into()),
                (Assignment, "=".into()),
                (FunctionCall, "merge".into()),
                (Punctuation, "(".into()),
                (PropertyAccess, "dependency.vpc.outputs.tags".into()),
                (Punctuation, ",".into()),
                (PropertyAccess, "local.list[0]".into()),
                (Punctuation, ")".into()),
                (Operator, "!=".into()),
                (NullLiteral, "null".into()),
                (Operator, "||".into()),
                (BooleanLiteral, "true".into()),
            ]
        );
    }

    #[test]
    fn numbers() {
        let tree = tokenize("1 2.5 1e3 10GB");
        let values: Vec<_> = tree
            .get(tree.root())
            .children
            .iter()
            .map(|id| tree.get(*id))
            .filter(|token| token.kind == TokenKind::NumberLiteral)
            .map(|token| token.value.clone())
            .collect();

        assert_eq!(
            values,
            vec![
                TokenValue::Number(1.0),
                TokenValue::Number(2.5),
                TokenValue::Number(1000.0),
                TokenValue::Number(10.0),
            ]
        );
    }

    #[test]
    fn string_escapes_and_interpolation() {
        let source = r#"name = "prefix-${var.env}\t\"q\"""#;
        let tree = tokenize(source);

        let string = tree
            .iter()
            .find(|token| token.kind == TokenKind::StringLiteral)
            .expect("string token");
        assert_eq!(
            string.value,
            TokenValue::from("prefix-${var.env}\t\"q\"")
        );

        let [interpolation] = string.children.as_slice() else {
            panic!("expected one interpolation child");
        };
        assert_eq!(tree.text(*interpolation), "${var.env}");

        let inner: Vec<_> = tree
            .get(*interpolation)
            .children
            .iter()
            .map(|id| (tree.get(*id).kind, tree.text(*id)))
            .collect();
        assert_eq!(
            inner,
            vec![
                (TokenKind::Punctuation, "${"),
                (TokenKind::PropertyAccess, "var.env"),
                (TokenKind::Punctuation, "}"),
            ]
        );
    }

    #[test]
    fn escaped_template_is_literal() {
        let tree = tokenize(r#""$${not_a_template}""#);
        let string = tree.get(tree.get(tree.root()).children[0]);
        assert_eq!(string.value, TokenValue::from("${not_a_template}"));
        assert!(string.children.is_empty());
    }

    #[test]
    fn unterminated_string_is_unknown() {
        use TokenKind::*;
        assert_eq!(
            kinds("a = \"open\nb = 1"),
            vec![
                (Attribute, "a".into()),
                (Assignment, "=".into()),
                (Unknown, "\"open".into()),
                (Attribute, "b".into()),
                (Assignment, "=".into()),
                (NumberLiteral, "1".into()),
            ]
        );
    }

    #[test]
    fn heredoc() {
        let source = "policy = <<-EOT\n    {\n      \"a\": \"${var.x}\"\n    }\n    EOT\nnext = 1";
        let tree = tokenize(source);
        let heredoc = tree
            .iter()
            .find(|token| token.kind == TokenKind::Heredoc)
            .expect("heredoc token");

        assert_eq!(
            heredoc.value,
            TokenValue::from("{\n  \"a\": \"${var.x}\"\n}")
        );
        assert!(tree.text(heredoc.id).ends_with("EOT"));
        assert_eq!(heredoc.children.len(), 1);
        assert_eq!(concatenated(source), source);
    }

    #[test]
    fn unterminated_heredoc_consumes_rest() {
        let source = "a = <<EOF\nline one\nline two";
        let tree = tokenize(source);
        let heredoc = tree
            .iter()
            .find(|token| token.kind == TokenKind::Heredoc)
            .expect("heredoc token");
        assert_eq!(heredoc.location.end.offset, source.len());
        assert_eq!(heredoc.value, TokenValue::from("line one\nline two"));
    }

    #[test]
    fn comments_and_whitespace_are_kept() {
        let source = "# one\n// two\n/* three\n */ a = 1 /* open";
        assert_eq!(concatenated(source), source);
        let comments = tokenize(source)
            .iter()
            .filter(|token| token.kind == TokenKind::Comment)
            .count();
        assert_eq!(comments, 4);
    }

    #[test]
    fn unknown_characters_advance() {
        use TokenKind::*;
        assert_eq!(
            kinds("a ~ ö"),
            vec![
                (Identifier, "a".into()),
                (Unknown, "~".into()),
                (Unknown, "ö".into()),
            ]
        );
    }

    #[test]
    fn locations_are_one_based_and_contiguous() {
        let tree = tokenize("a = 1\nbb = 2");
        let tokens: Vec<_> = tree
            .get(tree.root())
            .children
            .iter()
            .map(|id| tree.get(*id))
            .collect();

        let bb = tokens
            .iter()
            .find(|token| token.value == TokenValue::from("bb"))
            .expect("attribute bb");
        assert_eq!(bb.location.start, Point::new(6, 2, 1));
        assert_eq!(bb.location.end, Point::new(8, 2, 3));

        for pair in tokens.windows(2) {
            assert_eq!(pair[0].location.end, pair[1].location.start);
        }
    }

    #[test]
    fn ids_follow_creation_order() {
        let tree = tokenize(r#"a = "${b}" c"#);
        for (index, token) in tree.iter().enumerate() {
            assert_eq!(token.id, TokenId(index));
        }
    }

    #[test]
    fn decorators_on_literals_only() {
        let tree = tokenize("# https://example.com\nsource = \"git@github.com:org/repo.git\"");
        let decorated: Vec<_> = tree
            .iter()
            .filter(|token| !token.decorators.is_empty())
            .map(|token| (token.kind, token.decorators[0].kind))
            .collect();
        assert_eq!(
            decorated,
            vec![(TokenKind::StringLiteral, DecoratorKind::GitSshUrl)]
        );
    }

    #[test]
    fn directives_are_interpolations() {
        let tree = tokenize("\"%{ if x }y%{ endif }\"");
        let string = tree.get(tree.get(tree.root()).children[0]);
        assert_eq!(string.kind, TokenKind::StringLiteral);

        let children: Vec<_> = string.children.iter().map(|id| tree.text(*id)).collect();
        assert_eq!(children, vec!["%{ if x }", "%{ endif }"]);
        for child in &string.children {
            assert_eq!(tree.get(*child).kind, TokenKind::Interpolation);
        }
    }

    #[test]
    fn escaped_directive_is_literal() {
        let tree = tokenize(r#""%%{ if x }""#);
        let string = tree.get(tree.get(tree.root()).children[0]);
        assert_eq!(string.value, TokenValue::from("%{ if x }"));
        assert!(string.children.is_empty());
    }

    #[test]
    fn byte_order_mark_is_whitespace() {
        let source = "\u{feff}a = 1";
        let tree = tokenize(source);
        let first = tree.get(tree.get(tree.root()).children[0]);
        assert_eq!(first.kind, TokenKind::Whitespace);
        assert_eq!(tree.text(first.id), "\u{feff}");
        assert_eq!(concatenated(source), source);
    }

    #[test]
    fn deeply_nested_templates_are_capped() {
        let depth = 5000;
        let source = format!("x = {}a{}", "\"${".repeat(depth), "}\"".repeat(depth));
        let tree = tokenize(&source);
        assert_eq!(concatenated(&source), source);

        let nesting = |id: TokenId| {
            let mut count = 0;
            let mut current = tree.get(id).parent;
            while let Some(parent) = current {
                if tree.get(parent).kind == TokenKind::Interpolation {
                    count += 1;
                }
                current = tree.get(parent).parent;
            }
            count
        };
        let deepest = tree
            .iter()
            .filter(|token| token.kind == TokenKind::Interpolation)
            .map(|token| nesting(token.id) + 1)
            .max()
            .unwrap_or(0);
        assert!(deepest >= 1);
        assert!(deepest <= MAX_TEMPLATE_DEPTH);
    }

    #[test]
    fn empty_input() {
        let tree = tokenize("");
        assert!(tree.get(tree.root()).children.is_empty());
        assert_eq!(tree.len(), 1);
    }
}
