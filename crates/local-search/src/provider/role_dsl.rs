//! Reader for role definitions written in the role DSL (`.rb` files).
//!
//! Only the declarative statements are understood:
//!
//! ```text
//! name "web"
//! description "Front end servers"
//! run_list "role[base]", "recipe[nginx]"
//! env_run_lists "prod" => ["recipe[nginx]"], "_default" => []
//! default_attributes "nginx" => { "port" => 80 }
//! override_attributes({ :ntp => { "servers" => ["pool.ntp.org"] } })
//! ```
//!
//! Arguments may be wrapped in parentheses. Values are string literals,
//! numbers, `true`/`false`/`nil`, arrays, and hashes written with `=>` or
//! `key:` labels. Anything else makes the record malformed.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::document::RoleRecord;
use crate::error::{Result, SearchError};

/// Reads a role DSL source into a role record.
pub fn read_role_dsl(id: &str, source: &str) -> Result<RoleRecord> {
    let tokens = tokenize(source).map_err(|error| error.into_search_error(id))?;
    let mut reader = DslReader {
        tokens,
        index: 0,
        role: RoleRecord::default(),
    };
    reader
        .read_statements()
        .map_err(|error| error.into_search_error(id))?;
    Ok(reader.role)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DslError {
    line: usize,
    message: String,
}

impl DslError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    fn into_search_error(self, id: &str) -> SearchError {
        SearchError::malformed(id, format!("line {}: {}", self.line, self.message))
    }
}

type DslResult<T> = std::result::Result<T, DslError>;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Number(Number),
    Symbol(String),
    Label(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Arrow,
    Newline,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn tokenize(source: &str) -> DslResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut cursor = 0;
    let mut line = 1;
    let mut depth = 0usize;

    while cursor < chars.len() {
        let ch = chars[cursor];
        match ch {
            '\n' => {
                line += 1;
                cursor += 1;
                // Newlines only end a statement outside brackets and after a
                // complete value.
                let continues = depth > 0
                    || matches!(
                        tokens.last().map(|token| &token.kind),
                        None | Some(TokenKind::Comma)
                            | Some(TokenKind::Arrow)
                            | Some(TokenKind::Newline)
                    );
                if !continues {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        line: line - 1,
                    });
                }
            }
            '#' => {
                while cursor < chars.len() && chars[cursor] != '\n' {
                    cursor += 1;
                }
            }
            ';' => {
                cursor += 1;
                if depth == 0 {
                    tokens.push(Token {
                        kind: TokenKind::Newline,
                        line,
                    });
                }
            }
            c if c.is_whitespace() => cursor += 1,
            '"' | '\'' => {
                let (value, next, lines) = consume_string(&chars, cursor, line)?;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    line,
                });
                line += lines;
                cursor = next;
            }
            '(' | '[' | '{' => {
                depth += 1;
                let kind = match ch {
                    '(' => TokenKind::LParen,
                    '[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                };
                tokens.push(Token { kind, line });
                cursor += 1;
            }
            ')' | ']' | '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| DslError::new(line, format!("unbalanced '{ch}'")))?;
                let kind = match ch {
                    ')' => TokenKind::RParen,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                };
                tokens.push(Token { kind, line });
                cursor += 1;
            }
            ',' => {
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    line,
                });
                cursor += 1;
            }
            '=' if chars.get(cursor + 1) == Some(&'>') => {
                tokens.push(Token {
                    kind: TokenKind::Arrow,
                    line,
                });
                cursor += 2;
            }
            ':' => {
                let (name, next) = consume_word(&chars, cursor + 1);
                if name.is_empty() {
                    return Err(DslError::new(line, "expected symbol name after ':'"));
                }
                tokens.push(Token {
                    kind: TokenKind::Symbol(name),
                    line,
                });
                cursor = next;
            }
            c if c.is_ascii_digit() || (c == '-' && next_is_digit(&chars, cursor)) => {
                let (number, next) = consume_number(&chars, cursor, line)?;
                tokens.push(Token {
                    kind: TokenKind::Number(number),
                    line,
                });
                cursor = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let (word, next) = consume_word(&chars, cursor);
                // `key: value` label, but not `::`.
                if chars.get(next) == Some(&':') && chars.get(next + 1) != Some(&':') {
                    tokens.push(Token {
                        kind: TokenKind::Label(word),
                        line,
                    });
                    cursor = next + 1;
                } else {
                    tokens.push(Token {
                        kind: TokenKind::Ident(word),
                        line,
                    });
                    cursor = next;
                }
            }
            other => {
                return Err(DslError::new(line, format!("unexpected character '{other}'")));
            }
        }
    }

    if depth != 0 {
        return Err(DslError::new(line, "unclosed bracket at end of input"));
    }
    Ok(tokens)
}

fn next_is_digit(chars: &[char], cursor: usize) -> bool {
    chars
        .get(cursor + 1)
        .map(|c| c.is_ascii_digit())
        .unwrap_or(false)
}

fn consume_word(chars: &[char], start: usize) -> (String, usize) {
    let mut cursor = start;
    while cursor < chars.len() && (chars[cursor].is_alphanumeric() || chars[cursor] == '_') {
        cursor += 1;
    }
    // Predicate-style names (`enabled?`).
    if cursor < chars.len() && matches!(chars[cursor], '?' | '!') && cursor > start {
        cursor += 1;
    }
    (chars[start..cursor].iter().collect(), cursor)
}

fn consume_number(chars: &[char], start: usize, line: usize) -> DslResult<(Number, usize)> {
    let mut cursor = start + 1;
    let mut is_float = false;
    while cursor < chars.len() {
        let c = chars[cursor];
        if c.is_ascii_digit() || c == '_' {
            cursor += 1;
        } else if c == '.' && !is_float && next_is_digit(chars, cursor) {
            is_float = true;
            cursor += 1;
        } else {
            break;
        }
    }
    let text: String = chars[start..cursor].iter().filter(|c| **c != '_').collect();
    let number = if is_float {
        text.parse::<f64>().ok().and_then(Number::from_f64)
    } else {
        text.parse::<i64>().ok().map(Number::from)
    };
    number
        .map(|number| (number, cursor))
        .ok_or_else(|| DslError::new(line, format!("invalid number '{text}'")))
}

/// Returns the unescaped string, the cursor after the closing quote, and the
/// number of newlines it spanned.
fn consume_string(chars: &[char], start: usize, line: usize) -> DslResult<(String, usize, usize)> {
    let quote = chars[start];
    let mut cursor = start + 1;
    let mut value = String::new();
    let mut lines = 0;

    while cursor < chars.len() {
        let ch = chars[cursor];
        if ch == quote {
            return Ok((value, cursor + 1, lines));
        }
        if ch == '\n' {
            lines += 1;
        }
        if ch == '#' && quote == '"' && chars.get(cursor + 1) == Some(&'{') {
            return Err(DslError::new(
                line + lines,
                "string interpolation is not supported",
            ));
        }
        if ch == '\\' {
            let Some(&escaped) = chars.get(cursor + 1) else {
                break;
            };
            let resolved = match (quote, escaped) {
                ('"', 'n') => Some('\n'),
                ('"', 't') => Some('\t'),
                ('"', '"') | ('"', '\\') | ('"', '#') => Some(escaped),
                ('\'', '\'') | ('\'', '\\') => Some(escaped),
                _ => None,
            };
            match resolved {
                Some(c) => value.push(c),
                None => {
                    value.push('\\');
                    value.push(escaped);
                }
            }
            cursor += 2;
            continue;
        }
        value.push(ch);
        cursor += 1;
    }

    Err(DslError::new(line, "unterminated string literal"))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

struct DslReader {
    tokens: Vec<Token>,
    index: usize,
    role: RoleRecord,
}

impl DslReader {
    fn read_statements(&mut self) -> DslResult<()> {
        loop {
            while self.consume_if(&TokenKind::Newline) {}
            let Some(token) = self.next() else {
                return Ok(());
            };
            let TokenKind::Ident(statement) = token.kind else {
                return Err(DslError::new(token.line, "expected a statement name"));
            };
            let line = token.line;
            let args = self.read_arguments()?;
            self.apply(&statement, args, line)?;

            match self.peek() {
                None => return Ok(()),
                Some(token) if token.kind == TokenKind::Newline => {}
                Some(token) => {
                    return Err(DslError::new(
                        token.line,
                        format!("unexpected {:?} after '{statement}'", token.kind),
                    ));
                }
            }
        }
    }

    fn read_arguments(&mut self) -> DslResult<Vec<Value>> {
        let parenthesized = self.consume_if(&TokenKind::LParen);
        let mut args = Vec::new();
        let mut implicit_hash = Map::new();

        if !self.at_arguments_end(parenthesized) {
            loop {
                if let Some(key) = self.try_hash_key()? {
                    let value = self.read_value()?;
                    implicit_hash.insert(key, value);
                } else {
                    if !implicit_hash.is_empty() {
                        return Err(self.error_here("positional argument after hash pairs"));
                    }
                    args.push(self.read_value()?);
                }
                if !self.consume_if(&TokenKind::Comma) {
                    break;
                }
            }
        }

        if parenthesized && !self.consume_if(&TokenKind::RParen) {
            return Err(self.error_here("expected ')'"));
        }
        if !implicit_hash.is_empty() {
            args.push(Value::Object(implicit_hash));
        }
        Ok(args)
    }

    fn at_arguments_end(&self, parenthesized: bool) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                token.kind == TokenKind::Newline
                    || (parenthesized && token.kind == TokenKind::RParen)
            }
        }
    }

    /// Consumes `"key" =>`, `:key =>`, or `key:` and returns the key.
    fn try_hash_key(&mut self) -> DslResult<Option<String>> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        match &token.kind {
            TokenKind::Label(name) => {
                let name = name.clone();
                self.index += 1;
                Ok(Some(name))
            }
            TokenKind::Str(key) | TokenKind::Symbol(key) => {
                let is_pair = self
                    .tokens
                    .get(self.index + 1)
                    .map(|next| next.kind == TokenKind::Arrow)
                    .unwrap_or(false);
                if !is_pair {
                    return Ok(None);
                }
                let key = key.clone();
                self.index += 2;
                Ok(Some(key))
            }
            _ => Ok(None),
        }
    }

    fn read_value(&mut self) -> DslResult<Value> {
        let Some(token) = self.next() else {
            return Err(self.error_here("expected a value"));
        };
        match token.kind {
            TokenKind::Str(value) | TokenKind::Symbol(value) => Ok(Value::String(value)),
            TokenKind::Number(number) => Ok(Value::Number(number)),
            TokenKind::Ident(word) => match word.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "nil" => Ok(Value::Null),
                _ => Err(DslError::new(
                    token.line,
                    format!("unsupported expression '{word}'"),
                )),
            },
            TokenKind::LBracket => self.read_array(),
            TokenKind::LBrace => self.read_hash(),
            other => Err(DslError::new(
                token.line,
                format!("unexpected {other:?} where a value was expected"),
            )),
        }
    }

    fn read_array(&mut self) -> DslResult<Value> {
        let mut items = Vec::new();
        loop {
            if self.consume_if(&TokenKind::RBracket) {
                return Ok(Value::Array(items));
            }
            items.push(self.read_value()?);
            if !self.consume_if(&TokenKind::Comma) && !self.peek_is(&TokenKind::RBracket) {
                return Err(self.error_here("expected ',' or ']'"));
            }
        }
    }

    fn read_hash(&mut self) -> DslResult<Value> {
        let mut map = Map::new();
        loop {
            if self.consume_if(&TokenKind::RBrace) {
                return Ok(Value::Object(map));
            }
            let Some(key) = self.try_hash_key()? else {
                return Err(self.error_here("expected a hash key"));
            };
            let value = self.read_value()?;
            map.insert(key, value);
            if !self.consume_if(&TokenKind::Comma) && !self.peek_is(&TokenKind::RBrace) {
                return Err(self.error_here("expected ',' or '}'"));
            }
        }
    }

    fn apply(&mut self, statement: &str, args: Vec<Value>, line: usize) -> DslResult<()> {
        match statement {
            "name" => self.role.name = single_string(statement, args, line)?,
            "description" => self.role.description = single_string(statement, args, line)?,
            "run_list" => self.role.run_list = string_list(statement, args, line)?,
            "env_run_lists" => {
                let map = single_hash(statement, args, line)?;
                let mut env_run_lists = BTreeMap::new();
                for (environment, value) in map {
                    let entries = string_list(statement, vec![value], line)?;
                    env_run_lists.insert(environment, entries);
                }
                self.role.env_run_lists = env_run_lists;
            }
            "default_attributes" => {
                self.role.default_attributes = single_hash(statement, args, line)?;
            }
            "override_attributes" => {
                self.role.override_attributes = single_hash(statement, args, line)?;
            }
            other => {
                return Err(DslError::new(line, format!("unsupported statement '{other}'")));
            }
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn consume_if(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|token| &token.kind == kind).unwrap_or(false) {
            self.index += 1;
            return true;
        }
        false
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek().map(|token| &token.kind == kind).unwrap_or(false)
    }

    fn error_here(&self, message: &str) -> DslError {
        let line = self
            .peek()
            .or_else(|| self.tokens.last())
            .map(|token| token.line)
            .unwrap_or(1);
        DslError::new(line, message)
    }
}

fn single_string(statement: &str, args: Vec<Value>, line: usize) -> DslResult<String> {
    match <[Value; 1]>::try_from(args) {
        Ok([Value::String(value)]) => Ok(value),
        _ => Err(DslError::new(
            line,
            format!("'{statement}' takes one string"),
        )),
    }
}

fn single_hash(statement: &str, args: Vec<Value>, line: usize) -> DslResult<Map<String, Value>> {
    match <[Value; 1]>::try_from(args) {
        Ok([Value::Object(map)]) => Ok(map),
        _ => Err(DslError::new(line, format!("'{statement}' takes one hash"))),
    }
}

/// Strings and arrays of strings, flattened in order.
fn string_list(statement: &str, args: Vec<Value>, line: usize) -> DslResult<Vec<String>> {
    let mut entries = Vec::new();
    for arg in args {
        match arg {
            Value::String(entry) => entries.push(entry),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(entry) => entries.push(entry),
                        _ => {
                            return Err(DslError::new(
                                line,
                                format!("'{statement}' entries must be strings"),
                            ));
                        }
                    }
                }
            }
            _ => {
                return Err(DslError::new(
                    line,
                    format!("'{statement}' entries must be strings"),
                ));
            }
        }
    }
    Ok(entries)
}
