//! Query parser and tokenizer.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or      := and (("OR" | "||") and)*
//! and     := unary ((("AND" | "&&") unary) | unary)*
//! unary   := ("NOT" | "!" | "-" | "+")* primary
//! primary := "(" or ")" | term
//! term    := [field ":"] (word | "\"phrase\"" | range)
//! range   := ("[" | "{") bound "TO" bound ("]" | "}")
//! ```

use crate::error::{Result, SearchError};

use super::expression::{QueryExpression, QueryField, QueryTerm, QueryValue, StringRange};
use super::wildcard::{GlobPattern, GlobToken};

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct QueryToken {
    kind: QueryTokenKind,
    position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryTokenKind {
    Term(QueryTerm),
    MatchAll,
    LParen,
    RParen,
    And,
    Or,
    Not,
    Minus,
    Plus,
}

// ---------------------------------------------------------------------------
// Query parser
// ---------------------------------------------------------------------------

pub struct QueryParser {
    tokens: Vec<QueryToken>,
    index: usize,
}

impl QueryParser {
    /// Parses query text. Blank text is the match-all expression.
    pub fn parse(input: &str) -> Result<QueryExpression> {
        let tokens = tokenize_query_input(input)?;
        if tokens.is_empty() {
            return Ok(QueryExpression::MatchAll);
        }

        let mut parser = Self { tokens, index: 0 };
        let expression = parser.parse_or_expression()?;
        if let Some(token) = parser.peek() {
            return Err(SearchError::query(format!(
                "unexpected token near byte {}",
                token.position
            )));
        }

        Ok(expression)
    }

    fn parse_or_expression(&mut self) -> Result<QueryExpression> {
        let mut parts = vec![self.parse_and_expression()?];

        while self.consume(&QueryTokenKind::Or) {
            if self.is_end() || self.next_is(&QueryTokenKind::RParen) {
                return Err(self.dangling_operator("OR"));
            }
            parts.push(self.parse_and_expression()?);
        }

        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => QueryExpression::Or(parts),
        })
    }

    fn parse_and_expression(&mut self) -> Result<QueryExpression> {
        let mut parts = vec![self.parse_unary_expression()?];

        loop {
            if self.consume(&QueryTokenKind::And) {
                if !self.next_starts_operand() {
                    return Err(self.dangling_operator("AND"));
                }
                parts.push(self.parse_unary_expression()?);
                continue;
            }
            if self.next_starts_operand() {
                parts.push(self.parse_unary_expression()?);
                continue;
            }
            break;
        }

        Ok(match parts.len() {
            1 => parts.remove(0),
            _ => QueryExpression::And(parts),
        })
    }

    fn parse_unary_expression(&mut self) -> Result<QueryExpression> {
        let mut negate = false;
        loop {
            if self.consume(&QueryTokenKind::Not) || self.consume(&QueryTokenKind::Minus) {
                negate = !negate;
                continue;
            }
            if self.consume(&QueryTokenKind::Plus) {
                continue;
            }
            break;
        }

        let expression = self.parse_primary_expression()?;
        if negate {
            Ok(QueryExpression::Not(Box::new(expression)))
        } else {
            Ok(expression)
        }
    }

    fn parse_primary_expression(&mut self) -> Result<QueryExpression> {
        if self.consume(&QueryTokenKind::LParen) {
            return self.parse_group();
        }

        let token = self.next().ok_or_else(|| {
            SearchError::query("expected query term but reached end of query")
        })?;

        match token.kind {
            QueryTokenKind::Term(term) => Ok(QueryExpression::Term(term)),
            QueryTokenKind::MatchAll => Ok(QueryExpression::MatchAll),
            QueryTokenKind::RParen => Err(SearchError::query(format!(
                "unexpected ')' near byte {}",
                token.position
            ))),
            _ => Err(SearchError::query(format!(
                "expected query term near byte {}",
                token.position
            ))),
        }
    }

    fn parse_group(&mut self) -> Result<QueryExpression> {
        let expression = self.parse_or_expression()?;
        if self.consume(&QueryTokenKind::RParen) {
            return Ok(expression);
        }

        let position = self
            .peek()
            .map(|token| token.position)
            .unwrap_or_else(|| self.last_position());
        Err(SearchError::query(format!(
            "missing closing ')' near byte {position}"
        )))
    }

    fn next_starts_operand(&self) -> bool {
        matches!(
            self.peek().map(|token| &token.kind),
            Some(
                QueryTokenKind::Term(_)
                    | QueryTokenKind::MatchAll
                    | QueryTokenKind::LParen
                    | QueryTokenKind::Not
                    | QueryTokenKind::Minus
                    | QueryTokenKind::Plus
            )
        )
    }

    fn dangling_operator(&self, operator: &str) -> SearchError {
        let position = self
            .peek()
            .map(|token| token.position)
            .unwrap_or_else(|| self.last_position());
        SearchError::query(format!(
            "operator {operator} is missing an operand near byte {position}"
        ))
    }

    fn consume(&mut self, expected: &QueryTokenKind) -> bool {
        self.next_is(expected) && {
            self.index += 1;
            true
        }
    }

    fn next_is(&self, expected: &QueryTokenKind) -> bool {
        matches!(self.peek().map(|token| &token.kind), Some(kind) if kind == expected)
    }

    fn is_end(&self) -> bool {
        self.index >= self.tokens.len()
    }

    fn peek(&self) -> Option<&QueryToken> {
        self.tokens.get(self.index)
    }

    fn next(&mut self) -> Option<QueryToken> {
        let token = self.tokens.get(self.index).cloned()?;
        self.index += 1;
        Some(token)
    }

    fn last_position(&self) -> usize {
        self.tokens
            .last()
            .map(|token| token.position)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn tokenize_query_input(input: &str) -> Result<Vec<QueryToken>> {
    let mut tokens = Vec::new();
    let mut cursor = 0usize;

    while let Some(ch) = input[cursor..].chars().next() {
        if ch.is_whitespace() {
            cursor += ch.len_utf8();
            continue;
        }

        let position = cursor;
        let next = input[cursor + ch.len_utf8()..].chars().next();
        let (kind, next_cursor) = match ch {
            '(' => (QueryTokenKind::LParen, cursor + 1),
            ')' => (QueryTokenKind::RParen, cursor + 1),
            '!' => (QueryTokenKind::Not, cursor + 1),
            '&' if next == Some('&') => (QueryTokenKind::And, cursor + 2),
            '|' if next == Some('|') => (QueryTokenKind::Or, cursor + 2),
            '-' | '+' => {
                if next.map_or(true, |following| following.is_whitespace() || following == ')') {
                    return Err(SearchError::query(format!(
                        "dangling '{ch}' near byte {position}"
                    )));
                }
                let kind = if ch == '-' {
                    QueryTokenKind::Minus
                } else {
                    QueryTokenKind::Plus
                };
                (kind, cursor + 1)
            }
            '"' => {
                let (phrase, next_cursor) = consume_quoted_phrase(input, cursor)?;
                let term = QueryTerm::new(QueryField::Any, QueryValue::Exact(phrase));
                (QueryTokenKind::Term(term), next_cursor)
            }
            ':' => {
                return Err(SearchError::query(format!(
                    "missing field name near byte {position}"
                )))
            }
            _ if is_reserved_char(ch) => return Err(reserved_char_error(ch, position)),
            _ => consume_term(input, cursor)?,
        };

        tokens.push(QueryToken { kind, position });
        cursor = next_cursor;
    }

    Ok(tokens)
}

/// Characters that only have meaning in syntax this parser does not accept.
fn is_reserved_char(ch: char) -> bool {
    matches!(ch, '~' | '^' | '[' | ']' | '{' | '}' | '&' | '|' | '"')
}

fn reserved_char_error(ch: char, position: usize) -> SearchError {
    let reason = match ch {
        '~' => "fuzzy and proximity operators are not supported",
        '^' => "boosting is not supported",
        '[' | ']' | '{' | '}' => "ranges must follow a field name",
        '&' | '|' => "single '&' and '|' are not operators",
        _ => "unexpected character",
    };
    SearchError::query(format!("{reason} ('{ch}' near byte {position})"))
}

/// Reads a `[field:]value` term starting at `start`.
fn consume_term(input: &str, start: usize) -> Result<(QueryTokenKind, usize)> {
    let mut cursor = start;
    let mut field: Option<Vec<GlobToken>> = None;
    let mut part = Vec::new();

    while let Some(ch) = input[cursor..].chars().next() {
        if ch.is_whitespace() || ch == '(' || ch == ')' {
            break;
        }
        if ch == '\\' {
            cursor += 1;
            let escaped = input[cursor..].chars().next().ok_or_else(|| {
                SearchError::query(format!("dangling escape near byte {}", cursor - 1))
            })?;
            part.push(GlobToken::Literal(escaped));
            cursor += escaped.len_utf8();
            continue;
        }
        if ch == ':' {
            if field.is_some() {
                return Err(SearchError::query(format!(
                    "unexpected ':' near byte {cursor}; escape it as '\\:'"
                )));
            }
            if part.is_empty() {
                return Err(SearchError::query(format!(
                    "missing field name near byte {cursor}"
                )));
            }
            field = Some(std::mem::take(&mut part));
            cursor += 1;

            match input[cursor..].chars().next() {
                Some('"') => {
                    let (phrase, next_cursor) = consume_quoted_phrase(input, cursor)?;
                    let field = resolve_field(field.unwrap_or_default(), start)?;
                    let term = QueryTerm::new(field, QueryValue::Exact(phrase));
                    return Ok((QueryTokenKind::Term(term), next_cursor));
                }
                Some(open @ ('[' | '{')) => {
                    let (range, next_cursor) = consume_range(input, cursor, open)?;
                    let field = resolve_field(field.unwrap_or_default(), start)?;
                    let term = QueryTerm::new(field, QueryValue::Range(range));
                    return Ok((QueryTokenKind::Term(term), next_cursor));
                }
                Some('(') => {
                    return Err(SearchError::query(format!(
                        "field grouping is not supported near byte {cursor}"
                    )))
                }
                Some(next) if !next.is_whitespace() && next != ')' => continue,
                _ => {
                    return Err(SearchError::query(format!(
                        "missing value for field near byte {start}"
                    )))
                }
            }
        }
        if is_reserved_char(ch) {
            return Err(reserved_char_error(ch, cursor));
        }

        part.push(match ch {
            '*' => GlobToken::AnyRun,
            '?' => GlobToken::AnyChar,
            other => GlobToken::Literal(other),
        });
        cursor += ch.len_utf8();
    }

    let raw = &input[start..cursor];
    let Some(field) = field else {
        let kind = match raw {
            "AND" => QueryTokenKind::And,
            "OR" => QueryTokenKind::Or,
            "NOT" => QueryTokenKind::Not,
            "*" => QueryTokenKind::MatchAll,
            _ => QueryTokenKind::Term(QueryTerm::new(QueryField::Any, resolve_value(part))),
        };
        return Ok((kind, cursor));
    };

    let field = resolve_field(field, start)?;
    let value = resolve_value(part);
    let kind = if field == QueryField::Any && value == QueryValue::Present {
        QueryTokenKind::MatchAll
    } else {
        QueryTokenKind::Term(QueryTerm::new(field, value))
    };
    Ok((kind, cursor))
}

fn resolve_field(tokens: Vec<GlobToken>, position: usize) -> Result<QueryField> {
    if tokens == [GlobToken::AnyRun] {
        return Ok(QueryField::Any);
    }
    GlobPattern::new(tokens)
        .as_literal()
        .map(QueryField::Named)
        .ok_or_else(|| {
            SearchError::query(format!(
                "wildcards in field names are not supported near byte {position}"
            ))
        })
}

fn resolve_value(tokens: Vec<GlobToken>) -> QueryValue {
    if tokens == [GlobToken::AnyRun] {
        return QueryValue::Present;
    }
    let pattern = GlobPattern::new(tokens);
    match pattern.as_literal() {
        Some(literal) => QueryValue::Exact(literal),
        None => QueryValue::Pattern(pattern),
    }
}

fn consume_quoted_phrase(input: &str, start: usize) -> Result<(String, usize)> {
    let mut cursor = start + 1;
    let mut phrase = String::new();
    let mut escaped = false;

    while let Some(ch) = input[cursor..].chars().next() {
        cursor += ch.len_utf8();

        if escaped {
            phrase.push(ch);
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if ch == '"' {
            if let Some(suffix @ ('~' | '^')) = input[cursor..].chars().next() {
                return Err(reserved_char_error(suffix, cursor));
            }
            return Ok((phrase, cursor));
        }

        phrase.push(ch);
    }

    Err(SearchError::query(format!(
        "missing closing quote near byte {start}"
    )))
}

fn consume_range(input: &str, start: usize, open: char) -> Result<(StringRange, usize)> {
    let body_start = start + open.len_utf8();
    let Some(close_offset) = input[body_start..].find([']', '}']) else {
        return Err(SearchError::query(format!(
            "missing closing bracket for range near byte {start}"
        )));
    };
    let close_at = body_start + close_offset;
    let close = input[close_at..].chars().next().unwrap_or(']');
    let body = &input[body_start..close_at];

    let parts = body.split_whitespace().collect::<Vec<_>>();
    let [lower, "TO", upper] = parts.as_slice() else {
        return Err(SearchError::query(format!(
            "range must have the form [lower TO upper] near byte {start}"
        )));
    };

    let bound = |raw: &str| -> Option<String> {
        match raw {
            "*" => None,
            quoted if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') => {
                Some(quoted[1..quoted.len() - 1].to_string())
            }
            other => Some(other.to_string()),
        }
    };

    let range = StringRange {
        lower: bound(*lower),
        upper: bound(*upper),
        lower_inclusive: open == '[',
        upper_inclusive: close == ']',
    };
    let next_cursor = close_at + 1;
    if let Some(suffix @ ('~' | '^')) = input[next_cursor..].chars().next() {
        return Err(reserved_char_error(suffix, next_cursor));
    }
    if let Some(ch) = input[next_cursor..].chars().next() {
        if !ch.is_whitespace() && ch != ')' {
            return Err(SearchError::query(format!(
                "unexpected '{ch}' after range near byte {next_cursor}"
            )));
        }
    }
    Ok((range, next_cursor))
}
