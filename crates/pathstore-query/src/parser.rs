//! Store path expression parser.

use crate::types::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("badly formed store path: {0}")]
    MalformedPath(String),
    #[error("multi-store path segment needs a name, add an alias: {0} -- someName")]
    MissingAlias(String),
}

/// Parse a full path expression.
///
/// Newlines are stripped before tokenizing. Segments are split on `|`
/// and parsed left to right; any failure aborts the whole expression.
pub fn parse(input: &str) -> Result<ParsedPath, ParseError> {
    let normalized: String = input.split('\n').map(str::trim).collect();
    let segments: Vec<&str> = normalized.split('|').map(str::trim).collect();
    let num_stores = segments.len();

    let mut queries = Vec::with_capacity(num_stores);
    for segment in segments {
        queries.push(SegmentParser::parse(segment, num_stores)?);
    }

    Ok(if queries.len() == 1 {
        ParsedPath::Single(queries.remove(0))
    } else {
        ParsedPath::Union(queries)
    })
}

/// Parser for one `|`-delimited segment.
struct SegmentParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SegmentParser<'a> {
    fn parse(segment: &'a str, num_stores: usize) -> Result<Query, ParseError> {
        let mut parser = Self { input: segment, pos: 0 };
        parser.parse_segment(num_stores)
    }

    fn parse_segment(&mut self, num_stores: usize) -> Result<Query, ParseError> {
        let store = self.parse_identifier()?;
        let mut store_path = Vec::new();

        while self.peek() == Some('.') {
            self.advance();
            if self.peek() == Some('[') {
                store_path.push(self.parse_predicate()?);
            } else {
                store_path.push(PathStep::Key(self.parse_identifier()?));
            }
        }

        let (mut just, not) = self.parse_filter()?;
        let mut name = self.parse_alias()?;

        self.skip_whitespace();
        if !self.is_at_end() {
            return Err(self.malformed());
        }

        // A one-item inclusion list is just one more path step.
        if let Some(items) = &just {
            if items.len() == 1 {
                store_path.push(PathStep::Key(items[0].clone()));
                just = None;
            }
        }

        let prop_name = store_path
            .last()
            .and_then(PathStep::as_key)
            .map(str::to_owned);

        if num_stores > 1 && name.is_none() {
            if prop_name.is_some() {
                name = prop_name.clone();
            } else if !store_path.is_empty() {
                return Err(ParseError::MissingAlias(self.input.to_owned()));
            } else {
                name = Some(store.clone());
            }
        } else if name.is_none() && prop_name.is_some() {
            name = prop_name.clone();
        }

        Ok(Query {
            name,
            store,
            prop_name,
            store_path,
            just,
            not,
        })
    }

    /// Parse an optional `:just(...)` or `:not(...)` clause.
    #[allow(clippy::type_complexity)]
    fn parse_filter(&mut self) -> Result<(Option<Vec<String>>, Option<Vec<String>>), ParseError> {
        let start = self.pos;
        self.skip_whitespace();
        if self.peek() != Some(':') {
            self.pos = start;
            return Ok((None, None));
        }
        self.advance();
        self.skip_whitespace();
        let keyword = self.parse_identifier()?;
        self.skip_whitespace();
        self.expect('(')?;
        let items = self.parse_list()?;
        match keyword.as_str() {
            "just" => Ok((Some(items), None)),
            "not" => Ok((None, Some(items))),
            _ => Err(self.malformed()),
        }
    }

    /// Parse an optional `-- alias` suffix.
    fn parse_alias(&mut self) -> Result<Option<String>, ParseError> {
        let start = self.pos;
        self.skip_whitespace();
        if !self.peek_str("--") {
            self.pos = start;
            return Ok(None);
        }
        self.advance_by(2);
        self.skip_whitespace();
        Ok(Some(self.parse_identifier()?))
    }

    /// Parse a `[key:value]` predicate step. Whitespace inside the
    /// brackets is insignificant; the value is everything up to the
    /// closing bracket, trimmed.
    fn parse_predicate(&mut self) -> Result<PathStep, ParseError> {
        self.expect('[')?;
        self.skip_whitespace();
        let key = self.parse_identifier()?;
        self.skip_whitespace();
        self.expect(':')?;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == ']' {
                break;
            }
            self.advance();
        }
        let value = self.input[start..self.pos].trim().to_owned();
        self.expect(']')?;
        if value.is_empty() {
            return Err(self.malformed());
        }
        Ok(PathStep::Predicate { key, value })
    }

    /// Parse a comma-separated filter list up to the closing paren.
    fn parse_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            items.push(self.parse_list_item()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.advance(),
                Some(')') => {
                    self.advance();
                    return Ok(items);
                }
                _ => return Err(self.malformed()),
            }
        }
    }

    /// One filter list item. Items may carry dots (nested `just`
    /// lookups) and colons (`not` predicates); inner whitespace is
    /// trimmed off the ends.
    fn parse_list_item(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == ':' || c == ' ' {
                self.advance();
            } else {
                break;
            }
        }
        let item = self.input[start..self.pos].trim().to_owned();
        if item.is_empty() {
            return Err(self.malformed());
        }
        Ok(item)
    }

    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.malformed());
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn malformed(&self) -> ParseError {
        ParseError::MalformedPath(self.input.to_owned())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.peek() == Some(expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.malformed())
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}
