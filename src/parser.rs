//! Location-tracked JSON reader.
//!
//! `serde_json` drops positions, so the structure is scanned here and only
//! the leaf literals (strings, numbers) are handed to `serde_json` for
//! decoding. Every node gets the line/column/offset of its first character.
use std::iter::Peekable;
use std::str::CharIndices;

use serde_json::Number;

use crate::error::{Error, ErrorKind};
use crate::location::Location;
use crate::value::{Fields, Key, Value, ValueKind};

const MAX_DEPTH: usize = 256;

/// Parse one document. The root must be a map or a list.
pub fn parse_document(file: &str, text: &str) -> Result<Value, Error> {
    let mut parser = Parser::new(file, text);
    parser.skip_ws();
    match parser.peek().1 {
        '{' | '[' => (),
        '\x00' if parser.at_end() => return Err(parser.error("empty document")),
        _ => return Err(parser.error("document root must be a map or a list")),
    }
    let root = parser.parse_value(0)?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(parser.error("trailing characters after document"));
    }
    Ok(root)
}

struct Parser<'source> {
    file: &'source str,
    src: &'source str,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Parser<'source> {
    fn new(file: &'source str, src: &'source str) -> Self {
        Self {
            file,
            src,
            iter: src.char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.src.len(), '\x00'),
        }
    }

    fn at_end(&mut self) -> bool {
        self.iter.peek().is_none()
    }

    fn bump(&mut self) {
        if let Some((_, ch)) = self.iter.next() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn location(&mut self) -> Location {
        let offset = self.peek().0 as u32;
        Location::new(self.file, self.line, self.col, offset)
    }

    fn error(&mut self, msg: &str) -> Error {
        let location = self.location();
        Error::new(self.file, location, ErrorKind::Parse(msg.to_string()))
    }

    fn error_at(&self, location: Location, msg: String) -> Error {
        Error::new(self.file, location, ErrorKind::Parse(msg))
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek().1, ' ' | '\t' | '\r' | '\n') && !self.at_end() {
            self.bump();
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), Error> {
        if self.peek().1 == ch && !self.at_end() {
            self.bump();
            Ok(())
        } else {
            Err(self.error(&format!("expected `{ch}`")))
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, Error> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_ws();
        let location = self.location();
        if self.at_end() {
            return Err(self.error("unexpected end of document"));
        }
        let kind = match self.peek().1 {
            '{' => ValueKind::Map(self.parse_map(depth)?),
            '[' => ValueKind::List(self.parse_list(depth)?),
            '"' => ValueKind::String(self.parse_string()?),
            '-' | '0'..='9' => ValueKind::Number(self.parse_number()?),
            't' => { self.keyword("true")?; ValueKind::Bool(true) }
            'f' => { self.keyword("false")?; ValueKind::Bool(false) }
            'n' => { self.keyword("null")?; ValueKind::Null }
            ch => return Err(self.error(&format!("unexpected character `{ch}`"))),
        };
        Ok(Value::new(kind, location))
    }

    fn keyword(&mut self, word: &str) -> Result<(), Error> {
        let (offset, _) = self.peek();
        if !self.src[offset..].starts_with(word) {
            return Err(self.error("invalid literal"));
        }
        for _ in word.chars() {
            self.bump();
        }
        Ok(())
    }

    fn parse_map(&mut self, depth: usize) -> Result<Fields, Error> {
        self.expect('{')?;
        let mut fields = Fields::new();
        self.skip_ws();
        if self.peek().1 == '}' {
            self.bump();
            return Ok(fields);
        }
        loop {
            self.skip_ws();
            let key_location = self.location();
            if self.peek().1 != '"' {
                return Err(self.error("expected a string key"));
            }
            let name = self.parse_string()?;
            self.skip_ws();
            self.expect(':')?;
            let value = self.parse_value(depth + 1)?;
            // later duplicates win, like serde_json
            fields.insert(Key::new(name, key_location), value);
            self.skip_ws();
            match self.peek().1 {
                ',' => self.bump(),
                '}' => {
                    self.bump();
                    return Ok(fields);
                }
                _ => return Err(self.error("expected `,` or `}`")),
            }
        }
    }

    fn parse_list(&mut self, depth: usize) -> Result<Vec<Value>, Error> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek().1 == ']' {
            self.bump();
            return Ok(items);
        }
        loop {
            items.push(self.parse_value(depth + 1)?);
            self.skip_ws();
            match self.peek().1 {
                ',' => self.bump(),
                ']' => {
                    self.bump();
                    return Ok(items);
                }
                _ => return Err(self.error("expected `,` or `]`")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, Error> {
        let location = self.location();
        let (start, _) = self.peek();
        self.bump();
        loop {
            if self.at_end() {
                return Err(self.error_at(location, "unmatched \"".to_string()));
            }
            match self.peek().1 {
                '"' => break,
                '\\' => {
                    self.bump();
                    self.bump();
                }
                ch if (ch as u32) < 0x20 => {
                    return Err(self.error("invalid character in string"));
                }
                _ => self.bump(),
            }
        }
        self.bump();
        let end = self.peek().0;
        // escapes are validated and decoded by serde_json
        serde_json::from_str::<String>(&self.src[start..end])
            .map_err(|e| self.error_at(location, format!("invalid string literal: {e}")))
    }

    fn parse_number(&mut self) -> Result<Number, Error> {
        let location = self.location();
        let (start, _) = self.peek();
        while matches!(self.peek().1, '-' | '+' | '.' | 'e' | 'E' | '0'..='9') && !self.at_end() {
            self.bump();
        }
        let end = self.peek().0;
        let raw = &self.src[start..end];
        serde_json::from_str::<Number>(raw)
            .map_err(|_| self.error_at(location, format!("invalid number `{raw}`")))
    }
}
