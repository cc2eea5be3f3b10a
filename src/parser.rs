//
// Copyright (c) The yangdb Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! YANG statement parser.
//!
//! Parses YANG module text into a generic statement tree following the
//! RFC 7950 statement grammar: every statement is a keyword, an optional
//! argument, and either `;` or a `{ ... }` block of substatements. The
//! parser does not interpret keywords; the context decides which
//! statements become schema nodes and which substatements it consults.

use crate::error::{Error, ErrorKind, Result};

/// A raw YANG statement.
#[derive(Clone, Debug)]
pub(crate) struct YangStmt {
    pub keyword: String,
    pub arg: Option<String>,
    pub substmts: Vec<YangStmt>,
}

impl YangStmt {
    /// Find the first substatement with the given keyword.
    pub(crate) fn find(&self, keyword: &str) -> Option<&YangStmt> {
        self.substmts.iter().find(|stmt| stmt.keyword == keyword)
    }
}

/// Parse a single module or submodule statement from YANG text.
pub(crate) fn parse_module(text: &str) -> Result<YangStmt> {
    let mut tokens = Tokenizer::new(text);
    let stmt = parse_stmt(&mut tokens)?;
    if !matches!(stmt.keyword.as_str(), "module" | "submodule") {
        return Err(Error::msg(
            ErrorKind::BadYang,
            format!("expected module or submodule, got {}", stmt.keyword),
        ));
    }
    match tokens.next()? {
        None => Ok(stmt),
        Some(token) => Err(Error::msg(
            ErrorKind::BadYang,
            format!("trailing input after module: {}", token),
        )),
    }
}

fn parse_stmt(tokens: &mut Tokenizer<'_>) -> Result<YangStmt> {
    let keyword = match tokens.next()? {
        Some(Token::Atom(keyword)) => keyword,
        Some(token) => {
            return Err(Error::msg(
                ErrorKind::BadYang,
                format!("expected keyword, got {}", token),
            ));
        }
        None => {
            return Err(Error::msg(ErrorKind::BadYang, "unexpected end of input"));
        }
    };

    // Optional argument.
    let mut arg = None;
    let mut token = tokens.next()?;
    if let Some(Token::Atom(value)) = token {
        arg = Some(value);
        token = tokens.next()?;
    }

    let mut substmts = Vec::new();
    match token {
        Some(Token::Semicolon) => {}
        Some(Token::OpenBrace) => loop {
            match tokens.peek()? {
                Some(Token::CloseBrace) => {
                    tokens.next()?;
                    break;
                }
                Some(_) => {}
                None => {
                    return Err(Error::msg(
                        ErrorKind::BadYang,
                        format!("unterminated block in {}", keyword),
                    ));
                }
            }
            substmts.push(parse_stmt(tokens)?);
        },
        _ => {
            return Err(Error::msg(
                ErrorKind::BadYang,
                format!("expected ';' or '{{' after {}", keyword),
            ));
        }
    }

    Ok(YangStmt {
        keyword,
        arg,
        substmts,
    })
}

#[derive(Clone, Debug)]
enum Token {
    Atom(String),
    Semicolon,
    OpenBrace,
    CloseBrace,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Atom(value) => write!(f, "'{}'", value),
            Token::Semicolon => write!(f, "';'"),
            Token::OpenBrace => write!(f, "'{{'"),
            Token::CloseBrace => write!(f, "'}}'"),
        }
    }
}

struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    peeked: Option<Option<Token>>,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            input: text.as_bytes(),
            pos: 0,
            peeked: None,
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.scan()?);
        }
        Ok(self.peeked.as_ref().unwrap().as_ref())
    }

    fn next(&mut self) -> Result<Option<Token>> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan(),
        }
    }

    fn scan(&mut self) -> Result<Option<Token>> {
        self.skip_trivia()?;
        let byte = match self.input.get(self.pos) {
            Some(byte) => *byte,
            None => return Ok(None),
        };
        match byte {
            b';' => {
                self.pos += 1;
                Ok(Some(Token::Semicolon))
            }
            b'{' => {
                self.pos += 1;
                Ok(Some(Token::OpenBrace))
            }
            b'}' => {
                self.pos += 1;
                Ok(Some(Token::CloseBrace))
            }
            b'"' | b'\'' => self.scan_quoted(byte).map(Some),
            _ => self.scan_bare().map(Some),
        }
    }

    /// Skip whitespace, `//` line comments and `/* */` block comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            while matches!(self.input.get(self.pos), Some(b) if b.is_ascii_whitespace())
            {
                self.pos += 1;
            }
            match (self.input.get(self.pos), self.input.get(self.pos + 1)) {
                (Some(b'/'), Some(b'/')) => {
                    while !matches!(self.input.get(self.pos), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    self.pos += 2;
                    loop {
                        match (self.input.get(self.pos), self.input.get(self.pos + 1))
                        {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (None, _) => {
                                return Err(Error::msg(
                                    ErrorKind::BadYang,
                                    "unterminated comment",
                                ));
                            }
                            _ => self.pos += 1,
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scan a quoted string, handling the standard escapes in
    /// double-quoted strings and `+` concatenation.
    fn scan_quoted(&mut self, quote: u8) -> Result<Token> {
        let mut value = Vec::new();
        let mut quote = quote;
        loop {
            self.pos += 1; // opening quote
            loop {
                match self.input.get(self.pos) {
                    Some(&byte) if byte == quote => {
                        self.pos += 1;
                        break;
                    }
                    Some(b'\\') if quote == b'"' => {
                        let escaped = match self.input.get(self.pos + 1) {
                            Some(b'n') => b'\n',
                            Some(b't') => b'\t',
                            Some(b'"') => b'"',
                            Some(b'\\') => b'\\',
                            _ => {
                                return Err(Error::msg(
                                    ErrorKind::BadYang,
                                    "bad escape in string",
                                ));
                            }
                        };
                        value.push(escaped);
                        self.pos += 2;
                    }
                    Some(&byte) => {
                        value.push(byte);
                        self.pos += 1;
                    }
                    None => {
                        return Err(Error::msg(
                            ErrorKind::BadYang,
                            "unterminated string",
                        ));
                    }
                }
            }
            // String concatenation: "a" + "b".
            self.skip_trivia()?;
            if self.input.get(self.pos) == Some(&b'+') {
                self.pos += 1;
                self.skip_trivia()?;
                match self.input.get(self.pos) {
                    Some(&byte @ (b'"' | b'\'')) => quote = byte,
                    _ => {
                        return Err(Error::msg(
                            ErrorKind::BadYang,
                            "expected string after '+'",
                        ));
                    }
                }
            } else {
                break;
            }
        }
        let value = String::from_utf8(value)
            .map_err(|_| Error::msg(ErrorKind::BadYang, "non-utf8 input"))?;
        Ok(Token::Atom(value))
    }

    fn scan_bare(&mut self) -> Result<Token> {
        let start = self.pos;
        while let Some(&byte) = self.input.get(self.pos) {
            if byte.is_ascii_whitespace() || matches!(byte, b';' | b'{' | b'}') {
                break;
            }
            self.pos += 1;
        }
        let value = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| Error::msg(ErrorKind::BadYang, "non-utf8 input"))?;
        Ok(Token::Atom(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_tree() {
        let module = parse_module(
            r#"
            module test {
                namespace "urn:test";
                prefix t;

                /* data nodes */
                container a {
                    leaf b { type string; } // a leaf
                }
            }"#,
        )
        .unwrap();
        assert_eq!(module.arg.as_deref(), Some("test"));
        assert_eq!(
            module.find("namespace").unwrap().arg.as_deref(),
            Some("urn:test")
        );
        let container = module.find("container").unwrap();
        let leaf = container.find("leaf").unwrap();
        assert_eq!(leaf.arg.as_deref(), Some("b"));
        assert_eq!(leaf.find("type").unwrap().arg.as_deref(), Some("string"));
    }

    #[test]
    fn quoted_concatenation() {
        let module =
            parse_module(r#"module t { description "a " + 'b'; }"#).unwrap();
        assert_eq!(
            module.find("description").unwrap().arg.as_deref(),
            Some("a b")
        );
    }

    #[test]
    fn rejects_non_module() {
        assert_eq!(
            parse_module("container a;").unwrap_err().kind,
            ErrorKind::BadYang
        );
    }
}
