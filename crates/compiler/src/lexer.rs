//! Tokenizer for RPL source text.
//!
//! Token boundaries are decided by the libraries: at each position every
//! registered library is probed and the longest claim wins. Text no library
//! claims runs to the next whitespace or to the next composite delimiter, so
//! `«1 2 +»` splits into five tokens. `@` starts a comment to end of line.

use rpl_vm::{Registry, TokenKind};

/// A token with its 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub text: &'a str,
    pub line: usize,
    pub col: usize,
}

pub(crate) struct Lexer<'a> {
    registry: &'a Registry,
    text: &'a str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(registry: &'a Registry, text: &'a str) -> Self {
        Self {
            registry,
            text,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn advance(&mut self, len: usize) {
        for c in self.text[self.pos..self.pos + len].chars() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.pos += len;
    }

    fn skip_blanks(&mut self) {
        loop {
            let rest = &self.text[self.pos..];
            let Some(c) = rest.chars().next() else {
                return;
            };
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else if c == '@' {
                self.advance(rest.find('\n').unwrap_or(rest.len()));
            } else {
                return;
            }
        }
    }

    /// Longest probe claim at the start of `text`.
    fn probe(&self, text: &str) -> Option<(usize, TokenKind)> {
        self.registry
            .libraries()
            .filter_map(|lib| lib.probe_token(text))
            .filter(|info| info.len > 0 && info.len <= text.len() && text.is_char_boundary(info.len))
            .max_by_key(|info| info.len)
            .map(|info| (info.len, info.kind))
    }

    fn is_delimiter(&self, text: &str) -> bool {
        matches!(
            self.probe(text),
            Some((_, TokenKind::Open | TokenKind::Close))
        )
    }

    /// Length of an unclaimed token starting at the current position.
    fn fallback_len(&self, rest: &str) -> usize {
        for (offset, c) in rest.char_indices().skip(1) {
            if c.is_whitespace() || self.is_delimiter(&rest[offset..]) {
                return offset;
            }
        }
        rest.len()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        self.skip_blanks();
        let rest = &self.text[self.pos..];
        if rest.is_empty() {
            return None;
        }
        let len = match self.probe(rest) {
            Some((len, _)) => len,
            None => self.fallback_len(rest),
        };
        let token = Token {
            text: &rest[..len],
            line: self.line,
            col: self.col,
        };
        self.advance(len);
        Some(token)
    }
}
