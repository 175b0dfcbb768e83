//! Character-level scanner.
//!
//! Consumes source text one character at a time (one character of lookahead
//! held in `peeked`), producing a flat token stream. Whitespace other than
//! newlines is discarded; a run of one or more newlines (or a `/* ... */`
//! comment that itself spans a line break) collapses to a single
//! [`TokenKind::Eol`]. Enforcing *when* an `Eol` is required, forbidden, or
//! optional is left to the parser layer's [`crate::parser::TokenStream`] —
//! the scanner itself stays context-free.

use std::rc::Rc;

use ifjcode_base::{Arena, CompilerError, Position, Result, Span};

use crate::token::{keyword, Token, TokenKind};

pub struct Lexer<'a> {
    chars: Vec<char>,
    idx: usize,
    pos: Position,
    arena: &'a Arena<u8>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &str, arena: &'a Arena<u8>) -> Self {
        Self {
            chars: source.chars().collect(),
            idx: 0,
            pos: Position::START,
            arena,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.idx + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.idx += 1;
        self.pos.advance(c);
        Some(c)
    }

    /// Skips whitespace (other than newlines) and comments, reporting
    /// whether a line break was crossed — the signal the parser layer turns
    /// into an `Eol` token.
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut saw_newline = false;
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('\n') => {
                    saw_newline = true;
                    self.bump();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            None => {
                                return Err(CompilerError::lexical(
                                    "unterminated block comment",
                                ))
                            }
                            Some('\n') => {
                                saw_newline = true;
                                self.bump();
                            }
                            Some('*') if self.peek2() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(saw_newline)
    }

    /// Scans and returns the next token, or `Eol` if the preceding trivia
    /// crossed a line boundary.
    pub fn next_token(&mut self) -> Result<Token> {
        let saw_newline = self.skip_trivia()?;
        let start_pos = self.pos;
        let start = self.idx;

        if saw_newline {
            return Ok(Token::new(
                TokenKind::Eol,
                Span::new(start, start),
                start_pos,
                false,
            ));
        }

        let Some(c) = self.peek() else {
            return Ok(Token::new(
                TokenKind::Eof,
                Span::new(start, start),
                start_pos,
                false,
            ));
        };

        let kind = match c {
            '(' => {
                self.bump();
                TokenKind::LParen
            }
            ')' => {
                self.bump();
                TokenKind::RParen
            }
            '{' => {
                self.bump();
                TokenKind::LBrace
            }
            '}' => {
                self.bump();
                TokenKind::RBrace
            }
            ',' => {
                self.bump();
                TokenKind::Comma
            }
            ';' => {
                self.bump();
                TokenKind::Semi
            }
            '+' => {
                self.bump();
                self.maybe_eq(TokenKind::PlusEq, TokenKind::Plus)
            }
            '-' => {
                self.bump();
                self.maybe_eq(TokenKind::MinusEq, TokenKind::Minus)
            }
            '*' => {
                self.bump();
                self.maybe_eq(TokenKind::StarEq, TokenKind::Star)
            }
            '/' => {
                self.bump();
                self.maybe_eq(TokenKind::SlashEq, TokenKind::Slash)
            }
            '!' => {
                self.bump();
                self.maybe_eq(TokenKind::NotEq, TokenKind::Bang)
            }
            '=' => {
                self.bump();
                self.maybe_eq(TokenKind::EqEq, TokenKind::Assign)
            }
            '>' => {
                self.bump();
                self.maybe_eq(TokenKind::GtE, TokenKind::Gt)
            }
            '<' => {
                self.bump();
                self.maybe_eq(TokenKind::LtE, TokenKind::Lt)
            }
            ':' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Define
                } else {
                    return Err(CompilerError::lexical(format!(
                        "{}: stray ':' (expected ':=')",
                        start_pos
                    )));
                }
            }
            '&' if self.peek2() == Some('&') => {
                self.bump();
                self.bump();
                TokenKind::AndAnd
            }
            '|' if self.peek2() == Some('|') => {
                self.bump();
                self.bump();
                TokenKind::OrOr
            }
            '"' => self.scan_string(start_pos)?,
            '0'..='9' => self.scan_number()?,
            c if c.is_alphabetic() || c == '_' => self.scan_ident_or_keyword(),
            other => {
                return Err(CompilerError::lexical(format!(
                    "{}: unexpected character '{}'",
                    start_pos, other
                )))
            }
        };

        let span = Span::new(start, self.idx);
        Ok(Token::new(kind, span, start_pos, false))
    }

    fn maybe_eq(&mut self, with_eq: TokenKind, without: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.bump();
            with_eq
        } else {
            without
        }
    }

    fn scan_ident_or_keyword(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        keyword(&word).unwrap_or(TokenKind::Ident(word))
    }

    /// Parses an integer or float literal. Per the pinned Open Question
    /// decision, a `.` must be followed by at least one digit: `1.` alone
    /// is a lexical error, not a float.
    fn scan_number(&mut self) -> Result<TokenKind> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        } else if self.peek() == Some('.') {
            return Err(CompilerError::lexical(
                "float literal requires at least one digit after '.'",
            ));
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            is_float = true;
            text.push(self.bump().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                text.push(self.bump().unwrap());
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(CompilerError::lexical(
                    "float exponent requires at least one digit",
                ));
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| CompilerError::lexical("malformed float literal"))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| CompilerError::lexical("integer literal out of range"))
        }
    }

    fn scan_string(&mut self, start_pos: Position) -> Result<TokenKind> {
        self.bump(); // opening quote
        let mut decoded = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(CompilerError::lexical(format!(
                        "{}: unterminated string literal",
                        start_pos
                    )))
                }
                Some('"') => break,
                Some('\\') => match self.bump() {
                    Some('n') => decoded.push('\n'),
                    Some('t') => decoded.push('\t'),
                    Some('"') => decoded.push('"'),
                    Some('\\') => decoded.push('\\'),
                    Some('x') | Some('0'..='9') => {
                        return Err(CompilerError::lexical(
                            "numeric string escapes are not supported",
                        ))
                    }
                    Some(other) => {
                        return Err(CompilerError::lexical(format!(
                            "unknown string escape '\\{}'",
                            other
                        )))
                    }
                    None => {
                        return Err(CompilerError::lexical("unterminated escape sequence"))
                    }
                },
                Some(c) => decoded.push(c),
            }
        }
        let staged = self.arena.alloc_str(&decoded);
        Ok(TokenKind::Str(Rc::from(staged)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let arena = Arena::new();
        let mut lexer = Lexer::new(src, &arena);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            let done = tok.is_eof();
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn scans_keywords_and_idents() {
        let k = kinds("func main");
        assert_eq!(k[0], TokenKind::Func);
        assert_eq!(k[1], TokenKind::Ident("main".into()));
    }

    #[test]
    fn scans_two_char_operators() {
        assert_eq!(kinds(":=")[0], TokenKind::Define);
        assert_eq!(kinds("==")[0], TokenKind::EqEq);
        assert_eq!(kinds(">=")[0], TokenKind::GtE);
        assert_eq!(kinds("&&")[0], TokenKind::AndAnd);
    }

    #[test]
    fn collapses_blank_lines_to_one_eol() {
        let k = kinds("a\n\n\nb");
        assert_eq!(
            k,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Eol,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_int_and_float_literals() {
        assert_eq!(kinds("42")[0], TokenKind::Int(42));
        assert_eq!(kinds("3.14")[0], TokenKind::Float(3.14));
    }

    #[test]
    fn trailing_dot_is_lexical_error() {
        let arena = Arena::new();
        let mut lexer = Lexer::new("1.", &arena);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn scans_string_with_escapes() {
        let k = kinds(r#""hi\nthere""#);
        match &k[0] {
            TokenKind::Str(s) => assert_eq!(&**s, "hi\nthere"),
            other => panic!("expected string token, got {:?}", other),
        }
    }

    #[test]
    fn line_comment_does_not_swallow_newline() {
        let k = kinds("a // comment\nb");
        assert_eq!(
            k,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Eol,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_comment_spanning_lines_counts_as_eol() {
        let k = kinds("a /* \n */ b");
        assert_eq!(
            k,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Eol,
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }
}
