//! One-token-lookahead cursor shared by the precedence expression parser
//! and the recursive-descent statement parser, plus the EOL-rule checkpoints
//! of spec §4.E.
//!
//! The scanner (spec §6 "out of scope") already collapses any run of blank
//! lines/line-crossing comments into a single `Eol` token; this layer is
//! what decides, at each grammar position, whether that `Eol` must be
//! consumed, is a syntax error, or may be silently swallowed.

use ifjcode_base::{CompilerError, Position, Result};

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

pub struct TokenCursor<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> TokenCursor<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    pub fn peek(&self) -> &Token {
        &self.current
    }

    pub fn peek_kind(&self) -> &TokenKind {
        &self.current.kind
    }

    pub fn pos(&self) -> Position {
        self.current.pos
    }

    /// Advances past the current token, returning it.
    pub fn bump(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// Skips a single `Eol` if present — the "continuation is syntactically
    /// obvious" case (after an operator, `(`, or `,`).
    pub fn skip_optional_eol(&mut self) -> Result<()> {
        if matches!(self.current.kind, TokenKind::Eol) {
            self.bump()?;
        }
        Ok(())
    }

    /// A newline (or the block/program terminator that makes one moot) must
    /// follow here; swallows it if present.
    pub fn expect_eol_required(&mut self) -> Result<()> {
        match self.current.kind {
            TokenKind::Eol => {
                self.bump()?;
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(CompilerError::syntax_or_eol(format!(
                "{}: expected newline",
                self.current.pos
            ))),
        }
    }

    /// A newline here would be "excess EOL" — a syntax error.
    pub fn expect_eol_forbidden(&mut self) -> Result<()> {
        if matches!(self.current.kind, TokenKind::Eol) {
            return Err(CompilerError::syntax_or_eol(format!(
                "{}: unexpected newline",
                self.current.pos
            )));
        }
        Ok(())
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if std::mem::discriminant(&self.current.kind) == std::mem::discriminant(&kind) {
            self.bump()
        } else {
            Err(CompilerError::syntax_or_eol(format!(
                "{}: expected {:?}, found {:?}",
                self.current.pos, kind, self.current.kind
            )))
        }
    }

    pub fn expect_ident(&mut self) -> Result<String> {
        match self.current.kind.clone() {
            TokenKind::Ident(name) => {
                self.bump()?;
                Ok(name)
            }
            other => Err(CompilerError::syntax_or_eol(format!(
                "{}: expected identifier, found {:?}",
                self.current.pos, other
            ))),
        }
    }
}
