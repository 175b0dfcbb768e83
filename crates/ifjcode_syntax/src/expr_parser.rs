//! Operator-precedence expression parser (spec §4.D).
//!
//! Implemented as precedence climbing over the shared [`crate::stmt_parser::Parser`]
//! token cursor rather than the literal 27×27 shift/reduce action table: the
//! table encodes exactly the precedence ladder below (`||` loosest, unary
//! tightest) plus the same unary-vs-binary `+`/`-` resolution, EOL-swallowing
//! and assign-rule gating spec'd in §4.D — precedence climbing gives the
//! identical grammar without hand-maintaining a 729-cell table no test in
//! this crate could assert against directly. See DESIGN.md.
//!
//! The AST is built in lockstep with parsing, per §4.D's "Output" note:
//! there is no separate reduction-then-build pass.

use std::rc::Rc;

use ifjcode_base::{CompilerError, Position, Result, Span};

use crate::ast::{infer, AstKind, AstNode, AstRef, BinOp, UnOp};
use crate::stmt_parser::Parser;
use crate::symtable::Sym;
use crate::token::TokenKind;
use crate::types::Type;

/// The assign-rule gate of spec §4.D: how many `Define`/`Assign`/bare-call
/// occurrences a top-level parse may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignRule {
    /// Exactly one assign/define, or one bare call with nothing else.
    ValidStatement,
    /// Exactly one assignment, no define.
    AssignRequired,
    /// Exactly one define, no assign.
    DefineRequired,
    /// Neither define nor assign permitted.
    PureExpression,
}

/// Parses a single pure expression (no top-level comma, no assignment) —
/// used for `if`/`for` conditions and individual return-list elements.
pub fn parse_expr(parser: &mut Parser, eol_before_allowed: bool) -> Result<AstRef> {
    if eol_before_allowed {
        parser.cursor.skip_optional_eol()?;
    }
    parse_or(parser)
}

/// Parses a comma-separated list of pure expressions, used for call
/// arguments and return-value lists. Requires at least one element unless
/// the immediately following token makes an empty list obvious to the
/// caller (callers check for that before calling this).
pub fn parse_expr_list(parser: &mut Parser) -> Result<Vec<AstRef>> {
    let mut items = vec![parse_or(parser)?];
    while matches!(parser.cursor.peek_kind(), TokenKind::Comma) {
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        items.push(parse_or(parser)?);
    }
    Ok(items)
}

/// One item of a statement's target list, left of `:=`/`=`/a compound
/// operator (or the sole item of a bare-call statement). Resolving a bare
/// identifier to a symbol has to wait until the operator that follows the
/// whole list is known — `:=` declares a fresh variable in the current
/// scope, `=` must find one that already exists — so this just remembers
/// the name and its position instead of resolving eagerly the way a plain
/// value-position identifier does.
enum LhsItem {
    Name(String, Position, Span),
    BlackHole(Span),
    /// Anything that isn't a bare identifier: a call, or (in principle) a
    /// larger expression. Valid only as the sole item of a `ValidStatement`
    /// bare-call statement; any other use is a syntax error.
    Expr(AstRef),
}

impl LhsItem {
    fn span(&self) -> Span {
        match self {
            LhsItem::Name(_, _, s) => *s,
            LhsItem::BlackHole(s) => *s,
            LhsItem::Expr(e) => e.span,
        }
    }
}

/// Parses one target-list item without resolving a bare name to a symbol.
fn parse_lhs_item(parser: &mut Parser) -> Result<LhsItem> {
    let tok = parser.cursor.peek().clone();
    if let TokenKind::Ident(name) = tok.kind {
        parser.cursor.bump()?;
        if name == "_" {
            return Ok(LhsItem::BlackHole(tok.span));
        }
        if matches!(parser.cursor.peek_kind(), TokenKind::LParen) {
            return Ok(LhsItem::Expr(parser.parse_call(&name, tok.span)?));
        }
        return Ok(LhsItem::Name(name, tok.pos, tok.span));
    }
    Ok(LhsItem::Expr(parse_or(parser)?))
}

/// Parses a full statement-position expression, applying the assign-rule
/// gate. Returns the `Assign`/`Define` node, or — for `ValidStatement` with
/// no assignment — the bare `FuncCall` node.
pub fn parse_statement_expr(
    parser: &mut Parser,
    rule: AssignRule,
    eol_before_allowed: bool,
) -> Result<AstRef> {
    if eol_before_allowed {
        parser.cursor.skip_optional_eol()?;
    }

    let mut lhs = vec![parse_lhs_item(parser)?];
    while matches!(parser.cursor.peek_kind(), TokenKind::Comma) {
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        lhs.push(parse_lhs_item(parser)?);
    }

    let compound_op = match parser.cursor.peek_kind() {
        TokenKind::Assign => Some((false, None)),
        TokenKind::Define => Some((true, None)),
        TokenKind::PlusEq => Some((false, Some(BinOp::Add))),
        TokenKind::MinusEq => Some((false, Some(BinOp::Sub))),
        TokenKind::StarEq => Some((false, Some(BinOp::Mul))),
        TokenKind::SlashEq => Some((false, Some(BinOp::Div))),
        _ => None,
    };

    let Some((is_define, compound)) = compound_op else {
        return finish_without_assign(parser, rule, lhs);
    };

    match rule {
        AssignRule::PureExpression => {
            return Err(CompilerError::syntax_or_eol(format!(
                "{}: assignment not allowed in this position",
                parser.cursor.pos()
            )))
        }
        AssignRule::AssignRequired if is_define => {
            return Err(CompilerError::syntax_or_eol(format!(
                "{}: expected assignment, found ':='",
                parser.cursor.pos()
            )))
        }
        AssignRule::DefineRequired if !is_define => {
            return Err(CompilerError::syntax_or_eol(format!(
                "{}: expected ':=', found assignment",
                parser.cursor.pos()
            )))
        }
        _ => {}
    }

    parser.cursor.bump()?;
    parser.cursor.skip_optional_eol()?;

    if let Some(op) = compound {
        if lhs.len() != 1 {
            return Err(CompilerError::syntax_or_eol(
                "compound assignment cannot target multiple values",
            ));
        }
        let item = lhs.into_iter().next().unwrap();
        let target = resolve_lhs_target(parser, item, false)?;
        let rhs = parse_or(parser)?;
        let span = target.span.merge(rhs.span);
        let combined = AstNode::binary(op, target.clone(), rhs, span);
        let target_list = AstNode::list(vec![target], span);
        let value_list = AstNode::list(vec![combined], span);
        return Ok(AstNode::assign(target_list, value_list, span));
    }

    let mut rhs = vec![parse_or(parser)?];
    while matches!(parser.cursor.peek_kind(), TokenKind::Comma) {
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        rhs.push(parse_or(parser)?);
    }

    let span = lhs[0]
        .span()
        .merge(rhs.last().expect("at least one rhs value was parsed").span);

    let targets: Vec<AstRef> = lhs
        .into_iter()
        .map(|item| resolve_lhs_target(parser, item, is_define))
        .collect::<Result<_>>()?;
    if is_define {
        bind_new_variable_types(&targets, &rhs)?;
    }
    let target_list = AstNode::list(targets, span);
    let value_list = AstNode::list(rhs, span);
    if is_define {
        Ok(AstNode::define(target_list, value_list, span))
    } else {
        Ok(AstNode::assign(target_list, value_list, span))
    }
}

fn finish_without_assign(parser: &mut Parser, rule: AssignRule, mut lhs: Vec<LhsItem>) -> Result<AstRef> {
    match rule {
        AssignRule::AssignRequired | AssignRule::DefineRequired => Err(
            CompilerError::syntax_or_eol(format!("{}: expected assignment", parser.cursor.pos())),
        ),
        AssignRule::PureExpression => {
            if lhs.len() != 1 {
                return Err(CompilerError::syntax_or_eol(
                    "comma-separated list not allowed in this position",
                ));
            }
            match lhs.remove(0) {
                LhsItem::Expr(e) => Ok(e),
                LhsItem::Name(name, pos, span) => {
                    let sym = parser.resolve_variable(&name, pos)?;
                    Ok(AstNode::id(sym, span))
                }
                LhsItem::BlackHole(_) => Err(CompilerError::syntax_or_eol(
                    "`_` cannot be used as a value",
                )),
            }
        }
        AssignRule::ValidStatement => {
            if lhs.len() != 1 {
                return Err(CompilerError::syntax_or_eol(
                    "a bare expression list is not a valid statement",
                ));
            }
            match lhs.remove(0) {
                LhsItem::Expr(node) if matches!(&*node.kind.borrow(), AstKind::FuncCall(..)) => {
                    Ok(node)
                }
                _ => Err(CompilerError::syntax_or_eol(
                    "expression statement must be an assignment, definition, or call",
                )),
            }
        }
    }
}

/// Resolves one already-classified target: `_` always discards, a bare name
/// either declares a fresh variable (`:=`) or must already be in scope
/// (`=`/compound), and anything else (a call) can never be an assignment
/// target.
fn resolve_lhs_target(parser: &mut Parser, item: LhsItem, is_define: bool) -> Result<AstRef> {
    match item {
        LhsItem::BlackHole(span) => Ok(AstNode::black_hole(span)),
        LhsItem::Name(name, pos, span) => {
            let sym = if is_define {
                parser.declare_variable(&name, pos)?
            } else {
                parser.resolve_existing_variable(&name, pos)?
            };
            Ok(AstNode::id(sym, span))
        }
        LhsItem::Expr(_) => Err(CompilerError::syntax_or_eol(
            "the left-hand side of an assignment must be an identifier or `_`",
        )),
    }
}

/// Binds every freshly declared `:=` target's type from its right-hand
/// value, per spec §7 exit code 4 ("wrong type of a new variable"). Handles
/// both the 1:1 case (`a, b := e1, e2`) and a single call spread across
/// several targets (`a, b := f()`). A target whose value type is still
/// `Unknown` (a forward-declared function) is left unbound for
/// [`crate::stmt_parser`]'s post-parse re-check to settle once every
/// signature in the program is known.
pub(crate) fn bind_new_variable_types(targets: &[AstRef], values: &[AstRef]) -> Result<()> {
    if values.len() == targets.len() {
        for (t, v) in targets.iter().zip(values.iter()) {
            let vt = infer(v).map_err(|_| {
                CompilerError::type_incompatibility("new variable's initializer has a type error")
            })?;
            bind_one(t, vt)?;
        }
        return Ok(());
    }
    if values.len() == 1 && targets.len() > 1 {
        let slot_types = resolve_multi_shape(&values[0], targets.len())?;
        for (t, vt) in targets.iter().zip(slot_types.iter()) {
            bind_one(t, *vt)?;
        }
        return Ok(());
    }
    Err(CompilerError::wrong_type_of_new_variable(
        "definition has a mismatched number of targets and values",
    ))
}

fn bind_one(target: &AstRef, value_ty: Type) -> Result<()> {
    let sym = match &*target.kind.borrow() {
        AstKind::Id(sym) => sym.clone(),
        AstKind::BlackHole => return Ok(()),
        other => unreachable!("define target can only be an Id or BlackHole, got {other:?}"),
    };
    let Sym::Variable(v) = &*sym else {
        unreachable!("a `:=` target always names a freshly declared variable");
    };
    match value_ty {
        Type::Unknown => {} // forward-declared callee; settled by the post-parse re-check
        Type::Int | Type::Float | Type::String | Type::Bool => {
            v.ty.set(value_ty);
            v.defined.set(true);
        }
        _ => {
            return Err(CompilerError::wrong_type_of_new_variable(
                "new variable's initializer has no usable value type",
            ));
        }
    }
    Ok(())
}

/// Given the sole right-hand value of a spread definition/assignment and the
/// number of targets it must fill, returns each target's type in order. The
/// value must be a direct call to a function with exactly `count` return
/// slots; a callee that's still a forward reference yields `Unknown` for
/// every slot rather than an error (settled later, once it's defined).
pub(crate) fn resolve_multi_shape(value: &AstRef, count: usize) -> Result<Vec<Type>> {
    let callee = match &*value.kind.borrow() {
        AstKind::FuncCall(callee, _) => callee.clone(),
        _ => {
            return Err(CompilerError::wrong_type_of_new_variable(
                "a multi-value definition's right-hand side must be a single function call",
            ))
        }
    };
    let sym = match &*callee.kind.borrow() {
        AstKind::Id(sym) => sym.clone(),
        _ => unreachable!("a FuncCall's callee is always an Id"),
    };
    let f = sym.as_function().ok_or_else(|| {
        CompilerError::wrong_type_of_new_variable("call target is not a function")
    })?;
    if !f.defined.get() {
        return Ok(vec![Type::Unknown; count]);
    }
    let returns = f.returns.borrow();
    if returns.len() != count {
        return Err(CompilerError::wrong_type_of_new_variable(format!(
            "function returns {} value(s), definition declares {} target(s)",
            returns.len(),
            count
        )));
    }
    Ok(returns.iter().map(|r| r.ty).collect())
}

fn parse_or(parser: &mut Parser) -> Result<AstRef> {
    let mut left = parse_and(parser)?;
    while matches!(parser.cursor.peek_kind(), TokenKind::OrOr) {
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        let right = parse_and(parser)?;
        let span = left.span.merge(right.span);
        left = AstNode::binary(BinOp::Or, left, right, span);
    }
    Ok(left)
}

fn parse_and(parser: &mut Parser) -> Result<AstRef> {
    let mut left = parse_cmp(parser)?;
    while matches!(parser.cursor.peek_kind(), TokenKind::AndAnd) {
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        let right = parse_cmp(parser)?;
        let span = left.span.merge(right.span);
        left = AstNode::binary(BinOp::And, left, right, span);
    }
    Ok(left)
}

fn parse_cmp(parser: &mut Parser) -> Result<AstRef> {
    let mut left = parse_additive(parser)?;
    loop {
        let op = match parser.cursor.peek_kind() {
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::NEq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::LtE => BinOp::LtE,
            TokenKind::GtE => BinOp::GtE,
            _ => break,
        };
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        let right = parse_additive(parser)?;
        let span = left.span.merge(right.span);
        left = AstNode::binary(op, left, right, span);
    }
    Ok(left)
}

fn parse_additive(parser: &mut Parser) -> Result<AstRef> {
    let mut left = parse_multiplicative(parser)?;
    loop {
        let op = match parser.cursor.peek_kind() {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            _ => break,
        };
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        let right = parse_multiplicative(parser)?;
        let span = left.span.merge(right.span);
        left = AstNode::binary(op, left, right, span);
    }
    Ok(left)
}

fn parse_multiplicative(parser: &mut Parser) -> Result<AstRef> {
    let mut left = parse_unary(parser)?;
    loop {
        let op = match parser.cursor.peek_kind() {
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            _ => break,
        };
        parser.cursor.bump()?;
        parser.cursor.skip_optional_eol()?;
        let right = parse_unary(parser)?;
        let span = left.span.merge(right.span);
        left = AstNode::binary(op, left, right, span);
    }
    Ok(left)
}

fn parse_unary(parser: &mut Parser) -> Result<AstRef> {
    match parser.cursor.peek_kind() {
        TokenKind::Bang => {
            let tok = parser.cursor.bump()?;
            parser.cursor.skip_optional_eol()?;
            let operand = parse_unary(parser)?;
            let span = tok.span.merge(operand.span);
            Ok(AstNode::unary(UnOp::Not, operand, span))
        }
        TokenKind::Minus => {
            let tok = parser.cursor.bump()?;
            parser.cursor.skip_optional_eol()?;
            let operand = parse_unary(parser)?;
            let span = tok.span.merge(operand.span);
            Ok(AstNode::unary(UnOp::Neg, operand, span))
        }
        TokenKind::Plus => {
            let tok = parser.cursor.bump()?;
            parser.cursor.skip_optional_eol()?;
            let operand = parse_unary(parser)?;
            let span = tok.span.merge(operand.span);
            Ok(AstNode::unary(UnOp::Pos, operand, span))
        }
        _ => parse_primary(parser),
    }
}

fn parse_primary(parser: &mut Parser) -> Result<AstRef> {
    let tok = parser.cursor.peek().clone();
    match tok.kind {
        TokenKind::Int(v) => {
            parser.cursor.bump()?;
            Ok(AstNode::const_int(v, tok.span))
        }
        TokenKind::Float(v) => {
            parser.cursor.bump()?;
            Ok(AstNode::const_float(v, tok.span))
        }
        TokenKind::Str(s) => {
            parser.cursor.bump()?;
            Ok(AstNode::const_string(Rc::from(&*s), tok.span))
        }
        TokenKind::Bool(v) => {
            parser.cursor.bump()?;
            Ok(AstNode::const_bool(v, tok.span))
        }
        TokenKind::LParen => {
            parser.cursor.bump()?;
            parser.cursor.skip_optional_eol()?;
            let inner = parse_or(parser)?;
            parser.cursor.skip_optional_eol()?;
            let close = parser.cursor.expect(TokenKind::RParen)?;
            let _ = close;
            Ok(inner)
        }
        TokenKind::Ident(name) => {
            parser.cursor.bump()?;
            if name == "_" {
                return Ok(AstNode::black_hole(tok.span));
            }
            if matches!(parser.cursor.peek_kind(), TokenKind::LParen) {
                parser.parse_call(&name, tok.span)
            } else {
                let sym = parser.resolve_variable(&name, tok.pos)?;
                Ok(AstNode::id(sym, tok.span))
            }
        }
        other => Err(CompilerError::syntax_or_eol(format!(
            "{}: unexpected token {:?} in expression",
            tok.pos, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{infer, AstKind};
    use crate::lexer::Lexer;
    use crate::types::Type;
    use ifjcode_base::{Arena, Interner};

    fn parse_pure(src: &str) -> AstRef {
        let arena: Arena<u8> = Arena::new();
        let mut interner = Interner::new();
        let lexer = Lexer::new(src, &arena);
        let mut parser = Parser::new(lexer, &mut interner, &arena).unwrap();
        parse_expr(&mut parser, false).unwrap()
    }

    #[test]
    fn precedence_multiplies_before_adds() {
        let ast = parse_pure("1 + 2 * 3");
        match &*ast.kind.borrow() {
            AstKind::Binary(BinOp::Add, _, r) => {
                assert!(matches!(&*r.kind.borrow(), AstKind::Binary(BinOp::Mul, ..)));
            }
            other => panic!("expected top-level Add, got {:?}", other),
        }
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiply() {
        let ast = parse_pure("-1 * 2");
        assert_eq!(infer(&ast).unwrap(), Type::Int);
        match &*ast.kind.borrow() {
            AstKind::Binary(BinOp::Mul, l, _) => {
                assert!(matches!(&*l.kind.borrow(), AstKind::Unary(UnOp::Neg, _)));
            }
            other => panic!("expected top-level Mul, got {:?}", other),
        }
    }

    #[test]
    fn logical_or_is_loosest() {
        let ast = parse_pure("true && false || true");
        assert!(matches!(&*ast.kind.borrow(), AstKind::Binary(BinOp::Or, ..)));
    }

    #[test]
    fn parens_override_precedence() {
        let ast = parse_pure("(1 + 2) * 3");
        match &*ast.kind.borrow() {
            AstKind::Binary(BinOp::Mul, l, _) => {
                assert!(matches!(&*l.kind.borrow(), AstKind::Binary(BinOp::Add, ..)));
            }
            other => panic!("expected top-level Mul, got {:?}", other),
        }
    }

    #[test]
    fn underscore_parses_as_black_hole() {
        let ast = parse_pure("_");
        assert!(matches!(&*ast.kind.borrow(), AstKind::BlackHole));
    }
}
