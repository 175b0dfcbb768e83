//! Constant folder (spec §4.B.3, §4.G).
//!
//! A post-order rewrite of every AST in a function body: fold each child
//! first, then ask whether *this* node — now that its children are
//! themselves folded — is a `Binary`/`Unary` over literals and can be
//! collapsed to one. Doing the recursion bottom-up reaches the "fixed
//! point across all ASTs" the spec asks for within a single walk per
//! statement: a node's own folding decision only ever looks at its
//! already-folded children, so `1 + 2 + 3` folds `(1+2)` to `3` before
//! folding `3 + 3` to `6` without a second driver loop over the program.

use std::rc::Rc;

use ifjcode_base::{CompilerError, Result};

use crate::ast::{AstKind, AstRef, BinOp, UnOp};
use crate::cfg::{CfgFunction, Statement, StmtKind};

pub fn fold_program(functions: &[CfgFunction]) -> Result<()> {
    for func in functions {
        fold_block(&func.body)?;
    }
    Ok(())
}

fn fold_block(block: &[Rc<Statement>]) -> Result<()> {
    for stmt in block {
        match &stmt.kind {
            StmtKind::Basic(ast) => fold_ast(ast)?,
            StmtKind::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                fold_ast(cond)?;
                fold_block(then_body)?;
                if let Some(eb) = else_body {
                    fold_block(eb)?;
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                if let Some(i) = init {
                    fold_ast(i)?;
                }
                if let Some(c) = cond {
                    fold_ast(c)?;
                }
                if let Some(p) = post {
                    fold_ast(p)?;
                }
                fold_block(body)?;
            }
            StmtKind::Return(list) => fold_ast(list)?,
        }
    }
    Ok(())
}

/// Folds `node` in place, recursing into its children first.
pub fn fold_ast(node: &AstRef) -> Result<()> {
    let children: Vec<AstRef> = {
        let kind = node.kind.borrow();
        match &*kind {
            AstKind::Unary(_, c) => vec![c.clone()],
            AstKind::Binary(_, l, r) => vec![l.clone(), r.clone()],
            AstKind::Assign(t, v) | AstKind::Define(t, v) => vec![t.clone(), v.clone()],
            AstKind::FuncCall(_, args) => vec![args.clone()],
            AstKind::List(items) => items.clone(),
            _ => Vec::new(),
        }
    };
    for child in &children {
        fold_ast(child)?;
    }

    let replacement = {
        let kind = node.kind.borrow();
        match &*kind {
            AstKind::Unary(op, operand) => fold_unary(*op, operand),
            AstKind::Binary(op, left, right) => fold_binary(*op, left, right)?,
            _ => None,
        }
    };
    if let Some(new_kind) = replacement {
        *node.kind.borrow_mut() = new_kind;
    }
    Ok(())
}

fn fold_unary(op: UnOp, operand: &AstRef) -> Option<AstKind> {
    match (&*operand.kind.borrow(), op) {
        (AstKind::ConstInt(v), UnOp::Neg) => Some(AstKind::ConstInt(v.wrapping_neg())),
        (AstKind::ConstFloat(v), UnOp::Neg) => Some(AstKind::ConstFloat(-v)),
        (AstKind::ConstInt(v), UnOp::Pos) => Some(AstKind::ConstInt(*v)),
        (AstKind::ConstFloat(v), UnOp::Pos) => Some(AstKind::ConstFloat(*v)),
        (AstKind::ConstBool(v), UnOp::Not) => Some(AstKind::ConstBool(!v)),
        _ => None,
    }
}

fn fold_binary(op: BinOp, left: &AstRef, right: &AstRef) -> Result<Option<AstKind>> {
    let lk = left.kind.borrow();
    let rk = right.kind.borrow();
    match (&*lk, &*rk) {
        (AstKind::ConstInt(l), AstKind::ConstInt(r)) => fold_int(op, *l, *r),
        (AstKind::ConstFloat(l), AstKind::ConstFloat(r)) => Ok(fold_float(op, *l, *r)),
        (AstKind::ConstString(l), AstKind::ConstString(r)) if op == BinOp::Add => Ok(Some(
            AstKind::ConstString(Rc::from(format!("{}{}", l, r))),
        )),
        (AstKind::ConstBool(l), AstKind::ConstBool(r)) => Ok(fold_bool(op, *l, *r)),
        _ => Ok(None),
    }
}

/// Integer arithmetic wraps on overflow (spec §3.1 "two's complement"); `Div`
/// by a literal zero is the only folding rule that can fail (spec §7 code 9).
fn fold_int(op: BinOp, l: i64, r: i64) -> Result<Option<AstKind>> {
    let folded = match op {
        BinOp::Add => AstKind::ConstInt(l.wrapping_add(r)),
        BinOp::Sub => AstKind::ConstInt(l.wrapping_sub(r)),
        BinOp::Mul => AstKind::ConstInt(l.wrapping_mul(r)),
        BinOp::Div => {
            if r == 0 {
                return Err(CompilerError::division_by_zero(
                    "division by zero in a compile-time-folded expression",
                ));
            }
            AstKind::ConstInt(l.wrapping_div(r))
        }
        BinOp::Eq => AstKind::ConstBool(l == r),
        BinOp::NEq => AstKind::ConstBool(l != r),
        BinOp::Lt => AstKind::ConstBool(l < r),
        BinOp::Gt => AstKind::ConstBool(l > r),
        BinOp::LtE => AstKind::ConstBool(l <= r),
        BinOp::GtE => AstKind::ConstBool(l >= r),
        BinOp::And | BinOp::Or => return Ok(None),
    };
    Ok(Some(folded))
}

/// Float division by a literal zero is IEEE-754-defined (±infinity or NaN),
/// not a compiler error, so unlike `fold_int` this never fails.
fn fold_float(op: BinOp, l: f64, r: f64) -> Option<AstKind> {
    Some(match op {
        BinOp::Add => AstKind::ConstFloat(l + r),
        BinOp::Sub => AstKind::ConstFloat(l - r),
        BinOp::Mul => AstKind::ConstFloat(l * r),
        BinOp::Div => AstKind::ConstFloat(l / r),
        BinOp::Eq => AstKind::ConstBool(l == r),
        BinOp::NEq => AstKind::ConstBool(l != r),
        BinOp::Lt => AstKind::ConstBool(l < r),
        BinOp::Gt => AstKind::ConstBool(l > r),
        BinOp::LtE => AstKind::ConstBool(l <= r),
        BinOp::GtE => AstKind::ConstBool(l >= r),
        BinOp::And | BinOp::Or => return None,
    })
}

fn fold_bool(op: BinOp, l: bool, r: bool) -> Option<AstKind> {
    Some(match op {
        BinOp::And => AstKind::ConstBool(l && r),
        BinOp::Or => AstKind::ConstBool(l || r),
        BinOp::Eq => AstKind::ConstBool(l == r),
        BinOp::NEq => AstKind::ConstBool(l != r),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstNode;
    use ifjcode_base::Span;

    fn span() -> Span {
        Span::new(0, 0)
    }

    fn is_const_int(node: &AstRef, expected: i64) -> bool {
        matches!(&*node.kind.borrow(), AstKind::ConstInt(v) if *v == expected)
    }

    #[test]
    fn folds_chained_addition_to_a_single_literal() {
        let a = AstNode::const_int(1, span());
        let b = AstNode::const_int(2, span());
        let c = AstNode::const_int(3, span());
        let inner = AstNode::binary(BinOp::Add, a, b, span());
        let outer = AstNode::binary(BinOp::Add, inner, c, span());
        fold_ast(&outer).unwrap();
        assert!(is_const_int(&outer, 6));
    }

    #[test]
    fn division_by_zero_literal_is_an_error() {
        let a = AstNode::const_int(1, span());
        let z = AstNode::const_int(0, span());
        let div = AstNode::binary(BinOp::Div, a, z, span());
        let err = fold_ast(&div).unwrap_err();
        assert_eq!(err.code, ifjcode_base::ExitCode::DivisionByZero);
    }

    #[test]
    fn float_division_by_zero_literal_folds_to_infinity() {
        let a = AstNode::const_float(1.0, span());
        let z = AstNode::const_float(0.0, span());
        let div = AstNode::binary(BinOp::Div, a, z, span());
        fold_ast(&div).unwrap();
        match &*div.kind.borrow() {
            AstKind::ConstFloat(v) => assert!(v.is_infinite()),
            other => panic!("expected folded float, got {:?}", other),
        }
    }

    #[test]
    fn string_concatenation_of_literals_folds() {
        let a = AstNode::const_string(Rc::from("foo"), span());
        let b = AstNode::const_string(Rc::from("bar"), span());
        let add = AstNode::binary(BinOp::Add, a, b, span());
        fold_ast(&add).unwrap();
        match &*add.kind.borrow() {
            AstKind::ConstString(s) => assert_eq!(&**s, "foobar"),
            other => panic!("expected folded string, got {:?}", other),
        }
    }

    #[test]
    fn negation_of_a_literal_folds() {
        let a = AstNode::const_int(5, span());
        let neg = AstNode::unary(UnOp::Neg, a, span());
        fold_ast(&neg).unwrap();
        assert!(is_const_int(&neg, -5));
    }

    #[test]
    fn non_literal_binary_is_left_untouched() {
        use crate::symtable::SymbolTable;
        use crate::types::Type;
        use ifjcode_base::Interner;

        let mut interner = Interner::new();
        let table = Rc::new(SymbolTable::new());
        let sym = table
            .add_variable(interner.intern("x"), Type::Int, false, false)
            .unwrap();
        let x = AstNode::id(sym, span());
        let one = AstNode::const_int(1, span());
        let add = AstNode::binary(BinOp::Add, x, one, span());
        fold_ast(&add).unwrap();
        assert!(matches!(&*add.kind.borrow(), AstKind::Binary(BinOp::Add, ..)));
    }
}
