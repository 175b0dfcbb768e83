//! Typed expression trees (spec §3.3, §4.B).
//!
//! A node's `kind` sits behind a `RefCell` so the constant folder (§4.B.3)
//! can rewrite a node in place — replacing e.g. `Binary(Add, ConstInt, ConstInt)`
//! with `ConstInt` — without needing every parent to rebuild its child
//! pointer. `ty` is a bare `Cell<Type>` mirroring the "inherited type" field
//! and the monotone `Unknown -> concrete -> UnknownUninferrable` transition
//! of §3.3 invariant 4.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ifjcode_base::Span;

use crate::symtable::Sym;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Eq,
    NEq,
    Lt,
    Gt,
    LtE,
    GtE,
}

impl BinOp {
    /// The half-open range `[Logic .. Control)` of spec §3.3: everything
    /// that isn't plain arithmetic is a logic/comparison op, expressed here
    /// as an explicit predicate rather than a discriminant range check.
    pub fn is_logic(self) -> bool {
        !matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }

    pub fn is_comparator(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NEq | BinOp::Lt | BinOp::Gt | BinOp::LtE | BinOp::GtE
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
    /// Unary `+`: a syntactic no-op that still requires a numeric operand.
    /// The original grammar gives it its own terminal (spec §4.D's
    /// `INDEX_UNARY_PLUS`) but no dedicated action kind; this mirrors that
    /// by type-checking it like `Neg` while the emitter lowers it as a
    /// pass-through (§4.F.3).
    Pos,
}

pub type AstRef = Rc<AstNode>;

#[derive(Debug)]
pub enum AstKind {
    Id(Rc<Sym>),
    ConstInt(i64),
    ConstFloat(f64),
    ConstString(Rc<str>),
    ConstBool(bool),
    /// The discard target `_` on the left of an assignment (spec §3.1 `BlackHole`).
    BlackHole,
    Unary(UnOp, AstRef),
    Binary(BinOp, AstRef, AstRef),
    /// `left` holds the target list, `right` the value list — both always
    /// `List` nodes, even for the common single-target/single-value case,
    /// so the statement parser and emitter share one shape for `x = e` and
    /// `a, b = e1, e2` (a deliberate simplification over the fixed `left`/
    /// `right` pointer-pair of the original; see DESIGN.md).
    Assign(AstRef, AstRef),
    Define(AstRef, AstRef),
    /// `left` is always an `Id` naming the callee; `right` is a `List` of
    /// arguments (possibly empty).
    FuncCall(AstRef, AstRef),
    List(Vec<AstRef>),
}

#[derive(Debug)]
pub struct AstNode {
    pub kind: RefCell<AstKind>,
    pub ty: Cell<Type>,
    pub span: Span,
}

impl AstNode {
    fn new(kind: AstKind, span: Span) -> AstRef {
        Rc::new(AstNode {
            kind: RefCell::new(kind),
            ty: Cell::new(Type::Unknown),
            span,
        })
    }

    pub fn id(sym: Rc<Sym>, span: Span) -> AstRef {
        sym.mark_used();
        Self::new(AstKind::Id(sym), span)
    }

    pub fn const_int(v: i64, span: Span) -> AstRef {
        Self::new(AstKind::ConstInt(v), span)
    }

    pub fn const_float(v: f64, span: Span) -> AstRef {
        Self::new(AstKind::ConstFloat(v), span)
    }

    pub fn const_string(v: Rc<str>, span: Span) -> AstRef {
        Self::new(AstKind::ConstString(v), span)
    }

    pub fn const_bool(v: bool, span: Span) -> AstRef {
        Self::new(AstKind::ConstBool(v), span)
    }

    pub fn black_hole(span: Span) -> AstRef {
        Self::new(AstKind::BlackHole, span)
    }

    pub fn unary(op: UnOp, operand: AstRef, span: Span) -> AstRef {
        Self::new(AstKind::Unary(op, operand), span)
    }

    pub fn binary(op: BinOp, left: AstRef, right: AstRef, span: Span) -> AstRef {
        Self::new(AstKind::Binary(op, left, right), span)
    }

    pub fn assign(target: AstRef, value: AstRef, span: Span) -> AstRef {
        Self::new(AstKind::Assign(target, value), span)
    }

    pub fn define(target: AstRef, value: AstRef, span: Span) -> AstRef {
        Self::new(AstKind::Define(target, value), span)
    }

    pub fn func_call(callee: AstRef, args: AstRef, span: Span) -> AstRef {
        Self::new(AstKind::FuncCall(callee, args), span)
    }

    /// Builds a fixed-capacity-by-construction list node; spec §3.3's
    /// "next-write-index cursor" is just `Vec::push` here since the parser
    /// always knows every element up front.
    pub fn list(items: Vec<AstRef>, span: Span) -> AstRef {
        Self::new(AstKind::List(items), span)
    }

    pub fn is_list(&self) -> bool {
        matches!(&*self.kind.borrow(), AstKind::List(_))
    }

    /// Returns a clone of the list's items, or `None` if this node isn't a `List`.
    pub fn list_items(&self) -> Option<Vec<AstRef>> {
        match &*self.kind.borrow() {
            AstKind::List(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn list_len(&self) -> usize {
        match &*self.kind.borrow() {
            AstKind::List(v) => v.len(),
            _ => 1,
        }
    }
}

/// `infer` per spec §4.B.2: idempotent, monotone, post-order over children.
///
/// Returns `Ok(ty)` with `ty` possibly `Unknown` (a not-yet-defined forward
/// function reference) — that is success, not failure. Failure is signalled
/// by leaving the node `UnknownUninferrable` and returning `Err`; the caller
/// (statement parser) is responsible for turning that into the right
/// `CompilerError` variant/exit code for the syntactic context.
pub fn infer(node: &AstRef) -> Result<Type, ()> {
    let cached = node.ty.get();
    if cached.is_concrete() {
        return Ok(cached);
    }
    if cached == Type::UnknownUninferrable {
        return Err(());
    }

    let result = infer_uncached(node);
    match result {
        Ok(ty) => {
            node.ty.set(ty);
            Ok(ty)
        }
        Err(()) => {
            node.ty.set(Type::UnknownUninferrable);
            Err(())
        }
    }
}

fn infer_uncached(node: &AstRef) -> Result<Type, ()> {
    let kind_ref = node.kind.borrow();
    match &*kind_ref {
        AstKind::Id(sym) => match &**sym {
            Sym::Variable(v) => Ok(v.ty.get()),
            Sym::Function(f) => {
                if !f.defined.get() {
                    Ok(Type::Unknown)
                } else {
                    Ok(f.result_type())
                }
            }
        },
        AstKind::ConstInt(_) => Ok(Type::Int),
        AstKind::ConstFloat(_) => Ok(Type::Float),
        AstKind::ConstString(_) => Ok(Type::String),
        AstKind::ConstBool(_) => Ok(Type::Bool),
        AstKind::BlackHole => Ok(Type::BlackHole),
        AstKind::Unary(op, operand) => {
            let operand = operand.clone();
            drop(kind_ref);
            let t = infer(&operand)?;
            match op {
                UnOp::Neg | UnOp::Pos => {
                    if t == Type::Unknown || t.is_numeric() {
                        Ok(t)
                    } else {
                        Err(())
                    }
                }
                UnOp::Not => {
                    if t == Type::Unknown || t == Type::Bool {
                        Ok(Type::Bool)
                    } else {
                        Err(())
                    }
                }
            }
        }
        AstKind::Binary(op, left, right) => {
            let (op, left, right) = (*op, left.clone(), right.clone());
            drop(kind_ref);
            let lt = infer(&left)?;
            let rt = infer(&right)?;
            infer_binary(op, lt, rt)
        }
        AstKind::Assign(target, value) => {
            let (target, value) = (target.clone(), value.clone());
            drop(kind_ref);
            infer(&target)?;
            infer(&value)?;
            Ok(Type::Nil)
        }
        AstKind::Define(target, value) => {
            let (target, value) = (target.clone(), value.clone());
            drop(kind_ref);
            infer(&target)?;
            infer(&value)?;
            Ok(Type::Nil)
        }
        AstKind::FuncCall(callee, _args) => {
            let callee = callee.clone();
            drop(kind_ref);
            infer(&callee)
        }
        AstKind::List(items) => {
            let items: Vec<AstRef> = items.clone();
            drop(kind_ref);
            match items.len() {
                0 => Ok(Type::Nil),
                1 => infer(&items[0]),
                _ => {
                    for item in &items {
                        infer(item)?;
                    }
                    Ok(Type::Multiple)
                }
            }
        }
    }
}

fn infer_binary(op: BinOp, lt: Type, rt: Type) -> Result<Type, ()> {
    if op.is_logic() && !op.is_comparator() {
        // And / Or
        if (lt == Type::Unknown || lt == Type::Bool) && (rt == Type::Unknown || rt == Type::Bool) {
            Ok(Type::Bool)
        } else {
            Err(())
        }
    } else if op.is_comparator() {
        if lt == Type::Unknown || rt == Type::Unknown {
            Ok(Type::Bool)
        } else if lt == rt {
            Ok(Type::Bool)
        } else {
            Err(())
        }
    } else {
        // Arithmetic: Add/Sub/Mul/Div. String is valid only for Add (spec §3.3 invariant 1).
        if lt == Type::Unknown && rt == Type::Unknown {
            return Ok(Type::Unknown);
        }
        if lt == Type::Unknown {
            return arithmetic_result(op, rt);
        }
        if rt == Type::Unknown {
            return arithmetic_result(op, lt);
        }
        if lt != rt {
            return Err(());
        }
        arithmetic_result(op, lt)
    }
}

fn arithmetic_result(op: BinOp, t: Type) -> Result<Type, ()> {
    match t {
        Type::Int | Type::Float => Ok(t),
        Type::String if op == BinOp::Add => Ok(t),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symtable::SymbolTable;
    use ifjcode_base::{Interner, Span};

    fn dummy_span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn literal_types_are_static() {
        assert_eq!(infer(&AstNode::const_int(1, dummy_span())).unwrap(), Type::Int);
        assert_eq!(
            infer(&AstNode::const_float(1.0, dummy_span())).unwrap(),
            Type::Float
        );
        assert_eq!(
            infer(&AstNode::const_bool(true, dummy_span())).unwrap(),
            Type::Bool
        );
    }

    #[test]
    fn add_of_matching_ints_is_int() {
        let l = AstNode::const_int(1, dummy_span());
        let r = AstNode::const_int(2, dummy_span());
        let add = AstNode::binary(BinOp::Add, l, r, dummy_span());
        assert_eq!(infer(&add).unwrap(), Type::Int);
    }

    #[test]
    fn add_of_mismatched_types_is_uninferrable() {
        let l = AstNode::const_int(1, dummy_span());
        let r = AstNode::const_string(Rc::from("x"), dummy_span());
        let add = AstNode::binary(BinOp::Add, l, r, dummy_span());
        assert!(infer(&add).is_err());
        assert_eq!(add.ty.get(), Type::UnknownUninferrable);
    }

    #[test]
    fn infer_is_idempotent_once_concrete() {
        let node = AstNode::const_int(5, dummy_span());
        assert_eq!(infer(&node).unwrap(), Type::Int);
        assert_eq!(infer(&node).unwrap(), Type::Int);
    }

    #[test]
    fn id_on_undefined_function_is_unknown_not_error() {
        let mut interner = Interner::new();
        let table = SymbolTable::new();
        let f = table
            .add_function(interner.intern("f"))
            .unwrap();
        let id = AstNode::id(f, dummy_span());
        assert_eq!(infer(&id).unwrap(), Type::Unknown);
    }

    #[test]
    fn list_of_zero_is_nil_one_is_element_many_is_multiple() {
        let empty = AstNode::list(vec![], dummy_span());
        assert_eq!(infer(&empty).unwrap(), Type::Nil);

        let one = AstNode::list(vec![AstNode::const_int(1, dummy_span())], dummy_span());
        assert_eq!(infer(&one).unwrap(), Type::Int);

        let many = AstNode::list(
            vec![
                AstNode::const_int(1, dummy_span()),
                AstNode::const_int(2, dummy_span()),
            ],
            dummy_span(),
        );
        assert_eq!(infer(&many).unwrap(), Type::Multiple);
    }

    #[test]
    fn logical_and_requires_bool_operands() {
        let t = AstNode::const_bool(true, dummy_span());
        let f = AstNode::const_bool(false, dummy_span());
        let and = AstNode::binary(BinOp::And, t, f, dummy_span());
        assert_eq!(infer(&and).unwrap(), Type::Bool);

        let i = AstNode::const_int(1, dummy_span());
        let bad = AstNode::binary(BinOp::And, i, AstNode::const_bool(true, dummy_span()), dummy_span());
        assert!(infer(&bad).is_err());
    }
}
