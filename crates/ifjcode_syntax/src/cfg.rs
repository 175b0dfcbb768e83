//! Control-flow graph: per-function trees of statements linking ASTs and
//! scope tables (spec §3.4, §4.C).
//!
//! The original's stateful "active function / active statement / active
//! AST" cursor protocol (spec §4.C) is collapsed here into plain owned
//! trees built directly by the recursive-descent statement parser: a block
//! is a `Vec<Rc<Statement>>` built top-down as the parser descends, and an
//! `If`/`For`'s branches are nested `Vec`s rather than a flat sibling chain
//! reached by a `successor` pointer. This is behaviourally identical —
//! same scoping order, same statement shapes — without replicating an
//! imperative cursor machine that Rust's call stack already gives for
//! free. See DESIGN.md.

use std::rc::Rc;

use ifjcode_base::Symbol as Name;

use crate::ast::AstRef;
use crate::symtable::{Sym, SymbolTable};

/// One function: its signature symbol (shared with the global table) plus
/// its body and the scope table the body's top level was parsed in.
pub struct CfgFunction {
    pub sym: Rc<Sym>,
    pub body_scope: Rc<SymbolTable>,
    pub body: Vec<Rc<Statement>>,
    /// Set when a `return` has unconditionally been emitted along the
    /// fall-through path (spec §3.4); used to decide whether an implicit
    /// return must be synthesised at the end of the function (§4.F.2/4.F.5).
    pub terminated: bool,
}

impl CfgFunction {
    pub fn name(&self) -> Name {
        self.sym.name()
    }

    pub fn as_function(&self) -> &crate::symtable::FunctionSym {
        self.sym.as_function().expect("CfgFunction.sym is always a Sym::Function")
    }
}

pub enum StmtKind {
    /// A single expression AST: `Assign`, `Define`, or a value-ignoring `FuncCall`.
    Basic(AstRef),
    If {
        cond: AstRef,
        then_scope: Rc<SymbolTable>,
        then_body: Vec<Rc<Statement>>,
        else_scope: Option<Rc<SymbolTable>>,
        else_body: Option<Vec<Rc<Statement>>>,
    },
    For {
        /// Scope introduced by the header; visible to the body but not
        /// after the loop (spec §4.E).
        header_scope: Rc<SymbolTable>,
        init: Option<AstRef>,
        cond: Option<AstRef>,
        post: Option<AstRef>,
        body_scope: Rc<SymbolTable>,
        body: Vec<Rc<Statement>>,
    },
    /// Always a `List` AST whose length is validated against the enclosing
    /// function's return arity at construction time (spec §3.4, §9).
    Return(AstRef),
}

pub struct Statement {
    pub kind: StmtKind,
}

impl Statement {
    pub fn basic(ast: AstRef) -> Rc<Statement> {
        Rc::new(Statement {
            kind: StmtKind::Basic(ast),
        })
    }

    pub fn if_stmt(
        cond: AstRef,
        then_scope: Rc<SymbolTable>,
        then_body: Vec<Rc<Statement>>,
        else_scope: Option<Rc<SymbolTable>>,
        else_body: Option<Vec<Rc<Statement>>>,
    ) -> Rc<Statement> {
        Rc::new(Statement {
            kind: StmtKind::If {
                cond,
                then_scope,
                then_body,
                else_scope,
                else_body,
            },
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn for_stmt(
        header_scope: Rc<SymbolTable>,
        init: Option<AstRef>,
        cond: Option<AstRef>,
        post: Option<AstRef>,
        body_scope: Rc<SymbolTable>,
        body: Vec<Rc<Statement>>,
    ) -> Rc<Statement> {
        Rc::new(Statement {
            kind: StmtKind::For {
                header_scope,
                init,
                cond,
                post,
                body_scope,
                body,
            },
        })
    }

    pub fn return_stmt(list: AstRef) -> Rc<Statement> {
        Rc::new(Statement {
            kind: StmtKind::Return(list),
        })
    }

    /// Whether this statement unconditionally returns along every path
    /// reaching its end — used to compute `CfgFunction::terminated` and to
    /// decide whether an `if`/`else` pair makes the enclosing block
    /// terminated too.
    pub fn always_returns(&self) -> bool {
        match &self.kind {
            StmtKind::Return(_) => true,
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                let then_terminates = block_always_returns(then_body);
                let else_terminates = else_body
                    .as_ref()
                    .is_some_and(|b| block_always_returns(b));
                then_terminates && else_terminates
            }
            StmtKind::Basic(_) | StmtKind::For { .. } => false,
        }
    }
}

pub fn block_always_returns(block: &[Rc<Statement>]) -> bool {
    block.last().is_some_and(|s| s.always_returns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstNode;
    use crate::types::Type;
    use ifjcode_base::{Interner, Span};

    #[test]
    fn return_statement_always_returns() {
        let list = AstNode::list(vec![], Span::new(0, 0));
        let stmt = Statement::return_stmt(list);
        assert!(stmt.always_returns());
    }

    #[test]
    fn basic_statement_never_returns() {
        let mut interner = Interner::new();
        let table = Rc::new(SymbolTable::new());
        let sym = table
            .add_variable(interner.intern("x"), Type::Int, false, false)
            .unwrap();
        let ast = AstNode::id(sym, Span::new(0, 0));
        let stmt = Statement::basic(ast);
        assert!(!stmt.always_returns());
    }

    #[test]
    fn if_with_returning_both_branches_always_returns() {
        let span = Span::new(0, 0);
        let then_scope = Rc::new(SymbolTable::new());
        let else_scope = Rc::new(SymbolTable::new());
        let then_body = vec![Statement::return_stmt(AstNode::list(vec![], span))];
        let else_body = vec![Statement::return_stmt(AstNode::list(vec![], span))];
        let stmt = Statement::if_stmt(
            AstNode::const_bool(true, span),
            then_scope,
            then_body,
            Some(else_scope),
            Some(else_body),
        );
        assert!(stmt.always_returns());
    }

    #[test]
    fn if_without_else_never_always_returns() {
        let span = Span::new(0, 0);
        let then_scope = Rc::new(SymbolTable::new());
        let then_body = vec![Statement::return_stmt(AstNode::list(vec![], span))];
        let stmt = Statement::if_stmt(
            AstNode::const_bool(true, span),
            then_scope,
            then_body,
            None,
            None,
        );
        assert!(!stmt.always_returns());
    }
}
