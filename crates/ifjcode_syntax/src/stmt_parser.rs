//! Recursive-descent program/function/statement parser (spec §4.E).
//!
//! Drives the scanner through a [`TokenCursor`], calls into
//! [`crate::expr_parser`] for every expression, and builds the [`crate::cfg`]
//! tree directly as it descends — there is no separate "active function /
//! active statement" cursor object (spec §4.C): a `{ ... }` block is parsed
//! by a function that returns the `Vec<Rc<Statement>>` it built, so the Rust
//! call stack plays the role the original's re-parentable cursor played.
//! See DESIGN.md.

use std::rc::Rc;

use ifjcode_base::{Arena, CompilerError, Interner, Position, Result, Span, Symbol as Name};

use crate::builtins;
use crate::cfg::{block_always_returns, CfgFunction, Statement};
use crate::cursor::TokenCursor;
use crate::expr_parser::{self, AssignRule};
use crate::lexer::Lexer;
use crate::symtable::{Param, ScopeStack, Sym, SymbolTable};
use crate::token::TokenKind;
use crate::types::Type;

/// A fully parsed program: every function's CFG plus the shared global table
/// (spec §3.2's "process-wide global table").
pub struct Program {
    pub functions: Vec<CfgFunction>,
    pub global: Rc<SymbolTable>,
}

/// The recursive-descent parser. Holds the token cursor, the interner
/// (idents are interned as they're scanned), the string arena the lexer
/// stages string literals into, the global (function) symbol table, and the
/// parse-time scope stack (spec §3.2's "stack that walks from innermost to
/// outermost at parse time").
pub struct Parser<'a> {
    pub cursor: TokenCursor<'a>,
    interner: &'a mut Interner,
    #[allow(dead_code)]
    arena: &'a Arena<u8>,
    pub global: Rc<SymbolTable>,
    scopes: ScopeStack,
}

/// The active function's signature, consulted while parsing its body (return
/// arity/shape for `return`, nothing else — the body's own scopes are pushed
/// and popped on the parser's `scopes` stack as usual).
struct ActiveFunction {
    has_named_returns: bool,
    return_arity: usize,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>, interner: &'a mut Interner, arena: &'a Arena<u8>) -> Result<Self> {
        let cursor = TokenCursor::new(lexer)?;
        let global = Rc::new(SymbolTable::new());
        builtins::register(&global, interner);
        Ok(Self {
            cursor,
            interner,
            arena,
            global,
            scopes: ScopeStack::new(),
        })
    }

    fn intern(&mut self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Read-only accessor for the end-of-program checks, which run after
    /// parsing has finished and no longer need `&mut Interner`.
    pub fn interner(&self) -> &Interner {
        self.interner
    }

    /// Resolves a bare identifier used as a value: a local/enclosing
    /// variable if one is in scope, otherwise the (possibly not-yet-defined)
    /// global function of that name — global scope holds only functions
    /// (spec §3.2), so any name that isn't a variable is assumed to name one,
    /// creating a forward-reference stub on first use (spec §3.2 "Stub
    /// symbol").
    pub fn resolve_variable(&mut self, name: &str, _pos: Position) -> Result<Rc<Sym>> {
        let id = self.intern(name);
        if let Some(sym) = self.scopes.find(id) {
            return Ok(sym);
        }
        if let Some(sym) = self.global.find(id) {
            return Ok(sym);
        }
        self.global.add_function(id)
    }

    /// Declares a fresh variable for a `:=` target in the current (innermost)
    /// scope. Redeclaring a name already present in that exact scope is a
    /// syntax-level error (spec §3.2's "callers find first" contract);
    /// shadowing a same-named variable from an *outer* scope is fine and
    /// isn't checked here, since the outer one simply isn't in this table.
    pub fn declare_variable(&mut self, name: &str, pos: Position) -> Result<Rc<Sym>> {
        let id = self.intern(name);
        let scope = self.scopes.current();
        if scope.contains(id) {
            return Err(CompilerError::undefined_or_redefined(format!(
                "{}: `{}` is already declared in this scope",
                pos, name
            )));
        }
        scope.add_variable(id, Type::Unknown, false, false)
    }

    /// Resolves an assignment target (`=` or a compound assignment) that
    /// must already name a variable — unlike a value-position identifier,
    /// it never falls back to creating a function stub.
    pub fn resolve_existing_variable(&mut self, name: &str, pos: Position) -> Result<Rc<Sym>> {
        let id = self.intern(name);
        match self.scopes.find(id) {
            Some(sym) if sym.as_variable().is_some() => Ok(sym),
            Some(_) => Err(CompilerError::undefined_or_redefined(format!(
                "{}: `{}` is not a variable",
                pos, name
            ))),
            None => Err(CompilerError::undefined_or_redefined(format!(
                "{}: undefined variable `{}`",
                pos, name
            ))),
        }
    }

    /// Parses a call's `(args...)` suffix, the cursor sitting just past the
    /// callee identifier (and having just peeked `(`). Builds the `FuncCall`
    /// node; arity/type checking against the (possibly still-forward)
    /// callee signature happens once the whole program is parsed
    /// (`check_calls`, called from [`parse_program`]) since a forward
    /// reference's real arity isn't known yet.
    pub fn parse_call(&mut self, name: &str, callee_span: Span) -> Result<crate::ast::AstRef> {
        use crate::ast::AstNode;

        let id = self.intern(name);
        let sym = match self.global.find(id) {
            Some(sym) => sym,
            None => self.global.add_function(id)?,
        };
        let callee = AstNode::id(sym, callee_span);

        self.cursor.expect(TokenKind::LParen)?;
        self.cursor.skip_optional_eol()?;
        let args = if matches!(self.cursor.peek_kind(), TokenKind::RParen) {
            Vec::new()
        } else {
            expr_parser::parse_expr_list(self)?
        };
        self.cursor.skip_optional_eol()?;
        let close = self.cursor.expect(TokenKind::RParen)?;
        let span = callee_span.merge(close.span);
        let args_list = AstNode::list(args, span);
        Ok(AstNode::func_call(callee, args_list, span))
    }

    fn parse_type(&mut self) -> Result<Type> {
        let ty = match self.cursor.peek_kind() {
            TokenKind::KwInt => Type::Int,
            TokenKind::KwFloat64 => Type::Float,
            TokenKind::KwString => Type::String,
            TokenKind::KwBool => Type::Bool,
            other => {
                return Err(CompilerError::syntax_or_eol(format!(
                    "{}: expected a type, found {:?}",
                    self.cursor.pos(),
                    other
                )))
            }
        };
        self.cursor.bump()?;
        Ok(ty)
    }

    fn peek_is_type(&self) -> bool {
        matches!(
            self.cursor.peek_kind(),
            TokenKind::KwInt | TokenKind::KwFloat64 | TokenKind::KwString | TokenKind::KwBool
        )
    }
}

/// Parses `package <ident>` followed by zero or more `func` declarations
/// until EOF, then performs the end-of-program checks of spec §4.E: `main`
/// exists, is defined, takes no parameters, returns nothing, and every
/// other declared function has been defined. Finally re-runs `infer` on every
/// expression (resolving any forward references now that every signature is
/// known, per DESIGN NOTES' "two-phase type inference") and validates every
/// call's argument count/types against the now-final callee signature.
pub fn parse_program(source: &str, arena: &Arena<u8>, interner: &mut Interner) -> Result<Program> {
    let lexer = Lexer::new(source, arena);
    let mut parser = Parser::new(lexer, interner, arena)?;

    parser.cursor.expect(TokenKind::Package)?;
    parser.cursor.expect_ident()?;
    parser.cursor.expect_eol_required()?;

    let mut functions = Vec::new();
    while !matches!(parser.cursor.peek_kind(), TokenKind::Eof) {
        functions.push(parse_function(&mut parser)?);
        // a function body's closing `}` already consumed its own EOL.
        while matches!(parser.cursor.peek_kind(), TokenKind::Eol) {
            parser.cursor.bump()?;
        }
    }

    finish_program(&parser)?;

    for func in &functions {
        check_function_types(func)?;
    }
    for func in &functions {
        check_calls_block(&func.body)?;
    }

    Ok(Program {
        functions,
        global: parser.global.clone(),
    })
}

fn finish_program(parser: &Parser) -> Result<()> {
    let interner = parser.interner();
    let main_sym = interner
        .lookup("main")
        .and_then(|id| parser.global.find(id));

    let Some(main_sym) = main_sym else {
        return Err(CompilerError::undefined_or_redefined(
            "program has no func main()",
        ));
    };
    let main_fn = main_sym
        .as_function()
        .expect("main is always a function symbol");
    if !main_fn.defined.get() {
        return Err(CompilerError::undefined_or_redefined(
            "func main is declared but never defined",
        ));
    }
    if main_fn.params_count() != 0 || main_fn.ret_types_count() != 0 {
        return Err(CompilerError::wrong_params_or_returns(
            "func main must take no parameters and return nothing",
        ));
    }

    for sym in parser.global.iter() {
        if let Sym::Function(f) = &*sym {
            if !f.defined.get() {
                return Err(CompilerError::undefined_or_redefined(format!(
                    "function `{}` is called but never defined",
                    interner.resolve(f.name)
                )));
            }
        }
    }
    Ok(())
}

/// Re-validates every statement's types now that every function signature in
/// the program is known — the second half of the two-phase inference scheme:
/// the first pass (during parsing) leaves a forward-referenced callee's type
/// `Unknown` rather than erroring; this pass re-runs `infer` once nothing is
/// forward-referenced any more, settles any `:=` target left `Unknown` by
/// the first pass, and checks `return`'s values against the function's
/// declared return types.
fn check_function_types(func: &CfgFunction) -> Result<()> {
    let f = func
        .sym
        .as_function()
        .expect("a CfgFunction always names a function symbol");
    let return_types: Vec<Type> = f.returns.borrow().iter().map(|r| r.ty).collect();
    check_block_types(&func.body, &return_types)
}

fn check_block_types(block: &[Rc<Statement>], return_types: &[Type]) -> Result<()> {
    use crate::ast::infer;
    use crate::cfg::StmtKind;

    for stmt in block {
        match &stmt.kind {
            StmtKind::Basic(ast) => check_basic_types(ast)?,
            StmtKind::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                match infer(cond) {
                    Ok(Type::Bool) | Ok(Type::Unknown) => {}
                    _ => {
                        return Err(CompilerError::type_incompatibility(
                            "if condition must be bool",
                        ))
                    }
                }
                check_block_types(then_body, return_types)?;
                if let Some(eb) = else_body {
                    check_block_types(eb, return_types)?;
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
                    check_basic_types(i)?;
                }
                if let Some(c) = cond {
                    match infer(c) {
                        Ok(Type::Bool) | Ok(Type::Unknown) => {}
                        _ => {
                            return Err(CompilerError::type_incompatibility(
                                "for condition must be bool",
                            ))
                        }
                    }
                }
                if let Some(p) = post {
                    check_basic_types(p)?;
                }
                check_block_types(body, return_types)?;
            }
            StmtKind::Return(list) => check_return_types(list, return_types)?,
        }
    }
    Ok(())
}

fn check_basic_types(ast: &crate::ast::AstRef) -> Result<()> {
    use crate::ast::{infer, AstKind};

    enum Kind {
        Define(crate::ast::AstRef, crate::ast::AstRef),
        Assign(crate::ast::AstRef, crate::ast::AstRef),
        Call,
    }
    let kind = {
        let k = ast.kind.borrow();
        match &*k {
            AstKind::Define(t, v) => Kind::Define(t.clone(), v.clone()),
            AstKind::Assign(t, v) => Kind::Assign(t.clone(), v.clone()),
            AstKind::FuncCall(..) => Kind::Call,
            other => unreachable!("unexpected basic statement kind: {:?}", other),
        }
    };
    match kind {
        Kind::Call => {
            infer(ast).map_err(|_| CompilerError::type_incompatibility("call has a type error"))?;
            Ok(())
        }
        Kind::Define(targets, values) => {
            let t_items = targets.list_items().unwrap_or_default();
            let v_items = values.list_items().unwrap_or_default();
            expr_parser::bind_new_variable_types(&t_items, &v_items)
        }
        Kind::Assign(targets, values) => {
            infer(&values).map_err(|_| {
                CompilerError::type_incompatibility("assignment value has a type error")
            })?;
            let t_items = targets.list_items().unwrap_or_default();
            let v_items = values.list_items().unwrap_or_default();
            check_assign_shapes(&t_items, &v_items)
        }
    }
}

fn check_assign_shapes(targets: &[crate::ast::AstRef], values: &[crate::ast::AstRef]) -> Result<()> {
    use crate::ast::{infer, AstKind};

    fn target_type(t: &crate::ast::AstRef) -> Option<Type> {
        match &*t.kind.borrow() {
            AstKind::Id(sym) => sym.as_variable().map(|v| v.ty.get()),
            _ => None,
        }
    }

    fn check_pair(t: &crate::ast::AstRef, vt: Type) -> Result<()> {
        if let Some(tt) = target_type(t) {
            if vt != Type::Unknown && tt != Type::Unknown && vt != tt {
                return Err(CompilerError::type_incompatibility(format!(
                    "cannot assign a value of type {} to a variable of type {}",
                    vt, tt
                )));
            }
        }
        Ok(())
    }

    if values.len() == targets.len() {
        for (t, v) in targets.iter().zip(values.iter()) {
            let vt = infer(v).map_err(|_| {
                CompilerError::type_incompatibility("assignment value has a type error")
            })?;
            check_pair(t, vt)?;
        }
        return Ok(());
    }
    if values.len() == 1 && targets.len() > 1 {
        let slot_types = expr_parser::resolve_multi_shape(&values[0], targets.len())
            .map_err(|e| CompilerError::wrong_params_or_returns(e.message))?;
        for (t, vt) in targets.iter().zip(slot_types.iter()) {
            check_pair(t, *vt)?;
        }
        return Ok(());
    }
    Err(CompilerError::wrong_params_or_returns(
        "assignment has a mismatched number of targets and values",
    ))
}

fn check_return_types(list: &crate::ast::AstRef, declared: &[Type]) -> Result<()> {
    use crate::ast::infer;

    let items = list.list_items().unwrap_or_default();
    if items.is_empty() {
        // Either no return values are declared, or this is a bare `return`
        // inside a function with named returns (already validated at parse
        // time in `parse_return_statement`); either way there's nothing to
        // check here.
        return Ok(());
    }
    if items.len() != declared.len() {
        return Err(CompilerError::wrong_params_or_returns(format!(
            "return has {} value(s), function declares {}",
            items.len(),
            declared.len()
        )));
    }
    for (item, want) in items.iter().zip(declared.iter()) {
        let got = infer(item)
            .map_err(|_| CompilerError::type_incompatibility("return value has a type error"))?;
        if got != Type::Unknown && *want != got {
            return Err(CompilerError::wrong_params_or_returns(format!(
                "return value of type {} does not match declared type {}",
                got, want
            )));
        }
    }
    Ok(())
}

/// Walks every `FuncCall` in a block and validates its argument count
/// against the callee's final (now fully resolved) arity. `print` is
/// variadic and exempt (spec §4.E).
fn check_calls_block(block: &[Rc<Statement>]) -> Result<()> {
    use crate::ast::AstKind;
    use crate::cfg::StmtKind;

    fn walk(node: &crate::ast::AstRef) -> Result<()> {
        let children: Vec<crate::ast::AstRef> = match &*node.kind.borrow() {
            AstKind::FuncCall(callee, args) => {
                if let AstKind::Id(sym) = &*callee.kind.borrow() {
                    if let Sym::Function(f) = &**sym {
                        if !f.is_variadic.get() {
                            let given = args.list_len();
                            if given != f.params_count() {
                                return Err(CompilerError::wrong_params_or_returns(format!(
                                    "call to function with {} argument(s) expects {}",
                                    given,
                                    f.params_count()
                                )));
                            }
                        }
                    }
                }
                vec![args.clone()]
            }
            AstKind::Unary(_, c) => vec![c.clone()],
            AstKind::Binary(_, l, r) => vec![l.clone(), r.clone()],
            AstKind::Assign(t, v) | AstKind::Define(t, v) => vec![t.clone(), v.clone()],
            AstKind::List(items) => items.clone(),
            _ => Vec::new(),
        };
        for c in &children {
            walk(c)?;
        }
        Ok(())
    }

    for stmt in block {
        match &stmt.kind {
            StmtKind::Basic(ast) => walk(ast)?,
            StmtKind::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                walk(cond)?;
                check_calls_block(then_body)?;
                if let Some(eb) = else_body {
                    check_calls_block(eb)?;
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
                    walk(i)?;
                }
                if let Some(c) = cond {
                    walk(c)?;
                }
                if let Some(p) = post {
                    walk(p)?;
                }
                check_calls_block(body)?;
            }
            StmtKind::Return(list) => walk(list)?,
        }
    }
    Ok(())
}

fn parse_function(parser: &mut Parser) -> Result<CfgFunction> {
    parser.cursor.expect(TokenKind::Func)?;
    let name_pos = parser.cursor.pos();
    let name = parser.cursor.expect_ident()?;
    let id = parser.intern(&name);

    let sym = match parser.global.find(id) {
        Some(existing) => {
            let f = existing
                .as_function()
                .ok_or_else(|| CompilerError::undefined_or_redefined(format!(
                    "{}: `{}` redefines a non-function symbol",
                    name_pos, name
                )))?;
            if f.defined.get() {
                return Err(CompilerError::undefined_or_redefined(format!(
                    "{}: function `{}` is already defined",
                    name_pos, name
                )));
            }
            existing
        }
        None => parser.global.add_function(id)?,
    };

    parser.cursor.expect(TokenKind::LParen)?;
    let sig_scope = Rc::new(SymbolTable::new());
    parser.scopes.push(sig_scope.clone());
    let mut param_syms = Vec::new();
    if !matches!(parser.cursor.peek_kind(), TokenKind::RParen) {
        loop {
            let pname = parser.cursor.expect_ident()?;
            let pty = parser.parse_type()?;
            let pid = parser.intern(&pname);
            sig_scope.add_variable(pid, pty, true, false)?;
            param_syms.push(Param { name: pid, ty: pty });
            if matches!(parser.cursor.peek_kind(), TokenKind::Comma) {
                parser.cursor.bump()?;
                parser.cursor.skip_optional_eol()?;
            } else {
                break;
            }
        }
    }
    parser.cursor.expect(TokenKind::RParen)?;

    let func = sym.as_function().expect("just created/found as a function");
    *func.params.borrow_mut() = param_syms;

    parse_return_clause(parser, func, &sig_scope)?;

    parser.cursor.expect(TokenKind::LBrace)?;
    parser.cursor.expect_eol_required()?;

    let has_named_returns = func.has_named_returns();
    let return_arity = func.ret_types_count();
    let active = ActiveFunction {
        has_named_returns,
        return_arity,
    };

    let body = parse_block_body(parser, &active)?;
    parser.cursor.expect(TokenKind::RBrace)?;
    parser.cursor.expect_eol_required()?;
    parser.scopes.pop();

    func.defined.set(true);
    log::debug!("parsed function `{name}` ({} param(s), {} return(s))", func.params_count(), return_arity);
    let terminated = block_always_returns(&body);

    Ok(CfgFunction {
        sym,
        body_scope: sig_scope,
        body,
        terminated,
    })
}

/// `ret_type = type | "(" ret_params ")" | ε` (spec §4.E). A parenthesised
/// clause is named if its first entry is `ident type`, anonymous if it's a
/// bare type; the symbol table's `add_return` rejects mixing the two within
/// one function.
fn parse_return_clause(
    parser: &mut Parser,
    func: &crate::symtable::FunctionSym,
    scope: &Rc<SymbolTable>,
) -> Result<()> {
    if parser.peek_is_type() {
        let ty = parser.parse_type()?;
        func.add_return(None, ty)?;
        return Ok(());
    }
    if !matches!(parser.cursor.peek_kind(), TokenKind::LParen) {
        return Ok(()); // epsilon: no return clause
    }
    parser.cursor.bump()?;
    if matches!(parser.cursor.peek_kind(), TokenKind::RParen) {
        parser.cursor.bump()?;
        return Ok(());
    }
    loop {
        if let TokenKind::Ident(name) = parser.cursor.peek_kind().clone() {
            // `ident type` (named) vs. a bare type spelled as a qualified
            // identifier never arises in this grammar, so `Ident` here
            // always means "named return".
            parser.cursor.bump()?;
            let ty = parser.parse_type()?;
            let id = parser.intern(&name);
            func.add_return(Some(id), ty)?;
            scope.add_variable(id, ty, false, true)?;
        } else {
            let ty = parser.parse_type()?;
            func.add_return(None, ty)?;
        }
        if matches!(parser.cursor.peek_kind(), TokenKind::Comma) {
            parser.cursor.bump()?;
            parser.cursor.skip_optional_eol()?;
        } else {
            break;
        }
    }
    parser.cursor.expect(TokenKind::RParen)?;
    Ok(())
}

/// Parses statements until the enclosing `}`. The caller owns opening/
/// closing the scope this body shares (function body, `if`/`else` body);
/// `for`'s header scope is opened by [`parse_for_statement`] itself since it
/// spans more than just `{ ... }`.
fn parse_block_body(parser: &mut Parser, active: &ActiveFunction) -> Result<Vec<Rc<Statement>>> {
    let mut stmts = Vec::new();
    loop {
        while matches!(parser.cursor.peek_kind(), TokenKind::Eol) {
            parser.cursor.bump()?;
        }
        if matches!(parser.cursor.peek_kind(), TokenKind::RBrace) {
            break;
        }
        stmts.push(parse_statement(parser, active)?);
    }
    Ok(stmts)
}

fn parse_statement(parser: &mut Parser, active: &ActiveFunction) -> Result<Rc<Statement>> {
    match parser.cursor.peek_kind() {
        TokenKind::Return => parse_return_statement(parser, active),
        TokenKind::If => parse_if_statement(parser, active),
        TokenKind::For => parse_for_statement(parser, active),
        _ => {
            let ast = expr_parser::parse_statement_expr(parser, AssignRule::ValidStatement, false)?;
            parser.cursor.expect_eol_required()?;
            Ok(Statement::basic(ast))
        }
    }
}

fn parse_return_statement(parser: &mut Parser, active: &ActiveFunction) -> Result<Rc<Statement>> {
    use crate::ast::AstNode;

    let kw_span = parser.cursor.bump()?.span;
    let at_eol = matches!(parser.cursor.peek_kind(), TokenKind::Eol | TokenKind::RBrace | TokenKind::Eof);

    let list = if at_eol {
        if active.return_arity > 0 && !active.has_named_returns {
            return Err(CompilerError::wrong_params_or_returns(format!(
                "{}: bare return requires {} value(s)",
                kw_span.start, active.return_arity
            )));
        }
        AstNode::list(Vec::new(), kw_span)
    } else {
        let items = expr_parser::parse_expr_list(parser)?;
        if items.len() != active.return_arity {
            return Err(CompilerError::wrong_params_or_returns(format!(
                "return has {} value(s), function declares {}",
                items.len(),
                active.return_arity
            )));
        }
        let span = items.iter().fold(kw_span, |acc, n| acc.merge(n.span));
        AstNode::list(items, span)
    };

    parser.cursor.expect_eol_required()?;
    Ok(Statement::return_stmt(list))
}

fn parse_if_statement(parser: &mut Parser, active: &ActiveFunction) -> Result<Rc<Statement>> {
    parser.cursor.bump()?; // `if`
    let cond = expr_parser::parse_expr(parser, false)?;
    parser.cursor.expect(TokenKind::LBrace)?;
    parser.cursor.expect_eol_required()?;

    let then_scope = Rc::new(SymbolTable::new());
    parser.scopes.push(then_scope.clone());
    let then_body = parse_block_body(parser, active)?;
    parser.cursor.expect(TokenKind::RBrace)?;
    parser.scopes.pop();

    let (else_scope, else_body) = if matches!(parser.cursor.peek_kind(), TokenKind::Else) {
        parser.cursor.bump()?;
        if matches!(parser.cursor.peek_kind(), TokenKind::If) {
            // `else if ...`: the nested if becomes the sole statement of an
            // implicit else block, so it gets its own scope like any body.
            let scope = Rc::new(SymbolTable::new());
            parser.scopes.push(scope.clone());
            let nested = parse_if_statement(parser, active)?;
            parser.scopes.pop();
            (Some(scope), Some(vec![nested]))
        } else {
            parser.cursor.expect(TokenKind::LBrace)?;
            parser.cursor.expect_eol_required()?;
            let scope = Rc::new(SymbolTable::new());
            parser.scopes.push(scope.clone());
            let body = parse_block_body(parser, active)?;
            parser.cursor.expect(TokenKind::RBrace)?;
            parser.scopes.pop();
            (Some(scope), Some(body))
        }
    } else {
        (None, None)
    };

    parser.cursor.expect_eol_required()?;

    let cond_ty = crate::ast::infer(&cond);
    if matches!(cond_ty, Ok(Type::Bool) | Ok(Type::Unknown)) {
        // ok: Unknown means a not-yet-defined forward function reference in
        // the condition, resolved on the second inference pass.
    } else {
        return Err(CompilerError::type_incompatibility(
            "if condition must be bool",
        ));
    }

    Ok(Statement::if_stmt(cond, then_scope, then_body, else_scope, else_body))
}

fn parse_for_statement(parser: &mut Parser, active: &ActiveFunction) -> Result<Rc<Statement>> {
    parser.cursor.bump()?; // `for`

    let header_scope = Rc::new(SymbolTable::new());
    parser.scopes.push(header_scope.clone());

    let init = if matches!(parser.cursor.peek_kind(), TokenKind::Semi) {
        None
    } else {
        let ast = expr_parser::parse_statement_expr(parser, AssignRule::DefineRequired, false)?;
        Some(ast)
    };
    parser.cursor.expect(TokenKind::Semi)?;

    let cond = if matches!(parser.cursor.peek_kind(), TokenKind::Semi) {
        None
    } else {
        let ast = expr_parser::parse_expr(parser, false)?;
        match crate::ast::infer(&ast) {
            Ok(Type::Bool) | Ok(Type::Unknown) => {}
            _ => {
                return Err(CompilerError::type_incompatibility(
                    "for condition must be bool",
                ))
            }
        }
        Some(ast)
    };
    parser.cursor.expect(TokenKind::Semi)?;

    let post = if matches!(parser.cursor.peek_kind(), TokenKind::LBrace) {
        None
    } else {
        let ast = expr_parser::parse_statement_expr(parser, AssignRule::AssignRequired, false)?;
        Some(ast)
    };

    parser.cursor.expect(TokenKind::LBrace)?;
    parser.cursor.expect_eol_required()?;

    let body_scope = Rc::new(SymbolTable::new());
    parser.scopes.push(body_scope.clone());
    let body = parse_block_body(parser, active)?;
    parser.cursor.expect(TokenKind::RBrace)?;
    parser.scopes.pop(); // body_scope
    parser.scopes.pop(); // header_scope
    parser.cursor.expect_eol_required()?;

    Ok(Statement::for_stmt(header_scope, init, cond, post, body_scope, body))
}
