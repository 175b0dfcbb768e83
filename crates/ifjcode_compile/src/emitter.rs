//! IR emitter (spec §4.F): lowers a typed, folded [`Program`] into
//! IFJcode20 stack-machine text.
//!
//! The target machine has a global frame `GF`, a per-call local frame `LF`,
//! and a per-call-site temporary frame `TF` staged before `PUSHFRAME`/`CALL`.
//! Every user variable lives in `LF`, renamed `LF@$<scope_prefix>_<name>`
//! (§4.F.1) so that two same-named variables in different scopes never
//! collide in the emitted namespace's flat identifier space. A handful of
//! `GF@$...` registers (`$cond_res`, `$r1`, `$r2`, conditionally `$r3` and
//! `$print`) are the emitter's own scratch space, declared once in the
//! program preamble.
//!
//! This emitter always lowers a boolean subexpression through the general
//! stack-and-compare path (push both operands, `EQS`/`LTS`/`GTS`, pop into
//! `$cond_res`, `JUMPIFEQ`) rather than special-casing the "two direct
//! operands" fast path spec §4.F.4 describes as an optimisation — one
//! uniform jumping-lowering rule instead of two, at the cost of a few extra
//! instructions on the common case. See DESIGN.md.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use ifjcode_base::{Interner, Result, Span, Symbol as Name};
use ifjcode_syntax::ast::{AstKind, AstNode, AstRef, BinOp, UnOp};
use ifjcode_syntax::builtins;
use ifjcode_syntax::cfg::{CfgFunction, Statement, StmtKind};
use ifjcode_syntax::stmt_parser::Program;
use ifjcode_syntax::symtable::{Sym, SymbolTable};
use ifjcode_syntax::types::Type;

/// Registers whose `DEFVAR` is only worth emitting if something actually
/// used them (spec §6: "(conditionally) `GF@$print`, `GF@$r3`"). `substr`'s
/// intrinsic needs more scratch than the two pinned registers, so its extra
/// names follow the same conditional-declaration idea.
#[derive(Default)]
struct UsedRegisters {
    r3: Cell<bool>,
    print: Cell<bool>,
    blackhole: Cell<bool>,
    substr_scratch: Cell<bool>,
}

/// Per-function lowering context: everything statement/expression lowering
/// needs besides the emitter's own global state.
struct FnCtx {
    fname: String,
    is_main: bool,
    /// True when `main` must be emitted as an ordinary function (its
    /// `reference_counter > 1`, i.e. something calls it as a first-class
    /// symbol beyond the implicit program entry) rather than inlining
    /// `EXIT int@0` as its return path (spec §4.F.5, pinned in SPEC_FULL.md §2).
    main_is_regular: bool,
    /// Id nodes for each named-return variable, in declared order — built
    /// once per function so a bare `return` can push them without
    /// re-resolving the scope on every `Return` statement.
    named_return_asts: Vec<AstRef>,
}

pub struct Emitter<'a> {
    out: String,
    scope_counter: Cell<u32>,
    label_counter: Cell<u32>,
    interner: &'a Interner,
    functions_by_name: HashMap<Name, &'a CfgFunction>,
    used: UsedRegisters,
}

/// Lowers a fully parsed and folded program to IFJcode20 text.
pub fn emit_program(program: &Program, interner: &'_ Interner) -> Result<String> {
    let functions_by_name: HashMap<Name, &CfgFunction> =
        program.functions.iter().map(|f| (f.name(), f)).collect();

    let main_name = interner
        .lookup("main")
        .expect("finish_program validated that main exists before emission");
    let main_cfg = functions_by_name
        .get(&main_name)
        .expect("main must be among the program's parsed functions");
    let main_is_regular = main_cfg.as_function().reference_counter.get() > 1;

    let mut emitter = Emitter {
        out: String::new(),
        scope_counter: Cell::new(0),
        label_counter: Cell::new(0),
        interner,
        functions_by_name,
        used: UsedRegisters::default(),
    };

    for func in &program.functions {
        emitter.lower_function(func, main_is_regular);
    }

    Ok(emitter.finish(main_is_regular))
}

impl<'a> Emitter<'a> {
    fn emit(&mut self, line: String) {
        self.out.push_str(&line);
        self.out.push('\n');
    }

    fn emit_label(&mut self, label: &str) {
        self.emit(format!("LABEL {}", label));
    }

    fn fresh_label(&self, ctx: &FnCtx) -> String {
        let n = self.label_counter.get();
        self.label_counter.set(n + 1);
        format!("${}$L{}", ctx.fname, n)
    }

    fn finish(self, main_is_regular: bool) -> String {
        let mut header = String::new();
        header.push_str(".IFJcode20\n");
        header.push_str("DEFVAR GF@$cond_res\n");
        header.push_str("DEFVAR GF@$r1\n");
        header.push_str("DEFVAR GF@$r2\n");
        if self.used.r3.get() {
            header.push_str("DEFVAR GF@$r3\n");
        }
        if self.used.print.get() {
            header.push_str("DEFVAR GF@$print\n");
        }
        if self.used.blackhole.get() {
            header.push_str("DEFVAR GF@$blackhole\n");
        }
        if self.used.substr_scratch.get() {
            for reg in ["$substr_len", "$substr_end", "$substr_idx", "$substr_result", "$substr_ch"] {
                header.push_str(&format!("DEFVAR GF@{}\n", reg));
            }
        }
        if main_is_regular {
            header.push_str("CREATEFRAME\n");
            header.push_str("CALL main\n");
            header.push_str("EXIT int@0\n");
        } else {
            header.push_str("JUMP main\n");
        }
        header.push_str(&self.out);
        header
    }

    // ---- function / DEFVAR prepass (§4.F.1, §4.F.7) --------------------

    fn lower_function(&mut self, func: &CfgFunction, main_is_regular: bool) {
        let fname = self.interner.resolve(func.name()).to_string();
        self.emit_label(&fname);
        self.emit_defvars(func);

        let has_named = func.as_function().has_named_returns();
        let named_return_asts = if has_named {
            func.as_function()
                .returns
                .borrow()
                .iter()
                .map(|r| {
                    let id = r.name.expect("named-return slot always carries a name");
                    let sym = func
                        .body_scope
                        .find(id)
                        .expect("named return value is registered as a variable in body_scope");
                    AstNode::id(sym, Span::default())
                })
                .collect()
        } else {
            Vec::new()
        };

        let is_main = fname == "main";
        let ctx = FnCtx {
            fname,
            is_main,
            main_is_regular: is_main && main_is_regular,
            named_return_asts,
        };

        self.lower_block(&func.body, &ctx);

        if !func.terminated {
            self.emit_implicit_exit(&ctx);
        }
    }

    fn emit_implicit_exit(&mut self, ctx: &FnCtx) {
        if ctx.is_main && !ctx.main_is_regular {
            self.emit("EXIT int@0".to_string());
        } else {
            self.emit("POPFRAME".to_string());
            self.emit("RETURN".to_string());
        }
    }

    fn emit_defvars(&mut self, func: &CfgFunction) {
        self.emit_scope_defvars(&func.body_scope);
        self.emit_defvars_block(&func.body);
    }

    fn emit_scope_defvars(&mut self, scope: &Rc<SymbolTable>) {
        let prefix = scope.prefix(&self.scope_counter);
        for sym in scope.iter() {
            if let Sym::Variable(v) = &*sym {
                if v.is_argument || v.reference_counter.get() == 0 {
                    continue;
                }
                let operand = format!("LF@${}_{}", prefix, self.interner.resolve(v.name));
                self.emit(format!("DEFVAR {}", operand));
                if v.is_return_value {
                    let default = default_literal(v.ty.get());
                    self.emit(format!("MOVE {} {}", operand, default));
                }
            }
        }
    }

    fn emit_defvars_block(&mut self, block: &[Rc<Statement>]) {
        for stmt in block {
            match &stmt.kind {
                StmtKind::If {
                    then_scope,
                    then_body,
                    else_scope,
                    else_body,
                    ..
                } => {
                    self.emit_scope_defvars(then_scope);
                    self.emit_defvars_block(then_body);
                    if let Some(es) = else_scope {
                        self.emit_scope_defvars(es);
                    }
                    if let Some(eb) = else_body {
                        self.emit_defvars_block(eb);
                    }
                }
                StmtKind::For {
                    header_scope,
                    body_scope,
                    body,
                    ..
                } => {
                    self.emit_scope_defvars(header_scope);
                    self.emit_scope_defvars(body_scope);
                    self.emit_defvars_block(body);
                }
                StmtKind::Basic(_) | StmtKind::Return(_) => {}
            }
        }
    }

    // ---- statement lowering (§4.F.2) ------------------------------------

    fn lower_block(&mut self, block: &[Rc<Statement>], ctx: &FnCtx) {
        for stmt in block {
            match &stmt.kind {
                StmtKind::Basic(ast) => self.lower_basic(ast, ctx),
                StmtKind::If {
                    cond,
                    then_body,
                    else_body,
                    ..
                } => self.lower_if(cond, then_body, else_body.as_deref(), ctx),
                StmtKind::For {
                    init,
                    cond,
                    post,
                    body,
                    ..
                } => self.lower_for(init.as_ref(), cond.as_ref(), post.as_ref(), body, ctx),
                StmtKind::Return(list) => self.lower_return(list, ctx),
            }
        }
    }

    fn lower_basic(&mut self, ast: &AstRef, ctx: &FnCtx) {
        enum Dispatch {
            Assign(AstRef, AstRef),
            Call(AstRef, AstRef),
        }
        let dispatch = {
            let kind = ast.kind.borrow();
            match &*kind {
                AstKind::Assign(t, v) | AstKind::Define(t, v) => Dispatch::Assign(t.clone(), v.clone()),
                AstKind::FuncCall(callee, args) => Dispatch::Call(callee.clone(), args.clone()),
                other => unreachable!("unexpected basic-statement AST kind: {:?}", other),
            }
        };
        match dispatch {
            Dispatch::Assign(t, v) => self.lower_assign(&t, &v, ctx),
            Dispatch::Call(callee, args) => {
                self.lower_call_push(&callee, &args, ctx);
                // A statement-position call ignores its result(s); drop
                // whatever it left on the stack.
                self.emit("CLEARS".to_string());
            }
        }
    }

    fn lower_if(
        &mut self,
        cond: &AstRef,
        then_body: &[Rc<Statement>],
        else_body: Option<&[Rc<Statement>]>,
        ctx: &FnCtx,
    ) {
        let then_l = self.fresh_label(ctx);
        let else_l = self.fresh_label(ctx);
        self.lower_jump(cond, &then_l, &else_l, ctx);
        self.emit_label(&then_l);
        self.lower_block(then_body, ctx);
        if let Some(eb) = else_body {
            let end_l = self.fresh_label(ctx);
            self.emit(format!("JUMP {}", end_l));
            self.emit_label(&else_l);
            self.lower_block(eb, ctx);
            self.emit_label(&end_l);
        } else {
            self.emit_label(&else_l);
        }
    }

    fn lower_for(
        &mut self,
        init: Option<&AstRef>,
        cond: Option<&AstRef>,
        post: Option<&AstRef>,
        body: &[Rc<Statement>],
        ctx: &FnCtx,
    ) {
        if let Some(i) = init {
            self.lower_basic(i, ctx);
        }
        let begin_l = self.fresh_label(ctx);
        let end_l = self.fresh_label(ctx);
        self.emit_label(&begin_l);
        if let Some(c) = cond {
            let body_l = self.fresh_label(ctx);
            self.lower_jump(c, &body_l, &end_l, ctx);
            self.emit_label(&body_l);
        }
        self.lower_block(body, ctx);
        if let Some(p) = post {
            self.lower_basic(p, ctx);
        }
        self.emit(format!("JUMP {}", begin_l));
        self.emit_label(&end_l);
    }

    /// §4.F.5: named returns push their slots' current values in declared
    /// order on a bare `return`; anonymous (or an explicit list on a named
    /// function, per SPEC_FULL.md §2) push in reverse declared order so the
    /// caller's natural-order `POPS` sequence lines values up correctly —
    /// one rule for both shapes (see DESIGN.md's Open Question note).
    fn lower_return(&mut self, list: &AstRef, ctx: &FnCtx) {
        if ctx.is_main && !ctx.main_is_regular {
            self.emit("EXIT int@0".to_string());
            return;
        }
        let items = list.list_items().unwrap_or_default();
        let exprs: Vec<AstRef> = if items.is_empty() && !ctx.named_return_asts.is_empty() {
            ctx.named_return_asts.clone()
        } else {
            items
        };
        for expr in exprs.iter().rev() {
            self.lower_expr_push(expr, ctx);
        }
        self.emit("POPFRAME".to_string());
        self.emit("RETURN".to_string());
    }

    // ---- assignment (§4.F.2 "Basic") ------------------------------------

    fn lower_assign(&mut self, targets: &AstRef, values: &AstRef, ctx: &FnCtx) {
        let t_items = targets.list_items().unwrap_or_default();
        let v_items = values.list_items().unwrap_or_default();

        if t_items.len() == 1 && v_items.len() == 1 {
            let value = &v_items[0];
            let target = &t_items[0];
            if value.ty.get() == Type::Bool && is_jump_lowered_bool(value) {
                match self.target_operand(target) {
                    Some(var) => self.lower_bool_into_var(value, &var, ctx),
                    None => {
                        self.lower_bool_value(value, ctx);
                        self.used.blackhole.set(true);
                        self.emit("POPS GF@$blackhole".to_string());
                    }
                }
                return;
            }
            self.lower_expr_push(value, ctx);
            self.pop_into_target(target);
            return;
        }

        if v_items.len() == 1 && t_items.len() > 1 {
            // A single multi-return call spread across several targets.
            let callee_args = match &*v_items[0].kind.borrow() {
                AstKind::FuncCall(callee, args) => Some((callee.clone(), args.clone())),
                _ => None,
            };
            match callee_args {
                Some((callee, args)) => self.lower_call_push(&callee, &args, ctx),
                None => self.lower_expr_push(&v_items[0], ctx),
            }
            // Our return/builtin convention always leaves the first-declared
            // result on top, so popping in declared order lines them up.
            for t in &t_items {
                self.pop_into_target(t);
            }
            return;
        }

        debug_assert_eq!(
            t_items.len(),
            v_items.len(),
            "parallel assignment requires matching target/value counts"
        );
        for v in &v_items {
            self.lower_expr_push(v, ctx);
        }
        for t in t_items.iter().rev() {
            self.pop_into_target(t);
        }
    }

    fn pop_into_target(&mut self, target: &AstRef) {
        match self.target_operand(target) {
            Some(var) => self.emit(format!("POPS {}", var)),
            None => {
                self.used.blackhole.set(true);
                self.emit("POPS GF@$blackhole".to_string());
            }
        }
    }

    fn target_operand(&self, target: &AstRef) -> Option<String> {
        match &*target.kind.borrow() {
            AstKind::Id(sym) => Some(self.operand_for_symbol(sym)),
            AstKind::BlackHole => None,
            other => unreachable!("unexpected assignment target kind: {:?}", other),
        }
    }

    fn operand_for_symbol(&self, sym: &Rc<Sym>) -> String {
        match &**sym {
            Sym::Variable(v) => {
                let owner = v
                    .owner
                    .borrow()
                    .clone()
                    .expect("every variable symbol records its owning scope");
                let prefix = owner.prefix(&self.scope_counter);
                format!("LF@${}_{}", prefix, self.interner.resolve(v.name))
            }
            Sym::Function(_) => unreachable!("a function symbol cannot be a variable operand"),
        }
    }

    // ---- non-logical expression lowering (§4.F.3) -----------------------

    fn direct_operand(&self, ast: &AstRef) -> Option<String> {
        if let Some(lit) = literal_operand(ast) {
            return Some(lit);
        }
        if let AstKind::Id(sym) = &*ast.kind.borrow() {
            return Some(self.operand_for_symbol(sym));
        }
        None
    }

    /// Returns an operand usable immediately in an instruction: the direct
    /// literal/variable form if possible, otherwise evaluates `ast` and
    /// pops it into `scratch`.
    fn direct_or_materialize(&mut self, ast: &AstRef, ctx: &FnCtx, scratch: &str) -> String {
        match self.direct_operand(ast) {
            Some(op) => op,
            None => {
                self.lower_expr_push(ast, ctx);
                self.emit(format!("POPS {}", scratch));
                scratch.to_string()
            }
        }
    }

    fn lower_expr_push(&mut self, ast: &AstRef, ctx: &FnCtx) {
        if let Some(op) = self.direct_operand(ast) {
            self.emit(format!("PUSHS {}", op));
            return;
        }
        if is_jump_lowered_bool(ast) {
            self.lower_bool_value(ast, ctx);
            return;
        }
        enum Dispatch {
            Unary(UnOp, AstRef),
            Binary(BinOp, AstRef, AstRef, Type),
            Call(AstRef, AstRef),
        }
        let dispatch = {
            let kind = ast.kind.borrow();
            match &*kind {
                AstKind::Unary(op, operand) => Dispatch::Unary(*op, operand.clone()),
                AstKind::Binary(op, l, r) => Dispatch::Binary(*op, l.clone(), r.clone(), l.ty.get()),
                AstKind::FuncCall(callee, args) => Dispatch::Call(callee.clone(), args.clone()),
                other => unreachable!("unexpected expression kind in value position: {:?}", other),
            }
        };
        match dispatch {
            Dispatch::Unary(op, operand) => self.lower_unary_push(op, &operand, ctx),
            Dispatch::Binary(op, l, r, ty) => {
                self.lower_expr_push(&l, ctx);
                self.lower_expr_push(&r, ctx);
                self.emit_arith_stack(op, ty);
            }
            Dispatch::Call(callee, args) => self.lower_call_push(&callee, &args, ctx),
        }
    }

    fn lower_unary_push(&mut self, op: UnOp, operand: &AstRef, ctx: &FnCtx) {
        match op {
            UnOp::Pos => self.lower_expr_push(operand, ctx),
            UnOp::Neg => {
                let zero = if operand.ty.get() == Type::Float {
                    format!("float@{}", format_float_literal(0.0))
                } else {
                    "int@0".to_string()
                };
                self.emit(format!("PUSHS {}", zero));
                self.lower_expr_push(operand, ctx);
                self.emit("SUBS".to_string());
            }
            UnOp::Not => unreachable!("Not is routed through lower_bool_value"),
        }
    }

    /// String `+` has no stack-only form in the target ISA, so both
    /// operands are popped into scratch registers, concatenated there, and
    /// the result pushed back — matching the "evaluate then `CONCAT`"
    /// shape `STRLEN`/`GETCHAR` use elsewhere in this emitter.
    fn emit_arith_stack(&mut self, op: BinOp, ty: Type) {
        match (op, ty) {
            (BinOp::Add, Type::String) => {
                self.emit("POPS GF@$r2".to_string());
                self.emit("POPS GF@$r1".to_string());
                self.emit("CONCAT GF@$r1 GF@$r1 GF@$r2".to_string());
                self.emit("PUSHS GF@$r1".to_string());
            }
            (BinOp::Add, _) => self.emit("ADDS".to_string()),
            (BinOp::Sub, _) => self.emit("SUBS".to_string()),
            (BinOp::Mul, _) => self.emit("MULS".to_string()),
            (BinOp::Div, Type::Int) => self.emit("IDIVS".to_string()),
            (BinOp::Div, _) => self.emit("DIVS".to_string()),
            _ => unreachable!("non-arithmetic op {:?} reached emit_arith_stack", op),
        }
    }

    // ---- jumping-logic lowering (§4.F.4) ---------------------------------

    fn lower_jump(&mut self, ast: &AstRef, true_label: &str, false_label: &str, ctx: &FnCtx) {
        enum Dispatch {
            And(AstRef, AstRef),
            Or(AstRef, AstRef),
            Not(AstRef),
            Cmp(BinOp, AstRef, AstRef),
            Value(AstRef),
        }
        let dispatch = {
            let kind = ast.kind.borrow();
            match &*kind {
                AstKind::Binary(BinOp::And, l, r) => Dispatch::And(l.clone(), r.clone()),
                AstKind::Binary(BinOp::Or, l, r) => Dispatch::Or(l.clone(), r.clone()),
                AstKind::Unary(UnOp::Not, x) => Dispatch::Not(x.clone()),
                AstKind::Binary(op, l, r) if op.is_comparator() => Dispatch::Cmp(*op, l.clone(), r.clone()),
                _ => Dispatch::Value(ast.clone()),
            }
        };
        match dispatch {
            // A literal left operand short-circuits at lowering time rather
            // than at runtime: `false && r` can never reach `r`, so `r` is
            // never lowered and no `CALL` for anything it mentions is ever
            // emitted (pinned end-to-end scenario in spec §8 #3). A runtime
            // fall-through `JUMP` would reach the same outcome but still
            // leave `r`'s instructions, including any `CALL`, sitting dead
            // in the output text — emission determinism (§8) means that
            // dead text is as observable as live text, so it has to not be
            // emitted at all.
            Dispatch::And(l, r) => match const_bool(&l) {
                Some(false) => self.emit(format!("JUMP {}", false_label)),
                Some(true) => self.lower_jump(&r, true_label, false_label, ctx),
                None => {
                    let next = self.fresh_label(ctx);
                    self.lower_jump(&l, &next, false_label, ctx);
                    self.emit_label(&next);
                    self.lower_jump(&r, true_label, false_label, ctx);
                }
            },
            Dispatch::Or(l, r) => match const_bool(&l) {
                Some(true) => self.emit(format!("JUMP {}", true_label)),
                Some(false) => self.lower_jump(&r, true_label, false_label, ctx),
                None => {
                    let next = self.fresh_label(ctx);
                    self.lower_jump(&l, true_label, &next, ctx);
                    self.emit_label(&next);
                    self.lower_jump(&r, true_label, false_label, ctx);
                }
            },
            Dispatch::Not(x) => self.lower_jump(&x, false_label, true_label, ctx),
            Dispatch::Cmp(op, l, r) => {
                self.lower_expr_push(&l, ctx);
                self.lower_expr_push(&r, ctx);
                self.emit_compare_stack(op);
                self.emit("POPS GF@$cond_res".to_string());
                self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", true_label));
                self.emit(format!("JUMP {}", false_label));
            }
            Dispatch::Value(v) => {
                self.lower_expr_push(&v, ctx);
                self.emit("POPS GF@$cond_res".to_string());
                self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", true_label));
                self.emit(format!("JUMP {}", false_label));
            }
        }
    }

    /// Stack comparisons only offer `EQS`/`LTS`/`GTS`; `!=`, `<=`, `>=` are
    /// built from those plus a boolean negation.
    fn emit_compare_stack(&mut self, op: BinOp) {
        match op {
            BinOp::Eq => self.emit("EQS".to_string()),
            BinOp::NEq => {
                self.emit("EQS".to_string());
                self.emit("NOTS".to_string());
            }
            BinOp::Lt => self.emit("LTS".to_string()),
            BinOp::GtE => {
                self.emit("LTS".to_string());
                self.emit("NOTS".to_string());
            }
            BinOp::Gt => self.emit("GTS".to_string()),
            BinOp::LtE => {
                self.emit("GTS".to_string());
                self.emit("NOTS".to_string());
            }
            _ => unreachable!("{:?} is not a comparison operator", op),
        }
    }

    /// Materialises a jumping-lowered boolean as a pushed `bool@true`/`bool@false`.
    fn lower_bool_value(&mut self, ast: &AstRef, ctx: &FnCtx) {
        let t = self.fresh_label(ctx);
        let f = self.fresh_label(ctx);
        let end = self.fresh_label(ctx);
        self.lower_jump(ast, &t, &f, ctx);
        self.emit_label(&t);
        self.emit("PUSHS bool@true".to_string());
        self.emit(format!("JUMP {}", end));
        self.emit_label(&f);
        self.emit("PUSHS bool@false".to_string());
        self.emit_label(&end);
    }

    /// `x := <bool-expr>` (spec §4.F.4): MOVEs straight into the target
    /// instead of pushing then popping a materialised literal.
    fn lower_bool_into_var(&mut self, ast: &AstRef, var: &str, ctx: &FnCtx) {
        let t = self.fresh_label(ctx);
        let f = self.fresh_label(ctx);
        let end = self.fresh_label(ctx);
        self.lower_jump(ast, &t, &f, ctx);
        self.emit_label(&t);
        self.emit(format!("MOVE {} bool@true", var));
        self.emit(format!("JUMP {}", end));
        self.emit_label(&f);
        self.emit(format!("MOVE {} bool@false", var));
        self.emit_label(&end);
    }

    // ---- calls and intrinsics (§4.F.6) -----------------------------------

    fn lower_call_push(&mut self, callee: &AstRef, args: &AstRef, ctx: &FnCtx) {
        let sym = match &*callee.kind.borrow() {
            AstKind::Id(sym) => sym.clone(),
            other => unreachable!("call callee must be an Id node, got {:?}", other),
        };
        let name_sym = sym.name();
        let name = self.interner.resolve(name_sym).to_string();
        let arg_items = args.list_items().unwrap_or_default();

        if builtins::is_builtin(&name) {
            self.lower_builtin(&name, &arg_items, ctx);
            return;
        }

        let callee_fn = *self
            .functions_by_name
            .get(&name_sym)
            .expect("non-builtin callee resolves to a user-defined function");
        let sig_scope = callee_fn.body_scope.clone();
        let prefix = sig_scope.prefix(&self.scope_counter);
        let param_names: Vec<Name> = callee_fn
            .as_function()
            .params
            .borrow()
            .iter()
            .map(|p| p.name)
            .collect();

        // Evaluate every argument onto the data stack before touching the
        // temporary frame: an argument that itself contains a user-defined
        // call (`foo(bar(x))`) issues its own CREATEFRAME/PUSHFRAME pair,
        // which would otherwise clobber the TF we build for this call.
        for arg in &arg_items {
            self.lower_expr_push(arg, ctx);
        }

        self.emit("CREATEFRAME".to_string());
        for pname in &param_names {
            let tf_operand = format!("TF@${}_{}", prefix, self.interner.resolve(*pname));
            self.emit(format!("DEFVAR {}", tf_operand));
        }
        for pname in param_names.iter().rev() {
            let tf_operand = format!("TF@${}_{}", prefix, self.interner.resolve(*pname));
            self.emit(format!("POPS {}", tf_operand));
        }
        self.emit("PUSHFRAME".to_string());
        self.emit(format!("CALL {}", name));
    }

    fn lower_builtin(&mut self, name: &str, args: &[AstRef], ctx: &FnCtx) {
        match name {
            builtins::PRINT => self.lower_print(args, ctx),
            "int2float" => {
                self.lower_expr_push(&args[0], ctx);
                self.emit("INT2FLOATS".to_string());
            }
            "float2int" => {
                self.lower_expr_push(&args[0], ctx);
                self.emit("FLOAT2INTS".to_string());
            }
            "len" => {
                let s = self.direct_or_materialize(&args[0], ctx, "GF@$r1");
                self.emit(format!("STRLEN GF@$r1 {}", s));
                self.emit("PUSHS GF@$r1".to_string());
            }
            "chr" => self.lower_chr(args, ctx),
            "ord" => self.lower_ord(args, ctx),
            "substr" => self.lower_substr(args, ctx),
            "inputs" | "inputi" | "inputf" => self.lower_input(name, ctx),
            other => unreachable!("unregistered builtin reached the emitter: {other}"),
        }
    }

    fn lower_print(&mut self, args: &[AstRef], ctx: &FnCtx) {
        for arg in args {
            if let Some(direct) = self.direct_operand(arg) {
                self.emit(format!("WRITE {}", direct));
                continue;
            }
            self.used.print.set(true);
            if arg.ty.get() == Type::Bool {
                self.lower_bool_value(arg, ctx);
            } else {
                self.lower_expr_push(arg, ctx);
            }
            self.emit("POPS GF@$print".to_string());
            self.emit("WRITE GF@$print".to_string());
        }
    }

    fn lower_chr(&mut self, args: &[AstRef], ctx: &FnCtx) {
        let i = self.direct_or_materialize(&args[0], ctx, "GF@$r1");
        let bad = self.fresh_label(ctx);
        let ok = self.fresh_label(ctx);
        let end = self.fresh_label(ctx);

        self.emit_cmp_and_set_cond(&i, "LTS", "int@0");
        self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", bad));
        self.emit_cmp_and_set_cond(&i, "GTS", "int@255");
        self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", bad));
        self.emit(format!("JUMP {}", ok));

        self.emit_label(&bad);
        self.emit("PUSHS int@1".to_string());
        self.emit("PUSHS string@".to_string());
        self.emit(format!("JUMP {}", end));

        self.emit_label(&ok);
        self.used.r3.set(true);
        self.emit(format!("INT2CHAR GF@$r3 {}", i));
        self.emit("PUSHS int@0".to_string());
        self.emit("PUSHS GF@$r3".to_string());
        self.emit_label(&end);
    }

    /// `ord(s, i)` returns `(Int, Int)` per its registered signature
    /// ([`ifjcode_syntax::builtins`]) — the failure case is `(0, 1)`, not the
    /// `("", 1)` spec.md's prose (copied from `chr`'s description) suggests;
    /// pinned here to the type the symbol table actually carries. See DESIGN.md.
    fn lower_ord(&mut self, args: &[AstRef], ctx: &FnCtx) {
        let s = self.direct_or_materialize(&args[0], ctx, "GF@$r1");
        let i = self.direct_or_materialize(&args[1], ctx, "GF@$r2");
        self.used.r3.set(true);
        self.emit(format!("STRLEN GF@$r3 {}", s));

        let bad = self.fresh_label(ctx);
        let ok = self.fresh_label(ctx);
        let end = self.fresh_label(ctx);

        self.emit_cmp_and_set_cond(&i, "LTS", "int@0");
        self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", bad));
        self.emit_cmp_and_set_cond(&i, "LTS", "GF@$r3");
        self.emit(format!("JUMPIFNEQ {} GF@$cond_res bool@true", bad));
        self.emit(format!("JUMP {}", ok));

        self.emit_label(&bad);
        self.emit("PUSHS int@1".to_string());
        self.emit("PUSHS int@0".to_string());
        self.emit(format!("JUMP {}", end));

        self.emit_label(&ok);
        self.emit(format!("STRI2INT GF@$r1 {} {}", s, i));
        self.emit("PUSHS int@0".to_string());
        self.emit("PUSHS GF@$r1".to_string());
        self.emit_label(&end);
    }

    fn lower_substr(&mut self, args: &[AstRef], ctx: &FnCtx) {
        let s = self.direct_or_materialize(&args[0], ctx, "GF@$r1");
        let i = self.direct_or_materialize(&args[1], ctx, "GF@$r2");
        self.used.r3.set(true);
        let n = self.direct_or_materialize(&args[2], ctx, "GF@$r3");
        self.used.substr_scratch.set(true);

        self.emit(format!("STRLEN GF@$substr_len {}", s));

        let bad = self.fresh_label(ctx);
        let ok = self.fresh_label(ctx);
        let clamp_done = self.fresh_label(ctx);
        let loop_l = self.fresh_label(ctx);
        let loop_end = self.fresh_label(ctx);
        let end = self.fresh_label(ctx);

        self.emit_cmp_and_set_cond(&i, "LTS", "int@0");
        self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", bad));
        self.emit_cmp_and_set_cond(&i, "LTS", "GF@$substr_len");
        self.emit(format!("JUMPIFNEQ {} GF@$cond_res bool@true", bad));
        self.emit_cmp_and_set_cond(&n, "LTS", "int@0");
        self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", bad));
        self.emit(format!("JUMP {}", ok));

        self.emit_label(&bad);
        self.emit("PUSHS int@1".to_string());
        self.emit("PUSHS string@".to_string());
        self.emit(format!("JUMP {}", end));

        self.emit_label(&ok);
        self.emit(format!("ADD GF@$substr_end {} {}", i, n));
        self.emit_cmp_and_set_cond("GF@$substr_end", "GTS", "GF@$substr_len");
        self.emit(format!("JUMPIFNEQ {} GF@$cond_res bool@true", clamp_done));
        self.emit("MOVE GF@$substr_end GF@$substr_len".to_string());
        self.emit_label(&clamp_done);

        self.emit(format!("MOVE GF@$substr_idx {}", i));
        self.emit("MOVE GF@$substr_result string@".to_string());
        self.emit_label(&loop_l);
        self.emit_cmp_and_set_cond("GF@$substr_idx", "LTS", "GF@$substr_end");
        self.emit(format!("JUMPIFNEQ {} GF@$cond_res bool@true", loop_end));
        self.emit(format!("GETCHAR GF@$substr_ch {} GF@$substr_idx", s));
        self.emit("CONCAT GF@$substr_result GF@$substr_result GF@$substr_ch".to_string());
        self.emit("ADD GF@$substr_idx GF@$substr_idx int@1".to_string());
        self.emit(format!("JUMP {}", loop_l));
        self.emit_label(&loop_end);

        self.emit("PUSHS int@0".to_string());
        self.emit("PUSHS GF@$substr_result".to_string());
        self.emit_label(&end);
    }

    fn lower_input(&mut self, name: &str, ctx: &FnCtx) {
        let ty_tag = match name {
            "inputs" => "string",
            "inputi" => "int",
            "inputf" => "float",
            _ => unreachable!(),
        };
        self.emit(format!("READ GF@$r1 {}", ty_tag));
        self.emit("TYPE GF@$r2 GF@$r1".to_string());
        self.emit_cmp_and_set_cond("GF@$r2", "EQS", &format!("string@{}", ty_tag));

        let ok = self.fresh_label(ctx);
        let end = self.fresh_label(ctx);
        self.emit(format!("JUMPIFEQ {} GF@$cond_res bool@true", ok));
        self.emit("PUSHS int@1".to_string());
        self.emit(format!("PUSHS {}", default_literal(input_default_type(name))));
        self.emit(format!("JUMP {}", end));

        self.emit_label(&ok);
        self.emit("PUSHS int@0".to_string());
        self.emit("PUSHS GF@$r1".to_string());
        self.emit_label(&end);
    }

    fn emit_cmp_and_set_cond(&mut self, lhs: &str, op: &str, rhs: &str) {
        self.emit(format!("PUSHS {}", lhs));
        self.emit(format!("PUSHS {}", rhs));
        self.emit(op.to_string());
        self.emit("POPS GF@$cond_res".to_string());
    }
}

fn input_default_type(name: &str) -> Type {
    match name {
        "inputs" => Type::String,
        "inputi" => Type::Int,
        "inputf" => Type::Float,
        _ => unreachable!(),
    }
}

/// Literal boolean value of `ast`, if it is one — used to short-circuit
/// `And`/`Or` lowering over a constant operand (spec §8 #3).
fn const_bool(ast: &AstRef) -> Option<bool> {
    match &*ast.kind.borrow() {
        AstKind::ConstBool(v) => Some(*v),
        _ => None,
    }
}

fn is_jump_lowered_bool(ast: &AstRef) -> bool {
    match &*ast.kind.borrow() {
        AstKind::Binary(op, ..) => op.is_logic(),
        AstKind::Unary(UnOp::Not, _) => true,
        _ => false,
    }
}

fn default_literal(ty: Type) -> String {
    match ty {
        Type::Int => "int@0".to_string(),
        Type::Float => format!("float@{}", format_float_literal(0.0)),
        Type::String => "string@".to_string(),
        Type::Bool => "bool@false".to_string(),
        _ => "int@0".to_string(),
    }
}

fn literal_operand(ast: &AstRef) -> Option<String> {
    match &*ast.kind.borrow() {
        AstKind::ConstInt(v) => Some(format!("int@{}", v)),
        AstKind::ConstFloat(v) => Some(format!("float@{}", format_float_literal(*v))),
        AstKind::ConstBool(v) => Some(format!("bool@{}", v)),
        AstKind::ConstString(s) => Some(format_string_literal(s)),
        _ => None,
    }
}

/// C99 hex-float rendering (`0x1.8p3`-style), the operand form spec §6 pins
/// for `float@` literals. Handles the finite/normal case exactly via the
/// IEEE-754 bit layout; zero, infinities and NaN (only reachable from a
/// folded literal division, since the parser never produces them directly)
/// fall back to the conventional textual forms.
fn format_float_literal(v: f64) -> String {
    if v == 0.0 {
        return if v.is_sign_negative() {
            "-0x0p+0".to_string()
        } else {
            "0x0p+0".to_string()
        };
    }
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v < 0.0 { "-inf".to_string() } else { "inf".to_string() };
    }

    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let raw_exponent = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;
    let (leading, exponent) = if raw_exponent == 0 {
        (0u64, -1022i64)
    } else {
        (1u64, raw_exponent - 1023)
    };

    let mantissa_hex = format!("{:013x}", mantissa);
    let trimmed = mantissa_hex.trim_end_matches('0');
    let frac = if trimmed.is_empty() { "0" } else { trimmed };
    let exp_sign = if exponent >= 0 { "+" } else { "" };
    format!("{}0x{}.{}p{}{}", sign, leading, frac, exp_sign, exponent)
}

/// Escapes bytes `<= 32`, `#`, and `\` as `\NNN` (spec §6); every other byte
/// (including UTF-8 continuation/lead bytes) passes through unchanged so a
/// multi-byte character survives intact.
fn format_string_literal(s: &str) -> String {
    let mut out = Vec::with_capacity(s.len() + 7);
    out.extend_from_slice(b"string@");
    for &b in s.as_bytes() {
        if b <= 32 || b == b'#' || b == b'\\' {
            out.extend_from_slice(format!("\\{:03}", b).as_bytes());
        } else {
            out.push(b);
        }
    }
    String::from_utf8(out).expect("escaping only ever removes or copies bytes, never splits a UTF-8 sequence")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literal_renders_c99_hex_form() {
        assert_eq!(format_float_literal(1.0), "0x1.0p+0");
        assert_eq!(format_float_literal(0.0), "0x0p+0");
        assert_eq!(format_float_literal(-2.5), "-0x1.4p+1");
    }

    #[test]
    fn string_literal_escapes_control_bytes_and_hash_and_backslash() {
        assert_eq!(format_string_literal("a b"), "string@a\\032b");
        assert_eq!(format_string_literal("#x\\y"), "string@\\035x\\092y");
        assert_eq!(format_string_literal("hello"), "string@hello");
    }

    #[test]
    fn string_literal_preserves_multibyte_utf8() {
        assert_eq!(format_string_literal("caf\u{e9}"), "string@caf\u{e9}");
    }
}
