//! Per-scope symbol tables (spec §3.2, §4.A).
//!
//! A symbol is either a [`VariableSym`] or a [`FunctionSym`], shared via
//! `Rc` so that every reference into a table (scope-stack lookups at parse
//! time, `Id` AST leaves, the emitter's `parentStatement` walk) aliases the
//! same mutable fields rather than copying a snapshot. Mutable fields use
//! `Cell`/`RefCell` since the parser and the emitter both need to update a
//! symbol (`defined`, `reference_counter`, `symbol_prefix`) through a shared
//! reference.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use ifjcode_base::{CompilerError, Result, Symbol as Name};

use crate::types::Type;

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Name,
    pub ty: Type,
}

/// One return slot. `name` is `None` for an anonymous return list; a
/// function's returns are either all named or all anonymous (spec §3.2).
#[derive(Debug, Clone)]
pub struct ReturnSlot {
    pub name: Option<Name>,
    pub ty: Type,
}

#[derive(Debug)]
pub struct VariableSym {
    pub name: Name,
    pub ty: Cell<Type>,
    pub defined: Cell<bool>,
    pub is_argument: bool,
    pub is_return_value: bool,
    pub reference_counter: Cell<u32>,
    /// The scope table this variable was declared in, so the emitter can
    /// find its `symbol_prefix` (spec §4.F.1) without an upward `parentStatement`
    /// walk. Set once by `SymbolTable::add_variable`, never reassigned.
    pub owner: RefCell<Option<Rc<SymbolTable>>>,
}

#[derive(Debug)]
pub struct FunctionSym {
    pub name: Name,
    pub params: RefCell<Vec<Param>>,
    pub returns: RefCell<Vec<ReturnSlot>>,
    pub defined: Cell<bool>,
    pub reference_counter: Cell<u32>,
    /// Set only for the `print` built-in (spec §4.E): its argument count is
    /// never checked against `params_count`.
    pub is_variadic: Cell<bool>,
}

impl FunctionSym {
    pub fn params_count(&self) -> usize {
        self.params.borrow().len()
    }

    pub fn ret_types_count(&self) -> usize {
        self.returns.borrow().len()
    }

    /// `Nil` if no returns, the sole return type if exactly one, else
    /// `Multiple` — the §4.B.2 `Id`-on-a-function rule.
    pub fn result_type(&self) -> Type {
        match self.returns.borrow().len() {
            0 => Type::Nil,
            1 => self.returns.borrow()[0].ty,
            _ => Type::Multiple,
        }
    }

    pub fn has_named_returns(&self) -> bool {
        self.returns.borrow().first().is_some_and(|r| r.name.is_some())
    }

    /// Rejects mixing named and anonymous returns for the same function.
    pub fn add_return(&self, name: Option<Name>, ty: Type) -> Result<()> {
        let mut returns = self.returns.borrow_mut();
        if let Some(first) = returns.first() {
            if first.name.is_some() != name.is_some() {
                return Err(CompilerError::wrong_params_or_returns(
                    "cannot mix named and unnamed return values",
                ));
            }
        }
        returns.push(ReturnSlot { name, ty });
        Ok(())
    }
}

#[derive(Debug)]
pub enum Sym {
    Variable(VariableSym),
    Function(FunctionSym),
}

impl Sym {
    pub fn name(&self) -> Name {
        match self {
            Sym::Variable(v) => v.name,
            Sym::Function(f) => f.name,
        }
    }

    pub fn as_variable(&self) -> Option<&VariableSym> {
        match self {
            Sym::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionSym> {
        match self {
            Sym::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn reference_counter(&self) -> &Cell<u32> {
        match self {
            Sym::Variable(v) => &v.reference_counter,
            Sym::Function(f) => &f.reference_counter,
        }
    }

    pub fn mark_used(&self) {
        let rc = self.reference_counter();
        rc.set(rc.get() + 1);
    }
}

/// A mapping identifier → symbol valid within one lexical scope.
#[derive(Debug, Default)]
pub struct SymbolTable {
    map: RefCell<HashMap<Name, Rc<Sym>>>,
    /// Lazily assigned the first time the emitter walks into this scope
    /// (spec §4.F.1); `None` until then.
    prefix: Cell<Option<u32>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: Name) -> Option<Rc<Sym>> {
        self.map.borrow().get(&name).cloned()
    }

    pub fn contains(&self, name: Name) -> bool {
        self.map.borrow().contains_key(&name)
    }

    /// Inserts a new variable symbol. Fails only on an internal invariant
    /// breach — callers are required to `find` first (spec §4.A).
    ///
    /// Takes `self` wrapped in its owning `Rc` so the new symbol can record
    /// its home scope (see [`VariableSym::owner`]); every table the parser
    /// builds is held as an `Rc<SymbolTable>` already, so this costs callers
    /// nothing.
    pub fn add_variable(
        self: &Rc<Self>,
        name: Name,
        ty: Type,
        is_argument: bool,
        is_return_value: bool,
    ) -> Result<Rc<Sym>> {
        if self.contains(name) {
            return Err(CompilerError::internal(
                "add_variable called on an already-present key",
            ));
        }
        let sym = Rc::new(Sym::Variable(VariableSym {
            name,
            ty: Cell::new(ty),
            defined: Cell::new(is_argument || is_return_value),
            is_argument,
            is_return_value,
            reference_counter: Cell::new(0),
            owner: RefCell::new(Some(self.clone())),
        }));
        self.map.borrow_mut().insert(name, sym.clone());
        Ok(sym)
    }

    pub fn add_function(&self, name: Name) -> Result<Rc<Sym>> {
        if self.contains(name) {
            return Err(CompilerError::internal(
                "add_function called on an already-present key",
            ));
        }
        let sym = Rc::new(Sym::Function(FunctionSym {
            name,
            params: RefCell::new(Vec::new()),
            returns: RefCell::new(Vec::new()),
            defined: Cell::new(false),
            reference_counter: Cell::new(0),
            is_variadic: Cell::new(false),
        }));
        self.map.borrow_mut().insert(name, sym.clone());
        Ok(sym)
    }

    pub fn iter(&self) -> Vec<Rc<Sym>> {
        self.map.borrow().values().cloned().collect()
    }

    /// Returns this scope's renaming prefix, assigning the next value from
    /// `counter` on first use.
    pub fn prefix(&self, counter: &Cell<u32>) -> u32 {
        if let Some(p) = self.prefix.get() {
            return p;
        }
        let p = counter.get();
        counter.set(p + 1);
        self.prefix.set(Some(p));
        p
    }
}

/// Parse-time scope stack: innermost scope last, looked up innermost first.
#[derive(Default)]
pub struct ScopeStack {
    scopes: Vec<Rc<SymbolTable>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Rc<SymbolTable>) {
        self.scopes.push(table);
    }

    pub fn pop(&mut self) -> Option<Rc<SymbolTable>> {
        self.scopes.pop()
    }

    pub fn current(&self) -> Rc<SymbolTable> {
        self.scopes
            .last()
            .cloned()
            .expect("scope stack must never be empty while parsing a function body")
    }

    pub fn find(&self, name: Name) -> Option<Rc<Sym>> {
        self.scopes.iter().rev().find_map(|s| s.find(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifjcode_base::Interner;

    #[test]
    fn add_then_find_round_trips() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let table = Rc::new(SymbolTable::new());
        table.add_variable(x, Type::Int, false, false).unwrap();
        let found = table.find(x).unwrap();
        assert_eq!(found.as_variable().unwrap().ty.get(), Type::Int);
    }

    #[test]
    fn add_variable_twice_is_internal_error() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let table = Rc::new(SymbolTable::new());
        table.add_variable(x, Type::Int, false, false).unwrap();
        assert!(table.add_variable(x, Type::Int, false, false).is_err());
    }

    #[test]
    fn scope_stack_resolves_innermost_first() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let outer = Rc::new(SymbolTable::new());
        outer.add_variable(x, Type::Int, false, false).unwrap();
        let inner = Rc::new(SymbolTable::new());
        inner.add_variable(x, Type::String, false, false).unwrap();

        let mut stack = ScopeStack::new();
        stack.push(outer);
        stack.push(inner);
        let found = stack.find(x).unwrap();
        assert_eq!(found.as_variable().unwrap().ty.get(), Type::String);
    }

    #[test]
    fn mixing_named_and_unnamed_returns_is_rejected() {
        let mut interner = Interner::new();
        let name = interner.intern("a");
        let table = SymbolTable::new();
        let f = table.add_function(interner.intern("f")).unwrap();
        let f = f.as_function().unwrap();
        f.add_return(Some(name), Type::Int).unwrap();
        assert!(f.add_return(None, Type::Int).is_err());
    }

    #[test]
    fn add_variable_records_owning_table() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let table = Rc::new(SymbolTable::new());
        let sym = table.add_variable(x, Type::Int, false, false).unwrap();
        let owner = sym.as_variable().unwrap().owner.borrow().clone().unwrap();
        assert!(Rc::ptr_eq(&owner, &table));
    }

    #[test]
    fn prefix_is_assigned_once_and_stable() {
        let table = SymbolTable::new();
        let counter = Cell::new(5);
        assert_eq!(table.prefix(&counter), 5);
        assert_eq!(table.prefix(&counter), 5);
        assert_eq!(counter.get(), 6);
    }
}
