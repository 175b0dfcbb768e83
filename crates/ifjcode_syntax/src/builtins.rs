//! Pre-registered built-in function signatures (spec §4.E).
//!
//! Built-ins are added to the global symbol table before parsing begins so
//! that call sites type-check against them exactly like any other function.
//! Unlike user functions they are never `defined` through a `func` body —
//! `defined` is set `true` at registration so the forward-reference/"must be
//! defined by end of program" check (spec §4.E) never complains about them —
//! and the emitter (§4.F.6) recognises their names and hand-lowers each call
//! instead of emitting a `CALL`.

use ifjcode_base::Interner;

use crate::symtable::SymbolTable;
use crate::types::Type;

/// `print` is the only variadic built-in; its argument count is not checked
/// against `params_count` the way an ordinary call's arity is.
pub const PRINT: &str = "print";

pub const BUILTIN_NAMES: &[&str] = &[
    "inputs", "inputi", "inputf", PRINT, "int2float", "float2int", "len", "substr", "ord", "chr",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Registers every built-in into `global`, interning names/param identifiers
/// through `interner`.
pub fn register(global: &SymbolTable, interner: &mut Interner) {
    let sym_input = |interner: &mut Interner, name: &str, ty: Type| {
        let id = interner.intern(name);
        let sym = global.add_function(id).expect("builtins register once");
        let f = sym.as_function().unwrap();
        f.add_return(None, ty).unwrap();
        f.add_return(None, Type::Int).unwrap();
        f.defined.set(true);
    };
    sym_input(interner, "inputs", Type::String);
    sym_input(interner, "inputi", Type::Int);
    sym_input(interner, "inputf", Type::Float);

    let print_id = interner.intern(PRINT);
    let print_sym = global.add_function(print_id).expect("builtins register once");
    let print_fn = print_sym.as_function().unwrap();
    print_fn.defined.set(true);
    print_fn.is_variadic.set(true);

    let unary = |interner: &mut Interner, name: &str, param_ty: Type, ret_ty: Type| {
        let id = interner.intern(name);
        let sym = global.add_function(id).expect("builtins register once");
        let f = sym.as_function().unwrap();
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: param_ty,
        });
        f.add_return(None, ret_ty).unwrap();
        f.defined.set(true);
    };
    unary(interner, "int2float", Type::Int, Type::Float);
    unary(interner, "float2int", Type::Float, Type::Int);
    unary(interner, "len", Type::String, Type::Int);

    let chr_id = interner.intern("chr");
    let chr_sym = global.add_function(chr_id).expect("builtins register once");
    {
        let f = chr_sym.as_function().unwrap();
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: Type::Int,
        });
        f.add_return(None, Type::String).unwrap();
        f.add_return(None, Type::Int).unwrap();
        f.defined.set(true);
    }

    let binary_str_int = |interner: &mut Interner, name: &str| {
        let id = interner.intern(name);
        let sym = global.add_function(id).expect("builtins register once");
        let f = sym.as_function().unwrap();
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: Type::String,
        });
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: Type::Int,
        });
        f.add_return(None, Type::Int).unwrap();
        f.add_return(None, Type::Int).unwrap();
        f.defined.set(true);
    };
    binary_str_int(interner, "ord");

    let substr_id = interner.intern("substr");
    let substr_sym = global
        .add_function(substr_id)
        .expect("builtins register once");
    {
        let f = substr_sym.as_function().unwrap();
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: Type::String,
        });
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: Type::Int,
        });
        f.params.borrow_mut().push(crate::symtable::Param {
            name: ifjcode_base::Symbol::EMPTY,
            ty: Type::Int,
        });
        f.add_return(None, Type::String).unwrap();
        f.add_return(None, Type::Int).unwrap();
        f.defined.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_builtin_names() {
        let mut interner = Interner::new();
        let global = SymbolTable::new();
        register(&global, &mut interner);
        for name in BUILTIN_NAMES {
            let id = interner.lookup(name).unwrap();
            assert!(global.find(id).is_some(), "missing builtin {name}");
        }
    }

    #[test]
    fn len_has_one_string_param_and_int_return() {
        let mut interner = Interner::new();
        let global = SymbolTable::new();
        register(&global, &mut interner);
        let id = interner.lookup("len").unwrap();
        let sym = global.find(id).unwrap();
        let f = sym.as_function().unwrap();
        assert_eq!(f.params_count(), 1);
        assert_eq!(f.params.borrow()[0].ty, Type::String);
        assert_eq!(f.result_type(), Type::Int);
    }

    #[test]
    fn is_builtin_matches_registered_names() {
        assert!(is_builtin("print"));
        assert!(is_builtin("substr"));
        assert!(!is_builtin("main"));
    }
}
