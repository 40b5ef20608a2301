mod bind;
mod declare;
mod infer;
mod lift;
mod mono;
pub mod tree;
pub mod types;

use std::fmt;
use crate::emit::lir;
use crate::error::Message;
use crate::parsing::ast;
use crate::source::Location;
use crate::util::{pluralize, Counter};

pub fn lower<'s>(ast: ast::AST<'s>) -> Result<lir::LIR, Vec<SemaError<'s>>> {
    let mut counter = Counter::new(0);
    let mut program = declare::declare(&ast, &mut counter)?;
    bind::bind(&mut program)?;
    infer::infer(&mut program, &mut counter)?;
    lift::lift(&mut program);
    mono::monomorphize(&program)
}

#[derive(Debug)]
pub enum SemaError<'a> {
    Duplicate(String, Location<'a>, Location<'a>),
    UnknownType(String, Location<'a>),
    MismatchedTypeArguments { expected: usize, got: usize, loc: Location<'a> },
    UnboundName(String, Location<'a>),
    NotAValue(String, Location<'a>),
    NotCallable(String, Location<'a>),
    ImpureCall(String, Location<'a>),
    TypeMismatch { expected: String, got: String, loc: Location<'a> },
    ArityMismatch { expected: usize, got: usize, loc: Location<'a> },
    AssignToImmutable(Location<'a>),
    UnknownField { field: String, struct_name: String, loc: Location<'a> },
    CannotInferMemberType(String, Location<'a>),
    CannotInferArrayAccess(Location<'a>),
    CouldNotInferType(Location<'a>),
    UnboundedGenericRecursion(String, Location<'a>)
}

impl<'a> Message for SemaError<'a> {
    fn write_into<W: fmt::Write>(&self, to: &mut W) -> fmt::Result {
        match self {
            SemaError::Duplicate(name, loc, prev_loc) => {
                writeln!(to, "Error: The name '{name}' was already defined.")?;
                Self::show_location(loc, to)?;
                writeln!(to, " | Note: '{name}' was previously defined here.")?;
                Self::show_note_location(prev_loc, to)
            },
            SemaError::UnknownType(name, loc) => {
                writeln!(to, "Error: Could not resolve the type '{name}'.")?;
                Self::show_location(loc, to)
            },
            SemaError::MismatchedTypeArguments { expected, got, loc } => {
                writeln!(to, "Error: Expected {}, got {}.", pluralize("type argument", *expected as u64), pluralize("type argument", *got as u64))?;
                Self::show_location(loc, to)
            },
            SemaError::UnboundName(name, loc) => {
                writeln!(to, "Error: Could not resolve the name '{name}'.")?;
                Self::show_location(loc, to)
            },
            SemaError::NotAValue(name, loc) => {
                writeln!(to, "Error: '{name}' is a function and cannot be used as a value.")?;
                Self::show_location(loc, to)
            },
            SemaError::NotCallable(name, loc) => {
                writeln!(to, "Error: '{name}' is not a function.")?;
                Self::show_location(loc, to)
            },
            SemaError::ImpureCall(name, loc) => {
                writeln!(to, "Error: Cannot call the impure function '{name}' from a pure function.")?;
                Self::show_location(loc, to)
            },
            SemaError::TypeMismatch { expected, got, loc } => {
                writeln!(to, "Error: Incompatible types. Expected '{expected}' but got '{got}'.")?;
                Self::show_location(loc, to)
            },
            SemaError::ArityMismatch { expected, got, loc } => {
                writeln!(to, "Error: Expected {}, got {}.", pluralize("argument", *expected as u64), pluralize("argument", *got as u64))?;
                Self::show_location(loc, to)
            },
            SemaError::AssignToImmutable(loc) => {
                writeln!(to, "Error: Cannot assign to an immutable value.")?;
                Self::show_location(loc, to)
            },
            SemaError::UnknownField { field, struct_name, loc } => {
                writeln!(to, "Error: '{struct_name}' does not contain a field named '{field}'.")?;
                Self::show_location(loc, to)
            },
            SemaError::CannotInferMemberType(field, loc) => {
                writeln!(to, "Error: Could not infer the type of the member access '.{field}'.")?;
                Self::show_location(loc, to)
            },
            SemaError::CannotInferArrayAccess(loc) => {
                writeln!(to, "Error: Indexed expression is not an array.")?;
                Self::show_location(loc, to)
            },
            SemaError::CouldNotInferType(loc) => {
                writeln!(to, "Error: Could not infer the type of this expression.")?;
                Self::show_location(loc, to)
            },
            SemaError::UnboundedGenericRecursion(name, loc) => {
                writeln!(to, "Error: The generic function '{name}' recurses with ever-growing type arguments.")?;
                Self::show_location(loc, to)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;
    use crate::emit::lir;
    use crate::error::Message;
    use crate::parsing::{ast, parse_file};
    use crate::sema::{lower, SemaError};
    use crate::sema::mono::match_generics;
    use crate::sema::tree::{ExprKind, Program};
    use crate::sema::types::Ty;
    use crate::source::Source;
    use crate::util::Counter;

    fn source(text: &str) -> Source {
        Source::from_text("<test>", text)
    }

    fn parse_one<'s>(s: &'s Source) -> ast::AST<'s> {
        let file = parse_file(s).unwrap_or_else(|e| panic!("{}", e[0].render_to_string()));
        ast::AST::from_files("test".into(), vec![file])
    }

    fn analyze<'s>(s: &'s Source) -> Result<lir::LIR, Vec<SemaError<'s>>> {
        lower(parse_one(s))
    }

    fn emitted<'s>(s: &'s Source) -> lir::LIR {
        analyze(s).unwrap_or_else(|e| panic!("{}", e[0].render_to_string()))
    }

    // declare + bind + infer only, for inspecting resolved types
    fn inferred<'s>(s: &'s Source) -> Program<'s> {
        let ast = parse_one(s);
        let mut counter = Counter::new(0);
        let mut program = super::declare::declare(&ast, &mut counter)
            .unwrap_or_else(|e| panic!("{}", e[0].render_to_string()));
        super::bind::bind(&mut program).unwrap_or_else(|e| panic!("{}", e[0].render_to_string()));
        super::infer::infer(&mut program, &mut counter)
            .unwrap_or_else(|e| panic!("{}", e[0].render_to_string()));
        program
    }

    fn inferred_errors<'s>(s: &'s Source) -> Vec<SemaError<'s>> {
        let ast = parse_one(s);
        let mut counter = Counter::new(0);
        let mut program = match super::declare::declare(&ast, &mut counter) {
            Ok(program) => program,
            Err(errors) => return errors
        };
        if let Err(errors) = super::bind::bind(&mut program) {
            return errors;
        }
        match super::infer::infer(&mut program, &mut counter) {
            Ok(()) => vec![],
            Err(errors) => errors
        }
    }

    fn main_body_ty<'s>(program: &Program<'s>) -> Ty {
        let main = program.main.expect("no main function");
        let body = program.funcs[main].body.unwrap();
        program.exprs[body].ty.clone().unwrap()
    }

    #[test]
    fn test_main_only_emits_one_function() {
        let s = source("def main() -> Int32 { 0 }");
        let built = emitted(&s);
        assert_eq!(built.functions.len(), 1);
        assert_eq!(built.functions.values().next().unwrap().name, "main");
        assert!(built.main_function.is_some());
    }

    #[test]
    fn test_generic_two_specializations() {
        let s = source(r#"
            def id<T>(x: T) -> T { x }

            def main() -> Int32 {
                id(1);
                val s = id("hello");
                0
            }
        "#);
        let built = emitted(&s);
        let names: Vec<&str> = built.functions.values().map(|f| f.name.as_str()).collect();
        assert_eq!(built.functions.len(), 3);
        assert!(names.contains(&"id<Int32>"));
        assert!(names.contains(&"id<String>"));
    }

    #[test]
    fn test_val_binding_infers_int32() {
        let s = source("def main() -> Int32 { val x = 1; x + 1 }");
        let program = inferred(&s);
        assert_eq!(main_body_ty(&program), Ty::Int { bits: 32 });
    }

    #[test]
    fn test_assign_to_immutable() {
        let s = source("def main() -> Int32 { val x = 1; x := 2 }");
        let errors = inferred_errors(&s);
        assert!(matches!(errors[0], SemaError::AssignToImmutable(_)), "{errors:?}");
    }

    #[test]
    fn test_assign_to_mutable() {
        let s = source("def main() -> Int32 { var x = 1; x := 2 }");
        let program = inferred(&s);
        assert_eq!(main_body_ty(&program), Ty::Int { bits: 32 });
    }

    #[test]
    fn test_while_infers_void() {
        let s = source(r"
            def main() -> Int32 {
                var i = 0;
                while (i < 10) { i := i + 1 };
                i
            }
        ");
        let program = inferred(&s);
        let main = program.main.unwrap();
        let mut while_ty = None;
        program.walk(program.funcs[main].body.unwrap(), &mut |e| {
            if matches!(program.kind(e), ExprKind::While { .. }) {
                while_ty = program.exprs[e].ty.clone();
            }
        });
        assert_eq!(while_ty, Some(Ty::Void));
        assert_eq!(main_body_ty(&program), Ty::Int { bits: 32 });
    }

    #[test]
    fn test_while_requires_mutable_counter() {
        let s = source(r"
            def main() -> Int32 {
                val i = 0;
                while (i < 10) { i := i + 1 };
                i
            }
        ");
        let errors = inferred_errors(&s);
        assert!(matches!(errors[0], SemaError::AssignToImmutable(_)), "{errors:?}");
    }

    #[test]
    fn test_shadowing_innermost_wins() {
        let s = source(r#"
            def greeting() -> String {
                val x = 1;
                val x = "hello";
                x
            }
        "#);
        let program = inferred(&s);
        let f = program.top_levels[0];
        let body = program.funcs[f].body.unwrap();
        assert_eq!(program.exprs[body].ty, Some(Ty::String));
    }

    #[test]
    fn test_unbound_name() {
        let s = source("def main() -> Int32 { nope }");
        let errors = analyze(&s).unwrap_err();
        assert!(matches!(&errors[0], SemaError::UnboundName(name, _) if name == "nope"));
    }

    #[test]
    fn test_not_callable() {
        let s = source("def main() -> Int32 { val x = 1; x(2) }");
        let errors = analyze(&s).unwrap_err();
        assert!(matches!(&errors[0], SemaError::NotCallable(name, _) if name == "x"));
    }

    #[test]
    fn test_if_condition_type_mismatch() {
        let s = source("def main() -> Int32 { if (1) 2 else 3 }");
        let errors = inferred_errors(&s);
        assert!(matches!(errors[0], SemaError::TypeMismatch { .. }), "{errors:?}");
    }

    #[test]
    fn test_if_branches_agree() {
        let s = source("def main() -> Int32 { if (1 == 2) 3 else 4 }");
        let program = inferred(&s);
        assert_eq!(main_body_ty(&program), Ty::Int { bits: 32 });
    }

    #[test]
    fn test_arity_mismatch() {
        let s = source(r"
            def f(a: Int32) -> Int32 { a }
            def main() -> Int32 { f(1, 2) }
        ");
        let errors = inferred_errors(&s);
        assert!(matches!(errors[0], SemaError::ArityMismatch { expected: 1, got: 2, .. }), "{errors:?}");
    }

    #[test]
    fn test_string_join() {
        let s = source(r#"def greeting() -> String { "hello " ++ "world" }"#);
        let program = inferred(&s);
        let f = program.top_levels[0];
        let body = program.funcs[f].body.unwrap();
        assert_eq!(program.exprs[body].ty, Some(Ty::String));
    }

    #[test]
    fn test_member_access() {
        let s = source(r"
            struct Point {
                x: Int32;
                y: Int32;
            }

            def main() -> Int32 {
                val p = new Point(1, 2);
                p.x
            }
        ");
        let program = inferred(&s);
        assert_eq!(main_body_ty(&program), Ty::Int { bits: 32 });

        let built = emitted(&s);
        assert_eq!(built.structs.len(), 1);
        assert_eq!(built.structs.values().next().unwrap().name, "Point");
    }

    #[test]
    fn test_unknown_field() {
        let s = source(r"
            struct Point {
                x: Int32;
            }

            def main() -> Int32 {
                val p = new Point(1);
                p.z
            }
        ");
        let errors = inferred_errors(&s);
        assert!(matches!(&errors[0], SemaError::UnknownField { field, .. } if field == "z"), "{errors:?}");
    }

    #[test]
    fn test_generic_struct_specialization() {
        let s = source(r"
            struct Box<T> {
                value: T;
            }

            def main() -> Int32 {
                val b = new Box<Int32>(7);
                b.value
            }
        ");
        let built = emitted(&s);
        assert_eq!(built.structs.len(), 1);
        assert_eq!(built.structs.values().next().unwrap().name, "Box<Int32>");
    }

    #[test]
    fn test_array_access_infers_element() {
        let s = source("def main() -> Int32 { val a = new Int32[10](0); a[3] }");
        let program = inferred(&s);
        assert_eq!(main_body_ty(&program), Ty::Int { bits: 32 });
    }

    #[test]
    fn test_array_access_on_non_array() {
        let s = source("def main() -> Int32 { val x = 1; x[0] }");
        let errors = inferred_errors(&s);
        assert!(matches!(errors[0], SemaError::CannotInferArrayAccess(_)), "{errors:?}");
    }

    #[test]
    fn test_string_index_is_int8() {
        let s = source(r#"def first() -> Int8 { val s = "abc"; s[0] }"#);
        let program = inferred(&s);
        let f = program.top_levels[0];
        let body = program.funcs[f].body.unwrap();
        assert_eq!(program.exprs[body].ty, Some(Ty::Int { bits: 8 }));
    }

    #[test]
    fn test_lambda_lift() {
        let s = source(r"
            def f(n: Int32) -> Int32 {
                def g() -> Int32 { n + 1 };
                g()
            }

            def main() -> Int32 { f(1) }
        ");
        let ast = parse_one(&s);
        let mut counter = Counter::new(0);
        let mut program = super::declare::declare(&ast, &mut counter).unwrap();
        super::bind::bind(&mut program).unwrap();
        super::infer::infer(&mut program, &mut counter).unwrap();
        assert_eq!(program.top_levels.len(), 2);
        super::lift::lift(&mut program);

        assert_eq!(program.top_levels.len(), 3);
        let g = program.top_levels[2];
        assert_eq!(program.funcs[g].name, "g");
        assert_eq!(program.funcs[g].params.len(), 1);
        assert_eq!(program.funcs[g].params[0].name, "n");

        let mut closure = None;
        let f = program.top_levels[0];
        program.walk(program.funcs[f].body.unwrap(), &mut |e| {
            if let ExprKind::Closure { captured, .. } = program.kind(e) {
                closure = Some(captured.clone());
            }
        });
        let captured = closure.expect("no closure at the definition site");
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0, "n");

        let built = super::mono::monomorphize(&program).unwrap();
        assert_eq!(built.functions.len(), 3);
        let g = built.functions.values().find(|f| f.name == "g").unwrap();
        assert_eq!(g.params.len(), 1);
        assert_eq!(g.params[0].0, "n");
    }

    #[test]
    fn test_nested_def_fully_inferred() {
        let s = source(r"
            def f(n) {
                def g() { n + 1 };
                g()
            }

            def main() -> Int32 { f(1) }
        ");
        let built = emitted(&s);
        assert_eq!(built.functions.len(), 3);
        let f = built.functions.values().find(|f| f.name == "f").unwrap();
        assert_eq!(f.params[0].1, lir::Type::Int(32));
        assert_eq!(f.ret, lir::Type::Int(32));
        let g = built.functions.values().find(|f| f.name == "g").unwrap();
        assert_eq!(g.params.len(), 1);
        assert_eq!(g.params[0].0, "n");
    }

    #[test]
    fn test_pure_cannot_call_impure() {
        let s = source(r#"
            imp puts(String) -> Void;

            def main() -> Int32 {
                puts("hello");
                0
            }
        "#);
        let errors = analyze(&s).unwrap_err();
        assert!(matches!(&errors[0], SemaError::ImpureCall(name, _) if name == "puts"), "{errors:?}");
    }

    #[test]
    fn test_io_can_call_impure() {
        let s = source(r#"
            imp puts(String) -> Void;

            io def main() -> Int32 {
                puts("hello");
                0
            }
        "#);
        let built = emitted(&s);
        assert_eq!(built.externs.len(), 1);
        assert_eq!(built.externs.values().next().unwrap().name, "puts");
    }

    #[test]
    fn test_unbounded_generic_recursion() {
        let s = source(r"
            def f<T>(x: T) -> Int32 { f(new T[1](x)) }

            def main() -> Int32 { f(0) }
        ");
        let errors = analyze(&s).unwrap_err();
        assert!(matches!(&errors[0], SemaError::UnboundedGenericRecursion(name, _) if name == "f"), "{errors:?}");
    }

    #[test]
    fn test_generic_recursion_at_fixed_type_is_fine() {
        let s = source(r"
            def f<T>(x: T, n: Int32) -> Int32 {
                if (n == 0) 0 else f(x, n - 1)
            }

            def main() -> Int32 { f(1, 10) }
        ");
        let built = emitted(&s);
        assert_eq!(built.functions.len(), 2);
    }

    #[test]
    fn test_match_generics_idempotent() {
        let t = Ty::Generic { name: "T".into(), id: 0 };
        let sig = vec![t.clone(), Ty::Array(Box::new(t))];
        let site = vec![Ty::Int { bits: 32 }, Ty::Array(Box::new(Ty::Int { bits: 32 }))];

        let mut bindings = HashMap::new();
        for (s, c) in sig.iter().zip(&site) {
            match_generics(s, c, &mut bindings);
        }
        let applied: Vec<Ty> = sig.iter().map(|s| s.subs(&bindings)).collect();
        assert_eq!(applied, site);

        // applying the derived bindings again changes nothing
        let reapplied: Vec<Ty> = applied.iter().map(|s| s.subs(&bindings)).collect();
        assert_eq!(reapplied, site);
    }

    #[test]
    fn test_type_render_round_trip() {
        let cases = [
            ("Int32", Ty::Int { bits: 32 }),
            ("Array<Int32>", Ty::Array(Box::new(Ty::Int { bits: 32 }))),
            ("Ptr<Int8>", Ty::Ptr(Box::new(Ty::Int { bits: 8 }))),
            ("(Int32, String) -> Bool", Ty::Function {
                params: vec![Ty::Int { bits: 32 }, Ty::String],
                ret: Box::new(Ty::Bool)
            })
        ];
        for (text, expected) in cases {
            assert_eq!(expected.render(), text);
            let program_text = format!("def f(x: {text}) -> Int32 {{ 0 }}");
            let s = source(&program_text);
            let program = inferred(&s);
            let f = program.top_levels[0];
            assert_eq!(program.funcs[f].params[0].ty, expected);
        }
    }

    #[test]
    fn test_every_variable_and_call_bound() {
        let s = source(r"
            def helper(a: Int32) -> Int32 { a * 2 }

            def main() -> Int32 {
                val x = helper(3);
                x + x
            }
        ");
        let ast = parse_one(&s);
        let mut counter = Counter::new(0);
        let mut program = super::declare::declare(&ast, &mut counter).unwrap();
        super::bind::bind(&mut program).unwrap();

        for fkey in program.top_levels.clone() {
            let Some(body) = program.funcs[fkey].body else { continue };
            program.walk(body, &mut |e| {
                match program.kind(e) {
                    ExprKind::Variable { binding, .. } => assert!(binding.is_some()),
                    ExprKind::Call { callee, .. } => assert!(callee.is_some()),
                    _ => {}
                }
            });
        }
    }

    #[test]
    fn test_untyped_parameter_inferred_from_use() {
        let s = source(r"
            def f(n) -> Int32 { n + 1 }

            def main() -> Int32 { f(41) }
        ");
        let program = inferred(&s);
        let f = program.top_levels[0];
        assert_eq!(program.funcs[f].params[0].ty, Ty::Int { bits: 32 });
    }

    #[test]
    fn test_duplicate_definition() {
        let s = source(r"
            def f() -> Int32 { 0 }
            def f() -> Int32 { 1 }
            def main() -> Int32 { f() }
        ");
        let errors = analyze(&s).unwrap_err();
        assert!(matches!(&errors[0], SemaError::Duplicate(name, _, _) if name == "f"));
    }

    #[test]
    fn test_unknown_type() {
        let s = source("def f(x: Whatever) -> Int32 { 0 }");
        let errors = analyze(&s).unwrap_err();
        assert!(matches!(&errors[0], SemaError::UnknownType(name, _) if name == "Whatever"));
    }

    #[test]
    fn test_emitted_while_loop() {
        let s = source(r"
            def main() -> Int32 {
                var i = 0;
                while (i < 10) { i := i + 1 };
                i
            }
        ");
        let built = emitted(&s);
        let main = built.functions.values().next().unwrap();
        assert!(main.body.iter().any(|i| matches!(i, lir::Instruction::While { .. })));
    }
}
