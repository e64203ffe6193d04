use super::*;
use crate::context::LoweringContext;
use crate::ir::{Expr, ExprKind, MatchArm, Pattern, PatternKind};
use crate::scope::{OriginGuard, ScopeGuard, TypeParamGuard};
use smol_str::SmolStr;
use std::collections::HashSet;
use tern_ast::{AstBuilder, BinOp, Literal, Origin};
use tern_typeck::{Field, Type, TypeError, TypeParam, TypeResult};

fn io() -> HashSet<SmolStr> {
    LowerConfig::default().io_functions
}

fn int(n: i64) -> Expr {
    Expr::new(ExprKind::Lit(Literal::Int(n)), Type::i32(), None)
}

fn call(callee: &str, args: Vec<Expr>, ty: Type) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: callee.into(),
            args,
            type_args: vec![],
        },
        ty,
        None,
    )
}

fn option_decl(b: &mut AstBuilder) {
    let t = b.ty("T");
    b.sum_type("Option", &["T"], vec![("Some", vec![t]), ("None", vec![])]);
}

// ── Scope guards ─────────────────────────────────────────────────

#[test]
fn scope_guard_restores_bindings() {
    let mut ctx = LoweringContext::default();
    ctx.vars.insert("x".into(), Type::i32());
    {
        let mut scope = ScopeGuard::new(&mut ctx);
        scope.bind("x", Type::string());
        scope.bind("y", Type::bool());
        assert_eq!(scope.vars.get("x"), Some(&Type::string()));
        assert_eq!(scope.vars.len(), 2);
    }
    assert_eq!(ctx.vars.get("x"), Some(&Type::i32()));
    assert!(!ctx.vars.contains_key("y"));
}

#[test]
fn nested_scopes_unwind_in_order() {
    let mut ctx = LoweringContext::default();
    {
        let mut outer = ScopeGuard::new(&mut ctx);
        outer.bind("a", Type::i32());
        {
            let mut inner = ScopeGuard::new(&mut outer);
            inner.bind("b", Type::bool());
            assert!(inner.vars.contains_key("a"));
        }
        assert!(outer.vars.contains_key("a"));
        assert!(!outer.vars.contains_key("b"));
    }
    assert!(ctx.vars.is_empty());
}

fn lookup_in_scope(ctx: &mut LoweringContext, name: &str) -> TypeResult<Type> {
    let mut scope = ScopeGuard::new(ctx);
    scope.bind("tmp", Type::i32());
    let ty = scope
        .vars
        .get(name)
        .cloned()
        .ok_or_else(|| TypeError::unknown(format!("undefined variable '{}'", name)))?;
    Ok(ty)
}

#[test]
fn scope_guard_restores_on_early_return() {
    let mut ctx = LoweringContext::default();
    let err = lookup_in_scope(&mut ctx, "missing").unwrap_err();
    assert_eq!(err.message(), "undefined variable 'missing'");
    assert!(ctx.vars.is_empty());

    assert_eq!(lookup_in_scope(&mut ctx, "tmp").unwrap(), Type::i32());
    assert!(ctx.vars.is_empty());
}

#[test]
fn type_param_guard_restores_the_enclosing_params() {
    let mut ctx = LoweringContext::default();
    ctx.type_params.insert("T".into(), TypeParam::new("T"));
    {
        let inner = TypeParamGuard::new(&mut ctx, &[TypeParam::new("U")]);
        assert!(inner.type_params.contains_key("U"));
        assert!(!inner.type_params.contains_key("T"));
    }
    assert_eq!(ctx.type_params.len(), 1);
    assert!(ctx.type_params.contains_key("T"));
}

// ── Origins ──────────────────────────────────────────────────────

#[test]
fn origin_guard_pushes_and_pops() {
    let mut ctx = LoweringContext::default();
    let outer = Origin::new("demo.tern", 2, 4);
    {
        let mut guard = OriginGuard::new(&mut ctx, Some(&outer));
        {
            let inner = OriginGuard::new(&mut guard, None);
            assert_eq!(inner.origins.current(), Some(&outer));
            assert_eq!(inner.origins.depth(), 1);
        }
        let err = guard.origins.annotate(TypeError::unknown("undefined variable 'x'"));
        assert_eq!(err.origin(), Some(&outer));
    }
    assert_eq!(ctx.origins.depth(), 0);
    assert_eq!(ctx.origins.current(), None);
}

#[test]
fn annotate_keeps_the_innermost_origin() {
    let mut ctx = LoweringContext::default();
    let outer = Origin::new("demo.tern", 1, 1);
    let inner = Origin::new("demo.tern", 9, 2);
    let guard = OriginGuard::new(&mut ctx, Some(&outer));
    let err = TypeError::unknown("x").or_origin(Some(&inner));
    assert_eq!(guard.origins.annotate(err).origin(), Some(&inner));
}

// ── Purity ───────────────────────────────────────────────────────

#[test]
fn arithmetic_on_literals_is_pure() {
    let sum = Expr::new(
        ExprKind::Binary {
            op: BinOp::Add,
            lhs: Box::new(int(1)),
            rhs: Box::new(int(2)),
        },
        Type::i32(),
        None,
    );
    assert!(is_pure(&sum, &io()));
}

#[test]
fn io_and_non_literal_calls_are_impure() {
    let print = call("println", vec![int(1)], Type::Unit);
    assert!(!is_pure(&print, &io()));

    let name = call("name_of", vec![int(1)], Type::string());
    assert!(!is_pure(&name, &io()));

    let square = call("square", vec![int(3)], Type::i32());
    assert!(is_pure(&square, &io()));

    let nested = call("square", vec![print], Type::i32());
    assert!(!is_pure(&nested, &io()));
}

#[test]
fn loops_and_local_calls_are_impure() {
    let looped = Expr::new(
        ExprKind::For {
            var: "x".into(),
            iterable: Box::new(Expr::new(ExprKind::Array(vec![int(1)]), Type::array(Type::i32()), None)),
            body: Box::new(int(0)),
        },
        Type::Unit,
        None,
    );
    assert!(!is_pure(&looped, &io()));

    let local = Expr::new(
        ExprKind::CallLocal {
            callee: "f".into(),
            args: vec![],
        },
        Type::i32(),
        None,
    );
    assert!(!is_pure(&local, &io()));
}

#[test]
fn regex_arms_make_a_match_impure() {
    let arm = |kind: PatternKind| MatchArm {
        pattern: Pattern {
            kind,
            ty: Type::string(),
        },
        guard: None,
        body: int(0),
    };
    let scrutinee = Expr::new(ExprKind::Var("s".into()), Type::string(), None);
    let with_regex = Expr::new(
        ExprKind::Match {
            scrutinee: Box::new(scrutinee.clone()),
            arms: vec![
                arm(PatternKind::Regex {
                    pattern: "a+".into(),
                    bindings: vec![],
                }),
                arm(PatternKind::Wildcard),
            ],
            coverage: None,
        },
        Type::i32(),
        None,
    );
    assert!(!is_pure(&with_regex, &io()));

    let plain = Expr::new(
        ExprKind::Match {
            scrutinee: Box::new(scrutinee),
            arms: vec![arm(PatternKind::Wildcard)],
            coverage: None,
        },
        Type::i32(),
        None,
    );
    assert!(is_pure(&plain, &io()));
}

#[test]
fn literal_types() {
    assert!(!non_literal_type(&Type::i32()));
    assert!(!non_literal_type(&Type::primitive("f32")));
    assert!(!non_literal_type(&Type::bool()));
    assert!(!non_literal_type(&Type::primitive("char")));
    assert!(!non_literal_type(&Type::Unit));
    assert!(non_literal_type(&Type::string()));
    assert!(non_literal_type(&Type::array(Type::i32())));
    assert!(non_literal_type(&Type::var("T")));

    let point = Type::record("Point", vec![Field::new("x", Type::i32()), Field::new("y", Type::i32())]);
    assert!(!non_literal_type(&point));
    let named = Type::record("Named", vec![Field::new("name", Type::string())]);
    assert!(non_literal_type(&named));
}

// ── Pipeline state ───────────────────────────────────────────────

#[test]
fn forward_reference_revises_signature() {
    let mut b = AstBuilder::new("demo");
    let point = b.ty("Point");
    let zero_x = b.int(0);
    let zero_y = b.int(0);
    let body = b.record("Point", vec![("x", zero_x), ("y", zero_y)]);
    b.func("origin", &[], vec![], Some(point), Some(body));
    let i32_x = b.ty("i32");
    let i32_y = b.ty("i32");
    b.record_type("Point", &[], vec![("x", i32_x), ("y", i32_y)]);
    let module = b.finish();

    let mut pipeline = Pipeline::new(&module, LowerConfig::default());
    let lowered = pipeline.lower_module().unwrap();
    assert_eq!(lowered.items.len(), 2);

    // Placeholder, refreshed on first use, then the version with effects.
    let versions = pipeline.ctx.functions.versions("origin");
    assert_eq!(versions.len(), 3);
    assert_eq!(versions[2].ret_type, Type::Primitive("Point".into()));
    assert!(versions[1].ret_type.as_record().is_some());
    assert!(versions[1].effects.is_empty());
    assert!(!versions[0].effects.is_empty());
    assert!(pipeline.ctx.lowered_types.is_empty());
}

#[test]
fn failing_arm_leaves_no_bindings_behind() {
    let mut b = AstBuilder::new("demo");
    option_decl(&mut b);
    let i32_ty = b.ty("i32");
    let opt = b.ty_app("Option", vec![i32_ty]);
    let ret = b.ty("i32");
    let scrutinee = b.var("o");
    let x_pat = b.pat_var("x");
    let some = b.pat_ctor("Some", vec![x_pat]);
    let x = b.var("x");
    let none = b.pat_ctor("None", vec![]);
    let missing = b.var("y");
    let arms = vec![b.arm(some, x), b.arm(none, missing)];
    let body = b.match_expr(scrutinee, arms);
    b.func("f", &[("T", None)], vec![("o", opt)], Some(ret), Some(body));
    let module = b.finish();

    let mut pipeline = Pipeline::new(&module, LowerConfig::default());
    let err = pipeline.lower_module().unwrap_err();
    assert_eq!(err.message(), "undefined variable 'y'");
    assert!(pipeline.ctx.vars.is_empty());
    assert!(pipeline.ctx.type_params.is_empty());
    assert_eq!(pipeline.ctx.origins.depth(), 0);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Num {
        Int(i64),
        Float(f64),
        Op(BinOp, Box<Num>, Box<Num>),
    }

    impl Num {
        fn has_float(&self) -> bool {
            match self {
                Num::Int(_) => false,
                Num::Float(_) => true,
                Num::Op(_, l, r) => l.has_float() || r.has_float(),
            }
        }

        fn build(&self, b: &mut AstBuilder) -> tern_ast::ExprId {
            match self {
                Num::Int(n) => b.int(*n),
                Num::Float(x) => b.float(*x),
                Num::Op(op, l, r) => {
                    let lhs = l.build(b);
                    let rhs = r.build(b);
                    b.binary(*op, lhs, rhs)
                }
            }
        }
    }

    fn num() -> impl Strategy<Value = Num> {
        let leaf = prop_oneof![
            any::<i32>().prop_map(|n| Num::Int(i64::from(n))),
            (-1.0e6f64..1.0e6).prop_map(Num::Float),
        ];
        leaf.prop_recursive(4, 32, 2, |inner| {
            (
                prop_oneof![Just(BinOp::Add), Just(BinOp::Sub), Just(BinOp::Mul)],
                inner.clone(),
                inner,
            )
                .prop_map(|(op, l, r)| Num::Op(op, Box::new(l), Box::new(r)))
        })
    }

    proptest! {
        #[test]
        fn arithmetic_widens_toward_float(expr in num()) {
            let mut b = AstBuilder::new("calc");
            let body = expr.build(&mut b);
            b.func("calc", &[], vec![], None, Some(body));
            let module = b.finish();

            let lowered = lower(&module, &LowerConfig::default()).unwrap();
            let func = lowered.func("calc").unwrap();
            let expected = if expr.has_float() { Type::f64() } else { Type::i32() };
            prop_assert_eq!(&func.ret_type, &expected);
            prop_assert!(func.effects.contains(tern_typeck::Effect::Constexpr));
        }
    }
}
