use tern_ast::{AstBuilder, BinOp, ExprId, Literal, MatchArm, UnaryOp};
use tern_lower::{lower, Event, LowerConfig, Pipeline};

/// Lower and return the error message.
fn check_err(b: AstBuilder) -> String {
    let module = b.finish();
    lower(&module, &LowerConfig::default())
        .expect_err("expected a type error, lowering succeeded")
        .to_string()
}

/// Lower and return `origin: message`.
fn check_err_at(b: AstBuilder) -> String {
    let module = b.finish();
    let err = lower(&module, &LowerConfig::default()).expect_err("expected a type error, lowering succeeded");
    match err.origin() {
        Some(origin) => format!("{}: {}", origin, err),
        None => err.to_string(),
    }
}

/// Lower and return the diagnostic events, ignoring progress events.
fn diagnostic_events(b: AstBuilder) -> Vec<Event> {
    let module = b.finish();
    let mut events: Vec<Event> = Vec::new();
    let result = Pipeline::new(&module, LowerConfig::default())
        .with_event_sink(&mut events)
        .run();
    assert!(result.is_err(), "expected a type error, lowering succeeded");
    events
        .into_iter()
        .filter(|e| matches!(e, Event::TypeMismatch { .. } | Event::NonExhaustive { .. }))
        .collect()
}

fn option_decl(b: &mut AstBuilder) {
    let t = b.ty("T");
    b.sum_type("Option", &["T"], vec![("Some", vec![t]), ("None", vec![])]);
}

fn color_decl(b: &mut AstBuilder) {
    b.sum_type("Color", &[], vec![("Red", vec![]), ("Green", vec![])]);
}

fn point_decl(b: &mut AstBuilder) {
    let x = b.ty("i32");
    let y = b.ty("i32");
    b.record_type("Point", &[], vec![("x", x), ("y", y)]);
}

/// `fn takes(x: i32) -> i32 = x`
fn takes_decl(b: &mut AstBuilder) {
    let x_ty = b.ty("i32");
    let ret = b.ty("i32");
    let x = b.var("x");
    b.func("takes", &[], vec![("x", x_ty)], Some(ret), Some(x));
}

/// `fn f() = <body>`
fn body_fn(b: &mut AstBuilder, body: ExprId) {
    b.func("f", &[], vec![], None, Some(body));
}

/// `fn f(o: Option<i32>) = match o { <arms> }`
fn match_option(b: &mut AstBuilder, arms: impl FnOnce(&mut AstBuilder) -> Vec<MatchArm>) {
    option_decl(b);
    let i32_ty = b.ty("i32");
    let opt_ty = b.ty_app("Option", vec![i32_ty]);
    let o = b.var("o");
    let arms = arms(&mut *b);
    let body = b.match_expr(o, arms);
    b.func("f", &[], vec![("o", opt_ty)], None, Some(body));
}

/// `fn f(p: Point) = match p { <pat> => 0 }`
fn match_point(b: &mut AstBuilder, pat: impl FnOnce(&mut AstBuilder) -> tern_ast::PatternId) {
    point_decl(b);
    let p_ty = b.ty("Point");
    let p = b.var("p");
    let pat = pat(&mut *b);
    let zero = b.int(0);
    let arms = vec![b.arm(pat, zero)];
    let body = b.match_expr(p, arms);
    b.func("f", &[], vec![("p", p_ty)], None, Some(body));
}

/// `fn f(n: i32) = match n { <pat> => 0, _ => 1 }`
fn match_int(b: &mut AstBuilder, pat: impl FnOnce(&mut AstBuilder) -> tern_ast::PatternId) {
    let n_ty = b.ty("i32");
    let n = b.var("n");
    let pat = pat(&mut *b);
    let zero = b.int(0);
    let rest = b.pat_wildcard();
    let one = b.int(1);
    let arms = vec![b.arm(pat, zero), b.arm(rest, one)];
    let body = b.match_expr(n, arms);
    b.func("f", &[], vec![("n", n_ty)], None, Some(body));
}

// ── Origins ──────────────────────────────────────────────────────

#[test]
fn return_value_mismatch() {
    let mut b = AstBuilder::new("demo");
    b.at(2, 14);
    let s = b.string("s");
    b.at(2, 1);
    let ret = b.ty("i32");
    b.func("f", &[], vec![], Some(ret), Some(s));
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:2:1: type mismatch: expected i32, got string (return value of 'f')");
}

#[test]
fn argument_mismatch_points_at_the_call() {
    let mut b = AstBuilder::new("demo");
    takes_decl(&mut b);
    b.at(3, 9);
    let no = b.string("no");
    b.at(3, 3);
    let call = b.call("takes", vec![no]);
    b.at(3, 1);
    b.func("main", &[], vec![], None, Some(call));
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:3:3: type mismatch: expected i32, got string (argument 1 of 'takes')");
}

#[test]
fn undefined_names() {
    let mut b = AstBuilder::new("demo");
    b.at(4, 7);
    let y = b.var("y");
    b.at(4, 1);
    body_fn(&mut b, y);
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:4:7: undefined variable 'y'");

    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let call = b.call("nope", vec![one]);
    body_fn(&mut b, call);
    insta::assert_snapshot!(check_err(b), @"undefined function 'nope'");
}

#[test]
fn unknown_type_points_at_the_annotation() {
    let mut b = AstBuilder::new("demo");
    b.at(2, 12);
    let missing = b.ty("Missing");
    b.at(2, 1);
    b.func("g", &[], vec![("x", missing)], None, None);
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:2:12: unknown type 'Missing'");
}

#[test]
fn mismatched_arm_points_at_the_arm() {
    let mut b = AstBuilder::new("demo");
    match_option(&mut b, |b| {
        b.at(5, 5);
        let x_pat = b.pat_var("x");
        let some = b.pat_ctor("Some", vec![x_pat]);
        let x = b.var("x");
        let first = b.arm(some, x);
        b.at(6, 5);
        let none = b.pat_ctor("None", vec![]);
        let text = b.string("none");
        vec![first, b.arm(none, text)]
    });
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:6:5: type mismatch: expected i32, got string (match arm 2)");
}

#[test]
fn non_exhaustive_points_at_the_match() {
    let mut b = AstBuilder::new("demo");
    option_decl(&mut b);
    let i32_ty = b.ty("i32");
    let opt_ty = b.ty_app("Option", vec![i32_ty]);
    let o = b.var("o");
    let x_pat = b.pat_var("x");
    let some = b.pat_ctor("Some", vec![x_pat]);
    let x = b.var("x");
    let arms = vec![b.arm(some, x)];
    b.at(4, 3);
    let body = b.match_expr(o, arms);
    b.at(4, 1);
    b.func("get", &[], vec![("o", opt_ty)], None, Some(body));
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:4:3: non-exhaustive match on 'Option': missing variants: None");
}

// ── Events ───────────────────────────────────────────────────────

#[test]
fn mismatch_is_reported_once() {
    let mut b = AstBuilder::new("demo");
    takes_decl(&mut b);
    let no = b.string("no");
    b.at(3, 3);
    let call = b.call("takes", vec![no]);
    body_fn(&mut b, call);
    let events = diagnostic_events(b);
    assert_eq!(
        events,
        vec![Event::TypeMismatch {
            message: "type mismatch: expected i32, got string (argument 1 of 'takes')".to_string(),
            origin: Some(tern_ast::Origin::new("demo.tern", 3, 3)),
        }]
    );
}

#[test]
fn mismatch_inside_an_arm_is_reported_once() {
    let mut b = AstBuilder::new("demo");
    takes_decl(&mut b);
    match_option(&mut b, |b| {
        let x_pat = b.pat_var("x");
        let some = b.pat_ctor("Some", vec![x_pat]);
        let text = b.string("x");
        let call = b.call("takes", vec![text]);
        let none = b.pat_ctor("None", vec![]);
        let zero = b.int(0);
        vec![b.arm(some, call), b.arm(none, zero)]
    });
    let events = diagnostic_events(b);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], Event::TypeMismatch { message, .. } if message.contains("argument 1 of 'takes'")));
}

#[test]
fn non_exhaustive_is_reported_as_an_event() {
    let mut b = AstBuilder::new("demo");
    match_option(&mut b, |b| {
        let none = b.pat_ctor("None", vec![]);
        let zero = b.int(0);
        vec![b.arm(none, zero)]
    });
    let events = diagnostic_events(b);
    assert_eq!(events.len(), 1);
    let Event::NonExhaustive { message, .. } = &events[0] else {
        panic!("expected a non-exhaustive event, got {:?}", events[0]);
    };
    insta::assert_snapshot!(message, @"non-exhaustive match on 'Option': missing variants: Some");
}

#[test]
fn other_errors_raise_no_events() {
    let mut b = AstBuilder::new("demo");
    let y = b.var("y");
    body_fn(&mut b, y);
    assert!(diagnostic_events(b).is_empty());
}

// ── Declarations ─────────────────────────────────────────────────

#[test]
fn duplicate_declarations() {
    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    body_fn(&mut b, one);
    b.at(5, 1);
    let two = b.int(2);
    body_fn(&mut b, two);
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:5:1: function 'f' is already defined");

    let mut b = AstBuilder::new("demo");
    color_decl(&mut b);
    b.at(7, 1);
    color_decl(&mut b);
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:7:1: type 'Color' is already defined");

    let mut b = AstBuilder::new("demo");
    b.sum_type("T", &[], vec![("A", vec![]), ("A", vec![])]);
    insta::assert_snapshot!(check_err(b), @"variant 'A' is declared twice in type 'T'");

    let mut b = AstBuilder::new("demo");
    let x = b.ty("i32");
    let x_again = b.ty("f64");
    b.record_type("P", &[], vec![("x", x), ("x", x_again)]);
    insta::assert_snapshot!(check_err(b), @"field 'x' is declared twice in record 'P'");
}

#[test]
fn recursive_type_aliases() {
    let mut b = AstBuilder::new("demo");
    b.at(1, 1);
    let a = b.ty("A");
    let nested = b.ty_array(a);
    b.alias_type("A", &[], nested);
    b.at(2, 1);
    let a = b.ty("A");
    let ret = b.ty("i32");
    let one = b.int(1);
    b.func("f", &[], vec![("x", a)], Some(ret), Some(one));
    insta::assert_snapshot!(check_err_at(b), @"demo.tern:1:1: type alias 'A' refers to itself");

    // Reached ahead of its declaration through a signature.
    let mut b = AstBuilder::new("demo");
    let a = b.ty("A");
    let one = b.int(1);
    b.func("f", &[], vec![("x", a)], None, Some(one));
    let a = b.ty("A");
    let nested = b.ty_array(a);
    b.alias_type("A", &[], nested);
    insta::assert_snapshot!(check_err(b), @"type alias 'A' refers to itself");

    let mut b = AstBuilder::new("demo");
    let to_b = b.ty("B");
    let left = b.ty_array(to_b);
    b.alias_type("A", &[], left);
    let to_a = b.ty("A");
    let right = b.ty_array(to_a);
    b.alias_type("B", &[], right);
    insta::assert_snapshot!(check_err(b), @"type alias 'B' refers to itself");
}

#[test]
fn type_argument_counts() {
    let mut b = AstBuilder::new("demo");
    option_decl(&mut b);
    let bare = b.ty("Option");
    b.func("g", &[], vec![("o", bare)], None, None);
    insta::assert_snapshot!(check_err(b), @"type 'Option' expects 1 type argument(s), got 0");

    let mut b = AstBuilder::new("demo");
    let arg = b.ty("bool");
    let applied = b.ty_app("i32", vec![arg]);
    b.func("g", &[], vec![("x", applied)], None, None);
    insta::assert_snapshot!(check_err(b), @"type 'i32' expects 0 type argument(s), got 1");

    let mut b = AstBuilder::new("demo");
    let a = b.ty("i32");
    let c = b.ty("i32");
    let pair = b.ty_app("Array", vec![a, c]);
    b.func("g", &[], vec![("xs", pair)], None, None);
    insta::assert_snapshot!(check_err(b), @"type 'Array' expects 1 type argument(s), got 2");
}

// ── Calls ────────────────────────────────────────────────────────

#[test]
fn call_arity() {
    let mut b = AstBuilder::new("demo");
    takes_decl(&mut b);
    let one = b.int(1);
    let two = b.int(2);
    let call = b.call("takes", vec![one, two]);
    body_fn(&mut b, call);
    insta::assert_snapshot!(check_err(b), @"function 'takes' expects 1 argument(s), got 2");

    let mut b = AstBuilder::new("demo");
    option_decl(&mut b);
    let one = b.int(1);
    let two = b.int(2);
    let call = b.call("Some", vec![one, two]);
    body_fn(&mut b, call);
    insta::assert_snapshot!(check_err(b), @"constructor 'Some' expects 1 field(s), got 2");
}

#[test]
fn calling_a_non_function() {
    let mut b = AstBuilder::new("demo");
    let x_ty = b.ty("i32");
    let one = b.int(1);
    let call = b.call("x", vec![one]);
    b.func("f", &[], vec![("x", x_ty)], None, Some(call));
    insta::assert_snapshot!(check_err(b), @"'x' is not a function (type i32)");
}

// ── Operators ────────────────────────────────────────────────────

#[test]
fn operator_operands() {
    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let yes = b.boolean(true);
    let sum = b.binary(BinOp::Add, one, yes);
    body_fn(&mut b, sum);
    insta::assert_snapshot!(check_err(b), @"operator '+' expects numeric operands, got i32 and bool");

    let mut b = AstBuilder::new("demo");
    let yes = b.boolean(true);
    let neg = b.unary(UnaryOp::Neg, yes);
    body_fn(&mut b, neg);
    insta::assert_snapshot!(check_err(b), @"operator '-' expects a numeric operand, got bool");

    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let not = b.unary(UnaryOp::Not, one);
    body_fn(&mut b, not);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected bool, got i32 (operator '!')");

    let mut b = AstBuilder::new("demo");
    let yes = b.boolean(true);
    let one = b.int(1);
    let and = b.binary(BinOp::And, yes, one);
    body_fn(&mut b, and);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected bool, got i32 (operator '&&')");

    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let text = b.string("1");
    let eq = b.binary(BinOp::Eq, one, text);
    body_fn(&mut b, eq);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got string (operator '==')");
}

// ── Records, arrays and control flow ─────────────────────────────

#[test]
fn record_literals() {
    let record = |fields: &[&str]| {
        let mut b = AstBuilder::new("demo");
        point_decl(&mut b);
        let values: Vec<(&str, ExprId)> = fields.iter().map(|&name| (name, b.int(1))).collect();
        let lit = b.record("Point", values);
        body_fn(&mut b, lit);
        check_err(b)
    };
    insta::assert_snapshot!(record(&["x"]), @"record 'Point' is missing field 'y'");
    insta::assert_snapshot!(record(&["x", "y", "z"]), @"record 'Point' has no field 'z'");
    insta::assert_snapshot!(record(&["x", "x", "y"]), @"field 'x' is given twice in record 'Point'");

    let mut b = AstBuilder::new("demo");
    color_decl(&mut b);
    let lit = b.record("Color", vec![]);
    body_fn(&mut b, lit);
    insta::assert_snapshot!(check_err(b), @"type 'Color' is not a record");

    let mut b = AstBuilder::new("demo");
    let lit = b.record("Nope", vec![]);
    body_fn(&mut b, lit);
    insta::assert_snapshot!(check_err(b), @"unknown type 'Nope'");
}

#[test]
fn field_access() {
    let mut b = AstBuilder::new("demo");
    point_decl(&mut b);
    let p_ty = b.ty("Point");
    let p = b.var("p");
    let z = b.field(p, "z");
    b.func("f", &[], vec![("p", p_ty)], None, Some(z));
    insta::assert_snapshot!(check_err(b), @"no field 'z' on type Point");
}

#[test]
fn arrays_and_loops() {
    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let text = b.string("a");
    let array = b.array(vec![one, text]);
    body_fn(&mut b, array);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got string (array element 2)");

    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let zero = b.int(0);
    let index = b.index(one, zero);
    body_fn(&mut b, index);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected Array, got i32 (indexed value)");

    let mut b = AstBuilder::new("demo");
    let elem = b.ty("i32");
    let xs_ty = b.ty_array(elem);
    let xs = b.var("xs");
    let key = b.string("a");
    let index = b.index(xs, key);
    b.func("f", &[], vec![("xs", xs_ty)], None, Some(index));
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected integer, got string (array index)");

    let mut b = AstBuilder::new("demo");
    let five = b.int(5);
    let x = b.var("x");
    let looped = b.for_loop("x", five, x);
    body_fn(&mut b, looped);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected Array, got i32 (for loop iterable)");
}

#[test]
fn conditions_and_bindings() {
    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let two = b.int(2);
    let three = b.int(3);
    let cond = b.if_else(one, two, Some(three));
    body_fn(&mut b, cond);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected bool, got i32 (if condition)");

    let mut b = AstBuilder::new("demo");
    let yes = b.boolean(true);
    let one = b.int(1);
    let text = b.string("s");
    let cond = b.if_else(yes, one, Some(text));
    body_fn(&mut b, cond);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got string (else branch)");

    let mut b = AstBuilder::new("demo");
    let ann = b.ty("i32");
    let text = b.string("s");
    let binding = b.let_stmt("x", Some(ann), text);
    let x = b.var("x");
    let block = b.block(vec![binding], Some(x));
    body_fn(&mut b, block);
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got string (let binding 'x')");
}

// ── Patterns ─────────────────────────────────────────────────────

#[test]
fn constructor_patterns() {
    let mut b = AstBuilder::new("demo");
    color_decl(&mut b);
    match_option(&mut b, |b| {
        let red = b.pat_ctor("Red", vec![]);
        let zero = b.int(0);
        vec![b.arm(red, zero)]
    });
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected Option<i32>, got Color (constructor pattern 'Red')");

    let mut b = AstBuilder::new("demo");
    match_option(&mut b, |b| {
        let nope = b.pat_ctor("Nope", vec![]);
        let zero = b.int(0);
        vec![b.arm(nope, zero)]
    });
    insta::assert_snapshot!(check_err(b), @"unknown constructor 'Nope'");

    let mut b = AstBuilder::new("demo");
    match_option(&mut b, |b| {
        let x = b.pat_var("x");
        let y = b.pat_var("y");
        let some = b.pat_ctor("Some", vec![x, y]);
        let zero = b.int(0);
        vec![b.arm(some, zero)]
    });
    insta::assert_snapshot!(check_err(b), @"constructor 'Some' expects 1 field(s), got 2");
}

#[test]
fn guarded_arms_do_not_prove_coverage() {
    let mut b = AstBuilder::new("demo");
    match_option(&mut b, |b| {
        let x_pat = b.pat_var("x");
        let some = b.pat_ctor("Some", vec![x_pat]);
        let x = b.var("x");
        let zero = b.int(0);
        let positive = b.binary(BinOp::Gt, x, zero);
        let x = b.var("x");
        let guarded = b.guarded_arm(some, positive, x);
        let none = b.pat_ctor("None", vec![]);
        let zero = b.int(0);
        vec![guarded, b.arm(none, zero)]
    });
    insta::assert_snapshot!(check_err(b), @"non-exhaustive match on 'Option': missing variants: Some");

    let mut b = AstBuilder::new("demo");
    match_option(&mut b, |b| {
        let rest = b.pat_wildcard();
        let one = b.int(1);
        let zero = b.int(0);
        vec![b.guarded_arm(rest, one, zero)]
    });
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected bool, got i32 (match guard)");
}

#[test]
fn patterns_against_the_scrutinee_type() {
    let mut b = AstBuilder::new("demo");
    match_int(&mut b, |b| b.pat_lit(Literal::String("a".into())));
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got string (literal pattern)");

    let mut b = AstBuilder::new("demo");
    match_int(&mut b, |b| b.pat_regex("[0-9]+", &[]));
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got string (regex pattern)");

    let mut b = AstBuilder::new("demo");
    match_int(&mut b, |b| {
        let x = b.pat_var("x");
        b.pat_array(vec![x], None)
    });
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got Array (array pattern)");

    let mut b = AstBuilder::new("demo");
    match_int(&mut b, |b| {
        let x = b.pat_var("x");
        b.pat_tuple(vec![x])
    });
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected i32, got a record (tuple pattern)");
}

#[test]
fn record_and_tuple_patterns() {
    let mut b = AstBuilder::new("demo");
    match_point(&mut b, |b| {
        let elems = vec![b.pat_wildcard(), b.pat_wildcard(), b.pat_wildcard()];
        b.pat_tuple(elems)
    });
    insta::assert_snapshot!(check_err(b), @"tuple pattern on Point expects 2 field(s), got 3");

    let mut b = AstBuilder::new("demo");
    match_point(&mut b, |b| {
        let w = b.pat_wildcard();
        b.pat_record("Other", vec![("x", w)])
    });
    insta::assert_snapshot!(check_err(b), @"type mismatch: expected Point, got Other (record pattern)");

    let mut b = AstBuilder::new("demo");
    match_point(&mut b, |b| {
        let w = b.pat_wildcard();
        b.pat_record("Point", vec![("z", w)])
    });
    insta::assert_snapshot!(check_err(b), @"record 'Point' has no field 'z'");
}

#[test]
fn empty_match_is_an_internal_error() {
    let mut b = AstBuilder::new("demo");
    let one = b.int(1);
    let body = b.match_expr(one, vec![]);
    body_fn(&mut b, body);
    insta::assert_snapshot!(check_err(b), @"internal compiler error: match on i32 has no arms");
}
