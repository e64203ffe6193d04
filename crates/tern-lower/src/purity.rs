//! Predicates the effect analyzer is configured with.

use smol_str::SmolStr;
use std::collections::HashSet;
use tern_typeck::{is_numeric, type_name, Type};

use crate::ir::{Expr, ExprKind, PatternKind, StmtKind};

/// Whether evaluating `expr` can have no side effects.
///
/// Calls are pure when the callee is not an I/O function, the call produces
/// a literal type, and every argument is pure. Loops and calls through
/// function-typed locals are never pure.
pub fn is_pure(expr: &Expr, io_functions: &HashSet<SmolStr>) -> bool {
    let pure = |e: &Expr| is_pure(e, io_functions);
    match &expr.kind {
        ExprKind::Lit(_) | ExprKind::Var(_) => true,
        ExprKind::Unary { operand, .. } => is_pure(operand, io_functions),
        ExprKind::Binary { lhs, rhs, .. } => is_pure(lhs, io_functions) && is_pure(rhs, io_functions),
        ExprKind::Call { callee, args, .. } => {
            !io_functions.contains(callee) && !non_literal_type(&expr.ty) && args.iter().all(pure)
        }
        ExprKind::CallLocal { .. } | ExprKind::For { .. } => false,
        ExprKind::Construct { args, .. } | ExprKind::Array(args) => args.iter().all(pure),
        ExprKind::Record { fields, .. } => fields.iter().all(|(_, e)| pure(e)),
        ExprKind::Field { object, .. } => is_pure(object, io_functions),
        ExprKind::Index { object, index } => is_pure(object, io_functions) && is_pure(index, io_functions),
        ExprKind::Block { stmts, result } => {
            stmts.iter().all(|s| match &s.kind {
                StmtKind::Let { value, .. } => pure(value),
                StmtKind::Expr(e) => pure(e),
            }) && result.as_deref().map_or(true, pure)
        }
        ExprKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            is_pure(condition, io_functions)
                && is_pure(then_branch, io_functions)
                && else_branch.as_deref().map_or(true, pure)
        }
        ExprKind::Match {
            scrutinee, arms, ..
        } => {
            is_pure(scrutinee, io_functions)
                && arms.iter().all(|arm| {
                    !matches!(arm.pattern.kind, PatternKind::Regex { .. })
                        && arm.guard.as_ref().map_or(true, pure)
                        && pure(&arm.body)
                })
        }
    }
}

/// Whether values of `ty` cannot be built at compile time. Literal types are
/// the numeric primitives, `bool`, `char`, unit, and records whose fields
/// are all literal.
pub fn non_literal_type(ty: &Type) -> bool {
    match ty {
        Type::Unit => false,
        Type::Primitive(_) => {
            let name = type_name(ty);
            !(is_numeric(ty) || matches!(name.as_deref(), Some("bool" | "char" | "unit")))
        }
        Type::Record(rec) => rec.fields.iter().any(|f| non_literal_type(&f.ty)),
        Type::Variable(_)
        | Type::Array(_)
        | Type::Generic(_)
        | Type::Function(_)
        | Type::Sum(_)
        | Type::Error(_) => true,
    }
}
