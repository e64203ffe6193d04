use crate::types::{is_generic_type_name, type_name, Type};

/// Ordinary call compatibility: may a value of type `actual` be used where
/// `expected` is required?
///
/// The check is suppressed (returns true) when either side is still
/// unresolved: an error sentinel, a type variable, `auto`, or a placeholder
/// for a named type that has not been lowered yet.
pub fn compatible(expected: &Type, actual: &Type) -> bool {
    if is_unresolved(expected) || is_unresolved(actual) {
        return true;
    }
    match (expected, actual) {
        (Type::Array(e), Type::Array(a)) => compatible(e, a),
        (Type::Generic(e), Type::Generic(a)) => {
            type_name(&e.base) == type_name(&a.base)
                && e.type_args.len() == a.type_args.len()
                && e
                    .type_args
                    .iter()
                    .zip(&a.type_args)
                    .all(|(x, y)| compatible(x, y))
        }
        // A bare nominal type and its own generic application.
        (Type::Generic(g), other @ (Type::Record(_) | Type::Sum(_)))
        | (other @ (Type::Record(_) | Type::Sum(_)), Type::Generic(g)) => {
            type_name(&g.base) == type_name(other)
        }
        (Type::Function(e), Type::Function(a)) => {
            e.params.len() == a.params.len()
                && e
                    .params
                    .iter()
                    .zip(&a.params)
                    .all(|(x, y)| compatible(&x.ty, &y.ty))
                && compatible(&e.ret, &a.ret)
        }
        (Type::Function(_), _) | (_, Type::Function(_)) => false,
        _ => match (type_name(expected), type_name(actual)) {
            (Some(e), Some(a)) => e == a,
            _ => false,
        },
    }
}

fn is_unresolved(ty: &Type) -> bool {
    match ty {
        Type::Error(_) | Type::Variable(_) => true,
        Type::Primitive(name) => name == "auto" || is_generic_type_name(name),
        _ => false,
    }
}
