use std::rc::Rc;

use crate::types::{normalized_type_name, Type};

/// Deep structural equality between two types.
///
/// Primitives compare by normalized name, type variables by name only
/// (constraints are ignored), records and sums nominally. `Error` is
/// equivalent to nothing, not even itself.
pub fn equivalent(a: &Type, b: &Type) -> bool {
    match (a, b) {
        (Type::Primitive(x), Type::Primitive(y)) => {
            normalized_type_name(x) == normalized_type_name(y)
        }
        (Type::Variable(x), Type::Variable(y)) => x.name == y.name,
        (Type::Array(x), Type::Array(y)) => Rc::ptr_eq(x, y) || equivalent(x, y),
        (Type::Generic(x), Type::Generic(y)) => {
            Rc::ptr_eq(x, y)
                || (equivalent(&x.base, &y.base)
                    && x.type_args.len() == y.type_args.len()
                    && x
                        .type_args
                        .iter()
                        .zip(&y.type_args)
                        .all(|(p, q)| equivalent(p, q)))
        }
        (Type::Function(x), Type::Function(y)) => {
            Rc::ptr_eq(x, y)
                || (x.params.len() == y.params.len()
                    && x
                        .params
                        .iter()
                        .zip(&y.params)
                        .all(|(p, q)| equivalent(&p.ty, &q.ty))
                    && equivalent(&x.ret, &y.ret))
        }
        (Type::Record(x), Type::Record(y)) => Rc::ptr_eq(x, y) || x.name == y.name,
        (Type::Sum(x), Type::Sum(y)) => Rc::ptr_eq(x, y) || x.name == y.name,
        (Type::Unit, Type::Unit) => true,
        (Type::Unit, Type::Primitive(n)) | (Type::Primitive(n), Type::Unit) => {
            normalized_type_name(n) == "unit"
        }
        _ => false,
    }
}

/// Equivalence over possibly-absent types: absence on either side is never equivalent.
pub fn equivalent_opt(a: Option<&Type>, b: Option<&Type>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => equivalent(a, b),
        _ => false,
    }
}
