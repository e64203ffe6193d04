use crate::equiv::equivalent;
use crate::subst::Substitution;
use crate::types::{is_float, is_numeric, type_name, Type};

/// Structural mismatch found while unifying. Internal to inference: the
/// solver decides whether it becomes a user-facing diagnostic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot unify {pattern} with {actual}")]
pub struct UnifyError {
    pub pattern: Type,
    pub actual: Type,
}

impl UnifyError {
    fn new(pattern: &Type, actual: &Type) -> Self {
        Self {
            pattern: pattern.clone(),
            actual: actual.clone(),
        }
    }
}

/// Compute bindings that make `pattern` equal to `actual`, extending
/// `existing`. Only variables in `pattern` are bound; `existing` is never
/// modified, the extended map is returned.
pub fn unify(pattern: &Type, actual: &Type, existing: &Substitution) -> Result<Substitution, UnifyError> {
    tracing::trace!(%pattern, %actual, "unify");
    match (pattern, actual) {
        (Type::Variable(v), _) => match existing.get(&v.name) {
            Some(bound) => {
                if matches!(actual, Type::Variable(_)) {
                    return Ok(existing.clone());
                }
                if equivalent(bound, actual) {
                    return Ok(existing.clone());
                }
                if is_numeric(bound) && is_numeric(actual) {
                    let mut subst = existing.clone();
                    subst.insert(v.name.clone(), widen_numeric(bound, actual));
                    return Ok(subst);
                }
                Err(UnifyError::new(bound, actual))
            }
            None => {
                let mut subst = existing.clone();
                if !matches!(actual, Type::Variable(a) if a.name == v.name) {
                    subst.insert(v.name.clone(), actual.clone());
                }
                Ok(subst)
            }
        },

        (Type::Array(p), Type::Array(a)) => unify(p, a, existing),
        (Type::Array(_), _) => Err(UnifyError::new(pattern, actual)),

        (Type::Generic(p), Type::Generic(a)) => {
            if !equivalent(&p.base, &a.base) || p.type_args.len() != a.type_args.len() {
                return Err(UnifyError::new(pattern, actual));
            }
            // Each argument is unified against the incoming map; the new
            // bindings are merged afterwards and must agree with each other.
            let mut merged = existing.clone();
            for (pa, aa) in p.type_args.iter().zip(&a.type_args) {
                let found = unify(pa, aa, existing)?;
                for (name, ty) in found {
                    if existing.get(&name) == Some(&ty) {
                        continue;
                    }
                    match merged.get(&name) {
                        Some(prev) if existing.get(&name) != Some(prev) => {
                            if !equivalent(prev, &ty) {
                                return Err(UnifyError::new(pattern, actual));
                            }
                        }
                        _ => {
                            merged.insert(name, ty);
                        }
                    }
                }
            }
            Ok(merged)
        }

        _ if equivalent(pattern, actual) => Ok(existing.clone()),
        _ => Err(UnifyError::new(pattern, actual)),
    }
}

/// The representative for two compatible numeric types: floating point wins
/// over integer, the wider float wins over the narrower, and between two
/// integers the existing binding is kept.
pub fn widen_numeric(existing: &Type, incoming: &Type) -> Type {
    match (is_float(existing), is_float(incoming)) {
        (false, true) => incoming.clone(),
        (true, true) if type_name(incoming).as_deref() == Some("f64") => incoming.clone(),
        _ => existing.clone(),
    }
}
