use crate::defs::TypeParam;
use crate::subst::Substitution;
use crate::types::{type_name, Type};

/// Recover a constructor's type-parameter bindings from the concrete type of
/// the scrutinee it is matched against.
///
/// By the time a match is lowered the scrutinee type is concrete, so the
/// bindings are read off positionally: `type_params[i] -> scrutinee.type_args[i]`.
/// This works even when `ret_type` is a bare name with no variables in it.
/// Returns an empty map when the scrutinee is not a generic application or
/// when the constructor belongs to a different type. Missing trailing
/// arguments are skipped.
pub fn infer_substitutions(type_params: &[TypeParam], ret_type: &Type, scrutinee: &Type) -> Substitution {
    let mut subst = Substitution::new();
    if type_params.is_empty() {
        return subst;
    }
    let Type::Generic(generic) = scrutinee else {
        return subst;
    };
    if type_name(ret_type) != type_name(&generic.base) {
        return subst;
    }
    for (param, arg) in type_params.iter().zip(&generic.type_args) {
        subst.insert(param.name.clone(), arg.clone());
    }
    subst
}
