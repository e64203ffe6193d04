use crate::compat::compatible;
use crate::config::CheckConfig;
use crate::defs::FunctionInfo;
use crate::error::{TypeError, TypeResult};
use crate::subst::{apply, Substitution};
use crate::types::{has_type_variables, is_error_type, Type};
use crate::unify::unify;

/// A call argument whose type the solver reads and may refine.
pub trait TypedArgument {
    fn arg_type(&self) -> &Type;
    fn assign_type(&mut self, ty: Type);
}

/// A signature instantiated for one call site.
#[derive(Clone, Debug, PartialEq)]
pub struct Instantiation {
    pub type_map: Substitution,
    pub param_types: Vec<Type>,
    pub ret_type: Type,
}

/// Instantiates function signatures at call sites by unifying declared
/// parameter types against argument types, and optionally the declared
/// return type against the type the call site expects.
#[derive(Clone, Debug)]
pub struct TypeConstraintSolver {
    assign_expression_types: bool,
}

impl TypeConstraintSolver {
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            assign_expression_types: config.assign_expression_types,
        }
    }

    pub fn solve<A: TypedArgument>(
        &self,
        info: &FunctionInfo,
        args: &mut [A],
        name: &str,
        expected_ret_type: Option<&Type>,
    ) -> TypeResult<Instantiation> {
        // Fully inferred signatures have no declared parameters to count.
        if !info.param_types.is_empty() && info.param_types.len() != args.len() {
            return Err(TypeError::arity(format!(
                "function '{}' expects {} argument(s), got {}",
                name,
                info.param_types.len(),
                args.len()
            )));
        }

        let mut type_map = Substitution::new();
        for (i, (param, arg)) in info.param_types.iter().zip(args.iter()).enumerate() {
            let arg_ty = arg.arg_type();
            if arg_ty.is_auto() || is_error_type(arg_ty) {
                continue;
            }
            match unify(param, arg_ty, &type_map) {
                Ok(extended) => type_map = extended,
                Err(err) => tracing::trace!(function = name, arg = i + 1, %err, "argument did not unify"),
            }
        }

        if let Some(expected) = expected_ret_type.filter(|t| !t.is_auto() && !is_error_type(t)) {
            match unify(&info.ret_type, expected, &type_map) {
                Ok(extended) => {
                    for (var, ty) in extended {
                        type_map.entry(var).or_insert(ty);
                    }
                }
                Err(err) => tracing::trace!(function = name, %err, "return type did not unify"),
            }
        }

        let param_types: Vec<Type> = info.param_types.iter().map(|t| apply(t, &type_map)).collect();
        let ret_type = apply(&info.ret_type, &type_map);

        for (i, (param, arg)) in param_types.iter().zip(args.iter_mut()).enumerate() {
            if !compatible(param, arg.arg_type()) {
                return Err(TypeError::mismatch(format!(
                    "type mismatch: expected {}, got {} (argument {} of '{}')",
                    param,
                    arg.arg_type(),
                    i + 1,
                    name
                )));
            }
            if self.assign_expression_types
                && has_type_variables(arg.arg_type())
                && !has_type_variables(param)
            {
                arg.assign_type(param.clone());
            }
        }

        tracing::trace!(function = name, bindings = type_map.len(), %ret_type, "instantiated");
        Ok(Instantiation {
            type_map,
            param_types,
            ret_type,
        })
    }
}
