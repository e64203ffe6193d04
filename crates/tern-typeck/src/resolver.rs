use crate::config::CheckConfig;
use crate::defs::FunctionInfo;
use crate::error::TypeResult;
use crate::solver::{Instantiation, TypeConstraintSolver, TypedArgument};
use crate::types::Type;

/// The one entry point the lowering passes use to instantiate a call.
#[derive(Clone, Debug)]
pub struct GenericCallResolver {
    solver: TypeConstraintSolver,
}

impl GenericCallResolver {
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            solver: TypeConstraintSolver::new(config),
        }
    }

    pub fn instantiate<A: TypedArgument>(
        &self,
        info: &FunctionInfo,
        args: &mut [A],
        name: &str,
        expected_ret_type: Option<&Type>,
    ) -> TypeResult<Instantiation> {
        self.solver.solve(info, args, name, expected_ret_type)
    }
}
