//! Type representation, inference and checking components for Tern.
//!
//! The pieces are independent and pure apart from the registries: the
//! lowering pipeline in `tern-lower` drives them declaration by declaration.

mod compat;
mod config;
mod defs;
mod effects;
mod equiv;
mod error;
mod generics;
mod matching;
mod registry;
mod resolver;
mod solver;
mod subst;
mod types;
mod unify;

pub use compat::compatible;
pub use config::CheckConfig;
pub use defs::{ConstructorInfo, FunctionId, FunctionInfo, TypeParam};
pub use effects::{Effect, EffectAnalyzer, EffectSet};
pub use equiv::{equivalent, equivalent_opt};
pub use error::{ErrorKind, TypeError, TypeResult};
pub use generics::infer_substitutions;
pub use matching::{Coverage, MatchAnalysis, MatchAnalyzer, MatchContext, TypedArm};
pub use registry::{FunctionRegistry, TypeRegistry};
pub use resolver::GenericCallResolver;
pub use solver::{Instantiation, TypeConstraintSolver, TypedArgument};
pub use subst::{apply, Substitution};
pub use types::{
    base_type_name, has_type_variables, is_error_type, is_float, is_generic_type_name,
    is_integer, is_numeric, is_unit_like, normalized_type_name, type_name, Field,
    FunctionType, GenericType, RecordType, SumType, Type, TypeVar, Variant,
};
pub use unify::{unify, widen_numeric, UnifyError};
