use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use tern_ast::Origin;
use tern_typeck::{FunctionRegistry, Type, TypeError, TypeParam, TypeRegistry};

use crate::ir;

/// Variable name to type, for the lexical scope being lowered.
pub(crate) type Bindings = HashMap<SmolStr, Type>;

/// Type parameter name to its declaration, for the declaration being lowered.
pub(crate) type TypeParams = HashMap<SmolStr, TypeParam>;

/// Origins of the nodes currently being lowered, innermost last.
#[derive(Debug, Default)]
pub(crate) struct OriginStack(Vec<Origin>);

impl OriginStack {
    pub fn push(&mut self, origin: Origin) {
        self.0.push(origin);
    }

    pub fn pop(&mut self) -> Option<Origin> {
        self.0.pop()
    }

    pub fn current(&self) -> Option<&Origin> {
        self.0.last()
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Attach the innermost origin to `err` unless it already has one.
    pub fn annotate(&self, err: TypeError) -> TypeError {
        err.or_origin(self.current())
    }
}

/// An import whose path is not a standard library module. Resolving it is
/// left to the module resolver.
#[derive(Clone, Debug)]
pub(crate) struct DeferredImport {
    pub path: SmolStr,
    pub alias: Option<SmolStr>,
}

/// State shared by every pass over one compilation unit.
#[derive(Default)]
pub(crate) struct LoweringContext {
    pub functions: FunctionRegistry,
    pub types: TypeRegistry,
    pub vars: Bindings,
    pub origins: OriginStack,
    /// Type parameters of the declaration being lowered.
    pub type_params: TypeParams,
    /// Declared type name to its item index, filled before any type is lowered.
    pub type_decls: HashMap<SmolStr, usize>,
    /// Variant name to the declared type that owns it.
    pub variant_owners: HashMap<SmolStr, SmolStr>,
    /// Types lowered ahead of their position, waiting to be emitted.
    pub lowered_types: HashMap<SmolStr, ir::TypeDecl>,
    pub user_functions: HashSet<SmolStr>,
    pub deferred_imports: Vec<DeferredImport>,
}

impl AsMut<LoweringContext> for LoweringContext {
    fn as_mut(&mut self) -> &mut LoweringContext {
        self
    }
}
