use la_arena::Idx;
use smol_str::SmolStr;

use crate::effects::EffectSet;
use crate::types::Type;

// ── Stored definitions ───────────────────────────────────────────

pub type FunctionId = Idx<FunctionInfo>;

/// Declared type parameter of a function or type constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
    pub name: SmolStr,
    pub constraint: Option<SmolStr>,
}

impl TypeParam {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn constrained(name: impl Into<SmolStr>, constraint: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            constraint: Some(constraint.into()),
        }
    }

    /// The type variable this parameter introduces.
    pub fn as_type(&self) -> Type {
        match &self.constraint {
            Some(c) => Type::constrained_var(self.name.clone(), c.clone()),
            None => Type::var(self.name.clone()),
        }
    }
}

/// A function signature as registered for call resolution.
///
/// One version of an entry in the function registry. Revising an entry
/// allocates a new version linked to its predecessor.
#[derive(Clone, Debug)]
pub struct FunctionInfo {
    pub name: SmolStr,
    pub param_types: Vec<Type>,
    pub ret_type: Type,
    pub type_params: Vec<TypeParam>,
    pub aliases: Vec<SmolStr>,
    pub effects: EffectSet,
    /// Declared without a body; provided by the runtime or another unit.
    pub external: bool,
    pub previous: Option<FunctionId>,
}

impl FunctionInfo {
    pub fn new(name: impl Into<SmolStr>, param_types: Vec<Type>, ret_type: Type) -> Self {
        Self {
            name: name.into(),
            param_types,
            ret_type,
            type_params: Vec::new(),
            aliases: Vec::new(),
            effects: EffectSet::default(),
            external: false,
            previous: None,
        }
    }

    pub fn with_type_params(mut self, type_params: Vec<TypeParam>) -> Self {
        self.type_params = type_params;
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<SmolStr>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.type_params.is_empty()
    }
}

/// A sum-type variant registered as a value constructor.
#[derive(Clone, Debug)]
pub struct ConstructorInfo {
    pub name: SmolStr,
    pub type_name: SmolStr,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<Type>,
}
