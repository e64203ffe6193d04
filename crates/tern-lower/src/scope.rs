use smol_str::SmolStr;
use std::ops::{Deref, DerefMut};
use tern_ast::Origin;
use tern_typeck::{Type, TypeParam};

use crate::context::{Bindings, LoweringContext, TypeParams};

/// Saves the variable bindings on creation and puts them back when dropped,
/// so bindings made inside a block, loop body or match arm never leak out,
/// whether lowering finishes or bails out with `?`.
pub(crate) struct ScopeGuard<'g, P: AsMut<LoweringContext>> {
    owner: &'g mut P,
    saved: Bindings,
}

impl<'g, P: AsMut<LoweringContext>> ScopeGuard<'g, P> {
    pub fn new(owner: &'g mut P) -> Self {
        let saved = owner.as_mut().vars.clone();
        Self { owner, saved }
    }

    pub fn bind(&mut self, name: impl Into<SmolStr>, ty: Type) {
        self.owner.as_mut().vars.insert(name.into(), ty);
    }
}

impl<P: AsMut<LoweringContext>> Deref for ScopeGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.owner
    }
}

impl<P: AsMut<LoweringContext>> DerefMut for ScopeGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.owner
    }
}

impl<P: AsMut<LoweringContext>> AsMut<LoweringContext> for ScopeGuard<'_, P> {
    fn as_mut(&mut self) -> &mut LoweringContext {
        self.owner.as_mut()
    }
}

impl<P: AsMut<LoweringContext>> Drop for ScopeGuard<'_, P> {
    fn drop(&mut self) {
        self.owner.as_mut().vars = std::mem::take(&mut self.saved);
    }
}

/// Makes `origin` the current diagnostic origin until dropped.
pub(crate) struct OriginGuard<'g, P: AsMut<LoweringContext>> {
    owner: &'g mut P,
    pushed: bool,
}

impl<'g, P: AsMut<LoweringContext>> OriginGuard<'g, P> {
    /// Nodes without an origin leave the enclosing one current.
    pub fn new(owner: &'g mut P, origin: Option<&Origin>) -> Self {
        let pushed = match origin {
            Some(origin) => {
                owner.as_mut().origins.push(origin.clone());
                true
            }
            None => false,
        };
        Self { owner, pushed }
    }
}

impl<P: AsMut<LoweringContext>> Deref for OriginGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.owner
    }
}

impl<P: AsMut<LoweringContext>> DerefMut for OriginGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.owner
    }
}

impl<P: AsMut<LoweringContext>> AsMut<LoweringContext> for OriginGuard<'_, P> {
    fn as_mut(&mut self) -> &mut LoweringContext {
        self.owner.as_mut()
    }
}

impl<P: AsMut<LoweringContext>> Drop for OriginGuard<'_, P> {
    fn drop(&mut self) {
        if self.pushed {
            self.owner.as_mut().origins.pop();
        }
    }
}

/// Puts `params` in scope as the type parameters of the declaration being
/// lowered, restoring the enclosing ones when dropped.
pub(crate) struct TypeParamGuard<'g, P: AsMut<LoweringContext>> {
    owner: &'g mut P,
    saved: TypeParams,
}

impl<'g, P: AsMut<LoweringContext>> TypeParamGuard<'g, P> {
    pub fn new(owner: &'g mut P, params: &[TypeParam]) -> Self {
        let scope = params.iter().map(|p| (p.name.clone(), p.clone())).collect();
        let saved = std::mem::replace(&mut owner.as_mut().type_params, scope);
        Self { owner, saved }
    }
}

impl<P: AsMut<LoweringContext>> Deref for TypeParamGuard<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.owner
    }
}

impl<P: AsMut<LoweringContext>> DerefMut for TypeParamGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.owner
    }
}

impl<P: AsMut<LoweringContext>> Drop for TypeParamGuard<'_, P> {
    fn drop(&mut self) {
        self.owner.as_mut().type_params = std::mem::take(&mut self.saved);
    }
}
