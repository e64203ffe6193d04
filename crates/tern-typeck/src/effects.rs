use std::fmt;

use crate::types::Type;

/// Backend-facing guarantee derived for a function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Evaluable at compile time.
    Constexpr,
    /// Never throws across the IR boundary.
    Noexcept,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Constexpr => write!(f, "constexpr"),
            Effect::Noexcept => write!(f, "noexcept"),
        }
    }
}

/// Ordered set of effects: insertion order kept, duplicates dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EffectSet(Vec<Effect>);

impl EffectSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, effect: Effect) {
        if !self.0.contains(&effect) {
            self.0.push(effect);
        }
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.0.contains(&effect)
    }

    pub fn as_slice(&self) -> &[Effect] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Effect> for EffectSet {
    fn from_iter<I: IntoIterator<Item = Effect>>(iter: I) -> Self {
        let mut set = EffectSet::new();
        for effect in iter {
            set.insert(effect);
        }
        set
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", e)?;
        }
        write!(f, "]")
    }
}

/// Conservative effect tagging for a function body.
///
/// Only the policy lives here. Whether a body is pure and whether a return
/// type is a literal type are decided by the injected predicates, which
/// walk the caller's own representation of the body.
pub struct EffectAnalyzer<'p, B: ?Sized> {
    pure_expression: &'p dyn Fn(&B) -> bool,
    non_literal_type: &'p dyn Fn(&Type) -> bool,
}

impl<'p, B: ?Sized> EffectAnalyzer<'p, B> {
    pub fn new(
        pure_expression: &'p dyn Fn(&B) -> bool,
        non_literal_type: &'p dyn Fn(&Type) -> bool,
    ) -> Self {
        Self {
            pure_expression,
            non_literal_type,
        }
    }

    /// `Constexpr` first when the body is present and pure and the return
    /// type is a literal type (a missing return type counts as literal),
    /// then `default_effects`, then `Noexcept` which is always present.
    pub fn analyze(&self, body: Option<&B>, return_type: Option<&Type>, default_effects: &[Effect]) -> EffectSet {
        let mut effects = EffectSet::new();
        let literal_return = return_type.map_or(true, |ty| !(self.non_literal_type)(ty));
        if let Some(body) = body {
            if literal_return && (self.pure_expression)(body) {
                effects.insert(Effect::Constexpr);
            }
        }
        for &effect in default_effects {
            effects.insert(effect);
        }
        effects.insert(Effect::Noexcept);
        effects
    }
}
