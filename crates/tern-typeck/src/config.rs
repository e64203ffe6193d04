use crate::effects::Effect;

/// Knobs for the checking components.
#[derive(Clone, Debug)]
pub struct CheckConfig {
    /// Verify that matches over sum types cover every variant.
    pub check_exhaustiveness: bool,
    /// Write resolved parameter types back onto call arguments whose own
    /// type still mentions type variables.
    pub assign_expression_types: bool,
    /// Effects every function starts with before analysis.
    pub default_effects: Vec<Effect>,
}

impl CheckConfig {
    pub fn new() -> Self {
        Self {
            check_exhaustiveness: true,
            assign_expression_types: true,
            default_effects: vec![Effect::Noexcept],
        }
    }

    pub fn with_exhaustiveness(mut self, enabled: bool) -> Self {
        self.check_exhaustiveness = enabled;
        self
    }

    pub fn with_assign_expression_types(mut self, enabled: bool) -> Self {
        self.assign_expression_types = enabled;
        self
    }

    pub fn with_default_effects(mut self, effects: Vec<Effect>) -> Self {
        self.default_effects = effects;
        self
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self::new()
    }
}
