use smol_str::SmolStr;
use tern_ast::Origin;
use tern_typeck::{EffectSet, Type};

/// Soft signals raised while lowering, for external logging.
///
/// Events never influence lowering: a mismatch is still a fatal error, the
/// event just reports it as structured data first.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    TypeMismatch {
        message: String,
        origin: Option<Origin>,
    },
    NonExhaustive {
        message: String,
        origin: Option<Origin>,
    },
    /// A generic function or constructor was instantiated at a call site.
    GenericInstantiated {
        function: SmolStr,
        /// Bindings sorted by type parameter name.
        bindings: Vec<(SmolStr, Type)>,
        ret_type: Type,
    },
    FunctionLowered {
        name: SmolStr,
        effects: EffectSet,
    },
}

pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}
