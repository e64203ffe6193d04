//! Lowering of a parsed Tern compilation unit to typed IR.
//!
//! [`Pipeline`] drives the passes; [`lower`] runs it with no event sink.

mod config;
mod context;
pub mod events;
pub mod ir;
mod lower;
mod purity;
mod scope;

pub use config::{LowerConfig, StdlibMetadata, StdlibModule, StdlibType};
pub use events::{Event, EventSink};
pub use lower::Pipeline;
pub use purity::{is_pure, non_literal_type};

use tern_ast as ast;
use tern_typeck::TypeResult;

/// Lower `module` with `config`.
pub fn lower(module: &ast::Module, config: &LowerConfig) -> TypeResult<ir::Module> {
    Pipeline::new(module, config.clone()).run()
}

#[cfg(test)]
mod tests;
