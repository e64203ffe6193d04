//! The lowering pipeline and its per-node transformers.
//!
//! Each transformer is an `impl Pipeline` block, so every pass reaches the
//! same registries, scopes and origin stack through `self`.

mod decls;
mod exprs;
mod imports;
mod patterns;
mod pipeline;
mod types;

pub use pipeline::Pipeline;
