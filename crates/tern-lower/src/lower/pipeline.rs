use std::fmt;
use tern_ast as ast;
use tern_typeck::{
    compatible, ErrorKind, GenericCallResolver, Instantiation, MatchContext, Type, TypeError,
    TypeParam, TypeRegistry, TypeResult,
};

use crate::config::LowerConfig;
use crate::context::LoweringContext;
use crate::events::{Event, EventSink};
use crate::ir;
use crate::scope::TypeParamGuard;

/// Lowers one parsed compilation unit to typed IR.
///
/// The passes run in a fixed order over shared state:
/// 1. collect imports, merging standard library metadata;
/// 2. index type declarations by name;
/// 3. register every function signature;
/// 4. report import aliases left to the module resolver;
/// 5. lower type and function declarations in source order.
///
/// The first error aborts the run; no partial module is produced.
pub struct Pipeline<'a> {
    pub(crate) module: &'a ast::Module,
    pub(crate) config: LowerConfig,
    pub(crate) resolver: GenericCallResolver,
    pub(crate) ctx: LoweringContext,
    sink: Option<&'a mut dyn EventSink>,
}

impl<'a> Pipeline<'a> {
    pub fn new(module: &'a ast::Module, config: LowerConfig) -> Self {
        let resolver = GenericCallResolver::new(&config.check);
        Self {
            module,
            config,
            resolver,
            ctx: LoweringContext::default(),
            sink: None,
        }
    }

    pub fn with_event_sink(mut self, sink: &'a mut dyn EventSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn run(mut self) -> TypeResult<ir::Module> {
        self.lower_module()
    }

    pub(crate) fn lower_module(&mut self) -> TypeResult<ir::Module> {
        let name = self
            .config
            .module_name
            .clone()
            .unwrap_or_else(|| self.module.name.clone());
        tracing::debug!(module = %name, items = self.module.items.len(), "lowering module");

        let imports = self.collect_imports()?;
        self.preregister_types()?;
        self.preregister_functions()?;
        self.register_import_aliases();
        let items = self.lower_declarations()?;

        tracing::debug!(module = %name, items = items.len(), "lowered module");
        Ok(ir::Module {
            name,
            items,
            imports,
        })
    }

    // ── Passes ──────────────────────────────────────────────────

    fn preregister_types(&mut self) -> TypeResult<()> {
        let module = self.module;
        for (index, item) in module.items.iter().enumerate() {
            let ast::Item::Type(decl) = item else {
                continue;
            };
            if self.ctx.type_decls.contains_key(&decl.name) || self.ctx.types.contains(&decl.name) {
                return Err(TypeError::new(
                    ErrorKind::Duplicate,
                    format!("type '{}' is already defined", decl.name),
                )
                .or_origin(decl.origin.as_ref()));
            }
            self.ctx.type_decls.insert(decl.name.clone(), index);
            if let ast::TypeDeclBody::Sum(variants) = &decl.body {
                for variant in variants {
                    self.ctx
                        .variant_owners
                        .entry(variant.name.clone())
                        .or_insert_with(|| decl.name.clone());
                }
            }
            tracing::debug!(name = %decl.name, "preregistered type");
        }
        Ok(())
    }

    fn preregister_functions(&mut self) -> TypeResult<()> {
        let module = self.module;
        for item in &module.items {
            let ast::Item::Func(decl) = item else {
                continue;
            };
            if !self.ctx.user_functions.insert(decl.name.clone()) {
                return Err(TypeError::new(
                    ErrorKind::Duplicate,
                    format!("function '{}' is already defined", decl.name),
                )
                .or_origin(decl.origin.as_ref()));
            }
            if let Some(existing) = self.ctx.functions.get(&decl.name) {
                if existing.param_types.len() != decl.params.len() {
                    return Err(TypeError::arity(format!(
                        "function '{}' declares {} parameter(s), its registered signature takes {}",
                        decl.name,
                        decl.params.len(),
                        existing.param_types.len()
                    ))
                    .or_origin(decl.origin.as_ref()));
                }
                tracing::debug!(name = %decl.name, "already registered, keeping existing signature");
                continue;
            }
            let info = self.lower_signature(decl)?;
            tracing::debug!(name = %decl.name, params = info.param_types.len(), ret = %info.ret_type, "preregistered function");
            self.ctx
                .functions
                .register(info)
                .map_err(|e| e.or_origin(decl.origin.as_ref()))?;
        }
        Ok(())
    }

    fn lower_declarations(&mut self) -> TypeResult<Vec<ir::Item>> {
        let module = self.module;
        let mut items = Vec::new();
        for item in &module.items {
            match item {
                ast::Item::Type(decl) => {
                    let lowered = match self.ctx.lowered_types.remove(&decl.name) {
                        Some(done) => done,
                        None => self.lower_type_decl(decl)?,
                    };
                    items.push(ir::Item::TypeDecl(lowered));
                }
                ast::Item::Func(decl) => items.push(ir::Item::Func(self.lower_func(decl)?)),
                ast::Item::Import(_) => {}
            }
        }
        Ok(items)
    }

    // ── Shared helpers ──────────────────────────────────────────

    pub(crate) fn emit(&mut self, event: Event) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.emit(event);
        }
    }

    /// Attach the current origin to `err`.
    pub(crate) fn annotate(&self, err: TypeError) -> TypeError {
        self.ctx.origins.annotate(err)
    }

    /// Report `err` to the event sink if it is a diagnostic worth observing,
    /// and hand it back with the current origin attached.
    pub(crate) fn observe(&mut self, err: TypeError) -> TypeError {
        let err = self.annotate(err);
        let origin = err.origin().cloned();
        let message = err.message().to_string();
        match err.kind() {
            Some(ErrorKind::TypeMismatch) => self.emit(Event::TypeMismatch { message, origin }),
            Some(ErrorKind::NonExhaustive) => self.emit(Event::NonExhaustive { message, origin }),
            _ => {}
        }
        err
    }

    pub(crate) fn mismatch(&mut self, message: String) -> TypeError {
        self.observe(TypeError::mismatch(message))
    }

    /// Require `actual` to be usable where `expected` is.
    pub(crate) fn ensure_compatible(
        &mut self,
        expected: &Type,
        actual: &Type,
        context: impl fmt::Display,
    ) -> TypeResult<()> {
        if compatible(expected, actual) {
            return Ok(());
        }
        Err(self.mismatch(format!(
            "type mismatch: expected {}, got {} ({})",
            expected, actual, context
        )))
    }

    pub(crate) fn record_instantiation(&mut self, function: &str, type_params: &[TypeParam], inst: &Instantiation) {
        if type_params.is_empty() {
            return;
        }
        let mut bindings: Vec<_> = inst
            .type_map
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::trace!(function, ret = %inst.ret_type, "generic instantiation");
        self.emit(Event::GenericInstantiated {
            function: function.into(),
            bindings,
            ret_type: inst.ret_type.clone(),
        });
    }

    /// Run `f` with `params` as the type parameters in scope.
    pub(crate) fn with_type_params<T>(
        &mut self,
        params: &[TypeParam],
        f: impl FnOnce(&mut Self) -> TypeResult<T>,
    ) -> TypeResult<T> {
        let mut scope = TypeParamGuard::new(self, params);
        f(&mut *scope)
    }
}

impl AsMut<LoweringContext> for Pipeline<'_> {
    fn as_mut(&mut self) -> &mut LoweringContext {
        &mut self.ctx
    }
}

impl MatchContext for Pipeline<'_> {
    fn type_registry(&self) -> Option<&TypeRegistry> {
        Some(&self.ctx.types)
    }
}
