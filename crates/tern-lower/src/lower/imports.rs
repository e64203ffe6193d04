use tern_ast as ast;
use tern_typeck::{TypeError, TypeResult};

use super::Pipeline;
use crate::config::{StdlibMetadata, StdlibModule};
use crate::context::DeferredImport;
use crate::ir;

impl Pipeline<'_> {
    /// Register the prelude, merge every standard library module the unit
    /// imports, and defer the rest to the module resolver.
    pub(super) fn collect_imports(&mut self) -> TypeResult<Vec<ir::Import>> {
        let stdlib = std::mem::take(&mut self.config.stdlib);
        let result = self.collect_imports_from(&stdlib);
        self.config.stdlib = stdlib;
        result
    }

    fn collect_imports_from(&mut self, stdlib: &StdlibMetadata) -> TypeResult<Vec<ir::Import>> {
        for info in &stdlib.prelude {
            if !self.ctx.functions.contains(&info.name) {
                self.ctx.functions.register(info.clone())?;
            }
        }

        let module = self.module;
        let mut imports = Vec::new();
        for item in &module.items {
            let ast::Item::Import(import) = item else {
                continue;
            };
            let found = stdlib.module(&import.path);
            match found {
                Some(exports) => self
                    .merge_stdlib_module(import, exports)
                    .map_err(|e| e.or_origin(import.origin.as_ref()))?,
                None => {
                    tracing::debug!(path = %import.path, "deferring import");
                    self.ctx.deferred_imports.push(DeferredImport {
                        path: import.path.clone(),
                        alias: import.alias.clone(),
                    });
                }
            }
            imports.push(ir::Import {
                path: import.path.clone(),
                alias: import.alias.clone(),
                names: import.names.clone(),
                stdlib: found.is_some(),
            });
        }
        Ok(imports)
    }

    /// Register what `import` asks for from `exports`: everything when it names
    /// nothing. Functions are also reachable as `path::f` and `alias::f`.
    fn merge_stdlib_module(&mut self, import: &ast::Import, exports: &StdlibModule) -> TypeResult<()> {
        if let Some(missing) = import.names.iter().find(|n| !exports.exports(n)) {
            return Err(TypeError::unknown(format!(
                "module '{}' has no export '{}'",
                import.path, missing
            )));
        }
        let wanted = |name: &str| import.names.is_empty() || import.names.iter().any(|n| n == name);

        for ty in exports.types.iter().filter(|t| wanted(&t.name)) {
            if self.ctx.types.contains(&ty.name) {
                continue;
            }
            self.ctx
                .types
                .insert(ty.name.clone(), ty.type_params.clone(), ty.ty.clone())?;
            self.ctx.types.register_constructors(&ty.name)?;
        }

        let mut merged = 0;
        for info in exports.functions.iter().filter(|f| wanted(&f.name)) {
            if !self.ctx.functions.contains(&info.name) {
                self.ctx.functions.register(info.clone())?;
                merged += 1;
            }
            self.ctx
                .functions
                .add_alias(format!("{}::{}", import.path, info.name), info.name.clone());
            if let Some(alias) = &import.alias {
                self.ctx
                    .functions
                    .add_alias(format!("{}::{}", alias, info.name), info.name.clone());
            }
        }
        tracing::debug!(path = %import.path, alias = ?import.alias, merged, "merged standard library module");
        Ok(())
    }

    /// Imports outside the standard library are bound by the module resolver,
    /// after this unit is lowered.
    pub(super) fn register_import_aliases(&self) {
        for import in &self.ctx.deferred_imports {
            tracing::debug!(path = %import.path, alias = ?import.alias, "import alias left to the module resolver");
        }
    }
}
