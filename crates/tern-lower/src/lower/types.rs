use smol_str::SmolStr;
use tern_ast as ast;
use tern_ast::{TypeExprId, TypeExprKind};
use tern_typeck::{
    apply, base_type_name, normalized_type_name, type_name, ConstructorInfo, Field, FunctionInfo,
    Substitution, Type, TypeError, TypeResult,
};

use super::Pipeline;
use crate::context::LoweringContext;

const BUILTIN_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64", "bool",
    "string", "char", "unit", "auto",
];

impl Pipeline<'_> {
    // ── Type expressions ────────────────────────────────────────

    /// Lower a written type. Names declared in this unit but not lowered yet
    /// become placeholders, refreshed once their declaration is lowered.
    pub(crate) fn lower_type_expr(&mut self, id: TypeExprId) -> TypeResult<Type> {
        let module = self.module;
        let texpr = &module.type_exprs[id];
        let lowered = match &texpr.kind {
            TypeExprKind::Named { name, args } => self.lower_named_type(name, args),
            TypeExprKind::Array(elem) => self.lower_type_expr(*elem).map(Type::array),
            TypeExprKind::Function { params, ret } => self.lower_function_type(params, *ret),
        };
        lowered.map_err(|e| e.or_origin(texpr.origin.as_ref()))
    }

    fn lower_function_type(&mut self, params: &[TypeExprId], ret: TypeExprId) -> TypeResult<Type> {
        let mut fields = Vec::with_capacity(params.len());
        for (i, &param) in params.iter().enumerate() {
            fields.push(Field::new(i.to_string(), self.lower_type_expr(param)?));
        }
        let ret = self.lower_type_expr(ret)?;
        Ok(Type::function(fields, ret))
    }

    fn lower_named_type(&mut self, written: &str, args: &[TypeExprId]) -> TypeResult<Type> {
        let name = base_type_name(written);

        if let Some(param) = self.ctx.type_params.get(name).cloned() {
            expect_type_args(name, 0, args.len())?;
            return Ok(param.as_type());
        }

        let mut lowered = Vec::with_capacity(args.len());
        for &arg in args {
            lowered.push(self.lower_type_expr(arg)?);
        }

        if name == "Array" {
            return match lowered.as_slice() {
                [elem] => Ok(Type::array(elem.clone())),
                _ => Err(type_arity(name, 1, lowered.len())),
            };
        }

        let canonical = normalized_type_name(name);
        if BUILTIN_TYPES.contains(&canonical.as_str()) {
            expect_type_args(name, 0, lowered.len())?;
            return Ok(if canonical == "unit" {
                Type::Unit
            } else {
                Type::Primitive(canonical)
            });
        }

        if let Some(ty) = self.ctx.types.get(name).cloned() {
            let params = self.ctx.types.type_params(name).to_vec();
            expect_type_args(name, params.len(), lowered.len())?;
            if is_nominal(&ty, name) {
                return Ok(Type::applied(ty, lowered));
            }
            let subst: Substitution = params.into_iter().map(|p| p.name).zip(lowered).collect();
            return Ok(apply(&ty, &subst));
        }

        if let Some(&index) = self.ctx.type_decls.get(name) {
            let declared = match self.module.items.get(index) {
                Some(ast::Item::Type(decl)) => decl.type_params.len(),
                _ => 0,
            };
            expect_type_args(name, declared, lowered.len())?;
            return Ok(Type::applied(Type::Primitive(SmolStr::new(name)), lowered));
        }

        Err(TypeError::unknown(format!("unknown type '{}'", name)))
    }

    // ── Placeholders and forward references ─────────────────────

    /// Replace every placeholder in `ty` with its declaration, lowering
    /// declarations that have not been reached yet.
    pub(crate) fn resolve_type(&mut self, ty: &Type) -> TypeResult<Type> {
        let mut pending = Vec::new();
        collect_pending(ty, &self.ctx, &mut pending);
        for name in pending {
            self.lower_type_on_demand(&name)?;
        }
        Ok(self.ctx.types.resolve_placeholders(ty))
    }

    /// The registered signature for `name`, with any types it mentions lowered.
    pub(crate) fn callable(&mut self, name: &str) -> TypeResult<Option<FunctionInfo>> {
        let Some(info) = self.ctx.functions.get(name) else {
            return Ok(None);
        };
        let mut pending = Vec::new();
        for ty in info.param_types.iter().chain(std::iter::once(&info.ret_type)) {
            collect_pending(ty, &self.ctx, &mut pending);
        }
        if pending.is_empty() {
            return Ok(Some(info.clone()));
        }
        for ty_name in pending {
            self.lower_type_on_demand(&ty_name)?;
        }
        Ok(self.ctx.functions.get(name).cloned())
    }

    pub(crate) fn constructor_info(&mut self, name: &str) -> TypeResult<Option<ConstructorInfo>> {
        if let Some(owner) = self.ctx.variant_owners.get(name).cloned() {
            self.lower_type_on_demand(&owner)?;
        }
        Ok(self.ctx.types.constructor(name).cloned())
    }

    pub(crate) fn named_type(&mut self, name: &str) -> TypeResult<Option<Type>> {
        self.lower_type_on_demand(name)?;
        Ok(self.ctx.types.get(name).cloned())
    }

    /// Fields of the record `ty` names, with its type arguments substituted.
    pub(crate) fn record_fields(&mut self, ty: &Type) -> TypeResult<Option<Vec<Field>>> {
        let Some(record) = ty.as_record() else {
            return Ok(None);
        };
        let subst: Substitution = match ty {
            Type::Generic(generic) => self
                .ctx
                .types
                .type_params(&record.name)
                .iter()
                .map(|p| p.name.clone())
                .zip(generic.type_args.iter().cloned())
                .collect(),
            _ => Substitution::new(),
        };
        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let resolved = self.resolve_type(&field.ty)?;
            fields.push(Field::new(field.name.clone(), apply(&resolved, &subst)));
        }
        Ok(Some(fields))
    }
}

/// Types whose checks are deferred: `auto`, type variables and errors.
pub(crate) fn is_unresolved(ty: &Type) -> bool {
    ty.is_auto() || matches!(ty, Type::Variable(_) | Type::Error(_))
}

fn is_nominal(ty: &Type, name: &str) -> bool {
    matches!(ty, Type::Record(_) | Type::Sum(_)) && type_name(ty).as_deref() == Some(name)
}

fn type_arity(name: &str, expected: usize, got: usize) -> TypeError {
    TypeError::arity(format!(
        "type '{}' expects {} type argument(s), got {}",
        name, expected, got
    ))
}

fn expect_type_args(name: &str, expected: usize, got: usize) -> TypeResult<()> {
    if expected == got {
        Ok(())
    } else {
        Err(type_arity(name, expected, got))
    }
}

/// Placeholder names in `ty` whose declaration exists but is not lowered.
fn collect_pending(ty: &Type, ctx: &LoweringContext, out: &mut Vec<SmolStr>) {
    match ty {
        Type::Primitive(name) => {
            if ctx.type_decls.contains_key(name) && !ctx.types.contains(name) && !out.contains(name) {
                out.push(name.clone());
            }
        }
        Type::Array(elem) => collect_pending(elem, ctx, out),
        Type::Generic(generic) => {
            collect_pending(&generic.base, ctx, out);
            for arg in &generic.type_args {
                collect_pending(arg, ctx, out);
            }
        }
        Type::Function(func) => {
            for param in &func.params {
                collect_pending(&param.ty, ctx, out);
            }
            collect_pending(&func.ret, ctx, out);
        }
        Type::Variable(_) | Type::Record(_) | Type::Sum(_) | Type::Unit | Type::Error(_) => {}
    }
}
