use smol_str::SmolStr;
use std::collections::HashSet;
use tern_ast as ast;
use tern_typeck::{
    EffectAnalyzer, ErrorKind, Field, FunctionInfo, Type, TypeError, TypeParam, TypeResult, Variant,
};

use super::Pipeline;
use crate::events::Event;
use crate::ir;
use crate::purity::{is_pure, non_literal_type};
use crate::scope::{OriginGuard, ScopeGuard};

impl Pipeline<'_> {
    // ── Signatures ──────────────────────────────────────────────

    /// Lower a function's declared signature without touching its body.
    /// An unannotated return type is recorded as `auto`.
    pub(crate) fn lower_signature(&mut self, decl: &ast::FuncDecl) -> TypeResult<FunctionInfo> {
        let type_params = normalize_type_params(&decl.type_params);
        self.with_type_params(&type_params, |this| {
            let mut params = Vec::with_capacity(decl.params.len());
            for param in &decl.params {
                let ty = this
                    .lower_type_expr(param.type_ann)
                    .map_err(|e| e.or_origin(param.origin.as_ref()))?;
                params.push(ty);
            }
            let ret = match decl.return_type {
                Some(id) => this.lower_type_expr(id)?,
                None => Type::auto(),
            };
            let info = FunctionInfo::new(decl.name.clone(), params, ret)
                .with_type_params(type_params.clone());
            Ok(if decl.body.is_none() { info.external() } else { info })
        })
        .map_err(|e| e.or_origin(decl.origin.as_ref()))
    }

    // ── Type declarations ───────────────────────────────────────

    /// Lower a type declaration, register it with its constructors and
    /// refresh every signature that referred to it by placeholder.
    pub(crate) fn lower_type_decl(&mut self, decl: &ast::TypeDecl) -> TypeResult<ir::TypeDecl> {
        let mut this = OriginGuard::new(self, decl.origin.as_ref());
        let result = this.lower_type_decl_inner(decl);
        result.map_err(|e| this.annotate(e))
    }

    fn lower_type_decl_inner(&mut self, decl: &ast::TypeDecl) -> TypeResult<ir::TypeDecl> {
        let type_params: Vec<TypeParam> = decl
            .type_params
            .iter()
            .map(|name| TypeParam::new(name.clone()))
            .collect();
        let ty = self.with_type_params(&type_params, |this| this.lower_type_body(decl))?;

        self.ctx
            .types
            .insert(decl.name.clone(), type_params.clone(), ty.clone())?;
        self.ctx.types.register_constructors(&decl.name)?;
        let refreshed = self.ctx.functions.refresh_type(&decl.name, &ty);
        tracing::debug!(name = %decl.name, ty = %ty, refreshed, "lowered type");

        Ok(ir::TypeDecl {
            name: decl.name.clone(),
            type_params,
            ty,
            origin: decl.origin.clone(),
        })
    }

    fn lower_type_body(&mut self, decl: &ast::TypeDecl) -> TypeResult<Type> {
        match &decl.body {
            ast::TypeDeclBody::Record(fields) => {
                let fields = self.lower_fields(fields, |field| {
                    format!("field '{}' is declared twice in record '{}'", field, decl.name)
                })?;
                Ok(Type::record(decl.name.clone(), fields))
            }
            ast::TypeDeclBody::Sum(variants) => {
                let mut seen = HashSet::new();
                let mut lowered = Vec::with_capacity(variants.len());
                for variant in variants {
                    if !seen.insert(&variant.name) {
                        return Err(TypeError::new(
                            ErrorKind::Duplicate,
                            format!("variant '{}' is declared twice in type '{}'", variant.name, decl.name),
                        )
                        .or_origin(variant.origin.as_ref()));
                    }
                    let fields = self
                        .lower_fields(&variant.fields, |field| {
                            format!("field '{}' is declared twice in variant '{}'", field, variant.name)
                        })
                        .map_err(|e| e.or_origin(variant.origin.as_ref()))?;
                    lowered.push(Variant::new(variant.name.clone(), fields));
                }
                Ok(Type::sum(decl.name.clone(), lowered))
            }
            ast::TypeDeclBody::Alias(target) => {
                let ty = self.lower_type_expr(*target)?;
                if mentions_placeholder(&ty, &decl.name) {
                    return Err(TypeError::mismatch(format!(
                        "type alias '{}' refers to itself",
                        decl.name
                    )));
                }
                Ok(ty)
            }
        }
    }

    fn lower_fields(
        &mut self,
        fields: &[ast::FieldDecl],
        duplicate: impl Fn(&SmolStr) -> String,
    ) -> TypeResult<Vec<Field>> {
        let mut seen = HashSet::new();
        let mut lowered = Vec::with_capacity(fields.len());
        for field in fields {
            if !seen.insert(&field.name) {
                return Err(TypeError::new(ErrorKind::Duplicate, duplicate(&field.name)));
            }
            lowered.push(Field::new(field.name.clone(), self.lower_type_expr(field.type_ann)?));
        }
        Ok(lowered)
    }

    /// Lower a type declared later in the unit, the first time it is needed.
    /// The result is held back until the declaration's own position.
    pub(crate) fn lower_type_on_demand(&mut self, name: &str) -> TypeResult<()> {
        if self.ctx.types.contains(name) {
            return Ok(());
        }
        let Some(&index) = self.ctx.type_decls.get(name) else {
            return Ok(());
        };
        let module = self.module;
        let Some(ast::Item::Type(decl)) = module.items.get(index) else {
            return Err(TypeError::internal(format!(
                "type '{}' is indexed at item {} which is not a type declaration",
                name, index
            )));
        };
        tracing::debug!(name, "lowering type ahead of its declaration");
        let lowered = self.lower_type_decl(decl)?;
        self.ctx.lowered_types.insert(decl.name.clone(), lowered);
        Ok(())
    }

    // ── Functions ───────────────────────────────────────────────

    pub(crate) fn lower_func(&mut self, decl: &ast::FuncDecl) -> TypeResult<ir::Func> {
        let mut this = OriginGuard::new(self, decl.origin.as_ref());
        let Some(info) = this.ctx.functions.get(&decl.name).cloned() else {
            return Err(this.annotate(TypeError::internal(format!(
                "function '{}' was not preregistered",
                decl.name
            ))));
        };
        let type_params = info.type_params.clone();
        let result = this.with_type_params(&type_params, |p| p.lower_func_inner(decl, info));
        result.map_err(|e| this.annotate(e))
    }

    fn lower_func_inner(&mut self, decl: &ast::FuncDecl, info: FunctionInfo) -> TypeResult<ir::Func> {
        let mut params = Vec::with_capacity(decl.params.len());
        for (param, ty) in decl.params.iter().zip(&info.param_types) {
            params.push(ir::Param {
                name: param.name.clone(),
                ty: self.resolve_type(ty)?,
            });
        }
        let declared_ret = self.resolve_type(&info.ret_type)?;

        let body = match decl.body {
            Some(id) => {
                let mut scope = ScopeGuard::new(self);
                for param in &params {
                    scope.bind(param.name.clone(), param.ty.clone());
                }
                let expected = (!declared_ret.is_auto()).then_some(&declared_ret);
                let body = scope.lower_expr(id, expected)?;
                Some(body)
            }
            None => None,
        };

        let ret_type = match &body {
            Some(body) if declared_ret.is_auto() => body.ty.clone(),
            Some(body) => {
                self.ensure_compatible(
                    &declared_ret,
                    &body.ty,
                    format_args!("return value of '{}'", decl.name),
                )?;
                declared_ret
            }
            None if declared_ret.is_auto() => Type::Unit,
            None => declared_ret,
        };

        let io_functions = &self.config.io_functions;
        let pure = |expr: &ir::Expr| is_pure(expr, io_functions);
        let analyzer = EffectAnalyzer::<ir::Expr>::new(&pure, &non_literal_type);
        let effects = analyzer.analyze(body.as_ref(), Some(&ret_type), &self.config.check.default_effects);
        let external = body.is_none();

        let revised_params: Vec<Type> = params.iter().map(|p| p.ty.clone()).collect();
        self.ctx.functions.revise(&decl.name, |old| {
            let mut new = old.clone();
            new.param_types = revised_params;
            new.ret_type = ret_type.clone();
            new.effects = effects.clone();
            new.external = external;
            new
        });
        tracing::debug!(name = %decl.name, ret = %ret_type, %effects, "lowered function");
        self.emit(Event::FunctionLowered {
            name: decl.name.clone(),
            effects: effects.clone(),
        });

        Ok(ir::Func {
            name: decl.name.clone(),
            type_params: info.type_params,
            params,
            ret_type,
            body,
            effects,
            external,
            origin: decl.origin.clone(),
        })
    }
}

/// Whether `ty` still names `name` as an unresolved placeholder.
fn mentions_placeholder(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Primitive(n) => n == name,
        Type::Array(elem) => mentions_placeholder(elem, name),
        Type::Generic(generic) => {
            mentions_placeholder(&generic.base, name)
                || generic.type_args.iter().any(|a| mentions_placeholder(a, name))
        }
        Type::Function(func) => {
            func.params.iter().any(|p| mentions_placeholder(&p.ty, name))
                || mentions_placeholder(&func.ret, name)
        }
        Type::Variable(_) | Type::Record(_) | Type::Sum(_) | Type::Unit | Type::Error(_) => false,
    }
}

/// Drop repeated type parameters, keeping the first occurrence. A constraint
/// given only on a later repetition is kept.
fn normalize_type_params(params: &[ast::TypeParam]) -> Vec<TypeParam> {
    let mut out: Vec<TypeParam> = Vec::with_capacity(params.len());
    for param in params {
        match out.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => {
                if existing.constraint.is_none() {
                    existing.constraint = param.constraint.clone();
                }
            }
            None => out.push(TypeParam {
                name: param.name.clone(),
                constraint: param.constraint.clone(),
            }),
        }
    }
    out
}
