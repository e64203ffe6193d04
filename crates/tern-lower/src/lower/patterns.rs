use smol_str::SmolStr;
use tern_ast as ast;
use tern_ast::{PatternId, PatternKind};
use tern_typeck::{apply, infer_substitutions, type_name, Type, TypeError, TypeParam, TypeResult};

use super::exprs::literal_type;
use super::types::is_unresolved;
use super::Pipeline;
use crate::ir;
use crate::scope::{OriginGuard, ScopeGuard};

impl Pipeline<'_> {
    /// Lower one match arm in its own scope: the pattern's bindings are
    /// visible to the guard and body only.
    pub(crate) fn lower_arm(
        &mut self,
        arm: &ast::MatchArm,
        scrutinee: &Type,
        expected: Option<&Type>,
    ) -> TypeResult<ir::MatchArm> {
        let mut scope = ScopeGuard::new(self);
        let mut this = OriginGuard::new(&mut scope, arm.origin.as_ref());
        let pattern = this.lower_pattern(arm.pattern, scrutinee)?;
        let guard = match arm.guard {
            Some(id) => {
                let guard = this.lower_expr(id, Some(&Type::bool()))?;
                this.ensure_compatible(&Type::bool(), &guard.ty, "match guard")?;
                Some(guard)
            }
            None => None,
        };
        let body = this.lower_expr(arm.body, expected)?;
        Ok(ir::MatchArm {
            pattern,
            guard,
            body,
        })
    }

    /// Lower a pattern matched against a value of type `expected`, binding
    /// its variables in the current scope.
    pub(crate) fn lower_pattern(&mut self, id: PatternId, expected: &Type) -> TypeResult<ir::Pattern> {
        let module = self.module;
        let node = &module.patterns[id];
        let mut this = OriginGuard::new(self, node.origin.as_ref());
        match this.lower_pattern_kind(&node.kind, expected) {
            Ok(pattern) => Ok(pattern),
            Err(err) => Err(this.annotate(err)),
        }
    }

    fn lower_pattern_kind(&mut self, kind: &PatternKind, expected: &Type) -> TypeResult<ir::Pattern> {
        match kind {
            PatternKind::Wildcard => Ok(pattern(ir::PatternKind::Wildcard, expected.clone())),
            PatternKind::Var(name) => {
                if expected.as_sum().is_some_and(|sum| sum.variant(name).is_some()) {
                    return self.lower_constructor_pattern(name, &[], expected);
                }
                self.ctx.vars.insert(name.clone(), expected.clone());
                Ok(pattern(ir::PatternKind::Var(name.clone()), expected.clone()))
            }
            PatternKind::Literal(lit) => {
                let ty = literal_type(lit, Some(expected));
                self.ensure_compatible(expected, &ty, "literal pattern")?;
                Ok(pattern(ir::PatternKind::Literal(lit.clone()), ty))
            }
            PatternKind::Constructor { name, fields } => self.lower_constructor_pattern(name, fields, expected),
            PatternKind::Regex {
                pattern: source,
                bindings,
            } => {
                self.ensure_compatible(expected, &Type::string(), "regex pattern")?;
                for binding in bindings {
                    self.ctx.vars.insert(binding.clone(), Type::string());
                }
                Ok(pattern(
                    ir::PatternKind::Regex {
                        pattern: source.clone(),
                        bindings: bindings.clone(),
                    },
                    Type::string(),
                ))
            }
            PatternKind::Or(alternatives) => {
                let mut lowered = Vec::with_capacity(alternatives.len());
                for &alt in alternatives {
                    lowered.push(self.lower_pattern(alt, expected)?);
                }
                Ok(pattern(ir::PatternKind::Or(lowered), expected.clone()))
            }
            PatternKind::Tuple(elements) => self.lower_tuple_pattern(elements, expected),
            PatternKind::Array { elements, rest } => {
                let elem = match expected {
                    Type::Array(elem) => Type::clone(elem),
                    ty if is_unresolved(ty) => Type::auto(),
                    other => {
                        return Err(self.mismatch(format!(
                            "type mismatch: expected {}, got Array (array pattern)",
                            other
                        )))
                    }
                };
                let mut lowered = Vec::with_capacity(elements.len());
                for &element in elements {
                    lowered.push(self.lower_pattern(element, &elem)?);
                }
                if let Some(rest) = rest {
                    self.ctx.vars.insert(rest.clone(), Type::array(elem.clone()));
                }
                Ok(pattern(
                    ir::PatternKind::Array {
                        elements: lowered,
                        rest: rest.clone(),
                    },
                    Type::array(elem),
                ))
            }
            PatternKind::Record { name, fields } => self.lower_record_pattern(name, fields, expected),
        }
    }

    /// Constructor fields are typed by reading the owning type's arguments
    /// off the scrutinee.
    fn lower_constructor_pattern(
        &mut self,
        name: &SmolStr,
        fields: &[PatternId],
        expected: &Type,
    ) -> TypeResult<ir::Pattern> {
        let Some(ctor) = self.constructor_info(name)? else {
            return Err(TypeError::unknown(format!("unknown constructor '{}'", name)));
        };
        if !is_unresolved(expected) && type_name(expected).as_ref() != Some(&ctor.type_name) {
            return Err(self.mismatch(format!(
                "type mismatch: expected {}, got {} (constructor pattern '{}')",
                expected, ctor.type_name, name
            )));
        }
        if ctor.fields.len() != fields.len() {
            return Err(TypeError::arity(format!(
                "constructor '{}' expects {} field(s), got {}",
                name,
                ctor.fields.len(),
                fields.len()
            )));
        }

        let owner = self
            .named_type(&ctor.type_name)?
            .unwrap_or_else(|| Type::Primitive(ctor.type_name.clone()));
        let owner = Type::applied(owner, ctor.type_params.iter().map(TypeParam::as_type).collect());
        let subst = infer_substitutions(&ctor.type_params, &owner, expected);

        let mut lowered = Vec::with_capacity(fields.len());
        for (&field, field_ty) in fields.iter().zip(&ctor.fields) {
            let field_ty = apply(&self.resolve_type(field_ty)?, &subst);
            lowered.push(self.lower_pattern(field, &field_ty)?);
        }
        let ty = if is_unresolved(expected) {
            apply(&owner, &subst)
        } else {
            expected.clone()
        };
        Ok(pattern(
            ir::PatternKind::Constructor {
                name: ctor.name.clone(),
                fields: lowered,
            },
            ty,
        ))
    }

    /// `(a, b)` destructures a record's fields by position.
    fn lower_tuple_pattern(&mut self, elements: &[PatternId], expected: &Type) -> TypeResult<ir::Pattern> {
        let field_types: Vec<Type> = if is_unresolved(expected) {
            vec![Type::auto(); elements.len()]
        } else {
            match self.record_fields(expected)? {
                Some(fields) => fields.into_iter().map(|f| f.ty).collect(),
                None => {
                    return Err(self.mismatch(format!(
                        "type mismatch: expected {}, got a record (tuple pattern)",
                        expected
                    )))
                }
            }
        };
        if field_types.len() != elements.len() {
            return Err(TypeError::arity(format!(
                "tuple pattern on {} expects {} field(s), got {}",
                expected,
                field_types.len(),
                elements.len()
            )));
        }
        let mut lowered = Vec::with_capacity(elements.len());
        for (&element, ty) in elements.iter().zip(&field_types) {
            lowered.push(self.lower_pattern(element, ty)?);
        }
        Ok(pattern(ir::PatternKind::Tuple(lowered), expected.clone()))
    }

    fn lower_record_pattern(
        &mut self,
        name: &SmolStr,
        fields: &[(SmolStr, PatternId)],
        expected: &Type,
    ) -> TypeResult<ir::Pattern> {
        let ty = if is_unresolved(expected) {
            match self.named_type(name)? {
                Some(ty) => ty,
                None => return Err(TypeError::unknown(format!("unknown type '{}'", name))),
            }
        } else if type_name(expected).as_ref() == Some(name) {
            expected.clone()
        } else {
            return Err(self.mismatch(format!(
                "type mismatch: expected {}, got {} (record pattern)",
                expected, name
            )));
        };
        let Some(declared) = self.record_fields(&ty)? else {
            return Err(self.mismatch(format!("type '{}' is not a record", name)));
        };

        let mut lowered = Vec::with_capacity(fields.len());
        for (field, id) in fields {
            let Some(decl) = declared.iter().find(|f| f.name == *field) else {
                return Err(TypeError::unknown(format!("record '{}' has no field '{}'", name, field)));
            };
            let field_ty = decl.ty.clone();
            lowered.push((field.clone(), self.lower_pattern(*id, &field_ty)?));
        }
        Ok(pattern(
            ir::PatternKind::Record {
                name: name.clone(),
                fields: lowered,
            },
            ty,
        ))
    }
}

fn pattern(kind: ir::PatternKind, ty: Type) -> ir::Pattern {
    ir::Pattern { kind, ty }
}
