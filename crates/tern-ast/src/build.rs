use smol_str::SmolStr;

use crate::*;

/// Incremental construction of a [`Module`].
///
/// Every node allocated through the builder receives the current origin,
/// which starts at `file:1:1` and is moved with [`AstBuilder::at`].
pub struct AstBuilder {
    module: Module,
    file: SmolStr,
    line: u32,
    column: u32,
}

impl AstBuilder {
    pub fn new(module_name: impl Into<SmolStr>) -> Self {
        let module = Module::new(module_name);
        let file = SmolStr::new(format!("{}.tern", module.name));
        Self {
            module,
            file,
            line: 1,
            column: 1,
        }
    }

    pub fn with_file(mut self, file: impl Into<SmolStr>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the origin attached to subsequently built nodes.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn finish(self) -> Module {
        self.module
    }

    fn origin(&self) -> Option<Origin> {
        Some(Origin::new(self.file.clone(), self.line, self.column))
    }

    // ── Type expressions ──────────────────────────────────────────

    pub fn ty(&mut self, name: &str) -> TypeExprId {
        self.ty_app(name, vec![])
    }

    pub fn ty_app(&mut self, name: &str, args: Vec<TypeExprId>) -> TypeExprId {
        self.type_expr(TypeExprKind::Named {
            name: name.into(),
            args,
        })
    }

    pub fn ty_array(&mut self, elem: TypeExprId) -> TypeExprId {
        self.type_expr(TypeExprKind::Array(elem))
    }

    pub fn ty_fn(&mut self, params: Vec<TypeExprId>, ret: TypeExprId) -> TypeExprId {
        self.type_expr(TypeExprKind::Function { params, ret })
    }

    fn type_expr(&mut self, kind: TypeExprKind) -> TypeExprId {
        let origin = self.origin();
        self.module.type_exprs.alloc(TypeExpr { kind, origin })
    }

    // ── Expressions ───────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let origin = self.origin();
        self.module.exprs.alloc(Expr { kind, origin })
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::Lit(Literal::Int(value)))
    }

    pub fn float(&mut self, value: f64) -> ExprId {
        self.expr(ExprKind::Lit(Literal::Float(value)))
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.expr(ExprKind::Lit(Literal::String(value.into())))
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.expr(ExprKind::Lit(Literal::Bool(value)))
    }

    pub fn unit(&mut self) -> ExprId {
        self.expr(ExprKind::Lit(Literal::Unit))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        self.expr(ExprKind::Var(name.into()))
    }

    pub fn binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::Binary { op, lhs, rhs })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.expr(ExprKind::Unary { op, operand })
    }

    pub fn call(&mut self, callee: &str, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Call {
            callee: callee.into(),
            args,
        })
    }

    pub fn block(&mut self, stmts: Vec<Stmt>, result: Option<ExprId>) -> ExprId {
        self.expr(ExprKind::Block { stmts, result })
    }

    pub fn if_else(
        &mut self,
        condition: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
    ) -> ExprId {
        self.expr(ExprKind::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    pub fn match_expr(&mut self, scrutinee: ExprId, arms: Vec<MatchArm>) -> ExprId {
        self.expr(ExprKind::Match { scrutinee, arms })
    }

    pub fn record(&mut self, name: &str, fields: Vec<(&str, ExprId)>) -> ExprId {
        let fields = fields
            .into_iter()
            .map(|(n, e)| (SmolStr::new(n), e))
            .collect();
        self.expr(ExprKind::Record {
            name: name.into(),
            fields,
        })
    }

    pub fn field(&mut self, object: ExprId, field: &str) -> ExprId {
        self.expr(ExprKind::Field {
            object,
            field: field.into(),
        })
    }

    pub fn array(&mut self, elements: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Array(elements))
    }

    pub fn index(&mut self, object: ExprId, index: ExprId) -> ExprId {
        self.expr(ExprKind::Index { object, index })
    }

    pub fn for_loop(&mut self, var: &str, iterable: ExprId, body: ExprId) -> ExprId {
        self.expr(ExprKind::For {
            var: var.into(),
            iterable,
            body,
        })
    }

    pub fn let_stmt(&mut self, name: &str, type_ann: Option<TypeExprId>, value: ExprId) -> Stmt {
        Stmt::Let {
            name: name.into(),
            type_ann,
            value,
            origin: self.origin(),
        }
    }

    pub fn arm(&mut self, pattern: PatternId, body: ExprId) -> MatchArm {
        MatchArm {
            pattern,
            guard: None,
            body,
            origin: self.origin(),
        }
    }

    pub fn guarded_arm(&mut self, pattern: PatternId, guard: ExprId, body: ExprId) -> MatchArm {
        MatchArm {
            pattern,
            guard: Some(guard),
            body,
            origin: self.origin(),
        }
    }

    // ── Patterns ──────────────────────────────────────────────────

    pub fn pattern(&mut self, kind: PatternKind) -> PatternId {
        let origin = self.origin();
        self.module.patterns.alloc(Pattern { kind, origin })
    }

    pub fn pat_wildcard(&mut self) -> PatternId {
        self.pattern(PatternKind::Wildcard)
    }

    pub fn pat_var(&mut self, name: &str) -> PatternId {
        self.pattern(PatternKind::Var(name.into()))
    }

    pub fn pat_lit(&mut self, lit: Literal) -> PatternId {
        self.pattern(PatternKind::Literal(lit))
    }

    pub fn pat_ctor(&mut self, name: &str, fields: Vec<PatternId>) -> PatternId {
        self.pattern(PatternKind::Constructor {
            name: name.into(),
            fields,
        })
    }

    pub fn pat_regex(&mut self, pattern: &str, bindings: &[&str]) -> PatternId {
        self.pattern(PatternKind::Regex {
            pattern: pattern.into(),
            bindings: bindings.iter().map(|b| SmolStr::new(b)).collect(),
        })
    }

    pub fn pat_or(&mut self, alternatives: Vec<PatternId>) -> PatternId {
        self.pattern(PatternKind::Or(alternatives))
    }

    pub fn pat_tuple(&mut self, elements: Vec<PatternId>) -> PatternId {
        self.pattern(PatternKind::Tuple(elements))
    }

    pub fn pat_array(&mut self, elements: Vec<PatternId>, rest: Option<&str>) -> PatternId {
        self.pattern(PatternKind::Array {
            elements,
            rest: rest.map(SmolStr::new),
        })
    }

    pub fn pat_record(&mut self, name: &str, fields: Vec<(&str, PatternId)>) -> PatternId {
        let fields = fields
            .into_iter()
            .map(|(n, p)| (SmolStr::new(n), p))
            .collect();
        self.pattern(PatternKind::Record {
            name: name.into(),
            fields,
        })
    }

    // ── Items ─────────────────────────────────────────────────────

    /// Add a function. `type_params` are `(name, constraint)` pairs.
    pub fn func(
        &mut self,
        name: &str,
        type_params: &[(&str, Option<&str>)],
        params: Vec<(&str, TypeExprId)>,
        return_type: Option<TypeExprId>,
        body: Option<ExprId>,
    ) {
        let origin = self.origin();
        let type_params = type_params
            .iter()
            .map(|(n, c)| TypeParam {
                name: SmolStr::new(n),
                constraint: c.map(SmolStr::new),
            })
            .collect();
        let params = params
            .into_iter()
            .map(|(n, t)| Param {
                name: n.into(),
                type_ann: t,
                origin: origin.clone(),
            })
            .collect();
        self.module.items.push(Item::Func(FuncDecl {
            name: name.into(),
            type_params,
            params,
            return_type,
            body,
            origin,
        }));
    }

    /// Add a sum type. Variant fields are positional and named `"0"`, `"1"`, ...
    pub fn sum_type(
        &mut self,
        name: &str,
        type_params: &[&str],
        variants: Vec<(&str, Vec<TypeExprId>)>,
    ) {
        let origin = self.origin();
        let variants = variants
            .into_iter()
            .map(|(n, fields)| VariantDecl {
                name: n.into(),
                fields: fields
                    .into_iter()
                    .enumerate()
                    .map(|(i, t)| FieldDecl {
                        name: SmolStr::new(i.to_string()),
                        type_ann: t,
                    })
                    .collect(),
                origin: origin.clone(),
            })
            .collect();
        self.type_decl(name, type_params, TypeDeclBody::Sum(variants));
    }

    pub fn record_type(&mut self, name: &str, type_params: &[&str], fields: Vec<(&str, TypeExprId)>) {
        let fields = fields
            .into_iter()
            .map(|(n, t)| FieldDecl {
                name: n.into(),
                type_ann: t,
            })
            .collect();
        self.type_decl(name, type_params, TypeDeclBody::Record(fields));
    }

    pub fn alias_type(&mut self, name: &str, type_params: &[&str], target: TypeExprId) {
        self.type_decl(name, type_params, TypeDeclBody::Alias(target));
    }

    fn type_decl(&mut self, name: &str, type_params: &[&str], body: TypeDeclBody) {
        let origin = self.origin();
        self.module.items.push(Item::Type(TypeDecl {
            name: name.into(),
            type_params: type_params.iter().map(|p| SmolStr::new(p)).collect(),
            body,
            origin,
        }));
    }

    pub fn import(&mut self, path: &str, alias: Option<&str>, names: &[&str]) {
        let origin = self.origin();
        self.module.items.push(Item::Import(Import {
            path: path.into(),
            alias: alias.map(SmolStr::new),
            names: names.iter().map(|n| SmolStr::new(n)).collect(),
            origin,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_carry_current_origin() {
        let mut b = AstBuilder::new("demo");
        let a = b.int(1);
        b.at(4, 9);
        let c = b.var("x");
        let module = b.finish();
        assert_eq!(module.exprs[a].origin, Some(Origin::new("demo.tern", 1, 1)));
        assert_eq!(
            module.exprs[c].origin.as_ref().map(|o| o.to_string()),
            Some("demo.tern:4:9".to_string())
        );
    }

    #[test]
    fn sum_type_fields_are_positional() {
        let mut b = AstBuilder::new("demo");
        let t = b.ty("T");
        b.sum_type("Option", &["T"], vec![("Some", vec![t]), ("None", vec![])]);
        let module = b.finish();
        let Item::Type(decl) = &module.items[0] else {
            panic!("expected type declaration");
        };
        let TypeDeclBody::Sum(variants) = &decl.body else {
            panic!("expected sum body");
        };
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].fields[0].name, "0");
        assert!(variants[1].fields.is_empty());
    }
}
