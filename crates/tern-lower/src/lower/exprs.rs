use smol_str::SmolStr;
use std::collections::HashSet;
use tern_ast as ast;
use tern_ast::{BinOp, ExprId, Literal, UnaryOp};
use tern_typeck::{
    has_type_variables, is_float, is_integer, is_numeric, widen_numeric, ConstructorInfo, ErrorKind,
    Field, FunctionInfo, MatchAnalyzer, Type, TypeError, TypeParam, TypeResult,
};

use super::types::is_unresolved;
use super::Pipeline;
use crate::ir::{self, ExprKind};
use crate::scope::{OriginGuard, ScopeGuard};

type Lowered = (ExprKind, Type);

impl Pipeline<'_> {
    /// Lower one expression. `expected` is a hint from the context (a declared
    /// return type, a parameter type, the first branch) used to type literals
    /// and to instantiate generic return types; it is not checked here.
    pub(crate) fn lower_expr(&mut self, id: ExprId, expected: Option<&Type>) -> TypeResult<ir::Expr> {
        let module = self.module;
        let node = &module.exprs[id];
        let mut this = OriginGuard::new(self, node.origin.as_ref());
        match this.lower_expr_kind(&node.kind, expected) {
            Ok((kind, ty)) => Ok(ir::Expr::new(kind, ty, node.origin.clone())),
            Err(err) => Err(this.annotate(err)),
        }
    }

    fn lower_expr_kind(&mut self, kind: &ast::ExprKind, expected: Option<&Type>) -> TypeResult<Lowered> {
        match kind {
            ast::ExprKind::Lit(lit) => Ok((ExprKind::Lit(lit.clone()), literal_type(lit, expected))),
            ast::ExprKind::Var(name) => self.lower_var(name, expected),
            ast::ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, *lhs, *rhs),
            ast::ExprKind::Unary { op, operand } => self.lower_unary(*op, *operand),
            ast::ExprKind::Call { callee, args } => self.lower_call(callee, args, expected),
            ast::ExprKind::Block { stmts, result } => self.lower_block(stmts, *result, expected),
            ast::ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_if(*condition, *then_branch, *else_branch, expected),
            ast::ExprKind::Match { scrutinee, arms } => self.lower_match(*scrutinee, arms, expected),
            ast::ExprKind::Record { name, fields } => self.lower_record(name, fields, expected),
            ast::ExprKind::Field { object, field } => self.lower_field(*object, field),
            ast::ExprKind::Array(elements) => self.lower_array(elements, expected),
            ast::ExprKind::Index { object, index } => self.lower_index(*object, *index),
            ast::ExprKind::For {
                var,
                iterable,
                body,
            } => self.lower_for(var, *iterable, *body),
        }
    }

    // ── Names ───────────────────────────────────────────────────

    fn lower_var(&mut self, name: &SmolStr, expected: Option<&Type>) -> TypeResult<Lowered> {
        if let Some(ty) = self.ctx.vars.get(name) {
            return Ok((ExprKind::Var(name.clone()), ty.clone()));
        }
        if let Some(info) = self.callable(name)? {
            let params = info
                .param_types
                .iter()
                .enumerate()
                .map(|(i, ty)| Field::new(i.to_string(), ty.clone()))
                .collect();
            return Ok((ExprKind::Var(info.name.clone()), Type::function(params, info.ret_type)));
        }
        if let Some(ctor) = self.constructor_info(name)? {
            return self.lower_construct(&ctor, Vec::new(), expected);
        }
        Err(TypeError::unknown(format!("undefined variable '{}'", name)))
    }

    // ── Calls ───────────────────────────────────────────────────

    fn lower_call(&mut self, callee: &SmolStr, args: &[ExprId], expected: Option<&Type>) -> TypeResult<Lowered> {
        if let Some(local) = self.ctx.vars.get(callee).cloned() {
            return self.lower_local_call(callee, &local, args);
        }
        if let Some(info) = self.callable(callee)? {
            return self.lower_function_call(&info, args, expected);
        }
        if let Some(ctor) = self.constructor_info(callee)? {
            if ctor.fields.len() != args.len() {
                return Err(ctor_arity(&ctor, args.len()));
            }
            let mut fields = Vec::with_capacity(ctor.fields.len());
            for field in &ctor.fields {
                fields.push(self.resolve_type(field)?);
            }
            let lowered = self.lower_args(args, &fields)?;
            return self.lower_construct(&ctor, lowered, expected);
        }
        Err(TypeError::unknown(format!("undefined function '{}'", callee)))
    }

    /// Lower call arguments, hinting each with its parameter type when that
    /// type is already concrete.
    fn lower_args(&mut self, args: &[ExprId], params: &[Type]) -> TypeResult<Vec<ir::Expr>> {
        let mut lowered = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let hint = params.get(i).filter(|ty| !has_type_variables(ty));
            lowered.push(self.lower_expr(arg, hint)?);
        }
        Ok(lowered)
    }

    fn lower_function_call(
        &mut self,
        info: &FunctionInfo,
        args: &[ExprId],
        expected: Option<&Type>,
    ) -> TypeResult<Lowered> {
        let mut lowered = self.lower_args(args, &info.param_types)?;
        let inst = self
            .resolver
            .instantiate(info, &mut lowered, &info.name, expected)
            .map_err(|e| self.observe(e))?;
        self.record_instantiation(&info.name, &info.type_params, &inst);
        let type_args = info
            .type_params
            .iter()
            .map(|p| inst.type_map.get(&p.name).cloned().unwrap_or_else(|| p.as_type()))
            .collect();
        Ok((
            ExprKind::Call {
                callee: info.name.clone(),
                args: lowered,
                type_args,
            },
            inst.ret_type,
        ))
    }

    fn lower_local_call(&mut self, name: &SmolStr, ty: &Type, args: &[ExprId]) -> TypeResult<Lowered> {
        if is_unresolved(ty) {
            let lowered = self.lower_args(args, &[])?;
            return Ok((
                ExprKind::CallLocal {
                    callee: name.clone(),
                    args: lowered,
                },
                Type::auto(),
            ));
        }
        let Type::Function(func) = ty else {
            return Err(self.mismatch(format!("'{}' is not a function (type {})", name, ty)));
        };
        if func.params.len() != args.len() {
            return Err(TypeError::arity(format!(
                "function '{}' expects {} argument(s), got {}",
                name,
                func.params.len(),
                args.len()
            )));
        }
        let params: Vec<Type> = func.params.iter().map(|p| p.ty.clone()).collect();
        let lowered = self.lower_args(args, &params)?;
        for (i, (param, arg)) in params.iter().zip(&lowered).enumerate() {
            self.ensure_compatible(param, &arg.ty, format_args!("argument {} of '{}'", i + 1, name))?;
        }
        Ok((
            ExprKind::CallLocal {
                callee: name.clone(),
                args: lowered,
            },
            func.ret.clone(),
        ))
    }

    /// Apply a constructor to already lowered arguments. Constructors are
    /// instantiated like a function from their fields to the owning type.
    fn lower_construct(
        &mut self,
        ctor: &ConstructorInfo,
        mut args: Vec<ir::Expr>,
        expected: Option<&Type>,
    ) -> TypeResult<Lowered> {
        if ctor.fields.len() != args.len() {
            return Err(ctor_arity(ctor, args.len()));
        }
        let owner = self
            .named_type(&ctor.type_name)?
            .ok_or_else(|| TypeError::internal(format!("constructor '{}' has no registered type", ctor.name)))?;
        let mut fields = Vec::with_capacity(ctor.fields.len());
        for field in &ctor.fields {
            fields.push(self.resolve_type(field)?);
        }
        let ret = Type::applied(owner, ctor.type_params.iter().map(TypeParam::as_type).collect());
        let info = FunctionInfo::new(ctor.name.clone(), fields, ret).with_type_params(ctor.type_params.clone());
        let inst = self
            .resolver
            .instantiate(&info, &mut args, &ctor.name, expected)
            .map_err(|e| self.observe(e))?;
        self.record_instantiation(&ctor.name, &ctor.type_params, &inst);
        Ok((
            ExprKind::Construct {
                type_name: ctor.type_name.clone(),
                variant: ctor.name.clone(),
                args,
            },
            inst.ret_type,
        ))
    }

    // ── Records and arrays ──────────────────────────────────────

    fn lower_record(
        &mut self,
        name: &SmolStr,
        fields: &[(SmolStr, ExprId)],
        expected: Option<&Type>,
    ) -> TypeResult<Lowered> {
        let Some(ty) = self.named_type(name)? else {
            return Err(TypeError::unknown(format!("unknown type '{}'", name)));
        };
        let Some(declared) = self.record_fields(&ty)? else {
            return Err(self.mismatch(format!("type '{}' is not a record", name)));
        };

        let mut given = HashSet::new();
        for (field, _) in fields {
            if !declared.iter().any(|f| f.name == *field) {
                return Err(TypeError::unknown(format!("record '{}' has no field '{}'", name, field)));
            }
            if !given.insert(field) {
                return Err(TypeError::new(
                    ErrorKind::Duplicate,
                    format!("field '{}' is given twice in record '{}'", field, name),
                ));
            }
        }

        // Fields are checked in declaration order, whatever order they were written in.
        let mut args = Vec::with_capacity(declared.len());
        for field in &declared {
            let Some((_, value)) = fields.iter().find(|(n, _)| *n == field.name) else {
                return Err(TypeError::arity(format!(
                    "record '{}' is missing field '{}'",
                    name, field.name
                )));
            };
            let hint = Some(&field.ty).filter(|ty| !has_type_variables(ty));
            args.push(self.lower_expr(*value, hint)?);
        }

        let type_params = self.ctx.types.type_params(name).to_vec();
        let ret = Type::applied(ty, type_params.iter().map(TypeParam::as_type).collect());
        let field_types = declared.iter().map(|f| f.ty.clone()).collect();
        let info = FunctionInfo::new(name.clone(), field_types, ret).with_type_params(type_params.clone());
        let inst = self
            .resolver
            .instantiate(&info, &mut args, name, expected)
            .map_err(|e| self.observe(e))?;
        self.record_instantiation(name, &type_params, &inst);

        let fields = declared.into_iter().map(|f| f.name).zip(args).collect();
        Ok((
            ExprKind::Record {
                name: name.clone(),
                fields,
            },
            inst.ret_type,
        ))
    }

    fn lower_field(&mut self, object: ExprId, field: &SmolStr) -> TypeResult<Lowered> {
        let object = self.lower_expr(object, None)?;
        let object_ty = self.resolve_type(&object.ty)?;
        let ty = if is_unresolved(&object_ty) {
            Type::auto()
        } else {
            let found = self
                .record_fields(&object_ty)?
                .and_then(|fields| fields.into_iter().find(|f| f.name == *field));
            match found {
                Some(f) => f.ty,
                None => {
                    return Err(TypeError::unknown(format!(
                        "no field '{}' on type {}",
                        field, object_ty
                    )))
                }
            }
        };
        Ok((
            ExprKind::Field {
                object: Box::new(object),
                field: field.clone(),
            },
            ty,
        ))
    }

    /// The first element fixes the element type; later elements must agree with it.
    fn lower_array(&mut self, elements: &[ExprId], expected: Option<&Type>) -> TypeResult<Lowered> {
        let hint = match expected {
            Some(Type::Array(elem)) => Some(Type::clone(elem)),
            _ => None,
        };
        let mut lowered: Vec<ir::Expr> = Vec::with_capacity(elements.len());
        for (i, &element) in elements.iter().enumerate() {
            let reference = lowered.first().map(|first| first.ty.clone());
            let expr = self.lower_expr(element, reference.as_ref().or(hint.as_ref()))?;
            if let Some(reference) = &reference {
                self.ensure_compatible(reference, &expr.ty, format_args!("array element {}", i + 1))?;
            }
            lowered.push(expr);
        }
        let elem = lowered
            .first()
            .map(|first| first.ty.clone())
            .or(hint)
            .unwrap_or_else(Type::auto);
        Ok((ExprKind::Array(lowered), Type::array(elem)))
    }

    fn lower_index(&mut self, object: ExprId, index: ExprId) -> TypeResult<Lowered> {
        let object = self.lower_expr(object, None)?;
        let index = self.lower_expr(index, None)?;
        let elem = match &object.ty {
            Type::Array(elem) => Type::clone(elem),
            ty if is_unresolved(ty) => Type::auto(),
            other => {
                return Err(self.mismatch(format!(
                    "type mismatch: expected Array, got {} (indexed value)",
                    other
                )))
            }
        };
        if !is_integer(&index.ty) && !is_unresolved(&index.ty) {
            return Err(self.mismatch(format!(
                "type mismatch: expected integer, got {} (array index)",
                index.ty
            )));
        }
        Ok((
            ExprKind::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            elem,
        ))
    }

    // ── Operators ───────────────────────────────────────────────

    fn lower_binary(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> TypeResult<Lowered> {
        let lhs = self.lower_expr(lhs, None)?;
        let hint = if op.is_logical() {
            Some(Type::bool())
        } else {
            Some(lhs.ty.clone()).filter(|ty| !is_unresolved(ty))
        };
        let rhs = self.lower_expr(rhs, hint.as_ref())?;

        let ty = if op.is_arithmetic() {
            self.arithmetic_type(op, &lhs.ty, &rhs.ty)?
        } else if op.is_comparison() {
            self.ensure_compatible(&lhs.ty, &rhs.ty, format_args!("operator '{}'", op.symbol()))?;
            Type::bool()
        } else {
            let context = format!("operator '{}'", op.symbol());
            self.ensure_compatible(&Type::bool(), &lhs.ty, &context)?;
            self.ensure_compatible(&Type::bool(), &rhs.ty, &context)?;
            Type::bool()
        };
        Ok((
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        ))
    }

    fn arithmetic_type(&mut self, op: BinOp, lhs: &Type, rhs: &Type) -> TypeResult<Type> {
        if is_unresolved(lhs) {
            return Ok(rhs.clone());
        }
        if is_unresolved(rhs) {
            return Ok(lhs.clone());
        }
        if op == BinOp::Add && is_string(lhs) && is_string(rhs) {
            return Ok(Type::string());
        }
        if !is_numeric(lhs) || !is_numeric(rhs) {
            return Err(self.mismatch(format!(
                "operator '{}' expects numeric operands, got {} and {}",
                op.symbol(),
                lhs,
                rhs
            )));
        }
        Ok(widen_numeric(lhs, rhs))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: ExprId) -> TypeResult<Lowered> {
        let operand = self.lower_expr(operand, None)?;
        let ty = match op {
            UnaryOp::Neg => {
                if !is_numeric(&operand.ty) && !is_unresolved(&operand.ty) {
                    return Err(self.mismatch(format!(
                        "operator '-' expects a numeric operand, got {}",
                        operand.ty
                    )));
                }
                operand.ty.clone()
            }
            UnaryOp::Not => {
                self.ensure_compatible(&Type::bool(), &operand.ty, "operator '!'")?;
                Type::bool()
            }
        };
        Ok((
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        ))
    }

    // ── Control flow ────────────────────────────────────────────

    fn lower_block(
        &mut self,
        stmts: &[ast::Stmt],
        result: Option<ExprId>,
        expected: Option<&Type>,
    ) -> TypeResult<Lowered> {
        let mut scope = ScopeGuard::new(self);
        let mut lowered = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            lowered.push(scope.lower_stmt(stmt)?);
        }
        let result = match result {
            Some(id) => Some(Box::new(scope.lower_expr(id, expected)?)),
            None => None,
        };
        let ty = result.as_ref().map_or(Type::Unit, |r| r.ty.clone());
        Ok((
            ExprKind::Block {
                stmts: lowered,
                result,
            },
            ty,
        ))
    }

    fn lower_stmt(&mut self, stmt: &ast::Stmt) -> TypeResult<ir::Stmt> {
        match stmt {
            ast::Stmt::Let {
                name,
                type_ann,
                value,
                origin,
            } => {
                let mut this = OriginGuard::new(self, origin.as_ref());
                let declared = match type_ann {
                    Some(ann) => {
                        let ty = this.lower_type_expr(*ann)?;
                        Some(this.resolve_type(&ty)?)
                    }
                    None => None,
                };
                let value = this.lower_expr(*value, declared.as_ref())?;
                let ty = match declared {
                    Some(declared) => {
                        this.ensure_compatible(&declared, &value.ty, format_args!("let binding '{}'", name))?;
                        declared
                    }
                    None => value.ty.clone(),
                };
                this.ctx.vars.insert(name.clone(), ty.clone());
                Ok(ir::Stmt {
                    kind: ir::StmtKind::Let {
                        name: name.clone(),
                        value,
                    },
                    ty,
                })
            }
            ast::Stmt::Expr(id) => {
                let expr = self.lower_expr(*id, None)?;
                let ty = expr.ty.clone();
                Ok(ir::Stmt {
                    kind: ir::StmtKind::Expr(expr),
                    ty,
                })
            }
        }
    }

    fn lower_if(
        &mut self,
        condition: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
        expected: Option<&Type>,
    ) -> TypeResult<Lowered> {
        let condition = self.lower_expr(condition, Some(&Type::bool()))?;
        self.ensure_compatible(&Type::bool(), &condition.ty, "if condition")?;
        let then_branch = self.lower_expr(then_branch, expected)?;

        let (else_branch, ty) = match else_branch {
            Some(id) => {
                let hint = if is_unresolved(&then_branch.ty) {
                    expected.cloned()
                } else {
                    Some(then_branch.ty.clone())
                };
                let else_branch = self.lower_expr(id, hint.as_ref())?;
                self.ensure_compatible(&then_branch.ty, &else_branch.ty, "else branch")?;
                let ty = if is_unresolved(&then_branch.ty) {
                    else_branch.ty.clone()
                } else {
                    then_branch.ty.clone()
                };
                (Some(Box::new(else_branch)), ty)
            }
            None => (None, Type::Unit),
        };
        Ok((
            ExprKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            ty,
        ))
    }

    fn lower_match(&mut self, scrutinee: ExprId, arms: &[ast::MatchArm], expected: Option<&Type>) -> TypeResult<Lowered> {
        let scrutinee = self.lower_expr(scrutinee, None)?;
        let scrutinee_ty = self.resolve_type(&scrutinee.ty)?;
        let module = self.module;

        // Errors raised inside an arm were reported where they arose.
        let mut arm_failed = false;
        let analysis = MatchAnalyzer::new(&self.config.check).analyze(
            self,
            &scrutinee_ty,
            arms,
            &module.patterns,
            |this, arm| {
                let lowered = this.lower_arm(arm, &scrutinee_ty, expected);
                arm_failed |= lowered.is_err();
                lowered
            },
        );
        let analysis = match analysis {
            Ok(analysis) => analysis,
            Err(err) if arm_failed => return Err(err),
            Err(err) => return Err(self.observe(err)),
        };

        tracing::trace!(
            scrutinee = %scrutinee_ty,
            arms = analysis.arms.len(),
            checks = analysis.compatibility_checks,
            "analyzed match"
        );
        Ok((
            ExprKind::Match {
                scrutinee: Box::new(scrutinee),
                arms: analysis.arms,
                coverage: analysis.coverage,
            },
            analysis.result_type,
        ))
    }

    fn lower_for(&mut self, var: &SmolStr, iterable: ExprId, body: ExprId) -> TypeResult<Lowered> {
        let iterable = self.lower_expr(iterable, None)?;
        let elem = match &iterable.ty {
            Type::Array(elem) => Type::clone(elem),
            ty if is_unresolved(ty) => Type::auto(),
            other => {
                return Err(self.mismatch(format!(
                    "type mismatch: expected Array, got {} (for loop iterable)",
                    other
                )))
            }
        };
        let body = {
            let mut scope = ScopeGuard::new(self);
            scope.bind(var.clone(), elem);
            scope.lower_expr(body, None)?
        };
        Ok((
            ExprKind::For {
                var: var.clone(),
                iterable: Box::new(iterable),
                body: Box::new(body),
            },
            Type::Unit,
        ))
    }
}

/// Type of a literal, taking the expected numeric width when it fits.
pub(super) fn literal_type(lit: &Literal, expected: Option<&Type>) -> Type {
    match lit {
        Literal::Int(_) => match expected {
            Some(ty) if is_integer(ty) => ty.clone(),
            _ => Type::i32(),
        },
        Literal::Float(_) => match expected {
            Some(ty) if is_float(ty) => ty.clone(),
            _ => Type::f64(),
        },
        Literal::String(_) => Type::string(),
        Literal::Char(_) => Type::primitive("char"),
        Literal::Bool(_) => Type::bool(),
        Literal::Unit => Type::Unit,
    }
}

fn is_string(ty: &Type) -> bool {
    matches!(ty, Type::Primitive(name) if name == "string")
}

fn ctor_arity(ctor: &ConstructorInfo, got: usize) -> TypeError {
    TypeError::arity(format!(
        "constructor '{}' expects {} field(s), got {}",
        ctor.name,
        ctor.fields.len(),
        got
    ))
}
