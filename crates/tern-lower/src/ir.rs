//! Typed intermediate representation handed to the code generator.
//!
//! Every expression, statement and pattern carries its resolved type.

use smol_str::SmolStr;
use std::fmt;
use tern_ast::{BinOp, Literal, Origin, UnaryOp};
use tern_typeck::{Coverage, EffectSet, Type, TypeParam, TypedArgument, TypedArm};

// ── Module ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Module {
    pub name: SmolStr,
    pub items: Vec<Item>,
    pub imports: Vec<Import>,
}

impl Module {
    pub fn func(&self, name: &str) -> Option<&Func> {
        self.items.iter().find_map(|item| match item {
            Item::Func(f) if f.name == name => Some(f),
            _ => None,
        })
    }

    pub fn type_decl(&self, name: &str) -> Option<&TypeDecl> {
        self.items.iter().find_map(|item| match item {
            Item::TypeDecl(t) if t.name == name => Some(t),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub path: SmolStr,
    pub alias: Option<SmolStr>,
    pub names: Vec<SmolStr>,
    /// Resolved against the standard library metadata.
    pub stdlib: bool,
}

#[derive(Clone, Debug)]
pub enum Item {
    TypeDecl(TypeDecl),
    Func(Func),
}

#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: SmolStr,
    pub type_params: Vec<TypeParam>,
    pub ty: Type,
    pub origin: Option<Origin>,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: SmolStr,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub struct Func {
    pub name: SmolStr,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub ret_type: Type,
    pub body: Option<Expr>,
    pub effects: EffectSet,
    pub external: bool,
    pub origin: Option<Origin>,
}

// ── Expressions ──────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub origin: Option<Origin>,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Lit(Literal),
    Var(SmolStr),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Call of a registered function, by its canonical name.
    Call {
        callee: SmolStr,
        args: Vec<Expr>,
        /// Instantiated type arguments, in type parameter order.
        type_args: Vec<Type>,
    },
    /// Call through a local variable of function type.
    CallLocal { callee: SmolStr, args: Vec<Expr> },
    /// Sum type constructor application: `Some(5)`, `None`.
    Construct {
        type_name: SmolStr,
        variant: SmolStr,
        args: Vec<Expr>,
    },
    /// Record literal, fields in declaration order.
    Record {
        name: SmolStr,
        fields: Vec<(SmolStr, Expr)>,
    },
    Field {
        object: Box<Expr>,
        field: SmolStr,
    },
    Array(Vec<Expr>),
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Block {
        stmts: Vec<Stmt>,
        result: Option<Box<Expr>>,
    },
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
        coverage: Option<Coverage>,
    },
    For {
        var: SmolStr,
        iterable: Box<Expr>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type, origin: Option<Origin>) -> Self {
        Self { kind, ty, origin }
    }
}

impl TypedArgument for Expr {
    fn arg_type(&self) -> &Type {
        &self.ty
    }

    fn assign_type(&mut self, ty: Type) {
        self.ty = ty;
    }
}

#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Let { name: SmolStr, value: Expr },
    Expr(Expr),
}

#[derive(Clone, Debug)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}

impl TypedArm for MatchArm {
    fn body_type(&self) -> Option<&Type> {
        Some(&self.body.ty)
    }
}

// ── Patterns ─────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Pattern {
    pub kind: PatternKind,
    pub ty: Type,
}

#[derive(Clone, Debug)]
pub enum PatternKind {
    Wildcard,
    Literal(Literal),
    Constructor { name: SmolStr, fields: Vec<Pattern> },
    Var(SmolStr),
    Regex {
        pattern: SmolStr,
        bindings: Vec<SmolStr>,
    },
    Or(Vec<Pattern>),
    Tuple(Vec<Pattern>),
    Array {
        elements: Vec<Pattern>,
        rest: Option<SmolStr>,
    },
    Record {
        name: SmolStr,
        fields: Vec<(SmolStr, Pattern)>,
    },
}

// ── Display ──────────────────────────────────────────────────────

/// One line per declaration: type declarations with their structure,
/// functions with their signature and effects.
impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for import in &self.imports {
            write!(f, "import {}", import.path)?;
            if let Some(alias) = &import.alias {
                write!(f, " as {}", alias)?;
            }
            writeln!(f)?;
        }
        for item in &self.items {
            match item {
                Item::TypeDecl(t) => writeln!(f, "{}", t)?,
                Item::Func(func) => writeln!(f, "{}", func)?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.name)?;
        write_type_params(f, &self.type_params)?;
        write!(f, " = ")?;
        match &self.ty {
            Type::Sum(sum) if sum.name == self.name => {
                for (i, v) in sum.variants.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", v.name)?;
                    if !v.fields.is_empty() {
                        let fields: Vec<String> = v.fields.iter().map(|fl| fl.ty.to_string()).collect();
                        write!(f, "({})", fields.join(", "))?;
                    }
                }
                Ok(())
            }
            Type::Record(rec) if rec.name == self.name => {
                let fields: Vec<String> = rec
                    .fields
                    .iter()
                    .map(|fl| format!("{}: {}", fl.name, fl.ty))
                    .collect();
                write!(f, "{{ {} }}", fields.join(", "))
            }
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.external {
            write!(f, "extern ")?;
        }
        write!(f, "fn {}", self.name)?;
        write_type_params(f, &self.type_params)?;
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        write!(f, "({}) -> {} {}", params.join(", "), self.ret_type, self.effects)
    }
}

fn write_type_params(f: &mut fmt::Formatter<'_>, params: &[TypeParam]) -> fmt::Result {
    if params.is_empty() {
        return Ok(());
    }
    let params: Vec<String> = params
        .iter()
        .map(|p| match &p.constraint {
            Some(c) => format!("{}: {}", p.name, c),
            None => p.name.to_string(),
        })
        .collect();
    write!(f, "<{}>", params.join(", "))
}
