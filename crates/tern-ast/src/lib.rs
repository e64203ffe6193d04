pub mod build;

use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::fmt;

pub use build::AstBuilder;

// ── Source origins ────────────────────────────────────────────────

/// Where a node came from. Only used for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    pub file: SmolStr,
    pub line: u32,
    pub column: u32,
}

impl Origin {
    pub fn new(file: impl Into<SmolStr>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// ── ID types ──────────────────────────────────────────────────────

pub type ExprId = Idx<Expr>;
pub type TypeExprId = Idx<TypeExpr>;
pub type PatternId = Idx<Pattern>;

// ── Module ────────────────────────────────────────────────────────

/// A parsed compilation unit.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: SmolStr,
    pub items: Vec<Item>,
    pub exprs: Arena<Expr>,
    pub type_exprs: Arena<TypeExpr>,
    pub patterns: Arena<Pattern>,
}

impl Module {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            exprs: Arena::new(),
            type_exprs: Arena::new(),
            patterns: Arena::new(),
        }
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new("main")
    }
}

// ── Top-level items ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Item {
    Func(FuncDecl),
    Type(TypeDecl),
    Import(Import),
}

impl Item {
    pub fn origin(&self) -> Option<&Origin> {
        match self {
            Item::Func(d) => d.origin.as_ref(),
            Item::Type(d) => d.origin.as_ref(),
            Item::Import(d) => d.origin.as_ref(),
        }
    }
}

/// Function declaration: `fn name<T: C>(params) -> ret = body`.
///
/// A declaration without a body is an external function.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: SmolStr,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExprId>,
    pub body: Option<ExprId>,
    pub origin: Option<Origin>,
}

/// Type parameter with an optional named constraint: `T` or `T: Show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: SmolStr,
    pub constraint: Option<SmolStr>,
}

/// Function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: SmolStr,
    pub type_ann: TypeExprId,
    pub origin: Option<Origin>,
}

/// Type declaration: `type Name<T> = ...`
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: SmolStr,
    pub type_params: Vec<SmolStr>,
    pub body: TypeDeclBody,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone)]
pub enum TypeDeclBody {
    /// `{ x: i32, y: i32 }`
    Record(Vec<FieldDecl>),
    /// `Some(T) | None`
    Sum(Vec<VariantDecl>),
    /// `type Meters = f64`
    Alias(TypeExprId),
}

/// Named field of a record or variant. Positional variant fields are
/// named by their index (`"0"`, `"1"`, ...).
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: SmolStr,
    pub type_ann: TypeExprId,
}

#[derive(Debug, Clone)]
pub struct VariantDecl {
    pub name: SmolStr,
    pub fields: Vec<FieldDecl>,
    pub origin: Option<Origin>,
}

/// Import declaration: `import math`, `import math as m`, `import math.{sqrt}`.
#[derive(Debug, Clone)]
pub struct Import {
    pub path: SmolStr,
    pub alias: Option<SmolStr>,
    pub names: Vec<SmolStr>,
    pub origin: Option<Origin>,
}

// ── Expressions ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Literal value.
    Lit(Literal),
    /// Variable reference (also nullary constructors such as `None`).
    Var(SmolStr),
    /// Binary operation: `a + b`
    Binary { op: BinOp, lhs: ExprId, rhs: ExprId },
    /// Unary operation: `-a`, `!a`
    Unary { op: UnaryOp, operand: ExprId },
    /// Call of a named function or constructor: `f(args...)`, `Some(x)`
    Call { callee: SmolStr, args: Vec<ExprId> },
    /// Block: `{ stmts...; result }`
    Block {
        stmts: Vec<Stmt>,
        result: Option<ExprId>,
    },
    /// `if cond then a else b`
    If {
        condition: ExprId,
        then_branch: ExprId,
        else_branch: Option<ExprId>,
    },
    /// `match scrutinee | pattern => body ...`
    Match {
        scrutinee: ExprId,
        arms: Vec<MatchArm>,
    },
    /// Record literal: `Point { x: 1, y: 2 }`
    Record {
        name: SmolStr,
        fields: Vec<(SmolStr, ExprId)>,
    },
    /// Field access: `p.x`
    Field { object: ExprId, field: SmolStr },
    /// Array literal: `[a, b, c]`
    Array(Vec<ExprId>),
    /// Indexing: `xs[i]`
    Index { object: ExprId, index: ExprId },
    /// Loop: `for x in xs { body }`
    For {
        var: SmolStr,
        iterable: ExprId,
        body: ExprId,
    },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let name: ty = value`
    Let {
        name: SmolStr,
        type_ann: Option<TypeExprId>,
        value: ExprId,
        origin: Option<Origin>,
    },
    /// Expression statement.
    Expr(ExprId),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(SmolStr),
    Char(char),
    Bool(bool),
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A match arm: `| pattern if guard => body`
#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: PatternId,
    pub guard: Option<ExprId>,
    pub body: ExprId,
    pub origin: Option<Origin>,
}

// ── Patterns ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: PatternKind,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone)]
pub enum PatternKind {
    /// Wildcard: `_`
    Wildcard,
    /// Literal pattern: `0`, `"x"`
    Literal(Literal),
    /// Constructor: `None` or `Some(x)`
    Constructor { name: SmolStr, fields: Vec<PatternId> },
    /// Variable binding.
    Var(SmolStr),
    /// Regex match against a string, binding capture groups: `/(\w+)@(\w+)/`
    Regex {
        pattern: SmolStr,
        bindings: Vec<SmolStr>,
    },
    /// Alternatives: `Red | Green`
    Or(Vec<PatternId>),
    /// Positional destructuring: `(a, b)`
    Tuple(Vec<PatternId>),
    /// Array destructuring: `[a, b, ..rest]`
    Array {
        elements: Vec<PatternId>,
        rest: Option<SmolStr>,
    },
    /// Record destructuring: `Point { x, y: py }`
    Record {
        name: SmolStr,
        fields: Vec<(SmolStr, PatternId)>,
    },
}

// ── Type expressions ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// Named type with optional arguments: `i32`, `Option<T>`, `m::Point`
    Named { name: SmolStr, args: Vec<TypeExprId> },
    /// Array type: `[T]`
    Array(TypeExprId),
    /// Function type: `fn(A, B) -> R`
    Function {
        params: Vec<TypeExprId>,
        ret: TypeExprId,
    },
}
