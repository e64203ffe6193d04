use smol_str::SmolStr;
use std::fmt;
use std::rc::Rc;

// ── Types ────────────────────────────────────────────────────────

/// A resolved type. Composite payloads are reference counted so that
/// substitution can share untouched subtrees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    /// Builtin scalar or not-yet-resolved named type: `i32`, `string`, `Point`
    Primitive(SmolStr),
    /// Type parameter: `T`, `T: Show`
    Variable(TypeVar),
    /// Homogeneous array: `Array<T>`
    Array(Rc<Type>),
    /// Nominal type applied to arguments: `Option<i32>`
    Generic(Rc<GenericType>),
    /// Function type: `fn(a: A, b: B) -> R`
    Function(Rc<FunctionType>),
    /// Record with named fields.
    Record(Rc<RecordType>),
    /// Closed tagged union.
    Sum(Rc<SumType>),
    Unit,
    /// Error sentinel, carries the reason it was produced.
    Error(SmolStr),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeVar {
    pub name: SmolStr,
    pub constraint: Option<SmolStr>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericType {
    pub base: Type,
    /// Never empty.
    pub type_args: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionType {
    pub params: Vec<Field>,
    pub ret: Type,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordType {
    pub name: SmolStr,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SumType {
    pub name: SmolStr,
    pub variants: Vec<Variant>,
}

/// A named slot: record field, variant field or function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: SmolStr,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub name: SmolStr,
    pub fields: Vec<Field>,
}

impl Field {
    pub fn new(name: impl Into<SmolStr>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl Variant {
    pub fn new(name: impl Into<SmolStr>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

impl SumType {
    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

impl RecordType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ── Constructors ─────────────────────────────────────────────────

impl Type {
    pub fn primitive(name: &str) -> Type {
        Type::Primitive(normalized_type_name(name))
    }

    pub fn var(name: impl Into<SmolStr>) -> Type {
        Type::Variable(TypeVar {
            name: name.into(),
            constraint: None,
        })
    }

    pub fn constrained_var(name: impl Into<SmolStr>, constraint: impl Into<SmolStr>) -> Type {
        Type::Variable(TypeVar {
            name: name.into(),
            constraint: Some(constraint.into()),
        })
    }

    pub fn array(element: Type) -> Type {
        Type::Array(Rc::new(element))
    }

    /// Build a generic application. Returns `None` when `type_args` is empty.
    pub fn generic(base: Type, type_args: Vec<Type>) -> Option<Type> {
        if type_args.is_empty() {
            return None;
        }
        Some(Type::Generic(Rc::new(GenericType { base, type_args })))
    }

    /// Apply `base` to `type_args`, or return `base` unchanged when there are none.
    pub fn applied(base: Type, type_args: Vec<Type>) -> Type {
        if type_args.is_empty() {
            base
        } else {
            Type::Generic(Rc::new(GenericType { base, type_args }))
        }
    }

    pub fn function(params: Vec<Field>, ret: Type) -> Type {
        Type::Function(Rc::new(FunctionType { params, ret }))
    }

    pub fn record(name: impl Into<SmolStr>, fields: Vec<Field>) -> Type {
        Type::Record(Rc::new(RecordType {
            name: name.into(),
            fields,
        }))
    }

    pub fn sum(name: impl Into<SmolStr>, variants: Vec<Variant>) -> Type {
        Type::Sum(Rc::new(SumType {
            name: name.into(),
            variants,
        }))
    }

    pub fn error(message: impl Into<SmolStr>) -> Type {
        Type::Error(message.into())
    }

    pub fn i32() -> Type {
        Type::Primitive(SmolStr::new_static("i32"))
    }

    pub fn f64() -> Type {
        Type::Primitive(SmolStr::new_static("f64"))
    }

    pub fn bool() -> Type {
        Type::Primitive(SmolStr::new_static("bool"))
    }

    pub fn string() -> Type {
        Type::Primitive(SmolStr::new_static("string"))
    }

    pub fn auto() -> Type {
        Type::Primitive(SmolStr::new_static("auto"))
    }

    /// The sum type this type ultimately names, looking through a generic application.
    pub fn as_sum(&self) -> Option<&SumType> {
        match self {
            Type::Sum(s) => Some(s),
            Type::Generic(g) => g.base.as_sum(),
            _ => None,
        }
    }

    /// The record type this type ultimately names, looking through a generic application.
    pub fn as_record(&self) -> Option<&RecordType> {
        match self {
            Type::Record(r) => Some(r),
            Type::Generic(g) => g.base.as_record(),
            _ => None,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Type::Primitive(n) if n == "auto")
    }
}

// ── Display ──────────────────────────────────────────────────────

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(name) => write!(f, "{}", name),
            Type::Variable(v) => write!(f, "{}", v.name),
            Type::Array(elem) => write!(f, "Array<{}>", elem),
            Type::Generic(g) => {
                write!(f, "{}<", g.base)?;
                for (i, a) in g.type_args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ">")
            }
            Type::Function(func) => {
                write!(f, "fn(")?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.ty)?;
                }
                write!(f, ") -> {}", func.ret)
            }
            Type::Record(r) => write!(f, "{}", r.name),
            Type::Sum(s) => write!(f, "{}", s.name),
            Type::Unit => write!(f, "unit"),
            Type::Error(_) => write!(f, "<error>"),
        }
    }
}

// ── Predicates ───────────────────────────────────────────────────

const INTEGER_TYPES: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize",
];

const FLOAT_TYPES: &[&str] = &["f32", "f64"];

/// Canonical spelling for builtin type names.
pub fn normalized_type_name(name: &str) -> SmolStr {
    let canonical = match name {
        "str" | "String" => "string",
        "int" => "i32",
        "float" => "f64",
        "Bool" | "boolean" => "bool",
        "void" | "()" | "Unit" => "unit",
        "Char" => "char",
        other => other,
    };
    SmolStr::new(canonical)
}

/// Nominal name of a type, if it has one.
pub fn type_name(ty: &Type) -> Option<SmolStr> {
    match ty {
        Type::Primitive(name) => Some(normalized_type_name(name)),
        Type::Variable(v) => Some(v.name.clone()),
        Type::Array(_) => Some(SmolStr::new_static("Array")),
        Type::Generic(g) => type_name(&g.base),
        Type::Record(r) => Some(r.name.clone()),
        Type::Sum(s) => Some(s.name.clone()),
        Type::Unit => Some(SmolStr::new_static("unit")),
        Type::Function(_) | Type::Error(_) => None,
    }
}

/// Numeric primitives. Type variables count as numeric so the check can be
/// deferred until they are bound.
pub fn is_numeric(ty: &Type) -> bool {
    is_integer(ty) || is_float(ty) || matches!(ty, Type::Variable(_))
}

pub fn is_integer(ty: &Type) -> bool {
    match ty {
        Type::Primitive(name) => INTEGER_TYPES.contains(&normalized_type_name(name).as_str()),
        _ => false,
    }
}

pub fn is_float(ty: &Type) -> bool {
    match ty {
        Type::Primitive(name) => FLOAT_TYPES.contains(&normalized_type_name(name).as_str()),
        _ => false,
    }
}

/// An empty or uppercase-leading name marks an unresolved type-parameter
/// reference or a not-yet-lowered declaration.
pub fn is_generic_type_name(name: &str) -> bool {
    name.chars().next().map_or(true, |c| c.is_uppercase())
}

pub fn is_error_type(ty: &Type) -> bool {
    matches!(ty, Type::Error(_))
}

pub fn is_unit_like(name: Option<&str>, ty: Option<&Type>) -> bool {
    let named_unit = name.is_some_and(|n| normalized_type_name(n) == "unit");
    let typed_unit = match ty {
        Some(Type::Unit) => true,
        Some(Type::Primitive(n)) => normalized_type_name(n) == "unit",
        _ => false,
    };
    named_unit || typed_unit
}

/// Check if a type mentions any unresolved type variables. The bodies of
/// nominal declarations are not inspected, only the arguments applied to them.
pub fn has_type_variables(ty: &Type) -> bool {
    match ty {
        Type::Variable(_) => true,
        Type::Array(e) => has_type_variables(e),
        Type::Generic(g) => g.type_args.iter().any(has_type_variables),
        Type::Function(func) => {
            func.params.iter().any(|p| has_type_variables(&p.ty)) || has_type_variables(&func.ret)
        }
        Type::Primitive(_) | Type::Record(_) | Type::Sum(_) | Type::Unit | Type::Error(_) => false,
    }
}

/// Strip a type's display name down to the declared name: everything before
/// the first `<`, and the final segment of a `::` path.
pub fn base_type_name(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    head.rsplit("::").next().unwrap_or(head)
}
