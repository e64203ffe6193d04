use la_arena::Arena;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::defs::{ConstructorInfo, FunctionId, FunctionInfo, TypeParam};
use crate::error::{ErrorKind, TypeError, TypeResult};
use crate::types::{FunctionType, GenericType, Type};

// ── Functions ────────────────────────────────────────────────────

/// Registered function signatures.
///
/// Entries are never mutated in place: every revision allocates a new
/// version in the arena and repoints the name, so earlier versions stay
/// reachable through [`FunctionInfo::previous`].
#[derive(Default)]
pub struct FunctionRegistry {
    versions: Arena<FunctionInfo>,
    current: HashMap<SmolStr, FunctionId>,
    /// Registration order, for deterministic iteration.
    order: Vec<SmolStr>,
    aliases: HashMap<SmolStr, SmolStr>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, info: FunctionInfo) -> TypeResult<FunctionId> {
        if self.current.contains_key(&info.name) {
            return Err(TypeError::new(
                ErrorKind::Duplicate,
                format!("function '{}' is already defined", info.name),
            ));
        }
        let name = info.name.clone();
        for alias in &info.aliases {
            self.aliases.insert(alias.clone(), name.clone());
        }
        let id = self.versions.alloc(info);
        self.current.insert(name.clone(), id);
        self.order.push(name);
        Ok(id)
    }

    pub fn add_alias(&mut self, alias: impl Into<SmolStr>, target: impl Into<SmolStr>) {
        self.aliases.insert(alias.into(), target.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.id(name).is_some()
    }

    /// Current version for `name` or one of its aliases.
    pub fn id(&self, name: &str) -> Option<FunctionId> {
        self.current.get(name).copied().or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.current.get(target).copied())
        })
    }

    pub fn get(&self, name: &str) -> Option<&FunctionInfo> {
        self.id(name).map(|id| &self.versions[id])
    }

    pub fn version(&self, id: FunctionId) -> &FunctionInfo {
        &self.versions[id]
    }

    /// Every version of `name`, newest first.
    pub fn versions(&self, name: &str) -> Vec<&FunctionInfo> {
        let mut out = Vec::new();
        let mut next = self.id(name);
        while let Some(id) = next {
            let info = &self.versions[id];
            out.push(info);
            next = info.previous;
        }
        out
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &SmolStr> {
        self.order.iter()
    }

    /// Replace the entry for `name` with `revise(current)`.
    pub fn revise(
        &mut self,
        name: &str,
        revise: impl FnOnce(&FunctionInfo) -> FunctionInfo,
    ) -> Option<FunctionId> {
        let old = self.id(name)?;
        let mut info = revise(&self.versions[old]);
        info.previous = Some(old);
        let key = self.versions[old].name.clone();
        let id = self.versions.alloc(info);
        self.current.insert(key, id);
        Some(id)
    }

    /// Swap every reference to the placeholder `name` in registered
    /// signatures for `resolved`. Returns how many entries were revised.
    pub fn refresh_type(&mut self, name: &str, resolved: &Type) -> usize {
        let mut revised = 0;
        for fn_name in self.order.clone() {
            let Some(id) = self.current.get(&fn_name).copied() else {
                continue;
            };
            let info = &self.versions[id];
            let params: Vec<Option<Type>> = info
                .param_types
                .iter()
                .map(|t| replace_placeholder(t, name, resolved))
                .collect();
            let ret = replace_placeholder(&info.ret_type, name, resolved);
            if ret.is_none() && params.iter().all(Option::is_none) {
                continue;
            }
            self.revise(&fn_name, |old| {
                let mut new = old.clone();
                for (slot, p) in new.param_types.iter_mut().zip(params) {
                    if let Some(p) = p {
                        *slot = p;
                    }
                }
                if let Some(ret) = ret {
                    new.ret_type = ret;
                }
                new
            });
            revised += 1;
        }
        revised
    }
}

/// Rewrite leaves naming `name` through array, generic and function
/// wrappers. `None` when nothing changed.
fn replace_placeholder(ty: &Type, name: &str, resolved: &Type) -> Option<Type> {
    match ty {
        Type::Primitive(n) if n == name => Some(resolved.clone()),
        Type::Array(elem) => replace_placeholder(elem, name, resolved).map(Type::array),
        Type::Generic(g) => {
            let base = replace_placeholder(&g.base, name, resolved);
            let args: Vec<Option<Type>> = g
                .type_args
                .iter()
                .map(|a| replace_placeholder(a, name, resolved))
                .collect();
            if base.is_none() && args.iter().all(Option::is_none) {
                return None;
            }
            Some(Type::Generic(Rc::new(GenericType {
                base: base.unwrap_or_else(|| g.base.clone()),
                type_args: args
                    .into_iter()
                    .zip(&g.type_args)
                    .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
                    .collect(),
            })))
        }
        Type::Function(func) => {
            let params: Vec<Option<Type>> = func
                .params
                .iter()
                .map(|p| replace_placeholder(&p.ty, name, resolved))
                .collect();
            let ret = replace_placeholder(&func.ret, name, resolved);
            if ret.is_none() && params.iter().all(Option::is_none) {
                return None;
            }
            let mut new = FunctionType::clone(func);
            for (slot, p) in new.params.iter_mut().zip(params) {
                if let Some(p) = p {
                    slot.ty = p;
                }
            }
            if let Some(ret) = ret {
                new.ret = ret;
            }
            Some(Type::Function(Rc::new(new)))
        }
        _ => None,
    }
}

// ── Types ────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct TypeEntry {
    ty: Type,
    type_params: Vec<TypeParam>,
}

/// Lowered type declarations and the constructors they introduce.
#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<SmolStr, TypeEntry>,
    constructors: HashMap<SmolStr, ConstructorInfo>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>, type_params: Vec<TypeParam>, ty: Type) -> TypeResult<()> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(TypeError::new(
                ErrorKind::Duplicate,
                format!("type '{}' is already defined", name),
            ));
        }
        self.types.insert(name, TypeEntry { ty, type_params });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name).map(|e| &e.ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn type_params(&self, name: &str) -> &[TypeParam] {
        self.types.get(name).map_or(&[], |e| &e.type_params)
    }

    /// Register every variant of the sum type `name` as a value constructor.
    pub fn register_constructors(&mut self, name: &str) -> TypeResult<()> {
        let Some(entry) = self.types.get(name) else {
            return Ok(());
        };
        let Some(sum) = entry.ty.as_sum() else {
            return Ok(());
        };
        let mut infos = Vec::new();
        for variant in &sum.variants {
            if let Some(existing) = self.constructors.get(&variant.name) {
                return Err(TypeError::new(
                    ErrorKind::Duplicate,
                    format!(
                        "constructor '{}' is already defined by type '{}'",
                        variant.name, existing.type_name
                    ),
                ));
            }
            infos.push(ConstructorInfo {
                name: variant.name.clone(),
                type_name: SmolStr::new(name),
                type_params: entry.type_params.clone(),
                fields: variant.fields.iter().map(|f| f.ty.clone()).collect(),
            });
        }
        for info in infos {
            self.constructors.insert(info.name.clone(), info);
        }
        Ok(())
    }

    pub fn constructor(&self, name: &str) -> Option<&ConstructorInfo> {
        self.constructors.get(name)
    }

    /// Replace placeholders for every registered type name inside `ty`.
    /// Each name is expanded once; a name its own expansion mentions again
    /// is left as a placeholder.
    pub fn resolve_placeholders(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        let mut expanded = HashSet::new();
        loop {
            let next = placeholder_names(&current)
                .into_iter()
                .filter(|n| !expanded.contains(n))
                .find_map(|n| {
                    let resolved = self.get(&n)?;
                    if matches!(resolved, Type::Primitive(p) if *p == n) {
                        return None;
                    }
                    let replaced = replace_placeholder(&current, &n, resolved)?;
                    Some((n, replaced))
                });
            match next {
                Some((name, t)) => {
                    expanded.insert(name);
                    current = t;
                }
                None => return current,
            }
        }
    }
}

fn placeholder_names(ty: &Type) -> Vec<SmolStr> {
    let mut out = Vec::new();
    collect_placeholders(ty, &mut out);
    out
}

fn collect_placeholders(ty: &Type, out: &mut Vec<SmolStr>) {
    match ty {
        Type::Primitive(n) => out.push(n.clone()),
        Type::Array(e) => collect_placeholders(e, out),
        Type::Generic(g) => {
            collect_placeholders(&g.base, out);
            for a in &g.type_args {
                collect_placeholders(a, out);
            }
        }
        Type::Function(func) => {
            for p in &func.params {
                collect_placeholders(&p.ty, out);
            }
            collect_placeholders(&func.ret, out);
        }
        _ => {}
    }
}
