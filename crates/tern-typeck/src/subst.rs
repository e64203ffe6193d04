use smol_str::SmolStr;
use std::collections::HashMap;
use std::rc::Rc;

use crate::types::{Field, FunctionType, GenericType, RecordType, SumType, Type, Variant};

/// Bindings from type-variable name to type.
pub type Substitution = HashMap<SmolStr, Type>;

/// Replace every bound type variable in `ty`. Unbound variables are left in
/// place, so substitution can be applied incrementally across several
/// inference steps. Subtrees without bound variables are shared, not rebuilt.
pub fn apply(ty: &Type, subst: &Substitution) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    apply_changed(ty, subst).unwrap_or_else(|| ty.clone())
}

/// `Some(rebuilt)` only if something below `ty` was replaced.
fn apply_changed(ty: &Type, subst: &Substitution) -> Option<Type> {
    match ty {
        Type::Variable(v) => subst.get(&v.name).cloned(),
        Type::Primitive(_) | Type::Unit | Type::Error(_) => None,
        Type::Array(elem) => apply_changed(elem, subst).map(|e| Type::Array(Rc::new(e))),
        Type::Generic(g) => {
            let base = apply_changed(&g.base, subst);
            let args = apply_all(&g.type_args, subst);
            if base.is_none() && args.is_none() {
                return None;
            }
            Some(Type::Generic(Rc::new(GenericType {
                base: base.unwrap_or_else(|| g.base.clone()),
                type_args: args.unwrap_or_else(|| g.type_args.clone()),
            })))
        }
        Type::Function(func) => {
            let params = apply_fields(&func.params, subst);
            let ret = apply_changed(&func.ret, subst);
            if params.is_none() && ret.is_none() {
                return None;
            }
            Some(Type::Function(Rc::new(FunctionType {
                params: params.unwrap_or_else(|| func.params.clone()),
                ret: ret.unwrap_or_else(|| func.ret.clone()),
            })))
        }
        Type::Record(r) => apply_fields(&r.fields, subst).map(|fields| {
            Type::Record(Rc::new(RecordType {
                name: r.name.clone(),
                fields,
            }))
        }),
        Type::Sum(s) => {
            let mut changed = false;
            let variants: Vec<Variant> = s
                .variants
                .iter()
                .map(|v| match apply_fields(&v.fields, subst) {
                    Some(fields) => {
                        changed = true;
                        Variant {
                            name: v.name.clone(),
                            fields,
                        }
                    }
                    None => v.clone(),
                })
                .collect();
            changed.then(|| {
                Type::Sum(Rc::new(SumType {
                    name: s.name.clone(),
                    variants,
                }))
            })
        }
    }
}

fn apply_all(types: &[Type], subst: &Substitution) -> Option<Vec<Type>> {
    let rebuilt: Vec<Option<Type>> = types.iter().map(|t| apply_changed(t, subst)).collect();
    if rebuilt.iter().all(Option::is_none) {
        return None;
    }
    Some(
        rebuilt
            .into_iter()
            .zip(types)
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect(),
    )
}

fn apply_fields(fields: &[Field], subst: &Substitution) -> Option<Vec<Field>> {
    let types: Vec<Type> = fields.iter().map(|f| f.ty.clone()).collect();
    apply_all(&types, subst).map(|types| {
        fields
            .iter()
            .zip(types)
            .map(|(f, ty)| Field {
                name: f.name.clone(),
                ty,
            })
            .collect()
    })
}
