use la_arena::Arena;
use smol_str::SmolStr;
use std::collections::HashSet;
use tern_ast::{MatchArm, Pattern, PatternId, PatternKind};

use crate::compat::compatible;
use crate::config::CheckConfig;
use crate::error::{ErrorKind, TypeError, TypeResult};
use crate::registry::TypeRegistry;
use crate::types::{base_type_name, SumType, Type};

/// A lowered match arm, as far as the analyzer cares.
pub trait TypedArm {
    fn body_type(&self) -> Option<&Type>;
}

/// State the analyzer needs from its caller. Passed explicitly to
/// [`MatchAnalyzer::analyze`] so that arm lowering and type lookup can
/// share it in turn.
pub trait MatchContext {
    fn type_registry(&self) -> Option<&TypeRegistry>;
}

/// Which variants of a sum type a match covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coverage {
    pub type_name: SmolStr,
    /// Covered variants, in declaration order.
    pub covered: Vec<SmolStr>,
    pub declared: usize,
    pub catch_all: bool,
}

impl Coverage {
    pub fn is_exhaustive(&self) -> bool {
        self.catch_all || self.covered.len() == self.declared
    }
}

#[derive(Debug)]
pub struct MatchAnalysis<T> {
    /// Type of the first arm's body.
    pub result_type: Type,
    pub arms: Vec<T>,
    /// Present when exhaustiveness was checked against a sum type.
    pub coverage: Option<Coverage>,
    /// How many arm-against-reference checks were made.
    pub compatibility_checks: usize,
}

/// Types match arms and checks that matches over sum types are exhaustive.
#[derive(Clone, Debug)]
pub struct MatchAnalyzer {
    check_exhaustiveness: bool,
}

impl MatchAnalyzer {
    pub fn new(config: &CheckConfig) -> Self {
        Self {
            check_exhaustiveness: config.check_exhaustiveness,
        }
    }

    /// Lower every arm with `transform_arm`, check later arms against the
    /// first arm's body type, then check coverage of the scrutinee's variants.
    pub fn analyze<C, T, F>(
        &self,
        cx: &mut C,
        scrutinee_type: &Type,
        arms: &[MatchArm],
        patterns: &Arena<Pattern>,
        mut transform_arm: F,
    ) -> TypeResult<MatchAnalysis<T>>
    where
        C: MatchContext + ?Sized,
        T: TypedArm,
        F: FnMut(&mut C, &MatchArm) -> TypeResult<T>,
    {
        if arms.is_empty() {
            return Err(TypeError::internal(format!(
                "match on {} has no arms",
                scrutinee_type
            )));
        }

        let mut lowered = Vec::with_capacity(arms.len());
        let mut result_type: Option<Type> = None;
        let mut compatibility_checks = 0;
        for (i, arm) in arms.iter().enumerate() {
            let typed = transform_arm(cx, arm)?;
            let Some(body_ty) = typed.body_type() else {
                return Err(TypeError::internal(format!("match arm {} has no type", i + 1))
                    .or_origin(arm.origin.as_ref()));
            };
            match &result_type {
                None => result_type = Some(body_ty.clone()),
                Some(reference) => {
                    compatibility_checks += 1;
                    if !compatible(reference, body_ty) {
                        return Err(TypeError::mismatch(format!(
                            "type mismatch: expected {}, got {} (match arm {})",
                            reference,
                            body_ty,
                            i + 1
                        ))
                        .or_origin(arm.origin.as_ref()));
                    }
                }
            }
            lowered.push(typed);
        }
        let result_type = result_type.unwrap_or(Type::Unit);

        let coverage = if self.check_exhaustiveness {
            self.check_coverage(cx.type_registry(), scrutinee_type, arms, patterns)?
        } else {
            None
        };

        Ok(MatchAnalysis {
            result_type,
            arms: lowered,
            coverage,
            compatibility_checks,
        })
    }

    fn check_coverage(
        &self,
        registry: Option<&TypeRegistry>,
        scrutinee_type: &Type,
        arms: &[MatchArm],
        patterns: &Arena<Pattern>,
    ) -> TypeResult<Option<Coverage>> {
        let Some(registry) = registry else {
            return Ok(None);
        };
        let display = scrutinee_type.to_string();
        let name = base_type_name(&display);
        let Some(sum) = registry.get(name).and_then(Type::as_sum) else {
            return Ok(None);
        };

        let mut seen = HashSet::new();
        let mut catch_all = false;
        for arm in arms {
            // A guard may reject the value, so the arm proves nothing.
            if arm.guard.is_some() {
                continue;
            }
            if scan_pattern(arm.pattern, patterns, sum, &mut seen) {
                catch_all = true;
                break;
            }
        }

        let covered: Vec<SmolStr> = sum
            .variants
            .iter()
            .filter(|v| seen.contains(&v.name))
            .map(|v| v.name.clone())
            .collect();
        let coverage = Coverage {
            type_name: sum.name.clone(),
            covered,
            declared: sum.variants.len(),
            catch_all,
        };

        if !coverage.is_exhaustive() {
            let missing: Vec<&str> = sum
                .variants
                .iter()
                .filter(|v| !seen.contains(&v.name))
                .map(|v| v.name.as_str())
                .collect();
            return Err(TypeError::new(
                ErrorKind::NonExhaustive,
                format!(
                    "non-exhaustive match on '{}': missing variants: {}",
                    sum.name,
                    missing.join(", ")
                ),
            ));
        }
        Ok(Some(coverage))
    }
}

/// Record the variants `id` covers. Returns true if it matches anything.
fn scan_pattern(id: PatternId, patterns: &Arena<Pattern>, sum: &SumType, seen: &mut HashSet<SmolStr>) -> bool {
    match &patterns[id].kind {
        PatternKind::Wildcard => true,
        PatternKind::Var(name) => {
            if sum.variant(name).is_some() {
                seen.insert(name.clone());
                false
            } else {
                true
            }
        }
        PatternKind::Constructor { name, .. } => {
            seen.insert(name.clone());
            false
        }
        PatternKind::Or(alternatives) => alternatives
            .iter()
            .any(|&alt| scan_pattern(alt, patterns, sum, seen)),
        PatternKind::Literal(_)
        | PatternKind::Regex { .. }
        | PatternKind::Tuple(_)
        | PatternKind::Array { .. }
        | PatternKind::Record { .. } => false,
    }
}
