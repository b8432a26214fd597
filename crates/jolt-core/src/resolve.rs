//! Overload resolution.
//!
//! Picks the single most specific method or constructor for a name and a list
//! of actual argument types. Candidates are considered in declaration order;
//! when two applicable candidates are equally specific the earlier one wins.
//! Nothing is cached: every call resolves from the candidate list again.

use crate::error::JavaResult;
use crate::types::{Conversion, JavaType, TypeOracle};

/// Something that can be chosen by overload resolution.
pub trait Candidate {
    fn name(&self) -> &str;
    fn parameter_types(&self) -> &[JavaType];
}

/// Per-argument conversions for a selected candidate.
pub type BoxingPlan = Vec<Conversion>;

/// Outcome of resolving a member.
#[derive(Debug)]
pub enum Resolution<'a, C> {
    Found { candidate: &'a C, plan: BoxingPlan },
    NotFound,
}

impl<'a, C> Resolution<'a, C> {
    pub fn found(self) -> Option<(&'a C, BoxingPlan)> {
        match self {
            Resolution::Found { candidate, plan } => Some((candidate, plan)),
            Resolution::NotFound => None,
        }
    }
}

/// Resolve `name` against `candidates` for the given actual argument types.
pub fn resolve<'a, C, I>(
    candidates: I,
    name: &str,
    arguments: &[JavaType],
    oracle: &dyn TypeOracle,
) -> JavaResult<Resolution<'a, C>>
where
    C: Candidate + 'a,
    I: IntoIterator<Item = &'a C>,
{
    let mut best: Option<(&'a C, BoxingPlan)> = None;

    for candidate in candidates {
        if candidate.name() != name || candidate.parameter_types().len() != arguments.len() {
            continue;
        }
        let Some(plan) = applicability(candidate.parameter_types(), arguments, oracle)? else {
            continue;
        };
        best = match best {
            Some((current, _))
                if !more_specific(candidate.parameter_types(), current.parameter_types(), oracle)? =>
            {
                best
            }
            _ => Some((candidate, plan)),
        };
    }

    match best {
        Some((candidate, plan)) => {
            tracing::trace!(
                member = name,
                parameters = %render(candidate.parameter_types()),
                "overload selected"
            );
            Ok(Resolution::Found { candidate, plan })
        }
        None => {
            tracing::trace!(member = name, arguments = %render(arguments), "no applicable overload");
            Ok(Resolution::NotFound)
        }
    }
}

/// The boxing plan if every argument is assignable to its formal parameter.
pub fn applicability(
    parameters: &[JavaType],
    arguments: &[JavaType],
    oracle: &dyn TypeOracle,
) -> JavaResult<Option<BoxingPlan>> {
    if parameters.len() != arguments.len() {
        return Ok(None);
    }
    let mut plan = Vec::with_capacity(parameters.len());
    for (formal, actual) in parameters.iter().zip(arguments) {
        if !formal.is_assignable_from(actual, oracle)? {
            return Ok(None);
        }
        plan.push(formal.conversion_from(actual));
    }
    Ok(Some(plan))
}

/// `x` is strictly more specific than `y`: each of x's parameters fits y's
/// corresponding parameter, and not the other way round.
pub fn more_specific(x: &[JavaType], y: &[JavaType], oracle: &dyn TypeOracle) -> JavaResult<bool> {
    Ok(all_assignable(y, x, oracle)? && !all_assignable(x, y, oracle)?)
}

fn all_assignable(targets: &[JavaType], sources: &[JavaType], oracle: &dyn TypeOracle) -> JavaResult<bool> {
    for (target, source) in targets.iter().zip(sources) {
        if !target.is_assignable_from(source, oracle)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn render(types: &[JavaType]) -> String {
    let names: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("({})", names.join(", "))
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
