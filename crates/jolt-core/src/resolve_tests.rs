//! Tests for overload resolution

use super::*;
use crate::test_utils::ClassHierarchy;
use crate::types::{OBJECT_CLASS, PrimitiveKind};

#[derive(Debug)]
struct Overload {
    id: usize,
    name: &'static str,
    params: Vec<JavaType>,
}

impl Candidate for Overload {
    fn name(&self) -> &str {
        self.name
    }

    fn parameter_types(&self) -> &[JavaType] {
        &self.params
    }
}

fn overloads(name: &'static str, signatures: Vec<Vec<JavaType>>) -> Vec<Overload> {
    signatures
        .into_iter()
        .enumerate()
        .map(|(id, params)| Overload { id, name, params })
        .collect()
}

fn int() -> JavaType {
    JavaType::Primitive(PrimitiveKind::Int)
}

fn long() -> JavaType {
    JavaType::Primitive(PrimitiveKind::Long)
}

fn object() -> JavaType {
    JavaType::class(OBJECT_CLASS)
}

fn pick(candidates: &[Overload], name: &str, args: &[JavaType]) -> Option<(usize, BoxingPlan)> {
    resolve(candidates, name, args, &ClassHierarchy::standard())
        .unwrap()
        .found()
        .map(|(candidate, plan)| (candidate.id, plan))
}

#[test]
fn test_primitive_preferred_over_wrapper() {
    // ArrayList.remove(Object) is declared before remove(int) on purpose
    let candidates = overloads(
        "remove",
        vec![vec![object()], vec![JavaType::class("java.lang.Integer")], vec![int()]],
    );
    let (id, plan) = pick(&candidates, "remove", &[int()]).unwrap();
    assert_eq!(id, 2);
    assert_eq!(plan, vec![Conversion::Identity]);
}

#[test]
fn test_boxing_plan_when_only_reference_applies() {
    let candidates = overloads("add", vec![vec![object()]]);
    let (_, plan) = pick(&candidates, "add", &[int()]).unwrap();
    assert_eq!(plan, vec![Conversion::BoxPrimitive(PrimitiveKind::Int)]);
}

#[test]
fn test_null_never_matches_primitive() {
    let candidates = overloads("abs", vec![vec![int()], vec![long()]]);
    assert!(pick(&candidates, "abs", &[JavaType::Null]).is_none());
}

#[test]
fn test_null_matches_reference() {
    let candidates = overloads("valueOf", vec![vec![int()], vec![object()]]);
    let (id, plan) = pick(&candidates, "valueOf", &[JavaType::Null]).unwrap();
    assert_eq!(id, 1);
    assert_eq!(plan, vec![Conversion::Identity]);
}

#[test]
fn test_widening_picks_narrowest() {
    let candidates = overloads(
        "abs",
        vec![
            vec![JavaType::Primitive(PrimitiveKind::Double)],
            vec![JavaType::Primitive(PrimitiveKind::Float)],
            vec![long()],
            vec![int()],
        ],
    );
    assert_eq!(pick(&candidates, "abs", &[int()]).unwrap().0, 3);
    assert_eq!(pick(&candidates, "abs", &[long()]).unwrap().0, 2);
    assert_eq!(
        pick(&candidates, "abs", &[JavaType::Primitive(PrimitiveKind::Short)]).unwrap().0,
        3
    );
}

#[test]
fn test_most_specific_reference() {
    let candidates = overloads(
        "append",
        vec![
            vec![object()],
            vec![JavaType::class("java.lang.CharSequence")],
            vec![JavaType::string()],
        ],
    );
    assert_eq!(pick(&candidates, "append", &[JavaType::string()]).unwrap().0, 2);
    assert_eq!(
        pick(&candidates, "append", &[JavaType::class("java.lang.StringBuilder")]).unwrap().0,
        1
    );
}

#[test]
fn test_arity_and_name_filter() {
    let candidates = overloads("substring", vec![vec![int()], vec![int(), int()]]);
    assert_eq!(pick(&candidates, "substring", &[int(), int()]).unwrap().0, 1);
    assert!(pick(&candidates, "substring", &[]).is_none());
    assert!(pick(&candidates, "subSequence", &[int()]).is_none());
}

#[test]
fn test_tie_keeps_first_declared() {
    let candidates = overloads(
        "put",
        vec![
            vec![JavaType::string(), object()],
            vec![object(), JavaType::string()],
        ],
    );
    let (id, _) = pick(&candidates, "put", &[JavaType::string(), JavaType::string()]).unwrap();
    assert_eq!(id, 0);
}

#[test]
fn test_duplicate_signatures_keep_first() {
    let candidates = overloads("append", vec![vec![JavaType::string()], vec![JavaType::string()]]);
    assert_eq!(pick(&candidates, "append", &[JavaType::string()]).unwrap().0, 0);
}

#[test]
fn test_primitive_array_boxed_into_object_array() {
    let candidates = overloads("asList", vec![vec![JavaType::array_of(object())]]);
    let (_, plan) = pick(
        &candidates,
        "asList",
        &[JavaType::array_of(JavaType::Primitive(PrimitiveKind::Double))],
    )
    .unwrap();
    assert_eq!(plan, vec![Conversion::BoxArray(PrimitiveKind::Double)]);
}

#[test]
fn test_primitive_array_overload_preferred_to_boxing() {
    let candidates = overloads(
        "copyOf",
        vec![
            vec![JavaType::array_of(object()), int()],
            vec![JavaType::array_of(int()), int()],
        ],
    );
    let (id, plan) = pick(&candidates, "copyOf", &[JavaType::array_of(int()), int()]).unwrap();
    assert_eq!(id, 1);
    assert_eq!(plan, vec![Conversion::Identity, Conversion::Identity]);
}

#[test]
fn test_more_specific_is_strict() {
    let oracle = ClassHierarchy::standard();
    assert!(more_specific(&[int()], &[long()], &oracle).unwrap());
    assert!(!more_specific(&[long()], &[int()], &oracle).unwrap());
    assert!(!more_specific(&[int()], &[int()], &oracle).unwrap());
}

#[test]
fn test_applicability_rejects_arity_mismatch() {
    let oracle = ClassHierarchy::standard();
    assert_eq!(applicability(&[int()], &[], &oracle).unwrap(), None);
}
