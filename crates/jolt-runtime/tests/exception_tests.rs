//! Foreign exception bridging tests

mod common;

use jolt_runtime::{JavaError, JavaObject, Value};

#[test]
fn test_exception_type_and_message() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    let err = integer.invoke("parseInt", &[Value::from("abc")]).unwrap_err();
    let foreign = err.as_foreign().expect("expected a foreign exception");
    assert_eq!(foreign.type_name, "java.lang.NumberFormatException");
    assert_eq!(foreign.message.as_deref(), Some("For input string: \"abc\""));
    assert!(foreign.causes.is_empty());
    assert_eq!(
        err.to_string(),
        "java.lang.NumberFormatException: For input string: \"abc\""
    );
}

#[test]
fn test_null_argument_raises_null_pointer_exception() {
    let Some(jvm) = common::runtime() else { return };
    // valueOf(char[]) is more specific than valueOf(Object) for null.
    let string = jvm.find_class("java.lang.String").unwrap();
    let err = string.invoke("valueOf", &[Value::Null]).unwrap_err();
    assert!(err.is_foreign("java.lang.NullPointerException"), "{err}");
}

#[test]
fn test_cause_chain() {
    let Some(jvm) = common::runtime() else { return };
    let inner = jvm
        .find_class("java.lang.IllegalStateException")
        .unwrap()
        .new_instance(&[Value::from("inner")])
        .unwrap();
    let future = jvm
        .find_class("java.util.concurrent.CompletableFuture")
        .unwrap()
        .new_instance(&[])
        .unwrap();
    future
        .invoke("completeExceptionally", &[Value::Object(inner)])
        .unwrap();

    let err = future.invoke("get", &[]).unwrap_err();
    let foreign = err.as_foreign().unwrap();
    assert_eq!(foreign.type_name, "java.util.concurrent.ExecutionException");
    assert_eq!(foreign.causes.len(), 1);
    assert_eq!(foreign.causes[0].type_name, "java.lang.IllegalStateException");
    assert_eq!(foreign.causes[0].message.as_deref(), Some("inner"));
    assert_eq!(foreign.root_type(), "java.lang.IllegalStateException");
    assert!(
        err.to_string()
            .ends_with(". Caused by: java.lang.IllegalStateException: inner"),
        "{err}"
    );
}

#[test]
fn test_null_message_is_omitted() {
    let Some(jvm) = common::runtime() else { return };
    let iterator = jvm
        .find_class("java.util.ArrayList")
        .unwrap()
        .new_instance(&[])
        .unwrap()
        .invoke("iterator", &[])
        .unwrap()
        .extract::<JavaObject>()
        .unwrap();
    let err = iterator.invoke("next", &[]).unwrap_err();
    let foreign = err.as_foreign().unwrap();
    assert_eq!(foreign.type_name, "java.util.NoSuchElementException");
    assert_eq!(err.to_string(), foreign.type_name);
}

#[test]
fn test_stack_trace_is_captured() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    let err = integer.invoke("parseInt", &[Value::from("")]).unwrap_err();
    let frames = err.as_foreign().unwrap().stack_trace.clone().unwrap_or_default();
    assert!(!frames.is_empty());
    assert!(frames.iter().any(|frame| frame.method_name == "parseInt"));
}

#[test]
fn test_constructor_exception() {
    let Some(jvm) = common::runtime() else { return };
    let list = jvm.find_class("java.util.ArrayList").unwrap();
    let err = list.new_instance(&[Value::Int(-1)]).unwrap_err();
    assert!(err.is_foreign("java.lang.IllegalArgumentException"), "{err}");
}

#[test]
fn test_runtime_recovers_after_exceptions() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    for _ in 0..100 {
        assert!(integer.invoke("parseInt", &[Value::from("x")]).is_err());
    }
    let parsed = integer.invoke("parseInt", &[Value::from("42")]).unwrap();
    assert_eq!(parsed, Value::Int(42));
}

#[test]
fn test_member_not_found_is_not_foreign() {
    let Some(jvm) = common::runtime() else { return };
    let text = jvm.new_string("abc").unwrap();
    let err = text.invoke("noSuchMethod", &[]).unwrap_err();
    assert!(err.as_foreign().is_none());
    assert!(matches!(err, JavaError::MemberNotFound { .. }));
}
