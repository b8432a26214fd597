//! Class and object proxy tests: fields, overloads, boxing and pseudo-members

mod common;

use jolt_runtime::{JavaError, JavaObject, Value};

// ============================================================================
// Static members
// ============================================================================

#[test]
fn test_static_primitive_field() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    assert_eq!(integer.get("MAX_VALUE").unwrap(), Value::Int(i32::MAX));
    assert_eq!(integer.get("MIN_VALUE").unwrap().extract::<i32>().unwrap(), i32::MIN);
}

#[test]
fn test_static_object_field() {
    let Some(jvm) = common::runtime() else { return };
    let system = jvm.find_class("java.lang.System").unwrap();
    let out = system.get("out").unwrap().extract::<JavaObject>().unwrap();
    let class = out.class().unwrap();
    assert_eq!(class.name(), "java.io.PrintStream");
}

#[test]
fn test_class_pseudo_property() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    let class_object = integer.get("class").unwrap().extract::<JavaObject>().unwrap();
    assert_eq!(class_object.java_to_string().unwrap(), "class java.lang.Integer");
    assert_eq!(
        class_object.invoke("getSimpleName", &[]).unwrap().extract::<String>().unwrap(),
        "Integer"
    );
}

#[test]
fn test_missing_static_field() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    assert!(matches!(integer.get("NOPE"), Err(JavaError::MemberNotFound { .. })));
    assert!(matches!(integer.set("NOPE", Value::Int(1)), Err(JavaError::MemberNotFound { .. })));
}

#[test]
fn test_instance_field_is_not_static() {
    let Some(jvm) = common::runtime() else { return };
    let point = jvm.find_class("java.awt.Point").unwrap();
    assert!(matches!(point.get("x"), Err(JavaError::MemberNotFound { .. })));
}

#[test]
fn test_static_method_overloads() {
    let Some(jvm) = common::runtime() else { return };
    let math = jvm.find_class("java.lang.Math").unwrap();
    assert_eq!(math.invoke("max", &[Value::Int(3), Value::Int(9)]).unwrap(), Value::Int(9));
    assert_eq!(math.invoke("max", &[Value::Int(3), Value::Long(9)]).unwrap(), Value::Long(9));
    assert_eq!(
        math.invoke("max", &[Value::Float(1.5), Value::Double(0.5)]).unwrap(),
        Value::Double(1.5)
    );
    assert_eq!(math.invoke("abs", &[Value::Short(-4)]).unwrap(), Value::Int(4));
}

#[test]
fn test_static_method_not_found() {
    let Some(jvm) = common::runtime() else { return };
    let math = jvm.find_class("java.lang.Math").unwrap();
    let err = math.invoke("max", &[Value::from("a"), Value::Int(1)]).unwrap_err();
    match err {
        JavaError::MemberNotFound { target, member } => {
            assert_eq!(target, "java.lang.Math");
            assert_eq!(member, "max(java.lang.String, int)");
        }
        other => panic!("unexpected error {other:?}"),
    }
    // Instance methods are not reachable through the class.
    let string = jvm.find_class("java.lang.String").unwrap();
    assert!(matches!(string.invoke("length", &[]), Err(JavaError::MemberNotFound { .. })));
}

#[test]
fn test_primitive_round_trips() {
    let Some(jvm) = common::runtime() else { return };
    let string = jvm.find_class("java.lang.String").unwrap();
    let value_of = |value: Value| -> String {
        string.invoke("valueOf", &[value]).unwrap().extract::<String>().unwrap()
    };
    assert_eq!(value_of(Value::Boolean(true)), "true");
    assert_eq!(value_of(Value::Char(u16::from(b'z'))), "z");
    assert_eq!(value_of(Value::Int(-17)), "-17");
    assert_eq!(value_of(Value::Long(1 << 40)), "1099511627776");
    assert_eq!(value_of(Value::Float(0.25)), "0.25");
    assert_eq!(value_of(Value::Double(-2.5)), "-2.5");

    let byte = jvm.find_class("java.lang.Byte").unwrap();
    assert_eq!(byte.invoke("parseByte", &[Value::from("-128")]).unwrap(), Value::Byte(-128));
    let short = jvm.find_class("java.lang.Short").unwrap();
    assert_eq!(short.invoke("parseShort", &[Value::from("1234")]).unwrap(), Value::Short(1234));
    let character = jvm.find_class("java.lang.Character").unwrap();
    assert_eq!(
        character.invoke("toUpperCase", &[Value::Char(u16::from(b'q'))]).unwrap(),
        Value::Char(u16::from(b'Q'))
    );
}

// ============================================================================
// Construction and instance members
// ============================================================================

#[test]
fn test_new_pseudo_method_and_instance_fields() {
    let Some(jvm) = common::runtime() else { return };
    let point_class = jvm.find_class("java.awt.Point").unwrap();
    let point = point_class.new_instance(&[Value::Int(1), Value::Int(2)]).unwrap();
    assert_eq!(point.class_name(), Some("java.awt.Point"));
    assert_eq!(point.get("x").unwrap(), Value::Int(1));
    assert_eq!(point.get("y").unwrap(), Value::Int(2));

    point.set("y", Value::Int(5)).unwrap();
    assert_eq!(point.get("y").unwrap(), Value::Int(5));

    // Narrower primitives widen on write.
    point.set("x", Value::Short(7)).unwrap();
    assert_eq!(point.get("x").unwrap(), Value::Int(7));

    assert!(matches!(point.set("x", "seven"), Err(JavaError::Conversion(_))));
    assert!(matches!(point.set("x", Value::Long(1)), Err(JavaError::Conversion(_))));
    assert!(matches!(point.get("z"), Err(JavaError::MemberNotFound { .. })));

    let copy = point_class.invoke("new", &[Value::Object(point.clone())]).unwrap();
    let copy = copy.extract::<JavaObject>().unwrap();
    assert_eq!(copy.get("x").unwrap(), Value::Int(7));
    assert_ne!(copy, point);
    assert_eq!(point.invoke("equals", &[Value::Object(copy)]).unwrap(), Value::Boolean(true));
}

#[test]
fn test_boxing_and_unboxing_through_collections() {
    let Some(jvm) = common::runtime() else { return };
    let list = jvm.find_class("java.util.ArrayList").unwrap().new_instance(&[]).unwrap();
    list.invoke("add", &[Value::Int(10)]).unwrap();
    list.invoke("add", &[Value::Int(20)]).unwrap();
    list.invoke("add", &[Value::Double(0.5)]).unwrap();
    assert_eq!(list.invoke("size", &[]).unwrap(), Value::Int(3));

    let first = list.invoke("get", &[Value::Int(0)]).unwrap();
    assert_eq!(first.extract::<i32>().unwrap(), 10);
    let last = list.invoke("get", &[Value::Int(2)]).unwrap().extract::<JavaObject>().unwrap();
    assert_eq!(last.class_name(), None);
    assert_eq!(last.unbox().unwrap(), Value::Double(0.5));
    assert_eq!(last.class_name(), Some("java.lang.Double"));

    // remove(int) is more specific than remove(Object) for an int argument.
    let removed = list.invoke("remove", &[Value::Int(0)]).unwrap();
    assert_eq!(removed.extract::<i32>().unwrap(), 10);
    assert_eq!(list.invoke("size", &[]).unwrap(), Value::Int(2));
}

#[test]
fn test_unbox_rejects_non_wrappers() {
    let Some(jvm) = common::runtime() else { return };
    let text = jvm.new_string("abc").unwrap();
    assert!(matches!(text.unbox(), Err(JavaError::Conversion(_))));
    assert!(Value::Object(text).extract::<i32>().is_err());
}

#[test]
fn test_map_with_strings_and_nulls() {
    let Some(jvm) = common::runtime() else { return };
    let map = jvm.find_class("java.util.HashMap").unwrap().new_instance(&[]).unwrap();
    assert_eq!(map.invoke("put", &[Value::from("a"), Value::Int(1)]).unwrap(), Value::Null);
    map.invoke("put", &[Value::from("b"), Value::Null]).unwrap();

    assert_eq!(map.invoke("get", &[Value::from("a")]).unwrap().extract::<i32>().unwrap(), 1);
    assert_eq!(map.invoke("get", &[Value::from("b")]).unwrap(), Value::Null);
    assert_eq!(map.invoke("get", &[Value::from("missing")]).unwrap().extract::<Option<i32>>().unwrap(), None);
    assert_eq!(
        map.invoke("containsKey", &[Value::from("b")]).unwrap(),
        Value::Boolean(true)
    );
}

#[test]
fn test_string_builder_overloads() {
    let Some(jvm) = common::runtime() else { return };
    let builder = jvm.find_class("java.lang.StringBuilder").unwrap().new_instance(&[]).unwrap();
    builder.invoke("append", &[Value::from("x=")]).unwrap();
    builder.invoke("append", &[Value::Int(4)]).unwrap();
    builder.invoke("append", &[Value::Char(u16::from(b';'))]).unwrap();
    builder.invoke("append", &[Value::Boolean(false)]).unwrap();
    assert_eq!(builder.java_to_string().unwrap(), "x=4;false");
    assert_eq!(Value::Object(builder).extract::<String>().unwrap(), "x=4;false");
}

#[test]
fn test_class_arguments_pass_the_class_object() {
    let Some(jvm) = common::runtime() else { return };
    let number = jvm.find_class("java.lang.Number").unwrap();
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    let class_object = number.get("class").unwrap().extract::<JavaObject>().unwrap();
    let assignable = class_object
        .invoke("isAssignableFrom", &[Value::Class(integer.clone())])
        .unwrap();
    assert_eq!(assignable, Value::Boolean(true));

    assert!(number.is_assignable_from(&integer).unwrap());
    assert!(!integer.is_assignable_from(&number).unwrap());
}

#[test]
fn test_instance_checks() {
    let Some(jvm) = common::runtime() else { return };
    let number = jvm.find_class("java.lang.Number").unwrap();
    let char_sequence = jvm.find_class("java.lang.CharSequence").unwrap();
    assert!(number.is_instance(&Value::Int(3)).unwrap());
    assert!(!number.is_instance(&Value::Boolean(true)).unwrap());
    assert!(!number.is_instance(&Value::Null).unwrap());
    assert!(char_sequence.is_instance(&Value::from("text")).unwrap());

    let text = jvm.new_string("text").unwrap();
    assert!(text.is_instance_of(&char_sequence).unwrap());
    assert!(!text.is_instance_of(&number).unwrap());
}

#[test]
fn test_identity_equality() {
    let Some(jvm) = common::runtime() else { return };
    let system = jvm.find_class("java.lang.System").unwrap();
    let first = system.get("out").unwrap().extract::<JavaObject>().unwrap();
    let second = system.get("out").unwrap().extract::<JavaObject>().unwrap();
    assert_eq!(first, second);
    let err = system.get("err").unwrap().extract::<JavaObject>().unwrap();
    assert_ne!(first, err);
}

#[test]
fn test_proxies_outlive_many_calls() {
    let Some(jvm) = common::runtime() else { return };
    let integer = jvm.find_class("java.lang.Integer").unwrap();
    let mut kept = Vec::new();
    for i in 0..5_000 {
        let boxed = integer.invoke("valueOf", &[Value::Int(i)]).unwrap();
        if i % 1_000 == 0 {
            kept.push(boxed);
        }
    }
    let values: Vec<i32> = kept.into_iter().map(|value| value.extract::<i32>().unwrap()).collect();
    assert_eq!(values, vec![0, 1_000, 2_000, 3_000, 4_000]);
}
