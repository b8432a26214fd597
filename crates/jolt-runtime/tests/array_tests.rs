//! Array proxy tests

mod common;

use jolt_runtime::{HostArray, JavaArray, JavaError, JavaType, PrimitiveKind, Value};

#[test]
fn test_primitive_array_from_host() {
    let Some(jvm) = common::runtime() else { return };
    let array = jvm.new_array(HostArray::Int(vec![3, 1, 2])).unwrap();
    assert_eq!(array.len(), 3);
    assert!(!array.is_empty());
    assert_eq!(array.java_type(), &JavaType::array_of(JavaType::Primitive(PrimitiveKind::Int)));
    assert_eq!(array.element_type(), &JavaType::Primitive(PrimitiveKind::Int));
    assert_eq!(array.get(0).unwrap(), Value::Int(3));
    assert_eq!(array.to_vec().unwrap(), vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_length_pseudo_property() {
    let Some(jvm) = common::runtime() else { return };
    let array = jvm.new_array(HostArray::Double(vec![0.5; 4])).unwrap();
    assert_eq!(array.get_property("length").unwrap(), Value::Int(4));
    assert_eq!(array.get_property("Length").unwrap(), Value::Int(4));
    assert!(matches!(array.get_property("size"), Err(JavaError::MemberNotFound { .. })));
}

#[test]
fn test_element_writes_widen() {
    let Some(jvm) = common::runtime() else { return };
    let array = jvm.new_array(HostArray::Long(vec![0, 0])).unwrap();
    array.set(0, Value::Int(7)).unwrap();
    array.set(1, Value::Byte(-1)).unwrap();
    assert_eq!(array.to_vec().unwrap(), vec![Value::Long(7), Value::Long(-1)]);
    assert!(array.set(0, Value::Double(1.0)).is_err());
    assert!(array.set(0, "text").is_err());
}

#[test]
fn test_out_of_bounds_is_a_foreign_exception() {
    let Some(jvm) = common::runtime() else { return };
    let array = jvm.new_array(HostArray::from(vec![true, false])).unwrap();
    let err = array.get(5).unwrap_err();
    assert!(err.is_foreign("java.lang.ArrayIndexOutOfBoundsException"), "{err}");
    // The runtime stays usable afterwards.
    assert_eq!(array.get(1).unwrap(), Value::Boolean(false));
}

#[test]
fn test_string_array() {
    let Some(jvm) = common::runtime() else { return };
    let array = jvm.new_array(HostArray::from(vec!["a", "b"])).unwrap();
    assert_eq!(array.java_type().to_string(), "java.lang.String[]");
    assert_eq!(array.get(1).unwrap().extract::<String>().unwrap(), "b");

    array.set(0, Value::Null).unwrap();
    assert_eq!(array.get(0).unwrap(), Value::Null);
    assert!(matches!(array.set(1, Value::Int(3)), Err(JavaError::Conversion(_))));
}

#[test]
fn test_object_array_element_type_inference() {
    let Some(jvm) = common::runtime() else { return };
    let boxed = jvm
        .new_array(HostArray::Objects(vec![Value::Null, Value::Int(1), Value::Int(2)]))
        .unwrap();
    assert_eq!(boxed.java_type().to_string(), "java.lang.Integer[]");
    assert_eq!(boxed.get(0).unwrap(), Value::Null);
    assert_eq!(boxed.get(2).unwrap().extract::<i32>().unwrap(), 2);

    let empty = jvm.new_array(HostArray::Objects(vec![Value::Null]));
    assert!(matches!(empty, Err(JavaError::Conversion(_))));
}

#[test]
fn test_nested_arrays() {
    let Some(jvm) = common::runtime() else { return };
    let inner = jvm.new_array(HostArray::Int(vec![1, 2])).unwrap();
    let outer = jvm
        .new_array(HostArray::Objects(vec![Value::Array(inner.clone()), Value::Null]))
        .unwrap();
    assert_eq!(outer.java_type().to_string(), "int[][]");
    let first = outer.get(0).unwrap().extract::<JavaArray>().unwrap();
    assert_eq!(first, inner);
    assert_eq!(first.get(1).unwrap(), Value::Int(2));
    assert_eq!(outer.get(1).unwrap(), Value::Null);
}

#[test]
fn test_box_elements() {
    let Some(jvm) = common::runtime() else { return };
    let array = jvm.new_array(HostArray::Char(vec![104, 105])).unwrap();
    let boxed = array.box_elements().unwrap();
    assert_eq!(boxed.java_type().to_string(), "java.lang.Character[]");
    assert_eq!(boxed.get(1).unwrap().extract::<u16>().unwrap(), 105);

    let strings = jvm.new_array(HostArray::from(vec!["x"])).unwrap();
    assert!(strings.box_elements().is_err());
}

#[test]
fn test_primitive_array_arguments() {
    let Some(jvm) = common::runtime() else { return };
    let arrays = jvm.find_class("java.util.Arrays").unwrap();

    // toString(int[]) beats toString(Object[]).
    let ints = Value::HostArray(HostArray::Int(vec![1, 2, 3]));
    let text = arrays.invoke("toString", &[ints.clone()]).unwrap();
    assert_eq!(text.extract::<String>().unwrap(), "[1, 2, 3]");

    // asList(Object[]) only applies after boxing the elements.
    let list = arrays.invoke("asList", &[ints]).unwrap().extract::<jolt_runtime::JavaObject>().unwrap();
    assert_eq!(list.invoke("size", &[]).unwrap(), Value::Int(3));
    assert_eq!(list.invoke("get", &[Value::Int(2)]).unwrap().extract::<i32>().unwrap(), 3);
}

#[test]
fn test_array_results_and_methods() {
    let Some(jvm) = common::runtime() else { return };
    let text = jvm.new_string("hi").unwrap();
    let chars = text.invoke("toCharArray", &[]).unwrap().extract::<JavaArray>().unwrap();
    assert_eq!(chars.to_vec().unwrap(), vec![Value::Char(104), Value::Char(105)]);

    // Array classes expose the public methods of Object.
    assert_eq!(
        chars.invoke("equals", &[Value::Array(chars.clone())]).unwrap(),
        Value::Boolean(true)
    );
    assert!(matches!(chars.invoke("clone", &[]), Err(JavaError::MemberNotFound { .. })));
    assert_eq!(
        chars.invoke("getClass", &[]).unwrap().extract::<String>().unwrap(),
        "class [C"
    );
}
