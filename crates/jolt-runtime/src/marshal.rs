//! Conversion of host values into argument slots and of results back into
//! host values.
//!
//! Everything here creates local references and expects to run inside the
//! caller's local frame.

use std::ptr;
use std::sync::Arc;

use jolt_core::types::CLASS_CLASS;
use jolt_core::{BoxingPlan, Conversion, JavaError, JavaResult, JavaType, PrimitiveKind};

use crate::array::JavaArray;
use crate::env::{CallTarget, Env};
use crate::object::JavaObject;
use crate::reflect::FieldInfo;
use crate::runtime::Runtime;
use crate::slot;
use crate::sys::{jarray, jobject, jobjectArray, jvalue};
use crate::value::{HostArray, Value};

/// A marshaled argument and the type it was marshaled as.
pub(crate) struct Argument {
    pub slot: jvalue,
    pub ty: JavaType,
}

pub(crate) fn arguments(runtime: &Arc<Runtime>, env: &Env<'_>, values: &[Value]) -> JavaResult<Vec<Argument>> {
    values.iter().map(|value| argument(runtime, env, value)).collect()
}

pub(crate) fn argument(runtime: &Arc<Runtime>, env: &Env<'_>, value: &Value) -> JavaResult<Argument> {
    if let Some(kind) = value.primitive_kind() {
        let slot = value
            .to_slot()
            .ok_or_else(|| JavaError::conversion("primitive without a slot"))?;
        return Ok(Argument {
            slot,
            ty: JavaType::Primitive(kind),
        });
    }
    let (raw, ty) = reference(runtime, env, value)?;
    Ok(Argument {
        slot: slot::from_object(raw),
        ty,
    })
}

/// A reference handle for a non-primitive value, and its type.
fn reference(runtime: &Arc<Runtime>, env: &Env<'_>, value: &Value) -> JavaResult<(jobject, JavaType)> {
    match value {
        Value::Void => Err(JavaError::conversion("void cannot be passed as a value")),
        Value::Null => Ok((ptr::null_mut(), JavaType::Null)),
        Value::String(s) => Ok((env.new_string(s)?, JavaType::string())),
        Value::Object(object) => Ok((object.raw(), object.class_info(env)?.java_type().clone())),
        Value::Array(array) => Ok((array.raw(), array.java_type().clone())),
        Value::Class(class) => Ok((class.token(), JavaType::class(CLASS_CLASS))),
        Value::HostArray(values) => new_array(runtime, env, values),
        primitive => {
            let kind = primitive
                .primitive_kind()
                .ok_or_else(|| JavaError::conversion("unsupported value"))?;
            let boxed = box_value(runtime, env, primitive)?;
            Ok((boxed, JavaType::class(kind.box_class())))
        }
    }
}

fn box_value(runtime: &Arc<Runtime>, env: &Env<'_>, value: &Value) -> JavaResult<jobject> {
    let (Some(kind), Some(raw)) = (value.primitive_kind(), value.to_slot()) else {
        return Err(JavaError::conversion(format!("cannot box {}", value.describe())));
    };
    runtime.wrapper(env, kind)?.box_value(env, raw)
}

/// Apply a boxing plan and primitive widening to marshaled arguments.
pub(crate) fn prepare(
    runtime: &Arc<Runtime>,
    env: &Env<'_>,
    arguments: &[Argument],
    formals: &[JavaType],
    plan: &BoxingPlan,
) -> JavaResult<Vec<jvalue>> {
    arguments
        .iter()
        .zip(formals)
        .zip(plan)
        .map(|((argument, formal), conversion)| convert(runtime, env, argument, formal, *conversion))
        .collect()
}

fn convert(
    runtime: &Arc<Runtime>,
    env: &Env<'_>,
    argument: &Argument,
    formal: &JavaType,
    conversion: Conversion,
) -> JavaResult<jvalue> {
    match conversion {
        Conversion::BoxPrimitive(kind) => {
            let boxed = runtime.wrapper(env, kind)?.box_value(env, argument.slot)?;
            Ok(slot::from_object(boxed))
        }
        Conversion::BoxArray(kind) => {
            let boxed = box_array(runtime, env, slot::to_object(argument.slot), kind)?;
            Ok(slot::from_object(boxed))
        }
        Conversion::Identity => match (formal, &argument.ty) {
            (JavaType::Primitive(target), JavaType::Primitive(source)) if target != source => {
                Value::decode(*source, argument.slot)
                    .widen_to(*target)?
                    .to_slot()
                    .ok_or_else(|| JavaError::conversion("widened value without a slot"))
            }
            _ => Ok(argument.slot),
        },
    }
}

/// Box every element of a primitive array into a new wrapper-class array.
pub(crate) fn box_array(
    runtime: &Arc<Runtime>,
    env: &Env<'_>,
    array: jarray,
    kind: PrimitiveKind,
) -> JavaResult<jobjectArray> {
    let len = env.array_length(array)?;
    let wrapper = runtime.wrapper(env, kind)?;
    let values = env.primitive_region(array, kind, 0, len)?;
    let boxed = env.new_object_array(len, wrapper.token())?;
    for index in 0..len {
        let raw = values
            .get(index)
            .and_then(|value| value.to_slot())
            .ok_or_else(|| JavaError::conversion("primitive region shorter than its array"))?;
        env.with_local_frame(|| {
            let element = wrapper.box_value(env, raw)?;
            env.set_object_array_element(boxed, index, element)
        })?;
    }
    Ok(boxed)
}

/// Build a foreign array from host values.
pub(crate) fn new_array(runtime: &Arc<Runtime>, env: &Env<'_>, values: &HostArray) -> JavaResult<(jarray, JavaType)> {
    if let Some(kind) = values.primitive_kind() {
        let array = env.new_primitive_array(kind, values.len())?;
        env.set_primitive_region(array, 0, values)?;
        return Ok((array, JavaType::array_of(JavaType::Primitive(kind))));
    }

    let element_type = match values {
        HostArray::Objects(elements) => element_type(env, elements)?,
        _ => JavaType::string(),
    };
    let element_class = runtime.class_for_type(env, &element_type)?;
    let array = env.new_object_array(values.len(), element_class.token())?;
    for index in 0..values.len() {
        let value = values.get(index).unwrap_or(Value::Null);
        env.with_local_frame(|| {
            let (element, _) = reference(runtime, env, &value)?;
            env.set_object_array_element(array, index, element)
        })?;
    }
    Ok((array, JavaType::array_of(element_type)))
}

/// Element type of a host object array: the type of its first non-null
/// element, with primitives standing for their wrapper class.
fn element_type(env: &Env<'_>, elements: &[Value]) -> JavaResult<JavaType> {
    let first = elements
        .iter()
        .find(|value| !value.is_null())
        .ok_or_else(|| JavaError::conversion("cannot infer the element type of an empty or all-null array"))?;
    let ty = match first {
        Value::Object(object) => object.class_info(env)?.java_type().clone(),
        other => other
            .static_type()
            .ok_or_else(|| JavaError::conversion(format!("{} cannot be an array element", other.describe())))?,
    };
    Ok(match ty {
        JavaType::Primitive(kind) => JavaType::class(kind.box_class()),
        other => other,
    })
}

/// Wrap a call result. Null handles become [`Value::Null`]; array-typed
/// results become array proxies and everything else an object proxy whose
/// class is discovered on first use.
pub(crate) fn return_value(
    runtime: &Arc<Runtime>,
    env: &Env<'_>,
    declared: Option<&JavaType>,
    raw: jvalue,
) -> JavaResult<Value> {
    match declared {
        None => Ok(Value::Void),
        Some(JavaType::Primitive(kind)) => Ok(Value::decode(*kind, raw)),
        Some(ty) => wrap_object(runtime, env, slot::to_object(raw), ty),
    }
}

pub(crate) fn wrap_object(runtime: &Arc<Runtime>, env: &Env<'_>, raw: jobject, declared: &JavaType) -> JavaResult<Value> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    match declared {
        JavaType::Array(_) => Ok(Value::Array(JavaArray::from_local(runtime, env, raw, declared.clone())?)),
        _ => Ok(Value::Object(JavaObject::from_local(runtime, env, raw, None)?)),
    }
}

pub(crate) fn read_field(runtime: &Arc<Runtime>, env: &Env<'_>, target: CallTarget, field: &FieldInfo) -> JavaResult<Value> {
    let raw = env.get_field(target, field.id, field.kind())?;
    return_value(runtime, env, Some(&field.field_type), raw)
}

pub(crate) fn write_field(
    runtime: &Arc<Runtime>,
    env: &Env<'_>,
    target: CallTarget,
    field: &FieldInfo,
    value: &Value,
) -> JavaResult<()> {
    let raw = assign(runtime, env, &field.field_type, value)
        .map_err(|e| match e {
            JavaError::Conversion(message) => {
                JavaError::conversion(format!("field {}: {}", field.name, message))
            }
            other => other,
        })?;
    env.set_field(target, field.id, field.kind(), raw)
}

/// Marshal `value` for storage in a location of type `declared`, boxing or
/// widening as needed.
pub(crate) fn assign(runtime: &Arc<Runtime>, env: &Env<'_>, declared: &JavaType, value: &Value) -> JavaResult<jvalue> {
    let argument = argument(runtime, env, value)?;
    let oracle = runtime.oracle(env);
    if !declared.is_assignable_from(&argument.ty, &oracle)? {
        return Err(JavaError::conversion(format!(
            "{} is not assignable to {}",
            argument.ty, declared
        )));
    }
    convert(runtime, env, &argument, declared, declared.conversion_from(&argument.ty))
}
