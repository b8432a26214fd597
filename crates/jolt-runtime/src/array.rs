use std::fmt;
use std::sync::{Arc, OnceLock};

use jolt_core::{Candidate, JavaError, JavaResult, JavaType, PrimitiveKind};

use crate::dispatch::{self, Dispatch};
use crate::env::{CallTarget, Env, ReturnKind};
use crate::marshal;
use crate::reflect::{ClassInfo, Member};
use crate::refs::GlobalRef;
use crate::runtime::Runtime;
use crate::sys::{jarray, jvalue};
use crate::value::{HostArray, Value};

/// A proxy for a foreign array.
#[derive(Clone)]
pub struct JavaArray {
    inner: Arc<ArrayInner>,
}

struct ArrayInner {
    runtime: Arc<Runtime>,
    handle: GlobalRef,
    java_type: JavaType,
    element_type: JavaType,
    len: usize,
    class: OnceLock<Arc<ClassInfo>>,
}

impl JavaArray {
    /// Wrap a local array reference of type `java_type`.
    pub(crate) fn from_local(
        runtime: &Arc<Runtime>,
        env: &Env<'_>,
        local: jarray,
        java_type: JavaType,
    ) -> JavaResult<Self> {
        let element_type = java_type
            .element_type()
            .cloned()
            .ok_or_else(|| JavaError::conversion(format!("{} is not an array type", java_type)))?;
        let len = env.array_length(local)?;
        Ok(JavaArray {
            inner: Arc::new(ArrayInner {
                runtime: Arc::clone(runtime),
                handle: GlobalRef::new(env, local)?,
                java_type,
                element_type,
                len,
                class: OnceLock::new(),
            }),
        })
    }

    pub(crate) fn raw(&self) -> jarray {
        self.inner.handle.as_raw()
    }

    /// The array type, e.g. `int[]`.
    pub fn java_type(&self) -> &JavaType {
        &self.inner.java_type
    }

    pub fn element_type(&self) -> &JavaType {
        &self.inner.element_type
    }

    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Read one element. Null elements come back as [`Value::Null`].
    pub fn get(&self, index: usize) -> JavaResult<Value> {
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| self.element(&env, index))
    }

    fn element(&self, env: &Env<'_>, index: usize) -> JavaResult<Value> {
        let runtime = &self.inner.runtime;
        match self.element_type() {
            JavaType::Primitive(kind) => env
                .primitive_region(self.raw(), *kind, index, 1)?
                .get(0)
                .ok_or_else(|| JavaError::conversion("empty primitive region")),
            element => {
                let raw = env.object_array_element(self.raw(), index)?;
                marshal::wrap_object(runtime, env, raw, element)
            }
        }
    }

    /// Store one element, widening or boxing `value` to the element type.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> JavaResult<()> {
        let value = value.into();
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| match self.element_type() {
            JavaType::Primitive(kind) => {
                let element = single(value.widen_to(*kind)?)?;
                env.set_primitive_region(self.raw(), index, &element)
            }
            element => {
                let raw = marshal::assign(runtime, &env, element, &value)?;
                env.set_object_array_element(self.raw(), index, crate::slot::to_object(raw))
            }
        })
    }

    /// Copy every element out.
    pub fn to_vec(&self) -> JavaResult<Vec<Value>> {
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| match self.element_type() {
            JavaType::Primitive(kind) => Ok(env.primitive_region(self.raw(), *kind, 0, self.len())?.into_values()),
            _ => (0..self.len())
                .map(|index| env.with_local_frame(|| self.element(&env, index)))
                .collect(),
        })
    }

    /// The `length` pseudo-property, matched case-insensitively.
    pub fn get_property(&self, name: &str) -> JavaResult<Value> {
        if name.eq_ignore_ascii_case("length") {
            let len = i32::try_from(self.len()).map_err(|_| JavaError::conversion("array length overflow"))?;
            return Ok(Value::Int(len));
        }
        Err(JavaError::member_not_found(self.describe(), name))
    }

    /// Invoke a public method of the array class, such as `clone`.
    pub fn invoke(&self, name: &str, args: &[Value]) -> JavaResult<Value> {
        dispatch::invoke(self, name, args)
    }

    /// A new array holding each primitive element boxed into its wrapper
    /// class.
    pub fn box_elements(&self) -> JavaResult<JavaArray> {
        let JavaType::Primitive(kind) = self.element_type() else {
            return Err(JavaError::conversion(format!("{} has no primitive elements", self.java_type())));
        };
        let kind: PrimitiveKind = *kind;
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| {
            let boxed = marshal::box_array(runtime, &env, self.raw(), kind)?;
            let ty = JavaType::array_of(JavaType::class(kind.box_class()));
            JavaArray::from_local(runtime, &env, boxed, ty)
        })
    }

    fn class_info(&self, env: &Env<'_>) -> JavaResult<&Arc<ClassInfo>> {
        if let Some(class) = self.inner.class.get() {
            return Ok(class);
        }
        let info = self.inner.runtime.class_for_type(env, self.java_type())?;
        Ok(self.inner.class.get_or_init(|| info))
    }
}

fn single(value: Value) -> JavaResult<HostArray> {
    Ok(match value {
        Value::Boolean(v) => HostArray::Boolean(vec![v]),
        Value::Byte(v) => HostArray::Byte(vec![v]),
        Value::Char(v) => HostArray::Char(vec![v]),
        Value::Short(v) => HostArray::Short(vec![v]),
        Value::Int(v) => HostArray::Int(vec![v]),
        Value::Long(v) => HostArray::Long(vec![v]),
        Value::Float(v) => HostArray::Float(vec![v]),
        Value::Double(v) => HostArray::Double(vec![v]),
        other => return Err(JavaError::conversion(format!("{} is not a primitive", other.describe()))),
    })
}

impl Dispatch for JavaArray {
    fn runtime(&self) -> &Arc<Runtime> {
        &self.inner.runtime
    }

    fn describe(&self) -> String {
        self.java_type().to_string()
    }

    fn candidates<'a>(&'a self, env: &Env<'_>, name: &str) -> JavaResult<Vec<&'a Member>> {
        let info = self.class_info(env)?;
        let core = self.inner.runtime.core(env)?;
        Ok(info
            .methods(env, core)?
            .iter()
            .filter(|method| method.name() == name)
            .collect())
    }

    fn call(&self, env: &Env<'_>, member: &Member, args: &[jvalue]) -> JavaResult<jvalue> {
        let target = if member.is_static() {
            CallTarget::Static(self.class_info(env)?.token())
        } else {
            CallTarget::Virtual(self.raw())
        };
        env.call(target, member.id(), ReturnKind::of(member.return_type()), args)
    }
}

impl PartialEq for JavaArray {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.inner
            .runtime
            .env()
            .and_then(|env| env.is_same_object(self.raw(), other.raw()))
            .unwrap_or(false)
    }
}

impl fmt::Debug for JavaArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JavaArray")
            .field("type", &self.inner.java_type)
            .field("len", &self.inner.len)
            .finish()
    }
}
