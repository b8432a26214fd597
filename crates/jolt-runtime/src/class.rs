use std::fmt;
use std::sync::Arc;

use jolt_core::types::CLASS_CLASS;
use jolt_core::{Candidate, JavaError, JavaResult, JavaType};

use crate::dispatch::{self, Dispatch};
use crate::env::{CallTarget, Env, ReturnKind};
use crate::marshal;
use crate::object::JavaObject;
use crate::reflect::{CONSTRUCTOR_NAME, ClassInfo, FieldInfo, Member};
use crate::runtime::Runtime;
use crate::slot;
use crate::sys::{jclass, jvalue};
use crate::value::Value;

/// Pseudo-property yielding the `java.lang.Class` object itself.
const CLASS_PROPERTY: &str = "class";

/// Pseudo-method routed to constructor resolution.
const NEW_METHOD: &str = "new";

/// A proxy for a foreign class: its static members and constructors.
#[derive(Clone)]
pub struct JavaClass {
    runtime: Arc<Runtime>,
    info: Arc<ClassInfo>,
}

impl JavaClass {
    pub(crate) fn new(runtime: Arc<Runtime>, info: Arc<ClassInfo>) -> Self {
        JavaClass { runtime, info }
    }

    /// The binary name, e.g. `java.util.HashMap`.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    pub fn java_type(&self) -> &JavaType {
        self.info.java_type()
    }

    pub(crate) fn token(&self) -> jclass {
        self.info.token()
    }

    /// Read a static field, or the `class` pseudo-property.
    pub fn get(&self, name: &str) -> JavaResult<Value> {
        let env = self.runtime.env()?;
        env.with_local_frame(|| {
            if name == CLASS_PROPERTY {
                let class_info = self.runtime.class_info(&env, CLASS_CLASS)?;
                let object = JavaObject::from_local(&self.runtime, &env, self.token(), Some(class_info))?;
                return Ok(Value::Object(object));
            }
            let field = self.static_field(&env, name)?;
            marshal::read_field(&self.runtime, &env, CallTarget::Static(self.token()), field)
        })
    }

    /// Write a static field.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> JavaResult<()> {
        let value = value.into();
        let env = self.runtime.env()?;
        env.with_local_frame(|| {
            let field = self.static_field(&env, name)?;
            marshal::write_field(&self.runtime, &env, CallTarget::Static(self.token()), field, &value)
        })
    }

    fn static_field(&self, env: &Env<'_>, name: &str) -> JavaResult<&FieldInfo> {
        let core = self.runtime.core(env)?;
        self.info
            .field(env, core, name)?
            .filter(|field| field.is_static)
            .ok_or_else(|| JavaError::member_not_found(self.name(), name))
    }

    /// Invoke a static method, or construct an instance through the `new`
    /// pseudo-method.
    pub fn invoke(&self, name: &str, args: &[Value]) -> JavaResult<Value> {
        dispatch::invoke(self, name, args)
    }

    /// Construct an instance with the constructor that best fits `args`.
    pub fn new_instance(&self, args: &[Value]) -> JavaResult<JavaObject> {
        match self.invoke(NEW_METHOD, args)? {
            Value::Object(object) => Ok(object),
            other => Err(JavaError::conversion(format!(
                "constructor of {} returned {}",
                self.name(),
                other.describe()
            ))),
        }
    }

    /// Whether a value of class `other` can be assigned to this class.
    pub fn is_assignable_from(&self, other: &JavaClass) -> JavaResult<bool> {
        self.runtime.env()?.is_assignable_from(other.token(), self.token())
    }

    /// Whether `value` is an instance of this class. Primitives are judged
    /// by their wrapper class; null is never an instance.
    pub fn is_instance(&self, value: &Value) -> JavaResult<bool> {
        let env = self.runtime.env()?;
        env.with_local_frame(|| {
            let argument = marshal::argument(&self.runtime, &env, value)?;
            match argument.ty {
                JavaType::Null => Ok(false),
                JavaType::Primitive(kind) => {
                    let wrapper = self.runtime.wrapper(&env, kind)?;
                    env.is_assignable_from(wrapper.token(), self.token())
                }
                _ => env.is_instance_of(slot::to_object(argument.slot), self.token()),
            }
        })
    }
}

impl Dispatch for JavaClass {
    fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    fn describe(&self) -> String {
        self.name().to_string()
    }

    fn member_name<'n>(&self, name: &'n str) -> &'n str {
        if name == NEW_METHOD { CONSTRUCTOR_NAME } else { name }
    }

    fn candidates<'a>(&'a self, env: &Env<'_>, name: &str) -> JavaResult<Vec<&'a Member>> {
        let core = self.runtime.core(env)?;
        if name == NEW_METHOD {
            return Ok(self.info.constructors(env, core)?.iter().collect());
        }
        Ok(self
            .info
            .methods(env, core)?
            .iter()
            .filter(|method| method.is_static() && method.name() == name)
            .collect())
    }

    fn call(&self, env: &Env<'_>, member: &Member, args: &[jvalue]) -> JavaResult<jvalue> {
        if member.is_constructor() {
            let object = env.new_object(self.token(), member.id(), args)?;
            return Ok(slot::from_object(object));
        }
        let kind = ReturnKind::of(member.return_type());
        env.call(CallTarget::Static(self.token()), member.id(), kind, args)
    }

    fn wrap_result(&self, env: &Env<'_>, member: &Member, raw: jvalue) -> JavaResult<Value> {
        if member.is_constructor() {
            let object = JavaObject::from_local(&self.runtime, env, slot::to_object(raw), Some(Arc::clone(&self.info)))?;
            return Ok(Value::Object(object));
        }
        marshal::return_value(&self.runtime, env, member.return_type(), raw)
    }
}

impl PartialEq for JavaClass {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.info, &other.info) {
            return true;
        }
        self.runtime
            .env()
            .and_then(|env| env.is_same_object(self.token(), other.token()))
            .unwrap_or(false)
    }
}

impl fmt::Debug for JavaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JavaClass").field(&self.name()).finish()
    }
}
