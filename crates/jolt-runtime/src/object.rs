use std::fmt;
use std::sync::{Arc, OnceLock};

use jolt_core::{Candidate, JavaError, JavaResult, PrimitiveKind};

use crate::class::JavaClass;
use crate::dispatch::{self, Dispatch};
use crate::env::{CallTarget, Env, ReturnKind};
use crate::marshal;
use crate::reflect::{ClassInfo, Member};
use crate::refs::GlobalRef;
use crate::runtime::Runtime;
use crate::sys::{jobject, jvalue};
use crate::value::Value;

/// A proxy for a foreign object.
///
/// Fields and methods are looked up by name on every access. The object's
/// class is discovered the first time it is needed.
#[derive(Clone)]
pub struct JavaObject {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    runtime: Arc<Runtime>,
    handle: GlobalRef,
    class: OnceLock<Arc<ClassInfo>>,
}

impl JavaObject {
    pub(crate) fn from_local(
        runtime: &Arc<Runtime>,
        env: &Env<'_>,
        local: jobject,
        class: Option<Arc<ClassInfo>>,
    ) -> JavaResult<Self> {
        let known = OnceLock::new();
        if let Some(class) = class {
            let _ = known.set(class);
        }
        Ok(JavaObject {
            inner: Arc::new(ObjectInner {
                runtime: Arc::clone(runtime),
                handle: GlobalRef::new(env, local)?,
                class: known,
            }),
        })
    }

    pub(crate) fn raw(&self) -> jobject {
        self.inner.handle.as_raw()
    }

    pub(crate) fn class_info(&self, env: &Env<'_>) -> JavaResult<&Arc<ClassInfo>> {
        if let Some(class) = self.inner.class.get() {
            return Ok(class);
        }
        let discovered = env.with_local_frame(|| {
            let token = env.object_class(self.raw())?;
            self.inner.runtime.class_from_token(env, token)
        })?;
        Ok(self.inner.class.get_or_init(|| discovered))
    }

    /// The class name, if the class has been discovered already.
    pub fn class_name(&self) -> Option<&str> {
        self.inner.class.get().map(|class| class.name())
    }

    /// The object's run-time class.
    pub fn class(&self) -> JavaResult<JavaClass> {
        let env = self.inner.runtime.env()?;
        let info = self.class_info(&env)?;
        Ok(JavaClass::new(Arc::clone(&self.inner.runtime), Arc::clone(info)))
    }

    /// Read a public field. Static fields are reachable through the instance.
    pub fn get(&self, name: &str) -> JavaResult<Value> {
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| {
            let info = self.class_info(&env)?;
            let field = info
                .field(&env, runtime.core(&env)?, name)?
                .ok_or_else(|| JavaError::member_not_found(info.name(), name))?;
            marshal::read_field(runtime, &env, self.field_target(info, field.is_static), field)
        })
    }

    /// Write a public field.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> JavaResult<()> {
        let value = value.into();
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| {
            let info = self.class_info(&env)?;
            let field = info
                .field(&env, runtime.core(&env)?, name)?
                .ok_or_else(|| JavaError::member_not_found(info.name(), name))?;
            marshal::write_field(runtime, &env, self.field_target(info, field.is_static), field, &value)
        })
    }

    fn field_target(&self, info: &ClassInfo, is_static: bool) -> CallTarget {
        if is_static {
            CallTarget::Static(info.token())
        } else {
            CallTarget::Virtual(self.raw())
        }
    }

    /// Invoke a public method, choosing the overload that best fits `args`.
    pub fn invoke(&self, name: &str, args: &[Value]) -> JavaResult<Value> {
        dispatch::invoke(self, name, args)
    }

    /// The result of the object's `toString()`.
    pub fn java_to_string(&self) -> JavaResult<String> {
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| {
            let text = runtime.core(&env)?.object_to_string(&env, self.raw())?;
            Ok(text.unwrap_or_else(|| "null".to_string()))
        })
    }

    /// The primitive held by a wrapper-class instance such as
    /// `java.lang.Integer`.
    pub fn unbox(&self) -> JavaResult<Value> {
        let runtime = &self.inner.runtime;
        let env = runtime.env()?;
        env.with_local_frame(|| {
            let info = self.class_info(&env)?;
            let kind = PrimitiveKind::from_box_class(info.name())
                .ok_or_else(|| JavaError::conversion(format!("{} is not a primitive wrapper", info.name())))?;
            runtime.wrapper(&env, kind)?.unbox(&env, self.raw())
        })
    }

    pub fn is_instance_of(&self, class: &JavaClass) -> JavaResult<bool> {
        self.inner.runtime.env()?.is_instance_of(self.raw(), class.token())
    }
}

impl Dispatch for JavaObject {
    fn runtime(&self) -> &Arc<Runtime> {
        &self.inner.runtime
    }

    fn describe(&self) -> String {
        self.class_name().unwrap_or("object").to_string()
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

impl PartialEq for JavaObject {
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

impl fmt::Debug for JavaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JavaObject")
            .field("class", &self.class_name())
            .field("handle", &self.inner.handle)
            .finish()
    }
}
