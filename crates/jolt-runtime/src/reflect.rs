//! Class metadata obtained through the reflection API.
//!
//! [`CoreClasses`] holds the method ids of `java.lang.Class` and the
//! `java.lang.reflect` types; it is loaded once per runtime. [`ClassInfo`]
//! caches the public methods, constructors and fields of one class. Member
//! lists are loaded on first use and never invalidated.

use std::sync::OnceLock;

use jolt_core::{Candidate, JavaError, JavaResult, JavaType, PrimitiveKind};

use crate::env::{CallTarget, Env, ReturnKind};
use crate::refs::{FieldId, GlobalRef, MethodId};
use crate::sys::{ACC_STATIC, JNI_FALSE, jclass, jobject, jobjectArray, jvalue};
use crate::slot;
use crate::value::Value;

pub(crate) const CONSTRUCTOR_NAME: &str = "<init>";

const CLASS_NOT_FOUND: &str = "java.lang.ClassNotFoundException";
const NO_CLASS_DEF: &str = "java.lang.NoClassDefFoundError";
const NO_SUCH_METHOD: &str = "java.lang.NoSuchMethodError";

/// Method ids of the reflection API itself.
pub(crate) struct CoreClasses {
    class_class: GlobalRef,
    loader: GlobalRef,
    for_name: MethodId,
    class_name: MethodId,
    get_methods: MethodId,
    get_constructors: MethodId,
    get_fields: MethodId,
    get_resource: MethodId,
    method_name: MethodId,
    method_parameters: MethodId,
    method_return: MethodId,
    method_modifiers: MethodId,
    constructor_parameters: MethodId,
    field_name: MethodId,
    field_type: MethodId,
    field_modifiers: MethodId,
    to_string: MethodId,
}

impl CoreClasses {
    pub fn load(env: &Env<'_>) -> JavaResult<Self> {
        env.with_local_frame(|| {
            let class = env.find_class("java/lang/Class")?;
            let loader_class = env.find_class("java/lang/ClassLoader")?;
            let method = env.find_class("java/lang/reflect/Method")?;
            let constructor = env.find_class("java/lang/reflect/Constructor")?;
            let field = env.find_class("java/lang/reflect/Field")?;
            let object = env.find_class("java/lang/Object")?;

            let system_loader =
                env.static_method_id(loader_class, "getSystemClassLoader", "()Ljava/lang/ClassLoader;")?;
            let loader = env.call_object(CallTarget::Static(loader_class), system_loader, &[])?;

            Ok(CoreClasses {
                class_class: GlobalRef::new(env, class)?,
                loader: GlobalRef::new(env, loader)?,
                for_name: env.static_method_id(
                    class,
                    "forName",
                    "(Ljava/lang/String;ZLjava/lang/ClassLoader;)Ljava/lang/Class;",
                )?,
                class_name: env.method_id(class, "getName", "()Ljava/lang/String;")?,
                get_methods: env.method_id(class, "getMethods", "()[Ljava/lang/reflect/Method;")?,
                get_constructors: env.method_id(
                    class,
                    "getConstructors",
                    "()[Ljava/lang/reflect/Constructor;",
                )?,
                get_fields: env.method_id(class, "getFields", "()[Ljava/lang/reflect/Field;")?,
                get_resource: env.method_id(loader_class, "getResource", "(Ljava/lang/String;)Ljava/net/URL;")?,
                method_name: env.method_id(method, "getName", "()Ljava/lang/String;")?,
                method_parameters: env.method_id(method, "getParameterTypes", "()[Ljava/lang/Class;")?,
                method_return: env.method_id(method, "getReturnType", "()Ljava/lang/Class;")?,
                method_modifiers: env.method_id(method, "getModifiers", "()I")?,
                constructor_parameters: env.method_id(constructor, "getParameterTypes", "()[Ljava/lang/Class;")?,
                field_name: env.method_id(field, "getName", "()Ljava/lang/String;")?,
                field_type: env.method_id(field, "getType", "()Ljava/lang/Class;")?,
                field_modifiers: env.method_id(field, "getModifiers", "()I")?,
                to_string: env.method_id(object, "toString", "()Ljava/lang/String;")?,
            })
        })
    }

    /// Load a class by binary name through the system class loader. Absence
    /// is reported as [`JavaError::ClassNotFound`].
    pub fn for_name(&self, env: &Env<'_>, name: &str) -> JavaResult<jclass> {
        let text = env.new_string(name)?;
        let args = [
            slot::from_object(text),
            slot::from_boolean(JNI_FALSE),
            slot::from_object(self.loader.as_raw()),
        ];
        match env.call_object(CallTarget::Static(self.class_class.as_raw()), self.for_name, &args) {
            Err(e) if e.is_foreign(CLASS_NOT_FOUND) || e.is_foreign(NO_CLASS_DEF) => {
                Err(JavaError::ClassNotFound(name.to_string()))
            }
            other => other,
        }
    }

    /// Whether the system class loader can see the class file for `name`.
    /// Never raises for absence.
    pub fn has_class(&self, env: &Env<'_>, name: &str) -> JavaResult<bool> {
        let Some(resource) = class_resource(name) else {
            return Ok(true);
        };
        let path = env.new_string(&resource)?;
        let url = env.call_object(
            CallTarget::Virtual(self.loader.as_raw()),
            self.get_resource,
            &[slot::from_object(path)],
        )?;
        Ok(!url.is_null())
    }

    pub fn class_name(&self, env: &Env<'_>, class: jclass) -> JavaResult<String> {
        let name = env.call_object(CallTarget::Virtual(class), self.class_name, &[])?;
        env.string(name)
    }

    pub fn object_to_string(&self, env: &Env<'_>, object: jobject) -> JavaResult<Option<String>> {
        let text = env.call_object(CallTarget::Virtual(object), self.to_string, &[])?;
        env.optional_string(text)
    }

    fn type_of(&self, env: &Env<'_>, class: jclass) -> JavaResult<Option<JavaType>> {
        JavaType::from_reflected_name(&self.class_name(env, class)?)
    }

    fn parameter_types(&self, env: &Env<'_>, member: jobject, getter: MethodId) -> JavaResult<Vec<JavaType>> {
        let classes = env.call_object(CallTarget::Virtual(member), getter, &[])?;
        let len = env.array_length(classes)?;
        (0..len)
            .map(|index| {
                let class = env.object_array_element(classes, index)?;
                let ty = self.type_of(env, class)?;
                env.delete_local_ref(class);
                ty.ok_or_else(|| JavaError::conversion("void parameter type"))
            })
            .collect()
    }

    fn modifiers(&self, env: &Env<'_>, member: jobject, getter: MethodId) -> JavaResult<i32> {
        env.call_int(CallTarget::Virtual(member), getter, &[])
    }

    fn each_member<T>(
        &self,
        env: &Env<'_>,
        class: jclass,
        list: MethodId,
        mut build: impl FnMut(jobject) -> JavaResult<T>,
    ) -> JavaResult<Vec<T>> {
        env.with_local_frame(|| {
            let members: jobjectArray = env.call_object(CallTarget::Virtual(class), list, &[])?;
            let len = env.array_length(members)?;
            (0..len)
                .map(|index| {
                    env.with_local_frame(|| {
                        let member = env.object_array_element(members, index)?;
                        build(member)
                    })
                })
                .collect()
        })
    }

    fn load_methods(&self, env: &Env<'_>, class: jclass) -> JavaResult<Vec<Member>> {
        self.each_member(env, class, self.get_methods, |method| {
            let name_string = env.call_object(CallTarget::Virtual(method), self.method_name, &[])?;
            let return_class = env.call_object(CallTarget::Virtual(method), self.method_return, &[])?;
            Ok(Member {
                name: env.string(name_string)?,
                id: env.from_reflected_method(method)?,
                parameters: self.parameter_types(env, method, self.method_parameters)?,
                return_type: self.type_of(env, return_class)?,
                is_static: self.modifiers(env, method, self.method_modifiers)? & ACC_STATIC != 0,
            })
        })
    }

    fn load_constructors(&self, env: &Env<'_>, class: jclass) -> JavaResult<Vec<Member>> {
        self.each_member(env, class, self.get_constructors, |constructor| {
            Ok(Member {
                name: CONSTRUCTOR_NAME.to_string(),
                id: env.from_reflected_method(constructor)?,
                parameters: self.parameter_types(env, constructor, self.constructor_parameters)?,
                return_type: None,
                is_static: false,
            })
        })
    }

    fn load_fields(&self, env: &Env<'_>, class: jclass) -> JavaResult<Vec<FieldInfo>> {
        self.each_member(env, class, self.get_fields, |field| {
            let name_string = env.call_object(CallTarget::Virtual(field), self.field_name, &[])?;
            let type_class = env.call_object(CallTarget::Virtual(field), self.field_type, &[])?;
            Ok(FieldInfo {
                name: env.string(name_string)?,
                id: env.from_reflected_field(field)?,
                field_type: self
                    .type_of(env, type_class)?
                    .ok_or_else(|| JavaError::conversion("void field type"))?,
                is_static: self.modifiers(env, field, self.field_modifiers)? & ACC_STATIC != 0,
            })
        })
    }
}

/// Resource path of the class file behind a binary or array class name.
/// Arrays of primitives need no class file and return `None`.
fn class_resource(name: &str) -> Option<String> {
    let element = name.trim_start_matches('[');
    let binary = if element.len() == name.len() {
        element
    } else {
        element.strip_prefix('L')?.strip_suffix(';')?
    };
    Some(format!("{}.class", binary.replace('.', "/")))
}

/// A method or constructor.
#[derive(Debug)]
pub(crate) struct Member {
    name: String,
    id: MethodId,
    parameters: Vec<JavaType>,
    return_type: Option<JavaType>,
    is_static: bool,
}

impl Member {
    pub fn id(&self) -> MethodId {
        self.id
    }

    pub fn return_type(&self) -> Option<&JavaType> {
        self.return_type.as_ref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl Candidate for Member {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameter_types(&self) -> &[JavaType] {
        &self.parameters
    }
}

/// A public field.
#[derive(Debug)]
pub(crate) struct FieldInfo {
    pub name: String,
    pub id: FieldId,
    pub field_type: JavaType,
    pub is_static: bool,
}

impl FieldInfo {
    pub fn kind(&self) -> ReturnKind {
        ReturnKind::of(Some(&self.field_type))
    }
}

/// Cached metadata for one class. The class object is both the token passed
/// to native calls and the reflected `java.lang.Class` instance.
pub(crate) struct ClassInfo {
    name: String,
    java_type: JavaType,
    class: GlobalRef,
    methods: OnceLock<Vec<Member>>,
    constructors: OnceLock<Vec<Member>>,
    fields: OnceLock<Vec<FieldInfo>>,
}

impl ClassInfo {
    pub fn new(env: &Env<'_>, core: &CoreClasses, class: jclass) -> JavaResult<Self> {
        let name = core.class_name(env, class)?;
        let java_type = JavaType::from_reflected_name(&name)?
            .ok_or_else(|| JavaError::conversion("void is not a class"))?;
        Ok(ClassInfo {
            name,
            java_type,
            class: GlobalRef::new(env, class)?,
            methods: OnceLock::new(),
            constructors: OnceLock::new(),
            fields: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn java_type(&self) -> &JavaType {
        &self.java_type
    }

    pub fn token(&self) -> jclass {
        self.class.as_raw()
    }

    pub fn methods(&self, env: &Env<'_>, core: &CoreClasses) -> JavaResult<&[Member]> {
        if let Some(methods) = self.methods.get() {
            return Ok(methods);
        }
        let loaded = core.load_methods(env, self.token())?;
        tracing::trace!(class = %self.name, count = loaded.len(), "loaded methods");
        Ok(self.methods.get_or_init(|| loaded))
    }

    pub fn constructors(&self, env: &Env<'_>, core: &CoreClasses) -> JavaResult<&[Member]> {
        if let Some(constructors) = self.constructors.get() {
            return Ok(constructors);
        }
        let loaded = core.load_constructors(env, self.token())?;
        tracing::trace!(class = %self.name, count = loaded.len(), "loaded constructors");
        Ok(self.constructors.get_or_init(|| loaded))
    }

    pub fn fields(&self, env: &Env<'_>, core: &CoreClasses) -> JavaResult<&[FieldInfo]> {
        if let Some(fields) = self.fields.get() {
            return Ok(fields);
        }
        let loaded = core.load_fields(env, self.token())?;
        tracing::trace!(class = %self.name, count = loaded.len(), "loaded fields");
        Ok(self.fields.get_or_init(|| loaded))
    }

    pub fn field(&self, env: &Env<'_>, core: &CoreClasses, name: &str) -> JavaResult<Option<&FieldInfo>> {
        Ok(self.fields(env, core)?.iter().find(|field| field.name == name))
    }
}

enum Boxer {
    Factory(MethodId),
    Constructor(MethodId),
}

/// Boxing and unboxing for one primitive kind.
pub(crate) struct WrapperInfo {
    kind: PrimitiveKind,
    class: GlobalRef,
    boxer: Boxer,
    unbox: MethodId,
}

impl WrapperInfo {
    pub fn load(env: &Env<'_>, kind: PrimitiveKind) -> JavaResult<Self> {
        env.with_local_frame(|| {
            let wrapper = JavaType::class(kind.box_class());
            let class_name = wrapper.jni_class_name().unwrap_or_default();
            let class = env.find_class(&class_name)?;
            let wrapper_descriptor = wrapper.descriptor().unwrap_or_default();

            let factory = optional(env.static_method_id(
                class,
                "valueOf",
                &format!("({}){}", kind.descriptor(), wrapper_descriptor),
            ))?;
            let boxer = match factory {
                Some(id) => Boxer::Factory(id),
                None => match optional(env.method_id(class, CONSTRUCTOR_NAME, &format!("({})V", kind.descriptor())))? {
                    Some(id) => Boxer::Constructor(id),
                    None => return Err(JavaError::Boxing { kind }),
                },
            };
            let unbox = env.method_id(class, kind.unbox_method(), &format!("(){}", kind.descriptor()))?;

            Ok(WrapperInfo {
                kind,
                class: GlobalRef::new(env, class)?,
                boxer,
                unbox,
            })
        })
    }

    pub fn token(&self) -> jclass {
        self.class.as_raw()
    }

    /// A new local reference to the boxed form of `value`.
    pub fn box_value(&self, env: &Env<'_>, value: jvalue) -> JavaResult<jobject> {
        match self.boxer {
            Boxer::Factory(id) => env.call_object(CallTarget::Static(self.token()), id, &[value]),
            Boxer::Constructor(id) => env.new_object(self.token(), id, &[value]),
        }
    }

    pub fn unbox(&self, env: &Env<'_>, object: jobject) -> JavaResult<Value> {
        let raw = env.call(CallTarget::Virtual(object), self.unbox, ReturnKind::Primitive(self.kind), &[])?;
        Ok(Value::decode(self.kind, raw))
    }
}

/// A failed lookup of an optional method is `None`.
fn optional(lookup: JavaResult<MethodId>) -> JavaResult<Option<MethodId>> {
    match lookup {
        Ok(id) => Ok(Some(id)),
        Err(e) if e.is_foreign(NO_SUCH_METHOD) => Ok(None),
        Err(JavaError::MemberNotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_resource_for_plain_names() {
        assert_eq!(class_resource("java.lang.String").as_deref(), Some("java/lang/String.class"));
        assert_eq!(class_resource("java.util.Map$Entry").as_deref(), Some("java/util/Map$Entry.class"));
    }

    #[test]
    fn test_class_resource_for_arrays() {
        assert_eq!(class_resource("[Ljava.lang.String;").as_deref(), Some("java/lang/String.class"));
        assert_eq!(class_resource("[[Ljava.lang.Object;").as_deref(), Some("java/lang/Object.class"));
        assert_eq!(class_resource("[I"), None);
        assert_eq!(class_resource("[[D"), None);
    }
}
