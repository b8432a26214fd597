//! The checked environment wrapper.
//!
//! Every operation goes through [`Env::guarded`]: the pending-exception flag
//! is cleared, the native function runs, and the flag is checked again. A
//! pending exception is fetched, cleared and turned into
//! [`JavaError::Foreign`] by the exception bridge before the caller sees the
//! result.
//!
//! Raw handles returned from here are local references and die with the
//! enclosing local frame; anything that must outlive a call is promoted to a
//! [`GlobalRef`](crate::refs::GlobalRef).

use std::ffi::CString;
use std::ptr;
use std::sync::Arc;

use jolt_core::{JavaError, JavaResult, JavaType, PrimitiveKind};

use crate::bridge;
use crate::refs::{FieldId, MethodId};
use crate::slot;
use crate::sys::*;
use crate::table::EnvTable;
use crate::value::HostArray;
use crate::vm::VmShared;

/// Whether a foreign exception is waiting to be fetched on this thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExceptionState {
    Clear,
    Pending,
}

/// Receiver of a method call or field access.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CallTarget {
    /// An instance, dispatched virtually.
    Virtual(jobject),
    /// A class token, for static members.
    Static(jclass),
}

impl CallTarget {
    fn raw(self) -> jobject {
        match self {
            CallTarget::Virtual(object) => object,
            CallTarget::Static(class) => class,
        }
    }
}

/// Which call-table variant a call returns through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReturnKind {
    Void,
    Object,
    Primitive(PrimitiveKind),
}

impl ReturnKind {
    pub fn of(ty: Option<&JavaType>) -> Self {
        match ty {
            None => ReturnKind::Void,
            Some(JavaType::Primitive(kind)) => ReturnKind::Primitive(*kind),
            Some(_) => ReturnKind::Object,
        }
    }
}

macro_rules! pick {
    ($target:expr, $table:expr, $virtual:ident, $static:ident) => {
        match $target {
            CallTarget::Virtual(_) => $table.$virtual,
            CallTarget::Static(_) => $table.$static,
        }
    };
}

fn c_string(text: &str) -> JavaResult<CString> {
    CString::new(text).map_err(|_| JavaError::conversion(format!("{:?} contains a NUL byte", text)))
}

fn jsize_of(len: usize) -> JavaResult<jsize> {
    jsize::try_from(len).map_err(|_| JavaError::conversion(format!("length {} does not fit in jsize", len)))
}

/// A thread's environment handle paired with the shared call table.
pub(crate) struct Env<'vm> {
    raw: *mut JNIEnv,
    table: &'vm EnvTable,
    vm: &'vm Arc<VmShared>,
}

impl<'vm> Env<'vm> {
    pub fn new(raw: *mut JNIEnv, table: &'vm EnvTable, vm: &'vm Arc<VmShared>) -> Self {
        Env { raw, table, vm }
    }

    pub fn vm(&self) -> &'vm VmShared {
        self.vm
    }

    pub fn vm_handle(&self) -> Arc<VmShared> {
        Arc::clone(self.vm)
    }

    // ------------------------------------------------------------------
    // Exception protocol
    // ------------------------------------------------------------------

    pub fn exception_state(&self) -> ExceptionState {
        if unsafe { (self.table.exception_check)(self.raw) } == JNI_TRUE {
            ExceptionState::Pending
        } else {
            ExceptionState::Clear
        }
    }

    /// Clear, call, check.
    pub fn guarded<T>(&self, call: impl FnOnce(*mut JNIEnv, &EnvTable) -> T) -> JavaResult<T> {
        unsafe { (self.table.exception_clear)(self.raw) };
        let value = call(self.raw, self.table);
        match self.exception_state() {
            ExceptionState::Clear => Ok(value),
            ExceptionState::Pending => Err(bridge::take_pending(self)),
        }
    }

    /// Call without bridging. A pending exception is discarded and reported
    /// as `None`; used where the bridge itself needs to call back in.
    pub fn quiet<T>(&self, call: impl FnOnce(*mut JNIEnv, &EnvTable) -> T) -> Option<T> {
        let value = call(self.raw, self.table);
        match self.exception_state() {
            ExceptionState::Clear => Some(value),
            ExceptionState::Pending => {
                unsafe { (self.table.exception_clear)(self.raw) };
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // References
    // ------------------------------------------------------------------

    /// Run `body` inside a local reference frame that is popped afterwards.
    pub fn with_local_frame<T>(&self, body: impl FnOnce() -> JavaResult<T>) -> JavaResult<T> {
        let capacity = self.vm.settings().local_frame_capacity;
        let code = self.guarded(|env, t| unsafe { (t.push_local_frame)(env, capacity) })?;
        if code != JNI_OK {
            return Err(JavaError::Lifecycle {
                operation: "PushLocalFrame",
                code,
            });
        }
        let result = body();
        let popped = self.guarded(|env, t| unsafe { (t.pop_local_frame)(env, ptr::null_mut()) });
        let value = result?;
        popped?;
        Ok(value)
    }

    pub fn new_global_ref(&self, object: jobject) -> JavaResult<jobject> {
        let global = self.guarded(|env, t| unsafe { (t.new_global_ref)(env, object) })?;
        if global.is_null() {
            return Err(JavaError::conversion("NewGlobalRef returned null"));
        }
        Ok(global)
    }

    /// Deletion never raises; a failure here would only leak.
    pub fn delete_global_ref(&self, object: jobject) {
        let _ = self.guarded(|env, t| unsafe { (t.delete_global_ref)(env, object) });
    }

    pub fn delete_local_ref(&self, object: jobject) {
        if !object.is_null() {
            let _ = self.guarded(|env, t| unsafe { (t.delete_local_ref)(env, object) });
        }
    }

    pub fn is_same_object(&self, a: jobject, b: jobject) -> JavaResult<bool> {
        self.guarded(|env, t| unsafe { (t.is_same_object)(env, a, b) })
            .map(|same| same == JNI_TRUE)
    }

    // ------------------------------------------------------------------
    // Classes and members
    // ------------------------------------------------------------------

    pub fn version(&self) -> JavaResult<jint> {
        self.guarded(|env, t| unsafe { (t.get_version)(env) })
    }

    /// `name` is in slash form, e.g. `java/lang/String`.
    pub fn find_class(&self, name: &str) -> JavaResult<jclass> {
        let name = c_string(name)?;
        self.guarded(|env, t| unsafe { (t.find_class)(env, name.as_ptr()) })
    }

    pub fn object_class(&self, object: jobject) -> JavaResult<jclass> {
        self.guarded(|env, t| unsafe { (t.get_object_class)(env, object) })
    }

    pub fn is_instance_of(&self, object: jobject, class: jclass) -> JavaResult<bool> {
        self.guarded(|env, t| unsafe { (t.is_instance_of)(env, object, class) })
            .map(|result| result == JNI_TRUE)
    }

    /// Whether an instance of `source` can be cast to `target`.
    pub fn is_assignable_from(&self, source: jclass, target: jclass) -> JavaResult<bool> {
        self.guarded(|env, t| unsafe { (t.is_assignable_from)(env, source, target) })
            .map(|result| result == JNI_TRUE)
    }

    pub fn method_id(&self, class: jclass, name: &str, signature: &str) -> JavaResult<MethodId> {
        self.lookup_method(CallTarget::Virtual(class), name, signature)
    }

    pub fn static_method_id(&self, class: jclass, name: &str, signature: &str) -> JavaResult<MethodId> {
        self.lookup_method(CallTarget::Static(class), name, signature)
    }

    fn lookup_method(&self, target: CallTarget, name: &str, signature: &str) -> JavaResult<MethodId> {
        let (c_name, c_signature) = (c_string(name)?, c_string(signature)?);
        let lookup = pick!(target, self.table, get_method_id, get_static_method_id);
        let raw = self.guarded(|env, _| unsafe {
            lookup(env, target.raw(), c_name.as_ptr(), c_signature.as_ptr())
        })?;
        MethodId::new(raw).ok_or_else(|| JavaError::member_not_found(signature, name))
    }

    pub fn from_reflected_method(&self, method: jobject) -> JavaResult<MethodId> {
        let raw = self.guarded(|env, t| unsafe { (t.from_reflected_method)(env, method) })?;
        MethodId::new(raw).ok_or_else(|| JavaError::conversion("FromReflectedMethod returned null"))
    }

    pub fn from_reflected_field(&self, field: jobject) -> JavaResult<FieldId> {
        let raw = self.guarded(|env, t| unsafe { (t.from_reflected_field)(env, field) })?;
        FieldId::new(raw).ok_or_else(|| JavaError::conversion("FromReflectedField returned null"))
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    pub fn new_object(&self, class: jclass, constructor: MethodId, args: &[jvalue]) -> JavaResult<jobject> {
        let id = constructor.raw();
        self.guarded(|env, t| unsafe { (t.new_object_a)(env, class, id, args.as_ptr()) })
    }

    /// Invoke `method` and return its result in a slot; void calls return an
    /// empty slot.
    pub fn call(&self, target: CallTarget, method: MethodId, ret: ReturnKind, args: &[jvalue]) -> JavaResult<jvalue> {
        let (receiver, id, argv) = (target.raw(), method.raw(), args.as_ptr());
        let t = self.table;
        self.guarded(|env, _| unsafe {
            match ret {
                ReturnKind::Void => {
                    pick!(target, t, call_void_method_a, call_static_void_method_a)(env, receiver, id, argv);
                    slot::empty()
                }
                ReturnKind::Object => slot::from_object(
                    pick!(target, t, call_object_method_a, call_static_object_method_a)(env, receiver, id, argv),
                ),
                ReturnKind::Primitive(kind) => match kind {
                    PrimitiveKind::Boolean => slot::from_boolean(
                        pick!(target, t, call_boolean_method_a, call_static_boolean_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Byte => slot::from_byte(
                        pick!(target, t, call_byte_method_a, call_static_byte_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Char => slot::from_char(
                        pick!(target, t, call_char_method_a, call_static_char_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Short => slot::from_short(
                        pick!(target, t, call_short_method_a, call_static_short_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Int => slot::from_int(
                        pick!(target, t, call_int_method_a, call_static_int_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Long => slot::from_long(
                        pick!(target, t, call_long_method_a, call_static_long_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Float => slot::from_float(
                        pick!(target, t, call_float_method_a, call_static_float_method_a)(env, receiver, id, argv),
                    ),
                    PrimitiveKind::Double => slot::from_double(
                        pick!(target, t, call_double_method_a, call_static_double_method_a)(env, receiver, id, argv),
                    ),
                },
            }
        })
    }

    pub fn call_object(&self, target: CallTarget, method: MethodId, args: &[jvalue]) -> JavaResult<jobject> {
        self.call(target, method, ReturnKind::Object, args).map(slot::to_object)
    }

    pub fn call_int(&self, target: CallTarget, method: MethodId, args: &[jvalue]) -> JavaResult<jint> {
        self.call(target, method, ReturnKind::Primitive(PrimitiveKind::Int), args)
            .map(slot::to_int)
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    pub fn get_field(&self, target: CallTarget, field: FieldId, kind: ReturnKind) -> JavaResult<jvalue> {
        let (holder, id) = (target.raw(), field.raw());
        let t = self.table;
        self.guarded(|env, _| unsafe {
            match kind {
                ReturnKind::Void => slot::empty(),
                ReturnKind::Object => {
                    slot::from_object(pick!(target, t, get_object_field, get_static_object_field)(env, holder, id))
                }
                ReturnKind::Primitive(kind) => match kind {
                    PrimitiveKind::Boolean => {
                        slot::from_boolean(pick!(target, t, get_boolean_field, get_static_boolean_field)(env, holder, id))
                    }
                    PrimitiveKind::Byte => {
                        slot::from_byte(pick!(target, t, get_byte_field, get_static_byte_field)(env, holder, id))
                    }
                    PrimitiveKind::Char => {
                        slot::from_char(pick!(target, t, get_char_field, get_static_char_field)(env, holder, id))
                    }
                    PrimitiveKind::Short => {
                        slot::from_short(pick!(target, t, get_short_field, get_static_short_field)(env, holder, id))
                    }
                    PrimitiveKind::Int => {
                        slot::from_int(pick!(target, t, get_int_field, get_static_int_field)(env, holder, id))
                    }
                    PrimitiveKind::Long => {
                        slot::from_long(pick!(target, t, get_long_field, get_static_long_field)(env, holder, id))
                    }
                    PrimitiveKind::Float => {
                        slot::from_float(pick!(target, t, get_float_field, get_static_float_field)(env, holder, id))
                    }
                    PrimitiveKind::Double => {
                        slot::from_double(pick!(target, t, get_double_field, get_static_double_field)(env, holder, id))
                    }
                },
            }
        })
    }

    pub fn set_field(&self, target: CallTarget, field: FieldId, kind: ReturnKind, value: jvalue) -> JavaResult<()> {
        let (holder, id) = (target.raw(), field.raw());
        let t = self.table;
        self.guarded(|env, _| unsafe {
            match kind {
                ReturnKind::Void => {}
                ReturnKind::Object => {
                    pick!(target, t, set_object_field, set_static_object_field)(env, holder, id, slot::to_object(value))
                }
                ReturnKind::Primitive(kind) => match kind {
                    PrimitiveKind::Boolean => pick!(target, t, set_boolean_field, set_static_boolean_field)(
                        env,
                        holder,
                        id,
                        slot::to_boolean(value),
                    ),
                    PrimitiveKind::Byte => {
                        pick!(target, t, set_byte_field, set_static_byte_field)(env, holder, id, slot::to_byte(value))
                    }
                    PrimitiveKind::Char => {
                        pick!(target, t, set_char_field, set_static_char_field)(env, holder, id, slot::to_char(value))
                    }
                    PrimitiveKind::Short => {
                        pick!(target, t, set_short_field, set_static_short_field)(env, holder, id, slot::to_short(value))
                    }
                    PrimitiveKind::Int => {
                        pick!(target, t, set_int_field, set_static_int_field)(env, holder, id, slot::to_int(value))
                    }
                    PrimitiveKind::Long => {
                        pick!(target, t, set_long_field, set_static_long_field)(env, holder, id, slot::to_long(value))
                    }
                    PrimitiveKind::Float => {
                        pick!(target, t, set_float_field, set_static_float_field)(env, holder, id, slot::to_float(value))
                    }
                    PrimitiveKind::Double => pick!(target, t, set_double_field, set_static_double_field)(
                        env,
                        holder,
                        id,
                        slot::to_double(value),
                    ),
                },
            }
        })
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    pub fn new_string(&self, text: &str) -> JavaResult<jstring> {
        let units: Vec<jchar> = text.encode_utf16().collect();
        let len = jsize_of(units.len())?;
        self.guarded(|env, t| unsafe { (t.new_string)(env, units.as_ptr(), len) })
    }

    /// Contents of a non-null `java.lang.String`.
    pub fn string(&self, string: jstring) -> JavaResult<String> {
        if string.is_null() {
            return Err(JavaError::conversion("null string"));
        }
        let len = self.guarded(|env, t| unsafe { (t.get_string_length)(env, string) })?;
        let mut units = vec![0 as jchar; len.max(0) as usize];
        self.guarded(|env, t| unsafe { (t.get_string_region)(env, string, 0, len, units.as_mut_ptr()) })?;
        Ok(String::from_utf16_lossy(&units))
    }

    pub fn optional_string(&self, string: jstring) -> JavaResult<Option<String>> {
        if string.is_null() {
            Ok(None)
        } else {
            self.string(string).map(Some)
        }
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    pub fn array_length(&self, array: jarray) -> JavaResult<usize> {
        let len = self.guarded(|env, t| unsafe { (t.get_array_length)(env, array) })?;
        Ok(len.max(0) as usize)
    }

    pub fn new_object_array(&self, len: usize, element_class: jclass) -> JavaResult<jobjectArray> {
        let len = jsize_of(len)?;
        self.guarded(|env, t| unsafe { (t.new_object_array)(env, len, element_class, ptr::null_mut()) })
    }

    pub fn object_array_element(&self, array: jobjectArray, index: usize) -> JavaResult<jobject> {
        let index = jsize_of(index)?;
        self.guarded(|env, t| unsafe { (t.get_object_array_element)(env, array, index) })
    }

    pub fn set_object_array_element(&self, array: jobjectArray, index: usize, value: jobject) -> JavaResult<()> {
        let index = jsize_of(index)?;
        self.guarded(|env, t| unsafe { (t.set_object_array_element)(env, array, index, value) })
    }

    pub fn new_primitive_array(&self, kind: PrimitiveKind, len: usize) -> JavaResult<jarray> {
        let len = jsize_of(len)?;
        self.guarded(|env, t| unsafe {
            match kind {
                PrimitiveKind::Boolean => (t.new_boolean_array)(env, len),
                PrimitiveKind::Byte => (t.new_byte_array)(env, len),
                PrimitiveKind::Char => (t.new_char_array)(env, len),
                PrimitiveKind::Short => (t.new_short_array)(env, len),
                PrimitiveKind::Int => (t.new_int_array)(env, len),
                PrimitiveKind::Long => (t.new_long_array)(env, len),
                PrimitiveKind::Float => (t.new_float_array)(env, len),
                PrimitiveKind::Double => (t.new_double_array)(env, len),
            }
        })
    }

    /// Copy `len` elements starting at `start` out of a primitive array.
    pub fn primitive_region(&self, array: jarray, kind: PrimitiveKind, start: usize, len: usize) -> JavaResult<HostArray> {
        let (from, count) = (jsize_of(start)?, jsize_of(len)?);
        macro_rules! load {
            ($getter:ident, $ty:ty) => {{
                let mut buffer: Vec<$ty> = vec![<$ty>::default(); len];
                self.guarded(|env, t| unsafe { (t.$getter)(env, array, from, count, buffer.as_mut_ptr()) })?;
                buffer
            }};
        }
        Ok(match kind {
            PrimitiveKind::Boolean => {
                HostArray::Boolean(load!(get_boolean_array_region, jboolean).into_iter().map(|b| b != 0).collect())
            }
            PrimitiveKind::Byte => HostArray::Byte(load!(get_byte_array_region, jbyte)),
            PrimitiveKind::Char => HostArray::Char(load!(get_char_array_region, jchar)),
            PrimitiveKind::Short => HostArray::Short(load!(get_short_array_region, jshort)),
            PrimitiveKind::Int => HostArray::Int(load!(get_int_array_region, jint)),
            PrimitiveKind::Long => HostArray::Long(load!(get_long_array_region, jlong)),
            PrimitiveKind::Float => HostArray::Float(load!(get_float_array_region, jfloat)),
            PrimitiveKind::Double => HostArray::Double(load!(get_double_array_region, jdouble)),
        })
    }

    /// Copy a primitive host array into `array` starting at `start`.
    pub fn set_primitive_region(&self, array: jarray, start: usize, values: &HostArray) -> JavaResult<()> {
        let (from, count) = (jsize_of(start)?, jsize_of(values.len())?);
        macro_rules! store {
            ($setter:ident, $values:expr) => {{
                let buffer = $values;
                self.guarded(|env, t| unsafe { (t.$setter)(env, array, from, count, buffer.as_ptr()) })
            }};
        }
        match values {
            HostArray::Boolean(v) => store!(
                set_boolean_array_region,
                v.iter().map(|&b| if b { JNI_TRUE } else { JNI_FALSE }).collect::<Vec<jboolean>>()
            ),
            HostArray::Byte(v) => store!(set_byte_array_region, v),
            HostArray::Char(v) => store!(set_char_array_region, v),
            HostArray::Short(v) => store!(set_short_array_region, v),
            HostArray::Int(v) => store!(set_int_array_region, v),
            HostArray::Long(v) => store!(set_long_array_region, v),
            HostArray::Float(v) => store!(set_float_array_region, v),
            HostArray::Double(v) => store!(set_double_array_region, v),
            HostArray::Strings(_) | HostArray::Objects(_) => {
                Err(JavaError::conversion("not a primitive array"))
            }
        }
    }
}
