//! Typed call tables.
//!
//! The lifecycle table and the per-thread operation table are snapshotted
//! once, when the first handle is obtained, into structs of typed function
//! pointers. Each entry is read from the slot named by its [`InvokeOp`] or
//! [`EnvOp`] offset, so the ABI layout lives in one place.
//!
//! # Safety
//!
//! `load` trusts that the pointer it is given addresses a live table with at
//! least `TABLE_LEN` slots, which holds for any handle the runtime returned.

use libc::{c_char, c_void};

use jolt_core::{JavaError, JavaResult};

use crate::sys::*;

fn missing(op: &str) -> JavaError {
    JavaError::Symbol(format!("table slot {}", op))
}

macro_rules! invoke_table {
    ($($field:ident => $op:ident ( $($arg:ty),* ) -> $ret:ty;)*) => {
        /// Lifecycle functions of a VM handle.
        #[derive(Clone, Copy)]
        pub struct InvokeTable {
            $(pub $field: unsafe extern "system" fn(*mut JavaVM $(, $arg)*) -> $ret,)*
        }

        impl InvokeTable {
            /// # Safety
            /// `vm` must be a live VM handle.
            pub unsafe fn load(vm: *mut JavaVM) -> JavaResult<Self> {
                let slots = unsafe { *vm } as *const *const c_void;
                if slots.is_null() {
                    return Err(missing("JavaVM"));
                }
                $(
                    let slot = unsafe { *slots.add(InvokeOp::$op as usize) };
                    if slot.is_null() {
                        return Err(missing(stringify!($op)));
                    }
                    let $field = unsafe {
                        std::mem::transmute::<
                            *const c_void,
                            unsafe extern "system" fn(*mut JavaVM $(, $arg)*) -> $ret,
                        >(slot)
                    };
                )*
                Ok(InvokeTable { $($field,)* })
            }
        }
    };
}

macro_rules! env_table {
    ($($field:ident => $op:ident ( $($arg:ty),* ) $(-> $ret:ty)?;)*) => {
        /// Operations of a per-thread environment handle.
        #[derive(Clone, Copy)]
        pub struct EnvTable {
            $(pub $field: unsafe extern "system" fn(*mut JNIEnv $(, $arg)*) $(-> $ret)?,)*
        }

        impl EnvTable {
            /// # Safety
            /// `env` must be a live environment handle.
            pub unsafe fn load(env: *mut JNIEnv) -> JavaResult<Self> {
                let slots = unsafe { *env } as *const *const c_void;
                if slots.is_null() {
                    return Err(missing("JNIEnv"));
                }
                $(
                    let slot = unsafe { *slots.add(EnvOp::$op.offset()) };
                    if slot.is_null() {
                        return Err(missing(stringify!($op)));
                    }
                    let $field = unsafe {
                        std::mem::transmute::<
                            *const c_void,
                            unsafe extern "system" fn(*mut JNIEnv $(, $arg)*) $(-> $ret)?,
                        >(slot)
                    };
                )*
                Ok(EnvTable { $($field,)* })
            }
        }
    };
}

invoke_table! {
    destroy_java_vm => DestroyJavaVM() -> jint;
    attach_current_thread => AttachCurrentThread(*mut *mut c_void, *mut c_void) -> jint;
    detach_current_thread => DetachCurrentThread() -> jint;
    get_env => GetEnv(*mut *mut c_void, jint) -> jint;
    attach_current_thread_as_daemon => AttachCurrentThreadAsDaemon(*mut *mut c_void, *mut c_void) -> jint;
}

env_table! {
    get_version => GetVersion() -> jint;
    find_class => FindClass(*const c_char) -> jclass;
    from_reflected_method => FromReflectedMethod(jobject) -> jmethodID;
    from_reflected_field => FromReflectedField(jobject) -> jfieldID;
    is_assignable_from => IsAssignableFrom(jclass, jclass) -> jboolean;

    exception_occurred => ExceptionOccurred() -> jthrowable;
    exception_clear => ExceptionClear();
    exception_check => ExceptionCheck() -> jboolean;

    push_local_frame => PushLocalFrame(jint) -> jint;
    pop_local_frame => PopLocalFrame(jobject) -> jobject;
    new_global_ref => NewGlobalRef(jobject) -> jobject;
    delete_global_ref => DeleteGlobalRef(jobject);
    delete_local_ref => DeleteLocalRef(jobject);
    is_same_object => IsSameObject(jobject, jobject) -> jboolean;

    new_object_a => NewObjectA(jclass, jmethodID, *const jvalue) -> jobject;
    get_object_class => GetObjectClass(jobject) -> jclass;
    is_instance_of => IsInstanceOf(jobject, jclass) -> jboolean;
    get_method_id => GetMethodID(jclass, *const c_char, *const c_char) -> jmethodID;

    call_object_method_a => CallObjectMethodA(jobject, jmethodID, *const jvalue) -> jobject;
    call_boolean_method_a => CallBooleanMethodA(jobject, jmethodID, *const jvalue) -> jboolean;
    call_byte_method_a => CallByteMethodA(jobject, jmethodID, *const jvalue) -> jbyte;
    call_char_method_a => CallCharMethodA(jobject, jmethodID, *const jvalue) -> jchar;
    call_short_method_a => CallShortMethodA(jobject, jmethodID, *const jvalue) -> jshort;
    call_int_method_a => CallIntMethodA(jobject, jmethodID, *const jvalue) -> jint;
    call_long_method_a => CallLongMethodA(jobject, jmethodID, *const jvalue) -> jlong;
    call_float_method_a => CallFloatMethodA(jobject, jmethodID, *const jvalue) -> jfloat;
    call_double_method_a => CallDoubleMethodA(jobject, jmethodID, *const jvalue) -> jdouble;
    call_void_method_a => CallVoidMethodA(jobject, jmethodID, *const jvalue);

    get_object_field => GetObjectField(jobject, jfieldID) -> jobject;
    get_boolean_field => GetBooleanField(jobject, jfieldID) -> jboolean;
    get_byte_field => GetByteField(jobject, jfieldID) -> jbyte;
    get_char_field => GetCharField(jobject, jfieldID) -> jchar;
    get_short_field => GetShortField(jobject, jfieldID) -> jshort;
    get_int_field => GetIntField(jobject, jfieldID) -> jint;
    get_long_field => GetLongField(jobject, jfieldID) -> jlong;
    get_float_field => GetFloatField(jobject, jfieldID) -> jfloat;
    get_double_field => GetDoubleField(jobject, jfieldID) -> jdouble;
    set_object_field => SetObjectField(jobject, jfieldID, jobject);
    set_boolean_field => SetBooleanField(jobject, jfieldID, jboolean);
    set_byte_field => SetByteField(jobject, jfieldID, jbyte);
    set_char_field => SetCharField(jobject, jfieldID, jchar);
    set_short_field => SetShortField(jobject, jfieldID, jshort);
    set_int_field => SetIntField(jobject, jfieldID, jint);
    set_long_field => SetLongField(jobject, jfieldID, jlong);
    set_float_field => SetFloatField(jobject, jfieldID, jfloat);
    set_double_field => SetDoubleField(jobject, jfieldID, jdouble);

    get_static_method_id => GetStaticMethodID(jclass, *const c_char, *const c_char) -> jmethodID;
    call_static_object_method_a => CallStaticObjectMethodA(jclass, jmethodID, *const jvalue) -> jobject;
    call_static_boolean_method_a => CallStaticBooleanMethodA(jclass, jmethodID, *const jvalue) -> jboolean;
    call_static_byte_method_a => CallStaticByteMethodA(jclass, jmethodID, *const jvalue) -> jbyte;
    call_static_char_method_a => CallStaticCharMethodA(jclass, jmethodID, *const jvalue) -> jchar;
    call_static_short_method_a => CallStaticShortMethodA(jclass, jmethodID, *const jvalue) -> jshort;
    call_static_int_method_a => CallStaticIntMethodA(jclass, jmethodID, *const jvalue) -> jint;
    call_static_long_method_a => CallStaticLongMethodA(jclass, jmethodID, *const jvalue) -> jlong;
    call_static_float_method_a => CallStaticFloatMethodA(jclass, jmethodID, *const jvalue) -> jfloat;
    call_static_double_method_a => CallStaticDoubleMethodA(jclass, jmethodID, *const jvalue) -> jdouble;
    call_static_void_method_a => CallStaticVoidMethodA(jclass, jmethodID, *const jvalue);

    get_static_object_field => GetStaticObjectField(jclass, jfieldID) -> jobject;
    get_static_boolean_field => GetStaticBooleanField(jclass, jfieldID) -> jboolean;
    get_static_byte_field => GetStaticByteField(jclass, jfieldID) -> jbyte;
    get_static_char_field => GetStaticCharField(jclass, jfieldID) -> jchar;
    get_static_short_field => GetStaticShortField(jclass, jfieldID) -> jshort;
    get_static_int_field => GetStaticIntField(jclass, jfieldID) -> jint;
    get_static_long_field => GetStaticLongField(jclass, jfieldID) -> jlong;
    get_static_float_field => GetStaticFloatField(jclass, jfieldID) -> jfloat;
    get_static_double_field => GetStaticDoubleField(jclass, jfieldID) -> jdouble;
    set_static_object_field => SetStaticObjectField(jclass, jfieldID, jobject);
    set_static_boolean_field => SetStaticBooleanField(jclass, jfieldID, jboolean);
    set_static_byte_field => SetStaticByteField(jclass, jfieldID, jbyte);
    set_static_char_field => SetStaticCharField(jclass, jfieldID, jchar);
    set_static_short_field => SetStaticShortField(jclass, jfieldID, jshort);
    set_static_int_field => SetStaticIntField(jclass, jfieldID, jint);
    set_static_long_field => SetStaticLongField(jclass, jfieldID, jlong);
    set_static_float_field => SetStaticFloatField(jclass, jfieldID, jfloat);
    set_static_double_field => SetStaticDoubleField(jclass, jfieldID, jdouble);

    new_string => NewString(*const jchar, jsize) -> jstring;
    get_string_length => GetStringLength(jstring) -> jsize;
    get_string_region => GetStringRegion(jstring, jsize, jsize, *mut jchar);

    get_array_length => GetArrayLength(jarray) -> jsize;
    new_object_array => NewObjectArray(jsize, jclass, jobject) -> jobjectArray;
    get_object_array_element => GetObjectArrayElement(jobjectArray, jsize) -> jobject;
    set_object_array_element => SetObjectArrayElement(jobjectArray, jsize, jobject);

    new_boolean_array => NewBooleanArray(jsize) -> jarray;
    new_byte_array => NewByteArray(jsize) -> jarray;
    new_char_array => NewCharArray(jsize) -> jarray;
    new_short_array => NewShortArray(jsize) -> jarray;
    new_int_array => NewIntArray(jsize) -> jarray;
    new_long_array => NewLongArray(jsize) -> jarray;
    new_float_array => NewFloatArray(jsize) -> jarray;
    new_double_array => NewDoubleArray(jsize) -> jarray;

    get_boolean_array_region => GetBooleanArrayRegion(jarray, jsize, jsize, *mut jboolean);
    get_byte_array_region => GetByteArrayRegion(jarray, jsize, jsize, *mut jbyte);
    get_char_array_region => GetCharArrayRegion(jarray, jsize, jsize, *mut jchar);
    get_short_array_region => GetShortArrayRegion(jarray, jsize, jsize, *mut jshort);
    get_int_array_region => GetIntArrayRegion(jarray, jsize, jsize, *mut jint);
    get_long_array_region => GetLongArrayRegion(jarray, jsize, jsize, *mut jlong);
    get_float_array_region => GetFloatArrayRegion(jarray, jsize, jsize, *mut jfloat);
    get_double_array_region => GetDoubleArrayRegion(jarray, jsize, jsize, *mut jdouble);

    set_boolean_array_region => SetBooleanArrayRegion(jarray, jsize, jsize, *const jboolean);
    set_byte_array_region => SetByteArrayRegion(jarray, jsize, jsize, *const jbyte);
    set_char_array_region => SetCharArrayRegion(jarray, jsize, jsize, *const jchar);
    set_short_array_region => SetShortArrayRegion(jarray, jsize, jsize, *const jshort);
    set_int_array_region => SetIntArrayRegion(jarray, jsize, jsize, *const jint);
    set_long_array_region => SetLongArrayRegion(jarray, jsize, jsize, *const jlong);
    set_float_array_region => SetFloatArrayRegion(jarray, jsize, jsize, *const jfloat);
    set_double_array_region => SetDoubleArrayRegion(jarray, jsize, jsize, *const jdouble);
}
