//! Raw ABI of the JVM invocation interface.
//!
//! Layouts and slot offsets follow the published JNI function tables. The
//! environment and VM handles are pointers to pointers to function tables;
//! the tables themselves are read through [`crate::table`].

#![allow(non_camel_case_types)]

use libc::{c_char, c_void};

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jarray = jobject;
pub type jobjectArray = jarray;
pub type jthrowable = jobject;

pub type jmethodID = *mut c_void;
pub type jfieldID = *mut c_void;

/// The argument slot used by the `...A` call variants.
#[repr(C)]
#[derive(Clone, Copy)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

/// Per-thread environment: a pointer to the operation table.
pub type JNIEnv = *const c_void;
/// VM handle: a pointer to the lifecycle table.
pub type JavaVM = *const c_void;

#[repr(C)]
#[derive(Debug)]
pub struct JavaVMOption {
    pub option_string: *mut c_char,
    pub extra_info: *mut c_void,
}

#[repr(C)]
#[derive(Debug)]
pub struct JavaVMInitArgs {
    pub version: jint,
    pub n_options: jint,
    pub options: *mut JavaVMOption,
    pub ignore_unrecognized: jboolean,
}

pub const JNI_FALSE: jboolean = 0;
pub const JNI_TRUE: jboolean = 1;

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;
pub const JNI_EDETACHED: jint = -2;
pub const JNI_EVERSION: jint = -3;
pub const JNI_ENOMEM: jint = -4;
pub const JNI_EEXIST: jint = -5;
pub const JNI_EINVAL: jint = -6;

pub const JNI_VERSION_1_6: jint = 0x0001_0006;

/// `java.lang.reflect.Modifier.STATIC`.
pub const ACC_STATIC: jint = 0x0008;

pub const CREATE_JAVA_VM: &str = "JNI_CreateJavaVM";
pub const GET_CREATED_JAVA_VMS: &str = "JNI_GetCreatedJavaVMs";
pub const GET_DEFAULT_JAVA_VM_INIT_ARGS: &str = "JNI_GetDefaultJavaVMInitArgs";

pub type CreateJavaVmFn =
    unsafe extern "system" fn(vm: *mut *mut JavaVM, env: *mut *mut c_void, args: *mut c_void) -> jint;
pub type GetCreatedJavaVmsFn =
    unsafe extern "system" fn(vms: *mut *mut JavaVM, capacity: jsize, count: *mut jsize) -> jint;
pub type GetDefaultJavaVmInitArgsFn = unsafe extern "system" fn(args: *mut c_void) -> jint;

/// Human-readable name of a lifecycle status code.
pub fn status_name(code: jint) -> &'static str {
    match code {
        JNI_OK => "ok",
        JNI_ERR => "unknown error",
        JNI_EDETACHED => "thread detached",
        JNI_EVERSION => "unsupported version",
        JNI_ENOMEM => "out of memory",
        JNI_EEXIST => "VM already created",
        JNI_EINVAL => "invalid arguments",
        _ => "unrecognized status",
    }
}

/// Slots of the lifecycle table. Slots 0-2 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum InvokeOp {
    DestroyJavaVM = 3,
    AttachCurrentThread = 4,
    DetachCurrentThread = 5,
    GetEnv = 6,
    AttachCurrentThreadAsDaemon = 7,
}

impl InvokeOp {
    pub const TABLE_LEN: usize = 8;
}

/// Slots of the per-thread operation table. Slots 0-3 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum EnvOp {
    GetVersion = 4,
    DefineClass = 5,
    FindClass = 6,
    FromReflectedMethod = 7,
    FromReflectedField = 8,
    ToReflectedMethod = 9,
    GetSuperclass = 10,
    IsAssignableFrom = 11,
    ToReflectedField = 12,
    Throw = 13,
    ThrowNew = 14,
    ExceptionOccurred = 15,
    ExceptionDescribe = 16,
    ExceptionClear = 17,
    FatalError = 18,
    PushLocalFrame = 19,
    PopLocalFrame = 20,
    NewGlobalRef = 21,
    DeleteGlobalRef = 22,
    DeleteLocalRef = 23,
    IsSameObject = 24,
    NewLocalRef = 25,
    EnsureLocalCapacity = 26,
    AllocObject = 27,
    NewObject = 28,
    NewObjectV = 29,
    NewObjectA = 30,
    GetObjectClass = 31,
    IsInstanceOf = 32,
    GetMethodID = 33,
    CallObjectMethod = 34,
    CallObjectMethodV = 35,
    CallObjectMethodA = 36,
    CallBooleanMethod = 37,
    CallBooleanMethodV = 38,
    CallBooleanMethodA = 39,
    CallByteMethod = 40,
    CallByteMethodV = 41,
    CallByteMethodA = 42,
    CallCharMethod = 43,
    CallCharMethodV = 44,
    CallCharMethodA = 45,
    CallShortMethod = 46,
    CallShortMethodV = 47,
    CallShortMethodA = 48,
    CallIntMethod = 49,
    CallIntMethodV = 50,
    CallIntMethodA = 51,
    CallLongMethod = 52,
    CallLongMethodV = 53,
    CallLongMethodA = 54,
    CallFloatMethod = 55,
    CallFloatMethodV = 56,
    CallFloatMethodA = 57,
    CallDoubleMethod = 58,
    CallDoubleMethodV = 59,
    CallDoubleMethodA = 60,
    CallVoidMethod = 61,
    CallVoidMethodV = 62,
    CallVoidMethodA = 63,
    CallNonvirtualObjectMethod = 64,
    CallNonvirtualObjectMethodV = 65,
    CallNonvirtualObjectMethodA = 66,
    CallNonvirtualBooleanMethod = 67,
    CallNonvirtualBooleanMethodV = 68,
    CallNonvirtualBooleanMethodA = 69,
    CallNonvirtualByteMethod = 70,
    CallNonvirtualByteMethodV = 71,
    CallNonvirtualByteMethodA = 72,
    CallNonvirtualCharMethod = 73,
    CallNonvirtualCharMethodV = 74,
    CallNonvirtualCharMethodA = 75,
    CallNonvirtualShortMethod = 76,
    CallNonvirtualShortMethodV = 77,
    CallNonvirtualShortMethodA = 78,
    CallNonvirtualIntMethod = 79,
    CallNonvirtualIntMethodV = 80,
    CallNonvirtualIntMethodA = 81,
    CallNonvirtualLongMethod = 82,
    CallNonvirtualLongMethodV = 83,
    CallNonvirtualLongMethodA = 84,
    CallNonvirtualFloatMethod = 85,
    CallNonvirtualFloatMethodV = 86,
    CallNonvirtualFloatMethodA = 87,
    CallNonvirtualDoubleMethod = 88,
    CallNonvirtualDoubleMethodV = 89,
    CallNonvirtualDoubleMethodA = 90,
    CallNonvirtualVoidMethod = 91,
    CallNonvirtualVoidMethodV = 92,
    CallNonvirtualVoidMethodA = 93,
    GetFieldID = 94,
    GetObjectField = 95,
    GetBooleanField = 96,
    GetByteField = 97,
    GetCharField = 98,
    GetShortField = 99,
    GetIntField = 100,
    GetLongField = 101,
    GetFloatField = 102,
    GetDoubleField = 103,
    SetObjectField = 104,
    SetBooleanField = 105,
    SetByteField = 106,
    SetCharField = 107,
    SetShortField = 108,
    SetIntField = 109,
    SetLongField = 110,
    SetFloatField = 111,
    SetDoubleField = 112,
    GetStaticMethodID = 113,
    CallStaticObjectMethod = 114,
    CallStaticObjectMethodV = 115,
    CallStaticObjectMethodA = 116,
    CallStaticBooleanMethod = 117,
    CallStaticBooleanMethodV = 118,
    CallStaticBooleanMethodA = 119,
    CallStaticByteMethod = 120,
    CallStaticByteMethodV = 121,
    CallStaticByteMethodA = 122,
    CallStaticCharMethod = 123,
    CallStaticCharMethodV = 124,
    CallStaticCharMethodA = 125,
    CallStaticShortMethod = 126,
    CallStaticShortMethodV = 127,
    CallStaticShortMethodA = 128,
    CallStaticIntMethod = 129,
    CallStaticIntMethodV = 130,
    CallStaticIntMethodA = 131,
    CallStaticLongMethod = 132,
    CallStaticLongMethodV = 133,
    CallStaticLongMethodA = 134,
    CallStaticFloatMethod = 135,
    CallStaticFloatMethodV = 136,
    CallStaticFloatMethodA = 137,
    CallStaticDoubleMethod = 138,
    CallStaticDoubleMethodV = 139,
    CallStaticDoubleMethodA = 140,
    CallStaticVoidMethod = 141,
    CallStaticVoidMethodV = 142,
    CallStaticVoidMethodA = 143,
    GetStaticFieldID = 144,
    GetStaticObjectField = 145,
    GetStaticBooleanField = 146,
    GetStaticByteField = 147,
    GetStaticCharField = 148,
    GetStaticShortField = 149,
    GetStaticIntField = 150,
    GetStaticLongField = 151,
    GetStaticFloatField = 152,
    GetStaticDoubleField = 153,
    SetStaticObjectField = 154,
    SetStaticBooleanField = 155,
    SetStaticByteField = 156,
    SetStaticCharField = 157,
    SetStaticShortField = 158,
    SetStaticIntField = 159,
    SetStaticLongField = 160,
    SetStaticFloatField = 161,
    SetStaticDoubleField = 162,
    NewString = 163,
    GetStringLength = 164,
    GetStringChars = 165,
    ReleaseStringChars = 166,
    NewStringUTF = 167,
    GetStringUTFLength = 168,
    GetStringUTFChars = 169,
    ReleaseStringUTFChars = 170,
    GetArrayLength = 171,
    NewObjectArray = 172,
    GetObjectArrayElement = 173,
    SetObjectArrayElement = 174,
    NewBooleanArray = 175,
    NewByteArray = 176,
    NewCharArray = 177,
    NewShortArray = 178,
    NewIntArray = 179,
    NewLongArray = 180,
    NewFloatArray = 181,
    NewDoubleArray = 182,
    GetBooleanArrayElements = 183,
    GetByteArrayElements = 184,
    GetCharArrayElements = 185,
    GetShortArrayElements = 186,
    GetIntArrayElements = 187,
    GetLongArrayElements = 188,
    GetFloatArrayElements = 189,
    GetDoubleArrayElements = 190,
    ReleaseBooleanArrayElements = 191,
    ReleaseByteArrayElements = 192,
    ReleaseCharArrayElements = 193,
    ReleaseShortArrayElements = 194,
    ReleaseIntArrayElements = 195,
    ReleaseLongArrayElements = 196,
    ReleaseFloatArrayElements = 197,
    ReleaseDoubleArrayElements = 198,
    GetBooleanArrayRegion = 199,
    GetByteArrayRegion = 200,
    GetCharArrayRegion = 201,
    GetShortArrayRegion = 202,
    GetIntArrayRegion = 203,
    GetLongArrayRegion = 204,
    GetFloatArrayRegion = 205,
    GetDoubleArrayRegion = 206,
    SetBooleanArrayRegion = 207,
    SetByteArrayRegion = 208,
    SetCharArrayRegion = 209,
    SetShortArrayRegion = 210,
    SetIntArrayRegion = 211,
    SetLongArrayRegion = 212,
    SetFloatArrayRegion = 213,
    SetDoubleArrayRegion = 214,
    RegisterNatives = 215,
    UnregisterNatives = 216,
    MonitorEnter = 217,
    MonitorExit = 218,
    GetJavaVM = 219,
    GetStringRegion = 220,
    GetStringUTFRegion = 221,
    GetPrimitiveArrayCritical = 222,
    ReleasePrimitiveArrayCritical = 223,
    GetStringCritical = 224,
    ReleaseStringCritical = 225,
    NewWeakGlobalRef = 226,
    DeleteWeakGlobalRef = 227,
    ExceptionCheck = 228,
    NewDirectByteBuffer = 229,
    GetDirectBufferAddress = 230,
    GetDirectBufferCapacity = 231,
    GetObjectRefType = 232,
    GetModule = 233,
}

impl EnvOp {
    /// Number of slots up to and including the last operation known here.
    pub const TABLE_LEN: usize = EnvOp::GetModule as usize + 1;

    pub fn offset(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn test_jvalue_is_one_slot() {
        assert_eq!(size_of::<jvalue>(), 8);
        assert_eq!(align_of::<jvalue>(), 8);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_init_args_layout() {
        assert_eq!(offset_of!(JavaVMInitArgs, version), 0);
        assert_eq!(offset_of!(JavaVMInitArgs, n_options), 4);
        assert_eq!(offset_of!(JavaVMInitArgs, options), 8);
        assert_eq!(offset_of!(JavaVMInitArgs, ignore_unrecognized), 16);
        assert_eq!(size_of::<JavaVMInitArgs>(), 24);

        assert_eq!(offset_of!(JavaVMOption, option_string), 0);
        assert_eq!(offset_of!(JavaVMOption, extra_info), 8);
        assert_eq!(size_of::<JavaVMOption>(), 16);
    }

    #[test]
    fn test_env_offsets() {
        assert_eq!(EnvOp::GetVersion.offset(), 4);
        assert_eq!(EnvOp::FindClass.offset(), 6);
        assert_eq!(EnvOp::IsAssignableFrom.offset(), 11);
        assert_eq!(EnvOp::ExceptionClear.offset(), 17);
        assert_eq!(EnvOp::GetMethodID.offset(), 33);
        assert_eq!(EnvOp::CallObjectMethodA.offset(), 36);
        assert_eq!(EnvOp::CallVoidMethodA.offset(), 63);
        assert_eq!(EnvOp::GetFieldID.offset(), 94);
        assert_eq!(EnvOp::CallStaticVoidMethodA.offset(), 143);
        assert_eq!(EnvOp::NewString.offset(), 163);
        assert_eq!(EnvOp::NewDoubleArray.offset(), 182);
        assert_eq!(EnvOp::SetDoubleArrayRegion.offset(), 214);
        assert_eq!(EnvOp::GetStringRegion.offset(), 220);
        assert_eq!(EnvOp::ExceptionCheck.offset(), 228);
        assert_eq!(EnvOp::TABLE_LEN, 234);
    }

    #[test]
    fn test_call_variants_are_three_apart() {
        let virtual_a = [
            EnvOp::CallObjectMethodA,
            EnvOp::CallBooleanMethodA,
            EnvOp::CallByteMethodA,
            EnvOp::CallCharMethodA,
            EnvOp::CallShortMethodA,
            EnvOp::CallIntMethodA,
            EnvOp::CallLongMethodA,
            EnvOp::CallFloatMethodA,
            EnvOp::CallDoubleMethodA,
            EnvOp::CallVoidMethodA,
        ];
        let static_a = [
            EnvOp::CallStaticObjectMethodA,
            EnvOp::CallStaticBooleanMethodA,
            EnvOp::CallStaticByteMethodA,
            EnvOp::CallStaticCharMethodA,
            EnvOp::CallStaticShortMethodA,
            EnvOp::CallStaticIntMethodA,
            EnvOp::CallStaticLongMethodA,
            EnvOp::CallStaticFloatMethodA,
            EnvOp::CallStaticDoubleMethodA,
            EnvOp::CallStaticVoidMethodA,
        ];
        for (step, (v, s)) in virtual_a.iter().zip(static_a.iter()).enumerate() {
            assert_eq!(v.offset(), 36 + step * 3);
            assert_eq!(s.offset(), 116 + step * 3);
        }
    }

    #[test]
    fn test_invoke_offsets() {
        assert_eq!(InvokeOp::DestroyJavaVM as usize, 3);
        assert_eq!(InvokeOp::GetEnv as usize, 6);
        assert_eq!(InvokeOp::AttachCurrentThreadAsDaemon as usize, 7);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(status_name(JNI_EDETACHED), "thread detached");
        assert_eq!(status_name(42), "unrecognized status");
    }
}
