//! Translation of pending foreign exceptions into [`JavaError::Foreign`].
//!
//! The bridge introspects the throwable through its own method ids and only
//! ever calls back in through [`Env::quiet`], so an exception raised while
//! describing another one is swallowed instead of bridged again.

use std::ffi::CStr;
use std::ptr;

use jolt_core::error::UNKNOWN_TYPE;
use jolt_core::{ForeignException, JavaError, StackFrame, ThrowableInfo};

use crate::env::Env;
use crate::refs::MethodId;
use crate::sys::*;

/// Longest cause chain that is followed.
const MAX_CAUSES: usize = 32;

const BRIDGE_FRAME_CAPACITY: jint = 16;

pub(crate) struct BridgeIds {
    get_class: MethodId,
    class_name: MethodId,
    message: MethodId,
    cause: MethodId,
    stack_trace: MethodId,
    frame_class: MethodId,
    frame_method: MethodId,
    frame_file: MethodId,
    frame_line: MethodId,
}

impl BridgeIds {
    /// Resolve every id, or `None` if any lookup fails.
    pub fn load(env: &Env<'_>) -> Option<Self> {
        let object = QuietClass::find(env, c"java/lang/Object")?;
        let class = QuietClass::find(env, c"java/lang/Class")?;
        let throwable = QuietClass::find(env, c"java/lang/Throwable")?;
        let frame = QuietClass::find(env, c"java/lang/StackTraceElement")?;

        Some(BridgeIds {
            get_class: object.method(c"getClass", c"()Ljava/lang/Class;")?,
            class_name: class.method(c"getName", c"()Ljava/lang/String;")?,
            message: throwable.method(c"getMessage", c"()Ljava/lang/String;")?,
            cause: throwable.method(c"getCause", c"()Ljava/lang/Throwable;")?,
            stack_trace: throwable.method(c"getStackTrace", c"()[Ljava/lang/StackTraceElement;")?,
            frame_class: frame.method(c"getClassName", c"()Ljava/lang/String;")?,
            frame_method: frame.method(c"getMethodName", c"()Ljava/lang/String;")?,
            frame_file: frame.method(c"getFileName", c"()Ljava/lang/String;")?,
            frame_line: frame.method(c"getLineNumber", c"()I")?,
        })
    }
}

/// A class looked up without bridging, released when dropped.
struct QuietClass<'a, 'vm> {
    env: &'a Env<'vm>,
    raw: jclass,
}

impl<'a, 'vm> QuietClass<'a, 'vm> {
    fn find(env: &'a Env<'vm>, name: &CStr) -> Option<Self> {
        let raw = env
            .quiet(|e, t| unsafe { (t.find_class)(e, name.as_ptr()) })
            .filter(|raw| !raw.is_null())?;
        Some(QuietClass { env, raw })
    }

    fn method(&self, name: &CStr, signature: &CStr) -> Option<MethodId> {
        let raw = self
            .env
            .quiet(|e, t| unsafe { (t.get_method_id)(e, self.raw, name.as_ptr(), signature.as_ptr()) })?;
        MethodId::new(raw)
    }
}

impl Drop for QuietClass<'_, '_> {
    fn drop(&mut self) {
        let raw = self.raw;
        self.env.quiet(|e, t| unsafe { (t.delete_local_ref)(e, raw) });
    }
}

/// Fetch and clear the pending exception, returning it as a host error.
pub(crate) fn take_pending(env: &Env<'_>) -> JavaError {
    let throwable = env
        .quiet(|e, t| unsafe { (t.exception_occurred)(e) })
        .unwrap_or(ptr::null_mut());
    env.quiet(|e, t| unsafe { (t.exception_clear)(e) });

    let exception = if throwable.is_null() {
        ForeignException::unknown()
    } else {
        let pushed = env.quiet(|e, t| unsafe { (t.push_local_frame)(e, BRIDGE_FRAME_CAPACITY) });
        let exception = describe(env, throwable);
        if pushed == Some(JNI_OK) {
            env.quiet(|e, t| unsafe { (t.pop_local_frame)(e, ptr::null_mut()) });
        }
        env.quiet(|e, t| unsafe { (t.delete_local_ref)(e, throwable) });
        exception
    };

    tracing::debug!(
        exception = %exception.type_name,
        root = exception.root_type(),
        causes = exception.causes.len(),
        "bridged foreign exception"
    );
    JavaError::Foreign(exception)
}

fn describe(env: &Env<'_>, throwable: jthrowable) -> ForeignException {
    let Some(ids) = env.vm().bridge_ids(env) else {
        return ForeignException::unknown();
    };

    let head = link(env, ids, throwable);
    let mut exception = ForeignException::new(head.type_name, head.message);
    if env.vm().settings().capture_stack_traces {
        exception.stack_trace = Some(stack_trace(env, ids, throwable));
    }

    let mut previous = throwable;
    for _ in 0..MAX_CAUSES {
        let Some(cause) = call_object(env, previous, ids.cause) else {
            break;
        };
        let same = env
            .quiet(|e, t| unsafe { (t.is_same_object)(e, previous, cause) })
            .unwrap_or(JNI_TRUE);
        if same == JNI_TRUE {
            break;
        }
        exception = exception.with_cause(link(env, ids, cause));
        previous = cause;
    }
    exception
}

fn link(env: &Env<'_>, ids: &BridgeIds, throwable: jthrowable) -> ThrowableInfo {
    let type_name = call_object(env, throwable, ids.get_class)
        .and_then(|class| call_string(env, class, ids.class_name))
        .unwrap_or_else(|| UNKNOWN_TYPE.to_string());
    ThrowableInfo::new(type_name, call_string(env, throwable, ids.message))
}

fn stack_trace(env: &Env<'_>, ids: &BridgeIds, throwable: jthrowable) -> Vec<StackFrame> {
    let Some(frames) = call_object(env, throwable, ids.stack_trace) else {
        return Vec::new();
    };
    let len = env
        .quiet(|e, t| unsafe { (t.get_array_length)(e, frames) })
        .unwrap_or(0);

    (0..len)
        .filter_map(|index| {
            let element = env
                .quiet(|e, t| unsafe { (t.get_object_array_element)(e, frames, index) })
                .filter(|raw| !raw.is_null())?;
            let frame = StackFrame {
                class_name: call_string(env, element, ids.frame_class)
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                method_name: call_string(env, element, ids.frame_method)
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                file_name: call_string(env, element, ids.frame_file),
                line_number: env
                    .quiet(|e, t| unsafe {
                        (t.call_int_method_a)(e, element, ids.frame_line.raw(), ptr::null())
                    })
                    .unwrap_or(-1),
            };
            env.quiet(|e, t| unsafe { (t.delete_local_ref)(e, element) });
            Some(frame)
        })
        .collect()
}

fn call_object(env: &Env<'_>, receiver: jobject, method: MethodId) -> Option<jobject> {
    env.quiet(|e, t| unsafe { (t.call_object_method_a)(e, receiver, method.raw(), ptr::null()) })
        .filter(|raw| !raw.is_null())
}

fn call_string(env: &Env<'_>, receiver: jobject, method: MethodId) -> Option<String> {
    let string = call_object(env, receiver, method)?;
    let len = env.quiet(|e, t| unsafe { (t.get_string_length)(e, string) })?;
    let mut units = vec![0 as jchar; len.max(0) as usize];
    env.quiet(|e, t| unsafe { (t.get_string_region)(e, string, 0, len, units.as_mut_ptr()) })?;
    env.quiet(|e, t| unsafe { (t.delete_local_ref)(e, string) });
    Some(String::from_utf16_lossy(&units))
}
