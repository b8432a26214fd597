//! Owned references into the foreign heap, and member ids.

use std::fmt;
use std::sync::Arc;

use jolt_core::{JavaError, JavaResult};

use crate::env::Env;
use crate::sys::{jfieldID, jmethodID, jobject};
use crate::vm::VmShared;

/// A global reference, released when the last clone drops.
///
/// Release happens on whichever thread drops it, attaching that thread if
/// needed, and is skipped once the runtime has been destroyed.
#[derive(Clone)]
pub(crate) struct GlobalRef {
    inner: Arc<GlobalInner>,
}

struct GlobalInner {
    raw: jobject,
    vm: Arc<VmShared>,
}

// Global references may be used and deleted from any attached thread.
unsafe impl Send for GlobalInner {}
unsafe impl Sync for GlobalInner {}

impl GlobalRef {
    /// Promote `local` to a global reference. `local` must not be null.
    pub fn new(env: &Env<'_>, local: jobject) -> JavaResult<Self> {
        if local.is_null() {
            return Err(JavaError::conversion("cannot take a global reference to null"));
        }
        let raw = env.new_global_ref(local)?;
        Ok(GlobalRef {
            inner: Arc::new(GlobalInner {
                raw,
                vm: env.vm_handle(),
            }),
        })
    }

    pub fn as_raw(&self) -> jobject {
        self.inner.raw
    }
}

impl Drop for GlobalInner {
    fn drop(&mut self) {
        self.vm.release_global(self.raw);
    }
}

impl fmt::Debug for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalRef({:p})", self.inner.raw)
    }
}

/// A resolved method or constructor id. Ids stay valid while the declaring
/// class is loaded, on every thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MethodId(jmethodID);

unsafe impl Send for MethodId {}
unsafe impl Sync for MethodId {}

impl MethodId {
    pub fn new(raw: jmethodID) -> Option<Self> {
        (!raw.is_null()).then_some(MethodId(raw))
    }

    pub fn raw(self) -> jmethodID {
        self.0
    }
}

/// A resolved field id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldId(jfieldID);

unsafe impl Send for FieldId {}
unsafe impl Sync for FieldId {}

impl FieldId {
    pub fn new(raw: jfieldID) -> Option<Self> {
        (!raw.is_null()).then_some(FieldId(raw))
    }

    pub fn raw(self) -> jfieldID {
        self.0
    }
}
