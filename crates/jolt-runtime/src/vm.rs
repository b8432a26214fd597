//! The VM handle and everything shared by all threads that talk to it.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};

use jolt_core::{JavaError, JavaResult};

use crate::bridge::BridgeIds;
use crate::env::Env;
use crate::library::NativeLibrary;
use crate::sys::{JNI_OK, JNIEnv, JavaVM, jobject};
use crate::table::{EnvTable, InvokeTable};
use crate::threads::ThreadBindings;

#[derive(Clone, Copy)]
struct VmPtr(*mut JavaVM);

// The invocation interface is callable from any thread.
unsafe impl Send for VmPtr {}
unsafe impl Sync for VmPtr {}

/// State shared by every handle bound to the same VM pointer, whichever
/// runtime handle created or attached it.
#[derive(Debug, Default)]
pub(crate) struct VmState {
    destroyed: AtomicBool,
    detaches: AtomicU64,
}

static VM_STATES: LazyLock<DashMap<usize, Arc<VmState>>> = LazyLock::new(DashMap::new);

impl VmState {
    pub fn for_vm(vm: *mut JavaVM) -> Arc<VmState> {
        let entry = VM_STATES.entry(vm as usize).or_default();
        Arc::clone(entry.value())
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Mark the VM destroyed, returning whether it already was.
    fn mark_destroyed(&self) -> bool {
        self.destroyed.swap(true, Ordering::AcqRel)
    }

    /// A fresh VM created at an address an earlier, destroyed VM used.
    fn revive(&self) {
        self.destroyed.store(false, Ordering::Release);
    }

    /// Bumped on every detach, so cached thread handles know to recheck.
    pub fn detach_generation(&self) -> u64 {
        self.detaches.load(Ordering::Acquire)
    }

    pub fn note_detach(&self) {
        self.detaches.fetch_add(1, Ordering::AcqRel);
    }
}

/// Settings that influence every environment handed out for this VM.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EnvSettings {
    pub capture_stack_traces: bool,
    pub local_frame_capacity: i32,
    pub attach_as_daemon: bool,
}

pub(crate) struct VmShared {
    library: NativeLibrary,
    vm: VmPtr,
    invoke: InvokeTable,
    env_table: OnceLock<EnvTable>,
    bindings: ThreadBindings,
    bridge: OnceLock<BridgeIds>,
    state: Arc<VmState>,
    settings: EnvSettings,
}

impl VmShared {
    /// Wrap a VM this process just created; `env` is the creating thread's
    /// handle.
    ///
    /// # Safety
    /// `vm` and `env` must come from a successful `JNI_CreateJavaVM` in
    /// `library`.
    pub unsafe fn created(
        library: NativeLibrary,
        vm: *mut JavaVM,
        env: *mut JNIEnv,
        settings: EnvSettings,
    ) -> JavaResult<Self> {
        let shared = unsafe { Self::new(library, vm, settings)? };
        shared.state.revive();
        shared.bindings.adopt(shared.raw(), &shared.invoke, env);
        Ok(shared)
    }

    /// Wrap a VM that was already running in this process.
    ///
    /// # Safety
    /// `vm` must be a live VM handle obtained from `library`.
    pub unsafe fn attached(library: NativeLibrary, vm: *mut JavaVM, settings: EnvSettings) -> JavaResult<Self> {
        unsafe { Self::new(library, vm, settings) }
    }

    unsafe fn new(library: NativeLibrary, vm: *mut JavaVM, settings: EnvSettings) -> JavaResult<Self> {
        let invoke = unsafe { InvokeTable::load(vm)? };
        let state = VmState::for_vm(vm);
        Ok(VmShared {
            library,
            vm: VmPtr(vm),
            invoke,
            env_table: OnceLock::new(),
            bindings: ThreadBindings::new(Arc::clone(&state), settings.attach_as_daemon),
            bridge: OnceLock::new(),
            state,
            settings,
        })
    }

    pub fn raw(&self) -> *mut JavaVM {
        self.vm.0
    }

    pub fn library(&self) -> &NativeLibrary {
        &self.library
    }

    pub fn settings(&self) -> EnvSettings {
        self.settings
    }

    /// Whether this VM was destroyed through any handle bound to it.
    pub fn is_destroyed(&self) -> bool {
        self.state.is_destroyed()
    }

    /// The calling thread's environment, attaching it on first use.
    pub fn env(self: &Arc<Self>) -> JavaResult<Env<'_>> {
        if self.is_destroyed() {
            return Err(JavaError::ShutDown);
        }
        let raw = self.bindings.current(self.raw(), &self.invoke)?;
        let table = self.table_for(raw)?;
        Ok(Env::new(raw, table, self))
    }

    fn table_for(&self, raw: *mut JNIEnv) -> JavaResult<&EnvTable> {
        if let Some(table) = self.env_table.get() {
            return Ok(table);
        }
        let table = unsafe { EnvTable::load(raw)? };
        Ok(self.env_table.get_or_init(|| table))
    }

    pub fn is_thread_bound(&self) -> bool {
        self.bindings.is_bound()
    }

    pub fn detach_current_thread(&self) -> JavaResult<()> {
        if self.is_destroyed() {
            return Err(JavaError::ShutDown);
        }
        self.bindings.detach(self.raw(), &self.invoke)
    }

    /// Method ids the exception bridge needs, loaded on first use.
    pub fn bridge_ids(&self, env: &Env<'_>) -> Option<&BridgeIds> {
        if let Some(ids) = self.bridge.get() {
            return Some(ids);
        }
        let ids = BridgeIds::load(env)?;
        Some(self.bridge.get_or_init(|| ids))
    }

    /// Delete a global reference from whatever thread is dropping it.
    /// Once the VM is gone the reference went with it.
    pub fn release_global(self: &Arc<Self>, raw: jobject) {
        match self.env() {
            Ok(env) => env.delete_global_ref(raw),
            Err(JavaError::ShutDown) => {}
            Err(e) => tracing::debug!(error = %e, "leaking global reference"),
        }
    }

    /// Destroy the VM. Only the first call has any effect.
    pub fn destroy(self: &Arc<Self>) -> JavaResult<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        // DestroyJavaVM must run on an attached thread.
        self.env()?;
        if self.state.mark_destroyed() {
            return Ok(());
        }
        let code = unsafe { (self.invoke.destroy_java_vm)(self.raw()) };
        self.bindings.clear();
        if code != JNI_OK {
            return Err(JavaError::Lifecycle {
                operation: "DestroyJavaVM",
                code,
            });
        }
        tracing::info!(library = %self.library.origin(), "destroyed JVM");
        Ok(())
    }
}
