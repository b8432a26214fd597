//! Per-thread environment handles.
//!
//! Each OS thread gets its own environment handle, found with `GetEnv` or
//! created with `AttachCurrentThread` the first time the thread calls in.
//! Handles are recorded by thread id and later calls are served from the
//! record. A detach through any handle bound to the same VM bumps the VM's
//! detach generation, and a record from an older generation is confirmed
//! with `GetEnv` before it is used again.
//!
//! When a thread exits its records are dropped, and if this module attached
//! the thread it is detached again.

use dashmap::DashMap;
use libc::c_void;
use std::cell::RefCell;
use std::ptr;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use jolt_core::{JavaError, JavaResult};

use crate::sys::{JNI_EDETACHED, JNI_OK, JNI_VERSION_1_6, JNIEnv, JavaVM, jint};
use crate::table::InvokeTable;
use crate::vm::VmState;

type DetachFn = unsafe extern "system" fn(vm: *mut JavaVM) -> jint;

#[derive(Clone, Copy)]
struct Binding {
    env: *mut JNIEnv,
    /// Detach generation the handle was last confirmed at.
    generation: u64,
    /// Whether this module attached the thread, rather than finding it
    /// attached already.
    attached_here: bool,
}

// Only ever dereferenced by the thread stored alongside it.
unsafe impl Send for Binding {}
unsafe impl Sync for Binding {}

type BindingMap = DashMap<ThreadId, Binding>;

pub(crate) struct ThreadBindings {
    envs: Arc<BindingMap>,
    state: Arc<VmState>,
    as_daemon: bool,
}

impl ThreadBindings {
    pub fn new(state: Arc<VmState>, as_daemon: bool) -> Self {
        ThreadBindings {
            envs: Arc::new(DashMap::new()),
            state,
            as_daemon,
        }
    }

    /// Record the handle the creating thread received from `JNI_CreateJavaVM`.
    pub fn adopt(&self, vm: *mut JavaVM, invoke: &InvokeTable, env: *mut JNIEnv) {
        let binding = Binding {
            env,
            generation: self.state.detach_generation(),
            attached_here: false,
        };
        self.record(vm, invoke, thread::current().id(), binding);
    }

    /// The calling thread's handle, attaching the thread if necessary.
    pub fn current(&self, vm: *mut JavaVM, invoke: &InvokeTable) -> JavaResult<*mut JNIEnv> {
        let id = thread::current().id();
        let generation = self.state.detach_generation();
        let cached = self.envs.get(&id).map(|binding| *binding);
        if let Some(binding) = cached {
            if binding.generation == generation {
                return Ok(binding.env);
            }
        }

        let (env, attached) = self.acquire(vm, invoke)?;
        let binding = Binding {
            env,
            generation,
            attached_here: attached || cached.is_some_and(|binding| binding.attached_here),
        };
        self.record(vm, invoke, id, binding);
        Ok(env)
    }

    fn record(&self, vm: *mut JavaVM, invoke: &InvokeTable, id: ThreadId, binding: Binding) {
        if self.envs.insert(id, binding).is_none() {
            on_thread_exit(ExitRegistration {
                envs: Arc::downgrade(&self.envs),
                state: Arc::clone(&self.state),
                vm,
                detach: invoke.detach_current_thread,
            });
        }
    }

    /// Find the calling thread's attachment, attaching it if it has none.
    /// The flag is set when this call did the attaching.
    fn acquire(&self, vm: *mut JavaVM, invoke: &InvokeTable) -> JavaResult<(*mut JNIEnv, bool)> {
        let mut env: *mut c_void = ptr::null_mut();
        let code = unsafe { (invoke.get_env)(vm, &mut env, JNI_VERSION_1_6) };
        match code {
            JNI_OK => Ok((env.cast(), false)),
            JNI_EDETACHED => {
                let (attach, operation) = if self.as_daemon {
                    (invoke.attach_current_thread_as_daemon, "AttachCurrentThreadAsDaemon")
                } else {
                    (invoke.attach_current_thread, "AttachCurrentThread")
                };
                let code = unsafe { attach(vm, &mut env, ptr::null_mut()) };
                if code != JNI_OK {
                    return Err(JavaError::Lifecycle { operation, code });
                }
                tracing::debug!(thread = ?thread::current().id(), daemon = self.as_daemon, "attached thread");
                Ok((env.cast(), true))
            }
            code => Err(JavaError::Lifecycle {
                operation: "GetEnv",
                code,
            }),
        }
    }

    /// Detach the calling thread and drop its cached handle.
    pub fn detach(&self, vm: *mut JavaVM, invoke: &InvokeTable) -> JavaResult<()> {
        let id = thread::current().id();
        self.envs.remove(&id);
        self.state.note_detach();
        let code = unsafe { (invoke.detach_current_thread)(vm) };
        if code != JNI_OK {
            return Err(JavaError::Lifecycle {
                operation: "DetachCurrentThread",
                code,
            });
        }
        tracing::debug!(thread = ?id, "detached thread");
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.envs.contains_key(&thread::current().id())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn clear(&self) {
        self.envs.clear();
    }
}

/// What an exiting thread must undo for one set of bindings.
struct ExitRegistration {
    envs: Weak<BindingMap>,
    state: Arc<VmState>,
    vm: *mut JavaVM,
    detach: DetachFn,
}

struct ExitHooks {
    thread: ThreadId,
    registrations: RefCell<Vec<ExitRegistration>>,
}

impl Drop for ExitHooks {
    fn drop(&mut self) {
        for registration in self.registrations.get_mut().drain(..) {
            let Some(envs) = registration.envs.upgrade() else {
                continue;
            };
            let Some((_, binding)) = envs.remove(&self.thread) else {
                continue;
            };
            if binding.attached_here && !registration.state.is_destroyed() {
                let code = unsafe { (registration.detach)(registration.vm) };
                if code == JNI_OK {
                    registration.state.note_detach();
                }
            }
        }
    }
}

thread_local! {
    static EXIT_HOOKS: ExitHooks = ExitHooks {
        thread: thread::current().id(),
        registrations: RefCell::new(Vec::new()),
    };
}

fn on_thread_exit(registration: ExitRegistration) {
    // Only fails while the thread is already tearing down its locals.
    let _ = EXIT_HOOKS.try_with(|hooks| {
        let mut registrations = hooks.registrations.borrow_mut();
        registrations.retain(|known| known.envs.strong_count() > 0);
        if !registrations.iter().any(|known| known.envs.ptr_eq(&registration.envs)) {
            registrations.push(registration);
        }
    });
}
