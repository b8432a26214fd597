//! The runtime handle and its host-facing facade.

use dashmap::DashMap;
use libc::{c_char, c_void};
use parking_lot::{Mutex, RwLock};
use std::ffi::CString;
use std::fmt;
use std::ptr;
use std::sync::{Arc, OnceLock};

use jolt_core::{JavaError, JavaResult, JavaType, PrimitiveKind, RuntimeConfig, TypeOracle};

use crate::array::JavaArray;
use crate::class::JavaClass;
use crate::env::Env;
use crate::library::NativeLibrary;
use crate::marshal;
use crate::object::JavaObject;
use crate::package::JavaPackage;
use crate::reflect::{ClassInfo, CoreClasses, WrapperInfo};
use crate::sys::*;
use crate::value::HostArray;
use crate::vm::{EnvSettings, VmShared};

/// Only one creation may be in flight per process.
static CREATION: Mutex<()> = Mutex::new(());

/// Shared state behind every proxy of one runtime handle.
pub(crate) struct Runtime {
    vm: Arc<VmShared>,
    reuse: bool,
    core: OnceLock<CoreClasses>,
    classes: DashMap<String, Arc<ClassInfo>>,
    wrappers: DashMap<PrimitiveKind, Arc<WrapperInfo>>,
    imports: RwLock<Vec<String>>,
}

impl Runtime {
    fn new(vm: Arc<VmShared>, reuse: bool) -> Self {
        Runtime {
            vm,
            reuse,
            core: OnceLock::new(),
            classes: DashMap::new(),
            wrappers: DashMap::new(),
            imports: RwLock::new(Vec::new()),
        }
    }

    pub fn env(&self) -> JavaResult<Env<'_>> {
        self.vm.env()
    }

    pub fn core(&self, env: &Env<'_>) -> JavaResult<&CoreClasses> {
        if let Some(core) = self.core.get() {
            return Ok(core);
        }
        let core = CoreClasses::load(env)?;
        Ok(self.core.get_or_init(|| core))
    }

    /// Metadata for a class by binary name (`java.lang.String`,
    /// `[Ljava.lang.String;`); slashes are accepted for dots.
    pub fn class_info(&self, env: &Env<'_>, name: &str) -> JavaResult<Arc<ClassInfo>> {
        let key = name.replace('/', ".");
        if let Some(info) = self.classes.get(&key) {
            return Ok(Arc::clone(info.value()));
        }
        let core = self.core(env)?;
        let info = env.with_local_frame(|| {
            let class = core.for_name(env, &key)?;
            ClassInfo::new(env, core, class)
        })?;
        tracing::trace!(class = %key, "loaded class");
        Ok(self.cache(key, info))
    }

    /// Like [`Runtime::class_info`], but absence is `None` and no foreign
    /// exception is raised to find out.
    pub fn try_class_info(&self, env: &Env<'_>, name: &str) -> JavaResult<Option<Arc<ClassInfo>>> {
        let key = name.replace('/', ".");
        if let Some(info) = self.classes.get(&key) {
            return Ok(Some(Arc::clone(info.value())));
        }
        let present = env.with_local_frame(|| self.core(env)?.has_class(env, &key))?;
        if !present {
            return Ok(None);
        }
        match self.class_info(env, &key) {
            Ok(info) => Ok(Some(info)),
            Err(JavaError::ClassNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn class_for_type(&self, env: &Env<'_>, ty: &JavaType) -> JavaResult<Arc<ClassInfo>> {
        match ty {
            JavaType::Class(_) | JavaType::Array(_) => {
                let name = ty.reflected_name().unwrap_or_default();
                self.class_info(env, &name)
            }
            JavaType::Primitive(_) | JavaType::Null => {
                Err(JavaError::conversion(format!("{} has no class object", ty)))
            }
        }
    }

    /// Metadata for the class behind a class object. Works for classes the
    /// loader cannot find by name, such as hidden classes.
    pub fn class_from_token(&self, env: &Env<'_>, class: jclass) -> JavaResult<Arc<ClassInfo>> {
        let core = self.core(env)?;
        let name = env.with_local_frame(|| core.class_name(env, class))?;
        if let Some(info) = self.classes.get(&name) {
            return Ok(Arc::clone(info.value()));
        }
        let info = env.with_local_frame(|| ClassInfo::new(env, core, class))?;
        tracing::trace!(class = %name, "loaded class from object");
        Ok(self.cache(name, info))
    }

    fn cache(&self, key: String, info: ClassInfo) -> Arc<ClassInfo> {
        Arc::clone(self.classes.entry(key).or_insert_with(|| Arc::new(info)).value())
    }

    pub fn wrapper(&self, env: &Env<'_>, kind: PrimitiveKind) -> JavaResult<Arc<WrapperInfo>> {
        if let Some(wrapper) = self.wrappers.get(&kind) {
            return Ok(Arc::clone(wrapper.value()));
        }
        let wrapper = WrapperInfo::load(env, kind)?;
        Ok(Arc::clone(
            self.wrappers.entry(kind).or_insert_with(|| Arc::new(wrapper)).value(),
        ))
    }

    pub fn oracle<'a>(&'a self, env: &'a Env<'a>) -> RuntimeOracle<'a> {
        RuntimeOracle { runtime: self, env }
    }

    pub fn imports(&self) -> Vec<String> {
        self.imports.read().clone()
    }

    fn import(&self, package: String) {
        let mut imports = self.imports.write();
        if !imports.contains(&package) {
            imports.push(package);
        }
    }

    fn clear_caches(&self) {
        self.classes.clear();
        self.wrappers.clear();
    }
}

/// Answers class subtype questions by asking the runtime.
pub(crate) struct RuntimeOracle<'a> {
    runtime: &'a Runtime,
    env: &'a Env<'a>,
}

impl TypeOracle for RuntimeOracle<'_> {
    fn class_assignable(&self, target: &str, source: &str) -> JavaResult<bool> {
        let lookup = |name: &str| match self.runtime.class_info(self.env, name) {
            Ok(info) => Ok(Some(info)),
            Err(JavaError::ClassNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        };
        let (Some(target), Some(source)) = (lookup(target)?, lookup(source)?) else {
            return Ok(false);
        };
        self.env.is_assignable_from(source.token(), target.token())
    }
}

/// A handle to an embedded JVM.
///
/// Clones share one underlying handle. Dropping the last clone releases
/// cached metadata but leaves the VM running; use [`JavaRuntime::shutdown`]
/// to destroy it.
#[derive(Clone)]
pub struct JavaRuntime {
    runtime: Arc<Runtime>,
}

impl JavaRuntime {
    /// Create a JVM, or attach to the one already running in this process
    /// when `config.reuse_existing` is set.
    pub fn create(config: &RuntimeConfig) -> JavaResult<Self> {
        let _creating = CREATION.lock();
        let library = NativeLibrary::open(config.library_path.as_deref())?;
        let settings = EnvSettings {
            capture_stack_traces: config.capture_stack_traces,
            local_frame_capacity: config.local_frame_capacity,
            attach_as_daemon: config.attach_as_daemon,
        };

        if config.reuse_existing {
            if let Some(vm) = existing_vm(&library)? {
                if !config.options.is_empty() {
                    tracing::warn!(
                        count = config.options.len(),
                        "JVM already running; ignoring options"
                    );
                }
                let shared = Arc::new(unsafe { VmShared::attached(library, vm, settings)? });
                shared.env()?;
                tracing::info!(library = %shared.library().origin(), "attached to existing JVM");
                return Ok(Self::wrap(shared, true));
            }
        }

        let (vm, env) = create_vm(&library, config)?;
        let shared = Arc::new(unsafe { VmShared::created(library, vm, env, settings)? });
        tracing::info!(
            library = %shared.library().origin(),
            options = config.options.len(),
            "created JVM"
        );
        Ok(Self::wrap(shared, config.reuse_existing))
    }

    fn wrap(vm: Arc<VmShared>, reuse: bool) -> Self {
        JavaRuntime {
            runtime: Arc::new(Runtime::new(vm, reuse)),
        }
    }

    /// Register a package searched by [`JavaRuntime::class`] for unqualified
    /// names, after any package imported earlier.
    pub fn import_package(&self, name: &str) {
        self.runtime.import(name.replace('/', "."));
    }

    /// Resolve a class name. Qualified names (containing `.` or `/`) are
    /// looked up directly; simple names are tried in each imported package
    /// in turn, then in the default package.
    pub fn class(&self, name: &str) -> JavaResult<JavaClass> {
        if name.contains('.') || name.contains('/') {
            return self.find_class(name);
        }
        for package in self.runtime.imports() {
            if let Some(class) = self.try_find_class(&format!("{}.{}", package, name))? {
                return Ok(class);
            }
        }
        self.try_find_class(name)?
            .ok_or_else(|| JavaError::ClassNotFound(name.to_string()))
    }

    /// Look up a class by fully qualified name.
    pub fn find_class(&self, name: &str) -> JavaResult<JavaClass> {
        let env = self.runtime.env()?;
        let info = self.runtime.class_info(&env, name)?;
        Ok(JavaClass::new(Arc::clone(&self.runtime), info))
    }

    /// Look up a class by fully qualified name, returning `None` if it does
    /// not exist.
    pub fn try_find_class(&self, name: &str) -> JavaResult<Option<JavaClass>> {
        let env = self.runtime.env()?;
        Ok(self
            .runtime
            .try_class_info(&env, name)?
            .map(|info| JavaClass::new(Arc::clone(&self.runtime), info)))
    }

    pub fn package(&self, name: &str) -> JavaPackage {
        JavaPackage::new(self.clone(), name.replace('/', "."))
    }

    /// Copy a host array into a new foreign array.
    pub fn new_array(&self, values: HostArray) -> JavaResult<JavaArray> {
        let env = self.runtime.env()?;
        env.with_local_frame(|| {
            let (raw, ty) = marshal::new_array(&self.runtime, &env, &values)?;
            JavaArray::from_local(&self.runtime, &env, raw, ty)
        })
    }

    pub fn new_string(&self, text: &str) -> JavaResult<JavaObject> {
        let env = self.runtime.env()?;
        env.with_local_frame(|| {
            let raw = env.new_string(text)?;
            let class = self.runtime.class_info(&env, jolt_core::types::STRING_CLASS)?;
            JavaObject::from_local(&self.runtime, &env, raw, Some(class))
        })
    }

    /// The native interface version the JVM reports.
    pub fn version(&self) -> JavaResult<i32> {
        self.runtime.env()?.version()
    }

    /// Whether both handles are bound to the same JVM.
    pub fn is_same_instance(&self, other: &JavaRuntime) -> bool {
        self.runtime.vm.raw() == other.runtime.vm.raw()
    }

    /// Detach the calling thread. A later call from this thread attaches it
    /// again.
    pub fn detach_current_thread(&self) -> JavaResult<()> {
        self.runtime.vm.detach_current_thread()
    }

    /// Destroy the JVM. A handle created in reuse mode only detaches the
    /// calling thread.
    pub fn shutdown(self) -> JavaResult<()> {
        if self.runtime.reuse {
            if self.runtime.vm.is_thread_bound() {
                self.runtime.vm.detach_current_thread()?;
            }
            return Ok(());
        }
        self.runtime.clear_caches();
        self.runtime.vm.destroy()
    }

    pub(crate) fn shared(&self) -> &Arc<Runtime> {
        &self.runtime
    }
}

impl fmt::Debug for JavaRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JavaRuntime")
            .field("library", &self.runtime.vm.library().origin())
            .field("reuse", &self.runtime.reuse)
            .field("classes", &self.runtime.classes.len())
            .finish()
    }
}

fn lifecycle(operation: &'static str, code: jint) -> JavaError {
    tracing::warn!(operation, code, status = status_name(code), "lifecycle call failed");
    JavaError::Lifecycle { operation, code }
}

fn existing_vm(library: &NativeLibrary) -> JavaResult<Option<*mut JavaVM>> {
    let mut vm: *mut JavaVM = ptr::null_mut();
    let mut count: jsize = 0;
    let code = unsafe { (library.get_created_java_vms)(&mut vm, 1, &mut count) };
    if code != JNI_OK {
        return Err(lifecycle("JNI_GetCreatedJavaVMs", code));
    }
    Ok((count > 0 && !vm.is_null()).then_some(vm))
}

fn create_vm(library: &NativeLibrary, config: &RuntimeConfig) -> JavaResult<(*mut JavaVM, *mut JNIEnv)> {
    let mut defaults = JavaVMInitArgs {
        version: JNI_VERSION_1_6,
        n_options: 0,
        options: ptr::null_mut(),
        ignore_unrecognized: JNI_FALSE,
    };
    let code = unsafe { (library.get_default_init_args)((&mut defaults as *mut JavaVMInitArgs).cast()) };
    if code != JNI_OK {
        return Err(lifecycle("JNI_GetDefaultJavaVMInitArgs", code));
    }

    let strings = config
        .option_strings()
        .into_iter()
        .map(|option| {
            CString::new(option).map_err(|e| JavaError::Config(format!("option contains a NUL byte: {}", e)))
        })
        .collect::<JavaResult<Vec<_>>>()?;
    let mut options: Vec<JavaVMOption> = strings
        .iter()
        .map(|option| JavaVMOption {
            option_string: option.as_ptr() as *mut c_char,
            extra_info: ptr::null_mut(),
        })
        .collect();
    let mut args = JavaVMInitArgs {
        version: JNI_VERSION_1_6,
        n_options: jint::try_from(options.len())
            .map_err(|_| JavaError::Config("too many options".to_string()))?,
        options: options.as_mut_ptr(),
        ignore_unrecognized: if config.ignore_unrecognized { JNI_TRUE } else { JNI_FALSE },
    };

    let mut vm: *mut JavaVM = ptr::null_mut();
    let mut env: *mut c_void = ptr::null_mut();
    let code = unsafe {
        (library.create_java_vm)(&mut vm, &mut env, (&mut args as *mut JavaVMInitArgs).cast())
    };
    if code != JNI_OK {
        return Err(lifecycle("JNI_CreateJavaVM", code));
    }
    Ok((vm, env.cast()))
}
