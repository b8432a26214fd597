//! Loading the JVM's shared library and resolving its exported entry points.

use libloading::Library;
use std::path::Path;

use jolt_core::{JavaError, JavaResult};

use crate::sys::{
    CREATE_JAVA_VM, CreateJavaVmFn, GET_CREATED_JAVA_VMS, GET_DEFAULT_JAVA_VM_INIT_ARGS,
    GetCreatedJavaVmsFn, GetDefaultJavaVmInitArgsFn,
};

/// The three exported invocation functions, plus whatever keeps them mapped.
pub(crate) struct NativeLibrary {
    /// Kept open for as long as the entry points may be called.
    _library: Option<Library>,
    origin: String,
    pub create_java_vm: CreateJavaVmFn,
    pub get_created_java_vms: GetCreatedJavaVmsFn,
    pub get_default_init_args: GetDefaultJavaVmInitArgsFn,
}

impl NativeLibrary {
    /// Open the library at `path`, or use the current process image when
    /// `path` is `None`.
    pub fn open(path: Option<&Path>) -> JavaResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_process(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn from_file(path: &Path) -> JavaResult<Self> {
        let library = unsafe { Library::new(path) }.map_err(|e| JavaError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let create_java_vm = unsafe { symbol::<CreateJavaVmFn>(&library, CREATE_JAVA_VM)? };
        let get_created_java_vms =
            unsafe { symbol::<GetCreatedJavaVmsFn>(&library, GET_CREATED_JAVA_VMS)? };
        let get_default_init_args =
            unsafe { symbol::<GetDefaultJavaVmInitArgsFn>(&library, GET_DEFAULT_JAVA_VM_INIT_ARGS)? };

        tracing::info!(path = %path.display(), "loaded JVM library");
        Ok(NativeLibrary {
            _library: Some(library),
            origin: path.display().to_string(),
            create_java_vm,
            get_created_java_vms,
            get_default_init_args,
        })
    }

    fn from_process() -> JavaResult<Self> {
        let library = process_image()?;
        let create_java_vm = unsafe { symbol::<CreateJavaVmFn>(&library, CREATE_JAVA_VM)? };
        let get_created_java_vms =
            unsafe { symbol::<GetCreatedJavaVmsFn>(&library, GET_CREATED_JAVA_VMS)? };
        let get_default_init_args =
            unsafe { symbol::<GetDefaultJavaVmInitArgsFn>(&library, GET_DEFAULT_JAVA_VM_INIT_ARGS)? };

        tracing::info!("using JVM entry points linked into the process");
        Ok(NativeLibrary {
            _library: Some(library),
            origin: PROCESS_ORIGIN.to_string(),
            create_java_vm,
            get_created_java_vms,
            get_default_init_args,
        })
    }
}

const PROCESS_ORIGIN: &str = "<process>";

/// Everything already loaded into the process, searched as one library.
#[cfg(unix)]
fn process_image() -> JavaResult<Library> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn process_image() -> JavaResult<Library> {
    libloading::os::windows::Library::this()
        .map(Library::from)
        .map_err(|e| JavaError::Load {
            path: PROCESS_ORIGIN.into(),
            message: e.to_string(),
        })
}

/// Copy a function pointer out of `library`.
///
/// # Safety
/// `T` must match the symbol's real signature.
unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> JavaResult<T> {
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|_| JavaError::Symbol(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_load_error() {
        let err = NativeLibrary::open(Some(Path::new("/nonexistent/libjvm.so")))
            .err()
            .unwrap();
        match err {
            JavaError::Load { path, .. } => assert_eq!(path, Path::new("/nonexistent/libjvm.so")),
            other => panic!("expected load error, got {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_process_image_lookup() {
        type Malloc = unsafe extern "C" fn(usize) -> *mut libc::c_void;
        let image = process_image().unwrap();
        assert!(unsafe { symbol::<Malloc>(&image, "malloc") }.is_ok());
        assert!(matches!(
            unsafe { symbol::<Malloc>(&image, "jolt_definitely_not_exported") },
            Err(JavaError::Symbol(_))
        ));
    }

    #[test]
    fn test_process_without_jvm_is_symbol_error() {
        match NativeLibrary::open(None) {
            Err(JavaError::Symbol(name)) => assert_eq!(name, CREATE_JAVA_VM),
            Err(other) => panic!("expected symbol error, got {:?}", other),
            Ok(_) => panic!("test binary unexpectedly exports {}", CREATE_JAVA_VM),
        }
    }
}
