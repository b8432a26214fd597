// Shared helpers for tests that need a running JVM

#![allow(dead_code)]

use std::env;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use jolt_runtime::{JavaRuntime, RuntimeConfig};

/// System property defined on the test JVM.
pub const TEST_PROPERTY: &str = "jolt.test";
pub const TEST_PROPERTY_VALUE: &str = "rocks";

static TRACING: Once = Once::new();
static RUNTIME: OnceLock<Option<JavaRuntime>> = OnceLock::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Locate the JVM library: `JOLT_JVM_LIBRARY` first, then the usual places
/// under `JAVA_HOME`.
pub fn jvm_library() -> Option<PathBuf> {
    if let Some(path) = env::var_os("JOLT_JVM_LIBRARY") {
        let path = PathBuf::from(path);
        return path.is_file().then_some(path);
    }
    let home = PathBuf::from(env::var_os("JAVA_HOME")?);
    candidates(&home).into_iter().find(|path| path.is_file())
}

fn candidates(home: &Path) -> Vec<PathBuf> {
    let names: &[&str] = if cfg!(target_os = "windows") {
        &["bin/server/jvm.dll", "jre/bin/server/jvm.dll"]
    } else if cfg!(target_os = "macos") {
        &["lib/server/libjvm.dylib", "jre/lib/server/libjvm.dylib"]
    } else {
        &[
            "lib/server/libjvm.so",
            "jre/lib/amd64/server/libjvm.so",
            "jre/lib/server/libjvm.so",
        ]
    };
    names.iter().map(|name| home.join(name)).collect()
}

/// The configuration every test creates its runtime with. Reuse mode lets
/// each test attach to the single JVM the process may hold.
pub fn config(library: PathBuf) -> RuntimeConfig {
    RuntimeConfig::new()
        .with_library_path(library)
        .reuse_existing(true)
        .define(TEST_PROPERTY, TEST_PROPERTY_VALUE)
        .capture_stack_traces(true)
}

/// The shared test runtime, or `None` when no JVM is installed. Tests return
/// early on `None`.
pub fn runtime() -> Option<JavaRuntime> {
    init_tracing();
    RUNTIME
        .get_or_init(|| {
            let Some(library) = jvm_library() else {
                eprintln!("skipping: set JOLT_JVM_LIBRARY or JAVA_HOME to run JVM tests");
                return None;
            };
            Some(JavaRuntime::create(&config(library)).expect("Failed to start the JVM"))
        })
        .clone()
}
