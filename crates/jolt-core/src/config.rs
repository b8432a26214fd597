//! Runtime configuration, loadable from RON or JSON.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{JavaError, JavaResult};

/// A `-Dname=value` system property passed to the runtime at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaOption {
    pub name: String,
    pub value: String,
}

impl JavaOption {
    pub fn define(name: impl Into<String>, value: impl Into<String>) -> Self {
        JavaOption {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The option string handed to the runtime.
    pub fn option_string(&self) -> String {
        format!("-D{}={}", self.name, self.value)
    }
}

/// How to create or attach to the embedded runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Path to the runtime's shared library. `None` looks up the entry
    /// points in the current process image.
    pub library_path: Option<PathBuf>,
    /// Attach to an already-created runtime instead of creating one.
    pub reuse_existing: bool,
    pub options: Vec<JavaOption>,
    pub ignore_unrecognized: bool,
    /// Attach lazily-bound threads as daemon threads.
    pub attach_as_daemon: bool,
    /// Record foreign stack frames on bridged exceptions.
    pub capture_stack_traces: bool,
    /// Capacity requested for each per-call local reference frame.
    pub local_frame_capacity: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            library_path: None,
            reuse_existing: false,
            options: Vec::new(),
            ignore_unrecognized: false,
            attach_as_daemon: false,
            capture_stack_traces: false,
            local_frame_capacity: 32,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn reuse_existing(mut self, reuse: bool) -> Self {
        self.reuse_existing = reuse;
        self
    }

    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(JavaOption::define(name, value));
        self
    }

    pub fn attach_as_daemon(mut self, daemon: bool) -> Self {
        self.attach_as_daemon = daemon;
        self
    }

    pub fn capture_stack_traces(mut self, capture: bool) -> Self {
        self.capture_stack_traces = capture;
        self
    }

    pub fn from_ron_str(source: &str) -> JavaResult<Self> {
        ron::from_str(source).map_err(|e| JavaError::Config(e.to_string()))
    }

    pub fn from_json_str(source: &str) -> JavaResult<Self> {
        serde_json::from_str(source).map_err(|e| JavaError::Config(e.to_string()))
    }

    /// Load from a `.ron` or `.json` file.
    pub fn from_file(path: &Path) -> JavaResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|e| JavaError::Config(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::from_ron_str(&source),
            Some("json") => Self::from_json_str(&source),
            _ => Err(JavaError::Config(format!(
                "{}: expected a .ron or .json file",
                path.display()
            ))),
        }
    }

    /// The option strings in declaration order.
    pub fn option_strings(&self) -> Vec<String> {
        self.options.iter().map(JavaOption::option_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_option_string() {
        assert_eq!(
            JavaOption::define("dark.notes", "rocks").option_string(),
            "-Ddark.notes=rocks"
        );
        assert_eq!(
            JavaOption::define("java.class.path", "a.jar:b.jar").option_string(),
            "-Djava.class.path=a.jar:b.jar"
        );
    }

    #[test]
    fn test_builder() {
        let config = RuntimeConfig::new()
            .with_library_path("/opt/jdk/lib/server/libjvm.so")
            .reuse_existing(true)
            .define("a", "1")
            .define("b", "2");
        assert!(config.reuse_existing);
        assert_eq!(config.option_strings(), vec!["-Da=1", "-Db=2"]);
        assert_eq!(config.local_frame_capacity, 32);
    }

    #[test]
    fn test_from_ron_with_defaults() {
        let config = RuntimeConfig::from_ron_str(
            r#"(
                library_path: Some("/usr/lib/jvm/lib/server/libjvm.so"),
                options: [(name: "app.mode", value: "test")],
            )"#,
        )
        .unwrap();
        assert_eq!(
            config.library_path.as_deref(),
            Some(Path::new("/usr/lib/jvm/lib/server/libjvm.so"))
        );
        assert!(!config.reuse_existing);
        assert_eq!(config.option_strings(), vec!["-Dapp.mode=test"]);
    }

    #[test]
    fn test_from_json() {
        let config = RuntimeConfig::from_json_str(
            r#"{"reuse_existing": true, "capture_stack_traces": true, "local_frame_capacity": 64}"#,
        )
        .unwrap();
        assert!(config.reuse_existing);
        assert!(config.capture_stack_traces);
        assert_eq!(config.local_frame_capacity, 64);
        assert!(config.library_path.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let err = RuntimeConfig::from_json_str("{\"options\": 3}").unwrap_err();
        assert!(matches!(err, JavaError::Config(_)));
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runtime.ron");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "(reuse_existing: true)").unwrap();

        let config = RuntimeConfig::from_file(&path).unwrap();
        assert!(config.reuse_existing);

        let other = dir.path().join("runtime.toml");
        fs::write(&other, "").unwrap();
        assert!(matches!(
            RuntimeConfig::from_file(&other),
            Err(JavaError::Config(_))
        ));
    }
}
