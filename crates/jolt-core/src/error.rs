//! Error types shared by every layer of the bridge.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::types::PrimitiveKind;

/// Result alias used throughout the bridge.
pub type JavaResult<T> = Result<T, JavaError>;

/// Everything that can go wrong while talking to the embedded runtime.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JavaError {
    /// The native module could not be opened.
    #[error("failed to load JVM library {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// A required entry point is missing from the native module.
    #[error("JVM library does not export {0}")]
    Symbol(String),

    /// A lifecycle call returned a non-zero status code.
    #[error("{operation} failed with code {code}")]
    Lifecycle { operation: &'static str, code: i32 },

    /// Lookup of a class by qualified name failed.
    #[error("java.lang.ClassNotFoundException: {0}")]
    ClassNotFound(String),

    /// No field, method or constructor matched the request.
    #[error("{target} has no member {member} matching the given arguments")]
    MemberNotFound { target: String, member: String },

    /// A foreign exception was pending after a native call.
    #[error("{0}")]
    Foreign(ForeignException),

    /// The wrapper class for a primitive has no boxing factory.
    #[error("no boxing constructor found for {}", kind.box_class())]
    Boxing { kind: PrimitiveKind },

    /// A host value could not be marshaled into, or extracted from, a foreign value.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The runtime was destroyed.
    #[error("the Java runtime has been shut down")]
    ShutDown,

    /// Runtime configuration could not be read.
    #[error("invalid runtime configuration: {0}")]
    Config(String),
}

impl JavaError {
    pub fn conversion(message: impl Into<String>) -> Self {
        JavaError::Conversion(message.into())
    }

    pub fn member_not_found(target: impl Into<String>, member: impl Into<String>) -> Self {
        JavaError::MemberNotFound {
            target: target.into(),
            member: member.into(),
        }
    }

    /// The bridged foreign exception, if this error is one.
    pub fn as_foreign(&self) -> Option<&ForeignException> {
        match self {
            JavaError::Foreign(exception) => Some(exception),
            _ => None,
        }
    }

    /// Whether this is a foreign exception whose reported type is `type_name`.
    pub fn is_foreign(&self, type_name: &str) -> bool {
        self.as_foreign()
            .is_some_and(|exception| exception.type_name == type_name)
    }
}

/// One link of a foreign exception's cause chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowableInfo {
    pub type_name: String,
    pub message: Option<String>,
}

impl ThrowableInfo {
    pub fn new(type_name: impl Into<String>, message: Option<String>) -> Self {
        ThrowableInfo {
            type_name: type_name.into(),
            message,
        }
    }

    fn write_to(&self, out: &mut String) {
        out.push_str(&self.type_name);
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            out.push_str(": ");
            out.push_str(message);
        }
    }
}

/// A single frame of a foreign stack trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    pub class_name: String,
    pub method_name: String,
    pub file_name: Option<String>,
    pub line_number: i32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}.{}(", self.class_name, self.method_name)?;
        match (&self.file_name, self.line_number) {
            (Some(file), line) if line >= 0 => write!(f, "{}:{})", file, line),
            (Some(file), _) => write!(f, "{})", file),
            (None, -2) => write!(f, "Native Method)"),
            (None, _) => write!(f, "Unknown Source)"),
        }
    }
}

/// A foreign exception translated into host data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignException {
    pub type_name: String,
    pub message: Option<String>,
    /// Causes, outermost first.
    pub causes: Vec<ThrowableInfo>,
    /// Frames of the outermost throwable, present only when capture was requested.
    pub stack_trace: Option<Vec<StackFrame>>,
}

impl ForeignException {
    pub fn new(type_name: impl Into<String>, message: Option<String>) -> Self {
        ForeignException {
            type_name: type_name.into(),
            message,
            causes: Vec::new(),
            stack_trace: None,
        }
    }

    /// Placeholder used when the pending throwable could not be introspected.
    pub fn unknown() -> Self {
        ForeignException::new(UNKNOWN_TYPE, None)
    }

    pub fn with_cause(mut self, cause: ThrowableInfo) -> Self {
        self.causes.push(cause);
        self
    }

    /// The single-line text naming the type, message and every cause.
    pub fn text(&self) -> String {
        let mut out = String::new();
        ThrowableInfo::new(self.type_name.clone(), self.message.clone()).write_to(&mut out);
        for cause in &self.causes {
            out.push_str(". Caused by: ");
            cause.write_to(&mut out);
        }
        out
    }

    /// The innermost cause, or the exception itself when it has none.
    pub fn root_type(&self) -> &str {
        self.causes
            .last()
            .map(|cause| cause.type_name.as_str())
            .unwrap_or(&self.type_name)
    }
}

impl fmt::Display for ForeignException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Type name reported when a throwable's class cannot be resolved.
pub const UNKNOWN_TYPE: &str = "<unknown>";
