//! Embeds a JVM through its native invocation interface.
//!
//! [`JavaRuntime`] creates or attaches to the JVM; classes, objects and
//! arrays are reached through dynamic proxies that resolve members by name
//! at call time.

pub mod array;
pub mod class;
pub mod object;
pub mod package;
pub mod runtime;
pub mod value;

mod bridge;
mod dispatch;
mod env;
mod library;
mod marshal;
mod reflect;
mod refs;
mod slot;
mod sys;
mod table;
mod threads;
mod vm;

// Re-export commonly used types for convenience
pub use array::JavaArray;
pub use class::JavaClass;
pub use jolt_core::{
    ForeignException, JavaError, JavaOption, JavaResult, JavaType, PrimitiveKind, RuntimeConfig, StackFrame,
    ThrowableInfo,
};
pub use object::JavaObject;
pub use package::{JavaPackage, PackageMember};
pub use runtime::JavaRuntime;
pub use value::{FromValue, HostArray, Value};
