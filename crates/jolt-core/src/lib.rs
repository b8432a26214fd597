pub mod config;
pub mod error;
pub mod resolve;
pub mod types;

#[doc(hidden)]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use config::{JavaOption, RuntimeConfig};
pub use error::{ForeignException, JavaError, JavaResult, StackFrame, ThrowableInfo};
pub use resolve::{BoxingPlan, Candidate, Resolution, resolve};
pub use types::{Conversion, JavaType, PrimitiveKind, TypeOracle};
