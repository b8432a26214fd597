//! In-memory class hierarchy for exercising type rules without a JVM.

use std::collections::HashMap;

use crate::error::JavaResult;
use crate::types::{OBJECT_CLASS, PrimitiveKind, TypeOracle};

/// Maps each class to its direct supertypes.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    supertypes: HashMap<String, Vec<String>>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small slice of `java.lang` and `java.util`.
    pub fn standard() -> Self {
        let mut hierarchy = Self::new();
        hierarchy
            .declare("java.lang.Number", &["java.io.Serializable"])
            .declare("java.lang.CharSequence", &[])
            .declare("java.lang.Comparable", &[])
            .declare(
                "java.lang.String",
                &["java.lang.CharSequence", "java.lang.Comparable", "java.io.Serializable"],
            )
            .declare("java.lang.StringBuilder", &["java.lang.CharSequence"])
            .declare("java.util.Collection", &[])
            .declare("java.util.List", &["java.util.Collection"])
            .declare("java.util.ArrayList", &["java.util.List", "java.io.Serializable"])
            .declare("java.lang.Throwable", &["java.io.Serializable"])
            .declare("java.lang.Exception", &["java.lang.Throwable"])
            .declare("java.lang.RuntimeException", &["java.lang.Exception"]);
        for kind in PrimitiveKind::ALL {
            let parents: &[&str] = match kind {
                PrimitiveKind::Boolean | PrimitiveKind::Char => {
                    &["java.io.Serializable", "java.lang.Comparable"]
                }
                _ => &["java.lang.Number", "java.lang.Comparable"],
            };
            hierarchy.declare(kind.box_class(), parents);
        }
        hierarchy
    }

    pub fn declare(&mut self, class: &str, supertypes: &[&str]) -> &mut Self {
        self.supertypes.insert(
            class.to_string(),
            supertypes.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    fn is_subtype(&self, source: &str, target: &str) -> bool {
        if source == target || target == OBJECT_CLASS {
            return true;
        }
        self.supertypes
            .get(source)
            .is_some_and(|parents| parents.iter().any(|parent| self.is_subtype(parent, target)))
    }
}

impl TypeOracle for ClassHierarchy {
    fn class_assignable(&self, target: &str, source: &str) -> JavaResult<bool> {
        Ok(self.is_subtype(source, target))
    }
}
