//! The foreign type system: primitive kinds, reference types, and the
//! assignability rules used by overload resolution.
//!
//! Types here are plain data. Questions that only the running JVM can answer
//! (is class `A` a supertype of class `B`?) are delegated to a [`TypeOracle`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{JavaError, JavaResult};

pub const OBJECT_CLASS: &str = "java.lang.Object";
pub const STRING_CLASS: &str = "java.lang.String";
pub const CLASS_CLASS: &str = "java.lang.Class";

/// Interfaces every array type implements, besides `java.lang.Object`.
const ARRAY_SUPERTYPES: [&str; 3] = [OBJECT_CLASS, "java.lang.Cloneable", "java.io.Serializable"];

/// The eight primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Keyword name, as reported by `Class.getName()` for primitive classes.
    pub fn java_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Single-letter signature code.
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Fully qualified name of the wrapper class.
    pub fn box_class(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java.lang.Boolean",
            PrimitiveKind::Byte => "java.lang.Byte",
            PrimitiveKind::Char => "java.lang.Character",
            PrimitiveKind::Short => "java.lang.Short",
            PrimitiveKind::Int => "java.lang.Integer",
            PrimitiveKind::Long => "java.lang.Long",
            PrimitiveKind::Float => "java.lang.Float",
            PrimitiveKind::Double => "java.lang.Double",
        }
    }

    /// Name of the wrapper's unboxing accessor, e.g. `intValue`.
    pub fn unbox_method(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "booleanValue",
            PrimitiveKind::Byte => "byteValue",
            PrimitiveKind::Char => "charValue",
            PrimitiveKind::Short => "shortValue",
            PrimitiveKind::Int => "intValue",
            PrimitiveKind::Long => "longValue",
            PrimitiveKind::Float => "floatValue",
            PrimitiveKind::Double => "doubleValue",
        }
    }

    pub fn from_java_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.java_name() == name)
    }

    pub fn from_descriptor(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.descriptor() == code)
    }

    pub fn from_box_class(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.box_class() == name)
    }

    /// Kinds this kind converts to by widening (identity excluded).
    pub fn widening_targets(self) -> &'static [PrimitiveKind] {
        use PrimitiveKind::*;
        match self {
            Byte => &[Short, Int, Long, Float, Double],
            Short | Char => &[Int, Long, Float, Double],
            Int => &[Long, Float, Double],
            Long => &[Float, Double],
            Float => &[Double],
            Boolean | Double => &[],
        }
    }

    /// Identity or widening conversion from `self` to `target`.
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        self == target || self.widening_targets().contains(&target)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.java_name())
    }
}

/// A foreign type. Class types are identified by their dotted binary name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Primitive(PrimitiveKind),
    Class(String),
    Array(Box<JavaType>),
    /// The type of the `null` literal.
    Null,
}

impl JavaType {
    pub fn class(name: impl Into<String>) -> Self {
        JavaType::Class(name.into())
    }

    pub fn array_of(element: JavaType) -> Self {
        JavaType::Array(Box::new(element))
    }

    pub fn string() -> Self {
        JavaType::class(STRING_CLASS)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            JavaType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&JavaType> {
        match self {
            JavaType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Parse a name as returned by `Class.getName()`: `int`, `java.lang.String`,
    /// `[I`, `[Ljava.lang.String;`. `void` parses to `None`.
    pub fn from_reflected_name(name: &str) -> JavaResult<Option<JavaType>> {
        if name == "void" {
            return Ok(None);
        }
        if let Some(kind) = PrimitiveKind::from_java_name(name) {
            return Ok(Some(JavaType::Primitive(kind)));
        }
        if name.starts_with('[') {
            return Self::from_descriptor(name).map(Some);
        }
        if name.is_empty() {
            return Err(JavaError::conversion("empty class name"));
        }
        Ok(Some(JavaType::Class(name.replace('/', "."))))
    }

    /// Parse a field descriptor such as `I`, `Ljava/lang/String;` or `[[D`.
    /// Dots are accepted in place of slashes.
    pub fn from_descriptor(descriptor: &str) -> JavaResult<JavaType> {
        let (ty, rest) = Self::parse_descriptor(descriptor)?;
        if !rest.is_empty() {
            return Err(JavaError::conversion(format!(
                "trailing characters in type descriptor {}",
                descriptor
            )));
        }
        Ok(ty)
    }

    fn parse_descriptor(input: &str) -> JavaResult<(JavaType, &str)> {
        let mut chars = input.chars();
        let malformed = || JavaError::conversion(format!("malformed type descriptor {}", input));
        match chars.next() {
            Some('[') => {
                let (element, rest) = Self::parse_descriptor(chars.as_str())?;
                Ok((JavaType::array_of(element), rest))
            }
            Some('L') => {
                let body = chars.as_str();
                let end = body.find(';').ok_or_else(malformed)?;
                if end == 0 {
                    return Err(malformed());
                }
                Ok((JavaType::Class(body[..end].replace('/', ".")), &body[end + 1..]))
            }
            Some(code) => PrimitiveKind::from_descriptor(code)
                .map(|kind| (JavaType::Primitive(kind), chars.as_str()))
                .ok_or_else(malformed),
            None => Err(malformed()),
        }
    }

    /// Field descriptor form. `Null` has no descriptor.
    pub fn descriptor(&self) -> Option<String> {
        match self {
            JavaType::Primitive(kind) => Some(kind.descriptor().to_string()),
            JavaType::Class(name) => Some(format!("L{};", name.replace('.', "/"))),
            JavaType::Array(element) => element.descriptor().map(|inner| format!("[{}", inner)),
            JavaType::Null => None,
        }
    }

    /// The name `Class.getName()` reports: `int`, `java.lang.String`,
    /// `[Ljava.lang.String;`.
    pub fn reflected_name(&self) -> Option<String> {
        match self {
            JavaType::Primitive(kind) => Some(kind.java_name().to_string()),
            JavaType::Class(name) => Some(name.clone()),
            JavaType::Array(_) => self.descriptor().map(|d| d.replace('/', ".")),
            JavaType::Null => None,
        }
    }

    /// The name `FindClass` expects: `java/lang/String` for classes and the
    /// descriptor for arrays.
    pub fn jni_class_name(&self) -> Option<String> {
        match self {
            JavaType::Class(name) => Some(name.replace('.', "/")),
            JavaType::Array(_) => self.descriptor(),
            JavaType::Primitive(_) | JavaType::Null => None,
        }
    }

    /// Whether a value of type `source` may be passed where `self` is expected,
    /// allowing widening and boxing.
    pub fn is_assignable_from(&self, source: &JavaType, oracle: &dyn TypeOracle) -> JavaResult<bool> {
        match (self, source) {
            (_, JavaType::Null) => Ok(!self.is_primitive()),
            (JavaType::Null, _) => Ok(false),
            (JavaType::Primitive(target), JavaType::Primitive(kind)) => Ok(kind.widens_to(*target)),
            (JavaType::Primitive(_), _) => Ok(false),
            (JavaType::Class(target), JavaType::Primitive(kind)) => {
                class_assignable(target, kind.box_class(), oracle)
            }
            (JavaType::Class(target), JavaType::Class(name)) => class_assignable(target, name, oracle),
            (JavaType::Class(target), JavaType::Array(_)) => {
                Ok(ARRAY_SUPERTYPES.contains(&target.as_str()))
            }
            (JavaType::Array(target), JavaType::Array(element)) => {
                element_assignable(target, element, oracle, true)
            }
            (JavaType::Array(_), _) => Ok(false),
        }
    }

    /// The conversion needed to pass a `source` value to a `self` parameter,
    /// assuming the pair is assignable.
    pub fn conversion_from(&self, source: &JavaType) -> Conversion {
        match (self, source) {
            (target, JavaType::Primitive(kind)) if target.is_reference() => Conversion::BoxPrimitive(*kind),
            (JavaType::Array(target), JavaType::Array(element)) if target.is_reference() => {
                match element.as_primitive() {
                    Some(kind) => Conversion::BoxArray(kind),
                    None => Conversion::Identity,
                }
            }
            _ => Conversion::Identity,
        }
    }
}

fn class_assignable(target: &str, source: &str, oracle: &dyn TypeOracle) -> JavaResult<bool> {
    if target == source || target == OBJECT_CLASS {
        return Ok(true);
    }
    oracle.class_assignable(target, source)
}

/// Array element compatibility: invariant for primitives, covariant for
/// references, with element boxing allowed only at the outermost level.
fn element_assignable(
    target: &JavaType,
    source: &JavaType,
    oracle: &dyn TypeOracle,
    allow_boxing: bool,
) -> JavaResult<bool> {
    match (target, source) {
        (JavaType::Primitive(t), JavaType::Primitive(s)) => Ok(t == s),
        (JavaType::Class(_), JavaType::Primitive(_)) if !allow_boxing => Ok(false),
        (JavaType::Array(t), JavaType::Array(s)) => element_assignable(t, s, oracle, false),
        _ => target.is_assignable_from(source, oracle),
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Primitive(kind) => write!(f, "{}", kind),
            JavaType::Class(name) => f.write_str(name),
            JavaType::Array(element) => write!(f, "{}[]", element),
            JavaType::Null => f.write_str("null"),
        }
    }
}

/// How an argument must be converted before it reaches the native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Identity,
    /// Box a primitive into its wrapper class.
    BoxPrimitive(PrimitiveKind),
    /// Box every element of a primitive array into a wrapper-class array.
    BoxArray(PrimitiveKind),
}

/// Answers subtype questions about classes by name.
pub trait TypeOracle {
    /// Whether class `target` is `source` or one of its supertypes.
    fn class_assignable(&self, target: &str, source: &str) -> JavaResult<bool>;
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
