use std::fmt;

use jolt_core::types::CLASS_CLASS;
use jolt_core::{JavaError, JavaResult, JavaType, PrimitiveKind};

use crate::array::JavaArray;
use crate::class::JavaClass;
use crate::object::JavaObject;
use crate::slot;
use crate::sys::{JNI_FALSE, JNI_TRUE, jvalue};

/// A host-side view of a foreign value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The result of a `void` method.
    Void,
    Null,
    Boolean(bool),
    Byte(i8),
    /// A UTF-16 code unit.
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// A host string, passed as a new `java.lang.String`.
    String(String),
    Object(JavaObject),
    Array(JavaArray),
    Class(JavaClass),
    /// A host array, copied into a new foreign array when passed.
    HostArray(HostArray),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Boolean(_) => Some(PrimitiveKind::Boolean),
            Value::Byte(_) => Some(PrimitiveKind::Byte),
            Value::Char(_) => Some(PrimitiveKind::Char),
            Value::Short(_) => Some(PrimitiveKind::Short),
            Value::Int(_) => Some(PrimitiveKind::Int),
            Value::Long(_) => Some(PrimitiveKind::Long),
            Value::Float(_) => Some(PrimitiveKind::Float),
            Value::Double(_) => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// The foreign type of this value when it can be told without asking the
    /// runtime. Object proxies whose class is not yet known return `None`.
    pub fn static_type(&self) -> Option<JavaType> {
        match self {
            Value::Void => None,
            Value::Null => Some(JavaType::Null),
            Value::String(_) => Some(JavaType::string()),
            Value::Object(_) => None,
            Value::Array(array) => Some(array.java_type().clone()),
            Value::Class(_) => Some(JavaType::class(CLASS_CLASS)),
            Value::HostArray(array) => array.known_element_type().map(JavaType::array_of),
            primitive => primitive.primitive_kind().map(JavaType::Primitive),
        }
    }

    /// Convert a primitive to a wider kind. Converting to the same kind is
    /// the identity.
    pub fn widen_to(&self, target: PrimitiveKind) -> JavaResult<Value> {
        let Some(source) = self.primitive_kind() else {
            return Err(JavaError::conversion(format!("{} is not a primitive", self.describe())));
        };
        if source == target {
            return Ok(self.clone());
        }
        if !source.widens_to(target) {
            return Err(JavaError::conversion(format!("{} does not widen to {}", source, target)));
        }
        let integral = match *self {
            Value::Byte(v) => i64::from(v),
            Value::Char(v) => i64::from(v),
            Value::Short(v) => i64::from(v),
            Value::Int(v) => i64::from(v),
            Value::Long(v) => v,
            _ => 0,
        };
        Ok(match target {
            PrimitiveKind::Short => Value::Short(integral as i16),
            PrimitiveKind::Int => Value::Int(integral as i32),
            PrimitiveKind::Long => Value::Long(integral),
            PrimitiveKind::Float => Value::Float(integral as f32),
            PrimitiveKind::Double => match *self {
                Value::Float(v) => Value::Double(f64::from(v)),
                _ => Value::Double(integral as f64),
            },
            PrimitiveKind::Boolean | PrimitiveKind::Byte | PrimitiveKind::Char => {
                return Err(JavaError::conversion(format!("{} does not widen to {}", source, target)));
            }
        })
    }

    /// Encode a primitive into an argument slot.
    pub(crate) fn to_slot(&self) -> Option<jvalue> {
        Some(match *self {
            Value::Boolean(v) => slot::from_boolean(if v { JNI_TRUE } else { JNI_FALSE }),
            Value::Byte(v) => slot::from_byte(v),
            Value::Char(v) => slot::from_char(v),
            Value::Short(v) => slot::from_short(v),
            Value::Int(v) => slot::from_int(v),
            Value::Long(v) => slot::from_long(v),
            Value::Float(v) => slot::from_float(v),
            Value::Double(v) => slot::from_double(v),
            _ => return None,
        })
    }

    /// Decode a primitive of `kind` from a return or field slot.
    pub(crate) fn decode(kind: PrimitiveKind, value: jvalue) -> Value {
        match kind {
            PrimitiveKind::Boolean => Value::Boolean(slot::to_boolean(value) != JNI_FALSE),
            PrimitiveKind::Byte => Value::Byte(slot::to_byte(value)),
            PrimitiveKind::Char => Value::Char(slot::to_char(value)),
            PrimitiveKind::Short => Value::Short(slot::to_short(value)),
            PrimitiveKind::Int => Value::Int(slot::to_int(value)),
            PrimitiveKind::Long => Value::Long(slot::to_long(value)),
            PrimitiveKind::Float => Value::Float(slot::to_float(value)),
            PrimitiveKind::Double => Value::Double(slot::to_double(value)),
        }
    }

    /// Short description used in error messages; never calls into the runtime.
    pub fn describe(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            Value::String(s) => format!("{:?}", s),
            Value::Object(object) => format!("<{}>", object.class_name().unwrap_or("java object")),
            Value::Array(array) => format!("<{}>", array.java_type()),
            Value::Class(class) => format!("<class {}>", class.name()),
            Value::HostArray(array) => format!("<host array of {}>", array.len()),
            primitive => primitive.to_string(),
        }
    }

    pub fn extract<T: FromValue>(self) -> JavaResult<T> {
        T::from_value(self)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => a == b,
            (Value::HostArray(a), Value::HostArray(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "{}", c),
                None => write!(f, "\\u{:04x}", v),
            },
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(object) => match object.java_to_string() {
                Ok(text) => write!(f, "{}", text),
                Err(_) => write!(f, "{}", self.describe()),
            },
            Value::Array(_) | Value::Class(_) | Value::HostArray(_) => write!(f, "{}", self.describe()),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => String,
    JavaObject => Object,
    JavaArray => Array,
    JavaClass => Class,
    HostArray => HostArray,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Conversion out of a [`Value`], used by [`Value::extract`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> JavaResult<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> JavaResult<Self> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> JavaResult<Self> {
        match value {
            Value::Void => Ok(()),
            other => Err(mismatch("void", &other)),
        }
    }
}

fn mismatch(expected: &str, found: &Value) -> JavaError {
    JavaError::conversion(format!("expected {}, found {}", expected, found.describe()))
}

macro_rules! primitive_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> JavaResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        Value::Object(object) => match object.unbox()? {
                            Value::$variant(v) => Ok(v),
                            other => Err(mismatch(stringify!($ty), &other)),
                        },
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

primitive_from_value! {
    bool => Boolean,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl FromValue for String {
    fn from_value(value: Value) -> JavaResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            Value::Object(object) => object.java_to_string(),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromValue for JavaObject {
    fn from_value(value: Value) -> JavaResult<Self> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl FromValue for JavaArray {
    fn from_value(value: Value) -> JavaResult<Self> {
        match value {
            Value::Array(array) => Ok(array),
            other => Err(mismatch("array", &other)),
        }
    }
}

impl FromValue for JavaClass {
    fn from_value(value: Value) -> JavaResult<Self> {
        match value {
            Value::Class(class) => Ok(class),
            other => Err(mismatch("class", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> JavaResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// A host array with homogeneous elements.
#[derive(Debug, Clone, PartialEq)]
pub enum HostArray {
    Boolean(Vec<bool>),
    Byte(Vec<i8>),
    Char(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// Becomes a `java.lang.String[]`; `None` entries are null.
    Strings(Vec<Option<String>>),
    /// Element type comes from the first non-null element.
    Objects(Vec<Value>),
}

impl HostArray {
    pub fn len(&self) -> usize {
        match self {
            HostArray::Boolean(v) => v.len(),
            HostArray::Byte(v) => v.len(),
            HostArray::Char(v) => v.len(),
            HostArray::Short(v) => v.len(),
            HostArray::Int(v) => v.len(),
            HostArray::Long(v) => v.len(),
            HostArray::Float(v) => v.len(),
            HostArray::Double(v) => v.len(),
            HostArray::Strings(v) => v.len(),
            HostArray::Objects(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            HostArray::Boolean(_) => Some(PrimitiveKind::Boolean),
            HostArray::Byte(_) => Some(PrimitiveKind::Byte),
            HostArray::Char(_) => Some(PrimitiveKind::Char),
            HostArray::Short(_) => Some(PrimitiveKind::Short),
            HostArray::Int(_) => Some(PrimitiveKind::Int),
            HostArray::Long(_) => Some(PrimitiveKind::Long),
            HostArray::Float(_) => Some(PrimitiveKind::Float),
            HostArray::Double(_) => Some(PrimitiveKind::Double),
            HostArray::Strings(_) | HostArray::Objects(_) => None,
        }
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        Some(match self {
            HostArray::Boolean(v) => Value::Boolean(*v.get(index)?),
            HostArray::Byte(v) => Value::Byte(*v.get(index)?),
            HostArray::Char(v) => Value::Char(*v.get(index)?),
            HostArray::Short(v) => Value::Short(*v.get(index)?),
            HostArray::Int(v) => Value::Int(*v.get(index)?),
            HostArray::Long(v) => Value::Long(*v.get(index)?),
            HostArray::Float(v) => Value::Float(*v.get(index)?),
            HostArray::Double(v) => Value::Double(*v.get(index)?),
            HostArray::Strings(v) => v.get(index)?.clone().map_or(Value::Null, Value::String),
            HostArray::Objects(v) => v.get(index)?.clone(),
        })
    }

    pub fn into_values(self) -> Vec<Value> {
        fn all<T: Into<Value>>(values: Vec<T>) -> Vec<Value> {
            values.into_iter().map(Into::into).collect()
        }
        match self {
            HostArray::Boolean(v) => all(v),
            HostArray::Byte(v) => all(v),
            HostArray::Char(v) => all(v),
            HostArray::Short(v) => all(v),
            HostArray::Int(v) => all(v),
            HostArray::Long(v) => all(v),
            HostArray::Float(v) => all(v),
            HostArray::Double(v) => all(v),
            HostArray::Strings(v) => all(v),
            HostArray::Objects(v) => v,
        }
    }

    /// The element type, when it follows from the host data alone.
    ///
    /// Primitive elements of an object array count as their wrapper class.
    /// Object arrays whose first non-null element is an object proxy of
    /// undiscovered class, or that hold no non-null element, return `None`.
    pub fn known_element_type(&self) -> Option<JavaType> {
        if let Some(kind) = self.primitive_kind() {
            return Some(JavaType::Primitive(kind));
        }
        match self {
            HostArray::Strings(_) => Some(JavaType::string()),
            HostArray::Objects(values) => {
                let first = values.iter().find(|value| !value.is_null())?;
                match first.static_type()? {
                    JavaType::Primitive(kind) => Some(JavaType::class(kind.box_class())),
                    other => Some(other),
                }
            }
            _ => None,
        }
    }
}

macro_rules! host_array_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for HostArray {
                fn from(values: Vec<$ty>) -> Self {
                    HostArray::$variant(values)
                }
            }
        )*
    };
}

host_array_from! {
    bool => Boolean,
    i8 => Byte,
    u16 => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Option<String> => Strings,
    Value => Objects,
}

impl From<Vec<String>> for HostArray {
    fn from(values: Vec<String>) -> Self {
        HostArray::Strings(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for HostArray {
    fn from(values: Vec<&str>) -> Self {
        HostArray::Strings(values.into_iter().map(|s| Some(s.to_string())).collect())
    }
}
