//! Encoding of the 64-bit argument slot.
//!
//! Integers are sign- or zero-extended across the whole slot and floats are
//! stored by bit pattern, so a slot reads back correctly through its own
//! member and through any wider integer member.

use crate::sys::*;

#[cfg(target_endian = "little")]
macro_rules! narrow {
    ($field:ident, $value:expr, $wide:expr) => {
        jvalue { j: $wide }
    };
}

#[cfg(target_endian = "big")]
macro_rules! narrow {
    ($field:ident, $value:expr, $wide:expr) => {{
        let mut slot = jvalue { j: 0 };
        slot.$field = $value;
        slot
    }};
}

pub(crate) fn empty() -> jvalue {
    jvalue { j: 0 }
}

pub(crate) fn from_boolean(value: jboolean) -> jvalue {
    narrow!(z, value, i64::from(value))
}

pub(crate) fn from_byte(value: jbyte) -> jvalue {
    narrow!(b, value, i64::from(value))
}

pub(crate) fn from_char(value: jchar) -> jvalue {
    narrow!(c, value, i64::from(value))
}

pub(crate) fn from_short(value: jshort) -> jvalue {
    narrow!(s, value, i64::from(value))
}

pub(crate) fn from_int(value: jint) -> jvalue {
    narrow!(i, value, i64::from(value))
}

pub(crate) fn from_long(value: jlong) -> jvalue {
    jvalue { j: value }
}

pub(crate) fn from_float(value: jfloat) -> jvalue {
    narrow!(f, value, i64::from(value.to_bits()))
}

pub(crate) fn from_double(value: jdouble) -> jvalue {
    jvalue { d: value }
}

pub(crate) fn from_object(value: jobject) -> jvalue {
    let mut slot = jvalue { j: 0 };
    slot.l = value;
    slot
}

// Every constructor above initializes all eight bytes, and every bit pattern
// is a valid value of each member type, so reading any member is sound.

pub(crate) fn to_boolean(slot: jvalue) -> jboolean {
    unsafe { slot.z }
}

pub(crate) fn to_byte(slot: jvalue) -> jbyte {
    unsafe { slot.b }
}

pub(crate) fn to_char(slot: jvalue) -> jchar {
    unsafe { slot.c }
}

pub(crate) fn to_short(slot: jvalue) -> jshort {
    unsafe { slot.s }
}

pub(crate) fn to_int(slot: jvalue) -> jint {
    unsafe { slot.i }
}

pub(crate) fn to_long(slot: jvalue) -> jlong {
    unsafe { slot.j }
}

pub(crate) fn to_float(slot: jvalue) -> jfloat {
    unsafe { slot.f }
}

pub(crate) fn to_double(slot: jvalue) -> jdouble {
    unsafe { slot.d }
}

pub(crate) fn to_object(slot: jvalue) -> jobject {
    unsafe { slot.l }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn test_boolean_is_zero_or_one() {
        assert_eq!(to_boolean(from_boolean(JNI_TRUE)), 1);
        assert_eq!(to_boolean(from_boolean(JNI_FALSE)), 0);
        assert_eq!(to_long(from_boolean(JNI_TRUE)), 1);
        assert_eq!(to_long(from_boolean(JNI_FALSE)), 0);
    }

    #[test]
    fn test_integers_round_trip() {
        assert_eq!(to_byte(from_byte(-128)), -128);
        assert_eq!(to_char(from_char(0xFFFF)), 0xFFFF);
        assert_eq!(to_short(from_short(i16::MIN)), i16::MIN);
        assert_eq!(to_int(from_int(-5)), -5);
        assert_eq!(to_long(from_long(i64::MIN)), i64::MIN);
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn test_integers_fill_the_slot() {
        assert_eq!(to_long(from_byte(-1)), -1);
        assert_eq!(to_long(from_short(-2)), -2);
        assert_eq!(to_long(from_int(-5)), -5);
        assert_eq!(to_long(from_char(0xFFFF)), 0xFFFF);
    }

    #[test]
    fn test_float_bits_preserved() {
        let payload_nan = f32::from_bits(0x7fc0_1234);
        for value in [0.0f32, -0.0, 1.5, f32::MIN_POSITIVE, f32::INFINITY, payload_nan] {
            assert_eq!(to_float(from_float(value)).to_bits(), value.to_bits());
        }
    }

    #[test]
    fn test_double_bits_preserved() {
        let payload_nan = f64::from_bits(0x7ff8_0000_dead_beef);
        for value in [0.0f64, -0.0, 2.5e-300, f64::MAX, f64::NEG_INFINITY, payload_nan] {
            assert_eq!(to_double(from_double(value)).to_bits(), value.to_bits());
        }
    }

    #[test]
    fn test_object_slot() {
        assert!(to_object(from_object(ptr::null_mut())).is_null());
        let mut target = 7u8;
        let handle = (&mut target as *mut u8).cast();
        assert_eq!(to_object(from_object(handle)), handle);
    }
}
