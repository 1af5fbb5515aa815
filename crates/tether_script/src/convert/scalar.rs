//! Scalar converters: booleans, numbers and strings
//!
//! Numbers keep their declared width. A script number that does not fit the
//! host type exactly is a type mismatch, never a silent truncation.

use crate::error::{BridgeError, Result};
use crate::marshal::MarshalContext;
use crate::value::{describe, ScriptTag};
use rquickjs::{Ctx, Value};
use tether_host::{HostObject, HostValue};

/// Largest integer a script number represents exactly (2^53 - 1).
pub(crate) const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Primitive {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Integer => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    /// The primitive an unboxed host value carries.
    pub fn of(value: &HostValue<'_>) -> Option<Primitive> {
        match value {
            HostValue::Boolean(_) => Some(Primitive::Boolean),
            HostValue::Int(_) => Some(Primitive::Integer),
            HostValue::Long(_) => Some(Primitive::Long),
            HostValue::Float(_) => Some(Primitive::Float),
            HostValue::Double(_) => Some(Primitive::Double),
            HostValue::Null | HostValue::Ref(_) => None,
        }
    }

    pub fn to_host<'s>(self, value: &Value<'_>, in_script: bool) -> Result<HostValue<'s>> {
        if ScriptTag::of(value).is_nullish() {
            return Ok(HostValue::Null);
        }

        match self {
            Primitive::Boolean => value
                .as_bool()
                .map(HostValue::Boolean)
                .ok_or_else(|| self.mismatch(value, in_script)),
            Primitive::Integer => {
                if let Some(i) = value.as_int() {
                    return Ok(HostValue::Int(i));
                }
                let n = self.number(value, in_script)?;
                if n.fract() == 0.0 && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
                    Ok(HostValue::Int(n as i32))
                } else {
                    Err(self.out_of_range(n, in_script))
                }
            }
            Primitive::Long => {
                if let Some(i) = value.as_int() {
                    return Ok(HostValue::Long(i64::from(i)));
                }
                let n = self.number(value, in_script)?;
                if n.fract() == 0.0 && n >= -I64_BOUND && n < I64_BOUND {
                    Ok(HostValue::Long(n as i64))
                } else {
                    Err(self.out_of_range(n, in_script))
                }
            }
            Primitive::Float => {
                let n = self.number(value, in_script)?;
                if n.is_finite() && n.abs() > f64::from(f32::MAX) {
                    Err(self.out_of_range(n, in_script))
                } else {
                    Ok(HostValue::Float(n as f32))
                }
            }
            Primitive::Double => self.number(value, in_script).map(HostValue::Double),
        }
    }

    pub fn to_script<'js>(
        self,
        ctx: &Ctx<'js>,
        value: HostValue<'_>,
        in_script: bool,
    ) -> Result<Value<'js>> {
        let ctx = ctx.clone();
        match (self, value.unboxed()) {
            (_, HostValue::Null) => Ok(Value::new_null(ctx)),
            (Primitive::Boolean, HostValue::Boolean(b)) => Ok(Value::new_bool(ctx, b)),
            (Primitive::Integer, HostValue::Int(i)) => Ok(Value::new_int(ctx, i)),
            (Primitive::Long, HostValue::Long(l)) => {
                if l.unsigned_abs() > MAX_SAFE_INTEGER.unsigned_abs() {
                    return Err(BridgeError::type_mismatch(
                        format!("long {l} cannot be represented exactly as a script number"),
                        in_script,
                    ));
                }
                Ok(Value::new_number(ctx, l as f64))
            }
            (Primitive::Float, HostValue::Float(f)) => Ok(Value::new_float(ctx, f64::from(f))),
            // Always a float tag, so -0.0 keeps its sign.
            (Primitive::Double, HostValue::Double(d)) => Ok(Value::new_float(ctx, d)),
            (_, other) => Err(BridgeError::type_mismatch(
                format!("expected host {}, got {}", self.name(), other.describe()),
                in_script,
            )),
        }
    }

    /// Box an unboxed value of this primitive into its host object.
    pub(crate) fn box_value(self, value: HostValue<'_>) -> Option<HostObject> {
        match (self, value) {
            (Primitive::Boolean, HostValue::Boolean(b)) => Some(HostObject::Boolean(b)),
            (Primitive::Integer, HostValue::Int(i)) => Some(HostObject::Integer(i)),
            (Primitive::Long, HostValue::Long(l)) => Some(HostObject::Long(l)),
            (Primitive::Float, HostValue::Float(f)) => Some(HostObject::Float(f)),
            (Primitive::Double, HostValue::Double(d)) => Some(HostObject::Double(d)),
            _ => None,
        }
    }

    fn number(self, value: &Value<'_>, in_script: bool) -> Result<f64> {
        value
            .as_number()
            .ok_or_else(|| self.mismatch(value, in_script))
    }

    fn mismatch(self, value: &Value<'_>, in_script: bool) -> BridgeError {
        BridgeError::type_mismatch(
            format!("expected {}, got {}", self.name(), describe(value)),
            in_script,
        )
    }

    fn out_of_range(self, n: f64, in_script: bool) -> BridgeError {
        BridgeError::type_mismatch(
            format!("number {n} does not fit in {}", self.name()),
            in_script,
        )
    }
}

pub(crate) fn string_to_host<'s>(
    m: &MarshalContext<'_, 's>,
    value: &Value<'_>,
    in_script: bool,
) -> Result<HostValue<'s>> {
    if ScriptTag::of(value).is_nullish() {
        return Ok(HostValue::Null);
    }
    match value.as_string() {
        Some(text) => Ok(m.new_ref(HostObject::String(text.to_string()?))),
        None => Err(BridgeError::type_mismatch(
            format!("expected string, got {}", describe(value)),
            in_script,
        )),
    }
}

pub(crate) fn string_to_script<'js>(
    ctx: &Ctx<'js>,
    value: HostValue<'_>,
    in_script: bool,
) -> Result<Value<'js>> {
    if value.is_null() {
        return Ok(Value::new_null(ctx.clone()));
    }
    match value.object().as_deref() {
        Some(HostObject::String(text)) => {
            Ok(rquickjs::String::from_str(ctx.clone(), text)?.into_value())
        }
        _ => Err(BridgeError::type_mismatch(
            format!("expected host string, got {}", value.describe()),
            in_script,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Converter;
    use crate::testing::with_marshal;

    fn round_trip<'s>(
        m: &MarshalContext<'_, 's>,
        primitive: Primitive,
        value: HostValue<'_>,
    ) -> HostValue<'s> {
        let converter = Converter::Primitive(primitive);
        let script = converter.to_script(m, value, false).unwrap();
        converter.to_host(m, script, false).unwrap()
    }

    #[test]
    fn booleans_round_trip() {
        with_marshal(|m| {
            for b in [true, false] {
                assert!(matches!(
                    round_trip(m, Primitive::Boolean, HostValue::Boolean(b)),
                    HostValue::Boolean(v) if v == b
                ));
            }
            Ok(())
        });
    }

    #[test]
    fn integers_round_trip_at_boundaries() {
        with_marshal(|m| {
            for i in [0, -1, 1, i32::MAX, i32::MIN] {
                assert!(matches!(
                    round_trip(m, Primitive::Integer, HostValue::Int(i)),
                    HostValue::Int(v) if v == i
                ));
            }
            for l in [0, -1, MAX_SAFE_INTEGER, -MAX_SAFE_INTEGER, i64::from(i32::MAX) + 1] {
                assert!(matches!(
                    round_trip(m, Primitive::Long, HostValue::Long(l)),
                    HostValue::Long(v) if v == l
                ));
            }
            Ok(())
        });
    }

    #[test]
    fn floats_round_trip_including_special_values() {
        with_marshal(|m| {
            for f in [0.0f32, -1.0, f32::MAX, f32::MIN, f32::MIN_POSITIVE, f32::INFINITY] {
                assert!(matches!(
                    round_trip(m, Primitive::Float, HostValue::Float(f)),
                    HostValue::Float(v) if v == f
                ));
            }
            assert!(matches!(
                round_trip(m, Primitive::Float, HostValue::Float(f32::NAN)),
                HostValue::Float(v) if v.is_nan()
            ));

            for d in [0.0, -1.0, f64::MAX, f64::MIN, f64::EPSILON, f64::NEG_INFINITY, 0.1] {
                assert!(matches!(
                    round_trip(m, Primitive::Double, HostValue::Double(d)),
                    HostValue::Double(v) if v == d
                ));
            }
            assert!(matches!(
                round_trip(m, Primitive::Double, HostValue::Double(f64::NAN)),
                HostValue::Double(v) if v.is_nan()
            ));
            assert!(matches!(
                round_trip(m, Primitive::Double, HostValue::Double(-0.0)),
                HostValue::Double(v) if v == 0.0 && v.is_sign_negative()
            ));
            Ok(())
        });
    }

    #[test]
    fn strings_round_trip_with_embedded_nul() {
        with_marshal(|m| {
            for text in ["", "plain", "a\0b", "emoji \u{1F600} and ümlauts"] {
                let local = m.new_ref(HostObject::String(text.to_string()));
                let script = Converter::String.to_script(m, local, false)?;
                assert_eq!(script.as_string().unwrap().to_string()?.len(), text.len());

                let back = Converter::String.to_host(m, script, false)?;
                assert_eq!(back.object().unwrap().as_str(), Some(text));
            }
            Ok(())
        });
    }

    #[test]
    fn script_nulls_become_host_null() {
        with_marshal(|m| {
            for source in ["null", "undefined"] {
                for converter in [
                    Converter::Primitive(Primitive::Integer),
                    Converter::Primitive(Primitive::Double),
                    Converter::String,
                ] {
                    let value: Value = m.ctx().eval(source)?;
                    assert!(converter.to_host(m, value, true)?.is_null());
                }
            }
            Ok(())
        });
    }

    #[test]
    fn numbers_outside_the_declared_width_are_rejected() {
        with_marshal(|m| {
            let int = Converter::Primitive(Primitive::Integer);
            for source in ["2147483648", "-2147483649", "1.5", "NaN", "Infinity"] {
                let value: Value = m.ctx().eval(source)?;
                let err = int.to_host(m, value, true).unwrap_err();
                assert!(matches!(err, BridgeError::TypeMismatch { in_script: true, .. }), "{source}");
            }

            let long = Converter::Primitive(Primitive::Long);
            let value: Value = m.ctx().eval("2 ** 63")?;
            assert!(long.to_host(m, value, false).is_err());
            for l in [MAX_SAFE_INTEGER + 1, -MAX_SAFE_INTEGER - 1, i64::MAX, i64::MIN] {
                let err = long.to_script(m, HostValue::Long(l), false).unwrap_err();
                assert!(matches!(err, BridgeError::TypeMismatch { .. }), "{l}");
            }

            let float = Converter::Primitive(Primitive::Float);
            let value: Value = m.ctx().eval("1e300")?;
            assert!(float.to_host(m, value, false).is_err());
            Ok(())
        });
    }

    #[test]
    fn boxed_references_convert_as_their_primitive() {
        with_marshal(|m| {
            let boxed = m.new_ref(HostObject::Integer(42));
            let value = Converter::Primitive(Primitive::Integer).to_script(m, boxed, false)?;
            assert_eq!(value.as_int(), Some(42));

            let boxed = m.new_ref(HostObject::Double(-0.0));
            let value = Converter::Primitive(Primitive::Double).to_script(m, boxed, false)?;
            assert!(value.as_number().is_some_and(|d| d == 0.0 && d.is_sign_negative()));

            let text = m.new_ref(HostObject::String("42".into()));
            let err = Converter::Primitive(Primitive::Integer)
                .to_script(m, text, false)
                .unwrap_err();
            assert!(err.to_string().contains("java.lang.String"));
            Ok(())
        });
    }

    #[test]
    fn wrong_families_are_type_mismatches() {
        with_marshal(|m| {
            let value: Value = m.ctx().eval("1")?;
            let err = Converter::Primitive(Primitive::Boolean)
                .to_host(m, value, false)
                .unwrap_err();
            assert!(matches!(err, BridgeError::TypeMismatch { in_script: false, .. }));

            let value: Value = m.ctx().eval("'1'")?;
            assert!(Converter::Primitive(Primitive::Double).to_host(m, value, true).is_err());

            let value: Value = m.ctx().eval("42")?;
            assert!(Converter::String.to_host(m, value, true).is_err());

            let err = Converter::Primitive(Primitive::Integer)
                .to_script(m, HostValue::Long(1), false)
                .unwrap_err();
            assert!(err.to_string().contains("expected host int"));
            Ok(())
        });
    }
}
