//! Boxed (nullable) primitives
//!
//! Only the null path differs from the wrapped primitive: script
//! null/undefined map to a host null reference, never to a boxed zero.

use super::Primitive;
use crate::error::{BridgeError, Result};
use crate::marshal::MarshalContext;
use crate::value::ScriptTag;
use rquickjs::Value;
use tether_host::HostValue;

pub(super) fn to_host<'s>(
    primitive: Primitive,
    m: &MarshalContext<'_, 's>,
    value: &Value<'_>,
    in_script: bool,
) -> Result<HostValue<'s>> {
    if ScriptTag::of(value).is_nullish() {
        return Ok(HostValue::Null);
    }

    let unboxed = primitive.to_host(value, in_script)?;
    let boxed = primitive.box_value(unboxed).ok_or_else(|| {
        BridgeError::type_mismatch(
            format!("cannot box {} as {}", unboxed.describe(), primitive.name()),
            in_script,
        )
    })?;
    Ok(m.new_ref(boxed))
}

pub(super) fn to_script<'js>(
    primitive: Primitive,
    m: &MarshalContext<'js, '_>,
    value: HostValue<'_>,
    in_script: bool,
) -> Result<Value<'js>> {
    if value.is_null() {
        return Ok(Value::new_null(m.ctx().clone()));
    }
    primitive.to_script(m.ctx(), value.unboxed(), in_script)
}
