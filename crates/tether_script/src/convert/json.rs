//! JSON object wrapper
//!
//! Opaque objects cross the boundary as JSON text, produced and consumed by
//! the script engine's own `JSON.stringify` / `JSON.parse`.

use crate::error::{BridgeError, Result};
use crate::marshal::MarshalContext;
use crate::value::{caught_exception, describe, ScriptTag};
use rquickjs::{Ctx, Value};
use tether_host::{HostObject, HostValue, JsonObjectWrapper};

pub(super) fn to_host<'js, 's>(
    m: &MarshalContext<'js, 's>,
    value: Value<'js>,
    in_script: bool,
) -> Result<HostValue<'s>> {
    if ScriptTag::of(&value).is_nullish() {
        return Ok(HostValue::Null);
    }

    let ctx = m.ctx();
    let description = describe(&value);
    let json = match ctx.json_stringify(value) {
        Ok(Some(json)) => json.to_string()?,
        Ok(None) => {
            return Err(BridgeError::serialization(
                format!("{description} has no JSON representation"),
                in_script,
            ))
        }
        Err(err) => {
            let cause = caught_exception(ctx, err);
            return Err(BridgeError::serialization(
                format!("cannot serialize {description}: {}", cause.message),
                in_script,
            ));
        }
    };

    Ok(m.new_ref(HostObject::JsonObjectWrapper(JsonObjectWrapper::new(json))))
}

pub(super) fn to_script<'js>(
    ctx: &Ctx<'js>,
    value: HostValue<'_>,
    in_script: bool,
) -> Result<Value<'js>> {
    if value.is_null() {
        return Ok(Value::new_null(ctx.clone()));
    }

    let object = value.object();
    let Some(wrapper) = object.as_deref().and_then(HostObject::as_json_wrapper) else {
        return Err(BridgeError::type_mismatch(
            format!("expected JSON object wrapper, got {}", value.describe()),
            in_script,
        ));
    };

    ctx.json_parse(wrapper.json()).map_err(|err| {
        let cause = caught_exception(ctx, err);
        BridgeError::serialization(
            format!("cannot parse wrapped JSON: {}", cause.message),
            in_script,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Converter;
    use crate::testing::with_marshal;
    use serde_json::json;

    #[test]
    fn nested_objects_round_trip_structurally() {
        with_marshal(|m| {
            let original = json!({
                "name": "tether",
                "nested": { "list": [1, 2.5, "three", null, { "deep": true }] },
                "empty": {},
            });
            let wrapper = m.new_ref(HostObject::JsonObjectWrapper(JsonObjectWrapper::from_value(
                &original,
            )));

            let script = Converter::JsonObjectWrapper.to_script(m, wrapper, false)?;
            let name: String = script.as_object().unwrap().get("name")?;
            assert_eq!(name, "tether");

            let back = Converter::JsonObjectWrapper.to_host(m, script, false)?;
            let object = back.object().unwrap();
            let value = object.as_json_wrapper().unwrap().to_value().unwrap();
            assert_eq!(value, original);
            Ok(())
        });
    }

    #[test]
    fn cyclic_structures_fail_to_serialize() {
        with_marshal(|m| {
            let cyclic: Value = m
                .ctx()
                .eval("(() => { const o = {}; o.self = o; return o; })()")?;
            let err = Converter::JsonObjectWrapper
                .to_host(m, cyclic, true)
                .unwrap_err();
            assert!(matches!(err, BridgeError::Serialization { in_script: true, .. }));
            Ok(())
        });
    }

    #[test]
    fn malformed_text_fails_to_parse() {
        with_marshal(|m| {
            let wrapper = m.new_ref(HostObject::JsonObjectWrapper(JsonObjectWrapper::new("{oops")));
            let err = Converter::JsonObjectWrapper
                .to_script(m, wrapper, false)
                .unwrap_err();
            assert!(matches!(err, BridgeError::Serialization { in_script: false, .. }));
            Ok(())
        });
    }

    #[test]
    fn only_wrappers_are_accepted_from_the_host() {
        with_marshal(|m| {
            let text = m.new_ref(HostObject::String("{}".into()));
            let err = Converter::JsonObjectWrapper.to_script(m, text, false).unwrap_err();
            assert!(matches!(err, BridgeError::TypeMismatch { .. }));

            let null = Converter::JsonObjectWrapper.to_script(m, HostValue::Null, false)?;
            assert!(null.is_null());
            Ok(())
        });
    }
}
