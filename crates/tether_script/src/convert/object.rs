//! Dynamic converter for values whose static type is `Object`

use super::{Converter, Primitive};
use crate::error::{BridgeError, Result};
use crate::marshal::MarshalContext;
use crate::type_tag::TypeTag;
use crate::value::{describe, ScriptTag};
use rquickjs::Value;
use tether_host::HostValue;

pub(super) fn to_host<'js, 's>(
    m: &MarshalContext<'js, 's>,
    value: Value<'js>,
    in_script: bool,
) -> Result<HostValue<'s>> {
    // The host sees `Object`, so primitives must come back boxed.
    let converter = match ScriptTag::of(&value) {
        ScriptTag::Undefined | ScriptTag::Null => return Ok(HostValue::Null),
        ScriptTag::Boolean => Converter::Boxed(Primitive::Boolean),
        ScriptTag::Number => Converter::Boxed(Primitive::Double),
        ScriptTag::String => Converter::String,
        ScriptTag::Object => Converter::JsonObjectWrapper,
        ScriptTag::Function | ScriptTag::Other => {
            return Err(BridgeError::type_mismatch(
                format!("cannot marshal {} to the host", describe(&value)),
                in_script,
            ))
        }
    };
    converter.to_host(m, value, in_script)
}

pub(super) fn to_script<'js>(
    m: &MarshalContext<'js, '_>,
    value: HostValue<'_>,
    in_script: bool,
) -> Result<Value<'js>> {
    if value.is_null() {
        return Ok(Value::new_null(m.ctx().clone()));
    }

    let converter = match value {
        HostValue::Ref(local) => {
            let (tag, class_name) = TypeTag::resolve(m.host(), &local)?;
            converter_for_class(tag).ok_or(BridgeError::UnsupportedType {
                class_name,
                in_script,
            })?
        }
        primitive => match Primitive::of(&primitive) {
            Some(p) => Converter::Boxed(p),
            None => Converter::Void,
        },
    };
    converter.to_script(m, value, in_script)
}

/// Converter for a host object of the given runtime class. Host references
/// are always objects, so primitive tags map to their boxed converters.
fn converter_for_class(tag: TypeTag) -> Option<Converter> {
    let converter = match tag {
        TypeTag::Boolean | TypeTag::BoxedBoolean => Converter::Boxed(Primitive::Boolean),
        TypeTag::Int | TypeTag::BoxedInt => Converter::Boxed(Primitive::Integer),
        TypeTag::Long | TypeTag::BoxedLong => Converter::Boxed(Primitive::Long),
        TypeTag::Float | TypeTag::BoxedFloat => Converter::Boxed(Primitive::Float),
        TypeTag::Double | TypeTag::BoxedDouble => Converter::Boxed(Primitive::Double),
        TypeTag::String => Converter::String,
        TypeTag::JsonObjectWrapper => Converter::JsonObjectWrapper,
        TypeTag::Deferred => Converter::deferred(Converter::Object),
        TypeTag::Void | TypeTag::Object | TypeTag::Unsupported => return None,
    };
    Some(converter)
}
