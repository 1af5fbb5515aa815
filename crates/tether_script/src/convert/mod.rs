//! Value converters
//!
//! A [`Converter`] translates one family of values in both directions:
//!
//! - `to_host`: script value → [`HostValue`]
//! - `to_script`: [`HostValue`] → script value
//!
//! `in_script` tells the converter which side initiated the call, and is
//! recorded in any error so it can be raised on that side.

mod boxed;
mod json;
mod object;
mod scalar;

use crate::error::Result;
use crate::marshal::MarshalContext;
use crate::promise;
use crate::type_tag::TypeTag;
use rquickjs::Value;
use std::rc::Rc;
use tether_host::HostValue;

pub use scalar::Primitive;

#[derive(Debug, Clone, PartialEq)]
pub enum Converter {
    Void,
    Primitive(Primitive),
    /// Nullable wrapper around a primitive.
    Boxed(Primitive),
    String,
    JsonObjectWrapper,
    /// Picks a converter from the value's runtime type.
    Object,
    /// Promise/deferred bridge; the inner converter handles the settled value.
    Deferred(Rc<Converter>),
}

impl Converter {
    pub fn deferred(component: Converter) -> Self {
        Converter::Deferred(Rc::new(component))
    }

    /// Converter for a declared type. Deferred results are marshaled
    /// dynamically; `None` for `Unsupported`.
    pub fn for_tag(tag: TypeTag) -> Option<Converter> {
        let converter = match tag {
            TypeTag::Void => Converter::Void,
            TypeTag::Boolean => Converter::Primitive(Primitive::Boolean),
            TypeTag::Int => Converter::Primitive(Primitive::Integer),
            TypeTag::Long => Converter::Primitive(Primitive::Long),
            TypeTag::Float => Converter::Primitive(Primitive::Float),
            TypeTag::Double => Converter::Primitive(Primitive::Double),
            TypeTag::BoxedBoolean => Converter::Boxed(Primitive::Boolean),
            TypeTag::BoxedInt => Converter::Boxed(Primitive::Integer),
            TypeTag::BoxedLong => Converter::Boxed(Primitive::Long),
            TypeTag::BoxedFloat => Converter::Boxed(Primitive::Float),
            TypeTag::BoxedDouble => Converter::Boxed(Primitive::Double),
            TypeTag::String => Converter::String,
            TypeTag::JsonObjectWrapper => Converter::JsonObjectWrapper,
            TypeTag::Object => Converter::Object,
            TypeTag::Deferred => Converter::deferred(Converter::Object),
            TypeTag::Unsupported => return None,
        };
        Some(converter)
    }

    pub fn to_host<'js, 's>(
        &self,
        m: &MarshalContext<'js, 's>,
        value: Value<'js>,
        in_script: bool,
    ) -> Result<HostValue<'s>> {
        match self {
            Converter::Void => Ok(HostValue::Null),
            Converter::Primitive(primitive) => primitive.to_host(&value, in_script),
            Converter::Boxed(primitive) => boxed::to_host(*primitive, m, &value, in_script),
            Converter::String => scalar::string_to_host(m, &value, in_script),
            Converter::JsonObjectWrapper => json::to_host(m, value, in_script),
            Converter::Object => object::to_host(m, value, in_script),
            Converter::Deferred(component) => promise::to_host(component, m, value, in_script),
        }
    }

    pub fn to_script<'js, 's>(
        &self,
        m: &MarshalContext<'js, 's>,
        value: HostValue<'_>,
        in_script: bool,
    ) -> Result<Value<'js>> {
        match self {
            Converter::Void => Ok(Value::new_undefined(m.ctx().clone())),
            Converter::Primitive(primitive) => primitive.to_script(m.ctx(), value, in_script),
            Converter::Boxed(primitive) => boxed::to_script(*primitive, m, value, in_script),
            Converter::String => scalar::string_to_script(m.ctx(), value, in_script),
            Converter::JsonObjectWrapper => json::to_script(m.ctx(), value, in_script),
            Converter::Object => object::to_script(m, value, in_script),
            Converter::Deferred(component) => promise::to_script(component, m, value, in_script),
        }
    }
}
