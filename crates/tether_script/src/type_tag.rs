//! Type identity resolution
//!
//! Maps host type names to [`TypeTag`]s. The name table below is the only
//! string-keyed lookup in the marshaling layer; everything downstream
//! dispatches on the tag.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tether_host::{class_names, HostRuntime, LocalRef};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Void,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    String,
    BoxedBoolean,
    BoxedInt,
    BoxedLong,
    BoxedFloat,
    BoxedDouble,
    Object,
    JsonObjectWrapper,
    Deferred,
    Unsupported,
}

static TYPE_NAMES: Lazy<HashMap<&'static str, TypeTag>> = Lazy::new(|| {
    HashMap::from([
        ("void", TypeTag::Void),
        ("boolean", TypeTag::Boolean),
        ("int", TypeTag::Int),
        ("long", TypeTag::Long),
        ("float", TypeTag::Float),
        ("double", TypeTag::Double),
        (class_names::BOOLEAN, TypeTag::BoxedBoolean),
        (class_names::INTEGER, TypeTag::BoxedInt),
        (class_names::LONG, TypeTag::BoxedLong),
        (class_names::FLOAT, TypeTag::BoxedFloat),
        (class_names::DOUBLE, TypeTag::BoxedDouble),
        (class_names::STRING, TypeTag::String),
        (class_names::OBJECT, TypeTag::Object),
        (class_names::JSON_OBJECT_WRAPPER, TypeTag::JsonObjectWrapper),
        (class_names::DEFERRED, TypeTag::Deferred),
    ])
});

impl TypeTag {
    /// Tag for a fully-qualified type name; unknown names are `Unsupported`.
    pub fn from_type_name(name: &str) -> TypeTag {
        TYPE_NAMES.get(name).copied().unwrap_or(TypeTag::Unsupported)
    }

    /// Resolve the tag of a live host object. Costs one reflective call.
    pub fn resolve(host: &HostRuntime, object: &LocalRef<'_>) -> Result<(TypeTag, String)> {
        let class_name = host.resolve_reference_class_name(object)?;
        let tag = TypeTag::from_type_name(&class_name);
        tracing::trace!(class = %class_name, ?tag, "resolved type identity");
        Ok((tag, class_name))
    }

    pub fn is_boxed(self) -> bool {
        matches!(
            self,
            TypeTag::BoxedBoolean
                | TypeTag::BoxedInt
                | TypeTag::BoxedLong
                | TypeTag::BoxedFloat
                | TypeTag::BoxedDouble
        )
    }
}
