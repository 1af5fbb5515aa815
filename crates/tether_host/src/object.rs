//! Host object model
//!
//! Every object living on the host heap is a [`HostObject`]. Objects are
//! shared through `Arc` so that scope-local and scope-independent handles can
//! point at the same instance.

use crate::deferred::Deferred;
use std::sync::Arc;
use thiserror::Error;

/// Fully-qualified class names reported by the host's reflection facility.
pub mod class_names {
    pub const OBJECT: &str = "java.lang.Object";
    pub const BOOLEAN: &str = "java.lang.Boolean";
    pub const INTEGER: &str = "java.lang.Integer";
    pub const LONG: &str = "java.lang.Long";
    pub const FLOAT: &str = "java.lang.Float";
    pub const DOUBLE: &str = "java.lang.Double";
    pub const STRING: &str = "java.lang.String";
    pub const JSON_OBJECT_WRAPPER: &str = "tether.JsonObjectWrapper";
    pub const DEFERRED: &str = "tether.Deferred";
    pub const EXCEPTION: &str = "tether.JsException";
}

/// An object allocated on the host heap.
#[derive(Debug, Clone)]
pub enum HostObject {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    JsonObjectWrapper(JsonObjectWrapper),
    Deferred(Deferred),
    Exception(HostException),
    /// Any object the bridge has no converter for.
    Opaque { class_name: String },
}

impl HostObject {
    pub fn class_name(&self) -> &str {
        match self {
            HostObject::Boolean(_) => class_names::BOOLEAN,
            HostObject::Integer(_) => class_names::INTEGER,
            HostObject::Long(_) => class_names::LONG,
            HostObject::Float(_) => class_names::FLOAT,
            HostObject::Double(_) => class_names::DOUBLE,
            HostObject::String(_) => class_names::STRING,
            HostObject::JsonObjectWrapper(_) => class_names::JSON_OBJECT_WRAPPER,
            HostObject::Deferred(_) => class_names::DEFERRED,
            HostObject::Exception(_) => class_names::EXCEPTION,
            HostObject::Opaque { class_name } => class_name,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            HostObject::Deferred(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_json_wrapper(&self) -> Option<&JsonObjectWrapper> {
        match self {
            HostObject::JsonObjectWrapper(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_exception(&self) -> Option<&HostException> {
        match self {
            HostObject::Exception(e) => Some(e),
            _ => None,
        }
    }
}

impl PartialEq for HostObject {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostObject::Boolean(a), HostObject::Boolean(b)) => a == b,
            (HostObject::Integer(a), HostObject::Integer(b)) => a == b,
            (HostObject::Long(a), HostObject::Long(b)) => a == b,
            (HostObject::Float(a), HostObject::Float(b)) => a == b,
            (HostObject::Double(a), HostObject::Double(b)) => a == b,
            (HostObject::String(a), HostObject::String(b)) => a == b,
            (HostObject::JsonObjectWrapper(a), HostObject::JsonObjectWrapper(b)) => a == b,
            (HostObject::Deferred(a), HostObject::Deferred(b)) => a.same_as(b),
            (HostObject::Exception(a), HostObject::Exception(b)) => a == b,
            (
                HostObject::Opaque { class_name: a },
                HostObject::Opaque { class_name: b },
            ) => a == b,
            _ => false,
        }
    }
}

/// Host-side carrier for an opaque object serialized as JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonObjectWrapper {
    json: String,
}

impl JsonObjectWrapper {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            json: value.to_string(),
        }
    }

    pub fn json(&self) -> &str {
        &self.json
    }

    /// Parse the wrapped text for structural inspection.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.json)
    }
}

/// An exception as seen by host code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HostException {
    pub message: String,
    pub stack: Option<String>,
}

impl HostException {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack.filter(|s| !s.is_empty());
        self
    }

    pub fn into_object(self) -> Arc<HostObject> {
        Arc::new(HostObject::Exception(self))
    }
}
