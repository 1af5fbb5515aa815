//! Values as they cross into or out of the host

use crate::handle::LocalRef;
use crate::object::HostObject;
use std::sync::Arc;

/// A host value handed to or produced by a converter.
///
/// Primitives travel unboxed. Everything else is a scope-local reference.
#[derive(Debug, Clone, Copy)]
pub enum HostValue<'s> {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Ref(LocalRef<'s>),
}

impl<'s> HostValue<'s> {
    /// `true` for `Null` and for references that were already released.
    pub fn is_null(&self) -> bool {
        match self {
            HostValue::Null => true,
            HostValue::Ref(local) => local.get().is_none(),
            _ => false,
        }
    }

    /// The referenced object, if this is a live reference.
    pub fn object(&self) -> Option<Arc<HostObject>> {
        match self {
            HostValue::Ref(local) => local.get(),
            _ => None,
        }
    }

    /// The value as a heap object, boxing primitives. `None` for null.
    pub fn boxed(&self) -> Option<Arc<HostObject>> {
        let object = match *self {
            HostValue::Null => return None,
            HostValue::Ref(local) => return local.get(),
            HostValue::Boolean(b) => HostObject::Boolean(b),
            HostValue::Int(i) => HostObject::Integer(i),
            HostValue::Long(l) => HostObject::Long(l),
            HostValue::Float(f) => HostObject::Float(f),
            HostValue::Double(d) => HostObject::Double(d),
        };
        Some(Arc::new(object))
    }

    /// Unboxed primitive view of a boxed reference; other values unchanged.
    pub fn unboxed(self) -> HostValue<'s> {
        let HostValue::Ref(local) = self else {
            return self;
        };
        match local.get().as_deref() {
            None => HostValue::Null,
            Some(HostObject::Boolean(b)) => HostValue::Boolean(*b),
            Some(HostObject::Integer(i)) => HostValue::Int(*i),
            Some(HostObject::Long(l)) => HostValue::Long(*l),
            Some(HostObject::Float(f)) => HostValue::Float(*f),
            Some(HostObject::Double(d)) => HostValue::Double(*d),
            Some(_) => self,
        }
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            HostValue::Null => "null".to_string(),
            HostValue::Boolean(b) => format!("boolean {b}"),
            HostValue::Int(i) => format!("int {i}"),
            HostValue::Long(l) => format!("long {l}"),
            HostValue::Float(f) => format!("float {f}"),
            HostValue::Double(d) => format!("double {d}"),
            HostValue::Ref(local) => match local.get() {
                Some(object) => object.class_name().to_string(),
                None => "released reference".to_string(),
            },
        }
    }
}
