//! Script value inspection helpers

use rquickjs::{Ctx, Object, Value};
use tether_host::HostException;

/// Coarse runtime tag of a script value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScriptTag {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Function,
    Object,
    /// Symbols, big integers and engine-internal values.
    Other,
}

impl ScriptTag {
    pub fn of(value: &Value<'_>) -> ScriptTag {
        if value.is_undefined() {
            ScriptTag::Undefined
        } else if value.is_null() {
            ScriptTag::Null
        } else if value.is_bool() {
            ScriptTag::Boolean
        } else if value.as_number().is_some() {
            ScriptTag::Number
        } else if value.is_string() {
            ScriptTag::String
        } else if value.is_function() {
            ScriptTag::Function
        } else if value.is_object() {
            ScriptTag::Object
        } else {
            ScriptTag::Other
        }
    }

    pub fn is_nullish(self) -> bool {
        matches!(self, ScriptTag::Undefined | ScriptTag::Null)
    }
}

/// A value with a callable `then` member.
pub fn is_thenable(value: &Value<'_>) -> bool {
    value
        .as_object()
        .and_then(|object| object.get::<_, Value>("then").ok())
        .is_some_and(|then| then.is_function())
}

/// Short description for error messages.
pub fn describe(value: &Value<'_>) -> String {
    match ScriptTag::of(value) {
        ScriptTag::Undefined => "undefined".to_string(),
        ScriptTag::Null => "null".to_string(),
        ScriptTag::Boolean => format!("boolean {}", value.as_bool().unwrap_or_default()),
        ScriptTag::Number => format!("number {}", value.as_number().unwrap_or_default()),
        ScriptTag::String => "string".to_string(),
        ScriptTag::Function => "function".to_string(),
        ScriptTag::Object => "object".to_string(),
        ScriptTag::Other => format!("{:?}", value.type_of()),
    }
}

/// Take the exception pending in `ctx` after `err`.
pub fn caught_exception<'js>(ctx: &Ctx<'js>, err: rquickjs::Error) -> HostException {
    match err {
        rquickjs::Error::Exception => host_exception_from_value(ctx, &ctx.catch()),
        other => HostException::new(other.to_string()),
    }
}

/// Translate a thrown or rejected script value into a host exception.
///
/// Error-like objects give their `message` and `stack`, strings are used
/// verbatim and anything else is described by its JSON text.
pub fn host_exception_from_value<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> HostException {
    if let Some(text) = value.as_string() {
        return HostException::new(text.to_string().unwrap_or_default());
    }

    if let Some(object) = value.as_object() {
        if let Some(message) = string_property(object, "message") {
            return HostException::new(message).with_stack(string_property(object, "stack"));
        }
    }

    let text = ctx
        .json_stringify(value.clone())
        .ok()
        .flatten()
        .and_then(|json| json.to_string().ok())
        .unwrap_or_else(|| describe(value));
    HostException::new(text)
}

fn string_property(object: &Object<'_>, key: &str) -> Option<String> {
    object.get::<_, Option<String>>(key).ok().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::with_marshal;

    #[test]
    fn tags_follow_engine_types() {
        with_marshal(|m| {
            let ctx = m.ctx();
            let cases = [
                ("undefined", ScriptTag::Undefined),
                ("null", ScriptTag::Null),
                ("true", ScriptTag::Boolean),
                ("1", ScriptTag::Number),
                ("1.5", ScriptTag::Number),
                ("'s'", ScriptTag::String),
                ("(function () {})", ScriptTag::Function),
                ("({})", ScriptTag::Object),
                ("[1, 2]", ScriptTag::Object),
                ("Symbol('x')", ScriptTag::Other),
            ];
            for (source, expected) in cases {
                let value: Value = ctx.eval(source)?;
                assert_eq!(ScriptTag::of(&value), expected, "{source}");
            }
            Ok(())
        });
    }

    #[test]
    fn thenables_need_a_callable_then() {
        with_marshal(|m| {
            let ctx = m.ctx();
            let promise: Value = ctx.eval("Promise.resolve(1)")?;
            let custom: Value = ctx.eval("({ then(f) { f(1); } })")?;
            let fake: Value = ctx.eval("({ then: 1 })")?;
            let number: Value = ctx.eval("42")?;
            assert!(is_thenable(&promise));
            assert!(is_thenable(&custom));
            assert!(!is_thenable(&fake));
            assert!(!is_thenable(&number));
            Ok(())
        });
    }

    #[test]
    fn exceptions_take_message_and_stack() {
        with_marshal(|m| {
            let ctx = m.ctx();
            let error: Value = ctx.eval("new Error('boom')")?;
            let exception = host_exception_from_value(ctx, &error);
            assert_eq!(exception.message, "boom");

            let text: Value = ctx.eval("'plain'")?;
            assert_eq!(host_exception_from_value(ctx, &text).message, "plain");

            let data: Value = ctx.eval("({ code: 7 })")?;
            assert_eq!(host_exception_from_value(ctx, &data).message, r#"{"code":7}"#);

            let err = ctx.eval::<Value, _>("throw new RangeError('out')").unwrap_err();
            assert_eq!(caught_exception(ctx, err).message, "out");
            Ok(())
        });
    }
}
