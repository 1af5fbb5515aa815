//! Tether Scripting Bridge
//!
//! Marshals values between the host runtime and QuickJS.
//!
//! ## Architecture
//!
//! - **Type identity:** host class names resolve once to a [`TypeTag`]
//! - **Converters:** one [`Converter`] per value family, used in both directions
//! - **Async:** script promises and host deferreds bridge through
//!   [`promise`]; host completions reach the script thread through
//!   [`ScriptRuntime::pump_completions`]

pub mod convert;
pub mod error;
pub mod marshal;
pub mod promise;
pub mod runtime;
pub mod settings;
pub mod type_tag;
pub mod value;

pub use convert::{Converter, Primitive};
pub use error::{BridgeError, Result};
pub use marshal::MarshalContext;
pub use promise::{complete_named_promise, BridgeState, PromiseState};
pub use runtime::ScriptRuntime;
pub use settings::{BridgeSettings, SettingsError};
pub use type_tag::TypeTag;

pub use rquickjs;

#[cfg(test)]
pub(crate) mod testing {
    use crate::{MarshalContext, Result, ScriptRuntime};
    use std::sync::Arc;
    use tether_host::HostRuntime;

    /// Run `f` against a fresh host and script runtime.
    pub(crate) fn with_marshal<F>(f: F)
    where
        F: for<'js, 's> FnOnce(&MarshalContext<'js, 's>) -> Result<()>,
    {
        let runtime = ScriptRuntime::new(Arc::new(HostRuntime::new())).unwrap();
        if let Err(err) = runtime.with_marshal(f) {
            panic!("marshal test failed: {err}");
        }
    }
}
