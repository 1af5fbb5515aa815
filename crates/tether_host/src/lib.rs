//! Tether Host Runtime
//!
//! The managed side of the bridge:
//! - Reference-counted host object model
//! - Scope-local and scope-independent reference handles
//! - Single-assignment deferreds
//! - Completion registry that hands deferred results to the script thread

pub mod completion;
pub mod deferred;
pub mod handle;
pub mod object;
pub mod runtime;
pub mod value;

pub use completion::{CompletionRegistry, PromiseCompletion};
pub use deferred::{Deferred, Outcome};
pub use handle::{GlobalRef, LocalRef, LocalScope};
pub use object::{class_names, HostException, HostObject, JsonObjectWrapper};
pub use runtime::{HostError, HostRuntime};
pub use value::HostValue;
