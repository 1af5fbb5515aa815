//! Marshaling errors and how they are raised on each side

use rquickjs::{Ctx, Exception};
use tether_host::{HostError, HostException, HostRuntime};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{message}")]
    TypeMismatch { message: String, in_script: bool },

    #[error("cannot marshal values of type '{class_name}'")]
    UnsupportedType { class_name: String, in_script: bool },

    #[error("{message}")]
    Serialization { message: String, in_script: bool },

    #[error("{0}")]
    PendingHostException(HostException),

    /// Registry or metadata lookup failed at completion time. Only logged.
    #[error("bridge protocol violation: {0}")]
    ProtocolViolation(String),

    /// Uncaught exception from script code run by the host.
    #[error("script threw: {0}")]
    Evaluation(HostException),

    #[error("cannot read script: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Script(#[from] rquickjs::Error),

    #[error(transparent)]
    Host(#[from] HostError),
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

impl BridgeError {
    pub fn type_mismatch(message: impl Into<String>, in_script: bool) -> Self {
        BridgeError::TypeMismatch {
            message: message.into(),
            in_script,
        }
    }

    pub fn serialization(message: impl Into<String>, in_script: bool) -> Self {
        BridgeError::Serialization {
            message: message.into(),
            in_script,
        }
    }

    /// Whether the error belongs to the script side.
    pub fn in_script(&self) -> bool {
        match self {
            BridgeError::TypeMismatch { in_script, .. }
            | BridgeError::UnsupportedType { in_script, .. }
            | BridgeError::Serialization { in_script, .. } => *in_script,
            BridgeError::PendingHostException(_) | BridgeError::Script(_) => true,
            BridgeError::ProtocolViolation(_)
            | BridgeError::Evaluation(_)
            | BridgeError::Io(_)
            | BridgeError::Host(_) => false,
        }
    }

    /// Raise on the side named by [`in_script`](Self::in_script): as a script
    /// exception (returned as `Err` for the native function to propagate) or
    /// as the pending host exception.
    pub fn raise(self, ctx: &Ctx<'_>, host: &HostRuntime) -> rquickjs::Result<()> {
        if self.in_script() {
            Err(self.into_script_error(ctx))
        } else {
            host.throw(self.into_host_exception());
            Ok(())
        }
    }

    /// Throw into the script engine.
    pub fn into_script_error(self, ctx: &Ctx<'_>) -> rquickjs::Error {
        let message = self.to_string();
        match self {
            BridgeError::Script(err) => err,
            BridgeError::TypeMismatch { .. } | BridgeError::UnsupportedType { .. } => {
                Exception::throw_type(ctx, &message)
            }
            BridgeError::Serialization { .. } => Exception::throw_syntax(ctx, &message),
            _ => Exception::throw_message(ctx, &message),
        }
    }

    /// Translate into a host exception.
    pub fn into_host_exception(self) -> HostException {
        match self {
            BridgeError::PendingHostException(exception) | BridgeError::Evaluation(exception) => {
                exception
            }
            other => HostException::new(other.to_string()),
        }
    }
}
