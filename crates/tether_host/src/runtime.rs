//! Host runtime adapter
//!
//! The operations the marshaling layer consumes from the host: reflection on
//! class names, handle lifecycle, deferred factory/completion and the pending
//! exception slot.

use crate::completion::CompletionRegistry;
use crate::deferred::{Deferred, Outcome};
use crate::handle::{GlobalRef, GlobalTable, LocalRef, LocalScope};
use crate::object::{HostException, HostObject};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host reference was already released")]
    StaleReference,
}

/// Handle to the host runtime. Shared by every script runtime bridged to it.
#[derive(Debug)]
pub struct HostRuntime {
    globals: Arc<GlobalTable>,
    pending_exception: Mutex<Option<HostException>>,
}

impl HostRuntime {
    pub fn new() -> Self {
        Self {
            globals: Arc::new(GlobalTable::default()),
            pending_exception: Mutex::new(None),
        }
    }

    /// Open a frame for scope-local references.
    pub fn open_scope(&self) -> LocalScope {
        LocalScope::new()
    }

    pub fn create_local_reference<'s>(
        &self,
        scope: &'s LocalScope,
        object: HostObject,
    ) -> LocalRef<'s> {
        scope.create_local_reference(Arc::new(object))
    }

    /// Reflective class-name lookup for the referenced object.
    pub fn resolve_reference_class_name(&self, local: &LocalRef<'_>) -> Result<String, HostError> {
        let object = local.get().ok_or(HostError::StaleReference)?;
        Ok(object.class_name().to_string())
    }

    pub fn promote_to_global(&self, local: &LocalRef<'_>) -> Result<GlobalRef, HostError> {
        let object = local.get().ok_or(HostError::StaleReference)?;
        Ok(self.globals.promote(object))
    }

    pub fn promote_object(&self, object: Arc<HostObject>) -> GlobalRef {
        self.globals.promote(object)
    }

    pub fn release_global(&self, global: GlobalRef) {
        global.release();
    }

    /// Live scope-independent references.
    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn create_deferred<'s>(&self, scope: &'s LocalScope) -> LocalRef<'s> {
        self.create_local_reference(scope, HostObject::Deferred(Deferred::new()))
    }

    /// Complete the deferred behind `target`. A target that is not a deferred
    /// queues a pending exception, the way a failed host call would.
    pub fn complete_deferred(&self, target: &GlobalRef, outcome: Outcome) -> bool {
        match target.get() {
            Some(object) => match object.as_deferred() {
                Some(deferred) => deferred.complete(outcome),
                None => {
                    self.throw_type_error(format!(
                        "cannot complete {}: not a deferred",
                        object.class_name()
                    ));
                    false
                }
            },
            None => {
                self.throw(HostException::new(HostError::StaleReference.to_string()));
                false
            }
        }
    }

    pub fn throw_type_error(&self, message: impl Into<String>) {
        self.throw(HostException::new(message));
    }

    /// Queue `exception` as the pending host exception. An exception already
    /// pending is kept.
    pub fn throw(&self, exception: HostException) {
        let mut pending = self.pending();
        if pending.is_none() {
            tracing::debug!(message = %exception.message, "host exception pending");
            *pending = Some(exception);
        }
    }

    pub fn has_pending_exception(&self) -> bool {
        self.pending().is_some()
    }

    pub fn take_pending_exception(&self) -> Option<HostException> {
        self.pending().take()
    }

    /// A completion channel for one script runtime. Each script runtime
    /// drains only the completions of promises it registered.
    pub fn create_completion_registry(&self) -> CompletionRegistry {
        CompletionRegistry::new(Arc::clone(&self.globals))
    }

    fn pending(&self) -> MutexGuard<'_, Option<HostException>> {
        self.pending_exception
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}
