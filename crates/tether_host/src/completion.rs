//! Completion registry
//!
//! Forwards host deferred completions to the script runtime's thread. A
//! deferred exposed to script as a promise is registered under the promise's
//! identifier. When it completes (on whatever thread), the outcome is
//! promoted to a global reference and queued. The script thread drains the
//! queue and settles each promise by identifier.

use crate::deferred::{Deferred, Outcome};
use crate::handle::{GlobalRef, GlobalTable};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A completed host deferred, addressed to a script promise.
#[derive(Debug)]
pub struct PromiseCompletion {
    pub id: String,
    pub is_fulfilled: bool,
    /// Fulfilled value or rejection exception. `None` is `null`.
    pub value: Option<GlobalRef>,
}

pub struct CompletionRegistry {
    sender: UnboundedSender<PromiseCompletion>,
    receiver: Mutex<UnboundedReceiver<PromiseCompletion>>,
    globals: Arc<GlobalTable>,
}

impl CompletionRegistry {
    pub(crate) fn new(globals: Arc<GlobalTable>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            globals,
        }
    }

    /// Settle the script promise `id` once `deferred` completes.
    pub fn set_up_script_promise(&self, id: impl Into<String>, deferred: &Deferred) {
        let id = id.into();
        let sender = self.sender.clone();
        let globals = Arc::clone(&self.globals);
        tracing::debug!(promise = %id, deferred = deferred.id(), "watching deferred");

        deferred.on_complete(move |outcome| {
            let (is_fulfilled, value) = match outcome {
                Outcome::Fulfilled(value) => (true, value.clone().map(|v| globals.promote(v))),
                Outcome::Rejected(exception) => {
                    (false, Some(globals.promote(exception.clone().into_object())))
                }
            };
            let completion = PromiseCompletion {
                id,
                is_fulfilled,
                value,
            };
            if let Err(err) = sender.send(completion) {
                tracing::warn!(promise = %err.0.id, "completion dropped: script side is gone");
            }
        });
    }

    /// Queue a completion directly.
    pub fn post(&self, completion: PromiseCompletion) {
        if let Err(err) = self.sender.send(completion) {
            tracing::warn!(promise = %err.0.id, "completion dropped: script side is gone");
        }
    }

    /// Take every queued completion, oldest first.
    pub fn drain(&self) -> Vec<PromiseCompletion> {
        let mut receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        let mut drained = Vec::new();
        while let Ok(completion) = receiver.try_recv() {
            drained.push(completion);
        }
        drained
    }
}

impl std::fmt::Debug for CompletionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRegistry").finish_non_exhaustive()
    }
}
