//! Script runtime management
//!
//! Owns the QuickJS runtime and context, the bridge state and a handle to
//! the host runtime. Single-threaded: completions from other threads arrive
//! through this runtime's own completion registry and are applied by
//! [`ScriptRuntime::pump_completions`].

use crate::error::{BridgeError, Result};
use crate::marshal::MarshalContext;
use crate::promise::{self, BridgeState};
use crate::settings::BridgeSettings;
use crate::value::caught_exception;
use rquickjs::{Context, Runtime};
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tether_host::{GlobalRef, HostRuntime, HostValue};

/// Script execution context
pub struct ScriptRuntime {
    runtime: Runtime,
    pub context: Context,
    host: Arc<HostRuntime>,
    bridge: Rc<BridgeState>,
}

impl ScriptRuntime {
    pub fn new(host: Arc<HostRuntime>) -> Result<Self> {
        Self::with_settings(host, &BridgeSettings::default())
    }

    pub fn with_settings(host: Arc<HostRuntime>, settings: &BridgeSettings) -> Result<Self> {
        let runtime = Runtime::new()?;
        if let Some(limit) = settings.memory_limit {
            runtime.set_memory_limit(limit);
        }
        if let Some(size) = settings.max_stack_size {
            runtime.set_max_stack_size(size);
        }
        let context = Context::full(&runtime)?;
        let bridge = Rc::new(BridgeState::new(
            settings.promise_id_prefix.clone(),
            host.create_completion_registry(),
        ));

        tracing::debug!(
            prefix = %settings.promise_id_prefix,
            memory_limit = ?settings.memory_limit,
            "script runtime created"
        );
        Ok(Self {
            runtime,
            context,
            host,
            bridge,
        })
    }

    pub fn host(&self) -> &Arc<HostRuntime> {
        &self.host
    }

    pub fn bridge(&self) -> &BridgeState {
        &self.bridge
    }

    pub fn execute_file(&self, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)?;
        self.execute(&source)
    }

    pub fn execute(&self, source: &str) -> Result<()> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .map_err(|err| BridgeError::Evaluation(caught_exception(&ctx, err)))
        })
    }

    /// Call a global JavaScript function by name with no arguments.
    pub fn call_function(&self, name: &str) -> Result<()> {
        self.context.with(|ctx| {
            let func: rquickjs::Function = ctx.globals().get(name)?;
            func.call::<_, ()>(())
                .map_err(|err| BridgeError::Evaluation(caught_exception(&ctx, err)))
        })
    }

    /// Run `f` with a marshaling context over a fresh local scope. Host
    /// references created inside are released when `f` returns.
    pub fn with_marshal<R, F>(&self, f: F) -> Result<R>
    where
        F: for<'js, 's> FnOnce(&MarshalContext<'js, 's>) -> Result<R>,
    {
        self.context.with(|ctx| {
            let scope = self.host.open_scope();
            let m = MarshalContext::new(ctx, &self.host, &scope, &self.bridge);
            f(&m)
        })
    }

    /// Run queued promise jobs until none are left. Returns how many ran.
    pub fn run_pending_jobs(&self) -> usize {
        let mut executed = 0;
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => executed += 1,
                Ok(false) => break,
                Err(_) => {
                    executed += 1;
                    tracing::warn!("pending script job threw an uncaught exception");
                }
            }
        }
        executed
    }

    /// Settle the script promise registered under `id`. `None` is `null`.
    pub fn complete_named_promise(
        &self,
        id: &str,
        is_fulfilled: bool,
        value: Option<&GlobalRef>,
    ) -> Result<bool> {
        self.with_marshal(|m| {
            let value = value
                .and_then(|global| global.to_local(m.scope()))
                .map_or(HostValue::Null, HostValue::Ref);
            promise::complete_named_promise(m, id, is_fulfilled, value)
        })
    }

    /// Apply every queued host completion in signal order, then run the
    /// promise jobs they scheduled. Returns how many promises settled.
    pub fn pump_completions(&self) -> Result<usize> {
        let mut settled = 0;
        for completion in self.bridge.completions().drain() {
            if self.complete_named_promise(
                &completion.id,
                completion.is_fulfilled,
                completion.value.as_ref(),
            )? {
                settled += 1;
            }
        }
        let jobs = self.run_pending_jobs();
        if settled > 0 {
            tracing::debug!(settled, jobs, "host completions applied");
        }
        Ok(settled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Converter, Primitive};

    fn runtime() -> ScriptRuntime {
        ScriptRuntime::new(Arc::new(HostRuntime::new())).unwrap()
    }

    #[test]
    fn executes_source_and_calls_functions() {
        let runtime = runtime();
        runtime
            .execute("globalThis.calls = 0; function tick() { calls += 1; }")
            .unwrap();
        runtime.call_function("tick").unwrap();
        runtime.call_function("tick").unwrap();

        let calls = runtime
            .with_marshal(|m| {
                let calls = m.ctx().globals().get("calls")?;
                match Converter::Primitive(Primitive::Integer).to_host(m, calls, false)? {
                    HostValue::Int(calls) => Ok(calls),
                    other => panic!("unexpected value: {}", other.describe()),
                }
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn uncaught_script_errors_carry_their_message() {
        let runtime = runtime();
        match runtime.execute("throw new Error('bad script')") {
            Err(BridgeError::Evaluation(exception)) => assert_eq!(exception.message, "bad script"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            runtime.execute_file(Path::new("/nonexistent/script.js")),
            Err(BridgeError::Io(_))
        ));
    }

    #[test]
    fn settings_configure_the_bridge() {
        let settings = BridgeSettings {
            promise_id_prefix: "__custom_".into(),
            memory_limit: Some(32 << 20),
            max_stack_size: Some(512 << 10),
            ..Default::default()
        };
        let runtime = ScriptRuntime::with_settings(Arc::new(HostRuntime::new()), &settings).unwrap();
        let scope = runtime.host().open_scope();
        let local = runtime.host().create_deferred(&scope);
        let global = runtime.host().promote_to_global(&local).unwrap();

        runtime
            .with_marshal(|m| {
                let value = global.to_local(m.scope()).map_or(HostValue::Null, HostValue::Ref);
                Converter::deferred(Converter::Object).to_script(m, value, false)?;
                let registered: bool = m.ctx().globals().contains_key("__custom_1")?;
                assert!(registered);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn local_references_end_with_the_marshal_call() {
        let runtime = runtime();
        let live = runtime
            .with_marshal(|m| {
                m.new_local(tether_host::HostObject::Integer(1));
                Ok(m.scope().live_count())
            })
            .unwrap();
        assert_eq!(live, 1);
        assert_eq!(runtime.host().global_count(), 0);
    }
}
