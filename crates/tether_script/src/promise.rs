//! Promise/deferred bridge
//!
//! Two directions:
//!
//! - **Script promise → host deferred** ([`to_host`]). A thenable gets two
//!   native continuations sharing one [`PendingAsyncOperation`]; whichever
//!   fires first settles the host deferred. Non-thenables resolve it
//!   synchronously.
//! - **Host deferred → script promise** ([`to_script`]). A metadata object is
//!   parked on the script global object under a generated identifier until
//!   the host reports completion through [`complete_named_promise`].
//!
//! Every operation and registration settles at most once.

use crate::convert::Converter;
use crate::error::{BridgeError, Result};
use crate::marshal::MarshalContext;
use crate::value::{caught_exception, host_exception_from_value, is_thenable};
use rquickjs::class::Trace;
use rquickjs::function::{Constructor, Opt, This};
use rquickjs::object::Property;
use rquickjs::{Class, Ctx, Function, Object, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tether_host::{CompletionRegistry, GlobalRef, HostException, HostRuntime, HostValue, Outcome};

/// Reserved, non-enumerable property holding the result converter. The
/// `\u{ff}` prefix keeps it out of reach of plain identifiers.
pub const CONVERTER_PROPERTY: &str = "\u{ff}\u{ff}converter";

/// Prefix for registry identifiers unless configured otherwise.
pub const DEFAULT_PROMISE_ID_PREFIX: &str = "__prom_";

/// Bridge bookkeeping owned by one script runtime. Only touched from the
/// script runtime's thread.
///
/// Identifiers are unique within `completions`, the channel this runtime
/// alone drains, so runtimes sharing a host never settle each other's
/// promises.
#[derive(Debug)]
pub struct BridgeState {
    promise_id_prefix: String,
    last_promise_id: Cell<u64>,
    pending_operations: Cell<usize>,
    registered_promises: Cell<usize>,
    completions: CompletionRegistry,
}

impl BridgeState {
    pub fn new(promise_id_prefix: impl Into<String>, completions: CompletionRegistry) -> Self {
        Self {
            promise_id_prefix: promise_id_prefix.into(),
            last_promise_id: Cell::new(0),
            pending_operations: Cell::new(0),
            registered_promises: Cell::new(0),
            completions,
        }
    }

    /// Completions of host deferreds this runtime exposed as promises.
    pub fn completions(&self) -> &CompletionRegistry {
        &self.completions
    }

    fn next_promise_id(&self) -> String {
        let id = self.last_promise_id.get() + 1;
        self.last_promise_id.set(id);
        format!("{}{id}", self.promise_id_prefix)
    }

    /// Script-to-host operations still waiting on their thenable.
    pub fn pending_operations(&self) -> usize {
        self.pending_operations.get()
    }

    /// Host deferreds exposed to script that have not settled yet.
    pub fn registered_promises(&self) -> usize {
        self.registered_promises.get()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PromiseState {
    Created,
    AttachedToThenable,
    Fulfilled,
    Rejected,
}

/// One in-flight script promise bridged to a host deferred.
///
/// Shared by the fulfilled and rejected continuations. The deferred handle
/// is released when the operation settles; the rest is freed once the engine
/// finalizes both continuation functions.
#[derive(Debug)]
pub struct PendingAsyncOperation {
    deferred: RefCell<Option<GlobalRef>>,
    component: Rc<Converter>,
    state: Cell<PromiseState>,
    host: Arc<HostRuntime>,
    bridge: Rc<BridgeState>,
}

impl PendingAsyncOperation {
    fn new(
        deferred: GlobalRef,
        component: Rc<Converter>,
        host: Arc<HostRuntime>,
        bridge: Rc<BridgeState>,
    ) -> Self {
        Self {
            deferred: RefCell::new(Some(deferred)),
            component,
            state: Cell::new(PromiseState::Created),
            host,
            bridge,
        }
    }

    pub fn state(&self) -> PromiseState {
        self.state.get()
    }

    fn attach(&self) {
        self.state.set(PromiseState::AttachedToThenable);
        let bridge = &self.bridge;
        bridge.pending_operations.set(bridge.pending_operations.get() + 1);
    }

    fn fulfill<'js>(&self, ctx: &Ctx<'js>, value: Value<'js>) -> rquickjs::Result<()> {
        if self.is_settled() {
            tracing::debug!("ignoring fulfillment of a settled promise");
            return Ok(());
        }

        let scope = self.host.open_scope();
        let m = MarshalContext::new(ctx.clone(), &self.host, &scope, &self.bridge);
        let outcome = match self.component.to_host(&m, value, true) {
            Ok(value) => Outcome::Fulfilled(value.boxed()),
            Err(err) => {
                tracing::debug!(error = %err, "promise value could not be marshaled");
                Outcome::Rejected(err.into_host_exception())
            }
        };
        self.settle(outcome);
        m.check_host_exception().or_else(|err| m.raise(err))
    }

    fn reject<'js>(&self, ctx: &Ctx<'js>, reason: Value<'js>) -> rquickjs::Result<()> {
        if self.is_settled() {
            tracing::debug!("ignoring rejection of a settled promise");
            return Ok(());
        }
        self.settle(Outcome::Rejected(host_exception_from_value(ctx, &reason)));
        match self.host.take_pending_exception() {
            Some(exception) => BridgeError::PendingHostException(exception).raise(ctx, &self.host),
            None => Ok(()),
        }
    }

    fn is_settled(&self) -> bool {
        matches!(self.state(), PromiseState::Fulfilled | PromiseState::Rejected)
    }

    /// Complete the host deferred. Only the first call has any effect.
    fn settle(&self, outcome: Outcome) -> bool {
        let Some(deferred) = self.deferred.borrow_mut().take() else {
            return false;
        };

        let was_attached = self.state() == PromiseState::AttachedToThenable;
        self.state.set(if outcome.is_fulfilled() {
            PromiseState::Fulfilled
        } else {
            PromiseState::Rejected
        });
        if was_attached {
            let bridge = &self.bridge;
            bridge.pending_operations.set(bridge.pending_operations.get() - 1);
        }

        tracing::debug!(state = ?self.state(), "script promise settled host deferred");
        self.host.complete_deferred(&deferred, outcome);
        self.host.release_global(deferred);
        true
    }
}

/// Script promise → host deferred.
pub(crate) fn to_host<'js, 's>(
    component: &Rc<Converter>,
    m: &MarshalContext<'js, 's>,
    value: Value<'js>,
    in_script: bool,
) -> Result<HostValue<'s>> {
    let host = m.host();
    let deferred_ref = host.create_deferred(m.scope());

    if !is_thenable(&value) {
        let resolved = component.to_host(m, value, in_script)?;
        let deferred = host.promote_to_global(&deferred_ref)?;
        host.complete_deferred(&deferred, Outcome::Fulfilled(resolved.boxed()));
        host.release_global(deferred);
        m.check_host_exception()?;
        return Ok(HostValue::Ref(deferred_ref));
    }

    let deferred = host.promote_to_global(&deferred_ref)?;
    let op = Rc::new(PendingAsyncOperation::new(
        deferred,
        Rc::clone(component),
        Arc::clone(host),
        Rc::clone(m.bridge()),
    ));

    let ctx = m.ctx();
    let on_fulfilled = {
        let op = Rc::clone(&op);
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, value: Opt<Value<'js>>| {
            let value = value.0.unwrap_or_else(|| Value::new_undefined(ctx.clone()));
            op.fulfill(&ctx, value)
        })?
    };
    let on_rejected = {
        let op = Rc::clone(&op);
        Function::new(ctx.clone(), move |ctx: Ctx<'js>, reason: Opt<Value<'js>>| {
            let reason = reason.0.unwrap_or_else(|| Value::new_null(ctx.clone()));
            op.reject(&ctx, reason)
        })?
    };

    let thenable = value.as_object().cloned().ok_or_else(|| {
        BridgeError::type_mismatch("thenable is not an object", in_script)
    })?;
    let then: Function = thenable.get("then")?;
    op.attach();

    let attached: rquickjs::Result<Value> =
        then.call((This(thenable), on_fulfilled, on_rejected));
    if let Err(err) = attached {
        let exception = caught_exception(ctx, err);
        tracing::warn!(message = %exception.message, "calling then() on a thenable failed");
        op.settle(Outcome::Rejected(exception));
        m.check_host_exception()?;
    }

    Ok(HostValue::Ref(deferred_ref))
}

#[derive(Trace)]
#[rquickjs::class]
struct ConverterSlot {
    #[qjs(skip_trace)]
    converter: Rc<Converter>,
}

/// Host deferred → script promise.
pub(crate) fn to_script<'js>(
    component: &Rc<Converter>,
    m: &MarshalContext<'js, '_>,
    value: HostValue<'_>,
    in_script: bool,
) -> Result<Value<'js>> {
    if value.is_null() {
        return Ok(Value::new_null(m.ctx().clone()));
    }

    let object = value.object();
    let Some(deferred) = object.as_deref().and_then(|o| o.as_deferred()) else {
        return Err(BridgeError::type_mismatch(
            format!("expected host deferred, got {}", value.describe()),
            in_script,
        ));
    };

    let ctx = m.ctx();
    let metadata = Object::new(ctx.clone())?;
    let slot = Class::instance(
        ctx.clone(),
        ConverterSlot {
            converter: Rc::clone(component),
        },
    )?;
    metadata.prop(CONVERTER_PROPERTY, Property::from(slot))?;

    let executor = {
        let metadata = metadata.clone();
        Function::new(
            ctx.clone(),
            move |resolve: Function<'js>, reject: Function<'js>| -> rquickjs::Result<()> {
                metadata.set("resolve", resolve)?;
                metadata.set("reject", reject)?;
                Ok(())
            },
        )?
    };
    let globals = ctx.globals();
    let promise_ctor: Constructor = globals.get("Promise")?;
    let promise: Value = promise_ctor.construct((executor,))?;

    // Registered only once the promise exists, so failures leave no entry.
    let bridge = m.bridge();
    let id = bridge.next_promise_id();
    globals.set(id.as_str(), metadata)?;

    bridge
        .registered_promises
        .set(bridge.registered_promises.get() + 1);
    tracing::debug!(promise = %id, deferred = deferred.id(), "host deferred exposed as promise");
    bridge.completions().set_up_script_promise(id, deferred);
    Ok(promise)
}

/// Settle the script promise registered under `id` with a host value.
///
/// Returns `Ok(false)` when nothing was settled: unknown identifiers (never
/// registered, or already settled) and incomplete registrations are logged
/// and left alone.
pub fn complete_named_promise<'js>(
    m: &MarshalContext<'js, '_>,
    id: &str,
    is_fulfilled: bool,
    value: HostValue<'_>,
) -> Result<bool> {
    match settle_named_promise(m, id, is_fulfilled, value) {
        Err(BridgeError::ProtocolViolation(reason)) => {
            tracing::warn!(promise = %id, "{reason}");
            Ok(false)
        }
        other => other,
    }
}

fn settle_named_promise<'js>(
    m: &MarshalContext<'js, '_>,
    id: &str,
    is_fulfilled: bool,
    value: HostValue<'_>,
) -> Result<bool> {
    let ctx = m.ctx();
    let globals = ctx.globals();
    let Some(metadata) = globals.get::<_, Option<Object>>(id)? else {
        return Err(BridgeError::ProtocolViolation(format!(
            "could not find promise object with id {id}"
        )));
    };
    globals.remove(id)?;
    let bridge = m.bridge();
    bridge
        .registered_promises
        .set(bridge.registered_promises.get().saturating_sub(1));

    let Some(slot) = metadata.get::<_, Option<Class<ConverterSlot>>>(CONVERTER_PROPERTY)? else {
        return Err(BridgeError::ProtocolViolation(format!(
            "promise {id} has no result converter"
        )));
    };
    let component = Rc::clone(&slot.borrow().converter);

    let settle_with = if is_fulfilled { "resolve" } else { "reject" };
    let Some(settle) = metadata.get::<_, Option<Function>>(settle_with)? else {
        return Err(BridgeError::ProtocolViolation(format!(
            "promise {id} has no {settle_with} function"
        )));
    };

    let (settle, argument) = if is_fulfilled {
        match component.to_script(m, value, false) {
            Ok(argument) => (settle, argument),
            Err(err) => {
                // The promise still settles: rejected with the marshaling error.
                tracing::debug!(promise = %id, error = %err, "fulfilled value could not be marshaled");
                let Some(reject) = metadata.get::<_, Option<Function>>("reject")? else {
                    return Err(BridgeError::ProtocolViolation(format!(
                        "promise {id} has no reject function"
                    )));
                };
                (reject, script_error(ctx, &err.into_host_exception())?)
            }
        }
    } else {
        (settle, rejection_to_script(m, &component, value)?)
    };

    if let Err(err) = settle.call::<_, ()>((This(metadata), argument)) {
        let exception = caught_exception(ctx, err);
        tracing::warn!(promise = %id, message = %exception.message, "could not complete promise");
        return Ok(false);
    }
    tracing::debug!(promise = %id, fulfilled = is_fulfilled, "script promise settled");
    Ok(true)
}

/// Host exceptions become script `Error`s; any other rejection value goes
/// through the promise's converter.
fn rejection_to_script<'js>(
    m: &MarshalContext<'js, '_>,
    component: &Converter,
    value: HostValue<'_>,
) -> Result<Value<'js>> {
    let object = value.object();
    match object.as_deref().and_then(|o| o.as_exception()) {
        Some(exception) => script_error(m.ctx(), exception),
        None => component
            .to_script(m, value, false)
            .or_else(|err| script_error(m.ctx(), &err.into_host_exception())),
    }
}

fn script_error<'js>(ctx: &Ctx<'js>, exception: &HostException) -> Result<Value<'js>> {
    let error_ctor: Constructor = ctx.globals().get("Error")?;
    let error: Object = error_ctor.construct((exception.message.as_str(),))?;
    if let Some(stack) = &exception.stack {
        error.set("hostStack", stack.as_str())?;
    }
    Ok(error.into_value())
}
