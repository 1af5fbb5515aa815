//! Per-call marshaling context

use crate::error::{BridgeError, Result};
use crate::promise::BridgeState;
use rquickjs::Ctx;
use std::rc::Rc;
use std::sync::Arc;
use tether_host::{HostObject, HostRuntime, HostValue, LocalRef, LocalScope};

/// Everything a converter needs for one marshaling call: the script context,
/// the host runtime, the local scope host references are created in, and
/// the bridge state of the owning script runtime.
pub struct MarshalContext<'js, 's> {
    ctx: Ctx<'js>,
    host: &'s Arc<HostRuntime>,
    scope: &'s LocalScope,
    bridge: &'s Rc<BridgeState>,
}

impl<'js, 's> MarshalContext<'js, 's> {
    pub fn new(
        ctx: Ctx<'js>,
        host: &'s Arc<HostRuntime>,
        scope: &'s LocalScope,
        bridge: &'s Rc<BridgeState>,
    ) -> Self {
        Self {
            ctx,
            host,
            scope,
            bridge,
        }
    }

    pub fn ctx(&self) -> &Ctx<'js> {
        &self.ctx
    }

    pub fn host(&self) -> &'s Arc<HostRuntime> {
        self.host
    }

    pub fn scope(&self) -> &'s LocalScope {
        self.scope
    }

    pub fn bridge(&self) -> &'s Rc<BridgeState> {
        self.bridge
    }

    /// Allocate `object` on the host heap and reference it from this scope.
    pub fn new_local(&self, object: HostObject) -> LocalRef<'s> {
        self.host.create_local_reference(self.scope, object)
    }

    pub fn new_ref(&self, object: HostObject) -> HostValue<'s> {
        HostValue::Ref(self.new_local(object))
    }

    /// Fail with the host's pending exception, if one was queued by the last
    /// host call.
    pub fn check_host_exception(&self) -> Result<()> {
        match self.host.take_pending_exception() {
            Some(exception) => Err(BridgeError::PendingHostException(exception)),
            None => Ok(()),
        }
    }

    /// Raise `err` on the side it belongs to.
    pub fn raise(&self, err: BridgeError) -> rquickjs::Result<()> {
        err.raise(&self.ctx, self.host)
    }
}
