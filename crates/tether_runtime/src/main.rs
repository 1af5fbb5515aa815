//! Tether Runtime
//!
//! Boots both runtimes and runs one promise round trip: a host deferred goes
//! into script, script chains on it, and the chained promise comes back as a
//! second host deferred completed by the first one's resolution.

use anyhow::{bail, Result};
use std::path::Path;
use std::sync::Arc;
use tether_host::{Deferred, HostObject, HostRuntime, HostValue, Outcome};
use tether_script::rquickjs::{Function, Value};
use tether_script::{BridgeError, BridgeSettings, Converter, ScriptRuntime};
use tracing_subscriber::EnvFilter;

const DEMO_SCRIPT: &str = r#"
function double(promise) {
    return promise.then(value => value * 2);
}
"#;

fn main() -> Result<()> {
    let settings = match std::env::args().nth(1) {
        Some(path) => BridgeSettings::load(Path::new(&path))?,
        None => BridgeSettings::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Tether v{}", env!("CARGO_PKG_VERSION"));

    let host = Arc::new(HostRuntime::new());
    let script = ScriptRuntime::with_settings(Arc::clone(&host), &settings)?;
    script.execute(DEMO_SCRIPT)?;

    let (input, output) = script.with_marshal(|m| {
        let converter = Converter::deferred(Converter::Object);
        let local = m.host().create_deferred(m.scope());
        let promise = converter.to_script(m, HostValue::Ref(local), false)?;

        let double: Function = m.ctx().globals().get("double")?;
        let doubled: Value = double.call((promise,))?;
        let output = converter.to_host(m, doubled, false)?;
        Ok((deferred_of(&HostValue::Ref(local))?, deferred_of(&output)?))
    })?;
    tracing::info!(input = input.id(), output = output.id(), "promise chain set up");

    // Completed off the script thread; the script side picks it up on pump.
    std::thread::spawn(move || input.resolve(Some(Arc::new(HostObject::Double(21.0)))))
        .join()
        .map_err(|_| anyhow::anyhow!("completer thread panicked"))?;

    let settled = script.pump_completions()?;
    tracing::info!(settled, "host completions pumped");

    match output.outcome() {
        Some(Outcome::Fulfilled(Some(value))) => {
            tracing::info!(?value, "script doubled the host value");
        }
        Some(Outcome::Fulfilled(None)) => tracing::info!("script resolved with null"),
        Some(Outcome::Rejected(exception)) => bail!("script rejected: {exception}"),
        None => bail!("promise round trip did not complete"),
    }

    Ok(())
}

fn deferred_of(value: &HostValue<'_>) -> tether_script::Result<Deferred> {
    value
        .object()
        .and_then(|object| object.as_deferred().cloned())
        .ok_or_else(|| {
            BridgeError::type_mismatch(format!("expected deferred, got {}", value.describe()), false)
        })
}
