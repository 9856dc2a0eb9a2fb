use crate::config::GateConfig;
use crate::error::{GateError, RateLimitExceeded};
use crate::invocation::InvocationResult;
use crate::invoker::{AsyncInvoker, Invoker};
use crate::window::WindowCounter;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, warn};

/// Point-in-time view of a gate's window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub name: String,
    pub call_count: u32,
    pub max_calls: u32,
    pub period_secs: f64,
    pub remaining_secs: f64,
}

fn roll_window(counter: &mut WindowCounter, now: Instant, name: &str) {
    if counter.should_reset(now) {
        debug!(gate = %name, counted = counter.call_count(), "window elapsed, resetting");
        counter.reset(now);
    }
}

/// Counts the call if it was fresh and decides what the caller gets back.
/// A throttled fresh call stays counted even when the payload is withheld.
fn settle<T>(
    counter: &mut WindowCounter,
    config: &GateConfig,
    now: Instant,
    result: InvocationResult<T>,
) -> Result<Option<T>, RateLimitExceeded> {
    if !result.from_cache {
        counter.record_call();
    }
    if counter.is_over_limit() {
        let remaining = counter.remaining(now);
        warn!(
            gate = %config.name(),
            count = counter.call_count(),
            max = counter.max_calls(),
            remaining_ms = remaining.as_millis() as u64,
            "rate limit exceeded"
        );
        if config.raises_on_limit() {
            return Err(RateLimitExceeded::new(remaining));
        }
        return Ok(None);
    }
    Ok(Some(result.payload))
}

fn snapshot_of(counter: &WindowCounter, config: &GateConfig) -> WindowSnapshot {
    let now = config.clock().now();
    let (call_count, remaining) = if counter.should_reset(now) {
        (0, counter.period())
    } else {
        (counter.call_count(), counter.remaining(now))
    };
    WindowSnapshot {
        name: config.name().to_string(),
        call_count,
        max_calls: counter.max_calls(),
        period_secs: counter.period().as_secs_f64(),
        remaining_secs: remaining.as_secs_f64(),
    }
}

/// Runs an operation under a fixed-window limit that only charges for fresh
/// (non-cached) results.
///
/// The whole check, call and update sequence holds one lock, so concurrent
/// callers are serialized, including the latency of the wrapped operation.
/// The operation always runs; the limit decides whether its payload reaches
/// the caller.
#[derive(Debug)]
pub struct GatedInvoker<I> {
    inner: I,
    config: GateConfig,
    counter: Mutex<WindowCounter>,
}

impl<I> GatedInvoker<I> {
    pub fn new(config: GateConfig, inner: I) -> Self {
        let counter = WindowCounter::new(config.calls(), config.period(), config.clock().now());
        Self {
            inner,
            config,
            counter: Mutex::new(counter),
        }
    }

    /// Returns `Ok(None)` when over the limit and the gate is configured not
    /// to raise.
    pub fn invoke<A>(&self, args: A) -> Result<Option<I::Output>, GateError<I::Error>>
    where
        I: Invoker<A>,
    {
        let mut counter = self.lock();
        let now = self.config.clock().now();
        roll_window(&mut counter, now, self.config.name());
        let result = self.inner.invoke(args).map_err(GateError::Operation)?;
        Ok(settle(&mut counter, &self.config, now, result)?)
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let counter = self.lock();
        snapshot_of(&counter, &self.config)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    // The counter is consistent between statements, so a panic inside the
    // wrapped operation leaves nothing half-written.
    fn lock(&self) -> MutexGuard<'_, WindowCounter> {
        self.counter.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Async counterpart of [`GatedInvoker`]. The window lock is held across the
/// wrapped operation's await.
#[derive(Debug)]
pub struct AsyncGatedInvoker<I> {
    inner: I,
    config: GateConfig,
    counter: tokio::sync::Mutex<WindowCounter>,
}

impl<I> AsyncGatedInvoker<I> {
    pub fn new(config: GateConfig, inner: I) -> Self {
        let counter = WindowCounter::new(config.calls(), config.period(), config.clock().now());
        Self {
            inner,
            config,
            counter: tokio::sync::Mutex::new(counter),
        }
    }

    pub async fn invoke<A>(&self, args: A) -> Result<Option<I::Output>, GateError<I::Error>>
    where
        A: Send + 'static,
        I: AsyncInvoker<A>,
    {
        let mut counter = self.counter.lock().await;
        let now = self.config.clock().now();
        roll_window(&mut counter, now, self.config.name());
        let result = self.inner.invoke(args).await.map_err(GateError::Operation)?;
        Ok(settle(&mut counter, &self.config, now, result)?)
    }

    pub async fn snapshot(&self) -> WindowSnapshot {
        let counter = self.counter.lock().await;
        snapshot_of(&counter, &self.config)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }
}
