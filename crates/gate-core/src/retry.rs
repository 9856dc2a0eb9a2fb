//! Sleep on the gate's clock for the reported remaining time, then call
//! again. No retry limit.

use crate::error::GateError;
use crate::gate::{AsyncGatedInvoker, GatedInvoker};
use crate::invoker::{AsyncInvoker, Invoker};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug)]
pub struct SleepAndRetry<G> {
    gate: G,
    waits: AtomicU64,
}

impl<G> SleepAndRetry<G> {
    pub fn new(gate: G) -> Self {
        Self {
            gate,
            waits: AtomicU64::new(0),
        }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    pub fn waits(&self) -> u64 {
        self.waits.load(Ordering::Relaxed)
    }
}

impl<I> SleepAndRetry<GatedInvoker<I>> {
    pub fn invoke<A>(&self, args: A) -> Result<Option<I::Output>, GateError<I::Error>>
    where
        A: Clone,
        I: Invoker<A>,
    {
        loop {
            match self.gate.invoke(args.clone()) {
                Err(GateError::RateLimited(limit)) => {
                    let attempt = self.waits.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(
                        gate = %self.gate.config().name(),
                        attempt,
                        wait_ms = limit.remaining().as_millis() as u64,
                        "rate limited, sleeping before retry"
                    );
                    self.gate.config().clock().sleep(limit.remaining());
                }
                other => return other,
            }
        }
    }
}

impl<I> SleepAndRetry<AsyncGatedInvoker<I>> {
    pub async fn invoke<A>(&self, args: A) -> Result<Option<I::Output>, GateError<I::Error>>
    where
        A: Clone + Send + 'static,
        I: AsyncInvoker<A>,
    {
        loop {
            match self.gate.invoke(args.clone()).await {
                Err(GateError::RateLimited(limit)) => {
                    let attempt = self.waits.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(
                        gate = %self.gate.config().name(),
                        attempt,
                        wait_ms = limit.remaining().as_millis() as u64,
                        "rate limited, sleeping before retry"
                    );
                    self.gate.config().clock().sleep_async(limit.remaining()).await;
                }
                other => return other,
            }
        }
    }
}
