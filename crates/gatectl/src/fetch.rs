use async_trait::async_trait;
use gate_core::{AsyncInvoker, InvocationResult, Invoker};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub key: u64,
    pub body: String,
}

fn render(key: u64) -> Page {
    Page {
        key,
        body: format!("GET /anything?i={key}"),
    }
}

#[derive(Debug, Default)]
pub struct FetchStats {
    fresh: AtomicU64,
    hits: AtomicU64,
}

impl FetchStats {
    fn note(&self, from_cache: bool) {
        if from_cache {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fresh.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn fresh(&self) -> u64 {
        self.fresh.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
}

/// Simulated transport behind a per-fetcher memory cache.
#[derive(Debug)]
pub struct CachedFetcher {
    latency: Duration,
    cache: Mutex<HashMap<u64, Page>>,
    stats: FetchStats,
}

impl CachedFetcher {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            cache: Mutex::new(HashMap::new()),
            stats: FetchStats::default(),
        }
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }
}

impl Invoker<u64> for CachedFetcher {
    type Output = Page;
    type Error = anyhow::Error;

    fn invoke(&self, key: u64) -> anyhow::Result<InvocationResult<Page>> {
        if let Some(page) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            self.stats.note(true);
            return Ok(InvocationResult::cached(page.clone()));
        }
        std::thread::sleep(self.latency);
        let page = render(key);
        debug!(key, "fetched");
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, page.clone());
        self.stats.note(false);
        Ok(InvocationResult::fresh(page))
    }
}

#[derive(Debug)]
pub struct AsyncCachedFetcher {
    latency: Duration,
    cache: tokio::sync::Mutex<HashMap<u64, Page>>,
    stats: FetchStats,
}

impl AsyncCachedFetcher {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            cache: tokio::sync::Mutex::new(HashMap::new()),
            stats: FetchStats::default(),
        }
    }

    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }
}

#[async_trait]
impl AsyncInvoker<u64> for AsyncCachedFetcher {
    type Output = Page;
    type Error = anyhow::Error;

    async fn invoke(&self, key: u64) -> anyhow::Result<InvocationResult<Page>> {
        let mut cache = self.cache.lock().await;
        if let Some(page) = cache.get(&key) {
            self.stats.note(true);
            return Ok(InvocationResult::cached(page.clone()));
        }
        tokio::time::sleep(self.latency).await;
        let page = render(key);
        debug!(key, "fetched");
        cache.insert(key, page.clone());
        self.stats.note(false);
        Ok(InvocationResult::fresh(page))
    }
}
